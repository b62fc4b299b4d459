use std::fs::File;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mandelzoom(dir: &TempDir) -> Command {
    let mut command = Command::cargo_bin("mandelzoom").unwrap();
    command.current_dir(dir.path());
    command
}

/// Frame count, dimensions and the indexed pixels of every frame.
fn decode(path: &Path) -> (u16, u16, Vec<Vec<u8>>) {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(File::open(path).unwrap()).unwrap();
    let (width, height) = (decoder.width(), decoder.height());
    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        frames.push(frame.buffer.to_vec());
    }
    (width, height, frames)
}

#[test]
fn single_sequential_frame() {
    let dir = TempDir::new().unwrap();
    mandelzoom(&dir)
        .args([
            "--colors",
            "Vivid",
            "--frame",
            "1",
            "--resolution",
            "small",
            "--dest-x",
            "-0.75",
            "--dest-y",
            "0.0",
        ])
        .assert()
        .success();

    let (width, height, frames) = decode(&dir.path().join("mandelbrot.gif"));
    assert_eq!((width, height), (640, 512));
    assert_eq!(frames.len(), 1);
    let pixels = &frames[0];
    assert_eq!(pixels.len(), 640 * 512);
    assert!(pixels[0] < 64, "corner index {}", pixels[0]);
    assert_eq!(pixels[256 * 640 + 320], 255);
}

#[test]
fn parallel_frames_in_order() {
    let dir = TempDir::new().unwrap();
    mandelzoom(&dir)
        .args(["--frame", "10", "--resolution", "small", "-p", "--threads", "4"])
        .args(["--output", "zoom.gif", "--still", "9"])
        .assert()
        .success();

    let (_, _, parallel) = decode(&dir.path().join("zoom.gif"));
    assert_eq!(parallel.len(), 10);
    assert!(dir.path().join("zoom-9.png").exists());

    mandelzoom(&dir)
        .args(["--frame", "10", "--resolution", "small", "--output", "serial.gif"])
        .assert()
        .success();

    let (_, _, sequential) = decode(&dir.path().join("serial.gif"));
    assert_eq!(parallel, sequential);
}

#[test]
fn threads_need_parallel() {
    let dir = TempDir::new().unwrap();
    mandelzoom(&dir)
        .args(["--threads", "0"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--parallel"));

    assert!(!dir.path().join("mandelbrot.gif").exists());
}

#[test]
fn unknown_palette_is_rejected() {
    let dir = TempDir::new().unwrap();
    mandelzoom(&dir)
        .args(["--colors", "Sepia"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unwritable_output_fails() {
    let dir = TempDir::new().unwrap();
    mandelzoom(&dir)
        .args(["--frame", "1", "--resolution", "small"])
        .args(["--output", "no/such/dir/zoom.gif"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("zoom.gif"));
}
