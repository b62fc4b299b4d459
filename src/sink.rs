//! Writes rendered frames out: the looping GIF, and optional PNG stills.

use std::borrow::Cow;
use std::path::Path;

use log::{debug, info};

use crate::{
    colour::paint,
    frame::{Frame, FrameSequence},
    palette::Palette,
    screen::Size,
    Error, Result,
};

/// Inter-frame delay in hundredths of a second; zero lets viewers use their default.
pub const FRAME_DELAY: u16 = 0;

/// Encodes `frames` in index order as an endlessly looping GIF whose global
/// colour table is `palette`.
pub fn encode_animation(palette: &Palette, frames: &FrameSequence) -> Result<Vec<u8>> {
    let size = match frames.get(0) {
        Some(frame) => frame.size(),
        None => return Err(Error::Config("an animation needs at least one frame".into())),
    };
    let (width, height) = gif_dimensions(size)?;

    let mut bytes = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut bytes, width, height, &palette.rgb_table())?;
        encoder.set_repeat(gif::Repeat::Infinite)?;
        for (index, frame) in frames.iter().enumerate() {
            if frame.size() != size {
                return Err(Error::Config(format!(
                    "frame {} is {}x{}, expected {}x{}",
                    index,
                    frame.size().width,
                    frame.size().height,
                    size.width,
                    size.height
                )));
            }
            let mut gif_frame = gif::Frame::default();
            gif_frame.width = width;
            gif_frame.height = height;
            gif_frame.delay = FRAME_DELAY;
            gif_frame.buffer = Cow::Borrowed(frame.pixels());
            encoder.write_frame(&gif_frame)?;
        }
        // Dropping the encoder writes the trailer.
    }

    debug!("encoded {} frames into {} bytes", frames.len(), bytes.len());
    Ok(bytes)
}

/// Encodes the animation and writes it to `path`.
pub fn save_animation(path: &Path, palette: &Palette, frames: &FrameSequence) -> Result<()> {
    let bytes = encode_animation(palette, frames)?;
    std::fs::write(path, bytes).map_err(|source| Error::Output {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote {} frames to {}", frames.len(), path.display());
    Ok(())
}

/// Writes a single frame, with the palette applied, as a PNG.
pub fn save_still(path: &Path, palette: &Palette, frame: &Frame) -> Result<()> {
    paint(frame, palette).save(path)?;
    info!("wrote still {}", path.display());
    Ok(())
}

fn gif_dimensions(size: Size) -> Result<(u16, u16)> {
    match (u16::try_from(size.width), u16::try_from(size.height)) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(Error::Config(format!(
            "{}x{} is larger than a GIF can hold",
            size.width, size.height
        ))),
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn palette() -> Palette {
        Palette::new(vec![
            Rgba([0, 0, 0, 255]),
            Rgba([255, 0, 0, 255]),
            Rgba([0, 255, 0, 255]),
            Rgba([0, 0, 255, 255]),
        ])
        .unwrap()
    }

    fn sequence() -> FrameSequence {
        let size = Size::new(4, 2).unwrap();
        FrameSequence::from(vec![
            Frame::new(size, vec![0, 1, 2, 3, 3, 2, 1, 0]).unwrap(),
            Frame::new(size, vec![3; 8]).unwrap(),
            Frame::new(size, vec![1, 1, 1, 1, 2, 2, 2, 2]).unwrap(),
        ])
    }

    #[test]
    fn animation_keeps_frame_order_and_palette() {
        let frames = sequence();
        let bytes = encode_animation(&palette(), &frames).unwrap();

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(&bytes[..]).unwrap();
        assert_eq!((decoder.width(), decoder.height()), (4, 2));
        assert_eq!(decoder.global_palette().unwrap(), &palette().rgb_table()[..]);

        let mut decoded = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            assert_eq!(frame.delay, FRAME_DELAY);
            decoded.push(frame.buffer.to_vec());
        }
        let expected: Vec<Vec<u8>> = frames.iter().map(|frame| frame.pixels().to_vec()).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn empty_sequences_are_rejected() {
        assert!(encode_animation(&palette(), &FrameSequence::from(vec![])).is_err());
    }

    #[test]
    fn mixed_frame_sizes_are_rejected() {
        let frames = FrameSequence::from(vec![
            Frame::new(Size::new(2, 2).unwrap(), vec![0; 4]).unwrap(),
            Frame::new(Size::new(4, 1).unwrap(), vec![0; 4]).unwrap(),
        ]);
        assert!(encode_animation(&palette(), &frames).is_err());
    }

    #[test]
    fn unwritable_path_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("zoom.gif");
        match save_animation(&path, &palette(), &sequence()) {
            Err(Error::Output { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected an output error, got {:?}", other),
        }
    }

    #[test]
    fn still_is_a_png_of_the_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        let frames = sequence();

        save_still(&path, &palette(), frames.get(0).unwrap()).unwrap();

        let still = image::open(&path).unwrap().to_rgba8();
        assert_eq!(still.dimensions(), (4, 2));
        assert_eq!(*still.get_pixel(1, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*still.get_pixel(0, 1), Rgba([0, 0, 255, 255]));
    }
}
