//! Command-line arguments and the validated settings of a run.

use std::path::PathBuf;

use clap::Parser;

use crate::{
    backend::Execution,
    palette::PaletteName,
    screen::{Resolution, Size},
    zoom::Target,
    Error, Result,
};

/// Renders an animated zoom into the Mandelbrot set as a looping GIF.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Colour palette
    #[arg(long, value_enum, ignore_case = true, default_value = "Vivid")]
    pub colors: PaletteName,

    /// Number of frames from the initial view to the target
    #[arg(long, default_value_t = 100)]
    pub frame: usize,

    /// Image size: small (640x512), medium (1040x832) or large (1440x1152)
    #[arg(long, value_enum, ignore_case = true, default_value = "medium")]
    pub resolution: Resolution,

    /// Real part of the point the zoom heads for
    #[arg(long, default_value_t = -0.6366988, allow_negative_numbers = true)]
    pub dest_x: f64,

    /// Imaginary part of the point the zoom heads for
    #[arg(long, default_value_t = -0.4426395, allow_negative_numbers = true)]
    pub dest_y: f64,

    /// Render frames in parallel
    #[arg(short, long)]
    pub parallel: bool,

    /// Worker threads with --parallel: -1 for one per CPU, 0 for the GPU
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub threads: i64,

    /// Where to write the animation
    #[arg(short, long, default_value = "mandelbrot.gif")]
    pub output: PathBuf,

    /// Also write this frame as a PNG next to the animation
    #[arg(long)]
    pub still: Option<usize>,
}

/// Everything a run needs, checked for consistency.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub palette: PaletteName,
    pub frames: usize,
    pub size: Size,
    pub target: Target,
    pub execution: Execution,
    pub output: PathBuf,
    pub still: Option<usize>,
}

impl RenderConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.frame == 0 {
            return Err(Error::Config("--frame must be at least 1".into()));
        }
        let target = Target::new(args.dest_x, args.dest_y)?;
        let execution = execution(args.parallel, args.threads)?;
        if let Some(still) = args.still {
            if still >= args.frame {
                return Err(Error::Config(format!(
                    "--still {} is past the last frame ({})",
                    still,
                    args.frame - 1
                )));
            }
        }

        Ok(RenderConfig {
            palette: args.colors,
            frames: args.frame,
            size: args.resolution.size(),
            target,
            execution,
            output: args.output.clone(),
            still: args.still,
        })
    }

    /// `<output stem>-<index>.png`, beside the animation.
    pub fn still_path(&self, index: usize) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mandelbrot".to_string());
        self.output.with_file_name(format!("{}-{}.png", stem, index))
    }
}

fn execution(parallel: bool, threads: i64) -> Result<Execution> {
    match (parallel, threads) {
        (_, threads) if threads < -1 => Err(Error::Config(format!(
            "--threads must be -1, 0 or a positive count, got {}",
            threads
        ))),
        (false, -1) => Ok(Execution::Sequential),
        (false, _) => Err(Error::Config(
            "--threads can only be used together with --parallel".into(),
        )),
        (true, -1) => Ok(Execution::Threads(num_cpus::get())),
        (true, 0) => Ok(Execution::Accelerator),
        (true, threads) => usize::try_from(threads)
            .map(Execution::Threads)
            .map_err(|_| Error::Config(format!("cannot run {} threads", threads))),
    }
}
