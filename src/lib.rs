//! Animated zooms into the Mandelbrot set.
//!
//! A run plans one viewport per frame ([`zoom`]), renders every frame to
//! palette indices with one of the interchangeable [`backend`]s (a sequential
//! renderer, a CPU worker pool, or a GPU compute kernel), and hands the frames
//! in order to the [`sink`], which writes a looping GIF.

pub mod accelerator;
pub mod backend;
pub mod colour;
pub mod command_encoder;
pub mod compute;
pub mod config;
pub mod error;
pub mod escape;
pub mod frame;
pub mod kernel;
pub mod palette;
pub mod pool;
pub mod render;
pub mod screen;
pub mod sink;
pub mod typed_buffer;
pub mod var;
pub mod zoom;

use std::time::Instant;

use log::info;

pub use error::{Error, Result};

use crate::config::RenderConfig;
use crate::zoom::ZoomPlan;

/// Plans, renders and writes the animation described by `config`.
pub fn run(config: &RenderConfig) -> Result<()> {
    let palette = config.palette.palette();
    let plan = ZoomPlan::new(config.size, config.target, config.frames)?;
    let mut backend = config.execution.backend()?;

    info!(
        "rendering {} frames at {}x{}",
        plan.len(),
        config.size.width,
        config.size.height
    );
    let started = Instant::now();
    let frames = backend.render(&palette, &plan)?;
    info!("rendered in {:.2?}", started.elapsed());

    sink::save_animation(&config.output, &palette, &frames)?;
    if let Some(index) = config.still {
        if let Some(frame) = frames.get(index) {
            sink::save_still(&config.still_path(index), &palette, frame)?;
        }
    }
    Ok(())
}
