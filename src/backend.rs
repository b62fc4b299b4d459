//! The interchangeable renderers behind a zoom.

use log::info;

use crate::{
    accelerator::Accelerator,
    frame::FrameSequence,
    palette::Palette,
    pool::{CpuPool, Sequential},
    zoom::ZoomPlan,
    Result,
};

/// Renders every frame of a plan.
pub trait Backend {
    fn name(&self) -> &str;

    fn render(&mut self, palette: &Palette, plan: &ZoomPlan) -> Result<FrameSequence>;
}

/// How the frames of a run are computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    /// One frame after another on the calling thread.
    Sequential,
    /// A pool of this many CPU workers.
    Threads(usize),
    /// The compute kernel on every usable GPU adapter.
    Accelerator,
}

impl Execution {
    /// Builds the backend. Accelerator setup failures are returned, never
    /// papered over with a CPU fallback.
    pub fn backend(self) -> Result<Box<dyn Backend>> {
        let backend: Box<dyn Backend> = match self {
            Execution::Sequential => Box::new(Sequential),
            Execution::Threads(threads) => Box::new(CpuPool::new(threads)?),
            Execution::Accelerator => Box::new(Accelerator::new()?),
        };
        info!("rendering with the {} backend", backend.name());
        Ok(backend)
    }
}
