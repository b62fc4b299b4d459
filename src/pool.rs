//! CPU backends: a pool of worker threads, and a single-threaded fallback.

use crossbeam::channel;
use crossbeam::sync::WaitGroup;
use log::{debug, trace};

use crate::{
    backend::Backend,
    frame::{FrameSequence, FrameSlots},
    palette::Palette,
    render::render_frame,
    zoom::{Viewport, ZoomPlan},
    Error, Result,
};

/// A frame for a worker to render. Dropping `done` marks it finished.
struct Job {
    index: usize,
    viewport: Viewport,
    done: WaitGroup,
}

/// `threads` workers pulling frames off a shared job channel.
///
/// Frames finish in no particular order. Each one is published into its own
/// slot, and the slots are only read back after every job has been counted
/// off.
pub struct CpuPool {
    threads: usize,
}

impl CpuPool {
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::Config("a CPU pool needs at least one thread".into()));
        }
        Ok(CpuPool { threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl Backend for CpuPool {
    fn name(&self) -> &str {
        "cpu-pool"
    }

    fn render(&mut self, palette: &Palette, plan: &ZoomPlan) -> Result<FrameSequence> {
        let size = plan.size();
        let palette_len = palette.len();
        let slots = FrameSlots::new(plan.len());
        let (sender, receiver) = channel::bounded::<Job>(plan.len());
        let outstanding = WaitGroup::new();

        debug!("starting {} workers for {} frames", self.threads, plan.len());

        crossbeam::thread::scope(|scope| -> Result<()> {
            let workers: Vec<_> = (0..self.threads)
                .map(|worker| {
                    let receiver = receiver.clone();
                    let slots = &slots;
                    scope.spawn(move |_| -> Result<()> {
                        // Ends once the driver hangs up and the queue is drained.
                        for job in receiver.iter() {
                            trace!("worker {} rendering frame {}", worker, job.index);
                            let published = render_frame(&job.viewport, size, palette_len)
                                .and_then(|frame| slots.publish(job.index, frame));
                            drop(job.done);
                            published?;
                        }
                        Ok(())
                    })
                })
                .collect();
            drop(receiver);

            for (index, viewport) in plan.viewports().iter().enumerate() {
                let job = Job {
                    index,
                    viewport: *viewport,
                    done: outstanding.clone(),
                };
                sender
                    .send(job)
                    .map_err(|_| Error::Worker("every worker has exited".into()))?;
            }
            drop(sender);
            outstanding.wait();

            for worker in workers {
                worker
                    .join()
                    .map_err(|_| Error::Worker("a worker thread panicked".into()))??;
            }
            Ok(())
        })
        .map_err(|_| Error::Worker("a worker thread panicked".into()))??;

        slots.finish()
    }
}

/// Renders frames one after another on the calling thread.
pub struct Sequential;

impl Backend for Sequential {
    fn name(&self) -> &str {
        "sequential"
    }

    fn render(&mut self, palette: &Palette, plan: &ZoomPlan) -> Result<FrameSequence> {
        let frames = plan
            .viewports()
            .iter()
            .enumerate()
            .map(|(index, viewport)| {
                trace!("rendering frame {}", index);
                render_frame(viewport, plan.size(), palette.len())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FrameSequence::from(frames))
    }
}
