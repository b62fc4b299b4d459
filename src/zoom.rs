//! Zoom path planning.
//!
//! Every animation starts from the same wide view of the set. From there the
//! bottom-left corner of the view walks towards the target with geometrically
//! shrinking steps (ease-out) while the view itself shrinks by a constant
//! factor per frame. The eased steps stop just short of the target, so the
//! last view is slid, without resizing, until the target is on or inside
//! its edge.

use log::debug;

use crate::{screen::Size, Error, Result};

/// Per-frame decay of the corner step.
pub const EASE_OUT: f64 = 0.98;

/// Per-frame growth of the pixels-per-unit scale.
pub const ZOOM_PER_FRAME: f64 = 1.02;

/// The view of frame 0.
pub const INITIAL_VIEWPORT: Viewport = Viewport {
    real_min: -2.0,
    real_max: 0.5,
    imag_min: -1.0,
    imag_max: 1.0,
};

/// A rectangle of the complex plane sampled by one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub real_min: f64,
    pub real_max: f64,
    pub imag_min: f64,
    pub imag_max: f64,
}

impl Viewport {
    pub fn width(&self) -> f64 {
        self.real_max - self.real_min
    }

    pub fn height(&self) -> f64 {
        self.imag_max - self.imag_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn aspect(&self) -> f64 {
        self.width() / self.height()
    }

    /// Pixels per unit of the complex plane when rendered `size.width` wide.
    pub fn scale(&self, size: Size) -> f64 {
        size.width as f64 / self.width()
    }

    pub fn contains(&self, target: Target) -> bool {
        (self.real_min..=self.real_max).contains(&target.real)
            && (self.imag_min..=self.imag_max).contains(&target.imag)
    }

    /// The same-sized view, moved the least distance that brings `target` inside.
    pub fn slid_to(&self, target: Target) -> Viewport {
        let (real_min, real_max) = slide(self.real_min, self.real_max, target.real);
        let (imag_min, imag_max) = slide(self.imag_min, self.imag_max, target.imag);
        Viewport {
            real_min,
            real_max,
            imag_min,
            imag_max,
        }
    }
}

fn slide(min: f64, max: f64, to: f64) -> (f64, f64) {
    if to < min {
        (to, to + (max - min))
    } else if to > max {
        (to - (max - min), to)
    } else {
        (min, max)
    }
}

/// The point the zoom heads for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub real: f64,
    pub imag: f64,
}

impl Target {
    pub fn new(real: f64, imag: f64) -> Result<Self> {
        if !real.is_finite() || !imag.is_finite() {
            return Err(Error::Config(format!(
                "zoom target must be finite, got ({}, {})",
                real, imag
            )));
        }
        Ok(Target { real, imag })
    }
}

/// Generator of the viewports of an animation, one per frame.
#[derive(Clone, Debug)]
pub struct Planner {
    size: Size,
    target: Target,
    remaining: usize,
    current: Viewport,
    step_real: f64,
    step_imag: f64,
    scale: f64,
}

impl Planner {
    pub fn new(size: Size, target: Target, frames: usize) -> Self {
        let start = INITIAL_VIEWPORT;
        // Sum of the geometric series of steps over `frames` terms is the
        // full displacement, signed towards the target.
        let spread = (1.0 - EASE_OUT) / (1.0 - EASE_OUT.powi(frames as i32));
        Planner {
            size,
            target,
            remaining: frames,
            current: start,
            step_real: (target.real - start.real_min) * spread,
            step_imag: (target.imag - start.imag_min) * spread,
            scale: start.scale(size),
        }
    }

    fn advance(&mut self) {
        self.current.real_min += self.step_real;
        self.current.imag_min += self.step_imag;
        self.step_real *= EASE_OUT;
        self.step_imag *= EASE_OUT;
        self.scale *= ZOOM_PER_FRAME;
        self.current.real_max = self.current.real_min + self.size.width as f64 / self.scale;
        self.current.imag_max = self.current.imag_min + self.size.height as f64 / self.scale;
    }
}

impl Iterator for Planner {
    type Item = Viewport;

    fn next(&mut self) -> Option<Viewport> {
        if self.remaining == 0 {
            return None;
        }
        let viewport = self.current;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.advance();
        }
        if self.remaining == 1 {
            self.current = self.current.slid_to(self.target);
        }
        Some(viewport)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Planner {}

/// The viewports of every frame, computed up front.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomPlan {
    size: Size,
    target: Target,
    viewports: Vec<Viewport>,
}

impl ZoomPlan {
    pub fn new(size: Size, target: Target, frames: usize) -> Result<Self> {
        if frames == 0 {
            return Err(Error::Config("frame count must be positive".into()));
        }
        if (size.aspect() - INITIAL_VIEWPORT.aspect()).abs() > 1e-9 {
            return Err(Error::Config(format!(
                "image size {}x{} does not have the 5:4 aspect of the initial view",
                size.width, size.height
            )));
        }

        let viewports: Vec<Viewport> = Planner::new(size, target, frames).collect();
        if let Some(last) = viewports.last() {
            debug!(
                "planned {} frames towards ({}, {}), last view {:?}",
                viewports.len(),
                target.real,
                target.imag,
                last
            );
        }

        Ok(ZoomPlan {
            size,
            target,
            viewports,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }

    pub fn viewports(&self) -> &[Viewport] {
        &self.viewports
    }
}
