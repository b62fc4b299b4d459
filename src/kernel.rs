//! Host side of the `zoom.wgsl` compute kernel.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::{screen::Size, zoom::Viewport};

pub const SOURCE: &str = include_str!("zoom.wgsl");

pub const ENTRY_POINT: &str = "zoom";

/// Uniform arguments of one kernel launch, laid out as `zoom.wgsl#KernelArgs`.
///
/// The viewport goes to the device in single precision.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct KernelArgs {
    pub real_min: f32,
    pub real_max: f32,
    pub imag_min: f32,
    pub imag_max: f32,
    pub palette_count: i32,
    pub width: u32,
    pub first_row: u32,
    pub rows: u32,
}

impl KernelArgs {
    pub fn new(viewport: &Viewport, size: Size, palette_len: usize, band: Range<u32>) -> Self {
        KernelArgs {
            real_min: viewport.real_min as f32,
            real_max: viewport.real_max as f32,
            imag_min: viewport.imag_min as f32,
            imag_max: viewport.imag_max as f32,
            palette_count: palette_len as i32,
            width: size.width,
            first_row: band.start,
            rows: band.end - band.start,
        }
    }
}
