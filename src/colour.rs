//! Colouring: escape values to palette indices, and palette indices to RGBA.

use image::RgbaImage;
use log::trace;
use rayon::prelude::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::{frame::Frame, palette::Palette};

/// Palette index for a normalised escape value: `floor(mu * (P - 1))`.
///
/// `mu = 1` (the iteration cap) lands on the last palette entry.
pub fn palette_index(mu: f64, palette_len: usize) -> u8 {
    debug_assert!((2..=256).contains(&palette_len));
    let top = (palette_len - 1) as f64;
    (mu.clamp(0.0, 1.0) * top).floor() as u8
}

/// Expands a paletted frame to RGBA.
pub fn paint(frame: &Frame, palette: &Palette) -> RgbaImage {
    trace!("begin paint");

    let size = frame.size();
    let mut rgba = vec![0u8; frame.pixels().len() * 4];
    rgba.par_chunks_mut(4)
        .enumerate()
        .for_each(|(offset, pixel)| {
            pixel.copy_from_slice(&palette.colour(frame.pixels()[offset]).0);
        });

    trace!("end paint");

    // The buffer length is exactly `width * height * 4`.
    RgbaImage::from_raw(size.width, size.height, rgba)
        .unwrap_or_else(|| unreachable!("RGBA buffer does not match the frame size"))
}
