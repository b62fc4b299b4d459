//! CPU frame rendering.

use num::Complex;

use crate::{
    colour::palette_index,
    escape::escape_value,
    frame::Frame,
    screen::Size,
    zoom::Viewport,
    Result,
};

/// Renders one frame in double precision.
///
/// Pixel `(x, y)` samples `c = (real_min + x / scale) + (imag_min + y / scale)i`
/// where `scale = width / (real_max - real_min)`.
pub fn render_frame(viewport: &Viewport, size: Size, palette_len: usize) -> Result<Frame> {
    let scale = viewport.scale(size);
    let mut pixels = vec![0u8; size.pixel_count()];
    for (y, row) in pixels.chunks_mut(size.width as usize).enumerate() {
        let imag = viewport.imag_min + y as f64 / scale;
        for (x, pixel) in row.iter_mut().enumerate() {
            let c = Complex::new(viewport.real_min + x as f64 / scale, imag);
            *pixel = palette_index(escape_value(c), palette_len);
        }
    }
    Frame::new(size, pixels)
}
