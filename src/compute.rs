use std::ops::Range;

/// Workgroup size of `zoom.wgsl#zoom` along x (columns).
pub const ZOOM_WORKGROUP_SIZE_X: u32 = 8;

/// Workgroup size of `zoom.wgsl#zoom` along y (rows).
pub const ZOOM_WORKGROUP_SIZE_Y: u32 = 8;

/**
Dispatch size for `zoom.wgsl#zoom` over a band `width` pixels wide and `rows` tall.

[WGSL compute shader workgroups reference](https://www.w3.org/TR/WGSL/#compute-shader-workgroups)

Each invocation handles the pixel at `global_invocation_id.xy` of its band, so
the grid has to cover `width * rows` invocations. With an `8 x 8` workgroup
that is `ceil(width / 8) x ceil(rows / 8)` workgroups. Invocations past the
right or bottom edge of the band return without writing.

The largest image is `1440 x 1152`, which needs `180 x 144` workgroups, far
below the 65535 per-dimension limit.
*/
pub fn zoom_dispatch_size(width: u32, rows: u32) -> (u32, u32, u32) {
    (
        (width + ZOOM_WORKGROUP_SIZE_X - 1) / ZOOM_WORKGROUP_SIZE_X,
        (rows + ZOOM_WORKGROUP_SIZE_Y - 1) / ZOOM_WORKGROUP_SIZE_Y,
        1,
    )
}

/// Splits `height` rows into `count` horizontal bands; band `k` covers
/// `k * height / count .. (k + 1) * height / count`.
pub fn bands(height: u32, count: usize) -> Vec<Range<u32>> {
    let (height, count) = (height as u64, count as u64);
    (0..count)
        .map(|k| (k * height / count) as u32..((k + 1) * height / count) as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_covers_partial_workgroups() {
        assert_eq!(zoom_dispatch_size(640, 512), (80, 64, 1));
        assert_eq!(zoom_dispatch_size(1040, 277), (130, 35, 1));
        assert_eq!(zoom_dispatch_size(1, 1), (1, 1, 1));
    }

    #[test]
    fn bands_tile_the_image() {
        for count in 1..=7 {
            let bands = bands(1152, count);
            assert_eq!(bands.len(), count);
            assert_eq!(bands[0].start, 0);
            assert_eq!(bands[count - 1].end, 1152);
            for pair in bands.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn single_band_is_the_whole_image() {
        assert_eq!(bands(512, 1), vec![0..512]);
        assert_eq!(bands(832, 2), vec![0..416, 416..832]);
    }
}
