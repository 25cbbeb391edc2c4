//! Pure calculation functions for image dimensions.

/// Scale `source` down so its width is at most `target_width`, keeping the
/// aspect ratio. Images already narrow enough are left alone; never upscales.
///
/// ```
/// # use media_library::imaging::fit_to_width;
/// assert_eq!(fit_to_width((1280, 960), 640), (640, 480));
/// assert_eq!(fit_to_width((300, 200), 640), (300, 200));
/// ```
pub fn fit_to_width(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (w, h) = source;
    if w <= target_width || w == 0 {
        return source;
    }
    let height = (h as f64 * target_width as f64 / w as f64).round() as u32;
    (target_width, height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_is_scaled_to_target() {
        assert_eq!(fit_to_width((1920, 1080), 640), (640, 360));
    }

    #[test]
    fn portrait_keeps_aspect() {
        assert_eq!(fit_to_width((1000, 2000), 640), (640, 1280));
    }

    #[test]
    fn extreme_panorama_keeps_at_least_one_row() {
        assert_eq!(fit_to_width((100_000, 10), 640), (640, 1));
    }

    #[test]
    fn exact_width_is_untouched() {
        assert_eq!(fit_to_width((640, 480), 640), (640, 480));
    }
}
