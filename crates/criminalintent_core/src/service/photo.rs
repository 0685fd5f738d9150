//! Photo downscaling arithmetic for crime thumbnails.
//!
//! Decoding stays with the platform; this module only decides how far a
//! source image should be subsampled to fit a target area.

/// Pixel dimensions as `(width, height)`.
pub type Dimensions = (u32, u32);

/// Subsample factor that fits `source` into `target`.
///
/// Returns `1` when the source already fits, otherwise the larger of the
/// width/height ratios rounded to the nearest integer (never below `1`).
/// Returns `None` when a target dimension is zero.
pub fn sample_size(source: Dimensions, target: Dimensions) -> Option<u32> {
    let (src_width, src_height) = source;
    let (dest_width, dest_height) = target;
    if dest_width == 0 || dest_height == 0 {
        return None;
    }

    if src_width <= dest_width && src_height <= dest_height {
        return Some(1);
    }

    let width_scale = f64::from(src_width) / f64::from(dest_width);
    let height_scale = f64::from(src_height) / f64::from(dest_height);
    let scale = width_scale.max(height_scale).round();

    Some((scale as u32).max(1))
}

/// Dimensions of `source` after subsampling to fit `target`.
pub fn scaled_dimensions(source: Dimensions, target: Dimensions) -> Option<Dimensions> {
    let factor = sample_size(source, target)?;
    Some((source.0 / factor, source.1 / factor))
}

#[cfg(test)]
mod tests {
    use super::{sample_size, scaled_dimensions};

    #[test]
    fn fitting_source_is_not_scaled() {
        assert_eq!(sample_size((640, 480), (1080, 1920)), Some(1));
    }

    #[test]
    fn larger_ratio_wins_and_rounds() {
        // 4000/1080 = 3.70, 3000/1920 = 1.56
        assert_eq!(sample_size((4000, 3000), (1080, 1920)), Some(4));
        // 1500/1000 = 1.5 rounds up
        assert_eq!(sample_size((1500, 100), (1000, 1000)), Some(2));
    }

    #[test]
    fn slight_overflow_never_drops_below_one() {
        assert_eq!(sample_size((1100, 100), (1000, 1000)), Some(1));
    }

    #[test]
    fn zero_target_is_rejected() {
        assert_eq!(sample_size((100, 100), (0, 100)), None);
        assert_eq!(scaled_dimensions((100, 100), (100, 0)), None);
    }

    #[test]
    fn scaled_dimensions_divide_by_factor() {
        assert_eq!(scaled_dimensions((4000, 3000), (1080, 1920)), Some((1000, 750)));
    }
}
