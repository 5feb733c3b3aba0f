//! Overlay placement within the viewport

use watermark_types::{OverlayPosition, OverlaySize, ViewportGeometry};

/// Origin for the overlay given its alignment.
///
/// `size` is the last measured size, so right/bottom alignment lags one
/// measurement behind a content change.
pub fn compute_position(
    viewport: &ViewportGeometry,
    size: OverlaySize,
    align_top: bool,
    align_left: bool,
) -> OverlayPosition {
    let y = if align_top {
        viewport.top
    } else {
        viewport.bottom - size.height
    };
    let x = if align_left {
        viewport.left
    } else {
        viewport.right - size.width
    };
    OverlayPosition { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> ViewportGeometry {
        ViewportGeometry::new(0.0, 500.0, 0.0, 800.0)
    }

    #[test]
    fn test_bottom_right() {
        let pos = compute_position(&viewport(), OverlaySize::new(100.0, 20.0), false, false);
        assert_eq!(pos, OverlayPosition::new(700.0, 480.0));
    }

    #[test]
    fn test_top_left() {
        let pos = compute_position(&viewport(), OverlaySize::new(100.0, 20.0), true, true);
        assert_eq!(pos, OverlayPosition::new(0.0, 0.0));
    }

    #[test]
    fn test_mixed_alignment_with_offset_viewport() {
        let vp = ViewportGeometry::new(40.0, 640.0, 12.0, 1012.0);
        let size = OverlaySize::new(80.0, 18.0);
        assert_eq!(
            compute_position(&vp, size, true, false),
            OverlayPosition::new(932.0, 40.0)
        );
        assert_eq!(
            compute_position(&vp, size, false, true),
            OverlayPosition::new(12.0, 622.0)
        );
    }
}
