use crate::foundation::core::Geometry;

/// Placement of a scaled clip frame inside the target frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LetterboxFit {
    pub draw_width: u32,
    pub draw_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Fit a clip into the target frame preserving aspect ratio.
///
/// Wider-than-target clips fit by width (bars above/below); everything else fits by height
/// (bars left/right). The scaled frame is centered and never exceeds the target dimensions.
pub fn letterbox_fit(clip_width: u32, clip_height: u32, target: Geometry) -> LetterboxFit {
    let clip_aspect = f64::from(clip_width) / f64::from(clip_height.max(1));
    let target_aspect = target.aspect();

    let (draw_w, draw_h) = if clip_aspect > target_aspect {
        let w = f64::from(target.width);
        (w, w / clip_aspect)
    } else {
        let h = f64::from(target.height);
        (h * clip_aspect, h)
    };

    let draw_width = (draw_w.round() as u32).clamp(1, target.width);
    let draw_height = (draw_h.round() as u32).clamp(1, target.height);

    LetterboxFit {
        draw_width,
        draw_height,
        offset_x: (target.width - draw_width) / 2,
        offset_y: (target.height - draw_height) / 2,
    }
}
