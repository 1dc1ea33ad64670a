use image::RgbaImage;
use image::imageops::FilterType;

use crate::compose::letterbox::letterbox_fit;
use crate::foundation::core::{FrameRgba8, Geometry};
use crate::foundation::error::{MergeError, MergeResult};

/// Paints clip frames into a reused output buffer at the target geometry.
///
/// Every draw fills the whole frame with opaque black first, then blits the clip scaled and
/// centered per [`letterbox_fit`]. The buffer is overwritten on every tick; it is never
/// persisted per frame.
pub struct FrameCompositor {
    target: Geometry,
    frame: FrameRgba8,
}

impl FrameCompositor {
    pub fn new(target: Geometry) -> Self {
        Self {
            target,
            frame: FrameRgba8::black(target),
        }
    }

    pub fn target(&self) -> Geometry {
        self.target
    }

    /// The most recently composited frame.
    ///
    /// Before the first successful draw this is opaque black.
    pub fn frame(&self) -> &FrameRgba8 {
        &self.frame
    }

    /// Composite one clip frame into the output buffer.
    ///
    /// Failures are `Composition` errors; the caller decides whether to skip the tick. The
    /// previous buffer contents survive a failed draw.
    pub fn composite(&mut self, clip_frame: &FrameRgba8) -> MergeResult<()> {
        clip_frame.validate()?;
        if clip_frame.width == 0 || clip_frame.height == 0 {
            return Err(MergeError::composition(
                "clip frame has zero dimensions, skipping draw",
            ));
        }

        let fit = letterbox_fit(clip_frame.width, clip_frame.height, self.target);

        let full = RgbaImage::from_raw(
            clip_frame.width,
            clip_frame.height,
            clip_frame.data.clone(),
        )
        .ok_or_else(|| MergeError::composition("clip frame buffer has unexpected length"))?;
        let scaled = if clip_frame.width == fit.draw_width && clip_frame.height == fit.draw_height {
            full
        } else {
            image::imageops::resize(&full, fit.draw_width, fit.draw_height, FilterType::Triangle)
        };
        let src = &scaled;

        // Black background, then the letterboxed blit.
        for px in self.frame.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }

        let target_w = self.target.width as usize;
        let draw_w = fit.draw_width as usize;
        let src_data = src.as_raw();
        for row in 0..fit.draw_height as usize {
            let dst_y = fit.offset_y as usize + row;
            let dst_off = (dst_y * target_w + fit.offset_x as usize) * 4;
            let src_off = row * draw_w * 4;
            self.frame.data[dst_off..dst_off + draw_w * 4]
                .copy_from_slice(&src_data[src_off..src_off + draw_w * 4]);
        }
        // Composited pixels are opaque regardless of source alpha.
        for px in self.frame.data.chunks_exact_mut(4) {
            px[3] = 255;
        }

        Ok(())
    }
}
