use crate::foundation::error::{MergeError, MergeResult};

/// Output frames-per-second of the merged video.
///
/// The compositor produces frames on a fixed tick; input clips are resampled to this rate.
pub const OUTPUT_FPS: u32 = 30;

/// Frame rate as a rational, `num / den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> MergeResult<Self> {
        if num == 0 {
            return Err(MergeError::pipeline("Fps num must be > 0"));
        }
        if den == 0 {
            return Err(MergeError::pipeline("Fps den must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// The fixed output rate used by the merge pipeline.
    pub fn output() -> Self {
        Self {
            num: OUTPUT_FPS,
            den: 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert a clip duration to a draw-tick budget.
    ///
    /// This is the authoritative advance signal for the sequencer: a clip is considered finished
    /// after this many ticks, regardless of when its decoder actually drains. Always at least 1.
    pub fn secs_to_ticks(self, secs: f64) -> u64 {
        let ticks = (secs.max(0.0) * self.as_f64()).round() as u64;
        ticks.max(1)
    }
}

/// Pixel dimensions of the output frame (the target geometry of one merge).
///
/// Chosen once per merge from the first ready clip and immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> MergeResult<Self> {
        if width == 0 || height == 0 {
            return Err(MergeError::load("geometry width/height must be non-zero"));
        }
        Ok(Self { width, height })
    }

    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Byte length of one tightly packed RGBA8 frame at this geometry.
    pub fn frame_bytes(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// A decoded or composited frame as RGBA8 pixels, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba8 {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba8 {
    /// An opaque-black frame at the given geometry.
    pub fn black(geometry: Geometry) -> Self {
        let mut data = vec![0u8; geometry.frame_bytes()];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width: geometry.width,
            height: geometry.height,
            data,
        }
    }

    pub fn geometry(&self) -> MergeResult<Geometry> {
        Geometry::new(self.width, self.height)
    }

    /// Check that `data` length matches `width * height * 4`.
    pub fn validate(&self) -> MergeResult<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            return Err(MergeError::composition(format!(
                "frame data is {} bytes, expected {} for {}x{} rgba8",
                self.data.len(),
                expected,
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}
