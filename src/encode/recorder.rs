use crate::encode::output::OutputAccumulator;
use crate::foundation::core::{FrameRgba8, Fps, Geometry};
use crate::foundation::error::{MergeError, MergeResult};

/// Configuration handed to a [`Recorder`] when recording starts.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// Output frame geometry (the merge's target geometry).
    pub geometry: Geometry,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Negotiated format tag, e.g. `video/webm;codecs=vp9`.
    pub media_type: String,
}

/// Consumes composited frames in tick order and emits encoded fragments on finish.
///
/// Ordering contract: `push_frame` is called in strict tick order by a single sequencer; the
/// frame buffer is only valid for the duration of the call.
pub trait Recorder {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: RecorderConfig) -> MergeResult<()>;

    /// Push one composited frame at the configured geometry.
    fn push_frame(&mut self, frame: &FrameRgba8) -> MergeResult<()>;

    /// Stop recording and flush all encoded fragments into `out`.
    fn finish(&mut self, out: &mut OutputAccumulator) -> MergeResult<()>;
}

/// In-memory recorder for tests and debugging.
///
/// Stores every pushed frame and, on finish, emits the raw pixel stream as a single fragment
/// (preceded by an empty fragment, which the accumulator must discard).
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    cfg: Option<RecorderConfig>,
    frames: Vec<FrameRgba8>,
    finished: bool,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&RecorderConfig> {
        self.cfg.as_ref()
    }

    /// Borrow the captured frames in push order.
    pub fn frames(&self) -> &[FrameRgba8] {
        &self.frames
    }
}

impl Recorder for InMemoryRecorder {
    fn begin(&mut self, cfg: RecorderConfig) -> MergeResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba8) -> MergeResult<()> {
        let Some(cfg) = self.cfg.as_ref() else {
            return Err(MergeError::pipeline("recorder push_frame before begin"));
        };
        if self.finished {
            return Err(MergeError::pipeline("recorder push_frame after finish"));
        }
        if frame.width != cfg.geometry.width || frame.height != cfg.geometry.height {
            return Err(MergeError::pipeline(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.geometry.width, cfg.geometry.height
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self, out: &mut OutputAccumulator) -> MergeResult<()> {
        if self.cfg.is_none() {
            return Err(MergeError::pipeline("recorder finish before begin"));
        }
        if self.finished {
            return Err(MergeError::pipeline("recorder finished twice"));
        }
        self.finished = true;

        out.push_chunk(Vec::new())?;
        let mut payload = Vec::new();
        for frame in &self.frames {
            payload.extend_from_slice(&frame.data);
        }
        out.push_chunk(payload)?;
        Ok(())
    }
}
