use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::format::encoder_for;
use crate::encode::output::OutputAccumulator;
use crate::encode::recorder::{Recorder, RecorderConfig};
use crate::foundation::core::FrameRgba8;
use crate::foundation::error::{MergeError, MergeResult};

/// Size of the fragments pushed into the accumulator when draining the encoded file.
const FRAGMENT_BYTES: usize = 1024 * 1024;

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Recorder backed by the system `ffmpeg` binary.
///
/// Raw RGBA frames are piped to a child encoding into a scratch file in the negotiated format;
/// `finish` waits for the encoder, drains the file into the accumulator as fragments, and
/// removes the scratch file. We intentionally use the system binary rather than native FFmpeg
/// bindings to avoid dev header/lib requirements.
#[derive(Default)]
pub struct FfmpegRecorder {
    active: Option<ActiveEncode>,
}

struct ActiveEncode {
    cfg: RecorderConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch_path: PathBuf,
}

impl FfmpegRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(cfg: &RecorderConfig) -> MergeResult<()> {
        let is_mp4 = cfg.media_type.contains("mp4");
        if is_mp4 && (cfg.geometry.width % 2 != 0 || cfg.geometry.height % 2 != 0) {
            // yuv420p mp4 output requires even dimensions.
            return Err(MergeError::pipeline(format!(
                "mp4 output requires even dimensions, got {}x{}",
                cfg.geometry.width, cfg.geometry.height
            )));
        }
        Ok(())
    }

    fn codec_args(media_type: &str) -> MergeResult<Vec<String>> {
        let encoder = encoder_for(media_type).ok_or_else(|| {
            MergeError::pipeline(format!("no ffmpeg encoder known for '{media_type}'"))
        })?;
        let mut args = vec!["-c:v".to_string(), encoder.to_string()];
        match encoder {
            "libx264" => args.extend(
                ["-pix_fmt", "yuv420p", "-movflags", "+faststart"]
                    .iter()
                    .map(|s| s.to_string()),
            ),
            "libvpx-vp9" => {
                args.extend(["-crf", "32", "-b:v", "0"].iter().map(|s| s.to_string()));
            }
            _ => args.extend(["-b:v", "1M"].iter().map(|s| s.to_string())),
        }
        Ok(args)
    }

    fn scratch_path(media_type: &str) -> PathBuf {
        let ext = if media_type.contains("mp4") {
            "mp4"
        } else {
            "webm"
        };
        std::env::temp_dir().join(format!(
            "clipmerge_record_{}_{}.{ext}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ))
    }
}

impl Recorder for FfmpegRecorder {
    fn begin(&mut self, cfg: RecorderConfig) -> MergeResult<()> {
        if self.active.is_some() {
            return Err(MergeError::pipeline("recorder begin while already recording"));
        }
        Self::validate(&cfg)?;
        if !is_ffmpeg_on_path() {
            return Err(MergeError::pipeline(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }

        let scratch_path = Self::scratch_path(&cfg.media_type);
        let fps = (cfg.fps.as_f64().round() as u32).max(1);

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args([
                "-y",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", cfg.geometry.width, cfg.geometry.height),
                "-r",
                &fps.to_string(),
                "-i",
                "pipe:0",
                "-an",
            ])
            .args(Self::codec_args(&cfg.media_type)?)
            .arg(&scratch_path);

        let mut child = cmd.spawn().map_err(|e| {
            MergeError::pipeline(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MergeError::pipeline("failed to open ffmpeg stdin (unexpected)"))?;

        self.active = Some(ActiveEncode {
            cfg,
            child,
            stdin: Some(stdin),
            scratch_path,
        });
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba8) -> MergeResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Err(MergeError::pipeline("recorder push_frame before begin"));
        };
        let geometry = active.cfg.geometry;
        if frame.width != geometry.width || frame.height != geometry.height {
            return Err(MergeError::pipeline(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, geometry.width, geometry.height
            )));
        }
        if frame.data.len() != geometry.frame_bytes() {
            return Err(MergeError::pipeline(
                "frame data size mismatch with width*height*4",
            ));
        }

        let Some(stdin) = active.stdin.as_mut() else {
            return Err(MergeError::pipeline("ffmpeg recorder is already finalized"));
        };
        stdin.write_all(&frame.data).map_err(|e| {
            MergeError::pipeline(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn finish(&mut self, out: &mut OutputAccumulator) -> MergeResult<()> {
        let Some(mut active) = self.active.take() else {
            return Err(MergeError::pipeline("recorder finish before begin"));
        };
        let guard = ScratchGuard(Some(active.scratch_path.clone()));

        drop(active.stdin.take());
        let output = active.child.wait_with_output().map_err(|e| {
            MergeError::pipeline(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MergeError::pipeline(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let encoded = std::fs::read(&active.scratch_path).map_err(|e| {
            MergeError::pipeline(format!(
                "failed to read encoded output '{}': {e}",
                active.scratch_path.display()
            ))
        })?;
        for fragment in encoded.chunks(FRAGMENT_BYTES) {
            out.push_chunk(fragment.to_vec())?;
        }

        drop(guard);
        Ok(())
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        // An aborted merge must not leave the child or the scratch file behind.
        if let Some(mut active) = self.active.take() {
            drop(active.stdin.take());
            let _ = active.child.kill();
            let _ = active.child.wait();
            let _ = std::fs::remove_file(&active.scratch_path);
        }
    }
}

struct ScratchGuard(Option<PathBuf>);

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
