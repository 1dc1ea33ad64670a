use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::{FrameRgba8, OUTPUT_FPS};
use crate::foundation::error::{MergeError, MergeResult};

/// Metadata derived from a source clip once its container has been probed.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ClipInfo {
    pub path: PathBuf,
    /// Native pixel width.
    pub width: u32,
    /// Native pixel height.
    pub height: u32,
    /// Reported total length in seconds.
    pub duration_sec: f64,
}

/// A ready-to-play source clip.
///
/// Decoders yield frames from the clip head (position zero) at the pipeline's output frame rate,
/// and release their underlying decode resources on drop, including on error paths.
pub trait ClipDecoder {
    fn info(&self) -> &ClipInfo;

    /// Whether enough data is buffered to produce a frame.
    ///
    /// The sequencer retries ticks while this is false.
    fn ready(&self) -> bool;

    /// The next decoded frame, or `None` once the clip has drained.
    ///
    /// A per-frame failure is a `Composition` error; the sequencer logs and skips that tick.
    fn next_frame(&mut self) -> MergeResult<Option<FrameRgba8>>;
}

/// Turns an accepted file reference into a ready [`ClipDecoder`].
///
/// Failure to open or probe a clip is a `Load` error and aborts the whole merge.
pub trait ClipOpener {
    fn open(&self, path: &Path) -> MergeResult<Box<dyn ClipDecoder>>;
}

/// Probe a clip's metadata with `ffprobe`.
pub fn probe_clip(path: &Path) -> MergeResult<ClipInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| MergeError::load(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(MergeError::load(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| MergeError::load(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            MergeError::load(format!("no video stream found in '{}'", path.display()))
        })?;
    let width = video_stream
        .width
        .ok_or_else(|| MergeError::load("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| MergeError::load("missing video height from ffprobe"))?;
    if width == 0 || height == 0 {
        return Err(MergeError::load(format!(
            "clip '{}' reports zero natural dimensions",
            path.display()
        )));
    }
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(ClipInfo {
        path: path.to_path_buf(),
        width,
        height,
        duration_sec,
    })
}

/// Streaming clip decoder backed by the system `ffmpeg` binary.
///
/// We intentionally use the system `ffmpeg` rather than native bindings to avoid FFmpeg dev
/// header/lib requirements. The child decodes the clip from its start, resampled to the output
/// frame rate, and is killed when the decoder is dropped.
pub struct FfmpegClipDecoder {
    info: ClipInfo,
    child: Child,
    stdout: Option<ChildStdout>,
    frame_bytes: usize,
}

impl FfmpegClipDecoder {
    pub fn open(path: &Path) -> MergeResult<Self> {
        let info = probe_clip(path)?;
        Self::with_info(info)
    }

    fn with_info(info: ClipInfo) -> MergeResult<Self> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-i"])
            .arg(&info.path)
            .args([
                "-vf",
                &format!("fps={OUTPUT_FPS}"),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            MergeError::load(format!(
                "failed to spawn ffmpeg for '{}' (is it installed and on PATH?): {e}",
                info.path.display()
            ))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MergeError::load("failed to open ffmpeg stdout (unexpected)"))?;

        let frame_bytes = info.width as usize * info.height as usize * 4;
        Ok(Self {
            info,
            child,
            stdout: Some(stdout),
            frame_bytes,
        })
    }
}

impl ClipDecoder for FfmpegClipDecoder {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn ready(&self) -> bool {
        // Metadata is known and the child is streaming; probe already rejected zero dimensions.
        self.stdout.is_some()
    }

    fn next_frame(&mut self) -> MergeResult<Option<FrameRgba8>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; self.frame_bytes];
        let mut filled = 0usize;
        while filled < data.len() {
            match stdout.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(MergeError::composition(format!(
                        "read from ffmpeg decode pipe failed for '{}': {e}",
                        self.info.path.display()
                    )));
                }
            }
        }

        if filled == 0 {
            // Clean end of stream.
            self.stdout = None;
            return Ok(None);
        }
        if filled < data.len() {
            // A truncated trailing frame; drop it and report the clip as drained.
            self.stdout = None;
            tracing::warn!(
                path = %self.info.path.display(),
                got = filled,
                expected = data.len(),
                "discarding truncated trailing frame from decoder"
            );
            return Ok(None);
        }

        Ok(Some(FrameRgba8 {
            width: self.info.width,
            height: self.info.height,
            data,
        }))
    }
}

impl Drop for FfmpegClipDecoder {
    fn drop(&mut self) {
        // Release the transient decode handle even when the merge aborts partway.
        self.stdout = None;
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// [`ClipOpener`] that probes and decodes clips with the system ffmpeg tools.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegOpener;

impl ClipOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> MergeResult<Box<dyn ClipDecoder>> {
        Ok(Box::new(FfmpegClipDecoder::open(path)?))
    }
}
