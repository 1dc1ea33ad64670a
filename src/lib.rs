//! Sequential video merging: decode a queue of clips, letterbox each frame onto a fixed
//! canvas, and record the composited stream into a single output file.
//!
//! The pipeline runs in stages. [`ClipQueue`] holds the ordered selection and filters out
//! non-video entries. [`Sequencer`] drives one clip at a time through a [`FrameCompositor`]
//! at the fixed output rate, using each clip's reported duration as the advance signal.
//! [`negotiate_format`] picks the container/codec from a preference list, and a [`Recorder`]
//! turns composited frames into encoded bytes collected by an [`OutputAccumulator`].
//! [`MergeSession`] ties the stages together and owns the queue, status feed and artifact.
//!
//! Decoding, format probing and encoding are seamed behind the [`ClipDecoder`],
//! [`ClipOpener`], [`FormatSupport`] and [`Recorder`] traits; the `Ffmpeg*` implementations
//! spawn the system `ffmpeg`/`ffprobe` tools, while the in-memory doubles keep the whole
//! pipeline testable without them.

#![forbid(unsafe_code)]

pub mod clip;
pub mod compose;
pub mod encode;
pub mod foundation;
pub mod pipeline;
pub mod report;

pub use clip::queue::{ClipQueue, MIN_MERGE_CLIPS, QueuedClip, Selection, media_type_for_path};
pub use clip::source::{ClipDecoder, ClipInfo, ClipOpener, FfmpegClipDecoder, FfmpegOpener, probe_clip};
pub use compose::compositor::FrameCompositor;
pub use compose::letterbox::{LetterboxFit, letterbox_fit};
pub use encode::ffmpeg::{FfmpegRecorder, is_ffmpeg_on_path};
pub use encode::format::{
    FALLBACK_FORMAT, FORMAT_PREFERENCE, FfmpegFormatSupport, FormatSupport, negotiate_format,
    suggested_file_name,
};
pub use encode::output::{OutputAccumulator, OutputArtifact};
pub use encode::recorder::{InMemoryRecorder, Recorder, RecorderConfig};
pub use foundation::core::{Fps, FrameRgba8, Geometry, OUTPUT_FPS};
pub use foundation::error::{MergeError, MergeResult};
pub use pipeline::sequencer::{SequenceStats, Sequencer};
pub use pipeline::session::MergeSession;
pub use report::progress::{MergePhase, NullProgress, ProgressObserver};
pub use report::status::{STATUS_TTL, StatusFeed, StatusMessage, StatusSeverity};
