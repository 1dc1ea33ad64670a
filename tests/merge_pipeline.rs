//! End-to-end merge runs over the in-memory seams, no external tools involved.

use std::path::{Path, PathBuf};

use clipmerge::{
    ClipDecoder, ClipInfo, ClipOpener, FormatSupport, FrameRgba8, InMemoryRecorder, MergeError,
    MergePhase, MergeResult, MergeSession, ProgressObserver, Selection,
    pipeline::sequencer::{SETTLE_TICKS, TRAILING_FLUSH_TICKS},
};

struct SolidDecoder {
    info: ClipInfo,
    value: u8,
}

impl ClipDecoder for SolidDecoder {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn ready(&self) -> bool {
        true
    }

    fn next_frame(&mut self) -> MergeResult<Option<FrameRgba8>> {
        let bytes = (self.info.width * self.info.height * 4) as usize;
        Ok(Some(FrameRgba8 {
            width: self.info.width,
            height: self.info.height,
            data: vec![self.value; bytes],
        }))
    }
}

/// Opens solid-color decoders from a fixed catalog; optionally fails for one path.
struct CatalogOpener {
    clips: Vec<(PathBuf, u8, u32, u32, f64)>,
    fail_path: Option<PathBuf>,
}

impl CatalogOpener {
    fn new(clips: Vec<(PathBuf, u8, u32, u32, f64)>) -> Self {
        Self {
            clips,
            fail_path: None,
        }
    }

    fn failing_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_path = Some(path.into());
        self
    }
}

impl ClipOpener for CatalogOpener {
    fn open(&self, path: &Path) -> MergeResult<Box<dyn ClipDecoder>> {
        if self.fail_path.as_deref() == Some(path) {
            return Err(MergeError::load(format!(
                "cannot decode '{}'",
                path.display()
            )));
        }
        let (p, value, width, height, duration_sec) = self
            .clips
            .iter()
            .find(|(p, ..)| p == path)
            .ok_or_else(|| MergeError::load(format!("unknown clip '{}'", path.display())))?;
        Ok(Box::new(SolidDecoder {
            info: ClipInfo {
                path: p.clone(),
                width: *width,
                height: *height,
                duration_sec: *duration_sec,
            },
            value: *value,
        }))
    }
}

struct FixedSupport(&'static str);

impl FormatSupport for FixedSupport {
    fn supports(&self, media_type: &str) -> bool {
        media_type == self.0
    }
}

#[derive(Default)]
struct ProgressLog {
    percents: Vec<u8>,
}

impl ProgressObserver for ProgressLog {
    fn update(&mut self, phase: MergePhase) {
        self.percents.push(phase.percent());
    }
}

fn seeded_session() -> (MergeSession, CatalogOpener) {
    let mut session = MergeSession::new();
    session.add_clips(&[
        Selection::new("a.mp4", "video/mp4"),
        Selection::new("b.mp4", "video/mp4"),
    ]);
    // First clip 6x4 at 3s sets the target geometry; second is 4x6 at 2s, letterboxed.
    let opener = CatalogOpener::new(vec![
        (PathBuf::from("a.mp4"), 10, 6, 4, 3.0),
        (PathBuf::from("b.mp4"), 200, 4, 6, 2.0),
    ]);
    (session, opener)
}

#[test]
fn merge_produces_one_artifact_with_budgeted_tick_count() {
    let (mut session, opener) = seeded_session();
    let support = FixedSupport("video/webm;codecs=vp9");
    let mut recorder = InMemoryRecorder::new();
    let mut progress = ProgressLog::default();

    let artifact = session
        .merge(&opener, &support, &mut recorder, &mut progress)
        .unwrap();

    assert_eq!(artifact.media_type(), "video/webm;codecs=vp9");
    assert_eq!(artifact.suggested_file_name(), "merged_video.webm");

    // 3s and 2s clips at 30 fps, plus settle and trailing flush ticks.
    let ticks = (SETTLE_TICKS + 90) + (SETTLE_TICKS + 60) + TRAILING_FLUSH_TICKS;
    let frame_bytes = 6 * 4 * 4;
    assert_eq!(artifact.len() as u64, ticks * frame_bytes);

    let cfg = recorder.config().unwrap();
    assert_eq!(cfg.geometry.width, 6);
    assert_eq!(cfg.geometry.height, 4);
    assert_eq!(cfg.media_type, "video/webm;codecs=vp9");
}

#[test]
fn first_clip_frames_all_precede_second_clip_frames() {
    let (mut session, opener) = seeded_session();
    let support = FixedSupport("video/webm");
    let mut recorder = InMemoryRecorder::new();

    session
        .merge(&opener, &support, &mut recorder, &mut ProgressLog::default())
        .unwrap();

    // Pixel (3, 2) lies inside the second clip's pillarboxed draw region, so it carries the
    // clip color in both halves of the recording.
    let center = (2 * 6 + 3) * 4;
    let values: Vec<u8> = recorder.frames().iter().map(|f| f.data[center]).collect();
    let switch = values.iter().position(|&v| v == 200).unwrap();
    assert!(values[..switch].iter().all(|&v| v == 10));
    assert!(values[switch..].iter().all(|&v| v == 200));
}

#[test]
fn progress_hits_every_milestone_in_order() {
    let (mut session, opener) = seeded_session();
    let support = FixedSupport("video/mp4;codecs=h264");
    let mut recorder = InMemoryRecorder::new();
    let mut progress = ProgressLog::default();

    session
        .merge(&opener, &support, &mut recorder, &mut progress)
        .unwrap();

    assert_eq!(progress.percents, vec![0, 30, 80, 100]);
}

#[test]
fn unsupported_preferences_fall_back_to_webm() {
    let (mut session, opener) = seeded_session();
    let support = FixedSupport("nothing/anyone-supports");
    let mut recorder = InMemoryRecorder::new();

    let artifact = session
        .merge(&opener, &support, &mut recorder, &mut ProgressLog::default())
        .unwrap();
    assert_eq!(artifact.media_type(), "video/webm");
    assert_eq!(artifact.suggested_file_name(), "merged_video.webm");
}

#[test]
fn load_failure_leaves_no_artifact_and_allows_retry() {
    let (mut session, opener) = seeded_session();
    let failing = CatalogOpener::new(opener.clips.clone()).failing_on("b.mp4");
    let support = FixedSupport("video/webm");
    let mut recorder = InMemoryRecorder::new();

    let err = session
        .merge(&failing, &support, &mut recorder, &mut ProgressLog::default())
        .unwrap_err();
    assert!(matches!(err, MergeError::Load(_)));
    assert!(session.artifact().is_none());
    assert!(session.merge_ready());

    // Same session recovers once the clip becomes openable.
    let mut recorder = InMemoryRecorder::new();
    session
        .merge(&opener, &support, &mut recorder, &mut ProgressLog::default())
        .unwrap();
    assert!(session.artifact().is_some());
}

#[test]
fn successful_merge_replaces_the_previous_artifact() {
    let (mut session, opener) = seeded_session();
    let mut recorder = InMemoryRecorder::new();

    session
        .merge(
            &opener,
            &FixedSupport("video/webm"),
            &mut recorder,
            &mut ProgressLog::default(),
        )
        .unwrap();
    let first = session.artifact().unwrap().clone();

    let mut recorder = InMemoryRecorder::new();
    session
        .merge(
            &opener,
            &FixedSupport("video/mp4;codecs=h264"),
            &mut recorder,
            &mut ProgressLog::default(),
        )
        .unwrap();
    let second = session.artifact().unwrap();
    assert_eq!(first.media_type(), "video/webm");
    assert_eq!(second.media_type(), "video/mp4;codecs=h264");
}
