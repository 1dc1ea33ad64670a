use std::time::Duration;

use crate::clip::source::ClipDecoder;
use crate::compose::compositor::FrameCompositor;
use crate::encode::recorder::Recorder;
use crate::foundation::core::{FrameRgba8, Fps, Geometry};
use crate::foundation::error::{MergeError, MergeResult};

/// Draw ticks pushed after playback start is confirmed, before the duration budget counts
/// down. Tolerates decoders that report readiness before frames are actually decodable
/// (about 100 ms at the output rate).
pub const SETTLE_TICKS: u64 = 3;

/// Extra ticks pushed after the final clip so the recorder flushes its last fragment.
pub const TRAILING_FLUSH_TICKS: u64 = 3;

/// Readiness polls allowed per clip before the merge is declared stuck.
const READY_POLL_LIMIT: u64 = 300;

/// Pause between readiness polls; with [`READY_POLL_LIMIT`] this gives each clip roughly a
/// ten second window to buffer enough data.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(33);

/// Per-clip phases of the timing controller, in transition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipPhase {
    /// Waiting for buffered data and nonzero natural dimensions.
    AwaitingReady,
    /// Playback started from the clip head; first frame confirmed, settle ticks running.
    Playing,
    /// Composited drawing on every tick until the duration budget elapses.
    Draining,
    /// Clip finished; its decode handle is released before the next clip starts.
    Advance,
}

/// Counters for one sequencer run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceStats {
    pub clips_total: u64,
    /// Frames pushed to the recorder.
    pub ticks_pushed: u64,
    /// Ticks whose draw failed and was skipped (the previous frame was re-pushed).
    pub ticks_skipped: u64,
    /// Clips whose decoder drained before the duration budget elapsed.
    pub clips_drained_early: u64,
}

/// Advances through the clip queue in order, one clip fully consumed before the next begins.
///
/// The tick budget derived from each clip's reported duration is the authoritative advance
/// signal; decoder end-of-stream only stops drawing, it does not cut the clip short. This is a
/// known precision tradeoff for variable-frame-rate sources.
pub struct Sequencer {
    fps: Fps,
    compositor: FrameCompositor,
}

impl Sequencer {
    pub fn new(target: Geometry, fps: Fps) -> Self {
        Self {
            fps,
            compositor: FrameCompositor::new(target),
        }
    }

    pub fn target(&self) -> Geometry {
        self.compositor.target()
    }

    /// Sequence every clip, in queue order, into the recorder.
    ///
    /// Any fatal failure propagates and aborts the whole merge; per-tick draw failures are
    /// logged and skipped.
    pub fn run(
        &mut self,
        clips: Vec<Box<dyn ClipDecoder>>,
        recorder: &mut dyn Recorder,
    ) -> MergeResult<SequenceStats> {
        if clips.is_empty() {
            return Err(MergeError::pipeline("sequencer started with no clips"));
        }

        let mut stats = SequenceStats {
            clips_total: clips.len() as u64,
            ..SequenceStats::default()
        };

        let last = clips.len() - 1;
        for (index, mut decoder) in clips.into_iter().enumerate() {
            self.run_clip(decoder.as_mut(), recorder, index == last, &mut stats)?;
            // Advance: the decode handle is dropped here, before the next clip starts.
            drop(decoder);
        }
        Ok(stats)
    }

    fn run_clip(
        &mut self,
        decoder: &mut dyn ClipDecoder,
        recorder: &mut dyn Recorder,
        is_last: bool,
        stats: &mut SequenceStats,
    ) -> MergeResult<()> {
        let mut phase = ClipPhase::AwaitingReady;
        let path = decoder.info().path.clone();
        tracing::debug!(clip = %path.display(), ?phase, "clip queued for playback");

        let mut polls = 0u64;
        while !(decoder.ready() && decoder.info().width > 0 && decoder.info().height > 0) {
            polls += 1;
            if polls >= READY_POLL_LIMIT {
                return Err(MergeError::pipeline(format!(
                    "clip '{}' never reported ready",
                    path.display()
                )));
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }

        phase = ClipPhase::Playing;
        tracing::debug!(clip = %path.display(), ?phase, polls, "playback started");

        let budget = self.fps.secs_to_ticks(decoder.info().duration_sec);
        let mut drained = false;

        // Playback start is confirmed by the first decoded frame; the settle ticks then give
        // slow decoders time before the duration budget counts down.
        self.pull_and_draw(decoder, &mut drained, stats);
        for _ in 0..SETTLE_TICKS {
            self.push(recorder, stats)?;
        }

        phase = ClipPhase::Draining;
        tracing::debug!(clip = %path.display(), ?phase, budget, "draining");

        for _ in 0..budget {
            if !drained {
                self.pull_and_draw(decoder, &mut drained, stats);
            }
            self.push(recorder, stats)?;
        }
        if drained {
            stats.clips_drained_early += 1;
        }

        phase = ClipPhase::Advance;
        tracing::debug!(clip = %path.display(), ?phase, "clip finished");

        if is_last {
            for _ in 0..TRAILING_FLUSH_TICKS {
                self.push(recorder, stats)?;
            }
        }
        Ok(())
    }

    /// Pull the next frame and draw it; draw and decode hiccups are composition errors,
    /// swallowed to keep the sequence alive (the previous frame stays in the buffer).
    fn pull_and_draw(
        &mut self,
        decoder: &mut dyn ClipDecoder,
        drained: &mut bool,
        stats: &mut SequenceStats,
    ) {
        match decoder.next_frame() {
            Ok(Some(frame)) => self.draw(&frame, stats),
            Ok(None) => *drained = true,
            Err(e) => {
                stats.ticks_skipped += 1;
                tracing::warn!(error = %e, "decode tick failed, skipping draw");
            }
        }
    }

    fn draw(&mut self, frame: &FrameRgba8, stats: &mut SequenceStats) {
        if let Err(e) = self.compositor.composite(frame) {
            stats.ticks_skipped += 1;
            tracing::warn!(error = %e, "draw tick failed, skipping");
        }
    }

    fn push(&mut self, recorder: &mut dyn Recorder, stats: &mut SequenceStats) -> MergeResult<()> {
        recorder.push_frame(self.compositor.frame())?;
        stats.ticks_pushed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::source::ClipInfo;
    use crate::encode::recorder::{InMemoryRecorder, RecorderConfig};
    use std::path::PathBuf;
    use std::time::Instant;

    struct ScriptedDecoder {
        info: ClipInfo,
        frames_left: u64,
        value: u8,
        fail_first: u64,
        pulls_seen: u64,
    }

    impl ScriptedDecoder {
        fn new(value: u8, frames: u64, duration_sec: f64) -> Self {
            Self {
                info: ClipInfo {
                    path: PathBuf::from(format!("clip_{value}.mp4")),
                    width: 4,
                    height: 4,
                    duration_sec,
                },
                frames_left: frames,
                value,
                fail_first: 0,
                pulls_seen: 0,
            }
        }

        fn failing_first(mut self, pulls: u64) -> Self {
            self.fail_first = pulls;
            self
        }
    }

    impl ClipDecoder for ScriptedDecoder {
        fn info(&self) -> &ClipInfo {
            &self.info
        }

        fn ready(&self) -> bool {
            true
        }

        fn next_frame(&mut self) -> MergeResult<Option<FrameRgba8>> {
            self.pulls_seen += 1;
            if self.pulls_seen <= self.fail_first {
                return Err(MergeError::composition("not decodable yet"));
            }
            if self.frames_left == 0 {
                return Ok(None);
            }
            self.frames_left -= 1;
            Ok(Some(FrameRgba8 {
                width: 4,
                height: 4,
                data: vec![self.value; 64],
            }))
        }
    }

    fn run(clips: Vec<Box<dyn ClipDecoder>>) -> (InMemoryRecorder, SequenceStats) {
        let target = Geometry::new(4, 4).unwrap();
        let fps = Fps::output();
        let mut recorder = InMemoryRecorder::new();
        recorder
            .begin(RecorderConfig {
                geometry: target,
                fps,
                media_type: "video/webm".to_string(),
            })
            .unwrap();
        let mut seq = Sequencer::new(target, fps);
        let stats = seq.run(clips, &mut recorder).unwrap();
        (recorder, stats)
    }

    #[test]
    fn empty_clip_list_is_a_pipeline_error() {
        let target = Geometry::new(4, 4).unwrap();
        let mut seq = Sequencer::new(target, Fps::output());
        let mut recorder = InMemoryRecorder::new();
        assert!(seq.run(Vec::new(), &mut recorder).is_err());
    }

    #[test]
    fn tick_counts_follow_duration_budgets() {
        let clips: Vec<Box<dyn ClipDecoder>> = vec![
            Box::new(ScriptedDecoder::new(1, 1000, 1.0)),
            Box::new(ScriptedDecoder::new(2, 1000, 0.5)),
        ];
        let (recorder, stats) = run(clips);

        let expected = (SETTLE_TICKS + 30) + (SETTLE_TICKS + 15) + TRAILING_FLUSH_TICKS;
        assert_eq!(stats.ticks_pushed, expected);
        assert_eq!(recorder.frames().len() as u64, expected);
        assert_eq!(stats.clips_total, 2);
    }

    #[test]
    fn clips_are_composited_strictly_in_queue_order() {
        let clips: Vec<Box<dyn ClipDecoder>> = vec![
            Box::new(ScriptedDecoder::new(10, 1000, 0.5)),
            Box::new(ScriptedDecoder::new(20, 1000, 0.5)),
        ];
        let (recorder, _) = run(clips);

        let values: Vec<u8> = recorder.frames().iter().map(|f| f.data[0]).collect();
        let first_of_second = values.iter().position(|&v| v == 20).unwrap();
        assert!(values[..first_of_second].iter().all(|&v| v == 10));
        assert!(values[first_of_second..].iter().all(|&v| v == 20));
    }

    #[test]
    fn early_drained_clip_repushes_last_frame_for_remaining_budget() {
        // 2 decodable frames but a 1s budget: the stale frame keeps recording.
        let clips: Vec<Box<dyn ClipDecoder>> = vec![
            Box::new(ScriptedDecoder::new(7, 2, 1.0)),
            Box::new(ScriptedDecoder::new(8, 1000, 0.5)),
        ];
        let (recorder, stats) = run(clips);

        assert_eq!(stats.clips_drained_early, 1);
        let expected = (SETTLE_TICKS + 30) + (SETTLE_TICKS + 15) + TRAILING_FLUSH_TICKS;
        assert_eq!(recorder.frames().len() as u64, expected);
        // Every tick of the first clip carries its pixels, even after it drained.
        assert!(
            recorder.frames()[..(SETTLE_TICKS + 30) as usize]
                .iter()
                .all(|f| f.data[0] == 7)
        );
    }

    struct SlowReadyDecoder {
        inner: ScriptedDecoder,
        ready_at: Instant,
    }

    impl SlowReadyDecoder {
        fn new(value: u8, duration_sec: f64, delay: Duration) -> Self {
            Self {
                inner: ScriptedDecoder::new(value, 1000, duration_sec),
                ready_at: Instant::now() + delay,
            }
        }
    }

    impl ClipDecoder for SlowReadyDecoder {
        fn info(&self) -> &ClipInfo {
            self.inner.info()
        }

        fn ready(&self) -> bool {
            Instant::now() >= self.ready_at
        }

        fn next_frame(&mut self) -> MergeResult<Option<FrameRgba8>> {
            self.inner.next_frame()
        }
    }

    #[test]
    fn clip_that_needs_time_to_buffer_is_waited_for() {
        // Readiness arrives 20ms after open; the poll loop must span that gap.
        let clips: Vec<Box<dyn ClipDecoder>> = vec![
            Box::new(SlowReadyDecoder::new(5, 0.5, Duration::from_millis(20))),
            Box::new(ScriptedDecoder::new(6, 1000, 0.5)),
        ];
        let (recorder, stats) = run(clips);

        let expected = (SETTLE_TICKS + 15) * 2 + TRAILING_FLUSH_TICKS;
        assert_eq!(stats.ticks_pushed, expected);
        assert_eq!(recorder.frames()[0].data[0], 5);
    }

    #[test]
    fn decode_hiccups_are_swallowed_and_counted() {
        let clips: Vec<Box<dyn ClipDecoder>> = vec![
            Box::new(ScriptedDecoder::new(3, 1000, 0.5).failing_first(4)),
            Box::new(ScriptedDecoder::new(4, 1000, 0.5)),
        ];
        let (recorder, stats) = run(clips);

        assert_eq!(stats.ticks_skipped, 4);
        // Ticks are still pushed while draws are skipped (black frames before the first draw).
        let expected = (SETTLE_TICKS + 15) * 2 + TRAILING_FLUSH_TICKS;
        assert_eq!(recorder.frames().len() as u64, expected);
        assert_eq!(recorder.frames()[0].data[0], 0);
    }
}
