use crate::clip::queue::{ClipQueue, QueuedClip, Selection};
use crate::clip::source::ClipOpener;
use crate::encode::format::{FormatSupport, negotiate_format};
use crate::encode::output::{OutputAccumulator, OutputArtifact};
use crate::encode::recorder::{Recorder, RecorderConfig};
use crate::foundation::core::{Fps, Geometry};
use crate::foundation::error::{MergeError, MergeResult};
use crate::pipeline::sequencer::Sequencer;
use crate::report::progress::{MergePhase, ProgressObserver};
use crate::report::status::{StatusFeed, StatusSeverity};

/// One merge pipeline instance: clip queue, status feed and the current output artifact.
///
/// All pipeline state lives here rather than in globals, so independent sessions can run (and
/// be tested) side by side. A session survives across merges; a new successful merge supersedes
/// the previous artifact, a failed one leaves it untouched.
pub struct MergeSession {
    queue: ClipQueue,
    status: StatusFeed,
    artifact: Option<OutputArtifact>,
    merging: bool,
    fps: Fps,
}

impl Default for MergeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeSession {
    pub fn new() -> Self {
        Self {
            queue: ClipQueue::new(),
            status: StatusFeed::new(),
            artifact: None,
            merging: false,
            fps: Fps::output(),
        }
    }

    pub fn queue(&self) -> &ClipQueue {
        &self.queue
    }

    pub fn status(&self) -> &StatusFeed {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusFeed {
        &mut self.status
    }

    /// The artifact of the most recent successful merge.
    pub fn artifact(&self) -> Option<&OutputArtifact> {
        self.artifact.as_ref()
    }

    /// Whether the merge action should be enabled.
    pub fn merge_ready(&self) -> bool {
        self.queue.merge_ready() && !self.merging
    }

    /// Accept a selection batch into the queue; only video-typed entries are added.
    ///
    /// Returns the number of accepted clips, which is also reported in the status message.
    pub fn add_clips(&mut self, selections: &[Selection]) -> usize {
        if selections.is_empty() {
            return 0;
        }
        let added = self.queue.add_batch(selections);
        if added == 0 {
            self.status
                .post(StatusSeverity::Error, "please select video files");
        } else {
            self.status
                .post(StatusSeverity::Success, format!("{added} video file(s) added"));
        }
        added
    }

    /// Remove the queued clip at `index`.
    pub fn remove_clip(&mut self, index: usize) -> MergeResult<QueuedClip> {
        let removed = self.queue.remove(index)?;
        self.status.post(StatusSeverity::Info, "file removed");
        Ok(removed)
    }

    /// Run one merge over the queued clips.
    ///
    /// Requires at least two queued clips; otherwise a `Selection` error status is posted and
    /// no artifact is produced. Any fatal failure aborts the whole merge, posts a single
    /// generic error status and leaves the previous artifact in place. The busy flag is cleared
    /// on every exit path.
    pub fn merge(
        &mut self,
        opener: &dyn ClipOpener,
        support: &dyn FormatSupport,
        recorder: &mut dyn Recorder,
        progress: &mut dyn ProgressObserver,
    ) -> MergeResult<&OutputArtifact> {
        if self.merging {
            return Err(MergeError::pipeline("a merge is already in progress"));
        }
        if !self.queue.merge_ready() {
            self.status.post(
                StatusSeverity::Error,
                "at least two video files are required to merge",
            );
            return Err(MergeError::selection(format!(
                "merge requires at least two clips, queue holds {}",
                self.queue.len()
            )));
        }

        self.merging = true;
        let result = self.run_merge(opener, support, recorder, progress);
        // Cleanup step: the merge control is re-enabled regardless of success or failure.
        self.merging = false;

        match result {
            Ok(artifact) => {
                self.artifact = Some(artifact);
                self.status
                    .post(StatusSeverity::Success, "videos merged successfully");
                Ok(self.artifact.as_ref().expect("artifact just stored"))
            }
            Err(e) => {
                tracing::error!(error = %e, "merge failed");
                self.status.post(
                    StatusSeverity::Error,
                    "an error occurred while merging the videos",
                );
                Err(e)
            }
        }
    }

    fn run_merge(
        &self,
        opener: &dyn ClipOpener,
        support: &dyn FormatSupport,
        recorder: &mut dyn Recorder,
        progress: &mut dyn ProgressObserver,
    ) -> MergeResult<OutputArtifact> {
        progress.update(MergePhase::Loading);

        // A load failure on any clip aborts the whole merge; handles opened so far are
        // released as this vector unwinds.
        let mut decoders = Vec::with_capacity(self.queue.len());
        for clip in self.queue.entries() {
            decoders.push(opener.open(&clip.path)?);
        }

        let first = decoders.first().expect("queue holds at least two clips");
        let target = Geometry::new(first.info().width, first.info().height)?;
        let media_type = negotiate_format(support);
        tracing::info!(
            media_type,
            width = target.width,
            height = target.height,
            clips = decoders.len(),
            "merge started"
        );

        recorder.begin(RecorderConfig {
            geometry: target,
            fps: self.fps,
            media_type: media_type.to_string(),
        })?;

        progress.update(MergePhase::Compositing);
        let mut sequencer = Sequencer::new(target, self.fps);
        let stats = sequencer.run(decoders, recorder)?;

        progress.update(MergePhase::Finalizing);
        let mut accumulator = OutputAccumulator::new(media_type);
        recorder.finish(&mut accumulator)?;
        let artifact = accumulator.finalize().clone();

        progress.update(MergePhase::Complete);
        tracing::info!(
            ticks = stats.ticks_pushed,
            skipped = stats.ticks_skipped,
            bytes = artifact.len(),
            "merge complete"
        );
        Ok(artifact)
    }
}
