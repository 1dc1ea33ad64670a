/// Coarse merge milestones reported to the presentation layer.
///
/// The percentages are advisory labels, not a precise progress metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePhase {
    /// Clip loading has started.
    Loading,
    /// Decoding and compositing are running.
    Compositing,
    /// The recorder is being finalized.
    Finalizing,
    /// The merge finished and an artifact was produced.
    Complete,
}

impl MergePhase {
    pub fn percent(self) -> u8 {
        match self {
            Self::Loading => 0,
            Self::Compositing => 30,
            Self::Finalizing => 80,
            Self::Complete => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Loading => "loading clips",
            Self::Compositing => "merging clips",
            Self::Finalizing => "finalizing output",
            Self::Complete => "complete",
        }
    }
}

/// Receives milestone updates during a merge.
pub trait ProgressObserver {
    fn update(&mut self, phase: MergePhase);
}

/// Observer that ignores all updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn update(&mut self, _phase: MergePhase) {}
}
