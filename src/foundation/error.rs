pub type MergeResult<T> = Result<T, MergeError>;

/// Error taxonomy for the merge pipeline.
///
/// - `Selection` is handled at the input boundary and never enters the pipeline.
/// - `Load` and `Pipeline` are fatal to an in-progress merge; no partial output is published.
/// - `Composition` covers a single draw tick and is swallowed (logged) by the sequencer.
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    #[error("selection error: {0}")]
    Selection(String),

    #[error("load error: {0}")]
    Load(String),

    #[error("composition error: {0}")]
    Composition(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MergeError {
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Whether this error aborts a whole merge (as opposed to a single draw tick).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Composition(_))
    }
}
