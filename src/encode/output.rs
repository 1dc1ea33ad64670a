use std::path::Path;

use crate::encode::format::suggested_file_name;
use crate::foundation::error::{MergeError, MergeResult};

/// The finished merged video, tagged with the negotiated format.
///
/// Created exactly once per successful merge and handed to the presentation layer for preview
/// and saving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputArtifact {
    media_type: String,
    data: Vec<u8>,
}

impl OutputArtifact {
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File name whose extension reflects the negotiated format.
    pub fn suggested_file_name(&self) -> &'static str {
        suggested_file_name(&self.media_type)
    }

    /// Write the artifact to disk (the save/download collaborator).
    pub fn write_to(&self, path: &Path) -> MergeResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MergeError::pipeline(format!(
                        "failed to create output directory '{}': {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        std::fs::write(path, &self.data).map_err(|e| {
            MergeError::pipeline(format!(
                "failed to write artifact to '{}': {e}",
                path.display()
            ))
        })
    }
}

/// Collects encoded fragments while recording is active and finalizes them exactly once.
///
/// Zero-size fragments are discarded. Pushing after finalize is a programming error; it is
/// rejected and the already-produced artifact is left untouched.
#[derive(Debug)]
pub struct OutputAccumulator {
    media_type: String,
    chunks: Vec<Vec<u8>>,
    artifact: Option<OutputArtifact>,
}

impl OutputAccumulator {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            chunks: Vec::new(),
            artifact: None,
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.artifact.is_some()
    }

    /// Append one encoded fragment. Empty fragments are dropped.
    pub fn push_chunk(&mut self, chunk: Vec<u8>) -> MergeResult<()> {
        if self.artifact.is_some() {
            return Err(MergeError::pipeline(
                "fragment pushed after the accumulator was finalized",
            ));
        }
        if chunk.is_empty() {
            return Ok(());
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Combine all fragments into the output artifact.
    ///
    /// Calling finalize again is a no-op returning the same artifact.
    pub fn finalize(&mut self) -> &OutputArtifact {
        if self.artifact.is_none() {
            let total = self.chunks.iter().map(Vec::len).sum();
            let mut data = Vec::with_capacity(total);
            for chunk in self.chunks.drain(..) {
                data.extend_from_slice(&chunk);
            }
            self.artifact = Some(OutputArtifact {
                media_type: self.media_type.clone(),
                data,
            });
        }
        self.artifact
            .as_ref()
            .expect("artifact present after finalize")
    }
}
