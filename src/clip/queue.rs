use std::path::{Path, PathBuf};

use crate::foundation::error::{MergeError, MergeResult};

/// Minimum number of queued clips before a merge may begin.
pub const MIN_MERGE_CLIPS: usize = 2;

/// One file reference handed to the queue by the file-selection boundary,
/// together with its declared media type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub path: PathBuf,
    pub media_type: String,
}

impl Selection {
    pub fn new(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            media_type: media_type.into(),
        }
    }

    /// Build a selection whose media type is guessed from the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = media_type_for_path(&path);
        Self { path, media_type }
    }
}

/// Best-effort media type from a file extension.
///
/// Unknown extensions map to `application/octet-stream` and will be rejected by the queue.
pub fn media_type_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let media_type = match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mpg") | Some("mpeg") => "video/mpeg",
        _ => "application/octet-stream",
    };
    media_type.to_string()
}

/// A clip accepted into the queue, in user addition order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedClip {
    pub path: PathBuf,
    pub media_type: String,
}

/// Ordered queue of accepted clips.
///
/// Only `video/*` selections are accepted. Removal by index re-indexes the
/// remaining clips; a merge may begin once at least [`MIN_MERGE_CLIPS`] are queued.
#[derive(Clone, Debug, Default)]
pub struct ClipQueue {
    entries: Vec<QueuedClip>,
}

impl ClipQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the video-typed entries of a selection batch, preserving order.
    ///
    /// Returns the number of entries accepted (the count reported to the user).
    pub fn add_batch(&mut self, selections: &[Selection]) -> usize {
        let mut added = 0;
        for sel in selections {
            if !sel.media_type.starts_with("video/") {
                tracing::debug!(
                    path = %sel.path.display(),
                    media_type = %sel.media_type,
                    "rejected non-video selection"
                );
                continue;
            }
            self.entries.push(QueuedClip {
                path: sel.path.clone(),
                media_type: sel.media_type.clone(),
            });
            added += 1;
        }
        added
    }

    /// Remove the clip at `index`; clips after it shift down by one.
    pub fn remove(&mut self, index: usize) -> MergeResult<QueuedClip> {
        if index >= self.entries.len() {
            return Err(MergeError::selection(format!(
                "clip index {index} out of range (queue holds {})",
                self.entries.len()
            )));
        }
        Ok(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueuedClip] {
        &self.entries
    }

    /// Whether the queue holds enough clips for a merge.
    pub fn merge_ready(&self) -> bool {
        self.entries.len() >= MIN_MERGE_CLIPS
    }
}
