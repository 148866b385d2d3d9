use std::path::Path;

use crate::error::AlignError;
use crate::types::{ScoreEvent, WarpAnchor};

/// Seam to the external alignment service that relates score time to
/// recording time.
///
/// The audio path is an opaque handle; only the source interprets it. The
/// parsed note events are available for sources that derive anchors from
/// the score itself.
pub trait WarpSource: Send + Sync {
    fn anchors(&self, audio: &Path, notes: &[ScoreEvent]) -> Result<Vec<WarpAnchor>, AlignError>;
}
