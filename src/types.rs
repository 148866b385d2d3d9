use std::collections::BTreeMap;
use std::path::PathBuf;

/// Category of a symbolic annotation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Note,
    Harmony,
    Cadence,
    Other,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Harmony => "harmony",
            Self::Cadence => "cadence",
            Self::Other => "other",
        }
    }
}

/// One symbolic event read from an annotation table.
///
/// Positions and durations count quarterbeats from the start of the piece,
/// already shifted by the corpus offset so the first event never sits at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEvent {
    /// Onset in quarterbeats. Non-decreasing within one annotation file.
    pub position: f64,
    /// Length in quarterbeats, 0.0 for point events such as cadences.
    pub duration: f64,
    pub kind: EventKind,
    /// Display text carried into the output, may be empty.
    pub label: String,
    /// Remaining source columns, preserved verbatim.
    pub extra: BTreeMap<String, String>,
}

impl ScoreEvent {
    /// Point event with no duration and no extra columns.
    pub fn point(position: f64, kind: EventKind, label: impl Into<String>) -> Self {
        Self {
            position,
            duration: 0.0,
            kind,
            label: label.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn end_position(&self) -> f64 {
        self.position + self.duration
    }
}

/// One anchor pair of a warping path: score time in quarterbeats against
/// audio time in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpAnchor {
    pub score_time: f64,
    pub audio_time: f64,
}

impl WarpAnchor {
    pub fn new(score_time: f64, audio_time: f64) -> Self {
        Self {
            score_time,
            audio_time,
        }
    }
}

/// Result of projecting one score instant onto the audio timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedTime {
    pub seconds: f64,
    /// True when the instant fell outside the warping path span and was
    /// clamped to the nearest anchor.
    pub extrapolated: bool,
}

/// A score event projected onto the audio timeline.
///
/// `start` and `end` are audio seconds with `end >= start`; point events
/// carry `end == start`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedEvent {
    pub start: f64,
    pub end: f64,
    pub kind: EventKind,
    pub label: String,
    pub extra: BTreeMap<String, String>,
    /// True when either endpoint was clamped outside the warping path span.
    pub extrapolated: bool,
}

/// One unit of work: an audio recording, its notes table and optionally a
/// labels table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentJob {
    /// Mapping-file name cell, doubles as the output file name when set.
    pub name: Option<String>,
    pub audio: PathBuf,
    pub notes: PathBuf,
    pub labels: Option<PathBuf>,
    /// Explicit output file, overrides the derived name.
    pub output: Option<PathBuf>,
}

impl AlignmentJob {
    pub fn new(audio: impl Into<PathBuf>, notes: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            audio: audio.into(),
            notes: notes.into(),
            labels: None,
            output: None,
        }
    }

    pub fn with_labels(mut self, labels: impl Into<PathBuf>) -> Self {
        self.labels = Some(labels.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Identity used in logs and run reports: the explicit name when given,
    /// otherwise the audio file stem.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            if !name.is_empty() {
                return name.clone();
            }
        }
        match self.audio.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => self.audio.display().to_string(),
        }
    }
}

/// What a finished job produced, summarized into the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    /// Files written, primary artifact first.
    pub outputs: Vec<PathBuf>,
    /// Rows in the primary artifact.
    pub events: usize,
    pub extrapolated_events: usize,
    pub longest_extrapolated_run: usize,
}
