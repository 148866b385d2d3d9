use std::path::PathBuf;

/// Shape of the primary output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Two columns: onset in seconds and label text.
    Compact,
    /// Every source column plus start, end, kind and the extrapolation flag.
    Full,
    /// Note onsets paired with a sequential 1-based beat index.
    BeatTimeline,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
            Self::BeatTimeline => "beat-timeline",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlignerConfig {
    pub mode: OutputMode,
    /// Also write the quarterbeat-to-seconds warp map beside the primary
    /// artifact so later runs can reuse it.
    pub warp_map: bool,
    /// Directory for derived output names. `None` writes beside the audio.
    pub output_dir: Option<PathBuf>,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Compact,
            warp_map: false,
            output_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligner_config_default() {
        let config = AlignerConfig::default();
        assert_eq!(config.mode, OutputMode::Compact);
        assert!(!config.warp_map);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn mode_strings() {
        assert_eq!(OutputMode::Compact.as_str(), "compact");
        assert_eq!(OutputMode::Full.as_str(), "full");
        assert_eq!(OutputMode::BeatTimeline.as_str(), "beat-timeline");
    }
}
