use crate::config::AlignerConfig;
use crate::pipeline::defaults::PrecomputedWarpSource;
use crate::pipeline::runtime::{AnnotationAligner, AnnotationAlignerParts};
use crate::pipeline::traits::WarpSource;

pub struct AnnotationAlignerBuilder {
    config: AlignerConfig,
    warp_source: Option<Box<dyn WarpSource>>,
}

impl AnnotationAlignerBuilder {
    pub fn new(config: AlignerConfig) -> Self {
        Self {
            config,
            warp_source: None,
        }
    }

    pub fn with_warp_source(mut self, warp_source: Box<dyn WarpSource>) -> Self {
        self.warp_source = Some(warp_source);
        self
    }

    pub fn build(self) -> AnnotationAligner {
        AnnotationAligner::from_parts(AnnotationAlignerParts {
            config: self.config,
            warp_source: self
                .warp_source
                .unwrap_or_else(|| Box::new(PrecomputedWarpSource)),
        })
    }
}

impl Default for AnnotationAlignerBuilder {
    fn default() -> Self {
        Self::new(AlignerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::config::OutputMode;
    use crate::error::AlignError;
    use crate::types::{ScoreEvent, WarpAnchor};

    use super::*;

    struct FixedWarpSource(Vec<WarpAnchor>);

    impl WarpSource for FixedWarpSource {
        fn anchors(
            &self,
            _audio: &Path,
            _notes: &[ScoreEvent],
        ) -> Result<Vec<WarpAnchor>, AlignError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn builder_defaults_to_precomputed_source() {
        let builder = AnnotationAlignerBuilder::default();
        assert!(builder.warp_source.is_none());
        let aligner = builder.build();
        assert_eq!(aligner.config().mode, OutputMode::Compact);
    }

    #[test]
    fn builder_keeps_injected_source_and_config() {
        let config = AlignerConfig {
            mode: OutputMode::Full,
            warp_map: true,
            output_dir: None,
        };
        let aligner = AnnotationAlignerBuilder::new(config)
            .with_warp_source(Box::new(FixedWarpSource(vec![
                WarpAnchor::new(0.0, 0.0),
                WarpAnchor::new(4.0, 5.0),
            ])))
            .build();
        assert_eq!(aligner.config().mode, OutputMode::Full);
        assert!(aligner.config().warp_map);
    }
}
