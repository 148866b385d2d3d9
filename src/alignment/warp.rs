use crate::error::AlignError;
use crate::types::{MappedTime, WarpAnchor};

/// Piecewise-linear map from score time (quarterbeats) to audio time
/// (seconds), built from the anchor pairs of a warping path.
///
/// Queries between anchors interpolate linearly. Queries outside the anchor
/// span clamp to the nearest endpoint and come back flagged as extrapolated;
/// `map` itself never fails.
#[derive(Debug, Clone)]
pub struct WarpingFunction {
    anchors: Vec<WarpAnchor>,
}

impl WarpingFunction {
    /// Validates and wraps an anchor sequence.
    ///
    /// Requires at least two anchors, finite values and both coordinates
    /// non-decreasing. Zero-width segments (repeated score times) are legal.
    pub fn from_anchors(anchors: Vec<WarpAnchor>) -> Result<Self, AlignError> {
        if anchors.len() < 2 {
            return Err(AlignError::malformed_path(format!(
                "need at least 2 anchors, got {}",
                anchors.len()
            )));
        }
        for (idx, anchor) in anchors.iter().enumerate() {
            if !anchor.score_time.is_finite() || !anchor.audio_time.is_finite() {
                return Err(AlignError::malformed_path(format!(
                    "anchor {idx} is not finite: ({}, {})",
                    anchor.score_time, anchor.audio_time
                )));
            }
        }
        for (idx, pair) in anchors.windows(2).enumerate() {
            if pair[1].score_time < pair[0].score_time {
                return Err(AlignError::malformed_path(format!(
                    "score time decreases at anchor {}: {} -> {}",
                    idx + 1,
                    pair[0].score_time,
                    pair[1].score_time
                )));
            }
            if pair[1].audio_time < pair[0].audio_time {
                return Err(AlignError::malformed_path(format!(
                    "audio time decreases at anchor {}: {} -> {}",
                    idx + 1,
                    pair[0].audio_time,
                    pair[1].audio_time
                )));
            }
        }
        Ok(Self { anchors })
    }

    /// Projects one score instant onto the audio timeline.
    ///
    /// A NaN query clamps to the first anchor and comes back flagged as
    /// extrapolated.
    pub fn map(&self, score_time: f64) -> MappedTime {
        let first = self.anchors[0];
        let last = self.anchors[self.anchors.len() - 1];
        // NaN fails every ordered comparison below.
        if score_time.is_nan() {
            return MappedTime {
                seconds: first.audio_time,
                extrapolated: true,
            };
        }
        if score_time < first.score_time {
            return MappedTime {
                seconds: first.audio_time,
                extrapolated: true,
            };
        }
        if score_time > last.score_time {
            return MappedTime {
                seconds: last.audio_time,
                extrapolated: true,
            };
        }
        // First anchor at or past the query; hi == 0 only when the query
        // sits exactly on the first anchor.
        let hi = self
            .anchors
            .partition_point(|anchor| anchor.score_time < score_time);
        if hi == 0 {
            return MappedTime {
                seconds: first.audio_time,
                extrapolated: false,
            };
        }
        let lo = self.anchors[hi - 1];
        let hi = self.anchors[hi];
        let span = hi.score_time - lo.score_time;
        let seconds = if span == 0.0 {
            lo.audio_time
        } else {
            lo.audio_time + (score_time - lo.score_time) / span * (hi.audio_time - lo.audio_time)
        };
        MappedTime {
            seconds,
            extrapolated: false,
        }
    }

    /// Covered score-time range, first to last anchor.
    pub fn span(&self) -> (f64, f64) {
        (
            self.anchors[0].score_time,
            self.anchors[self.anchors.len() - 1].score_time,
        )
    }

    /// Audio time of the last anchor, the clamp target for late queries.
    pub fn end_audio_time(&self) -> f64 {
        self.anchors[self.anchors.len() - 1].audio_time
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors(pairs: &[(f64, f64)]) -> Vec<WarpAnchor> {
        pairs
            .iter()
            .map(|(score, audio)| WarpAnchor::new(*score, *audio))
            .collect()
    }

    #[test]
    fn interpolates_between_anchors() {
        let warp =
            WarpingFunction::from_anchors(anchors(&[(0.0, 0.0), (4.0, 5.0), (8.0, 20.0)])).unwrap();
        let mid = warp.map(2.0);
        assert!((mid.seconds - 2.5).abs() < 1e-12);
        assert!(!mid.extrapolated);
    }

    #[test]
    fn clamps_and_flags_outside_span() {
        let warp =
            WarpingFunction::from_anchors(anchors(&[(0.0, 0.0), (4.0, 5.0), (8.0, 20.0)])).unwrap();
        let after = warp.map(10.0);
        assert_eq!(after.seconds, 20.0);
        assert!(after.extrapolated);
        let before = warp.map(-1.0);
        assert_eq!(before.seconds, 0.0);
        assert!(before.extrapolated);
    }

    #[test]
    fn endpoints_map_exactly_without_flag() {
        let warp = WarpingFunction::from_anchors(anchors(&[(1.0, 0.5), (9.0, 30.0)])).unwrap();
        let start = warp.map(1.0);
        assert_eq!(start.seconds, 0.5);
        assert!(!start.extrapolated);
        let end = warp.map(9.0);
        assert_eq!(end.seconds, 30.0);
        assert!(!end.extrapolated);
    }

    #[test]
    fn zero_width_segment_maps_to_left_value() {
        // A held score instant spanning audio time, e.g. a fermata.
        let warp =
            WarpingFunction::from_anchors(anchors(&[(0.0, 0.0), (4.0, 5.0), (4.0, 9.0), (8.0, 12.0)]))
                .unwrap();
        let held = warp.map(4.0);
        assert_eq!(held.seconds, 5.0);
        assert!(!held.extrapolated);
        // Past the fermata interpolation resumes from the later anchor.
        let after = warp.map(6.0);
        assert!((after.seconds - 10.5).abs() < 1e-12);
    }

    #[test]
    fn map_is_monotonic_within_the_span() {
        // Includes a zero-width riser at 4 and a duplicated anchor at 8.
        let warp = WarpingFunction::from_anchors(anchors(&[
            (0.0, 0.0),
            (4.0, 5.0),
            (4.0, 9.0),
            (8.0, 12.0),
            (8.0, 12.0),
            (10.0, 12.5),
        ]))
        .unwrap();
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=1000 {
            let t = step as f64 / 100.0;
            let mapped = warp.map(t);
            assert!(!mapped.extrapolated, "{t} lies inside the span");
            assert!(
                mapped.seconds >= previous,
                "map({t}) = {} dropped below {previous}",
                mapped.seconds
            );
            previous = mapped.seconds;
        }
    }

    #[test]
    fn non_finite_queries_clamp_and_flag() {
        let warp = WarpingFunction::from_anchors(anchors(&[(1.0, 0.5), (9.0, 30.0)])).unwrap();
        let nan = warp.map(f64::NAN);
        assert_eq!(nan.seconds, 0.5);
        assert!(nan.extrapolated);
        let early = warp.map(f64::NEG_INFINITY);
        assert_eq!(early.seconds, 0.5);
        assert!(early.extrapolated);
        let late = warp.map(f64::INFINITY);
        assert_eq!(late.seconds, 30.0);
        assert!(late.extrapolated);
    }

    #[test]
    fn rejects_short_and_unordered_paths() {
        let err = WarpingFunction::from_anchors(anchors(&[(0.0, 0.0)])).unwrap_err();
        assert_eq!(err.kind(), "MalformedWarpingPath");

        let err = WarpingFunction::from_anchors(anchors(&[(0.0, 0.0), (4.0, 5.0), (2.0, 7.0)]))
            .unwrap_err();
        assert!(err.to_string().contains("score time decreases at anchor 2"));

        let err = WarpingFunction::from_anchors(anchors(&[(0.0, 1.0), (4.0, 0.5)])).unwrap_err();
        assert!(err.to_string().contains("audio time decreases at anchor 1"));
    }

    #[test]
    fn rejects_non_finite_anchors() {
        let err =
            WarpingFunction::from_anchors(anchors(&[(0.0, 0.0), (f64::NAN, 5.0)])).unwrap_err();
        assert!(err.to_string().contains("anchor 1 is not finite"));
    }
}
