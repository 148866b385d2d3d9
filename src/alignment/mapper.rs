use crate::alignment::warp::WarpingFunction;
use crate::types::{AlignedEvent, ScoreEvent};

/// Warn once a run of consecutive extrapolated events reaches this length.
pub const EXTRAPOLATION_RUN_WARN: usize = 8;
/// Warn once this share of all events is extrapolated.
pub const EXTRAPOLATION_SHARE_WARN: f64 = 0.1;

/// Projects every event onto the audio timeline, preserving order and count.
///
/// Starts map from the event position. Events with positive duration also map
/// their end position; point events reuse the start so `end == start`.
pub fn align_events(events: &[ScoreEvent], warp: &WarpingFunction) -> Vec<AlignedEvent> {
    events
        .iter()
        .map(|event| {
            let start = warp.map(event.position);
            let end = if event.duration > 0.0 {
                warp.map(event.end_position())
            } else {
                start
            };
            AlignedEvent {
                start: start.seconds,
                end: end.seconds,
                kind: event.kind,
                label: event.label.clone(),
                extra: event.extra.clone(),
                extrapolated: start.extrapolated || end.extrapolated,
            }
        })
        .collect()
}

/// Extrapolation tallies over one aligned sequence.
///
/// Scattered extrapolated events near the edges of a recording are normal.
/// A long run or a large share usually means the warping path does not cover
/// the score range, e.g. a performance that skips repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MappingStats {
    pub events: usize,
    pub extrapolated: usize,
    pub longest_extrapolated_run: usize,
}

impl MappingStats {
    pub fn collect(aligned: &[AlignedEvent]) -> Self {
        let mut stats = Self {
            events: aligned.len(),
            ..Self::default()
        };
        let mut run = 0usize;
        for event in aligned {
            if event.extrapolated {
                stats.extrapolated += 1;
                run += 1;
                stats.longest_extrapolated_run = stats.longest_extrapolated_run.max(run);
            } else {
                run = 0;
            }
        }
        stats
    }

    pub fn suspicious(&self) -> bool {
        if self.events == 0 {
            return false;
        }
        self.longest_extrapolated_run >= EXTRAPOLATION_RUN_WARN
            || self.extrapolated as f64 / self.events as f64 >= EXTRAPOLATION_SHARE_WARN
    }
}
