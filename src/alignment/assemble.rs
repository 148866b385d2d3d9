use crate::error::AlignError;
use crate::types::{AlignedEvent, EventKind, ScoreEvent};

/// Rows ready for the table writer. Always carries a header, even when no
/// event survived into the output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OutputTable {
    fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|name| name.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Seconds cell formatting: six decimals with trailing zeros trimmed,
/// integral values keep one decimal. Keeps outputs byte-stable across runs.
pub(crate) fn format_seconds(value: f64) -> String {
    let mut text = format!("{value:.6}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.push('0');
    }
    text
}

/// `start`, `label` rows, one per event.
pub fn compact_table(events: &[AlignedEvent]) -> OutputTable {
    let mut table = OutputTable::new(&["start", "label"]);
    for event in events {
        table
            .rows
            .push(vec![format_seconds(event.start), event.label.clone()]);
    }
    table
}

/// Everything: `start`, `end`, `label`, `kind`, the union of extra columns
/// in first-seen order, then the `extrapolated` flag.
pub fn full_table(events: &[AlignedEvent]) -> OutputTable {
    let mut extra_columns: Vec<String> = Vec::new();
    for event in events {
        for key in event.extra.keys() {
            if !extra_columns.iter().any(|column| column == key) {
                extra_columns.push(key.clone());
            }
        }
    }
    let mut columns = vec![
        "start".to_string(),
        "end".to_string(),
        "label".to_string(),
        "kind".to_string(),
    ];
    columns.extend(extra_columns.iter().cloned());
    columns.push("extrapolated".to_string());

    let mut rows = Vec::with_capacity(events.len());
    for event in events {
        let mut row = vec![
            format_seconds(event.start),
            format_seconds(event.end),
            event.label.clone(),
            event.kind.as_str().to_string(),
        ];
        for column in &extra_columns {
            row.push(event.extra.get(column).cloned().unwrap_or_default());
        }
        row.push(event.extrapolated.to_string());
        rows.push(row);
    }
    OutputTable { columns, rows }
}

/// `time`, `beat` rows for beat-grid timeline import: onset seconds paired
/// with a 1-based sequential beat index. Defined over notes only.
pub fn beat_timeline_table(events: &[AlignedEvent]) -> Result<OutputTable, AlignError> {
    let mut table = OutputTable::new(&["time", "beat"]);
    for (idx, event) in events.iter().enumerate() {
        if event.kind != EventKind::Note {
            return Err(AlignError::schema(
                "beat timeline",
                format!(
                    "event {idx} is {} but beat timelines are defined over notes only",
                    event.kind.as_str()
                ),
            ));
        }
        table
            .rows
            .push(vec![format_seconds(event.start), (idx + 1).to_string()]);
    }
    Ok(table)
}

/// `quarterbeats`, `seconds` anchor rows a later run can feed back in as a
/// precomputed warp source.
///
/// Every event contributes its onset; events with positive duration also
/// contribute their end where that score position is not already covered by
/// an onset. First occurrence wins on duplicate positions; rows come out
/// sorted by quarterbeat. `events` and `aligned` walk in lockstep, as
/// produced by `align_events`.
pub fn warp_map_table(events: &[ScoreEvent], aligned: &[AlignedEvent]) -> OutputTable {
    let mut starts: Vec<(f64, f64, usize)> = events
        .iter()
        .zip(aligned)
        .enumerate()
        .map(|(idx, (event, mapped))| (event.position, mapped.start, idx))
        .collect();
    starts.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.2.cmp(&b.2)));
    starts.dedup_by(|b, a| b.0 == a.0);

    let mut ends: Vec<(f64, f64, usize)> = events
        .iter()
        .zip(aligned)
        .enumerate()
        .filter(|(_, (event, _))| event.duration > 0.0)
        .map(|(idx, (event, mapped))| (event.end_position(), mapped.end, idx))
        .collect();
    ends.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.2.cmp(&b.2)));
    ends.dedup_by(|b, a| b.0 == a.0);
    ends.retain(|(position, _, _)| {
        starts
            .binary_search_by(|(start, _, _)| start.total_cmp(position))
            .is_err()
    });

    let mut anchors: Vec<(f64, f64)> = starts
        .into_iter()
        .chain(ends)
        .map(|(position, seconds, _)| (position, seconds))
        .collect();
    anchors.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut table = OutputTable::new(&["quarterbeats", "seconds"]);
    for (position, seconds) in anchors {
        table
            .rows
            .push(vec![format_seconds(position), format_seconds(seconds)]);
    }
    table
}
