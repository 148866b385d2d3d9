use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AlignError;
use crate::table::Table;
use crate::types::{AlignmentJob, EventKind, ScoreEvent};

/// Quarterbeat columns in preference order. `quarterbeats_playthrough`
/// comes from unfolded scores with repeats expanded.
pub(crate) const QUARTERBEAT_COLUMNS: [&str; 2] = ["quarterbeats_playthrough", "quarterbeats"];

/// Added to every parsed position so the first event never sits at score
/// time 0, where clamping would pin it to the very start of the recording.
const QUARTERBEAT_OFFSET: f64 = 1.0;

/// Suffix of the primary output artifact.
pub const ALIGNED_SUFFIX: &str = "_aligned.csv";
/// Suffix of the exported warp-map artifact.
pub const WARP_MAP_SUFFIX: &str = ".quarters2seconds.csv";

const NOTES_TABLE_SUFFIX: &str = ".notes.tsv";
const UNFOLDED_MARKER: &str = "_unfolded";

/// Parses a quarterbeat cell: a fraction like `7/2` or a plain number.
/// Returns `None` for empty, unparsable or non-finite values.
pub fn parse_quarterbeats(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Some((numerator, denominator)) = cell.split_once('/') {
        let numerator: f64 = numerator.trim().parse().ok()?;
        let denominator: f64 = denominator.trim().parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator).filter(|value| value.is_finite());
    }
    cell.parse().ok().filter(|value: &f64| value.is_finite())
}

pub(crate) fn quarterbeat_column(table: &Table) -> Option<(usize, &'static str)> {
    QUARTERBEAT_COLUMNS
        .iter()
        .find_map(|name| table.column_index(name).map(|idx| (idx, *name)))
}

fn require_quarterbeat_column(table: &Table, context: &str) -> Result<(usize, &'static str), AlignError> {
    quarterbeat_column(table).ok_or_else(|| {
        AlignError::schema(
            context,
            "missing quarterbeat column ('quarterbeats_playthrough' or 'quarterbeats')",
        )
    })
}

fn parse_position(cell: &str, line: usize, context: &str) -> Result<f64, AlignError> {
    parse_quarterbeats(cell).ok_or_else(|| {
        AlignError::schema(
            context,
            format!("line {line}: unparsable quarterbeat value '{cell}'"),
        )
    })
}

/// Note events from a notes table.
///
/// Requires a quarterbeat column and `duration_qb`. The label comes from
/// `name` when present, else `midi`, else stays empty. Rows with an empty
/// quarterbeat cell (second endings in files that were not unfolded) are
/// skipped. All remaining columns pass through into `extra`.
pub fn notes_from_table(table: &Table, context: &str) -> Result<Vec<ScoreEvent>, AlignError> {
    let (qb_idx, _) = require_quarterbeat_column(table, context)?;
    let duration_idx = table.require_column("duration_qb", context)?;
    let label_idx = table.column_index("name").or_else(|| table.column_index("midi"));

    let mut events = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let line = row_idx + 2;
        let qb_cell = row[qb_idx].trim();
        if qb_cell.is_empty() {
            tracing::debug!(line, "skipping note row without a quarterbeat value");
            continue;
        }
        let position = parse_position(qb_cell, line, context)? + QUARTERBEAT_OFFSET;
        let duration_cell = row[duration_idx].trim();
        let duration = if duration_cell.is_empty() {
            0.0
        } else {
            parse_position(duration_cell, line, context)?
        };
        if duration < 0.0 {
            return Err(AlignError::schema(
                context,
                format!("line {line}: negative duration '{duration_cell}'"),
            ));
        }
        let label = label_idx.map(|idx| row[idx].clone()).unwrap_or_default();
        let mut extra = BTreeMap::new();
        for (idx, column) in table.columns.iter().enumerate() {
            if idx == qb_idx || idx == duration_idx || Some(idx) == label_idx {
                continue;
            }
            extra.insert(column.clone(), row[idx].clone());
        }
        events.push(ScoreEvent {
            position,
            duration,
            kind: EventKind::Note,
            label,
            extra,
        });
    }
    Ok(events)
}

/// Harmony events from a labels table, plus one Cadence point event for
/// every row with a non-empty `cadence` cell.
///
/// Requires a quarterbeat column and `label`; `duration_qb` is optional and
/// defaults to zero (point events).
pub fn labels_from_table(table: &Table, context: &str) -> Result<Vec<ScoreEvent>, AlignError> {
    let (qb_idx, _) = require_quarterbeat_column(table, context)?;
    let label_idx = table.require_column("label", context)?;
    let duration_idx = table.column_index("duration_qb");
    let cadence_idx = table.column_index("cadence");

    let mut events = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let line = row_idx + 2;
        let qb_cell = row[qb_idx].trim();
        if qb_cell.is_empty() {
            tracing::debug!(line, "skipping label row without a quarterbeat value");
            continue;
        }
        let position = parse_position(qb_cell, line, context)? + QUARTERBEAT_OFFSET;
        let duration = match duration_idx {
            Some(idx) if !row[idx].trim().is_empty() => {
                parse_position(row[idx].trim(), line, context)?
            }
            _ => 0.0,
        };
        let mut extra = BTreeMap::new();
        for (idx, column) in table.columns.iter().enumerate() {
            if idx == qb_idx || idx == label_idx || Some(idx) == duration_idx || Some(idx) == cadence_idx
            {
                continue;
            }
            extra.insert(column.clone(), row[idx].clone());
        }
        events.push(ScoreEvent {
            position,
            duration,
            kind: EventKind::Harmony,
            label: row[label_idx].clone(),
            extra: extra.clone(),
        });
        if let Some(idx) = cadence_idx {
            let cadence = row[idx].trim();
            if !cadence.is_empty() {
                events.push(ScoreEvent {
                    position,
                    duration: 0.0,
                    kind: EventKind::Cadence,
                    label: cadence.to_string(),
                    extra,
                });
            }
        }
    }
    Ok(events)
}

/// Rejects a notes/labels pair where one file was unfolded (repeats
/// expanded) and the other was not.
pub fn ensure_matching_unfolding(
    notes: &Table,
    labels: &Table,
    context: &str,
) -> Result<(), AlignError> {
    let notes_column = quarterbeat_column(notes).map(|(_, name)| name);
    let labels_column = quarterbeat_column(labels).map(|(_, name)| name);
    match (notes_column, labels_column) {
        (Some(from_notes), Some(from_labels)) if from_notes != from_labels => {
            Err(AlignError::schema(
                context,
                format!(
                    "notes use '{from_notes}' but labels use '{from_labels}'; unfold both files the same way"
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// One job per mapping row. Required columns `audio` and `notes`; optional
/// `labels` and `name` cells are absent when empty.
pub fn jobs_from_mapping(table: &Table, context: &str) -> Result<Vec<AlignmentJob>, AlignError> {
    let audio_idx = table.require_column("audio", context)?;
    let notes_idx = table.require_column("notes", context)?;
    let labels_idx = table.column_index("labels");
    let name_idx = table.column_index("name");

    let mut jobs = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let audio = row[audio_idx].trim();
        let notes = row[notes_idx].trim();
        if audio.is_empty() && notes.is_empty() {
            continue;
        }
        if audio.is_empty() || notes.is_empty() {
            return Err(AlignError::schema(
                context,
                format!("line {}: a job needs both audio and notes", row_idx + 2),
            ));
        }
        let mut job = AlignmentJob::new(audio, notes);
        if let Some(idx) = labels_idx {
            let cell = row[idx].trim();
            if !cell.is_empty() {
                job = job.with_labels(cell);
            }
        }
        if let Some(idx) = name_idx {
            let cell = row[idx].trim();
            if !cell.is_empty() {
                job = job.with_name(cell);
            }
        }
        jobs.push(job);
    }
    Ok(jobs)
}

/// Pairs every `*.notes.tsv` table in `notes_dir` with the first WAV
/// recording in `audio_dir` whose file name starts with the table's stem
/// (trailing `_unfolded` trimmed). Unmatched audio files are logged and
/// skipped. Jobs come back sorted by stem.
pub fn discover_jobs(audio_dir: &Path, notes_dir: &Path) -> Result<Vec<AlignmentJob>, AlignError> {
    let mut notes_files: Vec<(String, PathBuf)> = Vec::new();
    for entry in
        fs::read_dir(notes_dir).map_err(|e| AlignError::io("listing notes directory", notes_dir, e))?
    {
        let entry = entry.map_err(|e| AlignError::io("listing notes directory", notes_dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = file_name.strip_suffix(NOTES_TABLE_SUFFIX) {
            let stem = stem.strip_suffix(UNFOLDED_MARKER).unwrap_or(stem);
            notes_files.push((stem.to_string(), entry.path()));
        }
    }
    notes_files.sort();

    let mut audio_files: Vec<String> = Vec::new();
    for entry in
        fs::read_dir(audio_dir).map_err(|e| AlignError::io("listing audio directory", audio_dir, e))?
    {
        let entry = entry.map_err(|e| AlignError::io("listing audio directory", audio_dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if Path::new(&file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        {
            audio_files.push(file_name);
        }
    }
    audio_files.sort();

    let mut used = vec![false; audio_files.len()];
    let mut jobs = Vec::new();
    for (stem, notes_path) in &notes_files {
        let matched = audio_files
            .iter()
            .enumerate()
            .find(|(idx, name)| !used[*idx] && name.starts_with(stem.as_str()));
        match matched {
            Some((idx, name)) => {
                used[idx] = true;
                jobs.push(AlignmentJob::new(audio_dir.join(name), notes_path.clone()));
            }
            None => tracing::debug!(stem = %stem, "no audio file found for notes table"),
        }
    }
    for (idx, name) in audio_files.iter().enumerate() {
        if !used[idx] {
            tracing::warn!(file = %name, "audio file matches no notes table, skipping");
        }
    }
    Ok(jobs)
}

/// `name` cells keep a `.csv`/`.tsv` extension, anything else gets `.tsv`.
fn normalize_output_name(name: &str) -> String {
    if name.ends_with(".csv") || name.ends_with(".tsv") {
        name.to_string()
    } else {
        format!("{name}.tsv")
    }
}

fn audio_stem(audio: &Path) -> String {
    match audio.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => "output".to_string(),
    }
}

/// Where the primary artifact goes. Precedence: explicit `output` path,
/// then a `name` cell resolved under the output directory, then
/// `<audio stem>_aligned.csv` under the output directory or, lacking one,
/// beside the audio file.
pub fn primary_output_path(job: &AlignmentJob, output_dir: Option<&Path>) -> PathBuf {
    if let Some(output) = &job.output {
        return output.clone();
    }
    let base = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => job
            .audio
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    if let Some(name) = &job.name {
        if !name.is_empty() {
            return base.join(normalize_output_name(name));
        }
    }
    base.join(format!("{}{ALIGNED_SUFFIX}", audio_stem(&job.audio)))
}

/// Where the warp-map artifact goes: beside the primary artifact, named
/// after the primary file when the job fixed its own output name, after the
/// audio stem otherwise.
pub fn warp_map_output_path(job: &AlignmentJob, primary: &Path) -> PathBuf {
    let named_explicitly =
        job.output.is_some() || job.name.as_deref().is_some_and(|name| !name.is_empty());
    let stem = if named_explicitly {
        match primary.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => audio_stem(&job.audio),
        }
    } else {
        audio_stem(&job.audio)
    };
    primary.with_file_name(format!("{stem}{WARP_MAP_SUFFIX}"))
}
