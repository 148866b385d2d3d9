use std::path::{Path, PathBuf};

use crate::corpus::{parse_quarterbeats, quarterbeat_column, WARP_MAP_SUFFIX};
use crate::error::AlignError;
use crate::pipeline::traits::WarpSource;
use crate::table::Table;
use crate::types::{ScoreEvent, WarpAnchor};

/// Default warp source: reads a previously exported quarterbeat-to-seconds
/// table instead of running an aligner.
///
/// When the job's audio handle already points at a `.csv`/`.tsv` file that
/// file is read directly. Otherwise the source looks for a sibling
/// `<stem>.quarters2seconds.csv` (then `.tsv`) next to the audio file.
pub struct PrecomputedWarpSource;

impl PrecomputedWarpSource {
    fn resolve_map_path(audio: &Path) -> Result<PathBuf, AlignError> {
        let is_table = audio
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv"));
        if is_table {
            return Ok(audio.to_path_buf());
        }
        let stem = match audio.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => {
                return Err(AlignError::io(
                    "locating warp map for audio",
                    audio,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "audio path has no file stem"),
                ))
            }
        };
        let csv = audio.with_file_name(format!("{stem}{WARP_MAP_SUFFIX}"));
        if csv.is_file() {
            return Ok(csv);
        }
        let tsv = csv.with_extension("tsv");
        if tsv.is_file() {
            return Ok(tsv);
        }
        Err(AlignError::io(
            "locating warp map for audio",
            audio,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "neither '{}' nor '{}' exists",
                    csv.display(),
                    tsv.display()
                ),
            ),
        ))
    }

    /// Reads anchors from a warp-map table: a quarterbeat column
    /// (`quarterbeats_playthrough` preferred over `quarterbeats`) and a
    /// `seconds` column. Rows with an empty quarterbeat cell are skipped.
    pub fn read_anchor_table(path: &Path) -> Result<Vec<WarpAnchor>, AlignError> {
        let table = Table::read(path)?;
        let context = path.display().to_string();
        let (qb_idx, _) = quarterbeat_column(&table).ok_or_else(|| {
            AlignError::schema(
                context.as_str(),
                "missing quarterbeat column ('quarterbeats_playthrough' or 'quarterbeats')",
            )
        })?;
        let seconds_idx = table.require_column("seconds", &context)?;

        let mut anchors = Vec::with_capacity(table.rows.len());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let line = row_idx + 2;
            let qb_cell = row[qb_idx].trim();
            if qb_cell.is_empty() {
                continue;
            }
            let score_time = parse_quarterbeats(qb_cell).ok_or_else(|| {
                AlignError::schema(
                    context.as_str(),
                    format!("line {line}: unparsable quarterbeat value '{qb_cell}'"),
                )
            })?;
            let seconds_cell = row[seconds_idx].trim();
            let audio_time: f64 = seconds_cell
                .parse()
                .ok()
                .filter(|value: &f64| value.is_finite())
                .ok_or_else(|| {
                    AlignError::schema(
                        context.as_str(),
                        format!("line {line}: unparsable seconds value '{seconds_cell}'"),
                    )
                })?;
            anchors.push(WarpAnchor::new(score_time, audio_time));
        }
        Ok(anchors)
    }
}

impl WarpSource for PrecomputedWarpSource {
    fn anchors(&self, audio: &Path, _notes: &[ScoreEvent]) -> Result<Vec<WarpAnchor>, AlignError> {
        let path = Self::resolve_map_path(audio)?;
        tracing::debug!(map = %path.display(), "reading precomputed warp map");
        Self::read_anchor_table(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_table_handle_directly() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("piece.quarters2seconds.csv");
        std::fs::write(&map, "quarterbeats,seconds\n1.0,0.0\n5.0,10.0\n").unwrap();

        let source = PrecomputedWarpSource;
        let anchors = source.anchors(&map, &[]).unwrap();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[1], WarpAnchor::new(5.0, 10.0));
    }

    #[test]
    fn resolves_sibling_map_for_audio() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("BWV_0001.wav");
        std::fs::write(&audio, b"").unwrap();
        std::fs::write(
            dir.path().join("BWV_0001.quarters2seconds.csv"),
            "quarterbeats,seconds\n1.0,0.5\n9.0,30.0\n",
        )
        .unwrap();

        let anchors = PrecomputedWarpSource.anchors(&audio, &[]).unwrap();
        assert_eq!(anchors[0], WarpAnchor::new(1.0, 0.5));
    }

    #[test]
    fn falls_back_to_tsv_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("BWV_0001.wav");
        std::fs::write(&audio, b"").unwrap();
        std::fs::write(
            dir.path().join("BWV_0001.quarters2seconds.tsv"),
            "quarterbeats\tseconds\n1.0\t0.5\n9.0\t30.0\n",
        )
        .unwrap();

        let anchors = PrecomputedWarpSource.anchors(&audio, &[]).unwrap();
        assert_eq!(anchors.len(), 2);
    }

    #[test]
    fn missing_map_names_both_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("BWV_0001.wav");
        std::fs::write(&audio, b"").unwrap();

        let err = PrecomputedWarpSource.anchors(&audio, &[]).unwrap_err();
        assert_eq!(err.kind(), "JobIOFailure");
        let rendered = err.to_string();
        assert!(rendered.contains("quarters2seconds.csv"));
        assert!(rendered.contains("quarters2seconds.tsv"));
    }

    #[test]
    fn rejects_malformed_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("bad.csv");
        std::fs::write(&map, "quarterbeats,seconds\n1.0,fast\n").unwrap();

        let err = PrecomputedWarpSource.anchors(&map, &[]).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");
        assert!(err.to_string().contains("line 2"));
    }
}
