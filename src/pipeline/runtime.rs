use std::path::PathBuf;

use crate::alignment::assemble::{
    beat_timeline_table, compact_table, full_table, warp_map_table, OutputTable,
};
use crate::alignment::mapper::{align_events, MappingStats};
use crate::alignment::warp::WarpingFunction;
use crate::config::{AlignerConfig, OutputMode};
use crate::corpus;
use crate::error::AlignError;
use crate::pipeline::traits::WarpSource;
use crate::table::Table;
use crate::types::{AlignedEvent, AlignmentJob, JobOutput};

/// Drives one alignment job end to end: parse the annotation tables, obtain
/// the warping path, project the events and write the configured artifacts.
pub struct AnnotationAligner {
    config: AlignerConfig,
    warp_source: Box<dyn WarpSource>,
}

pub(crate) struct AnnotationAlignerParts {
    pub config: AlignerConfig,
    pub warp_source: Box<dyn WarpSource>,
}

impl AnnotationAligner {
    pub(crate) fn from_parts(parts: AnnotationAlignerParts) -> Self {
        Self {
            config: parts.config,
            warp_source: parts.warp_source,
        }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    pub fn run_job(&self, job: &AlignmentJob) -> Result<JobOutput, AlignError> {
        if job.audio.as_os_str().is_empty() || job.notes.as_os_str().is_empty() {
            return Err(AlignError::invalid_input(
                "a job needs both an audio handle and a notes path",
            ));
        }
        if self.config.mode == OutputMode::BeatTimeline && job.labels.is_some() {
            return Err(AlignError::schema(
                "beat timeline",
                "a beat timeline is built from the notes table; run without labels",
            ));
        }

        let notes_table = Table::read(&job.notes)?;
        let notes_context = job.notes.display().to_string();
        let notes = corpus::notes_from_table(&notes_table, &notes_context)?;

        let labels = match &job.labels {
            Some(path) => {
                let labels_table = Table::read(path)?;
                let labels_context = path.display().to_string();
                corpus::ensure_matching_unfolding(&notes_table, &labels_table, &labels_context)?;
                Some(corpus::labels_from_table(&labels_table, &labels_context)?)
            }
            None => None,
        };

        let anchors = self.warp_source.anchors(&job.audio, &notes)?;
        let warp = WarpingFunction::from_anchors(anchors)?;
        tracing::debug!(
            job = %job.display_name(),
            anchors = warp.anchor_count(),
            span_end_seconds = warp.end_audio_time(),
            "warping function ready"
        );

        let aligned_notes = align_events(&notes, &warp);
        let note_stats = MappingStats::collect(&aligned_notes);
        if note_stats.suspicious() {
            tracing::warn!(
                job = %job.display_name(),
                extrapolated = note_stats.extrapolated,
                longest_run = note_stats.longest_extrapolated_run,
                total = note_stats.events,
                "many events fell outside the warping path span; the recording may not cover the score (check repeats)"
            );
        }

        let aligned_labels = labels.as_ref().map(|events| align_events(events, &warp));
        let primary_table = self.assemble_primary(&aligned_notes, aligned_labels.as_deref())?;

        let primary_path = corpus::primary_output_path(job, self.config.output_dir.as_deref());
        Table::write(&primary_path, &primary_table.columns, &primary_table.rows)?;
        let mut outputs: Vec<PathBuf> = vec![primary_path.clone()];

        if self.config.warp_map {
            let map_table = warp_map_table(&notes, &aligned_notes);
            let map_path = corpus::warp_map_output_path(job, &primary_path);
            Table::write(&map_path, &map_table.columns, &map_table.rows)?;
            outputs.push(map_path);
        }

        let mode_stats = match &aligned_labels {
            Some(aligned) => MappingStats::collect(aligned),
            None => note_stats,
        };
        tracing::debug!(
            job = %job.display_name(),
            rows = primary_table.row_count(),
            output = %primary_path.display(),
            "job finished"
        );
        Ok(JobOutput {
            outputs,
            events: primary_table.row_count(),
            extrapolated_events: mode_stats.extrapolated,
            longest_extrapolated_run: mode_stats.longest_extrapolated_run,
        })
    }

    /// Compact and full shape the label events when a labels table was
    /// given, the note events otherwise. The beat timeline always reads
    /// from the notes.
    fn assemble_primary(
        &self,
        aligned_notes: &[AlignedEvent],
        aligned_labels: Option<&[AlignedEvent]>,
    ) -> Result<OutputTable, AlignError> {
        let mode_events = aligned_labels.unwrap_or(aligned_notes);
        match self.config.mode {
            OutputMode::Compact => Ok(compact_table(mode_events)),
            OutputMode::Full => Ok(full_table(mode_events)),
            OutputMode::BeatTimeline => beat_timeline_table(aligned_notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::pipeline::builder::AnnotationAlignerBuilder;
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

    fn write_notes(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn make_aligner(mode: OutputMode, warp_map: bool, output_dir: &Path) -> AnnotationAligner {
        AnnotationAlignerBuilder::new(AlignerConfig {
            mode,
            warp_map,
            output_dir: Some(output_dir.to_path_buf()),
        })
        .with_warp_source(Box::new(FixedWarpSource(vec![
            WarpAnchor::new(0.0, 0.0),
            WarpAnchor::new(16.0, 16.0),
        ])))
        .build()
    }

    #[test]
    fn compact_job_writes_start_and_label_rows() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_notes(
            dir.path(),
            "piece.notes.tsv",
            "quarterbeats\tduration_qb\tname\n0\t1\tC4\n1\t1\tD4\n",
        );
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::Compact, false, &out_dir);
        let job = AlignmentJob::new(dir.path().join("piece.wav"), notes);

        let output = aligner.run_job(&job).unwrap();
        assert_eq!(output.events, 2);
        assert_eq!(output.outputs.len(), 1);
        let written = std::fs::read_to_string(&output.outputs[0]).unwrap();
        // Positions 0 and 1 carry the +1 corpus offset.
        assert_eq!(written, "start,label\n1.0,C4\n2.0,D4\n");
    }

    #[test]
    fn empty_notes_table_yields_headered_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_notes(
            dir.path(),
            "empty.notes.tsv",
            "quarterbeats\tduration_qb\tname\n",
        );
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::Compact, false, &out_dir);
        let job = AlignmentJob::new(dir.path().join("empty.wav"), notes);

        let output = aligner.run_job(&job).unwrap();
        assert_eq!(output.events, 0);
        let written = std::fs::read_to_string(&output.outputs[0]).unwrap();
        assert_eq!(written, "start,label\n");
    }

    #[test]
    fn empty_job_paths_are_rejected_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::Compact, false, &out_dir);

        let err = aligner.run_job(&AlignmentJob::new("", "")).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
        assert!(err.to_string().contains("audio handle"));
    }

    #[test]
    fn beat_timeline_with_labels_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_notes(
            dir.path(),
            "piece.notes.tsv",
            "quarterbeats\tduration_qb\n0\t1\n",
        );
        let labels = write_notes(dir.path(), "piece.labels.tsv", "quarterbeats\tlabel\n0\tI\n");
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::BeatTimeline, false, &out_dir);
        let job = AlignmentJob::new(dir.path().join("piece.wav"), notes).with_labels(labels);

        let err = aligner.run_job(&job).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");
    }

    #[test]
    fn beat_timeline_writes_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_notes(
            dir.path(),
            "piece.notes.tsv",
            "quarterbeats\tduration_qb\n0\t1\n2\t1\n4\t1\n",
        );
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::BeatTimeline, false, &out_dir);
        let job = AlignmentJob::new(dir.path().join("piece.wav"), notes);

        let output = aligner.run_job(&job).unwrap();
        let written = std::fs::read_to_string(&output.outputs[0]).unwrap();
        assert_eq!(written, "time,beat\n1.0,1\n3.0,2\n5.0,3\n");
    }

    #[test]
    fn warp_map_artifact_is_written_beside_primary() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_notes(
            dir.path(),
            "piece.notes.tsv",
            "quarterbeats\tduration_qb\tname\n0\t1\tC4\n",
        );
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::Compact, true, &out_dir);
        let job = AlignmentJob::new(dir.path().join("piece.wav"), notes);

        let output = aligner.run_job(&job).unwrap();
        assert_eq!(output.outputs.len(), 2);
        assert_eq!(
            output.outputs[1],
            out_dir.join("piece.quarters2seconds.csv")
        );
        let written = std::fs::read_to_string(&output.outputs[1]).unwrap();
        assert_eq!(written, "quarterbeats,seconds\n1.0,1.0\n2.0,2.0\n");
    }

    #[test]
    fn unfold_mismatch_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_notes(
            dir.path(),
            "piece.notes.tsv",
            "quarterbeats_playthrough\tduration_qb\n0\t1\n",
        );
        let labels = write_notes(dir.path(), "piece.labels.tsv", "quarterbeats\tlabel\n0\tI\n");
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::Compact, false, &out_dir);
        let job = AlignmentJob::new(dir.path().join("piece.wav"), notes).with_labels(labels);

        let err = aligner.run_job(&job).unwrap_err();
        assert!(err.to_string().contains("unfold"));
    }

    #[test]
    fn labels_feed_compact_output_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_notes(
            dir.path(),
            "piece.notes.tsv",
            "quarterbeats\tduration_qb\tname\n0\t1\tC4\n",
        );
        let labels = write_notes(
            dir.path(),
            "piece.labels.tsv",
            "quarterbeats\tlabel\tcadence\n0\tI\t\n2\tV\tHC\n",
        );
        let out_dir = dir.path().join("out");
        let aligner = make_aligner(OutputMode::Compact, false, &out_dir);
        let job = AlignmentJob::new(dir.path().join("piece.wav"), notes).with_labels(labels);

        let output = aligner.run_job(&job).unwrap();
        let written = std::fs::read_to_string(&output.outputs[0]).unwrap();
        assert_eq!(written, "start,label\n1.0,I\n3.0,V\n3.0,HC\n");
    }
}
