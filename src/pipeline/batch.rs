use rayon::prelude::*;

use crate::alignment::report::{JobRecord, RunReport};
use crate::pipeline::runtime::AnnotationAligner;
use crate::types::AlignmentJob;

/// Runs every job, isolating failures at the job boundary.
///
/// Jobs execute on a rayon pool (`workers = 0` uses rayon's default size).
/// Each error becomes a failure record; the remaining jobs keep running.
/// `on_done` fires once per completed job, from worker threads. Records are
/// collected in completion order and sorted back into submission order, so
/// the report is deterministic regardless of scheduling.
pub fn run_batch(
    aligner: &AnnotationAligner,
    jobs: &[AlignmentJob],
    workers: usize,
    on_done: &(dyn Fn(&JobRecord) + Sync),
) -> RunReport {
    let mode = aligner.config().mode;
    if jobs.is_empty() {
        return RunReport::new(mode, Vec::new());
    }

    let run = || -> Vec<(usize, JobRecord)> {
        jobs.par_iter()
            .enumerate()
            .map(|(idx, job)| {
                let record = match aligner.run_job(job) {
                    Ok(output) => JobRecord::success(job, &output),
                    Err(err) => {
                        tracing::warn!(
                            job = %job.display_name(),
                            kind = err.kind(),
                            error = %err,
                            "job failed"
                        );
                        JobRecord::failure(job, &err)
                    }
                };
                on_done(&record);
                (idx, record)
            })
            .collect()
    };

    let mut indexed = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(run),
        Err(err) => {
            tracing::warn!(error = %err, "thread pool setup failed, using the global pool");
            run()
        }
    };
    indexed.sort_by_key(|(idx, _)| *idx);

    RunReport::new(mode, indexed.into_iter().map(|(_, record)| record).collect())
}
