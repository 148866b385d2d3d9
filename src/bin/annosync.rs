use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use annosync::corpus::{discover_jobs, jobs_from_mapping};
use annosync::{
    run_batch, AlignerConfig, AlignmentJob, AnnotationAlignerBuilder, JobRecord, OutputMode,
    RunReport, Table,
};

#[path = "annosync/report_formatter.rs"]
mod report_formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeChoice {
    Compact,
    Full,
    BeatTimeline,
}

impl ModeChoice {
    fn output_mode(self) -> OutputMode {
        match self {
            Self::Compact => OutputMode::Compact,
            Self::Full => OutputMode::Full,
            Self::BeatTimeline => OutputMode::BeatTimeline,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "annosync")]
#[command(about = "Align symbolic score annotations with audio recordings")]
struct Args {
    /// Audio recording for a single alignment job.
    #[arg(long)]
    audio: Option<PathBuf>,
    /// Notes table for a single alignment job.
    #[arg(long)]
    notes: Option<PathBuf>,
    /// Harmony/cadence labels table for a single alignment job.
    #[arg(long)]
    labels: Option<PathBuf>,
    /// Batch mapping table with audio/notes columns and optional labels/name/output.
    #[arg(
        long,
        env = "ANNOSYNC_BATCH",
        conflicts_with_all = ["audio", "notes", "labels", "audio_dir", "notes_dir"]
    )]
    batch: Option<PathBuf>,
    /// Directory of WAV recordings to pair with --notes-dir.
    #[arg(
        long,
        requires = "notes_dir",
        conflicts_with_all = ["audio", "notes", "labels"]
    )]
    audio_dir: Option<PathBuf>,
    /// Directory of notes tables to pair with --audio-dir.
    #[arg(
        long,
        requires = "audio_dir",
        conflicts_with_all = ["audio", "notes", "labels"]
    )]
    notes_dir: Option<PathBuf>,
    /// Output file for a single job, output directory for batch runs.
    #[arg(long, env = "ANNOSYNC_OUTPUT")]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = ModeChoice::Compact)]
    mode: ModeChoice,
    /// Also write the quarterbeats-to-seconds warp map beside each output.
    #[arg(long, default_value_t = false)]
    warp_map: bool,
    /// Worker threads for batch runs; 0 keeps the rayon default.
    #[arg(long, default_value_t = 0)]
    workers: usize,
    /// Write the JSON run report to this path.
    #[arg(long, env = "ANNOSYNC_REPORT")]
    report: Option<PathBuf>,
    /// Only log warnings and errors.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    init_tracing(args.quiet);

    let batch_jobs = if let Some(batch_path) = args.batch.as_ref() {
        require_path_exists(batch_path, "Missing batch mapping file.")?;
        let table = Table::read(batch_path)
            .map_err(|err| format!("Unusable batch mapping: {err}"))?;
        let context = batch_path.display().to_string();
        let jobs = jobs_from_mapping(&table, &context)
            .map_err(|err| format!("Unusable batch mapping: {err}"))?;
        Some(jobs)
    } else if let (Some(audio_dir), Some(notes_dir)) =
        (args.audio_dir.as_ref(), args.notes_dir.as_ref())
    {
        require_path_exists(audio_dir, "Missing audio directory.")?;
        require_path_exists(notes_dir, "Missing notes directory.")?;
        let jobs = discover_jobs(audio_dir, notes_dir).map_err(|err| err.to_string())?;
        if jobs.is_empty() {
            tracing::warn!(
                audio_dir = %audio_dir.display(),
                notes_dir = %notes_dir.display(),
                "no audio/notes pairs discovered"
            );
        }
        Some(jobs)
    } else {
        None
    };

    match batch_jobs {
        Some(jobs) => run_batch_jobs(&args, &jobs),
        None => run_single_job(&args),
    }
}

fn run_batch_jobs(args: &Args, jobs: &[AlignmentJob]) -> Result<(), String> {
    let config = AlignerConfig {
        mode: args.mode.output_mode(),
        warp_map: args.warp_map,
        output_dir: args.output.clone(),
    };
    let aligner = AnnotationAlignerBuilder::new(config).build();

    let progress = ProgressBar::new(jobs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let report = run_batch(&aligner, jobs, args.workers, &|record: &JobRecord| {
        progress.set_message(record.name.clone());
        progress.inc(1);
    });
    progress.finish_with_message("alignment pass complete");

    let report = report.with_generated_at(Utc::now().to_rfc3339());
    emit_report(args.report.as_deref(), &report)?;

    let summary = report.summary;
    if summary.total > 0 && summary.succeeded == 0 {
        return Err(format!("all {} alignment job(s) failed", summary.total));
    }
    Ok(())
}

fn run_single_job(args: &Args) -> Result<(), String> {
    let (Some(audio), Some(notes)) = (args.audio.clone(), args.notes.clone()) else {
        return Err(
            "A single run needs both --audio and --notes; use --batch or --audio-dir/--notes-dir for corpus runs."
                .to_string(),
        );
    };
    require_path_exists(&audio, "Missing audio recording.")?;
    require_path_exists(&notes, "Missing notes table.")?;

    let mut job = AlignmentJob::new(audio, notes);
    if let Some(labels) = args.labels.clone() {
        require_path_exists(&labels, "Missing labels table.")?;
        job = job.with_labels(labels);
    }
    if let Some(output) = args.output.clone() {
        job = job.with_output(output);
    }

    let config = AlignerConfig {
        mode: args.mode.output_mode(),
        warp_map: args.warp_map,
        output_dir: None,
    };
    let aligner = AnnotationAlignerBuilder::new(config).build();

    let (record, outcome) = match aligner.run_job(&job) {
        Ok(output) => {
            for path in &output.outputs {
                println!("{}", path.display());
            }
            (JobRecord::success(&job, &output), Ok(()))
        }
        Err(err) => {
            let message = format!("Failed to align '{}': {err}", job.display_name());
            (JobRecord::failure(&job, &err), Err(message))
        }
    };

    if let Some(report_path) = args.report.as_ref() {
        let report = RunReport::new(aligner.config().mode, vec![record])
            .with_generated_at(Utc::now().to_rfc3339());
        report_formatter::write_report(report_path, &report)?;
        println!("{}", report_path.display());
    }

    outcome
}

fn emit_report(path: Option<&Path>, report: &RunReport) -> Result<(), String> {
    match path {
        Some(path) => {
            report_formatter::write_report(path, report)?;
            println!("{}", path.display());
        }
        None => {
            let rendered = serde_json::to_string_pretty(report)
                .map_err(|err| format!("Failed to serialize run report: {err}"))?;
            println!("{rendered}");
        }
    }
    Ok(())
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Missing path: {}", path.display()))
}
