use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use clipmerge::{
    FfmpegFormatSupport, FfmpegOpener, FfmpegRecorder, MergePhase, MergeSession, ProgressObserver,
    Selection, probe_clip,
};

#[derive(Parser, Debug)]
#[command(name = "clipmerge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge two or more clips into one video (requires `ffmpeg` on PATH).
    Merge(MergeArgs),
    /// Print stream metadata for one clip as JSON (requires `ffprobe` on PATH).
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct MergeArgs {
    /// Input clips, merged in the order given.
    #[arg(required = true, num_args = 2..)]
    inputs: Vec<PathBuf>,

    /// Output path; defaults to a name suggested by the negotiated format.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Clip to probe.
    file: PathBuf,
}

/// Prints each merge milestone to stderr.
struct StderrProgress;

impl ProgressObserver for StderrProgress {
    fn update(&mut self, phase: MergePhase) {
        eprintln!("[{:>3}%] {}", phase.percent(), phase.label());
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Merge(args) => cmd_merge(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn cmd_merge(args: MergeArgs) -> anyhow::Result<()> {
    let selections: Vec<Selection> = args.inputs.iter().map(Selection::from_path).collect();

    let mut session = MergeSession::new();
    let added = session.add_clips(&selections);
    if added < args.inputs.len() {
        for message in session.status_mut().active() {
            eprintln!("{}", message.text);
        }
        anyhow::bail!("{} input(s) do not look like video files", args.inputs.len() - added);
    }

    let mut recorder = FfmpegRecorder::new();
    let artifact = session
        .merge(
            &FfmpegOpener,
            &FfmpegFormatSupport::probe(),
            &mut recorder,
            &mut StderrProgress,
        )
        .with_context(|| "merge failed")?;

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(artifact.suggested_file_name()));
    artifact
        .write_to(&out)
        .with_context(|| format!("write output '{}'", out.display()))?;
    eprintln!("wrote {} ({} bytes)", out.display(), artifact.len());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = probe_clip(&args.file)
        .with_context(|| format!("probe clip '{}'", args.file.display()))?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
