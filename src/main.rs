//! CLI entry point for moravoice synthesis.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use moravoice::{
    init, shutdown, synthesize_to_file, Backends, DisabledAnalyzer, LinguisticAnalyzer,
    ModelBackends, ReplayModels, RuntimeConfig, SynthesisInput, SynthesisPipeline,
    SynthesisRequest,
};

#[derive(Parser, Debug)]
#[command(name = "moravoice")]
#[command(about = "Japanese TTS from full-context labels")]
struct Args {
    /// Text to synthesize. This binary ships no text analyzer, so text input
    /// fails with an analyzer error; use --labels instead
    #[arg(short, long, conflicts_with = "labels", required_unless_present = "labels")]
    text: Option<String>,

    /// File with one full-context label per line
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Speaker id (overrides the config file)
    #[arg(short, long)]
    speaker: Option<i64>,

    /// Output WAV file path
    #[arg(short, long, default_value = "output.wav")]
    output: PathBuf,

    /// JSON runtime config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyzer dictionary directory (overrides the config file). Unused by
    /// this binary, which has no text analyzer backend
    #[arg(long)]
    dict_dir: Option<PathBuf>,

    /// Recorded model outputs to replay instead of running models
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Print the re-annotated labels and exit
    #[arg(long)]
    annotate_only: bool,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_labels(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read labels from {:?}", path))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load(path).context("Failed to load config")?,
        None => RuntimeConfig::default(),
    };
    if let Some(dir) = &args.dict_dir {
        config.dictionary_dir = dir.clone();
    }
    if let Some(speaker) = args.speaker {
        config.speaker_id = speaker;
    }

    let input = match (&args.text, &args.labels) {
        (_, Some(path)) => SynthesisInput::Labels(read_labels(path)?),
        (Some(text), None) => SynthesisInput::Text(text.clone()),
        (None, None) => anyhow::bail!("either --text or --labels is required"),
    };

    if args.annotate_only {
        let labels = match input {
            SynthesisInput::Labels(labels) => labels,
            SynthesisInput::Text(text) => {
                let mut analyzer = LinguisticAnalyzer::disabled();
                analyzer.open(&config.dictionary_dir)?;
                analyzer.extract_labels(&text)?
            }
        };
        let annotated = SynthesisPipeline::prepare(&labels).context("Annotation failed")?;
        for label in annotated {
            println!("{}", label);
        }
        return Ok(());
    }

    let models = match &args.replay {
        Some(path) => {
            info!("Replaying model outputs from {:?}", path);
            ReplayModels::load(path)
                .context("Failed to load replay recording")?
                .into_backends()
        }
        None => ModelBackends::disabled(),
    };
    init(
        config,
        Backends {
            analyzer: Box::new(DisabledAnalyzer),
            models,
        },
    )
    .context("Failed to initialize runtime")?;

    let request = SynthesisRequest {
        input,
        speaker: None,
    };
    let result = synthesize_to_file(request, &args.output).context("Synthesis failed")?;
    info!(
        "Saved {:.2}s of audio to {:?}",
        result.duration_secs(),
        args.output
    );

    shutdown().context("Failed to shut down runtime")?;
    Ok(())
}
