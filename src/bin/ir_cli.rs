use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use impulse_analyzer::analysis::Analyzer;
use impulse_analyzer::config::AnalysisConfig;
use impulse_analyzer::debug::pipeline_tracer;
use impulse_analyzer::testing::fixtures::{
    read_wav, write_wav, FixtureSpec, SyntheticPattern, DEFAULT_SAMPLE_RATE,
};
use impulse_analyzer::AnalysisResult;
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ir_cli",
    about = "Deterministic fixture harness for the impulse response analyzer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one or more WAV files and print the JSON result(s)
    Analyze {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// JSON analysis configuration (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a synthetic fixture WAV
    Synth {
        #[arg(long, value_enum)]
        pattern: PatternArg,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
        #[arg(long, default_value_t = 2_000)]
        duration_ms: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PatternArg {
    EchoTaps,
    DecayingNoise,
    Sine,
    WhiteNoise,
    Silence,
}

impl From<PatternArg> for SyntheticPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::EchoTaps => SyntheticPattern::EchoTaps,
            PatternArg::DecayingNoise => SyntheticPattern::DecayingNoise,
            PatternArg::Sine => SyntheticPattern::Sine,
            PatternArg::WhiteNoise => SyntheticPattern::WhiteNoise,
            PatternArg::Silence => SyntheticPattern::Silence,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    pipeline_tracer::init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            inputs,
            config,
            output,
        } => run_analyze(&inputs, config, output),
        Commands::Synth {
            pattern,
            output,
            sample_rate,
            duration_ms,
        } => run_synth(pattern.into(), &output, sample_rate, duration_ms),
    }
}

fn run_analyze(
    inputs: &[PathBuf],
    config_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => AnalysisConfig::load_strict(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let analyzer = Analyzer::new(config).context("building analyzer")?;

    let results = inputs
        .par_iter()
        .map(|path| analyze_file(&analyzer, path))
        .collect::<Result<Vec<_>>>()?;

    let json = if results.len() == 1 {
        serde_json::to_string_pretty(&results[0])?
    } else {
        let reports: Vec<FileReport> = inputs
            .iter()
            .zip(&results)
            .map(|(path, result)| FileReport {
                input: path.display().to_string(),
                result,
            })
            .collect();
        serde_json::to_string_pretty(&reports)?
    };

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(ExitCode::from(0))
}

fn analyze_file(analyzer: &Analyzer, path: &Path) -> Result<AnalysisResult> {
    let waveform = read_wav(path).with_context(|| format!("decoding {}", path.display()))?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let result = analyzer
        .analyze(&waveform, source.as_deref())
        .with_context(|| format!("analyzing {}", path.display()))?;

    tracing::info!(
        input = %path.display(),
        ir_type = %result.classification.ir_type,
        peaks = result.analysis_data.musical_features.peak_count,
        "analyzed"
    );
    Ok(result)
}

fn run_synth(
    pattern: SyntheticPattern,
    output: &Path,
    sample_rate: u32,
    duration_ms: u32,
) -> Result<ExitCode> {
    let spec = FixtureSpec {
        sample_rate,
        ..FixtureSpec::synthetic("synth", pattern, duration_ms)
    };
    let waveform = spec.load().context("rendering fixture")?;
    write_wav(output, &waveform).with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        output = %output.display(),
        frames = waveform.frames(),
        sample_rate,
        "wrote fixture"
    );
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct FileReport<'a> {
    input: String,
    result: &'a AnalysisResult,
}
