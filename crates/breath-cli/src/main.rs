mod io;

use anyhow::{Context, Result};
use breath_lib::{
    config::{AnalysisConfig, Scaling},
    detectors::breath::extract_onsets_recording,
    dsp::{
        derivative::differentiate,
        interp::{Extrapolation, InterpKind},
        normalize::normalize_recording,
    },
    error::{ErrorKind, RespError},
    metrics::{breath::breath_features_recording, continuous::continuous_features_recording},
    signal::{PerChannel, Recording, TimeSeries},
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::io::{read_recording, Table, TableLayout};

#[derive(Parser)]
#[command(
    name = "breath",
    version,
    about = "Breath onset detection and breath-wise features for respiration belt recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Delimited table with a header row; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, default_value = "time")]
    time_column: String,
    /// Channel column to analyse (repeatable); all non-time columns by default
    #[arg(long = "channel")]
    channels: Vec<String>,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Args)]
struct AnalysisArgs {
    /// TOML file with scaling / filtered / interp_kind / extrapolation
    #[arg(long)]
    config: Option<PathBuf>,
    /// 0 (or "auto") scales by median velocity, 1 keeps units, C multiplies;
    /// ignored by `onsets`
    #[arg(long)]
    scaling: Option<Scaling>,
    /// Treat the input as already band-passed; ignored by `normalize`
    #[arg(long)]
    filtered: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample-to-sample derivative on the input timestamps
    Diff {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Band-pass [0.05, 1] Hz and rescale
    Normalize {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Inspiration / expiration onsets as JSON
    Onsets {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Breath-wise depth, timing and velocity as JSON
    Features {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Breath-wise features held over the sample index, as CSV
    Continuous {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long = "interp")]
        interp_kind: Option<InterpKind>,
        #[arg(long)]
        extrapolation: Option<Extrapolation>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Diff { input, out } => cmd_diff(&input, out.as_deref())?,
        Commands::Normalize {
            input,
            analysis,
            out,
        } => cmd_normalize(&input, &analysis.resolve()?, out.as_deref())?,
        Commands::Onsets { input, analysis } => cmd_onsets(&input, &analysis.resolve()?)?,
        Commands::Features { input, analysis } => cmd_features(&input, &analysis.resolve()?)?,
        Commands::Continuous {
            input,
            analysis,
            interp_kind,
            extrapolation,
            out,
        } => {
            let mut cfg = analysis.resolve()?;
            if let Some(kind) = interp_kind {
                cfg.interp_kind = kind;
            }
            if let Some(policy) = extrapolation {
                cfg.extrapolation = policy;
            }
            cmd_continuous(&input, &cfg, out.as_deref())?
        }
    }
    Ok(())
}

impl AnalysisArgs {
    /// Config file first, explicit flags on top.
    fn resolve(&self) -> Result<AnalysisConfig> {
        let mut cfg = load_config(self.config.as_deref())?;
        if let Some(scaling) = self.scaling {
            cfg.scaling = scaling;
        }
        cfg.filtered |= self.filtered;
        Ok(cfg)
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            AnalysisConfig::from_toml_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn load_recording(input: &InputArgs) -> Result<Recording> {
    let delimiter =
        u8::try_from(input.delimiter).context("delimiter must be a single-byte character")?;
    read_recording(
        input.input.as_deref(),
        &TableLayout {
            time_column: &input.time_column,
            channels: &input.channels,
            delimiter,
        },
    )
}

fn cmd_diff(input: &InputArgs, out: Option<&Path>) -> Result<()> {
    let rec = load_recording(input)?;
    let results = differentiate(&rec);
    write_series_table(&rec, &results, out)
}

fn cmd_normalize(input: &InputArgs, cfg: &AnalysisConfig, out: Option<&Path>) -> Result<()> {
    let rec = load_recording(input)?;
    let results = normalize_recording(&rec, cfg.scaling);
    write_series_table(&rec, &results, out)
}

fn cmd_onsets(input: &InputArgs, cfg: &AnalysisConfig) -> Result<()> {
    let rec = load_recording(input)?;
    let results = extract_onsets_recording(&rec, cfg.filtered);
    print_json_reports(&results)
}

fn cmd_features(input: &InputArgs, cfg: &AnalysisConfig) -> Result<()> {
    let rec = load_recording(input)?;
    let results = breath_features_recording(&rec, cfg.scaling, cfg.filtered);
    print_json_reports(&results)
}

fn cmd_continuous(input: &InputArgs, cfg: &AnalysisConfig, out: Option<&Path>) -> Result<()> {
    let rec = load_recording(input)?;
    let results = continuous_features_recording(&rec, cfg);
    report_failures(&results);
    let prefix = rec.channels.len() > 1;
    let mut table = Table::new(rec.times.clone());
    for (channel, cont) in results.successes() {
        for (name, values) in cont.named_columns() {
            table.push(column_name(channel, name, prefix), values.to_vec());
        }
    }
    table.write(out)
}

/// One CSV column per channel that succeeded, on the recording's index.
fn write_series_table(
    rec: &Recording,
    results: &PerChannel<TimeSeries>,
    out: Option<&Path>,
) -> Result<()> {
    report_failures(results);
    let mut table = Table::new(rec.times.clone());
    for (channel, ts) in results.successes() {
        table.push(channel, ts.reindex(&rec.times));
    }
    table.write(out)
}

fn column_name(channel: &str, column: &str, prefix: bool) -> String {
    if prefix {
        format!("{channel}.{column}")
    } else {
        column.to_string()
    }
}

fn report_failures<T>(results: &PerChannel<T>) {
    for (channel, err) in results.failures() {
        log::warn!("channel {channel}: {err}");
    }
}

#[derive(Serialize)]
struct ChannelOutput<'a, T: Serialize> {
    channel: &'a str,
    ok: Option<&'a T>,
    error: Option<ErrorOutput>,
}

#[derive(Serialize)]
struct ErrorOutput {
    kind: ErrorKind,
    message: String,
}

impl From<&RespError> for ErrorOutput {
    fn from(err: &RespError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

fn print_json_reports<T: Serialize>(results: &PerChannel<T>) -> Result<()> {
    let outputs: Vec<ChannelOutput<'_, T>> = results
        .reports
        .iter()
        .map(|report| ChannelOutput {
            channel: &report.channel,
            ok: report.result.as_ref().ok(),
            error: report.result.as_ref().err().map(ErrorOutput::from),
        })
        .collect();
    println!("{}", serde_json::to_string(&outputs)?);
    Ok(())
}
