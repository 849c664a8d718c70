use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::level_filters::LevelFilter;

use wavchop::chopper::Chopper;
use wavchop::chunk::format_hms;
use wavchop::export::{ExportOpts, params_log};
use wavchop::logging;
use wavchop::opts::ChopOpts;
use wavchop::output_type::OutputType;
use wavchop::segmenter::SegmenterOpts;
use wavchop::settings::{DEFAULT_CONFIG_FILE, Settings};

const RULE: &str = "==============================================================================";

fn main() -> Result<()> {
    let params = Params::parse();
    logging::init_with_default(if params.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    });

    let config_path = params.config.clone().unwrap_or_else(|| {
        eprintln!("No config file provided as parameter, trying {DEFAULT_CONFIG_FILE}");
        PathBuf::from(DEFAULT_CONFIG_FILE)
    });
    let settings = Settings::load(&config_path)?;

    let chopper = Chopper::new(ChopOpts {
        segmenter: params.segmenter_opts(&settings),
        output_type: params.output_type,
    });

    let sources = if params.sources.is_empty() {
        vec![settings.path.source_file.clone()]
    } else {
        params.sources.clone()
    };

    let mut failed = 0usize;
    for source in &sources {
        if let Err(err) = process_file(&chopper, &settings, &params, source) {
            eprintln!("{err:#}");
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} of {} file(s) could not be processed", sources.len());
    }
    Ok(())
}

fn process_file(chopper: &Chopper, settings: &Settings, params: &Params, source: &str) -> Result<()> {
    let path = settings.source_path(source);
    if !path.is_file() {
        bail!("File not found {}", path.display());
    }

    eprintln!("{RULE}");
    eprintln!("Analyzing File {}", path.display());
    let analysis = chopper
        .analyze_path(&path)
        .with_context(|| format!("failed to analyze {}", path.display()))?;

    eprintln!("Length: {}", format_hms(analysis.len_ms()));
    eprintln!("Average Loudness: {:.0} dBFS", analysis.average_dbfs());
    eprintln!("{RULE}");

    let source_file_name = file_name(&path);
    chopper.list(&analysis, io::stdout().lock(), &source_file_name)?;
    io::stdout().flush()?;

    if analysis.chunks.is_empty() {
        eprintln!("No chunks found");
        return Ok(());
    }
    if params.no_export {
        return Ok(());
    }

    let source_name = source_stem(&path);
    let format = params
        .format
        .clone()
        .unwrap_or_else(|| settings.export.format.clone());
    let export_opts = ExportOpts {
        target_dir: settings.path.target_dir.clone(),
        tags: settings.export_tags(&source_name),
        source_name,
        format,
        bitrate: settings.export.bitrate.clone(),
        chunk_nr: params.chunk_nr,
        params_log: params_log(&chopper.opts().segmenter),
    };

    let summary = chopper.export(&analysis, &export_opts)?;
    eprintln!("Exported to {}/", summary.dir.display());
    for file in &summary.files {
        eprintln!("{}", file_name(file));
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_owned())
}

#[derive(Parser, Debug)]
#[command(name = "wavchop")]
#[command(about = "Split a live recording into tracks at sustained silences")]
struct Params {
    /// INI config file (defaults to `default.ini`).
    config: Option<PathBuf>,

    /// Source file inside `[path] source_dir`; repeat to process several. Defaults to
    /// `[path] source_file`.
    #[arg(short = 's', long = "source")]
    sources: Vec<String>,

    /// Override `[sound] silence_threshold` (dBFS).
    #[arg(long, allow_hyphen_values = true)]
    silence_threshold: Option<f64>,

    /// Override `[sound] chunk_min_length` (ms).
    #[arg(long, allow_hyphen_values = true)]
    chunk_min_length: Option<f64>,

    /// Override `[sound] loudness_peak` (dB).
    #[arg(long, allow_hyphen_values = true)]
    loudness_peak: Option<f64>,

    /// Override `[sound] fade_in_out` (ms).
    #[arg(long)]
    fade_in_out: Option<u64>,

    /// Override `[export] format`.
    #[arg(long)]
    format: Option<String>,

    /// Export only this chunk (1-based); 0 exports all.
    #[arg(short = 'c', long = "chunk", default_value_t = 0)]
    chunk_nr: usize,

    /// Only list chunks, don't write any files.
    #[arg(long = "no-export", default_value_t = false)]
    no_export: bool,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t = OutputType::Text
    )]
    output_type: OutputType,

    /// Log progress at info level (`WAVCHOP_LOG` still takes precedence).
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

impl Params {
    fn segmenter_opts(&self, settings: &Settings) -> SegmenterOpts {
        let mut opts = settings.segmenter_opts();
        if let Some(v) = self.silence_threshold {
            opts.silence_threshold = v;
        }
        if let Some(v) = self.chunk_min_length {
            opts.chunk_min_length_ms = v;
        }
        if let Some(v) = self.loudness_peak {
            opts.loudness_peak = v;
        }
        if let Some(v) = self.fade_in_out {
            opts.fade_in_out_ms = v;
        }
        opts
    }
}
