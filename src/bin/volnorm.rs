use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use volnorm::{
    BatchReport, FileOutcome, FileReport, NormalizationMode, NormalizeOptions, Normalizer,
    ProgressCallback, ProgressInfo, Transcoder, TranscoderLogLevel,
    config::{DEFAULT_BITRATE_KBPS, DEFAULT_PREFIX, DEFAULT_TARGET_LEVEL_DB},
};

const CLI_AFTER_HELP: &str = "Examples:\n  volnorm -i interview.mov\n  volnorm -i 'clips/*.mp4' -l -23 -o normalized --progress\n  volnorm -i song.m4a -m -l -1 -p '' -f\n  volnorm -i 'clips/*.mov' -r --json\n  volnorm --completions zsh > _volnorm";

#[derive(Debug, Parser)]
#[command(
    name = "volnorm",
    version,
    about = "Normalize the audio level of media files with ffmpeg",
    long_about = "Normalizes audio to a target dB level. By default the mean (RMS) level is \
                  moved onto the target; use --max to normalize the peak instead. Video is \
                  copied, audio is re-encoded to AAC, and results are written as mp4 files.",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input files to convert (glob patterns are expanded).
    #[arg(
        short = 'i',
        long,
        value_name = "FILES",
        num_args = 1..,
        required_unless_present = "completions"
    )]
    input: Vec<String>,

    /// Force overwriting existing files.
    #[arg(short = 'f', long)]
    force: bool,

    /// dB level to normalize to.
    #[arg(
        short = 'l',
        long,
        value_name = "DB",
        default_value_t = DEFAULT_TARGET_LEVEL_DB,
        allow_negative_numbers = true,
        value_parser = parse_level
    )]
    level: f64,

    /// Normalized file prefix (empty for none).
    #[arg(short = 'p', long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Normalize to the maximum (peak) volume instead of the mean.
    #[arg(short = 'm', long)]
    max: bool,

    /// Enable verbose output.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Show what would be done, do not convert.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Audio bitrate in kbit/s.
    #[arg(short = 'b', long, value_name = "KBPS", default_value_t = DEFAULT_BITRATE_KBPS)]
    bitrate: u32,

    /// Output directory.
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    output_path: PathBuf,

    /// Show the current audio level, do not convert.
    #[arg(short = 'r', long)]
    read_only: bool,

    /// Stop the whole run at the first file that cannot be analyzed.
    #[arg(long)]
    strict: bool,

    /// Print results as machine-readable JSON.
    #[arg(long)]
    json: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// Number of files to process at once (requires the `rayon` feature).
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Path to the ffmpeg binary (default: look it up on PATH).
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<PathBuf>,

    /// ffmpeg log level for the encode step (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<TranscoderLogLevel>,

    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn parse_level(value: &str) -> Result<f64, String> {
    let level: f64 = value
        .parse()
        .map_err(|_| format!("{value:?} is not a number"))?;
    if level.is_finite() {
        Ok(level)
    } else {
        Err(format!("{value:?} is not a finite dB level"))
    }
}

impl Cli {
    fn options(&self) -> NormalizeOptions {
        let mode = if self.max {
            NormalizationMode::Peak
        } else {
            NormalizationMode::Mean
        };

        NormalizeOptions::new()
            .with_target_level(self.level)
            .with_mode(mode)
            .with_bitrate(self.bitrate)
            .with_output_dir(&self.output_path)
            .with_prefix(self.prefix.as_str())
            .with_force_overwrite(self.force)
            .with_dry_run(self.dry_run)
            .with_read_only(self.read_only)
            .with_strict(self.strict)
            .with_threads(self.threads)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Off
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .try_init();
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.completed);
        if let Some(name) = info.current_file.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
        if info.completed >= info.total {
            self.bar.finish_with_message("done");
        }
    }
}

fn print_file(file: &FileReport) {
    if let (Some(volume), Some(adjustment)) = (file.volume, file.adjustment) {
        if adjustment.would_clip {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!(
                    "adjusting {} will lead to clipping of {:.2} dB",
                    file.input.display(),
                    adjustment.adjusted_peak_db(&volume)
                )
                .yellow()
            );
        }
    }

    match &file.outcome {
        FileOutcome::Analyzed => println!("{file}"),
        FileOutcome::Normalized { output } => {
            println!("{} {}", "saved".green().bold(), output.display());
        }
        FileOutcome::DryRun { command, .. } => {
            println!("{} {}", "dry run".cyan().bold(), command);
        }
        FileOutcome::Skipped(error) => {
            eprintln!("{} {}", "warning:".yellow().bold(), error.to_string().yellow());
        }
        FileOutcome::Failed(error) => {
            eprintln!("{} {}", "error:".red().bold(), error);
        }
    }
}

fn print_summary(report: &BatchReport) {
    let summary = report.summary();
    if report.aborted {
        eprintln!(
            "{} {}",
            "error:".red().bold(),
            "stopped after the first analysis failure (--strict)"
        );
    }
    if report.is_success() {
        eprintln!("{} {}", "success:".green().bold(), summary.green());
    } else {
        eprintln!("{summary}");
    }
}

fn run_batch(
    cli: &Cli,
    normalizer: &Normalizer,
    inputs: &[PathBuf],
) -> Result<BatchReport, Box<dyn std::error::Error>> {
    #[cfg(feature = "rayon")]
    if cli.threads.is_some() {
        return Ok(normalizer.run_parallel(inputs)?);
    }

    #[cfg(not(feature = "rayon"))]
    if cli.threads.is_some() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "--threads requires building with the `rayon` feature".yellow()
        );
    }

    Ok(normalizer.run(inputs))
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "volnorm", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(cli.verbose);

    let mut transcoder = match &cli.ffmpeg {
        Some(path) => Transcoder::locate_program(path)?,
        None => Transcoder::locate()?,
    };
    if let Some(level) = cli.log_level {
        transcoder = transcoder.with_log_level(level);
    }

    let inputs = volnorm::expand_inputs(&cli.input)?;
    for input in &inputs {
        log::info!("input: {}", input.display());
    }

    let mut options = cli.options();
    if cli.progress && !inputs.is_empty() {
        options = options.with_progress(Arc::new(TerminalProgress::new(inputs.len())?));
    }

    let normalizer = Normalizer::new(transcoder, options);
    let report = run_batch(&cli, &normalizer, &inputs)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        for file in &report.files {
            print_file(file);
        }
        print_summary(&report);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
