//! Handle to the external transcoder binary.
//!
//! All media work is delegated to an `ffmpeg` process. [`Transcoder`] owns
//! the resolved path of that binary and spawns it with explicit argument
//! vectors, never through a shell, so file names containing spaces or quotes
//! reach the process verbatim.
//!
//! # Example
//!
//! ```no_run
//! use volnorm::{Transcoder, TranscoderLogLevel};
//!
//! let transcoder = Transcoder::locate()?.with_log_level(TranscoderLogLevel::Error);
//! println!("using {}", transcoder.program().display());
//! # Ok::<(), volnorm::NormalizeError>(())
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::str::FromStr;

use crate::error::NormalizeError;

/// Name of the transcoder binary looked up on `PATH`.
pub const DEFAULT_PROGRAM: &str = "ffmpeg";

/// Transcoder log verbosity, passed as `-loglevel` to the encode step.
///
/// Maps directly to ffmpeg's named log levels. The analysis step ignores
/// this setting because `volumedetect` reports at `info` level and quieter
/// levels would hide the values being parsed.
///
/// # Ordering (most verbose → most quiet)
///
/// `Trace` > `Debug` > `Verbose` > `Info` > `Warning` > `Error` > `Fatal` > `Panic` > `Quiet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscoderLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only log conditions the process cannot recover from.
    Panic,
    /// Only log unrecoverable errors.
    Fatal,
    /// Log recoverable errors.
    Error,
    /// Log warnings.
    Warning,
    /// Log informational messages (ffmpeg's default).
    Info,
    /// Log verbose informational messages.
    Verbose,
    /// Log debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl TranscoderLogLevel {
    /// The value ffmpeg expects after `-loglevel`.
    pub fn as_arg(self) -> &'static str {
        match self {
            TranscoderLogLevel::Quiet => "quiet",
            TranscoderLogLevel::Panic => "panic",
            TranscoderLogLevel::Fatal => "fatal",
            TranscoderLogLevel::Error => "error",
            TranscoderLogLevel::Warning => "warning",
            TranscoderLogLevel::Info => "info",
            TranscoderLogLevel::Verbose => "verbose",
            TranscoderLogLevel::Debug => "debug",
            TranscoderLogLevel::Trace => "trace",
        }
    }
}

impl FromStr for TranscoderLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(TranscoderLogLevel::Quiet),
            "panic" => Ok(TranscoderLogLevel::Panic),
            "fatal" => Ok(TranscoderLogLevel::Fatal),
            "error" => Ok(TranscoderLogLevel::Error),
            "warning" | "warn" => Ok(TranscoderLogLevel::Warning),
            "info" => Ok(TranscoderLogLevel::Info),
            "verbose" => Ok(TranscoderLogLevel::Verbose),
            "debug" => Ok(TranscoderLogLevel::Debug),
            "trace" => Ok(TranscoderLogLevel::Trace),
            other => Err(format!("unsupported log level: {other}")),
        }
    }
}

impl Display for TranscoderLogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_arg())
    }
}

/// A resolved transcoder binary.
///
/// Cheap to clone; holds no process state. Each call to
/// [`run`](Transcoder::run) spawns a fresh, blocking child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoder {
    program: PathBuf,
    log_level: Option<TranscoderLogLevel>,
}

impl Transcoder {
    /// Look up [`DEFAULT_PROGRAM`] on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::ToolNotFound`] if no executable named
    /// `ffmpeg` (`ffmpeg.exe` on Windows) is found.
    pub fn locate() -> Result<Self, NormalizeError> {
        Self::locate_program(DEFAULT_PROGRAM)
    }

    /// Look up an arbitrary program name or path.
    ///
    /// Bare names are searched on `PATH`; names containing a path separator
    /// are checked directly.
    pub fn locate_program<S: AsRef<OsStr>>(name: S) -> Result<Self, NormalizeError> {
        let name = name.as_ref();
        let program = which::which(name).map_err(|_| NormalizeError::ToolNotFound {
            program: name.to_string_lossy().into_owned(),
        })?;
        log::debug!("Resolved transcoder at {}", program.display());
        Ok(Self::with_program(program))
    }

    /// Use `program` as-is, without checking that it exists.
    ///
    /// A missing binary surfaces later as an invocation error for each file.
    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            log_level: None,
        }
    }

    /// Set the `-loglevel` passed to encode invocations.
    #[must_use]
    pub fn with_log_level(mut self, level: TranscoderLogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Path of the binary that will be spawned.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Log level for encode invocations, if one was set.
    pub fn log_level(&self) -> Option<TranscoderLogLevel> {
        self.log_level
    }

    /// Run the transcoder to completion with the given arguments.
    ///
    /// Standard input is closed and both output streams are captured.
    pub fn run(&self, arguments: &[OsString]) -> IoResult<Output> {
        log::debug!("[command] {}", self.command_line(arguments));
        Command::new(&self.program)
            .args(arguments)
            .stdin(Stdio::null())
            .output()
    }

    /// Render a human-readable command line for logging and dry runs.
    ///
    /// Arguments containing whitespace or quotes are wrapped in double
    /// quotes. The result is informational only; it is never fed to a shell.
    pub fn command_line(&self, arguments: &[OsString]) -> String {
        let mut line = quote_argument(self.program.as_os_str());
        for argument in arguments {
            line.push(' ');
            line.push_str(&quote_argument(argument));
        }
        line
    }
}

/// Merge captured stdout and stderr into one text.
///
/// ffmpeg writes filter diagnostics to stderr, but either stream may carry
/// them depending on the build, so both are searched.
pub(crate) fn merged_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Last non-empty line of the process diagnostics, for error messages.
pub(crate) fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    match stderr.lines().rev().find(|line| !line.trim().is_empty()) {
        Some(line) => format!("{} ({})", output.status, line.trim()),
        None => output.status.to_string(),
    }
}

fn quote_argument(argument: &OsStr) -> String {
    let text = argument.to_string_lossy();
    if text.is_empty() || text.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        format!("\"{}\"", text.replace('"', "\\\""))
    } else {
        text.into_owned()
    }
}
