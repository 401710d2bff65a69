//! Normalization configuration.
//!
//! [`NormalizeOptions`] is a builder holding every run-wide setting. It is
//! constructed once, then only read: the driver derives one
//! [`NormalizationRequest`] per input file from it.
//!
//! # Example
//!
//! ```
//! use volnorm::{NormalizationMode, NormalizeOptions};
//!
//! let options = NormalizeOptions::new()
//!     .with_target_level(-23.0)
//!     .with_mode(NormalizationMode::Peak)
//!     .with_output_dir("out")
//!     .with_prefix("");
//!
//! let request = options.request("/media/clip.mov");
//! assert_eq!(request.output_path, std::path::Path::new("out/clip.mp4"));
//! assert!(request.use_peak());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::gain::NormalizationMode;
use crate::progress::{NoOpProgress, ProgressCallback};

/// Default target level in dB.
pub const DEFAULT_TARGET_LEVEL_DB: f64 = -26.0;
/// Default audio bitrate in kbit/s.
pub const DEFAULT_BITRATE_KBPS: u32 = 320;
/// Default output file prefix.
pub const DEFAULT_PREFIX: &str = "normalized";
/// Extension of every output file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Run-wide normalization settings.
///
/// All fields have the defaults of the command-line tool; see
/// [`NormalizeOptions::new`].
#[derive(Clone)]
pub struct NormalizeOptions {
    pub(crate) target_level_db: f64,
    pub(crate) mode: NormalizationMode,
    pub(crate) bitrate_kbps: u32,
    pub(crate) output_dir: PathBuf,
    pub(crate) prefix: String,
    pub(crate) force_overwrite: bool,
    pub(crate) dry_run: bool,
    pub(crate) read_only: bool,
    pub(crate) strict: bool,
    pub(crate) threads: Option<usize>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for NormalizeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("NormalizeOptions")
            .field("target_level_db", &self.target_level_db)
            .field("mode", &self.mode)
            .field("bitrate_kbps", &self.bitrate_kbps)
            .field("output_dir", &self.output_dir)
            .field("prefix", &self.prefix)
            .field("force_overwrite", &self.force_overwrite)
            .field("dry_run", &self.dry_run)
            .field("read_only", &self.read_only)
            .field("strict", &self.strict)
            .field("threads", &self.threads)
            .finish()
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizeOptions {
    /// Create options with default settings.
    ///
    /// Defaults: target -26 dB, mean mode, 320 kbit/s, output into the
    /// current directory with the `normalized` prefix, no overwrite, no dry
    /// run, not read-only, lenient error handling, sequential processing.
    pub fn new() -> Self {
        Self {
            target_level_db: DEFAULT_TARGET_LEVEL_DB,
            mode: NormalizationMode::Mean,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            output_dir: PathBuf::from("."),
            prefix: DEFAULT_PREFIX.to_string(),
            force_overwrite: false,
            dry_run: false,
            read_only: false,
            strict: false,
            threads: None,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the target level in dB.
    #[must_use]
    pub fn with_target_level(mut self, level_db: f64) -> Self {
        self.target_level_db = level_db;
        self
    }

    /// Choose whether the mean or the peak level is normalized.
    #[must_use]
    pub fn with_mode(mut self, mode: NormalizationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the output audio bitrate in kbit/s.
    #[must_use]
    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = kbps;
        self
    }

    /// Set the directory output files are written to.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the output file prefix. An empty prefix disables it.
    #[must_use]
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Overwrite existing output files instead of skipping them.
    #[must_use]
    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Build encode commands without running them.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Only analyze files; never encode.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Stop the whole batch at the first file whose analysis fails.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Number of worker threads for
    /// [`Normalizer::run_parallel`](crate::Normalizer). `None` or `0` uses
    /// the rayon default.
    #[must_use]
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads.filter(|&count| count > 0);
        self
    }

    /// Attach a progress callback, fired after each file.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Target level in dB.
    pub fn target_level_db(&self) -> f64 {
        self.target_level_db
    }

    /// Normalization mode.
    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Whether read-only mode is on.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Whether strict mode is on.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Output path for `input` under these options.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        derive_output_path(input, &self.output_dir, &self.prefix)
    }

    /// The per-file request for `input`.
    pub fn request<P: AsRef<Path>>(&self, input: P) -> NormalizationRequest {
        let input = input.as_ref();
        NormalizationRequest {
            input_path: input.to_path_buf(),
            target_level_db: self.target_level_db,
            mode: self.mode,
            bitrate_kbps: self.bitrate_kbps,
            output_path: self.output_path_for(input),
            force_overwrite: self.force_overwrite,
            dry_run: self.dry_run,
        }
    }
}

/// Everything needed to normalize one file.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationRequest {
    /// File to read.
    pub input_path: PathBuf,
    /// Target level in dB.
    pub target_level_db: f64,
    /// Which metric is moved onto the target.
    pub mode: NormalizationMode,
    /// Output audio bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// File to write.
    pub output_path: PathBuf,
    /// Overwrite `output_path` if it exists.
    pub force_overwrite: bool,
    /// Build the encode command without running it.
    pub dry_run: bool,
}

impl NormalizationRequest {
    /// `true` when the peak rather than the mean is normalized.
    pub fn use_peak(&self) -> bool {
        self.mode == NormalizationMode::Peak
    }
}

/// Output path for `input`: `output_dir/[prefix_]stem.mp4`.
///
/// Only the file stem of `input` is kept; its directory and extension are
/// dropped.
///
/// ```
/// use std::path::Path;
///
/// use volnorm::derive_output_path;
///
/// let path = derive_output_path(Path::new("/a/b/clip.mov"), Path::new("/out"), "normalized");
/// assert_eq!(path, Path::new("/out/normalized_clip.mp4"));
/// ```
pub fn derive_output_path(input: &Path, output_dir: &Path, prefix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = if prefix.is_empty() {
        format!("{stem}.{OUTPUT_EXTENSION}")
    } else {
        format!("{prefix}_{stem}.{OUTPUT_EXTENSION}")
    };
    output_dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_with_prefix() {
        let path = derive_output_path(Path::new("/a/b/clip.mov"), Path::new("/out"), "normalized");
        assert_eq!(path, PathBuf::from("/out/normalized_clip.mp4"));
    }

    #[test]
    fn output_path_without_prefix() {
        let path = derive_output_path(Path::new("/a/b/clip.mov"), Path::new("/out"), "");
        assert_eq!(path, PathBuf::from("/out/clip.mp4"));
    }

    #[test]
    fn output_path_keeps_inner_dots_and_spaces() {
        let path = derive_output_path(Path::new("take 2.final.mkv"), Path::new("."), "n");
        assert_eq!(path, PathBuf::from("./n_take 2.final.mp4"));
    }

    #[test]
    fn request_copies_options() {
        let options = NormalizeOptions::new()
            .with_target_level(-20.0)
            .with_bitrate(192)
            .with_force_overwrite(true)
            .with_dry_run(true)
            .with_output_dir("/out");
        let request = options.request("/a/b/clip.mov");

        assert_eq!(request.input_path, PathBuf::from("/a/b/clip.mov"));
        assert_eq!(request.target_level_db, -20.0);
        assert_eq!(request.bitrate_kbps, 192);
        assert_eq!(request.output_path, PathBuf::from("/out/normalized_clip.mp4"));
        assert!(request.force_overwrite);
        assert!(request.dry_run);
        assert!(!request.use_peak());
    }

    #[test]
    fn zero_threads_means_default() {
        let options = NormalizeOptions::new().with_threads(Some(0));
        assert_eq!(options.threads, None);
    }

    #[test]
    fn debug_lists_settings() {
        let debug = format!("{:?}", NormalizeOptions::new());
        assert!(debug.contains("NormalizeOptions"));
        assert!(debug.contains("target_level_db: -26.0"));
        assert!(debug.contains("bitrate_kbps: 320"));
    }
}
