//! Input path expansion.
//!
//! Command-line inputs may be literal paths or glob patterns (useful on
//! shells that do not expand globs themselves). Literal paths are kept even
//! when they do not exist, so the driver can report them as missing. An
//! argument naming an existing file is taken literally even if it contains
//! glob metacharacters.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, glob_with};

use crate::error::NormalizeError;

/// Expand `patterns` into input paths, preserving argument order.
///
/// Matches of one pattern are returned in the alphabetical order produced
/// by [`glob`]. A pattern that matches nothing contributes nothing.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidPattern`] for a malformed pattern.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
///
/// use volnorm::expand_inputs;
///
/// let inputs = expand_inputs(&["no such file.mp4"])?;
/// assert_eq!(inputs, vec![PathBuf::from("no such file.mp4")]);
/// # Ok::<(), volnorm::NormalizeError>(())
/// ```
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>, NormalizeError> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut inputs = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !is_pattern(pattern) || Path::new(pattern).exists() {
            inputs.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob_with(pattern, options).map_err(|error| NormalizeError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: error.msg.to_string(),
        })?;

        let before = inputs.len();
        for entry in entries {
            match entry {
                Ok(path) => inputs.push(path),
                Err(error) => log::warn!("Skipping unreadable path {}: {}", error.path().display(), error),
            }
        }
        if inputs.len() == before {
            log::warn!("Pattern {pattern:?} matched no files");
        }
    }

    Ok(inputs)
}

fn is_pattern(value: &str) -> bool {
    value.contains(['*', '?', '['])
}
