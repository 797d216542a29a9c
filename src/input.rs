//! Reading build logs from disk or stdin.
//!
//! Archived console logs are often stored zstd-compressed; a `.zst`
//! extension is decoded transparently. Logs are decoded as UTF-8 lossily
//! since CI output regularly contains stray bytes.

use std::io::Read;
use std::path::{Path, PathBuf};

/// Errors from loading input logs.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decompress {path}: {source}")]
    Decompress {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid input pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("no input matches '{0}'")]
    NoMatch(String),
}

/// Path that stands for standard input.
pub const STDIN: &str = "-";

/// Read a whole log. `-` reads stdin; `*.zst` files are decompressed.
pub fn read_log(path: &Path) -> Result<String, InputError> {
    let read_err = |e: std::io::Error| InputError::Read {
        path: path.to_path_buf(),
        source: e,
    };

    let bytes = if path.as_os_str() == STDIN {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).map_err(read_err)?;
        buf
    } else {
        std::fs::read(path).map_err(read_err)?
    };

    let bytes = if path.extension().is_some_and(|ext| ext == "zst") {
        zstd::decode_all(bytes.as_slice()).map_err(|e| InputError::Decompress {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        bytes
    };

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Expand glob patterns into a sorted, de-duplicated list per pattern.
///
/// A pattern without glob matches is kept verbatim when it is `-` or names
/// an existing file, so plain paths with glob metacharacters still work.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>, InputError> {
    let mut out = Vec::new();
    for pattern in patterns {
        if pattern == STDIN {
            out.push(PathBuf::from(STDIN));
            continue;
        }

        let mut matched: Vec<PathBuf> = glob::glob(pattern)
            .map_err(|e| InputError::Pattern {
                pattern: pattern.clone(),
                source: e,
            })?
            .filter_map(|entry| match entry {
                Ok(path) if path.is_file() => Some(path),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable glob entry");
                    None
                }
            })
            .collect();

        if matched.is_empty() {
            let literal = PathBuf::from(pattern);
            if literal.is_file() {
                matched.push(literal);
            } else {
                return Err(InputError::NoMatch(pattern.clone()));
            }
        }

        matched.sort();
        matched.dedup();
        out.extend(matched);
    }
    Ok(out)
}

/// Build name implied by a log path: the file name without `.zst`/`.log`/`.txt`.
pub fn build_name_from_path(path: &Path) -> String {
    if path.as_os_str() == STDIN {
        return "stdin".to_string();
    }
    let mut name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("stdin")
        .to_string();
    for suffix in [".zst", ".log", ".txt"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.to_string();
        }
    }
    name
}
