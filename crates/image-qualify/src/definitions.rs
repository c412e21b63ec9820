//! The line-oriented rule definition format.
//!
//! Each non-blank line holds one rule, as a pattern and a domain separated
//! by whitespace:
//!
//! ```text
//! # comments start with a `#`
//! repo/busybox:v1*   v1.io
//! */*                repo.io
//! *                  docker.io
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::rule::{Rule, RuleError, RuleErrorKind};

/// An error while loading rule definitions from a file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("couldn't read rule definitions from {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule definition in {}", .path.display())]
    Rule {
        path: PathBuf,
        #[source]
        source: RuleError,
    },
}

/// Parse rule definitions, in their original order.
///
/// Fails on the first invalid line; errors carry that line's 1-based
/// number and trimmed text.
pub fn parse_definitions(input: &str) -> Result<Vec<Rule>, RuleError> {
    let mut rules = vec![];

    for (idx, line) in input.lines().enumerate() {
        let fields = line.split_whitespace().collect::<Vec<_>>();

        match fields.as_slice() {
            [] => continue,
            [first, ..] if first.starts_with('#') => continue,
            [pattern, domain] => {
                let rule = Rule::new(*pattern, *domain)
                    .map_err(|err| err.at_line(idx + 1, line.trim()))?;
                rules.push(rule);
            }
            _ => {
                return Err(RuleError::from(RuleErrorKind::MalformedRuleLine {
                    found: fields.len(),
                })
                .at_line(idx + 1, line.trim()));
            }
        }
    }

    Ok(rules)
}

/// Read and parse the rule definitions in the file at `path`.
pub fn load_definitions(path: impl AsRef<Path>) -> Result<Vec<Rule>, LoadError> {
    let path = path.as_ref();

    tracing::debug!("loading rule definitions from {}", path.display());

    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.into(),
        source,
    })?;

    parse_definitions(&contents).map_err(|source| LoadError::Rule {
        path: path.into(),
        source,
    })
}
