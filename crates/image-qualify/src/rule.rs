//! Qualification rules.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::{
    domain::{DomainError, validate_domain},
    glob::Glob,
    reference::{InvalidReason, ReferenceError, ReferenceParts, decompose_pattern},
};

/// A single rule: references matching `pattern` get qualified with `domain`.
///
/// Rules are validated and decomposed once, on construction. A `Rule`
/// that exists is always usable.
#[derive(Clone, Debug)]
pub struct Rule {
    pattern: String,
    domain: String,
    parts: ReferenceParts,
    glob: Glob,
}

impl Rule {
    /// Build a rule, validating both its pattern and its domain.
    pub fn new(pattern: impl Into<String>, domain: impl Into<String>) -> Result<Self, RuleError> {
        let pattern = pattern.into();
        let domain = domain.into();

        let parts = decompose_pattern(&pattern).map_err(|source| RuleErrorKind::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;

        let glob = Glob::new(pattern.as_str()).map_err(|_| RuleErrorKind::InvalidPattern {
            pattern: pattern.clone(),
            source: ReferenceError::invalid(&pattern, InvalidReason::PatternSyntax),
        })?;

        validate_domain(&domain).map_err(|source| RuleErrorKind::InvalidDomain {
            domain: domain.clone(),
            source,
        })?;

        Ok(Self {
            pattern,
            domain,
            parts,
            glob,
        })
    }

    /// The pattern, as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The domain matching references are qualified with.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The pattern's decomposition.
    pub fn parts(&self) -> &ReferenceParts {
        &self.parts
    }

    /// Whether the pattern contains a `*`.
    pub fn is_wildcard(&self) -> bool {
        self.pattern.contains('*')
    }

    /// Whether `reference` matches this rule's pattern.
    pub fn matches(&self, reference: &str) -> bool {
        self.glob.matches(reference)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.domain == other.domain
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pattern, self.domain)
    }
}

/// The unvalidated shape of a rule, as found in structured configuration.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub pattern: String,
    pub domain: String,
}

impl TryFrom<RuleDefinition> for Rule {
    type Error = RuleError;

    fn try_from(value: RuleDefinition) -> Result<Self, Self::Error> {
        Rule::new(value.pattern, value.domain)
    }
}

/// What was wrong with a rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleErrorKind {
    #[error("invalid pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ReferenceError,
    },
    #[error("invalid domain {domain:?}")]
    InvalidDomain {
        domain: String,
        #[source]
        source: DomainError,
    },
    #[error("invalid field count {found}; expected <pattern> <domain>")]
    MalformedRuleLine { found: usize },
}

/// A rule that failed validation, with its location when it came from a
/// rule definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    /// The 1-based line the rule was defined on.
    pub line: Option<usize>,
    /// The (trimmed) text of that line.
    pub definition: Option<String>,
    pub kind: RuleErrorKind,
}

impl RuleError {
    pub(crate) fn at_line(mut self, line: usize, definition: &str) -> Self {
        self.line = Some(line);
        self.definition = Some(definition.into());
        self
    }
}

impl From<RuleErrorKind> for RuleError {
    fn from(kind: RuleErrorKind) -> Self {
        Self {
            line: None,
            definition: None,
            kind,
        }
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, &self.definition) {
            (Some(line), Some(definition)) => {
                write!(f, "line {line}: {}: {definition:?}", self.kind)
            }
            (Some(line), None) => write!(f, "line {line}: {}", self.kind),
            _ => fmt::Display::fmt(&self.kind, f),
        }
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}
