//! Validation of the domains rules qualify references with.

use thiserror::Error;

use crate::reference::{ReferenceError, decompose};

/// Appended to a candidate domain to check that it survives decomposition.
const SANITY_REFERENCE: &str = "foo/bar:latest";

/// A domain that can't be used to qualify references.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The domain is the empty string.
    #[error("domain is empty")]
    Empty,
    /// `<domain>/foo/bar:latest` isn't a valid reference.
    #[error("domain doesn't form a valid reference")]
    Reference(#[from] ReferenceError),
    /// The reference is valid, but its domain isn't the one given.
    #[error("domain doesn't survive decomposition (recovered {recovered:?})")]
    Mismatch { recovered: Option<String> },
}

/// Checks that `domain` can prefix a bare reference.
///
/// The domain is valid iff `<domain>/foo/bar:latest` decomposes back into
/// exactly `domain`. This rejects domains the decomposer wouldn't recognize
/// as such, like `foo` (no `.`, `:` or `localhost`), as well as anything
/// containing a `/`.
pub fn validate_domain(domain: &str) -> Result<(), DomainError> {
    if domain.is_empty() {
        return Err(DomainError::Empty);
    }

    let parts = decompose(&format!("{domain}/{SANITY_REFERENCE}"))?;
    match parts.domain() {
        Some(recovered) if recovered == domain => Ok(()),
        recovered => Err(DomainError::Mismatch {
            recovered: recovered.map(Into::into),
        }),
    }
}
