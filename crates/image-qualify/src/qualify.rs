//! Matching references against a rule set.

use std::fmt;

use thiserror::Error;

use crate::{
    reference::{ReferenceError, decompose},
    rule::Rule,
    sort::RuleSet,
};

/// A reference that a rule qualified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Qualified<'r> {
    rule: &'r Rule,
    reference: String,
}

impl<'r> Qualified<'r> {
    /// The rule that matched.
    pub fn rule(&self) -> &'r Rule {
        self.rule
    }

    /// The domain the reference was qualified with.
    pub fn domain(&self) -> &'r str {
        self.rule.domain()
    }

    /// The qualified reference, i.e. `<domain>/<reference>`.
    pub fn as_str(&self) -> &str {
        &self.reference
    }

    pub fn into_string(self) -> String {
        self.reference
    }
}

impl fmt::Display for Qualified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

/// The outcome of [`RuleSet::qualify_image`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Qualification<'r> {
    /// The image already names a domain; it's left as is.
    AlreadyQualified,
    /// No rule matched the image.
    Unmatched,
    /// A rule matched, and the qualified reference checks out.
    Qualified(Qualified<'r>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualifyError {
    #[error("invalid image {image:?}")]
    InvalidImage {
        image: String,
        #[source]
        source: ReferenceError,
    },
    #[error("qualified reference {qualified:?} is invalid")]
    InvalidQualified {
        qualified: String,
        #[source]
        source: ReferenceError,
    },
    #[error("qualified reference {qualified:?} doesn't decompose into {domain:?} and {image:?}")]
    Mismatch {
        qualified: String,
        domain: String,
        image: String,
    },
}

/// Qualify `reference` with the domain of the first rule in `rules` that
/// matches it.
///
/// `reference` is expected to be bare (i.e. not to have a domain already);
/// this isn't checked. Returns `None` when no rule matches.
pub fn qualify<'r>(reference: &str, rules: &'r RuleSet) -> Option<Qualified<'r>> {
    let rule = rules.iter().find(|rule| rule.matches(reference))?;

    tracing::debug!(
        "{reference} matched {pattern}, qualifying with {domain}",
        pattern = rule.pattern(),
        domain = rule.domain()
    );

    Some(Qualified {
        rule,
        reference: format!("{}/{reference}", rule.domain()),
    })
}

impl RuleSet {
    /// See [`qualify`].
    pub fn qualify(&self, reference: &str) -> Option<Qualified<'_>> {
        qualify(reference, self)
    }

    /// Validate and qualify `image`.
    ///
    /// Unlike [`RuleSet::qualify`], this checks that `image` is a valid
    /// reference, leaves qualified images alone, and checks that the
    /// qualified result decomposes back into the rule's domain and the
    /// original image.
    pub fn qualify_image(&self, image: &str) -> Result<Qualification<'_>, QualifyError> {
        let original = decompose(image).map_err(|source| QualifyError::InvalidImage {
            image: image.into(),
            source,
        })?;

        if original.is_qualified() {
            tracing::debug!("{image} is already qualified");
            return Ok(Qualification::AlreadyQualified);
        }

        let Some(qualified) = self.qualify(image) else {
            tracing::debug!("no rule matches {image}");
            return Ok(Qualification::Unmatched);
        };

        let recovered =
            decompose(qualified.as_str()).map_err(|source| QualifyError::InvalidQualified {
                qualified: qualified.as_str().into(),
                source,
            })?;

        if recovered.domain() != Some(qualified.domain())
            || recovered.path() != original.path()
            || recovered.tag() != original.tag()
            || recovered.digest() != original.digest()
        {
            return Err(QualifyError::Mismatch {
                domain: qualified.domain().into(),
                qualified: qualified.into_string(),
                image: image.into(),
            });
        }

        Ok(Qualification::Qualified(qualified))
    }
}
