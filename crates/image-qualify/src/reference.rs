//! Decomposition of container image references and reference patterns.
//!
//! A reference like `localhost:5000/team/app:v2@sha256:...` decomposes into
//! a domain (`localhost:5000`), a library (`team`), an image (`app`), a tag
//! (`v2`) and a digest (`sha256:...`). Rule patterns decompose the same way,
//! with a grammar that also admits glob syntax.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

use crate::glob;

/// The longest `domain/path` name we accept.
const NAME_TOTAL_LENGTH_MAX: usize = 255;

static REFERENCE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        ^
        (?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])            # first label
        (?:\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))*     # more labels
        (?::[0-9]+)?                                                   # optional port
        $
        "#,
    )
    .unwrap()
});

static REFERENCE_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").unwrap());

static REFERENCE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").unwrap());

// Pattern grammars admit glob syntax over the characters a reference could
// contain at that position. Glob syntax itself is checked by `glob::translate`.

static PATTERN_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._*?\[\]^\\-]+(?::[0-9*?\[\]^\\-]+)?$").unwrap()
});

static PATTERN_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._*?\[\]^\\-]+$").unwrap());

static PATTERN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.*?\[\]^\\-]{1,128}$").unwrap());

static DIGEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        ^
        ([a-z0-9]+(?:[+._-][a-z0-9]+)*)     # (1) algorithm
        :
        (.+)                                # (2) encoded portion
        $
        "#,
    )
    .unwrap()
});

static PATTERN_ENCODED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9*?\[\]^\\-]+$").unwrap());

/// Why a string failed to parse as a reference or pattern.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The input is the empty string.
    #[error("repository name must have at least one component")]
    Empty,
    /// The repository path would be valid, but contains uppercase letters.
    #[error("repository name must be lowercase")]
    ContainsUppercase,
    /// The `domain/path` name is longer than 255 characters.
    #[error("repository name must not be more than 255 characters")]
    NameTooLong,
    /// The input doesn't follow the reference grammar.
    #[error("invalid reference format")]
    InvalidFormat,
    /// The input is a pattern with malformed glob syntax.
    #[error("syntax error in pattern")]
    PatternSyntax,
}

/// Why a digest failed validation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestReason {
    /// The digest isn't of the form `<algorithm>:<hex>`.
    #[error("invalid checksum digest format")]
    Format,
    /// The digest's hex portion has the wrong length for its algorithm.
    #[error("invalid checksum digest length")]
    Length,
}

/// An error produced while decomposing a reference or pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The input is not a syntactically valid reference or pattern.
    #[error("invalid reference {input:?}: {reason}")]
    InvalidReference {
        /// The offending input.
        input: String,
        /// What was wrong with it.
        reason: InvalidReason,
    },
    /// The input has a digest suffix, but the digest is malformed.
    #[error("invalid digest {digest:?}: {reason}")]
    InvalidDigest {
        /// The offending digest, without its leading `@`.
        digest: String,
        /// What was wrong with it.
        reason: DigestReason,
    },
}

impl ReferenceError {
    pub(crate) fn invalid(input: &str, reason: InvalidReason) -> Self {
        Self::InvalidReference {
            input: input.into(),
            reason,
        }
    }

    fn digest(digest: &str, reason: DigestReason) -> Self {
        Self::InvalidDigest {
            digest: digest.into(),
            reason,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Reference,
    Pattern,
}

impl Mode {
    fn domain(self) -> &'static Regex {
        match self {
            Mode::Reference => &REFERENCE_DOMAIN,
            Mode::Pattern => &PATTERN_DOMAIN,
        }
    }

    fn component(self) -> &'static Regex {
        match self {
            Mode::Reference => &REFERENCE_COMPONENT,
            Mode::Pattern => &PATTERN_COMPONENT,
        }
    }

    fn tag(self) -> &'static Regex {
        match self {
            Mode::Reference => &REFERENCE_TAG,
            Mode::Pattern => &PATTERN_TAG,
        }
    }
}

/// The structural parts of a reference or pattern.
///
/// Absent components are `None`; a component that is literally `*` means
/// "any value" and is distinct from the component being absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceParts {
    raw: String,
    domain: Option<String>,
    path: String,
    library: Option<String>,
    image: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ReferenceParts {
    /// The original input.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The domain (registry) component, e.g. `quay.io` or `localhost:5000`.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Everything between the domain and the final image name.
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    /// The final image name.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// The tag, without its leading `:`.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The digest, without its leading `@`.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// `library/image`, or just `image` when there's no library.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The number of `/`-separated segments in [`Self::path`], plus one
    /// when a domain is present.
    pub fn depth(&self) -> usize {
        self.path.split('/').count() + usize::from(self.domain.is_some())
    }

    /// Whether this reference carries a domain component.
    pub fn is_qualified(&self) -> bool {
        self.domain.is_some()
    }
}

impl fmt::Display for ReferenceParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Decompose a container image reference.
///
/// ```
/// let parts = image_qualify::decompose("localhost:5000/team/app:v2").unwrap();
/// assert_eq!(parts.domain(), Some("localhost:5000"));
/// assert_eq!(parts.library(), Some("team"));
/// assert_eq!(parts.image(), "app");
/// assert_eq!(parts.tag(), Some("v2"));
/// ```
pub fn decompose(reference: &str) -> Result<ReferenceParts, ReferenceError> {
    decompose_with(reference, Mode::Reference)
}

/// Decompose a rule pattern.
///
/// Patterns follow the reference grammar, but may contain glob syntax and
/// get one extra domain rule: when the name has more than one `/`, its
/// leading segment is the domain even if it doesn't look like one. This
/// attributes the first `*` in `*/*/*` to the domain slot.
pub fn decompose_pattern(pattern: &str) -> Result<ReferenceParts, ReferenceError> {
    decompose_with(pattern, Mode::Pattern)
}

/// Validate `image` as a reference and split off its domain, if any.
///
/// ```
/// use image_qualify::split_image_name;
///
/// assert_eq!(split_image_name("busybox").unwrap(), (None, "busybox"));
/// assert_eq!(
///     split_image_name("gcr.io/foo/busybox").unwrap(),
///     (Some("gcr.io"), "foo/busybox")
/// );
/// ```
pub fn split_image_name(image: &str) -> Result<(Option<&str>, &str), ReferenceError> {
    let parts = decompose(image)?;

    Ok(match parts.domain() {
        Some(domain) => (Some(&image[..domain.len()]), &image[domain.len() + 1..]),
        None => (None, image),
    })
}

fn decompose_with(input: &str, mode: Mode) -> Result<ReferenceParts, ReferenceError> {
    if input.is_empty() {
        return Err(ReferenceError::invalid(input, InvalidReason::Empty));
    }

    if mode == Mode::Pattern {
        glob::translate(input)
            .map_err(|_| ReferenceError::invalid(input, InvalidReason::PatternSyntax))?;
    }

    let (name_and_tag, digest) = match input.rsplit_once('@') {
        Some((name_and_tag, digest)) => (name_and_tag, Some(digest)),
        None => (input, None),
    };

    let (domain, remainder) = split_domain(name_and_tag, mode);
    let (path, tag) = split_tag(remainder);
    let (library, image) = match path.rsplit_once('/') {
        Some((library, image)) => (Some(library), image),
        None => (None, path),
    };

    if let Some(domain) = domain
        && !mode.domain().is_match(domain)
    {
        return Err(ReferenceError::invalid(input, InvalidReason::InvalidFormat));
    }

    for component in path.split('/') {
        if !mode.component().is_match(component) {
            let reason = if mode
                .component()
                .is_match(&component.to_ascii_lowercase())
            {
                InvalidReason::ContainsUppercase
            } else {
                InvalidReason::InvalidFormat
            };
            return Err(ReferenceError::invalid(input, reason));
        }
    }

    if let Some(tag) = tag
        && !mode.tag().is_match(tag)
    {
        return Err(ReferenceError::invalid(input, InvalidReason::InvalidFormat));
    }

    let name_len = domain.map_or(0, |domain| domain.len() + 1) + path.len();
    if name_len > NAME_TOTAL_LENGTH_MAX {
        return Err(ReferenceError::invalid(input, InvalidReason::NameTooLong));
    }

    match digest {
        Some("") => return Err(ReferenceError::invalid(input, InvalidReason::InvalidFormat)),
        Some(digest) => validate_digest(digest, mode)?,
        None => {}
    }

    Ok(ReferenceParts {
        raw: input.into(),
        domain: domain.map(Into::into),
        path: path.into(),
        library: library.map(Into::into),
        image: image.into(),
        tag: tag.map(Into::into),
        digest: digest.map(Into::into),
    })
}

fn looks_like_domain(segment: &str) -> bool {
    segment == "localhost" || segment.contains(['.', ':'])
}

fn split_domain(name: &str, mode: Mode) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((domain, rest)) if looks_like_domain(domain) => (Some(domain), rest),
        // Patterns like `*/*/*` need their leading segment attributed to
        // the domain, even though `*` doesn't look like one.
        Some((domain, rest)) if mode == Mode::Pattern && rest.contains('/') => (Some(domain), rest),
        _ => (None, name),
    }
}

/// Splits a tag off the final path segment of `remainder`, at its first
/// unescaped `:`.
fn split_tag(remainder: &str) -> (&str, Option<&str>) {
    let start = remainder.rfind('/').map_or(0, |idx| idx + 1);

    match find_unescaped(&remainder[start..], ':') {
        Some(idx) => (
            &remainder[..start + idx],
            Some(&remainder[start + idx + 1..]),
        ),
        None => (remainder, None),
    }
}

fn find_unescaped(haystack: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in haystack.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            c if c == needle => return Some(idx),
            _ => {}
        }
    }
    None
}

fn validate_digest(digest: &str, mode: Mode) -> Result<(), ReferenceError> {
    let Some(caps) = DIGEST.captures(digest) else {
        return Err(ReferenceError::digest(digest, DigestReason::Format));
    };

    let algorithm = &caps[1];
    let encoded = &caps[2];

    // A globbed digest can't be length-checked; only its alphabet can.
    if mode == Mode::Pattern && encoded.contains(['*', '?', '[', '\\']) {
        return if PATTERN_ENCODED.is_match(encoded) {
            Ok(())
        } else {
            Err(ReferenceError::digest(digest, DigestReason::Format))
        };
    }

    let expected_len = match algorithm {
        "sha256" => Some(64),
        "sha384" => Some(96),
        "sha512" => Some(128),
        _ => None,
    };

    match expected_len {
        Some(len) => {
            if !encoded
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, 'a'..='f'))
            {
                return Err(ReferenceError::digest(digest, DigestReason::Format));
            }
            if encoded.len() != len {
                return Err(ReferenceError::digest(digest, DigestReason::Length));
            }
        }
        None => {
            if !encoded.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ReferenceError::digest(digest, DigestReason::Format));
            }
            if encoded.len() < 32 {
                return Err(ReferenceError::digest(digest, DigestReason::Length));
            }
        }
    }

    Ok(())
}
