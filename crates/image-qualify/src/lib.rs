//! Qualify bare container image references with a domain, by rule.
//!
//! A bare reference like `busybox:latest` doesn't say which registry it
//! comes from. Given a set of rules mapping glob patterns to domains, this
//! crate picks the most specific matching rule and prefixes the reference
//! with that rule's domain:
//!
//! ```
//! use image_qualify::{Rule, prioritize};
//!
//! let rules = prioritize([
//!     Rule::new("*", "docker.io").unwrap(),
//!     Rule::new("*/*", "quay.io").unwrap(),
//! ]);
//!
//! assert_eq!(rules.qualify("busybox").unwrap().as_str(), "docker.io/busybox");
//! assert_eq!(rules.qualify("team/app").unwrap().as_str(), "quay.io/team/app");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_debug_implementations)]

mod definitions;
mod domain;
mod glob;
mod qualify;
mod reference;
mod rule;
mod sort;

pub use definitions::{LoadError, load_definitions, parse_definitions};
pub use domain::{DomainError, validate_domain};
pub use glob::{Glob, GlobError};
pub use qualify::{Qualification, Qualified, QualifyError, qualify};
pub use reference::{
    DigestReason, InvalidReason, ReferenceError, ReferenceParts, decompose, decompose_pattern,
    split_image_name,
};
pub use rule::{Rule, RuleDefinition, RuleError, RuleErrorKind};
pub use sort::{RuleSet, prioritize};
