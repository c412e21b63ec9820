//! Path-style glob patterns.
//!
//! Globs are translated into anchored regular expressions once, when they're
//! constructed. The dialect is the usual path-match one:
//!
//! * `*` matches any run of characters other than `/`, including the empty run;
//! * `?` matches exactly one character other than `/`;
//! * `[...]` matches one character from a class. A leading `^` negates the
//!   class, `lo-hi` denotes a range, and classes never match `/`;
//! * `\` escapes the next character, both inside and outside of classes.
//!
//! Wildcards never cross a `/`: matching several path segments takes one
//! wildcard per segment, e.g. `*/*` matches `repo/nginx` but `*` doesn't.
//! They do cross `:` and `@`, so `*/*` also matches `repo/nginx:latest`.

use std::{fmt, iter::Peekable, str::CharIndices};

use regex::Regex;
use thiserror::Error;

/// A malformed glob pattern.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("syntax error in pattern")]
pub struct GlobError {
    /// The byte offset of the construct that failed to parse.
    pub offset: usize,
}

/// A compiled glob pattern.
#[derive(Clone, Debug)]
pub struct Glob {
    source: String,
    regex: Regex,
}

impl Glob {
    /// Compile the given glob pattern.
    pub fn new(pattern: impl Into<String>) -> Result<Self, GlobError> {
        let source = pattern.into();
        let translated = translate(&source)?;
        let regex = Regex::new(&translated).map_err(|_| GlobError { offset: 0 })?;

        Ok(Self { source, regex })
    }

    /// Returns the original glob pattern.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns whether `candidate` matches this glob in its entirety.
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Glob {}

impl fmt::Display for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

type Chars<'a> = Peekable<CharIndices<'a>>;

/// Translates a glob pattern into an anchored regular expression.
///
/// This is also how pattern syntax gets validated without paying for
/// a regex compilation.
pub(crate) fn translate(pattern: &str) -> Result<String, GlobError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '\\' => match chars.next() {
                Some((_, escaped)) => push_literal(&mut out, escaped),
                None => return Err(GlobError { offset }),
            },
            '[' => translate_class(&mut chars, offset, &mut out)?,
            c => push_literal(&mut out, c),
        }
    }

    out.push('$');
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Translates a character class, starting just after its opening `[`.
fn translate_class(chars: &mut Chars<'_>, start: usize, out: &mut String) -> Result<(), GlobError> {
    let negated = chars.next_if(|&(_, c)| c == '^').is_some();
    let mut ranges = vec![];

    loop {
        match chars.peek() {
            None => return Err(GlobError { offset: start }),
            // `]` only closes a class once it has at least one member.
            Some(&(_, ']')) if !ranges.is_empty() => {
                chars.next();
                break;
            }
            Some(_) => {}
        }

        let lo = class_member(chars, start)?;
        let hi = if chars.next_if(|&(_, c)| c == '-').is_some() {
            class_member(chars, start)?
        } else {
            lo
        };

        if lo > hi {
            return Err(GlobError { offset: start });
        }

        ranges.push((lo, hi));
    }

    // Every member is emitted as a hex escape, which sidesteps the regex
    // crate's own class metacharacters (`&&`, `--`, `~~`, nested `[`).
    let members = ranges
        .iter()
        .map(|&(lo, hi)| {
            if lo == hi {
                format!("\\x{{{:X}}}", lo as u32)
            } else {
                format!("\\x{{{:X}}}-\\x{{{:X}}}", lo as u32, hi as u32)
            }
        })
        .collect::<String>();

    if negated {
        out.push_str(&format!("[^{members}/]"));
    } else {
        out.push_str(&format!("[[{members}]&&[^/]]"));
    }

    Ok(())
}

fn class_member(chars: &mut Chars<'_>, start: usize) -> Result<char, GlobError> {
    match chars.next() {
        None | Some((_, '-' | ']')) => Err(GlobError { offset: start }),
        Some((_, '\\')) => chars
            .next()
            .map(|(_, c)| c)
            .ok_or(GlobError { offset: start }),
        Some((_, c)) => Ok(c),
    }
}
