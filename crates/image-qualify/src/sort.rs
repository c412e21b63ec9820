//! Rule prioritization.
//!
//! Rules are tried in order and the first match wins, so a rule set has to
//! be ordered from most to least specific. Every rule without a `*` comes
//! before every rule with one; within those two partitions, rules are
//! ordered by the comparators in [`PRECEDENCE`], then by their text.

use std::cmp::Ordering;

use crate::{reference::ReferenceParts, rule::Rule};

type Comparator = fn(&ReferenceParts, &ReferenceParts) -> Ordering;

/// Pattern comparators, most significant first.
///
/// Each returns [`Ordering::Less`] when its left operand is the more
/// specific one, i.e. should be tried first.
const PRECEDENCE: &[Comparator] = &[
    by_depth,
    by_digest,
    by_tag,
    by_image,
    by_library,
    by_domain,
];

/// An ordered, immutable set of rules.
///
/// The only way to get one is through [`prioritize`] (or `collect()`, which
/// prioritizes), so a `RuleSet` is always in match order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// The rules, in match order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        prioritize(iter)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Order `rules` from most to least specific.
///
/// The result doesn't depend on the input order: any permutation of the
/// same rules produces the same `RuleSet`.
pub fn prioritize(rules: impl IntoIterator<Item = Rule>) -> RuleSet {
    let (mut explicit, mut wildcard): (Vec<_>, Vec<_>) =
        rules.into_iter().partition(|rule| !rule.is_wildcard());

    explicit.sort_by(compare_rules);
    wildcard.sort_by(compare_rules);

    tracing::debug!(
        "prioritized {} rules ({} explicit, {} wildcard)",
        explicit.len() + wildcard.len(),
        explicit.len(),
        wildcard.len()
    );

    explicit.append(&mut wildcard);
    RuleSet { rules: explicit }
}

fn compare_rules(a: &Rule, b: &Rule) -> Ordering {
    PRECEDENCE
        .iter()
        .map(|compare| compare(a.parts(), b.parts()))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.pattern().cmp(b.pattern()))
        .then_with(|| a.domain().cmp(b.domain()))
}

/// Deeper patterns first.
fn by_depth(a: &ReferenceParts, b: &ReferenceParts) -> Ordering {
    b.depth().cmp(&a.depth())
}

fn by_digest(a: &ReferenceParts, b: &ReferenceParts) -> Ordering {
    specificity(a.digest(), b.digest())
}

fn by_tag(a: &ReferenceParts, b: &ReferenceParts) -> Ordering {
    specificity(a.tag(), b.tag())
}

fn by_image(a: &ReferenceParts, b: &ReferenceParts) -> Ordering {
    specificity(Some(a.image()), Some(b.image()))
}

fn by_library(a: &ReferenceParts, b: &ReferenceParts) -> Ordering {
    specificity(a.library(), b.library())
}

fn by_domain(a: &ReferenceParts, b: &ReferenceParts) -> Ordering {
    specificity(a.domain(), b.domain())
}

/// Compares two optional pattern components.
///
/// A present component beats an absent one, and a literal beats a
/// glob. Literals are ordered lexically; globs by [`compare_wildcards`].
fn specificity(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a), Some(b)) => match (is_glob(a), is_glob(b)) {
            (false, false) => a.cmp(b),
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => compare_wildcards(a, b),
        },
    }
}

fn is_metachar(c: char) -> bool {
    matches!(c, '*' | '?' | '[')
}

fn is_glob(component: &str) -> bool {
    component.contains(is_metachar)
}

/// Compares two glob components character by character.
///
/// At the first difference, a `*` loses to any other character and any
/// other metacharacter loses to a literal. When one component is a prefix
/// of the other, the longer one wins.
fn compare_wildcards(a: &str, b: &str) -> Ordering {
    for (x, y) in a.chars().zip(b.chars()) {
        match (x, y) {
            _ if x == y => continue,
            ('*', _) => return Ordering::Greater,
            (_, '*') => return Ordering::Less,
            _ => {
                return is_metachar(x)
                    .cmp(&is_metachar(y))
                    .then_with(|| x.cmp(&y));
            }
        }
    }

    b.len().cmp(&a.len())
}
