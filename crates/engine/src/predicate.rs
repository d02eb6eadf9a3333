//! Route predicates: pure functions from a query to a child index.
//!
//! Every predicate declares how many targets it can select so that a Route
//! with too few children is rejected when the orchestration is built.

use std::fmt;

/// Picks one child of a Route node.
///
/// Implementations must be deterministic and must only return indices
/// below [`Predicate::targets`].
pub trait Predicate: Send + Sync {
    /// Index of the child that should handle `query`.
    fn select(&self, query: &str) -> usize;

    /// Number of distinct indices `select` can return (`0..targets`).
    fn targets(&self) -> usize;
}

/// Ordered keyword rules with a default.
///
/// Matching is a case-insensitive substring test; the first rule with any
/// matching keyword wins.
#[derive(Debug, Clone)]
pub struct KeywordRouter {
    rules: Vec<(Vec<String>, usize)>,
    default: usize,
}

impl KeywordRouter {
    pub fn new(default: usize) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Route to `index` when the query contains any of `keywords`.
    pub fn rule<I, S>(mut self, keywords: I, index: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .collect();
        self.rules.push((keywords, index));
        self
    }
}

impl Predicate for KeywordRouter {
    fn select(&self, query: &str) -> usize {
        let query = query.to_lowercase();
        self.rules
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| query.contains(k.as_str())))
            .map(|(_, index)| *index)
            .unwrap_or(self.default)
    }

    fn targets(&self) -> usize {
        self.rules
            .iter()
            .map(|(_, index)| *index)
            .chain(std::iter::once(self.default))
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Compute tier chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Economy,
    Premium,
}

impl Tier {
    /// Child index this tier routes to.
    pub fn index(self) -> usize {
        match self {
            Self::Economy => 0,
            Self::Premium => 1,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Economy => f.write_str("economy"),
            Self::Premium => f.write_str("premium"),
        }
    }
}

/// Sends strategic or long queries to the premium tier.
#[derive(Debug, Clone)]
pub struct TierSelector {
    keywords: Vec<String>,
    length_threshold: usize,
}

impl TierSelector {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
            length_threshold: 200,
        }
    }

    /// Queries longer than this many characters are premium.
    pub fn with_length_threshold(mut self, length_threshold: usize) -> Self {
        self.length_threshold = length_threshold;
        self
    }

    pub fn tier(&self, query: &str) -> Tier {
        let lower = query.to_lowercase();
        let strategic = self.keywords.iter().any(|k| lower.contains(k.as_str()));
        if strategic || query.chars().count() > self.length_threshold {
            Tier::Premium
        } else {
            Tier::Economy
        }
    }
}

impl Predicate for TierSelector {
    fn select(&self, query: &str) -> usize {
        self.tier(query).index()
    }

    fn targets(&self) -> usize {
        2
    }
}

/// A closure with a declared target count.
pub struct FnPredicate<F> {
    f: F,
    targets: usize,
}

impl<F> FnPredicate<F>
where
    F: Fn(&str) -> usize + Send + Sync,
{
    pub fn new(targets: usize, f: F) -> Self {
        Self { f, targets }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn select(&self, query: &str) -> usize {
        (self.f)(query)
    }

    fn targets(&self) -> usize {
        self.targets
    }
}
