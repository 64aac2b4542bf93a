//! Property chains for addressing properties across an object tree
//!
//! Provides [`PropertyChain`] for identifying a property anywhere in the
//! tree of objects produced by one build.

use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path of property names from the root object to a leaf property
///
/// Used as the key for specifications and resolved values in a build
/// session. Equality and hashing are structural over the segments.
///
/// # Examples
/// - `["price"]` → `price` (a property of the root object)
/// - `["order", "customer", "name"]` → `order.customer.name`
///
/// A chain is never empty: the last segment is the leaf property name on
/// the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyChain(SmallVec<[String; 4]>);

impl PropertyChain {
    /// Create a chain from segments
    ///
    /// # Errors
    /// Returns [`ChainError::Empty`] when `segments` is empty and
    /// [`ChainError::EmptySegment`] when any segment is empty.
    pub fn new<I, S>(segments: I) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: SmallVec<[String; 4]> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ChainError::Empty);
        }
        if segments.iter().any(String::is_empty) {
            return Err(ChainError::EmptySegment);
        }
        Ok(Self(segments))
    }

    /// Create a chain for a property of the root object
    #[inline]
    #[must_use]
    pub fn leaf(name: impl Into<String>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(name.into());
        Self(segments)
    }

    /// Create a chain for `name` on the object found at `prefix`
    ///
    /// The prefix is the property path of the owning object (empty for the
    /// root object).
    #[must_use]
    pub fn under(prefix: &[String], name: impl Into<String>) -> Self {
        let mut segments: SmallVec<[String; 4]> = prefix.iter().cloned().collect();
        segments.push(name.into());
        Self(segments)
    }

    /// Parse a possibly dotted relative path and place it under `prefix`
    ///
    /// # Errors
    /// Returns error if `relative` is not a well-formed chain.
    pub fn parse_under(prefix: &[String], relative: &str) -> Result<Self, ChainError> {
        let relative: Self = relative.parse()?;
        let mut segments: SmallVec<[String; 4]> = prefix.iter().cloned().collect();
        segments.extend(relative.0);
        Ok(Self(segments))
    }

    /// Get chain segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for symmetry with `len`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Leaf property name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Path of the object owning the leaf property
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &[String] {
        &self.0[..self.0.len() - 1]
    }

    /// First segment
    #[inline]
    #[must_use]
    pub fn first(&self) -> &str {
        self.0.first().map_or("", String::as_str)
    }

    /// Split into the first segment and the remaining chain, if any
    #[must_use]
    pub fn split_first(&self) -> (&str, Option<Self>) {
        let rest = if self.0.len() > 1 {
            Some(Self(self.0[1..].iter().cloned().collect()))
        } else {
            None
        };
        (self.first(), rest)
    }

    /// Append a segment, returning new chain
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this chain is a prefix of another
    ///
    /// # Examples
    /// - `order.customer` is prefix of `order.customer.name`
    /// - `order.customer` is NOT prefix of `order.total`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0[..] == other.0[..self.0.len()]
    }

    /// Chain relative to an owning object path
    ///
    /// Returns `None` if the chain does not live strictly below `prefix`.
    #[must_use]
    pub fn relative_to(&self, prefix: &[String]) -> Option<Self> {
        if self.0.len() <= prefix.len() || self.0[..prefix.len()] != *prefix {
            return None;
        }
        Some(Self(self.0[prefix.len()..].iter().cloned().collect()))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for PropertyChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for PropertyChain {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ChainError::Empty);
        }

        let segments = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(ChainError::EmptySegment)
                } else if seg.contains(|c: char| !c.is_alphanumeric() && c != '_') {
                    Err(ChainError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

/// Errors related to property chains
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Chain without any segment
    #[error("property chain is empty")]
    Empty,

    /// Empty segment in chain
    #[error("property chain contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid property name: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),
}
