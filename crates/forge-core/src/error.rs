//! Error types for Forge Core
//!
//! Provides error handling for:
//! - Specification resolution (cycles)
//! - Reference resolution and property assignment
//! - Factory lookups (extensions, combinations)
//! - Persistence and configuration

use forge_accessor::AccessError;
use forge_model::{ChainError, PropertyChain};

/// Main build error type
///
/// Every variant is fatal: the build tree that raised it is abandoned and
/// nothing it produced is saved.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A dependency specification transitively depends on itself
    #[error("cyclic dependency on property '{chain}'")]
    CyclicDependency {
        /// Chain found already in progress
        chain: PropertyChain,
    },

    /// A dotted override names a property the related type lacks
    #[error("unresolvable reference '{path}'")]
    UnresolvableReference {
        /// Full dotted path as seen from the root object
        path: String,
    },

    /// The setter failed while assigning a value
    #[error("failed to assign '{type_name}::{property}': {source}")]
    AssignmentFailed {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Property being assigned
        property: String,
        /// Underlying accessor failure
        #[source]
        source: AccessError,
    },

    /// A value was supplied for a property the type does not declare
    #[error("no property '{property}' in '{type_name}'")]
    NoSuchProperty {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Requested property
        property: String,
    },

    /// Build requested an extension that was never registered
    #[error("unknown extension '{name}' for '{type_name}'")]
    UnknownExtension {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Requested extension
        name: String,
    },

    /// Build requested a combination that was never defined
    #[error("unknown combination '{name}' for '{type_name}'")]
    UnknownCombination {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Requested combination
        name: String,
    },

    /// Malformed property path
    #[error("invalid property chain: {0}")]
    InvalidChain(#[from] ChainError),

    /// Persistence collaborator failed
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A built or queried object is not of the requested type
    #[error("expected '{expected}' but got '{actual}'")]
    UnexpectedType {
        /// Requested type
        expected: &'static str,
        /// Type actually found
        actual: &'static str,
    },
}

impl BuildError {
    /// Map an accessor failure raised while assigning `property`
    pub(crate) fn from_access(type_name: &'static str, property: &str, source: AccessError) -> Self {
        match source {
            AccessError::NoSuchProperty { type_name, property } => {
                Self::NoSuchProperty { type_name, property }
            }
            source => Self::AssignmentFailed {
                type_name,
                property: property.to_string(),
                source,
            },
        }
    }

    /// Check if the error comes from specification wiring rather than data
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency { .. }
                | Self::UnknownExtension { .. }
                | Self::UnknownCombination { .. }
                | Self::InvalidChain(_)
        )
    }
}

/// Persistence collaborator errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// Backend refused the operation
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a configuration
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type alias for builds
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_errors_map_to_build_errors() {
        let missing = BuildError::from_access(
            "Product",
            "colour",
            AccessError::no_such_property("Product", "colour"),
        );
        assert!(matches!(missing, BuildError::NoSuchProperty { .. }));

        let failed = BuildError::from_access(
            "Product",
            "price",
            AccessError::SetterFailed {
                type_name: "Product",
                property: "price".into(),
                message: "negative".into(),
            },
        );
        assert_eq!(
            failed.to_string(),
            "failed to assign 'Product::price': Got exception in 'Product::price': negative"
        );
    }

    #[test]
    fn configuration_errors() {
        let cycle = BuildError::CyclicDependency {
            chain: PropertyChain::leaf("a"),
        };
        assert!(cycle.is_configuration_error());
        assert_eq!(cycle.to_string(), "cyclic dependency on property 'a'");

        let repo = BuildError::from(RepositoryError::Backend("down".into()));
        assert!(!repo.is_configuration_error());
    }
}
