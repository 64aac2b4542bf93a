//! Error types for property access

/// Errors raised by the accessor service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The type declares no property with this name
    #[error("no property '{property}' in '{type_name}'")]
    NoSuchProperty {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Requested property
        property: String,
    },

    /// The property exists but cannot be written
    #[error("No setter was found in '{type_name}' for property '{property}'")]
    NoSetter {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Requested property
        property: String,
    },

    /// The registered setter rejected the value
    #[error("Got exception in '{type_name}::{property}': {message}")]
    SetterFailed {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Property being assigned
        property: String,
        /// Message produced by the setter
        message: String,
    },

    /// The value could not be turned into the property's Rust type
    #[error("cannot assign {actual} to '{type_name}::{property}' of type {expected}")]
    TypeMismatch {
        /// Fully-qualified type name
        type_name: &'static str,
        /// Property being assigned
        property: String,
        /// Declared property type
        expected: String,
        /// Kind of the rejected value
        actual: String,
    },

    /// The object handed to a class is not of that class's type
    #[error("object is not a '{type_name}'")]
    UnexpectedObject {
        /// Fully-qualified type name the class describes
        type_name: &'static str,
    },
}

impl AccessError {
    /// Property the error is about, if any
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::NoSuchProperty { property, .. }
            | Self::NoSetter { property, .. }
            | Self::SetterFailed { property, .. }
            | Self::TypeMismatch { property, .. } => Some(property),
            Self::UnexpectedObject { .. } => None,
        }
    }

    /// Create a missing-property error
    pub fn no_such_property(type_name: &'static str, property: impl Into<String>) -> Self {
        Self::NoSuchProperty {
            type_name,
            property: property.into(),
        }
    }
}
