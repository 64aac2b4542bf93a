//! Accessor service façade
//!
//! [`BeanAccessor`] is the single entry point the builder uses to write
//! properties: every assignment is converted first, and every property the
//! builder left alone can be filled by the default policy. Path reads back
//! criteria matching for repositories.

use crate::bean::{BeanType, ErasedBeanClass, PropertyType};
use crate::convert::Converter;
use crate::defaults::DefaultValues;
use crate::error::AccessError;
use forge_model::{Criteria, PropertyChain, Value};
use std::any::Any;

/// Converter plus default policy shared by every build
#[derive(Debug, Clone, Default)]
pub struct BeanAccessor {
    converter: Converter,
    defaults: DefaultValues,
}

impl BeanAccessor {
    /// Accessor with built-in conversions and defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accessor with explicit parts
    #[must_use]
    pub fn with_parts(converter: Converter, defaults: DefaultValues) -> Self {
        Self {
            converter,
            defaults,
        }
    }

    /// Registered conversions
    #[inline]
    #[must_use]
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Registered conversions, for adding more
    #[inline]
    pub fn converter_mut(&mut self) -> &mut Converter {
        &mut self.converter
    }

    /// Default policy
    #[inline]
    #[must_use]
    pub fn defaults(&self) -> &DefaultValues {
        &self.defaults
    }

    /// Default policy, for registering more
    #[inline]
    pub fn defaults_mut(&mut self) -> &mut DefaultValues {
        &mut self.defaults
    }

    /// Declared type of `name` on `bean`
    #[must_use]
    pub fn property_type(&self, bean: BeanType, name: &str) -> Option<PropertyType> {
        bean.class().property_type(name).cloned()
    }

    /// Best-effort conversion towards `target`
    #[inline]
    #[must_use]
    pub fn convert(&self, target: &PropertyType, value: Value) -> Value {
        self.converter.try_convert(target, value)
    }

    /// Convert then assign
    ///
    /// # Errors
    /// Returns [`AccessError::NoSuchProperty`] for an unknown property and
    /// whatever the class reports when the setter is missing or fails.
    pub fn set_property(
        &self,
        class: &dyn ErasedBeanClass,
        object: &mut dyn Any,
        name: &str,
        value: Value,
    ) -> Result<(), AccessError> {
        let ty = class
            .property_type(name)
            .ok_or_else(|| AccessError::no_such_property(class.type_name(), name))?;
        let value = self.convert(ty, value);
        class.set(object, name, value)
    }

    /// Fill every writable property not accepted by `skip` with its default
    ///
    /// References and lists are never defaulted. Returns the names that
    /// received a value.
    ///
    /// # Errors
    /// Fails if a setter rejects its default.
    pub fn assign_defaults(
        &self,
        class: &dyn ErasedBeanClass,
        object: &mut dyn Any,
        sequence: u64,
        skip: impl Fn(&str) -> bool,
    ) -> Result<Vec<&'static str>, AccessError> {
        let mut assigned = Vec::new();
        for name in class.property_names() {
            if skip(name) || !class.is_writable(name) {
                continue;
            }
            let Some(ty) = class.property_type(name) else {
                continue;
            };
            if ty.referenced().is_some() || matches!(ty, PropertyType::List(_)) {
                continue;
            }
            if let Some(value) = self.defaults.value_for(name, ty, sequence) {
                class.set(object, name, value)?;
                assigned.push(name);
            }
        }
        Ok(assigned)
    }

    /// Convert every criteria value to the declared type of its path
    ///
    /// Keys that do not name a known path are passed through untouched;
    /// the repository decides what they match.
    #[must_use]
    pub fn convert_criteria(&self, bean: BeanType, criteria: &Criteria) -> Criteria {
        criteria
            .iter()
            .map(|(key, value)| {
                let converted = key
                    .parse::<PropertyChain>()
                    .ok()
                    .and_then(|chain| path_type(bean, &chain))
                    .map_or_else(|| value.clone(), |ty| self.convert(&ty, value.clone()));
                (key.clone(), converted)
            })
            .collect()
    }
}

/// Declared type at the end of `path`, walking through references
#[must_use]
pub fn path_type(bean: BeanType, path: &PropertyChain) -> Option<PropertyType> {
    let mut current = bean;
    let mut segments = path.iter().peekable();
    while let Some(segment) = segments.next() {
        let ty = current.class().property_type(segment).cloned()?;
        if segments.peek().is_none() {
            return Some(ty);
        }
        current = ty.referenced()?;
    }
    None
}

/// Read the value at `path`, following references
///
/// An absent reference in the middle of the path reads as [`Value::Null`].
///
/// # Errors
/// Returns [`AccessError::NoSuchProperty`] when a segment is unknown.
pub fn read_path(
    class: &dyn ErasedBeanClass,
    object: &dyn Any,
    path: &PropertyChain,
) -> Result<Value, AccessError> {
    let (first, rest) = path.split_first();
    let value = class.get(object, first)?;
    let Some(rest) = rest else {
        return Ok(value);
    };

    let Some(bean) = class.property_type(first).and_then(PropertyType::referenced) else {
        return Err(AccessError::no_such_property(class.type_name(), path.to_string()));
    };
    match value {
        Value::Object(related) => read_path(bean.class().as_ref(), related.as_any(), &rest),
        _ => Ok(Value::Null),
    }
}

/// Check whether every criterion reads back equal on `object`
///
/// Unparseable or unknown keys never match.
#[must_use]
pub fn matches(class: &dyn ErasedBeanClass, object: &dyn Any, criteria: &Criteria) -> bool {
    criteria.iter().all(|(key, expected)| {
        key.parse::<PropertyChain>()
            .ok()
            .and_then(|path| read_path(class, object, &path).ok())
            .is_some_and(|actual| actual == *expected)
    })
}
