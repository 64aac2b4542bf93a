//! Type-driven defaults for properties the builder left unspecified

use crate::bean::PropertyType;
use forge_model::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type DefaultFn = Arc<dyn Fn(&str, u64) -> Value + Send + Sync>;

/// Default value policy, keyed by the value kind a property stores
///
/// The built-in policy derives every default from the property name and
/// the object's sequence number, so two objects of the same type never
/// share defaults:
///
/// | Kind    | Default             |
/// |---------|---------------------|
/// | `Text`  | `"<property>#<seq>"` |
/// | `Int`   | `seq`               |
/// | `Float` | `seq`               |
/// | `Bool`  | `seq` is odd        |
///
/// References and lists have no default and keep whatever the constructor
/// put there.
#[derive(Clone)]
pub struct DefaultValues {
    by_kind: HashMap<ValueKind, DefaultFn>,
}

impl DefaultValues {
    /// Policy with the built-in defaults
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new() -> Self {
        let mut defaults = Self::empty();
        defaults
            .register(ValueKind::Text, |property, seq| Value::Text(format!("{property}#{seq}")))
            .register(ValueKind::Int, |_, seq| Value::Int(i64::try_from(seq).unwrap_or(i64::MAX)))
            .register(ValueKind::Float, |_, seq| Value::Float(seq as f64))
            .register(ValueKind::Bool, |_, seq| Value::Bool(seq % 2 == 1));
        defaults
    }

    /// Policy that assigns nothing
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }

    /// Register (or replace) the default for a value kind
    pub fn register(
        &mut self,
        kind: ValueKind,
        default: impl Fn(&str, u64) -> Value + Send + Sync + 'static,
    ) -> &mut Self {
        self.by_kind.insert(kind, Arc::new(default));
        self
    }

    /// Default for `property` of type `ty` on the object with `sequence`
    #[must_use]
    pub fn value_for(&self, property: &str, ty: &PropertyType, sequence: u64) -> Option<Value> {
        self.by_kind
            .get(&ty.value_kind())
            .map(|default| default(property, sequence))
    }
}

impl Default for DefaultValues {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultValues")
            .field("kinds", &self.by_kind.len())
            .finish()
    }
}
