//! Best-effort value conversion
//!
//! Provides [`Converter`], consulted before every property assignment and
//! before criteria are handed to a repository.

use crate::bean::PropertyType;
use forge_model::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type ConvertFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Registry of conversions keyed by (source kind, target kind)
///
/// Conversion never fails: when no converter applies, or the applicable
/// converter declines by returning `None`, the original value is returned
/// unchanged and the setter decides whether it fits.
#[derive(Clone)]
pub struct Converter {
    converters: HashMap<(ValueKind, ValueKind), ConvertFn>,
}

impl Converter {
    /// Converter with the built-in scalar conversions
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        let mut converter = Self::empty();
        converter
            .add_type_converter(ValueKind::Int, ValueKind::Text, |v| Some(Value::Text(v.to_string())))
            .add_type_converter(ValueKind::Float, ValueKind::Text, |v| Some(Value::Text(v.to_string())))
            .add_type_converter(ValueKind::Bool, ValueKind::Text, |v| Some(Value::Text(v.to_string())))
            .add_type_converter(ValueKind::Text, ValueKind::Int, |v| {
                v.as_text()?.trim().parse::<i64>().ok().map(Value::Int)
            })
            .add_type_converter(ValueKind::Text, ValueKind::Float, |v| {
                v.as_text()?.trim().parse::<f64>().ok().map(Value::Float)
            })
            .add_type_converter(ValueKind::Text, ValueKind::Bool, |v| {
                v.as_text()?.trim().parse::<bool>().ok().map(Value::Bool)
            })
            .add_type_converter(ValueKind::Int, ValueKind::Float, |v| v.as_float().map(Value::Float))
            .add_type_converter(ValueKind::Float, ValueKind::Int, |v| match v {
                Value::Float(f) if f.fract() == 0.0 => Some(Value::Int(*f as i64)),
                _ => None,
            });
        converter
    }

    /// Converter without any registered conversion
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Register (or replace) the conversion from `from` to `to`
    ///
    /// `ValueKind::Any` as `from` acts as a fallback for every source kind
    /// without a more specific converter.
    pub fn add_type_converter(
        &mut self,
        from: ValueKind,
        to: ValueKind,
        convert: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.converters.insert((from, to), Arc::new(convert));
        self
    }

    /// Number of registered conversions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Check if no conversion is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Convert `value` towards `target`, or return it unchanged
    #[must_use]
    pub fn try_convert(&self, target: &PropertyType, value: Value) -> Value {
        if let (PropertyType::List(inner), Value::List(items)) = (peel(target), &value) {
            let inner = inner.as_ref();
            return Value::List(
                items
                    .iter()
                    .cloned()
                    .map(|item| self.try_convert(inner, item))
                    .collect(),
            );
        }

        let to = target.value_kind();
        let from = value.kind();
        if from == to || from == ValueKind::Null || to == ValueKind::Object {
            return value;
        }

        let converter = self
            .converters
            .get(&(from, to))
            .or_else(|| self.converters.get(&(ValueKind::Any, to)));

        match converter.and_then(|convert| convert(&value)) {
            Some(converted) => converted,
            None => {
                tracing::trace!(?from, ?to, "no conversion applied");
                value
            }
        }
    }
}

fn peel(ty: &PropertyType) -> &PropertyType {
    match ty {
        PropertyType::Optional(inner) => peel(inner),
        other => other,
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<_> = self.converters.keys().collect();
        pairs.sort_by_key(|(from, to)| (format!("{from:?}"), format!("{to:?}")));
        f.debug_struct("Converter").field("pairs", &pairs).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_candidate_converter_returns_original() {
        let converter = Converter::empty();
        assert_eq!(
            converter.try_convert(&PropertyType::Int, Value::from("String")),
            Value::from("String")
        );
    }

    #[test]
    fn declining_converter_returns_original() {
        let mut converter = Converter::empty();
        converter.add_type_converter(ValueKind::Text, ValueKind::Int, |_| None);
        assert_eq!(
            converter.try_convert(&PropertyType::Int, Value::from("x")),
            Value::from("x")
        );
    }

    #[test]
    fn candidate_converter() {
        let converter = Converter::new();
        assert_eq!(
            converter.try_convert(&PropertyType::Int, Value::from("100")),
            Value::Int(100)
        );
    }

    #[test]
    fn any_type_to_text() {
        let converter = Converter::new();
        assert_eq!(
            converter.try_convert(&PropertyType::Text, Value::Int(100)),
            Value::from("100")
        );
        assert_eq!(converter.try_convert(&PropertyType::Text, Value::Null), Value::Null);
    }

    #[test]
    fn wildcard_source_converter() {
        let mut converter = Converter::empty();
        converter.add_type_converter(ValueKind::Any, ValueKind::Text, |_| {
            Some(Value::from("Hello"))
        });
        assert_eq!(
            converter.try_convert(&PropertyType::Text, Value::Bool(true)),
            Value::from("Hello")
        );
    }

    #[test]
    fn converts_through_optional_and_list() {
        let converter = Converter::new();
        let optional = PropertyType::Optional(Box::new(PropertyType::Int));
        assert_eq!(converter.try_convert(&optional, Value::from("7")), Value::Int(7));

        let list = PropertyType::List(Box::new(PropertyType::Text));
        assert_eq!(
            converter.try_convert(&list, Value::from(vec![1, 2])),
            Value::from(vec!["1", "2"])
        );
    }

    #[test]
    fn float_to_int_only_when_integral() {
        let converter = Converter::new();
        assert_eq!(converter.try_convert(&PropertyType::Int, Value::Float(3.0)), Value::Int(3));
        assert_eq!(
            converter.try_convert(&PropertyType::Int, Value::Float(3.5)),
            Value::Float(3.5)
        );
    }
}
