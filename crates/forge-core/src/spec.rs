//! Specifications: how a property obtains its value

use forge_model::{PropertyChain, Value};
use std::fmt;

/// Zero-argument producer of a default value
pub type SupplierFn = Box<dyn FnOnce() -> Value>;

/// Producer receiving resolved inputs in declared order
pub type DependencyFn = Box<dyn FnOnce(&[Value]) -> Value>;

/// Rule bound to one property chain
///
/// Producers are `FnOnce`: a build session owns each specification and
/// consumes it when the chain is resolved, so no producer can run twice.
pub struct Specification {
    chain: PropertyChain,
    rule: Rule,
}

pub(crate) enum Rule {
    Literal(Value),
    Supplier(SupplierFn),
    Dependency {
        depends_on: Vec<PropertyChain>,
        produce: DependencyFn,
    },
}

/// Variant of a [`Specification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    /// Caller-supplied value
    Literal,
    /// Lazily computed default
    Supplier,
    /// Computed from other properties
    Dependency,
}

impl Specification {
    /// Explicit value that always wins
    #[must_use]
    pub fn literal(chain: PropertyChain, value: impl Into<Value>) -> Self {
        Self {
            chain,
            rule: Rule::Literal(value.into()),
        }
    }

    /// Default computed at most once, only if nothing else specified it
    #[must_use]
    pub fn supplier<V: Into<Value>>(chain: PropertyChain, supply: impl FnOnce() -> V + 'static) -> Self {
        Self {
            chain,
            rule: Rule::Supplier(Box::new(move || supply().into())),
        }
    }

    /// Value computed from the resolved values of `depends_on`
    #[must_use]
    pub fn dependency<V: Into<Value>>(
        chain: PropertyChain,
        depends_on: Vec<PropertyChain>,
        produce: impl FnOnce(&[Value]) -> V + 'static,
    ) -> Self {
        Self {
            chain,
            rule: Rule::Dependency {
                depends_on,
                produce: Box::new(move |inputs| produce(inputs).into()),
            },
        }
    }

    /// Target chain
    #[inline]
    #[must_use]
    pub fn chain(&self) -> &PropertyChain {
        &self.chain
    }

    /// Variant
    #[must_use]
    pub fn kind(&self) -> SpecKind {
        self.rule.kind()
    }

    /// Declared inputs, empty unless this is a dependency
    #[must_use]
    pub fn depends_on(&self) -> &[PropertyChain] {
        match &self.rule {
            Rule::Dependency { depends_on, .. } => depends_on,
            _ => &[],
        }
    }

    pub(crate) fn into_parts(self) -> (PropertyChain, Rule) {
        (self.chain, self.rule)
    }
}

impl Rule {
    pub(crate) fn kind(&self) -> SpecKind {
        match self {
            Self::Literal(_) => SpecKind::Literal,
            Self::Supplier(_) => SpecKind::Supplier,
            Self::Dependency { .. } => SpecKind::Dependency,
        }
    }
}

impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Specification");
        s.field("chain", &self.chain.to_string())
            .field("kind", &self.kind());
        if let Rule::Literal(value) = &self.rule {
            s.field("value", value);
        }
        if let Rule::Dependency { depends_on, .. } = &self.rule {
            s.field("depends_on", depends_on);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_inputs() {
        let literal = Specification::literal(PropertyChain::leaf("price"), 10);
        assert_eq!(literal.kind(), SpecKind::Literal);
        assert!(literal.depends_on().is_empty());

        let supplier = Specification::supplier(PropertyChain::leaf("name"), || "x");
        assert_eq!(supplier.kind(), SpecKind::Supplier);

        let dependency = Specification::dependency(
            PropertyChain::leaf("tax"),
            vec![PropertyChain::leaf("price")],
            |args| args[0].as_int().map(|p| p / 10),
        );
        assert_eq!(dependency.kind(), SpecKind::Dependency);
        assert_eq!(dependency.depends_on(), &[PropertyChain::leaf("price")]);
        assert_eq!(dependency.chain().to_string(), "tax");
    }

    #[test]
    fn debug_shows_literal_value() {
        let literal = Specification::literal(PropertyChain::leaf("price"), 10);
        let rendered = format!("{literal:?}");
        assert!(rendered.contains("Literal"));
        assert!(rendered.contains("Int(10)"));
    }
}
