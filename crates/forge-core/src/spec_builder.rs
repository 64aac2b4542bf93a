//! Fluent registration of specifications for one object

use crate::error::BuildError;
use crate::session::BuildSession;
use crate::spec::Specification;
use forge_model::{ChainError, Params, PropertyChain, Value};
use std::sync::Arc;

/// Type-level, combination or call-site specification set
pub type SpecDefinition = Arc<dyn Fn(&mut SpecificationBuilder<'_>) + Send + Sync>;

/// Registers specifications for the object being built
///
/// Handed to every specification definition. Targets are direct
/// properties of the object; dependency inputs may be dotted chains into
/// objects it references.
///
/// ```rust
/// use forge_core::SpecificationBuilder;
/// use forge_model::Value;
///
/// fn product(spec: &mut SpecificationBuilder<'_>) {
///     spec.property("tax")
///         .depends_on("price", |price| price.as_int().map(|p| p / 10));
///     spec.property("minPriceWithoutTax").depends_on_all(["tax", "price"], |args| {
///         match (args[0].as_int(), args[1].as_int()) {
///             (Some(tax), Some(price)) => Value::Int(price - tax),
///             _ => Value::Null,
///         }
///     });
/// }
/// ```
pub struct SpecificationBuilder<'a> {
    session: &'a mut BuildSession,
    prefix: &'a [String],
    sequence: u64,
    params: &'a Params,
    error: Option<BuildError>,
}

impl<'a> SpecificationBuilder<'a> {
    pub(crate) fn new(
        session: &'a mut BuildSession,
        prefix: &'a [String],
        sequence: u64,
        params: &'a Params,
    ) -> Self {
        Self {
            session,
            prefix,
            sequence,
            params,
            error: None,
        }
    }

    /// Start a specification for `name`
    pub fn property(&mut self, name: &str) -> PropertySpec<'_, 'a> {
        let target = self.target(name);
        PropertySpec {
            builder: self,
            target,
        }
    }

    /// Sequence number of the object being built
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Build parameter
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// All build parameters
    #[inline]
    #[must_use]
    pub fn params(&self) -> &Params {
        self.params
    }

    /// Path of the object being built, empty for the root
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &[String] {
        self.prefix
    }

    /// Check whether the caller (or an earlier definition) already specified `name`
    #[must_use]
    pub fn is_specified(&self, name: &str) -> bool {
        self.session
            .is_specified(&PropertyChain::under(self.prefix, name))
    }

    pub(crate) fn finish(self) -> Result<(), BuildError> {
        self.error.map_or(Ok(()), Err)
    }

    fn target(&mut self, name: &str) -> Option<PropertyChain> {
        match name.parse::<PropertyChain>() {
            Ok(chain) if chain.len() == 1 => Some(PropertyChain::under(self.prefix, name)),
            Ok(_) => self.fail(ChainError::InvalidSegment(name.to_string())),
            Err(e) => self.fail(e),
        }
    }

    fn input(&mut self, relative: &str) -> Option<PropertyChain> {
        match PropertyChain::parse_under(self.prefix, relative) {
            Ok(chain) => Some(chain),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: ChainError) -> Option<PropertyChain> {
        self.error.get_or_insert(BuildError::InvalidChain(error));
        None
    }

    fn register(&mut self, spec: Specification) {
        self.session.register(spec);
    }
}

/// Pending specification for one property
pub struct PropertySpec<'b, 'a> {
    builder: &'b mut SpecificationBuilder<'a>,
    target: Option<PropertyChain>,
}

impl PropertySpec<'_, '_> {
    /// Default produced lazily, at most once per build
    pub fn value<V: Into<Value>>(self, supply: impl FnOnce() -> V + 'static) {
        if let Some(target) = self.target {
            self.builder.register(Specification::supplier(target, supply));
        }
    }

    /// Value computed from one other property
    pub fn depends_on<V: Into<Value>>(self, input: &str, produce: impl FnOnce(&Value) -> V + 'static) {
        self.depends_on_all([input], move |args| produce(&args[0]));
    }

    /// Value computed from several properties, received in declared order
    pub fn depends_on_all<'i, V: Into<Value>>(
        self,
        inputs: impl IntoIterator<Item = &'i str>,
        produce: impl FnOnce(&[Value]) -> V + 'static,
    ) {
        let mut depends_on = Vec::new();
        for input in inputs {
            match self.builder.input(input) {
                Some(chain) => depends_on.push(chain),
                None => return,
            }
        }
        if let Some(target) = self.target {
            self.builder
                .register(Specification::dependency(target, depends_on, produce));
        }
    }
}
