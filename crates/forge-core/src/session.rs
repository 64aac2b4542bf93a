//! Build session: specifications and resolved values of one build tree
//!
//! A [`BuildSession`] is created by every top-level build and dropped when
//! it returns. It is never shared between threads.
//!
//! # Resolution
//!
//! `resolve(chain)` proceeds as follows:
//! 1. a cached value is returned as is
//! 2. a chain already in progress is a [`BuildError::CyclicDependency`]
//! 3. a literal is cached and returned
//! 4. a supplier is invoked once, cached and returned
//! 5. a dependency resolves its inputs in declared order, then invokes its
//!    producer with those values; if any input has no value the dependency
//!    is dropped and the chain stays unresolved
//! 6. a chain without specification yields `None`

use crate::error::{BuildError, Result};
use crate::spec::{Rule, SpecKind, Specification};
use crate::tree::ObjectTree;
use forge_accessor::{matches, BeanType, ErasedBeanClass};
use forge_model::{Criteria, ObjectRef, PropertyChain, Value};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Specifications and resolved values scoped to one build tree
#[derive(Default)]
pub struct BuildSession {
    specs: IndexMap<PropertyChain, Rule>,
    resolved: HashMap<PropertyChain, Value>,
    in_progress: HashSet<PropertyChain>,
    tree: ObjectTree,
    pending: Vec<ObjectRef>,
}

impl BuildSession {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specification under its chain
    ///
    /// A literal is never displaced. Any other registration replaces the
    /// previous one for the same chain. Returns whether the specification
    /// was kept.
    pub fn register(&mut self, spec: Specification) -> bool {
        let (chain, rule) = spec.into_parts();
        if self.resolved.contains_key(&chain) {
            tracing::trace!(%chain, "chain already resolved, specification ignored");
            return false;
        }

        match self.specs.get(&chain).map(Rule::kind) {
            Some(SpecKind::Literal) => {
                tracing::trace!(%chain, "literal value kept");
                false
            }
            Some(previous) => {
                tracing::debug!(%chain, ?previous, replacement = ?rule.kind(), "specification replaced");
                self.specs.insert(chain, rule);
                true
            }
            None => {
                self.specs.insert(chain, rule);
                true
            }
        }
    }

    /// Check whether a chain has a specification or a resolved value
    #[must_use]
    pub fn is_specified(&self, chain: &PropertyChain) -> bool {
        self.specs.contains_key(chain) || self.resolved.contains_key(chain)
    }

    /// Check whether a chain is held by a literal not yet resolved
    #[must_use]
    pub fn is_literal(&self, chain: &PropertyChain) -> bool {
        matches!(self.specs.get(chain).map(Rule::kind), Some(SpecKind::Literal))
    }

    /// Resolved value of a chain, without triggering resolution
    #[must_use]
    pub fn resolved(&self, chain: &PropertyChain) -> Option<&Value> {
        self.resolved.get(chain)
    }

    /// Number of specifications not resolved yet
    #[must_use]
    pub fn pending_specs(&self) -> usize {
        self.specs.len()
    }

    /// Resolve a chain, invoking producers as needed
    ///
    /// Returns `None` when nothing specifies the chain.
    ///
    /// # Errors
    /// Returns [`BuildError::CyclicDependency`] when the chain depends on
    /// itself, directly or through other dependencies.
    pub fn resolve(&mut self, chain: &PropertyChain) -> Result<Option<Value>> {
        if let Some(value) = self.resolved.get(chain) {
            return Ok(Some(value.clone()));
        }
        if self.in_progress.contains(chain) {
            return Err(BuildError::CyclicDependency {
                chain: chain.clone(),
            });
        }
        let Some(rule) = self.specs.shift_remove(chain) else {
            return Ok(None);
        };

        let value = match rule {
            Rule::Literal(value) => value,
            Rule::Supplier(supply) => supply(),
            Rule::Dependency {
                depends_on,
                produce,
            } => {
                self.in_progress.insert(chain.clone());
                let inputs = self.resolve_inputs(&depends_on);
                self.in_progress.remove(chain);
                match inputs? {
                    Some(inputs) => produce(&inputs),
                    None => {
                        tracing::debug!(%chain, "dependency skipped, an input has no value");
                        return Ok(None);
                    }
                }
            }
        };

        tracing::trace!(%chain, %value, "chain resolved");
        self.resolved.insert(chain.clone(), value.clone());
        Ok(Some(value))
    }

    fn resolve_inputs(&mut self, depends_on: &[PropertyChain]) -> Result<Option<Vec<Value>>> {
        let mut inputs = Vec::with_capacity(depends_on.len());
        for input in depends_on {
            match self.resolve(input)? {
                Some(value) => inputs.push(value),
                None => return Ok(None),
            }
        }
        Ok(Some(inputs))
    }

    /// Specified chains whose owning object sits at `prefix`, in
    /// registration order
    #[must_use]
    pub fn chains_owned_by(&self, prefix: &[String]) -> Vec<PropertyChain> {
        self.specs
            .keys()
            .filter(|chain| chain.owner() == prefix)
            .cloned()
            .collect()
    }

    /// Cache every readable property of `object` under `prefix`
    ///
    /// Lets dependencies read dotted chains into objects that are already
    /// built, whether created in this session or found by a query.
    pub fn record(&mut self, prefix: &[String], class: &dyn ErasedBeanClass, object: &ObjectRef) {
        for name in class.property_names() {
            if let Ok(value) = class.get(object.as_any(), name) {
                self.resolved.insert(PropertyChain::under(prefix, name), value);
            }
        }
    }

    /// Object tree of this session
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &ObjectTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut ObjectTree {
        &mut self.tree
    }

    /// Keep a built object until the tree commits
    pub fn cache_for_saving(&mut self, object: ObjectRef) {
        self.pending.push(object);
    }

    /// Objects built so far, in completion order
    #[must_use]
    pub fn pending(&self) -> &[ObjectRef] {
        &self.pending
    }

    /// First object built in this session that matches `criteria`
    #[must_use]
    pub fn find_pending(&self, bean: BeanType, criteria: &Criteria) -> Option<ObjectRef> {
        let class = bean.class();
        self.pending
            .iter()
            .find(|object| {
                object.type_tag() == bean.tag() && matches(class.as_ref(), object.as_any(), criteria)
            })
            .cloned()
    }

    /// Objects to save, children before parents, each once
    #[must_use]
    pub fn save_order(&self, root: &ObjectRef) -> Vec<ObjectRef> {
        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.pending.len());
        self.tree.foreach_depth_first_post_order(root, &mut |object| {
            if seen.insert(object.id()) {
                order.push(object.clone());
            }
        });
        order
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("specs", &self.specs.len())
            .field("resolved", &self.resolved.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
