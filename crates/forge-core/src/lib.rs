//! Forge Core - declarative test-object builder
//!
//! The resolution engine that:
//! - Collects literal, supplier and dependency specifications per build
//! - Resolves them lazily, in dependency order, with cycle detection
//! - Queries or creates objects referenced through dotted overrides
//! - Saves each finished build tree children first
//!
//! # Example
//!
//! ```rust
//! use forge_accessor::{Bean, BeanClass};
//! use forge_core::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Product {
//!     price: i64,
//!     tax: i64,
//!     tax_discount: i64,
//! }
//!
//! impl Bean for Product {
//!     fn describe() -> BeanClass<Self> {
//!         Self::class()
//!             .property("price", |p| p.price, |p, v| p.price = v)
//!             .property("tax", |p| p.tax, |p, v| p.tax = v)
//!             .property("taxDiscount", |p| p.tax_discount, |p, v| p.tax_discount = v)
//!     }
//! }
//!
//! # fn main() -> Result<(), BuildError> {
//! let factories = FactorySet::new();
//! factories.define::<Product>(|spec| {
//!     spec.property("taxDiscount").depends_on("tax", |tax| tax.as_int().map(|t| t / 100));
//!     spec.property("tax").depends_on("price", |price| price.as_int().map(|p| p / 10));
//! });
//!
//! let product = factories.to_build::<Product>().property("price", 10000).build()?;
//! assert_eq!((product.tax, product.tax_discount), (1000, 10));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Core modules
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod repository;
pub mod session;
pub mod spec;
pub mod spec_builder;
pub mod tree;

// Re-exports for convenience
pub use builder::Builder;
pub use config::ForgeConfig;
pub use context::{ObjectContext, PropertyOverride};
pub use error::{BuildError, ConfigError, RepositoryError, Result};
pub use factory::{Factory, FactorySet};
pub use repository::{DataRepository, InMemoryRepository};
pub use session::BuildSession;
pub use spec::{SpecKind, Specification};
pub use spec_builder::{PropertySpec, SpecDefinition, SpecificationBuilder};
pub use tree::ObjectTree;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Forge Core
    pub use crate::{
        BuildError, Builder, DataRepository, FactorySet, ForgeConfig, InMemoryRepository,
        SpecificationBuilder,
    };
    pub use forge_model::{Criteria, Overrides, Params, Value};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use forge_accessor::{Bean, BeanClass};
    use forge_model::{Criteria, Value};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Leaf {
        label: String,
    }

    impl Bean for Leaf {
        fn describe() -> BeanClass<Self> {
            Self::class().property("label", |l| l.label.clone(), |l, v| l.label = v)
        }
    }

    #[derive(Debug, Default)]
    struct Branch {
        left: Option<Arc<Leaf>>,
        right: Option<Arc<Leaf>>,
        summary: String,
    }

    impl Bean for Branch {
        fn describe() -> BeanClass<Self> {
            Self::class()
                .property("left", |b| b.left.clone(), |b, v| b.left = v)
                .property("right", |b| b.right.clone(), |b, v| b.right = v)
                .property("summary", |b| b.summary.clone(), |b, v| b.summary = v)
        }
    }

    #[test]
    fn full_flow_with_references_and_dependencies() {
        let factories = FactorySet::new();
        factories.define::<Branch>(|spec| {
            spec.property("summary")
                .depends_on_all(["left.label", "right.label"], |labels| {
                    format!("{}+{}", labels[0], labels[1])
                });
        });

        let branch = factories
            .to_build::<Branch>()
            .property("left.label", "a")
            .property("right.label", "b")
            .build()
            .unwrap();

        assert_eq!(branch.summary, "a+b");
        let leaves = factories.query::<Leaf>(&Criteria::new()).unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(
            factories
                .query::<Leaf>(&[("label".to_string(), Value::from("b"))].into_iter().collect())
                .unwrap()
                .len(),
            1
        );
    }
}
