//! Forge Accessor
//!
//! Statically registered property access for buildable types.
//!
//! # Core Concepts
//!
//! - [`Bean`] / [`BeanClass`]: A type declares its properties once
//! - [`BeanType`]: Runtime handle resolving a cached [`ErasedBeanClass`]
//! - [`Converter`]: Best-effort value conversion before assignment
//! - [`DefaultValues`]: Sequence-driven defaults for untouched properties
//! - [`BeanAccessor`]: Converter and defaults behind one façade
//!
//! # Example
//!
//! ```rust
//! use forge_accessor::{Bean, BeanAccessor, BeanClass};
//! use forge_model::Value;
//!
//! #[derive(Debug, Default)]
//! struct Product {
//!     name: String,
//!     price: i64,
//! }
//!
//! impl Bean for Product {
//!     fn describe() -> BeanClass<Self> {
//!         Self::class()
//!             .property("name", |p| p.name.clone(), |p, v| p.name = v)
//!             .property("price", |p| p.price, |p, v| p.price = v)
//!     }
//! }
//!
//! let accessor = BeanAccessor::new();
//! let class = Product::describe();
//! let mut product = Product::default();
//! accessor.set_property(&class, &mut product, "price", Value::from("100")).unwrap();
//! accessor.assign_defaults(&class, &mut product, 1, |name| name == "price").unwrap();
//! assert_eq!(product.price, 100);
//! assert_eq!(product.name, "name#1");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod accessor;
mod bean;
mod convert;
mod defaults;
mod error;

pub use accessor::{matches, path_type, read_path, BeanAccessor};
pub use bean::{Bean, BeanClass, BeanType, ErasedBeanClass, PropertyType, PropertyValue};
pub use convert::Converter;
pub use defaults::DefaultValues;
pub use error::AccessError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
