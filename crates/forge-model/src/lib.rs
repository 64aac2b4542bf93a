//! Forge Model
//!
//! Value types shared by every layer of the forge object builder.
//!
//! # Core Concepts
//!
//! - [`PropertyChain`]: Structural path of property names across an object tree
//! - [`Value`]: Tagged dynamic value assigned to properties
//! - [`ObjectRef`]: Identity handle of a built object
//! - [`Overrides`], [`Params`], [`Criteria`]: Ordered name → value maps
//!
//! # Example
//!
//! ```rust
//! use forge_model::{PropertyChain, Value};
//!
//! let chain: PropertyChain = "order.customer.name".parse().unwrap();
//! assert_eq!(chain.name(), "name");
//! assert_eq!(Value::from(42), Value::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod chain;
mod value;

pub use chain::{ChainError, PropertyChain};
pub use value::{Criteria, ObjectId, ObjectRef, Overrides, Params, TypeTag, Value, ValueKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
