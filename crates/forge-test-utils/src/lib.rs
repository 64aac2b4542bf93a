//! Testing utilities for the forge workspace
//!
//! Shared fixtures, preconfigured factory sets, and tracing setup.

#![allow(missing_docs)]

use forge_accessor::{Bean, BeanClass};
use forge_core::FactorySet;
use forge_model::Value;
use once_cell::sync::Lazy;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Product {
    pub name: String,
    pub price: i64,
    pub discount: i64,
    pub tax: i64,
    pub tax_discount: i64,
    pub min_price_without_tax: i64,
}

impl Bean for Product {
    fn describe() -> BeanClass<Self> {
        Self::class()
            .property("name", |p| p.name.clone(), |p, v| p.name = v)
            .property("price", |p| p.price, |p, v| p.price = v)
            .property("discount", |p| p.discount, |p, v| p.discount = v)
            .property("tax", |p| p.tax, |p, v| p.tax = v)
            .property("taxDiscount", |p| p.tax_discount, |p, v| p.tax_discount = v)
            .property(
                "minPriceWithoutTax",
                |p| p.min_price_without_tax,
                |p, v| p.min_price_without_tax = v,
            )
    }
}

#[derive(Debug, Default)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zip: i64,
}

impl Bean for Address {
    fn describe() -> BeanClass<Self> {
        Self::class()
            .property("city", |a| a.city.clone(), |a, v| a.city = v)
            .property("street", |a| a.street.clone(), |a, v| a.street = v)
            .property("zip", |a| a.zip, |a, v| a.zip = v)
    }
}

#[derive(Debug, Default)]
pub struct Customer {
    pub name: String,
    pub level: i64,
    pub vip: bool,
    pub address: Option<Arc<Address>>,
}

impl Bean for Customer {
    fn describe() -> BeanClass<Self> {
        Self::class()
            .property("name", |c| c.name.clone(), |c, v| c.name = v)
            .property("level", |c| c.level, |c, v| c.level = v)
            .property("vip", |c| c.vip, |c, v| c.vip = v)
            .property("address", |c| c.address.clone(), |c, v| c.address = v)
    }
}

#[derive(Debug, Default)]
pub struct Order {
    pub code: String,
    pub amount: f64,
    pub note: Option<String>,
    pub lines: Vec<String>,
    pub customer: Option<Arc<Customer>>,
    pub product: Option<Arc<Product>>,
}

impl Bean for Order {
    fn describe() -> BeanClass<Self> {
        Self::class()
            .property("code", |o| o.code.clone(), |o, v| o.code = v)
            .property("amount", |o| o.amount, |o, v| o.amount = v)
            .property("note", |o| o.note.clone(), |o, v| o.note = v)
            .property("lines", |o| o.lines.clone(), |o, v| o.lines = v)
            .property("customer", |o| o.customer.clone(), |o, v| o.customer = v)
            .property("product", |o| o.product.clone(), |o, v| o.product = v)
    }
}

#[derive(Debug, Default)]
pub struct Shipment {
    pub label: String,
    pub sender: Option<Arc<Customer>>,
    pub receiver: Option<Arc<Customer>>,
}

impl Bean for Shipment {
    fn describe() -> BeanClass<Self> {
        Self::class()
            .property("label", |s| s.label.clone(), |s, v| s.label = v)
            .property("sender", |s| s.sender.clone(), |s, v| s.sender = v)
            .property("receiver", |s| s.receiver.clone(), |s, v| s.receiver = v)
    }
}

/// Bean whose setter refuses out-of-range values and whose id is read-only
#[derive(Debug, Default)]
pub struct Strict {
    pub quantity: u32,
    pub id: i64,
}

impl Bean for Strict {
    fn describe() -> BeanClass<Self> {
        Self::class()
            .try_property("quantity", |s| s.quantity, |s, v| {
                if v > 100 {
                    return Err(format!("quantity {v} exceeds 100"));
                }
                s.quantity = v;
                Ok(())
            })
            .read_only("id", |s| s.id)
    }
}

fn as_int(value: &Value) -> i64 {
    value.as_int().unwrap_or_default()
}

/// `taxDiscount = tax / 100` and `tax = price / 10`, registered in that order
pub fn define_product_with_discount(factories: &FactorySet) {
    factories.define::<Product>(|spec| {
        spec.property("taxDiscount").depends_on("tax", |tax| as_int(tax) / 100);
        spec.property("tax").depends_on("price", |price| as_int(price) / 10);
    });
}

/// `minPriceWithoutTax = price - tax`, inputs declared as `[tax, price]`
pub fn define_product_with_multi_dependency(factories: &FactorySet) {
    factories.define::<Product>(|spec| {
        spec.property("minPriceWithoutTax")
            .depends_on_all(["tax", "price"], |args| as_int(&args[1]) - as_int(&args[0]));
    });
}

/// Factory set with the discount specification on [`Product`]
pub fn product_factories() -> FactorySet {
    let factories = FactorySet::new();
    define_product_with_discount(&factories);
    factories
}

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("forge_core=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Install a test-friendly tracing subscriber once per process
pub fn init_tracing() {
    Lazy::force(&TRACING);
}
