//! Static property registration for buildable types
//!
//! A type becomes buildable by implementing [`Bean`] and describing its
//! properties with a [`BeanClass`]. The builder only ever touches objects
//! through the type-erased [`ErasedBeanClass`] view.

use crate::error::AccessError;
use dashmap::DashMap;
use forge_model::{ObjectRef, TypeTag, Value, ValueKind};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// A type the builder can instantiate and populate
///
/// # Example
/// ```rust
/// use forge_accessor::{Bean, BeanClass};
///
/// #[derive(Debug, Default)]
/// struct Product {
///     price: i64,
/// }
///
/// impl Bean for Product {
///     fn describe() -> BeanClass<Self> {
///         Self::class().property("price", |p| p.price, |p, v| p.price = v)
///     }
/// }
/// ```
pub trait Bean: Any + Default + Send + Sync {
    /// Property table of this type
    fn describe() -> BeanClass<Self>;

    /// Empty property table for `Self`, the starting point of [`Bean::describe`]
    #[must_use]
    fn class() -> BeanClass<Self> {
        BeanClass::new()
    }
}

/// Declared type of a property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    /// `bool`
    Bool,
    /// Integer types
    Int,
    /// `f64`
    Float,
    /// `String`
    Text,
    /// Shared handle to another bean (`Arc<B>`)
    Reference(BeanType),
    /// `Option<_>` of the inner type
    Optional(Box<PropertyType>),
    /// `Vec<_>` of the inner type
    List(Box<PropertyType>),
}

impl PropertyType {
    /// Value kind a property of this type stores
    #[must_use]
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Self::Bool => ValueKind::Bool,
            Self::Int => ValueKind::Int,
            Self::Float => ValueKind::Float,
            Self::Text => ValueKind::Text,
            Self::Reference(_) => ValueKind::Object,
            Self::Optional(inner) => inner.value_kind(),
            Self::List(_) => ValueKind::List,
        }
    }

    /// Bean type behind a (possibly optional) reference
    #[must_use]
    pub fn referenced(&self) -> Option<BeanType> {
        match self {
            Self::Reference(bean) => Some(*bean),
            Self::Optional(inner) => inner.referenced(),
            _ => None,
        }
    }
}

impl Display for PropertyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Reference(bean) => write!(f, "ref {}", bean.name()),
            Self::Optional(inner) => write!(f, "optional {inner}"),
            Self::List(inner) => write!(f, "list of {inner}"),
        }
    }
}

/// Rust field types that can be bound to a property
pub trait PropertyValue: Sized + 'static {
    /// Declared property type
    fn property_type() -> PropertyType;

    /// Extract from a value, handing the value back when it does not fit
    ///
    /// # Errors
    /// Returns the original value if its kind does not match.
    fn from_value(value: Value) -> Result<Self, Value>;

    /// Read into a value
    fn into_value(self) -> Value;
}

impl PropertyValue for bool {
    fn property_type() -> PropertyType {
        PropertyType::Bool
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl PropertyValue for i64 {
    fn property_type() -> PropertyType {
        PropertyType::Int
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

macro_rules! narrow_int_property {
    ($($ty:ty),*) => {
        $(
            impl PropertyValue for $ty {
                fn property_type() -> PropertyType {
                    PropertyType::Int
                }

                fn from_value(value: Value) -> Result<Self, Value> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| Value::Int(i)),
                        other => Err(other),
                    }
                }

                fn into_value(self) -> Value {
                    Value::from(self)
                }
            }
        )*
    };
}

narrow_int_property!(i32, u32, u64);

impl PropertyValue for f64 {
    fn property_type() -> PropertyType {
        PropertyType::Float
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(f) => Ok(f),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl PropertyValue for String {
    fn property_type() -> PropertyType {
        PropertyType::Text
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl<V: PropertyValue> PropertyValue for Option<V> {
    fn property_type() -> PropertyType {
        PropertyType::Optional(Box::new(V::property_type()))
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => V::from_value(other).map(Some),
        }
    }

    fn into_value(self) -> Value {
        self.map_or(Value::Null, PropertyValue::into_value)
    }
}

impl<V: PropertyValue> PropertyValue for Vec<V> {
    fn property_type() -> PropertyType {
        PropertyType::List(Box::new(V::property_type()))
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        let Value::List(items) = value else {
            return Err(value);
        };
        let mut out = Vec::with_capacity(items.len());
        let mut iter = items.into_iter();
        while let Some(item) = iter.next() {
            match V::from_value(item) {
                Ok(v) => out.push(v),
                Err(rejected) => {
                    let mut restored: Vec<Value> =
                        out.into_iter().map(PropertyValue::into_value).collect();
                    restored.push(rejected);
                    restored.extend(iter);
                    return Err(Value::List(restored));
                }
            }
        }
        Ok(out)
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(PropertyValue::into_value).collect())
    }
}

impl<B: Bean> PropertyValue for Arc<B> {
    fn property_type() -> PropertyType {
        PropertyType::Reference(BeanType::of::<B>())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(object) => object.downcast::<B>().ok_or(Value::Object(object)),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Object(ObjectRef::new(self))
    }
}

/// Runtime handle of a bean type
///
/// Carries enough to produce the type's property table without knowing
/// the type statically, which is what reference resolution needs.
#[derive(Clone, Copy)]
pub struct BeanType {
    tag: TypeTag,
    describe: fn() -> Arc<dyn ErasedBeanClass>,
    create: fn() -> Box<dyn Any + Send + Sync>,
}

static CLASSES: Lazy<DashMap<TypeId, Arc<dyn ErasedBeanClass>>> = Lazy::new(DashMap::new);

fn describe_erased<B: Bean>() -> Arc<dyn ErasedBeanClass> {
    Arc::new(B::describe())
}

fn create_default<B: Bean>() -> Box<dyn Any + Send + Sync> {
    Box::new(B::default())
}

impl BeanType {
    /// Handle for `B`
    #[inline]
    #[must_use]
    pub fn of<B: Bean>() -> Self {
        Self {
            tag: TypeTag::of::<B>(),
            describe: describe_erased::<B>,
            create: create_default::<B>,
        }
    }

    /// Fresh `Default` instance of the type
    #[inline]
    #[must_use]
    pub fn new_instance(&self) -> Box<dyn Any + Send + Sync> {
        (self.create)()
    }

    /// Type tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Type id
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.tag.id()
    }

    /// Fully-qualified type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.tag.name()
    }

    /// Property table, described once per process and cached
    #[must_use]
    pub fn class(&self) -> Arc<dyn ErasedBeanClass> {
        if let Some(class) = CLASSES.get(&self.id()) {
            return Arc::clone(class.value());
        }
        let class = (self.describe)();
        Arc::clone(CLASSES.entry(self.id()).or_insert(class).value())
    }
}

impl PartialEq for BeanType {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for BeanType {}

impl Debug for BeanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BeanType").field(&self.tag.name()).finish()
    }
}

/// Type-erased view of a [`BeanClass`]
pub trait ErasedBeanClass: Send + Sync {
    /// Fully-qualified type name
    fn type_name(&self) -> &'static str;

    /// Type tag of the described type
    fn type_tag(&self) -> TypeTag;

    /// Property names in registration order
    fn property_names(&self) -> Vec<&'static str>;

    /// Declared type of a property
    fn property_type(&self, name: &str) -> Option<&PropertyType>;

    /// Whether a property has a setter
    fn is_writable(&self, name: &str) -> bool;

    /// Assign a property
    ///
    /// # Errors
    /// Fails when the property is unknown or read-only, the value has the
    /// wrong kind, or the setter rejects it.
    fn set(&self, object: &mut dyn Any, name: &str, value: Value) -> Result<(), AccessError>;

    /// Read a property
    ///
    /// # Errors
    /// Fails when the property is unknown or `object` has another type.
    fn get(&self, object: &dyn Any, name: &str) -> Result<Value, AccessError>;
}

type Getter<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<(), SetFailure> + Send + Sync>;

enum SetFailure {
    Mismatch(Value),
    Rejected(String),
}

struct Property<T> {
    ty: PropertyType,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

/// Property table of a bean type
pub struct BeanClass<T> {
    name: &'static str,
    properties: IndexMap<&'static str, Property<T>>,
}

impl<T: Bean> BeanClass<T> {
    /// Create an empty table named after `T`
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            properties: IndexMap::new(),
        }
    }

    /// Register a readable and writable property
    #[must_use]
    pub fn property<V: PropertyValue>(
        self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        self.try_property(name, get, move |object, value| {
            set(object, value);
            Ok::<(), std::convert::Infallible>(())
        })
    }

    /// Register a property whose setter may refuse a value
    #[must_use]
    pub fn try_property<V: PropertyValue, E: Display>(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) -> Result<(), E> + Send + Sync + 'static,
    ) -> Self {
        let setter: Setter<T> = Box::new(move |object, value| {
            let typed = V::from_value(value).map_err(SetFailure::Mismatch)?;
            set(object, typed).map_err(|e| SetFailure::Rejected(e.to_string()))
        });
        self.properties.insert(
            name,
            Property {
                ty: V::property_type(),
                get: Box::new(move |object| get(object).into_value()),
                set: Some(setter),
            },
        );
        self
    }

    /// Register a property without a setter
    #[must_use]
    pub fn read_only<V: PropertyValue>(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> Self {
        self.properties.insert(
            name,
            Property {
                ty: V::property_type(),
                get: Box::new(move |object| get(object).into_value()),
                set: None,
            },
        );
        self
    }

    /// Number of registered properties
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no property is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&Property<T>, AccessError> {
        self.properties
            .get(name)
            .ok_or_else(|| AccessError::no_such_property(self.name, name))
    }
}

impl<T: Bean> Default for BeanClass<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Bean> ErasedBeanClass for BeanClass<T> {
    fn type_name(&self) -> &'static str {
        self.name
    }

    fn type_tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    fn property_names(&self) -> Vec<&'static str> {
        self.properties.keys().copied().collect()
    }

    fn property_type(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name).map(|p| &p.ty)
    }

    fn is_writable(&self, name: &str) -> bool {
        self.properties.get(name).is_some_and(|p| p.set.is_some())
    }

    fn set(&self, object: &mut dyn Any, name: &str, value: Value) -> Result<(), AccessError> {
        let property = self.lookup(name)?;
        let setter = property.set.as_ref().ok_or_else(|| AccessError::NoSetter {
            type_name: self.name,
            property: name.to_string(),
        })?;
        let object = object
            .downcast_mut::<T>()
            .ok_or(AccessError::UnexpectedObject { type_name: self.name })?;
        setter(object, value).map_err(|failure| match failure {
            SetFailure::Mismatch(rejected) => AccessError::TypeMismatch {
                type_name: self.name,
                property: name.to_string(),
                expected: property.ty.to_string(),
                actual: format!("{:?}", rejected.kind()).to_lowercase(),
            },
            SetFailure::Rejected(message) => AccessError::SetterFailed {
                type_name: self.name,
                property: name.to_string(),
                message,
            },
        })
    }

    fn get(&self, object: &dyn Any, name: &str) -> Result<Value, AccessError> {
        let property = self.lookup(name)?;
        let object = object
            .downcast_ref::<T>()
            .ok_or(AccessError::UnexpectedObject { type_name: self.name })?;
        Ok((property.get)(object))
    }
}
