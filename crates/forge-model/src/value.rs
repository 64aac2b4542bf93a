//! Dynamic property values and object identity handles

use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Ordered property overrides supplied by a caller (keys may be dotted)
pub type Overrides = IndexMap<String, Value>;

/// Opaque build parameters handed to factories
pub type Params = IndexMap<String, Value>;

/// Query criteria, keyed by property path
pub type Criteria = IndexMap<String, Value>;

/// Value assigned to or read from a property
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    Text(String),
    /// Another built object, compared by identity
    Object(ObjectRef),
    /// Ordered list of values
    List(Vec<Value>),
}

/// Discriminant of a [`Value`], used to key conversions and defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Null`]
    Null,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Int`]
    Int,
    /// [`Value::Float`]
    Float,
    /// [`Value::Text`]
    Text,
    /// [`Value::Object`]
    Object,
    /// [`Value::List`]
    List,
    /// Wildcard source kind for converter lookups
    Any,
}

impl Value {
    /// Kind of this value
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Object(_) => ValueKind::Object,
            Self::List(_) => ValueKind::List,
        }
    }

    /// Check for [`Value::Null`]
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer content
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric content as float (integers widen)
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean content
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text content
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Object content
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// List content
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Object(o) => write!(f, "{o:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(i: u64) -> Self {
        i64::try_from(i).map_or(Self::Float(i as f64), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null | serde_json::Value::Object(_) => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
        }
    }
}

/// Runtime identity of a Rust type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for `T`
    #[inline]
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type id
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Address-based identity of a built object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

/// Shared handle to a built object
///
/// Two handles are equal only when they point at the same allocation;
/// objects with equal contents built separately are distinct.
#[derive(Clone)]
pub struct ObjectRef {
    tag: TypeTag,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wrap an existing shared object
    #[must_use]
    pub fn new<T: Any + Send + Sync>(object: Arc<T>) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            inner: object,
        }
    }

    /// Freeze a boxed object built for type `tag`
    #[must_use]
    pub fn from_boxed(tag: TypeTag, object: Box<dyn Any + Send + Sync>) -> Self {
        Self {
            tag,
            inner: Arc::from(object),
        }
    }

    /// Type the object was built as
    #[inline]
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    /// Identity of the underlying allocation
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.inner).cast::<()>() as usize)
    }

    /// Check the concrete type
    #[inline]
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrow as `&dyn Any` for accessor reads
    #[inline]
    #[must_use]
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.inner
    }

    /// Borrow the concrete object
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Obtain a typed shared handle
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Identity comparison
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.tag.name(), self.id().0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i64,
    }

    #[test]
    fn object_identity_not_value() {
        let a = ObjectRef::new(Arc::new(Point { x: 1 }));
        let b = ObjectRef::new(Arc::new(Point { x: 1 }));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(Value::Object(a.clone()), Value::Object(a));
    }

    #[test]
    fn object_downcast() {
        let shared = Arc::new(Point { x: 7 });
        let handle = ObjectRef::new(Arc::clone(&shared));
        assert!(handle.is::<Point>());
        assert!(Arc::ptr_eq(&handle.downcast::<Point>().unwrap(), &shared));
        assert!(handle.downcast::<String>().is_none());
    }

    #[test]
    fn object_from_boxed_keeps_tag() {
        let boxed: Box<dyn Any + Send + Sync> = Box::new(Point { x: 3 });
        let handle = ObjectRef::from_boxed(TypeTag::of::<Point>(), boxed);
        assert_eq!(handle.type_tag(), TypeTag::of::<Point>());
        assert_eq!(handle.downcast_ref::<Point>(), Some(&Point { x: 3 }));
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(10), Value::Int(10));
        assert_eq!(Value::from("a"), Value::Text("a".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(vec![1, 2]), Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Text("x".into()).as_int(), None);
    }

    #[test]
    fn value_from_json() {
        let json = serde_json::json!([1, 2.5, "a", true, null]);
        assert_eq!(
            Value::from(json),
            Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::Text("a".into()),
                Value::Bool(true),
                Value::Null,
            ])
        );
    }

    #[test]
    fn value_kinds() {
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert_eq!(Value::from(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::List(Vec::new()).kind(), ValueKind::List);
    }
}
