//! Input value model for job payloads.
//!
//! A [`Value`] is the shape a producer hands over before normalization. Unlike
//! `serde_json::Value` it can contain:
//!
//! - shared, mutable objects and arrays with reference identity (and therefore cycles)
//! - class instances whose getters compute properties on access
//! - dates and callables, which have no JSON representation of their own
//!
//! Objects and arrays are `Arc<RwLock<_>>` handles, so a payload graph can be
//! built on one thread and normalized on another.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PayloadResult;

/// Computed accessor: receives the instance it is read from.
pub type Getter = Arc<dyn Fn(&ObjectRef) -> Value + Send + Sync>;

/// An arbitrary payload value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent value. Dropped from objects, `null` in arrays.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    Function(Function),
    Array(ArrayRef),
    Object(ObjectRef),
}

impl Value {
    /// Build a plain object from key/value pairs (insertion order is kept).
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(ObjectRef::from_entries(entries))
    }

    /// Build an array from its elements.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Array(ArrayRef::from_values(items.into_iter().map(Into::into).collect()))
    }

    /// Convert any `Serialize` type through its serde representation.
    ///
    /// Serde output is already plain, so the result never contains getters
    /// or cycles.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> PayloadResult<Self> {
        Ok(serde_json::to_value(value)?.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            Value::UInt(u) => i64::try_from(u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(i) => Some(i as f64),
            Value::UInt(u) => Some(u as f64),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Function(_) => "function",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

macro_rules! impl_from_scalar {
    ($($t:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

impl_from_scalar!(
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => String as String,
    DateTime<Utc> => Date as DateTime<Utc>,
);

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::UInt(value as u64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<ArrayRef> for Value {
    fn from(value: ArrayRef) -> Self {
        Value::Array(value)
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(ArrayRef::from_values(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(ArrayRef::from_values(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::object(map),
        }
    }
}

/// Identity of a compound value (allocation address of its handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A callable stored as a property value. Never part of normalized output.
#[derive(Clone)]
pub struct Function {
    name: String,
    call: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

/// Class definition: a name, getters in declaration order, and an optional parent.
///
/// Instances created with [`ObjectRef::instance`] expose these getters as
/// properties alongside their own data.
#[derive(Clone)]
pub struct Class(Arc<ClassDef>);

struct ClassDef {
    name: String,
    getters: Vec<(String, Getter)>,
    parent: Option<Class>,
}

impl Class {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            getters: Vec::new(),
            parent: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Class> {
        self.0.parent.as_ref()
    }

    /// All getters visible on an instance, most-derived class first.
    ///
    /// A getter redefined in a subclass hides the parent's getter of the same name.
    pub fn getters(&self) -> Vec<(String, Getter)> {
        let mut out: Vec<(String, Getter)> = Vec::new();
        let mut class = Some(self);
        while let Some(c) = class {
            for (name, getter) in &c.0.getters {
                if !out.iter().any(|(seen, _)| seen == name) {
                    out.push((name.clone(), Arc::clone(getter)));
                }
            }
            class = c.parent();
        }
        out
    }

    fn getter(&self, key: &str) -> Option<Getter> {
        let mut class = Some(self);
        while let Some(c) = class {
            if let Some((_, g)) = c.0.getters.iter().find(|(name, _)| name == key) {
                return Some(Arc::clone(g));
            }
            class = c.parent();
        }
        None
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.getters.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Class")
            .field("name", &self.0.name)
            .field("getters", &names)
            .field("parent", &self.parent().map(Class::name))
            .finish()
    }
}

/// Builder for [`Class`].
pub struct ClassBuilder {
    name: String,
    getters: Vec<(String, Getter)>,
    parent: Option<Class>,
}

impl ClassBuilder {
    /// Declare a getter. Redeclaring a name replaces the earlier getter in place.
    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&ObjectRef) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        let getter: Getter = Arc::new(getter);
        match self.getters.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = getter,
            None => self.getters.push((name, getter)),
        }
        self
    }

    pub fn extends(mut self, parent: &Class) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn build(self) -> Class {
        Class(Arc::new(ClassDef {
            name: self.name,
            getters: self.getters,
            parent: self.parent,
        }))
    }
}

#[derive(Default)]
struct Object {
    class: Option<Class>,
    properties: Vec<(String, Value)>,
}

/// Shared handle to an object (plain or class instance).
///
/// Cloning the handle shares the object; identity is the allocation, not the contents.
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// New empty plain object.
    pub fn new() -> Self {
        Self::default()
    }

    /// New empty instance of `class`.
    pub fn instance(class: &Class) -> Self {
        Self(Arc::new(RwLock::new(Object {
            class: Some(class.clone()),
            properties: Vec::new(),
        })))
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let obj = Self::new();
        for (k, v) in entries {
            obj.set(k, v);
        }
        obj
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set an own data property. Existing keys keep their position.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut obj = write(&self.0);
        match obj.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => obj.properties.push((key, value)),
        }
    }

    /// Read a property: own data first, then the class getters.
    ///
    /// Returns [`Value::Undefined`] when neither exists. Getters run with no
    /// lock held, so they may read the instance themselves.
    pub fn get(&self, key: &str) -> Value {
        let getter = {
            let obj = read(&self.0);
            if let Some((_, v)) = obj.properties.iter().find(|(k, _)| k == key) {
                return v.clone();
            }
            obj.class.as_ref().and_then(|c| c.getter(key))
        };
        getter.map_or(Value::Undefined, |g| g(self))
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut obj = write(&self.0);
        let idx = obj.properties.iter().position(|(k, _)| k == key)?;
        Some(obj.properties.remove(idx).1)
    }

    /// Own data property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        read(&self.0).properties.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn class(&self) -> Option<Class> {
        read(&self.0).class.clone()
    }

    /// Drop all own properties. Breaks reference cycles through this object.
    pub fn clear(&self) {
        write(&self.0).properties.clear();
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Own data properties and class, cloned out so no lock is held afterwards.
    pub(crate) fn snapshot(&self) -> (Vec<(String, Value)>, Option<Class>) {
        let obj = read(&self.0);
        (obj.properties.clone(), obj.class.clone())
    }

    pub(crate) fn node_id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0) as *const () as usize)
    }
}

impl fmt::Debug for ObjectRef {
    // Keys only: the contents may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let obj = read(&self.0);
        let keys: Vec<&str> = obj.properties.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ObjectRef")
            .field("class", &obj.class.as_ref().map(Class::name))
            .field("keys", &keys)
            .finish()
    }
}

/// Shared handle to an array.
#[derive(Clone, Default)]
pub struct ArrayRef(Arc<RwLock<Vec<Value>>>);

impl ArrayRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }

    pub fn push(&self, value: impl Into<Value>) {
        write(&self.0).push(value.into());
    }

    /// Replace the element at `index`, padding with `Undefined` if needed.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let mut items = write(&self.0);
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value.into();
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        read(&self.0).get(index).cloned()
    }

    pub fn len(&self) -> usize {
        read(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }

    /// Drop all elements. Breaks reference cycles through this array.
    pub fn clear(&self) {
        write(&self.0).clear();
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn snapshot(&self) -> Vec<Value> {
        read(&self.0).clone()
    }

    pub(crate) fn node_id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0) as *const () as usize)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayRef(len={})", self.len())
    }
}
