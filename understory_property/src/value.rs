// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tagged property values.
//!
//! This module provides [`Value`], the sum type every property store holds,
//! [`ValueType`] for declared property types, and [`PropertyValue`] for mapping
//! Rust types onto both.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::collection::ObservableCollection;
use crate::notify::{CollectionChanged, EventSource, PropertyChanged};

/// A property value.
///
/// Scalars compare by value. [`Value::Object`] compares by identity: two
/// handles are equal only if they point at the same object. Structural
/// comparison of objects is left to higher layers.
///
/// # Example
///
/// ```rust
/// use understory_property::Value;
///
/// let name = Value::from("Ann");
/// assert_eq!(name.as_str(), Some("Ann"));
/// assert_eq!(name, Value::Text("Ann".into()));
/// assert_ne!(name, Value::Null);
/// ```
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A shared object, such as a model or an observable collection.
    Object(ObjectRef),
}

impl Value {
    /// Returns the kind of this value, or `None` for [`Value::Null`].
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Bytes(_) => Some(ValueKind::Bytes),
            Self::List(_) => Some(ValueKind::List),
            Self::Object(_) => Some(ValueKind::Object),
        }
    }

    /// Returns a short label for the runtime type of this value.
    ///
    /// Objects report their own type name.
    #[must_use]
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Object(object) => object.type_name(),
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is a [`Value::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer, if this is a [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float, if this is a [`Value::Float`].
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string, if this is a [`Value::Text`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the items, if this is a [`Value::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the object handle, if this is a [`Value::Object`].
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the items of an enumerable value.
    ///
    /// Lists yield their elements; objects yield [`PropertyObject::items`].
    /// Strings and bytes are not treated as enumerable.
    #[must_use]
    pub fn enumerate(&self) -> Option<Vec<Self>> {
        match self {
            Self::List(items) => Some(items.clone()),
            Self::Object(object) => object.items(),
            _ => None,
        }
    }
}

/// Floats compare equal when both are NaN, so rewriting a NaN is a no-op.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

/// The kind of a non-null [`Value`], or [`ValueKind::Any`] in declarations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Accepts any value, including null.
    Any,
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Int`].
    Int,
    /// [`Value::Float`].
    Float,
    /// [`Value::Text`].
    Text,
    /// [`Value::Bytes`].
    Bytes,
    /// [`Value::List`].
    List,
    /// [`Value::Object`].
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Object => "object",
        };
        f.write_str(label)
    }
}

/// The declared type of a property.
///
/// # Example
///
/// ```rust
/// use understory_property::{Value, ValueKind, ValueType};
///
/// let age = ValueType::new(ValueKind::Int);
/// assert!(age.accepts(&Value::Int(3)));
/// assert!(!age.accepts(&Value::Null));
/// assert!(age.nullable().accepts(&Value::Null));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueType {
    kind: ValueKind,
    nullable: bool,
    object_type: Option<&'static str>,
}

impl ValueType {
    /// Declares a non-nullable type of the given kind.
    #[must_use]
    pub const fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: false,
            object_type: None,
        }
    }

    /// Declares a type that accepts every value.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            kind: ValueKind::Any,
            nullable: true,
            object_type: None,
        }
    }

    /// Declares an object type restricted to objects reporting `type_name`.
    #[must_use]
    pub const fn object(type_name: &'static str) -> Self {
        Self {
            kind: ValueKind::Object,
            nullable: false,
            object_type: Some(type_name),
        }
    }

    /// Returns the same type with null allowed.
    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// Returns the declared kind.
    #[must_use]
    #[inline]
    pub const fn kind(self) -> ValueKind {
        self.kind
    }

    /// Returns whether null is allowed.
    #[must_use]
    #[inline]
    pub const fn is_nullable(self) -> bool {
        self.nullable
    }

    /// Returns the required object type name, if any.
    #[must_use]
    #[inline]
    pub const fn object_type(self) -> Option<&'static str> {
        self.object_type
    }

    /// Returns `true` if `value` is an instance of this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        if self.kind == ValueKind::Any {
            return true;
        }
        match value {
            Value::Null => self.nullable,
            Value::Object(object) => {
                self.kind == ValueKind::Object
                    && self
                        .object_type
                        .is_none_or(|expected| expected == object.type_name())
            }
            other => other.kind() == Some(self.kind),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_type {
            Some(name) => f.write_str(name)?,
            None => write!(f, "{}", self.kind)?,
        }
        if self.nullable && self.kind != ValueKind::Any {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// Conversion between a Rust type and [`Value`].
///
/// Implemented for the scalar types, `String`, `Option<T>`, `Vec<T>`, [`Value`],
/// [`ObjectRef`] and shared [`ObservableCollection`]s. Higher layers implement it
/// for their own object handles.
pub trait PropertyValue: Sized {
    /// The declared type for properties of this Rust type.
    fn value_type() -> ValueType;

    /// Wraps `self` in a [`Value`].
    fn into_value(self) -> Value;

    /// Extracts `Self` from a [`Value`], returning `None` on a type mismatch.
    fn from_value(value: &Value) -> Option<Self>;
}

impl PropertyValue for bool {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Bool)
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl PropertyValue for i64 {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Int)
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl PropertyValue for i32 {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Int)
    }

    fn into_value(self) -> Value {
        Value::Int(self.into())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|v| Self::try_from(v).ok())
    }
}

impl PropertyValue for u32 {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Int)
    }

    fn into_value(self) -> Value {
        Value::Int(self.into())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|v| Self::try_from(v).ok())
    }
}

impl PropertyValue for f64 {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Float)
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl PropertyValue for String {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Text)
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(Into::into)
    }
}

impl PropertyValue for Value {
    fn value_type() -> ValueType {
        ValueType::any()
    }

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl PropertyValue for ObjectRef {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Object)
    }

    fn into_value(self) -> Value {
        Value::Object(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl PropertyValue for Arc<ObservableCollection> {
    fn value_type() -> ValueType {
        ValueType::object(core::any::type_name::<ObservableCollection>())
    }

    fn into_value(self) -> Value {
        Value::Object(ObjectRef::from_arc(self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().and_then(ObjectRef::downcast_arc)
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn value_type() -> ValueType {
        T::value_type().nullable()
    }

    fn into_value(self) -> Value {
        self.map_or(Value::Null, T::into_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: PropertyValue> PropertyValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::List)
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(T::into_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list()?.iter().map(T::from_value).collect()
    }
}

/// Upcasting helpers for [`PropertyObject`] trait objects.
///
/// Blanket-implemented for every `Send + Sync + 'static` type.
pub trait AsAny: Any {
    /// Returns `self` as [`Any`].
    fn as_any(&self) -> &dyn Any;

    /// Converts a shared handle into a shared [`Any`].
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An object that can be stored in a [`Value::Object`].
///
/// Objects may expose change notification for their own properties, change
/// notification for their contents, and enumerable items. Owners use these to
/// relay nested changes upward.
pub trait PropertyObject: AsAny + Send + Sync + fmt::Debug {
    /// Returns the runtime type name of this object.
    fn type_name(&self) -> &'static str;

    /// Returns the event raised when one of this object's properties changes.
    fn property_changed(&self) -> Option<&EventSource<PropertyChanged>> {
        None
    }

    /// Returns the event raised when this object's contents change.
    fn collection_changed(&self) -> Option<&EventSource<CollectionChanged>> {
        None
    }

    /// Returns a snapshot of this object's items, if it is enumerable.
    fn items(&self) -> Option<Vec<Value>> {
        None
    }

    /// Structural equality against another object.
    ///
    /// Defaults to identity.
    fn structural_eq(&self, other: &dyn PropertyObject) -> bool {
        core::ptr::addr_eq(self, other)
    }
}

/// A shared handle to a [`PropertyObject`].
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn PropertyObject>);

impl ObjectRef {
    /// Wraps a new object.
    #[must_use]
    pub fn new<T: PropertyObject>(object: T) -> Self {
        Self(Arc::new(object))
    }

    /// Wraps an already shared object.
    #[must_use]
    pub fn from_arc<T: PropertyObject>(object: Arc<T>) -> Self {
        Self(object)
    }

    /// Returns `true` if both handles point at the same object.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    /// Returns the address of the object, usable as an identity key.
    #[must_use]
    #[inline]
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Returns the object as a trait object.
    #[must_use]
    #[inline]
    pub fn get(&self) -> &dyn PropertyObject {
        &*self.0
    }

    /// Attempts to borrow the object as a concrete type.
    #[must_use]
    pub fn downcast_ref<T: PropertyObject>(&self) -> Option<&T> {
        self.get().as_any().downcast_ref()
    }

    /// Attempts to recover the shared concrete object.
    #[must_use]
    pub fn downcast_arc<T: PropertyObject>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).into_any_arc().downcast::<T>().ok()
    }
}

impl core::ops::Deref for ObjectRef {
    type Target = dyn PropertyObject;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type", &self.type_name())
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Token(u32);

    impl PropertyObject for Token {
        fn type_name(&self) -> &'static str {
            "Token"
        }
    }

    #[test]
    fn scalar_equality_is_by_value() {
        assert_eq!(Value::from(5_i64), Value::Int(5));
        assert_eq!(Value::from("a"), Value::Text("a".into()));
        assert_ne!(Value::Int(5), Value::Float(5.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(f64::NAN), Value::Float(0.0));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
    }

    #[test]
    fn object_equality_is_by_identity() {
        let a = ObjectRef::new(Token(1));
        let b = ObjectRef::new(Token(1));
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn downcast_recovers_concrete_object() {
        let token = ObjectRef::new(Token(7));
        assert_eq!(token.downcast_ref::<Token>().map(|t| t.0), Some(7));
        let shared = token.downcast_arc::<Token>().unwrap();
        assert_eq!(shared.0, 7);
        assert!(token.downcast_ref::<ObservableCollection>().is_none());
    }

    #[test]
    fn default_structural_eq_is_identity() {
        let a = ObjectRef::new(Token(1));
        let b = ObjectRef::new(Token(1));
        assert!(a.structural_eq(a.get()));
        assert!(!a.structural_eq(b.get()));
    }

    #[test]
    fn value_type_accepts() {
        let text = ValueType::new(ValueKind::Text);
        assert!(text.accepts(&Value::from("x")));
        assert!(!text.accepts(&Value::Int(1)));
        assert!(!text.accepts(&Value::Null));

        let token = ValueType::object("Token");
        assert!(token.accepts(&Value::Object(ObjectRef::new(Token(1)))));
        assert!(!ValueType::object("Other").accepts(&Value::Object(ObjectRef::new(Token(1)))));

        assert!(ValueType::any().accepts(&Value::Null));
        assert!(ValueType::any().accepts(&Value::Bytes(vec![1])));
    }

    #[test]
    fn value_type_display() {
        assert_eq!(ValueType::new(ValueKind::Int).to_string(), "int");
        assert_eq!(ValueType::new(ValueKind::Int).nullable().to_string(), "int?");
        assert_eq!(ValueType::object("Token").to_string(), "Token");
        assert_eq!(ValueType::any().to_string(), "any");
    }

    #[test]
    fn property_value_conversions() {
        assert_eq!(i32::from_value(&Value::Int(3)), Some(3));
        assert_eq!(i32::from_value(&Value::Int(i64::MAX)), None);
        assert_eq!(
            Option::<String>::from_value(&Value::Null),
            Some(None::<String>)
        );
        assert_eq!(Option::<String>::value_type().to_string(), "text?");
        assert_eq!(
            Vec::<i64>::from_value(&Value::List(vec![Value::Int(1), Value::Int(2)])),
            Some(vec![1, 2])
        );
        assert_eq!(
            Vec::<i64>::from_value(&Value::List(vec![Value::Int(1), Value::Null])),
            None
        );
    }

    #[test]
    fn strings_are_not_enumerable() {
        assert!(Value::from("abc").enumerate().is_none());
        assert_eq!(
            Value::List(vec![Value::Int(1)]).enumerate(),
            Some(vec![Value::Int(1)])
        );
    }
}
