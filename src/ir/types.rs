//! Static types of the IR: classes, fields, methods and primitives.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// A class or interface name, interned as a cheaply-clonable string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub Arc<str>);

impl ClassId {
    /// Creates a class id from any string-like value.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClassId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The primitive types of the IR. The "int-holding" set used by constant
/// propagation is `{Byte, Short, Int, Char, Boolean}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Byte,
    Short,
    Int,
    Char,
    Boolean,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveType {
    /// Whether values of this type are represented as 32-bit integers and
    /// therefore participate in constant propagation.
    #[must_use]
    pub const fn can_hold_int(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Short | Self::Int | Self::Char | Self::Boolean
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Char => "char",
            Self::Boolean => "boolean",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Void => "void",
        };
        write!(f, "{name}")
    }
}

/// A static type: a primitive, a class/interface reference, or an array.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Type {
    Primitive(PrimitiveType),
    Class(ClassId),
    Array(Box<Type>),
}

impl Type {
    /// Whether a variable of this type can hold a constant-propagated integer.
    #[must_use]
    pub const fn can_hold_int(&self) -> bool {
        matches!(self, Self::Primitive(p) if p.can_hold_int())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Class(c) => write!(f, "{c}"),
            Self::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

/// The subsignature of a method: its name and descriptor, ignoring the
/// declaring class. Two methods with the same subsignature override one
/// another under virtual dispatch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subsignature(pub Arc<str>);

impl Subsignature {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for Subsignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to a method as it appears at a call site: the statically
/// declared class and subsignature, *before* dispatch resolves it to a
/// concrete declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: ClassId,
    pub subsignature: Subsignature,
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.subsignature)
    }
}

/// The identity of a concrete, declared method: the class that declares it
/// (not necessarily the class named at a call site) plus its subsignature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodId {
    pub declaring_class: ClassId,
    pub subsignature: Subsignature,
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_class, self.subsignature)
    }
}

/// A reference to a field: its declaring class, name and type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub declaring_class: ClassId,
    pub name: Arc<str>,
    pub ty: Type,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_class, self.name)
    }
}
