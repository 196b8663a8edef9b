//! Read-only query interface over a heap snapshot
//!
//! Inspectors never see how a snapshot is stored. They walk it through
//! [`HeapGraph`], which exposes instance enumeration, class and field
//! introspection, field reads and identity comparison.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one object in the heap graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Object,
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl FieldType {
    /// Only reference-typed fields can point back at their owner
    pub fn is_reference(self) -> bool {
        matches!(self, FieldType::Object)
    }
}

/// A field declared directly on a class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    /// Fully-qualified name of the class that declares this field
    pub declaring_class: String,
    pub field_type: FieldType,
}

/// A class and the fields it declares itself (inherited fields excluded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ClassDescriptor {
    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Current value of a field on an instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Null,
    #[serde(rename = "ref")]
    Reference(InstanceId),
    #[serde(rename = "bool")]
    Boolean(bool),
    Char(u16),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl FieldValue {
    pub fn as_reference(&self) -> Option<InstanceId> {
        match self {
            FieldValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Integral value widened to i64, for fields such as `offset` or `coder`
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            FieldValue::Byte(v) => Some(v.into()),
            FieldValue::Short(v) => Some(v.into()),
            FieldValue::Int(v) => Some(v.into()),
            FieldValue::Long(v) => Some(v),
            FieldValue::Char(v) => Some(v.into()),
            _ => None,
        }
    }
}

/// Elements of a primitive array, such as the character storage behind a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveArray {
    /// UTF-16 code units
    Char(Vec<u16>),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
}

impl PrimitiveArray {
    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::Char(v) => v.len(),
            PrimitiveArray::Byte(v) => v.len(),
            PrimitiveArray::Short(v) => v.len(),
            PrimitiveArray::Int(v) => v.len(),
            PrimitiveArray::Long(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only view of a heap snapshot
///
/// Implementations must treat the graph as immutable while an inspection
/// borrows it. `instances` yields every object instance exactly once.
pub trait HeapGraph {
    /// Enumerate every object instance in the snapshot
    fn instances(&self) -> Box<dyn Iterator<Item = InstanceId> + '_>;

    /// Resolve the runtime class of an instance
    fn class_of(&self, instance: InstanceId) -> Option<&ClassDescriptor>;

    /// Read the current value of a field on an instance
    ///
    /// Returns `None` when the instance does not carry the field at all.
    fn field_value(&self, instance: InstanceId, field: &FieldDescriptor) -> Option<FieldValue>;

    /// Read the elements of a primitive array
    fn primitive_array(&self, array: InstanceId) -> Option<&PrimitiveArray>;

    /// Identity comparison between two instances
    fn is_same_instance(&self, a: InstanceId, b: InstanceId) -> bool {
        a == b
    }
}
