//! PDF object types.
//!
//! [`Object`] is a value-typed tagged sum over the PDF data model. Parsed
//! objects are snapshots: they own their data, copy freely, and never hold a
//! reference back into the file. The one exception is [`Stream`], which
//! records where its payload *starts* instead of owning the bytes — payloads
//! are read lazily through the stream reader.

use crate::name::Name;
use indexmap::IndexMap;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (raw bytes, not character-decoded)
    String(Vec<u8>),
    /// Name (starting with / on the wire)
    Name(Name),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (insertion-ordered key-value pairs)
    Dictionary(Dict),
    /// Stream: dictionary plus the byte offset of the payload
    Stream(Stream),
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number (>= 1 for real objects)
    pub number: u32,
    /// Generation number
    pub generation: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// A stream object: its dictionary and the absolute byte offset of the
/// first payload byte (immediately after the `stream` keyword's EOL).
///
/// Only occurs inside an indirect object; the payload is never parsed
/// eagerly.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// The stream dictionary
    pub dict: Dict,
    /// Absolute offset of the payload in the underlying byte source
    pub start: u64,
}

/// An indirect object: `N G obj <value> endobj`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    /// The object's label
    pub reference: ObjectRef,
    /// The contained value
    pub object: Object,
}

/// Insertion-ordered dictionary mapping names to objects.
///
/// Key order is preserved so that re-serialized dictionaries keep a stable
/// layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dict(IndexMap<Name, Object>);

impl Dict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from key/value pairs, preserving their order.
    pub fn from_pairs<K: Into<Name>>(pairs: impl IntoIterator<Item = (K, Object)>) -> Self {
        Dict(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.0.get(key.as_bytes())
    }

    /// Insert a value, replacing any previous one under the same key.
    pub fn insert(&mut self, key: impl Into<Name>, value: Object) {
        self.0.insert(key.into(), value);
    }

    /// Remove a value by key.
    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.0.shift_remove(key.as_bytes())
    }

    /// Whether the dictionary contains the key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key.as_bytes())
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.0.iter()
    }

    /// Iterate values mutably, in insertion order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.0.values_mut()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<Name>> FromIterator<(K, Object)> for Dict {
    fn from_iter<T: IntoIterator<Item = (K, Object)>>(iter: T) -> Self {
        Dict::from_pairs(iter)
    }
}

impl Object {
    /// Human-readable type name, without the data.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to real. Integers widen to `f64`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            Object::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to string bytes.
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both dictionaries and streams.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Try to cast to stream.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Shorthand for building a reference object.
    pub fn reference(number: u32, generation: u16) -> Object {
        Object::Reference(ObjectRef::new(number, generation))
    }

    /// Shorthand for building a name object.
    pub fn name(name: impl Into<Name>) -> Object {
        Object::Name(name.into())
    }

    /// Shorthand for building a string object.
    pub fn string(bytes: impl Into<Vec<u8>>) -> Object {
        Object::String(bytes.into())
    }
}
