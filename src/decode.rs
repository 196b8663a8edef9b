//! Classify-then-decode for string instances
//!
//! An instance is first matched by class name against [`KNOWN_SHAPES`]. Only
//! a recognized shape is decoded, and decoding returns
//! [`Decoded::NotDecodable`] instead of failing when the instance's data does
//! not look the way the shape expects.
//!
//! Supported `java.lang.String` layouts:
//!
//! - `value: char[]` holding UTF-16 code units
//! - `value: byte[]` with `coder` 0 (Latin-1) or 1 (UTF-16, little-endian units)
//! - `value: int[]` holding code points
//! - legacy `offset` / `count` fields selecting a slice of `value`

use crate::graph::{ClassDescriptor, HeapGraph, InstanceId, PrimitiveArray};
use std::borrow::Cow;

/// Fully-qualified name of the runtime's built-in immutable string type
pub const JAVA_LANG_STRING: &str = "java.lang.String";

/// Decodable instance layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringShape {
    JavaLangString,
}

/// Class names with a known decodable layout
pub const KNOWN_SHAPES: &[(&str, StringShape)] =
    &[(JAVA_LANG_STRING, StringShape::JavaLangString)];

/// Outcome of decoding one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Text(String),
    /// Recognized class, but its backing storage is missing or malformed
    NotDecodable,
}

/// Match a class name against the shape registry
pub fn classify(class_name: &str) -> Option<StringShape> {
    KNOWN_SHAPES
        .iter()
        .find(|(name, _)| *name == class_name)
        .map(|(_, shape)| *shape)
}

impl StringShape {
    /// Decode the content of `instance`, whose class is `class`
    pub fn decode<G: HeapGraph + ?Sized>(
        self,
        heap: &G,
        instance: InstanceId,
        class: &ClassDescriptor,
    ) -> Decoded {
        match self {
            StringShape::JavaLangString => decode_java_string(heap, instance, class)
                .map(Decoded::Text)
                .unwrap_or(Decoded::NotDecodable),
        }
    }
}

const CODER_LATIN1: i64 = 0;
const CODER_UTF16: i64 = 1;

fn decode_java_string<G: HeapGraph + ?Sized>(
    heap: &G,
    instance: InstanceId,
    class: &ClassDescriptor,
) -> Option<String> {
    let read_int = |name: &str| {
        class
            .field(name)
            .and_then(|f| heap.field_value(instance, f))
            .and_then(|v| v.as_integer())
    };

    let value_field = class.field("value")?;
    let array_id = heap.field_value(instance, value_field)?.as_reference()?;
    let array = heap.primitive_array(array_id)?;

    let coder = read_int("coder").unwrap_or(CODER_LATIN1);
    let units = code_units(array, coder)?;

    // Pre-Java 7u6 strings share `value` and select their slice with offset/count
    let (start, len) = match (read_int("offset"), read_int("count")) {
        (Some(offset), Some(count)) => (
            usize::try_from(offset).ok()?,
            usize::try_from(count).ok()?,
        ),
        _ => (0, units.len()),
    };
    let end = start.checked_add(len)?;

    match units {
        CodeUnits::Utf16(units) => {
            let slice = units.get(start..end)?;
            Some(
                char::decode_utf16(slice.iter().copied())
                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect(),
            )
        }
        CodeUnits::CodePoints(points) => points
            .get(start..end)?
            .iter()
            .map(|&p| u32::try_from(p).ok().and_then(char::from_u32))
            .collect(),
    }
}

/// Numeric character codes extracted from a backing array
///
/// `char[]` and `int[]` storage is borrowed; only `byte[]` layouts are widened
/// into a new buffer.
#[derive(Debug)]
enum CodeUnits<'a> {
    Utf16(Cow<'a, [u16]>),
    CodePoints(&'a [i32]),
}

impl CodeUnits<'_> {
    fn len(&self) -> usize {
        match self {
            CodeUnits::Utf16(v) => v.len(),
            CodeUnits::CodePoints(v) => v.len(),
        }
    }
}

fn code_units(array: &PrimitiveArray, coder: i64) -> Option<CodeUnits<'_>> {
    match array {
        PrimitiveArray::Char(units) => Some(CodeUnits::Utf16(Cow::Borrowed(units.as_slice()))),
        PrimitiveArray::Byte(bytes) => match coder {
            CODER_LATIN1 => Some(CodeUnits::Utf16(Cow::Owned(
                bytes.iter().map(|&b| u16::from(b as u8)).collect(),
            ))),
            CODER_UTF16 => {
                if bytes.len() % 2 != 0 {
                    return None;
                }
                Some(CodeUnits::Utf16(Cow::Owned(
                    bytes
                        .chunks_exact(2)
                        .map(|pair| u16::from_le_bytes([pair[0] as u8, pair[1] as u8]))
                        .collect(),
                )))
            }
            _ => None,
        },
        PrimitiveArray::Int(points) => Some(CodeUnits::CodePoints(points.as_slice())),
        PrimitiveArray::Short(_) | PrimitiveArray::Long(_) => None,
    }
}
