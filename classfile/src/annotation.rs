//! Annotations, shared by the `Runtime{Visible,Invisible}Annotations`,
//! `Runtime{Visible,Invisible}ParameterAnnotations` and `AnnotationDefault`
//! attributes.
//!
//! ```txt
//! Annotation {
//!     type_index: u16,
//!     num_element_value_pairs: u16,
//!     element_value_pairs: [ElementValuePair; num_element_value_pairs],
//! }
//!
//! ElementValuePair {
//!     element_name_index: u16,
//!     value: ElementValue,
//! }
//!
//! ElementValue {
//!     tag: u8,
//!     value: match tag {
//!         b'B' | b'C' | b'I' | b'S' | b'Z' => const_value_index: u16, // Integer
//!         b'D' => const_value_index: u16, // Double
//!         b'F' => const_value_index: u16, // Float
//!         b'J' => const_value_index: u16, // Long
//!         b's' => const_value_index: u16, // Utf8
//!         b'e' => { type_name_index: u16, const_name_index: u16 },
//!         b'c' => class_info_index: u16,
//!         b'@' => Annotation,
//!         b'[' => { num_values: u16, values: [ElementValue; num_values] },
//!     },
//! }
//! ```

use crate::{
    constant::{Constant, ConstantKind, ConstantPool, PoolIndex},
    parse::ByteParser,
    ClassError, ClassResult, MAX_NESTING,
};

/// Which kind of constant an [`ElementValue::Const`] holds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ConstTag {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    String,
}

impl ConstTag {
    pub fn from_tag(tag: u8) -> Option<ConstTag> {
        Some(match tag {
            b'B' => ConstTag::Byte,
            b'C' => ConstTag::Char,
            b'D' => ConstTag::Double,
            b'F' => ConstTag::Float,
            b'I' => ConstTag::Int,
            b'J' => ConstTag::Long,
            b'S' => ConstTag::Short,
            b'Z' => ConstTag::Boolean,
            b's' => ConstTag::String,
            _ => return None,
        })
    }

    /// The pool entry kind a value with this tag must point at.
    pub fn constant_kind(self) -> ConstantKind {
        match self {
            ConstTag::Byte
            | ConstTag::Char
            | ConstTag::Int
            | ConstTag::Short
            | ConstTag::Boolean => ConstantKind::Integer,
            ConstTag::Double => ConstantKind::Double,
            ConstTag::Float => ConstantKind::Float,
            ConstTag::Long => ConstantKind::Long,
            ConstTag::String => ConstantKind::Utf8,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Annotation {
    pub type_index: PoolIndex,
    /// The field descriptor of the annotation interface, like
    /// `Ljava/lang/Deprecated;`.
    pub type_descriptor: String,
    pub pairs: Box<[ElementValuePair]>,
}

impl Annotation {
    pub fn get(&self, name: &str) -> Option<&ElementValue> {
        self.pairs
            .iter()
            .find(|pair| pair.name == name)
            .map(|pair| &pair.value)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementValuePair {
    pub name_index: PoolIndex,
    pub name: String,
    pub value: ElementValue,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElementValue {
    /// A primitive or string constant. `value` is a copy of the pool entry.
    Const {
        tag: ConstTag,
        index: PoolIndex,
        value: Constant,
    },
    Enum {
        type_name_index: PoolIndex,
        type_name: String,
        const_name_index: PoolIndex,
        const_name: String,
    },
    Class {
        index: PoolIndex,
        class_name: String,
    },
    Annotation(Box<Annotation>),
    /// Elements are not required to share a tag.
    Array(Box<[ElementValue]>),
}

pub fn parse_element_value(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<ElementValue> {
    element_value(input, pool, 0)
}

fn element_value(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> ClassResult<ElementValue> {
    let tag_offset = input.offset();
    if depth >= MAX_NESTING {
        return Err(ClassError::NestingTooDeep {
            offset: tag_offset,
            limit: MAX_NESTING,
        });
    }
    let tag = input.parse_u8()?;

    if let Some(const_tag) = ConstTag::from_tag(tag) {
        let offset = input.offset();
        let index = input.parse_u16()?;
        let kind = const_tag.constant_kind();
        let value = pool
            .resolve_kind(index, offset, "a constant matching the element tag", &[kind])?
            .clone();
        return Ok(ElementValue::Const {
            tag: const_tag,
            index,
            value,
        });
    }

    Ok(match tag {
        b'e' => {
            let (type_name_index, type_name) = pool.read_utf8(input)?;
            let (const_name_index, const_name) = pool.read_utf8(input)?;
            ElementValue::Enum {
                type_name_index,
                type_name,
                const_name_index,
                const_name,
            }
        }
        b'c' => {
            let (index, class_name) = pool.read_class(input)?;
            ElementValue::Class { index, class_name }
        }
        b'@' => ElementValue::Annotation(Box::new(annotation(input, pool, depth + 1)?)),
        b'[' => ElementValue::Array(
            input.counted(|input| element_value(input, pool, depth + 1))?,
        ),
        tag => {
            return Err(ClassError::UnknownElementValueTag {
                tag,
                offset: tag_offset,
            })
        }
    })
}

pub fn parse_element_value_pair(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<ElementValuePair> {
    element_value_pair(input, pool, 0)
}

fn element_value_pair(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> ClassResult<ElementValuePair> {
    let (name_index, name) = pool.read_utf8(input)?;
    Ok(ElementValuePair {
        name_index,
        name,
        value: element_value(input, pool, depth)?,
    })
}

pub fn parse_annotation(input: &mut ByteParser<'_>, pool: &ConstantPool) -> ClassResult<Annotation> {
    annotation(input, pool, 0)
}

fn annotation(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> ClassResult<Annotation> {
    let (type_index, type_descriptor) = pool.read_utf8(input)?;
    Ok(Annotation {
        type_index,
        type_descriptor,
        pairs: input.counted(|input| element_value_pair(input, pool, depth))?,
    })
}

/// A `u16` count followed by that many annotations.
pub fn parse_annotations(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<Box<[Annotation]>> {
    input.counted(|input| parse_annotation(input, pool))
}

/// A `u8` parameter count, followed by one counted annotation list per
/// parameter.
pub fn parse_parameter_annotations(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<Box<[Box<[Annotation]>]>> {
    let num = input.parse_u8()? as usize;
    input.seq(num, |input| parse_annotations(input, pool))
}
