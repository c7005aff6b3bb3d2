//! ```txt
//! Field {
//!     access:           u16
//!     name:             u16
//!     descriptor:       u16
//!     attributes_count: u16
//!     attributes:       [Attribute; attributes_count]
//! }
//! ```

use crate::{
    access::FieldAccess,
    attribute::{find_attribute, parse_attributes, Attribute, AttributeInfo, CONSTANT_VALUE},
    constant::{Constant, ConstantPool, PoolIndex},
    descriptor::FieldDescriptor,
    ByteParser, ClassResult,
};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Field {
    /// Properties and access patterns of this field.
    ///
    /// If this field is part of an interface, then the `public`, `final`,
    /// and `static` flags must all be set, and no other flags except
    /// `synthetic` can be set.
    pub access: FieldAccess,
    pub name_index: PoolIndex,
    pub descriptor_index: PoolIndex,
    pub name: String,
    pub descriptor: String,
    pub attributes: Box<[AttributeInfo]>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn parsed_descriptor(&self) -> ClassResult<FieldDescriptor> {
        FieldDescriptor::parse(&self.descriptor)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }

    /// The initial value of a `static final` field, if it has one.
    pub fn constant_value(&self) -> Option<&Constant> {
        match self.attribute(CONSTANT_VALUE)? {
            Attribute::ConstantValue { value, .. } => Some(value),
            _ => None,
        }
    }
}

pub fn parse_field(input: &mut ByteParser<'_>, pool: &ConstantPool) -> ClassResult<Field> {
    let access = FieldAccess::from_bits_retain(input.parse_u16()?);
    let (name_index, name) = pool.read_utf8(input)?;
    let (descriptor_index, descriptor) = pool.read_utf8(input)?;
    let attributes = parse_attributes(input, pool)?;

    Ok(Field {
        access,
        name_index,
        descriptor_index,
        name,
        descriptor,
        attributes,
    })
}
