//! ```txt
//! Method {
//!     access:           u16
//!     name:             u16
//!     descriptor:       u16
//!     attributes_count: u16
//!     attributes:       [Attribute; attributes_count]
//! }
//! ```

use crate::{
    access::MethodAccess,
    attribute::{
        find_attribute, parse_attributes, Attribute, AttributeInfo, ClassRef, Code, CODE,
        EXCEPTIONS,
    },
    constant::{ConstantPool, PoolIndex},
    descriptor::MethodDescriptor,
    ByteParser, ClassResult,
};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Method {
    pub access: MethodAccess,
    pub name_index: PoolIndex,
    pub descriptor_index: PoolIndex,
    /// Either a plain identifier, `<init>` for constructors, or `<clinit>` for
    /// the static initializer.
    pub name: String,
    pub descriptor: String,
    pub attributes: Box<[AttributeInfo]>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn parsed_descriptor(&self) -> ClassResult<MethodDescriptor> {
        MethodDescriptor::parse(&self.descriptor)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }

    /// The method body. Absent for `abstract` and `native` methods.
    pub fn code(&self) -> Option<&Code> {
        match self.attribute(CODE)? {
            Attribute::Code(code) => Some(code),
            _ => None,
        }
    }

    /// The checked exceptions listed in the `throws` clause.
    pub fn exceptions(&self) -> &[ClassRef] {
        match self.attribute(EXCEPTIONS) {
            Some(Attribute::Exceptions(classes)) => classes,
            _ => &[],
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>"
    }
}

pub fn parse_method(input: &mut ByteParser<'_>, pool: &ConstantPool) -> ClassResult<Method> {
    let access = MethodAccess::from_bits_retain(input.parse_u16()?);
    let (name_index, name) = pool.read_utf8(input)?;
    let (descriptor_index, descriptor) = pool.read_utf8(input)?;
    let attributes = parse_attributes(input, pool)?;

    Ok(Method {
        access,
        name_index,
        descriptor_index,
        name,
        descriptor,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constant::parse_constant_pool, descriptor::ReturnDescriptor, ClassError};
    use pretty_assertions::assert_eq;

    // #1 Utf8 "<init>"  #2 Utf8 "()V"  #3 Utf8 "Code"
    #[rustfmt::skip]
    const POOL: &[u8] = &[
        0x00, 0x04,
        1, 0x00, 0x06, b'<', b'i', b'n', b'i', b't', b'>',
        1, 0x00, 0x03, b'(', b')', b'V',
        1, 0x00, 0x04, b'C', b'o', b'd', b'e',
    ];

    fn pool() -> ConstantPool {
        parse_constant_pool(&mut ByteParser::new(POOL)).unwrap()
    }

    #[test]
    fn constructor_with_code() {
        let pool = pool();
        #[rustfmt::skip]
        let mut input = ByteParser::new(&[
            0x00, 0x01, 0x00, 0x01, 0x00, 0x02,
            0x00, 0x01,
                0x00, 0x03, 0, 0, 0, 13,
                0x00, 0x01, 0x00, 0x01,
                0, 0, 0, 1, 0xb1,
                0x00, 0x00,
                0x00, 0x00,
        ]);
        let method = parse_method(&mut input, &pool).unwrap();
        assert!(input.is_empty());

        assert!(method.is_constructor());
        assert!(!method.is_static_initializer());
        assert_eq!(method.access, MethodAccess::PUBLIC);
        assert_eq!(method.code().map(|code| &*code.code), Some(&[0xb1][..]));
        assert!(method.exceptions().is_empty());

        let descriptor = method.parsed_descriptor().unwrap();
        assert!(descriptor.args.is_empty());
        assert_eq!(descriptor.ret, ReturnDescriptor::Void);
    }

    #[test]
    fn abstract_method_has_no_code() {
        let pool = pool();
        let mut input = ByteParser::new(&[0x04, 0x01, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00]);
        let method = parse_method(&mut input, &pool).unwrap();
        assert!(method.access.contains(MethodAccess::ABSTRACT));
        assert_eq!(method.code(), None);
    }

    #[test]
    fn descriptor_index_out_of_range() {
        let pool = pool();
        let mut input = ByteParser::new(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x09, 0x00, 0x00]);
        assert_eq!(
            parse_method(&mut input, &pool),
            Err(ClassError::UnresolvedConstantReference { index: 9, offset: 4 })
        );
    }
}
