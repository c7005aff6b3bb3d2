//! # Class file binary format
//!
//! All numbers in this format are big-endian
//!
//! ```txt
//! Class {
//!     // 0xCAFEBABE
//!     magic: u32,
//!     minor_version: u16,
//!     major_version: u16,
//!
//!     constant_pool_count: u16,
//!     constant_pool: [Constant; constant_pool_count - 1],
//!
//!     access_flags: u16,
//!     this_class: u16,
//!     super_class: u16,
//!
//!     interfaces_count: u16,
//!     interfaces: [u16; interfaces_count],
//!
//!     fields_count: u16,
//!     fields: [Field; fields_count],
//!
//!     methods_count: u16,
//!     methods: [Method; methods_count],
//!
//!     attributes_count: u16,
//!     attributes: [Attribute; attributes_count],
//! }
//! ```

use crate::{
    access::ClassAccess,
    attribute::{find_attribute, parse_attributes, Attribute, AttributeInfo, SOURCE_FILE},
    constant::{parse_constant_pool, ConstantPool, PoolIndex},
    field::{parse_field, Field},
    method::{parse_method, Method},
    parse::ByteParser,
    ClassError, ClassResult,
};
use log::debug;

/// The class file magic: `0xCAFEBABE`
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Magic, minor version, major version and constant pool count.
const FIXED_HEADER_LEN: usize = 10;

/// Version of the class file.
///
/// Versions are denoted as `M.m` where `M` is the
/// major version and `m` is the minor version. The version can be ordered
/// lexicographically. JVM implementations can choose a range of compatible
/// versions by selecting a minimum major version `Mi`, maximum major version
/// `Mj`, and a maximum minor version `m`. With these, the JVM can support
/// versions on the range `Mi.0 <= v <= Mj.m` for some arbitrary `v`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ClassFile {
    pub version: Version,
    pub pool: ConstantPool,
    pub access: ClassAccess,

    /// Index of the `Class` constant naming this class, or 0 if absent.
    pub this_class: PoolIndex,
    /// 0 for `java/lang/Object` and for `module-info`.
    pub super_class: PoolIndex,

    /// Indices of `Class` constants, in declaration order.
    pub interfaces: Box<[PoolIndex]>,
    pub fields: Box<[Field]>,
    pub methods: Box<[Method]>,
    pub attributes: Box<[AttributeInfo]>,
}

impl ClassFile {
    pub fn parse<T: AsRef<[u8]>>(src: T) -> ClassResult<ClassFile> {
        parse_class(&mut ByteParser::new(src.as_ref()))
    }

    pub fn this_class_name(&self) -> Option<&str> {
        self.pool.class_name(self.this_class)
    }

    pub fn super_class_name(&self) -> Option<&str> {
        self.pool.class_name(self.super_class)
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.interfaces
            .iter()
            .filter_map(move |&index| self.pool.class_name(index))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }

    pub fn source_file(&self) -> Option<&str> {
        match self.attribute(SOURCE_FILE)? {
            Attribute::SourceFile(file) => Some(&file.value),
            _ => None,
        }
    }

    /// Finds a method by name and descriptor. Names alone are ambiguous
    /// because of overloading.
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

pub fn parse_version(input: &mut ByteParser<'_>) -> ClassResult<Version> {
    let minor = input.parse_u16()?;
    let major = input.parse_u16()?;
    Ok(Version { minor, major })
}

fn parse_magic(input: &mut ByteParser<'_>) -> ClassResult<()> {
    match input.parse_u32()? {
        CLASS_MAGIC => Ok(()),
        found => Err(ClassError::NotAClassFile { found }),
    }
}

/// Reads a `this_class` or `super_class` index, where 0 means "none".
fn parse_class_index(input: &mut ByteParser<'_>, pool: &ConstantPool) -> ClassResult<PoolIndex> {
    Ok(pool
        .read_optional_class(input)?
        .map(|(index, _)| index)
        .unwrap_or(0))
}

pub fn parse_class(input: &mut ByteParser<'_>) -> ClassResult<ClassFile> {
    input.peek(FIXED_HEADER_LEN)?;
    parse_magic(input)?;
    let version = parse_version(input)?;
    let pool = parse_constant_pool(input)?;
    debug!(
        "class file version {}, {} constant pool entries",
        version,
        pool.len()
    );

    let access = ClassAccess::from_bits_retain(input.parse_u16()?);
    let this_class = parse_class_index(input, &pool)?;
    let super_class = parse_class_index(input, &pool)?;
    let interfaces = input.counted(|input| pool.read_class(input).map(|(index, _)| index))?;

    let fields = input.counted(|input| parse_field(input, &pool))?;
    let methods = input.counted(|input| parse_method(input, &pool))?;
    let attributes = parse_attributes(input, &pool)?;
    debug!(
        "decoded {}: {} interfaces, {} fields, {} methods, {} attributes",
        pool.class_name(this_class).unwrap_or("<anonymous>"),
        interfaces.len(),
        fields.len(),
        methods.len(),
        attributes.len()
    );

    if !input.is_empty() {
        return Err(ClassError::TrailingBytes {
            offset: input.offset(),
            count: input.remaining(),
        });
    }

    Ok(ClassFile {
        version,
        pool,
        access,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}
