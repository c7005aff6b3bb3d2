//! Read-only decoder for the JVM class file format.
//!
//! [`ClassFile::parse`] turns the bytes of a single `.class` file into a fully
//! resolved object model. Every index into the constant pool is checked while
//! decoding, so a successfully parsed [`ClassFile`] never contains a dangling
//! or mistyped pool reference.
//!
//! ```
//! # use classfile::{ClassError, ClassFile};
//! let err = ClassFile::parse([0u8; 10]).unwrap_err();
//! assert!(matches!(err, ClassError::NotAClassFile { found: 0 }));
//! ```

pub mod access;
pub mod annotation;
pub mod attribute;
pub mod class;
pub mod constant;
pub mod descriptor;
pub mod field;
pub mod frame;
pub mod method;
mod mutf8;
pub mod parse;

pub use crate::{
    class::{ClassFile, Version},
    constant::{Constant, ConstantKind, ConstantPool, PoolIndex},
    mutf8::*,
    parse::ByteParser,
};

pub type ClassResult<T> = Result<T, ClassError>;

/// How deeply annotations may nest inside each other, and `Code` attributes
/// inside `Code` attributes.
pub const MAX_NESTING: usize = 64;

#[derive(Clone, Debug, Eq, PartialEq, Hash, thiserror::Error)]
pub enum ClassError {
    #[error("unexpected end of input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("not a class file: expected magic 0xcafebabe, found {found:#010x}")]
    NotAClassFile { found: u32 },

    #[error("malformed constant pool entry #{index}: {fault}")]
    MalformedConstantPool { index: PoolIndex, fault: PoolFault },

    #[error("constant pool index #{index} referenced at offset {offset} does not exist")]
    UnresolvedConstantReference { index: PoolIndex, offset: usize },

    #[error("constant pool index #{index} referenced at offset {offset} is {found}, expected {expected}")]
    UnexpectedConstantKind {
        index: PoolIndex,
        offset: usize,
        expected: &'static str,
        found: ConstantKind,
    },

    #[error("invalid byte {byte:#04x} in modified UTF-8 string at offset {offset}")]
    InvalidModifiedUtf8 { offset: usize, byte: u8 },

    #[error("unsupported stack map frame type {tag} at offset {offset}")]
    UnsupportedFrameEncoding { tag: u8, offset: usize },

    #[error("unsupported verification type {tag} at offset {offset}")]
    UnsupportedVerificationType { tag: u8, offset: usize },

    #[error("unknown annotation element value tag {tag:#04x} at offset {offset}")]
    UnknownElementValueTag { tag: u8, offset: usize },

    #[error("attribute `{name}` at offset {offset} declared {declared} bytes but its payload used {consumed}")]
    AttributeLengthMismatch {
        name: String,
        declared: u32,
        consumed: usize,
        offset: usize,
    },

    #[error("structures nested more than {limit} levels deep at offset {offset}")]
    NestingTooDeep { offset: usize, limit: usize },

    #[error("{count} unexpected bytes after the end of the class file at offset {offset}")]
    TrailingBytes { offset: usize, count: usize },

    #[error("malformed descriptor `{descriptor}`")]
    BadDescriptor { descriptor: String },
}

/// The reason a constant pool is structurally broken, as opposed to merely
/// being referenced incorrectly.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, thiserror::Error)]
pub enum PoolFault {
    #[error("unknown constant tag {tag} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("unknown method handle reference kind {kind}")]
    UnknownReferenceKind { kind: u8 },
    #[error("reserved upper half of a long or double, referenced at offset {offset}")]
    ReservedSlot { offset: usize },
    #[error("constant_pool_count must be at least 1")]
    EmptyCount,
    #[error("long or double constant occupies the last slot of the pool")]
    WideConstantOverflow,
}
