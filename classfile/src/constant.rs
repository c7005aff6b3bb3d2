//! # Constant Pool
//! Entries in the constant pool start at 1, and indices into the pool are
//! likewise 1-based. Each entry is comprised of a 1-byte tag, followed by a
//! variable length of bytes decided by the type of constant.
//!
//! ### Oddities
//! Utf8 constants aren't actually UTF-8, but a slightly modified UTF-8 as
//! described in §4.4.7
//!
//! Long and Double entries take up two slots in the constant pool, but the
//! upper entry is never directly referenced. Referencing it anyway is a
//! malformed pool, not a missing entry.
//!
//! ```txt
//! Constant::Utf8         // tag = 1  { length: u16, data: [u8; length] }
//! Constant::Integer      // tag = 3  { data: i32 }
//! Constant::Float        // tag = 4  { data: f32 }
//! Constant::Long         // tag = 5  { data: i64 }
//! Constant::Double       // tag = 6  { data: f64 }
//! Constant::Class        // tag = 7  { name: u16 }
//! Constant::String       // tag = 8  { string: u16 }
//! Constant::FieldRef     // tag = 9  { class: u16, name_and_type: u16 }
//! Constant::MethodRef    // tag = 10 { class: u16, name_and_type: u16 }
//! Constant::InterfaceMethodRef // tag = 11 { class: u16, name_and_type: u16 }
//! Constant::NameAndType  // tag = 12 { name: u16, descriptor: u16 }
//! Constant::MethodHandle // tag = 15 { kind: u8, reference: u16 }
//! Constant::MethodType   // tag = 16 { descriptor: u16 }
//! Constant::Dynamic      // tag = 17 { bootstrap_method_attr: u16, name_and_type: u16 }
//! Constant::InvokeDynamic // tag = 18 { bootstrap_method_attr: u16, name_and_type: u16 }
//! ```

use crate::{mutf8, parse::ByteParser, ClassError, ClassResult, PoolFault};
use log::trace;

pub type PoolIndex = u16;

pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELD_REF: u8 = 9;
pub const CONSTANT_METHOD_REF: u8 = 10;
pub const CONSTANT_INTERFACE_METHOD_REF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;

// Symbolic references by an instruction sequence to fields or methods are
// indicated by C.x:T, where x and T are the name and descriptor (§4.3.2,
// §4.3.3) of the field or method, and C is the class or interface in which the
// field or method is to be found.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MethodHandleKind {
    /// getfield C.f:T
    GetField = 1,
    /// getstatic C.f:T
    GetStatic = 2,
    /// putfield C.f:T
    PutField = 3,
    /// putstatic C.f:T
    PutStatic = 4,
    /// invokevirtual C.m:(A*)T
    InvokeVirtual = 5,
    /// invokestatic C.m:(A*)T
    InvokeStatic = 6,
    /// invokespecial C.m:(A*)T
    InvokeSpecial = 7,
    /// new C; dup; invokespecial C.<init>:(A*)void
    NewInvokeSpecial = 8,
    /// invokeinterface C.m:(A*)T
    InvokeInterface = 9,
}

impl MethodHandleKind {
    pub fn from_u8(kind: u8) -> Option<MethodHandleKind> {
        Some(match kind {
            1 => MethodHandleKind::GetField,
            2 => MethodHandleKind::GetStatic,
            3 => MethodHandleKind::PutField,
            4 => MethodHandleKind::PutStatic,
            5 => MethodHandleKind::InvokeVirtual,
            6 => MethodHandleKind::InvokeStatic,
            7 => MethodHandleKind::InvokeSpecial,
            8 => MethodHandleKind::NewInvokeSpecial,
            9 => MethodHandleKind::InvokeInterface,
            _ => return None,
        })
    }

    /// The kinds of constant this handle is allowed to point at. Kinds 6 and 7
    /// may point at interface methods since Java 8.
    fn accepts(self, kind: ConstantKind) -> bool {
        use ConstantKind::*;
        match self {
            MethodHandleKind::GetField
            | MethodHandleKind::GetStatic
            | MethodHandleKind::PutField
            | MethodHandleKind::PutStatic => kind == FieldRef,
            MethodHandleKind::InvokeVirtual | MethodHandleKind::NewInvokeSpecial => {
                kind == MethodRef
            }
            MethodHandleKind::InvokeStatic | MethodHandleKind::InvokeSpecial => {
                kind == MethodRef || kind == InterfaceMethodRef
            }
            MethodHandleKind::InvokeInterface => kind == InterfaceMethodRef,
        }
    }
}

/// An `f32` compared by bit pattern, so that NaN constants still compare equal
/// to themselves.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FloatBits(pub u32);

impl FloatBits {
    pub fn get(self) -> f32 {
        f32::from_bits(self.0)
    }
}

/// An `f64` compared by bit pattern.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DoubleBits(pub u64);

impl DoubleBits {
    pub fn get(self) -> f64 {
        f64::from_bits(self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(FloatBits),
    Long(i64),
    Double(DoubleBits),
    Class {
        name: PoolIndex,
    },
    String {
        string: PoolIndex,
    },
    FieldRef {
        class: PoolIndex,
        name_and_type: PoolIndex,
    },
    MethodRef {
        class: PoolIndex,
        name_and_type: PoolIndex,
    },
    InterfaceMethodRef {
        class: PoolIndex,
        name_and_type: PoolIndex,
    },
    NameAndType {
        name: PoolIndex,
        descriptor: PoolIndex,
    },
    MethodHandle {
        kind: MethodHandleKind,
        reference: PoolIndex,
    },
    MethodType {
        descriptor: PoolIndex,
    },
    Dynamic {
        /// 0-based index into the `BootstrapMethods` attribute, not the pool.
        bootstrap_method_attr: u16,
        name_and_type: PoolIndex,
    },
    InvokeDynamic {
        /// 0-based index into the `BootstrapMethods` attribute, not the pool.
        bootstrap_method_attr: u16,
        name_and_type: PoolIndex,
    },
}

/// The variant of a [`Constant`], without its payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ConstantKind {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    Class,
    String,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    NameAndType,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
}

impl std::fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ConstantKind::Utf8 => "Utf8",
            ConstantKind::Integer => "Integer",
            ConstantKind::Float => "Float",
            ConstantKind::Long => "Long",
            ConstantKind::Double => "Double",
            ConstantKind::Class => "Class",
            ConstantKind::String => "String",
            ConstantKind::FieldRef => "Fieldref",
            ConstantKind::MethodRef => "Methodref",
            ConstantKind::InterfaceMethodRef => "InterfaceMethodref",
            ConstantKind::NameAndType => "NameAndType",
            ConstantKind::MethodHandle => "MethodHandle",
            ConstantKind::MethodType => "MethodType",
            ConstantKind::Dynamic => "Dynamic",
            ConstantKind::InvokeDynamic => "InvokeDynamic",
        };
        write!(f, "{}", name)
    }
}

impl Constant {
    pub fn kind(&self) -> ConstantKind {
        match self {
            Constant::Utf8(_) => ConstantKind::Utf8,
            Constant::Integer(_) => ConstantKind::Integer,
            Constant::Float(_) => ConstantKind::Float,
            Constant::Long(_) => ConstantKind::Long,
            Constant::Double(_) => ConstantKind::Double,
            Constant::Class { .. } => ConstantKind::Class,
            Constant::String { .. } => ConstantKind::String,
            Constant::FieldRef { .. } => ConstantKind::FieldRef,
            Constant::MethodRef { .. } => ConstantKind::MethodRef,
            Constant::InterfaceMethodRef { .. } => ConstantKind::InterfaceMethodRef,
            Constant::NameAndType { .. } => ConstantKind::NameAndType,
            Constant::MethodHandle { .. } => ConstantKind::MethodHandle,
            Constant::MethodType { .. } => ConstantKind::MethodType,
            Constant::Dynamic { .. } => ConstantKind::Dynamic,
            Constant::InvokeDynamic { .. } => ConstantKind::InvokeDynamic,
        }
    }

    /// Whether this constant takes up two slots in the pool.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    pub fn as_utf8(&self) -> Option<&str> {
        match self {
            Constant::Utf8(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
enum Slot {
    /// Index 0, and the upper half of every long and double.
    Padding,
    Entry(Constant),
}

/// The resolved form of a `NameAndType` constant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NameAndType<'pool> {
    pub name: &'pool str,
    pub descriptor: &'pool str,
}

/// The constant pool of a single class file.
///
/// Lookups come in two flavors: the `resolve_*` methods take the byte offset
/// the index was read from and produce a [`ClassError`] describing the bad
/// reference, while the plain accessors just return `None` and are meant for
/// use on an already validated [`crate::ClassFile`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConstantPool {
    slots: Box<[Slot]>,
}

impl ConstantPool {
    /// One greater than the highest valid index, as stored in the class file.
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// The number of actual entries, not counting padding.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex, &Constant)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Entry(constant) => Some((index as PoolIndex, constant)),
                Slot::Padding => None,
            })
    }

    pub fn get(&self, index: PoolIndex) -> Option<&Constant> {
        match self.slots.get(index as usize) {
            Some(Slot::Entry(constant)) => Some(constant),
            _ => None,
        }
    }

    pub fn utf8(&self, index: PoolIndex) -> Option<&str> {
        self.get(index).and_then(Constant::as_utf8)
    }

    /// The binary name of the `Class` constant at `index`.
    pub fn class_name(&self, index: PoolIndex) -> Option<&str> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8(*name),
            _ => None,
        }
    }

    pub fn name_and_type(&self, index: PoolIndex) -> Option<NameAndType<'_>> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => Some(NameAndType {
                name: self.utf8(*name)?,
                descriptor: self.utf8(*descriptor)?,
            }),
            _ => None,
        }
    }

    /// Looks up `index`, which was read at byte `offset` of the class file.
    pub fn resolve(&self, index: PoolIndex, offset: usize) -> ClassResult<&Constant> {
        match self.slots.get(index as usize) {
            Some(Slot::Entry(constant)) => Ok(constant),
            // Index 0 is padding too, but it is never a valid reference at all.
            Some(Slot::Padding) if index != 0 => Err(ClassError::MalformedConstantPool {
                index,
                fault: PoolFault::ReservedSlot { offset },
            }),
            _ => Err(ClassError::UnresolvedConstantReference { index, offset }),
        }
    }

    /// Resolves `index` and checks that it is one of `kinds`.
    pub fn resolve_kind(
        &self,
        index: PoolIndex,
        offset: usize,
        expected: &'static str,
        kinds: &[ConstantKind],
    ) -> ClassResult<&Constant> {
        let constant = self.resolve(index, offset)?;
        if kinds.contains(&constant.kind()) {
            Ok(constant)
        } else {
            Err(ClassError::UnexpectedConstantKind {
                index,
                offset,
                expected,
                found: constant.kind(),
            })
        }
    }

    pub fn resolve_utf8(&self, index: PoolIndex, offset: usize) -> ClassResult<&str> {
        match self.resolve(index, offset)? {
            Constant::Utf8(data) => Ok(data),
            other => Err(ClassError::UnexpectedConstantKind {
                index,
                offset,
                expected: "Utf8",
                found: other.kind(),
            }),
        }
    }

    /// Resolves a `Class` constant to its binary name.
    pub fn resolve_class(&self, index: PoolIndex, offset: usize) -> ClassResult<&str> {
        match self.resolve(index, offset)? {
            Constant::Class { name } => self.resolve_utf8(*name, offset),
            other => Err(ClassError::UnexpectedConstantKind {
                index,
                offset,
                expected: "Class",
                found: other.kind(),
            }),
        }
    }

    pub fn resolve_name_and_type(
        &self,
        index: PoolIndex,
        offset: usize,
    ) -> ClassResult<NameAndType<'_>> {
        match self.resolve(index, offset)? {
            Constant::NameAndType { name, descriptor } => Ok(NameAndType {
                name: self.resolve_utf8(*name, offset)?,
                descriptor: self.resolve_utf8(*descriptor, offset)?,
            }),
            other => Err(ClassError::UnexpectedConstantKind {
                index,
                offset,
                expected: "NameAndType",
                found: other.kind(),
            }),
        }
    }

    /// Reads a `u16` index and resolves it as a `Utf8` constant.
    pub(crate) fn read_utf8(&self, input: &mut ByteParser<'_>) -> ClassResult<(PoolIndex, String)> {
        let offset = input.offset();
        let index = input.parse_u16()?;
        Ok((index, self.resolve_utf8(index, offset)?.to_owned()))
    }

    /// Reads a `u16` index and resolves it as a `Class` constant, returning the
    /// class name.
    pub(crate) fn read_class(&self, input: &mut ByteParser<'_>) -> ClassResult<(PoolIndex, String)> {
        let offset = input.offset();
        let index = input.parse_u16()?;
        Ok((index, self.resolve_class(index, offset)?.to_owned()))
    }

    /// Like [`Self::read_class`], but an index of 0 means "absent".
    pub(crate) fn read_optional_class(
        &self,
        input: &mut ByteParser<'_>,
    ) -> ClassResult<Option<(PoolIndex, String)>> {
        let offset = input.offset();
        match input.parse_u16()? {
            0 => Ok(None),
            index => Ok(Some((index, self.resolve_class(index, offset)?.to_owned()))),
        }
    }

    /// Checks every reference between pool entries, now that all of them are
    /// known. `offsets` holds the byte offset each entry was read from.
    fn validate(&self, offsets: &[usize]) -> ClassResult<()> {
        use ConstantKind::*;

        for (index, constant) in self.iter() {
            let offset = offsets[index as usize];
            match *constant {
                Constant::Class { name } => {
                    self.resolve_utf8(name, offset)?;
                }
                Constant::String { string } => {
                    self.resolve_utf8(string, offset)?;
                }
                Constant::FieldRef {
                    class,
                    name_and_type,
                }
                | Constant::MethodRef {
                    class,
                    name_and_type,
                }
                | Constant::InterfaceMethodRef {
                    class,
                    name_and_type,
                } => {
                    self.resolve_class(class, offset)?;
                    self.resolve_name_and_type(name_and_type, offset)?;
                }
                Constant::NameAndType { .. } => {
                    self.resolve_name_and_type(index, offset)?;
                }
                Constant::MethodHandle { kind, reference } => {
                    let target = self.resolve_kind(
                        reference,
                        offset,
                        "Fieldref, Methodref or InterfaceMethodref",
                        &[FieldRef, MethodRef, InterfaceMethodRef],
                    )?;
                    if !kind.accepts(target.kind()) {
                        return Err(ClassError::UnexpectedConstantKind {
                            index: reference,
                            offset,
                            expected: "a member reference matching the handle kind",
                            found: target.kind(),
                        });
                    }
                }
                Constant::MethodType { descriptor } => {
                    self.resolve_utf8(descriptor, offset)?;
                }
                Constant::Dynamic { name_and_type, .. }
                | Constant::InvokeDynamic { name_and_type, .. } => {
                    self.resolve_name_and_type(name_and_type, offset)?;
                }
                Constant::Utf8(_)
                | Constant::Integer(_)
                | Constant::Float(_)
                | Constant::Long(_)
                | Constant::Double(_) => {}
            }
        }

        Ok(())
    }
}

pub fn parse_constant(input: &mut ByteParser<'_>, index: PoolIndex) -> ClassResult<Constant> {
    let offset = input.offset();
    Ok(match input.parse_u8()? {
        CONSTANT_UTF8 => {
            let len = input.parse_u16()? as usize;
            let start = input.offset();
            Constant::Utf8(mutf8::decode_at(input.take(len)?, start)?.into_owned())
        }
        CONSTANT_INTEGER => Constant::Integer(input.parse_i32()?),
        CONSTANT_FLOAT => Constant::Float(FloatBits(input.parse_u32()?)),
        CONSTANT_LONG => Constant::Long(input.parse_i64()?),
        CONSTANT_DOUBLE => Constant::Double(DoubleBits(input.parse_u64()?)),

        CONSTANT_CLASS => Constant::Class {
            name: input.parse_u16()?,
        },
        CONSTANT_STRING => Constant::String {
            string: input.parse_u16()?,
        },

        CONSTANT_FIELD_REF => Constant::FieldRef {
            class: input.parse_u16()?,
            name_and_type: input.parse_u16()?,
        },
        CONSTANT_METHOD_REF => Constant::MethodRef {
            class: input.parse_u16()?,
            name_and_type: input.parse_u16()?,
        },
        CONSTANT_INTERFACE_METHOD_REF => Constant::InterfaceMethodRef {
            class: input.parse_u16()?,
            name_and_type: input.parse_u16()?,
        },
        CONSTANT_NAME_AND_TYPE => Constant::NameAndType {
            name: input.parse_u16()?,
            descriptor: input.parse_u16()?,
        },

        CONSTANT_METHOD_HANDLE => {
            let raw_kind = input.parse_u8()?;
            let kind = MethodHandleKind::from_u8(raw_kind).ok_or(
                ClassError::MalformedConstantPool {
                    index,
                    fault: PoolFault::UnknownReferenceKind { kind: raw_kind },
                },
            )?;
            Constant::MethodHandle {
                kind,
                reference: input.parse_u16()?,
            }
        }
        CONSTANT_METHOD_TYPE => Constant::MethodType {
            descriptor: input.parse_u16()?,
        },
        CONSTANT_DYNAMIC => Constant::Dynamic {
            bootstrap_method_attr: input.parse_u16()?,
            name_and_type: input.parse_u16()?,
        },
        CONSTANT_INVOKE_DYNAMIC => Constant::InvokeDynamic {
            bootstrap_method_attr: input.parse_u16()?,
            name_and_type: input.parse_u16()?,
        },

        tag => {
            return Err(ClassError::MalformedConstantPool {
                index,
                fault: PoolFault::UnknownTag { tag, offset },
            })
        }
    })
}

/// Reads `constant_pool_count` followed by the pool itself, then validates
/// every reference between pool entries.
pub fn parse_constant_pool(input: &mut ByteParser<'_>) -> ClassResult<ConstantPool> {
    let count = match input.parse_u16()? {
        0 => {
            return Err(ClassError::MalformedConstantPool {
                index: 0,
                fault: PoolFault::EmptyCount,
            })
        }
        count => count as usize,
    };

    let mut slots = Vec::with_capacity(count);
    let mut offsets = Vec::with_capacity(count);

    // First slot is unused. Everything uses 1-based indices into the pool.
    slots.push(Slot::Padding);
    offsets.push(input.offset());

    while slots.len() < count {
        let index = slots.len() as PoolIndex;
        offsets.push(input.offset());
        let constant = parse_constant(input, index)?;
        trace!("constant #{}: {:?}", index, constant);

        let is_wide = constant.is_wide();
        slots.push(Slot::Entry(constant));
        if is_wide {
            if slots.len() >= count {
                return Err(ClassError::MalformedConstantPool {
                    index,
                    fault: PoolFault::WideConstantOverflow,
                });
            }
            slots.push(Slot::Padding);
            offsets.push(input.offset());
        }
    }

    let pool = ConstantPool {
        slots: slots.into(),
    };
    pool.validate(&offsets)?;
    Ok(pool)
}
