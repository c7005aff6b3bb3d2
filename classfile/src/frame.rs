//! The `StackMapTable` attribute.
//!
//! A frame's shape is chosen by the numeric range its type byte falls in, and
//! for some shapes the byte itself doubles as a payload value.
//!
//! ```txt
//! StackMapFrame {
//!     frame_type: u8,
//!     frame: match frame_type {
//!         0..=63 => Same {}                     // offset_delta = frame_type
//!         64..=127 => SameLocals1StackItem {    // offset_delta = frame_type - 64
//!             stack: VerificationType
//!         }
//!         247 => SameLocals1StackItemExtended {
//!             offset_delta: u16
//!             stack: VerificationType
//!         }
//!         248..=250 => Chop {                   // 251 - frame_type locals removed
//!             offset_delta: u16
//!         }
//!         251 => SameFrameExtended {
//!             offset_delta: u16
//!         }
//!         252..=254 => Append {
//!             offset_delta: u16
//!             locals: [VerificationType; frame_type - 251]
//!         }
//!         255 => Full {
//!             offset_delta: u16
//!             locals_count: u16
//!             locals: [VerificationType; locals_count]
//!             stack_count: u16
//!             stack: [VerificationType; stack_count]
//!         }
//!     },
//! }
//!
//! VerificationType {
//!     tag: u8,
//!     data: match tag {
//!         0 => Top,
//!         1 => Integer,
//!         2 => Float,
//!         3 => Double,
//!         4 => Long,
//!         5 => Null,
//!         6 => Object { index: u16 },
//!         7 => Uninitialized { offset: u16 },
//!     }
//! }
//! ```

use crate::{
    constant::{ConstantPool, PoolIndex},
    parse::ByteParser,
    ClassError, ClassResult,
};

pub const ITEM_TOP: u8 = 0;
pub const ITEM_INTEGER: u8 = 1;
pub const ITEM_FLOAT: u8 = 2;
pub const ITEM_DOUBLE: u8 = 3;
pub const ITEM_LONG: u8 = 4;
pub const ITEM_NULL: u8 = 5;
pub const ITEM_OBJECT: u8 = 6;
pub const ITEM_UNINITIALIZED: u8 = 7;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    /// Index of a `Class` constant.
    Object(PoolIndex),
    /// Bytecode offset of the `new` instruction that created the object.
    Uninitialized(u16),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum StackMapFrame {
    Same {
        offset_delta: u8,
    },
    SameLocals1StackItem {
        offset_delta: u8,
        stack: VerificationType,
    },
    SameLocals1StackItemExtended {
        offset_delta: u16,
        stack: VerificationType,
    },
    Chop {
        /// How many of the last locals are absent, 1 to 3.
        absent_locals: u8,
        offset_delta: u16,
    },
    SameExtended {
        offset_delta: u16,
    },
    Append {
        offset_delta: u16,
        locals: Box<[VerificationType]>,
    },
    Full {
        offset_delta: u16,
        locals: Box<[VerificationType]>,
        stack: Box<[VerificationType]>,
    },
}

impl StackMapFrame {
    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. } => *offset_delta as u16,
            StackMapFrame::SameLocals1StackItemExtended { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::SameExtended { offset_delta }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }
}

pub fn parse_verification_type(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<VerificationType> {
    let offset = input.offset();
    Ok(match input.parse_u8()? {
        ITEM_TOP => VerificationType::Top,
        ITEM_INTEGER => VerificationType::Integer,
        ITEM_FLOAT => VerificationType::Float,
        ITEM_DOUBLE => VerificationType::Double,
        ITEM_LONG => VerificationType::Long,
        ITEM_NULL => VerificationType::Null,
        ITEM_OBJECT => {
            let (index, _) = pool.read_class(input)?;
            VerificationType::Object(index)
        }
        ITEM_UNINITIALIZED => VerificationType::Uninitialized(input.parse_u16()?),
        tag => return Err(ClassError::UnsupportedVerificationType { tag, offset }),
    })
}

pub fn parse_stack_map_frame(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<StackMapFrame> {
    let offset = input.offset();
    let frame_type = input.parse_u8()?;
    let mut verification_type = |input: &mut ByteParser<'_>| parse_verification_type(input, pool);

    Ok(match frame_type {
        0..=63 => StackMapFrame::Same {
            offset_delta: frame_type,
        },
        64..=127 => StackMapFrame::SameLocals1StackItem {
            offset_delta: frame_type - 64,
            stack: verification_type(input)?,
        },
        247 => {
            let offset_delta = input.parse_u16()?;
            let stack = verification_type(input)?;
            StackMapFrame::SameLocals1StackItemExtended {
                offset_delta,
                stack,
            }
        }
        248..=250 => StackMapFrame::Chop {
            absent_locals: 251 - frame_type,
            offset_delta: input.parse_u16()?,
        },
        251 => StackMapFrame::SameExtended {
            offset_delta: input.parse_u16()?,
        },
        252..=254 => {
            let offset_delta = input.parse_u16()?;
            let locals = input.seq(frame_type as usize - 251, &mut verification_type)?;
            StackMapFrame::Append {
                offset_delta,
                locals,
            }
        }
        255 => {
            let offset_delta = input.parse_u16()?;
            let locals = input.counted(&mut verification_type)?;
            let stack = input.counted(&mut verification_type)?;
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            }
        }
        tag => return Err(ClassError::UnsupportedFrameEncoding { tag, offset }),
    })
}

pub fn parse_stack_map_table(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<Box<[StackMapFrame]>> {
    input.counted(|input| parse_stack_map_frame(input, pool))
}
