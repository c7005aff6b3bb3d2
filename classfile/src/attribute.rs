//! # Attribute Formats
//!
//! ## General Form
//! The general form of an attribute is listed below. It is comprised of an
//! index into the constant pool, representing the name of the attribute,
//! followed by the byte length of the *rest* of the attribute, not including
//! the first six bytes, followed by attribute-specific information, whose
//! length is decided by the attribute type.
//!
//! ```txt
//! AttributeInfo {
//!     name_index: u16,
//!     length: u32,
//!     info: [u8; length],
//! }
//! ```
//!
//! The payload of a recognized attribute is decoded according to its own
//! internal counts, and the number of bytes that took must agree with
//! `length`. Attributes with names we don't recognize are kept as raw bytes;
//! the format is extensible, so this is not an error.
//!
//! ```txt
//! Attribute::Code {
//!     max_stack: u16,
//!     max_locals: u16,
//!     code_length: u32,
//!     code: [u8; code_length],
//!     exception_table_length: u16,
//!     exception_table: [ExceptionHandler; exception_table_length],
//!     attributes_count: u16,
//!     attributes: [AttributeInfo; attributes_count],
//! }
//!
//! // The handler is active between pc values of [start_pc, end_pc)
//! ExceptionHandler {
//!     start_pc: u16,
//!     end_pc: u16,
//!     handler_pc: u16,
//!     catch_type: u16, // 0 catches everything
//! }
//! ```

use crate::{
    access::InnerClassAccess,
    annotation::{
        parse_annotations, parse_element_value, parse_parameter_annotations, Annotation,
        ElementValue,
    },
    constant::{Constant, ConstantKind, ConstantPool, MethodHandleKind, PoolIndex},
    frame::{parse_stack_map_table, StackMapFrame},
    parse::ByteParser,
    ClassError, ClassResult, MAX_NESTING,
};
use log::trace;

pub const CONSTANT_VALUE: &str = "ConstantValue";
pub const CODE: &str = "Code";
pub const STACK_MAP_TABLE: &str = "StackMapTable";
pub const EXCEPTIONS: &str = "Exceptions";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
pub const SYNTHETIC: &str = "Synthetic";
pub const SIGNATURE: &str = "Signature";
pub const SOURCE_FILE: &str = "SourceFile";
pub const SOURCE_DEBUG_EXTENSION: &str = "SourceDebugExtension";
pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
pub const DEPRECATED: &str = "Deprecated";
pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";

/// A resolved reference to a `Class` constant.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ClassRef {
    pub index: PoolIndex,
    /// Binary name, like `java/lang/Object`.
    pub name: String,
}

/// A resolved reference to a `Utf8` constant.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Utf8Ref {
    pub index: PoolIndex,
    pub value: String,
}

impl From<(PoolIndex, String)> for ClassRef {
    fn from((index, name): (PoolIndex, String)) -> Self {
        ClassRef { index, name }
    }
}

impl From<(PoolIndex, String)> for Utf8Ref {
    fn from((index, value): (PoolIndex, String)) -> Self {
        Utf8Ref { index, value }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` for handlers that catch everything, as used by `finally`.
    pub catch_type: Option<ClassRef>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Code {
    /// The maximum amount of items on the operand stack
    pub max_stack: u16,
    /// The maximum amount of local variables, including method paramaters. The
    /// greatest local variable index is `max_locals - 1` for all types except
    /// `long` or `double`.
    pub max_locals: u16,
    /// The raw bytecode. It is not decoded any further.
    pub code: Box<[u8]>,
    pub exception_table: Box<[ExceptionHandler]>,
    /// Usually `LineNumberTable`, `LocalVariableTable`,
    /// `LocalVariableTypeTable`, and `StackMapTable`.
    pub attributes: Box<[AttributeInfo]>,
}

impl Code {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }

    pub fn stack_map(&self) -> Option<&[StackMapFrame]> {
        match self.attribute(STACK_MAP_TABLE)? {
            Attribute::StackMapTable(frames) => Some(frames),
            _ => None,
        }
    }

    /// The source line that the instruction at `pc` was compiled from, if
    /// line numbers were recorded.
    pub fn line_number(&self, pc: u16) -> Option<u16> {
        self.attributes
            .iter()
            .filter_map(|info| match &info.attr {
                Attribute::LineNumberTable(lines) => Some(lines.iter()),
                _ => None,
            })
            .flatten()
            .filter(|line| line.start_pc <= pc)
            .max_by_key(|line| line.start_pc)
            .map(|line| line.line_number)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct InnerClass {
    pub inner_class: ClassRef,
    /// Absent for local and anonymous classes.
    pub outer_class: Option<ClassRef>,
    /// Absent for anonymous classes.
    pub inner_name: Option<Utf8Ref>,
    pub access: InnerClassAccess,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EnclosingMethod {
    pub class: ClassRef,
    pub method: Option<MethodRef>,
}

/// A resolved `NameAndType`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodRef {
    pub index: PoolIndex,
    pub name: String,
    pub descriptor: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LocalVariable {
    /// The variable has a value in the bytecode range
    /// `[start_pc, start_pc + length)`.
    pub start_pc: u16,
    pub length: u16,
    pub name: Utf8Ref,
    /// A field descriptor in a `LocalVariableTable`, a field signature in a
    /// `LocalVariableTypeTable`.
    pub ty: Utf8Ref,
    /// The local variable slot. `long` and `double` also occupy `index + 1`.
    pub index: u16,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BootstrapMethod {
    /// Index of a `MethodHandle` constant.
    pub method_ref: PoolIndex,
    pub kind: MethodHandleKind,
    /// Each index points at a loadable constant.
    pub arguments: Box<[PoolIndex]>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Attribute {
    /// An attribute whose name we don't recognize. It holds exactly the
    /// declared number of bytes.
    Unknown(Box<[u8]>),

    /// The value of a constant field, one of Integer, Float, Long, Double or
    /// String.
    ConstantValue { index: PoolIndex, value: Constant },

    Code(Code),

    /// Type states at branch targets, for the bytecode verifier.
    StackMapTable(Box<[StackMapFrame]>),

    /// The checked exceptions a method declares.
    Exceptions(Box<[ClassRef]>),

    InnerClasses(Box<[InnerClass]>),

    /// Present on local and anonymous classes.
    EnclosingMethod(EnclosingMethod),

    Synthetic,

    /// A generic class, method, or field signature.
    Signature(Utf8Ref),

    SourceFile(Utf8Ref),

    /// Extended debugging data; usually SMAP text, but kept as raw bytes.
    SourceDebugExtension(Box<[u8]>),

    LineNumberTable(Box<[LineNumber]>),

    /// Type-erased local variable table.
    LocalVariableTable(Box<[LocalVariable]>),
    /// Generic local variable table, for variables whose type uses type
    /// variables or parameterized types.
    LocalVariableTypeTable(Box<[LocalVariable]>),

    Deprecated,

    RuntimeVisibleAnnotations(Box<[Annotation]>),
    RuntimeInvisibleAnnotations(Box<[Annotation]>),
    /// One list of annotations per formal parameter.
    RuntimeVisibleParameterAnnotations(Box<[Box<[Annotation]>]>),
    RuntimeInvisibleParameterAnnotations(Box<[Box<[Annotation]>]>),

    /// The default value of an annotation interface element.
    AnnotationDefault(ElementValue),

    BootstrapMethods(Box<[BootstrapMethod]>),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AttributeInfo {
    pub name_index: PoolIndex,
    pub name: String,
    /// The declared payload length.
    pub length: u32,
    pub attr: Attribute,
}

pub fn find_attribute<'a>(attributes: &'a [AttributeInfo], name: &str) -> Option<&'a Attribute> {
    attributes
        .iter()
        .find(|info| info.name == name)
        .map(|info| &info.attr)
}

pub fn parse_exception_handler(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<ExceptionHandler> {
    Ok(ExceptionHandler {
        start_pc: input.parse_u16()?,
        end_pc: input.parse_u16()?,
        handler_pc: input.parse_u16()?,
        catch_type: pool.read_optional_class(input)?.map(ClassRef::from),
    })
}

pub fn parse_code(input: &mut ByteParser<'_>, pool: &ConstantPool) -> ClassResult<Code> {
    code(input, pool, 0)
}

/// `depth` counts the `Code` attributes this one is nested in.
fn code(input: &mut ByteParser<'_>, pool: &ConstantPool, depth: usize) -> ClassResult<Code> {
    if depth >= MAX_NESTING {
        return Err(ClassError::NestingTooDeep {
            offset: input.offset(),
            limit: MAX_NESTING,
        });
    }

    let max_stack = input.parse_u16()?;
    let max_locals = input.parse_u16()?;
    let code_length = input.parse_u32()? as usize;
    let code = input.take(code_length)?.into();
    let exception_table = input.counted(|input| parse_exception_handler(input, pool))?;
    let attributes = attributes(input, pool, depth + 1)?;

    Ok(Code {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    })
}

fn parse_constant_value(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<Attribute> {
    use ConstantKind::*;

    let offset = input.offset();
    let index = input.parse_u16()?;
    let value = pool.resolve_kind(
        index,
        offset,
        "Integer, Float, Long, Double or String",
        &[Integer, Float, Long, Double, String],
    )?;
    Ok(Attribute::ConstantValue {
        index,
        value: value.clone(),
    })
}

fn parse_inner_class(input: &mut ByteParser<'_>, pool: &ConstantPool) -> ClassResult<InnerClass> {
    let inner_class = pool.read_class(input)?.into();
    let outer_class = pool.read_optional_class(input)?.map(ClassRef::from);

    let offset = input.offset();
    let inner_name = match input.parse_u16()? {
        0 => None,
        index => Some(Utf8Ref {
            index,
            value: pool.resolve_utf8(index, offset)?.to_owned(),
        }),
    };

    Ok(InnerClass {
        inner_class,
        outer_class,
        inner_name,
        access: InnerClassAccess::from_bits_retain(input.parse_u16()?),
    })
}

fn parse_enclosing_method(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<EnclosingMethod> {
    let class = pool.read_class(input)?.into();

    let offset = input.offset();
    let method = match input.parse_u16()? {
        0 => None,
        index => {
            let name_and_type = pool.resolve_name_and_type(index, offset)?;
            Some(MethodRef {
                index,
                name: name_and_type.name.to_owned(),
                descriptor: name_and_type.descriptor.to_owned(),
            })
        }
    };

    Ok(EnclosingMethod { class, method })
}

fn parse_line_number(input: &mut ByteParser<'_>) -> ClassResult<LineNumber> {
    Ok(LineNumber {
        start_pc: input.parse_u16()?,
        line_number: input.parse_u16()?,
    })
}

fn parse_local_variable(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<LocalVariable> {
    Ok(LocalVariable {
        start_pc: input.parse_u16()?,
        length: input.parse_u16()?,
        name: pool.read_utf8(input)?.into(),
        ty: pool.read_utf8(input)?.into(),
        index: input.parse_u16()?,
    })
}

fn parse_bootstrap_method(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<BootstrapMethod> {
    use ConstantKind::*;

    let offset = input.offset();
    let method_ref = input.parse_u16()?;
    let kind = match pool.resolve(method_ref, offset)? {
        Constant::MethodHandle { kind, .. } => *kind,
        other => {
            return Err(ClassError::UnexpectedConstantKind {
                index: method_ref,
                offset,
                expected: "MethodHandle",
                found: other.kind(),
            })
        }
    };

    let arguments = input.counted(|input| {
        let offset = input.offset();
        let index = input.parse_u16()?;
        pool.resolve_kind(
            index,
            offset,
            "a loadable constant",
            &[
                Integer,
                Float,
                Long,
                Double,
                Class,
                String,
                MethodHandle,
                MethodType,
                Dynamic,
            ],
        )?;
        Ok(index)
    })?;

    Ok(BootstrapMethod {
        method_ref,
        kind,
        arguments,
    })
}

fn parse_payload(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
    name: &str,
    len: usize,
    depth: usize,
) -> ClassResult<Attribute> {
    Ok(match name {
        CONSTANT_VALUE => parse_constant_value(input, pool)?,
        CODE => Attribute::Code(code(input, pool, depth)?),
        STACK_MAP_TABLE => Attribute::StackMapTable(parse_stack_map_table(input, pool)?),
        EXCEPTIONS => Attribute::Exceptions(
            input.counted(|input| pool.read_class(input).map(ClassRef::from))?,
        ),
        INNER_CLASSES => {
            Attribute::InnerClasses(input.counted(|input| parse_inner_class(input, pool))?)
        }
        ENCLOSING_METHOD => Attribute::EnclosingMethod(parse_enclosing_method(input, pool)?),
        SYNTHETIC => Attribute::Synthetic,
        SIGNATURE => Attribute::Signature(pool.read_utf8(input)?.into()),
        SOURCE_FILE => Attribute::SourceFile(pool.read_utf8(input)?.into()),
        SOURCE_DEBUG_EXTENSION => Attribute::SourceDebugExtension(input.take(len)?.into()),
        LINE_NUMBER_TABLE => Attribute::LineNumberTable(input.counted(parse_line_number)?),
        LOCAL_VARIABLE_TABLE => Attribute::LocalVariableTable(
            input.counted(|input| parse_local_variable(input, pool))?,
        ),
        LOCAL_VARIABLE_TYPE_TABLE => Attribute::LocalVariableTypeTable(
            input.counted(|input| parse_local_variable(input, pool))?,
        ),
        DEPRECATED => Attribute::Deprecated,

        RUNTIME_VISIBLE_ANNOTATIONS => {
            Attribute::RuntimeVisibleAnnotations(parse_annotations(input, pool)?)
        }
        RUNTIME_INVISIBLE_ANNOTATIONS => {
            Attribute::RuntimeInvisibleAnnotations(parse_annotations(input, pool)?)
        }
        RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS => {
            Attribute::RuntimeVisibleParameterAnnotations(parse_parameter_annotations(input, pool)?)
        }
        RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => Attribute::RuntimeInvisibleParameterAnnotations(
            parse_parameter_annotations(input, pool)?,
        ),
        ANNOTATION_DEFAULT => Attribute::AnnotationDefault(parse_element_value(input, pool)?),
        BOOTSTRAP_METHODS => Attribute::BootstrapMethods(
            input.counted(|input| parse_bootstrap_method(input, pool))?,
        ),

        _ => {
            trace!("unrecognized attribute `{}`, keeping {} raw bytes", name, len);
            Attribute::Unknown(input.take(len)?.into())
        }
    })
}

pub fn parse_attribute(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<AttributeInfo> {
    attribute(input, pool, 0)
}

fn attribute(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> ClassResult<AttributeInfo> {
    let (name_index, name) = pool.read_utf8(input)?;
    let length = input.parse_u32()?;
    let start = input.offset();

    // The whole payload has to be there before any of it is interpreted, and
    // decoding it can't read past it.
    let mut payload = input.split(length as usize)?;
    trace!("attribute `{}` ({} bytes) at offset {}", name, length, start);

    let mismatch = |name: String, consumed: usize| ClassError::AttributeLengthMismatch {
        name,
        declared: length,
        consumed,
        offset: start,
    };

    let attr = match parse_payload(&mut payload, pool, &name, length as usize, depth) {
        Ok(attr) => attr,
        // The payload wanted more bytes than it was declared to have.
        Err(ClassError::TruncatedInput { offset, needed, .. }) => {
            return Err(mismatch(name, offset + needed - start))
        }
        Err(err) => return Err(err),
    };

    if !payload.is_empty() {
        return Err(mismatch(name, payload.offset() - start));
    }

    Ok(AttributeInfo {
        name_index,
        name,
        length,
        attr,
    })
}

/// A `u16` count followed by that many attributes.
pub fn parse_attributes(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
) -> ClassResult<Box<[AttributeInfo]>> {
    attributes(input, pool, 0)
}

fn attributes(
    input: &mut ByteParser<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> ClassResult<Box<[AttributeInfo]>> {
    input.counted(|input| attribute(input, pool, depth))
}
