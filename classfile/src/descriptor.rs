//! Field and method descriptors (JVMS §4.3).
//!
//! ```txt
//! field_descriptor  := "["* <base_type>
//! base_type         := "B" | "C" | "D" | "F" | "I" | "J" | "S" | "Z"
//!                    | "L" <class_name> ";"
//! method_descriptor := "(" <field_descriptor>* ")" ( "V" | <field_descriptor> )
//! ```
//!
//! Descriptors are kept as plain strings on [`crate::field::Field`] and
//! [`crate::method::Method`]; these types are only built when asked for.

use crate::{parse::ByteParser, ClassError, ClassResult};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Object(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldDescriptor {
    pub dimensions: usize,
    pub ty: BaseType,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ReturnDescriptor {
    Void,
    Type(FieldDescriptor),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodDescriptor {
    pub args: Box<[FieldDescriptor]>,
    pub ret: ReturnDescriptor,
}

impl FieldDescriptor {
    pub fn parse(descriptor: &str) -> ClassResult<FieldDescriptor> {
        let bad = || ClassError::BadDescriptor {
            descriptor: descriptor.to_owned(),
        };
        let mut input = ByteParser::new(descriptor.as_bytes());
        let parsed = parse_field_descriptor(&mut input).map_err(|_| bad())?;
        if !input.is_empty() {
            return Err(bad());
        }
        Ok(parsed)
    }

    /// Whether a value of this type takes up two local variable slots.
    pub fn is_wide(&self) -> bool {
        self.dimensions == 0 && matches!(self.ty, BaseType::Long | BaseType::Double)
    }
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> ClassResult<MethodDescriptor> {
        let bad = || ClassError::BadDescriptor {
            descriptor: descriptor.to_owned(),
        };
        let mut input = ByteParser::new(descriptor.as_bytes());
        let parsed = parse_method_descriptor(&mut input).map_err(|_| bad())?;
        if !input.is_empty() {
            return Err(bad());
        }
        Ok(parsed)
    }

    /// The number of local variable slots taken by the arguments, not
    /// counting `this`.
    pub fn arg_slots(&self) -> usize {
        self.args
            .iter()
            .map(|arg| if arg.is_wide() { 2 } else { 1 })
            .sum()
    }
}

// The public entry points replace this with the full descriptor text.
fn unexpected() -> ClassError {
    ClassError::BadDescriptor {
        descriptor: String::new(),
    }
}

fn parse_field_descriptor(input: &mut ByteParser<'_>) -> ClassResult<FieldDescriptor> {
    let mut dimensions = 0;
    while input.peek(1)? == b"[" {
        input.take(1)?;
        dimensions += 1;
    }

    Ok(FieldDescriptor {
        dimensions,
        ty: parse_base_type(input)?,
    })
}

fn parse_base_type(input: &mut ByteParser<'_>) -> ClassResult<BaseType> {
    Ok(match input.parse_u8()? {
        b'B' => BaseType::Byte,
        b'C' => BaseType::Char,
        b'D' => BaseType::Double,
        b'F' => BaseType::Float,
        b'I' => BaseType::Int,
        b'J' => BaseType::Long,
        b'S' => BaseType::Short,
        b'Z' => BaseType::Boolean,
        b'L' => {
            let mut len = 0;
            while input.peek(len + 1)?[len] != b';' {
                len += 1;
            }
            let name = input.take(len)?;
            input.take(1)?;
            match std::str::from_utf8(name) {
                Ok(name) if !name.is_empty() => BaseType::Object(name.to_owned()),
                _ => return Err(unexpected()),
            }
        }
        _ => return Err(unexpected()),
    })
}

fn parse_method_descriptor(input: &mut ByteParser<'_>) -> ClassResult<MethodDescriptor> {
    if input.parse_u8()? != b'(' {
        return Err(unexpected());
    }

    let mut args = Vec::new();
    while input.peek(1)? != b")" {
        args.push(parse_field_descriptor(input)?);
    }
    input.take(1)?;

    let ret = if input.peek(1)? == b"V" {
        input.take(1)?;
        ReturnDescriptor::Void
    } else {
        ReturnDescriptor::Type(parse_field_descriptor(input)?)
    };

    Ok(MethodDescriptor {
        args: args.into(),
        ret,
    })
}

impl std::fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.ty {
            BaseType::Byte => write!(f, "byte")?,
            BaseType::Char => write!(f, "char")?,
            BaseType::Double => write!(f, "double")?,
            BaseType::Float => write!(f, "float")?,
            BaseType::Int => write!(f, "int")?,
            BaseType::Long => write!(f, "long")?,
            BaseType::Short => write!(f, "short")?,
            BaseType::Boolean => write!(f, "boolean")?,
            BaseType::Object(name) => write!(f, "{}", name.replace('/', "."))?,
        }

        for _ in 0..self.dimensions {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitive_array() {
        assert_eq!(
            FieldDescriptor::parse("[[I"),
            Ok(FieldDescriptor {
                dimensions: 2,
                ty: BaseType::Int,
            })
        );
    }

    #[test]
    fn object() {
        let descriptor = FieldDescriptor::parse("Ljava/lang/String;").unwrap();
        assert_eq!(descriptor.ty, BaseType::Object("java/lang/String".into()));
        assert_eq!(descriptor.to_string(), "java.lang.String");
    }

    #[test]
    fn trailing_garbage() {
        assert_eq!(
            FieldDescriptor::parse("II"),
            Err(ClassError::BadDescriptor {
                descriptor: "II".into()
            })
        );
        assert!(FieldDescriptor::parse("Ljava/lang/String").is_err());
        assert!(FieldDescriptor::parse("L;").is_err());
        assert!(FieldDescriptor::parse("").is_err());
    }

    #[test]
    fn method() {
        let descriptor = MethodDescriptor::parse("(IJ[Ljava/lang/Object;)V").unwrap();
        assert_eq!(descriptor.args.len(), 3);
        assert_eq!(descriptor.arg_slots(), 4);
        assert_eq!(descriptor.ret, ReturnDescriptor::Void);

        let descriptor = MethodDescriptor::parse("()[D").unwrap();
        assert!(descriptor.args.is_empty());
        assert_eq!(
            descriptor.ret,
            ReturnDescriptor::Type(FieldDescriptor {
                dimensions: 1,
                ty: BaseType::Double,
            })
        );
    }

    #[test]
    fn bad_method() {
        assert!(MethodDescriptor::parse("V").is_err());
        assert!(MethodDescriptor::parse("(V)V").is_err());
        assert!(MethodDescriptor::parse("()").is_err());
        assert!(MethodDescriptor::parse("()VV").is_err());
    }
}
