//! Access flag bitsets for classes, fields, methods, and inner classes.
//!
//! Several bits are shared between kinds with different meanings (`0x0040`
//! is `volatile` on a field but `bridge` on a method), so each kind gets its
//! own type. Unknown bits are kept as-is, since newer class file versions
//! keep assigning them.

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct ClassAccess: u16 {
        /// Declared public; may be accessed from outside its package.
        const PUBLIC = ACC_PUBLIC;
        /// Declared final; no subclasses allowed.
        const FINAL = ACC_FINAL;
        /// Treat superclass methods specially when invoked by the
        /// invokespecial instruction.
        const SUPER = ACC_SUPER;
        /// Is an interface, not a class.
        const INTERFACE = ACC_INTERFACE;
        /// Declared abstract; must not be instantiated.
        const ABSTRACT = ACC_ABSTRACT;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = ACC_SYNTHETIC;
        /// Declared as an annotation interface.
        const ANNOTATION = ACC_ANNOTATION;
        /// Declared as an enum class.
        const ENUM = ACC_ENUM;
        /// Is a module, not a class or interface.
        const MODULE = ACC_MODULE;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct FieldAccess: u16 {
        const PUBLIC = ACC_PUBLIC;
        const PRIVATE = ACC_PRIVATE;
        const PROTECTED = ACC_PROTECTED;
        const STATIC = ACC_STATIC;
        /// Never directly assigned to after object construction.
        const FINAL = ACC_FINAL;
        /// Cannot be cached.
        const VOLATILE = ACC_VOLATILE;
        /// Not written or read by a persistent object manager.
        const TRANSIENT = ACC_TRANSIENT;
        const SYNTHETIC = ACC_SYNTHETIC;
        /// Declared as an element of an enum class.
        const ENUM = ACC_ENUM;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct MethodAccess: u16 {
        const PUBLIC = ACC_PUBLIC;
        const PRIVATE = ACC_PRIVATE;
        const PROTECTED = ACC_PROTECTED;
        const STATIC = ACC_STATIC;
        /// Must not be overridden.
        const FINAL = ACC_FINAL;
        /// Invocation is wrapped by a monitor use.
        const SYNCHRONIZED = ACC_SYNCHRONIZED;
        /// A bridge method, generated by the compiler.
        const BRIDGE = ACC_BRIDGE;
        /// Declared with variable number of arguments.
        const VARARGS = ACC_VARARGS;
        /// Implemented in a language other than Java.
        const NATIVE = ACC_NATIVE;
        /// No implementation is provided.
        const ABSTRACT = ACC_ABSTRACT;
        /// Floating-point mode is FP-strict.
        const STRICT = ACC_STRICT;
        const SYNTHETIC = ACC_SYNTHETIC;
    }
}

bitflags! {
    /// Flags of an entry in the `InnerClasses` attribute. These are the flags
    /// the class was declared with in source, which can differ from the flags
    /// in the inner class's own class file.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct InnerClassAccess: u16 {
        const PUBLIC = ACC_PUBLIC;
        const PRIVATE = ACC_PRIVATE;
        const PROTECTED = ACC_PROTECTED;
        const STATIC = ACC_STATIC;
        const FINAL = ACC_FINAL;
        const INTERFACE = ACC_INTERFACE;
        const ABSTRACT = ACC_ABSTRACT;
        const SYNTHETIC = ACC_SYNTHETIC;
        const ANNOTATION = ACC_ANNOTATION;
        const ENUM = ACC_ENUM;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Visibility {
    Public,
    Protected,
    PackagePrivate,
    Private,
}

impl Visibility {
    /// Derives the visibility from a raw flag word. If more than one
    /// visibility bit is set, the most permissive one wins.
    pub fn from_bits(flags: u16) -> Self {
        if flags & ACC_PUBLIC != 0 {
            Visibility::Public
        } else if flags & ACC_PROTECTED != 0 {
            Visibility::Protected
        } else if flags & ACC_PRIVATE != 0 {
            Visibility::Private
        } else {
            Visibility::PackagePrivate
        }
    }
}

macro_rules! impl_visibility {
    ($($ty:ty),*) => {$(
        impl $ty {
            pub fn visibility(self) -> Visibility {
                Visibility::from_bits(self.bits())
            }
        }
    )*};
}

impl_visibility!(ClassAccess, FieldAccess, MethodAccess, InnerClassAccess);

impl ClassAccess {
    pub fn is_interface(self) -> bool {
        self.contains(ClassAccess::INTERFACE)
    }
}

impl std::fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let keywords = [
            (FieldAccess::PUBLIC, "public"),
            (FieldAccess::PROTECTED, "protected"),
            (FieldAccess::PRIVATE, "private"),
            (FieldAccess::STATIC, "static"),
            (FieldAccess::FINAL, "final"),
            (FieldAccess::TRANSIENT, "transient"),
            (FieldAccess::VOLATILE, "volatile"),
        ];
        write_keywords(f, keywords.iter().filter(|(flag, _)| self.contains(*flag)))
    }
}

impl std::fmt::Display for MethodAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let keywords = [
            (MethodAccess::PUBLIC, "public"),
            (MethodAccess::PROTECTED, "protected"),
            (MethodAccess::PRIVATE, "private"),
            (MethodAccess::ABSTRACT, "abstract"),
            (MethodAccess::STATIC, "static"),
            (MethodAccess::FINAL, "final"),
            (MethodAccess::SYNCHRONIZED, "synchronized"),
            (MethodAccess::NATIVE, "native"),
            (MethodAccess::STRICT, "strictfp"),
        ];
        write_keywords(f, keywords.iter().filter(|(flag, _)| self.contains(*flag)))
    }
}

fn write_keywords<'a, T: 'a>(
    f: &mut std::fmt::Formatter,
    keywords: impl Iterator<Item = &'a (T, &'static str)>,
) -> std::fmt::Result {
    for (i, (_, keyword)) in keywords.enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", keyword)?;
    }
    Ok(())
}

/// Marked or implicitly public in source.
pub const ACC_PUBLIC: u16 = 0x0001;
/// Marked private in source.
pub const ACC_PRIVATE: u16 = 0x0002;
/// Marked protected in source.
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;
pub const ACC_MODULE: u16 = 0x8000;
