use classfile::{
    access::{ClassAccess, FieldAccess, InnerClassAccess},
    annotation::ElementValue,
    attribute::{Attribute, ClassRef},
    constant::MethodHandleKind,
    frame::{StackMapFrame, VerificationType},
    ClassError, ClassFile, Constant, PoolFault, Version, MAX_NESTING,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
    fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    fn u16(mut self, value: u16) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    /// A named attribute with its length filled in.
    fn attr(self, name: u16, payload: Bytes) -> Self {
        self.u16(name).u32(payload.0.len() as u32).bytes(&payload.0)
    }
}

/// Builds a constant pool, handing out indices as entries are added.
struct Pool {
    bytes: Bytes,
    next: u16,
}

impl Pool {
    fn new() -> Self {
        Pool {
            bytes: Bytes::default(),
            next: 1,
        }
    }

    fn push(&mut self, entry: Bytes, slots: u16) -> u16 {
        let index = self.next;
        self.bytes.0.extend_from_slice(&entry.0);
        self.next += slots;
        index
    }

    fn raw_utf8(&mut self, bytes: &[u8]) -> u16 {
        let entry = Bytes::default().u8(1).u16(bytes.len() as u16).bytes(bytes);
        self.push(entry, 1)
    }

    fn utf8(&mut self, text: &str) -> u16 {
        self.raw_utf8(text.as_bytes())
    }

    fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.push(Bytes::default().u8(7).u16(name), 1)
    }

    fn integer(&mut self, value: i32) -> u16 {
        self.push(Bytes::default().u8(3).u32(value as u32), 1)
    }

    fn long(&mut self, value: i64) -> u16 {
        let bits = value as u64;
        let entry = Bytes::default()
            .u8(5)
            .u32((bits >> 32) as u32)
            .u32(bits as u32);
        self.push(entry, 2)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.push(Bytes::default().u8(12).u16(name).u16(descriptor), 1)
    }

    fn method_ref(&mut self, class: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type = self.name_and_type(name, descriptor);
        self.push(Bytes::default().u8(10).u16(class).u16(name_and_type), 1)
    }

    fn method_handle(&mut self, kind: u8, reference: u16) -> u16 {
        self.push(Bytes::default().u8(15).u8(kind).u16(reference), 1)
    }

    fn invoke_dynamic(&mut self, tag: u8, bootstrap: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type = self.name_and_type(name, descriptor);
        self.push(Bytes::default().u8(tag).u16(bootstrap).u16(name_and_type), 1)
    }

    /// Header, version 52.0 and this pool, followed by `rest`.
    fn class_file(&self, rest: Bytes) -> Vec<u8> {
        Bytes::default()
            .u32(0xcafebabe)
            .u16(0)
            .u16(52)
            .u16(self.next)
            .bytes(&self.bytes.0)
            .bytes(&rest.0)
            .0
    }
}

/// access flags, this, super, and no interfaces, fields or methods.
fn plain_header(this: u16, sup: u16) -> Bytes {
    Bytes::default().u16(0x0021).u16(this).u16(sup).u16(0).u16(0).u16(0)
}

fn parse(pool: &Pool, rest: Bytes) -> Result<ClassFile, ClassError> {
    ClassFile::parse(pool.class_file(rest))
}

#[test]
fn zeroed_buffer_is_not_a_class_file() {
    assert_eq!(
        ClassFile::parse([0u8; 10]),
        Err(ClassError::NotAClassFile { found: 0 })
    );
}

#[test]
fn minimal_class() {
    let pool = Pool::new();
    let class = parse(&pool, plain_header(0, 0).u16(0)).unwrap();

    assert_eq!(class.version, Version { major: 52, minor: 0 });
    assert!(class.pool.is_empty());
    assert!(class.interfaces.is_empty());
    assert!(class.fields.is_empty());
    assert!(class.methods.is_empty());
    assert!(class.attributes.is_empty());
}

#[test]
fn long_takes_two_slots() {
    let mut pool = Pool::new();
    assert_eq!(pool.long(-1), 1);
    assert_eq!(pool.utf8("after"), 3);
    let class = parse(&pool, plain_header(0, 0).u16(0)).unwrap();

    assert_eq!(class.pool.get(1), Some(&Constant::Long(-1)));
    assert_eq!(class.pool.get(2), None);
    assert_eq!(class.pool.utf8(3), Some("after"));
    assert_eq!(class.pool.count(), 4);
    assert_eq!(class.pool.len(), 2);
    assert_eq!(
        class.pool.iter().map(|(index, _)| index).collect::<Vec<_>>(),
        vec![1, 3]
    );
}

#[test]
fn reference_into_long_gap() {
    let mut pool = Pool::new();
    pool.long(7);
    let err = parse(&pool, plain_header(2, 0).u16(0)).unwrap_err();
    assert_eq!(
        err,
        ClassError::MalformedConstantPool {
            index: 2,
            fault: PoolFault::ReservedSlot { offset: 21 },
        }
    );
}

#[test]
fn this_class_must_be_a_class() {
    let mut pool = Pool::new();
    let name = pool.utf8("Foo");
    let err = parse(&pool, plain_header(name, 0).u16(0)).unwrap_err();
    assert!(matches!(
        err,
        ClassError::UnexpectedConstantKind {
            index: 1,
            expected: "Class",
            ..
        }
    ));
}

#[test]
fn modified_utf8_null() {
    let mut pool = Pool::new();
    let index = pool.raw_utf8(&[b'a', 0xc0, 0x80, b'b']);
    let class = parse(&pool, plain_header(0, 0).u16(0)).unwrap();
    assert_eq!(class.pool.utf8(index), Some("a\0b"));
}

#[test]
fn invalid_modified_utf8() {
    let mut pool = Pool::new();
    pool.raw_utf8(&[b'a', 0x00]);
    assert!(matches!(
        parse(&pool, plain_header(0, 0).u16(0)),
        Err(ClassError::InvalidModifiedUtf8 { offset: 14, .. })
    ));
}

#[test]
fn annotation_without_pairs() {
    let mut pool = Pool::new();
    let name = pool.utf8("RuntimeVisibleAnnotations");
    let ty = pool.utf8("Ljava/lang/FunctionalInterface;");
    let payload = Bytes::default().u16(1).u16(ty).u16(0);
    let class = parse(&pool, plain_header(0, 0).u16(1).attr(name, payload)).unwrap();

    match &class.attributes[0].attr {
        Attribute::RuntimeVisibleAnnotations(annotations) => {
            assert_eq!(annotations.len(), 1);
            assert_eq!(annotations[0].type_descriptor, "Ljava/lang/FunctionalInterface;");
            assert!(annotations[0].pairs.is_empty());
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn attribute_length_disagrees_with_payload() {
    let mut pool = Pool::new();
    let name = pool.utf8("SourceFile");
    let file = pool.utf8("A.java");
    let payload = Bytes::default().u16(file).u16(0);
    let err = parse(&pool, plain_header(0, 0).u16(1).attr(name, payload)).unwrap_err();
    assert!(matches!(
        err,
        ClassError::AttributeLengthMismatch {
            declared: 4,
            consumed: 2,
            ..
        }
    ));
}

#[test]
fn short_declared_length_at_end_of_file() {
    let mut pool = Pool::new();
    let name = pool.utf8("SourceFile");
    let payload = Bytes::default().u8(0);
    let err = parse(&pool, plain_header(0, 0).u16(1).attr(name, payload)).unwrap_err();
    assert!(matches!(
        err,
        ClassError::AttributeLengthMismatch {
            declared: 1,
            consumed: 2,
            ..
        }
    ));
}

#[test]
fn deeply_nested_annotation_default() {
    let mut pool = Pool::new();
    let name = pool.utf8("AnnotationDefault");
    let mut payload = Bytes::default();
    for _ in 0..500_000 {
        payload = payload.u8(b'[').u16(1);
    }
    payload = payload.u8(b'[').u16(0);

    let err = parse(&pool, plain_header(0, 0).u16(1).attr(name, payload)).unwrap_err();
    assert!(matches!(
        err,
        ClassError::NestingTooDeep { limit, .. } if limit == MAX_NESTING
    ));
}

#[test]
fn unpaired_surrogate_in_string_constant() {
    let mut pool = Pool::new();
    // "\uD800" as javac writes it.
    let index = pool.raw_utf8(&[0xed, 0xa0, 0x80]);
    let class = parse(&pool, plain_header(0, 0).u16(0)).unwrap();
    assert_eq!(class.pool.utf8(index), Some("\u{fffd}"));
}

#[test]
fn unknown_attribute_is_kept() {
    let mut pool = Pool::new();
    let name = pool.utf8("org.example.Vendor");
    let payload = Bytes::default().bytes(&[1, 2, 3, 4, 5]);
    let class = parse(&pool, plain_header(0, 0).u16(1).attr(name, payload)).unwrap();
    assert_eq!(class.attributes[0].length, 5);
    assert_eq!(
        class.attributes[0].attr,
        Attribute::Unknown(vec![1, 2, 3, 4, 5].into())
    );
}

#[test]
fn misspelled_parameter_annotations() {
    let mut pool = Pool::new();
    let name = pool.utf8("RuntimeVisibleParamterAnnotations");
    let payload = Bytes::default().u8(1).u16(0);
    let class = parse(&pool, plain_header(0, 0).u16(1).attr(name, payload)).unwrap();
    assert_eq!(
        class.attributes[0].attr,
        Attribute::Unknown(vec![1, 0, 0].into())
    );
}

#[test]
fn inner_classes() {
    let mut pool = Pool::new();
    let this = pool.class("Outer");
    let inner = pool.class("Outer$Inner");
    let anon = pool.class("Outer$1");
    let inner_name = pool.utf8("Inner");
    let attr_name = pool.utf8("InnerClasses");

    let payload = Bytes::default()
        .u16(2)
        .u16(inner)
        .u16(this)
        .u16(inner_name)
        .u16(0x0009)
        .u16(anon)
        .u16(0)
        .u16(0)
        .u16(0x0010);
    let class = parse(&pool, plain_header(this, 0).u16(1).attr(attr_name, payload)).unwrap();

    let entries = match &class.attributes[0].attr {
        Attribute::InnerClasses(entries) => entries,
        other => panic!("{:?}", other),
    };
    assert_eq!(entries[0].inner_class.name, "Outer$Inner");
    assert_eq!(
        entries[0].outer_class,
        Some(ClassRef {
            index: this,
            name: "Outer".into(),
        })
    );
    assert_eq!(
        entries[0].inner_name.as_ref().map(|name| name.value.as_str()),
        Some("Inner")
    );
    assert_eq!(
        entries[0].access,
        InnerClassAccess::PUBLIC | InnerClassAccess::STATIC
    );
    assert_eq!(entries[1].outer_class, None);
    assert_eq!(entries[1].inner_name, None);
}

#[test]
fn trailing_garbage() {
    let pool = Pool::new();
    let err = parse(&pool, plain_header(0, 0).u16(0).u8(0)).unwrap_err();
    assert_eq!(err, ClassError::TrailingBytes { offset: 24, count: 1 });
}

fn greeter() -> Vec<u8> {
    let mut pool = Pool::new();
    let this = pool.class("com/example/Greeter");
    let sup = pool.class("java/lang/Object");
    let runnable = pool.class("java/lang/Runnable");

    let count = pool.utf8("COUNT");
    let long_descriptor = pool.utf8("J");
    let constant_value = pool.utf8("ConstantValue");
    let forty_two = pool.long(42);

    let run = pool.utf8("run");
    let void_descriptor = pool.utf8("()V");
    let code = pool.utf8("Code");
    let line_numbers = pool.utf8("LineNumberTable");
    let stack_map = pool.utf8("StackMapTable");
    let deprecated = pool.utf8("Deprecated");
    let source_file = pool.utf8("SourceFile");
    let file_name = pool.utf8("Greeter.java");

    let code_payload = Bytes::default()
        .u16(2)
        .u16(1)
        .u32(4)
        .bytes(&[0x2a, 0x99, 0x00, 0xb1])
        .u16(0)
        .u16(2)
        .attr(line_numbers, Bytes::default().u16(2).u16(0).u16(10).u16(3).u16(11))
        .attr(
            stack_map,
            Bytes::default()
                .u16(2)
                .u8(3)
                .u8(255)
                .u16(0)
                .u16(1)
                .u8(6)
                .u16(this)
                .u16(0),
        );

    let body = Bytes::default()
        .u16(0x0031)
        .u16(this)
        .u16(sup)
        .u16(1)
        .u16(runnable)
        // fields
        .u16(1)
        .u16(0x0019)
        .u16(count)
        .u16(long_descriptor)
        .u16(1)
        .attr(constant_value, Bytes::default().u16(forty_two))
        // methods
        .u16(1)
        .u16(0x0001)
        .u16(run)
        .u16(void_descriptor)
        .u16(2)
        .attr(code, code_payload)
        .attr(deprecated, Bytes::default())
        // attributes
        .u16(1)
        .attr(source_file, Bytes::default().u16(file_name));

    pool.class_file(body)
}

#[test]
fn complete_class() {
    let class = ClassFile::parse(greeter()).unwrap();

    assert!(class.access.contains(ClassAccess::FINAL));
    assert!(!class.access.is_interface());
    assert_eq!(class.this_class_name(), Some("com/example/Greeter"));
    assert_eq!(class.super_class_name(), Some("java/lang/Object"));
    assert_eq!(
        class.interface_names().collect::<Vec<_>>(),
        vec!["java/lang/Runnable"]
    );
    assert_eq!(class.source_file(), Some("Greeter.java"));

    let field = class.find_field("COUNT").unwrap();
    assert!(field.access.contains(FieldAccess::STATIC));
    assert_eq!(field.constant_value(), Some(&Constant::Long(42)));
    assert!(field.parsed_descriptor().unwrap().is_wide());
    assert!(class.find_field("count").is_none());

    let method = class.find_method("run", "()V").unwrap();
    assert!(class.find_method("run", "(I)V").is_none());
    assert_eq!(method.attribute("Deprecated"), Some(&Attribute::Deprecated));

    let code = method.code().unwrap();
    assert_eq!(code.max_stack, 2);
    assert_eq!(code.max_locals, 1);
    assert_eq!(&*code.code, &[0x2a, 0x99, 0x00, 0xb1]);
    assert_eq!(code.line_number(0), Some(10));
    assert_eq!(code.line_number(3), Some(11));
    assert_eq!(
        code.stack_map().unwrap(),
        &[
            StackMapFrame::Same { offset_delta: 3 },
            StackMapFrame::Full {
                offset_delta: 0,
                locals: vec![VerificationType::Object(class.this_class)].into(),
                stack: Vec::new().into(),
            },
        ]
    );
}

#[test]
fn decoding_is_deterministic() {
    let bytes = greeter();
    assert_eq!(ClassFile::parse(&bytes), ClassFile::parse(&bytes));
}

#[test]
fn every_prefix_is_truncated() {
    let bytes = greeter();
    for len in 0..bytes.len() {
        match ClassFile::parse(&bytes[..len]) {
            Err(ClassError::TruncatedInput { .. }) => {}
            other => panic!("prefix of {} bytes: {:?}", len, other),
        }
    }
}

#[test]
fn invokedynamic_and_bootstrap_methods() {
    let mut pool = Pool::new();
    let factory = pool.class("java/lang/invoke/LambdaMetafactory");
    let target = pool.method_ref(factory, "metafactory", "()Ljava/lang/invoke/CallSite;");
    let handle = pool.method_handle(6, target);
    let seven = pool.integer(7);
    let indy = pool.invoke_dynamic(18, 0, "get", "()Ljava/util/function/Supplier;");
    let condy = pool.invoke_dynamic(17, 0, "answer", "I");
    let attr_name = pool.utf8("BootstrapMethods");

    let payload = Bytes::default().u16(1).u16(handle).u16(1).u16(seven);
    let class = parse(&pool, plain_header(0, 0).u16(1).attr(attr_name, payload)).unwrap();

    assert!(matches!(
        class.pool.get(indy),
        Some(Constant::InvokeDynamic {
            bootstrap_method_attr: 0,
            ..
        })
    ));
    assert!(matches!(class.pool.get(condy), Some(Constant::Dynamic { .. })));

    match &class.attributes[0].attr {
        Attribute::BootstrapMethods(methods) => {
            assert_eq!(methods[0].method_ref, handle);
            assert_eq!(methods[0].kind, MethodHandleKind::InvokeStatic);
            assert_eq!(&*methods[0].arguments, &[seven]);
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn bootstrap_method_must_be_a_handle() {
    let mut pool = Pool::new();
    let seven = pool.integer(7);
    let attr_name = pool.utf8("BootstrapMethods");
    let payload = Bytes::default().u16(1).u16(seven).u16(0);
    assert!(matches!(
        parse(&pool, plain_header(0, 0).u16(1).attr(attr_name, payload)),
        Err(ClassError::UnexpectedConstantKind {
            expected: "MethodHandle",
            ..
        })
    ));
}

#[test]
fn annotation_default_enum() {
    let mut pool = Pool::new();
    let attr_name = pool.utf8("AnnotationDefault");
    let ty = pool.utf8("Ljava/lang/annotation/RetentionPolicy;");
    let value = pool.utf8("RUNTIME");
    let payload = Bytes::default().u8(b'e').u16(ty).u16(value);
    let class = parse(&pool, plain_header(0, 0).u16(1).attr(attr_name, payload)).unwrap();
    assert_eq!(
        class.attributes[0].attr,
        Attribute::AnnotationDefault(ElementValue::Enum {
            type_name_index: ty,
            type_name: "Ljava/lang/annotation/RetentionPolicy;".into(),
            const_name_index: value,
            const_name: "RUNTIME".into(),
        })
    );
}
