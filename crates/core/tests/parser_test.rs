use graver_core::model::object::{Name, PsObject};
use graver_core::model::vm::Vm;
use graver_core::parser;

fn parse(input: &[u8]) -> (Vec<PsObject>, Vm) {
    let mut vm = Vm::new();
    let objs = parser::parse_all(input, &mut vm).expect("tokenize");
    (objs, vm)
}

/// Canonical text for a token, suitable for re-tokenizing.
fn canonical(vm: &Vm, obj: &PsObject) -> String {
    match obj {
        PsObject::Integer(n) => n.to_string(),
        PsObject::Real(r) => {
            if r.fract() == 0.0 {
                format!("{r:.1}")
            } else {
                format!("{r}")
            }
        }
        PsObject::Name(n) if n.literal => format!("/{}", n.name),
        PsObject::Name(n) => n.name.to_string(),
        PsObject::String(r) => {
            let mut out = String::from("(");
            for &b in vm.string(*r).unwrap() {
                match b {
                    b'(' | b')' | b'\\' => {
                        out.push('\\');
                        out.push(b as char);
                    }
                    _ => out.push(b as char),
                }
            }
            out.push(')');
            out
        }
        PsObject::Array(r) => {
            let mut parts = Vec::new();
            for i in 0..r.len {
                let item = vm.array_get(*r, i).unwrap();
                parts.push(canonical(vm, &item));
            }
            format!("{{{}}}", parts.join(" "))
        }
        other => panic!("no canonical text for {other:?}"),
    }
}

/// Structural equality across two VMs.
fn same_token(vm_a: &Vm, a: &PsObject, vm_b: &Vm, b: &PsObject) -> bool {
    match (a, b) {
        (PsObject::Integer(x), PsObject::Integer(y)) => x == y,
        (PsObject::Real(x), PsObject::Real(y)) => x == y,
        (PsObject::Name(x), PsObject::Name(y)) => x == y,
        (PsObject::String(x), PsObject::String(y)) => {
            vm_a.string(*x).unwrap() == vm_b.string(*y).unwrap()
        }
        (PsObject::Array(x), PsObject::Array(y)) => {
            x.literal == y.literal
                && x.len == y.len
                && (0..x.len).all(|i| {
                    same_token(
                        vm_a,
                        &vm_a.array_get(*x, i).unwrap(),
                        vm_b,
                        &vm_b.array_get(*y, i).unwrap(),
                    )
                })
        }
        _ => false,
    }
}

#[test]
fn round_trip_reproduces_the_token_sequence() {
    let input: &[u8] = b"42 -7 3.5 .25 /lit name (a str) (nest(ed)) {1 2 add {3} /x} [ ] << >>";
    let (first, vm1) = parse(input);

    let text = first
        .iter()
        .map(|obj| canonical(&vm1, obj))
        .collect::<Vec<_>>()
        .join(" ");
    let (second, vm2) = parse(text.as_bytes());

    assert_eq!(first.len(), second.len(), "token count after round trip");
    for (a, b) in first.iter().zip(&second) {
        assert!(
            same_token(&vm1, a, &vm2, b),
            "round trip changed {a:?} into {b:?}"
        );
    }
}

#[test]
fn whitespace_and_comments_do_not_affect_the_sequence() {
    let (a, vm_a) = parse(b"1 2 add");
    let (b, vm_b) = parse(b"  1\t\n2 % trailing (comment) with ) brackets\n   add  ");
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert!(same_token(&vm_a, x, &vm_b, y));
    }
}

#[test]
fn escaped_quotes_keep_one_string_token() {
    let (objs, vm) = parse(br"(a\(b\)c)");
    assert_eq!(objs.len(), 1);
    let r = objs[0].as_string().unwrap();
    assert_eq!(vm.string(r).unwrap(), b"a(b)c");
}

#[test]
fn dict_brackets_never_merge_into_one_token() {
    let (objs, _) = parse(b"<< >> <<>>");
    assert_eq!(objs.len(), 4);
    for (i, expected) in ["<<", ">>", "<<", ">>"].iter().enumerate() {
        assert_eq!(objs[i], PsObject::Name(Name::executable(*expected)));
    }
}

#[test]
fn procedures_nest_and_carry_strings() {
    let (objs, vm) = parse(b"{ (a)(b) { 1 } }");
    assert_eq!(objs.len(), 1);
    let outer = objs[0].as_array().unwrap();
    assert_eq!(outer.len, 3);
    let items = vm.array(outer).unwrap().to_vec();
    assert!(matches!(items[0], PsObject::String(_)));
    assert!(matches!(items[1], PsObject::String(_)));
    let inner = items[2].as_array().unwrap();
    assert!(!inner.literal);
    assert_eq!(inner.len, 1);
}

#[test]
fn string_escapes_decode() {
    let (objs, vm) = parse(b"(tab\\there) (oct\\101al) (line\\\ncontinue)");
    let first = vm.string(objs[0].as_string().unwrap()).unwrap();
    assert_eq!(first, b"tab\there");
    let second = vm.string(objs[1].as_string().unwrap()).unwrap();
    assert_eq!(second, b"octAal");
    let third = vm.string(objs[2].as_string().unwrap()).unwrap();
    assert_eq!(third, b"linecontinue");
}

#[test]
fn number_classification_precedence() {
    let (objs, _) = parse(b"5 5.0 5x");
    assert_eq!(objs[0], PsObject::Integer(5));
    assert_eq!(objs[1], PsObject::Real(5.0));
    // Not a number: falls through to a name.
    assert_eq!(objs[2], PsObject::Name(Name::executable("5x")));
}
