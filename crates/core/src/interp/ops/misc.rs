//! Printing operators and recognized-but-unsupported features.
//!
//! Handles: `=`, `==`, plus the stubs for features the core recognizes but
//! does not implement (image, imagemask, shfill, makepattern, setpattern,
//! resourceforall). The stubs raise unregistered, never silently no-op,
//! which keeps them distinguishable from a plain undefined name.

use crate::error::{PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::PsObject;
use crate::model::vm::Vm;
use rustc_hash::FxHashSet;
use std::io::Write;

macro_rules! unregistered_ops {
    ($($fn_name:ident => $op_name:literal),* $(,)?) => {
        impl Interpreter {
            $(
                pub(crate) fn $fn_name(&mut self) -> Result<()> {
                    Err(PsError::Unregistered($op_name.into()).into())
                }
            )*
        }

        fn register_unregistered(registry: &mut Registry) {
            $(registry.insert($op_name, Interpreter::$fn_name);)*
        }
    };
}

unregistered_ops! {
    op_image => "image",
    op_imagemask => "imagemask",
    op_shfill => "shfill",
    op_makepattern => "makepattern",
    op_setpattern => "setpattern",
    op_resourceforall => "resourceforall",
}

pub(super) fn register(registry: &mut Registry) {
    registry.insert("=", Interpreter::op_print);
    registry.insert("==", Interpreter::op_print_repr);
    register_unregistered(registry);
}

impl Interpreter {
    /// `=`: pops and prints the object's plain text form.
    pub(crate) fn op_print(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        let text = text_form(&self.vm, &obj)?;
        writeln!(self.writer_mut(), "{text}").map_err(|_| PsError::Io)?;
        Ok(())
    }

    /// `==`: pops and prints the object's syntactic form.
    pub(crate) fn op_print_repr(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        let mut visited = FxHashSet::default();
        let text = repr_form(&self.vm, &obj, &mut visited)?;
        writeln!(self.writer_mut(), "{text}").map_err(|_| PsError::Io)?;
        Ok(())
    }
}

fn format_real(r: f64) -> String {
    if r.is_finite() && r.fract() == 0.0 && r.abs() < 1e15 {
        format!("{r:.1}")
    } else {
        format!("{r}")
    }
}

/// Plain text form, as the `=` operator prints it.
fn text_form(vm: &Vm, obj: &PsObject) -> Result<String> {
    let text = match obj {
        PsObject::Integer(n) => n.to_string(),
        PsObject::Real(r) => format_real(*r),
        PsObject::Boolean(b) => b.to_string(),
        PsObject::Name(n) => n.name.to_string(),
        PsObject::String(r) => String::from_utf8_lossy(vm.string(*r)?).into_owned(),
        _ => "--nostringval--".to_string(),
    };
    Ok(text)
}

/// Syntactic form, as the `==` operator prints it. The visited set keeps
/// cyclic arrays from recursing forever.
fn repr_form(vm: &Vm, obj: &PsObject, visited: &mut FxHashSet<usize>) -> Result<String> {
    let text = match obj {
        PsObject::Integer(n) => n.to_string(),
        PsObject::Real(r) => format_real(*r),
        PsObject::Boolean(b) => b.to_string(),
        PsObject::Null => "null".to_string(),
        PsObject::Mark => "-mark-".to_string(),
        PsObject::Name(n) if n.literal => format!("/{}", n.name),
        PsObject::Name(n) => n.name.to_string(),
        PsObject::Operator(op) => format!("--{}--", op.name),
        PsObject::String(r) => {
            let mut out = String::from("(");
            for &b in vm.string(*r)? {
                match b {
                    b'(' | b')' | b'\\' => {
                        out.push('\\');
                        out.push(b as char);
                    }
                    0x20..=0x7e => out.push(b as char),
                    b'\n' => out.push_str("\\n"),
                    b'\r' => out.push_str("\\r"),
                    b'\t' => out.push_str("\\t"),
                    other => out.push_str(&format!("\\{other:03o}")),
                }
            }
            out.push(')');
            out
        }
        PsObject::Array(r) => {
            if !visited.insert(r.id) {
                return Ok("-recursive-".to_string());
            }
            let (open, close) = if r.literal { ("[", "]") } else { ("{", "}") };
            let mut parts = Vec::with_capacity(r.len);
            for i in 0..r.len {
                let item = vm.array_get(*r, i)?;
                parts.push(repr_form(vm, &item, visited)?);
            }
            visited.remove(&r.id);
            format!("{open}{}{close}", parts.join(" "))
        }
        PsObject::Dict(_) => "-dict-".to_string(),
        PsObject::File(_) => "-file-".to_string(),
        PsObject::Save(_) => "-save-".to_string(),
    };
    Ok(text)
}
