//! Relational, boolean and bitwise operators.
//!
//! Handles: eq, ne, ge, gt, le, lt, and, or, xor, not, bitshift
//!
//! The two-letter composites delegate to their primitive pair (`ne` is
//! `eq not`, `lt` is `ge not`, `le` is `gt not`) instead of reimplementing
//! comparison logic, so coercion and edge cases behave identically across
//! the whole family.

use crate::error::{PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::PsObject;
use crate::model::vm::Vm;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("eq", Interpreter::op_eq);
    registry.insert("ne", Interpreter::op_ne);
    registry.insert("ge", Interpreter::op_ge);
    registry.insert("gt", Interpreter::op_gt);
    registry.insert("le", Interpreter::op_le);
    registry.insert("lt", Interpreter::op_lt);
    registry.insert("and", Interpreter::op_and);
    registry.insert("or", Interpreter::op_or);
    registry.insert("xor", Interpreter::op_xor);
    registry.insert("not", Interpreter::op_not);
    registry.insert("bitshift", Interpreter::op_bitshift);
}

/// Value equality with numeric coercion. Strings compare by content and
/// cross-compare against names; other composites compare by identity.
fn objects_equal(vm: &Vm, a: &PsObject, b: &PsObject) -> Result<bool> {
    let equal = match (a, b) {
        (PsObject::Integer(_) | PsObject::Real(_), PsObject::Integer(_) | PsObject::Real(_)) => {
            a.as_real()? == b.as_real()?
        }
        (PsObject::Boolean(x), PsObject::Boolean(y)) => x == y,
        (PsObject::Null, PsObject::Null) | (PsObject::Mark, PsObject::Mark) => true,
        (PsObject::Name(x), PsObject::Name(y)) => x.name == y.name,
        (PsObject::String(x), PsObject::String(y)) => vm.string(*x)? == vm.string(*y)?,
        (PsObject::Name(n), PsObject::String(s)) | (PsObject::String(s), PsObject::Name(n)) => {
            n.name.as_bytes() == vm.string(*s)?
        }
        (PsObject::Array(x), PsObject::Array(y)) => {
            x.id == y.id && x.start == y.start && x.len == y.len
        }
        (PsObject::Dict(x), PsObject::Dict(y)) => x.id == y.id,
        (PsObject::Operator(x), PsObject::Operator(y)) => x == y,
        (PsObject::File(x), PsObject::File(y)) => x == y,
        (PsObject::Save(x), PsObject::Save(y)) => x.id == y.id,
        _ => false,
    };
    Ok(equal)
}

impl Interpreter {
    pub(crate) fn op_eq(&mut self) -> Result<()> {
        let b = self.op_stack.pop()?;
        let a = self.op_stack.pop()?;
        let equal = objects_equal(&self.vm, &a, &b)?;
        self.op_stack.push(PsObject::Boolean(equal));
        Ok(())
    }

    pub(crate) fn op_ne(&mut self) -> Result<()> {
        self.execute_operator("eq")?;
        self.execute_operator("not")
    }

    /// Ordering comparison shared by `ge` and `gt`: numbers numerically,
    /// strings lexicographically by bytes.
    fn compare(&mut self, keep: impl Fn(std::cmp::Ordering) -> bool) -> Result<()> {
        let b = self.op_stack.pop()?;
        let a = self.op_stack.pop()?;
        let result = match (&a, &b) {
            (
                PsObject::Integer(_) | PsObject::Real(_),
                PsObject::Integer(_) | PsObject::Real(_),
            ) => match a.as_real()?.partial_cmp(&b.as_real()?) {
                Some(ordering) => keep(ordering),
                None => false,
            },
            (PsObject::String(x), PsObject::String(y)) => {
                keep(self.vm.string(*x)?.cmp(self.vm.string(*y)?))
            }
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(PsObject::Boolean(result));
        Ok(())
    }

    pub(crate) fn op_ge(&mut self) -> Result<()> {
        self.compare(std::cmp::Ordering::is_ge)
    }

    pub(crate) fn op_gt(&mut self) -> Result<()> {
        self.compare(std::cmp::Ordering::is_gt)
    }

    pub(crate) fn op_le(&mut self) -> Result<()> {
        self.execute_operator("gt")?;
        self.execute_operator("not")
    }

    pub(crate) fn op_lt(&mut self) -> Result<()> {
        self.execute_operator("ge")?;
        self.execute_operator("not")
    }

    fn bitwise_or_logical(
        &mut self,
        logical: impl Fn(bool, bool) -> bool,
        bitwise: impl Fn(i64, i64) -> i64,
    ) -> Result<()> {
        let b = self.op_stack.pop()?;
        let a = self.op_stack.pop()?;
        let result = match (a, b) {
            (PsObject::Boolean(x), PsObject::Boolean(y)) => PsObject::Boolean(logical(x, y)),
            (PsObject::Integer(x), PsObject::Integer(y)) => PsObject::Integer(bitwise(x, y)),
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(result);
        Ok(())
    }

    pub(crate) fn op_and(&mut self) -> Result<()> {
        self.bitwise_or_logical(|x, y| x && y, |x, y| x & y)
    }

    pub(crate) fn op_or(&mut self) -> Result<()> {
        self.bitwise_or_logical(|x, y| x || y, |x, y| x | y)
    }

    pub(crate) fn op_xor(&mut self) -> Result<()> {
        self.bitwise_or_logical(|x, y| x ^ y, |x, y| x ^ y)
    }

    pub(crate) fn op_not(&mut self) -> Result<()> {
        let result = match self.op_stack.pop()? {
            PsObject::Boolean(b) => PsObject::Boolean(!b),
            PsObject::Integer(n) => PsObject::Integer(!n),
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(result);
        Ok(())
    }

    pub(crate) fn op_bitshift(&mut self) -> Result<()> {
        let shift = self.op_stack.pop_int()?;
        let value = self.op_stack.pop_int()?;
        let result = if shift.unsigned_abs() >= 64 {
            0
        } else if shift >= 0 {
            value.wrapping_shl(shift as u32)
        } else {
            value.wrapping_shr((-shift) as u32)
        };
        self.op_stack.push(PsObject::Integer(result));
        Ok(())
    }
}
