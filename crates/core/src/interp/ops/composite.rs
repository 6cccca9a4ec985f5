//! Operators on composite objects and object attributes.
//!
//! Handles: get, put, length, getinterval, putinterval, aload, astore,
//! array, string, readonly, rcheck, wcheck, type, cvx, cvlit, xcheck,
//! bind, null

use crate::error::{PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::{ArrayRef, Name, PsObject, StringRef};
use rustc_hash::FxHashSet;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("get", Interpreter::op_get);
    registry.insert("put", Interpreter::op_put);
    registry.insert("length", Interpreter::op_length);
    registry.insert("getinterval", Interpreter::op_getinterval);
    registry.insert("putinterval", Interpreter::op_putinterval);
    registry.insert("aload", Interpreter::op_aload);
    registry.insert("astore", Interpreter::op_astore);
    registry.insert("array", Interpreter::op_array);
    registry.insert("string", Interpreter::op_string);
    registry.insert("readonly", Interpreter::op_readonly);
    registry.insert("rcheck", Interpreter::op_rcheck);
    registry.insert("wcheck", Interpreter::op_wcheck);
    registry.insert("type", Interpreter::op_type);
    registry.insert("cvx", Interpreter::op_cvx);
    registry.insert("cvlit", Interpreter::op_cvlit);
    registry.insert("xcheck", Interpreter::op_xcheck);
    registry.insert("bind", Interpreter::op_bind);
    registry.insert("null", Interpreter::op_null);
}

impl Interpreter {
    pub(crate) fn op_get(&mut self) -> Result<()> {
        let index_or_key = self.op_stack.pop()?;
        let target = self.op_stack.pop()?;
        let value = match target {
            PsObject::Array(r) => {
                let index = non_negative(index_or_key.as_int()?)?;
                self.vm.array_get(r, index)?
            }
            PsObject::String(r) => {
                let index = non_negative(index_or_key.as_int()?)?;
                PsObject::Integer(i64::from(self.vm.string_get(r, index)?))
            }
            PsObject::Dict(r) => {
                let key = self.vm.dict_key(&index_or_key)?;
                self.vm
                    .dict_get(r, &key)?
                    .ok_or_else(|| PsError::Undefined(key.to_string()))?
            }
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(value);
        Ok(())
    }

    pub(crate) fn op_put(&mut self) -> Result<()> {
        let value = self.op_stack.pop()?;
        let index_or_key = self.op_stack.pop()?;
        let target = self.op_stack.pop()?;
        match target {
            PsObject::Array(r) => {
                let index = non_negative(index_or_key.as_int()?)?;
                self.vm.array_put(r, index, value)?;
            }
            PsObject::String(r) => {
                let index = non_negative(index_or_key.as_int()?)?;
                let byte = value.as_int()?;
                if !(0..=255).contains(&byte) {
                    return Err(PsError::RangeCheck.into());
                }
                self.vm.string_put(r, index, byte as u8)?;
            }
            PsObject::Dict(r) => {
                let key = self.vm.dict_key(&index_or_key)?;
                self.vm.dict_put(r, key, value)?;
            }
            _ => return Err(PsError::TypeCheck.into()),
        }
        Ok(())
    }

    pub(crate) fn op_length(&mut self) -> Result<()> {
        let length = match self.op_stack.pop()? {
            PsObject::Array(r) => r.len,
            PsObject::String(r) => r.len,
            PsObject::Dict(r) => self.vm.dict_len(r)?,
            PsObject::Name(n) => n.name.len(),
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(PsObject::Integer(length as i64));
        Ok(())
    }

    /// `getinterval`: a subrange view aliasing the same storage.
    pub(crate) fn op_getinterval(&mut self) -> Result<()> {
        let count = non_negative(self.op_stack.pop_int()?)?;
        let index = non_negative(self.op_stack.pop_int()?)?;
        let view = match self.op_stack.pop()? {
            PsObject::Array(r) => {
                check_interval(index, count, r.len)?;
                PsObject::Array(ArrayRef {
                    start: r.start + index,
                    len: count,
                    ..r
                })
            }
            PsObject::String(r) => {
                check_interval(index, count, r.len)?;
                PsObject::String(StringRef {
                    start: r.start + index,
                    len: count,
                    ..r
                })
            }
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(view);
        Ok(())
    }

    pub(crate) fn op_putinterval(&mut self) -> Result<()> {
        let source = self.op_stack.pop()?;
        let index = non_negative(self.op_stack.pop_int()?)?;
        let dest = self.op_stack.pop()?;
        match (dest, source) {
            (PsObject::Array(dst), PsObject::Array(src)) => {
                check_interval(index, src.len, dst.len)?;
                for i in 0..src.len {
                    let item = self.vm.array_get(src, i)?;
                    self.vm.array_put(dst, index + i, item)?;
                }
            }
            (PsObject::String(dst), PsObject::String(src)) => {
                check_interval(index, src.len, dst.len)?;
                for i in 0..src.len {
                    let byte = self.vm.string_get(src, i)?;
                    self.vm.string_put(dst, index + i, byte)?;
                }
            }
            _ => return Err(PsError::TypeCheck.into()),
        }
        Ok(())
    }

    pub(crate) fn op_aload(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        let r = obj.as_array()?;
        for i in 0..r.len {
            let item = self.vm.array_get(r, i)?;
            self.op_stack.push(item);
        }
        self.op_stack.push(obj);
        Ok(())
    }

    pub(crate) fn op_astore(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        let r = obj.as_array()?;
        let items = self.op_stack.pop_n(r.len)?;
        for (i, item) in items.into_iter().enumerate() {
            self.vm.array_put(r, i, item)?;
        }
        self.op_stack.push(obj);
        Ok(())
    }

    pub(crate) fn op_array(&mut self) -> Result<()> {
        let n = bounded_length(self.op_stack.pop_int()?)?;
        let r = self.vm.alloc_array(vec![PsObject::Null; n]);
        self.op_stack.push(PsObject::Array(r));
        Ok(())
    }

    pub(crate) fn op_string(&mut self) -> Result<()> {
        let n = bounded_length(self.op_stack.pop_int()?)?;
        let r = self.vm.alloc_string(vec![0; n]);
        self.op_stack.push(PsObject::String(r));
        Ok(())
    }

    pub(crate) fn op_readonly(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        match &obj {
            PsObject::Array(r) => self.vm.array_set_read_only(*r)?,
            PsObject::String(r) => self.vm.string_set_read_only(*r)?,
            PsObject::Dict(r) => self.vm.dict_set_read_only(*r)?,
            _ => return Err(PsError::TypeCheck.into()),
        }
        self.op_stack.push(obj);
        Ok(())
    }

    /// Read access is always granted in this model; only the write flag is
    /// tracked.
    pub(crate) fn op_rcheck(&mut self) -> Result<()> {
        match self.op_stack.pop()? {
            PsObject::Array(_) | PsObject::String(_) | PsObject::Dict(_) | PsObject::File(_) => {
                self.op_stack.push(PsObject::Boolean(true));
                Ok(())
            }
            _ => Err(PsError::TypeCheck.into()),
        }
    }

    pub(crate) fn op_wcheck(&mut self) -> Result<()> {
        let writable = match self.op_stack.pop()? {
            PsObject::Array(r) => self.vm.array_is_writable(r)?,
            PsObject::String(r) => self.vm.string_is_writable(r)?,
            PsObject::Dict(r) => self.vm.dict_is_writable(r)?,
            PsObject::File(_) => true,
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(PsObject::Boolean(writable));
        Ok(())
    }

    pub(crate) fn op_type(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        self.op_stack
            .push(PsObject::Name(Name::executable(obj.type_name())));
        Ok(())
    }

    pub(crate) fn op_cvx(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        self.op_stack.push(obj.cvx());
        Ok(())
    }

    pub(crate) fn op_cvlit(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        self.op_stack.push(obj.cvlit());
        Ok(())
    }

    pub(crate) fn op_xcheck(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        self.op_stack.push(PsObject::Boolean(obj.is_executable()));
        Ok(())
    }

    /// `bind`: replaces executable names bound to operators by the operator
    /// objects themselves, recursing into nested procedures.
    pub(crate) fn op_bind(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        let r = obj.as_proc()?;
        let mut visited = FxHashSet::default();
        self.bind_proc(r, &mut visited)?;
        self.op_stack.push(obj);
        Ok(())
    }

    fn bind_proc(&mut self, r: ArrayRef, visited: &mut FxHashSet<usize>) -> Result<()> {
        if !visited.insert(r.id) {
            return Ok(());
        }
        if !self.vm.array_is_writable(r)? {
            return Ok(());
        }
        for i in 0..r.len {
            match self.vm.array_get(r, i)? {
                PsObject::Name(n) if !n.literal => {
                    if let Some(PsObject::Operator(op)) =
                        self.dict_stack.lookup(&self.vm, &n.name)?
                    {
                        self.vm.array_put(r, i, PsObject::Operator(op))?;
                    }
                }
                PsObject::Array(sub) if !sub.literal => {
                    self.bind_proc(sub, visited)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn op_null(&mut self) -> Result<()> {
        self.op_stack.push(PsObject::Null);
        Ok(())
    }
}

fn non_negative(n: i64) -> Result<usize> {
    if n < 0 {
        return Err(PsError::RangeCheck.into());
    }
    Ok(n as usize)
}

/// Maximum length of a freshly allocated array or string.
const MAX_COMPOSITE_LEN: usize = 65535;

fn bounded_length(n: i64) -> Result<usize> {
    let n = non_negative(n)?;
    if n > MAX_COMPOSITE_LEN {
        return Err(PsError::RangeCheck.into());
    }
    Ok(n)
}

fn check_interval(index: usize, count: usize, len: usize) -> Result<()> {
    match index.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(PsError::RangeCheck.into()),
    }
}
