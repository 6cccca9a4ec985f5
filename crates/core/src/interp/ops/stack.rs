//! Operand stack manipulation and bracket-matching operators.
//!
//! Handles: pop, exch, dup, copy, index, roll, clear, count, mark, `[`,
//! `<<`, cleartomark, counttomark, `]`, `>>`

use crate::error::{PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::PsObject;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("pop", Interpreter::op_pop);
    registry.insert("exch", Interpreter::op_exch);
    registry.insert("dup", Interpreter::op_dup);
    registry.insert("copy", Interpreter::op_copy);
    registry.insert("index", Interpreter::op_index);
    registry.insert("roll", Interpreter::op_roll);
    registry.insert("clear", Interpreter::op_clear);
    registry.insert("count", Interpreter::op_count);
    registry.insert("mark", Interpreter::op_mark);
    registry.insert("[", Interpreter::op_mark);
    registry.insert("<<", Interpreter::op_mark);
    registry.insert("cleartomark", Interpreter::op_cleartomark);
    registry.insert("counttomark", Interpreter::op_counttomark);
    registry.insert("]", Interpreter::op_end_array);
    registry.insert(">>", Interpreter::op_end_dict);
}

impl Interpreter {
    pub(crate) fn op_pop(&mut self) -> Result<()> {
        self.op_stack.pop()?;
        Ok(())
    }

    pub(crate) fn op_exch(&mut self) -> Result<()> {
        self.op_stack.exchange()?;
        Ok(())
    }

    pub(crate) fn op_dup(&mut self) -> Result<()> {
        let top = self.op_stack.peek()?.clone();
        self.op_stack.push(top);
        Ok(())
    }

    /// `copy` is polymorphic: with an integer it duplicates the top n
    /// operands, with two composites it copies content from the first into
    /// the second and returns the written part.
    pub(crate) fn op_copy(&mut self) -> Result<()> {
        match self.op_stack.peek()? {
            PsObject::Integer(_) => {
                let n = self.op_stack.pop_int()?;
                if n < 0 {
                    return Err(PsError::RangeCheck.into());
                }
                self.op_stack.copy_top(n as usize)?;
                Ok(())
            }
            _ => {
                let dest = self.op_stack.pop()?;
                let source = self.op_stack.pop()?;
                self.copy_composite(&source, &dest)
            }
        }
    }

    fn copy_composite(&mut self, source: &PsObject, dest: &PsObject) -> Result<()> {
        match (source, dest) {
            (PsObject::Array(src), PsObject::Array(dst)) => {
                if src.len > dst.len {
                    return Err(PsError::RangeCheck.into());
                }
                for i in 0..src.len {
                    let item = self.vm.array_get(*src, i)?;
                    self.vm.array_put(*dst, i, item)?;
                }
                let mut written = *dst;
                written.len = src.len;
                self.op_stack.push(PsObject::Array(written));
                Ok(())
            }
            (PsObject::String(src), PsObject::String(dst)) => {
                if src.len > dst.len {
                    return Err(PsError::RangeCheck.into());
                }
                for i in 0..src.len {
                    let byte = self.vm.string_get(*src, i)?;
                    self.vm.string_put(*dst, i, byte)?;
                }
                let mut written = *dst;
                written.len = src.len;
                self.op_stack.push(PsObject::String(written));
                Ok(())
            }
            (PsObject::Dict(src), PsObject::Dict(dst)) => {
                let entries = self.vm.dict_entries(*src)?;
                for (key, value) in entries {
                    self.vm.dict_put(*dst, key, value)?;
                }
                self.op_stack.push(PsObject::Dict(*dst));
                Ok(())
            }
            _ => Err(PsError::TypeCheck.into()),
        }
    }

    pub(crate) fn op_index(&mut self) -> Result<()> {
        let n = self.op_stack.pop_int()?;
        if n < 0 {
            return Err(PsError::RangeCheck.into());
        }
        let obj = self.op_stack.peek_at(n as usize)?.clone();
        self.op_stack.push(obj);
        Ok(())
    }

    pub(crate) fn op_roll(&mut self) -> Result<()> {
        let j = self.op_stack.pop_int()?;
        let n = self.op_stack.pop_int()?;
        if n < 0 {
            return Err(PsError::RangeCheck.into());
        }
        self.op_stack.roll(n as usize, j)?;
        Ok(())
    }

    pub(crate) fn op_clear(&mut self) -> Result<()> {
        self.op_stack.clear();
        Ok(())
    }

    pub(crate) fn op_count(&mut self) -> Result<()> {
        let n = self.op_stack.len() as i64;
        self.op_stack.push(PsObject::Integer(n));
        Ok(())
    }

    pub(crate) fn op_mark(&mut self) -> Result<()> {
        self.op_stack.push(PsObject::Mark);
        Ok(())
    }

    pub(crate) fn op_cleartomark(&mut self) -> Result<()> {
        let n = self.op_stack.count_to_mark()?;
        self.op_stack.pop_n(n + 1)?;
        Ok(())
    }

    pub(crate) fn op_counttomark(&mut self) -> Result<()> {
        let n = self.op_stack.count_to_mark()? as i64;
        self.op_stack.push(PsObject::Integer(n));
        Ok(())
    }

    /// `]`: collects the objects above the matching mark into a new literal
    /// array.
    pub(crate) fn op_end_array(&mut self) -> Result<()> {
        let n = self.op_stack.count_to_mark()?;
        let items = self.op_stack.pop_n(n)?;
        self.op_stack.pop()?; // the mark
        let r = self.vm.alloc_array(items);
        self.op_stack.push(PsObject::Array(r));
        Ok(())
    }

    /// `>>`: collects key/value pairs above the matching mark into a new
    /// dictionary.
    pub(crate) fn op_end_dict(&mut self) -> Result<()> {
        let n = self.op_stack.count_to_mark()?;
        if n % 2 != 0 {
            return Err(PsError::RangeCheck.into());
        }
        let items = self.op_stack.pop_n(n)?;
        self.op_stack.pop()?; // the mark
        let dict = self.vm.alloc_dict();
        for pair in items.chunks_exact(2) {
            let key = self.vm.dict_key(&pair[0])?;
            self.vm.dict_put(dict, key, pair[1].clone())?;
        }
        self.op_stack.push(PsObject::Dict(dict));
        Ok(())
    }
}
