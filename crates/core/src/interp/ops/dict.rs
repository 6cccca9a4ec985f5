//! Dictionary and dictionary-stack operators.
//!
//! Handles: dict, begin, end, def, load, store, where, known,
//! currentdict, countdictstack

use crate::error::{PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::PsObject;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("dict", Interpreter::op_dict);
    registry.insert("begin", Interpreter::op_begin);
    registry.insert("end", Interpreter::op_end);
    registry.insert("def", Interpreter::op_def);
    registry.insert("load", Interpreter::op_load);
    registry.insert("store", Interpreter::op_store);
    registry.insert("where", Interpreter::op_where);
    registry.insert("known", Interpreter::op_known);
    registry.insert("currentdict", Interpreter::op_currentdict);
    registry.insert("countdictstack", Interpreter::op_countdictstack);
}

impl Interpreter {
    /// `n dict`. The capacity hint is validated and otherwise ignored;
    /// dictionaries grow as needed.
    pub(crate) fn op_dict(&mut self) -> Result<()> {
        let capacity = self.op_stack.pop_int()?;
        if capacity < 0 {
            return Err(PsError::RangeCheck.into());
        }
        let dict = self.vm.alloc_dict();
        self.op_stack.push(PsObject::Dict(dict));
        Ok(())
    }

    pub(crate) fn op_begin(&mut self) -> Result<()> {
        let dict = self.op_stack.pop_dict()?;
        self.dict_stack.push(dict);
        Ok(())
    }

    pub(crate) fn op_end(&mut self) -> Result<()> {
        self.dict_stack.pop()?;
        Ok(())
    }

    pub(crate) fn op_def(&mut self) -> Result<()> {
        let value = self.op_stack.pop()?;
        let key_obj = self.op_stack.pop()?;
        let key = self.vm.dict_key(&key_obj)?;
        self.dict_stack.define(&mut self.vm, key, value)?;
        Ok(())
    }

    pub(crate) fn op_load(&mut self) -> Result<()> {
        let key_obj = self.op_stack.pop()?;
        let key = self.vm.dict_key(&key_obj)?;
        let value = self
            .dict_stack
            .lookup(&self.vm, &key)?
            .ok_or_else(|| PsError::Undefined(key.to_string()))?;
        self.op_stack.push(value);
        Ok(())
    }

    /// `store`: replaces the innermost existing binding, or defines in the
    /// current dictionary when the name is unbound everywhere.
    pub(crate) fn op_store(&mut self) -> Result<()> {
        let value = self.op_stack.pop()?;
        let key_obj = self.op_stack.pop()?;
        let key = self.vm.dict_key(&key_obj)?;
        match self.dict_stack.where_defined(&self.vm, &key)? {
            Some(dict) => self.vm.dict_put(dict, key, value)?,
            None => self.dict_stack.define(&mut self.vm, key, value)?,
        }
        Ok(())
    }

    pub(crate) fn op_where(&mut self) -> Result<()> {
        let key_obj = self.op_stack.pop()?;
        let key = self.vm.dict_key(&key_obj)?;
        match self.dict_stack.where_defined(&self.vm, &key)? {
            Some(dict) => {
                self.op_stack.push(PsObject::Dict(dict));
                self.op_stack.push(PsObject::Boolean(true));
            }
            None => self.op_stack.push(PsObject::Boolean(false)),
        }
        Ok(())
    }

    pub(crate) fn op_known(&mut self) -> Result<()> {
        let key_obj = self.op_stack.pop()?;
        let dict = self.op_stack.pop_dict()?;
        let key = self.vm.dict_key(&key_obj)?;
        let known = self.vm.dict_contains(dict, &key)?;
        self.op_stack.push(PsObject::Boolean(known));
        Ok(())
    }

    pub(crate) fn op_currentdict(&mut self) -> Result<()> {
        self.op_stack.push(PsObject::Dict(self.dict_stack.top()));
        Ok(())
    }

    pub(crate) fn op_countdictstack(&mut self) -> Result<()> {
        self.op_stack
            .push(PsObject::Integer(self.dict_stack.count() as i64));
        Ok(())
    }
}
