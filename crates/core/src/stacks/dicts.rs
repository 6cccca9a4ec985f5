//! Dictionary stack: name resolution, innermost scope first.

use crate::error::PsError;
use crate::model::object::{DictRef, PsObject};
use crate::model::vm::Vm;
use smol_str::SmolStr;

/// The dictionary stack. The three permanent entries (systemdict,
/// globaldict, userdict) are created at construction and cannot be popped.
#[derive(Debug)]
pub struct DictStack {
    stack: Vec<DictRef>,
}

/// Number of permanent dictionaries at the bottom of the stack.
const PERMANENT: usize = 3;

impl DictStack {
    pub fn new(vm: &mut Vm) -> Self {
        let systemdict = vm.alloc_dict();
        let globaldict = vm.alloc_dict();
        let userdict = vm.alloc_dict();
        Self {
            stack: vec![systemdict, globaldict, userdict],
        }
    }

    pub fn systemdict(&self) -> DictRef {
        self.stack[0]
    }

    pub fn globaldict(&self) -> DictRef {
        self.stack[1]
    }

    pub fn userdict(&self) -> DictRef {
        self.stack[2]
    }

    pub fn count(&self) -> usize {
        self.stack.len()
    }

    pub fn top(&self) -> DictRef {
        *self.stack.last().expect("permanent dicts always present")
    }

    pub fn push(&mut self, dict: DictRef) {
        self.stack.push(dict);
    }

    /// `end`. Popping a permanent dictionary is a dictstackunderflow,
    /// reported through the stackunderflow condition.
    pub fn pop(&mut self) -> Result<(), PsError> {
        if self.stack.len() <= PERMANENT {
            return Err(PsError::StackUnderflow);
        }
        self.stack.pop();
        Ok(())
    }

    /// Searches innermost-to-outermost, returning the first binding.
    pub fn lookup(&self, vm: &Vm, name: &str) -> Result<Option<PsObject>, PsError> {
        for dict in self.stack.iter().rev() {
            if let Some(obj) = vm.dict_get(*dict, name)? {
                return Ok(Some(obj));
            }
        }
        Ok(None)
    }

    /// `where`: the innermost dictionary defining a name, without fetching
    /// the value.
    pub fn where_defined(&self, vm: &Vm, name: &str) -> Result<Option<DictRef>, PsError> {
        for dict in self.stack.iter().rev() {
            if vm.dict_contains(*dict, name)? {
                return Ok(Some(*dict));
            }
        }
        Ok(None)
    }

    /// `def`: binds a name in the current (topmost) dictionary.
    pub fn define(&self, vm: &mut Vm, key: SmolStr, value: PsObject) -> Result<(), PsError> {
        vm.dict_put(self.top(), key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_innermost_first() {
        let mut vm = Vm::new();
        let mut stack = DictStack::new(&mut vm);
        stack
            .define(&mut vm, SmolStr::new("x"), PsObject::Integer(1))
            .unwrap();

        let inner = vm.alloc_dict();
        stack.push(inner);
        stack
            .define(&mut vm, SmolStr::new("x"), PsObject::Integer(2))
            .unwrap();

        assert_eq!(
            stack.lookup(&vm, "x").unwrap(),
            Some(PsObject::Integer(2))
        );
        stack.pop().unwrap();
        assert_eq!(
            stack.lookup(&vm, "x").unwrap(),
            Some(PsObject::Integer(1))
        );
    }

    #[test]
    fn permanent_dicts_cannot_be_popped() {
        let mut vm = Vm::new();
        let mut stack = DictStack::new(&mut vm);
        assert_eq!(stack.pop().unwrap_err(), PsError::StackUnderflow);
    }

    #[test]
    fn where_reports_owning_dict() {
        let mut vm = Vm::new();
        let mut stack = DictStack::new(&mut vm);
        assert_eq!(stack.where_defined(&vm, "y").unwrap(), None);
        let inner = vm.alloc_dict();
        stack.push(inner);
        stack
            .define(&mut vm, SmolStr::new("y"), PsObject::Null)
            .unwrap();
        assert_eq!(stack.where_defined(&vm, "y").unwrap(), Some(inner));
    }
}
