//! Execution stack: objects awaiting interpretation.
//!
//! The top item may be a resumable composite source: an open file yields one
//! token at a time without being tokenized up front, and a procedure yields
//! its elements one by one. [`ExecStack::next_token`] is the single
//! sanctioned extraction primitive; [`ExecStack::pop`] bypasses resumption
//! and is reserved for control operators that intentionally discard
//! remaining work.

use crate::error::Result;
use crate::model::object::{ArrayRef, FileRef, PsObject};
use crate::model::vm::Vm;
use crate::parser;

/// One step of the resumable token protocol.
enum Yielded {
    /// The item has no more tokens; pop it.
    Exhausted,
    /// The item produced a token. `remainder` replaces the item on the
    /// stack, or the item is popped when there is nothing left to resume.
    Token {
        token: PsObject,
        remainder: Option<PsObject>,
    },
}

#[derive(Debug, Default)]
pub struct ExecStack {
    items: Vec<PsObject>,
}

impl ExecStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, obj: PsObject) {
        self.items.push(obj);
    }

    /// Plain pop. Deliberately returns an absence sentinel instead of
    /// raising: control operators pop speculatively while unwinding.
    pub fn pop(&mut self) -> Option<PsObject> {
        self.items.pop()
    }

    pub fn top(&self) -> Option<&PsObject> {
        self.items.last()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Extracts the next token from the topmost item.
    ///
    /// Returns `Ok(None)` both when the stack is empty and when the top item
    /// turned out to be exhausted (it is popped; the interpreter loop simply
    /// comes back for the next item).
    pub fn next_token(&mut self, vm: &mut Vm) -> Result<Option<PsObject>> {
        let Some(top) = self.items.last().cloned() else {
            return Ok(None);
        };
        match Self::yield_from(&top, vm)? {
            Yielded::Exhausted => {
                self.items.pop();
                Ok(None)
            }
            Yielded::Token { token, remainder } => {
                self.items.pop();
                if let Some(rest) = remainder {
                    self.items.push(rest);
                }
                Ok(Some(token))
            }
        }
    }

    /// The topmost file on the stack, used for error position reporting.
    pub fn topmost_file(&self) -> Option<&FileRef> {
        self.items.iter().rev().find_map(|obj| match obj {
            PsObject::File(f) => Some(f),
            _ => None,
        })
    }

    fn yield_from(obj: &PsObject, vm: &mut Vm) -> Result<Yielded> {
        match obj {
            // A procedure yields its elements front to back; the remainder
            // is a view of the same storage, one element shorter.
            PsObject::Array(r) if !r.literal => {
                if r.len == 0 {
                    return Ok(Yielded::Exhausted);
                }
                let token = vm.array_get(*r, 0)?;
                let remainder = if r.len == 1 {
                    None
                } else {
                    Some(PsObject::Array(ArrayRef {
                        start: r.start + 1,
                        len: r.len - 1,
                        ..*r
                    }))
                };
                Ok(Yielded::Token { token, remainder })
            }
            // A file yields one parsed token per step and stays put until
            // the stream runs dry.
            PsObject::File(f) => {
                let parsed = {
                    let mut source = f.0.borrow_mut();
                    parser::next_token(&mut source, vm)?
                };
                match parsed {
                    Some((token, _consumed)) => Ok(Yielded::Token {
                        token,
                        remainder: Some(obj.clone()),
                    }),
                    None => Ok(Yielded::Exhausted),
                }
            }
            // Anything else is itself the token.
            other => Ok(Yielded::Token {
                token: other.clone(),
                remainder: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::object::Name;
    use crate::parser::PsSource;

    #[test]
    fn procedure_yields_elements_then_exhausts() {
        let mut vm = Vm::new();
        let body = vec![
            PsObject::Integer(1),
            PsObject::Integer(2),
            PsObject::Name(Name::executable("add")),
        ];
        let r = vm.alloc_array(body);
        let proc_obj = PsObject::Array(ArrayRef { literal: false, ..r });

        let mut stack = ExecStack::new();
        stack.push(proc_obj);

        let mut seen = Vec::new();
        while !stack.is_empty() {
            if let Some(tok) = stack.next_token(&mut vm).unwrap() {
                seen.push(tok);
            }
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], PsObject::Integer(1));
        assert_eq!(seen[2], PsObject::Name(Name::executable("add")));
    }

    #[test]
    fn file_yields_tokens_lazily() {
        let mut vm = Vm::new();
        let file = FileRef::new(PsSource::from_bytes(b"10 20 moveto"));
        let mut stack = ExecStack::new();
        stack.push(PsObject::File(file));

        let mut seen = Vec::new();
        while !stack.is_empty() {
            if let Some(tok) = stack.next_token(&mut vm).unwrap() {
                // The file stays on the stack between tokens.
                assert_eq!(stack.len(), 1);
                seen.push(tok);
            }
        }
        assert_eq!(seen.len(), 3);
        assert!(stack.is_empty());
    }

    #[test]
    fn scalar_item_is_its_own_token() {
        let mut vm = Vm::new();
        let mut stack = ExecStack::new();
        stack.push(PsObject::Integer(5));
        assert_eq!(
            stack.next_token(&mut vm).unwrap(),
            Some(PsObject::Integer(5))
        );
        assert!(stack.is_empty());
    }
}
