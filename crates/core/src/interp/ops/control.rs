//! Control-flow operators.
//!
//! Handles: exec, if, ifelse, for, repeat, loop, exit, quit, forall
//!
//! Loop bodies never iterate through host recursion. A looping operator
//! pushes its frame (a mark sentinel plus auxiliary values) on the
//! continuation stack and plants an internal continuation operator on the
//! execution stack; each firing re-queues the body and itself, so
//! iteration interleaves with normal execution one token at a time. `exit`
//! unwinds the execution stack to the nearest continuation operator and
//! drops its frame.

use crate::error::{ProgramError, PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::{OpKind, Operator, Registry};
use crate::model::object::{PsObject, StringRef};

pub(super) fn register(registry: &mut Registry) {
    registry.insert("exec", Interpreter::op_exec);
    registry.insert("if", Interpreter::op_if);
    registry.insert("ifelse", Interpreter::op_ifelse);
    registry.insert("for", Interpreter::op_for);
    registry.insert("repeat", Interpreter::op_repeat);
    registry.insert("loop", Interpreter::op_loop);
    registry.insert("forall", Interpreter::op_forall);
    registry.insert("exit", Interpreter::op_exit);
    registry.insert("quit", Interpreter::op_quit);
}

const LOOP_CONTINUE: Operator = Operator {
    name: "loopcontinue",
    kind: OpKind::Continuation,
    func: Interpreter::loop_continue,
};

const REPEAT_CONTINUE: Operator = Operator {
    name: "repeatcontinue",
    kind: OpKind::Continuation,
    func: Interpreter::repeat_continue,
};

const FOR_CONTINUE: Operator = Operator {
    name: "forcontinue",
    kind: OpKind::Continuation,
    func: Interpreter::for_continue,
};

const FORALL_CONTINUE: Operator = Operator {
    name: "forallcontinue",
    kind: OpKind::Continuation,
    func: Interpreter::forall_continue,
};

impl Interpreter {
    pub(crate) fn op_exec(&mut self) -> Result<()> {
        let obj = self.op_stack.pop()?;
        self.execute_object(obj, true)
    }

    pub(crate) fn op_if(&mut self) -> Result<()> {
        let proc = self.op_stack.pop()?;
        let condition = self.op_stack.pop_bool()?;
        if condition {
            self.execute_object(proc, true)?;
        }
        Ok(())
    }

    pub(crate) fn op_ifelse(&mut self) -> Result<()> {
        let proc2 = self.op_stack.pop()?;
        let proc1 = self.op_stack.pop()?;
        let condition = self.op_stack.pop_bool()?;
        self.execute_object(if condition { proc1 } else { proc2 }, true)
    }

    pub(crate) fn op_loop(&mut self) -> Result<()> {
        let proc = self.op_stack.pop()?;
        self.cont_stack.push(PsObject::Mark);
        self.cont_stack.push(proc);
        self.exec_stack.push(PsObject::Operator(LOOP_CONTINUE));
        Ok(())
    }

    pub(crate) fn loop_continue(&mut self) -> Result<()> {
        let proc = self
            .cont_stack
            .last()
            .ok_or_else(|| ProgramError::new("loop continuation without a frame"))?
            .clone();
        self.exec_stack.push(PsObject::Operator(LOOP_CONTINUE));
        self.execute_object(proc, true)
    }

    pub(crate) fn op_repeat(&mut self) -> Result<()> {
        let proc = self.op_stack.pop()?;
        let count = self.op_stack.pop_int()?;
        if count < 0 {
            return Err(PsError::RangeCheck.into());
        }
        self.cont_stack.push(PsObject::Mark);
        self.cont_stack.push(proc);
        self.cont_stack.push(PsObject::Integer(count));
        self.exec_stack.push(PsObject::Operator(REPEAT_CONTINUE));
        Ok(())
    }

    pub(crate) fn repeat_continue(&mut self) -> Result<()> {
        let remaining = self
            .cont_stack
            .pop()
            .ok_or_else(|| ProgramError::new("repeat continuation without a frame"))?
            .as_int()?;
        if remaining == 0 {
            self.drop_cont_frame();
            return Ok(());
        }
        let proc = self
            .cont_stack
            .last()
            .ok_or_else(|| ProgramError::new("repeat continuation without a frame"))?
            .clone();
        self.cont_stack.push(PsObject::Integer(remaining - 1));
        self.exec_stack.push(PsObject::Operator(REPEAT_CONTINUE));
        self.execute_object(proc, true)
    }

    pub(crate) fn op_for(&mut self) -> Result<()> {
        let proc = self.op_stack.pop()?;
        let limit = self.op_stack.pop()?;
        let increment = self.op_stack.pop()?;
        let initial = self.op_stack.pop()?;
        if !limit.is_number() || !increment.is_number() || !initial.is_number() {
            return Err(PsError::TypeCheck.into());
        }
        self.cont_stack.push(PsObject::Mark);
        self.cont_stack.push(proc);
        self.cont_stack.push(limit);
        self.cont_stack.push(increment);
        self.cont_stack.push(initial);
        self.exec_stack.push(PsObject::Operator(FOR_CONTINUE));
        Ok(())
    }

    pub(crate) fn for_continue(&mut self) -> Result<()> {
        let current = self
            .cont_stack
            .pop()
            .ok_or_else(|| ProgramError::new("for continuation without a frame"))?;
        let frame_len = self.cont_stack.len();
        if frame_len < 3 {
            return Err(ProgramError::new("for continuation frame incomplete").into());
        }
        let increment = self.cont_stack[frame_len - 1].clone();
        let limit = self.cont_stack[frame_len - 2].clone();
        let proc = self.cont_stack[frame_len - 3].clone();

        let c = current.as_real()?;
        let i = increment.as_real()?;
        let l = limit.as_real()?;
        let done = if i >= 0.0 { c > l } else { c < l };
        if done {
            self.drop_cont_frame();
            return Ok(());
        }

        // The next control value keeps integer-ness when both the current
        // value and the increment are integers.
        let next = match (&current, &increment) {
            (PsObject::Integer(x), PsObject::Integer(y)) => match x.checked_add(*y) {
                Some(n) => PsObject::Integer(n),
                None => PsObject::Real(c + i),
            },
            _ => PsObject::Real(c + i),
        };
        self.cont_stack.push(next);
        self.op_stack.push(current);
        self.exec_stack.push(PsObject::Operator(FOR_CONTINUE));
        self.execute_object(proc, true)
    }

    pub(crate) fn op_forall(&mut self) -> Result<()> {
        let proc = self.op_stack.pop()?;
        let target = self.op_stack.pop()?;
        match target {
            PsObject::Array(_) | PsObject::String(_) => {
                self.cont_stack.push(PsObject::Mark);
                self.cont_stack.push(proc);
                self.cont_stack.push(target);
                self.exec_stack.push(PsObject::Operator(FORALL_CONTINUE));
                Ok(())
            }
            _ => Err(PsError::TypeCheck.into()),
        }
    }

    pub(crate) fn forall_continue(&mut self) -> Result<()> {
        let remaining = self
            .cont_stack
            .pop()
            .ok_or_else(|| ProgramError::new("forall continuation without a frame"))?;
        let proc = self
            .cont_stack
            .last()
            .ok_or_else(|| ProgramError::new("forall continuation without a frame"))?
            .clone();

        let element = match remaining {
            PsObject::Array(r) => {
                if r.len == 0 {
                    self.drop_cont_frame();
                    return Ok(());
                }
                let element = self.vm.array_get(r, 0)?;
                self.cont_stack.push(PsObject::Array(crate::model::object::ArrayRef {
                    start: r.start + 1,
                    len: r.len - 1,
                    ..r
                }));
                element
            }
            PsObject::String(r) => {
                if r.len == 0 {
                    self.drop_cont_frame();
                    return Ok(());
                }
                let byte = self.vm.string_get(r, 0)?;
                self.cont_stack.push(PsObject::String(StringRef {
                    start: r.start + 1,
                    len: r.len - 1,
                    ..r
                }));
                PsObject::Integer(i64::from(byte))
            }
            _ => return Err(PsError::TypeCheck.into()),
        };

        self.op_stack.push(element);
        self.exec_stack.push(PsObject::Operator(FORALL_CONTINUE));
        self.execute_object(proc, true)
    }

    /// `exit`: discards queued work up to and including the innermost
    /// continuation operator, then drops that loop's frame.
    pub(crate) fn op_exit(&mut self) -> Result<()> {
        loop {
            match self.exec_stack.pop() {
                Some(PsObject::Operator(op)) if op.kind == OpKind::Continuation => break,
                Some(_) => continue,
                None => return Err(PsError::InvalidExit.into()),
            }
        }
        self.drop_cont_frame();
        Ok(())
    }

    pub(crate) fn op_quit(&mut self) -> Result<()> {
        self.exec_stack.clear();
        self.cont_stack.clear();
        Ok(())
    }

    /// Pops continuation values up to and including the frame's mark.
    fn drop_cont_frame(&mut self) {
        while let Some(obj) = self.cont_stack.pop() {
            if matches!(obj, PsObject::Mark) {
                break;
            }
        }
    }
}
