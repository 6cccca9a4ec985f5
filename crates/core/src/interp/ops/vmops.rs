//! VM checkpoint and graphics-state checkpoint operators.
//!
//! Handles: save, restore, gsave, grestore, grestoreall, vmstatus
//!
//! `save` checkpoints both the graphics state (with SAVE discipline) and
//! the VM arena; the gstate clone happens first so its allocations are part
//! of the arena snapshot and survive the rollback that `restore` performs.

use crate::error::Result;
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::PsObject;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("save", Interpreter::op_save);
    registry.insert("restore", Interpreter::op_restore);
    registry.insert("gsave", Interpreter::op_gsave);
    registry.insert("grestore", Interpreter::op_grestore);
    registry.insert("grestoreall", Interpreter::op_grestoreall);
    registry.insert("vmstatus", Interpreter::op_vmstatus);
}

impl Interpreter {
    pub(crate) fn op_save(&mut self) -> Result<()> {
        self.gstate.save_gstate(&mut self.vm, false)?;
        let save = self.vm.checkpoint();
        self.op_stack.push(PsObject::Save(save));
        Ok(())
    }

    /// `restore`: rolls the arena back, then unwinds every GSAVE layer and
    /// the matching SAVE checkpoint itself.
    pub(crate) fn op_restore(&mut self) -> Result<()> {
        let save = self.op_stack.pop_save()?;
        self.vm.rollback(save)?;
        self.gstate.restore_all_gstate(&mut self.vm, false)?;
        Ok(())
    }

    pub(crate) fn op_gsave(&mut self) -> Result<()> {
        self.gstate.save_gstate(&mut self.vm, true)?;
        Ok(())
    }

    /// `grestore` fully restores a GSAVE checkpoint but may only peek at a
    /// SAVE checkpoint; it never pops past a `save` boundary.
    pub(crate) fn op_grestore(&mut self) -> Result<()> {
        self.gstate.restore_gstate(&mut self.vm, true)?;
        Ok(())
    }

    pub(crate) fn op_grestoreall(&mut self) -> Result<()> {
        self.gstate.restore_all_gstate(&mut self.vm, true)?;
        Ok(())
    }

    pub(crate) fn op_vmstatus(&mut self) -> Result<()> {
        let level = self.vm.save_level() as i64;
        let used = self.vm.used() as i64;
        self.op_stack.push(PsObject::Integer(level));
        self.op_stack.push(PsObject::Integer(used));
        self.op_stack.push(PsObject::Integer(i64::from(i32::MAX)));
        Ok(())
    }
}
