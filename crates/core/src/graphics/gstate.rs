//! Graphics state and the dual-discipline checkpoint stack.
//!
//! Two checkpoint kinds exist. A `gsave` checkpoint is lightweight and is
//! always fully reversible by either `grestore` or `restore`. A `save`
//! checkpoint additionally guards against partial rollback: a `grestore`
//! reaching one may only peek (the checkpoint stays on the stack), never
//! pop it. This asymmetry is load-bearing for the language semantics.

use crate::error::PsError;
use crate::graphics::device::OutputDevice;
use crate::graphics::path::Path;
use crate::model::object::PsObject;
use crate::model::vm::{CloneMap, Vm};
use crate::utils::{Matrix, Point, MATRIX_IDENTITY};

/// The current graphics state: CTM, path, current point and line styling.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// Current transformation matrix, user space to device space.
    pub ctm: Matrix,
    /// Current point in user space, `None` before the first moveto.
    pub position: Option<Point>,
    /// Current path, in device space.
    pub path: Path,
    pub line_width: f64,
    /// Dash pattern array (a VM object, shared until deep-cloned) plus
    /// offset. `None` means a solid line.
    pub dash_pattern: Option<PsObject>,
    pub dash_offset: f64,
    /// Flatness tolerance used as the flattening error bound.
    pub flatness: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: MATRIX_IDENTITY,
            position: None,
            path: Path::new(),
            line_width: 1.0,
            dash_pattern: None,
            dash_offset: 0.0,
            flatness: 1.0,
        }
    }
}

impl GraphicsState {
    /// Clones this state for a checkpoint. Composite fields go through the
    /// VM's identity-mapped deep clone so that aliases inside the state
    /// stay aliases and cyclic structures terminate.
    pub fn clone_deep(&self, vm: &mut Vm, map: &mut CloneMap) -> Result<Self, PsError> {
        let dash_pattern = match &self.dash_pattern {
            Some(obj) => Some(vm.deep_clone(obj, map)?),
            None => None,
        };
        Ok(Self {
            dash_pattern,
            path: self.path.clone(),
            ..*self
        })
    }

    /// Device-space flattening error bound derived from the flatness
    /// parameter, assuming a 1200 dpi device raster.
    pub fn flatten_error(&self) -> f64 {
        self.flatness * 72.0 / 1200.0
    }
}

/// Checkpoint discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Save,
    Gsave,
}

/// What a restore call found on the checkpoint stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// The stack was empty; nothing happened.
    Empty,
    Save,
    Gsave,
}

/// The graphics-state checkpoint stack. Owns the current state and the
/// active output device.
pub struct GstateStack {
    stack: Vec<(GraphicsState, Discipline)>,
    current: GraphicsState,
    device: Box<dyn OutputDevice>,
}

impl GstateStack {
    pub fn new(device: Box<dyn OutputDevice>) -> Self {
        Self {
            stack: Vec::new(),
            current: GraphicsState::default(),
            device,
        }
    }

    pub fn current(&self) -> &GraphicsState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        &mut self.current
    }

    pub fn device_mut(&mut self) -> &mut dyn OutputDevice {
        self.device.as_mut()
    }

    /// Number of checkpoints on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pushes a checkpoint of the current state and notifies the device
    /// that a nested scope has begun.
    pub fn save_gstate(&mut self, vm: &mut Vm, as_gsave: bool) -> Result<(), PsError> {
        let mut map = CloneMap::default();
        let clone = self.current.clone_deep(vm, &mut map)?;
        let discipline = if as_gsave {
            Discipline::Gsave
        } else {
            Discipline::Save
        };
        self.stack.push((clone, discipline));
        self.device.start_scope();
        Ok(())
    }

    /// Restores from the topmost checkpoint.
    ///
    /// A GSAVE checkpoint is always fully restored, regardless of caller.
    /// A SAVE checkpoint is fully restored only by `restore`; a `grestore`
    /// may only peek at it, leaving the checkpoint stack untouched.
    pub fn restore_gstate(&mut self, vm: &mut Vm, as_grestore: bool) -> Result<Restored, PsError> {
        let Some((_, discipline)) = self.stack.last() else {
            return Ok(Restored::Empty);
        };
        match discipline {
            Discipline::Gsave => {
                let (state, _) = self.stack.pop().expect("checked non-empty");
                self.current = state;
                self.device.end_scope();
                Ok(Restored::Gsave)
            }
            Discipline::Save => {
                if as_grestore {
                    let mut map = CloneMap::default();
                    let snapshot = self.stack.last().expect("checked non-empty").0.clone();
                    self.current = snapshot.clone_deep(vm, &mut map)?;
                } else {
                    let (state, _) = self.stack.pop().expect("checked non-empty");
                    self.current = state;
                    self.device.end_scope();
                }
                Ok(Restored::Save)
            }
        }
    }

    /// Unwinds GSAVE-disciplined checkpoints until something else is found.
    ///
    /// With `for_grestoreall` the terminating SAVE checkpoint is peeked and
    /// left in place; a plain `restore` consumes it as well.
    pub fn restore_all_gstate(&mut self, vm: &mut Vm, for_grestoreall: bool) -> Result<(), PsError> {
        loop {
            match self.restore_gstate(vm, for_grestoreall)? {
                Restored::Gsave => continue,
                Restored::Save | Restored::Empty => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::device::NullDevice;

    fn stack_with_vm() -> (GstateStack, Vm) {
        (GstateStack::new(Box::new(NullDevice)), Vm::new())
    }

    #[test]
    fn grestore_cannot_cross_a_save_boundary() {
        let (mut gstack, mut vm) = stack_with_vm();
        gstack.current_mut().line_width = 1.0;
        gstack.save_gstate(&mut vm, true).unwrap(); // gsave
        gstack.save_gstate(&mut vm, false).unwrap(); // save
        gstack.current_mut().line_width = 9.0;

        // grestore sees the SAVE checkpoint: peek only.
        assert_eq!(
            gstack.restore_gstate(&mut vm, true).unwrap(),
            Restored::Save
        );
        assert_eq!(gstack.depth(), 2);
        assert_eq!(gstack.current().line_width, 1.0);
    }

    #[test]
    fn restore_unwinds_intervening_gsave_layers() {
        let (mut gstack, mut vm) = stack_with_vm();
        gstack.save_gstate(&mut vm, false).unwrap(); // save
        gstack.save_gstate(&mut vm, true).unwrap(); // gsave
        assert_eq!(gstack.depth(), 2);

        // restore-all with restore discipline pops the GSAVE layer first,
        // then consumes the SAVE itself.
        gstack.restore_all_gstate(&mut vm, false).unwrap();
        assert_eq!(gstack.depth(), 0);
    }

    #[test]
    fn grestoreall_stops_at_save_without_consuming_it() {
        let (mut gstack, mut vm) = stack_with_vm();
        gstack.save_gstate(&mut vm, false).unwrap(); // save
        gstack.save_gstate(&mut vm, true).unwrap(); // gsave
        gstack.save_gstate(&mut vm, true).unwrap(); // gsave

        gstack.restore_all_gstate(&mut vm, true).unwrap();
        assert_eq!(gstack.depth(), 1);
    }

    #[test]
    fn restore_on_empty_stack_is_a_noop() {
        let (mut gstack, mut vm) = stack_with_vm();
        assert_eq!(
            gstack.restore_gstate(&mut vm, false).unwrap(),
            Restored::Empty
        );
    }
}
