//! The interpreter: the stack set, the graphics-state stack, and the main
//! execution loop.
//!
//! The loop repeatedly pulls the next token from the top of the execution
//! stack (which may be a resumable composite source) and executes it.
//! Interpreting a composite never recurses through the loop; it yields one
//! token at a time back to the loop, which is what lets the control
//! operators interleave iteration with normal execution. Genuine recursion
//! happens only for nested procedure execution and operator-to-operator
//! delegation.

use crate::error::{PsError, Result};
use crate::graphics::device::OutputDevice;
use crate::graphics::gstate::GstateStack;
use crate::interp::registry::Registry;
use crate::model::object::{FileRef, PsObject};
use crate::model::vm::Vm;
use crate::parser::PsSource;
use crate::stacks::{DictStack, ExecStack, OperandStack};
use crate::utils::{apply_matrix_pt, itransform_pt, Point};
use smol_str::SmolStr;
use std::io::Write;

/// A PostScript interpreter instance. All state is exclusively owned; the
/// language model is single-threaded by construction.
pub struct Interpreter {
    pub vm: Vm,
    pub op_stack: OperandStack,
    pub dict_stack: DictStack,
    pub exec_stack: ExecStack,
    /// Auxiliary values pushed/popped by the control operators.
    pub cont_stack: Vec<PsObject>,
    pub gstate: GstateStack,
    pub(crate) registry: Registry,
    writer: Box<dyn Write>,
}

impl Interpreter {
    /// Builds an interpreter around an output device: constructs the
    /// operator registry, populates systemdict from it, and seals it.
    pub fn new(device: Box<dyn OutputDevice>) -> Result<Self> {
        let mut vm = Vm::new();
        let registry = Registry::standard();
        let dict_stack = DictStack::new(&mut vm);

        let system = dict_stack.systemdict();
        for op in registry.iter() {
            vm.dict_put_unchecked(
                system,
                SmolStr::new_static(op.name),
                PsObject::Operator(*op),
            )?;
        }
        let constants = [
            ("true", PsObject::Boolean(true)),
            ("false", PsObject::Boolean(false)),
            ("systemdict", PsObject::Dict(system)),
            ("globaldict", PsObject::Dict(dict_stack.globaldict())),
            ("userdict", PsObject::Dict(dict_stack.userdict())),
        ];
        for (name, value) in constants {
            vm.dict_put_unchecked(system, SmolStr::new_static(name), value)?;
        }
        vm.dict_set_read_only(system)?;

        let mut interp = Self {
            vm,
            op_stack: OperandStack::new(),
            dict_stack,
            exec_stack: ExecStack::new(),
            cont_stack: Vec::new(),
            gstate: GstateStack::new(device),
            registry,
            writer: Box::new(std::io::sink()),
        };
        interp.gstate.device_mut().init();
        Ok(interp)
    }

    /// Redirects the output of the print operators (`=`, `==`).
    pub fn set_writer(&mut self, writer: Box<dyn Write>) {
        self.writer = writer;
    }

    pub(crate) fn writer_mut(&mut self) -> &mut dyn Write {
        self.writer.as_mut()
    }

    /// Queues a program source on the execution stack.
    pub fn push_program(&mut self, data: &[u8]) {
        let file = FileRef::new(PsSource::from_bytes(data));
        self.exec_stack.push(PsObject::File(file));
    }

    /// Executes until the execution stack empties. Language-level errors
    /// propagate out of here to the driver boundary.
    pub fn run(&mut self) -> Result<()> {
        while !self.exec_stack.is_empty() {
            if let Some(obj) = self.exec_stack.next_token(&mut self.vm)? {
                self.execute_object(obj, false)?;
            }
        }
        Ok(())
    }

    /// Tokenizes and executes a complete source.
    pub fn run_source(&mut self, data: &[u8]) -> Result<()> {
        self.push_program(data);
        self.run()
    }

    /// Executes one object.
    ///
    /// `indirect` distinguishes how the object was reached: a procedure
    /// encountered directly by the loop is data (pushed on the operand
    /// stack); one reached through name resolution or `exec` runs.
    pub fn execute_object(&mut self, obj: PsObject, indirect: bool) -> Result<()> {
        match obj {
            PsObject::Name(ref name) if !name.literal => {
                let value = self
                    .dict_stack
                    .lookup(&self.vm, &name.name)?
                    .ok_or_else(|| PsError::Undefined(name.name.to_string()))?;
                match value {
                    PsObject::Operator(op) => (op.func)(self),
                    other if other.is_executable() => self.execute_object(other, true),
                    other => {
                        self.op_stack.push(other);
                        Ok(())
                    }
                }
            }
            PsObject::Operator(op) => (op.func)(self),
            PsObject::Array(r) if !r.literal => {
                if indirect {
                    self.exec_stack.push(obj);
                } else {
                    self.op_stack.push(obj);
                }
                Ok(())
            }
            PsObject::File(_) if indirect => {
                self.exec_stack.push(obj);
                Ok(())
            }
            other => {
                self.op_stack.push(other);
                Ok(())
            }
        }
    }

    /// Invokes a built-in by name, bypassing the dictionary stack. The
    /// two-letter relational operators delegate to their primitive pair
    /// through this, which keeps edge-case behavior identical across the
    /// family.
    pub fn execute_operator(&mut self, name: &str) -> Result<()> {
        let op = self
            .registry
            .get(name)
            .ok_or_else(|| PsError::Undefined(name.to_string()))?;
        (op.func)(self)
    }

    /// User space to device space through the current CTM.
    pub(crate) fn transform_point(&self, p: Point) -> Point {
        apply_matrix_pt(self.gstate.current().ctm, p)
    }

    /// Device space back to user space.
    pub(crate) fn itransform_point(&self, p: Point) -> std::result::Result<Point, PsError> {
        itransform_pt(self.gstate.current().ctm, p)
    }

    /// Byte position of the topmost file on the execution stack; this is
    /// where tokenization had advanced to when an error surfaced.
    pub fn error_position(&self) -> Option<usize> {
        self.exec_stack
            .topmost_file()
            .map(|f| f.0.borrow().tell())
    }

    /// Tells the device interpretation is over.
    pub fn finish_device(&mut self) {
        self.gstate.device_mut().finish();
    }
}
