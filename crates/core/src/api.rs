//! One-call entry points for running a program against a device.

use crate::dsc::DscHeader;
use crate::error::Error;
use crate::graphics::device::OutputDevice;
use crate::interp::interpreter::Interpreter;

/// A failed run: the underlying error plus the byte position tokenization
/// had reached in the outermost source when it surfaced.
#[derive(Debug)]
pub struct RunError {
    pub error: Error,
    pub position: Option<usize>,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} (near byte {pos})", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A completed run: the interpreter (for inspecting final state) and the
/// DSC header fields scanned off the front of the document.
pub struct Session {
    pub interpreter: Interpreter,
    pub header: DscHeader,
}

/// Pre-scans the DSC header, runs the whole program, and finishes the
/// device. The device receives `finish` whether or not the run succeeded.
pub fn run_program(source: &[u8], device: Box<dyn OutputDevice>) -> Result<Session, RunError> {
    let header = DscHeader::scan(source);
    let mut interpreter = match Interpreter::new(device) {
        Ok(interp) => interp,
        Err(error) => {
            return Err(RunError {
                error,
                position: None,
            })
        }
    };
    interpreter.push_program(source);
    let outcome = interpreter.run();
    interpreter.finish_device();
    match outcome {
        Ok(()) => Ok(Session {
            interpreter,
            header,
        }),
        Err(error) => {
            let position = interpreter.error_position();
            Err(RunError { error, position })
        }
    }
}
