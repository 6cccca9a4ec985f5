//! Interpreter, operator registry and operator implementations.

pub mod interpreter;
pub mod ops;
pub mod registry;

pub use interpreter::Interpreter;
pub use registry::{OpFn, OpKind, Operator, Registry};
