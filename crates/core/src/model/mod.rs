//! Object model and virtual memory.

pub mod object;
pub mod vm;

pub use object::{ArrayRef, DictRef, FileRef, Name, PsObject, SaveRef, StringRef};
pub use vm::{CloneKey, CloneMap, Vm};
