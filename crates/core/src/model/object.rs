//! The PostScript object model.
//!
//! [`PsObject`] is the tagged union every stack and dictionary holds.
//! Scalars (integers, reals, booleans, marks, null) carry their value
//! inline. Composites (arrays, strings, dictionaries) carry a handle into
//! the virtual memory arena; copying the object copies the handle, so two
//! objects may alias the same backing storage. Array and string handles are
//! views (id, start, len), which makes `getinterval` and the execution
//! stack's "remainder of a partially consumed procedure" O(1) aliases.

use crate::error::PsError;
use crate::interp::registry::Operator;
use crate::parser::PsSource;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::rc::Rc;

/// A name object, literal (`/foo`) or executable (`foo`).
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub name: SmolStr,
    pub literal: bool,
}

impl Name {
    pub fn literal(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            literal: true,
        }
    }

    pub fn executable(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            literal: false,
        }
    }
}

/// Handle to an array stored in the VM: a view of `len` elements starting
/// at `start` within storage slot `id`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayRef {
    pub id: usize,
    pub start: usize,
    pub len: usize,
    /// Literal arrays are data; executable arrays are procedures.
    pub literal: bool,
}

/// Handle to a mutable byte string stored in the VM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringRef {
    pub id: usize,
    pub start: usize,
    pub len: usize,
}

/// Handle to a dictionary stored in the VM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DictRef {
    pub id: usize,
}

/// Handle to a VM checkpoint created by `save`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveRef {
    pub id: usize,
}

/// Handle to an open token source. Files live outside the VM arena; their
/// read position is not rolled back by `restore`.
#[derive(Clone)]
pub struct FileRef(pub Rc<RefCell<PsSource>>);

impl FileRef {
    pub fn new(source: PsSource) -> Self {
        Self(Rc::new(RefCell::new(source)))
    }
}

impl PartialEq for FileRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileRef(pos={})", self.0.borrow().tell())
    }
}

/// The PostScript value type.
#[derive(Debug, Clone, PartialEq)]
pub enum PsObject {
    /// Null object
    Null,
    /// Sentinel used for bracket matching
    Mark,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating point) value
    Real(f64),
    /// Name, literal or executable
    Name(Name),
    /// Built-in operator
    Operator(Operator),
    /// Mutable byte string (VM handle)
    String(StringRef),
    /// Array or procedure (VM handle)
    Array(ArrayRef),
    /// Dictionary (VM handle)
    Dict(DictRef),
    /// Open token source
    File(FileRef),
    /// VM checkpoint token produced by `save`
    Save(SaveRef),
}

impl PsObject {
    /// The canonical PostScript type name, as the `type` operator spells it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "nulltype",
            Self::Mark => "marktype",
            Self::Boolean(_) => "booleantype",
            Self::Integer(_) => "integertype",
            Self::Real(_) => "realtype",
            Self::Name(_) => "nametype",
            Self::Operator(_) => "operatortype",
            Self::String(_) => "stringtype",
            Self::Array(_) => "arraytype",
            Self::Dict(_) => "dicttype",
            Self::File(_) => "filetype",
            Self::Save(_) => "savetype",
        }
    }

    pub fn as_int(&self) -> Result<i64, PsError> {
        match self {
            Self::Integer(n) => Ok(*n),
            _ => Err(PsError::TypeCheck),
        }
    }

    /// Numeric value with int-to-real coercion.
    pub fn as_real(&self) -> Result<f64, PsError> {
        match self {
            Self::Integer(n) => Ok(*n as f64),
            Self::Real(r) => Ok(*r),
            _ => Err(PsError::TypeCheck),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Real(_))
    }

    pub fn as_bool(&self) -> Result<bool, PsError> {
        match self {
            Self::Boolean(b) => Ok(*b),
            _ => Err(PsError::TypeCheck),
        }
    }

    pub fn as_name(&self) -> Result<&Name, PsError> {
        match self {
            Self::Name(n) => Ok(n),
            _ => Err(PsError::TypeCheck),
        }
    }

    pub fn as_array(&self) -> Result<ArrayRef, PsError> {
        match self {
            Self::Array(r) => Ok(*r),
            _ => Err(PsError::TypeCheck),
        }
    }

    /// An executable array, i.e. a procedure body.
    pub fn as_proc(&self) -> Result<ArrayRef, PsError> {
        match self {
            Self::Array(r) if !r.literal => Ok(*r),
            _ => Err(PsError::TypeCheck),
        }
    }

    pub fn as_string(&self) -> Result<StringRef, PsError> {
        match self {
            Self::String(r) => Ok(*r),
            _ => Err(PsError::TypeCheck),
        }
    }

    pub fn as_dict(&self) -> Result<DictRef, PsError> {
        match self {
            Self::Dict(r) => Ok(*r),
            _ => Err(PsError::TypeCheck),
        }
    }

    pub fn as_save(&self) -> Result<SaveRef, PsError> {
        match self {
            Self::Save(r) => Ok(*r),
            _ => Err(PsError::TypeCheck),
        }
    }

    pub fn as_file(&self) -> Result<&FileRef, PsError> {
        match self {
            Self::File(f) => Ok(f),
            _ => Err(PsError::TypeCheck),
        }
    }

    /// Whether this object executes when encountered indirectly.
    pub fn is_executable(&self) -> bool {
        match self {
            Self::Name(n) => !n.literal,
            Self::Array(r) => !r.literal,
            Self::Operator(_) | Self::File(_) => true,
            _ => false,
        }
    }

    /// `cvx` - make the object executable.
    pub fn cvx(self) -> Self {
        match self {
            Self::Name(n) => Self::Name(Name {
                literal: false,
                ..n
            }),
            Self::Array(r) => Self::Array(ArrayRef {
                literal: false,
                ..r
            }),
            other => other,
        }
    }

    /// `cvlit` - make the object literal.
    pub fn cvlit(self) -> Self {
        match self {
            Self::Name(n) => Self::Name(Name { literal: true, ..n }),
            Self::Array(r) => Self::Array(ArrayRef { literal: true, ..r }),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        assert_eq!(PsObject::Integer(3).as_real(), Ok(3.0));
        assert_eq!(PsObject::Real(2.5).as_real(), Ok(2.5));
        assert_eq!(PsObject::Boolean(true).as_real(), Err(PsError::TypeCheck));
        assert_eq!(PsObject::Real(2.5).as_int(), Err(PsError::TypeCheck));
    }

    #[test]
    fn executability_follows_literal_flag() {
        let lit = PsObject::Name(Name::literal("x"));
        let exe = lit.clone().cvx();
        assert!(!lit.is_executable());
        assert!(exe.is_executable());
        assert_eq!(exe.cvlit(), lit);
    }
}
