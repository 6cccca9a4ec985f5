//! Error types for the graver PostScript core.
//!
//! Two disjoint taxonomies exist. [`PsError`] is the recoverable,
//! language-level kind: an operator that underflows the operand stack or
//! looks up an unknown name raises one of these, and the driver boundary
//! reports it with the PostScript error name. [`ProgramError`] signals a
//! broken internal invariant; it is never caught by language-level recovery
//! and always halts.

use thiserror::Error;

/// Language-level PostScript error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PsError {
    #[error("typecheck")]
    TypeCheck,

    #[error("rangecheck")]
    RangeCheck,

    #[error("undefined: {0}")]
    Undefined(String),

    #[error("stackunderflow")]
    StackUnderflow,

    #[error("VMerror: {0}")]
    VmError(String),

    #[error("unregistered: {0}")]
    Unregistered(String),

    #[error("nocurrentpoint")]
    NoCurrentPoint,

    #[error("syntaxerror at byte {pos}: {msg}")]
    Syntax { pos: usize, msg: String },

    #[error("invalidaccess")]
    InvalidAccess,

    #[error("invalidexit")]
    InvalidExit,

    #[error("invalidrestore")]
    InvalidRestore,

    #[error("ioerror")]
    Io,

    #[error("undefinedresult")]
    UndefinedResult,
}

impl PsError {
    /// The PostScript error name, as it would appear in `errordict`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeCheck => "typecheck",
            Self::RangeCheck => "rangecheck",
            Self::Undefined(_) => "undefined",
            Self::StackUnderflow => "stackunderflow",
            Self::VmError(_) => "VMerror",
            Self::Unregistered(_) => "unregistered",
            Self::NoCurrentPoint => "nocurrentpoint",
            Self::Syntax { .. } => "syntaxerror",
            Self::InvalidAccess => "invalidaccess",
            Self::InvalidExit => "invalidexit",
            Self::InvalidRestore => "invalidrestore",
            Self::Io => "ioerror",
            Self::UndefinedResult => "undefinedresult",
        }
    }
}

/// Internal invariant violation. Always fatal.
#[derive(Error, Debug)]
#[error("program error: {0}")]
pub struct ProgramError(pub String);

impl ProgramError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Unified error type carried through interpreter plumbing.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Ps(#[from] PsError),

    #[error(transparent)]
    Program(#[from] ProgramError),
}

impl Error {
    /// The language-level error, if this is one.
    pub fn as_ps(&self) -> Option<&PsError> {
        match self {
            Self::Ps(e) => Some(e),
            Self::Program(_) => None,
        }
    }
}

/// Convenience Result type alias for the unified error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ps_error_names_match_errordict_keys() {
        assert_eq!(PsError::TypeCheck.name(), "typecheck");
        assert_eq!(PsError::Undefined("x".into()).name(), "undefined");
        assert_eq!(PsError::VmError("full".into()).name(), "VMerror");
        assert_eq!(
            PsError::Unregistered("FunctionType 0".into()).name(),
            "unregistered"
        );
    }

    #[test]
    fn program_errors_are_not_language_errors() {
        let err = Error::from(ProgramError::new("broken invariant"));
        assert!(err.as_ps().is_none());
    }
}
