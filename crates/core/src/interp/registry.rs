//! Operator dispatch registry.
//!
//! A name-to-behavior table populated once at interpreter startup and never
//! mutated afterwards. Each behavior is a plain function over the
//! interpreter context. Lookup is by exact string match; an unknown name is
//! an undefined condition raised by the interpreter loop, not here.

use crate::error::Result;
use crate::interp::interpreter::Interpreter;
use rustc_hash::FxHashMap;

/// A built-in operator behavior.
pub type OpFn = fn(&mut Interpreter) -> Result<()>;

/// Distinguishes ordinary operators from the internal continuation
/// operators the control-flow family plants on the execution stack; `exit`
/// unwinds to the nearest continuation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Builtin,
    Continuation,
}

/// A built-in operator: a name bound to a behavior.
#[derive(Clone, Copy)]
pub struct Operator {
    pub name: &'static str,
    pub kind: OpKind,
    pub func: OpFn,
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && std::ptr::fn_addr_eq(self.func, other.func)
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--{}--", self.name)
    }
}

/// The operator table.
pub struct Registry {
    table: FxHashMap<&'static str, Operator>,
}

impl Registry {
    /// Builds the standard operator set.
    pub fn standard() -> Self {
        let mut registry = Self {
            table: FxHashMap::default(),
        };
        crate::interp::ops::register_all(&mut registry);
        registry
    }

    pub fn insert(&mut self, name: &'static str, func: OpFn) {
        self.table.insert(
            name,
            Operator {
                name,
                kind: OpKind::Builtin,
                func,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<Operator> {
        self.table.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operator> {
        self.table.values()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
