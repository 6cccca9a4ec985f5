//! Built-in operator implementations, grouped by category.
//!
//! Each module contributes an `impl Interpreter` block with the behaviors
//! and a `register` function that enters them into the dispatch table.

pub mod composite;
pub mod control;
pub mod dict;
pub mod math;
pub mod matrix;
pub mod misc;
pub mod path;
pub mod relational;
pub mod stack;
pub mod vmops;

use crate::interp::registry::Registry;

/// Populates the registry with the standard operator set.
pub fn register_all(registry: &mut Registry) {
    stack::register(registry);
    math::register(registry);
    relational::register(registry);
    control::register(registry);
    dict::register(registry);
    composite::register(registry);
    vmops::register(registry);
    path::register(registry);
    matrix::register(registry);
    misc::register(registry);
}
