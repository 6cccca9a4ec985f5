//! Graphics model: path geometry, graphics state, output devices.

pub mod device;
pub mod gstate;
pub mod path;

pub use device::{CacheData, CacheDevice, DeviceCall, NullDevice, OutputDevice};
pub use gstate::{Discipline, GraphicsState, GstateStack, Restored};
pub use path::{Path, PathSection};
