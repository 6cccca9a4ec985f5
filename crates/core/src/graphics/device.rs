//! Output devices: the rendering side of the interpreter.
//!
//! A device consumes path geometry in device coordinates (the CTM has
//! already been applied) plus scope notifications on gsave/grestore
//! boundaries. Concrete back ends live outside the core; the in-crate
//! implementations discard ([`NullDevice`]) or record ([`CacheDevice`])
//! what they are handed.

use crate::graphics::path::{Path, PathSection};
use crate::utils::Rect;
use std::cell::RefCell;
use std::rc::Rc;

/// Interface between the interpreter and a rendering back end.
///
/// Every method has a no-op default so a device only implements what it
/// cares about.
pub trait OutputDevice {
    /// Called once before interpretation starts.
    fn init(&mut self) {}

    /// Called once after interpretation ends.
    fn finish(&mut self) {}

    /// A nested graphics scope has begun (save/gsave).
    fn start_scope(&mut self) {}

    /// A nested graphics scope has ended (restore/grestore).
    fn end_scope(&mut self) {}

    fn moveto(&mut self, _x: f64, _y: f64) {}

    fn lineto(&mut self, _x: f64, _y: f64) {}

    fn curveto(&mut self, _x1: f64, _y1: f64, _x2: f64, _y2: f64, _x3: f64, _y3: f64) {}

    fn closepath(&mut self) {}

    /// Paint the handed-off path as a stroked outline.
    fn stroke(&mut self) {}

    /// Paint the handed-off path as a filled region.
    fn fill(&mut self, _even_odd: bool) {}
}

/// Replays a path into a device, section by section.
pub fn replay_path(path: &Path, device: &mut dyn OutputDevice) {
    for section in path.sections() {
        match section {
            PathSection::Moveto { x, y } => device.moveto(*x, *y),
            PathSection::Lineto { x, y } => device.lineto(*x, *y),
            PathSection::Curveto {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
            } => device.curveto(*x1, *y1, *x2, *y2, *x3, *y3),
            PathSection::Closepath { .. } => device.closepath(),
        }
    }
}

/// A device that discards everything.
#[derive(Debug, Default)]
pub struct NullDevice;

impl OutputDevice for NullDevice {}

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    StartScope,
    EndScope,
    Moveto(f64, f64),
    Lineto(f64, f64),
    Curveto(f64, f64, f64, f64, f64, f64),
    Closepath,
    Stroke,
    Fill { even_odd: bool },
}

/// Everything a [`CacheDevice`] saw.
#[derive(Debug, Default)]
pub struct CacheData {
    pub calls: Vec<DeviceCall>,
    pub bbox: Option<Rect>,
}

impl CacheData {
    fn touch(&mut self, x: f64, y: f64) {
        if x.is_nan() || y.is_nan() {
            return;
        }
        let bbox = self
            .bbox
            .get_or_insert((f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY));
        bbox.0 = bbox.0.min(x);
        bbox.1 = bbox.1.min(y);
        bbox.2 = bbox.2.max(x);
        bbox.3 = bbox.3.max(y);
    }
}

/// A device that records every call and accumulates the bounding box of all
/// touched coordinates. The data handle stays usable after the device has
/// been moved into an interpreter.
#[derive(Debug, Default)]
pub struct CacheDevice {
    data: Rc<RefCell<CacheData>>,
}

impl CacheDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded data.
    pub fn data(&self) -> Rc<RefCell<CacheData>> {
        Rc::clone(&self.data)
    }
}

impl OutputDevice for CacheDevice {
    fn start_scope(&mut self) {
        self.data.borrow_mut().calls.push(DeviceCall::StartScope);
    }

    fn end_scope(&mut self) {
        self.data.borrow_mut().calls.push(DeviceCall::EndScope);
    }

    fn moveto(&mut self, x: f64, y: f64) {
        let mut data = self.data.borrow_mut();
        data.touch(x, y);
        data.calls.push(DeviceCall::Moveto(x, y));
    }

    fn lineto(&mut self, x: f64, y: f64) {
        let mut data = self.data.borrow_mut();
        data.touch(x, y);
        data.calls.push(DeviceCall::Lineto(x, y));
    }

    fn curveto(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        let mut data = self.data.borrow_mut();
        data.touch(x1, y1);
        data.touch(x2, y2);
        data.touch(x3, y3);
        data.calls.push(DeviceCall::Curveto(x1, y1, x2, y2, x3, y3));
    }

    fn closepath(&mut self) {
        self.data.borrow_mut().calls.push(DeviceCall::Closepath);
    }

    fn stroke(&mut self) {
        self.data.borrow_mut().calls.push(DeviceCall::Stroke);
    }

    fn fill(&mut self, even_odd: bool) {
        self.data
            .borrow_mut()
            .calls
            .push(DeviceCall::Fill { even_odd });
    }
}
