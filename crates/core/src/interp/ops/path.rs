//! Path construction, painting and line-styling operators.
//!
//! Handles: newpath, moveto, rmoveto, lineto, rlineto, curveto, rcurveto,
//! closepath, currentpoint, pathbbox, flattenpath, stroke, fill, eofill,
//! setlinewidth, currentlinewidth, setdash, currentdash, setflat,
//! currentflat
//!
//! Operands arrive in user space; the CTM is applied before sections are
//! appended, so the path itself is device-space geometry. Painting flattens
//! the path within the current flatness bound and replays it into the
//! output device.

use crate::error::{PsError, Result};
use crate::graphics::device::replay_path;
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::PsObject;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("newpath", Interpreter::op_newpath);
    registry.insert("moveto", Interpreter::op_moveto);
    registry.insert("rmoveto", Interpreter::op_rmoveto);
    registry.insert("lineto", Interpreter::op_lineto);
    registry.insert("rlineto", Interpreter::op_rlineto);
    registry.insert("curveto", Interpreter::op_curveto);
    registry.insert("rcurveto", Interpreter::op_rcurveto);
    registry.insert("closepath", Interpreter::op_closepath);
    registry.insert("currentpoint", Interpreter::op_currentpoint);
    registry.insert("pathbbox", Interpreter::op_pathbbox);
    registry.insert("flattenpath", Interpreter::op_flattenpath);
    registry.insert("stroke", Interpreter::op_stroke);
    registry.insert("fill", Interpreter::op_fill);
    registry.insert("eofill", Interpreter::op_eofill);
    registry.insert("setlinewidth", Interpreter::op_setlinewidth);
    registry.insert("currentlinewidth", Interpreter::op_currentlinewidth);
    registry.insert("setdash", Interpreter::op_setdash);
    registry.insert("currentdash", Interpreter::op_currentdash);
    registry.insert("setflat", Interpreter::op_setflat);
    registry.insert("currentflat", Interpreter::op_currentflat);
}

impl Interpreter {
    fn pop_point(&mut self) -> Result<(f64, f64)> {
        let y = self.op_stack.pop_real()?;
        let x = self.op_stack.pop_real()?;
        Ok((x, y))
    }

    fn current_position(&self) -> Result<(f64, f64)> {
        self.gstate
            .current()
            .position
            .ok_or_else(|| PsError::NoCurrentPoint.into())
    }

    pub(crate) fn op_newpath(&mut self) -> Result<()> {
        let gs = self.gstate.current_mut();
        gs.path.clear();
        gs.position = None;
        Ok(())
    }

    fn moveto(&mut self, x: f64, y: f64) {
        let device = self.transform_point((x, y));
        let gs = self.gstate.current_mut();
        gs.path.moveto(device.0, device.1);
        gs.position = Some((x, y));
    }

    pub(crate) fn op_moveto(&mut self) -> Result<()> {
        let (x, y) = self.pop_point()?;
        self.moveto(x, y);
        Ok(())
    }

    pub(crate) fn op_rmoveto(&mut self) -> Result<()> {
        let (dx, dy) = self.pop_point()?;
        let (x, y) = self.current_position()?;
        self.moveto(x + dx, y + dy);
        Ok(())
    }

    fn lineto(&mut self, x: f64, y: f64) {
        let device = self.transform_point((x, y));
        let gs = self.gstate.current_mut();
        gs.path.lineto(device.0, device.1);
        gs.position = Some((x, y));
    }

    pub(crate) fn op_lineto(&mut self) -> Result<()> {
        let (x, y) = self.pop_point()?;
        self.lineto(x, y);
        Ok(())
    }

    pub(crate) fn op_rlineto(&mut self) -> Result<()> {
        let (dx, dy) = self.pop_point()?;
        let (x, y) = self.current_position()?;
        self.lineto(x + dx, y + dy);
        Ok(())
    }

    fn curveto(&mut self, c1: (f64, f64), c2: (f64, f64), end: (f64, f64)) {
        let d1 = self.transform_point(c1);
        let d2 = self.transform_point(c2);
        let d3 = self.transform_point(end);
        let gs = self.gstate.current_mut();
        gs.path.curveto(d1, d2, d3);
        gs.position = Some(end);
    }

    pub(crate) fn op_curveto(&mut self) -> Result<()> {
        let end = self.pop_point()?;
        let c2 = self.pop_point()?;
        let c1 = self.pop_point()?;
        self.curveto(c1, c2, end);
        Ok(())
    }

    pub(crate) fn op_rcurveto(&mut self) -> Result<()> {
        let end = self.pop_point()?;
        let c2 = self.pop_point()?;
        let c1 = self.pop_point()?;
        let (x, y) = self.current_position()?;
        self.curveto(
            (x + c1.0, y + c1.1),
            (x + c2.0, y + c2.1),
            (x + end.0, y + end.1),
        );
        Ok(())
    }

    pub(crate) fn op_closepath(&mut self) -> Result<()> {
        let ctm = self.gstate.current().ctm;
        let gs = self.gstate.current_mut();
        if let Some(start) = gs.path.closepath(ctm)? {
            if !start.0.is_nan() && !start.1.is_nan() {
                gs.position = Some(start);
            }
        }
        Ok(())
    }

    pub(crate) fn op_currentpoint(&mut self) -> Result<()> {
        let (x, y) = self.current_position()?;
        self.op_stack.push(PsObject::Real(x));
        self.op_stack.push(PsObject::Real(y));
        Ok(())
    }

    /// `pathbbox`: the path bounding box, transformed back to user space.
    pub(crate) fn op_pathbbox(&mut self) -> Result<()> {
        let bbox = self.gstate.current().path.bbox()?;
        let ll = self.itransform_point((bbox.0, bbox.1))?;
        let ur = self.itransform_point((bbox.2, bbox.3))?;
        self.op_stack.push(PsObject::Real(ll.0));
        self.op_stack.push(PsObject::Real(ll.1));
        self.op_stack.push(PsObject::Real(ur.0));
        self.op_stack.push(PsObject::Real(ur.1));
        Ok(())
    }

    pub(crate) fn op_flattenpath(&mut self) -> Result<()> {
        let gs = self.gstate.current_mut();
        let max_error = gs.flatten_error();
        gs.path = gs.path.flatten(max_error);
        Ok(())
    }

    /// Flattens the current path, hands it to the device, finishes with the
    /// given paint call, and starts a new path.
    fn paint(&mut self, stroke: bool, even_odd: bool) -> Result<()> {
        let gs = self.gstate.current();
        let flat = gs.path.flatten(gs.flatten_error());
        let device = self.gstate.device_mut();
        replay_path(&flat, device);
        if stroke {
            device.stroke();
        } else {
            device.fill(even_odd);
        }
        self.op_newpath()
    }

    pub(crate) fn op_stroke(&mut self) -> Result<()> {
        self.paint(true, false)
    }

    pub(crate) fn op_fill(&mut self) -> Result<()> {
        self.paint(false, false)
    }

    pub(crate) fn op_eofill(&mut self) -> Result<()> {
        self.paint(false, true)
    }

    pub(crate) fn op_setlinewidth(&mut self) -> Result<()> {
        let width = self.op_stack.pop_real()?;
        self.gstate.current_mut().line_width = width;
        Ok(())
    }

    pub(crate) fn op_currentlinewidth(&mut self) -> Result<()> {
        let width = self.gstate.current().line_width;
        self.op_stack.push(PsObject::Real(width));
        Ok(())
    }

    /// `array offset setdash`. An empty array selects a solid line.
    pub(crate) fn op_setdash(&mut self) -> Result<()> {
        let offset = self.op_stack.pop_real()?;
        let pattern = self.op_stack.pop()?;
        let r = pattern.as_array()?;
        for i in 0..r.len {
            let value = self.vm.array_get(r, i)?.as_real()?;
            if value < 0.0 {
                return Err(PsError::RangeCheck.into());
            }
        }
        let gs = self.gstate.current_mut();
        gs.dash_pattern = if r.len == 0 { None } else { Some(pattern) };
        gs.dash_offset = offset;
        Ok(())
    }

    pub(crate) fn op_currentdash(&mut self) -> Result<()> {
        let pattern = match &self.gstate.current().dash_pattern {
            Some(obj) => obj.clone(),
            None => PsObject::Array(self.vm.alloc_array(Vec::new())),
        };
        let offset = self.gstate.current().dash_offset;
        self.op_stack.push(pattern);
        self.op_stack.push(PsObject::Real(offset));
        Ok(())
    }

    /// Flatness is clamped to the range the language defines.
    pub(crate) fn op_setflat(&mut self) -> Result<()> {
        let flatness = self.op_stack.pop_real()?.clamp(0.2, 100.0);
        self.gstate.current_mut().flatness = flatness;
        Ok(())
    }

    pub(crate) fn op_currentflat(&mut self) -> Result<()> {
        let flatness = self.gstate.current().flatness;
        self.op_stack.push(PsObject::Real(flatness));
        Ok(())
    }
}
