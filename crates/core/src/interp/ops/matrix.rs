//! Matrix and coordinate-system operators.
//!
//! Handles: matrix, identmatrix, currentmatrix, setmatrix, concat,
//! translate, scale, rotate, transform, itransform, dtransform,
//! idtransform, invertmatrix
//!
//! translate/scale/rotate come in two forms: bare operands modify the CTM;
//! with a matrix operand they fill and return that matrix instead.

use crate::error::{PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::{ArrayRef, PsObject};
use crate::model::vm::Vm;
use crate::utils::{
    apply_matrix_norm, apply_matrix_pt, invert_matrix, mult_matrix, rotation_matrix,
    scaling_matrix, translation_matrix, Matrix, MATRIX_IDENTITY,
};

pub(super) fn register(registry: &mut Registry) {
    registry.insert("matrix", Interpreter::op_matrix);
    registry.insert("identmatrix", Interpreter::op_identmatrix);
    registry.insert("currentmatrix", Interpreter::op_currentmatrix);
    registry.insert("setmatrix", Interpreter::op_setmatrix);
    registry.insert("concat", Interpreter::op_concat);
    registry.insert("translate", Interpreter::op_translate);
    registry.insert("scale", Interpreter::op_scale);
    registry.insert("rotate", Interpreter::op_rotate);
    registry.insert("transform", Interpreter::op_transform);
    registry.insert("itransform", Interpreter::op_itransform);
    registry.insert("dtransform", Interpreter::op_dtransform);
    registry.insert("idtransform", Interpreter::op_idtransform);
    registry.insert("invertmatrix", Interpreter::op_invertmatrix);
}

/// Reads a 6-element numeric array as a matrix.
fn matrix_from(vm: &Vm, r: ArrayRef) -> Result<Matrix> {
    if r.len != 6 {
        return Err(PsError::RangeCheck.into());
    }
    let items = vm.array(r)?;
    Ok((
        items[0].as_real()?,
        items[1].as_real()?,
        items[2].as_real()?,
        items[3].as_real()?,
        items[4].as_real()?,
        items[5].as_real()?,
    ))
}

/// Writes a matrix into a 6-element array.
fn matrix_into(vm: &mut Vm, r: ArrayRef, m: Matrix) -> Result<()> {
    if r.len != 6 {
        return Err(PsError::RangeCheck.into());
    }
    let values = [m.0, m.1, m.2, m.3, m.4, m.5];
    for (i, value) in values.into_iter().enumerate() {
        vm.array_put(r, i, PsObject::Real(value))?;
    }
    Ok(())
}

impl Interpreter {
    pub(crate) fn op_matrix(&mut self) -> Result<()> {
        let values = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
            .into_iter()
            .map(PsObject::Real)
            .collect();
        let r = self.vm.alloc_array(values);
        self.op_stack.push(PsObject::Array(r));
        Ok(())
    }

    pub(crate) fn op_identmatrix(&mut self) -> Result<()> {
        let r = self.op_stack.pop_array()?;
        matrix_into(&mut self.vm, r, MATRIX_IDENTITY)?;
        self.op_stack.push(PsObject::Array(r));
        Ok(())
    }

    pub(crate) fn op_currentmatrix(&mut self) -> Result<()> {
        let r = self.op_stack.pop_array()?;
        let ctm = self.gstate.current().ctm;
        matrix_into(&mut self.vm, r, ctm)?;
        self.op_stack.push(PsObject::Array(r));
        Ok(())
    }

    pub(crate) fn op_setmatrix(&mut self) -> Result<()> {
        let r = self.op_stack.pop_array()?;
        let m = matrix_from(&self.vm, r)?;
        self.gstate.current_mut().ctm = m;
        Ok(())
    }

    pub(crate) fn op_concat(&mut self) -> Result<()> {
        let r = self.op_stack.pop_array()?;
        let m = matrix_from(&self.vm, r)?;
        let gs = self.gstate.current_mut();
        gs.ctm = mult_matrix(m, gs.ctm);
        Ok(())
    }

    /// Shared implementation of the two-form coordinate operators: `build`
    /// turns the numeric operands into a transformation matrix.
    fn coord_op(&mut self, arity: usize, build: impl Fn(&[f64]) -> Matrix) -> Result<()> {
        let matrix_operand = matches!(self.op_stack.peek()?, PsObject::Array(_));
        let target = if matrix_operand {
            Some(self.op_stack.pop_array()?)
        } else {
            None
        };
        let mut args = vec![0.0; arity];
        for i in (0..arity).rev() {
            args[i] = self.op_stack.pop_real()?;
        }
        let m = build(&args);
        match target {
            Some(r) => {
                matrix_into(&mut self.vm, r, m)?;
                self.op_stack.push(PsObject::Array(r));
            }
            None => {
                let gs = self.gstate.current_mut();
                gs.ctm = mult_matrix(m, gs.ctm);
            }
        }
        Ok(())
    }

    pub(crate) fn op_translate(&mut self) -> Result<()> {
        self.coord_op(2, |args| translation_matrix(args[0], args[1]))
    }

    pub(crate) fn op_scale(&mut self) -> Result<()> {
        self.coord_op(2, |args| scaling_matrix(args[0], args[1]))
    }

    pub(crate) fn op_rotate(&mut self) -> Result<()> {
        self.coord_op(1, |args| rotation_matrix(args[0]))
    }

    /// Shared implementation of the point-transform operators. With a
    /// matrix operand the given matrix applies; otherwise the CTM does.
    fn transform_op(
        &mut self,
        apply: impl Fn(Matrix, (f64, f64)) -> Result<(f64, f64)>,
    ) -> Result<()> {
        let matrix_operand = matches!(self.op_stack.peek()?, PsObject::Array(_));
        let m = if matrix_operand {
            let r = self.op_stack.pop_array()?;
            matrix_from(&self.vm, r)?
        } else {
            self.gstate.current().ctm
        };
        let y = self.op_stack.pop_real()?;
        let x = self.op_stack.pop_real()?;
        let (tx, ty) = apply(m, (x, y))?;
        self.op_stack.push(PsObject::Real(tx));
        self.op_stack.push(PsObject::Real(ty));
        Ok(())
    }

    pub(crate) fn op_transform(&mut self) -> Result<()> {
        self.transform_op(|m, p| Ok(apply_matrix_pt(m, p)))
    }

    pub(crate) fn op_itransform(&mut self) -> Result<()> {
        self.transform_op(|m, p| Ok(apply_matrix_pt(invert_matrix(m)?, p)))
    }

    pub(crate) fn op_dtransform(&mut self) -> Result<()> {
        self.transform_op(|m, p| Ok(apply_matrix_norm(m, p)))
    }

    pub(crate) fn op_idtransform(&mut self) -> Result<()> {
        self.transform_op(|m, p| Ok(apply_matrix_norm(invert_matrix(m)?, p)))
    }

    /// `matrix1 matrix2 invertmatrix`: fills matrix2 with the inverse of
    /// matrix1.
    pub(crate) fn op_invertmatrix(&mut self) -> Result<()> {
        let dest = self.op_stack.pop_array()?;
        let src = self.op_stack.pop_array()?;
        let m = matrix_from(&self.vm, src)?;
        matrix_into(&mut self.vm, dest, invert_matrix(m)?)?;
        self.op_stack.push(PsObject::Array(dest));
        Ok(())
    }
}
