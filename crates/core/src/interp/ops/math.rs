//! Arithmetic and mathematical operators.
//!
//! Handles: add, sub, mul, div, idiv, mod, neg, abs, round, truncate,
//! floor, ceiling, sqrt, sin, cos, atan, exp, ln, log, cvi, cvr
//!
//! Integer operations stay integral; overflow promotes to real, the way
//! the reference language defines it.

use crate::error::{PsError, Result};
use crate::interp::interpreter::Interpreter;
use crate::interp::registry::Registry;
use crate::model::object::PsObject;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("add", Interpreter::op_add);
    registry.insert("sub", Interpreter::op_sub);
    registry.insert("mul", Interpreter::op_mul);
    registry.insert("div", Interpreter::op_div);
    registry.insert("idiv", Interpreter::op_idiv);
    registry.insert("mod", Interpreter::op_mod);
    registry.insert("neg", Interpreter::op_neg);
    registry.insert("abs", Interpreter::op_abs);
    registry.insert("round", Interpreter::op_round);
    registry.insert("truncate", Interpreter::op_truncate);
    registry.insert("floor", Interpreter::op_floor);
    registry.insert("ceiling", Interpreter::op_ceiling);
    registry.insert("sqrt", Interpreter::op_sqrt);
    registry.insert("sin", Interpreter::op_sin);
    registry.insert("cos", Interpreter::op_cos);
    registry.insert("atan", Interpreter::op_atan);
    registry.insert("exp", Interpreter::op_exp);
    registry.insert("ln", Interpreter::op_ln);
    registry.insert("log", Interpreter::op_log);
    registry.insert("cvi", Interpreter::op_cvi);
    registry.insert("cvr", Interpreter::op_cvr);
}

impl Interpreter {
    /// Pops two numeric operands; returns (first, second) in operand order.
    fn pop_num_pair(&mut self) -> Result<(PsObject, PsObject)> {
        let b = self.op_stack.pop()?;
        let a = self.op_stack.pop()?;
        if !a.is_number() || !b.is_number() {
            return Err(PsError::TypeCheck.into());
        }
        Ok((a, b))
    }

    fn push_arith(
        &mut self,
        a: &PsObject,
        b: &PsObject,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        real_op: impl Fn(f64, f64) -> f64,
    ) -> Result<()> {
        let result = match (a, b) {
            (PsObject::Integer(x), PsObject::Integer(y)) => match int_op(*x, *y) {
                Some(n) => PsObject::Integer(n),
                None => PsObject::Real(real_op(*x as f64, *y as f64)),
            },
            _ => PsObject::Real(real_op(a.as_real()?, b.as_real()?)),
        };
        self.op_stack.push(result);
        Ok(())
    }

    pub(crate) fn op_add(&mut self) -> Result<()> {
        let (a, b) = self.pop_num_pair()?;
        self.push_arith(&a, &b, i64::checked_add, |x, y| x + y)
    }

    pub(crate) fn op_sub(&mut self) -> Result<()> {
        let (a, b) = self.pop_num_pair()?;
        self.push_arith(&a, &b, i64::checked_sub, |x, y| x - y)
    }

    pub(crate) fn op_mul(&mut self) -> Result<()> {
        let (a, b) = self.pop_num_pair()?;
        self.push_arith(&a, &b, i64::checked_mul, |x, y| x * y)
    }

    pub(crate) fn op_div(&mut self) -> Result<()> {
        let (a, b) = self.pop_num_pair()?;
        let divisor = b.as_real()?;
        if divisor == 0.0 {
            return Err(PsError::UndefinedResult.into());
        }
        self.op_stack.push(PsObject::Real(a.as_real()? / divisor));
        Ok(())
    }

    pub(crate) fn op_idiv(&mut self) -> Result<()> {
        let b = self.op_stack.pop_int()?;
        let a = self.op_stack.pop_int()?;
        let n = a.checked_div(b).ok_or(PsError::UndefinedResult)?;
        self.op_stack.push(PsObject::Integer(n));
        Ok(())
    }

    pub(crate) fn op_mod(&mut self) -> Result<()> {
        let b = self.op_stack.pop_int()?;
        let a = self.op_stack.pop_int()?;
        let n = a.checked_rem(b).ok_or(PsError::UndefinedResult)?;
        self.op_stack.push(PsObject::Integer(n));
        Ok(())
    }

    pub(crate) fn op_neg(&mut self) -> Result<()> {
        let result = match self.op_stack.pop()? {
            PsObject::Integer(n) => match n.checked_neg() {
                Some(m) => PsObject::Integer(m),
                None => PsObject::Real(-(n as f64)),
            },
            PsObject::Real(r) => PsObject::Real(-r),
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(result);
        Ok(())
    }

    pub(crate) fn op_abs(&mut self) -> Result<()> {
        let result = match self.op_stack.pop()? {
            PsObject::Integer(n) => match n.checked_abs() {
                Some(m) => PsObject::Integer(m),
                None => PsObject::Real((n as f64).abs()),
            },
            PsObject::Real(r) => PsObject::Real(r.abs()),
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(result);
        Ok(())
    }

    fn push_rounded(&mut self, round: impl Fn(f64) -> f64) -> Result<()> {
        let result = match self.op_stack.pop()? {
            obj @ PsObject::Integer(_) => obj,
            PsObject::Real(r) => PsObject::Real(round(r)),
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(result);
        Ok(())
    }

    pub(crate) fn op_round(&mut self) -> Result<()> {
        self.push_rounded(f64::round)
    }

    pub(crate) fn op_truncate(&mut self) -> Result<()> {
        self.push_rounded(f64::trunc)
    }

    pub(crate) fn op_floor(&mut self) -> Result<()> {
        self.push_rounded(f64::floor)
    }

    pub(crate) fn op_ceiling(&mut self) -> Result<()> {
        self.push_rounded(f64::ceil)
    }

    pub(crate) fn op_sqrt(&mut self) -> Result<()> {
        let x = self.op_stack.pop_real()?;
        if x < 0.0 {
            return Err(PsError::RangeCheck.into());
        }
        self.op_stack.push(PsObject::Real(x.sqrt()));
        Ok(())
    }

    pub(crate) fn op_sin(&mut self) -> Result<()> {
        let degrees = self.op_stack.pop_real()?;
        self.op_stack.push(PsObject::Real(degrees.to_radians().sin()));
        Ok(())
    }

    pub(crate) fn op_cos(&mut self) -> Result<()> {
        let degrees = self.op_stack.pop_real()?;
        self.op_stack.push(PsObject::Real(degrees.to_radians().cos()));
        Ok(())
    }

    /// `num den atan` - angle in degrees, 0 to 360.
    pub(crate) fn op_atan(&mut self) -> Result<()> {
        let den = self.op_stack.pop_real()?;
        let num = self.op_stack.pop_real()?;
        if num == 0.0 && den == 0.0 {
            return Err(PsError::UndefinedResult.into());
        }
        let mut degrees = num.atan2(den).to_degrees();
        if degrees < 0.0 {
            degrees += 360.0;
        }
        self.op_stack.push(PsObject::Real(degrees));
        Ok(())
    }

    /// `base exponent exp`.
    pub(crate) fn op_exp(&mut self) -> Result<()> {
        let exponent = self.op_stack.pop_real()?;
        let base = self.op_stack.pop_real()?;
        let result = base.powf(exponent);
        if result.is_nan() {
            return Err(PsError::UndefinedResult.into());
        }
        self.op_stack.push(PsObject::Real(result));
        Ok(())
    }

    pub(crate) fn op_ln(&mut self) -> Result<()> {
        let x = self.op_stack.pop_real()?;
        if x <= 0.0 {
            return Err(PsError::RangeCheck.into());
        }
        self.op_stack.push(PsObject::Real(x.ln()));
        Ok(())
    }

    pub(crate) fn op_log(&mut self) -> Result<()> {
        let x = self.op_stack.pop_real()?;
        if x <= 0.0 {
            return Err(PsError::RangeCheck.into());
        }
        self.op_stack.push(PsObject::Real(x.log10()));
        Ok(())
    }

    pub(crate) fn op_cvi(&mut self) -> Result<()> {
        let value = match self.op_stack.pop()? {
            obj @ PsObject::Integer(_) => obj,
            PsObject::Real(r) => {
                let t = r.trunc();
                if t < i64::MIN as f64 || t > i64::MAX as f64 {
                    return Err(PsError::RangeCheck.into());
                }
                PsObject::Integer(t as i64)
            }
            PsObject::String(s) => {
                let text = String::from_utf8_lossy(self.vm.string(s)?).into_owned();
                let text = text.trim().to_string();
                if let Ok(n) = text.parse::<i64>() {
                    PsObject::Integer(n)
                } else if let Ok(r) = text.parse::<f64>() {
                    PsObject::Integer(r.trunc() as i64)
                } else {
                    return Err(PsError::TypeCheck.into());
                }
            }
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(value);
        Ok(())
    }

    pub(crate) fn op_cvr(&mut self) -> Result<()> {
        let value = match self.op_stack.pop()? {
            PsObject::Integer(n) => PsObject::Real(n as f64),
            obj @ PsObject::Real(_) => obj,
            PsObject::String(s) => {
                let text = String::from_utf8_lossy(self.vm.string(s)?).into_owned();
                match text.trim().parse::<f64>() {
                    Ok(r) => PsObject::Real(r),
                    Err(_) => return Err(PsError::TypeCheck.into()),
                }
            }
            _ => return Err(PsError::TypeCheck.into()),
        };
        self.op_stack.push(value);
        Ok(())
    }
}
