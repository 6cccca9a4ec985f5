//! PostScript function dictionaries: exponential (type 2) and stitching
//! (type 3) functions with domain/range clipping.
//!
//! Sampled (type 0) functions are recognized and rejected as unregistered;
//! they must never be silently approximated.

use crate::error::PsError;
use crate::model::object::{DictRef, PsObject};
use crate::model::vm::Vm;
use itertools::Itertools;
use smallvec::SmallVec;

/// Output buffer; functions in the wild rarely exceed four components.
pub type Outputs = SmallVec<[f64; 4]>;

#[derive(Debug, Clone)]
enum FunctionKind {
    /// `output_i = C0_i + x^N * (C1_i - C0_i)`
    Exponential {
        c0: Vec<f64>,
        c1: Vec<f64>,
        n: f64,
    },
    /// Selects a sub-function by the Bounds partition and remaps the input
    /// into its Encode interval.
    Stitching {
        functions: Vec<PsFunction>,
        bounds: Vec<f64>,
        encode: Vec<f64>,
    },
}

/// An evaluatable PostScript function.
#[derive(Debug, Clone)]
pub struct PsFunction {
    /// Interleaved min/max pairs, one pair per input.
    domain: Vec<f64>,
    /// Interleaved min/max pairs, one pair per output; empty when the
    /// dictionary declared no Range (outputs pass through unclipped).
    range: Vec<f64>,
    kind: FunctionKind,
}

impl PsFunction {
    /// Builds a function from a function dictionary object.
    pub fn from_object(vm: &Vm, obj: &PsObject) -> Result<Self, PsError> {
        let dict = obj.as_dict()?;
        Self::from_dict(vm, dict)
    }

    fn from_dict(vm: &Vm, dict: DictRef) -> Result<Self, PsError> {
        let type_obj = vm
            .dict_get(dict, "FunctionType")?
            .ok_or(PsError::RangeCheck)?;
        match type_obj.as_int()? {
            0 => Err(PsError::Unregistered("FunctionType 0".into())),
            2 => Self::exponential_from_dict(vm, dict),
            3 => Self::stitching_from_dict(vm, dict),
            _ => Err(PsError::RangeCheck),
        }
    }

    fn common_entries(vm: &Vm, dict: DictRef) -> Result<(Vec<f64>, Vec<f64>), PsError> {
        let domain = match vm.dict_get(dict, "Domain")? {
            Some(obj) => number_array(vm, &obj)?,
            None => return Err(PsError::Undefined("Domain".into())),
        };
        if domain.len() % 2 != 0 || domain.is_empty() {
            return Err(PsError::RangeCheck);
        }
        let range = match vm.dict_get(dict, "Range")? {
            Some(obj) => {
                let range = number_array(vm, &obj)?;
                if range.len() % 2 != 0 {
                    return Err(PsError::RangeCheck);
                }
                range
            }
            None => Vec::new(),
        };
        Ok((domain, range))
    }

    fn exponential_from_dict(vm: &Vm, dict: DictRef) -> Result<Self, PsError> {
        let (domain, range) = Self::common_entries(vm, dict)?;
        let n = match vm.dict_get(dict, "N")? {
            Some(obj) => obj.as_real()?,
            None => return Err(PsError::Undefined("N".into())),
        };
        let c0 = match vm.dict_get(dict, "C0")? {
            Some(obj) => number_array(vm, &obj)?,
            None => vec![0.0],
        };
        let c1 = match vm.dict_get(dict, "C1")? {
            Some(obj) => number_array(vm, &obj)?,
            None => vec![1.0],
        };
        if c0.len() != c1.len() || c0.is_empty() {
            return Err(PsError::RangeCheck);
        }
        Ok(Self {
            domain,
            range,
            kind: FunctionKind::Exponential { c0, c1, n },
        })
    }

    fn stitching_from_dict(vm: &Vm, dict: DictRef) -> Result<Self, PsError> {
        let (domain, range) = Self::common_entries(vm, dict)?;
        let funcs_obj = vm
            .dict_get(dict, "Functions")?
            .ok_or_else(|| PsError::Undefined("Functions".into()))?;
        let funcs_ref = funcs_obj.as_array()?;
        let k = funcs_ref.len;
        if k == 0 {
            return Err(PsError::RangeCheck);
        }
        let mut functions = Vec::with_capacity(k);
        for i in 0..k {
            let sub = vm.array_get(funcs_ref, i)?;
            functions.push(Self::from_object(vm, &sub)?);
        }

        let bounds = match vm.dict_get(dict, "Bounds")? {
            Some(obj) => number_array(vm, &obj)?,
            None => return Err(PsError::Undefined("Bounds".into())),
        };
        let encode = match vm.dict_get(dict, "Encode")? {
            Some(obj) => number_array(vm, &obj)?,
            None => return Err(PsError::Undefined("Encode".into())),
        };
        if bounds.len() != k - 1 || encode.len() != 2 * k {
            return Err(PsError::RangeCheck);
        }
        Ok(Self {
            domain,
            range,
            kind: FunctionKind::Stitching {
                functions,
                bounds,
                encode,
            },
        })
    }

    pub fn n_inputs(&self) -> usize {
        self.domain.len() / 2
    }

    /// Evaluates the function. The input count must match the domain
    /// (rangecheck otherwise); inputs are clipped to their domain interval
    /// and, when a Range was declared, outputs to their range interval.
    pub fn evaluate(&self, input: &[f64]) -> Result<Outputs, PsError> {
        if input.len() != self.n_inputs() {
            return Err(PsError::RangeCheck);
        }
        let mut clipped: SmallVec<[f64; 2]> = SmallVec::with_capacity(input.len());
        for ((&lo, &hi), &value) in self.domain.iter().tuples().zip(input) {
            clipped.push(value.clamp(lo, hi));
        }

        let mut output = match &self.kind {
            FunctionKind::Exponential { c0, c1, n } => {
                let x = clipped[0];
                c0.iter()
                    .zip(c1)
                    .map(|(&lo, &hi)| lo + x.powf(*n) * (hi - lo))
                    .collect::<Outputs>()
            }
            FunctionKind::Stitching {
                functions,
                bounds,
                encode,
            } => {
                let x = clipped[0];
                let k = functions.len();
                // Subdomain i owns its lower bound: an input exactly at
                // Bounds[j] selects sub-function j+1. The last subdomain
                // includes its upper endpoint.
                let i = bounds
                    .iter()
                    .position(|&b| x < b)
                    .unwrap_or(k - 1);
                let lo = if i == 0 { self.domain[0] } else { bounds[i - 1] };
                let hi = if i == k - 1 {
                    self.domain[1]
                } else {
                    bounds[i]
                };
                let e0 = encode[2 * i];
                let e1 = encode[2 * i + 1];
                let remapped = if hi == lo {
                    e0
                } else {
                    e0 + (x - lo) * (e1 - e0) / (hi - lo)
                };
                functions[i].evaluate(&[remapped])?
            }
        };

        if !self.range.is_empty() {
            for (value, (&lo, &hi)) in output.iter_mut().zip(self.range.iter().tuples()) {
                *value = value.clamp(lo, hi);
            }
        }
        Ok(output)
    }
}

/// Reads an array object as a vector of numbers.
fn number_array(vm: &Vm, obj: &PsObject) -> Result<Vec<f64>, PsError> {
    let r = obj.as_array()?;
    vm.array(r)?.iter().map(|item| item.as_real()).collect()
}
