//! Dense typed n-dimensional arrays
//!
//! Every VectorL value is an [`Array`]: a type tag, a static shape and a
//! row-major buffer in the canonical dtype of the type. `time` and `real`
//! share `f64` storage.

use crate::error::{Error, Result};
use crate::types::{broadcast_shape, broadcastable_into, DType, Shape, Type};
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Boolean cell
    Bool(bool),
    /// Integer cell
    Int(i64),
    /// Floating cell (real or time)
    Real(f64),
}

impl Scalar {
    /// Truth value: nonzero is true
    pub fn as_bool(self) -> bool {
        match self {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Real(r) => r != 0.0,
        }
    }

    /// Integer value, truncating floats toward zero
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Bool(b) => b as i64,
            Scalar::Int(i) => i,
            Scalar::Real(r) => r as i64,
        }
    }

    /// Floating value
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Scalar::Int(i) => i as f64,
            Scalar::Real(r) => r,
        }
    }

    /// Converts to the storage form of `ty`
    pub fn cast(self, ty: Type) -> Scalar {
        match ty.dtype() {
            DType::Bool => Scalar::Bool(self.as_bool()),
            DType::Int64 => Scalar::Int(self.as_i64()),
            DType::Float64 => Scalar::Real(self.as_f64()),
        }
    }

    /// Smallest type whose storage holds this scalar
    pub fn natural_type(self) -> Type {
        match self {
            Scalar::Bool(_) => Type::Bool,
            Scalar::Int(_) => Type::Int,
            Scalar::Real(_) => Type::Real,
        }
    }
}

/// Row-major cell storage
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    /// `bool` cells
    Bool(Vec<bool>),
    /// `i64` cells
    Int(Vec<i64>),
    /// `f64` cells
    Real(Vec<f64>),
}

impl Buffer {
    fn len(&self) -> usize {
        match self {
            Buffer::Bool(v) => v.len(),
            Buffer::Int(v) => v.len(),
            Buffer::Real(v) => v.len(),
        }
    }

    fn with_capacity(dtype: DType, n: usize) -> Buffer {
        match dtype {
            DType::Bool => Buffer::Bool(Vec::with_capacity(n)),
            DType::Int64 => Buffer::Int(Vec::with_capacity(n)),
            DType::Float64 => Buffer::Real(Vec::with_capacity(n)),
        }
    }

    fn push(&mut self, s: Scalar) {
        match self {
            Buffer::Bool(v) => v.push(s.as_bool()),
            Buffer::Int(v) => v.push(s.as_i64()),
            Buffer::Real(v) => v.push(s.as_f64()),
        }
    }

    fn get(&self, i: usize) -> Scalar {
        match self {
            Buffer::Bool(v) => Scalar::Bool(v[i]),
            Buffer::Int(v) => Scalar::Int(v[i]),
            Buffer::Real(v) => Scalar::Real(v[i]),
        }
    }

    fn set(&mut self, i: usize, s: Scalar) {
        match self {
            Buffer::Bool(v) => v[i] = s.as_bool(),
            Buffer::Int(v) => v[i] = s.as_i64(),
            Buffer::Real(v) => v[i] = s.as_f64(),
        }
    }
}

/// Dense typed array
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    ty: Type,
    shape: Shape,
    data: Buffer,
}

impl Array {
    /// Builds an array from cells, converting each to `ty`
    pub fn from_scalars(ty: Type, shape: Shape, cells: impl IntoIterator<Item = Scalar>) -> Result<Array> {
        let mut data = Buffer::with_capacity(ty.dtype(), shape.size());
        for cell in cells {
            data.push(cell);
        }
        if data.len() != shape.size() {
            return Err(Error::shape(format!(
                "{} cells do not fill shape {}",
                data.len(),
                shape
            )));
        }
        Ok(Array { ty, shape, data })
    }

    /// Scalar array of type `ty`
    pub fn scalar(ty: Type, value: Scalar) -> Array {
        Array::filled(ty, Shape::scalar(), value)
    }

    /// Array of `shape` with every cell set to `value`
    pub fn filled(ty: Type, shape: Shape, value: Scalar) -> Array {
        let n = shape.size();
        let value = value.cast(ty);
        let data = match value {
            Scalar::Bool(b) => Buffer::Bool(vec![b; n]),
            Scalar::Int(i) => Buffer::Int(vec![i; n]),
            Scalar::Real(r) => Buffer::Real(vec![r; n]),
        };
        Array { ty, shape, data }
    }

    /// Zero-initialized array
    pub fn zeros(ty: Type, shape: Shape) -> Array {
        Array::filled(ty, shape, Scalar::Int(0))
    }

    /// Scalar bool
    pub fn bool(b: bool) -> Array {
        Array::scalar(Type::Bool, Scalar::Bool(b))
    }

    /// Scalar int
    pub fn int(i: i64) -> Array {
        Array::scalar(Type::Int, Scalar::Int(i))
    }

    /// Scalar real
    pub fn real(r: f64) -> Array {
        Array::scalar(Type::Real, Scalar::Real(r))
    }

    /// Scalar time
    pub fn time(t: f64) -> Array {
        Array::scalar(Type::Time, Scalar::Real(t))
    }

    /// One-dimensional int vector
    pub fn int_vector(values: Vec<i64>) -> Array {
        Array {
            ty: Type::Int,
            shape: Shape::vector(values.len()),
            data: Buffer::Int(values),
        }
    }

    /// Element type
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Static shape
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the array has no cells
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Cell at a flat row-major offset
    pub fn get(&self, flat: usize) -> Scalar {
        self.data.get(flat)
    }

    /// Overwrites the cell at a flat offset, converting to the array type
    pub fn set(&mut self, flat: usize, value: Scalar) {
        self.data.set(flat, value);
    }

    /// All cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).map(move |i| self.data.get(i))
    }

    /// The single cell of a scalar array
    pub fn as_scalar(&self) -> Option<Scalar> {
        if self.shape.is_scalar() {
            Some(self.data.get(0))
        } else {
            None
        }
    }

    /// Cells as integers
    pub fn to_i64_vec(&self) -> Vec<i64> {
        self.cells().map(Scalar::as_i64).collect()
    }

    /// Cells as floats
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.cells().map(Scalar::as_f64).collect()
    }

    /// Cells as booleans
    pub fn to_bool_vec(&self) -> Vec<bool> {
        self.cells().map(Scalar::as_bool).collect()
    }

    /// Same cells under another type
    pub fn cast(&self, ty: Type) -> Array {
        if ty == self.ty {
            return self.clone();
        }
        if ty.dtype() == self.ty.dtype() {
            return Array {
                ty,
                shape: self.shape.clone(),
                data: self.data.clone(),
            };
        }
        let mut data = Buffer::with_capacity(ty.dtype(), self.len());
        for cell in self.cells() {
            data.push(cell);
        }
        Array {
            ty,
            shape: self.shape.clone(),
            data,
        }
    }

    /// Same cells under another shape of equal size
    pub fn reshape(&self, shape: Shape) -> Result<Array> {
        if shape.size() != self.len() {
            return Err(Error::shape(format!(
                "cannot reshape {} into {}",
                self.shape, shape
            )));
        }
        Ok(Array {
            ty: self.ty,
            shape,
            data: self.data.clone(),
        })
    }

    /// Materializes the broadcast of this array to `shape`
    pub fn broadcast_to(&self, shape: &Shape) -> Result<Array> {
        if &self.shape == shape {
            return Ok(self.clone());
        }
        if !broadcastable_into(shape, &self.shape) {
            return Err(Error::shape(format!(
                "shape {} does not broadcast into {}",
                self.shape, shape
            )));
        }
        Ok(self.take(&broadcast_offsets(shape, &self.shape), shape.clone()))
    }

    /// Gathers cells at `offsets` into a new array of `shape`
    pub fn take(&self, offsets: &[usize], shape: Shape) -> Array {
        let mut data = Buffer::with_capacity(self.ty.dtype(), offsets.len());
        for &off in offsets {
            data.push(self.data.get(off));
        }
        Array {
            ty: self.ty,
            shape,
            data,
        }
    }

    /// Applies `f` to every cell
    pub fn map(&self, ty: Type, f: impl Fn(Scalar) -> Scalar) -> Array {
        let mut data = Buffer::with_capacity(ty.dtype(), self.len());
        for cell in self.cells() {
            data.push(f(cell));
        }
        Array {
            ty,
            shape: self.shape.clone(),
            data,
        }
    }

    /// Applies `f` cell-wise over the broadcast of two arrays
    pub fn zip_map(&self, other: &Array, ty: Type, f: impl Fn(Scalar, Scalar) -> Scalar) -> Result<Array> {
        let shape = broadcast_shape(&[&self.shape, &other.shape])?;
        let left = broadcast_offsets(&shape, &self.shape);
        let right = broadcast_offsets(&shape, &other.shape);
        let mut data = Buffer::with_capacity(ty.dtype(), shape.size());
        for (&l, &r) in left.iter().zip(right.iter()) {
            data.push(f(self.data.get(l), other.data.get(r)));
        }
        Ok(Array { ty, shape, data })
    }

    fn fmt_cell(&self, cell: Scalar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match cell {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Real(r) if r.is_finite() && r.abs() >= 1e16 => {
                let text = format!("{:e}", r);
                match text.split_once('e') {
                    Some((mantissa, exp)) if !mantissa.contains('.') => {
                        write!(f, "{}.0e{}", mantissa, exp)
                    }
                    _ => f.write_str(&text),
                }
            }
            Scalar::Real(r) if r.is_finite() && r.fract() == 0.0 => write!(f, "{:.1}", r),
            Scalar::Real(r) => write!(f, "{}", r),
        }
    }

    fn fmt_axis(&self, axis: usize, base: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self.shape.dims();
        if axis == dims.len() {
            return self.fmt_cell(self.data.get(base), f);
        }
        let stride: usize = dims[axis + 1..].iter().product();
        write!(f, "[")?;
        for i in 0..dims[axis] {
            if i > 0 {
                write!(f, " ")?;
            }
            self.fmt_axis(axis + 1, base + i * stride, f)?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_axis(0, 0, f)
    }
}

/// Flat input offset for every cell of `out`, reading `inp` under broadcasting
///
/// `inp` must broadcast to `out`.
pub(crate) fn broadcast_offsets(out: &Shape, inp: &Shape) -> Vec<usize> {
    let rank = out.rank();
    let pad = rank.saturating_sub(inp.rank());
    let in_strides = inp.strides();
    let step: Vec<usize> = (0..rank)
        .map(|axis| {
            if axis < pad || inp.dims()[axis - pad] == 1 {
                0
            } else {
                in_strides[axis - pad]
            }
        })
        .collect();

    let total = out.size();
    let mut offsets = Vec::with_capacity(total);
    let mut idx = vec![0usize; rank];
    let mut off = 0usize;
    for _ in 0..total {
        offsets.push(off);
        for axis in (0..rank).rev() {
            idx[axis] += 1;
            off += step[axis];
            if idx[axis] < out.dims()[axis] {
                break;
            }
            off -= step[axis] * idx[axis];
            idx[axis] = 0;
        }
    }
    offsets
}
