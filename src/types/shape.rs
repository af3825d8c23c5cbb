use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest cell count a shape may describe
pub const MAX_CELLS: usize = (isize::MAX as usize) / 16;

/// Static array shape; the empty shape is a scalar
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Creates a shape from its axis lengths
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The scalar shape `()`
    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    /// One-dimensional shape `(n,)`
    pub fn vector(n: usize) -> Self {
        Shape(vec![n])
    }

    /// Axis lengths
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Number of cells
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// Number of cells, or a shape error when it exceeds [`MAX_CELLS`]
    pub fn checked_size(&self) -> Result<usize> {
        self.0
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .filter(|&cells| cells <= MAX_CELLS)
            .ok_or_else(|| Error::shape(format!("array of shape {} is too large", self)))
    }

    /// Returns the shape unchanged if its cell count is representable
    pub fn validated(self) -> Result<Shape> {
        self.checked_size()?;
        Ok(self)
    }

    /// True for `()`
    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Row-major strides, in cells
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.0.len()];
        for i in (0..self.0.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }
        strides
    }

    /// Multi-index of a flat row-major offset
    pub fn unravel(&self, mut flat: usize) -> Vec<usize> {
        let mut idx = vec![0; self.0.len()];
        for axis in (0..self.0.len()).rev() {
            let n = self.0[axis];
            if n > 0 {
                idx[axis] = flat % n;
                flat /= n;
            }
        }
        idx
    }

    /// Shape with `n` prepended as a new leading axis
    pub fn prepend(&self, n: usize) -> Shape {
        let mut dims = Vec::with_capacity(self.0.len() + 1);
        dims.push(n);
        dims.extend_from_slice(&self.0);
        Shape(dims)
    }

    /// Shape with one axis removed
    pub fn without_axis(&self, axis: usize) -> Shape {
        let mut dims = self.0.clone();
        dims.remove(axis);
        Shape(dims)
    }

    /// Resolves a possibly negative axis number against this rank
    pub fn normalize_axis(&self, axis: i64) -> Result<usize> {
        let rank = self.rank() as i64;
        if axis < -rank || axis >= rank {
            return Err(Error::shape(format!(
                "axis {} out of range for array of rank {}",
                axis, rank
            )));
        }
        Ok(if axis < 0 { axis + rank } else { axis } as usize)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "()"),
            [n] => write!(f, "({},)", n),
            dims => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

/// Numpy broadcast of several shapes
///
/// Shorter shapes are padded on the left with 1s; every axis must then be
/// equal across operands or 1 in all but one of them.
pub fn broadcast_shape(shapes: &[&Shape]) -> Result<Shape> {
    let rank = shapes.iter().map(|s| s.rank()).max().unwrap_or(0);
    let mut dims = vec![1usize; rank];
    for shape in shapes {
        let pad = rank - shape.rank();
        for (i, &n) in shape.dims().iter().enumerate() {
            let slot = &mut dims[pad + i];
            if *slot == 1 {
                *slot = n;
            } else if n != 1 && n != *slot {
                let all: Vec<String> = shapes.iter().map(|s| s.to_string()).collect();
                return Err(Error::shape(format!(
                    "shapes {} cannot be broadcast together",
                    all.join(" ")
                )));
            }
        }
    }
    Shape(dims).validated()
}

/// True when `rhs` broadcasts into `lhs` without stretching any `lhs` axis
///
/// Axes are aligned on the right; `lhs` may carry extra leading axes.
pub fn broadcastable_into(lhs: &Shape, rhs: &Shape) -> bool {
    if rhs.rank() > lhs.rank() {
        return false;
    }
    let pad = lhs.rank() - rhs.rank();
    rhs.dims()
        .iter()
        .enumerate()
        .all(|(i, &n)| n == 1 || n == lhs.dims()[pad + i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec())
    }

    #[test]
    fn test_broadcast() {
        assert_eq!(broadcast_shape(&[&s(&[2, 3]), &s(&[3])]).unwrap(), s(&[2, 3]));
        assert_eq!(broadcast_shape(&[&s(&[]), &s(&[4])]).unwrap(), s(&[4]));
        assert_eq!(
            broadcast_shape(&[&s(&[5, 1, 3]), &s(&[4, 1])]).unwrap(),
            s(&[5, 4, 3])
        );
        assert_eq!(broadcast_shape(&[]).unwrap(), Shape::scalar());

        let err = broadcast_shape(&[&s(&[2]), &s(&[3])]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ShapeError);
    }

    #[test]
    fn test_broadcast_into() {
        assert!(broadcastable_into(&s(&[4]), &s(&[])));
        assert!(broadcastable_into(&s(&[2, 3]), &s(&[3])));
        assert!(broadcastable_into(&s(&[2, 3]), &s(&[1, 3])));
        assert!(!broadcastable_into(&s(&[2]), &s(&[3])));
        assert!(!broadcastable_into(&s(&[1]), &s(&[3])));
        assert!(!broadcastable_into(&s(&[3]), &s(&[2, 3])));
    }

    #[test]
    fn test_strides_and_unravel() {
        let shape = s(&[2, 3, 4]);
        assert_eq!(shape.strides(), vec![12, 4, 1]);
        assert_eq!(shape.unravel(17), vec![1, 1, 1]);
        assert_eq!(shape.size(), 24);
        assert_eq!(s(&[]).size(), 1);
    }

    #[test]
    fn test_oversized_shapes() {
        let huge = s(&[1 << 32, 1 << 32, 0]);
        assert_eq!(huge.checked_size().unwrap_err().kind(), crate::error::ErrorKind::ShapeError);
        assert!(s(&[usize::MAX]).validated().is_err());
        assert_eq!(s(&[0, 7]).checked_size().unwrap(), 0);
        assert!(broadcast_shape(&[&s(&[1 << 40, 1]), &s(&[1 << 40])]).is_err());
    }

    #[test]
    fn test_display_and_axes() {
        assert_eq!(s(&[]).to_string(), "()");
        assert_eq!(s(&[3]).to_string(), "(3,)");
        assert_eq!(s(&[2, 3]).to_string(), "(2, 3)");
        assert_eq!(s(&[2, 3]).normalize_axis(-1).unwrap(), 1);
        assert!(s(&[2, 3]).normalize_axis(2).is_err());
    }
}
