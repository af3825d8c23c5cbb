//! Runtime index selections
//!
//! A [`Selection`] is the evaluated form of an indexer: one selector per
//! leading axis of the indexed array. Missing trailing selectors keep their
//! axes. Integer picks and integer arrays form the advanced group, placed
//! the numpy way: at the position of the group when its axes are adjacent,
//! in front otherwise.

use super::array::{broadcast_offsets, Array};
use crate::error::{Error, Result};
use crate::types::{broadcast_shape, Shape};
use std::fmt;

/// Selector for one axis
#[derive(Debug, Clone, PartialEq)]
pub enum AxisSelector {
    /// Keep the whole axis
    Full,
    /// Select one position and drop the axis
    Pick(i64),
    /// Python-style slice; `len` is the statically inferred length, checked at run time
    Slice {
        /// First position, or the step-dependent default
        start: Option<i64>,
        /// One past the last position, or the step-dependent default
        stop: Option<i64>,
        /// Nonzero stride
        step: i64,
        /// Expected number of positions
        len: Option<usize>,
    },
    /// Integer array of positions
    Advanced(Array),
}

/// Evaluated indexer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    /// Per-axis selectors, leading axes first
    pub axes: Vec<AxisSelector>,
}

impl Selection {
    /// Selection of the whole array
    pub fn whole() -> Self {
        Selection { axes: Vec::new() }
    }

    /// Selection from per-axis selectors
    pub fn new(axes: Vec<AxisSelector>) -> Self {
        Selection { axes }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.axes.is_empty() {
            return write!(f, "[...]");
        }
        let parts: Vec<String> = self
            .axes
            .iter()
            .map(|s| match s {
                AxisSelector::Full => "_".to_string(),
                AxisSelector::Pick(i) => i.to_string(),
                AxisSelector::Slice {
                    start, stop, step, ..
                } => format!(
                    "{}:{}:{}",
                    start.map(|v| v.to_string()).unwrap_or_default(),
                    stop.map(|v| v.to_string()).unwrap_or_default(),
                    step
                ),
                AxisSelector::Advanced(a) => a.to_string(),
            })
            .collect();
        write!(f, "[{}]", parts.join(","))
    }
}

/// Positions selected by a Python-style slice over an axis of length `n`
pub fn slice_positions(start: Option<i64>, stop: Option<i64>, step: i64, n: usize) -> Vec<usize> {
    let n = n as i64;
    let adjust = |bound: Option<i64>, default: i64| -> i64 {
        match bound {
            None => default,
            Some(mut i) => {
                if i < 0 {
                    i += n;
                    if i < 0 {
                        i = if step < 0 { -1 } else { 0 };
                    }
                } else if i >= n {
                    i = if step < 0 { n - 1 } else { n };
                }
                i
            }
        }
    };

    let mut positions = Vec::new();
    if step > 0 {
        let (mut i, stop) = (adjust(start, 0), adjust(stop, n));
        while i < stop {
            positions.push(i as usize);
            i += step;
        }
    } else if step < 0 {
        let (mut i, stop) = (adjust(start, n - 1), adjust(stop, -1));
        while i > stop {
            positions.push(i as usize);
            i += step;
        }
    }
    positions
}

fn normalize(pos: i64, n: usize, axis: usize) -> Result<usize> {
    let len = n as i64;
    let p = if pos < 0 { pos + len } else { pos };
    if p < 0 || p >= len {
        return Err(Error::index(format!(
            "index {} is out of bounds for axis {} with size {}",
            pos, axis, n
        )));
    }
    Ok(p as usize)
}

enum Resolved {
    Basic(Vec<usize>),
    Advanced(Shape, Vec<usize>),
}

/// Result shape and the flat offset into `base` of every selected cell
pub fn selection_offsets(base: &Shape, selection: &Selection) -> Result<(Shape, Vec<usize>)> {
    if selection.axes.len() > base.rank() {
        return Err(Error::index(format!(
            "too many indices ({}) for array of shape {}",
            selection.axes.len(),
            base
        )));
    }

    let mut resolved = Vec::with_capacity(base.rank());
    for (axis, &n) in base.dims().iter().enumerate() {
        let r = match selection.axes.get(axis).unwrap_or(&AxisSelector::Full) {
            AxisSelector::Full => Resolved::Basic((0..n).collect()),
            AxisSelector::Slice {
                start,
                stop,
                step,
                len,
            } => {
                if *step == 0 {
                    return Err(Error::index("slice step cannot be zero"));
                }
                let positions = slice_positions(*start, *stop, *step, n);
                if let Some(expected) = len {
                    if positions.len() != *expected {
                        return Err(Error::index(format!(
                            "slice selects {} positions on axis {}, expected {}",
                            positions.len(),
                            axis,
                            expected
                        )));
                    }
                }
                Resolved::Basic(positions)
            }
            AxisSelector::Pick(i) => Resolved::Advanced(Shape::scalar(), vec![normalize(*i, n, axis)?]),
            AxisSelector::Advanced(arr) => {
                let positions = arr
                    .to_i64_vec()
                    .into_iter()
                    .map(|i| normalize(i, n, axis))
                    .collect::<Result<Vec<_>>>()?;
                Resolved::Advanced(arr.shape().clone(), positions)
            }
        };
        resolved.push(r);
    }

    // Advanced group: broadcast shape and placement
    let group: Vec<usize> = resolved
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Resolved::Advanced(..)))
        .map(|(axis, _)| axis)
        .collect();
    let group_shapes: Vec<&Shape> = resolved
        .iter()
        .filter_map(|r| match r {
            Resolved::Advanced(shape, _) => Some(shape),
            Resolved::Basic(_) => None,
        })
        .collect();
    let bshape = broadcast_shape(&group_shapes)?;
    let adjacent = group.windows(2).all(|w| w[1] == w[0] + 1);
    let insert_at = match group.first() {
        Some(&first) if adjacent => resolved[..first]
            .iter()
            .filter(|r| matches!(r, Resolved::Basic(_)))
            .count(),
        _ => 0,
    };

    let basic: Vec<(usize, &Vec<usize>)> = resolved
        .iter()
        .enumerate()
        .filter_map(|(axis, r)| match r {
            Resolved::Basic(p) => Some((axis, p)),
            Resolved::Advanced(..) => None,
        })
        .collect();
    let advanced: Vec<(usize, Vec<usize>)> = resolved
        .iter()
        .enumerate()
        .filter_map(|(axis, r)| match r {
            Resolved::Advanced(shape, positions) => {
                let expanded = broadcast_offsets(&bshape, shape)
                    .into_iter()
                    .map(|o| positions[o])
                    .collect();
                Some((axis, expanded))
            }
            Resolved::Basic(_) => None,
        })
        .collect();

    let mut out_dims: Vec<usize> = basic.iter().map(|(_, p)| p.len()).collect();
    for (k, &n) in bshape.dims().iter().enumerate() {
        out_dims.insert(insert_at + k, n);
    }
    let out = Shape::new(out_dims);

    let strides = base.strides();
    let bstrides = bshape.strides();
    let brank = bshape.rank();
    let mut offsets = Vec::with_capacity(out.size());
    for flat in 0..out.size() {
        let idx = out.unravel(flat);
        let mut off = 0usize;
        let mut bflat = 0usize;
        for k in 0..brank {
            bflat += idx[insert_at + k] * bstrides[k];
        }
        for (j, (axis, positions)) in basic.iter().enumerate() {
            let out_axis = if j < insert_at { j } else { j + brank };
            off += strides[*axis] * positions[idx[out_axis]];
        }
        for (axis, positions) in &advanced {
            off += strides[*axis] * positions[bflat];
        }
        offsets.push(off);
    }
    Ok((out, offsets))
}

impl Array {
    /// Reads the selected cells
    pub fn select(&self, selection: &Selection) -> Result<Array> {
        let (shape, offsets) = selection_offsets(self.shape(), selection)?;
        Ok(self.take(&offsets, shape))
    }

    /// Writes `value` into the selected cells, broadcasting and converting it
    pub fn assign(&mut self, selection: &Selection, value: &Array) -> Result<()> {
        let (shape, offsets) = selection_offsets(self.shape(), selection)?;
        let value = value.broadcast_to(&shape)?;
        for (cell, off) in value.cells().zip(offsets) {
            self.set(off, cell);
        }
        Ok(())
    }
}
