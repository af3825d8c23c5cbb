//! Runtime for VectorL programs: array kernel and stack machine

mod array;
mod instr;
mod machine;
pub mod ops;
mod select;
mod sink;
mod value;

pub use array::{Array, Buffer, Scalar};
pub use instr::{Func, Instr, Operator, Program};
pub use machine::Machine;
pub use select::{selection_offsets, slice_positions, AxisSelector, Selection};
pub use sink::{format_line, CaptureSink, Dispatch, OutputSink, PrintItem, StdoutSink};
pub use value::Value;
