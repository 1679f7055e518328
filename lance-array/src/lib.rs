#![cfg(target_endian = "little")]

//! In-memory columnar values for the Lance file engine.
//!
//! An [`Array`] holds one column's values for a run of rows, backed by Arrow
//! buffers so that the zero-copy interchange boundary never has to duplicate
//! value bytes. The supported physical shapes are a closed variant:
//! [`PrimitiveArray`] for fixed-width values and [`VarBinArray`] for
//! variable-width strings and binary.
//!
//! A [`Batch`] groups one array per schema field, and is the unit of rows the
//! file writer consumes and the reader produces.

pub use array::*;
pub use batch::*;
pub use primitive::*;
pub use validity::*;
pub use varbin::*;

mod array;
pub mod arrow;
mod batch;
mod primitive;
mod validity;
mod varbin;
