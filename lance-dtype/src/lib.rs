#![cfg(target_endian = "little")]
#![deny(missing_docs)]

//! The logical type system for Lance files.
//!
//! A file stores an ordered [`Schema`] of named fields. Each field carries a
//! [`DType`], a closed variant over the supported logical types, and a
//! [`Nullability`]. Field order is fixed at write time and identical on every
//! read.

pub use dtype::*;
pub use nullability::*;
pub use ptype::*;
pub use schema::*;

pub mod arrow;
mod dtype;
mod nullability;
mod ptype;
mod schema;
