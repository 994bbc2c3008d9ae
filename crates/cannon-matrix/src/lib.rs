//! `cannon-matrix` - Dense matrices and block kernels for cannon-runtime.
//!
//! This crate provides:
//! - A square, row-major `DenseMatrix` of f64 held by the coordinating process
//! - A `Block` type for the per-process sub-matrices of a grid
//! - A `ComputeBackend` trait for the local multiply kernels
//! - A reference `CpuBackend` implementation

pub mod backend;
pub mod block;
pub mod cpu;
pub mod error;
pub mod matrix;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use block::Block;
pub use cpu::CpuBackend;
pub use error::{MatrixError, Result};
pub use matrix::DenseMatrix;
