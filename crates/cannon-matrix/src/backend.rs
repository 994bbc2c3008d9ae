use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable local compute kernels.
///
/// All operations work on row-major f64 slices. Only the process-local
/// block arithmetic goes through a backend; communication never does.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>>;

    /// Multiply-accumulate in place: C += A @ B.
    ///
    /// `c` is never reset, so repeated calls sum their contributions.
    fn matmul_accumulate(
        &self,
        c: &mut [f64],
        a: &[f64],
        b: &[f64],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<()>;
}
