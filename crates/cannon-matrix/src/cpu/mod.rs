use crate::backend::ComputeBackend;
use crate::error::{MatrixError, Result};

/// Pure-Rust CPU compute backend.
///
/// Implements the kernels with straightforward i-j-k loops optimized for
/// correctness rather than peak performance. The summation order is fixed,
/// so results are reproducible bit for bit.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_operands(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Result<()> {
    if a.len() != m * k {
        return Err(MatrixError::LengthMismatch {
            expected: m * k,
            got: a.len(),
        });
    }
    if b.len() != k * n {
        return Err(MatrixError::LengthMismatch {
            expected: k * n,
            got: b.len(),
        });
    }
    Ok(())
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>> {
        check_operands(a, b, m, k, n)?;

        let mut c = vec![0.0f64; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f64;
                for p in 0..k {
                    sum += a[i * k + p] * b[p * n + j];
                }
                c[i * n + j] = sum;
            }
        }
        Ok(c)
    }

    fn matmul_accumulate(
        &self,
        c: &mut [f64],
        a: &[f64],
        b: &[f64],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<()> {
        check_operands(a, b, m, k, n)?;
        if c.len() != m * n {
            return Err(MatrixError::LengthMismatch {
                expected: m * n,
                got: c.len(),
            });
        }

        for i in 0..m {
            for j in 0..n {
                let acc = &mut c[i * n + j];
                for p in 0..k {
                    *acc += a[i * k + p] * b[p * n + j];
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> CpuBackend {
        CpuBackend::new()
    }

    #[test]
    fn test_matmul_identity() {
        let b = backend();
        // 2x2 identity @ [1,2;3,4]
        let a = vec![1.0, 0.0, 0.0, 1.0];
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_basic() {
        let b = backend();
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let x = vec![5.0, 6.0, 7.0, 8.0];
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_rectangular() {
        let b = backend();
        // [1,2,3] @ [4;5;6] = [32]
        let c = b.matmul(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], 1, 3, 1).unwrap();
        assert_eq!(c, vec![32.0]);
    }

    #[test]
    fn test_accumulate_does_not_reset() {
        let b = backend();
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let x = vec![5.0, 6.0, 7.0, 8.0];
        let mut c = vec![1.0; 4];
        b.matmul_accumulate(&mut c, &a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![20.0, 23.0, 44.0, 51.0]);
        b.matmul_accumulate(&mut c, &a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![39.0, 45.0, 87.0, 101.0]);
    }

    #[test]
    fn test_accumulate_from_zero_matches_matmul_bitwise() {
        let b = backend();
        let a: Vec<f64> = (0..9).map(|v| 0.1 * v as f64 + 0.3).collect();
        let x: Vec<f64> = (0..9).map(|v| 1.7 / (v as f64 + 1.0)).collect();
        let expected = b.matmul(&a, &x, 3, 3, 3).unwrap();
        let mut c = vec![0.0; 9];
        b.matmul_accumulate(&mut c, &a, &x, 3, 3, 3).unwrap();
        assert_eq!(c, expected);
    }

    #[test]
    fn test_matmul_length_mismatch() {
        let b = backend();
        assert_eq!(
            b.matmul(&[1.0, 2.0, 3.0], &[1.0; 4], 2, 2, 2),
            Err(MatrixError::LengthMismatch { expected: 4, got: 3 })
        );
    }

    #[test]
    fn test_accumulate_output_mismatch() {
        let b = backend();
        let mut c = vec![0.0; 3];
        assert!(b
            .matmul_accumulate(&mut c, &[1.0; 4], &[1.0; 4], 2, 2, 2)
            .is_err());
    }
}
