use std::fmt;

use approx::{abs_diff_eq, AbsDiffEq};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::ComputeBackend;
use crate::error::{MatrixError, Result};

/// Relative tolerance used by [`DenseMatrix::allclose`].
pub const DEFAULT_RTOL: f64 = 1e-5;
/// Absolute tolerance used by [`DenseMatrix::allclose`].
pub const DEFAULT_ATOL: f64 = 1e-8;

/// A square N×N matrix of f64 in contiguous row-major order.
///
/// Only the coordinating process ever holds one; every other process works
/// on [`Block`](crate::Block)s.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DenseMatrix {
    /// Create a matrix from row-major data.
    pub fn from_vec(size: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != size * size {
            return Err(MatrixError::LengthMismatch {
                expected: size * size,
                got: data.len(),
            });
        }
        Ok(DenseMatrix { data, size })
    }

    /// Create a zero-filled matrix.
    pub fn zeros(size: usize) -> Self {
        DenseMatrix {
            data: vec![0.0; size * size],
            size,
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size);
        for i in 0..size {
            m.data[i * size + i] = 1.0;
        }
        m
    }

    /// Create a matrix filled with uniform samples from `[0, 1)`.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let data = (0..size * size).map(|_| rng.gen::<f64>()).collect();
        DenseMatrix { data, size }
    }

    /// Like [`DenseMatrix::random`], but reproducible for a given seed.
    pub fn random_seeded(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::random(size, &mut rng)
    }

    /// Number of rows (equal to the number of columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns element `(i, j)`.
    ///
    /// # Panics
    /// Panics if `i` or `j` is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.size && j < self.size, "index ({i}, {j}) out of range");
        self.data[i * self.size + j]
    }

    /// Sets element `(i, j)`.
    ///
    /// # Panics
    /// Panics if `i` or `j` is out of range.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.size && j < self.size, "index ({i}, {j}) out of range");
        self.data[i * self.size + j] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns an owned row-major copy of the contents.
    pub fn get_dense_copy(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// Replace the contents with row-major `data` of the same size.
    pub fn set_from_dense(&mut self, data: Vec<f64>) -> Result<()> {
        if data.len() != self.data.len() {
            return Err(MatrixError::LengthMismatch {
                expected: self.data.len(),
                got: data.len(),
            });
        }
        self.data = data;
        Ok(())
    }

    /// Reference product `self @ other` computed on a single process.
    pub fn matmul(&self, other: &DenseMatrix, backend: &dyn ComputeBackend) -> Result<DenseMatrix> {
        if self.size != other.size {
            return Err(MatrixError::MatmulMismatch {
                m: self.size,
                k: self.size,
                k2: other.size,
                n: other.size,
            });
        }
        let n = self.size;
        let data = backend.matmul(&self.data, &other.data, n, n, n)?;
        DenseMatrix::from_vec(n, data)
    }

    /// Element-wise closeness with the default tolerances:
    /// `|a - b| <= atol + rtol * |b|` for every element.
    pub fn allclose(&self, other: &DenseMatrix) -> bool {
        self.allclose_with(other, DEFAULT_RTOL, DEFAULT_ATOL)
    }

    pub fn allclose_with(&self, other: &DenseMatrix, rtol: f64, atol: f64) -> bool {
        self.size == other.size
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| abs_diff_eq!(*a, *b, epsilon = atol + rtol * b.abs()))
    }
}

impl AbsDiffEq for DenseMatrix {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.size == other.size
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl fmt::Display for DenseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.chunks(self.size.max(1)) {
            write!(f, "[")?;
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:.6}", v)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
