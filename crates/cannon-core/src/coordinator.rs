use cannon_comm::ProcessGroup;
use cannon_matrix::{DenseMatrix, MatrixError};

use crate::error::Result;

/// Which input matrix a distribution step works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    A,
    B,
}

/// The capability held by the single process that owns the full matrices.
///
/// Only world rank 0 can obtain one, through [`Coordinator::elect`]. Phases
/// that need the full matrices take an `Option<&Coordinator>`, so the role a
/// call requires shows up in its signature instead of in rank checks.
#[derive(Debug, Clone)]
pub struct Coordinator {
    a: DenseMatrix,
    b: DenseMatrix,
    product: Option<DenseMatrix>,
}

impl Coordinator {
    /// World rank that acts as coordinator.
    pub const WORLD_RANK: usize = 0;

    pub fn new(a: DenseMatrix, b: DenseMatrix) -> Result<Coordinator> {
        if a.size() != b.size() {
            return Err(MatrixError::SizeMismatch {
                left: a.size(),
                right: b.size(),
            }
            .into());
        }
        Ok(Coordinator {
            a,
            b,
            product: None,
        })
    }

    /// Returns the coordinator on world rank 0 and `None` everywhere else.
    /// `make_inputs` only runs on the coordinator.
    pub fn elect<W, F>(world: &W, make_inputs: F) -> Result<Option<Coordinator>>
    where
        W: ProcessGroup + ?Sized,
        F: FnOnce() -> (DenseMatrix, DenseMatrix),
    {
        if world.rank() != Self::WORLD_RANK {
            return Ok(None);
        }
        let (a, b) = make_inputs();
        Coordinator::new(a, b).map(Some)
    }

    pub fn matrix_size(&self) -> usize {
        self.a.size()
    }

    pub fn operand(&self, which: Operand) -> &DenseMatrix {
        match which {
            Operand::A => &self.a,
            Operand::B => &self.b,
        }
    }

    /// The collected product, once a run has finished.
    pub fn product(&self) -> Option<&DenseMatrix> {
        self.product.as_ref()
    }

    pub fn into_product(self) -> Option<DenseMatrix> {
        self.product
    }

    pub(crate) fn store_product(&mut self, product: DenseMatrix) {
        self.product = Some(product);
    }
}
