use cannon_comm::ProcessGroup;
use cannon_matrix::Block;

use crate::topology::ProcessGrid;

/// Everything one process carries through a run: the grid, its three
/// blocks and the systolic round counter.
///
/// Created after the matrix size is known, with all blocks zero-filled.
/// Distribution fills `a` and `b`, the systolic engine rotates them and
/// accumulates into `c`, and collection only reads `c`.
pub struct CannonContext<G> {
    pub(crate) grid: ProcessGrid<G>,
    pub(crate) matrix_size: usize,
    pub(crate) a: Block,
    pub(crate) b: Block,
    pub(crate) c: Block,
    pub(crate) round: usize,
}

impl<G: ProcessGroup> CannonContext<G> {
    pub fn new(grid: ProcessGrid<G>, matrix_size: usize, block_size: usize) -> Self {
        CannonContext {
            grid,
            matrix_size,
            a: Block::zeros(block_size),
            b: Block::zeros(block_size),
            c: Block::zeros(block_size),
            round: 0,
        }
    }

    pub fn grid(&self) -> &ProcessGrid<G> {
        &self.grid
    }

    pub fn matrix_size(&self) -> usize {
        self.matrix_size
    }

    pub fn block_size(&self) -> usize {
        self.c.block_size()
    }

    /// Completed systolic rounds; equals the grid size once the product is
    /// fully accumulated.
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn a_block(&self) -> &Block {
        &self.a
    }

    pub fn b_block(&self) -> &Block {
        &self.b
    }

    pub fn c_block(&self) -> &Block {
        &self.c
    }
}
