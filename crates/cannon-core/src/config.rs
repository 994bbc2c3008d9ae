use crate::error::{CannonError, Result};

/// Matrix size used when none is requested, as a multiple of the grid size.
pub const DEFAULT_BLOCK_SIZE: usize = 3;

/// Validated shape of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPlan {
    pub process_count: usize,
    pub grid_size: usize,
    pub matrix_size: usize,
    pub block_size: usize,
}

impl LaunchPlan {
    /// Check the run preconditions. Pure, so every rank reaches the same
    /// verdict without communicating.
    ///
    /// `requested_size` defaults to `DEFAULT_BLOCK_SIZE * grid_size`.
    pub fn validate(process_count: usize, requested_size: Option<usize>) -> Result<LaunchPlan> {
        let grid_size = grid_size_for(process_count)?;
        let matrix_size = requested_size.unwrap_or(DEFAULT_BLOCK_SIZE * grid_size);
        let block_size = block_size_for(matrix_size, grid_size)?;
        Ok(LaunchPlan {
            process_count,
            grid_size,
            matrix_size,
            block_size,
        })
    }
}

/// Side length of the square grid for `process_count` processes.
pub fn grid_size_for(process_count: usize) -> Result<usize> {
    // isqrt(n)² never exceeds n, so the square below cannot overflow.
    let grid_size = process_count.isqrt();
    if process_count == 0 || grid_size * grid_size != process_count {
        return Err(CannonError::NonSquareProcessCount {
            processes: process_count,
        });
    }
    Ok(grid_size)
}

/// Side length of each process's block.
pub fn block_size_for(matrix_size: usize, grid_size: usize) -> Result<usize> {
    if matrix_size == 0 {
        return Err(CannonError::EmptyMatrix);
    }
    if grid_size == 0 || matrix_size % grid_size != 0 {
        return Err(CannonError::IndivisibleMatrixSize {
            matrix_size,
            grid_size,
        });
    }
    Ok(matrix_size / grid_size)
}
