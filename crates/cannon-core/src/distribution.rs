//! Moving the coordinator's matrices onto the grid.
//!
//! Two scatters per operand: row bands down the first grid column, then
//! block-wide column segments along each row, one block row at a time.
//! The initial skew follows.

use cannon_comm::ProcessGroup;
use cannon_matrix::{Block, DenseMatrix};
use tracing::{debug, info};

use crate::context::CannonContext;
use crate::coordinator::{Coordinator, Operand};
use crate::error::{CannonError, Result};
use crate::exchange::circular_shift;
use crate::topology::ProcessGrid;

/// Collective over `world`: the coordinator announces the matrix size.
pub fn broadcast_matrix_size<W>(world: &W, coordinator: Option<&Coordinator>) -> Result<usize>
where
    W: ProcessGroup + ?Sized,
{
    let size =
        world.broadcast_size(Coordinator::WORLD_RANK, coordinator.map(Coordinator::matrix_size))?;
    Ok(size)
}

/// Fill `ctx`'s A and B blocks with the block at this process's grid
/// position, then apply the initial skew.
pub fn distribute<G: ProcessGroup>(
    ctx: &mut CannonContext<G>,
    coordinator: Option<&Coordinator>,
) -> Result<()> {
    if coordinator.is_some() != ctx.grid.is_origin() {
        return Err(CannonError::CoordinatorPlacement {
            world_rank: ctx.grid.world_rank(),
        });
    }
    if let Some(coordinator) = coordinator {
        info!(
            matrix_size = coordinator.matrix_size(),
            grid_size = ctx.grid.grid_size(),
            "distributing operands"
        );
    }

    let n = ctx.matrix_size;
    let a = coordinator.map(|c| c.operand(Operand::A));
    let b = coordinator.map(|c| c.operand(Operand::B));
    scatter_matrix(&ctx.grid, n, a, &mut ctx.a)?;
    scatter_matrix(&ctx.grid, n, b, &mut ctx.b)?;
    skew(ctx)
}

fn scatter_matrix<G: ProcessGroup>(
    grid: &ProcessGrid<G>,
    n: usize,
    source: Option<&DenseMatrix>,
    block: &mut Block,
) -> Result<()> {
    let block_size = block.block_size();
    let in_first_column = grid.coords().col == 0;

    // Row band of `block_size` full-width rows, only used in column 0.
    let mut band = vec![0.0; block_size * n];
    if in_first_column {
        grid.col_group()
            .scatter(0, source.map(DenseMatrix::as_slice), &mut band)?;
    }

    for i in 0..block_size {
        let row = in_first_column.then(|| &band[i * n..(i + 1) * n]);
        grid.row_group().scatter(0, row, block.row_mut(i))?;
    }
    Ok(())
}

/// Cannon's initial alignment: A moves left along its row by the row index,
/// B moves up along its column by the column index.
pub fn skew<G: ProcessGroup>(ctx: &mut CannonContext<G>) -> Result<()> {
    let coords = ctx.grid.coords();
    circular_shift(ctx.a.as_mut_slice(), ctx.grid.row_group(), coords.row)?;
    circular_shift(ctx.b.as_mut_slice(), ctx.grid.col_group(), coords.col)?;
    debug!(row = coords.row, col = coords.col, "skewed operand blocks");
    Ok(())
}
