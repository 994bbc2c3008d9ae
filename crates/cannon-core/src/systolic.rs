use cannon_comm::ProcessGroup;
use cannon_matrix::ComputeBackend;
use tracing::debug;

use crate::context::CannonContext;
use crate::error::Result;
use crate::exchange::circular_shift;

/// One systolic round: `C += A·B` on the local blocks, then A moves one
/// position left along the row and B one position up along the column.
pub fn step<G: ProcessGroup>(
    ctx: &mut CannonContext<G>,
    backend: &dyn ComputeBackend,
) -> Result<()> {
    let bs = ctx.c.block_size();
    backend.matmul_accumulate(
        ctx.c.as_mut_slice(),
        ctx.a.as_slice(),
        ctx.b.as_slice(),
        bs,
        bs,
        bs,
    )?;
    circular_shift(ctx.a.as_mut_slice(), ctx.grid.row_group(), 1)?;
    circular_shift(ctx.b.as_mut_slice(), ctx.grid.col_group(), 1)?;

    ctx.round += 1;
    debug!(round = ctx.round, "systolic round complete");
    Ok(())
}

/// Run the remaining rounds until `grid_size` have completed. C is never
/// reset between rounds.
pub fn multiply<G: ProcessGroup>(
    ctx: &mut CannonContext<G>,
    backend: &dyn ComputeBackend,
) -> Result<()> {
    while ctx.round < ctx.grid.grid_size() {
        step(ctx, backend)?;
    }
    Ok(())
}
