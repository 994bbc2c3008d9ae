//! Assembling the product at the coordinator, the reverse of distribution:
//! each row's C blocks are gathered, one block row at a time, into a row band
//! on its column-0 process, then the bands are gathered down column 0.

use cannon_comm::ProcessGroup;
use cannon_matrix::DenseMatrix;
use tracing::info;

use crate::context::CannonContext;
use crate::coordinator::Coordinator;
use crate::error::{CannonError, Result};

pub fn collect<G: ProcessGroup>(
    ctx: &CannonContext<G>,
    coordinator: Option<&mut Coordinator>,
) -> Result<()> {
    if coordinator.is_some() != ctx.grid.is_origin() {
        return Err(CannonError::CoordinatorPlacement {
            world_rank: ctx.grid.world_rank(),
        });
    }

    let n = ctx.matrix_size;
    let block_size = ctx.c.block_size();
    let in_first_column = ctx.grid.coords().col == 0;

    let mut band = vec![0.0; block_size * n];
    for i in 0..block_size {
        let row = if in_first_column {
            Some(&mut band[i * n..(i + 1) * n])
        } else {
            None
        };
        ctx.grid.row_group().gather(0, ctx.c.row(i), row)?;
    }
    if !in_first_column {
        return Ok(());
    }

    let mut full = coordinator.as_ref().map(|_| vec![0.0; n * n]);
    ctx.grid.col_group().gather(0, &band, full.as_deref_mut())?;

    if let (Some(coordinator), Some(full)) = (coordinator, full) {
        coordinator.store_product(DenseMatrix::from_vec(n, full)?);
        info!(matrix_size = n, "collected product");
    }
    Ok(())
}
