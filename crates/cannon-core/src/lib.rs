//! `cannon-core` - Cannon's algorithm for dense N×N products on a √P × √P
//! process grid.
//!
//! A run moves through four strictly sequential phases, each one the next
//! one's precondition:
//! 1. topology: [`ProcessGrid::build`] lays the processes out and derives
//!    row and column groups
//! 2. distribution: [`distribution::distribute`] scatters A and B from the
//!    coordinator and applies the initial skew
//! 3. multiplication: [`systolic::multiply`] runs `grid_size` rounds of
//!    local multiply-accumulate and unit shifts
//! 4. collection: [`collection::collect`] gathers the C blocks back into the
//!    coordinator
//!
//! [`cannon_multiply`] runs them in order on one rank of any
//! [`GridTopology`] backend; [`distributed_matmul`] launches a whole
//! in-process group for a single product.

pub mod collection;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod distribution;
pub mod error;
pub mod exchange;
pub mod systolic;
pub mod topology;

pub use config::LaunchPlan;
pub use context::CannonContext;
pub use coordinator::{Coordinator, Operand};
pub use error::{CannonError, Result};
pub use topology::{GridCoords, ProcessGrid};

use cannon_comm::{GridTopology, World};
use cannon_matrix::{ComputeBackend, DenseMatrix};
use tracing::debug;

/// What one rank saw of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub matrix_size: usize,
    pub grid_size: usize,
    pub block_size: usize,
    pub coords: GridCoords,
    pub rounds: usize,
}

/// Run Cannon's algorithm on this rank. Collective over `world`.
///
/// Exactly world rank 0 passes its [`Coordinator`]; once this returns, the
/// product is available from [`Coordinator::product`]. Other ranks keep
/// nothing but their own summary.
pub fn cannon_multiply<W: GridTopology>(
    world: &W,
    coordinator: Option<&mut Coordinator>,
    backend: &dyn ComputeBackend,
) -> Result<RunSummary> {
    let grid = ProcessGrid::build(world)?;
    let matrix_size = distribution::broadcast_matrix_size(world, coordinator.as_deref())?;
    let block_size = config::block_size_for(matrix_size, grid.grid_size())?;

    let mut ctx = CannonContext::new(grid, matrix_size, block_size);
    distribution::distribute(&mut ctx, coordinator.as_deref())?;
    systolic::multiply(&mut ctx, backend)?;
    collection::collect(&ctx, coordinator)?;

    debug!(rounds = ctx.round(), "run complete");
    Ok(RunSummary {
        matrix_size,
        grid_size: ctx.grid().grid_size(),
        block_size,
        coords: ctx.grid().coords(),
        rounds: ctx.round(),
    })
}

/// Compute `a @ b` with `process_count` cooperating ranks.
///
/// The preconditions are checked before any rank is launched.
pub fn distributed_matmul(
    process_count: usize,
    a: &DenseMatrix,
    b: &DenseMatrix,
    backend: &dyn ComputeBackend,
) -> Result<DenseMatrix> {
    LaunchPlan::validate(process_count, Some(a.size()))?;

    let outcomes = World::launch(process_count, |world| {
        let mut coordinator = Coordinator::elect(&world, || (a.clone(), b.clone()))?;
        cannon_multiply(&world, coordinator.as_mut(), backend)?;
        Ok::<_, CannonError>(coordinator.and_then(Coordinator::into_product))
    })?;

    coordinator_product(outcomes)
}

/// The first rank error, otherwise the product the coordinator returned.
fn coordinator_product<I>(outcomes: I) -> Result<DenseMatrix>
where
    I: IntoIterator<Item = Result<Option<DenseMatrix>>>,
{
    let mut product = None;
    for outcome in outcomes {
        if let Some(p) = outcome? {
            product = Some(p);
        }
    }
    product.ok_or(CannonError::MissingProduct)
}
