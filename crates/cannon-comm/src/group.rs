//! The process-group surface the grid algorithm is written against.
//!
//! Two backends implement it: the in-process [`Communicator`] launched by
//! [`World`](crate::World), and, with the `mpi` feature, `MpiGroup`
//! wrapping an MPI communicator under `mpirun`.

use crate::communicator::{Communicator, Tag};
use crate::error::Result;

const EXCHANGE_TAG: Tag = 0;

/// A fixed, ordered set of cooperating processes.
///
/// Every collective must be entered by all members in the same order.
pub trait ProcessGroup {
    /// This process's rank within the group.
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Collective: every member returns the root's `value`, which is only
    /// read on the root.
    fn broadcast_size(&self, root: usize, value: Option<usize>) -> Result<usize>;

    /// Collective: the root's `send` is cut into `size` equal chunks in rank
    /// order and member `r` receives chunk `r` into `recv`.
    fn scatter(&self, root: usize, send: Option<&[f64]>, recv: &mut [f64]) -> Result<()>;

    /// Collective: the inverse of [`ProcessGroup::scatter`].
    fn gather(&self, root: usize, send: &[f64], recv: Option<&mut [f64]>) -> Result<()>;

    /// Send `buf` to `dest` and overwrite it with what `source` sent.
    fn sendrecv_replace(&self, buf: &mut [f64], dest: usize, source: usize) -> Result<()>;
}

/// This process's place in a 2D grid, with the groups of its row (ranked by
/// column) and of its column (ranked by row).
#[derive(Debug)]
pub struct GridGroups<G> {
    pub row: usize,
    pub col: usize,
    pub row_group: G,
    pub col_group: G,
}

/// A group that can lay itself out as a square Cartesian grid.
pub trait GridTopology: ProcessGroup {
    type Group: ProcessGroup;

    /// Collective: arrange the `grid_size²` members on a non-periodic
    /// `grid_size × grid_size` grid in row-major order and derive the row and
    /// column groups.
    fn grid_groups(&self, grid_size: usize) -> Result<GridGroups<Self::Group>>;
}

impl ProcessGroup for Communicator {
    fn rank(&self) -> usize {
        Communicator::rank(self)
    }

    fn size(&self) -> usize {
        Communicator::size(self)
    }

    fn broadcast_size(&self, root: usize, value: Option<usize>) -> Result<usize> {
        self.broadcast(root, value)
    }

    fn scatter(&self, root: usize, send: Option<&[f64]>, recv: &mut [f64]) -> Result<()> {
        Communicator::scatter(self, root, send, recv)
    }

    fn gather(&self, root: usize, send: &[f64], recv: Option<&mut [f64]>) -> Result<()> {
        Communicator::gather(self, root, send, recv)
    }

    fn sendrecv_replace(&self, buf: &mut [f64], dest: usize, source: usize) -> Result<()> {
        Communicator::sendrecv_replace(self, buf, dest, source, EXCHANGE_TAG)
    }
}

impl GridTopology for Communicator {
    type Group = Communicator;

    fn grid_groups(&self, grid_size: usize) -> Result<GridGroups<Communicator>> {
        let cart = self.create_cart(&[grid_size, grid_size], &[false, false], true)?;
        let coords = cart.coords(cart.rank())?;
        Ok(GridGroups {
            row: coords[0],
            col: coords[1],
            row_group: cart.sub(&[false, true])?,
            col_group: cart.sub(&[true, false])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommError;
    use crate::world::World;

    fn grid_of<G: GridTopology>(
        world: &G,
        grid_size: usize,
    ) -> Result<(usize, usize, usize, usize)> {
        let groups = world.grid_groups(grid_size)?;
        Ok((
            groups.row,
            groups.col,
            groups.row_group.rank(),
            groups.col_group.rank(),
        ))
    }

    #[test]
    fn test_grid_groups_are_row_major() {
        let results = World::launch(6, |world| grid_of(&world, 0).map(|_| ())).unwrap();
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(CommError::TopologyMismatch { .. }))));

        let results = World::launch(4, |world| grid_of(&world, 2)).unwrap();
        let placed: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(placed, vec![(0, 0, 0, 0), (0, 1, 1, 0), (1, 0, 0, 1), (1, 1, 1, 1)]);
    }

    #[test]
    fn test_trait_exchange_uses_the_group_ring() {
        let results = World::launch(3, |world| {
            let group: &dyn ProcessGroup = &world;
            let rank = group.rank();
            let size = group.size();
            let mut buf = vec![rank as f64];
            group.sendrecv_replace(&mut buf, (rank + size - 1) % size, (rank + 1) % size)?;
            Ok::<_, CommError>(buf[0])
        })
        .unwrap();
        assert_eq!(results, vec![Ok(1.0), Ok(2.0), Ok(0.0)]);
    }

    #[test]
    fn test_broadcast_size_reads_only_the_root() {
        let results = World::launch(3, |world| {
            let value = (world.rank() == 1).then_some(42);
            world.broadcast_size(1, value)
        })
        .unwrap();
        assert!(results.iter().all(|r| *r == Ok(42)));
    }
}
