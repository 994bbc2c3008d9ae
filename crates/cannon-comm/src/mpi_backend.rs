//! MPI process groups for runs launched under `mpirun`.
//!
//! Requires the `mpi` feature and a system MPI installation. The caller
//! initializes MPI and keeps the universe alive for the whole run:
//!
//! ```ignore
//! let universe = mpi::initialize().ok_or(...)?;
//! let world = MpiGroup::new(universe.world());
//! ```
//!
//! MPI reports transport failures by aborting the job, so the only errors
//! surfaced here are argument checks made before calling into MPI.

use mpi::topology::{CartesianCommunicator, Rank};
use mpi::traits::*;

use crate::error::{CommError, Result};
use crate::group::{GridGroups, GridTopology, ProcessGroup};

/// A [`ProcessGroup`] over any MPI communicator.
pub struct MpiGroup<C> {
    comm: C,
}

impl<C: Communicator> MpiGroup<C> {
    pub fn new(comm: C) -> Self {
        MpiGroup { comm }
    }

    pub fn inner(&self) -> &C {
        &self.comm
    }

    fn peer(&self, rank: usize) -> Result<Rank> {
        let size = ProcessGroup::size(self);
        if rank >= size {
            return Err(CommError::RankOutOfRange { rank, size });
        }
        Rank::try_from(rank).map_err(|_| CommError::RankOutOfRange { rank, size })
    }
}

impl<C: Communicator> ProcessGroup for MpiGroup<C> {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn broadcast_size(&self, root: usize, value: Option<usize>) -> Result<usize> {
        let root_process = self.comm.process_at_rank(self.peer(root)?);
        let mut wire: u64 = 0;
        if ProcessGroup::rank(self) == root {
            let value = value.ok_or(CommError::MissingRootBuffer { root })?;
            wire = value as u64;
        }
        root_process.broadcast_into(&mut wire);
        Ok(wire as usize)
    }

    fn scatter(&self, root: usize, send: Option<&[f64]>, recv: &mut [f64]) -> Result<()> {
        let root_process = self.comm.process_at_rank(self.peer(root)?);
        if ProcessGroup::rank(self) != root {
            root_process.scatter_into(recv);
            return Ok(());
        }
        let send = send.ok_or(CommError::MissingRootBuffer { root })?;
        let expected = recv.len() * ProcessGroup::size(self);
        if send.len() != expected {
            return Err(CommError::LengthMismatch {
                expected,
                got: send.len(),
            });
        }
        root_process.scatter_into_root(send, recv);
        Ok(())
    }

    fn gather(&self, root: usize, send: &[f64], recv: Option<&mut [f64]>) -> Result<()> {
        let root_process = self.comm.process_at_rank(self.peer(root)?);
        if ProcessGroup::rank(self) != root {
            root_process.gather_into(send);
            return Ok(());
        }
        let recv = recv.ok_or(CommError::MissingRootBuffer { root })?;
        let expected = send.len() * ProcessGroup::size(self);
        if recv.len() != expected {
            return Err(CommError::LengthMismatch {
                expected,
                got: recv.len(),
            });
        }
        root_process.gather_into_root(send, recv);
        Ok(())
    }

    fn sendrecv_replace(&self, buf: &mut [f64], dest: usize, source: usize) -> Result<()> {
        let dest = self.comm.process_at_rank(self.peer(dest)?);
        let source = self.comm.process_at_rank(self.peer(source)?);
        mpi::point_to_point::send_receive_replace_into(buf, &dest, &source);
        Ok(())
    }
}

impl<C: Communicator> GridTopology for MpiGroup<C> {
    type Group = MpiGroup<CartesianCommunicator>;

    // No reordering, so world rank 0 stays at grid position (0, 0).
    fn grid_groups(&self, grid_size: usize) -> Result<GridGroups<Self::Group>> {
        let mismatch = || CommError::TopologyMismatch {
            dims: vec![grid_size, grid_size],
            periods: vec![false, false],
            size: ProcessGroup::size(self),
        };
        if grid_size.checked_mul(grid_size) != Some(ProcessGroup::size(self)) {
            return Err(mismatch());
        }
        let extent = Rank::try_from(grid_size).map_err(|_| mismatch())?;
        let cart = self
            .comm
            .create_cartesian_communicator(&[extent, extent], &[false, false], false)
            .ok_or_else(mismatch)?;
        let coords = cart.rank_to_coordinates(cart.rank());
        Ok(GridGroups {
            row: coords[0] as usize,
            col: coords[1] as usize,
            row_group: MpiGroup::new(cart.subgroup(&[false, true])),
            col_group: MpiGroup::new(cart.subgroup(&[true, false])),
        })
    }
}
