use std::ops::Deref;

use tracing::debug;

use crate::communicator::Communicator;
use crate::error::{CommError, Result};

/// A communicator with a Cartesian layout of its ranks.
///
/// Ranks are laid out row-major: in a `[rows, cols]` grid rank `r` sits at
/// `(r / cols, r % cols)`. Periodicity is recorded and honored by
/// [`CartComm::rank_of`]; shifts that wrap on a non-periodic grid have to
/// apply the modulo themselves.
pub struct CartComm {
    comm: Communicator,
    dims: Vec<usize>,
    periods: Vec<bool>,
}

impl Communicator {
    /// Collective: build a Cartesian topology over this group.
    ///
    /// `reorder` permits renumbering ranks for locality; this runtime always
    /// resolves it to the identity mapping, which is the same on every rank.
    pub fn create_cart(&self, dims: &[usize], periods: &[bool], reorder: bool) -> Result<CartComm> {
        if dims.len() != periods.len() || dims.iter().product::<usize>() != self.size() {
            return Err(CommError::TopologyMismatch {
                dims: dims.to_vec(),
                periods: periods.to_vec(),
                size: self.size(),
            });
        }
        let comm = self.split(0, self.rank())?;
        debug!(?dims, ?periods, reorder, rank = comm.rank(), "created cartesian topology");
        Ok(CartComm {
            comm,
            dims: dims.to_vec(),
            periods: periods.to_vec(),
        })
    }
}

impl CartComm {
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn periods(&self) -> &[bool] {
        &self.periods
    }

    /// Coordinates of `rank` in the grid.
    pub fn coords(&self, rank: usize) -> Result<Vec<usize>> {
        if rank >= self.comm.size() {
            return Err(CommError::RankOutOfRange {
                rank,
                size: self.comm.size(),
            });
        }
        let mut coords = vec![0; self.dims.len()];
        let mut rest = rank;
        for (axis, &extent) in self.dims.iter().enumerate().rev() {
            coords[axis] = rest % extent;
            rest /= extent;
        }
        Ok(coords)
    }

    /// Rank at `coords`. Periodic axes wrap; non-periodic axes must be in
    /// range.
    pub fn rank_of(&self, coords: &[usize]) -> Result<usize> {
        let out_of_range = || CommError::CoordsOutOfRange {
            coords: coords.to_vec(),
            dims: self.dims.clone(),
        };
        if coords.len() != self.dims.len() {
            return Err(out_of_range());
        }
        let mut rank = 0;
        for ((&c, &extent), &periodic) in coords.iter().zip(&self.dims).zip(&self.periods) {
            let c = match (c < extent, periodic) {
                (true, _) => c,
                (false, true) => c % extent,
                (false, false) => return Err(out_of_range()),
            };
            rank = rank * extent + c;
        }
        Ok(rank)
    }

    /// Collective: split into sub-grids keeping the axes flagged in `remain`.
    ///
    /// Ranks sharing every dropped coordinate land in the same group and are
    /// ordered by their kept coordinates, row-major.
    pub fn sub(&self, remain: &[bool]) -> Result<Communicator> {
        if remain.len() != self.dims.len() {
            return Err(CommError::TopologyMismatch {
                dims: self.dims.clone(),
                periods: self.periods.clone(),
                size: self.comm.size(),
            });
        }
        let coords = self.coords(self.comm.rank())?;
        let mut color = 0;
        let mut key = 0;
        for ((&c, &extent), &keep) in coords.iter().zip(&self.dims).zip(remain) {
            if keep {
                key = key * extent + c;
            } else {
                color = color * extent + c;
            }
        }
        self.comm.split(color, key)
    }
}

impl Deref for CartComm {
    type Target = Communicator;

    fn deref(&self) -> &Communicator {
        &self.comm
    }
}
