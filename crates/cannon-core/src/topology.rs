use cannon_comm::{GridTopology, ProcessGroup};
use tracing::debug;

use crate::config::grid_size_for;
use crate::error::Result;

/// Position of a process in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoords {
    pub row: usize,
    pub col: usize,
}

/// The √P × √P process grid, fixed for the whole run.
///
/// `row` holds the processes of this process's grid row ordered by column,
/// so a process's rank in it is its column index. `col` is the transpose:
/// the processes of this grid column, ranked by row.
pub struct ProcessGrid<G> {
    grid_size: usize,
    coords: GridCoords,
    world_rank: usize,
    row: G,
    col: G,
}

impl<G: ProcessGroup> ProcessGrid<G> {
    /// Collective over `world`: lay the processes out on a non-periodic 2D
    /// grid and derive the row and column groups.
    ///
    /// A non-square group is rejected before any communication, identically
    /// on every rank.
    pub fn build<W>(world: &W) -> Result<ProcessGrid<G>>
    where
        W: GridTopology<Group = G>,
    {
        let grid_size = grid_size_for(world.size())?;
        let groups = world.grid_groups(grid_size)?;
        let coords = GridCoords {
            row: groups.row,
            col: groups.col,
        };

        debug!(
            world_rank = world.rank(),
            row = coords.row,
            col = coords.col,
            grid_size,
            "joined process grid"
        );
        Ok(ProcessGrid {
            grid_size,
            coords,
            world_rank: world.rank(),
            row: groups.row_group,
            col: groups.col_group,
        })
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn coords(&self) -> GridCoords {
        self.coords
    }

    /// Rank of this process in the group the grid was built from.
    pub fn world_rank(&self) -> usize {
        self.world_rank
    }

    /// True for the process at grid position (0, 0), the root of both the
    /// first row group and the first column group.
    pub fn is_origin(&self) -> bool {
        self.coords.row == 0 && self.coords.col == 0
    }

    /// Processes sharing this row, ranked by column.
    pub fn row_group(&self) -> &G {
        &self.row
    }

    /// Processes sharing this column, ranked by row.
    pub fn col_group(&self) -> &G {
        &self.col
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CannonError;
    use cannon_comm::World;
    use std::collections::HashSet;

    #[test]
    fn test_grid_is_a_bijection() {
        let results = World::launch(9, |world| {
            let grid = ProcessGrid::build(&world)?;
            Ok::<_, CannonError>((world.rank(), grid.coords()))
        })
        .unwrap();
        let placed: Vec<(usize, GridCoords)> = results.into_iter().map(|r| r.unwrap()).collect();
        let cells: HashSet<GridCoords> = placed.iter().map(|(_, c)| *c).collect();
        assert_eq!(cells.len(), 9);
        for (rank, coords) in placed {
            assert_eq!(coords, GridCoords { row: rank / 3, col: rank % 3 });
        }
    }

    #[test]
    fn test_groups_follow_coordinates() {
        let results = World::launch(4, |world| {
            let grid = ProcessGrid::build(&world)?;
            let c = grid.coords();
            Ok::<_, CannonError>((
                grid.row_group().rank() == c.col,
                grid.col_group().rank() == c.row,
                grid.row_group().size(),
                grid.col_group().size(),
                grid.is_origin() == (world.rank() == 0),
            ))
        })
        .unwrap();
        for r in results {
            assert_eq!(r.unwrap(), (true, true, 2, 2, true));
        }
    }

    #[test]
    fn test_non_square_is_rejected_on_every_rank() {
        let results = World::launch(6, |world| ProcessGrid::build(&world).map(|_| ())).unwrap();
        assert!(results
            .iter()
            .all(|r| *r == Err(CannonError::NonSquareProcessCount { processes: 6 })));
    }

    #[test]
    fn test_single_process_grid() {
        let results = World::launch(1, |world| {
            let grid = ProcessGrid::build(&world)?;
            Ok::<_, CannonError>((
                grid.grid_size(),
                grid.is_origin(),
                grid.world_rank(),
                grid.row_group().size(),
                grid.col_group().size(),
            ))
        })
        .unwrap();
        assert_eq!(results[0], Ok((1, true, 0, 1, 1)));
    }
}
