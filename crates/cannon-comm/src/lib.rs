//! `cannon-comm` - SPMD process groups for cannon-runtime.
//!
//! The grid algorithm is written against the [`ProcessGroup`] and
//! [`GridTopology`] traits. The default backend launches a fixed number of
//! ranks together in one process, one OS thread each, and they coordinate
//! only through message passing:
//! - `World` launches the ranks and hands each its world `Communicator`
//! - `Communicator` offers point-to-point messages, the paired in-place
//!   exchange, and the broadcast/scatter/gather collectives
//! - `Communicator::split` and `CartComm` derive row/column groups from a
//!   Cartesian layout
//!
//! With the `mpi` feature, `mpi_backend::MpiGroup` implements the same traits
//! over an MPI communicator for runs launched by `mpirun`.
//!
//! Every collective must be entered by all members of the group in the same
//! order. Receives block without timeout; in the in-process backend a
//! receive fails with `CommError::Disconnected` once every peer has finished.

pub mod cart;
pub mod communicator;
pub mod error;
pub mod group;
mod mailbox;
#[cfg(feature = "mpi")]
pub mod mpi_backend;
pub mod world;

pub use cart::CartComm;
pub use communicator::{Communicator, Tag};
pub use error::{CommError, Result};
pub use group::{GridGroups, GridTopology, ProcessGroup};
#[cfg(feature = "mpi")]
pub use mpi_backend::MpiGroup;
pub use world::World;
