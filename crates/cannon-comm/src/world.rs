use std::rc::Rc;
use std::sync::mpsc;
use std::thread;

use tracing::{debug, debug_span};

use crate::communicator::Communicator;
use crate::error::{CommError, Result};
use crate::mailbox::Mailbox;

/// Launcher for a fixed-size SPMD process group.
///
/// Each rank runs the same body on its own OS thread with its own world
/// `Communicator`. Ranks share no memory; the only coupling is through
/// messages. The group size is fixed for the whole run.
#[derive(Debug, Clone, Copy)]
pub struct World;

impl World {
    /// Run `body` on `size` ranks and return each rank's result, ordered by
    /// rank, once every rank has finished.
    ///
    /// A rank that panics is reported as `CommError::RankPanicked`. A rank
    /// blocked in a receive fails with `CommError::Disconnected` once every
    /// peer has returned or panicked; while any peer is still running, it
    /// keeps waiting.
    pub fn launch<R, F>(size: usize, body: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(Communicator) -> R + Sync,
    {
        if size == 0 {
            return Err(CommError::EmptyWorld);
        }
        debug!(size, "launching process group");

        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel()).unzip();
        // Each rank gets a sender to every peer and none to itself. The
        // originals are dropped here, so a rank's inbox closes once all of
        // its peers have finished.
        let connections: Vec<Vec<_>> = (0..size)
            .map(|rank| {
                senders
                    .iter()
                    .enumerate()
                    .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                    .collect()
            })
            .collect();
        drop(senders);
        let body = &body;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(size);
            for (rank, (inbox, outboxes)) in inboxes.into_iter().zip(connections).enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("rank-{rank}"))
                    .spawn_scoped(scope, move || {
                        let _span = debug_span!("rank", rank).entered();
                        let mailbox = Rc::new(Mailbox::new(rank, outboxes, inbox));
                        body(Communicator::world(mailbox, size))
                    })
                    .map_err(|e| CommError::Spawn {
                        rank,
                        reason: e.to_string(),
                    })?;
                handles.push(handle);
            }

            // Join everything before reporting so no panicked rank is left
            // for the scope to re-raise.
            let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
            joined
                .into_iter()
                .enumerate()
                .map(|(rank, outcome)| outcome.map_err(|_| CommError::RankPanicked { rank }))
                .collect()
        })
    }
}
