use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

use crate::error::{CommError, Result};

/// One message in flight between two world ranks.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub context: u64,
    pub source: usize,
    pub tag: u32,
    pub payload: Box<dyn Any + Send>,
}

impl Envelope {
    fn matches(&self, context: u64, source: usize, tag: u32) -> bool {
        self.context == context && self.source == source && self.tag == tag
    }
}

/// A rank's connection to the rest of the world: its own inbox plus a sender
/// into every other rank's inbox. Shared by all communicators the rank
/// derives.
///
/// A rank holds no sender to itself; messages to self go straight to
/// `pending`. The inbox therefore disconnects once every peer has dropped
/// its mailbox, and a receive that can no longer be satisfied fails instead
/// of blocking forever.
pub(crate) struct Mailbox {
    world_rank: usize,
    // Indexed by world rank; `None` at this rank's own slot.
    outboxes: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    // Arrived envelopes that no receive has asked for yet.
    pending: RefCell<VecDeque<Envelope>>,
}

impl Mailbox {
    pub fn new(
        world_rank: usize,
        outboxes: Vec<Option<Sender<Envelope>>>,
        inbox: Receiver<Envelope>,
    ) -> Self {
        Mailbox {
            world_rank,
            outboxes,
            inbox,
            pending: RefCell::new(VecDeque::new()),
        }
    }

    pub fn world_rank(&self) -> usize {
        self.world_rank
    }

    /// Deliver to world rank `dest`. Never blocks.
    pub fn post(
        &self,
        dest: usize,
        context: u64,
        tag: u32,
        payload: Box<dyn Any + Send>,
    ) -> Result<()> {
        let outbox = self.outboxes.get(dest).ok_or(CommError::RankOutOfRange {
            rank: dest,
            size: self.outboxes.len(),
        })?;
        let envelope = Envelope {
            context,
            source: self.world_rank,
            tag,
            payload,
        };
        match outbox {
            Some(outbox) => outbox
                .send(envelope)
                .map_err(|_| CommError::Disconnected { peer: dest }),
            None => {
                self.pending.borrow_mut().push_back(envelope);
                Ok(())
            }
        }
    }

    /// Block until an envelope from world rank `source` with the given
    /// context and tag arrives. Envelopes for other receives are parked in
    /// arrival order, which keeps per-pair delivery FIFO.
    ///
    /// Fails with `Disconnected` once no peer is left that could send.
    pub fn take(&self, context: u64, source: usize, tag: u32) -> Result<Envelope> {
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(pos) = pending.iter().position(|e| e.matches(context, source, tag)) {
                if let Some(envelope) = pending.remove(pos) {
                    return Ok(envelope);
                }
            }
        }
        loop {
            let envelope = self
                .inbox
                .recv()
                .map_err(|_| CommError::Disconnected { peer: source })?;
            if envelope.matches(context, source, tag) {
                return Ok(envelope);
            }
            self.pending.borrow_mut().push_back(envelope);
        }
    }
}
