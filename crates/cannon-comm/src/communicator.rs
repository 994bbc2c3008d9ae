use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{CommError, Result};
use crate::mailbox::Mailbox;

/// Message tag for point-to-point traffic.
pub type Tag = u32;

/// Tags at or above this value belong to the collectives.
pub const RESERVED_TAG_BASE: Tag = 0xFFFF_0000;

const TAG_BROADCAST: Tag = RESERVED_TAG_BASE;
const TAG_SCATTER: Tag = RESERVED_TAG_BASE + 1;
const TAG_GATHER: Tag = RESERVED_TAG_BASE + 2;
const TAG_SPLIT_GATHER: Tag = RESERVED_TAG_BASE + 3;
const TAG_SPLIT_TABLE: Tag = RESERVED_TAG_BASE + 4;

/// A group of ranks plus this rank's position in it.
///
/// Every communicator has its own context id, so traffic on a row group never
/// matches a receive posted on a column group even between the same pair of
/// ranks. Communicators are owned by one rank's thread and are not `Send`.
pub struct Communicator {
    mailbox: Rc<Mailbox>,
    context: u64,
    // Local rank -> world rank.
    members: Rc<[usize]>,
    rank: usize,
    splits: Cell<u64>,
}

impl Communicator {
    pub(crate) fn world(mailbox: Rc<Mailbox>, size: usize) -> Self {
        let rank = mailbox.world_rank();
        Communicator {
            mailbox,
            context: 0,
            members: (0..size).collect(),
            rank,
            splits: Cell::new(0),
        }
    }

    /// This process's rank within the group.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of processes in the group.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Rank of this process in the world group.
    pub fn world_rank(&self) -> usize {
        self.mailbox.world_rank()
    }

    fn world_rank_of(&self, rank: usize) -> Result<usize> {
        self.members
            .get(rank)
            .copied()
            .ok_or(CommError::RankOutOfRange {
                rank,
                size: self.size(),
            })
    }

    fn post<T: Send + 'static>(&self, dest: usize, tag: Tag, value: T) -> Result<()> {
        let dest_world = self.world_rank_of(dest)?;
        trace!(context = self.context, dest, tag, "send");
        self.mailbox
            .post(dest_world, self.context, tag, Box::new(value))
    }

    fn take<T: 'static>(&self, source: usize, tag: Tag) -> Result<T> {
        let source_world = self.world_rank_of(source)?;
        let envelope = self.mailbox.take(self.context, source_world, tag)?;
        trace!(context = self.context, source, tag, "recv");
        envelope
            .payload
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| CommError::PayloadType { peer: source, tag })
    }

    fn check_tag(tag: Tag) -> Result<()> {
        if tag >= RESERVED_TAG_BASE {
            return Err(CommError::ReservedTag(tag));
        }
        Ok(())
    }

    /// Send `value` to rank `dest`. Sends are buffered and never block.
    pub fn send<T: Send + 'static>(&self, dest: usize, tag: Tag, value: T) -> Result<()> {
        Self::check_tag(tag)?;
        self.post(dest, tag, value)
    }

    /// Block until a value with `tag` arrives from rank `source`.
    pub fn recv<T: 'static>(&self, source: usize, tag: Tag) -> Result<T> {
        Self::check_tag(tag)?;
        self.take(source, tag)
    }

    /// Send the contents of `buf` to `dest` and overwrite `buf` with the
    /// buffer received from `source`.
    ///
    /// Both sides of every pairing must pass buffers of the same length.
    pub fn sendrecv_replace(
        &self,
        buf: &mut [f64],
        dest: usize,
        source: usize,
        tag: Tag,
    ) -> Result<()> {
        Self::check_tag(tag)?;
        self.post(dest, tag, buf.to_vec())?;
        let incoming: Vec<f64> = self.take(source, tag)?;
        if incoming.len() != buf.len() {
            return Err(CommError::LengthMismatch {
                expected: buf.len(),
                got: incoming.len(),
            });
        }
        buf.copy_from_slice(&incoming);
        Ok(())
    }

    /// Distribute the root's `value` to every member; the root passes `Some`.
    pub fn broadcast<T: Clone + Send + 'static>(&self, root: usize, value: Option<T>) -> Result<T> {
        self.world_rank_of(root)?;
        if self.rank != root {
            return self.take(root, TAG_BROADCAST);
        }
        let value = value.ok_or(CommError::MissingRootBuffer { root })?;
        for dest in (0..self.size()).filter(|&r| r != root) {
            self.post(dest, TAG_BROADCAST, value.clone())?;
        }
        Ok(value)
    }

    /// Split the root's `send` buffer into `size()` contiguous chunks of
    /// `recv.len()` elements and deliver chunk `r` to rank `r`.
    ///
    /// Only the root's `send` is read.
    pub fn scatter(&self, root: usize, send: Option<&[f64]>, recv: &mut [f64]) -> Result<()> {
        self.world_rank_of(root)?;
        let chunk = recv.len();
        if self.rank != root {
            let incoming: Vec<f64> = self.take(root, TAG_SCATTER)?;
            if incoming.len() != chunk {
                return Err(CommError::LengthMismatch {
                    expected: chunk,
                    got: incoming.len(),
                });
            }
            recv.copy_from_slice(&incoming);
            return Ok(());
        }

        let send = send.ok_or(CommError::MissingRootBuffer { root })?;
        if send.len() != chunk * self.size() {
            return Err(CommError::LengthMismatch {
                expected: chunk * self.size(),
                got: send.len(),
            });
        }
        for dest in 0..self.size() {
            let part = &send[dest * chunk..(dest + 1) * chunk];
            if dest == root {
                recv.copy_from_slice(part);
            } else {
                self.post(dest, TAG_SCATTER, part.to_vec())?;
            }
        }
        Ok(())
    }

    /// Concatenate every member's `send` buffer, in rank order, into the
    /// root's `recv` buffer. Only the root's `recv` is written.
    pub fn gather(&self, root: usize, send: &[f64], recv: Option<&mut [f64]>) -> Result<()> {
        self.world_rank_of(root)?;
        if self.rank != root {
            return self.post(root, TAG_GATHER, send.to_vec());
        }

        let recv = recv.ok_or(CommError::MissingRootBuffer { root })?;
        let chunk = send.len();
        if recv.len() != chunk * self.size() {
            return Err(CommError::LengthMismatch {
                expected: chunk * self.size(),
                got: recv.len(),
            });
        }
        for source in 0..self.size() {
            let slot = &mut recv[source * chunk..(source + 1) * chunk];
            if source == root {
                slot.copy_from_slice(send);
                continue;
            }
            let incoming: Vec<f64> = self.take(source, TAG_GATHER)?;
            if incoming.len() != chunk {
                return Err(CommError::LengthMismatch {
                    expected: chunk,
                    got: incoming.len(),
                });
            }
            slot.copy_from_slice(&incoming);
        }
        Ok(())
    }

    /// Partition the group: members passing the same `color` form a new
    /// communicator, ranked by `(key, rank in this group)`.
    ///
    /// Collective over this communicator. The new context id is derived from
    /// this group's context, how many splits it has performed and the color,
    /// so every member computes the same id without negotiating.
    pub fn split(&self, color: usize, key: usize) -> Result<Communicator> {
        let sequence = self.splits.get();
        self.splits.set(sequence + 1);

        let table: Vec<(usize, usize)> = if self.rank == 0 {
            let mut table = Vec::with_capacity(self.size());
            table.push((color, key));
            for source in 1..self.size() {
                table.push(self.take::<(usize, usize)>(source, TAG_SPLIT_GATHER)?);
            }
            for dest in 1..self.size() {
                self.post(dest, TAG_SPLIT_TABLE, table.clone())?;
            }
            table
        } else {
            self.post(0, TAG_SPLIT_GATHER, (color, key))?;
            self.take(0, TAG_SPLIT_TABLE)?
        };

        let mut group: Vec<(usize, usize)> = table
            .iter()
            .enumerate()
            .filter(|(_, (c, _))| *c == color)
            .map(|(parent_rank, (_, k))| (*k, parent_rank))
            .collect();
        group.sort_unstable();

        let members = group
            .iter()
            .map(|&(_, parent_rank)| self.members[parent_rank])
            .collect::<Rc<[usize]>>();
        let rank = group
            .iter()
            .position(|&(_, parent_rank)| parent_rank == self.rank)
            .ok_or(CommError::RankOutOfRange {
                rank: self.rank,
                size: group.len(),
            })?;
        let context = derive_context(self.context, sequence, color);

        debug!(
            parent = self.context,
            context,
            color,
            rank,
            size = members.len(),
            "split communicator"
        );
        Ok(Communicator {
            mailbox: Rc::clone(&self.mailbox),
            context,
            members,
            rank,
            splits: Cell::new(0),
        })
    }
}

fn derive_context(parent: u64, sequence: u64, color: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    (parent, sequence, color).hash(&mut hasher);
    // 0 is the world context.
    hasher.finish().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn test_ring_send_recv() {
        let results = World::launch(4, |comm| {
            let next = (comm.rank() + 1) % comm.size();
            let prev = (comm.rank() + comm.size() - 1) % comm.size();
            comm.send(next, 3, comm.rank())?;
            comm.recv::<usize>(prev, 3)
        })
        .unwrap();
        assert_eq!(
            results.into_iter().collect::<Result<Vec<_>>>().unwrap(),
            vec![3, 0, 1, 2]
        );
    }

    #[test]
    fn test_reserved_tag_rejected() {
        let results = World::launch(1, |comm| comm.send(0, RESERVED_TAG_BASE, 1u8)).unwrap();
        assert_eq!(results[0], Err(CommError::ReservedTag(RESERVED_TAG_BASE)));
    }

    #[test]
    fn test_payload_type_mismatch() {
        let results = World::launch(1, |comm| {
            comm.send(0, 1, 1.5f64)?;
            comm.recv::<usize>(0, 1)
        })
        .unwrap();
        assert_eq!(results[0], Err(CommError::PayloadType { peer: 0, tag: 1 }));
    }

    #[test]
    fn test_sendrecv_replace_rotates() {
        let results = World::launch(3, |comm| {
            let n = comm.size();
            let mut buf = vec![comm.rank() as f64; 2];
            let dest = (comm.rank() + n - 1) % n;
            let source = (comm.rank() + 1) % n;
            comm.sendrecv_replace(&mut buf, dest, source, 0)?;
            Ok::<_, CommError>(buf)
        })
        .unwrap();
        let bufs: Vec<Vec<f64>> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(bufs, vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_sendrecv_replace_with_self() {
        let results = World::launch(1, |comm| {
            let mut buf = vec![4.0, 2.0];
            comm.sendrecv_replace(&mut buf, 0, 0, 0)?;
            Ok::<_, CommError>(buf)
        })
        .unwrap();
        assert_eq!(results[0], Ok(vec![4.0, 2.0]));
    }

    #[test]
    fn test_broadcast() {
        let results = World::launch(4, |comm| {
            let value = (comm.rank() == 2).then_some(99usize);
            comm.broadcast(2, value)
        })
        .unwrap();
        assert!(results.iter().all(|r| *r == Ok(99)));
    }

    #[test]
    fn test_broadcast_root_without_value() {
        let results = World::launch(1, |comm| comm.broadcast::<usize>(0, None)).unwrap();
        assert_eq!(results[0], Err(CommError::MissingRootBuffer { root: 0 }));
    }

    #[test]
    fn test_scatter_then_gather() {
        let results = World::launch(3, |comm| {
            let full: Vec<f64> = (0..6).map(|v| v as f64).collect();
            let send = (comm.rank() == 0).then_some(full.as_slice());
            let mut part = vec![0.0; 2];
            comm.scatter(0, send, &mut part)?;
            let local = part.clone();

            for v in part.iter_mut() {
                *v *= 10.0;
            }
            let mut gathered = vec![0.0; 6];
            let recv = (comm.rank() == 0).then_some(gathered.as_mut_slice());
            comm.gather(0, &part, recv)?;
            Ok::<_, CommError>((local, gathered))
        })
        .unwrap();

        let (local0, gathered) = results[0].clone().unwrap();
        assert_eq!(local0, vec![0.0, 1.0]);
        assert_eq!(results[2].clone().unwrap().0, vec![4.0, 5.0]);
        assert_eq!(gathered, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
        // Non-root receive buffers are left untouched.
        assert_eq!(results[1].clone().unwrap().1, vec![0.0; 6]);
    }

    #[test]
    fn test_scatter_length_mismatch_at_root() {
        let results = World::launch(1, |comm| {
            let mut part = vec![0.0; 2];
            comm.scatter(0, Some(&[1.0, 2.0, 3.0]), &mut part)
        })
        .unwrap();
        assert_eq!(
            results[0],
            Err(CommError::LengthMismatch { expected: 2, got: 3 })
        );
    }

    #[test]
    fn test_split_groups_by_color_and_orders_by_key() {
        let results = World::launch(6, |comm| {
            // Two groups by parity, ranked in reverse.
            let sub = comm.split(comm.rank() % 2, 100 - comm.rank())?;
            let everyone = sub.broadcast(0, (sub.rank() == 0).then_some(comm.rank()))?;
            Ok::<_, CommError>((sub.size(), sub.rank(), everyone))
        })
        .unwrap();
        let results: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        // Even ranks 0, 2, 4 -> keys 100, 98, 96 -> order 4, 2, 0.
        assert_eq!(results[4], (3, 0, 4));
        assert_eq!(results[2], (3, 1, 4));
        assert_eq!(results[0], (3, 2, 4));
        // Odd ranks 1, 3, 5 -> order 5, 3, 1.
        assert_eq!(results[5], (3, 0, 5));
        assert_eq!(results[1], (3, 2, 5));
    }

    #[test]
    fn test_split_contexts_do_not_cross() {
        let results = World::launch(4, |comm| {
            let a = comm.split(0, comm.rank())?;
            let b = comm.split(0, comm.rank())?;
            // Same membership, same tag: the messages must still stay apart.
            let peer = comm.rank() ^ 1;
            a.send(peer, 1, "a")?;
            b.send(peer, 1, "b")?;
            let from_b: &'static str = b.recv(peer, 1)?;
            let from_a: &'static str = a.recv(peer, 1)?;
            Ok::<_, CommError>((from_a, from_b))
        })
        .unwrap();
        assert!(results.iter().all(|r| *r == Ok(("a", "b"))));
    }
}
