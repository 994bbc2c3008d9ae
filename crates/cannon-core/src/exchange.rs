use cannon_comm::ProcessGroup;

use crate::error::Result;

/// Rotate `block` circularly toward lower ranks of `group` by `offset`
/// positions: it is sent to rank `rank - offset` and replaced by the block of
/// rank `rank + offset`, both taken modulo the group size.
///
/// The grid has no physical wraparound, so the modulo here is what closes
/// the ring. Every member must pass the same `offset`; an offset that is a
/// multiple of the group size is a no-op on all of them.
pub fn circular_shift<G>(block: &mut [f64], group: &G, offset: usize) -> Result<()>
where
    G: ProcessGroup + ?Sized,
{
    let size = group.size();
    let offset = offset % size;
    if offset == 0 {
        return Ok(());
    }
    let rank = group.rank();
    let dest = (rank + size - offset) % size;
    let source = (rank + offset) % size;
    group.sendrecv_replace(block, dest, source)?;
    Ok(())
}
