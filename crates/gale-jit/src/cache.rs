use std::collections::HashMap;

use gale_a32::LocationDescriptor;

use crate::backend::CompiledBlock;

/// Reserved headroom: a miss with less than this much arena space free
/// forces a full flush before emitting.
pub(crate) const MIN_ARENA_HEADROOM: usize = 1024 * 1024;

/// Opaque handle to a compiled block in the code arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle(pub(crate) u32);

impl BlockHandle {
    pub(crate) fn index(self) -> u32 {
        self.0
    }
}

/// Forward-map entry for one translated block.
#[derive(Debug, Clone, Copy)]
pub struct BlockDescriptor {
    pub entrypoint: BlockHandle,
    pub size_in_host_bytes: usize,
    pub size_in_guest_bytes: u32,
    pub guest_start_pc: u32,
}

/// Bump-allocated store for compiled blocks.
///
/// Blocks are only ever appended; a partial invalidation patches a block's
/// entry and leaves the storage in place, and the whole arena is reset at a
/// full flush.
pub(crate) struct CodeArena {
    blocks: Vec<CompiledBlock>,
    used_bytes: usize,
    capacity_bytes: usize,
}

impl CodeArena {
    pub fn new(capacity_bytes: usize) -> CodeArena {
        CodeArena {
            blocks: Vec::new(),
            used_bytes: 0,
            capacity_bytes,
        }
    }

    pub fn space_remaining(&self) -> usize {
        self.capacity_bytes.saturating_sub(self.used_bytes)
    }

    pub fn insert(&mut self, block: CompiledBlock) -> BlockHandle {
        self.used_bytes += block.host_size_bytes();
        let handle = BlockHandle(self.blocks.len() as u32);
        self.blocks.push(block);
        handle
    }

    pub fn block(&self, handle: BlockHandle) -> &CompiledBlock {
        &self.blocks[handle.0 as usize]
    }

    /// Patch a block's entry to return straight to the dispatcher.
    pub fn invalidate(&mut self, handle: BlockHandle) {
        self.blocks[handle.0 as usize].invalidated = true;
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.used_bytes = 0;
    }
}

/// Reverse index: which translated blocks cover which guest addresses.
///
/// Entries are closed ranges; a block contributes one entry. Queries are
/// linear in the number of live blocks, which invalidation is already
/// proportional to.
#[derive(Default)]
pub(crate) struct BlockRanges {
    entries: Vec<(u32, u32, LocationDescriptor)>,
}

impl BlockRanges {
    pub fn add(&mut self, start: u32, end: u32, location: LocationDescriptor) {
        debug_assert!(start <= end);
        self.entries.push((start, end, location));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove every entry overlapping any of `ranges` and return the
    /// affected block locations.
    pub fn invalidate_ranges(&mut self, ranges: &[(u32, u32)]) -> Vec<LocationDescriptor> {
        let mut affected = Vec::new();
        self.entries.retain(|&(start, end, location)| {
            let hit = ranges.iter().any(|&(s, e)| start <= e && s <= end);
            if hit {
                affected.push(location);
            }
            !hit
        });
        affected
    }
}

const FAST_DISPATCH_TABLE_SIZE: usize = 0x10000;
const FAST_DISPATCH_TABLE_MASK: u64 = 0xFFFF0;

/// An empty slot carries a tag no location can hash to.
const EMPTY_TAG: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
struct FastDispatchEntry {
    location_descriptor: u64,
    code_ptr: u64,
}

const _: () = assert!(std::mem::size_of::<FastDispatchEntry>() == 0x10);

/// Direct-mapped probabilistic cache from location hash to compiled code.
///
/// The slot is written code pointer first, tag second, and probed tag
/// first; a slot whose tag matches therefore always carries a usable code
/// pointer.
pub(crate) struct FastDispatchTable {
    slots: Box<[FastDispatchEntry]>,
}

impl FastDispatchTable {
    pub fn new() -> FastDispatchTable {
        FastDispatchTable {
            slots: vec![
                FastDispatchEntry {
                    location_descriptor: EMPTY_TAG,
                    code_ptr: 0,
                };
                FAST_DISPATCH_TABLE_SIZE
            ]
            .into_boxed_slice(),
        }
    }

    fn index(hash: u64) -> usize {
        ((hash & FAST_DISPATCH_TABLE_MASK) >> 4) as usize
    }

    pub fn lookup(&self, hash: u64) -> Option<BlockHandle> {
        let slot = &self.slots[Self::index(hash)];
        (slot.location_descriptor == hash).then(|| BlockHandle(slot.code_ptr as u32))
    }

    pub fn insert(&mut self, hash: u64, handle: BlockHandle) {
        let slot = &mut self.slots[Self::index(hash)];
        slot.code_ptr = u64::from(handle.index());
        slot.location_descriptor = hash;
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.location_descriptor = EMPTY_TAG;
            slot.code_ptr = 0;
        }
    }
}

/// The complete code cache: arena, forward map and reverse range index.
pub(crate) struct CodeCache {
    pub arena: CodeArena,
    pub forward: HashMap<LocationDescriptor, BlockDescriptor>,
    pub ranges: BlockRanges,
}

impl CodeCache {
    pub fn new(arena_capacity: usize) -> CodeCache {
        CodeCache {
            arena: CodeArena::new(arena_capacity),
            forward: HashMap::new(),
            ranges: BlockRanges::default(),
        }
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.forward.clear();
        self.ranges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_a32::{Fpscr, Psr};

    fn loc(pc: u32) -> LocationDescriptor {
        LocationDescriptor::new(pc, Psr::new(0x1D0), Fpscr::new(0))
    }

    #[test]
    fn range_index_reports_overlaps() {
        let mut ranges = BlockRanges::default();
        ranges.add(0x0, 0xF, loc(0x0));
        ranges.add(0x10, 0x1F, loc(0x10));
        ranges.add(0x100, 0x10F, loc(0x100));

        let hit = ranges.invalidate_ranges(&[(0x4, 0x4)]);
        assert_eq!(hit, vec![loc(0x0)]);
        // Already removed: a second invalidation of the same range is empty.
        assert!(ranges.invalidate_ranges(&[(0x4, 0x4)]).is_empty());
        let hit = ranges.invalidate_ranges(&[(0x1F, 0x100)]);
        assert_eq!(hit.len(), 2);
    }

    #[test]
    fn fast_dispatch_is_direct_mapped_on_the_hash_window() {
        let mut table = FastDispatchTable::new();
        let a = loc(0x1000).unique_hash();
        table.insert(a, BlockHandle(7));
        assert_eq!(table.lookup(a), Some(BlockHandle(7)));

        // Same slot, different tag: the probe must reject it.
        let b = loc(0x1000 | 1 << 20).unique_hash();
        assert_eq!(FastDispatchTable::index(a), FastDispatchTable::index(b));
        assert_eq!(table.lookup(b), None);

        table.clear();
        assert_eq!(table.lookup(a), None);
    }
}
