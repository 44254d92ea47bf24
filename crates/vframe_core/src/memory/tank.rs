//! # Tank Allocator
//!
//! One fixed arena, carved into "tanks". Every tank serves a single size
//! class and is subdivided into equal fields tracked by a free-field bitmap.
//!
//! ```text
//!  arena (u64 words)
//!  ┌──────────── tank 0 ────────────┬──────── tank 1 ────────┬─ ...
//!  │ field │ field │ field │ field  │  field  │  field  │    │
//!  │  32B  │  32B  │  32B  │  32B   │   48B   │   48B   │    │
//!  └────────────────────────────────┴────────────────────────┴─ ...
//! ```
//!
//! Requests are rounded up to the smallest class that fits. When the request
//! is larger than every class, or every tank of its class is full, the block
//! comes from the heap instead and is recorded in an overflow side-table so
//! `free` can route it back.

use std::collections::HashMap;
use std::ops::Range;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte granularity of the arena. Field sizes are rounded up to this, so every
/// field start is aligned for any `Pod` type with alignment of 8 or less.
pub const FIELD_ALIGN: usize = std::mem::size_of::<u64>();

/// One size class in the tank layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankClass {
    /// Size of every field in this class, in bytes.
    pub field_size: usize,
    /// Fields per tank.
    pub field_count: usize,
    /// Number of tanks dedicated to this class.
    pub tanks: usize,
}

impl TankClass {
    /// Creates a new size class.
    #[must_use]
    pub const fn new(field_size: usize, field_count: usize, tanks: usize) -> Self {
        Self {
            field_size,
            field_count,
            tanks,
        }
    }

    /// Bytes this class occupies in the arena once rounded.
    #[must_use]
    pub const fn arena_bytes(self) -> usize {
        round_up(self.field_size) * self.field_count * self.tanks
    }
}

/// Layout sized for the scene object records plus a few raw classes.
#[must_use]
pub fn default_layout() -> Vec<TankClass> {
    vec![
        TankClass::new(16, 256, 1),
        TankClass::new(32, 256, 2),
        TankClass::new(48, 256, 4),
        TankClass::new(64, 128, 1),
        TankClass::new(96, 128, 2),
        TankClass::new(256, 64, 1),
    ]
}

const fn round_up(size: usize) -> usize {
    (size + FIELD_ALIGN - 1) & !(FIELD_ALIGN - 1)
}

/// Allocator failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// Zero-byte requests are rejected.
    #[error("zero-sized allocation requested")]
    ZeroSize,

    /// Neither the arena nor the heap could satisfy the request.
    #[error("allocation of {size} bytes failed: arena and heap exhausted")]
    Exhausted {
        /// Requested size.
        size: usize,
    },

    /// The block is not currently allocated (double free or foreign block).
    #[error("block {0:?} is not currently allocated")]
    UnknownBlock(Block),
}

/// Where a block's bytes live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockOrigin {
    /// A field inside a tank.
    Tank {
        /// Tank index.
        tank: u16,
        /// Field index inside the tank.
        field: u32,
    },
    /// A heap allocation tracked in the overflow side-table.
    Overflow {
        /// Side-table key.
        id: u32,
    },
}

/// A block handed out by [`TankAllocator::allocate`].
///
/// The block is a ticket, not a pointer: its bytes are reached through the
/// allocator, which re-validates it on every access. The claim generation
/// stops a ticket from reaching a later owner of the same field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    origin: BlockOrigin,
    generation: u32,
    size: u32,
}

impl Block {
    /// Requested size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        self.size as usize
    }

    /// Where the bytes live.
    #[inline]
    #[must_use]
    pub const fn origin(self) -> BlockOrigin {
        self.origin
    }

    /// Whether the block lives in the arena.
    #[inline]
    #[must_use]
    pub const fn is_pooled(self) -> bool {
        matches!(self.origin, BlockOrigin::Tank { .. })
    }
}

/// Which path a freed block was returned through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeStatus {
    /// Field returned to its tank.
    Pooled,
    /// Heap block released.
    Overflow,
}

/// Allocator counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TankStats {
    /// Bytes currently handed out (requested sizes, not rounded).
    pub live_bytes: usize,
    /// High-water mark of `live_bytes`.
    pub peak_live_bytes: usize,
    /// Blocks currently served from tanks.
    pub pooled_blocks: usize,
    /// Blocks currently served from the heap.
    pub overflow_blocks: usize,
    /// Bytes currently served from the heap.
    pub overflow_bytes: usize,
    /// Heap allocations made while the overflow budget was already spent.
    pub over_budget_allocations: u64,
    /// Allocations since creation.
    pub total_allocations: u64,
    /// Frees since creation.
    pub total_frees: u64,
}

/// Occupancy of a single tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TankUsage {
    /// Field size of the tank's class.
    pub field_size: usize,
    /// Fields in use.
    pub used: usize,
    /// Total fields.
    pub capacity: usize,
}

struct Tank {
    field_size: usize,
    first_byte: usize,
    field_count: u32,
    /// One bit per field, 1 = claimed. Tail bits past `field_count` start set.
    claimed: Vec<u64>,
    /// Claim generation per field, bumped on every claim.
    generations: Vec<u32>,
    in_use: u32,
    hint: u32,
}

impl Tank {
    fn new(field_size: usize, field_count: u32, first_byte: usize) -> Self {
        let words = (field_count as usize).div_ceil(64);
        let mut claimed = vec![0u64; words];
        let tail = field_count % 64;
        if tail != 0 {
            if let Some(last) = claimed.last_mut() {
                *last = !0u64 << tail;
            }
        }
        Self {
            field_size,
            first_byte,
            field_count,
            claimed,
            generations: vec![0; field_count as usize],
            in_use: 0,
            hint: 0,
        }
    }

    fn claim(&mut self) -> Option<(u32, u32)> {
        if self.in_use == self.field_count {
            return None;
        }

        let words = self.claimed.len();
        let start = (self.hint / 64) as usize;
        for step in 0..words {
            let word = (start + step) % words;
            let bits = self.claimed[word];
            if bits == u64::MAX {
                continue;
            }
            let bit = (!bits).trailing_zeros();
            let field = word as u32 * 64 + bit;
            debug_assert!(field < self.field_count);

            self.claimed[word] |= 1 << bit;
            self.in_use += 1;
            self.hint = if field + 1 >= self.field_count { 0 } else { field + 1 };

            let generation = &mut self.generations[field as usize];
            *generation = generation.wrapping_add(1);
            return Some((field, *generation));
        }
        None
    }

    fn release(&mut self, field: u32) {
        let (word, bit) = ((field / 64) as usize, field % 64);
        self.claimed[word] &= !(1 << bit);
        self.in_use -= 1;
        self.hint = field;
    }

    /// Whether `field` is claimed by the owner holding `generation`.
    fn holds(&self, field: u32, generation: u32) -> bool {
        if field >= self.field_count {
            return false;
        }
        let (word, bit) = ((field / 64) as usize, field % 64);
        self.claimed[word] & (1 << bit) != 0 && self.generations[field as usize] == generation
    }

    fn byte_range(&self, field: u32, len: usize) -> Range<usize> {
        let start = self.first_byte + field as usize * self.field_size;
        start..start + len
    }
}

/// Fixed-capacity pooled allocator.
///
/// # Thread Safety
///
/// Not thread-safe on its own. The scene keeps it behind the scene lock.
///
/// # Example
///
/// ```rust,ignore
/// let mut tanks = TankAllocator::new(&default_layout(), 64 * 1024);
/// let block = tanks.allocate(24, true)?;
/// tanks.bytes_mut(block).unwrap()[0] = 7;
/// tanks.free(block, true)?;
/// ```
pub struct TankAllocator {
    arena: Box<[u64]>,
    tanks: Vec<Tank>,
    /// Heap blocks keyed by id, with the generation they were issued under.
    overflow: HashMap<u32, (u32, Box<[u64]>)>,
    next_overflow_id: u32,
    overflow_generation: u32,
    overflow_budget: usize,
    stats: TankStats,
}

impl TankAllocator {
    /// Creates an allocator for the given layout.
    ///
    /// Classes with zero fields or zero tanks are skipped. The whole arena is
    /// allocated once, here.
    ///
    /// # Arguments
    ///
    /// * `layout` - Size classes
    /// * `overflow_budget` - Heap bytes tolerated before overflow is reported
    ///
    /// # Panics
    ///
    /// Panics if the layout describes more than `u16::MAX` tanks or a tank
    /// with more than `u32::MAX` fields.
    #[must_use]
    pub fn new(layout: &[TankClass], overflow_budget: usize) -> Self {
        let mut classes: Vec<TankClass> = layout
            .iter()
            .filter(|c| c.field_size > 0 && c.field_count > 0 && c.tanks > 0)
            .map(|c| TankClass::new(round_up(c.field_size), c.field_count, c.tanks))
            .collect();
        classes.sort_by_key(|c| c.field_size);

        let tank_total: usize = classes.iter().map(|c| c.tanks).sum();
        assert!(tank_total <= u16::MAX as usize, "Too many tanks in layout");

        let mut tanks = Vec::with_capacity(tank_total);
        let mut offset = 0;
        for class in &classes {
            let field_count =
                u32::try_from(class.field_count).expect("Tank field count exceeds u32::MAX");
            for _ in 0..class.tanks {
                tanks.push(Tank::new(class.field_size, field_count, offset));
                offset += class.field_size * class.field_count;
            }
        }

        Self {
            arena: vec![0u64; offset / FIELD_ALIGN].into_boxed_slice(),
            tanks,
            overflow: HashMap::new(),
            next_overflow_id: 0,
            overflow_generation: 0,
            overflow_budget,
            stats: TankStats::default(),
        }
    }

    /// Total arena size in bytes.
    #[inline]
    #[must_use]
    pub fn arena_bytes(&self) -> usize {
        self.arena.len() * FIELD_ALIGN
    }

    /// Current counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> TankStats {
        self.stats
    }

    /// Occupancy of each tank, smallest class first.
    pub fn usage(&self) -> impl Iterator<Item = TankUsage> + '_ {
        self.tanks.iter().map(|t| TankUsage {
            field_size: t.field_size,
            used: t.in_use as usize,
            capacity: t.field_count as usize,
        })
    }

    /// Allocates `size` bytes.
    ///
    /// # Arguments
    ///
    /// * `size` - Bytes requested
    /// * `zero` - Clear the field before handing it out. Heap blocks are always
    ///   zeroed since they are freshly initialized.
    ///
    /// # Errors
    ///
    /// [`AllocError::ZeroSize`] for empty requests, [`AllocError::Exhausted`]
    /// when the heap fallback cannot reserve memory either.
    pub fn allocate(&mut self, size: usize, zero: bool) -> Result<Block, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let size32 = u32::try_from(size).map_err(|_| AllocError::Exhausted { size })?;

        let block = match self.allocate_pooled(size, size32, zero) {
            Some(block) => {
                self.stats.pooled_blocks += 1;
                block
            }
            None => self.allocate_overflow(size, size32)?,
        };

        self.stats.total_allocations += 1;
        self.stats.live_bytes += size;
        self.stats.peak_live_bytes = self.stats.peak_live_bytes.max(self.stats.live_bytes);
        Ok(block)
    }

    /// Returns a block to the allocator.
    ///
    /// # Arguments
    ///
    /// * `block` - Block from [`allocate`](Self::allocate)
    /// * `zero` - Clear the bytes so stale data never leaks into the next owner
    ///
    /// # Errors
    ///
    /// [`AllocError::UnknownBlock`] if the block is not currently allocated,
    /// including a block whose field has since been handed to another owner.
    pub fn free(&mut self, block: Block, zero: bool) -> Result<FreeStatus, AllocError> {
        let status = match block.origin {
            BlockOrigin::Tank { tank, field } => {
                let range = match self.tanks.get(tank as usize) {
                    Some(t) if t.holds(field, block.generation) => {
                        t.byte_range(field, t.field_size)
                    }
                    _ => return Err(AllocError::UnknownBlock(block)),
                };
                if zero {
                    self.arena_bytes_mut()[range].fill(0);
                }
                self.tanks[tank as usize].release(field);
                self.stats.pooled_blocks -= 1;
                FreeStatus::Pooled
            }
            BlockOrigin::Overflow { id } => {
                let mut storage = match self.overflow.get(&id) {
                    Some((generation, _)) if *generation == block.generation => {
                        self.overflow.remove(&id).map(|(_, storage)| storage)
                    }
                    _ => None,
                }
                .ok_or(AllocError::UnknownBlock(block))?;
                if zero {
                    storage.fill(0);
                }
                self.stats.overflow_blocks -= 1;
                self.stats.overflow_bytes -= block.size();
                FreeStatus::Overflow
            }
        };

        self.stats.total_frees += 1;
        self.stats.live_bytes -= block.size();
        Ok(status)
    }

    /// Bytes of a live block.
    #[must_use]
    pub fn bytes(&self, block: Block) -> Option<&[u8]> {
        match block.origin {
            BlockOrigin::Tank { tank, field } => {
                let t = self.tanks.get(tank as usize)?;
                if !t.holds(field, block.generation) || block.size() > t.field_size {
                    return None;
                }
                let range = t.byte_range(field, block.size());
                Some(&bytemuck::cast_slice::<u64, u8>(&self.arena)[range])
            }
            BlockOrigin::Overflow { id } => {
                let storage = self.overflow_storage(id, block.generation)?;
                bytemuck::cast_slice::<u64, u8>(storage).get(..block.size())
            }
        }
    }

    /// Mutable bytes of a live block.
    pub fn bytes_mut(&mut self, block: Block) -> Option<&mut [u8]> {
        match block.origin {
            BlockOrigin::Tank { tank, field } => {
                let t = self.tanks.get(tank as usize)?;
                if !t.holds(field, block.generation) || block.size() > t.field_size {
                    return None;
                }
                let range = t.byte_range(field, block.size());
                Some(&mut self.arena_bytes_mut()[range])
            }
            BlockOrigin::Overflow { id } => {
                let storage = match self.overflow.get_mut(&id) {
                    Some((generation, storage)) if *generation == block.generation => storage,
                    _ => return None,
                };
                bytemuck::cast_slice_mut::<u64, u8>(storage).get_mut(..block.size())
            }
        }
    }

    /// Views a live block as a `T`. The block size must equal `size_of::<T>()`.
    #[inline]
    #[must_use]
    pub fn get<T: Pod>(&self, block: Block) -> Option<&T> {
        if block.size() != std::mem::size_of::<T>() {
            return None;
        }
        bytemuck::try_from_bytes(self.bytes(block)?).ok()
    }

    /// Mutably views a live block as a `T`.
    #[inline]
    pub fn get_mut<T: Pod>(&mut self, block: Block) -> Option<&mut T> {
        if block.size() != std::mem::size_of::<T>() {
            return None;
        }
        bytemuck::try_from_bytes_mut(self.bytes_mut(block)?).ok()
    }

    fn overflow_storage(&self, id: u32, generation: u32) -> Option<&[u64]> {
        match self.overflow.get(&id) {
            Some((issued, storage)) if *issued == generation => Some(storage),
            _ => None,
        }
    }

    fn arena_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut::<u64, u8>(&mut self.arena)
    }

    /// Tanks whose class is the smallest one able to hold `size` bytes.
    fn class_tanks(&self, size: usize) -> Range<usize> {
        let start = self.tanks.partition_point(|t| t.field_size < size);
        let Some(first) = self.tanks.get(start) else {
            return start..start;
        };
        let class = first.field_size;
        start..start + self.tanks[start..].partition_point(|t| t.field_size == class)
    }

    fn allocate_pooled(&mut self, size: usize, size32: u32, zero: bool) -> Option<Block> {
        for index in self.class_tanks(size) {
            let Some((field, generation)) = self.tanks[index].claim() else {
                continue;
            };
            if zero {
                let range = self.tanks[index].byte_range(field, self.tanks[index].field_size);
                self.arena_bytes_mut()[range].fill(0);
            }
            return Some(Block {
                origin: BlockOrigin::Tank {
                    tank: index as u16,
                    field,
                },
                generation,
                size: size32,
            });
        }
        None
    }

    fn allocate_overflow(&mut self, size: usize, size32: u32) -> Result<Block, AllocError> {
        if self.stats.overflow_bytes + size > self.overflow_budget {
            self.stats.over_budget_allocations += 1;
            tracing::warn!(
                size,
                overflow_bytes = self.stats.overflow_bytes,
                budget = self.overflow_budget,
                "tank arena and overflow budget exhausted, falling back to heap"
            );
        } else {
            tracing::debug!(size, "no tank field available, allocating overflow block");
        }

        let words = size.div_ceil(FIELD_ALIGN);
        let mut storage: Vec<u64> = Vec::new();
        storage
            .try_reserve_exact(words)
            .map_err(|_| AllocError::Exhausted { size })?;
        storage.resize(words, 0);

        let mut id = self.next_overflow_id;
        while self.overflow.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next_overflow_id = id.wrapping_add(1);
        self.overflow_generation = self.overflow_generation.wrapping_add(1);
        let generation = self.overflow_generation;
        self.overflow.insert(id, (generation, storage.into_boxed_slice()));

        self.stats.overflow_blocks += 1;
        self.stats.overflow_bytes += size;
        Ok(Block {
            origin: BlockOrigin::Overflow { id },
            generation,
            size: size32,
        })
    }
}

impl Default for TankAllocator {
    fn default() -> Self {
        Self::new(&default_layout(), 1 << 20)
    }
}
