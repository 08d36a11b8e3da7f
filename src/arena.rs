//! Manual memory pool backing all sequence handles.
//!
//! The arena is one contiguous, growable byte region addressed by `u32`
//! offsets, mirroring a linear-memory native heap. Address `0` is reserved
//! as the null sentinel and never handed out, so a zeroed `data_ptr` field
//! always means "empty/invalid". All multi-byte fields are little-endian
//! at fixed offsets; that layout is the wire contract with the engine and
//! must not change independently on either side.
//!
//! Reclamation is exactly-once: `free` must be called once per `alloc`.
//! The owning wrapper types enforce this structurally; the arena's own
//! live-block map is a debugging tripwire on top, not a recovery path.
//!
//! The process-wide instance is thread-local: the engine is only ever
//! invoked from a single logical thread of control, and handle-owning
//! wrappers are `!Send`, so no locking is needed or provided.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::EngineError;

/// Sizing for the process-wide arena.
#[derive(Debug, Clone, Copy)]
pub struct ArenaConfig {
    /// Region size allocated up front.
    pub initial_capacity: usize,
    /// Hard limit the region may grow to.
    pub max_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64 * 1024,
            max_capacity: 1 << 30,
        }
    }
}

/// A contiguous span on the free list.
#[derive(Debug, Clone, Copy)]
struct FreeBlock {
    addr: u32,
    size: u32,
}

/// Manual allocator over a linear byte region.
///
/// # Invariants
///
/// - Address `0` is never allocated; the first 8 bytes stay zeroed.
/// - `free` entries are sorted by address, non-adjacent, and disjoint
///   from every live block.
/// - `live_bytes` is the sum of all live block sizes.
#[derive(Debug)]
pub struct Arena {
    bytes: Vec<u8>,
    free: Vec<FreeBlock>,
    live: HashMap<u32, u32>,
    live_bytes: usize,
    max_capacity: usize,
}

impl Arena {
    /// Create an arena with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Create an arena with explicit sizing.
    pub fn with_config(config: ArenaConfig) -> Self {
        let initial = config.initial_capacity.max(8).min(config.max_capacity.max(8));
        let mut bytes = vec![0u8; 8];
        bytes.reserve(initial.saturating_sub(8));
        Self {
            bytes,
            free: Vec::new(),
            live: HashMap::new(),
            live_bytes: 0,
            max_capacity: config.max_capacity.max(8),
        }
    }

    /// Allocate a block and return its address. Never returns `0`.
    ///
    /// Zero-sized requests are rounded up to one byte so every allocation
    /// has a distinct, freeable address.
    pub fn alloc(&mut self, size: u32) -> Result<u32, EngineError> {
        let size = size.max(1);

        // First fit from the free list.
        for i in 0..self.free.len() {
            if self.free[i].size >= size {
                let addr = self.free[i].addr;
                self.free[i].addr += size;
                self.free[i].size -= size;
                if self.free[i].size == 0 {
                    self.free.remove(i);
                }
                self.live.insert(addr, size);
                self.live_bytes += size as usize;
                return Ok(addr);
            }
        }

        // Extend the region.
        let addr = self.bytes.len();
        let new_len = addr + size as usize;
        if new_len > self.max_capacity || new_len > u32::MAX as usize {
            return Err(EngineError::OutOfMemory {
                requested: size,
                live: self.live_bytes,
                limit: self.max_capacity,
            });
        }
        tracing::debug!(from = addr, to = new_len, "arena region grown");
        self.bytes.resize(new_len, 0);

        let addr = addr as u32;
        self.live.insert(addr, size);
        self.live_bytes += size as usize;
        Ok(addr)
    }

    /// Release a block allocated by [`Arena::alloc`].
    ///
    /// The block is zeroed so stale reads through a leaked address surface
    /// as the invalid sentinel rather than old payload bytes.
    pub fn free(&mut self, addr: u32) -> Result<(), EngineError> {
        let size = self
            .live
            .remove(&addr)
            .ok_or(EngineError::InvalidFree { addr })?;
        self.live_bytes -= size as usize;

        let start = addr as usize;
        self.bytes[start..start + size as usize].fill(0);

        // Insert sorted, then coalesce with both neighbors.
        let pos = self.free.partition_point(|b| b.addr < addr);
        self.free.insert(pos, FreeBlock { addr, size });
        if pos + 1 < self.free.len()
            && self.free[pos].addr + self.free[pos].size == self.free[pos + 1].addr
        {
            self.free[pos].size += self.free[pos + 1].size;
            self.free.remove(pos + 1);
        }
        if pos > 0 && self.free[pos - 1].addr + self.free[pos - 1].size == self.free[pos].addr {
            self.free[pos - 1].size += self.free[pos].size;
            self.free.remove(pos);
        }
        Ok(())
    }

    fn check(&self, addr: u32, len: u32) -> Result<usize, EngineError> {
        let start = addr as usize;
        let end = start + len as usize;
        if end > self.bytes.len() {
            return Err(EngineError::OutOfBounds {
                addr,
                len,
                region: self.bytes.len(),
            });
        }
        Ok(start)
    }

    /// Read one byte.
    pub fn read_u8(&self, addr: u32) -> Result<u8, EngineError> {
        let start = self.check(addr, 1)?;
        Ok(self.bytes[start])
    }

    /// Write one byte.
    pub fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), EngineError> {
        let start = self.check(addr, 1)?;
        self.bytes[start] = value;
        Ok(())
    }

    /// Read a little-endian `u32` field.
    pub fn read_u32(&self, addr: u32) -> Result<u32, EngineError> {
        let start = self.check(addr, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[start..start + 4]);
        Ok(u32::from_le_bytes(raw))
    }

    /// Write a little-endian `u32` field.
    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), EngineError> {
        let start = self.check(addr, 4)?;
        self.bytes[start..start + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Borrow a byte range.
    pub fn read_bytes(&self, addr: u32, len: u32) -> Result<&[u8], EngineError> {
        let start = self.check(addr, len)?;
        Ok(&self.bytes[start..start + len as usize])
    }

    /// Copy bytes into the region.
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), EngineError> {
        if data.len() > u32::MAX as usize {
            return Err(EngineError::PayloadTooLarge { len: data.len() });
        }
        let start = self.check(addr, data.len() as u32)?;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Move bytes within the region. Source and destination may overlap.
    pub fn copy_within(&mut self, src: u32, dst: u32, len: u32) -> Result<(), EngineError> {
        let s = self.check(src, len)?;
        let d = self.check(dst, len)?;
        self.bytes.copy_within(s..s + len as usize, d);
        Ok(())
    }

    /// Number of live blocks.
    pub fn live_blocks(&self) -> usize {
        self.live.len()
    }

    /// Bytes held by live blocks.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    /// Current region size in bytes.
    pub fn region_len(&self) -> usize {
        self.bytes.len()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static ARENA: RefCell<Arena> = RefCell::new(Arena::new());
}

/// Replace this thread's arena sizing.
///
/// Takes effect only while no blocks are live — resizing under live
/// handles would invalidate them. Returns whether the configuration was
/// applied.
pub fn configure(config: ArenaConfig) -> bool {
    ARENA.with(|cell| {
        let mut a = cell.borrow_mut();
        if a.live_blocks() == 0 {
            *a = Arena::with_config(config);
            true
        } else {
            false
        }
    })
}

/// Run `f` with shared access to the process-wide arena.
///
/// Borrows must stay short-lived; holding one across a call that re-enters
/// the arena is a programming error and panics.
pub fn with<R>(f: impl FnOnce(&Arena) -> R) -> R {
    ARENA.with(|cell| f(&cell.borrow()))
}

/// Run `f` with exclusive access to the process-wide arena.
pub fn with_mut<R>(f: impl FnOnce(&mut Arena) -> R) -> R {
    ARENA.with(|cell| f(&mut cell.borrow_mut()))
}

/// Best-effort arena access for `Drop` impls.
///
/// Tolerates thread-local teardown at process exit and re-entrant drops
/// while the arena is borrowed; in either case the free is skipped. A
/// skipped free leaks a block, which the resource model accepts — a
/// double free never happens.
pub(crate) fn release(f: impl FnOnce(&mut Arena)) {
    let _ = ARENA.try_with(|cell| {
        if let Ok(mut a) = cell.try_borrow_mut() {
            f(&mut a);
        }
    });
}
