//! Fixed-layout handle cells and their exactly-once owner.
//!
//! A handle is an 8-byte record in the arena: `{ length: u32, data_ptr:
//! u32 }`, little-endian, fields at fixed offsets. Owning (sequence) and
//! non-owning (view) handles share the layout; `data_ptr == 0` is the
//! empty/invalid sentinel regardless of `length`.

use crate::arena::{self, Arena};
use crate::error::EngineError;

/// Size of one handle cell in bytes.
pub const HANDLE_SIZE: u32 = 8;
/// Byte offset of the `length` field.
pub const LEN_OFFSET: u32 = 0;
/// Byte offset of the `data_ptr` field.
pub const PTR_OFFSET: u32 = 4;
/// Size of an output pair: two handle cells back to back.
pub const PAIR_SIZE: u32 = 2 * HANDLE_SIZE;

/// Read a handle's `(length, data_ptr)` fields.
pub fn read(arena: &Arena, addr: u32) -> Result<(u32, u32), EngineError> {
    let len = arena.read_u32(addr + LEN_OFFSET)?;
    let ptr = arena.read_u32(addr + PTR_OFFSET)?;
    Ok((len, ptr))
}

/// Write a handle's `(length, data_ptr)` fields.
pub fn write(arena: &mut Arena, addr: u32, len: u32, ptr: u32) -> Result<(), EngineError> {
    arena.write_u32(addr + LEN_OFFSET, len)?;
    arena.write_u32(addr + PTR_OFFSET, ptr)?;
    Ok(())
}

/// Copy the fields of one handle cell into another.
pub fn copy(arena: &mut Arena, dst: u32, src: u32) -> Result<(), EngineError> {
    let (len, ptr) = read(arena, src)?;
    write(arena, dst, len, ptr)
}

/// Whether a handle describes a usable range.
pub fn is_valid(arena: &Arena, addr: u32) -> bool {
    match read(arena, addr) {
        Ok((len, ptr)) => ptr != 0 && len > 0,
        Err(_) => false,
    }
}

/// Owner of one 8-byte handle cell.
///
/// Not `Clone`: the cell is freed exactly once, when the owning
/// `RawHandle` drops. Borrowed handles (engine-internal scratch cells)
/// skip the free; their owner reclaims them separately.
#[derive(Debug)]
pub struct RawHandle {
    addr: u32,
    owned: bool,
}

impl RawHandle {
    /// Allocate a fresh zeroed handle cell.
    pub fn alloc(arena: &mut Arena) -> Result<Self, EngineError> {
        let addr = arena.alloc(HANDLE_SIZE)?;
        write(arena, addr, 0, 0)?;
        Ok(Self { addr, owned: true })
    }

    /// Wrap an existing cell without taking ownership of it.
    pub(crate) fn borrowed(addr: u32) -> Self {
        Self { addr, owned: false }
    }

    /// Arena address of the cell.
    pub fn addr(&self) -> u32 {
        self.addr
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        if self.owned {
            let addr = self.addr;
            arena::release(|a| {
                let _ = a.free(addr);
            });
        }
    }
}
