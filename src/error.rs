//! Error types for arena and engine operations.

use thiserror::Error;

/// Error type for arena and engine operations.
///
/// Out-of-range view operations are *not* errors: they produce invalid
/// views (`data_ptr == 0`) which propagate as ordinary data. This enum
/// covers the remaining failure surface: address-space exhaustion and the
/// debugging tripwires around the manual allocator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The arena cannot grow past its configured capacity limit.
    #[error("arena exhausted: requested {requested} bytes with {live} live, capacity limit {limit}")]
    OutOfMemory {
        /// Size of the allocation that failed.
        requested: u32,
        /// Bytes currently live in the arena.
        live: usize,
        /// Configured capacity limit.
        limit: usize,
    },

    /// `free` was called on an address the arena does not consider live.
    ///
    /// Exactly-once reclamation is enforced structurally by handle
    /// ownership; this variant exists as a tripwire, not a recovery path.
    #[error("free of unknown arena address {addr:#010x}")]
    InvalidFree {
        /// The offending address.
        addr: u32,
    },

    /// A field read or write fell outside the arena region.
    #[error("arena access out of bounds: address {addr:#010x} + {len} bytes, region is {region} bytes")]
    OutOfBounds {
        /// Start address of the access.
        addr: u32,
        /// Length of the access in bytes.
        len: u32,
        /// Current region size.
        region: usize,
    },

    /// A payload is too large to describe with a 32-bit handle field.
    #[error("payload of {len} bytes exceeds the 32-bit handle field width")]
    PayloadTooLarge {
        /// Requested payload length.
        len: usize,
    },
}
