//! Strandkit - Raw-Arena Biological Sequence Engine
//!
//! A sequence-processing engine that operates on raw, fixed-layout memory
//! blocks inside a manually managed arena, together with a safe,
//! ownership-driven host surface on top.
//!
//! # Features
//!
//! - **Fixed-layout handles**: 8-byte `{length, data_ptr}` records with
//!   little-endian fields at fixed offsets — the wire contract between
//!   the host surface and the engine
//! - **Exactly-once reclamation**: every arena block is owned by exactly
//!   one wrapper; destructors free payload then handle, deterministically
//! - **View-over-buffer aliasing**: cheap non-owning views describe
//!   sub-ranges of a payload; the borrow checker keeps a view from
//!   outliving the sequence it was derived from
//! - **In-place encode**: compacts recognized IUPAC symbols at the front
//!   of a view's range and splits it into encoded prefix and remainder
//! - **Callback-driven splice**: a host selector inspects successive
//!   sub-views and picks ranges to remove; the engine compacts in place
//!
//! # Example
//!
//! ```rust
//! use strandkit::Sequence;
//!
//! let seq = Sequence::from_text("AT CGxy")?;
//! assert_eq!(seq.text()?, "AT CGxy");
//!
//! // Encode works on a copy: the source is never mutated.
//! let (encoded, remainder) = seq.encode()?;
//! assert_eq!(encoded.text()?, "ATCG");
//! assert_eq!(remainder.text()?, "xy");
//!
//! // Splice removes whatever ranges the selector picks.
//! let seq = Sequence::from_text("AXBXC")?;
//! let clean = seq.splice(|v| {
//!     if v.at(0) == Some('X') {
//!         v.trunc(1).ok()
//!     } else {
//!         None
//!     }
//! })?;
//! assert_eq!(clean.text()?, "ABC");
//! # Ok::<(), strandkit::EngineError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │  Sequence        Ref<'seq> │   owning buffer / borrowed view
//! └──────────┬─────────────────┘
//!            │ u32 handle addresses
//!            ▼
//! ┌────────────────────────────┐
//! │  engine                    │   populate, copy, index, trunc,
//! │  (encode · splice machine) │   encode, splice
//! └──────────┬─────────────────┘
//!            │ {length, data_ptr} cells, LE fields
//!            ▼
//! ┌────────────────────────────┐
//! │  arena                     │   linear region, free list,
//! │  (thread-local, manual)    │   address 0 = null sentinel
//! └────────────────────────────┘
//! ```
//!
//! The engine is always invoked synchronously from a single logical
//! thread of control; wrappers are `!Send` and the arena is thread-local,
//! so operations on a sequence/view chain observe strict program order.

#![warn(clippy::all)]

pub mod arena;
pub mod engine;
pub mod error;
pub mod handle;
pub mod reference;
pub mod sequence;

pub use arena::{Arena, ArenaConfig};
pub use error::EngineError;
pub use reference::{Elements, Ref};
pub use sequence::Sequence;
