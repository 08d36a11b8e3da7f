//! Resumable splice machine.
//!
//! Splice removes caller-selected sub-ranges from a view's byte range,
//! compacting in place and shrinking the view. The selection comes from a
//! host callback, which must itself be free to use view operations, so
//! the machine never holds the arena across a callback: the driver
//! alternates short engine steps with selector invocations.
//!
//! Per call the machine acquires two scratch cells — a probe handle the
//! next sub-view is written into, and an output pair the selection is
//! written back through — and releases them on every exit path, including
//! unwinding out of the selector, via its `Drop` impl.

use crate::arena::{self, Arena};
use crate::error::EngineError;
use crate::handle::{self, HANDLE_SIZE, PAIR_SIZE};

/// One in-flight splice over a view handle.
///
/// The view handle is used as both input and output: its `length` shrinks
/// as ranges are removed, its `data_ptr` never moves.
#[derive(Debug)]
pub struct SpliceMachine {
    view: u32,
    probe: u32,
    pair: u32,
    cursor: u32,
    steps: u32,
}

impl SpliceMachine {
    /// Acquire the scratch cells for one splice over `view`.
    pub fn new(arena: &mut Arena, view: u32) -> Result<Self, EngineError> {
        let probe = arena.alloc(HANDLE_SIZE)?;
        let pair = match arena.alloc(PAIR_SIZE) {
            Ok(pair) => pair,
            Err(e) => {
                let _ = arena.free(probe);
                return Err(e);
            }
        };
        Ok(Self {
            view,
            probe,
            pair,
            cursor: 0,
            steps: 0,
        })
    }

    /// Write the next sub-view `[cursor, end)` into the probe and zero the
    /// selection slot. Returns the probe address, or `None` once the
    /// cursor has consumed the view.
    pub fn next_probe(&mut self, arena: &mut Arena) -> Result<Option<u32>, EngineError> {
        let (len, ptr) = handle::read(arena, self.view)?;
        if ptr == 0 || self.cursor >= len {
            return Ok(None);
        }
        handle::write(arena, self.probe, len - self.cursor, ptr + self.cursor)?;
        handle::write(arena, self.pair, 0, 0)?;
        handle::write(arena, self.pair + HANDLE_SIZE, 0, 0)?;
        self.steps += 1;
        Ok(Some(self.probe))
    }

    /// Address the selection fields are written to. All-zero fields mean
    /// "remove nothing for this probe".
    pub fn selection_slot(&self) -> u32 {
        self.pair
    }

    /// Consume the selection slot: remove the selected range, clamped to
    /// the probed sub-view, and advance the cursor.
    ///
    /// No selection (or one that clamps to nothing) advances past one
    /// element; a removal compacts the tail left and leaves the cursor at
    /// the removal start, where the shifted bytes now sit.
    pub fn apply(&mut self, arena: &mut Arena) -> Result<(), EngineError> {
        let (vlen, vptr) = handle::read(arena, self.view)?;
        let (slen, sptr) = handle::read(arena, self.pair)?;
        if slen == 0 || sptr == 0 {
            self.cursor += 1;
            return Ok(());
        }

        let start = sptr.max(vptr + self.cursor);
        let end = sptr.saturating_add(slen).min(vptr + vlen);
        if start >= end {
            self.cursor += 1;
            return Ok(());
        }

        let removed = end - start;
        let tail = vptr + vlen - end;
        if tail > 0 {
            arena.copy_within(end, start, tail)?;
        }
        handle::write(arena, self.view, vlen - removed, vptr)?;
        self.cursor = start - vptr;
        Ok(())
    }

    /// Number of probes handed out so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }
}

impl Drop for SpliceMachine {
    fn drop(&mut self) {
        let (probe, pair) = (self.probe, self.pair);
        arena::release(|a| {
            let _ = a.free(probe);
            let _ = a.free(pair);
        });
    }
}
