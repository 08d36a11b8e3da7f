//! Non-owning views over sequence payloads.
//!
//! A [`Ref`] owns a small 8-byte handle describing a sub-range of some
//! sequence's payload — never the payload itself. The lifetime parameter
//! is the retaining link: a view derived from a [`Sequence`] cannot
//! outlive it, so "payload freed under a live view" is unrepresentable.
//! Standalone views (engine-produced, not derived from a host sequence)
//! use `'static`.
//!
//! Multiple views may alias the same payload; reading through any of them
//! is always safe. Mutating through one (`encode`, `splice`) invalidates
//! the ranges its siblings describe — the single data-race class of the
//! model, resolved by the single-threaded discipline the arena enforces.

use std::fmt;
use std::marker::PhantomData;

use crate::arena;
use crate::engine::{self, SpliceMachine};
use crate::error::EngineError;
use crate::handle::{self, RawHandle, HANDLE_SIZE, PAIR_SIZE};
use crate::sequence::Sequence;

/// Read-only view over a sub-range of a sequence payload.
///
/// `'seq` ties the view to the sequence it was derived from. Views are
/// `!Send`: handles live in the thread-local arena.
#[derive(Debug)]
pub struct Ref<'seq> {
    handle: RawHandle,
    _seq: PhantomData<&'seq Sequence>,
    _single: PhantomData<*const ()>,
}

impl<'seq> Ref<'seq> {
    pub(crate) fn from_handle(handle: RawHandle) -> Ref<'seq> {
        Ref {
            handle,
            _seq: PhantomData,
            _single: PhantomData,
        }
    }

    /// View of the whole of `seq`'s payload.
    pub fn from_sequence(seq: &'seq Sequence) -> Result<Self, EngineError> {
        arena::with_mut(|a| {
            let h = RawHandle::alloc(a)?;
            engine::ref_from_sequence(a, h.addr(), seq.addr())?;
            Ok(h)
        })
        .map(Ref::from_handle)
    }

    pub(crate) fn addr(&self) -> u32 {
        self.handle.addr()
    }

    /// The handle's `length` field, re-read on every access — engine
    /// operations mutate it in place, so it is never cached.
    pub fn len(&self) -> u32 {
        arena::with(|a| handle::read(a, self.handle.addr()).map(|(l, _)| l).unwrap_or(0))
    }

    /// Whether the view's length is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the view describes a usable range. Idempotent absent an
    /// intervening mutation.
    pub fn valid(&self) -> bool {
        arena::with(|a| engine::ref_valid(a, self.handle.addr()))
    }

    /// New view starting `n` positions into this one. Past-the-end
    /// positions yield an invalid view, not an error.
    pub fn index(&self, n: u32) -> Result<Ref<'seq>, EngineError> {
        arena::with_mut(|a| {
            let h = RawHandle::alloc(a)?;
            engine::ref_index(a, h.addr(), self.handle.addr(), n)?;
            Ok(h)
        })
        .map(Ref::from_handle)
    }

    /// New view limited to the first `n` elements of this one.
    pub fn trunc(&self, n: u32) -> Result<Ref<'seq>, EngineError> {
        arena::with_mut(|a| {
            let h = RawHandle::alloc(a)?;
            engine::ref_trunc(a, h.addr(), self.handle.addr(), n)?;
            Ok(h)
        })
        .map(Ref::from_handle)
    }

    /// Element at position `n`, or `None` past the end.
    ///
    /// Bounded cost regardless of the view's length, unlike rendering the
    /// whole view through `to_string`.
    pub fn at(&self, n: u32) -> Option<char> {
        let sub = self.index(n).ok()?;
        if !sub.valid() {
            return None;
        }
        let one = sub.trunc(1).ok()?;
        one.to_string().chars().next()
    }

    /// Iterate the view's elements from the front.
    ///
    /// The iterator re-checks validity per element rather than trusting
    /// `len`, and stops at the first invalid index.
    pub fn iter(&self) -> Result<Elements<'seq>, EngineError> {
        Ok(Elements {
            view: self.index(0)?,
            i: 0,
        })
    }

    /// Encode the view's range in place.
    ///
    /// On return `self` has become the unencoded remainder (possibly
    /// invalid when everything encoded) and the returned view describes
    /// the encoded prefix (possibly invalid when nothing did). Both are
    /// terminal values, never errors.
    pub fn encode(&mut self) -> Result<Ref<'seq>, EngineError> {
        arena::with_mut(|a| {
            let pair = a.alloc(PAIR_SIZE)?;
            let res = (|| {
                engine::encode(a, pair, self.handle.addr())?;
                // Remainder replaces this view in place; the prefix gets
                // a fresh handle.
                handle::copy(a, self.handle.addr(), pair + HANDLE_SIZE)?;
                let enc = RawHandle::alloc(a)?;
                handle::copy(a, enc.addr(), pair)?;
                Ok(enc)
            })();
            let _ = a.free(pair);
            res
        })
        .map(Ref::from_handle)
    }

    /// Remove every range the selector picks, compacting in place.
    ///
    /// The selector sees successive sub-views from each scan position to
    /// the end of the view and returns the range to remove, or `None` to
    /// remove nothing for that position. It runs outside any arena
    /// borrow, so it may freely use view operations (`at`, `trunc`, ...).
    /// Scratch cells are released on every exit path, including a
    /// selector panic.
    pub fn splice<F>(&mut self, mut selector: F) -> Result<&mut Self, EngineError>
    where
        F: FnMut(&Ref<'static>) -> Option<Ref<'static>>,
    {
        let mut machine = arena::with_mut(|a| SpliceMachine::new(a, self.handle.addr()))?;
        loop {
            let probe = match arena::with_mut(|a| machine.next_probe(a))? {
                Some(probe) => probe,
                None => break,
            };
            let sub = Ref::probe(probe);
            let selection = selector(&sub);
            arena::with_mut(|a| {
                if let Some(sel) = &selection {
                    handle::copy(a, machine.selection_slot(), sel.handle.addr())?;
                }
                machine.apply(a)
            })?;
        }
        tracing::debug!(probes = machine.steps(), "splice completed");
        Ok(self)
    }
}

impl Ref<'static> {
    /// Standalone view with a fresh, empty handle.
    ///
    /// Not linked to any sequence; keeping it usable once the payload it
    /// is later pointed at goes away is the caller's responsibility
    /// (stale reads surface as invalid or garbage data, never unsafety).
    pub fn empty() -> Result<Self, EngineError> {
        arena::with_mut(RawHandle::alloc).map(Ref::from_handle)
    }

    /// Transient wrapper around an engine-owned probe cell. Does not free
    /// the cell on drop.
    pub(crate) fn probe(addr: u32) -> Self {
        Ref::from_handle(RawHandle::borrowed(addr))
    }
}

/// Renders the referenced byte range as text; an invalid view renders as
/// the empty string. Cost is proportional to the view's length — prefer
/// [`Ref::at`] for bounded-cost access to single elements.
impl fmt::Display for Ref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = arena::with(|a| {
            let (len, ptr) = handle::read(a, self.handle.addr()).ok()?;
            if ptr == 0 || len == 0 {
                return None;
            }
            let bytes = a.read_bytes(ptr, len).ok()?;
            Some(String::from_utf8_lossy(bytes).into_owned())
        });
        f.write_str(text.as_deref().unwrap_or(""))
    }
}

/// Element iterator over a view.
///
/// Yields `at(i)` for `i` from 0 while `i < len`, stopping at the first
/// invalid index even if `len` suggests more remain.
#[derive(Debug)]
pub struct Elements<'seq> {
    view: Ref<'seq>,
    i: u32,
}

impl Iterator for Elements<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        if self.i >= self.view.len() {
            return None;
        }
        let c = self.view.at(self.i)?;
        self.i += 1;
        Some(c)
    }
}
