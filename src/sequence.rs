//! Owning sequence buffers.
//!
//! A [`Sequence`] owns exactly one handle cell and the payload its
//! `data_ptr` addresses. Reclamation is deterministic and exactly-once:
//! `Drop` frees the payload, then the handle cell. Views derived from a
//! sequence borrow it, so the payload cannot be freed under them.

use std::fmt;
use std::marker::PhantomData;

use crate::arena;
use crate::engine;
use crate::error::EngineError;
use crate::handle::RawHandle;
use crate::reference::{Elements, Ref};

/// Owning wrapper around a payload-bearing handle.
///
/// `!Send`: the payload lives in the thread-local arena.
#[derive(Debug)]
pub struct Sequence {
    handle: RawHandle,
    _single: PhantomData<*const ()>,
}

impl Sequence {
    /// Empty sequence with a zeroed handle.
    pub fn new() -> Result<Self, EngineError> {
        let handle = arena::with_mut(RawHandle::alloc)?;
        Ok(Self {
            handle,
            _single: PhantomData,
        })
    }

    /// Sequence populated from host text.
    ///
    /// The engine is handed a temporary NUL-terminated copy of the bytes,
    /// freed immediately after the call regardless of success; `text`
    /// therefore must not itself contain NUL.
    pub fn from_text(text: &str) -> Result<Self, EngineError> {
        let seq = Self::new()?;
        let bytes = text.as_bytes();
        if bytes.len() >= u32::MAX as usize {
            return Err(EngineError::PayloadTooLarge { len: bytes.len() });
        }
        arena::with_mut(|a| {
            let tmp = a.alloc(bytes.len() as u32 + 1)?;
            let res = (|| {
                a.write_bytes(tmp, bytes)?;
                a.write_u8(tmp + bytes.len() as u32, 0)?;
                engine::sequence_from_string(a, seq.addr(), tmp)
            })();
            let _ = a.free(tmp);
            res
        })?;
        Ok(seq)
    }

    /// Independent deep copy; shares no memory with `self`.
    pub fn copy(&self) -> Result<Sequence, EngineError> {
        let dst = Self::new()?;
        arena::with_mut(|a| engine::sequence_copy(a, dst.addr(), self.addr()))?;
        Ok(dst)
    }

    /// Independent sequence holding only the byte range `view` describes.
    ///
    /// The result no longer depends on whatever the view pointed into.
    pub fn from_ref(view: &Ref<'_>) -> Result<Sequence, EngineError> {
        let dst = Self::new()?;
        arena::with_mut(|a| engine::sequence_from_ref(a, dst.addr(), view.addr()))?;
        Ok(dst)
    }

    pub(crate) fn addr(&self) -> u32 {
        self.handle.addr()
    }

    /// Payload length in bytes.
    pub fn len(&self) -> u32 {
        arena::with(|a| {
            crate::handle::read(a, self.handle.addr())
                .map(|(l, _)| l)
                .unwrap_or(0)
        })
    }

    /// Whether the sequence holds no payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View of the whole payload.
    pub fn as_view(&self) -> Result<Ref<'_>, EngineError> {
        Ref::from_sequence(self)
    }

    /// The payload as host text, via a full view.
    pub fn text(&self) -> Result<String, EngineError> {
        Ok(self.as_view()?.to_string())
    }

    /// Lazy iterator over single elements.
    ///
    /// Each call derives a fresh view, so the iteration is independent
    /// and restartable; iterating never mutates the sequence.
    pub fn iter(&self) -> Result<Elements<'_>, EngineError> {
        self.as_view()?.iter()
    }

    /// Encode a copy of this sequence, leaving `self` untouched.
    ///
    /// Returns the encoded prefix and the unencoded remainder as two
    /// independent sequences.
    pub fn encode(&self) -> Result<(Sequence, Sequence), EngineError> {
        let work = self.copy()?;
        let mut view = work.as_view()?;
        let encoded_view = view.encode()?;
        let encoded = Sequence::from_ref(&encoded_view)?;
        let remainder = Sequence::from_ref(&view)?;
        Ok((encoded, remainder))
    }

    /// Splice a copy of this sequence, leaving `self` untouched.
    ///
    /// Returns one independent sequence with every selected range
    /// removed. See [`Ref::splice`] for the selector contract.
    pub fn splice<F>(&self, selector: F) -> Result<Sequence, EngineError>
    where
        F: FnMut(&Ref<'static>) -> Option<Ref<'static>>,
    {
        let work = self.copy()?;
        let mut view = work.as_view()?;
        view.splice(selector)?;
        Sequence::from_ref(&view)
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        // Payload first; the handle cell follows when `self.handle`
        // drops.
        let addr = self.handle.addr();
        arena::release(|a| {
            let _ = engine::sequence_free(a, addr);
        });
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text().unwrap_or_default())
    }
}
