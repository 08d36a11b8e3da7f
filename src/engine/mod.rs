//! Native primitives of the sequence engine.
//!
//! Every primitive operates on raw `u32` handle addresses against an
//! explicit [`Arena`], mirroring a C-style boundary: callers own the
//! handle cells, the engine reads and writes their fields in place. The
//! byte layout of handles and output pairs is the wire contract defined
//! in [`crate::handle`].
//!
//! Sequence handles own their payload; the engine allocates and frees it.
//! View handles never own payload, only describe ranges into one.

pub mod alphabet;
pub mod splice;

use crate::arena::Arena;
use crate::error::EngineError;
use crate::handle::{self, HANDLE_SIZE};

pub use splice::SpliceMachine;

/// populate-from-text: scan a NUL-terminated byte string at `text_addr`,
/// allocate a payload of its length, and copy the bytes into it.
///
/// Any previous payload of `seq` is freed first. An empty string leaves
/// the handle zeroed (the empty sentinel) rather than allocating.
pub fn sequence_from_string(
    arena: &mut Arena,
    seq: u32,
    text_addr: u32,
) -> Result<(), EngineError> {
    let mut len = 0u32;
    while arena.read_u8(text_addr + len)? != 0 {
        len += 1;
    }

    let (_, old_ptr) = handle::read(arena, seq)?;
    if old_ptr != 0 {
        arena.free(old_ptr)?;
        handle::write(arena, seq, 0, 0)?;
    }

    if len == 0 {
        return Ok(());
    }
    let payload = arena.alloc(len)?;
    arena.copy_within(text_addr, payload, len)?;
    handle::write(arena, seq, len, payload)
}

/// copy-buffer: deep-copy `src`'s payload into `dst`.
///
/// The copy shares no memory with the source.
pub fn sequence_copy(arena: &mut Arena, dst: u32, src: u32) -> Result<(), EngineError> {
    let (len, ptr) = handle::read(arena, src)?;
    materialize(arena, dst, len, ptr)
}

/// materialize-from-view: copy only the range a view describes into a
/// fresh, independently owned payload for `dst`.
pub fn sequence_from_ref(arena: &mut Arena, dst: u32, ref_addr: u32) -> Result<(), EngineError> {
    let (len, ptr) = handle::read(arena, ref_addr)?;
    materialize(arena, dst, len, ptr)
}

fn materialize(arena: &mut Arena, dst: u32, len: u32, ptr: u32) -> Result<(), EngineError> {
    let (_, old_ptr) = handle::read(arena, dst)?;
    if old_ptr != 0 {
        arena.free(old_ptr)?;
        handle::write(arena, dst, 0, 0)?;
    }
    if ptr == 0 || len == 0 {
        return Ok(());
    }
    let payload = arena.alloc(len)?;
    arena.copy_within(ptr, payload, len)?;
    handle::write(arena, dst, len, payload)
}

/// buffer-free: release `seq`'s payload and zero its fields.
///
/// The handle cell itself stays allocated; its owner frees it.
pub fn sequence_free(arena: &mut Arena, seq: u32) -> Result<(), EngineError> {
    let (_, ptr) = handle::read(arena, seq)?;
    if ptr != 0 {
        arena.free(ptr)?;
    }
    handle::write(arena, seq, 0, 0)
}

/// view-of-buffer: point `ref_addr` at the whole of `seq`'s payload.
pub fn ref_from_sequence(arena: &mut Arena, ref_addr: u32, seq: u32) -> Result<(), EngineError> {
    handle::copy(arena, ref_addr, seq)
}

/// view-index: write into `dst` the range starting `n` positions into
/// `src`. Past-the-end positions produce the invalid sentinel, not an
/// error.
pub fn ref_index(arena: &mut Arena, dst: u32, src: u32, n: u32) -> Result<(), EngineError> {
    let (len, ptr) = handle::read(arena, src)?;
    if ptr == 0 || n >= len {
        return handle::write(arena, dst, 0, 0);
    }
    handle::write(arena, dst, len - n, ptr + n)
}

/// view-trunc: write into `dst` the range limited to the first `n`
/// elements of `src`.
pub fn ref_trunc(arena: &mut Arena, dst: u32, src: u32, n: u32) -> Result<(), EngineError> {
    let (len, ptr) = handle::read(arena, src)?;
    if ptr == 0 {
        return handle::write(arena, dst, 0, 0);
    }
    handle::write(arena, dst, len.min(n), ptr)
}

/// view-valid: whether the handle describes a usable range.
pub fn ref_valid(arena: &Arena, ref_addr: u32) -> bool {
    handle::is_valid(arena, ref_addr)
}

/// encode: scan the view's byte range, compacting recognized symbols in
/// place at the front, and write two handles into `out_pair`: the encoded
/// prefix at `+0` and the unencoded remainder at `+8`.
///
/// Separators are consumed without output; the first byte that is neither
/// a separator nor an alphabet symbol starts the remainder. Either half
/// of the pair may come back as the invalid sentinel; that is a terminal
/// value, not an error.
pub fn encode(arena: &mut Arena, out_pair: u32, ref_addr: u32) -> Result<(), EngineError> {
    let (len, ptr) = handle::read(arena, ref_addr)?;
    if ptr == 0 || len == 0 {
        handle::write(arena, out_pair, 0, 0)?;
        return handle::write(arena, out_pair + HANDLE_SIZE, 0, 0);
    }

    let mut read = 0u32;
    let mut write = 0u32;
    while read < len {
        let b = arena.read_u8(ptr + read)?;
        if alphabet::is_separator(b) {
            read += 1;
            continue;
        }
        match alphabet::encode_symbol(b) {
            Some(code) => {
                // write <= read always holds, so the compacted prefix
                // never overruns unscanned bytes.
                arena.write_u8(ptr + write, code)?;
                write += 1;
                read += 1;
            }
            None => break,
        }
    }

    tracing::debug!(len, encoded = write, remainder = len - read, "encode dispatched");

    if write > 0 {
        handle::write(arena, out_pair, write, ptr)?;
    } else {
        handle::write(arena, out_pair, 0, 0)?;
    }
    if read < len {
        handle::write(arena, out_pair + HANDLE_SIZE, len - read, ptr + read)
    } else {
        handle::write(arena, out_pair + HANDLE_SIZE, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{RawHandle, PAIR_SIZE};

    /// NUL-terminate `text` in the arena and populate `seq` from it,
    /// freeing the temporary copy afterwards.
    fn populate(arena: &mut Arena, seq: u32, text: &str) {
        let tmp = arena.alloc(text.len() as u32 + 1).unwrap();
        arena.write_bytes(tmp, text.as_bytes()).unwrap();
        arena.write_u8(tmp + text.len() as u32, 0).unwrap();
        sequence_from_string(arena, seq, tmp).unwrap();
        arena.free(tmp).unwrap();
    }

    fn text_of(arena: &Arena, addr: u32) -> String {
        let (len, ptr) = handle::read(arena, addr).unwrap();
        if ptr == 0 || len == 0 {
            return String::new();
        }
        String::from_utf8_lossy(arena.read_bytes(ptr, len).unwrap()).into_owned()
    }

    #[test]
    fn test_populate_from_text() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "ATCG");

        let (len, ptr) = handle::read(&arena, seq.addr()).unwrap();
        assert_eq!(len, 4);
        assert_ne!(ptr, 0);
        assert_eq!(text_of(&arena, seq.addr()), "ATCG");
    }

    #[test]
    fn test_populate_empty_leaves_sentinel() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "");
        assert_eq!(handle::read(&arena, seq.addr()).unwrap(), (0, 0));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut arena = Arena::new();
        let src = RawHandle::alloc(&mut arena).unwrap();
        let dst = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, src.addr(), "ATCG");
        sequence_copy(&mut arena, dst.addr(), src.addr()).unwrap();

        let (_, src_ptr) = handle::read(&arena, src.addr()).unwrap();
        let (_, dst_ptr) = handle::read(&arena, dst.addr()).unwrap();
        assert_ne!(src_ptr, dst_ptr);

        // Mutating the copy leaves the source untouched.
        arena.write_u8(dst_ptr, b'N').unwrap();
        assert_eq!(text_of(&arena, src.addr()), "ATCG");
        assert_eq!(text_of(&arena, dst.addr()), "NTCG");
    }

    #[test]
    fn test_materialize_from_ref_copies_range_only() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        let view = RawHandle::alloc(&mut arena).unwrap();
        let out = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "ATCG");

        ref_from_sequence(&mut arena, view.addr(), seq.addr()).unwrap();
        let sub = RawHandle::alloc(&mut arena).unwrap();
        ref_index(&mut arena, sub.addr(), view.addr(), 1).unwrap();
        let sub2 = RawHandle::alloc(&mut arena).unwrap();
        ref_trunc(&mut arena, sub2.addr(), sub.addr(), 2).unwrap();

        sequence_from_ref(&mut arena, out.addr(), sub2.addr()).unwrap();
        assert_eq!(text_of(&arena, out.addr()), "TC");
    }

    #[test]
    fn test_sequence_free_releases_payload_once() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "ATCG");

        let before = arena.live_blocks();
        sequence_free(&mut arena, seq.addr()).unwrap();
        assert_eq!(arena.live_blocks(), before - 1);
        assert_eq!(handle::read(&arena, seq.addr()).unwrap(), (0, 0));

        // Freeing an already-empty sequence is a no-op.
        sequence_free(&mut arena, seq.addr()).unwrap();
    }

    #[test]
    fn test_ref_index_past_end_is_invalid() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        let view = RawHandle::alloc(&mut arena).unwrap();
        let sub = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "ATC");
        ref_from_sequence(&mut arena, view.addr(), seq.addr()).unwrap();

        ref_index(&mut arena, sub.addr(), view.addr(), 3).unwrap();
        assert!(!ref_valid(&arena, sub.addr()));

        ref_index(&mut arena, sub.addr(), view.addr(), 1000).unwrap();
        assert!(!ref_valid(&arena, sub.addr()));

        ref_index(&mut arena, sub.addr(), view.addr(), 2).unwrap();
        assert!(ref_valid(&arena, sub.addr()));
    }

    #[test]
    fn test_ref_trunc_clamps() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        let view = RawHandle::alloc(&mut arena).unwrap();
        let sub = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "ATC");
        ref_from_sequence(&mut arena, view.addr(), seq.addr()).unwrap();

        ref_trunc(&mut arena, sub.addr(), view.addr(), 100).unwrap();
        let (len, _) = handle::read(&arena, sub.addr()).unwrap();
        assert_eq!(len, 3);

        ref_trunc(&mut arena, sub.addr(), view.addr(), 1).unwrap();
        assert_eq!(text_of(&arena, sub.addr()), "A");
    }

    #[test]
    fn test_encode_full_match() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        let view = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "atcg");
        ref_from_sequence(&mut arena, view.addr(), seq.addr()).unwrap();

        let pair = arena.alloc(PAIR_SIZE).unwrap();
        encode(&mut arena, pair, view.addr()).unwrap();

        assert_eq!(text_of(&arena, pair), "ATCG");
        assert!(!ref_valid(&arena, pair + HANDLE_SIZE));
        arena.free(pair).unwrap();
    }

    #[test]
    fn test_encode_consumes_separators() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        let view = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "A T\nC G");
        ref_from_sequence(&mut arena, view.addr(), seq.addr()).unwrap();

        let pair = arena.alloc(PAIR_SIZE).unwrap();
        encode(&mut arena, pair, view.addr()).unwrap();

        let (elen, _) = handle::read(&arena, pair).unwrap();
        assert_eq!(elen, 4);
        assert_eq!(text_of(&arena, pair), "ATCG");
        arena.free(pair).unwrap();
    }

    #[test]
    fn test_encode_stops_at_unrecognized_byte() {
        let mut arena = Arena::new();
        let seq = RawHandle::alloc(&mut arena).unwrap();
        let view = RawHandle::alloc(&mut arena).unwrap();
        populate(&mut arena, seq.addr(), "ATxCG");
        ref_from_sequence(&mut arena, view.addr(), seq.addr()).unwrap();

        let pair = arena.alloc(PAIR_SIZE).unwrap();
        encode(&mut arena, pair, view.addr()).unwrap();

        assert_eq!(text_of(&arena, pair), "AT");
        assert_eq!(text_of(&arena, pair + HANDLE_SIZE), "xCG");
        arena.free(pair).unwrap();
    }

    #[test]
    fn test_encode_invalid_view_yields_sentinels() {
        let mut arena = Arena::new();
        let view = RawHandle::alloc(&mut arena).unwrap();
        let pair = arena.alloc(PAIR_SIZE).unwrap();
        encode(&mut arena, pair, view.addr()).unwrap();
        assert!(!ref_valid(&arena, pair));
        assert!(!ref_valid(&arena, pair + HANDLE_SIZE));
        arena.free(pair).unwrap();
    }
}
