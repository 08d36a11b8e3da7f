//! Encode and splice protocol integration tests.

use std::panic::{catch_unwind, AssertUnwindSafe};

use strandkit::{arena, Ref, Sequence};

fn drop_x(v: &Ref<'static>) -> Option<Ref<'static>> {
    if v.at(0) == Some('X') {
        v.trunc(1).ok()
    } else {
        None
    }
}

#[test]
fn test_encode_atcg_scenario() {
    let seq = Sequence::from_text("ATCG").unwrap();
    assert_eq!(seq.text().unwrap(), "ATCG");

    let (encoded, remainder) = seq.encode().unwrap();
    assert_eq!(encoded.text().unwrap(), "ATCG");
    assert_eq!(remainder.text().unwrap(), "");
    assert!(encoded.len() + remainder.len() <= seq.len());
}

#[test]
fn test_encode_consumes_more_than_it_emits() {
    // Separators are consumed without output, so the pair lengths sum to
    // strictly less than the source.
    let seq = Sequence::from_text("A T C G").unwrap();
    let (encoded, remainder) = seq.encode().unwrap();
    assert_eq!(encoded.text().unwrap(), "ATCG");
    assert_eq!(remainder.text().unwrap(), "");
    assert!(encoded.len() + remainder.len() < seq.len());
}

#[test]
fn test_encode_normalizes_case_and_splits_remainder() {
    let seq = Sequence::from_text("atc gRYn!stop").unwrap();
    let (encoded, remainder) = seq.encode().unwrap();
    assert_eq!(encoded.text().unwrap(), "ATCGRYN");
    assert_eq!(remainder.text().unwrap(), "!stop");
}

#[test]
fn test_encode_nothing_encodable() {
    let seq = Sequence::from_text("xyz").unwrap();
    let (encoded, remainder) = seq.encode().unwrap();
    assert_eq!(encoded.text().unwrap(), "");
    assert_eq!(remainder.text().unwrap(), "xyz");
}

#[test]
fn test_view_encode_mutates_in_place() {
    let seq = Sequence::from_text("ATxy").unwrap();
    let work = seq.copy().unwrap();
    let mut view = work.as_view().unwrap();

    let encoded = view.encode().unwrap();
    // The original view object is now the remainder.
    assert_eq!(encoded.to_string(), "AT");
    assert_eq!(view.to_string(), "xy");
    // The untouched source still reads back in full.
    assert_eq!(seq.text().unwrap(), "ATxy");
}

#[test]
fn test_splice_removes_every_x() {
    let seq = Sequence::from_text("AXBXC").unwrap();
    let spliced = seq.splice(drop_x).unwrap();
    assert_eq!(spliced.text().unwrap(), "ABC");
}

#[test]
fn test_splice_with_no_matches_is_identity() {
    let seq = Sequence::from_text("ATCG").unwrap();
    let spliced = seq.splice(drop_x).unwrap();
    assert_eq!(spliced.text().unwrap(), "ATCG");
}

#[test]
fn test_splice_none_means_remove_nothing() {
    // A selector that never selects must not be treated as an error.
    let seq = Sequence::from_text("AXBXC").unwrap();
    let spliced = seq.splice(|_| None).unwrap();
    assert_eq!(spliced.text().unwrap(), "AXBXC");
}

#[test]
fn test_splice_selector_sees_suffix_views() {
    let seq = Sequence::from_text("ABC").unwrap();
    let mut seen = Vec::new();
    let _ = seq
        .splice(|v| {
            seen.push(v.to_string());
            None
        })
        .unwrap();
    assert_eq!(seen, vec!["ABC", "BC", "C"]);
}

#[test]
fn test_splice_can_remove_multi_element_ranges() {
    // Remove "XX" pairs in one selection each.
    let seq = Sequence::from_text("AXXBXXC").unwrap();
    let spliced = seq
        .splice(|v| {
            if v.at(0) == Some('X') && v.at(1) == Some('X') {
                v.trunc(2).ok()
            } else {
                None
            }
        })
        .unwrap();
    assert_eq!(spliced.text().unwrap(), "ABC");
}

#[test]
fn test_splice_everything_yields_empty_sequence() {
    let seq = Sequence::from_text("XXXX").unwrap();
    let spliced = seq.splice(drop_x).unwrap();
    assert_eq!(spliced.text().unwrap(), "");
    assert!(spliced.is_empty());
}

#[test]
fn test_selector_panic_releases_scratch_cells() {
    let baseline = arena::with(|a| a.live_blocks());
    let seq = Sequence::from_text("ATCG").unwrap();
    let work = seq.copy().unwrap();
    let mut view = work.as_view().unwrap();
    let held = arena::with(|a| a.live_blocks());

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _ = view.splice(|_| panic!("selector bailed"));
    }));
    assert!(result.is_err());

    // The machine's scratch cells were released on the unwind path.
    assert_eq!(arena::with(|a| a.live_blocks()), held);

    drop(view);
    drop(work);
    drop(seq);
    assert_eq!(arena::with(|a| a.live_blocks()), baseline);
}

#[test]
fn test_encode_then_splice_chain() {
    let seq = Sequence::from_text("at cgXttX").unwrap();
    let (encoded, remainder) = seq.encode().unwrap();
    assert_eq!(encoded.text().unwrap(), "ATCG");
    assert_eq!(remainder.text().unwrap(), "XttX");

    let cleaned = remainder.splice(drop_x).unwrap();
    assert_eq!(cleaned.text().unwrap(), "tt");
}
