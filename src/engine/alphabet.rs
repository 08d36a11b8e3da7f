//! IUPAC nucleotide alphabet for the encode scan.
//!
//! The scan recognizes the single-letter nucleotide codes (`A C G T U`),
//! the ambiguity codes (`R Y S W K M B D H V N`), and the gap symbol
//! (`-`), case-insensitively. ASCII whitespace separates symbols and is
//! consumed without producing output, which is why an encoded prefix can
//! be shorter than the source range it was scanned from.

/// Whether a byte separates symbols (consumed without output).
pub fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace()
}

/// Encoded single-letter form of a source byte, or `None` if the byte is
/// not part of the alphabet.
pub fn encode_symbol(b: u8) -> Option<u8> {
    let up = b.to_ascii_uppercase();
    match up {
        // Bases.
        b'A' | b'C' | b'G' | b'T' | b'U' => Some(up),
        // Ambiguity codes.
        b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' => Some(up),
        b'B' | b'D' | b'H' | b'V' | b'N' => Some(up),
        // Gap.
        b'-' => Some(up),
        _ => None,
    }
}
