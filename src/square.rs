//! Square names in the board's bit layout.

/// Parses algebraic notation (`"e4"`) into a square index.
#[must_use]
pub fn square_from_name(name: &str) -> Option<usize> {
    let bytes = name.trim().as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].to_ascii_lowercase();
    let rank = bytes[1];
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return None;
    }
    // Bit 0 of a rank is the h-file.
    Some((rank - b'1') as usize * 8 + (b'h' - file) as usize)
}

/// Algebraic name of a square index.
#[must_use]
pub fn square_name(square: usize) -> String {
    let file = (b'h' - (square % 8) as u8) as char;
    let rank = (b'1' + (square / 8) as u8) as char;
    format!("{file}{rank}")
}
