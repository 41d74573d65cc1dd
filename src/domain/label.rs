//! Alphabetic profile labels: `0 -> A`, `25 -> Z`, `26 -> AA`, `27 -> AB`, ...
//!
//! This is bijective base-26 (no zero digit), the same scheme spreadsheet
//! columns use, so every index has exactly one label and vice versa.

/// Label for a zero-based index.
pub fn alpha_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    // Only ASCII uppercase bytes were pushed.
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`alpha_label`]. `None` for empty or non `A-Z` input.
pub fn alpha_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for b in label.bytes() {
        if !b.is_ascii_uppercase() {
            return None;
        }
        n = n.checked_mul(26)?.checked_add((b - b'A') as usize + 1)?;
    }
    Some(n - 1)
}

/// Smallest label index not present in `used`.
pub fn next_unused_label<'a>(used: impl IntoIterator<Item = &'a str>) -> String {
    let mut taken: Vec<usize> = used.into_iter().filter_map(alpha_index).collect();
    taken.sort_unstable();
    taken.dedup();
    let first_free = taken
        .iter()
        .enumerate()
        .find(|(expected, actual)| *expected != **actual)
        .map(|(expected, _)| expected)
        .unwrap_or(taken.len());
    alpha_label(first_free)
}
