//! Edit-distance similarity ratio

use strsim::levenshtein;

/// Normalized Levenshtein similarity in `0.0..=100.0`.
///
/// `100 * (1 - distance / max_len)`, counted in chars. Two empty strings score 100.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let distance = levenshtein(a, b);
    let ratio = 100.0 * (1.0 - distance as f64 / max_len as f64);
    ratio.clamp(0.0, 100.0)
}

/// Whether `similarity_ratio(a, b) >= threshold`, compared without float rounding.
#[inline]
pub fn meets_threshold(a: &str, b: &str, threshold: u8) -> bool {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return true;
    }
    let distance = levenshtein(a, b).min(max_len);
    // ratio >= t  <=>  100 * (max - dist) >= t * max
    100 * (max_len - distance) >= threshold as usize * max_len
}
