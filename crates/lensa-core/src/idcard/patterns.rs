//! Regex patterns and keyword tables for ID card lines.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Indonesian NIK: exactly 16 digits
    pub static ref ID_NUMBER: Regex = Regex::new(r"\b\d{16}\b").unwrap();

    // DD-MM-YYYY, DD/MM/YYYY and mixed separators
    pub static ref DATE_DMY: Regex = Regex::new(r"\b\d{1,2}[-/]\d{1,2}[-/]\d{4}\b").unwrap();
}

/// Lowercase markers of a name line.
pub const NAME_KEYWORDS: &[&str] = &["nama", "name"];

/// Labels stripped from a name line (case-sensitive).
pub const NAME_LABELS: &[&str] = &["Nama", "Name"];

/// A name line must be longer than this many characters.
pub const NAME_MIN_CHARS: usize = 10;

/// Lowercase markers of a gender line.
pub const GENDER_KEYWORDS: &[&str] = &["laki-laki", "perempuan", "male", "female"];

/// Lowercase substrings that mark an address line.
///
/// Plain substring matching: "rt" also hits words like "kartu" or "hartono".
pub const ADDRESS_KEYWORDS: &[&str] = &["jl", "jalan", "rt", "rw", "kel", "kec"];

/// True when the lowercased `text` contains any of `keywords`.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_number_needs_exact_run() {
        assert!(ID_NUMBER.is_match("NIK 3171234567890123"));
        assert!(!ID_NUMBER.is_match("NIK 317123456789012"));
        assert!(!ID_NUMBER.is_match("NIK 31712345678901234"));
    }

    #[test]
    fn test_date_separators() {
        assert!(DATE_DMY.is_match("17-08-1990"));
        assert!(DATE_DMY.is_match("7/8/1990"));
        assert!(DATE_DMY.is_match("17-08/1990"));
        assert!(!DATE_DMY.is_match("17.08.1990"));
        assert!(!DATE_DMY.is_match("17-08-90"));
    }

    #[test]
    fn test_contains_any_is_case_insensitive() {
        assert!(contains_any("JL. SUDIRMAN", ADDRESS_KEYWORDS));
        assert!(contains_any("Jenis Kelamin: LAKI-LAKI", GENDER_KEYWORDS));
        assert!(!contains_any("Agama: Islam", GENDER_KEYWORDS));
    }
}
