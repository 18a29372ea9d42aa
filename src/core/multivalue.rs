//! core/multivalue.rs
//!
//! Packs a list of tag values into one snapshot cell and back.
//!
//! - `encode(["Baroque", "Sacred"])` with `;` -> `"Baroque;Sacred"`
//! - `decode("Baroque;Sacred")` -> `["Baroque", "Sacred"]`
//!
//! Limitation: the separator is NOT escaped. A value that itself contains the
//! separator is split on decode, exactly like a real value boundary. Pick a
//! separator that never appears in your tags.

pub const DEFAULT_SEPARATOR: char = ';';

/// One separator, fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiValue {
    separator: char,
}

impl Default for MultiValue {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl MultiValue {
    pub const fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Join values with the separator.
    /// - empty list -> ""
    /// - one value -> that value unchanged
    pub fn encode<S: AsRef<str>>(&self, values: &[S]) -> String {
        let mut out = String::new();
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                out.push(self.separator);
            }
            out.push_str(v.as_ref());
        }
        out
    }

    /// Split a cell on the separator. "" decodes to an empty list.
    pub fn decode(&self, scalar: &str) -> Vec<String> {
        if scalar.is_empty() {
            return Vec::new();
        }
        scalar.split(self.separator).map(str::to_owned).collect()
    }
}
