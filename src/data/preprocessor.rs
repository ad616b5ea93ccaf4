// ============================================================
// Layer 4 — Line Preprocessor
// ============================================================
// Splits one corpus line into tokens before vocabulary lookup.
//
// Two modes, chosen by the model's `characters` option:
//   word mode      — split on any Unicode whitespace
//   character mode — every char of the trimmed line is a token,
//                    inner spaces included
//
// Trailing newlines and carriage returns never become tokens.
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor {
    characters: bool,
}

impl Preprocessor {
    pub fn new(characters: bool) -> Self {
        Self { characters }
    }

    /// Tokenise a single line.
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        let line = line.trim();
        if self.characters {
            line.chars().map(String::from).collect()
        } else {
            line.split_whitespace().map(str::to_string).collect()
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_mode_collapses_whitespace() {
        let p = Preprocessor::new(false);
        assert_eq!(p.tokenize("  the   cat\tsat \r\n"), vec!["the", "cat", "sat"]);
    }

    #[test]
    fn test_character_mode_keeps_inner_spaces() {
        let p = Preprocessor::new(true);
        assert_eq!(p.tokenize("ab c\n"), vec!["a", "b", " ", "c"]);
    }

    #[test]
    fn test_empty_line() {
        assert!(Preprocessor::new(false).tokenize("   \n").is_empty());
        assert!(Preprocessor::new(true).tokenize("").is_empty());
    }
}
