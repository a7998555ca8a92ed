//! Bitstring-pattern instruction decoder.
//!
//! A decode table is an ordered list of [`Matcher`]s, each pairing a
//! compiled [`Pattern`] with an opaque handler payload (the translator
//! registers function pointers). Matching is first-match-wins in declaration
//! order, so more specific patterns must be listed before the general ones
//! they overlap.

mod pattern;

pub use pattern::{Fields, Pattern, PatternError};

/// One decode-table row: a named pattern plus its handler payload.
pub struct Matcher<H> {
    name: &'static str,
    pattern: Pattern,
    handler: H,
}

impl<H> Matcher<H> {
    pub fn new(name: &'static str, bitstring: &str, handler: H) -> Result<Matcher<H>, PatternError> {
        Ok(Matcher {
            name,
            pattern: Pattern::compile(bitstring)?,
            handler,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, word: u32) -> bool {
        self.pattern.matches(word)
    }

    pub fn fields(&self, word: u32) -> Fields<'_> {
        self.pattern.fields(word)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Ordered decode table with first-match-wins lookup.
pub struct DecodeTable<H> {
    matchers: Vec<Matcher<H>>,
}

impl<H> DecodeTable<H> {
    pub fn new(matchers: Vec<Matcher<H>>) -> DecodeTable<H> {
        DecodeTable { matchers }
    }

    /// Look up a word in the *conditional* instruction space.
    ///
    /// Words with a `0b1111` condition field are unconditional and must not
    /// be matched here; callers dispatch them to a separate table via
    /// [`decode`](DecodeTable::decode).
    pub fn decode_conditional(&self, word: u32) -> Option<&Matcher<H>> {
        if word & 0xF000_0000 == 0xF000_0000 {
            return None;
        }
        self.decode(word)
    }

    /// Plain first-match-wins lookup.
    pub fn decode(&self, word: u32) -> Option<&Matcher<H>> {
        self.matchers.iter().find(|m| m.matches(word))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Matcher<H>> {
        self.matchers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DecodeTable<u32> {
        DecodeTable::new(vec![
            // Specific before general: mul overlaps the and-reg encoding space.
            Matcher::new("mul", "cccc0000000Sdddd0000ssss1001mmmm", 0).unwrap(),
            Matcher::new("and_reg", "cccc0000000Snnnnddddvvvvvrr0mmmm", 1).unwrap(),
        ])
    }

    #[test]
    fn first_match_wins() {
        let table = table();
        let mul = 0xE005_0291; // mul r5, r1, r2
        let and = 0xE005_4006; // and r4, r5, r6
        assert_eq!(*table.decode_conditional(mul).unwrap().handler(), 0);
        assert_eq!(*table.decode_conditional(and).unwrap().handler(), 1);
    }

    #[test]
    fn unconditional_words_are_refused() {
        let table = table();
        assert!(table.decode_conditional(0xF005_4006).is_none());
        // The raw lookup still sees them, for the unconditional table.
        assert!(table.decode(0xF005_4006).is_some());
    }

    #[test]
    fn unmatched_words_return_none() {
        assert!(table().decode_conditional(0xE28F_6F93).is_none());
    }
}
