use thiserror::Error;

use crate::{Cond, Reg};

/// Error raised while compiling a bitstring pattern. These are programming
/// errors in a decode table, so table constructors surface them eagerly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is {got} characters long, expected 32")]
    Length { got: usize },
    #[error("unexpected character {ch:?} at bit {bit}")]
    UnexpectedChar { ch: char, bit: usize },
}

/// A compiled instruction bitstring such as
/// `"cccc0000101Snnnnddddvvvvvrr0mmmm"`.
///
/// `0`/`1` are fixed bits and compile into a `(bits, mask)` pair; letters
/// name extraction fields. Bit 31 is the leftmost character. A letter may
/// appear in several separate runs; its extracted value concatenates the
/// runs most-significant-first, which is how split immediates (e.g. the two
/// halves of a halfword-transfer offset) are encoded.
#[derive(Debug, Clone)]
pub struct Pattern {
    bits: u32,
    mask: u32,
    fields: Vec<Field>,
}

#[derive(Debug, Clone)]
struct Field {
    name: char,
    /// Bit positions contributing to the field, most significant first.
    positions: Vec<u8>,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Pattern, PatternError> {
        if source.len() != 32 {
            return Err(PatternError::Length { got: source.len() });
        }

        let mut bits = 0u32;
        let mut mask = 0u32;
        let mut fields: Vec<Field> = Vec::new();

        for (i, ch) in source.chars().enumerate() {
            let bit = 31 - i;
            match ch {
                '0' => mask |= 1 << bit,
                '1' => {
                    bits |= 1 << bit;
                    mask |= 1 << bit;
                }
                ch if ch.is_ascii_alphabetic() => {
                    match fields.iter_mut().find(|f| f.name == ch) {
                        Some(field) => field.positions.push(bit as u8),
                        None => fields.push(Field {
                            name: ch,
                            positions: vec![bit as u8],
                        }),
                    }
                }
                ch => return Err(PatternError::UnexpectedChar { ch, bit }),
            }
        }

        Ok(Pattern { bits, mask, fields })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// `x` matches iff `x & mask == bits`.
    pub fn matches(&self, word: u32) -> bool {
        word & self.mask == self.bits
    }

    /// Bind a matched word for field extraction.
    pub fn fields(&self, word: u32) -> Fields<'_> {
        debug_assert!(self.matches(word));
        Fields {
            pattern: self,
            word,
        }
    }
}

/// Typed field extraction from a matched instruction word.
#[derive(Clone, Copy)]
pub struct Fields<'p> {
    pattern: &'p Pattern,
    word: u32,
}

impl Fields<'_> {
    /// Raw value of field `name`.
    ///
    /// Panics if the pattern has no such field; handlers and patterns are
    /// written together, so a miss is a table bug.
    pub fn get(&self, name: char) -> u32 {
        let field = self
            .pattern
            .fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("pattern has no field {name:?}"));
        let mut value = 0;
        for &bit in &field.positions {
            value = (value << 1) | ((self.word >> bit) & 1);
        }
        value
    }

    pub fn bit(&self, name: char) -> bool {
        self.get(name) != 0
    }

    pub fn reg(&self, name: char) -> Reg {
        Reg::from_bits(self.get(name))
    }

    /// The condition field (`c`).
    pub fn cond(&self) -> Cond {
        Cond::from_bits(self.get('c'))
    }

    pub fn word(&self) -> u32 {
        self.word
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_bits_and_mask() {
        let p = Pattern::compile("cccc0000101Snnnnddddvvvvvrr0mmmm").unwrap();
        assert_eq!(p.bits(), 0x00A0_0000);
        assert_eq!(p.mask(), 0x0FE0_0010);
        assert!(p.matches(0xE0A5_4006)); // adc r4, r5, r6
        assert!(!p.matches(0xE0854006)); // add r4, r5, r6
    }

    #[test]
    fn extracts_contiguous_fields() {
        let p = Pattern::compile("cccc0010101Snnnnddddrrrrvvvvvvvv").unwrap();
        let word = 0xE2A5_4C8A; // adc r4, r5, #35328
        assert!(p.matches(word));
        let f = p.fields(word);
        assert_eq!(f.cond(), Cond::Al);
        assert!(!f.bit('S'));
        assert_eq!(f.reg('n'), Reg::R5);
        assert_eq!(f.reg('d'), Reg::R4);
        assert_eq!(f.get('r'), 0xC);
        assert_eq!(f.get('v'), 0x8A);
    }

    #[test]
    fn extracts_split_fields_msb_first() {
        // Halfword-transfer style split immediate: HHHH....LLLL.
        let p = Pattern::compile("cccc000pu1w1nnnnddddvvvv1011vvvv").unwrap();
        let word = 0xE1D1_2CB5; // ldrh r2, [r1, #0xC5]
        assert!(p.matches(word));
        let f = p.fields(word);
        assert_eq!(f.get('v'), 0xC5);
        assert!(f.bit('p'));
        assert!(f.bit('u'));
        assert!(!f.bit('w'));
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(matches!(
            Pattern::compile("0011"),
            Err(PatternError::Length { got: 4 })
        ));
        assert!(matches!(
            Pattern::compile("cccc0000101Snnnnddddvvvvvrr0mmm!"),
            Err(PatternError::UnexpectedChar { ch: '!', bit: 0 })
        ));
    }
}
