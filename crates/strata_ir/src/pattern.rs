//! Switch-case patterns.

use crate::error::IrError;
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_common::Bits;

/// A case pattern as written by the designer.
///
/// A string pattern lists one character per selector bit, most significant
/// first: `0` and `1` must match exactly and `-` matches either value.
/// Spaces are ignored. An integer pattern must equal the selector.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Pattern {
    /// Bit string with don't-care positions.
    Bits(String),
    /// Exact integer value.
    Int(i64),
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::Bits(s.to_string())
    }
}

impl From<i64> for Pattern {
    fn from(v: i64) -> Self {
        Pattern::Int(v)
    }
}

impl From<i32> for Pattern {
    fn from(v: i32) -> Self {
        Pattern::Int(v as i64)
    }
}

impl From<u32> for Pattern {
    fn from(v: u32) -> Self {
        Pattern::Int(v as i64)
    }
}

/// A pattern resolved against a selector shape: the selector matches when
/// `selector & mask == value`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct MaskedPattern {
    /// Bits that take part in the comparison.
    pub mask: Bits,
    /// Expected values of the masked bits.
    pub value: Bits,
}

impl MaskedPattern {
    /// Returns `true` if `selector` matches.
    pub fn matches(&self, selector: &Bits) -> bool {
        (selector & &self.mask) == self.value
    }

    /// Renders the pattern in `casez` notation, MSB first, with `?` for
    /// don't-care bits.
    pub fn to_casez(&self) -> String {
        (0..self.mask.width())
            .rev()
            .map(|i| match (self.mask.get(i), self.value.get(i)) {
                (false, _) => '?',
                (true, true) => '1',
                (true, false) => '0',
            })
            .collect()
    }
}

impl fmt::Display for MaskedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_casez().replace('?', "-"))
    }
}

impl Pattern {
    /// Resolves the pattern for a selector of the given shape.
    ///
    /// Returns `Ok(None)` for an integer that the selector can never hold;
    /// such a case is kept but never matches.
    pub fn resolve(&self, shape: Shape) -> Result<Option<MaskedPattern>, IrError> {
        match self {
            Pattern::Int(v) => {
                if !shape.fits(*v as i128) {
                    tracing::warn!(
                        value = v,
                        %shape,
                        "case pattern can never match its selector"
                    );
                    return Ok(None);
                }
                Ok(Some(MaskedPattern {
                    mask: Bits::all_one(shape.width),
                    value: Bits::from_i64(*v, shape.width),
                }))
            }
            Pattern::Bits(text) => {
                let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
                let bad = |reason: &str| IrError::BadPattern {
                    pattern: text.clone(),
                    width: shape.width,
                    reason: reason.to_string(),
                };
                if digits.len() != shape.width as usize {
                    return Err(bad(&format!(
                        "pattern has {} bits, selector has {}",
                        digits.len(),
                        shape.width
                    )));
                }
                let mut mask = Bits::new(shape.width);
                let mut value = Bits::new(shape.width);
                for (i, c) in digits.iter().rev().enumerate() {
                    let i = i as u32;
                    match c {
                        '0' => mask.set(i, true),
                        '1' => {
                            mask.set(i, true);
                            value.set(i, true);
                        }
                        '-' => {}
                        _ => return Err(bad("only '0', '1' and '-' are allowed")),
                    }
                }
                Ok(Some(MaskedPattern { mask, value }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(p: impl Into<Pattern>, width: u32) -> MaskedPattern {
        p.into().resolve(Shape::unsigned(width)).unwrap().unwrap()
    }

    #[test]
    fn bit_string_with_dont_care() {
        let p = resolve("1-0", 3);
        assert_eq!(p.mask.to_u64(), Some(0b101));
        assert_eq!(p.value.to_u64(), Some(0b100));
        assert!(p.matches(&Bits::from_u64(0b110, 3)));
        assert!(p.matches(&Bits::from_u64(0b100, 3)));
        assert!(!p.matches(&Bits::from_u64(0b101, 3)));
        assert_eq!(p.to_casez(), "1?0");
        assert_eq!(p.to_string(), "1-0");
    }

    #[test]
    fn spaces_are_ignored() {
        assert_eq!(resolve("10 01", 4).value.to_u64(), Some(0b1001));
    }

    #[test]
    fn integer_pattern() {
        let p = resolve(5, 4);
        assert!(p.matches(&Bits::from_u64(5, 4)));
        assert!(!p.matches(&Bits::from_u64(4, 4)));
    }

    #[test]
    fn negative_integer_on_signed_selector() {
        let p = Pattern::Int(-1).resolve(Shape::signed(4)).unwrap().unwrap();
        assert!(p.matches(&Bits::from_u64(0b1111, 4)));
    }

    #[test]
    fn unreachable_integer_never_matches() {
        assert_eq!(Pattern::Int(16).resolve(Shape::unsigned(4)).unwrap(), None);
        assert_eq!(Pattern::Int(-1).resolve(Shape::unsigned(4)).unwrap(), None);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = Pattern::from("101").resolve(Shape::unsigned(4)).unwrap_err();
        assert!(matches!(err, IrError::BadPattern { width: 4, .. }));
    }

    #[test]
    fn bad_character_is_rejected() {
        assert!(Pattern::from("1x").resolve(Shape::unsigned(2)).is_err());
    }
}
