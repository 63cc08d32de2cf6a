//! Fixed-width two-state bit vectors used for every signal value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A fixed-width vector of two-state bits.
///
/// Bits are stored little-endian in `u64` words: bit 0 is the least significant
/// bit of `words[0]`. Bits above `width` are always kept zero, so derived
/// equality and hashing compare values, not storage noise. A width of zero is
/// allowed and represents the empty vector.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bits {
    width: u32,
    words: Vec<u64>,
}

/// Error returned when a textual bit pattern cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid bit string: '{input}'")]
pub struct ParseBitsError {
    /// The input string that failed to parse.
    pub input: String,
}

const WORD_BITS: u32 = 64;

fn word_count(width: u32) -> usize {
    width.div_ceil(WORD_BITS) as usize
}

impl Bits {
    /// Creates a zero-valued vector of the given width.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            words: vec![0; word_count(width)],
        }
    }

    /// Creates a vector with every bit cleared.
    pub fn all_zero(width: u32) -> Self {
        Self::new(width)
    }

    /// Creates a vector with every bit set.
    pub fn all_one(width: u32) -> Self {
        let mut v = Self {
            width,
            words: vec![u64::MAX; word_count(width)],
        };
        v.normalize();
        v
    }

    /// Creates a single-bit vector.
    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(value as u64, 1)
    }

    /// Creates a vector from the low `width` bits of `value`.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        if let Some(first) = v.words.first_mut() {
            *first = value;
        }
        v.normalize();
        v
    }

    /// Creates a vector holding the two's complement encoding of `value`,
    /// sign-extended or truncated to `width` bits.
    pub fn from_i64(value: i64, width: u32) -> Self {
        let fill = if value < 0 { u64::MAX } else { 0 };
        let mut v = Self {
            width,
            words: vec![fill; word_count(width)],
        };
        if let Some(first) = v.words.first_mut() {
            *first = value as u64;
        }
        v.normalize();
        v
    }

    /// Returns the number of bits in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> bool {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        (self.words[(index / WORD_BITS) as usize] >> (index % WORD_BITS)) & 1 != 0
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: bool) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = &mut self.words[(index / WORD_BITS) as usize];
        let mask = 1u64 << (index % WORD_BITS);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Returns the most significant bit, or `false` for an empty vector.
    pub fn msb(&self) -> bool {
        self.width > 0 && self.get(self.width - 1)
    }

    /// Returns the value as an unsigned integer if it fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.words.iter().skip(1).any(|&w| w != 0) {
            return None;
        }
        Some(self.words.first().copied().unwrap_or(0))
    }

    /// Interprets the vector as a two's complement number and returns it if
    /// it fits in an `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        if self.width == 0 {
            return Some(0);
        }
        if self.width <= WORD_BITS {
            let extended = self.resize(WORD_BITS, true);
            return Some(extended.words[0] as i64);
        }
        // Everything from bit 63 up must be a copy of the sign.
        let upper = self.slice(WORD_BITS - 1, self.width);
        let fits = if self.msb() {
            upper.is_all_one()
        } else {
            upper.is_zero()
        };
        fits.then(|| self.words[0] as i64)
    }

    /// Returns `true` if every bit is clear.
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns `true` if every bit is set. The empty vector counts as all-ones.
    pub fn is_all_one(&self) -> bool {
        self.count_ones() == self.width
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Truncates or extends the vector to `width` bits. Extension replicates
    /// the most significant bit when `signed` is set and fills zeros otherwise.
    pub fn resize(&self, width: u32, signed: bool) -> Self {
        let mut words = self.words.clone();
        words.resize(word_count(width), 0);
        let mut out = Self { width, words };
        if signed && width > self.width && self.msb() {
            out.fill_ones(self.width, width);
        }
        out.normalize();
        out
    }

    /// Returns bits `start..end` as a new vector of width `end - start`.
    ///
    /// # Panics
    ///
    /// Panics if the range is reversed or exceeds the width.
    pub fn slice(&self, start: u32, end: u32) -> Self {
        assert!(
            start <= end && end <= self.width,
            "slice {start}..{end} out of bounds for width {}",
            self.width
        );
        self.shr(start as u64, false).resize(end - start, false)
    }

    /// Overwrites bits `offset..offset + src.width()` with `src`.
    ///
    /// # Panics
    ///
    /// Panics if the destination range exceeds the width.
    pub fn deposit(&mut self, offset: u32, src: &Bits) {
        assert!(
            offset + src.width <= self.width,
            "deposit of {} bits at {offset} out of bounds for width {}",
            src.width,
            self.width
        );
        let mut mask = Self::new(self.width);
        mask.fill_ones(offset, offset + src.width);
        let placed = src.shl(offset as u64, self.width);
        for (i, word) in self.words.iter_mut().enumerate() {
            *word = (*word & !mask.words[i]) | placed.words[i];
        }
    }

    /// Concatenates `parts`; the first part occupies the least significant bits.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a Bits>) -> Self {
        let parts: Vec<&Bits> = parts.into_iter().collect();
        let total = parts.iter().map(|p| p.width).sum();
        let mut out = Self::new(total);
        let mut offset = 0;
        for part in parts {
            out.deposit(offset, part);
            offset += part.width;
        }
        out
    }

    /// Repeats this vector `count` times, the first copy in the low bits.
    pub fn repeat(&self, count: u32) -> Self {
        Self::concat(std::iter::repeat(self).take(count as usize))
    }

    /// Zero-extends or truncates to `width` and shifts left by `amount`.
    pub fn shl(&self, amount: u64, width: u32) -> Self {
        let len = word_count(width);
        let mut out = Self {
            width,
            words: vec![0; len],
        };
        if amount < width as u64 {
            let word_shift = (amount / WORD_BITS as u64) as usize;
            let bit_shift = (amount % WORD_BITS as u64) as u32;
            for (i, &w) in self.words.iter().enumerate() {
                let lo = i + word_shift;
                if lo < len {
                    out.words[lo] |= w << bit_shift;
                }
                if bit_shift != 0 && lo + 1 < len {
                    out.words[lo + 1] |= w >> (WORD_BITS - bit_shift);
                }
            }
        }
        out.normalize();
        out
    }

    /// Shifts right by `amount`, keeping the width. Vacated bits copy the
    /// most significant bit when `arithmetic` is set.
    pub fn shr(&self, amount: u64, arithmetic: bool) -> Self {
        let fill = arithmetic && self.msb();
        let mut out = Self::new(self.width);
        if amount < self.width as u64 {
            let word_shift = (amount / WORD_BITS as u64) as usize;
            let bit_shift = (amount % WORD_BITS as u64) as u32;
            for i in 0..self.words.len() {
                let src = i + word_shift;
                let Some(&w) = self.words.get(src) else { break };
                let mut v = w >> bit_shift;
                if bit_shift != 0 {
                    if let Some(&next) = self.words.get(src + 1) {
                        v |= next << (WORD_BITS - bit_shift);
                    }
                }
                out.words[i] = v;
            }
            if fill {
                out.fill_ones(self.width - amount as u32, self.width);
            }
        } else if fill {
            out = Self::all_one(self.width);
        }
        out
    }

    /// Adds two vectors of equal width, modulo `2^width`.
    pub fn wrapping_add(&self, rhs: &Bits) -> Self {
        self.check_width(rhs, "add");
        let mut out = Self::new(self.width);
        let mut carry = false;
        for i in 0..self.words.len() {
            let (s1, c1) = self.words[i].overflowing_add(rhs.words[i]);
            let (s2, c2) = s1.overflowing_add(carry as u64);
            out.words[i] = s2;
            carry = c1 || c2;
        }
        out.normalize();
        out
    }

    /// Subtracts two vectors of equal width, modulo `2^width`.
    pub fn wrapping_sub(&self, rhs: &Bits) -> Self {
        self.check_width(rhs, "sub");
        let mut out = Self::new(self.width);
        let mut borrow = false;
        for i in 0..self.words.len() {
            let (d1, b1) = self.words[i].overflowing_sub(rhs.words[i]);
            let (d2, b2) = d1.overflowing_sub(borrow as u64);
            out.words[i] = d2;
            borrow = b1 || b2;
        }
        out.normalize();
        out
    }

    /// Two's complement negation, modulo `2^width`.
    pub fn wrapping_neg(&self) -> Self {
        Self::new(self.width).wrapping_sub(self)
    }

    /// Multiplies two vectors of equal width, modulo `2^width`.
    pub fn wrapping_mul(&self, rhs: &Bits) -> Self {
        self.check_width(rhs, "mul");
        let len = self.words.len();
        let mut out = Self::new(self.width);
        for i in 0..len {
            let mut carry: u128 = 0;
            for j in 0..len - i {
                let k = i + j;
                let cur = out.words[k] as u128
                    + (self.words[i] as u128) * (rhs.words[j] as u128)
                    + carry;
                out.words[k] = cur as u64;
                carry = cur >> 64;
            }
        }
        out.normalize();
        out
    }

    /// Compares two equal-width vectors as unsigned numbers.
    pub fn cmp_unsigned(&self, rhs: &Bits) -> Ordering {
        self.check_width(rhs, "compare");
        self.words.iter().rev().cmp(rhs.words.iter().rev())
    }

    /// Compares two equal-width vectors as two's complement numbers.
    pub fn cmp_signed(&self, rhs: &Bits) -> Ordering {
        match (self.msb(), rhs.msb()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.cmp_unsigned(rhs),
        }
    }

    /// Parses an MSB-first binary string such as `"1010"`. Underscores are
    /// ignored; the width is the number of digits.
    pub fn from_binary_str(s: &str) -> Result<Self, ParseBitsError> {
        let digits: Vec<char> = s.chars().filter(|&c| c != '_').collect();
        let mut v = Self::new(digits.len() as u32);
        for (i, c) in digits.iter().rev().enumerate() {
            match c {
                '0' => {}
                '1' => v.set(i as u32, true),
                _ => {
                    return Err(ParseBitsError {
                        input: s.to_string(),
                    })
                }
            }
        }
        Ok(v)
    }

    /// Parses an MSB-first hexadecimal string; each digit contributes 4 bits.
    pub fn from_hex_str(s: &str) -> Result<Self, ParseBitsError> {
        let digits: Vec<char> = s.chars().filter(|&c| c != '_').collect();
        let mut v = Self::new(digits.len() as u32 * 4);
        for (hex_idx, c) in digits.iter().rev().enumerate() {
            let nibble = c.to_digit(16).ok_or_else(|| ParseBitsError {
                input: s.to_string(),
            })?;
            for bit in 0..4 {
                if nibble & (1 << bit) != 0 {
                    v.set(hex_idx as u32 * 4 + bit, true);
                }
            }
        }
        Ok(v)
    }

    fn fill_ones(&mut self, start: u32, end: u32) {
        let mut i = start;
        while i < end {
            let bit = i % WORD_BITS;
            let n = (WORD_BITS - bit).min(end - i);
            let mask = if n == WORD_BITS {
                u64::MAX
            } else {
                ((1u64 << n) - 1) << bit
            };
            self.words[(i / WORD_BITS) as usize] |= mask;
            i += n;
        }
    }

    fn normalize(&mut self) {
        let rem = self.width % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    fn check_width(&self, rhs: &Bits, op: &str) {
        assert_eq!(self.width, rhs.width, "Bits width mismatch in {op}");
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({}'b{self})", self.width)
    }
}

impl BitAnd for &Bits {
    type Output = Bits;

    fn bitand(self, rhs: Self) -> Bits {
        self.check_width(rhs, "AND");
        Bits {
            width: self.width,
            words: self.words.iter().zip(&rhs.words).map(|(a, b)| a & b).collect(),
        }
    }
}

impl BitOr for &Bits {
    type Output = Bits;

    fn bitor(self, rhs: Self) -> Bits {
        self.check_width(rhs, "OR");
        Bits {
            width: self.width,
            words: self.words.iter().zip(&rhs.words).map(|(a, b)| a | b).collect(),
        }
    }
}

impl BitXor for &Bits {
    type Output = Bits;

    fn bitxor(self, rhs: Self) -> Bits {
        self.check_width(rhs, "XOR");
        Bits {
            width: self.width,
            words: self.words.iter().zip(&rhs.words).map(|(a, b)| a ^ b).collect(),
        }
    }
}

impl Not for &Bits {
    type Output = Bits;

    fn not(self) -> Bits {
        let mut out = Bits {
            width: self.width,
            words: self.words.iter().map(|w| !w).collect(),
        };
        out.normalize();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zero() {
        let v = Bits::new(70);
        assert_eq!(v.width(), 70);
        assert!(v.is_zero());
        assert_eq!(v.to_u64(), Some(0));
    }

    #[test]
    fn from_u64_truncates() {
        let v = Bits::from_u64(0x1ff, 8);
        assert_eq!(v.to_u64(), Some(0xff));
        assert_eq!(v, Bits::all_one(8));
    }

    #[test]
    fn from_i64_sign_extends_across_words() {
        let v = Bits::from_i64(-1, 100);
        assert_eq!(v.count_ones(), 100);
        assert_eq!(v.to_i64(), Some(-1));
        assert_eq!(v.to_u64(), None);
    }

    #[test]
    fn to_i64_interprets_sign() {
        assert_eq!(Bits::from_u64(0b1011, 4).to_i64(), Some(-5));
        assert_eq!(Bits::from_u64(0b0101, 4).to_i64(), Some(5));
        assert_eq!(Bits::new(0).to_i64(), Some(0));
    }

    #[test]
    fn get_set_roundtrip() {
        let mut v = Bits::new(130);
        v.set(0, true);
        v.set(64, true);
        v.set(129, true);
        assert!(v.get(0) && v.get(64) && v.get(129));
        assert!(!v.get(1));
        assert_eq!(v.count_ones(), 3);
        v.set(64, false);
        assert!(!v.get(64));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn get_out_of_bounds_panics() {
        Bits::new(4).get(4);
    }

    #[test]
    fn resize_sign_and_zero_extend() {
        let v = Bits::from_u64(0b1010, 4);
        assert_eq!(v.resize(8, false).to_u64(), Some(0b0000_1010));
        assert_eq!(v.resize(8, true).to_u64(), Some(0b1111_1010));
        assert_eq!(v.resize(2, true).to_u64(), Some(0b10));
        assert_eq!(v.resize(80, true).count_ones(), 78);
    }

    #[test]
    fn slice_extracts_range() {
        let v = Bits::from_u64(0b1101_0110, 8);
        assert_eq!(v.slice(2, 6).to_u64(), Some(0b0101));
        assert_eq!(v.slice(3, 3).width(), 0);
    }

    #[test]
    fn concat_first_part_is_lsb() {
        let a = Bits::from_u64(0b01, 2);
        let b = Bits::from_u64(0b110, 3);
        let c = Bits::concat([&a, &b]);
        assert_eq!(c.width(), 5);
        assert_eq!(c.to_u64(), Some(0b110_01));
    }

    #[test]
    fn repeat_replicates() {
        let v = Bits::from_u64(0b10, 2).repeat(3);
        assert_eq!(v.to_u64(), Some(0b10_10_10));
        assert_eq!(Bits::from_bool(true).repeat(0).width(), 0);
    }

    #[test]
    fn deposit_overwrites_only_range() {
        let mut v = Bits::all_one(8);
        v.deposit(2, &Bits::from_u64(0b010, 3));
        assert_eq!(v.to_u64(), Some(0b1110_1011));
    }

    #[test]
    fn arithmetic_wraps() {
        let a = Bits::from_u64(250, 8);
        let b = Bits::from_u64(10, 8);
        assert_eq!(a.wrapping_add(&b).to_u64(), Some(4));
        assert_eq!(b.wrapping_sub(&a).to_u64(), Some(16));
        assert_eq!(b.wrapping_neg().to_u64(), Some(246));
        assert_eq!(a.wrapping_mul(&b).to_u64(), Some((2500 % 256) as u64));
    }

    #[test]
    fn add_carries_across_words() {
        let a = Bits::from_u64(u64::MAX, 65);
        let one = Bits::from_u64(1, 65);
        let sum = a.wrapping_add(&one);
        assert!(sum.get(64));
        assert_eq!(sum.count_ones(), 1);
    }

    #[test]
    fn shifts() {
        let v = Bits::from_u64(0b1001, 4);
        assert_eq!(v.shl(2, 6).to_u64(), Some(0b10_0100));
        assert_eq!(v.shr(1, false).to_u64(), Some(0b0100));
        assert_eq!(v.shr(1, true).to_u64(), Some(0b1100));
        assert_eq!(v.shr(10, true), Bits::all_one(4));
        assert!(v.shl(100, 4).is_zero());
    }

    #[test]
    fn shifts_across_words() {
        let v = Bits::from_u64(1, 130);
        let moved = v.shl(129, 130);
        assert!(moved.get(129));
        assert_eq!(moved.shr(129, false), v);
    }

    #[test]
    fn comparisons() {
        let a = Bits::from_u64(0b1000, 4); // -8 signed
        let b = Bits::from_u64(0b0001, 4);
        assert_eq!(a.cmp_unsigned(&b), Ordering::Greater);
        assert_eq!(a.cmp_signed(&b), Ordering::Less);
    }

    #[test]
    fn bitwise_ops() {
        let a = Bits::from_u64(0b1100, 4);
        let b = Bits::from_u64(0b1010, 4);
        assert_eq!((&a & &b).to_u64(), Some(0b1000));
        assert_eq!((&a | &b).to_u64(), Some(0b1110));
        assert_eq!((&a ^ &b).to_u64(), Some(0b0110));
        assert_eq!((!&a).to_u64(), Some(0b0011));
    }

    #[test]
    fn parse_binary_and_hex() {
        let v = Bits::from_binary_str("10_10").unwrap();
        assert_eq!(v.width(), 4);
        assert_eq!(v.to_u64(), Some(0b1010));
        let h = Bits::from_hex_str("aF").unwrap();
        assert_eq!(h.width(), 8);
        assert_eq!(h.to_u64(), Some(0xaf));
        assert!(Bits::from_binary_str("10x1").is_err());
        assert!(Bits::from_hex_str("zz").is_err());
    }

    #[test]
    fn display_msb_first() {
        let v = Bits::from_u64(0b0110, 4);
        assert_eq!(format!("{v}"), "0110");
        assert_eq!(format!("{v:?}"), "Bits(4'b0110)");
    }

    #[test]
    fn serde_roundtrip() {
        let v = Bits::from_i64(-3, 70);
        let json = serde_json::to_string(&v).unwrap();
        let back: Bits = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
