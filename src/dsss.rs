//! Direct-sequence spreading: each transmitted bit becomes a run of `S`
//! chips (the chipping code or its complement); the receiver recovers one
//! bit per chip window by correlating against the same code and reports
//! how confident that correlation was.

use crate::error::{Error, Result};

/// A chipping code and the spread/despread operations over it.
#[derive(Debug, Clone)]
pub struct Dsss {
    /// The chipping code, as +1/-1 values.
    code: Vec<i8>,
}

/// One despread window's result: the recovered bit and a confidence
/// score in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Despread {
    /// The bit recovered from the correlation's sign.
    pub bit: u8,
    /// `|correlation| / spreading_factor`.
    pub confidence: f64,
}

impl Dsss {
    /// Build a spreader/despreader from a chipping code. Every entry must
    /// be `1` or `-1`; the code's length is the spreading factor `S`.
    pub fn new(code: Vec<i8>) -> Result<Self> {
        if code.is_empty() || code.iter().any(|&c| c != 1 && c != -1) {
            return Err(Error::InvalidConfig {
                reason: "DSSS chipping code must be non-empty and contain only +-1".into(),
            });
        }
        Ok(Self { code })
    }

    /// The spreading factor `S`, i.e. chips per user bit.
    pub fn spreading_factor(&self) -> usize {
        self.code.len()
    }

    /// Spread a bit sequence (one bit per byte, 0 or 1) into `S` chip
    /// bits per input bit, each chip bit being `1` for `+1` or `0` for
    /// `-1`.
    pub fn spread(&self, bits: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bits.len() * self.spreading_factor());
        for &b in bits {
            let sign: i8 = if b & 1 == 1 { 1 } else { -1 };
            out.extend(self.code.iter().map(|&c| chip_to_bit(c * sign)));
        }
        out
    }

    /// Despread one full window of `S` chip bits (`0`/`1`, already
    /// polarity-corrected) into a recovered bit plus confidence.
    pub fn despread_window(&self, window: &[u8]) -> Despread {
        debug_assert_eq!(window.len(), self.spreading_factor());
        let correlation: i64 = window
            .iter()
            .zip(self.code.iter())
            .map(|(&w, &c)| bit_to_chip(w) as i64 * c as i64)
            .sum();
        Despread {
            bit: if correlation > 0 { 1 } else { 0 },
            confidence: (correlation.unsigned_abs() as f64) / (self.spreading_factor() as f64),
        }
    }

    /// Despread a whole chip-bit sequence, `S` chips at a time. Returns
    /// the recovered bits and the average confidence across all windows
    /// (`1.0` if there are none). `chips.len()` need not be a multiple of
    /// `S`; a trailing partial window is dropped.
    pub fn despread(&self, chips: &[u8]) -> (Vec<u8>, f64) {
        let s = self.spreading_factor();
        let mut bits = Vec::with_capacity(chips.len() / s);
        let mut confidence_sum = 0.0;
        for window in chips.chunks_exact(s) {
            let d = self.despread_window(window);
            bits.push(d.bit);
            confidence_sum += d.confidence;
        }
        let avg = if bits.is_empty() {
            1.0
        } else {
            confidence_sum / bits.len() as f64
        };
        (bits, avg)
    }
}

fn chip_to_bit(chip: i8) -> u8 {
    if chip > 0 {
        1
    } else {
        0
    }
}

fn bit_to_chip(bit: u8) -> i8 {
    if bit & 1 == 1 {
        1
    } else {
        -1
    }
}
