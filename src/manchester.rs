//! Manchester line coding: each bit becomes a pair of bits, so the output
//! always contains a mid-symbol transition.
//!
//! Encode: 1 -> (1,0); 0 -> (0,1). Decode inverts that table; any other
//! pair is a line-code violation and the reference silently decodes it as
//! 0 rather than raising an error, so this does too.

/// Encode a bit sequence (one bit per byte, 0 or 1) into twice as many
/// output bits.
pub fn encode(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len() * 2);
    for &b in bits {
        if b & 1 == 1 {
            out.push(1);
            out.push(0);
        } else {
            out.push(0);
            out.push(1);
        }
    }
    out
}

/// Decode a Manchester-coded bit sequence back to half as many bits.
/// `bits.len()` need not be even; a trailing unpaired bit is dropped.
pub fn decode(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(2)
        .map(|pair| match (pair[0], pair[1]) {
            (1, 0) => 1,
            (0, 1) => 0,
            _ => 0,
        })
        .collect()
}
