//! Frame assembly: turn an application payload into the byte block that
//! the transmit pipeline line-codes and the receive pipeline parses back
//! out.
//!
//! A frame is `header(3) || fec_body || crc`, where `header` is
//! `(message_type, sequence, payload_len)`. The FEC variant (or none)
//! determines how `fec_body` is built from the payload and how its
//! length is predicted from `payload_len` alone -- the receiver needs
//! that prediction to know how many bytes to collect before it has seen
//! the whole frame.

use crate::crc::{crc16_ccitt, crc32};
use crate::error::{Error, Result};
use crate::rs::{Rs1511, Rs3115};

/// Maximum application payload length this link carries per frame.
pub const MAX_PAYLOAD: usize = 128;

/// Which error-correcting code (if any) protects a frame's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecVariant {
    /// No forward error correction; body = payload.
    None,
    /// RS(15,11) over GF(16), two codewords packed per 11 input bytes.
    Rs15x11,
    /// RS(31,15) over GF(32), used by the "LINK-16"-class missions.
    Rs31x15,
}

/// Which trailer (if any) authenticates a frame's integrity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcVariant {
    /// No checksum appended.
    None,
    /// 2-byte CRC-16-CCITT.
    Crc16,
    /// 4-byte CRC-32.
    Crc32,
}

impl CrcVariant {
    /// Trailer length in bytes.
    pub fn len(&self) -> usize {
        match self {
            CrcVariant::None => 0,
            CrcVariant::Crc16 => 2,
            CrcVariant::Crc32 => 4,
        }
    }
}

/// Parsed frame header: `(message_type, sequence, payload_len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Application-defined message type.
    pub message_type: u8,
    /// Sender's wrapping sequence number.
    pub sequence: u8,
    /// Length, in bytes, of the original (pre-FEC) payload.
    pub payload_len: u8,
}

pub const HEADER_LEN: usize = 3;

impl Header {
    fn to_bytes(self) -> [u8; HEADER_LEN] {
        [self.message_type, self.sequence, self.payload_len]
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            message_type: bytes[0],
            sequence: bytes[1],
            payload_len: bytes[2],
        })
    }
}

/// Given a payload length and FEC variant, the FEC body's length in
/// bytes -- the quantity the receive pipeline needs to predict the
/// frame length from the header alone.
pub fn fec_body_len(payload_len: usize, fec: FecVariant) -> usize {
    match fec {
        FecVariant::None => payload_len,
        FecVariant::Rs15x11 => payload_len.div_ceil(11) * 15,
        FecVariant::Rs31x15 => {
            let padded = payload_len.div_ceil(15) * 15;
            let num_blocks = (padded * 8 + 74) / 75;
            (num_blocks * 31 * 5).div_ceil(8)
        }
    }
}

/// Encode one RS(15,11) block of up to 11 bytes (zero-padded) into 15
/// bytes, by packing each byte into two nibbles, encoding two nibble
/// blocks' worth at a time (22 data nibbles = 11 bytes), and repacking
/// the 30 resulting nibbles into 15 bytes.
fn rs15x11_encode_block(rs: &Rs1511, block: &[u8; 11]) -> [u8; 15] {
    let mut nibbles = [0u8; 22];
    for (i, &b) in block.iter().enumerate() {
        nibbles[2 * i] = (b >> 4) & 0x0F;
        nibbles[2 * i + 1] = b & 0x0F;
    }
    let first: [u8; 11] = nibbles[..11].try_into().unwrap();
    let second: [u8; 11] = nibbles[11..].try_into().unwrap();
    let code_a = rs.encode(&first);
    let code_b = rs.encode(&second);
    let mut all = [0u8; 30];
    all[..15].copy_from_slice(&code_a);
    all[15..].copy_from_slice(&code_b);
    let mut out = [0u8; 15];
    for i in 0..15 {
        out[i] = (all[2 * i] << 4) | all[2 * i + 1];
    }
    out
}

fn rs15x11_decode_block(rs: &Rs1511, block: &[u8; 15]) -> ([u8; 11], bool) {
    let mut nibbles = [0u8; 30];
    for (i, &b) in block.iter().enumerate() {
        nibbles[2 * i] = (b >> 4) & 0x0F;
        nibbles[2 * i + 1] = b & 0x0F;
    }
    let first: [u8; 15] = nibbles[..15].try_into().unwrap();
    let second: [u8; 15] = nibbles[15..].try_into().unwrap();
    let (data_a, corrected_a) = rs.decode(&first);
    let (data_b, corrected_b) = rs.decode(&second);
    let mut all = [0u8; 22];
    all[..11].copy_from_slice(&data_a);
    all[11..].copy_from_slice(&data_b);
    let mut out = [0u8; 11];
    for i in 0..11 {
        out[i] = (all[2 * i] << 4) | all[2 * i + 1];
    }
    (out, corrected_a || corrected_b)
}

fn rs15x11_encode(rs: &Rs1511, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in payload.chunks(11) {
        let mut block = [0u8; 11];
        block[..chunk.len()].copy_from_slice(chunk);
        out.extend_from_slice(&rs15x11_encode_block(rs, &block));
    }
    out
}

fn rs15x11_decode(rs: &Rs1511, body: &[u8], payload_len: usize) -> (Vec<u8>, u32) {
    let mut out = Vec::new();
    let mut corrections = 0u32;
    for chunk in body.chunks(15) {
        let mut block = [0u8; 15];
        block[..chunk.len()].copy_from_slice(chunk);
        let (data, corrected) = rs15x11_decode_block(rs, &block);
        if corrected {
            corrections += 1;
        }
        out.extend_from_slice(&data);
    }
    out.truncate(payload_len);
    (out, corrections)
}

fn rs31x15_encode(rs: &Rs3115, payload: &[u8]) -> Vec<u8> {
    let padded_len = payload.len().div_ceil(15) * 15;
    let mut padded = payload.to_vec();
    padded.resize(padded_len, 0);

    let mut bits = Vec::with_capacity(padded_len * 8);
    for &b in &padded {
        for k in 0..8 {
            bits.push((b >> (7 - k)) & 1);
        }
    }

    // One codeword per 15-symbol (75-bit) input block, matching
    // `fec_body_len`'s block count; zero-fill the final partial block.
    let num_blocks = bits.len().div_ceil(15 * 5);
    bits.resize(num_blocks * 15 * 5, 0);

    let mut out_bits = Vec::new();
    for chunk in bits.chunks_exact(15 * 5) {
        let mut symbols = [0u8; 15];
        for (i, s) in symbols.iter_mut().enumerate() {
            let mut v = 0u8;
            for m in 0..5 {
                v = (v << 1) | chunk[i * 5 + m];
            }
            *s = v;
        }
        let code = rs.encode(&symbols);
        for &sym in &code {
            for m in (0..5).rev() {
                out_bits.push((sym >> m) & 1);
            }
        }
    }
    pack_bits(&out_bits)
}

fn rs31x15_decode(rs: &Rs3115, body: &[u8], payload_len: usize) -> (Vec<u8>, u32) {
    let bits = unpack_bits(body);
    let mut decoded_bits = Vec::new();
    let mut corrections = 0u32;
    for chunk in bits.chunks(31 * 5) {
        if chunk.len() < 31 * 5 {
            break;
        }
        let mut symbols = [0u8; 31];
        for (i, s) in symbols.iter_mut().enumerate() {
            let mut v = 0u8;
            for m in 0..5 {
                v = (v << 1) | chunk[i * 5 + m];
            }
            *s = v;
        }
        let (data, corrected) = rs.decode(&symbols);
        if corrected {
            corrections += 1;
        }
        for sym in data {
            for m in (0..5).rev() {
                decoded_bits.push((sym >> m) & 1);
            }
        }
    }
    let mut bytes = pack_bits(&decoded_bits);
    bytes.truncate(payload_len);
    (bytes, corrections)
}

fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut b = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            b |= bit << (7 - i);
        }
        out.push(b);
    }
    out
}

fn unpack_bits(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        for k in 0..8 {
            out.push((b >> (7 - k)) & 1);
        }
    }
    out
}

/// Assembles frames for transmission: `header || fec_body || crc`,
/// optionally right-zero-padded to an interleaver block size.
pub struct FrameAssembler {
    fec: FecVariant,
    crc: CrcVariant,
    rs1511: Rs1511,
    rs3115: Rs3115,
}

impl FrameAssembler {
    /// Build an assembler for the given FEC and CRC variants.
    pub fn new(fec: FecVariant, crc: CrcVariant) -> Self {
        Self {
            fec,
            crc,
            rs1511: Rs1511::new(),
            rs3115: Rs3115::new(),
        }
    }

    /// Assemble a frame for `payload` with the given message type and
    /// sequence number, zero-padding to `interleave_block` bytes if
    /// `Some`. Returns an error if `payload` is too long, or the
    /// assembled frame (before interleaver padding) would exceed the
    /// given interleaver block.
    pub fn assemble(
        &self,
        message_type: u8,
        sequence: u8,
        payload: &[u8],
        interleave_block: Option<usize>,
    ) -> Result<Vec<u8>> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge { len: payload.len() });
        }
        let body = match self.fec {
            FecVariant::None => payload.to_vec(),
            FecVariant::Rs15x11 => rs15x11_encode(&self.rs1511, payload),
            FecVariant::Rs31x15 => rs31x15_encode(&self.rs3115, payload),
        };
        let header = Header {
            message_type,
            sequence,
            payload_len: payload.len() as u8,
        };
        let mut frame = header.to_bytes().to_vec();
        frame.extend_from_slice(&body);

        match self.crc {
            CrcVariant::None => {}
            CrcVariant::Crc16 => frame.extend_from_slice(&crc16_ccitt(&frame).to_be_bytes()),
            CrcVariant::Crc32 => frame.extend_from_slice(&crc32(&frame).to_be_bytes()),
        }

        if let Some(block_len) = interleave_block {
            if frame.len() > block_len {
                return Err(Error::Codec(format!(
                    "assembled frame ({} bytes) exceeds interleaver block ({block_len} bytes)",
                    frame.len()
                )));
            }
            frame.resize(block_len, 0);
        }

        Ok(frame)
    }
}

/// Outcome of parsing and FEC-decoding a received frame.
pub struct Decoded {
    /// The parsed header.
    pub header: Header,
    /// The recovered application payload, truncated to `header.payload_len`.
    pub payload: Vec<u8>,
    /// Number of FEC blocks in which a correction was applied.
    pub fec_corrections: u32,
}

/// Parses and FEC/CRC-validates a frame assembled by [`FrameAssembler`].
pub struct FrameParser {
    fec: FecVariant,
    crc: CrcVariant,
    rs1511: Rs1511,
    rs3115: Rs3115,
}

impl FrameParser {
    /// Build a parser for the given FEC and CRC variants.
    pub fn new(fec: FecVariant, crc: CrcVariant) -> Self {
        Self {
            fec,
            crc,
            rs1511: Rs1511::new(),
            rs3115: Rs3115::new(),
        }
    }

    /// The FEC body length this variant predicts for a given payload
    /// length, per [`fec_body_len`].
    pub fn fec_body_len(&self, payload_len: usize) -> usize {
        fec_body_len(payload_len, self.fec)
    }

    /// Total frame length (header + FEC body + CRC) for a given payload
    /// length, as predicted from the header alone.
    pub fn frame_len(&self, payload_len: usize) -> usize {
        HEADER_LEN + self.fec_body_len(payload_len) + self.crc.len()
    }

    /// Parse a header from the first [`HEADER_LEN`] bytes of `data`.
    /// Returns `None` if `data` is too short or the header is
    /// implausible (`payload_len` above [`MAX_PAYLOAD`]).
    pub fn peek_header(&self, data: &[u8]) -> Option<Header> {
        let header = Header::from_bytes(data)?;
        if header.payload_len as usize > MAX_PAYLOAD {
            return None;
        }
        Some(header)
    }

    /// Verify the CRC trailer over `frame` (header || fec body || crc).
    /// Returns `true` when there is no trailer to check.
    fn verify_crc(&self, frame: &[u8]) -> bool {
        match self.crc {
            CrcVariant::None => true,
            CrcVariant::Crc16 => {
                let split = frame.len().saturating_sub(2);
                frame.len() >= 2 && crc16_ccitt(&frame[..split]) == u16::from_be_bytes([frame[split], frame[split + 1]])
            }
            CrcVariant::Crc32 => {
                let split = frame.len().saturating_sub(4);
                frame.len() >= 4
                    && crc32(&frame[..split])
                        == u32::from_be_bytes(frame[split..split + 4].try_into().unwrap())
            }
        }
    }

    /// Parse, CRC-check, and FEC-decode a full frame byte block (exactly
    /// `header || fec_body || crc`, no trailing padding). Returns `None`
    /// on a bad header or a CRC mismatch.
    pub fn parse(&self, frame: &[u8]) -> Option<Decoded> {
        let header = self.peek_header(frame)?;
        let expected_len = self.frame_len(header.payload_len as usize);
        if frame.len() < expected_len {
            return None;
        }
        let frame = &frame[..expected_len];
        if !self.verify_crc(frame) {
            return None;
        }
        let body = &frame[HEADER_LEN..frame.len() - self.crc.len()];
        let (payload, fec_corrections) = match self.fec {
            FecVariant::None => (body[..header.payload_len as usize].to_vec(), 0),
            FecVariant::Rs15x11 => {
                rs15x11_decode(&self.rs1511, body, header.payload_len as usize)
            }
            FecVariant::Rs31x15 => {
                rs31x15_decode(&self.rs3115, body, header.payload_len as usize)
            }
        };
        Some(Decoded {
            header,
            payload,
            fec_corrections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_then_parse_round_trips_without_fec() {
        let asm = FrameAssembler::new(FecVariant::None, CrcVariant::Crc16);
        let parser = FrameParser::new(FecVariant::None, CrcVariant::Crc16);
        let payload = b"hello radio".to_vec();
        let frame = asm.assemble(1, 7, &payload, None).unwrap();
        let decoded = parser.parse(&frame).unwrap();
        assert_eq!(decoded.header.message_type, 1);
        assert_eq!(decoded.header.sequence, 7);
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.fec_corrections, 0);
    }

    #[test]
    fn assemble_then_parse_round_trips_with_rs15x11() {
        let asm = FrameAssembler::new(FecVariant::Rs15x11, CrcVariant::Crc16);
        let parser = FrameParser::new(FecVariant::Rs15x11, CrcVariant::Crc16);
        let payload = b"Opal:Full Hardening".to_vec();
        let frame = asm.assemble(2, 1, &payload, None).unwrap();
        let decoded = parser.parse(&frame).unwrap();
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.fec_corrections, 0);
    }

    #[test]
    fn assemble_then_parse_round_trips_with_rs31x15() {
        let asm = FrameAssembler::new(FecVariant::Rs31x15, CrcVariant::Crc16);
        let parser = FrameParser::new(FecVariant::Rs31x15, CrcVariant::Crc16);
        let payload = b"LINK-16 SECURE DATA TEST".to_vec();
        let frame = asm.assemble(3, 9, &payload, None).unwrap();
        let decoded = parser.parse(&frame).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn rs15x11_fec_corrects_a_flipped_byte() {
        let asm = FrameAssembler::new(FecVariant::Rs15x11, CrcVariant::Crc16);
        let parser = FrameParser::new(FecVariant::Rs15x11, CrcVariant::Crc16);
        let payload = b"resilient payload".to_vec();
        let mut frame = asm.assemble(2, 1, &payload, None).unwrap();
        // Flip the high nibble of one FEC body byte; low nibble untouched.
        frame[HEADER_LEN] ^= 0xA0;
        let decoded = parser.parse(&frame).unwrap();
        assert_eq!(decoded.payload, payload);
        assert!(decoded.fec_corrections > 0);
    }

    #[test]
    fn bad_crc_is_rejected() {
        let asm = FrameAssembler::new(FecVariant::None, CrcVariant::Crc16);
        let parser = FrameParser::new(FecVariant::None, CrcVariant::Crc16);
        let mut frame = asm.assemble(1, 0, b"abc", None).unwrap();
        *frame.last_mut().unwrap() ^= 0xFF;
        assert!(parser.parse(&frame).is_none());
    }

    #[test]
    fn payload_too_large_is_rejected() {
        let asm = FrameAssembler::new(FecVariant::None, CrcVariant::Crc16);
        assert!(asm.assemble(1, 0, &[0u8; 129], None).is_err());
    }

    #[test]
    fn interleaver_padding_is_applied() {
        let asm = FrameAssembler::new(FecVariant::Rs15x11, CrcVariant::Crc16);
        let frame = asm.assemble(1, 0, b"short", Some(120)).unwrap();
        assert_eq!(frame.len(), 120);
    }

    #[test]
    fn fec_body_len_matches_rs15x11_block_arithmetic() {
        assert_eq!(fec_body_len(11, FecVariant::Rs15x11), 15);
        assert_eq!(fec_body_len(20, FecVariant::Rs15x11), 30);
        assert_eq!(fec_body_len(1, FecVariant::Rs15x11), 15);
    }
}
