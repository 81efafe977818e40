//! Transmit pipeline: assembles a frame, then applies interleave,
//! scramble, bit-serialize, NRZ-I, Manchester, and DSSS in that fixed
//! order before prepending preamble and syncword.

use crate::config::LinkConfig;
use crate::dsss::Dsss;
use crate::error::Result;
use crate::frame::{FrameAssembler, HEADER_LEN};
use crate::interleaver::Interleaver;
use crate::manchester;
use crate::nrzi::NrziEncoder;
use crate::scrambler::Scrambler;

/// Preamble byte, repeated [`PREAMBLE_LEN`] times.
pub const PREAMBLE_BYTE: u8 = 0xAA;
/// Minimum preamble length in bytes.
pub const PREAMBLE_LEN: usize = 8;
/// The 4-byte syncword, `0x3D4C5B6A`.
pub const SYNCWORD: [u8; 4] = [0x3D, 0x4C, 0x5B, 0x6A];
/// Minimum trailing zero padding, in bytes.
pub const TRAILING_PAD_LEN: usize = 32;

/// Builds the pre-modulation byte stream for outbound frames.
pub struct TxPipeline {
    assembler: FrameAssembler,
    interleaver: Option<Interleaver>,
    interleave_block_len: Option<usize>,
    scrambler_mask: u8,
    scrambler_seed: u8,
    use_whitening: bool,
    use_nrzi: bool,
    use_manchester: bool,
    dsss: Option<Dsss>,
    sequence: u8,
}

impl TxPipeline {
    /// Build a transmit pipeline from a validated [`LinkConfig`].
    pub fn new(config: &LinkConfig) -> Result<Self> {
        let fec = config.fec_variant();
        let crc = config.crc_variant();
        let interleave_block_len = config.link_layer.use_interleaving.then(|| config.interleaver_block_len());
        let interleaver = interleave_block_len.map(|block_len| {
            Interleaver::new(config.link_layer.interleaver_rows, block_len / config.link_layer.interleaver_rows)
        });
        let dsss = if config.dsss.enabled {
            Some(Dsss::new(config.dsss.chipping_code.clone())?)
        } else {
            None
        };
        Ok(Self {
            assembler: FrameAssembler::new(fec, crc),
            interleaver,
            interleave_block_len,
            scrambler_mask: config.link_layer.scrambler_mask,
            scrambler_seed: config.link_layer.scrambler_seed,
            use_whitening: config.link_layer.use_whitening,
            use_nrzi: config.link_layer.use_nrzi,
            use_manchester: config.link_layer.use_manchester,
            dsss,
            sequence: 0,
        })
    }

    /// Assemble and fully transform `payload` into one frame's
    /// pre-modulation byte stream: `preamble || syncword || transformed
    /// frame || trailing zero padding`. Advances the internal sequence
    /// counter (wrapping mod 256) on success.
    pub fn submit(&mut self, payload: &[u8], message_type: u8) -> Result<Vec<u8>> {
        let sequence = self.sequence;
        let frame = self
            .assembler
            .assemble(message_type, sequence, payload, self.interleave_block_len)?;
        self.sequence = self.sequence.wrapping_add(1);

        let bytes = if let Some(il) = &self.interleaver {
            il.interleave(&frame)?
        } else {
            frame
        };

        let bytes = if self.use_whitening {
            let mut scrambler = Scrambler::new(self.scrambler_mask, self.scrambler_seed);
            scrambler.process(&bytes)
        } else {
            bytes
        };

        let mut bits = bytes_to_bits(&bytes);

        if self.use_nrzi {
            let mut enc = NrziEncoder::new(0);
            bits = enc.encode(&bits);
        }

        if self.use_manchester {
            bits = manchester::encode(&bits);
        }

        let bits = if let Some(dsss) = &self.dsss {
            dsss.spread(&bits)
        } else {
            bits
        };

        let packed = bits_to_bytes(&bits);

        let mut out = Vec::with_capacity(PREAMBLE_LEN + SYNCWORD.len() + packed.len() + TRAILING_PAD_LEN);
        out.extend(vec![PREAMBLE_BYTE; PREAMBLE_LEN]);
        out.extend_from_slice(&SYNCWORD);
        out.extend_from_slice(&packed);
        out.extend(vec![0u8; TRAILING_PAD_LEN]);
        Ok(out)
    }
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        for k in 0..8 {
            out.push((b >> (7 - k)) & 1);
        }
    }
    out
}

fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
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
