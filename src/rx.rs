//! Receive pipeline: a bit-at-a-time SEARCH/COLLECT state machine that
//! finds the syncword, collects a frame's worth of recovered bits,
//! inverts the line coding, and hands the assembled byte block to
//! [`crate::frame::FrameParser`].

use log::{debug, trace};

use crate::config::LinkConfig;
use crate::diagnostics::Diagnostics;
use crate::dsss::Dsss;
use crate::frame::{FrameParser, HEADER_LEN};
use crate::interleaver::Interleaver;
use crate::manchester;
use crate::nrzi::NrziDecoder;
use crate::scrambler::Scrambler;
use crate::tx::SYNCWORD;

const SYNCWORD_BITS: u32 = u32::from_be_bytes(SYNCWORD);

/// One fully decoded frame delivered by [`RxPipeline::push_bit`].
#[derive(Debug, Clone)]
pub struct Frame {
    /// Application message type.
    pub message_type: u8,
    /// Sender's sequence number.
    pub sequence: u8,
    /// Recovered application payload.
    pub payload: Vec<u8>,
    /// Diagnostics for this frame.
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Search,
    Collect,
}

/// The receive state machine. Fed one hard bit (0 or 1) at a time via
/// [`Self::push_bit`].
pub struct RxPipeline {
    interleaver: Option<Interleaver>,
    interleave_block_len: Option<usize>,
    scrambler_mask: u8,
    scrambler_seed: u8,
    use_whitening: bool,
    use_nrzi: bool,
    use_manchester: bool,
    dsss: Option<Dsss>,
    parser: FrameParser,

    state: State,
    sync_shift: u32,
    is_inverted: bool,
    nrzi_prior: u8,
    recovered_bits: Vec<u8>,
    chip_window: Vec<u8>,
    active_pkt_len: Option<usize>,
    correlation_sum: f64,
    bits_processed: u64,
    last_diagnostics: Option<Diagnostics>,
}

impl RxPipeline {
    /// Build a receive pipeline from a validated [`LinkConfig`].
    pub fn new(config: &LinkConfig) -> crate::error::Result<Self> {
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
            interleaver,
            interleave_block_len,
            scrambler_mask: config.link_layer.scrambler_mask,
            scrambler_seed: config.link_layer.scrambler_seed,
            use_whitening: config.link_layer.use_whitening,
            use_nrzi: config.link_layer.use_nrzi,
            use_manchester: config.link_layer.use_manchester,
            dsss,
            parser: FrameParser::new(fec, crc),
            state: State::Search,
            sync_shift: 0,
            is_inverted: false,
            nrzi_prior: 0,
            recovered_bits: Vec::new(),
            chip_window: Vec::new(),
            active_pkt_len: None,
            correlation_sum: 0.0,
            bits_processed: 0,
            last_diagnostics: None,
        })
    }

    /// Diagnostics for the most recently completed frame attempt, success
    /// or failure -- `None` until the first attempt completes. A failed
    /// attempt (bad header peek or bad CRC) is reported here with
    /// `crc_ok=false` instead of being dropped silently.
    pub fn last_diagnostics(&self) -> Option<Diagnostics> {
        self.last_diagnostics
    }

    /// Feed one hard bit (0 or 1) into the state machine. Returns a
    /// delivered [`Frame`] when a full frame has just been decoded with
    /// a valid CRC; routine channel noise (bad header, bad CRC) is
    /// silent and simply returns the machine to `SEARCH`.
    pub fn push_bit(&mut self, bit: u8) -> Option<Frame> {
        let bit = bit & 1;
        self.sync_shift = (self.sync_shift << 1) | bit as u32;

        if self.sync_shift == SYNCWORD_BITS || self.sync_shift == !SYNCWORD_BITS {
            self.is_inverted = self.sync_shift == !SYNCWORD_BITS;
            trace!("syncword match, inverted={}", self.is_inverted);
            self.enter_collect();
            return None;
        }

        if self.state != State::Collect {
            return None;
        }

        self.push_collect_bit(bit);

        let target_bits = self.target_bits()?;
        if self.recovered_bits.len() < target_bits {
            return None;
        }

        let result = self.finish_frame(target_bits);
        self.state = State::Search;
        self.sync_shift = 0;
        result
    }

    fn enter_collect(&mut self) {
        self.state = State::Collect;
        self.recovered_bits.clear();
        self.chip_window.clear();
        self.nrzi_prior = if self.is_inverted { 1 } else { 0 };
        self.active_pkt_len = None;
        self.correlation_sum = 0.0;
        self.bits_processed = 0;
    }

    /// Pushes one raw channel bit into the chip window / recovered-bits
    /// buffer, with no polarity correction applied yet.
    ///
    /// DSSS despreading and Manchester decoding are each transparent to a
    /// global bit complement (decoding a fully-inverted stream yields the
    /// exact bitwise complement of decoding the true stream); NRZ-I is
    /// differential and so is *almost* transparent the same way, except
    /// for the very first recovered bit, which only comes out right if
    /// the decoder's prior is pre-flipped. Given that, polarity is
    /// corrected in one place, after every optional decode stage has run
    /// (see [`Self::finish_frame`]), rather than bit by bit here.
    fn push_collect_bit(&mut self, bit: u8) {
        if let Some(dsss) = &self.dsss {
            self.chip_window.push(bit);
            if self.chip_window.len() == dsss.spreading_factor() {
                let d = dsss.despread_window(&self.chip_window);
                self.correlation_sum += d.confidence;
                self.bits_processed += 1;
                self.recovered_bits.push(d.bit);
                self.chip_window.clear();
            }
        } else {
            self.recovered_bits.push(bit);
        }
    }

    /// Number of original (line-coded, pre-Manchester/DSSS) bits per
    /// recovered bit, accounting for Manchester's 2x expansion.
    fn manchester_factor(&self) -> usize {
        if self.use_manchester {
            2
        } else {
            1
        }
    }

    fn target_bits(&mut self) -> Option<usize> {
        if let Some(block_len) = self.interleave_block_len {
            return Some(block_len * 8 * self.manchester_factor());
        }

        if self.active_pkt_len.is_none() {
            let header_bits = HEADER_LEN * 8 * self.manchester_factor();
            if self.recovered_bits.len() >= header_bits {
                match self.peek_header(&self.recovered_bits[..header_bits]) {
                    Some(len) => self.active_pkt_len = Some(len),
                    None => {
                        debug!("header peek failed, returning to SEARCH");
                        self.last_diagnostics =
                            Some(Diagnostics::crc_failure(self.is_inverted, self.confidence()));
                        self.state = State::Search;
                        self.sync_shift = 0;
                        return None;
                    }
                }
            }
        }

        self.active_pkt_len
            .map(|len| len * 8 * self.manchester_factor())
    }

    /// Replay Manchester+NRZ-I+byte-assemble+descramble over exactly the
    /// header's bits, using a throwaway NRZ-I decoder so the pipeline's
    /// own line-code state is untouched, and return the predicted full
    /// frame length in bytes.
    fn peek_header(&self, header_bits: &[u8]) -> Option<usize> {
        let mut bits = header_bits.to_vec();
        if self.use_manchester {
            bits = manchester::decode(&bits);
        }
        if self.use_nrzi {
            let mut throwaway = NrziDecoder::new(self.nrzi_prior);
            bits = throwaway.decode(&bits);
        }
        let mut bytes = pack_bits(&bits);
        correct_polarity(&mut bytes, self.is_inverted);
        if self.use_whitening {
            let mut scrambler = Scrambler::new(self.scrambler_mask, self.scrambler_seed);
            bytes = scrambler.process(&bytes);
        }
        let header = self.parser.peek_header(&bytes)?;
        Some(self.parser.frame_len(header.payload_len as usize))
    }

    /// Average DSSS correlation confidence across the frame collected so
    /// far, in percent; `100.0` when DSSS is disabled (nothing to average).
    fn confidence(&self) -> f64 {
        if self.bits_processed > 0 {
            (self.correlation_sum / self.bits_processed as f64) * 100.0
        } else {
            100.0
        }
    }

    fn finish_frame(&mut self, target_bits: usize) -> Option<Frame> {
        let mut bits: Vec<u8> = self.recovered_bits[..target_bits].to_vec();

        if self.use_manchester {
            bits = manchester::decode(&bits);
        }
        if self.use_nrzi {
            let mut dec = NrziDecoder::new(self.nrzi_prior);
            bits = dec.decode(&bits);
        }

        let mut bytes = pack_bits(&bits);
        correct_polarity(&mut bytes, self.is_inverted);

        if self.use_whitening {
            let mut scrambler = Scrambler::new(self.scrambler_mask, self.scrambler_seed);
            bytes = scrambler.process(&bytes);
        }

        let confidence = self.confidence();

        if let Some(il) = &self.interleaver {
            bytes = match il.deinterleave(&bytes) {
                Ok(bytes) => bytes,
                Err(_) => {
                    debug!("deinterleave failed, dropping frame");
                    self.last_diagnostics =
                        Some(Diagnostics::crc_failure(self.is_inverted, confidence));
                    return None;
                }
            };
        }

        let decoded = match self.parser.parse(&bytes) {
            Some(decoded) => decoded,
            None => {
                debug!("CRC check failed, dropping frame");
                self.last_diagnostics = Some(Diagnostics::crc_failure(self.is_inverted, confidence));
                return None;
            }
        };

        let diagnostics = Diagnostics {
            crc_ok: true,
            polarity_inverted: self.is_inverted,
            message_type: decoded.header.message_type,
            sequence: decoded.header.sequence,
            fec_corrections: decoded.fec_corrections,
            avg_correlation_confidence: confidence,
        };
        self.last_diagnostics = Some(diagnostics);

        Some(Frame {
            message_type: decoded.header.message_type,
            sequence: decoded.header.sequence,
            payload: decoded.payload,
            diagnostics,
        })
    }
}

/// Complementing every bit of a polarity-inverted, line-decoded stream
/// is equivalent to bitwise-NOT of the packed bytes; applied once here
/// rather than per bit during collection (see [`RxPipeline::push_collect_bit`]).
fn correct_polarity(bytes: &mut [u8], inverted: bool) {
    if inverted {
        for b in bytes.iter_mut() {
            *b = !*b;
        }
    }
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
