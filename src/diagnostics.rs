//! The per-frame diagnostics record the receive pipeline emits alongside
//! (or instead of) a delivered payload.

/// Diagnostics for one received frame attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    /// Whether the CRC trailer validated.
    pub crc_ok: bool,
    /// Whether the syncword matched in complemented (inverted) polarity.
    pub polarity_inverted: bool,
    /// The header's message type, if a header was recovered.
    pub message_type: u8,
    /// The header's sequence number, if a header was recovered.
    pub sequence: u8,
    /// Number of FEC blocks in which a correction was applied.
    pub fec_corrections: u32,
    /// Average DSSS correlation confidence across the frame, in percent
    /// (`[0, 100]`); `100.0` when DSSS is disabled.
    pub avg_correlation_confidence: f64,
}

impl Diagnostics {
    /// A diagnostics record for a frame that failed CRC validation.
    pub fn crc_failure(polarity_inverted: bool, avg_correlation_confidence: f64) -> Self {
        Self {
            crc_ok: false,
            polarity_inverted,
            message_type: 0,
            sequence: 0,
            fec_corrections: 0,
            avg_correlation_confidence,
        }
    }
}
