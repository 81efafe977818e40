//! Layered, `serde`-derived configuration mirroring the reference
//! mission-config shape: `link_layer`, `dsss`, `hopping`, `mission`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{CrcVariant, FecVariant};

/// `link_layer.crc_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrcType {
    /// No checksum.
    None,
    /// CRC-16-CCITT.
    Crc16,
    /// CRC-32.
    Crc32,
}

impl From<CrcType> for CrcVariant {
    fn from(value: CrcType) -> Self {
        match value {
            CrcType::None => CrcVariant::None,
            CrcType::Crc16 => CrcVariant::Crc16,
            CrcType::Crc32 => CrcVariant::Crc32,
        }
    }
}

/// `link_layer.fec_variant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FecVariantConfig {
    /// RS(15,11) over GF(16).
    Rs1511,
    /// RS(31,15) over GF(32).
    Rs3115,
}

/// The `link_layer` config block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkLayerConfig {
    /// Checksum variant.
    pub crc_type: CrcType,
    /// Whether forward error correction is applied.
    pub use_fec: bool,
    /// Which FEC code to use when `use_fec` is set.
    pub fec_variant: FecVariantConfig,
    /// Whether the frame body is matrix-interleaved.
    pub use_interleaving: bool,
    /// Interleaver row count.
    pub interleaver_rows: usize,
    /// Whether the frame body is LFSR-scrambled.
    pub use_whitening: bool,
    /// Scrambler tap mask (vestigial; see [`crate::scrambler`]).
    pub scrambler_mask: u8,
    /// Scrambler initial seed.
    pub scrambler_seed: u8,
    /// Whether Manchester line coding is applied.
    pub use_manchester: bool,
    /// Whether NRZ-I line coding is applied.
    pub use_nrzi: bool,
}

impl Default for LinkLayerConfig {
    fn default() -> Self {
        Self {
            crc_type: CrcType::Crc16,
            use_fec: true,
            fec_variant: FecVariantConfig::Rs1511,
            use_interleaving: true,
            interleaver_rows: 8,
            use_whitening: true,
            scrambler_mask: crate::scrambler::Scrambler::DEFAULT_MASK,
            scrambler_seed: crate::scrambler::Scrambler::DEFAULT_SEED,
            use_manchester: false,
            use_nrzi: true,
        }
    }
}

/// The `dsss` config block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsssConfig {
    /// Whether direct-sequence spreading is applied.
    pub enabled: bool,
    /// Spreading factor `S`, chips per user bit.
    pub spreading_factor: usize,
    /// The chipping code, `S` values of `+1`/`-1`.
    pub chipping_code: Vec<i8>,
}

impl Default for DsssConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spreading_factor: 31,
            chipping_code: Vec::new(),
        }
    }
}

/// `hopping.sync_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// 16-bit Fibonacci LFSR sequence.
    Lfsr,
    /// AES-256-ECB counter-mode keystream.
    AesCounter,
    /// Wall-clock-synchronized AES-256-ECB keystream.
    Tod,
}

/// The `hopping` config block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoppingConfig {
    /// Which scheduler variant to build.
    pub sync_mode: SyncMode,
    /// 32-byte AES-256 key, used by `AesCounter` and `Tod`.
    pub aes_key: Vec<u8>,
    /// Number of hop channels `N`.
    pub num_channels: u32,
    /// Channel spacing in Hz.
    pub channel_spacing: f64,
    /// Center frequency in Hz.
    pub center_frequency: f64,
    /// Dwell time in milliseconds (`Tod` variant).
    pub dwell_time_ms: u64,
    /// Lookahead in milliseconds, added before computing the epoch
    /// (`Tod` variant).
    pub lookahead_ms: u64,
    /// Initial LFSR seed or counter value.
    pub initial_seed: u64,
}

impl Default for HoppingConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Lfsr,
            aes_key: vec![0u8; 32],
            num_channels: 50,
            channel_spacing: 25_000.0,
            center_frequency: 433_000_000.0,
            dwell_time_ms: 100,
            lookahead_ms: 0,
            initial_seed: 1,
        }
    }
}

/// The `mission` config block.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MissionConfig {
    /// Mission identifier; containing the substring `"LINK-16"` selects
    /// RS(31,15) and the 256-byte interleaver block regardless of
    /// `link_layer.fec_variant`.
    pub id: String,
}

/// The full, validated link configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Frame/line-coding options.
    pub link_layer: LinkLayerConfig,
    /// Direct-sequence spreading options.
    pub dsss: DsssConfig,
    /// Frequency-hop scheduler options.
    pub hopping: HoppingConfig,
    /// Mission metadata.
    pub mission: MissionConfig,
}

impl LinkConfig {
    /// Parse a mission configuration from its JSON representation
    /// (`link_layer`/`dsss`/`hopping`/`mission` keys). Does not validate;
    /// call [`Self::validate`] before building a pipeline or scheduler.
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| Error::InvalidConfig {
            reason: format!("invalid JSON config: {e}"),
        })
    }

    /// Serialize this configuration to its JSON representation.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidConfig {
            reason: format!("could not serialize config: {e}"),
        })
    }

    /// Whether `mission.id` selects the "LINK-16"-class FEC/interleaver
    /// regime regardless of `link_layer.fec_variant`.
    pub fn is_link16(&self) -> bool {
        self.mission.id.contains("LINK-16")
    }

    /// The effective FEC variant this configuration selects.
    pub fn fec_variant(&self) -> FecVariant {
        if !self.link_layer.use_fec {
            return FecVariant::None;
        }
        if self.is_link16() || self.link_layer.fec_variant == FecVariantConfig::Rs3115 {
            FecVariant::Rs31x15
        } else {
            FecVariant::Rs15x11
        }
    }

    /// The effective CRC variant.
    pub fn crc_variant(&self) -> CrcVariant {
        self.link_layer.crc_type.into()
    }

    /// The interleaver block size in bytes, when interleaving is
    /// enabled: 256 for the "LINK-16"-class regime, 120 otherwise.
    pub fn interleaver_block_len(&self) -> usize {
        if self.is_link16() {
            256
        } else {
            120
        }
    }

    /// Validate the fatal conditions of this configuration. Must be
    /// called before constructing any pipeline or scheduler object.
    pub fn validate(&self) -> Result<()> {
        if self.link_layer.interleaver_rows == 0 {
            return Err(Error::InvalidConfig {
                reason: "interleaver_rows must be nonzero".into(),
            });
        }
        let block_len = self.interleaver_block_len();
        if self.link_layer.use_interleaving && block_len % self.link_layer.interleaver_rows != 0 {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "interleaver_rows ({}) must divide the interleaver block size ({block_len})",
                    self.link_layer.interleaver_rows
                ),
            });
        }
        if self.dsss.enabled {
            if self.dsss.chipping_code.len() != self.dsss.spreading_factor {
                return Err(Error::InvalidConfig {
                    reason: format!(
                        "chipping code length ({}) must equal spreading_factor ({})",
                        self.dsss.chipping_code.len(),
                        self.dsss.spreading_factor
                    ),
                });
            }
            if self.dsss.chipping_code.iter().any(|&c| c != 1 && c != -1) {
                return Err(Error::InvalidConfig {
                    reason: "chipping code must contain only +-1".into(),
                });
            }
        }
        if matches!(self.hopping.sync_mode, SyncMode::AesCounter | SyncMode::Tod)
            && self.hopping.aes_key.len() != 32
        {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "AES hop scheduler key must be 32 bytes, got {}",
                    self.hopping.aes_key.len()
                ),
            });
        }
        if self.hopping.num_channels == 0 {
            return Err(Error::InvalidConfig {
                reason: "num_channels must be nonzero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        LinkConfig::default().validate().unwrap();
    }

    #[test]
    fn link16_mission_selects_rs31x15_and_256_byte_block() {
        let mut cfg = LinkConfig::default();
        cfg.mission.id = "OP-LINK-16-ALPHA".into();
        assert_eq!(cfg.fec_variant(), FecVariant::Rs31x15);
        assert_eq!(cfg.interleaver_block_len(), 256);
    }

    #[test]
    fn non_link16_mission_uses_configured_fec_variant() {
        let mut cfg = LinkConfig::default();
        cfg.mission.id = "routine-ops".into();
        cfg.link_layer.fec_variant = FecVariantConfig::Rs1511;
        assert_eq!(cfg.fec_variant(), FecVariant::Rs15x11);
        assert_eq!(cfg.interleaver_block_len(), 120);
    }

    #[test]
    fn rejects_mismatched_chipping_code_length() {
        let mut cfg = LinkConfig::default();
        cfg.dsss.enabled = true;
        cfg.dsss.spreading_factor = 4;
        cfg.dsss.chipping_code = vec![1, -1, 1];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_short_aes_key() {
        let mut cfg = LinkConfig::default();
        cfg.hopping.sync_mode = SyncMode::AesCounter;
        cfg.hopping.aes_key = vec![0u8; 16];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_channels() {
        let mut cfg = LinkConfig::default();
        cfg.hopping.num_channels = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let mut cfg = LinkConfig::default();
        cfg.mission.id = "OP-LINK-16-ALPHA".into();
        cfg.dsss.enabled = true;
        cfg.dsss.spreading_factor = 3;
        cfg.dsss.chipping_code = vec![1, -1, 1];

        let json = cfg.to_json().unwrap();
        let parsed = LinkConfig::from_json(&json).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.mission.id, cfg.mission.id);
        assert_eq!(parsed.dsss.chipping_code, cfg.dsss.chipping_code);
        assert_eq!(parsed.fec_variant(), cfg.fec_variant());
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(LinkConfig::from_json("{ not json").is_err());
    }
}
