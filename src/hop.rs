//! Frequency-hop scheduling: three interchangeable ways to derive a
//! deterministic sequence of channel indices, all exposed through the
//! same `trigger`/`reseed` surface.

use std::time::{SystemTime, UNIX_EPOCH};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256;

use crate::error::{Error, Result};

/// A hop descriptor: channel count, center frequency, and spacing, used
/// to turn a channel index into a carrier frequency.
#[derive(Debug, Clone, Copy)]
pub struct HopDescriptor {
    /// Number of channels `N`.
    pub num_channels: u32,
    /// Center frequency in Hz.
    pub center_frequency: f64,
    /// Channel spacing in Hz.
    pub channel_spacing: f64,
}

impl HopDescriptor {
    /// Carrier frequency for channel index `i`, `i ∈ [0, N)`.
    pub fn carrier(&self, index: u32) -> f64 {
        let half = (self.num_channels / 2) as i64;
        self.center_frequency + ((index as i64 - half) as f64) * self.channel_spacing
    }
}

fn aes256_ecb_first_u32(key: &[u8], block: [u8; 16]) -> Result<u32> {
    let cipher = Aes256::new_from_slice(key).map_err(|e| Error::SchedulerKey {
        reason: e.to_string(),
    })?;
    let mut block = GenericArray::clone_from_slice(&block);
    cipher.encrypt_block(&mut block);
    Ok(u32::from_be_bytes([block[0], block[1], block[2], block[3]]))
}

/// 16-bit Fibonacci LFSR hop sequence: taps at bits 15, 13, 12, 10.
#[derive(Debug, Clone, Copy)]
pub struct LfsrScheduler {
    descriptor: HopDescriptor,
    state: u16,
}

impl LfsrScheduler {
    /// Build a scheduler with the given hop descriptor and initial seed.
    pub fn new(descriptor: HopDescriptor, seed: u16) -> Self {
        Self {
            descriptor,
            state: seed,
        }
    }

    /// Advance the LFSR one step and return the channel carrier for the
    /// new state.
    pub fn trigger(&mut self) -> f64 {
        let bit15 = (self.state >> 15) & 1;
        let bit13 = (self.state >> 13) & 1;
        let bit12 = (self.state >> 12) & 1;
        let bit10 = (self.state >> 10) & 1;
        let feedback = bit15 ^ bit13 ^ bit12 ^ bit10;
        self.state = (self.state << 1) | feedback;
        self.descriptor.carrier(self.channel_index())
    }

    /// Current channel index, `state mod N`.
    pub fn channel_index(&self) -> u32 {
        (self.state as u32) % self.descriptor.num_channels
    }

    /// Reset the LFSR state to `seed`.
    pub fn reseed(&mut self, seed: u16) {
        self.state = seed;
    }
}

fn counter_block(counter: u64) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[8..].copy_from_slice(&counter.to_be_bytes());
    block
}

/// AES-256-ECB counter-mode hop sequence: a 64-bit counter, encrypted
/// each trigger under a fixed key, with the first 4 ciphertext bytes
/// read as a big-endian `u32` mapped modulo `N`.
#[derive(Debug, Clone)]
pub struct CounterScheduler {
    descriptor: HopDescriptor,
    key: Vec<u8>,
    counter: u64,
}

impl CounterScheduler {
    /// Build a scheduler with a 32-byte AES-256 key and an initial
    /// counter value.
    pub fn new(descriptor: HopDescriptor, key: Vec<u8>, initial_counter: u64) -> Result<Self> {
        if key.len() != 32 {
            return Err(Error::SchedulerKey {
                reason: format!("AES-256 key must be 32 bytes, got {}", key.len()),
            });
        }
        Ok(Self {
            descriptor,
            key,
            counter: initial_counter,
        })
    }

    /// Encrypt the current counter, advance it, and return the
    /// resulting channel carrier.
    pub fn trigger(&mut self) -> Result<f64> {
        let channel = self.channel_for(self.counter)?;
        self.counter = self.counter.wrapping_add(1);
        Ok(self.descriptor.carrier(channel))
    }

    /// Reset the counter to `value`.
    pub fn reseed(&mut self, value: u64) {
        self.counter = value;
    }

    fn channel_for(&self, counter: u64) -> Result<u32> {
        let block = counter_block(counter);
        let value = aes256_ecb_first_u32(&self.key, block)?;
        Ok(value % self.descriptor.num_channels)
    }
}

/// Wall-clock-synchronized AES-256-ECB hop sequence: the channel is
/// derived from `floor((now + lookahead) / dwell)` rather than a
/// monotonic counter, so two nodes with synchronized clocks land on the
/// same channel without exchanging any state.
#[derive(Debug, Clone)]
pub struct TodScheduler {
    descriptor: HopDescriptor,
    key: Vec<u8>,
    dwell: std::time::Duration,
    lookahead: std::time::Duration,
}

impl TodScheduler {
    /// Build a scheduler with a 32-byte AES-256 key, dwell period, and
    /// lookahead offset.
    pub fn new(
        descriptor: HopDescriptor,
        key: Vec<u8>,
        dwell: std::time::Duration,
        lookahead: std::time::Duration,
    ) -> Result<Self> {
        if key.len() != 32 {
            return Err(Error::SchedulerKey {
                reason: format!("AES-256 key must be 32 bytes, got {}", key.len()),
            });
        }
        Ok(Self {
            descriptor,
            key,
            dwell,
            lookahead,
        })
    }

    /// Compute the channel carrier for the current wall-clock dwell
    /// window. Does not mutate any counter.
    pub fn trigger(&self) -> Result<f64> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.trigger_at(now)
    }

    /// Like [`Self::trigger`], but for an explicit wall-clock time
    /// (exposed so tests can be deterministic).
    pub fn trigger_at(&self, now: std::time::Duration) -> Result<f64> {
        let epoch = (now + self.lookahead).as_secs() / self.dwell.as_secs().max(1);
        let block = counter_block(epoch);
        let value = aes256_ecb_first_u32(&self.key, block)?;
        let channel = value % self.descriptor.num_channels;
        Ok(self.descriptor.carrier(channel))
    }
}
