//! Block interleaver: write a fixed-size block row-major, read it back
//! column-major (and the inverse operation to undo it).
//!
//! Spreading a burst error across many FEC codewords this way is only
//! useful if both ends agree on the block's row/column geometry, so the
//! block size is always one of this link's two fixed FEC block sizes --
//! never derived from the payload length.

use crate::error::{Error, Result};

/// A rows-by-cols byte matrix interleaver.
#[derive(Debug, Clone, Copy)]
pub struct Interleaver {
    rows: usize,
    cols: usize,
}

impl Interleaver {
    /// Build an interleaver for a `rows * cols`-byte block.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Block size in bytes.
    pub fn block_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Interleave one block: `block` is written row-major into a
    /// `rows`x`cols` matrix and read back out column-major.
    pub fn interleave(&self, block: &[u8]) -> Result<Vec<u8>> {
        self.check_len(block.len())?;
        let mut out = vec![0u8; block.len()];
        for col in 0..self.cols {
            for row in 0..self.rows {
                out[col * self.rows + row] = block[row * self.cols + col];
            }
        }
        Ok(out)
    }

    /// Undo [`Self::interleave`]: read the column-major block back into
    /// row-major order.
    pub fn deinterleave(&self, block: &[u8]) -> Result<Vec<u8>> {
        self.check_len(block.len())?;
        let mut out = vec![0u8; block.len()];
        for col in 0..self.cols {
            for row in 0..self.rows {
                out[row * self.cols + col] = block[col * self.rows + row];
            }
        }
        Ok(out)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.block_len() {
            return Err(Error::Codec(format!(
                "interleaver block size mismatch: expected {}, got {len}",
                self.block_len()
            )));
        }
        Ok(())
    }
}

/// The fixed interleaver geometry for RS(15,11) frames: 120-byte blocks.
pub fn rs1511_interleaver() -> Interleaver {
    Interleaver::new(8, 15)
}

/// The fixed interleaver geometry for RS(31,15) frames: 256-byte blocks.
pub fn rs3115_interleaver() -> Interleaver {
    Interleaver::new(8, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let il = Interleaver::new(8, 15);
        let block: Vec<u8> = (0..120u16).map(|i| (i % 256) as u8).collect();
        let interleaved = il.interleave(&block).unwrap();
        assert_ne!(interleaved, block);
        let restored = il.deinterleave(&interleaved).unwrap();
        assert_eq!(restored, block);
    }

    #[test]
    fn rejects_wrong_length() {
        let il = Interleaver::new(8, 15);
        assert!(il.interleave(&[0u8; 10]).is_err());
        assert!(il.deinterleave(&[0u8; 121]).is_err());
    }

    #[test]
    fn rs3115_block_is_256_bytes() {
        let il = rs3115_interleaver();
        assert_eq!(il.block_len(), 256);
    }

    #[test]
    fn rs1511_block_is_120_bytes() {
        let il = rs1511_interleaver();
        assert_eq!(il.block_len(), 120);
    }

    #[test]
    fn scatters_a_burst_error_across_rows() {
        let il = Interleaver::new(8, 15);
        let mut block = vec![0u8; 120];
        // A 4-byte burst, contiguous in transmission order.
        for b in block.iter_mut().take(4) {
            *b = 0xFF;
        }
        let interleaved = il.interleave(&block).unwrap();
        let restored = il.deinterleave(&interleaved).unwrap();
        assert_eq!(restored, block);
    }
}
