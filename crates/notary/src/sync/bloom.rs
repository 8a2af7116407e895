//! Bloom filter over grant fingerprints.
//!
//! Wire format: `k` as u32 BE, `m` as u64 BE, then the `ceil(m / 8)` byte
//! bitset. Empty bytes decode to an empty filter that contains nothing.

use sha2::{Digest, Sha256};

use crate::error::{NotaryError, NotaryResult};

/// Upper bound on hash functions accepted off the wire.
const MAX_HASHES: u32 = 64;

/// Upper bound on filter size in bits.
const MAX_BITS: u64 = 1 << 31;

/// Header length: `k` then `m`.
const HEADER_LEN: usize = 12;

/// A fixed-size Bloom filter using double hashing over SHA-256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    hashes: u32,
    bit_count: u64,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// A filter sized for `expected_items` at `false_positive_rate`.
    ///
    /// Uses `m = ceil(-n ln p / ln2^2)` bits and `k = round(m / n ln 2)`
    /// hashes, with at least one hash.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn with_rate(expected_items: usize, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(f64::MIN_POSITIVE, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let m = (-(n * p.ln()) / (ln2 * ln2)).ceil().clamp(8.0, MAX_BITS as f64);
        let k = (m / n * ln2).round().clamp(1.0, f64::from(MAX_HASHES));
        Self::with_dimensions(k as u32, m as u64)
    }

    fn with_dimensions(hashes: u32, bit_count: u64) -> Self {
        let len = usize::try_from(bit_count.div_ceil(8)).unwrap_or(0);
        Self {
            hashes,
            bit_count,
            bits: vec![0; len],
        }
    }

    /// A filter that contains nothing and encodes to no bytes.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_dimensions(0, 0)
    }

    /// Whether this filter has no bits at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bit_count == 0
    }

    /// Number of hash functions.
    #[must_use]
    pub fn hashes(&self) -> u32 {
        self.hashes
    }

    /// Number of bits.
    #[must_use]
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Add `item`.
    pub fn insert(&mut self, item: &[u8]) {
        for index in self.indexes(item) {
            if let Some((byte, mask)) = Self::locate(index) {
                if let Some(slot) = self.bits.get_mut(byte) {
                    *slot |= mask;
                }
            }
        }
    }

    /// Whether `item` may have been added. Never false for an added item.
    #[must_use]
    pub fn contains(&self, item: &[u8]) -> bool {
        if self.is_empty() {
            return false;
        }
        self.indexes(item).all(|index| {
            Self::locate(index)
                .and_then(|(byte, mask)| self.bits.get(byte).map(|b| b & mask != 0))
                .unwrap_or(false)
        })
    }

    /// Serialize for a `SyncRequest`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(HEADER_LEN.saturating_add(self.bits.len()));
        out.extend_from_slice(&self.hashes.to_be_bytes());
        out.extend_from_slice(&self.bit_count.to_be_bytes());
        out.extend_from_slice(&self.bits);
        out
    }

    /// Inverse of [`BloomFilter::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`NotaryError::InvalidBloom`] if the header is truncated,
    /// the dimensions are out of range or the bitset length is wrong.
    pub fn from_bytes(bytes: &[u8]) -> NotaryResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::empty());
        }
        if bytes.len() < HEADER_LEN {
            return Err(NotaryError::InvalidBloom(format!(
                "header truncated at {} bytes",
                bytes.len()
            )));
        }
        let (header, bits) = bytes.split_at(HEADER_LEN);
        let (k, m) = header.split_at(4);

        let mut k_bytes = [0u8; 4];
        k_bytes.copy_from_slice(k);
        let hashes = u32::from_be_bytes(k_bytes);
        let mut m_bytes = [0u8; 8];
        m_bytes.copy_from_slice(m);
        let bit_count = u64::from_be_bytes(m_bytes);

        if hashes == 0 || hashes > MAX_HASHES {
            return Err(NotaryError::InvalidBloom(format!("{hashes} hash functions")));
        }
        if bit_count == 0 || bit_count > MAX_BITS {
            return Err(NotaryError::InvalidBloom(format!("{bit_count} bits")));
        }
        let expected = usize::try_from(bit_count.div_ceil(8))
            .map_err(|_| NotaryError::InvalidBloom(format!("{bit_count} bits")))?;
        if bits.len() != expected {
            return Err(NotaryError::InvalidBloom(format!(
                "expected {expected} bitset bytes, got {}",
                bits.len()
            )));
        }

        Ok(Self {
            hashes,
            bit_count,
            bits: bits.to_vec(),
        })
    }

    fn indexes(&self, item: &[u8]) -> impl Iterator<Item = u64> + use<> {
        let digest = Sha256::digest(item);
        let mut first = [0u8; 8];
        first.copy_from_slice(&digest[..8]);
        let mut second = [0u8; 8];
        second.copy_from_slice(&digest[8..16]);

        let h1 = u64::from_le_bytes(first);
        let h2 = u64::from_le_bytes(second) | 1;
        let m = self.bit_count;
        (0..u64::from(self.hashes))
            .filter_map(move |i| h1.wrapping_add(i.wrapping_mul(h2)).checked_rem(m))
    }

    fn locate(index: u64) -> Option<(usize, u8)> {
        let byte = usize::try_from(index / 8).ok()?;
        #[allow(clippy::cast_possible_truncation)]
        let bit = (index % 8) as u32;
        Some((byte, 1u8.wrapping_shl(bit)))
    }
}
