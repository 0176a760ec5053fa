//! Content hashes in the formats the drive API reports them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

/// Uppercase hex SHA1 of `data`, as reported in `file.hashes.sha1Hash`.
pub fn sha1_hash(data: &[u8]) -> String {
    hex::encode_upper(Sha1::digest(data))
}

/// Base64 QuickXorHash of `data`, as reported in `file.hashes.quickXorHash`.
pub fn quick_xor_hash(data: &[u8]) -> String {
    let mut hasher = QuickXorHasher::default();
    hasher.update(data);
    hasher.finalize()
}

const WIDTH_IN_BITS: usize = 160;
const WIDTH_IN_BYTES: usize = WIDTH_IN_BITS / 8;
const SHIFT: usize = 11;

/// Incremental QuickXorHash.
///
/// Each input byte is XORed into a circular 160-bit register at a bit offset that advances
/// by 11 per byte. The total input length, little endian, is XORed into the last 8 bytes of
/// the register at the end.
#[derive(Debug, Clone)]
pub struct QuickXorHasher {
    register: [u8; WIDTH_IN_BYTES],
    shift: usize,
    length: u64,
}

impl Default for QuickXorHasher {
    fn default() -> Self {
        Self {
            register: [0; WIDTH_IN_BYTES],
            shift: 0,
            length: 0,
        }
    }
}

impl QuickXorHasher {
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let index = self.shift / 8;
            let spread = (byte as u16) << (self.shift % 8);
            self.register[index] ^= spread as u8;
            self.register[(index + 1) % WIDTH_IN_BYTES] ^= (spread >> 8) as u8;
            self.shift = (self.shift + SHIFT) % WIDTH_IN_BITS;
        }
        self.length += data.len() as u64;
    }

    pub fn finalize(self) -> String {
        let mut out = self.register;
        for (dst, len_byte) in out[WIDTH_IN_BYTES - 8..].iter_mut().zip(self.length.to_le_bytes()) {
            *dst ^= len_byte;
        }
        STANDARD.encode(out)
    }
}
