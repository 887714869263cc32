//! Bit-level helpers for packing entropy into mnemonic words.
//!
//! The string forms (`'0'`/`'1'` characters, most significant bit first) are
//! kept for diagnostics; the codec itself works on byte buffers.

/// Reads `length` bits starting at `start_bit` and returns them right-aligned.
///
/// # Panics
///
/// Panics if `length` is not in `1..=64` or the range runs past the end of
/// `buffer`.
pub fn bits_in_range(buffer: &[u8], start_bit: usize, length: usize) -> u64 {
    assert!(
        (1..=64).contains(&length),
        "bit range length must be between 1 and 64, got {length}"
    );
    assert!(
        start_bit + length <= buffer.len() * 8,
        "bit range {start_bit}..{} exceeds buffer of {} bits",
        start_bit + length,
        buffer.len() * 8
    );

    // At most 9 bytes cover an unaligned 64-bit range
    let first = start_bit / 8;
    let last = (start_bit + length + 7) / 8;
    let window = buffer[first..last]
        .iter()
        .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));

    let trailing = last * 8 - (start_bit + length);
    let mask = (1u128 << length) - 1;
    ((window >> trailing) & mask) as u64
}

/// Renders every byte as eight `'0'`/`'1'` characters, most significant bit first.
pub fn bytes_to_bit_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:08b}", byte)).collect()
}

/// Parses a bit string back into bytes, left-padding with zeros to a
/// multiple of 8 bits. Returns `None` on any character other than `'0'` or `'1'`.
pub fn bit_string_to_bytes(bits: &str) -> Option<Vec<u8>> {
    let padded_len = (bits.len() + 7) / 8 * 8;
    let padded = left_pad(bits, padded_len);

    padded
        .as_bytes()
        .chunks(8)
        .map(|chunk| {
            chunk.iter().try_fold(0u8, |acc, bit| match bit {
                b'0' => Some(acc << 1),
                b'1' => Some((acc << 1) | 1),
                _ => None,
            })
        })
        .collect()
}

/// Left-pads `bits` with `'0'` to `target_len`. A longer input keeps only
/// its last `target_len` characters.
pub fn left_pad(bits: &str, target_len: usize) -> String {
    let len = bits.chars().count();
    if len < target_len {
        let mut padded = "0".repeat(target_len - len);
        padded.push_str(bits);
        padded
    } else {
        bits.chars().skip(len - target_len).collect()
    }
}

/// Appends fixed-width values into a big-endian bit buffer.
#[derive(Debug, Default, Clone)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn with_capacity(bits: usize) -> Self {
        BitWriter {
            bytes: Vec::with_capacity((bits + 7) / 8),
            len: 0,
        }
    }

    /// Appends the low `width` bits of `value`, most significant first.
    pub fn push(&mut self, value: u64, width: usize) {
        debug_assert!(width <= 64);
        for shift in (0..width).rev() {
            let bit = ((value >> shift) & 1) as u8;
            if self.len % 8 == 0 {
                self.bytes.push(0);
            }
            if bit == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.len % 8);
            }
            self.len += 1;
        }
    }

    pub fn bit_len(&self) -> usize {
        self.len
    }

    /// The written bits; a partial last byte is zero-filled on the right.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
