//! Bit-level access to RBSP data.

use crate::error::{MediaError, Result};

/// MSB-first bit reader with Exp-Golomb support.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current position in bits.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.position)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        if self.remaining_bits() == 0 {
            return Err(MediaError::Bitstream("unexpected end of data".to_string()));
        }
        let byte = self.data[self.position / 8];
        let bit = (byte >> (7 - (self.position % 8))) & 1;
        self.position += 1;
        Ok(bit != 0)
    }

    pub fn read_flag(&mut self) -> Result<bool> {
        self.read_bit()
    }

    /// Reads `n` (at most 32) bits as an unsigned value.
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        if n > 32 {
            return Err(MediaError::Bitstream(format!(
                "cannot read {} bits at once",
                n
            )));
        }
        if self.remaining_bits() < n as usize {
            return Err(MediaError::Bitstream("unexpected end of data".to_string()));
        }
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()? as u32;
        }
        Ok(value)
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        if self.remaining_bits() < n {
            return Err(MediaError::Bitstream("unexpected end of data".to_string()));
        }
        self.position += n;
        Ok(())
    }

    /// Unsigned Exp-Golomb, ue(v).
    pub fn read_ue(&mut self) -> Result<u32> {
        let mut leading_zeros = 0u8;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(MediaError::Bitstream(
                    "exp-Golomb code longer than 32 bits".to_string(),
                ));
            }
        }
        if leading_zeros == 0 {
            return Ok(0);
        }
        let suffix = self.read_bits(leading_zeros)?;
        Ok(((1u64 << leading_zeros) - 1 + suffix as u64) as u32)
    }

    /// Signed Exp-Golomb, se(v).
    pub fn read_se(&mut self) -> Result<i32> {
        let code = self.read_ue()? as i64;
        let magnitude = i32::try_from((code + 1) / 2).map_err(|_| {
            MediaError::Bitstream(format!("se(v) code {} exceeds 32 bits", code))
        })?;
        Ok(if code % 2 == 1 { magnitude } else { -magnitude })
    }
}

/// MSB-first bit writer for building test bitstreams.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct BitWriter {
    data: Vec<u8>,
    bit_count: usize,
}

#[cfg(test)]
impl BitWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn write_bit(&mut self, bit: bool) {
        if self.bit_count % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 1 << (7 - (self.bit_count % 8));
        }
        self.bit_count += 1;
    }

    /// Writes the low `n` bits of `value`, most significant first.
    pub(crate) fn write_bits(&mut self, value: u32, n: u8) {
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    pub(crate) fn write_ue(&mut self, value: u32) {
        let code = value as u64 + 1;
        let bits = 64 - code.leading_zeros() as u8;
        for _ in 0..bits - 1 {
            self.write_bit(false);
        }
        for i in (0..bits).rev() {
            self.write_bit((code >> i) & 1 == 1);
        }
    }

    pub(crate) fn write_se(&mut self, value: i32) {
        let code = if value > 0 {
            (value as u32) * 2 - 1
        } else {
            value.unsigned_abs() * 2
        };
        self.write_ue(code);
    }

    /// Appends the RBSP stop bit and pads to a byte boundary.
    pub(crate) fn write_trailing_bits(&mut self) {
        self.write_bit(true);
        while self.bit_count % 8 != 0 {
            self.write_bit(false);
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
