//! PkgLength encoding.
//!
//! A PkgLength is 1 to 4 bytes. Bits 7:6 of the lead byte give the number of
//! bytes that follow. With no follow bytes, bits 5:0 are the whole length;
//! otherwise bits 3:0 are the low nibble and each follow byte adds 8 more
//! bits. The encoded value counts the PkgLength bytes themselves.

use crate::AmlError;

/// Largest value a PkgLength can carry.
pub const MAX_PKG_LENGTH: usize = 0x0FFF_FFFF;

/// Decodes the PkgLength at the start of `data`.
///
/// Returns `(encoded_size, value)`: the number of bytes the PkgLength
/// occupies and the total package length it encodes.
///
/// # Errors
///
/// Returns [`AmlError::UnexpectedEnd`] if `data` is truncated, or
/// [`AmlError::InvalidPkgLength`] if a multi-byte lead has bits 5:4 set or the
/// value is smaller than the field itself.
pub fn decode(data: &[u8]) -> Result<(usize, usize), AmlError> {
    let lead = *data.first().ok_or(AmlError::UnexpectedEnd)?;
    let follow = usize::from(lead >> 6);

    if follow == 0 {
        let len = usize::from(lead & 0x3F);
        if len == 0 {
            return Err(AmlError::InvalidPkgLength);
        }
        return Ok((1, len));
    }

    if lead & 0x30 != 0 {
        return Err(AmlError::InvalidPkgLength);
    }

    let mut length = usize::from(lead & 0x0F);
    for i in 0..follow {
        let b = *data.get(1 + i).ok_or(AmlError::UnexpectedEnd)?;
        length |= usize::from(b) << (4 + i * 8);
    }

    if length < 1 + follow {
        return Err(AmlError::InvalidPkgLength);
    }
    Ok((1 + follow, length))
}

/// Number of bytes needed to encode a PkgLength for a package whose content
/// (everything after the PkgLength) is `body` bytes.
///
/// # Errors
///
/// Returns [`AmlError::InvalidPkgLength`] if the package is too large.
pub fn encoded_size(body: usize) -> Result<usize, AmlError> {
    if body + 1 <= 0x3F {
        Ok(1)
    } else if body + 2 <= 0xFFF {
        Ok(2)
    } else if body + 3 <= 0xF_FFFF {
        Ok(3)
    } else if body + 4 <= MAX_PKG_LENGTH {
        Ok(4)
    } else {
        Err(AmlError::InvalidPkgLength)
    }
}

/// Computes the PkgLength value for a package of `body` content bytes.
///
/// # Errors
///
/// Returns [`AmlError::InvalidPkgLength`] if the package is too large.
pub fn value_for_body(body: usize) -> Result<usize, AmlError> {
    Ok(body + encoded_size(body)?)
}

/// Encodes `value` (which includes the PkgLength bytes) into `out`, using
/// exactly `size` bytes.
///
/// Returns the encoded bytes as a fixed array and the count used.
#[must_use]
pub fn encode(value: usize, size: usize) -> ([u8; 4], usize) {
    let mut out = [0u8; 4];
    if size == 1 {
        out[0] = (value & 0x3F) as u8;
        return (out, 1);
    }
    out[0] = (((size - 1) as u8) << 6) | (value & 0x0F) as u8;
    for i in 1..size {
        out[i] = (value >> (4 + (i - 1) * 8)) as u8;
    }
    (out, size)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;

    #[test]
    fn single_byte() {
        assert_eq!(decode(&[0x30]).unwrap(), (1, 0x30));
        assert_eq!(encoded_size(0x3E).unwrap(), 1);
        assert_eq!(encode(0x3F, 1), ([0x3F, 0, 0, 0], 1));
    }

    #[test]
    fn two_bytes() {
        // 0x3F content bytes no longer fit a single-byte PkgLength.
        assert_eq!(encoded_size(0x3F).unwrap(), 2);
        let value = value_for_body(0x3F).unwrap();
        assert_eq!(value, 0x41);
        let (bytes, n) = encode(value, 2);
        assert_eq!(&bytes[..n], &[0x41, 0x04]);
        assert_eq!(decode(&bytes[..n]).unwrap(), (2, 0x41));
    }

    #[test]
    fn four_bytes() {
        let value = value_for_body(0x10_0000).unwrap();
        let (bytes, n) = encode(value, 4);
        assert_eq!(n, 4);
        assert_eq!(decode(&bytes).unwrap(), (4, value));
    }

    #[test]
    fn rejects_bad_encodings() {
        assert_eq!(decode(&[]), Err(AmlError::UnexpectedEnd));
        assert_eq!(decode(&[0x41]), Err(AmlError::UnexpectedEnd));
        assert_eq!(decode(&[0x70, 0x00]), Err(AmlError::InvalidPkgLength));
        assert_eq!(decode(&[0x00]), Err(AmlError::InvalidPkgLength));
        assert_eq!(encoded_size(MAX_PKG_LENGTH), Err(AmlError::InvalidPkgLength));
    }
}
