//! PER decoder for primitive ASN.1 types

use crate::bitbuffer::BitBuffer;
use crate::per::types::{compose_real, SpecialReal};
use crate::per::width::{bit_field_size, bits_unsigned, octets_unsigned};
use crate::per::{FRAGMENT_SIZE, MAX_CONSTRAINED_LENGTH};
use per_core::datatypes::{BitString, ObjectIdentifier};
use per_core::error::{PerError, PerResult};

/// PER decoder holding the bit codec and the variant flag.
///
/// Mirrors [`PerEncoder`](crate::per::PerEncoder): construct it over the
/// encoded octets with the same variant flag, then call the decode
/// operation matching each encoded value in order, passing the bounds
/// the encoder used.
pub struct PerDecoder {
    codec: BitBuffer,
    aligned: bool,
}

impl PerDecoder {
    /// Create a decoder over `data`. `aligned` selects APER over UPER.
    pub fn new(data: Vec<u8>, aligned: bool) -> Self {
        Self {
            codec: BitBuffer::reader(data),
            aligned,
        }
    }

    /// Whether this decoder consumes the ALIGNED variant.
    pub fn aligned(&self) -> bool {
        self.aligned
    }

    /// Bits consumed so far, skipped alignment bits included.
    pub fn num_read(&self) -> u64 {
        self.codec.num_read()
    }

    /// Skip to the next octet boundary.
    pub fn advance(&mut self) {
        self.codec.advance();
    }

    /// Decode a constrained whole number (X.691 11.5).
    pub fn decode_constrained_whole_number(&mut self, lb: i64, ub: i64) -> PerResult<i64> {
        if ub < lb {
            return Err(PerError::BadRequest(format!(
                "invalid bounds: lb {} above ub {}",
                lb, ub
            )));
        }
        let range = ub as i128 - lb as i128 + 1;
        if range == 1 {
            return Ok(lb);
        }

        let value = if !self.aligned {
            let bits = bits_unsigned((range - 1) as u64);
            self.codec.read(bits as u8)?
        } else if range <= 0xFF {
            self.codec.read(bit_field_size(range as u64))?
        } else if range == 0x100 {
            self.codec.advance();
            self.codec.read(8)?
        } else if range <= 0x1_0000 {
            self.codec.advance();
            self.codec.read(16)?
        } else {
            let octets_range = octets_unsigned((ub as i128 - lb as i128) as u64) as u64;
            let (octets, _) = self.decode_length_determinant(Some(1), Some(octets_range))?;
            if octets == 0 || octets > 8 {
                return Err(PerError::InvalidEncoding(format!(
                    "constrained whole number with a {}-octet value",
                    octets
                )));
            }
            self.codec.advance();
            self.codec.read((octets * 8) as u8)?
        };

        if value as i128 >= range {
            return Err(PerError::InvalidEncoding(format!(
                "offset {} outside range {}",
                value, range
            )));
        }
        Ok((lb as i128 + value as i128) as i64)
    }

    /// Decode a semi-constrained whole number (X.691 11.7).
    pub fn decode_semi_constrained_whole_number(&mut self, lb: i64) -> PerResult<i64> {
        if self.aligned {
            self.codec.advance();
        }
        let (octets, _) = self.decode_length_determinant(None, None)?;
        if octets == 0 || octets > 8 {
            return Err(PerError::InvalidEncoding(format!(
                "semi-constrained whole number with a {}-octet value",
                octets
            )));
        }
        let value = self.codec.read((octets * 8) as u8)?;
        i64::try_from(lb as i128 + value as i128).map_err(|_| {
            PerError::InvalidEncoding(format!(
                "offset {} from lower bound {} overflows 64 bits",
                value, lb
            ))
        })
    }

    /// Decode an unconstrained whole number (X.691 11.8). Bytes are read
    /// as unsigned and sign-extended when the leading bit of the chosen
    /// width is set.
    pub fn decode_unconstrained_whole_number(&mut self) -> PerResult<i64> {
        if self.aligned {
            self.codec.advance();
        }
        let (octets, _) = self.decode_length_determinant(None, None)?;
        if octets == 0 || octets > 8 {
            return Err(PerError::InvalidEncoding(format!(
                "unconstrained whole number with a {}-octet value",
                octets
            )));
        }
        let bits = octets as u32 * 8;
        let mut value = self.codec.read(bits as u8)?;
        if bits < 64 && value & (1 << (bits - 1)) != 0 {
            value |= u64::MAX << bits;
        }
        Ok(value as i64)
    }

    /// Decode a normally small non-negative whole number (X.691 11.6).
    pub fn decode_normally_small_whole_number(&mut self) -> PerResult<u64> {
        if self.codec.read(1)? == 0 {
            self.codec.read(6)
        } else {
            let value = self.decode_semi_constrained_whole_number(0)?;
            Ok(value as u64)
        }
    }

    /// Decode a length determinant (X.691 11.9), returning the unit
    /// count and whether further fragments follow it.
    pub fn decode_length_determinant(
        &mut self,
        lb: Option<u64>,
        ub: Option<u64>,
    ) -> PerResult<(u64, bool)> {
        if let (Some(lb), Some(ub)) = (lb, ub) {
            if ub < MAX_CONSTRAINED_LENGTH {
                let n = self.decode_constrained_whole_number(lb as i64, ub as i64)?;
                return Ok((n as u64, false));
            }
        }
        self.decode_unconstrained_length()
    }

    /// Decode an unconstrained length (X.691 11.9.3.5 to 11.9.3.8),
    /// dispatching on the top two bits of the leading octet.
    pub fn decode_unconstrained_length(&mut self) -> PerResult<(u64, bool)> {
        if self.aligned {
            self.codec.advance();
        }
        let first = self.codec.read(8)?;
        // Single octet 0xxxxxxx.
        if first & 0x80 == 0 {
            return Ok((first, false));
        }
        // Two octets 10xxxxxx xxxxxxxx.
        if first & 0x40 == 0 {
            let second = self.codec.read(8)?;
            return Ok((((first & 0x3F) << 8) | second, false));
        }
        // Fragment marker 11kkkkkk.
        let k = first & 0x3F;
        if !(1..=4).contains(&k) {
            return Err(PerError::InvalidEncoding(format!(
                "fragment multiplier {} outside 1..=4",
                k
            )));
        }
        Ok((k * FRAGMENT_SIZE, true))
    }

    /// Decode a normally small length (X.691 11.9.3.4).
    pub fn decode_normally_small_length(&mut self) -> PerResult<(u64, bool)> {
        if self.codec.read(1)? == 0 {
            Ok((self.codec.read(6)? + 1, false))
        } else {
            self.decode_unconstrained_length()
        }
    }

    /// Decode a BOOLEAN (X.691 clause 12).
    pub fn decode_boolean(&mut self) -> PerResult<bool> {
        Ok(self.codec.read(1)? == 1)
    }

    /// Decode an INTEGER given the bounds used to encode it (X.691
    /// clause 13).
    pub fn decode_integer(
        &mut self,
        lb: Option<i64>,
        ub: Option<i64>,
        extensible: bool,
    ) -> PerResult<i64> {
        if extensible && self.codec.read(1)? == 1 {
            return self.decode_unconstrained_whole_number();
        }
        match (lb, ub) {
            (Some(lb), Some(ub)) if lb == ub => Ok(lb),
            (Some(lb), Some(ub)) => self.decode_constrained_whole_number(lb, ub),
            (Some(lb), None) => self.decode_semi_constrained_whole_number(lb),
            _ => self.decode_unconstrained_whole_number(),
        }
    }

    /// Decode an ENUMERATED index out of `count` root enumerations
    /// (X.691 clause 14).
    pub fn decode_enumerated(&mut self, count: u64, extensible: bool) -> PerResult<u64> {
        if count == 0 {
            return Err(PerError::BadRequest(
                "enumerated type needs at least one enumeration".to_string(),
            ));
        }
        if extensible && self.codec.read(1)? == 1 {
            let index = self.decode_normally_small_whole_number()?;
            return count.checked_add(index).ok_or_else(|| {
                PerError::InvalidEncoding(format!(
                    "extension index {} overflows past root of {} values",
                    index, count
                ))
            });
        }
        let value = self.decode_constrained_whole_number(0, (count - 1) as i64)?;
        Ok(value as u64)
    }

    /// Decode a REAL (X.691 clause 15; contents octets per X.690 8.5,
    /// base 2 only).
    ///
    /// A length-prefixed exponent whose declared count overruns the
    /// contents decodes as zero; the reference encoders never emit it,
    /// and accepting it keeps the decoder total over such streams.
    pub fn decode_real(&mut self) -> PerResult<f64> {
        let contents = self.decode_octet_string(None, None, false)?;
        if contents.is_empty() {
            return Ok(0.0);
        }
        let first = contents[0];

        // X.690 8.5.9: special values and minus zero.
        if first & 0xC0 == 0x40 {
            if contents.len() != 1 {
                return Err(PerError::InvalidEncoding(format!(
                    "special REAL with {} contents octets",
                    contents.len()
                )));
            }
            return Ok(SpecialReal::from_u8(first)?.value());
        }
        if first & 0x80 == 0 {
            return Err(PerError::InvalidEncoding(
                "decimal REAL encoding is not supported".to_string(),
            ));
        }

        let negative = first & 0x40 != 0;
        let base = (first >> 4) & 0x03;
        if base != 0 {
            return Err(PerError::InvalidEncoding(format!(
                "unsupported REAL base code {}",
                base
            )));
        }
        let scaling = (first >> 2) & 0x03;

        let mut rest = &contents[1..];
        let exp_octets = match first & 0x03 {
            0 => 1,
            1 => 2,
            2 => 3,
            _ => {
                let Some((&declared, tail)) = rest.split_first() else {
                    return Err(PerError::InvalidEncoding(
                        "missing REAL exponent count octet".to_string(),
                    ));
                };
                rest = tail;
                declared as usize
            }
        };
        if exp_octets > rest.len() {
            return Ok(0.0);
        }
        if exp_octets == 0 || exp_octets > 8 {
            return Err(PerError::InvalidEncoding(format!(
                "REAL exponent of {} octets",
                exp_octets
            )));
        }

        let (exp_bytes, man_bytes) = rest.split_at(exp_octets);
        let mut exponent = 0i64;
        for &byte in exp_bytes {
            exponent = (exponent << 8) | byte as i64;
        }
        let exp_bits = exp_octets as u32 * 8;
        if exp_bits < 64 && exponent & (1 << (exp_bits - 1)) != 0 {
            exponent |= !0i64 << exp_bits;
        }

        if man_bytes.is_empty() || man_bytes.len() > 8 {
            return Err(PerError::InvalidEncoding(format!(
                "REAL mantissa of {} octets",
                man_bytes.len()
            )));
        }
        let mut mantissa = 0u64;
        for &byte in man_bytes {
            mantissa = (mantissa << 8) | byte as u64;
        }
        if mantissa > i64::MAX as u64 {
            return Err(PerError::InvalidEncoding(
                "REAL mantissa exceeds 63 bits".to_string(),
            ));
        }

        let exponent = (exponent + scaling as i64).clamp(i32::MIN as i64, i32::MAX as i64);
        let magnitude = compose_real(mantissa as i64, exponent as i32);
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Read `count` bits into octets, MSB-packed, the tail partial
    /// byte's valid bits in its most significant positions.
    fn read_bit_field(&mut self, count: u64) -> PerResult<Vec<u8>> {
        let nbytes = (count / 8) as usize;
        let remaining = (count % 8) as u8;
        let mut data = self.codec.read_bytes(nbytes)?;
        if remaining > 0 {
            let bits = self.codec.read(remaining)?;
            data.push((bits as u8) << (8 - remaining));
        }
        Ok(data)
    }

    /// Decode a BIT STRING given the bounds used to encode it (X.691
    /// clause 16).
    pub fn decode_bit_string(
        &mut self,
        lb: Option<u64>,
        ub: Option<u64>,
        extensible: bool,
    ) -> PerResult<BitString> {
        if extensible && self.codec.read(1)? == 1 {
            return self.decode_bit_string_fragments(Some(0), None);
        }
        if ub == Some(0) {
            return Ok(BitString::empty());
        }
        if let (Some(l), Some(u)) = (lb, ub) {
            if l == u && u <= 16 {
                let data = self.read_bit_field(u)?;
                return BitString::new(data, u as usize);
            }
            if l == u && u < 65536 {
                if self.aligned {
                    self.codec.advance();
                }
                let data = self.read_bit_field(u)?;
                return BitString::new(data, u as usize);
            }
        }
        self.decode_bit_string_fragments(lb, ub)
    }

    fn decode_bit_string_fragments(
        &mut self,
        lb: Option<u64>,
        ub: Option<u64>,
    ) -> PerResult<BitString> {
        if self.aligned {
            self.codec.advance();
        }
        let mut data = Vec::new();
        let mut total = 0u64;
        loop {
            let (count, fragmented) = self.decode_length_determinant(lb, ub)?;
            // Fragment boundaries fall on whole bytes, so concatenating
            // the per-fragment octets preserves bit positions.
            data.extend_from_slice(&self.read_bit_field(count)?);
            total += count;
            if !fragmented {
                return BitString::new(data, total as usize);
            }
        }
    }

    /// Decode an OCTET STRING given the bounds used to encode it (X.691
    /// clause 17).
    pub fn decode_octet_string(
        &mut self,
        lb: Option<u64>,
        ub: Option<u64>,
        extensible: bool,
    ) -> PerResult<Vec<u8>> {
        if extensible && self.codec.read(1)? == 1 {
            return self.decode_octet_string_fragments(Some(0), None);
        }
        if ub == Some(0) {
            return Ok(Vec::new());
        }
        if let (Some(l), Some(u)) = (lb, ub) {
            if l == u && u < 65536 {
                if u > 2 && self.aligned {
                    self.codec.advance();
                }
                return self.codec.read_bytes(u as usize);
            }
        }
        self.decode_octet_string_fragments(lb, ub)
    }

    fn decode_octet_string_fragments(
        &mut self,
        lb: Option<u64>,
        ub: Option<u64>,
    ) -> PerResult<Vec<u8>> {
        if self.aligned {
            self.codec.advance();
        }
        let mut data = Vec::new();
        loop {
            let (count, fragmented) = self.decode_length_determinant(lb, ub)?;
            data.extend_from_slice(&self.codec.read_bytes(count as usize)?);
            if !fragmented {
                return Ok(data);
            }
        }
    }

    /// Decode a NULL: consumes nothing (X.691 clause 18).
    pub fn decode_null(&mut self) -> PerResult<()> {
        Ok(())
    }

    /// Decode a restricted character string encoded byte-verbatim
    /// (X.691 clause 30): VisibleString, IA5String, PrintableString.
    pub fn decode_string(
        &mut self,
        lb: Option<u64>,
        ub: Option<u64>,
        extensible: bool,
    ) -> PerResult<String> {
        let bytes = self.decode_octet_string(lb, ub, extensible)?;
        String::from_utf8(bytes).map_err(|e| {
            PerError::InvalidEncoding(format!("character string is not valid UTF-8: {}", e))
        })
    }

    /// Decode an OBJECT IDENTIFIER from its DER value octets (X.691
    /// clause 24).
    pub fn decode_object_identifier(&mut self) -> PerResult<ObjectIdentifier> {
        let contents = self.decode_octet_string(None, None, false)?;
        ObjectIdentifier::from_der_value_octets(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::per::encoder::PerEncoder;

    #[test]
    fn test_constrained_round_trip() {
        let bounds = [
            (0i64, 1i64),
            (0, 7),
            (0, 255),
            (0, 256),
            (0, 65535),
            (0, 65536),
            (-1000, 1000),
            (-5, -5),
            (i64::MIN, i64::MAX),
            (0, 16_777_215),
        ];
        for aligned in [true, false] {
            for (lb, ub) in bounds {
                let mid = ((lb as i128 + ub as i128) / 2) as i64;
                for n in [lb, ub, mid] {
                    let mut e = PerEncoder::new(aligned);
                    e.encode_constrained_whole_number(lb, ub, n).unwrap();
                    let mut d = PerDecoder::new(e.into_bytes(), aligned);
                    assert_eq!(
                        d.decode_constrained_whole_number(lb, ub).unwrap(),
                        n,
                        "aligned={} lb={} ub={} n={}",
                        aligned,
                        lb,
                        ub,
                        n
                    );
                }
            }
        }
    }

    #[test]
    fn test_semi_constrained_round_trip() {
        for aligned in [true, false] {
            for (lb, n) in [(0i64, 0i64), (0, 100), (-100, 1000), (500, 70000)] {
                let mut e = PerEncoder::new(aligned);
                e.encode_semi_constrained_whole_number(lb, n).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(d.decode_semi_constrained_whole_number(lb).unwrap(), n);
            }
        }
    }

    #[test]
    fn test_unconstrained_round_trip() {
        let values = [
            0i64,
            1,
            -1,
            127,
            128,
            -128,
            -129,
            65535,
            -65536,
            i64::MAX,
            i64::MIN,
        ];
        for aligned in [true, false] {
            for n in values {
                let mut e = PerEncoder::new(aligned);
                e.encode_unconstrained_whole_number(n).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(d.decode_unconstrained_whole_number().unwrap(), n);
            }
        }
    }

    #[test]
    fn test_normally_small_round_trip() {
        for n in [0u64, 1, 63, 64, 100, 100_000] {
            let mut e = PerEncoder::new(true);
            e.encode_normally_small_whole_number(n).unwrap();
            let mut d = PerDecoder::new(e.into_bytes(), true);
            assert_eq!(d.decode_normally_small_whole_number().unwrap(), n);
        }
    }

    #[test]
    fn test_length_determinant_forms() {
        let mut d = PerDecoder::new(vec![0x05], true);
        assert_eq!(d.decode_unconstrained_length().unwrap(), (5, false));

        let mut d = PerDecoder::new(vec![0x80, 0xC8], true);
        assert_eq!(d.decode_unconstrained_length().unwrap(), (200, false));

        let mut d = PerDecoder::new(vec![0xC1], true);
        assert_eq!(d.decode_unconstrained_length().unwrap(), (16384, true));

        let mut d = PerDecoder::new(vec![0xC5], true);
        assert!(d.decode_unconstrained_length().is_err());
    }

    #[test]
    fn test_normally_small_length_round_trip() {
        for n in [1u64, 5, 64, 65, 200] {
            let mut e = PerEncoder::new(false);
            e.encode_normally_small_length(n).unwrap();
            let mut d = PerDecoder::new(e.into_bytes(), false);
            assert_eq!(d.decode_normally_small_length().unwrap(), (n, false));
        }
    }

    #[test]
    fn test_boolean_round_trip() {
        for aligned in [true, false] {
            for value in [true, false] {
                let mut e = PerEncoder::new(aligned);
                e.encode_boolean(value).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(d.decode_boolean().unwrap(), value);
            }
        }
    }

    #[test]
    fn test_integer_round_trip() {
        type Bounds = (Option<i64>, Option<i64>, bool);
        let shapes: [Bounds; 6] = [
            (None, None, false),
            (Some(0), None, false),
            (Some(0), Some(255), false),
            (Some(7), Some(7), false),
            (Some(0), Some(7), true),
            (None, None, true),
        ];
        for aligned in [true, false] {
            for (lb, ub, extensible) in shapes {
                for value in [0i64, 5, 7, 200, 100_000] {
                    let in_lb = lb.map_or(true, |lb| value >= lb);
                    let in_ub = ub.map_or(true, |ub| value <= ub);
                    if !extensible && !(in_lb && in_ub) {
                        continue;
                    }
                    let mut e = PerEncoder::new(aligned);
                    e.encode_integer(value, lb, ub, extensible).unwrap();
                    let bytes = e.into_bytes();
                    let mut d = PerDecoder::new(bytes.clone(), aligned);
                    assert_eq!(
                        d.decode_integer(lb, ub, extensible).unwrap(),
                        value,
                        "aligned={} lb={:?} ub={:?} ext={} value={} bytes={:02X?}",
                        aligned,
                        lb,
                        ub,
                        extensible,
                        value,
                        bytes
                    );
                }
            }
        }
    }

    #[test]
    fn test_enumerated_round_trip() {
        for aligned in [true, false] {
            for (value, count, extensible) in
                [(0u64, 4u64, false), (3, 4, false), (2, 4, true), (6, 4, true)]
            {
                let mut e = PerEncoder::new(aligned);
                e.encode_enumerated(value, count, extensible).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(d.decode_enumerated(count, extensible).unwrap(), value);
            }
        }
    }

    #[test]
    fn test_real_round_trip() {
        let values = [
            0.0,
            1.0,
            -1.0,
            0.5,
            1.5,
            10.0,
            -96.0,
            3.141592653589793,
            1.0e100,
            -2.5e-3,
            f64::MIN_POSITIVE,
            5e-324,
            f64::MAX,
        ];
        for aligned in [true, false] {
            for value in values {
                let mut e = PerEncoder::new(aligned);
                e.encode_real(value).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(d.decode_real().unwrap(), value, "value={}", value);
            }
        }
    }

    #[test]
    fn test_real_special_round_trip() {
        for aligned in [true, false] {
            for value in [f64::INFINITY, f64::NEG_INFINITY] {
                let mut e = PerEncoder::new(aligned);
                e.encode_real(value).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(d.decode_real().unwrap(), value);
            }

            let mut e = PerEncoder::new(aligned);
            e.encode_real(f64::NAN).unwrap();
            let mut d = PerDecoder::new(e.into_bytes(), aligned);
            assert!(d.decode_real().unwrap().is_nan());

            let mut e = PerEncoder::new(aligned);
            e.encode_real(-0.0).unwrap();
            let decoded = PerDecoder::new(e.into_bytes(), aligned)
                .decode_real()
                .unwrap();
            assert_eq!(decoded, 0.0);
            assert!(decoded.is_sign_negative());
        }
    }

    #[test]
    fn test_real_lenient_exponent_overrun() {
        // Length-prefixed exponent declaring three octets where none
        // follow: decodes as zero instead of failing.
        let mut d = PerDecoder::new(vec![0x02, 0x83, 0x03], true);
        assert_eq!(d.decode_real().unwrap(), 0.0);
    }

    #[test]
    fn test_real_rejects_decimal_and_foreign_base() {
        let mut d = PerDecoder::new(vec![0x02, 0x03, 0x31], true);
        assert!(d.decode_real().is_err());

        // Base 8 selector in bits 6-5.
        let mut d = PerDecoder::new(vec![0x03, 0x90, 0x00, 0x01], true);
        assert!(d.decode_real().is_err());
    }

    #[test]
    fn test_bit_string_round_trip() {
        type Bounds = (Option<u64>, Option<u64>, bool);
        let value = BitString::new(vec![0b1011_0110, 0b1100_0000], 10).unwrap();
        let shapes: [Bounds; 4] = [
            (None, None, false),
            (Some(10), Some(10), false),
            (Some(0), Some(64), false),
            (Some(0), Some(4), true),
        ];
        for aligned in [true, false] {
            for (lb, ub, extensible) in shapes {
                let mut e = PerEncoder::new(aligned);
                e.encode_bit_string(&value, lb, ub, extensible).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                let decoded = d.decode_bit_string(lb, ub, extensible).unwrap();
                assert_eq!(decoded, value, "aligned={} lb={:?} ub={:?}", aligned, lb, ub);
            }
        }
    }

    #[test]
    fn test_bit_string_fixed_long_round_trip() {
        let data: Vec<u8> = (0..25u8).collect();
        let value = BitString::new(data, 197).unwrap();
        for aligned in [true, false] {
            let mut e = PerEncoder::new(aligned);
            e.encode_boolean(true).unwrap();
            e.encode_bit_string(&value, Some(197), Some(197), false)
                .unwrap();
            let mut d = PerDecoder::new(e.into_bytes(), aligned);
            assert!(d.decode_boolean().unwrap());
            let decoded = d.decode_bit_string(Some(197), Some(197), false).unwrap();
            assert_eq!(decoded.bit_len(), 197);
            assert_eq!(&decoded.as_bytes()[..24], &value.as_bytes()[..24]);
        }
    }

    #[test]
    fn test_bit_string_fragmented_round_trip() {
        // 20000 bits: a 16K fragment plus a short tail.
        let data = vec![0x5Au8; 2500];
        let value = BitString::new(data, 20000).unwrap();
        for aligned in [true, false] {
            let mut e = PerEncoder::new(aligned);
            e.encode_bit_string(&value, None, None, false).unwrap();
            let mut d = PerDecoder::new(e.into_bytes(), aligned);
            assert_eq!(d.decode_bit_string(None, None, false).unwrap(), value);
        }
    }

    #[test]
    fn test_octet_string_round_trip() {
        type Bounds = (Option<u64>, Option<u64>, bool);
        let shapes: [(usize, Bounds); 7] = [
            (0, (None, None, false)),
            (3, (None, None, false)),
            (2, (Some(2), Some(2), false)),
            (3, (Some(3), Some(3), false)),
            (5, (Some(0), Some(10), false)),
            (5, (Some(0), Some(10), true)),
            (12, (Some(0), Some(8), true)),
        ];
        for aligned in [true, false] {
            for (len, (lb, ub, extensible)) in shapes {
                let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
                let mut e = PerEncoder::new(aligned);
                e.encode_octet_string(&data, lb, ub, extensible).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(
                    d.decode_octet_string(lb, ub, extensible).unwrap(),
                    data,
                    "aligned={} len={} lb={:?} ub={:?} ext={}",
                    aligned,
                    len,
                    lb,
                    ub,
                    extensible
                );
            }
        }
    }

    #[test]
    fn test_octet_string_fragmented_round_trip() {
        for len in [16384usize, 100_000] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            for aligned in [true, false] {
                let mut e = PerEncoder::new(aligned);
                e.encode_octet_string(&data, None, None, false).unwrap();
                let mut d = PerDecoder::new(e.into_bytes(), aligned);
                assert_eq!(d.decode_octet_string(None, None, false).unwrap(), data);
            }
        }
    }

    #[test]
    fn test_string_round_trip() {
        for aligned in [true, false] {
            let mut e = PerEncoder::new(aligned);
            e.encode_string("VisibleString value", None, None, false)
                .unwrap();
            let mut d = PerDecoder::new(e.into_bytes(), aligned);
            assert_eq!(
                d.decode_string(None, None, false).unwrap(),
                "VisibleString value"
            );
        }
    }

    #[test]
    fn test_null_consumes_nothing() {
        let mut d = PerDecoder::new(vec![0xFF], true);
        d.decode_null().unwrap();
        assert_eq!(d.num_read(), 0);
    }

    #[test]
    fn test_object_identifier_round_trip() {
        let oid = ObjectIdentifier::new(vec![1, 2, 840, 113549, 1, 1, 11]).unwrap();
        for aligned in [true, false] {
            let mut e = PerEncoder::new(aligned);
            e.encode_object_identifier(&oid).unwrap();
            let mut d = PerDecoder::new(e.into_bytes(), aligned);
            assert_eq!(d.decode_object_identifier().unwrap(), oid);
        }
    }

    #[test]
    fn test_mixed_sequence_round_trip() {
        // A packed run of values exercising alignment interplay.
        for aligned in [true, false] {
            let mut e = PerEncoder::new(aligned);
            e.encode_boolean(true).unwrap();
            e.encode_integer(5, Some(0), Some(7), false).unwrap();
            e.encode_octet_string(b"ab", Some(2), Some(2), false).unwrap();
            e.encode_integer(-42, None, None, false).unwrap();
            e.encode_boolean(false).unwrap();
            e.encode_real(1.5).unwrap();
            let written = e.num_written();

            let mut d = PerDecoder::new(e.into_bytes(), aligned);
            assert!(d.decode_boolean().unwrap());
            assert_eq!(d.decode_integer(Some(0), Some(7), false).unwrap(), 5);
            assert_eq!(
                d.decode_octet_string(Some(2), Some(2), false).unwrap(),
                b"ab"
            );
            assert_eq!(d.decode_integer(None, None, false).unwrap(), -42);
            assert!(!d.decode_boolean().unwrap());
            assert_eq!(d.decode_real().unwrap(), 1.5);
            assert_eq!(d.num_read(), written);
        }
    }

    #[test]
    fn test_decode_exhaustion_surfaces() {
        let mut d = PerDecoder::new(vec![], true);
        assert!(d.decode_boolean().is_err());

        // Length claims five octets, only two follow.
        let mut d = PerDecoder::new(vec![0x05, 0x01, 0x02], true);
        assert!(d.decode_octet_string(None, None, false).is_err());
    }
}
