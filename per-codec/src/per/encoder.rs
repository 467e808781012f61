//! PER encoder for primitive ASN.1 types

use crate::bitbuffer::BitBuffer;
use crate::per::types::{decompose_real, SpecialReal};
use crate::per::width::{bit_field_size, bits_unsigned, octets_signed, octets_unsigned};
use crate::per::{FRAGMENT_SIZE, MAX_CONSTRAINED_LENGTH};
use per_core::datatypes::{BitString, ObjectIdentifier};
use per_core::error::{PerError, PerResult};

/// PER encoder holding the bit codec and the variant flag.
///
/// Construct with [`new`](Self::new), selecting the ALIGNED (APER) or
/// UNALIGNED (UPER) variant, then call one encode operation per value.
/// [`into_bytes`](Self::into_bytes) finalizes the stream; a partial
/// trailing byte is zero-padded on the right.
pub struct PerEncoder {
    codec: BitBuffer,
    aligned: bool,
}

impl PerEncoder {
    /// Create an encoder. `aligned` selects APER over UPER.
    pub fn new(aligned: bool) -> Self {
        Self {
            codec: BitBuffer::writer(),
            aligned,
        }
    }

    /// Create an encoder with an explicit buffer capacity hint in bytes.
    pub fn with_capacity(aligned: bool, capacity: usize) -> Self {
        Self {
            codec: BitBuffer::writer_with_capacity(capacity),
            aligned,
        }
    }

    /// Whether this encoder produces the ALIGNED variant.
    pub fn aligned(&self) -> bool {
        self.aligned
    }

    /// Bits written so far, alignment padding included.
    pub fn num_written(&self) -> u64 {
        self.codec.num_written()
    }

    /// Encoded bytes produced so far.
    pub fn as_bytes(&self) -> &[u8] {
        self.codec.as_bytes()
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.codec.into_bytes()
    }

    /// Pad the stream to the next octet boundary.
    pub fn align(&mut self) {
        self.codec.align();
    }

    /// Encode a constrained whole number (X.691 11.5).
    ///
    /// The UNALIGNED variant uses the minimum bits for the range. The
    /// ALIGNED variant distinguishes the bit-field case (range up to
    /// 255), the one-octet and two-octet cases, and the indefinite
    /// length case for ranges above 64K, where the octet count travels
    /// in a constrained length determinant.
    pub fn encode_constrained_whole_number(&mut self, lb: i64, ub: i64, n: i64) -> PerResult<()> {
        if ub < lb {
            return Err(PerError::BadRequest(format!(
                "invalid bounds: lb {} above ub {}",
                lb, ub
            )));
        }
        if n < lb || n > ub {
            return Err(PerError::BadRequest(format!(
                "value {} outside [{}, {}]",
                n, lb, ub
            )));
        }
        let range = ub as i128 - lb as i128 + 1;
        // 11.5.4: a range of one encodes as an empty bit-field.
        if range == 1 {
            return Ok(());
        }
        let value = (n as i128 - lb as i128) as u64;

        // 11.5.6: UNALIGNED, minimum bits for the range.
        if !self.aligned {
            let bits = bits_unsigned((range - 1) as u64);
            return self.codec.write(bits as u8, value);
        }

        // 11.5.7.1: bit-field case, no alignment.
        if range <= 0xFF {
            return self.codec.write(bit_field_size(range as u64), value);
        }
        // 11.5.7.2: one-octet case, octet-aligned.
        if range == 0x100 {
            self.codec.align();
            return self.codec.write(8, value);
        }
        // 11.5.7.3: two-octet case, octet-aligned.
        if range <= 0x1_0000 {
            self.codec.align();
            return self.codec.write(16, value);
        }
        // 11.5.7.4: indefinite length case. The octet count is itself a
        // constrained length with lb 1 and ub the octets of the range.
        let octets = octets_unsigned(value);
        let octets_range = octets_unsigned((ub as i128 - lb as i128) as u64) as u64;
        self.encode_length_determinant(octets as u64, Some(1), Some(octets_range))?;
        self.codec.align();
        self.codec.write((octets * 8) as u8, value)
    }

    /// Encode a semi-constrained whole number (X.691 11.7): the offset
    /// from `lb` in the minimum number of octets, behind an unbounded
    /// length determinant.
    pub fn encode_semi_constrained_whole_number(&mut self, lb: i64, n: i64) -> PerResult<()> {
        if n < lb {
            return Err(PerError::BadRequest(format!(
                "value {} below lower bound {}",
                n, lb
            )));
        }
        let value = (n as i128 - lb as i128) as u64;
        let octets = octets_unsigned(value);
        // 11.7.4: octet-aligned in the ALIGNED variant.
        if self.aligned {
            self.codec.align();
        }
        self.encode_length_determinant(octets as u64, None, None)?;
        self.codec.write((octets * 8) as u8, value)
    }

    /// Encode an unconstrained whole number (X.691 11.8): 2's complement
    /// in the minimum number of octets, behind an unbounded length
    /// determinant.
    pub fn encode_unconstrained_whole_number(&mut self, n: i64) -> PerResult<()> {
        let octets = octets_signed(n);
        // 11.8.3: octet-aligned in the ALIGNED variant.
        if self.aligned {
            self.codec.align();
        }
        self.encode_length_determinant(octets as u64, None, None)?;
        self.codec.write((octets * 8) as u8, n as u64)
    }

    /// Encode a normally small non-negative whole number (X.691 11.6):
    /// a zero bit plus six bits for values up to 63, otherwise a one bit
    /// followed by the semi-constrained form over a lower bound of zero.
    pub fn encode_normally_small_whole_number(&mut self, n: u64) -> PerResult<()> {
        if n <= 63 {
            self.codec.write(1, 0)?;
            self.codec.write(6, n)
        } else {
            if n > i64::MAX as u64 {
                return Err(PerError::BadRequest(format!(
                    "normally small whole number {} exceeds 63 bits",
                    n
                )));
            }
            self.codec.write(1, 1)?;
            self.encode_semi_constrained_whole_number(0, n as i64)
        }
    }

    /// Encode a length determinant for `n` units (X.691 11.9).
    ///
    /// With both bounds present and `ub` below 64K the length is a
    /// constrained whole number. Otherwise the unconstrained form
    /// applies; see [`encode_unconstrained_length`](Self::encode_unconstrained_length)
    /// for the returned pair.
    pub fn encode_length_determinant(
        &mut self,
        n: u64,
        lb: Option<u64>,
        ub: Option<u64>,
    ) -> PerResult<(u64, bool)> {
        if let (Some(lb), Some(ub)) = (lb, ub) {
            if ub < MAX_CONSTRAINED_LENGTH {
                self.encode_constrained_whole_number(lb as i64, ub as i64, n as i64)?;
                return Ok((0, false));
            }
        }
        self.encode_unconstrained_length(n)
    }

    /// Encode an unconstrained length (X.691 11.9.3.5 to 11.9.3.8).
    ///
    /// Returns `(remainder, fragmented)`. A fragment marker `11kkkkkk`
    /// covers only `k * 16K` units: the caller emits that many units,
    /// then re-invokes with the remainder, down to a final short length
    /// (a single zero octet when the body was an exact multiple of 16K).
    pub fn encode_unconstrained_length(&mut self, n: u64) -> PerResult<(u64, bool)> {
        if self.aligned {
            self.codec.align();
        }
        // Single octet 0xxxxxxx.
        if n <= 127 {
            self.codec.write(8, n)?;
            return Ok((0, false));
        }
        // Two octets 10xxxxxx xxxxxxxx.
        if n < FRAGMENT_SIZE {
            self.codec.write(16, (1 << 15) | n)?;
            return Ok((0, false));
        }
        // Fragment marker 11kkkkkk with k in 1..=4.
        let covered = fragment_units(n);
        let k = covered / FRAGMENT_SIZE;
        self.codec.write(8, (3 << 6) | k)?;
        Ok((n - covered, true))
    }

    /// Encode a normally small length (X.691 11.9.3.4). `n` must be at
    /// least 1.
    pub fn encode_normally_small_length(&mut self, n: u64) -> PerResult<(u64, bool)> {
        if n == 0 {
            return Err(PerError::BadRequest(
                "normally small length must be at least 1".to_string(),
            ));
        }
        if n <= 64 {
            self.codec.write(1, 0)?;
            self.codec.write(6, n - 1)?;
            return Ok((0, false));
        }
        self.codec.write(1, 1)?;
        self.encode_unconstrained_length(n)
    }

    /// Encode a BOOLEAN as a single bit, 1 for true (X.691 clause 12).
    pub fn encode_boolean(&mut self, value: bool) -> PerResult<()> {
        self.codec.write(1, value as u64)
    }

    /// Encode an INTEGER with optional PER-visible bounds (X.691 clause
    /// 13).
    ///
    /// With `extensible` set, a leading bit records whether the value
    /// escapes the extension root; out-of-root values take the
    /// unconstrained form. In-root encoding picks the whole-number shape
    /// from the available bounds.
    pub fn encode_integer(
        &mut self,
        value: i64,
        lb: Option<i64>,
        ub: Option<i64>,
        extensible: bool,
    ) -> PerResult<()> {
        if extensible {
            let extended =
                lb.is_some_and(|lb| value < lb) || ub.is_some_and(|ub| value > ub);
            self.codec.write(1, extended as u64)?;
            if extended {
                return self.encode_unconstrained_whole_number(value);
            }
        }
        match (lb, ub) {
            // 13.2.1: a single permitted value encodes as nothing.
            (Some(lb), Some(ub)) if lb == ub => {
                if value != lb {
                    return Err(PerError::BadRequest(format!(
                        "value {} differs from the single permitted value {}",
                        value, lb
                    )));
                }
                Ok(())
            }
            (Some(lb), Some(ub)) => self.encode_constrained_whole_number(lb, ub, value),
            (Some(lb), None) => self.encode_semi_constrained_whole_number(lb, value),
            _ => self.encode_unconstrained_whole_number(value),
        }
    }

    /// Encode an ENUMERATED index out of `count` root enumerations
    /// (X.691 clause 14). Extension additions encode as a normally small
    /// whole number offset past the root.
    pub fn encode_enumerated(
        &mut self,
        value: u64,
        count: u64,
        extensible: bool,
    ) -> PerResult<()> {
        if count == 0 {
            return Err(PerError::BadRequest(
                "enumerated type needs at least one enumeration".to_string(),
            ));
        }
        if extensible {
            if value >= count {
                self.codec.write(1, 1)?;
                return self.encode_normally_small_whole_number(value - count);
            }
            self.codec.write(1, 0)?;
        } else if value >= count {
            return Err(PerError::BadRequest(format!(
                "enumeration index {} outside root of {} values",
                value, count
            )));
        }
        self.encode_constrained_whole_number(0, (count - 1) as i64, value as i64)
    }

    /// Encode a REAL (X.691 clause 15; contents octets per X.690 8.5,
    /// base 2).
    ///
    /// The contents are assembled in a secondary codec, then shipped as
    /// an unconstrained octet string: first octet (binary flag, sign,
    /// base, scaling, exponent form), exponent in 2's complement,
    /// mantissa as an unsigned integer, each in the fewest octets.
    pub fn encode_real(&mut self, value: f64) -> PerResult<()> {
        // X.690 8.5.9: special values and minus zero are one contents
        // octet behind a length of one.
        if let Some(special) = SpecialReal::classify(value) {
            if self.aligned {
                self.codec.align();
            }
            self.codec.write(8, 1)?;
            return self.codec.write(8, special.to_u8() as u64);
        }
        // X.690 8.5.2: plus zero has no contents octets.
        if value == 0.0 {
            if self.aligned {
                self.codec.align();
            }
            return self.codec.write(8, 0);
        }

        let (mantissa, exponent) = decompose_real(value);
        let negative = mantissa < 0;
        let magnitude = mantissa.unsigned_abs();

        let mut contents = BitBuffer::writer();
        // First octet: bit 8 binary, bit 7 sign, bits 6-5 base (00 for
        // base 2), bits 4-3 scaling factor (zero), bits 2-1 exponent
        // form.
        contents.write(1, 1)?;
        contents.write(1, negative as u64)?;
        contents.write(2, 0)?;
        contents.write(2, 0)?;

        let exp_octets = octets_signed(exponent as i64);
        if exp_octets > 3 {
            // Length-prefixed form: a count octet precedes the exponent.
            contents.write(2, 3)?;
            contents.write(8, exp_octets as u64)?;
        } else {
            contents.write(2, (exp_octets - 1) as u64)?;
        }
        contents.write((exp_octets * 8) as u8, exponent as i64 as u64)?;

        let man_octets = octets_unsigned(magnitude);
        contents.write((man_octets * 8) as u8, magnitude)?;

        self.encode_octet_string(&contents.into_bytes(), None, None, false)
    }

    /// Append `count` bits taken MSB-first from `data`; the tail partial
    /// byte carries its valid bits in the most significant positions.
    pub fn write_bit_field(&mut self, data: &[u8], count: u64) -> PerResult<()> {
        if count == 0 {
            return Ok(());
        }
        let nbytes = (count / 8) as usize;
        let remaining = (count % 8) as u8;
        let needed = nbytes + (remaining > 0) as usize;
        if data.len() < needed {
            return Err(PerError::BadRequest(format!(
                "bit field of {} bits needs {} bytes, got {}",
                count,
                needed,
                data.len()
            )));
        }
        if nbytes > 0 {
            self.codec.write_bytes(&data[..nbytes])?;
        }
        if remaining > 0 {
            let value = (data[nbytes] >> (8 - remaining)) as u64;
            self.codec.write(remaining, value)?;
        }
        Ok(())
    }

    /// Encode a BIT STRING with optional size bounds in bits (X.691
    /// clause 16).
    ///
    /// Fixed sizes up to 16 bits go out as a plain bit-field; fixed
    /// sizes below 64K as an octet-aligned bit-field. Everything else
    /// takes a length determinant, fragmenting at 16K-bit boundaries.
    pub fn encode_bit_string(
        &mut self,
        value: &BitString,
        lb: Option<u64>,
        ub: Option<u64>,
        extensible: bool,
    ) -> PerResult<()> {
        let n = value.bit_len() as u64;
        // 16.6: extension bit; out-of-root lengths use the unbounded
        // form.
        if extensible {
            let extended = lb.is_some_and(|lb| n < lb) || ub.is_some_and(|ub| n > ub);
            self.codec.write(1, extended as u64)?;
            if extended {
                return self.encode_bit_string_fragments(value.as_bytes(), n, Some(0), None);
            }
        }
        // 16.8: forced empty, no encoding at all.
        if ub == Some(0) {
            return Ok(());
        }
        if let (Some(l), Some(u)) = (lb, ub) {
            // 16.9: fixed size of at most sixteen bits, no alignment.
            if l == u && u <= 16 {
                return self.write_bit_field(value.as_bytes(), u);
            }
            // 16.10: fixed size below 64K, octet-aligned bit-field.
            if l == u && u < 65536 {
                if self.aligned {
                    self.codec.align();
                }
                return self.write_bit_field(value.as_bytes(), u);
            }
        }
        // 16.11: length determinant with fragmentation.
        self.encode_bit_string_fragments(value.as_bytes(), n, lb, ub)
    }

    fn encode_bit_string_fragments(
        &mut self,
        data: &[u8],
        count: u64,
        lb: Option<u64>,
        ub: Option<u64>,
    ) -> PerResult<()> {
        if self.aligned {
            self.codec.align();
        }
        let mut offset = 0u64;
        loop {
            let remaining = count - offset;
            let (pending, fragmented) = self.encode_length_determinant(remaining, lb, ub)?;
            let chunk = remaining - pending;
            if chunk > 0 {
                // Fragment boundaries fall on whole bytes: covered unit
                // counts are multiples of 16K bits.
                self.write_bit_field(&data[(offset / 8) as usize..], chunk)?;
            }
            offset += chunk;
            if !fragmented {
                return Ok(());
            }
        }
    }

    /// Encode an OCTET STRING with optional size bounds in octets
    /// (X.691 clause 17). The fixed-size thresholds sit at 2 and 64K
    /// octets; fragmentation chunks are 16K octets.
    pub fn encode_octet_string(
        &mut self,
        value: &[u8],
        lb: Option<u64>,
        ub: Option<u64>,
        extensible: bool,
    ) -> PerResult<()> {
        let n = value.len() as u64;
        // 17.3: extension bit; out-of-root lengths use the unbounded
        // form.
        if extensible {
            let extended = lb.is_some_and(|lb| n < lb) || ub.is_some_and(|ub| n > ub);
            self.codec.write(1, extended as u64)?;
            if extended {
                return self.encode_octet_string_fragments(value, Some(0), None);
            }
        }
        // 17.5: forced empty, no encoding at all.
        if ub == Some(0) {
            return Ok(());
        }
        if let (Some(l), Some(u)) = (lb, ub) {
            if l == u && u < 65536 {
                if n != u {
                    return Err(PerError::BadRequest(format!(
                        "fixed-size octet string expects {} octets, got {}",
                        u, n
                    )));
                }
                // 17.6: at most two octets, not octet-aligned.
                if u <= 2 {
                    return self.codec.write_bytes(value);
                }
                // 17.7: below 64K, octet-aligned, still no length.
                if self.aligned {
                    self.codec.align();
                }
                return self.codec.write_bytes(value);
            }
        }
        // 17.8: length determinant with fragmentation.
        self.encode_octet_string_fragments(value, lb, ub)
    }

    fn encode_octet_string_fragments(
        &mut self,
        value: &[u8],
        lb: Option<u64>,
        ub: Option<u64>,
    ) -> PerResult<()> {
        if self.aligned {
            self.codec.align();
        }
        let n = value.len() as u64;
        let mut offset = 0u64;
        loop {
            let remaining = n - offset;
            let (pending, fragmented) = self.encode_length_determinant(remaining, lb, ub)?;
            let chunk = remaining - pending;
            self.codec
                .write_bytes(&value[offset as usize..(offset + chunk) as usize])?;
            offset += chunk;
            if !fragmented {
                return Ok(());
            }
        }
    }

    /// Encode a NULL: no bits are produced (X.691 clause 18).
    pub fn encode_null(&mut self) -> PerResult<()> {
        Ok(())
    }

    /// Encode a restricted character string whose characters map
    /// one-to-one onto octets, byte-verbatim: VisibleString, IA5String,
    /// PrintableString (X.691 clause 30).
    pub fn encode_string(
        &mut self,
        value: &str,
        lb: Option<u64>,
        ub: Option<u64>,
        extensible: bool,
    ) -> PerResult<()> {
        self.encode_octet_string(value.as_bytes(), lb, ub, extensible)
    }

    /// Encode an OBJECT IDENTIFIER as the octet string of its DER value
    /// octets (X.691 clause 24).
    pub fn encode_object_identifier(&mut self, oid: &ObjectIdentifier) -> PerResult<()> {
        self.encode_octet_string(&oid.to_der_value_octets(), None, None, false)
    }
}

/// Units covered by the largest fragment marker usable for `n`, which
/// must be at least 16K.
fn fragment_units(n: u64) -> u64 {
    if n >= 4 * FRAGMENT_SIZE {
        4 * FRAGMENT_SIZE
    } else if n >= 3 * FRAGMENT_SIZE {
        3 * FRAGMENT_SIZE
    } else if n >= 2 * FRAGMENT_SIZE {
        2 * FRAGMENT_SIZE
    } else {
        FRAGMENT_SIZE
    }
}
