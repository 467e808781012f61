//! ASN.1 Packed Encoding Rules (ITU-T X.691) for primitive types
//!
//! This library implements PER encoding and decoding of primitive ASN.1
//! types (BOOLEAN, INTEGER, ENUMERATED, REAL, BIT STRING, OCTET STRING,
//! NULL, restricted character strings, OBJECT IDENTIFIER) in both the
//! ALIGNED (APER) and UNALIGNED (UPER) variants, on top of an MSB-first
//! bit-level codec.
//!
//! # Architecture
//!
//! The workspace is organized as two crates plus this facade:
//!
//! - `per-core`: error handling and value datatypes
//! - `per-codec`: the bit codec and the PER encoder/decoder
//!
//! # Usage
//!
//! ```
//! use per::{PerDecoder, PerEncoder};
//!
//! # fn main() -> per::PerResult<()> {
//! let mut encoder = PerEncoder::new(true);
//! encoder.encode_integer(42, Some(0), Some(255), false)?;
//! let bytes = encoder.into_bytes();
//! assert_eq!(bytes, [0x2A]);
//!
//! let mut decoder = PerDecoder::new(bytes, true);
//! assert_eq!(decoder.decode_integer(Some(0), Some(255), false)?, 42);
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use per_core::datatypes::{BitString, ObjectIdentifier};
pub use per_core::{PerError, PerResult};

// Re-export the codec API
pub use per_codec::bitbuffer::{BitBuffer, INITIAL_BUFFER_SIZE};
pub use per_codec::per::{PerDecoder, PerEncoder, SpecialReal};
pub use per_codec::per::{FRAGMENT_SIZE, MAX_CONSTRAINED_LENGTH};

// Module-level access for callers that prefer full paths
pub mod bitbuffer {
    pub use per_codec::bitbuffer::*;
}

pub mod codec {
    pub use per_codec::per::*;
}
