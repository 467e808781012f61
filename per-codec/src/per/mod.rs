//! Packed Encoding Rules engine (ITU-T X.691)
//!
//! PER encodes ASN.1 values into the minimum number of bits the type's
//! constraints allow. Two variants exist:
//!
//! - **ALIGNED (APER)**: multi-octet fields are padded to octet
//!   boundaries before being written.
//! - **UNALIGNED (UPER)**: fields follow each other with no padding.
//!
//! Values reduce to three whole-number shapes depending on the bounds
//! known from the type notation: constrained (finite `lb` and `ub`),
//! semi-constrained (finite `lb` only), and unconstrained. Variable-size
//! contents are prefixed with a length determinant; lengths of 16K units
//! and above switch to the fragmented form, where marker octets
//! `11kkkkkk` announce `k * 16K` units at a time and a final short length
//! closes the value.
//!
//! [`PerEncoder`] and [`PerDecoder`] hold a [`BitBuffer`](crate::bitbuffer::BitBuffer)
//! plus the variant flag and expose one operation per primitive type.

pub mod decoder;
pub mod encoder;
pub mod types;
pub mod width;

pub use decoder::PerDecoder;
pub use encoder::PerEncoder;
pub use types::SpecialReal;

/// Largest length bound for which a length determinant is encoded as a
/// constrained whole number (X.691 11.9.3.3 and 11.9.4.1).
pub const MAX_CONSTRAINED_LENGTH: u64 = 65536;

/// Unit count announced by one fragment marker step (X.691 11.9.3.8).
pub const FRAGMENT_SIZE: u64 = 16384;
