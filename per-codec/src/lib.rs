//! ASN.1 Packed Encoding Rules (ITU-T X.691) encoder and decoder
//!
//! This crate provides a bit-level codec with MSB-first ordering and the
//! PER encode/decode routines for primitive ASN.1 types built on top of
//! it, supporting both the ALIGNED (APER) and UNALIGNED (UPER) variants.

pub mod bitbuffer;
pub mod per;

pub use bitbuffer::BitBuffer;
pub use per::{PerDecoder, PerEncoder};
