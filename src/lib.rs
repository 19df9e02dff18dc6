// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! # jpeg-reencode
//!
//! Pure-Rust baseline JPEG transcoder. Takes an encoded JPEG and a target
//! quality and returns a new, valid JPEG of the same image at that quality:
//!
//! - **Pixel mode** (default): full decode to RGB/gray planes, then a fresh
//!   forward DCT with the quality-scaled Annex K tables.
//! - **Coefficient mode**: rescales the quantized coefficients from the old
//!   tables to the new ones without leaving the frequency domain.
//!
//! Output is always a baseline JFIF stream with a single interleaved scan,
//! the source's chroma subsampling, and (by default) optimized Huffman
//! tables. Progressive, arithmetic-coded, lossless, hierarchical and 12-bit
//! input is rejected with [`JpegError::UnsupportedFormat`].
//!
//! The block transform and color stages run on rayon when the `parallel`
//! feature (default) is enabled. Diagnostics go through the `log` facade.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use jpeg_reencode::reencode;
//!
//! let photo = std::fs::read("photo.jpg").unwrap();
//! let smaller = reencode(&photo, 60).unwrap();
//! std::fs::write("photo-q60.jpg", smaller).unwrap();
//! ```

pub mod jpeg;
pub mod transcode;

pub use jpeg::error::{JpegError, Result as JpegResult};
pub use jpeg::dct::{DctGrid, QuantTable};
pub use jpeg::frame::FrameInfo;
pub use jpeg::marker::{list_segments, MarkerSegment, SegmentInfo};
pub use jpeg::pixels::Plane;
pub use jpeg::quant::Quality;
pub use jpeg::JpegImage;
pub use transcode::{decode, encode, reencode, reencode_with};
pub use transcode::{ColorSpace, DecodedImage, Subsampling};
pub use transcode::{EntropyCoding, MetadataPolicy, TranscodeMode, TranscodeOptions};
