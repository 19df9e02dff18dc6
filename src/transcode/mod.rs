// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Transcoding entry points.
//!
//! - [`decode`] / [`encode`]: between JPEG bytes and a [`DecodedImage`].
//! - [`reencode`]: decode and encode again at a new quality, keeping the
//!   source's subsampling.
//! - [`reencode_with`]: the same with explicit [`TranscodeOptions`]
//!   (entropy coding, metadata policy, pixel vs. coefficient mode, restart
//!   interval).

pub mod image;
pub mod options;
mod pipeline;

pub use image::{ColorSpace, DecodedImage, Subsampling};
pub use options::{EntropyCoding, MetadataPolicy, TranscodeMode, TranscodeOptions};
pub use pipeline::{decode, encode, reencode, reencode_with};
