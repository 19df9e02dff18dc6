// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Transcoding options.

pub use crate::jpeg::huffman::EntropyCoding;

/// What happens to APPn/COM segments of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataPolicy {
    /// Copy APP1–APP15 and COM segments verbatim. APP0 is always regenerated.
    #[default]
    Preserve,
    /// Drop every metadata segment except the regenerated JFIF APP0.
    Strip,
}

/// How coefficients are carried to the new quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscodeMode {
    /// Full decode to pixels and forward DCT at the new quality.
    #[default]
    Pixel,
    /// Rescale quantized coefficients by `old_q / new_q` in place.
    Coefficient,
}

/// Options for [`reencode_with`](super::reencode_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// Target quality, 1–100.
    pub quality: i32,
    /// Huffman table selection.
    pub entropy: EntropyCoding,
    /// Metadata handling.
    pub metadata: MetadataPolicy,
    /// Pixel round-trip or coefficient rescaling.
    pub mode: TranscodeMode,
    /// Restart interval in MCUs; `None` keeps the input's, `Some(0)` disables.
    pub restart_interval: Option<u16>,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self::new(75)
    }
}

impl TranscodeOptions {
    /// Defaults at the given quality.
    #[must_use]
    pub fn new(quality: i32) -> Self {
        Self {
            quality,
            entropy: EntropyCoding::default(),
            metadata: MetadataPolicy::default(),
            mode: TranscodeMode::default(),
            restart_interval: None,
        }
    }

    #[must_use]
    pub fn with_entropy(mut self, entropy: EntropyCoding) -> Self {
        self.entropy = entropy;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: MetadataPolicy) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: TranscodeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_restart_interval(mut self, interval: u16) -> Self {
        self.restart_interval = Some(interval);
        self
    }
}
