// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for JPEG parsing, transcoding and encoding.
//!
//! Every failure is terminal for the current call: nothing is retried and no
//! partial output is produced.

use thiserror::Error;

/// Errors that can occur while decoding or re-encoding a JPEG stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JpegError {
    /// The byte stream ended in the middle of a segment or of scan data.
    #[error("truncated JPEG stream")]
    TruncatedStream,
    /// A DQT or DHT segment is internally inconsistent.
    #[error("malformed table: {0}")]
    MalformedTable(&'static str),
    /// The marker sequence violates the JPEG grammar.
    #[error("malformed stream: {0}")]
    MalformedStream(&'static str),
    /// A bit sequence in the scan data matches no Huffman code.
    #[error("invalid Huffman code in scan data")]
    InvalidCode,
    /// Progressive, arithmetic, 12-bit, or otherwise unsupported input.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl JpegError {
    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedFormat(what.into())
    }
}

pub type Result<T> = std::result::Result<T, JpegError>;
