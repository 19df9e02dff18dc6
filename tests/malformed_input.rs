// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Rejection of unsupported and corrupt streams.
//!
//! Each case starts from a valid stream produced by the encoder and patches
//! a single header byte, so the failure is attributable to that byte.

use jpeg_reencode::{decode, encode, list_segments, reencode, DecodedImage, JpegError, Plane, SegmentInfo};

fn sample_jpeg() -> Vec<u8> {
    let data = (0..24 * 16).map(|i| (i * 7 % 251) as u8).collect();
    encode(&DecodedImage::gray(Plane::from_vec(24, 16, data).unwrap()), 80).unwrap()
}

fn segment(bytes: &[u8], marker: u8) -> SegmentInfo {
    list_segments(bytes)
        .unwrap()
        .into_iter()
        .find(|s| s.marker == marker)
        .unwrap_or_else(|| panic!("no 0x{marker:02X} segment"))
}

/// Copy of `bytes` with the byte at `offset` replaced.
fn patched(bytes: &[u8], offset: usize, value: u8) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out[offset] = value;
    out
}

#[test]
fn non_baseline_frames_are_unsupported() {
    let src = sample_jpeg();
    let sof = segment(&src, 0xC0).offset;
    for (code, kind) in [
        (0xC1, "extended sequential DCT (SOF1)"),
        (0xC2, "progressive DCT (SOF2)"),
        (0xC3, "lossless (SOF3)"),
        (0xC9, "arithmetic coding (SOF9-11)"),
    ] {
        assert_eq!(
            reencode(&patched(&src, sof + 1, code), 50),
            Err(JpegError::UnsupportedFormat(kind.into())),
            "SOF 0x{code:02X}"
        );
    }
}

#[test]
fn twelve_bit_precision_is_unsupported() {
    let src = sample_jpeg();
    let sof = segment(&src, 0xC0).offset;
    assert!(matches!(
        decode(&patched(&src, sof + 4, 12)),
        Err(JpegError::UnsupportedFormat(_))
    ));
}

#[test]
fn non_baseline_spectral_selection_is_unsupported() {
    let src = sample_jpeg();
    let sos = segment(&src, 0xDA);
    // Gray SOS body: Ns, Cs, Td/Ta, Ss, Se, Ah/Al.
    let se = sos.offset + 4 + 4;
    assert!(matches!(
        decode(&patched(&src, se, 5)),
        Err(JpegError::UnsupportedFormat(_))
    ));
}

#[test]
fn missing_soi_is_malformed() {
    let src = sample_jpeg();
    assert!(matches!(decode(&src[2..]), Err(JpegError::MalformedStream(_))));
    assert!(matches!(decode(b"not a jpeg"), Err(JpegError::MalformedStream(_))));
}

#[test]
fn undefined_component_in_scan_is_malformed() {
    let src = sample_jpeg();
    let sos = segment(&src, 0xDA);
    assert_eq!(
        decode(&patched(&src, sos.offset + 5, 9)).err(),
        Some(JpegError::MalformedStream("scan references undefined component"))
    );
}

#[test]
fn corrupt_tables_are_malformed() {
    let src = sample_jpeg();

    // DQT precision nibble 2.
    let dqt = segment(&src, 0xDB).offset;
    assert!(matches!(decode(&patched(&src, dqt + 4, 0x20)), Err(JpegError::MalformedTable(_))));

    // DQT zero entry.
    assert!(matches!(decode(&patched(&src, dqt + 5, 0)), Err(JpegError::MalformedTable(_))));

    // DHT class 2.
    let dht = segment(&src, 0xC4).offset;
    assert!(matches!(decode(&patched(&src, dht + 4, 0x20)), Err(JpegError::MalformedTable(_))));
}

#[test]
fn segment_running_past_the_end_is_truncated() {
    let src = sample_jpeg();
    let dqt = segment(&src, 0xDB).offset;
    let cut = &src[..dqt + 20];
    assert_eq!(decode(cut).err(), Some(JpegError::TruncatedStream));
}

#[test]
fn scan_without_eoi_is_truncated() {
    let src = sample_jpeg();
    assert_eq!(decode(&src[..src.len() - 2]).err(), Some(JpegError::TruncatedStream));
}

#[test]
fn segment_listing_skips_entropy_data() {
    let src = sample_jpeg();
    let segs = list_segments(&src).unwrap();
    let markers: Vec<u8> = segs.iter().map(|s| s.marker).collect();
    assert_eq!(markers, [0xD8, 0xE0, 0xDB, 0xC4, 0xC4, 0xC0, 0xDA, 0xD9]);
    assert_eq!(segs[1].length, 16);
    assert_eq!(segs.last().unwrap().offset, src.len() - 2);
}

#[test]
fn oversized_frame_header_without_scan_is_rejected() {
    // 65535x65535 4:2:0 frame, no scan data at all.
    let data = [
        0xFF, 0xD8, // SOI
        0xFF, 0xC0, 0x00, 0x11, 0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x03, // SOF0
        0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01, //
        0xFF, 0xD9, // EOI
    ];
    assert_eq!(decode(&data).err(), Some(JpegError::MalformedStream("EOI before any scan")));
}

#[test]
fn oversized_frame_header_before_scan_is_rejected() {
    let data = [
        0xFF, 0xD8, // SOI
        0xFF, 0xC0, 0x00, 0x0B, 0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x01, 0x11, 0x00, // SOF0
        0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, // SOS
        0x00, 0x00, 0x00, 0x00, //
        0xFF, 0xD9, // EOI
    ];
    assert_eq!(
        decode(&data).err(),
        Some(JpegError::MalformedStream("frame larger than its scan data"))
    );

    // Same check on a real stream whose dimensions were inflated.
    let src = sample_jpeg();
    let sof = segment(&src, 0xC0).offset;
    let mut big = src.clone();
    big[sof + 5..sof + 9].fill(0xFF);
    assert_eq!(
        reencode(&big, 50).err(),
        Some(JpegError::MalformedStream("frame larger than its scan data"))
    );
}
