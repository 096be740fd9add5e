//! Item type classification for generated directory menus.
//!
//! # Responsibilities
//! - Decide the item type tag of a regular file from its first bytes
//! - Fall back to text when nothing conclusive is known
//!
//! # Design Decisions
//! - Strategy trait injected into the directory handler
//! - Default strategy classifies everything as text
//! - Signature sniffing is table driven and has no native dependency

use std::fmt::Debug;
use std::path::Path;

use crate::gopher::ItemType;

/// Number of leading bytes handed to a classifier.
pub const SAMPLE_LEN: usize = 512;

/// Picks the item type of a regular file.
///
/// Returning `None` means "inconclusive"; the caller then uses
/// [`ItemType::Text`].
pub trait ContentClassifier: Send + Sync + Debug {
    fn classify(&self, path: &Path, head: &[u8]) -> Option<ItemType>;
}

/// Classifies every file as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextClassifier;

impl ContentClassifier for PlainTextClassifier {
    fn classify(&self, _path: &Path, _head: &[u8]) -> Option<ItemType> {
        None
    }
}

/// Classifies files by their magic numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureClassifier;

const IMAGE_SIGNATURES: &[&[u8]] = &[
    b"\x89PNG\r\n\x1a\n",
    b"\xff\xd8\xff",
    b"BM",
    b"II*\x00",
    b"MM\x00*",
    b"\x00\x00\x01\x00",
];

const AUDIO_SIGNATURES: &[&[u8]] = &[
    b"ID3",
    b"OggS",
    b"fLaC",
    b"MThd",
];

impl ContentClassifier for SignatureClassifier {
    fn classify(&self, _path: &Path, head: &[u8]) -> Option<ItemType> {
        if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
            return Some(ItemType::Gif);
        }
        if IMAGE_SIGNATURES.iter().any(|sig| head.starts_with(sig)) || is_riff(head, b"WEBP") {
            return Some(ItemType::Image);
        }
        if AUDIO_SIGNATURES.iter().any(|sig| head.starts_with(sig))
            || is_riff(head, b"WAVE")
            || is_aiff(head)
            || is_mpeg_frame(head)
        {
            return Some(ItemType::Sound);
        }
        if looks_binary(head) {
            return Some(ItemType::Binary);
        }
        None
    }
}

fn is_riff(head: &[u8], form: &[u8; 4]) -> bool {
    head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == form
}

fn is_aiff(head: &[u8]) -> bool {
    head.len() >= 12 && &head[..4] == b"FORM" && (&head[8..12] == b"AIFF" || &head[8..12] == b"AIFC")
}

// 11 set sync bits followed by a valid version and layer.
fn is_mpeg_frame(head: &[u8]) -> bool {
    head.len() >= 2 && head[0] == 0xff && head[1] & 0xe0 == 0xe0 && head[1] & 0x06 != 0 && head[1] & 0x18 != 0x08
}

fn looks_binary(head: &[u8]) -> bool {
    if head.contains(&0) {
        return true;
    }
    match std::str::from_utf8(head) {
        Ok(_) => false,
        // error_len() is None when the sample merely cut a character in half
        Err(e) => e.error_len().is_some(),
    }
}
