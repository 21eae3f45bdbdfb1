//! Telegram media extraction
//!
//! The session-level protocol client sits behind [`TelegramClient`]; this module
//! only interprets the media payloads it returns.

pub mod client;
pub mod extractor;
pub mod media;

pub use client::{
    ChannelRef, DocumentAttribute, FileLocation, PhotoSize, RawDocument, RawMedia, RawMessage,
    RawPhoto, TelegramClient,
};
pub use extractor::{ExtractedMedia, TelegramExtractor, TelegramPost};
