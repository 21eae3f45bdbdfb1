//! Interpretation of raw Telegram media payloads.
//!
//! Kind precedence, highest first: MIME prefix, video/animated attribute
//! (beats a still-image size attribute on the same payload), file extension,
//! then generic document.

use linkvault_core::models::{MediaDescriptor, MediaKind};

use super::client::{DocumentAttribute, FileLocation, RawDocument, RawMedia, RawMessage, RawPhoto};

/// Extensions treated as video when nothing more specific is known.
pub const VIDEO_EXTENSIONS: [&str; 13] = [
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "ogv", "ts", "mts", "gif",
];

const PHOTO_MIME: &str = "image/jpeg";

pub fn classify_document(doc: &RawDocument) -> MediaKind {
    if let Some(mime) = doc.mime_type.as_deref() {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("video/") {
            return MediaKind::Video;
        }
        if mime.starts_with("image/") {
            return MediaKind::Photo;
        }
    }

    let moving = doc.attributes.iter().any(|a| {
        matches!(
            a,
            DocumentAttribute::Video { .. } | DocumentAttribute::Animated
        )
    });
    if moving {
        return MediaKind::Video;
    }

    if doc
        .attributes
        .iter()
        .any(|a| matches!(a, DocumentAttribute::ImageSize { .. }))
    {
        return MediaKind::Photo;
    }

    if let Some(ext) = document_file_name(doc).and_then(extension_of) {
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            return MediaKind::Video;
        }
    }

    MediaKind::Document
}

fn document_file_name(doc: &RawDocument) -> Option<&str> {
    doc.attributes.iter().find_map(|a| match a {
        DocumentAttribute::Filename(name) if !name.trim().is_empty() => Some(name.as_str()),
        _ => None,
    })
}

fn extension_of(name: &str) -> Option<String> {
    let (base, ext) = name.rsplit_once('.')?;
    if base.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extension for a synthesized filename: the MIME subtype, or `bin`.
fn extension_for_mime(mime: Option<&str>) -> String {
    mime.and_then(|m| m.split(';').next())
        .and_then(|m| m.trim().split_once('/'))
        .map(|(_, subtype)| subtype.trim().to_ascii_lowercase())
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}

/// `<kind>_<native_id>.<ext>`
pub fn synthesize_file_name(kind: MediaKind, native_id: &str, mime: Option<&str>) -> String {
    format!("{}_{}.{}", kind, native_id, extension_for_mime(mime))
}

fn largest_size(photo: &RawPhoto) -> Option<&super::client::PhotoSize> {
    photo
        .sizes
        .iter()
        .max_by_key(|s| (i64::from(s.width) * i64::from(s.height), s.size))
}

/// Normalize the media of one message. Messages without downloadable media
/// yield `None`.
///
/// The native id is the photo or document id; the message id is kept in the
/// metadata.
pub fn describe_message(message: &RawMessage) -> Option<(MediaDescriptor, FileLocation)> {
    let message_id = message.id.to_string();

    match message.media.as_ref()? {
        RawMedia::Photo(photo) => {
            let native_id = photo.id.to_string();
            let largest = largest_size(photo)?;
            let file_name = synthesize_file_name(MediaKind::Photo, &native_id, Some(PHOTO_MIME));
            let descriptor = MediaDescriptor::new(native_id.clone(), file_name, MediaKind::Photo)
                .with_size(largest.size)
                .with_mime(PHOTO_MIME)
                .with_metadata("message_id", message_id)
                .with_metadata("photo_id", native_id)
                .with_metadata("width", largest.width.to_string())
                .with_metadata("height", largest.height.to_string());
            let location = FileLocation::Photo {
                id: photo.id,
                access_hash: photo.access_hash,
                file_reference: photo.file_reference.clone(),
                thumb_size: largest.kind.clone(),
            };
            Some((descriptor, location))
        }
        RawMedia::Document(doc) => {
            let native_id = doc.id.to_string();
            let kind = classify_document(doc);
            let file_name = document_file_name(doc)
                .map(|name| name.trim().to_string())
                .unwrap_or_else(|| {
                    synthesize_file_name(kind, &native_id, doc.mime_type.as_deref())
                });

            let mut descriptor = MediaDescriptor::new(native_id.clone(), file_name, kind)
                .with_size(doc.size)
                .with_metadata("message_id", message_id)
                .with_metadata("document_id", native_id);
            if let Some(mime) = doc.mime_type.as_deref() {
                descriptor = descriptor.with_mime(mime.trim());
            }

            for attribute in &doc.attributes {
                match attribute {
                    DocumentAttribute::Video {
                        duration_secs,
                        width,
                        height,
                        ..
                    } => {
                        descriptor = descriptor
                            .with_metadata("duration_secs", duration_secs.to_string())
                            .with_metadata("width", width.to_string())
                            .with_metadata("height", height.to_string());
                    }
                    DocumentAttribute::Audio {
                        duration_secs,
                        title,
                        performer,
                        ..
                    } => {
                        descriptor =
                            descriptor.with_metadata("duration_secs", duration_secs.to_string());
                        if let Some(title) = title {
                            descriptor = descriptor.with_metadata("title", title.clone());
                        }
                        if let Some(performer) = performer {
                            descriptor = descriptor.with_metadata("performer", performer.clone());
                        }
                    }
                    DocumentAttribute::Animated => {
                        descriptor = descriptor.with_metadata("animated", "true");
                    }
                    _ => {}
                }
            }

            let location = FileLocation::Document {
                id: doc.id,
                access_hash: doc.access_hash,
                file_reference: doc.file_reference.clone(),
            };
            Some((descriptor, location))
        }
        RawMedia::Unsupported(_) => None,
    }
}
