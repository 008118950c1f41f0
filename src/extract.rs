use crate::types::MessagePayload;

pub const MEDIA_OMITTED: &str = "<Media omitted>";

/// Flattens any inbound payload into the single line of text that gets relayed.
///
/// Media keeps a placeholder followed by a space and the caption; the space is
/// kept even when the caption is missing. Audio has no caption. An unknown
/// payload yields an empty string, which the relay treats as nothing to send.
pub fn extract_text(payload: &MessagePayload) -> String {
    match payload {
        MessagePayload::Image { caption }
        | MessagePayload::Video { caption }
        | MessagePayload::Document { caption, .. } => with_caption(caption.as_deref()),
        MessagePayload::Audio => MEDIA_OMITTED.to_string(),
        MessagePayload::ExtendedText { text } | MessagePayload::Text { text } => text.clone(),
        MessagePayload::Unknown => String::new(),
    }
}

fn with_caption(caption: Option<&str>) -> String {
    format!("{} {}", MEDIA_OMITTED, caption.unwrap_or_default())
}
