//! core/tags/read.rs
//! Read raw string values out of an `id3::Tag`, one schema field at a time.
//!
//! - Tag reading does NOT interpret values beyond splitting them.
//! - Empty values are dropped: a frame holding "" reads as "no values".

use id3::{Tag, TagLike};
use id3::frame::Content;

use super::frames::Frame;
use super::util::parse_slash_pair_u32;

pub(crate) fn read_frame(tag: &Tag, frame: Frame) -> Vec<String> {
    match frame {
        Frame::Text(id) | Frame::Integer(id) => text_values(tag, id),
        Frame::Number(id) => {
            let (n, _) = parse_slash_pair_u32(text_frame(tag, id).as_deref());
            n.map(|n| vec![n.to_string()]).unwrap_or_default()
        }
        Frame::Total(id) => {
            let (_, total) = parse_slash_pair_u32(text_frame(tag, id).as_deref());
            total.map(|t| vec![t.to_string()]).unwrap_or_default()
        }
        Frame::Comment => first_comment(tag)
            .filter(|c| !c.is_empty())
            .map(|c| vec![c])
            .unwrap_or_default(),
        Frame::Duration => Vec::new(),
    }
}

/// All values of a text frame. ID3v2.4 separates multiple values with NUL.
pub(crate) fn text_values(tag: &Tag, id: &str) -> Vec<String> {
    let Some(text) = text_frame(tag, id) else {
        return Vec::new();
    };
    text.split('\0')
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Get the raw "plain text" content of a frame id.
/// Examples: "TPE2", "TCOM", "TBPM", ...
pub(crate) fn text_frame(tag: &Tag, id: &str) -> Option<String> {
    let frame = tag.get(id)?;
    match frame.content() {
        Content::Text(s) => Some(s.clone()),
        _ => None,
    }
}

/// Find the first COMM frame and return its text.
pub(crate) fn first_comment(tag: &Tag) -> Option<String> {
    for frame in tag.frames() {
        if frame.id() != "COMM" {
            continue;
        }
        if let Content::Comment(c) = frame.content() {
            return Some(c.text.clone());
        }
    }
    None
}
