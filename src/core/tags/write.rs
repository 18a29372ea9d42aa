//! core/tags/write.rs
//! Write raw string values into an `id3::Tag`, one schema field at a time.
//!
//! Semantics:
//! - An empty value list (after replace) removes the frame.
//! - Numeric frames take one value; anything that isn't a u32 is rejected.
//! - Nothing touches the disk here, `TagFile::save` does.

use id3::frame::Comment;
use id3::{Tag, TagLike};

use super::frames::Frame;
use super::read::{first_comment, text_frame, text_values};
use super::util::{parse_slash_pair_u32, parse_u32_value};

/// Apply `values` to `frame`. On a bad value, returns it as the error.
pub(crate) fn write_frame(
    tag: &mut Tag,
    frame: Frame,
    values: &[String],
    replace: bool,
) -> Result<(), String> {
    match frame {
        Frame::Text(id) => {
            let mut all = if replace {
                Vec::new()
            } else {
                text_values(tag, id)
            };
            all.extend(values.iter().filter(|v| !v.is_empty()).cloned());
            set_text_values(tag, id, &all);
        }
        Frame::Integer(id) => match single_number(values)? {
            Some(n) => tag.set_text(id, n.to_string()),
            None => {
                let _ = tag.remove(id); // TagLike::remove returns Vec<Frame>; discard it
            }
        },
        Frame::Number(id) => {
            let n = single_number(values)?;
            let (_, total) = parse_slash_pair_u32(text_frame(tag, id).as_deref());
            set_slash_pair(tag, id, n, total);
        }
        Frame::Total(id) => {
            let total = single_number(values)?;
            let (n, _) = parse_slash_pair_u32(text_frame(tag, id).as_deref());
            set_slash_pair(tag, id, n, total);
        }
        Frame::Comment => {
            let mut parts: Vec<String> = if replace {
                Vec::new()
            } else {
                first_comment(tag).into_iter().collect()
            };
            parts.extend(values.iter().filter(|v| !v.is_empty()).cloned());

            // Replace with a single "eng" comment
            let _ = tag.remove("COMM");
            if !parts.is_empty() {
                let _ = tag.add_frame(Comment {
                    lang: "eng".to_string(),
                    description: String::new(),
                    text: parts.join("\n"),
                });
            }
        }
        // Read-only; the caller rejects it before we get here.
        Frame::Duration => {}
    }
    Ok(())
}

/// Helper: set/remove a text frame holding zero or more values.
fn set_text_values(tag: &mut Tag, id: &str, values: &[String]) {
    if values.is_empty() {
        let _ = tag.remove(id);
    } else {
        tag.set_text(id, values.join("\0"));
    }
}

/// Helper: write TRCK/TPOS as "n" or "n/total" (or remove if n is None)
fn set_slash_pair(tag: &mut Tag, id: &str, n: Option<u32>, total: Option<u32>) {
    match n {
        None => {
            let _ = tag.remove(id);
        }
        Some(n) => match total {
            Some(t) => tag.set_text(id, format!("{}/{}", n, t)),
            None => tag.set_text(id, n.to_string()),
        },
    }
}

/// Numeric frames hold one value: the last non-empty one wins.
fn single_number(values: &[String]) -> Result<Option<u32>, String> {
    match values.iter().rev().find(|v| !v.trim().is_empty()) {
        Some(v) => parse_u32_value(v),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn track_number_and_total_update_independently() {
        let mut tag = Tag::new();
        tag.set_text("TRCK", "3/10");

        write_frame(&mut tag, Frame::Total("TRCK"), &strings(&["12"]), true).expect("total");
        assert_eq!(text_frame(&tag, "TRCK").as_deref(), Some("3/12"));

        write_frame(&mut tag, Frame::Number("TRCK"), &strings(&["4"]), true).expect("number");
        assert_eq!(text_frame(&tag, "TRCK").as_deref(), Some("4/12"));

        write_frame(&mut tag, Frame::Number("TRCK"), &[], true).expect("clear");
        assert_eq!(text_frame(&tag, "TRCK"), None);
    }

    #[test]
    fn text_values_are_nul_joined() {
        let mut tag = Tag::new();
        write_frame(
            &mut tag,
            Frame::Text("TCON"),
            &strings(&["Baroque", "Sacred"]),
            true,
        )
        .expect("write");
        assert_eq!(text_values(&tag, "TCON"), vec!["Baroque", "Sacred"]);
    }

    #[test]
    fn comment_is_replaced_not_duplicated() {
        let mut tag = Tag::new();
        write_frame(&mut tag, Frame::Comment, &strings(&["first"]), true).expect("first");
        write_frame(&mut tag, Frame::Comment, &strings(&["second"]), true).expect("second");
        assert_eq!(first_comment(&tag).as_deref(), Some("second"));
        assert_eq!(tag.frames().filter(|f| f.id() == "COMM").count(), 1);
    }

    #[test]
    fn integer_frame_rejects_text() {
        let mut tag = Tag::new();
        let err = write_frame(&mut tag, Frame::Integer("TBPM"), &strings(&["fast"]), true)
            .expect_err("not a number");
        assert_eq!(err, "fast");
    }
}
