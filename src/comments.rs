//! Plain-text rendering of rich comments.

use base64::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::clickup::types::{Comment, CommentPart};

/// What a comment fragment renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind<'a> {
  Text(&'a str),
  Badge(&'a str),
  Bookmark { url: &'a str, title: Option<String> },
}

pub fn classify(part: &CommentPart) -> PartKind<'_> {
  match part.kind.as_deref() {
    Some("bookmark") => {
      let url = part
        .bookmark
        .as_ref()
        .and_then(|b| b.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default();
      let title = part
        .attributes
        .get("raw")
        .and_then(Value::as_str)
        .and_then(bookmark_title)
        .filter(|t| t != url);
      PartKind::Bookmark { url, title }
    }
    None | Some("") if is_badge(part) => PartKind::Badge(&part.text),
    _ => PartKind::Text(&part.text),
  }
}

fn is_badge(part: &CommentPart) -> bool {
  part
    .attributes
    .get("badge-class")
    .and_then(Value::as_str)
    .is_some_and(|class| !class.is_empty())
}

/// Preview title from a bookmark's `raw` attribute: base64 of a JSON
/// document with `preview.title`.
pub fn bookmark_title(raw: &str) -> Option<String> {
  if raw.is_empty() {
    return None;
  }
  let bytes = BASE64_STANDARD.decode(raw).ok()?;
  let doc: Value = serde_json::from_slice(&bytes).ok()?;
  doc
    .pointer("/preview/title")
    .and_then(Value::as_str)
    .filter(|t| !t.is_empty())
    .map(String::from)
}

pub fn render_parts(parts: &[CommentPart]) -> String {
  let mut out = String::new();
  for part in parts {
    match classify(part) {
      PartKind::Text(text) => out.push_str(text),
      PartKind::Badge(text) => {
        out.push('[');
        out.push_str(text);
        out.push_str("] ");
      }
      PartKind::Bookmark { url, title } => {
        match title {
          Some(title) => {
            out.push_str(&title);
            out.push_str(" → ");
            out.push_str(url);
          }
          None => out.push_str(url),
        }
        out.push('\n');
      }
    }
  }
  out
}

/// Render a comment body, falling back to `comment_text` when the comment
/// has no structured parts.
pub fn render_comment(comment: &Comment) -> String {
  if comment.parts.is_empty() {
    return comment.comment_text.clone();
  }
  render_parts(&comment.parts)
}

/// Compact age of a unix-millisecond timestamp: `Nm`, `Nh` or `Nd`.
pub fn elapsed_since(ms: i64, now: DateTime<Utc>) -> String {
  let Some(then) = Utc.timestamp_millis_opt(ms).single() else {
    return "-".to_string();
  };
  let elapsed = now.signed_duration_since(then);
  if elapsed.num_days() > 0 {
    format!("{}d", elapsed.num_days())
  } else if elapsed.num_hours() > 0 {
    format!("{}h", elapsed.num_hours())
  } else {
    format!("{}m", elapsed.num_minutes().max(0))
  }
}
