//! System prompt assembly from retrieved memories.

use chrono::{DateTime, SecondsFormat, Utc};
use mnema_memory::SearchHit;
use mnema_protocol::Message;

/// Placeholder replaced by the formatted memory block.
pub const USER_INFO_PLACEHOLDER: &str = "{user_info}";
/// Placeholder replaced by the current timestamp.
pub const TIME_PLACEHOLDER: &str = "{time}";

const MEMORIES_OPEN: &str = "<memories>\n";
const MEMORIES_CLOSE: &str = "\n</memories>";

/// Retrieval query built from the trailing `window` messages, one per line.
pub fn build_memory_query(messages: &[Message], window: usize) -> String {
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .map(|message| message.content.as_str())
        .filter(|content| !content.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a single retrieval hit.
pub fn format_memory_line(hit: &SearchHit) -> String {
    format!("[{}]: {} (similarity: {:.3})", hit.key, hit.value, hit.score)
}

/// Render hits as a `<memories>` block of at most `max_chars` characters.
///
/// Lines are kept whole and in rank order; the first line that would exceed
/// the budget ends the block. No hits (or no line fitting) yields "".
pub fn format_memories(hits: &[SearchHit], max_chars: usize) -> String {
    let overhead = MEMORIES_OPEN.chars().count() + MEMORIES_CLOSE.chars().count();
    let mut used = overhead;
    let mut lines = Vec::new();
    for hit in hits {
        let line = format_memory_line(hit);
        let cost = line.chars().count() + usize::from(!lines.is_empty());
        if used + cost > max_chars {
            break;
        }
        used += cost;
        lines.push(line);
    }
    if lines.is_empty() {
        return String::new();
    }
    format!("{MEMORIES_OPEN}{}{MEMORIES_CLOSE}", lines.join("\n"))
}

/// Substitute `{user_info}` and `{time}` in a prompt template.
///
/// The template is scanned once; inserted text is never rescanned, so
/// memories that mention a placeholder stay literal. Other braces are left
/// untouched, so templates may contain literal JSON.
pub fn render_system_prompt(template: &str, user_info: &str, time: DateTime<Utc>) -> String {
    let timestamp = time.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut rendered = String::with_capacity(template.len() + user_info.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(USER_INFO_PLACEHOLDER) {
            rendered.push_str(user_info);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(TIME_PLACEHOLDER) {
            rendered.push_str(&timestamp);
            rest = after;
        } else {
            rendered.push('{');
            rest = &tail[1..];
        }
    }
    rendered.push_str(rest);
    rendered
}

/// Truncate a string to at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
