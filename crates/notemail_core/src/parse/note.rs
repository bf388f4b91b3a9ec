//! Tagged note parser.
//!
//! # Responsibility
//! - Extract the sender declaration, the send marker and task lines.
//!
//! # Invariants
//! - Parsing is pure and deterministic.
//! - The last `#sender:` declaration wins.
//! - The `#send` marker counts regardless of its position.

use crate::model::note::ParsedNote;

const SENDER_TAG: &str = "#sender:";
const SEND_MARKER: &str = "#send";
const TAG_PREFIX: char = '#';

/// Example note shown by `notemail format`.
pub const NOTE_TEMPLATE: &str = "#sender: Name
- Today's Task
- [ ] Task 1
- [ ] Task 2
-------------------
- Tomorrow's Task
- [ ] Task 1
- [ ] Task 2
#send";

/// Parses note content into sender, tasks and completion state.
///
/// Rules:
/// - sender: a line whose whitespace-stripped form starts with `#sender:`;
///   the name is the trimmed text after the tag's colon.
/// - send marker: a line equal to `#send` after trimming.
/// - tasks: every trimmed line that does not start with `#`, blank ones
///   included.
pub fn parse_note(content: &str) -> ParsedNote {
    let mut sender_name = None;
    let mut has_send_marker = false;
    let mut tasks = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(name) = sender_declaration(line) {
            sender_name = Some(name);
        } else if trimmed == SEND_MARKER {
            has_send_marker = true;
        }

        if !trimmed.starts_with(TAG_PREFIX) {
            tasks.push(trimmed.to_string());
        }
    }

    ParsedNote::new(sender_name, tasks, has_send_marker)
}

fn sender_declaration(line: &str) -> Option<String> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.starts_with(SENDER_TAG) {
        return None;
    }
    // Only `#sender` (with interior whitespace) precedes the first colon.
    let (_, name) = line.split_once(':')?;
    Some(name.trim().to_string())
}
