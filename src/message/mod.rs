//! Message text utilities.
//!
//! # Responsibilities
//! - Parse and strip the leading mention segment of a message
//! - Build wire-format message segments
//! - Extract plain text from a segmented message
//!
//! # Design Decisions
//! - Segments use the bracketed `[kind:value]` wire form
//! - Mention detection only looks at a leading segment; mentions elsewhere
//!   in the text never mark a message as directed

/// A leading mention split into its target and the remaining text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingMention<'a> {
    /// Identifier named by the mention segment.
    pub target: i64,
    /// Text after the segment, with leading spaces removed.
    pub rest: &'a str,
}

/// Parse a leading `[mention:<id>]` segment.
///
/// Returns `None` when the text does not start with a well-formed mention.
pub fn leading_mention(text: &str) -> Option<LeadingMention<'_>> {
    let body = text.strip_prefix("[mention:")?;
    let end = body.find(']')?;
    let target: i64 = body[..end].parse().ok()?;
    let rest = body[end + 1..].trim_start_matches(' ');
    Some(LeadingMention { target, rest })
}

/// Build a mention segment for an outbound message.
pub fn mention(user_id: i64) -> String {
    format!("[mention:{user_id}]")
}

/// Build an image segment referencing a file or URL.
pub fn image(resource: &str) -> String {
    format!("[image:{resource}]")
}

/// Strip every bracketed segment, keeping only the plain text.
pub fn plain_text(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = rest.find('[') {
        out.push_str(&rest[..start]);
        match rest[start..].find(']') {
            Some(end) => rest = &rest[start + end + 1..],
            // Unterminated bracket: treat the remainder as text.
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_mention_parses_and_trims() {
        let m = leading_mention("[mention:12345]   /echo hi").unwrap();
        assert_eq!(m.target, 12345);
        assert_eq!(m.rest, "/echo hi");
    }

    #[test]
    fn leading_mention_requires_leading_segment() {
        assert!(leading_mention("hello [mention:1]").is_none());
        assert!(leading_mention("[mention:abc] hi").is_none());
        assert!(leading_mention("[mention:12").is_none());
    }

    #[test]
    fn plain_text_strips_segments() {
        assert_eq!(plain_text("[mention:1] hi [image:x.png] there"), " hi  there");
        assert_eq!(plain_text("no segments"), "no segments");
        assert_eq!(plain_text("broken [mention:1"), "broken [mention:1");
    }
}
