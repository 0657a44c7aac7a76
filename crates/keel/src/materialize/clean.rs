//! Pre-parse cleanup of raw model text.
//!
//! Models wrap the mapping in markdown fences, prose, and sometimes YAML
//! block-scalar markers. Cleaning drops the fences, narrows the text to the
//! outermost `{ … }` span, and only then strips block-scalar markers, so
//! quotes in the surrounding prose cannot skew string tracking.

use std::sync::LazyLock;

use regex::Regex;

/// A fence line: three or more backticks, optionally followed by a
/// language tag, and nothing else.
static FENCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*`{3,}[\w.+#-]*\s*$").expect("fence pattern is valid")
});

/// Tracks whether the scanned position is inside a double-quoted string.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct QuoteState {
    in_string: bool,
    escaped: bool,
}

impl QuoteState {
    /// Advance past `c`. Returns `true` when `c` belongs to a string,
    /// delimiters included.
    pub(crate) fn feed(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            true
        } else if c == '"' {
            self.in_string = true;
            true
        } else {
            false
        }
    }
}

/// Drop markdown fence lines, keeping everything between them.
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !FENCE_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `|` markers, and the whitespace around them, wherever they occur
/// outside double-quoted strings.
pub fn strip_block_scalars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quotes = QuoteState::default();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if !quotes.feed(c) && c == '|' {
            let kept = out.trim_end().len();
            out.truncate(kept);
            while chars.next_if(|n| n.is_whitespace()).is_some() {}
            continue;
        }
        out.push(c);
    }
    out
}

/// The candidate span: first `{` through last `}`.
pub fn locate_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Fence stripping, span location, then block-scalar stripping on the
/// span alone. `None` when the text holds no `{ … }` span.
pub fn clean(raw: &str) -> Option<String> {
    let unfenced = strip_fences(raw);
    locate_span(&unfenced).map(strip_block_scalars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_with_and_without_language_removed() {
        let text = "Here you go:\n```json\n{\"a\": \"1\"}\n```\nEnjoy";
        assert_eq!(strip_fences(text), "Here you go:\n{\"a\": \"1\"}\nEnjoy");
        assert_eq!(strip_fences("````\n{}\n````"), "{}");
    }

    #[test]
    fn inline_backticks_survive() {
        let text = "use `cargo` here ```not a fence";
        assert_eq!(strip_fences(text), text);
    }

    #[test]
    fn block_scalar_pipes_removed_outside_strings() {
        let text = "{\"a.py\": |\n  \"print(1)\"}";
        assert_eq!(strip_block_scalars(text), "{\"a.py\":\"print(1)\"}");
    }

    #[test]
    fn pipes_inside_strings_kept() {
        let text = r#"{"a.js": "x || y", "b": "say \"|\" ok"}"#;
        assert_eq!(strip_block_scalars(text), text);
    }

    #[test]
    fn span_is_outermost_braces() {
        assert_eq!(
            locate_span("prose {\"a\": {\"b\": \"c\"}} trailing"),
            Some("{\"a\": {\"b\": \"c\"}}")
        );
        assert_eq!(locate_span("no braces"), None);
        assert_eq!(locate_span("} backwards {"), None);
    }

    #[test]
    fn odd_quotes_in_prose_do_not_affect_contents() {
        let raw = "Here is the 5\" layout you asked for:\n```json\n{\"a.sh\": \"true || false\"}\n```";
        assert_eq!(clean(raw).as_deref(), Some("{\"a.sh\": \"true || false\"}"));
    }

    #[test]
    fn clean_without_span_is_none() {
        assert_eq!(clean("```\nnothing here\n```"), None);
    }

    #[test]
    fn quote_state_handles_escapes() {
        let mut q = QuoteState::default();
        let inside: Vec<bool> = r#"a"b\"c"d"#.chars().map(|c| q.feed(c)).collect();
        assert_eq!(
            inside,
            vec![false, true, true, true, true, true, true, false]
        );
    }
}
