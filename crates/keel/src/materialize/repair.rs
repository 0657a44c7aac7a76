//! Ordered text repairs applied after strict parsing fails.
//!
//! Each [`RepairPass`] fixes one class of near-JSON that models emit. The
//! passes run in [`REPAIR_PASSES`] order; later passes assume the string
//! delimiters produced by earlier ones.

use tracing::trace;

use super::clean::QuoteState;

/// One named repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairPass {
    /// Typographic double quotes and single-quoted strings become ASCII
    /// double-quoted strings.
    NormalizeQuotes,
    /// Backslashes that do not start a JSON escape are doubled.
    EscapeStrayBackslashes,
    /// Raw control characters inside strings become escapes.
    EscapeControlCharacters,
    /// Commas directly before `}` or `]` are dropped.
    StripTrailingCommas,
}

/// All passes, in the order they run.
pub const REPAIR_PASSES: [RepairPass; 4] = [
    RepairPass::NormalizeQuotes,
    RepairPass::EscapeStrayBackslashes,
    RepairPass::EscapeControlCharacters,
    RepairPass::StripTrailingCommas,
];

impl RepairPass {
    pub fn name(self) -> &'static str {
        match self {
            RepairPass::NormalizeQuotes => "normalize_quotes",
            RepairPass::EscapeStrayBackslashes => "escape_stray_backslashes",
            RepairPass::EscapeControlCharacters => "escape_control_characters",
            RepairPass::StripTrailingCommas => "strip_trailing_commas",
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            RepairPass::NormalizeQuotes => normalize_quotes(text),
            RepairPass::EscapeStrayBackslashes => escape_stray_backslashes(text),
            RepairPass::EscapeControlCharacters => escape_control_characters(text),
            RepairPass::StripTrailingCommas => strip_trailing_commas(text),
        }
    }
}

/// Run every pass in order.
pub fn apply_repairs(text: &str) -> String {
    let mut current = text.to_string();
    for pass in REPAIR_PASSES {
        let next = pass.apply(&current);
        if next != current {
            trace!("Repair pass {} changed the candidate", pass.name());
        }
        current = next;
    }
    current
}

// ── Passes ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Delim {
    Ascii,
    Typographic,
    Single,
}

fn is_typographic_quote(c: char) -> bool {
    matches!(c, '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}')
}

/// Rewrite string delimiters to ASCII `"`.
///
/// Inside a string opened by a typographic or single quote, bare ASCII `"`
/// characters are escaped, and `\'` loses its backslash.
pub fn normalize_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open: Option<Delim> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match open {
            None => match c {
                '"' => {
                    open = Some(Delim::Ascii);
                    out.push('"');
                }
                c if is_typographic_quote(c) => {
                    open = Some(Delim::Typographic);
                    out.push('"');
                }
                '\'' => {
                    open = Some(Delim::Single);
                    out.push('"');
                }
                c => out.push(c),
            },
            Some(delim) => match c {
                '\\' => match chars.next() {
                    Some('\'') if delim == Delim::Single => out.push('\''),
                    Some(next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                },
                '"' if delim == Delim::Ascii => {
                    open = None;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                c if delim == Delim::Typographic && is_typographic_quote(c) => {
                    open = None;
                    out.push('"');
                }
                '\'' if delim == Delim::Single => {
                    open = None;
                    out.push('"');
                }
                c => out.push(c),
            },
        }
    }
    out
}

/// Double every backslash that does not start `\n`, `\r`, `\t`, `\"`,
/// `\\` or `\uXXXX`.
pub fn escape_stray_backslashes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            Some(&next @ ('n' | 'r' | 't' | '"' | '\\')) => {
                out.push('\\');
                out.push(next);
                i += 2;
            }
            Some('u') if is_unicode_escape(&chars, i + 2) => {
                out.push('\\');
                i += 1;
            }
            _ => {
                out.push_str("\\\\");
                i += 1;
            }
        }
    }
    out
}

fn is_unicode_escape(chars: &[char], start: usize) -> bool {
    chars
        .get(start..start + 4)
        .is_some_and(|hex| hex.iter().all(char::is_ascii_hexdigit))
}

/// Escape raw control characters that appear inside strings.
pub fn escape_control_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quotes = QuoteState::default();

    for c in text.chars() {
        let in_string = quotes.feed(c);
        if !in_string || !c.is_control() {
            out.push(c);
            continue;
        }
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push_str(&format!("\\u{:04x}", u32::from(c))),
        }
    }
    out
}

/// Remove commas that are followed (after optional whitespace) by `}` or
/// `]`, outside strings.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quotes = QuoteState::default();

    for (i, &c) in chars.iter().enumerate() {
        if !quotes.feed(c) && c == ',' {
            let next = chars
                .get(i + 1..)
                .and_then(|rest| rest.iter().find(|n| !n.is_whitespace()));
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
