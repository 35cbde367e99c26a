//! Anchor detection and value-span capture shared by all field parsers.
//!
//! A field value starts right after its label ("anchor") and runs up to
//! the next detected anchor, a line or page boundary depending on the
//! field's [`CaptureMode`], or the configured span limit, whichever comes
//! first. Only the first occurrence of each field's anchor is used.

use regex::Regex;
use tracing::{debug, trace};

use super::patterns::trim_value;
use super::RawFields;

/// How much text after an anchor belongs to the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Rest of the anchor line. If that is blank, the following line.
    Line,
    /// Consecutive lines up to a blank line or page break, joined with spaces.
    Joined,
    /// Consecutive lines up to a blank line or page break, newlines kept.
    Block,
}

/// Static description of one field: its label vocabulary and capture rule.
pub struct FieldSpec {
    /// Field name as it appears in the record schema.
    pub name: &'static str,
    /// Label phrases (lowercase) that introduce the field.
    pub labels: &'static [&'static str],
    /// Capture rule.
    pub mode: CaptureMode,
    /// Field-specific cleanup applied to the trimmed capture.
    pub refine: fn(&str) -> String,
}

/// Compiled anchors for one document type.
pub struct AnchorSet {
    fields: &'static [FieldSpec],
    patterns: Vec<Regex>,
    stops: Option<Regex>,
}

/// An anchor occurrence in the text. `field` is `None` for stop labels.
#[derive(Debug, Clone, Copy)]
struct Hit {
    field: Option<usize>,
    start: usize,
    end: usize,
}

impl AnchorSet {
    /// Compile the field vocabulary plus the stop labels.
    ///
    /// Stop labels (e.g. "Date:") end a capture without being fields
    /// themselves. They only count when followed by a delimiter.
    pub fn compile(
        fields: &'static [FieldSpec],
        stop_labels: &[&str],
    ) -> Result<Self, regex::Error> {
        let patterns = fields
            .iter()
            .map(|spec| Regex::new(&field_pattern(spec.labels)))
            .collect::<Result<Vec<_>, _>>()?;

        let stops = if stop_labels.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"(?im)\b(?:{})[ \t]*[:;=?]",
                alternation(stop_labels)
            ))?)
        };

        Ok(Self {
            fields,
            patterns,
            stops,
        })
    }

    /// Field specs in schema order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Capture every field whose anchor appears in `text`.
    ///
    /// Fields without an anchor are absent from the result. A field whose
    /// anchor is present but followed by nothing maps to an empty string.
    pub fn scan(&self, text: &str, max_value_chars: usize) -> RawFields {
        let hits = self.hits(text);
        let mut raw = RawFields::new();

        for (i, hit) in hits.iter().enumerate() {
            let Some(index) = hit.field else {
                continue;
            };
            let spec = &self.fields[index];

            if raw.contains_key(spec.name) {
                trace!("Ignoring repeated {} anchor at byte {}", spec.name, hit.start);
                continue;
            }

            let end = hits.get(i + 1).map_or(text.len(), |next| next.start);
            let span = clamp_chars(&text[hit.end..end], max_value_chars);
            let captured = capture(span, spec.mode);
            let value = (spec.refine)(trim_value(&captured));

            debug!("Anchor {} at byte {} -> {:?}", spec.name, hit.start, value);
            raw.insert(spec.name.to_string(), value);
        }

        raw
    }

    /// All anchor occurrences in document order, overlaps removed.
    fn hits(&self, text: &str) -> Vec<Hit> {
        let mut hits: Vec<Hit> = Vec::new();

        for (index, pattern) in self.patterns.iter().enumerate() {
            hits.extend(pattern.find_iter(text).map(|m| Hit {
                field: Some(index),
                start: m.start(),
                end: m.end(),
            }));
        }

        if let Some(stops) = &self.stops {
            hits.extend(stops.find_iter(text).map(|m| Hit {
                field: None,
                start: m.start(),
                end: m.end(),
            }));
        }

        // Earliest first; for equal starts the longer label wins.
        hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut kept: Vec<Hit> = Vec::with_capacity(hits.len());
        for hit in hits {
            if kept.last().is_none_or(|last| hit.start >= last.end) {
                kept.push(hit);
            }
        }
        kept
    }
}

/// Regex for a field's labels: either followed by a delimiter (optionally
/// after a parenthetical hint such as "(asthma, seizures)"), or standing at
/// the start of a line.
///
/// Both branches may start at the line start so an indented label with a
/// delimiter still consumes the delimiter.
fn field_pattern(labels: &[&str]) -> String {
    let labels = alternation(labels);
    format!(
        r"(?im)(?:(?:^[ \t]*)?\b(?:{labels})[ \t]*(?:\([^)}}\n]*[)}}][ \t]*)?[:;=?]|^[ \t]*(?:{labels})\b)"
    )
}

/// OCR-tolerant alternation of labels, longest first.
fn alternation(labels: &[&str]) -> String {
    let mut sorted: Vec<&str> = labels.to_vec();
    sorted.sort_by_key(|label| std::cmp::Reverse(label.len()));
    sorted
        .iter()
        .map(|label| fuzzy_label(label))
        .collect::<Vec<_>>()
        .join("|")
}

/// Turn a label into a pattern where commonly confused glyphs match each
/// other and word gaps may be missing.
fn fuzzy_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| word.chars().map(fuzzy_char).collect::<String>())
        .collect::<Vec<_>>()
        .join(r"[ \t]*")
}

fn fuzzy_char(c: char) -> String {
    match c.to_ascii_lowercase() {
        'o' | '0' => "[o0]".to_string(),
        'l' => "[l1i|]".to_string(),
        'i' => "[il1|]".to_string(),
        '1' => "[1il|]".to_string(),
        'e' => "[e3]".to_string(),
        's' => "[s5$]".to_string(),
        'a' => "[a@]".to_string(),
        'b' => "[b8]".to_string(),
        'g' => "[g9]".to_string(),
        'z' => "[z2]".to_string(),
        '\'' => "['’`]?".to_string(),
        other => regex::escape(other.encode_utf8(&mut [0u8; 4])),
    }
}

/// Cut a span to at most `max` characters.
fn clamp_chars(span: &str, max: usize) -> &str {
    match span.char_indices().nth(max) {
        Some((index, _)) => &span[..index],
        None => span,
    }
}

fn is_page_break(line: &str) -> bool {
    line.contains('\u{000C}') && line.trim().is_empty()
}

fn capture(span: &str, mode: CaptureMode) -> String {
    let mut lines = span.split('\n');
    let first = lines.next().unwrap_or("").trim();

    if mode == CaptureMode::Line {
        if !first.is_empty() {
            return first.to_string();
        }
        return match lines.next() {
            Some(line) if !is_page_break(line) => line.trim().to_string(),
            _ => String::new(),
        };
    }

    let mut collected: Vec<&str> = Vec::new();
    if !first.is_empty() {
        collected.push(first);
    }

    for line in lines {
        if is_page_break(line) {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            if collected.is_empty() {
                continue;
            }
            break;
        }
        collected.push(line);
    }

    let separator = if mode == CaptureMode::Joined { " " } else { "\n" };
    collected.join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::patterns::keep;
    use pretty_assertions::assert_eq;

    static FIELDS: [FieldSpec; 3] = [
        FieldSpec {
            name: "name",
            labels: &["patient name", "name"],
            mode: CaptureMode::Line,
            refine: keep,
        },
        FieldSpec {
            name: "address",
            labels: &["address"],
            mode: CaptureMode::Joined,
            refine: keep,
        },
        FieldSpec {
            name: "notes",
            labels: &["notes"],
            mode: CaptureMode::Block,
            refine: keep,
        },
    ];

    fn anchors() -> AnchorSet {
        AnchorSet::compile(&FIELDS, &["date"]).unwrap()
    }

    #[test]
    fn test_first_occurrence_wins() {
        let raw = anchors().scan("Name: Jane\nName: John", 256);
        assert_eq!(raw.get("name").map(String::as_str), Some("Jane"));
    }

    #[test]
    fn test_value_stops_at_next_anchor_on_same_line() {
        let raw = anchors().scan("Patient Name: Jane Doe Address: 12 Elm St", 256);
        assert_eq!(raw["name"], "Jane Doe");
        assert_eq!(raw["address"], "12 Elm St");
    }

    #[test]
    fn test_stop_label_ends_capture() {
        let raw = anchors().scan("Name: Marta Sharapova Date: 5/11/2022", 256);
        assert_eq!(raw["name"], "Marta Sharapova");
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn test_ocr_confusions_tolerated() {
        let raw = anchors().scan("NAM3: Jane\nAddre5s; 12 Elm St\nN0TES = call back", 256);
        assert_eq!(raw["name"], "Jane");
        assert_eq!(raw["address"], "12 Elm St");
        assert_eq!(raw["notes"], "call back");
    }

    #[test]
    fn test_joined_and_block_modes() {
        let text = "Address: 12 Elm St\nSpringfield, IL\n\nNotes:\nfirst line\nsecond line\n\nfooter";
        let raw = anchors().scan(text, 256);
        assert_eq!(raw["address"], "12 Elm St Springfield, IL");
        assert_eq!(raw["notes"], "first line\nsecond line");
    }

    #[test]
    fn test_page_break_ends_multiline_capture() {
        let text = "Notes: page one note\n\u{c}\npage two text";
        let raw = anchors().scan(text, 256);
        assert_eq!(raw["notes"], "page one note");
    }

    #[test]
    fn test_line_mode_takes_next_line_when_label_stands_alone() {
        let raw = anchors().scan("Name:\nJane Doe\n", 256);
        assert_eq!(raw["name"], "Jane Doe");
    }

    #[test]
    fn test_empty_capture_distinct_from_missing() {
        let raw = anchors().scan("Name:\nAddress: 12 Elm St", 256);
        assert_eq!(raw.get("name").map(String::as_str), Some(""));
        assert!(!raw.contains_key("notes"));
    }

    #[test]
    fn test_span_is_clamped() {
        let text = format!("Notes: {}", "x".repeat(500));
        let raw = anchors().scan(&text, 20);
        assert_eq!(raw["notes"].chars().count(), 19);
    }

    #[test]
    fn test_label_inside_prose_is_not_an_anchor() {
        let raw = anchors().scan("Please write your name and address below", 256);
        assert!(raw.is_empty());
    }

    #[test]
    fn test_label_at_line_start_without_colon() {
        let raw = anchors().scan("Name Jane Doe\nAddress 12 Elm St", 256);
        assert_eq!(raw["name"], "Jane Doe");
        assert_eq!(raw["address"], "12 Elm St");
    }

    #[test]
    fn test_indented_label_consumes_delimiter() {
        let text = "  Name: Jane\n\tAddress; 12 Elm St\n  Notes (optional}:\ncall back";
        let raw = anchors().scan(text, 256);
        assert_eq!(raw["name"], "Jane");
        assert_eq!(raw["address"], "12 Elm St");
        assert_eq!(raw["notes"], "call back");
    }

    #[test]
    fn test_parenthetical_hint_before_delimiter() {
        let raw = anchors().scan("List your Notes (asthma, seizures}:\nMigraine", 256);
        assert_eq!(raw["notes"], "Migraine");
    }
}
