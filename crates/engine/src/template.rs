//! Text templates with `{placeholder}` slots.
//!
//! A slot is a `{` followed by one or more identifier characters
//! (`A-Z a-z 0-9 _`) and a closing `}`. Any other brace is literal text, so
//! prose containing stray braces renders unchanged.

use std::fmt;

/// Slot for the text flowing into a node.
pub const INPUT: &str = "input";
/// Slot for the original run query.
pub const QUERY: &str = "query";
/// Slot for the final output (report templates only).
pub const OUTPUT: &str = "output";
/// Slot for a governance rejection reason (block notices only).
pub const REASON: &str = "reason";
/// Slot for a failure description (continue placeholders only).
pub const ERROR: &str = "error";

/// Slot names that can never be used as node labels.
pub const RESERVED: [&str; 5] = [INPUT, QUERY, OUTPUT, REASON, ERROR];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

/// A parsed template.
#[derive(Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Whether `name` can appear inside a slot.
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let segments = parse(&source);
        Self { source, segments }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Slot names in order of appearance (repeats included).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Fill every slot from `lookup`. Slots with no value render empty.
    pub fn render<F>(&self, mut lookup: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => {
                    if let Some(value) = lookup(name) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

fn parse(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = source;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_identifier(&after[..close]) => {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Slot(after[..close].to_string()));
                rest = &after[close + 1..];
            }
            _ => {
                text.push('{');
                rest = after;
            }
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Template").field(&self.source).finish()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_slots() {
        let t = Template::new("Draft a technical architecture for: {input}");
        let out = t.render(|name| (name == "input").then(|| "zero trust".to_string()));
        assert_eq!(out, "Draft a technical architecture for: zero trust");
    }

    #[test]
    fn lists_placeholders_in_order() {
        let t = Template::new("{query} then {draft} then {query}");
        let names: Vec<&str> = t.placeholders().collect();
        assert_eq!(names, vec!["query", "draft", "query"]);
    }

    #[test]
    fn stray_braces_are_literal() {
        let t = Template::new("json {\"a\": 1} and {not closed and {} and {input}");
        let names: Vec<&str> = t.placeholders().collect();
        assert_eq!(names, vec!["input"]);
        let out = t.render(|_| Some("X".into()));
        assert_eq!(out, "json {\"a\": 1} and {not closed and {} and X");
    }

    #[test]
    fn missing_values_render_empty() {
        let t = Template::new("[{label}]");
        assert_eq!(t.render(|_| None), "[]");
    }

    #[test]
    fn unicode_text_survives() {
        let t = Template::new("### 🛡️ {input} ✅");
        assert_eq!(t.render(|_| Some("ok".into())), "### 🛡️ ok ✅");
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("architect_draft"));
        assert!(is_identifier("step2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("has space"));
        assert!(!is_identifier("dash-ed"));
    }
}
