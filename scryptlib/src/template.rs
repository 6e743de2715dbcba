//! Placeholder templates.
//!
//! The compiler emits contract ASM with `$slot` placeholders, one per scalar constructor slot. A slot
//! name is an identifier followed by any mix of `[index]` and `.field` selectors, e.g. `$p.keys[1]`.
//! The template is tokenized once; substitution then works per placeholder, so `$x` never matches
//! the prefix of `$x2`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmTemplate {
    segments: Vec<Segment>,
    slots: BTreeSet<String>,
}

impl AsmTemplate {
    pub fn parse(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut segments = Vec::new();
        let mut slots = BTreeSet::new();
        let mut text_start = 0;
        let mut pos = 0;

        while pos < bytes.len() {
            if bytes[pos] != b'$' {
                pos += 1;
                continue;
            }
            let name_end = scan_slot_name(bytes, pos + 1);
            if name_end == pos + 1 {
                pos += 1;
                continue;
            }
            if text_start < pos {
                segments.push(Segment::Text(text[text_start..pos].to_owned()));
            }
            let name = text[pos + 1..name_end].to_owned();
            slots.insert(name.clone());
            segments.push(Segment::Slot(name));
            pos = name_end;
            text_start = pos;
        }
        if text_start < bytes.len() {
            segments.push(Segment::Text(text[text_start..].to_owned()));
        }

        Self { segments, slots }
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.contains(name)
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(String::as_str)
    }

    pub fn is_resolved(&self) -> bool {
        self.slots.is_empty()
    }

    /// Replaces every placeholder that has a value; the others are kept verbatim for later passes.
    pub fn substitute(&self, values: &HashMap<String, String>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('$');
                        out.push_str(name);
                    }
                },
            }
        }
        out
    }
}

impl fmt::Display for AsmTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.substitute(&HashMap::new()))
    }
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn scan_ident(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() && is_ident_byte(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn scan_slot_name(bytes: &[u8], start: usize) -> usize {
    let mut pos = scan_ident(bytes, start);
    if pos == start {
        return start;
    }
    loop {
        match bytes.get(pos) {
            Some(b'[') => {
                let digits_end = {
                    let mut end = pos + 1;
                    while end < bytes.len() && bytes[end].is_ascii_digit() {
                        end += 1;
                    }
                    end
                };
                if digits_end == pos + 1 || bytes.get(digits_end) != Some(&b']') {
                    return pos;
                }
                pos = digits_end + 1;
            }
            Some(b'.') => {
                let field_end = scan_ident(bytes, pos + 1);
                if field_end == pos + 1 {
                    return pos;
                }
                pos = field_end;
            }
            _ => return pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn indexes_array_and_struct_slots() {
        let template = AsmTemplate::parse("$x $arr[0] $arr[1] OP_ADD $p.age $p.keys[1] OP_EQUAL");
        assert_eq!(template.slots().collect::<Vec<_>>(), vec!["arr[0]", "arr[1]", "p.age", "p.keys[1]", "x"]);
        assert!(template.has_slot("p.keys[1]"));
        assert!(!template.has_slot("p"));
    }

    #[test]
    fn longest_slot_wins() {
        let template = AsmTemplate::parse("$x $x2 $x");
        let rendered = template.substitute(&values(&[("x", "OP_1"), ("x2", "OP_2")]));
        assert_eq!(rendered, "OP_1 OP_2 OP_1");
    }

    #[test]
    fn unbound_slots_survive_substitution() {
        let template = AsmTemplate::parse("$a OP_DROP $later");
        assert_eq!(template.substitute(&values(&[("a", "01")])), "01 OP_DROP $later");
        assert_eq!(template.to_string(), "$a OP_DROP $later");
        assert!(!template.is_resolved());
    }

    #[test]
    fn stray_dollar_and_dangling_selectors_are_text() {
        let template = AsmTemplate::parse("$ $a[ $b. $c[1]x");
        assert_eq!(template.slots().collect::<Vec<_>>(), vec!["a", "b", "c[1]"]);
        let rendered = template.substitute(&values(&[("a", "A"), ("b", "B"), ("c[1]", "C")]));
        assert_eq!(rendered, "$ A[ B. Cx");
    }
}
