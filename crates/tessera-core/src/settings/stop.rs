//! Single-string form of a stop-string list, as shown in and read from the form.
//!
//! Items are separated by `,`. Inside an item `\n`, `\t`, `\,` and `\\` stand
//! for newline, tab, comma and backslash, so any list survives a round trip
//! through a one-line text input.

pub fn join_form(stops: &[String]) -> String {
    stops
        .iter()
        .map(|s| escape(s))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a form value into stop strings. Empty items are dropped.
pub fn split_form(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => cur.push('\n'),
                Some('t') => cur.push('\t'),
                Some(',') => cur.push(','),
                Some('\\') => cur.push('\\'),
                Some(other) => {
                    cur.push('\\');
                    cur.push(other);
                }
                None => cur.push('\\'),
            },
            ',' => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            other => cur.push(other),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            ',' => out.push_str("\\,"),
            other => out.push(other),
        }
    }
    out
}
