#![forbid(unsafe_code)]

//! Length-preserving neutralization of non-prose syntax
//!
//! Rendered markup loses its connection to source offsets, so alerts are
//! located by searching the source for the matched text. These passes hide
//! syntax that must never receive a match (fence info strings, link labels,
//! list numbers, code) behind a run of placeholder bytes of exactly the
//! same length. Every offset in the output is valid in the input.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Placeholder byte written over neutralized spans
pub const PLACEHOLDER: char = '*';

static FENCE_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t>]*(?:`{3,}|~{3,}))([^`\n][^\n]*)$").expect("valid fence regex")
});
static LINK_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\[([^\]\n]+)\]").expect("valid link-ref regex"));
static LINK_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]:").expect("valid link-def regex"));
static NUMERIC_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)(\d+\.)").expect("valid list regex"));
static ADOC_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[source,([^\]\n]*)\]").expect("valid source regex"));
static ADOC_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*// )(.+)$").expect("valid comment regex"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

fn blank(s: &str) -> String {
    s.bytes()
        .map(|b| if b == b'\n' { '\n' } else { PLACEHOLDER })
        .collect()
}

/// Replace capture group `group` of every match, keeping the rest
fn blank_group(re: &Regex, text: &str, group: usize) -> String {
    re.replace_all(text, |caps: &Captures| {
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("");
        match caps.get(group) {
            Some(g) => {
                let start = g.start() - caps.get(0).map(|m| m.start()).unwrap_or(0);
                let end = start + g.len();
                format!("{}{}{}", &whole[..start], blank(g.as_str()), &whole[end..])
            }
            None => whole.to_string(),
        }
    })
    .into_owned()
}

/// Neutralize Markdown: fence info strings, link references and
/// definitions, ordered-list markers
pub fn markdown(text: &str) -> String {
    let body = blank_group(&FENCE_INFO, text, 2);
    let body = blank_group(&LINK_REF, &body, 1);
    let body = blank_group(&LINK_DEF, &body, 1);
    blank_group(&NUMERIC_LIST, &body, 2)
}

/// Neutralize AsciiDoc: `[source,lang]` attributes and line comments
pub fn asciidoc(text: &str) -> String {
    let body = blank_group(&ADOC_SOURCE, text, 1);
    blank_group(&ADOC_COMMENT, &body, 2)
}

/// Hide HTML tags so attribute values never receive matches
pub fn html(text: &str) -> String {
    HTML_TAG
        .replace_all(text, |caps: &Captures| blank(&caps[0]))
        .into_owned()
}

/// Hide fenced code blocks and inline code spans in Markdown
pub fn mask_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut fence: Option<(char, usize)> = None;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start_matches([' ', '\t', '>']);
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~');
        let run = marker
            .map(|m| trimmed.chars().take_while(|c| *c == m).count())
            .unwrap_or(0);

        match fence {
            Some((m, len)) => {
                if marker == Some(m) && run >= len && trimmed[run..].trim().is_empty() {
                    fence = None;
                    out.push_str(line);
                } else {
                    out.push_str(&blank(line));
                }
            }
            None if run >= 3 => {
                fence = marker.map(|m| (m, run));
                out.push_str(line);
            }
            None => out.push_str(&mask_inline_code(line)),
        }
    }
    out
}

/// Hide the contents of backtick code spans within one line
fn mask_inline_code(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open_start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - open_start;
        let content_start = i;

        let mut j = i;
        let mut close = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let s = j;
                while j < bytes.len() && bytes[j] == b'`' {
                    j += 1;
                }
                if j - s == run {
                    close = Some(s);
                    break;
                }
            } else {
                j += 1;
            }
        }

        if let Some(close_start) = close {
            out.push_str(&line[copied..content_start]);
            out.push_str(&blank(&line[content_start..close_start]));
            copied = close_start;
            i = close_start + run;
        }
    }
    out.push_str(&line[copied..]);
    out
}
