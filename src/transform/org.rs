#![forbid(unsafe_code)]

//! A small native Org-mode to HTML converter
//!
//! Only the structure the HTML walker cares about is produced: headings,
//! paragraphs, list items, quotes, table cells and code. Everything else is
//! dropped or passed through as text.

use crate::error::LintError;
use crate::transform::render::Renderer;
use regex::Regex;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\*+)\s+(.*)$").expect("valid heading regex"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-+]|\d+[.)])\s+(.*)$").expect("valid list regex"));
static VERBATIM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\B)[=~]([^=~\n]+)[=~](?:\B|$)").expect("valid code regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]]+)\](?:\[([^\]]+)\])?\]").expect("valid link regex")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct OrgRenderer;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Inline markup: links keep their description, verbatim becomes `<code>`
fn inline(text: &str) -> String {
    let linked = LINK.replace_all(text, |caps: &regex::Captures| {
        caps.get(2)
            .or_else(|| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    });
    let escaped = escape(&linked);
    VERBATIM
        .replace_all(&escaped, |caps: &regex::Captures| {
            format!("<code>{}</code>", &caps[1])
        })
        .into_owned()
}

#[derive(PartialEq)]
enum Open {
    None,
    Paragraph,
    List,
}

impl Renderer for OrgRenderer {
    fn name(&self) -> &str {
        "org"
    }

    fn render(&self, text: &str) -> Result<String, LintError> {
        let mut out = String::new();
        let mut open = Open::None;
        let mut in_src = false;
        let mut in_quote = false;

        let close = |out: &mut String, open: &mut Open| {
            match open {
                Open::Paragraph => out.push_str("</p>\n"),
                Open::List => out.push_str("</ul>\n"),
                Open::None => {}
            }
            *open = Open::None;
        };

        for line in text.lines() {
            let trimmed = line.trim();
            let upper = trimmed.to_ascii_uppercase();

            if in_src {
                if upper.starts_with("#+END_SRC") || upper.starts_with("#+END_EXAMPLE") {
                    out.push_str("</code></pre>\n");
                    in_src = false;
                } else {
                    out.push_str(&escape(line));
                    out.push('\n');
                }
                continue;
            }

            if upper.starts_with("#+BEGIN_SRC") || upper.starts_with("#+BEGIN_EXAMPLE") {
                close(&mut out, &mut open);
                out.push_str("<pre><code>");
                in_src = true;
            } else if upper.starts_with("#+BEGIN_QUOTE") {
                close(&mut out, &mut open);
                out.push_str("<blockquote>\n");
                in_quote = true;
            } else if upper.starts_with("#+END_QUOTE") {
                close(&mut out, &mut open);
                if in_quote {
                    out.push_str("</blockquote>\n");
                    in_quote = false;
                }
            } else if trimmed.starts_with("#+") || trimmed == "#" || trimmed.starts_with("# ") {
                close(&mut out, &mut open);
            } else if trimmed.is_empty() {
                close(&mut out, &mut open);
            } else if let Some(caps) = HEADING.captures(line) {
                close(&mut out, &mut open);
                let level = caps[1].len().min(6);
                out.push_str(&format!("<h{level}>{}</h{level}>\n", inline(&caps[2])));
            } else if trimmed.starts_with('|') {
                close(&mut out, &mut open);
                if trimmed.starts_with("|-") {
                    continue;
                }
                out.push_str("<table><tr>");
                for cell in trimmed.trim_matches('|').split('|') {
                    out.push_str(&format!("<td>{}</td>", inline(cell.trim())));
                }
                out.push_str("</tr></table>\n");
            } else if let Some(caps) = LIST_ITEM.captures(line) {
                if open != Open::List {
                    close(&mut out, &mut open);
                    out.push_str("<ul>\n");
                    open = Open::List;
                }
                out.push_str(&format!("<li>{}</li>\n", inline(&caps[1])));
            } else {
                match open {
                    Open::Paragraph => out.push('\n'),
                    _ => {
                        close(&mut out, &mut open);
                        out.push_str("<p>");
                        open = Open::Paragraph;
                    }
                }
                out.push_str(&inline(trimmed));
            }
        }

        close(&mut out, &mut open);
        if in_src {
            out.push_str("</code></pre>\n");
        }
        if in_quote {
            out.push_str("</blockquote>\n");
        }
        Ok(out)
    }
}
