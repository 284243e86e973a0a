#![forbid(unsafe_code)]

//! HTML tokenizing and block extraction
//!
//! Every markup format is rendered to HTML and then walked here. The walker
//! emits one [`Block`] per prose-bearing element, scoped by where it sits
//! (`text.heading.h2.md`, `text.list.md`, `text.table.cell.md`, ...).

use crate::model::Block;
use std::collections::HashSet;

/// One HTML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
    Text(String),
}

const RAW_TEXT: &[&str] = &["script", "style"];
const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const BLOCK: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "dl", "dt", "dd", "blockquote",
    "table", "thead", "tbody", "tr", "td", "th", "div", "section", "article", "aside", "header",
    "footer", "nav", "main", "caption", "figcaption", "figure", "pre", "hr", "br", "details",
    "summary", "body", "html", "head", "title", "script", "style",
];

/// Decode the character references we're likely to meet in rendered output
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                "rsquo" => Some('\u{2019}'),
                "lsquo" => Some('\u{2018}'),
                "rdquo" => Some('\u{201D}'),
                "ldquo" => Some('\u{201C}'),
                "mdash" => Some('\u{2014}'),
                "ndash" => Some('\u{2013}'),
                "hellip" => Some('\u{2026}'),
                "copy" => Some('\u{A9}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_attrs(src: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() || c == '/' {
            chars.next();
            continue;
        }
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '/' {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        let name = src[start..end].to_ascii_lowercase();
        let mut value = String::new();
        if let Some(&(_, '=')) = chars.peek() {
            chars.next();
            match chars.peek().copied() {
                Some((i, q)) if q == '"' || q == '\'' => {
                    chars.next();
                    let vstart = i + 1;
                    let mut vend = vstart;
                    for (j, c) in chars.by_ref() {
                        if c == q {
                            break;
                        }
                        vend = j + c.len_utf8();
                    }
                    value = decode_entities(&src[vstart..vend]);
                }
                Some((i, _)) => {
                    let mut vend = i;
                    while let Some(&(j, c)) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        vend = j + c.len_utf8();
                        chars.next();
                    }
                    value = decode_entities(&src[i..vend]);
                }
                None => {}
            }
        }
        if !name.is_empty() {
            attrs.push((name, value));
        }
    }
    attrs
}

/// Split HTML into tokens; comments, doctypes and processing instructions
/// are dropped and raw-text elements yield their content as one token
pub fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(decode_entities(rest)));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(decode_entities(&rest[..lt])));
            rest = &rest[lt..];
        }

        if let Some(body) = rest.strip_prefix("<!--") {
            rest = body.find("-->").map(|i| &body[i + 3..]).unwrap_or("");
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map(|i| &rest[i + 1..]).unwrap_or("");
            continue;
        }

        let Some(gt) = rest.find('>') else {
            tokens.push(Token::Text(decode_entities(rest)));
            break;
        };
        let inner = &rest[1..gt];
        rest = &rest[gt + 1..];

        if let Some(name) = inner.strip_prefix('/') {
            tokens.push(Token::End(name.trim().to_ascii_lowercase()));
            continue;
        }

        let name_end = inner
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(inner.len());
        let name = inner[..name_end].to_ascii_lowercase();
        if name.is_empty() || !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            tokens.push(Token::Text(decode_entities(&format!("<{inner}>"))));
            continue;
        }
        let self_closing = inner.trim_end().ends_with('/') || VOID.contains(&name.as_str());
        let attrs = parse_attrs(&inner[name_end..]);
        let raw = RAW_TEXT.contains(&name.as_str());
        tokens.push(Token::Start {
            name: name.clone(),
            attrs,
            self_closing,
        });

        if raw && !self_closing {
            let close = format!("</{name}");
            let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
            if end > 0 {
                tokens.push(Token::Text(rest[..end].to_string()));
            }
            rest = &rest[end..];
        }
    }
    tokens
}

/// Walks rendered HTML and produces scoped blocks
#[derive(Debug, Clone)]
pub struct HtmlWalker {
    skipped: HashSet<String>,
    ignored: HashSet<String>,
    ext: String,
}

impl HtmlWalker {
    /// `skipped` tags lose their whole subtree, `ignored` inline tags
    /// contribute no text, and `ext` is appended to every scope
    pub fn new(skipped: &[String], ignored: &[String], ext: &str) -> Self {
        HtmlWalker {
            skipped: skipped.iter().map(|s| s.to_ascii_lowercase()).collect(),
            ignored: ignored.iter().map(|s| s.to_ascii_lowercase()).collect(),
            ext: ext.trim_start_matches('.').to_string(),
        }
    }

    fn scope(&self, stack: &[String]) -> String {
        let mut parts = vec!["text".to_string()];
        if stack.iter().any(|t| t == "blockquote") {
            parts.push("blockquote".to_string());
        }
        let specific = stack.iter().rev().find_map(|t| match t.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(format!("heading.{t}")),
            "li" | "dt" | "dd" => Some("list".to_string()),
            "th" => Some("table.header".to_string()),
            "td" => Some("table.cell".to_string()),
            "caption" | "figcaption" => Some("caption".to_string()),
            _ => None,
        });
        parts.extend(specific);
        if !self.ext.is_empty() {
            parts.push(self.ext.clone());
        }
        parts.join(".")
    }

    fn flush(&self, buffer: &mut String, stack: &[String], blocks: &mut Vec<Block>) {
        let text = buffer.trim();
        if !text.is_empty() {
            blocks.push(Block::new(text, self.scope(stack)));
        }
        buffer.clear();
    }

    pub fn walk(&self, html: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut buffer = String::new();
        let mut skip_depth = 0usize;
        let mut ignore_depth = 0usize;

        for token in tokenize(html) {
            match token {
                Token::Start {
                    name,
                    attrs,
                    self_closing,
                } => {
                    if skip_depth > 0 {
                        if !self_closing {
                            skip_depth += 1;
                            stack.push(name);
                        }
                        continue;
                    }
                    if name == "img" {
                        if let Some((_, alt)) = attrs.iter().find(|(k, _)| k == "alt")
                            && !alt.trim().is_empty()
                        {
                            let scope = format!("text.alt.{}", self.ext);
                            blocks.push(Block::new(alt.trim(), scope.trim_end_matches('.')));
                        }
                        continue;
                    }
                    if name == "br" {
                        buffer.push('\n');
                        continue;
                    }
                    if BLOCK.contains(&name.as_str()) {
                        self.flush(&mut buffer, &stack, &mut blocks);
                    }
                    if self_closing {
                        continue;
                    }
                    if self.skipped.contains(&name) || RAW_TEXT.contains(&name.as_str()) {
                        skip_depth = 1;
                        stack.push(name);
                        continue;
                    }
                    if self.ignored.contains(&name) {
                        ignore_depth += 1;
                    }
                    stack.push(name);
                }
                Token::End(name) => {
                    let Some(pos) = stack.iter().rposition(|t| *t == name) else {
                        continue;
                    };
                    if skip_depth > 0 {
                        skip_depth = skip_depth.saturating_sub(stack.len() - pos);
                        stack.truncate(pos);
                        continue;
                    }
                    if BLOCK.contains(&name.as_str()) {
                        self.flush(&mut buffer, &stack, &mut blocks);
                    }
                    for closed in stack.drain(pos..) {
                        if self.ignored.contains(&closed) {
                            ignore_depth = ignore_depth.saturating_sub(1);
                        }
                    }
                }
                Token::Text(text) => {
                    if skip_depth == 0 && ignore_depth == 0 {
                        buffer.push_str(&text);
                    }
                }
            }
        }
        self.flush(&mut buffer, &stack, &mut blocks);
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker() -> HtmlWalker {
        HtmlWalker::new(
            &["script".into(), "style".into(), "pre".into(), "figure".into()],
            &["code".into(), "tt".into()],
            "md",
        )
    }

    fn scopes(blocks: &[Block]) -> Vec<(&str, &str)> {
        blocks
            .iter()
            .map(|b| (b.scope.as_str(), b.text.as_str()))
            .collect()
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("<p class=\"x\">A &amp; B<br/></p><!-- hidden -->");
        assert_eq!(
            tokens,
            vec![
                Token::Start {
                    name: "p".into(),
                    attrs: vec![("class".into(), "x".into())],
                    self_closing: false
                },
                Token::Text("A & B".into()),
                Token::Start {
                    name: "br".into(),
                    attrs: vec![],
                    self_closing: true
                },
                Token::End("p".into()),
            ]
        );
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#8217; &#x41; &bogus; &"), "a <b> \u{2019} A &bogus; &");
    }

    #[test]
    fn test_walk_scopes() {
        let html = "<h2>Install <em>now</em></h2>\n<p>Run the <code>vellum</code> tool.</p>\n<ul>\n<li>First item</li>\n</ul>\n<blockquote>\n<p>Quoted text</p>\n</blockquote>\n<table><tr><th>Head</th></tr><tr><td>Cell</td></tr></table>";
        let blocks = walker().walk(html);
        assert_eq!(
            scopes(&blocks),
            vec![
                ("text.heading.h2.md", "Install now"),
                ("text.md", "Run the  tool."),
                ("text.list.md", "First item"),
                ("text.blockquote.md", "Quoted text"),
                ("text.table.header.md", "Head"),
                ("text.table.cell.md", "Cell"),
            ]
        );
    }

    #[test]
    fn test_skipped_tags_drop_content() {
        let html = "<pre><code class=\"language-json\">{\"json\": 1}\n</code></pre>\n<p>After</p><script>var x = '<p>no</p>';</script>";
        let blocks = walker().walk(html);
        assert_eq!(scopes(&blocks), vec![("text.md", "After")]);
    }

    #[test]
    fn test_nested_list_and_alt_text() {
        let html = "<ul><li>Outer<ul><li>Inner</li></ul></li></ul><p><img src=\"a.png\" alt=\"A diagram\"> Caption</p>";
        let blocks = walker().walk(html);
        assert_eq!(
            scopes(&blocks),
            vec![
                ("text.list.md", "Outer"),
                ("text.list.md", "Inner"),
                ("text.alt.md", "A diagram"),
                ("text.md", "Caption"),
            ]
        );
    }
}
