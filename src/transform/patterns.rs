#![forbid(unsafe_code)]

//! Pre-render source rewrites driven by configuration
//!
//! Front matter becomes a fenced block, custom comment delimiters become the
//! format's native ones, and configured token-ignore patterns are wrapped in
//! the format's inline-code syntax so the renderer marks them as code.

use crate::config::Config;
use crate::error::ConfigError;
use crate::types::Format;
use regex::Regex;
use std::path::Path;

/// Native comment delimiters for a markup format
fn default_delimiters(format: Format) -> Option<(&'static str, &'static str)> {
    match format {
        Format::Markdown | Format::Mdx | Format::Html => Some(("<!--", "-->")),
        Format::AsciiDoc => Some(("////\n", "\n////")),
        _ => None,
    }
}

/// Inline-code wrapping for a markup format
fn code_wrap(format: Format) -> Option<(&'static str, &'static str)> {
    match format {
        Format::Markdown | Format::Mdx => Some(("`", "`")),
        Format::Rst => Some(("``", "``")),
        Format::AsciiDoc => Some(("`+", "+`")),
        Format::Html => Some(("<code>", "</code>")),
        Format::Org => Some(("=", "=")),
        _ => None,
    }
}

/// Turn leading `---`/`+++` front matter into a fenced code block
///
/// The fence lines have the same length as the markers they replace.
pub fn front_matter(content: &str) -> String {
    let marker = if content.starts_with("---\n") || content.starts_with("---\r\n") {
        "---"
    } else if content.starts_with("+++\n") || content.starts_with("+++\r\n") {
        "+++"
    } else {
        return content.to_string();
    };

    let mut offset = 0;
    let mut out = String::with_capacity(content.len());
    for (idx, line) in content.split_inclusive('\n').enumerate() {
        if idx == 0 {
            out.push_str(&line.replacen(marker, "```", 1));
        } else if line.trim_end() == marker {
            out.push_str(&line.replacen(marker, "```", 1));
            out.push_str(&content[offset + line.len()..]);
            return out;
        } else {
            out.push_str(line);
        }
        offset += line.len();
    }
    // Unterminated front matter is left alone.
    content.to_string()
}

/// Apply every configured rewrite for `path` rendered as `format`
pub fn apply_patterns(
    config: &Config,
    path: &Path,
    format: Format,
    content: &str,
) -> Result<String, ConfigError> {
    let mut text = match format {
        Format::Markdown | Format::Mdx => front_matter(content),
        _ => content.to_string(),
    };

    if let Some((start, end)) = config.comment_delimiters_for(path) {
        if start.is_empty() || end.is_empty() {
            return Err(ConfigError::Validation(format!(
                "comment delimiters for '{}' must name both a start and an end delimiter",
                path.display()
            )));
        }
        if let Some((native_start, native_end)) = default_delimiters(format) {
            text = text.replace(start, native_start).replace(end, native_end);
        }
    }

    let ignores = config.token_ignores_for(path);
    if let (false, Some((open, close))) = (ignores.is_empty(), code_wrap(format)) {
        for pattern in ignores {
            let re = Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("Invalid token_ignores pattern '{pattern}': {e}"))
            })?;
            text = re
                .replace_all(&text, |caps: &regex::Captures| {
                    format!("{open}{}{close}", &caps[0])
                })
                .into_owned();
        }
    }

    Ok(text)
}
