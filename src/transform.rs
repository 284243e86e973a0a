//! Markup transformation
//!
//! Markup is rendered to HTML (in process for Markdown and Org, through an
//! external tool for AsciiDoc, MDX and reStructuredText) and walked into
//! scoped blocks. Alongside the rendered form, a neutralized copy of the
//! source is kept for locating alerts.

pub mod html;
pub mod markdown;
pub mod neutralize;
pub mod org;
pub mod patterns;
pub mod render;

pub use html::HtmlWalker;
pub use markdown::MarkdownRenderer;
pub use org::OrgRenderer;
pub use render::{CommandRenderer, Renderer, Renderers};

use crate::types::Format;

/// asciidoctor turns straight quotes into typographic ones; map both
/// sides to the same entities so rendered text can still be located
pub fn sanitize_asciidoc(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "&apos;")
        .replace('\u{201C}', "&#8220;")
        .replace('\u{201D}', "&#8221;")
        .replace("&#8217;", "&apos;")
        .replace("&rsquo;", "&apos;")
}

/// The neutralized source used to locate alerts for `format`
pub fn searchable(format: Format, content: &str) -> String {
    match format {
        Format::Markdown | Format::Mdx => neutralize::mask_code(&neutralize::markdown(content)),
        Format::AsciiDoc => neutralize::asciidoc(content),
        Format::Html => neutralize::html(content),
        _ => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_asciidoc_quotes() {
        assert_eq!(
            sanitize_asciidoc("It\u{2019}s \u{201C}quoted\u{201D} &rsquo;"),
            "It&apos;s &#8220;quoted&#8221; &apos;"
        );
    }

    #[test]
    fn test_searchable_preserves_length() {
        let md = "```json\nx\n```\n\n1. Use `json` here\n";
        let out = searchable(Format::Markdown, md);
        assert_eq!(out.len(), md.len());
        assert_eq!(out.matches("json").count(), 0);
    }
}
