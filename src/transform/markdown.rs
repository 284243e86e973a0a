#![forbid(unsafe_code)]

//! In-process Markdown rendering via pulldown-cmark

use crate::error::LintError;
use crate::transform::render::Renderer;
use pulldown_cmark::{Options, Parser, html};

/// GitHub-flavoured Markdown to HTML; raw HTML passes through untouched
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        MarkdownRenderer { options }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MarkdownRenderer {
    fn name(&self) -> &str {
        "markdown"
    }

    fn render(&self, text: &str) -> Result<String, LintError> {
        let parser = Parser::new_ext(text, self.options);
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_gfm() {
        let html = MarkdownRenderer::new()
            .render("# Title\n\n| a | b |\n|---|---|\n| c | d |\n\n~~gone~~\n")
            .unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<td>c</td>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_code_fence_rendered_as_pre() {
        let html = MarkdownRenderer::new()
            .render("```json\n{\"json\": true}\n```\n")
            .unwrap();
        assert!(html.starts_with("<pre><code class=\"language-json\">"));
    }
}
