#![forbid(unsafe_code)]

//! Per-file lint pipeline
//!
//! A file is turned into scoped [`Block`]s by one of four paths, chosen by
//! its normalized extension:
//!
//! - a registered blueprint (structured data, or code with custom queries)
//! - comment extraction for source code
//! - rendering for markup, located back into the source afterwards
//! - a single block for plain text
//!
//! Every block goes to the rules whose scope matches, and the block-local
//! alerts are moved into file coordinates before the next block is read.

use crate::blueprint::{Blueprint, Engine};
use crate::code::{self, LanguageRegistry, QuerySpec};
use crate::config::Config;
use crate::error::{ConfigError, LintError};
use crate::model::{Block, File};
use crate::position::{self, Anchor, Cursor, Locator};
use crate::rules::RuleSet;
use crate::transform::{self, HtmlWalker, Renderer, Renderers, patterns};
use crate::types::{Format, Selector};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Lints files against one rule set
///
/// Everything here is read-only after construction, so a single linter is
/// shared by every worker thread.
#[derive(Debug)]
pub struct Linter {
    config: Arc<Config>,
    rules: Arc<RuleSet>,
    languages: Arc<LanguageRegistry>,
    renderers: Renderers,
    blueprints: HashMap<String, Arc<Blueprint>>,
}

impl Linter {
    /// Build a linter, loading every blueprint the configuration names
    pub fn new(config: Config, rules: RuleSet) -> Result<Self, ConfigError> {
        let mut blueprints = HashMap::new();
        for name in config.blueprints.values() {
            if blueprints.contains_key(name) {
                continue;
            }
            let path = ["yml", "yaml"]
                .iter()
                .find_map(|ext| config.find_asset("blueprints", &format!("{name}.{ext}")))
                .ok_or_else(|| ConfigError::Blueprint {
                    name: name.clone(),
                    message: "not found on the styles path".to_string(),
                })?;
            blueprints.insert(name.clone(), Arc::new(Blueprint::load(name, path)?));
        }

        let renderers = Renderers::new(&config.asciidoctor);
        Ok(Linter {
            config: Arc::new(config),
            rules: Arc::new(rules),
            languages: Arc::new(LanguageRegistry::new()),
            renderers,
            blueprints,
        })
    }

    pub fn with_languages(mut self, languages: LanguageRegistry) -> Self {
        self.languages = Arc::new(languages);
        self
    }

    pub fn with_renderers(mut self, renderers: Renderers) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    /// Read and lint a file from disk
    pub fn lint_file(&self, path: &Path) -> Result<File, LintError> {
        let content = std::fs::read_to_string(path)?;
        self.lint_string(path, &content)
    }

    /// Lint `content` as if it were the file at `path`
    pub fn lint_string(&self, path: &Path, content: &str) -> Result<File, LintError> {
        let mut file = File::new(path, content, &self.config.formats);
        self.dispatch(&mut file)?;

        let floor = self.rules.min_level();
        file.alerts.retain(|a| a.level >= floor);
        file.sort_alerts();
        Ok(file)
    }

    fn dispatch(&self, file: &mut File) -> Result<(), LintError> {
        if let Some(name) = self.config.blueprint_for(&file.path) {
            let blueprint = self
                .blueprints
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::Blueprint {
                    name: name.to_string(),
                    message: "not loaded".to_string(),
                })?;
            debug!(path = %file.path.display(), blueprint = name, "linting with blueprint");
            return match blueprint.engine {
                Engine::TreeSitter => self.lint_code(file, Some(blueprint.queries().as_slice())),
                Engine::Dasel | Engine::Command => self.lint_data(file, &blueprint),
            };
        }

        let format = Format::from_ext(&file.normed_ext);
        debug!(path = %file.path.display(), ?format, "dispatching");
        match format {
            Format::Data => {
                debug!(path = %file.path.display(), "structured file without a blueprint; skipping");
                Ok(())
            }
            Format::Code => self.lint_code(file, None),
            other => self.lint_format(file, other, ""),
        }
    }

    /// Lint the file's current content as `format`
    ///
    /// `scope` is inserted after `text` in every block scope; data values
    /// use it to carry their blueprint step name.
    fn lint_format(&self, file: &mut File, format: Format, scope: &str) -> Result<(), LintError> {
        match format {
            Format::Plain | Format::Code | Format::Data => self.lint_plain(file, scope),
            markup => self.lint_markup(file, markup, scope),
        }
    }

    fn scope(&self, file: &File, parts: &[&str]) -> String {
        std::iter::once("text")
            .chain(parts.iter().copied().filter(|p| !p.is_empty()))
            .chain(std::iter::once(file.normed_ext.as_str()))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn lint_plain(&self, file: &mut File, scope: &str) -> Result<(), LintError> {
        let block = Block::new(file.content(), self.scope(file, &[scope]));
        self.lint_block(file, &block)
    }

    fn renderer(&self, format: Format) -> Option<&Arc<dyn Renderer>> {
        match format {
            Format::Markdown => Some(&self.renderers.markdown),
            Format::Mdx => Some(&self.renderers.mdx),
            Format::AsciiDoc => Some(&self.renderers.asciidoc),
            Format::Rst => Some(&self.renderers.rst),
            Format::Org => Some(&self.renderers.org),
            _ => None,
        }
    }

    fn lint_markup(&self, file: &mut File, format: Format, scope: &str) -> Result<(), LintError> {
        let content = file.content().to_string();
        let prepared = patterns::apply_patterns(&self.config, &file.path, format, &content)?;

        let html = match (format, self.renderer(format)) {
            (Format::AsciiDoc, Some(renderer)) => transform::sanitize_asciidoc(
                &renderer.render(&transform::sanitize_asciidoc(&prepared))?,
            ),
            (_, Some(renderer)) => renderer.render(&prepared)?,
            (_, None) => prepared,
        };

        let ext = if scope.is_empty() {
            file.normed_ext.clone()
        } else {
            format!("{scope}.{}", file.normed_ext)
        };
        let walker = HtmlWalker::new(
            &self.config.vellum.skipped_scopes,
            &self.config.vellum.ignored_scopes,
            &ext,
        );
        let blocks = walker.walk(&html);

        let searchable = match format {
            Format::Markdown | Format::Mdx => {
                transform::searchable(format, &patterns::front_matter(&content))
            }
            other => transform::searchable(other, &content),
        };
        let path = file.path.clone();
        let mut locator = Locator::new(&content, searchable, &path);

        for block in blocks {
            locator.enter_block(&block.text);
            let last = file.alerts.len();
            self.lint_block(file, &block)?;
            for alert in &mut file.alerts[last..] {
                locator.place(alert)?;
            }
        }
        Ok(())
    }

    fn lint_code(&self, file: &mut File, queries: Option<&[QuerySpec]>) -> Result<(), LintError> {
        let content = file.content().to_string();
        let Some(extraction) = code::comments_for(
            &content,
            &file.normed_ext,
            &self.languages,
            queries,
            self.config.comment_delimiters_for(&file.path),
        )?
        else {
            debug!(path = %file.path.display(), "no comment syntax for this extension; skipping");
            return Ok(());
        };

        for comment in extraction.comments {
            let block = Block::new(comment.text, format!("{}.{}", comment.scope, file.normed_ext))
                .with_source(comment.source)
                .at(comment.line, comment.offset);
            let columns = extraction
                .padding
                .map(|padding| position::padded_columns(&block, padding))
                .unwrap_or_default();
            let last = file.alerts.len();
            self.lint_block(file, &block)?;
            position::remap_anchored(
                &mut file.alerts[last..],
                &block.text,
                Anchor {
                    line: block.line,
                    column: block.column,
                },
                &columns,
                &content,
                &file.path,
            )?;
        }
        Ok(())
    }

    fn lint_data(&self, file: &mut File, blueprint: &Blueprint) -> Result<(), LintError> {
        let content = file.content().to_string();
        let extracted = blueprint.apply(&content, &file.real_ext, &file.path)?;

        for scoped in extracted {
            let mut cursor = Cursor::default();
            for value in scoped.values {
                if value.trim().is_empty() {
                    continue;
                }
                let last = file.alerts.len();
                file.sub_lint(&value, |f| self.lint_format(f, scoped.format, &scoped.scope))?;
                cursor = position::remap_value(
                    &mut file.alerts[last..],
                    &value,
                    &content,
                    cursor,
                    &file.path,
                )?;
            }
        }
        Ok(())
    }

    /// True when every section of some ignored scope is in `scope`
    fn is_ignored(&self, scope: &str) -> bool {
        self.config
            .vellum
            .ignored_scopes
            .iter()
            .map(Selector::new)
            .any(|ignored| !ignored.sections().is_empty() && ignored.contains(scope))
    }

    /// Run every matching rule on `block`, then on its paragraphs and
    /// sentences when some rule asks for them
    ///
    /// Alerts are appended to `file.alerts` relative to `block.text`.
    fn lint_block(&self, file: &mut File, block: &Block) -> Result<(), LintError> {
        if self.is_ignored(&block.scope) {
            debug!(scope = %block.scope, "ignored scope");
            return Ok(());
        }
        self.run_rules(file, block)?;

        if block.scope.split('.').any(|s| s == "heading") {
            return Ok(());
        }
        let ext = block.scope.rsplit('.').next().unwrap_or("");
        if self.rules.has_scope("paragraph") {
            for (offset, paragraph) in paragraphs(&block.text) {
                self.run_sub_block(file, block, offset, paragraph, &format!("paragraph.{ext}"))?;
            }
        }
        if self.rules.has_scope("sentence") {
            for (offset, sentence) in block.text.split_sentence_bound_indices() {
                let trimmed = sentence.trim_start();
                let offset = offset + sentence.len() - trimmed.len();
                let trimmed = trimmed.trim_end();
                if trimmed.is_empty() {
                    continue;
                }
                self.run_sub_block(file, block, offset, trimmed, &format!("sentence.{ext}"))?;
            }
        }
        Ok(())
    }

    fn run_sub_block(
        &self,
        file: &mut File,
        parent: &Block,
        offset: usize,
        text: &str,
        scope: &str,
    ) -> Result<(), LintError> {
        let last = file.alerts.len();
        self.run_rules(file, &Block::new(text, scope))?;
        position::shift(&mut file.alerts[last..], &parent.text, offset);
        Ok(())
    }

    fn run_rules(&self, file: &mut File, block: &Block) -> Result<(), LintError> {
        for check in self.rules.iter() {
            if !check.definition().scope.matches(&block.scope) {
                continue;
            }
            let alerts = check.run(block, file)?;
            file.alerts.extend(alerts);
        }
        Ok(())
    }
}

/// Blank-line separated paragraphs with their byte offsets
fn paragraphs(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for chunk in text.split("\n\n") {
        let trimmed = chunk.trim_start_matches('\n');
        let start = offset + chunk.len() - trimmed.len();
        if !trimmed.trim().is_empty() {
            out.push((start, trimmed.trim_end()));
        }
        offset += chunk.len() + 2;
    }
    out
}
