#![forbid(unsafe_code)]

//! Assembles the active rule set for a run
//!
//! [`RuleManager`] accumulates definitions from the built-in style, the
//! configured styles and individually referenced rules, applies the
//! configuration and the rule filter, then freezes everything into a
//! [`RuleSet`] that the linter shares across workers.

use super::builtin::{self, BUILTIN_STYLE};
use super::checks::{self, Check, NlpProvider};
use super::definition::Definition;
use super::filter::{self, Filter};
use crate::config::Config;
use crate::error::{ConfigError, RuleError, VellumError};
use crate::types::Level;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// The frozen, filtered rules of one run
pub struct RuleSet {
    rules: BTreeMap<String, Arc<dyn Check>>,
    scopes: BTreeSet<String>,
    needs_tagging: bool,
    min_level: Level,
}

impl RuleSet {
    /// Base scope tokens (`text`, `heading`, `sentence`, ...) the rules use
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn has_scope(&self, base: &str) -> bool {
        self.scopes.contains(base)
    }

    /// True when some rule needs part-of-speech tags
    pub fn needs_tagging(&self) -> bool {
        self.needs_tagging
    }

    /// Alerts below this level are dropped
    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Check>> {
        self.rules.get(name)
    }

    /// Rules in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Check>> {
        self.rules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("scopes", &self.scopes)
            .field("needs_tagging", &self.needs_tagging)
            .field("min_level", &self.min_level)
            .finish()
    }
}

/// Builder for a [`RuleSet`]
pub struct RuleManager<'a> {
    config: &'a Config,
    definitions: BTreeMap<String, Definition>,
    styles: BTreeSet<String>,
    nlp: Option<Arc<dyn NlpProvider>>,
    filter: Option<String>,
}

impl<'a> RuleManager<'a> {
    pub fn new(config: &'a Config) -> Self {
        RuleManager {
            config,
            definitions: BTreeMap::new(),
            styles: BTreeSet::new(),
            nlp: None,
            filter: None,
        }
    }

    /// Provider for `spelling`, `sequence` and the other delegated checks
    pub fn with_nlp(mut self, provider: Arc<dyn NlpProvider>) -> Self {
        self.nlp = Some(provider);
        self
    }

    /// Filter used instead of `[vellum] filter`
    pub fn with_filter(mut self, fragment: impl Into<String>) -> Self {
        self.filter = Some(fragment.into());
        self
    }

    /// Register a rule; a second rule with the same name is rejected
    pub fn add_rule(&mut self, definition: Definition) -> Result<(), RuleError> {
        if self.definitions.contains_key(&definition.name) {
            return Err(RuleError::Duplicate(definition.name));
        }
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Like [`add_rule`](Self::add_rule) but the earlier definition wins
    /// silently, as it does when styles on different search paths overlap
    fn add_first(&mut self, definition: Definition) {
        if let Err(RuleError::Duplicate(name)) = self.add_rule(definition) {
            debug!(rule = %name, "already loaded; keeping the first definition");
        }
    }

    /// Load, configure and filter every rule the configuration asks for
    pub fn build(mut self) -> Result<RuleSet, VellumError> {
        if self.needs_style(BUILTIN_STYLE) {
            self.load_builtin()?;
        }

        let requested: Vec<String> = self
            .config
            .vellum
            .based_on_styles
            .iter()
            .filter(|s| s.as_str() != BUILTIN_STYLE)
            .cloned()
            .collect();
        for style in &requested {
            self.load_style(style)?;
        }
        self.load_individual_rules()?;

        let config = self.config;
        self.definitions.retain(|name, _| {
            let keep = !config.is_disabled(name);
            if !keep {
                debug!(rule = %name, "disabled in configuration");
            }
            keep
        });
        for (name, definition) in self.definitions.iter_mut() {
            if let Some(level) = config.level_override(name) {
                definition.level = level;
            }
        }

        let min_level = self.apply_filter()?;
        self.freeze(min_level)
    }

    fn needs_style(&self, style: &str) -> bool {
        let prefix = format!("{style}.");
        self.config.vellum.based_on_styles.iter().any(|s| s == style)
            || self.config.rules.keys().any(|k| k.starts_with(&prefix))
    }

    fn load_builtin(&mut self) -> Result<(), VellumError> {
        if let Some(shadow) = self
            .config
            .search_paths()
            .into_iter()
            .map(|p| p.join(BUILTIN_STYLE))
            .find(|p| p.is_dir())
        {
            return Err(ConfigError::BuiltinCollision(shadow.display().to_string()).into());
        }

        for definition in builtin::base_rules()? {
            self.add_first(definition);
        }
        let (accepted, rejected) = self.vocabulary()?;
        if let Some(terms) = builtin::terms(&accepted)? {
            self.add_first(terms);
        }
        if let Some(avoid) = builtin::avoid(&rejected)? {
            self.add_first(avoid);
        }
        self.styles.insert(BUILTIN_STYLE.to_string());
        Ok(())
    }

    /// Accepted and rejected terms from the configuration and vocabularies
    fn vocabulary(&self) -> Result<(Vec<String>, Vec<String>), ConfigError> {
        let mut accepted = self.config.vellum.accept.clone();
        let mut rejected = self.config.vellum.reject.clone();
        for vocab in &self.config.vellum.vocab {
            let mut found = false;
            for (file, terms) in [("accept.txt", &mut accepted), ("reject.txt", &mut rejected)] {
                let Some(path) = self
                    .config
                    .find_asset("vocabularies", &format!("{vocab}/{file}"))
                else {
                    continue;
                };
                found = true;
                terms.extend(read_terms(&path)?);
            }
            if !found {
                warn!(vocab = %vocab, "vocabulary not found on the styles path");
            }
        }
        Ok((accepted, rejected))
    }

    fn load_style(&mut self, style: &str) -> Result<(), VellumError> {
        let dirs: Vec<PathBuf> = self
            .config
            .search_paths()
            .into_iter()
            .map(|p| p.join(style))
            .filter(|p| p.is_dir())
            .collect();
        if dirs.is_empty() {
            let searched = self
                .config
                .search_paths()
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ConfigError::MissingStyle {
                style: style.to_string(),
                searched,
            }
            .into());
        }

        for dir in dirs {
            for path in rule_files(&dir)? {
                self.add_first(Definition::load(&path)?);
            }
        }
        self.styles.insert(style.to_string());
        Ok(())
    }

    /// Rules named in `[rules]` whose style was not loaded as a whole
    fn load_individual_rules(&mut self) -> Result<(), VellumError> {
        let names: Vec<String> = self
            .config
            .rules
            .keys()
            .filter(|name| !self.config.is_disabled(name))
            .cloned()
            .collect();
        for name in names {
            let Some((style, rule)) = name.split_once('.') else {
                continue;
            };
            if self.styles.contains(style) || self.definitions.contains_key(&name) {
                continue;
            }
            let found = self.config.search_paths().into_iter().find_map(|p| {
                ["yml", "yaml"]
                    .iter()
                    .map(|ext| p.join(style).join(format!("{rule}.{ext}")))
                    .find(|candidate| candidate.is_file())
            });
            match found {
                Some(path) => self.add_first(Definition::load(&path)?),
                None => warn!(rule = %name, "configured rule not found on the styles path"),
            }
        }
        Ok(())
    }

    /// Drop the rules the filter rejects; returns the run's minimum level
    fn apply_filter(&mut self) -> Result<Level, ConfigError> {
        let mut min_level = self.config.vellum.min_alert_level;
        let fragment = self
            .filter
            .clone()
            .or_else(|| self.config.vellum.filter.clone())
            .filter(|f| !f.trim().is_empty());
        let Some(fragment) = fragment else {
            return Ok(min_level);
        };

        let source = filter::resolve_fragment(self.config, &fragment)?;
        let compiled = Filter::compile(&source)?;
        let kept: BTreeSet<String> = compiled.apply(self.definitions.values())?.into_iter().collect();
        self.definitions.retain(|name, _| kept.contains(name));
        debug!(filter = %source.trim(), kept = self.definitions.len(), "applied rule filter");

        if compiled.references_level()
            && let Some(lowest) = self.definitions.values().map(|d| d.level).min()
        {
            min_level = min_level.min(lowest);
        }
        Ok(min_level)
    }

    fn freeze(self, min_level: Level) -> Result<RuleSet, VellumError> {
        let mut rules = BTreeMap::new();
        let mut scopes = BTreeSet::new();
        let mut needs_tagging = false;
        for (name, definition) in self.definitions {
            needs_tagging |= definition.needs_tagging();
            scopes.extend(
                definition
                    .scope
                    .selectors()
                    .iter()
                    .filter(|s| !s.is_negated())
                    .map(|s| s.base().to_string()),
            );
            rules.insert(name, checks::compile(definition, self.nlp.clone())?);
        }
        debug!(rules = rules.len(), ?scopes, "rule set ready");
        Ok(RuleSet {
            rules,
            scopes,
            needs_tagging,
            min_level,
        })
    }
}

fn read_terms(path: &Path) -> Result<Vec<String>, ConfigError> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn rule_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == "yml" || e == "yaml")
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project(toml: &str) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "styles/Acme/Weasel.yml",
            "extends: existence\nmessage: \"Avoid '%s'.\"\nlevel: warning\ntokens: [very]\n",
        );
        write(
            dir.path(),
            "styles/Acme/Headings.yml",
            "extends: capitalization\nmessage: \"'%s' should use title case.\"\nlevel: suggestion\nscope: heading\nmatch: $title\n",
        );
        write(
            dir.path(),
            "styles/Extra/Slang.yml",
            "extends: existence\nmessage: \"No slang.\"\nlevel: error\nscope: [sentence, ~heading]\ntokens: [gonna]\n",
        );
        let config_path = dir.path().join("vellum.toml");
        fs::write(&config_path, format!("[vellum]\nversion = \"1\"\n{toml}")).unwrap();
        let config = Config::load(&config_path).unwrap();
        (dir, config)
    }

    fn names(set: &RuleSet) -> Vec<&str> {
        set.names().collect()
    }

    #[test]
    fn test_loads_styles_and_builtin() {
        let (_dir, config) = project("based_on_styles = [\"Vellum\", \"Acme\"]\n");
        let set = RuleManager::new(&config).build().unwrap();
        assert_eq!(
            names(&set),
            vec![
                "Acme.Headings",
                "Acme.Weasel",
                "Vellum.Repetition",
                "Vellum.Spelling"
            ]
        );
        assert!(set.has_scope("heading"));
        assert!(set.has_scope("text"));
        assert!(!set.has_scope("sentence"));
        assert!(!set.needs_tagging());
    }

    #[test]
    fn test_builtin_only_when_requested() {
        let (_dir, config) = project("based_on_styles = [\"Acme\"]\n");
        let set = RuleManager::new(&config).build().unwrap();
        assert!(set.get("Vellum.Repetition").is_none());

        let (_dir, config) =
            project("based_on_styles = [\"Acme\"]\n[rules]\n\"Vellum.Spelling\" = \"warning\"\n");
        let set = RuleManager::new(&config).build().unwrap();
        assert!(set.get("Vellum.Repetition").is_some());
    }

    #[test]
    fn test_missing_style() {
        let (_dir, config) = project("based_on_styles = [\"Nope\"]\n");
        let err = RuleManager::new(&config).build().unwrap_err();
        assert!(matches!(
            err,
            VellumError::Config(ConfigError::MissingStyle { ref style, .. }) if style == "Nope"
        ));
    }

    #[test]
    fn test_builtin_collision() {
        let (dir, config) = project("based_on_styles = [\"Vellum\"]\n");
        write(dir.path(), "styles/Vellum/Mine.yml", "extends: existence\nmessage: m\ntokens: [x]\n");
        let err = RuleManager::new(&config).build().unwrap_err();
        assert!(matches!(err, VellumError::Config(ConfigError::BuiltinCollision(_))));
    }

    #[test]
    fn test_overrides_and_disabled_rules() {
        let (_dir, config) = project(
            "based_on_styles = [\"Acme\"]\n[rules]\n\"Acme.Weasel\" = \"error\"\n\"Acme.Headings\" = false\n",
        );
        let set = RuleManager::new(&config).build().unwrap();
        assert_eq!(names(&set), vec!["Acme.Weasel"]);
        assert_eq!(set.get("Acme.Weasel").unwrap().definition().level, Level::Error);
    }

    #[test]
    fn test_individual_rule_loaded_without_its_style() {
        let (_dir, config) =
            project("based_on_styles = [\"Acme\"]\n[rules]\n\"Extra.Slang\" = \"warning\"\n");
        let set = RuleManager::new(&config).build().unwrap();
        assert!(set.get("Extra.Slang").is_some());
        assert!(set.has_scope("sentence"));
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let (_dir, config) = project("");
        let mut manager = RuleManager::new(&config);
        let def = Definition::parse("A.B", "extends: existence\nmessage: m\ntokens: [x]\n").unwrap();
        manager.add_rule(def.clone()).unwrap();
        let err = manager.add_rule(def).unwrap_err();
        assert_eq!(err.to_string(), "the rule 'A.B' has already been added");
    }

    #[test]
    fn test_filter_narrows_by_name() {
        let (_dir, config) = project("based_on_styles = [\"Vellum\", \"Acme\"]\n");
        let set = RuleManager::new(&config)
            .with_filter(r#".Name startsWith "Acme.""#)
            .build()
            .unwrap();
        assert_eq!(names(&set), vec!["Acme.Headings", "Acme.Weasel"]);
        assert_eq!(set.min_level(), Level::Suggestion);
    }

    #[test]
    fn test_level_filter_lowers_floor_only() {
        let (_dir, config) = project(
            "based_on_styles = [\"Acme\"]\nmin_alert_level = \"error\"\n",
        );
        let set = RuleManager::new(&config)
            .with_filter(r#".Level == "warning""#)
            .build()
            .unwrap();
        assert_eq!(names(&set), vec!["Acme.Weasel"]);
        assert_eq!(set.min_level(), Level::Warning);

        let set = RuleManager::new(&config)
            .with_filter(r#".Level != "bogus""#)
            .build()
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.min_level(), Level::Suggestion);
    }

    #[test]
    fn test_vocabulary_rules() {
        let (dir, config) = project(
            "based_on_styles = [\"Vellum\"]\nvocab = [\"Docs\"]\naccept = [\"Vellum\"]\n",
        );
        write(dir.path(), "styles/config/vocabularies/Docs/reject.txt", "# words\nutilize\n\n");
        let set = RuleManager::new(&config).build().unwrap();
        assert!(set.get("Vellum.Terms").is_some());
        assert!(set.get("Vellum.Avoid").is_some());
    }
}
