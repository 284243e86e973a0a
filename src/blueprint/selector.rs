#![forbid(unsafe_code)]

//! A dasel-style selector over `serde_json::Value` trees
//!
//! Supported steps:
//!
//! - `.key` and `."dotted.key"`: map lookup
//! - `.[n]`, `[n]`, `.index(n)`: array element
//! - `.[*]`, `.*`, `.all()`: every element or map value
//! - `.property(a,b)`: several map keys at once
//! - `..key`: `key` anywhere below the current node
//!
//! Lookups that don't apply (a missing key, an index into a map) select
//! nothing rather than failing, so one selector can run across documents
//! that only sometimes carry a field.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
    All,
    Properties(Vec<String>),
    Recursive(String),
}

/// A compiled selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    expr: String,
    steps: Vec<Step>,
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
}

impl<'a> Scanner<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.src.len(), |(i, _)| *i)
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, '.' | '[' | '(' | ')' | ',') {
                break;
            }
            out.push(c);
            self.bump();
        }
        out.trim().to_string()
    }

    fn quoted(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(format!("unterminated {quote}")),
            }
        }
    }

    fn until(&mut self, close: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == close => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(format!("expected '{close}'")),
            }
        }
    }
}

fn bracket(scanner: &mut Scanner<'_>) -> Result<Step, String> {
    let inner = scanner.until(']')?;
    let inner = inner.trim();
    if inner == "*" {
        return Ok(Step::All);
    }
    if let Some(quoted) = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        return Ok(Step::Key(quoted.to_string()));
    }
    inner
        .parse()
        .map(Step::Index)
        .map_err(|_| format!("invalid index '{inner}'"))
}

fn function(name: &str, args: &str) -> Result<Step, String> {
    let args: Vec<String> = args
        .split(',')
        .map(|a| a.trim().trim_matches('"').to_string())
        .filter(|a| !a.is_empty())
        .collect();
    match name {
        "all" if args.is_empty() => Ok(Step::All),
        "property" if !args.is_empty() => Ok(Step::Properties(args)),
        "index" if args.len() == 1 => args[0]
            .parse()
            .map(Step::Index)
            .map_err(|_| format!("invalid index '{}'", args[0])),
        _ => Err(format!("unsupported function '{name}({})'", args.join(","))),
    }
}

impl Selector {
    pub fn parse(expr: &str) -> Result<Self, String> {
        let mut scanner = Scanner {
            chars: expr.trim().char_indices().peekable(),
            src: expr.trim(),
        };
        let mut steps = Vec::new();

        if !matches!(scanner.peek(), Some('.') | Some('[') | None) {
            let key = scanner.ident();
            steps.push(Step::Key(key));
        }

        while let Some(c) = scanner.peek() {
            let at = scanner.position();
            match c {
                '[' => {
                    scanner.bump();
                    steps.push(bracket(&mut scanner)?);
                }
                '.' => {
                    scanner.bump();
                    if scanner.eat('.') {
                        let key = match scanner.peek() {
                            Some(q @ ('"' | '\'')) => {
                                scanner.bump();
                                scanner.quoted(q)?
                            }
                            _ => scanner.ident(),
                        };
                        if key.is_empty() {
                            return Err(format!("missing key after '..' at {at}"));
                        }
                        steps.push(Step::Recursive(key));
                        continue;
                    }
                    match scanner.peek() {
                        None => {}
                        Some('[') => {
                            scanner.bump();
                            steps.push(bracket(&mut scanner)?);
                        }
                        Some('*') => {
                            scanner.bump();
                            steps.push(Step::All);
                        }
                        Some(q @ ('"' | '\'')) => {
                            scanner.bump();
                            steps.push(Step::Key(scanner.quoted(q)?));
                        }
                        Some(_) => {
                            let name = scanner.ident();
                            if name.is_empty() {
                                return Err(format!("empty step at {at}"));
                            }
                            if scanner.eat('(') {
                                let args = scanner.until(')')?;
                                steps.push(function(&name, &args)?);
                            } else {
                                steps.push(Step::Key(name));
                            }
                        }
                    }
                }
                other => return Err(format!("unexpected '{other}' at {at}")),
            }
        }

        Ok(Selector {
            expr: expr.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Every node the selector reaches, in document order
    pub fn select<'v>(&self, root: &'v Value) -> Vec<&'v Value> {
        let mut current = vec![root];
        for step in &self.steps {
            let mut next = Vec::new();
            for value in current {
                apply(step, value, &mut next);
            }
            current = next;
        }
        current
    }

    /// String leaves under every selected node
    pub fn select_strings(&self, root: &Value) -> Vec<String> {
        let mut out = Vec::new();
        for value in self.select(root) {
            leaves(value, &mut out);
        }
        out
    }
}

fn apply<'v>(step: &Step, value: &'v Value, out: &mut Vec<&'v Value>) {
    match (step, value) {
        (Step::Key(key), Value::Object(map)) => out.extend(map.get(key)),
        (Step::Index(i), Value::Array(items)) => out.extend(items.get(*i)),
        (Step::All, Value::Array(items)) => out.extend(items.iter()),
        (Step::All, Value::Object(map)) => out.extend(map.values()),
        (Step::Properties(keys), Value::Object(map)) => {
            out.extend(keys.iter().filter_map(|k| map.get(k)))
        }
        (Step::Recursive(key), _) => descend(key, value, out),
        _ => {}
    }
}

fn descend<'v>(key: &str, value: &'v Value, out: &mut Vec<&'v Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    out.push(v);
                }
                descend(key, v, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                descend(key, item, out);
            }
        }
        _ => {}
    }
}

fn leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push(s.clone()),
        Value::Bool(_) | Value::Number(_) => out.push(value.to_string()),
        Value::Array(items) => items.iter().for_each(|v| leaves(v, out)),
        Value::Object(map) => map.values().for_each(|v| leaves(v, out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "info": {"title": "Pets", "description": "All the pets."},
            "paths": [
                {"summary": "List pets", "tags": ["a", "b"]},
                {"summary": "Create a pet", "count": 3}
            ],
            "a.b": "dotted"
        })
    }

    fn strings(expr: &str) -> Vec<String> {
        Selector::parse(expr).unwrap().select_strings(&doc())
    }

    #[test]
    fn test_key_and_index() {
        assert_eq!(strings(".info.title"), vec!["Pets"]);
        assert_eq!(strings(".paths.[1].summary"), vec!["Create a pet"]);
        assert_eq!(strings(".paths[0].summary"), vec!["List pets"]);
        assert_eq!(strings(".paths.index(0).tags.[1]"), vec!["b"]);
    }

    #[test]
    fn test_all_and_properties() {
        assert_eq!(strings(".paths.all().summary"), vec!["List pets", "Create a pet"]);
        assert_eq!(strings(".paths.[*].summary"), vec!["List pets", "Create a pet"]);
        assert_eq!(strings(".info.*"), vec!["Pets", "All the pets."]);
        assert_eq!(
            strings(".info.property(description,title)"),
            vec!["All the pets.", "Pets"]
        );
    }

    #[test]
    fn test_recursive_and_quoted() {
        assert_eq!(strings("..summary"), vec!["List pets", "Create a pet"]);
        assert_eq!(strings(".\"a.b\""), vec!["dotted"]);
        assert_eq!(strings(".paths.[1].count"), vec!["3"]);
    }

    #[test]
    fn test_whole_subtree_flattens_to_leaves() {
        assert_eq!(strings(".paths.[0]"), vec!["List pets", "a", "b"]);
    }

    #[test]
    fn test_missing_selects_nothing() {
        assert!(strings(".info.missing").is_empty());
        assert!(strings(".info.[3]").is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Selector::parse(".paths.[x]").is_err());
        assert!(Selector::parse(".paths.first()").is_err());
        assert!(Selector::parse(".info.\"open").is_err());
    }
}
