#![forbid(unsafe_code)]

//! Rendering capabilities
//!
//! The pipeline never shells out or calls a Markdown library directly; it
//! asks a [`Renderer`] for HTML. Tests swap in doubles, and tools that are
//! absent fail the file with [`LintError::MissingTool`].

use crate::error::LintError;
use crate::transform::markdown::MarkdownRenderer;
use crate::transform::org::OrgRenderer;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

/// Turns markup into HTML
pub trait Renderer: Send + Sync {
    /// Name used in error messages
    fn name(&self) -> &str;

    fn render(&self, text: &str) -> Result<String, LintError>;
}

/// Find an executable on `PATH`
pub fn which(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        let exe = full.with_extension("exe");
        exe.is_file().then_some(exe)
    })
}

/// Run `program args...` with `input` on stdin and return stdout
///
/// Anything other than a clean exit is reported with the process's stderr,
/// verbatim.
pub fn execute_with_input(program: &str, args: &[String], input: &str) -> Result<String, LintError> {
    let exe = which(program).ok_or_else(|| LintError::MissingTool(program.to_string()))?;
    debug!(program, ?args, "running external renderer");

    let mut child = Command::new(&exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Feed stdin from a separate thread so a child that fills its stdout
    // pipe before draining stdin cannot deadlock us.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_string();
        std::thread::spawn(move || stdin.write_all(input.as_bytes()))
    });

    let output = child.wait_with_output()?;
    if let Some(handle) = writer {
        match handle.join() {
            // A renderer may exit without reading all of its input.
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
            Ok(_) => {}
            Err(_) => {
                return Err(LintError::Render {
                    tool: program.to_string(),
                    message: "stdin writer panicked".to_string(),
                });
            }
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let message = if stderr.trim().is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(LintError::Render {
            tool: program.to_string(),
            message,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// A renderer backed by an external process
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandRenderer {
            program: program.into(),
            args,
        }
    }

    /// `asciidoctor` in embedded mode with the configured attributes
    ///
    /// An attribute value of `YES` sets the attribute, `NO` unsets it, and
    /// anything else is passed as `name=value`.
    pub fn asciidoctor(attributes: &BTreeMap<String, String>) -> Self {
        let mut args: Vec<String> = ["-s", "-a", "notitle!", "-a", "attribute-missing=drop"]
            .into_iter()
            .map(str::to_string)
            .collect();
        for (name, value) in attributes {
            let entry = match value.as_str() {
                "YES" => name.clone(),
                "NO" => format!("{name}!"),
                other => format!("{name}={other}"),
            };
            args.push("-a".to_string());
            args.push(entry);
        }
        args.extend(["--safe-mode", "secure", "-"].map(str::to_string));
        CommandRenderer::new("asciidoctor", args)
    }

    /// `mdx2vast`, reading MDX on stdin
    pub fn mdx() -> Self {
        CommandRenderer::new("mdx2vast", Vec::new())
    }

    /// docutils' `rst2html`
    pub fn rst() -> Self {
        let args = ["--quiet", "--halt=5", "--link-stylesheet", "--no-file-insertion"]
            .map(str::to_string)
            .to_vec();
        CommandRenderer::new("rst2html", args)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Renderer for CommandRenderer {
    fn name(&self) -> &str {
        &self.program
    }

    fn render(&self, text: &str) -> Result<String, LintError> {
        execute_with_input(&self.program, &self.args, text)
    }
}

/// The renderer used for each markup format
#[derive(Clone)]
pub struct Renderers {
    pub markdown: Arc<dyn Renderer>,
    pub mdx: Arc<dyn Renderer>,
    pub asciidoc: Arc<dyn Renderer>,
    pub rst: Arc<dyn Renderer>,
    pub org: Arc<dyn Renderer>,
}

impl Renderers {
    pub fn new(asciidoctor_attributes: &BTreeMap<String, String>) -> Self {
        Renderers {
            markdown: Arc::new(MarkdownRenderer::new()),
            mdx: Arc::new(CommandRenderer::mdx()),
            asciidoc: Arc::new(CommandRenderer::asciidoctor(asciidoctor_attributes)),
            rst: Arc::new(CommandRenderer::rst()),
            org: Arc::new(OrgRenderer),
        }
    }
}

impl Default for Renderers {
    fn default() -> Self {
        Renderers::new(&BTreeMap::new())
    }
}

impl std::fmt::Debug for Renderers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderers")
            .field("markdown", &self.markdown.name())
            .field("mdx", &self.mdx.name())
            .field("asciidoc", &self.asciidoc.name())
            .field("rst", &self.rst.name())
            .field("org", &self.org.name())
            .finish()
    }
}
