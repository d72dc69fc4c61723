/// Shader source text handed to the compiler
///
/// A `ShaderSource` always holds non-empty text: loading an empty or missing
/// file fails here, before any compiler is involved.

use std::fs;
use std::path::Path;
use crate::error::{Error, Result};

/// Named GLSL source text for one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    name: String,
    text: String,
}

impl ShaderSource {
    /// Wrap in-memory source text
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailed` if `text` is empty.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let text = text.into();
        if text.is_empty() {
            crate::shader_warn!("galaxy3d::shader::Source", "shader [{}] is empty", name);
            return Err(Error::LoadFailed(format!("shader [{}] is empty", name)));
        }
        Ok(Self { name, text })
    }

    /// Load source text from a file
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailed` if the file cannot be read, is not UTF-8,
    /// or is empty.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| {
            crate::shader_warn!("galaxy3d::shader::Source", "open file [{}] failure: {}", name, e);
            Error::LoadFailed(format!("open file [{}] failure: {}", name, e))
        })?;
        Self::new(name, text)
    }

    /// Display name (file path or caller-provided label)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the text carries its own `#version` directive
    ///
    /// Whitespace is allowed around `#`, and directives inside `//` or
    /// `/* */` comments are ignored.
    pub fn has_version_directive(&self) -> bool {
        let mut in_block_comment = false;
        self.text.lines().any(|line| {
            let code = strip_comments(line, &mut in_block_comment);
            is_version_directive(&code)
        })
    }
}

/// Line text with comments replaced by a space; `in_block` carries an open
/// `/* */` comment over to the next line
fn strip_comments(line: &str, in_block: &mut bool) -> String {
    let mut code = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        if *in_block {
            match rest.find("*/") {
                Some(end) => {
                    *in_block = false;
                    code.push(' ');
                    rest = &rest[end + 2..];
                }
                None => return code,
            }
        }
        let line_comment = rest.find("//");
        let block_comment = rest.find("/*");
        match (line_comment, block_comment) {
            (Some(l), Some(b)) if b < l => {
                code.push_str(&rest[..b]);
                *in_block = true;
                rest = &rest[b + 2..];
            }
            (None, Some(b)) => {
                code.push_str(&rest[..b]);
                *in_block = true;
                rest = &rest[b + 2..];
            }
            (Some(l), _) => {
                code.push_str(&rest[..l]);
                return code;
            }
            (None, None) => {
                code.push_str(rest);
                return code;
            }
        }
    }
}

fn is_version_directive(code: &str) -> bool {
    let Some(directive) = code.trim_start().strip_prefix('#') else {
        return false;
    };
    match directive.trim_start().strip_prefix("version") {
        Some(tail) => !tail.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        None => false,
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
