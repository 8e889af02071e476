//! Document source
//!
//! A document is the ordered list of display lines the reader walks through.
//! Lines are 1:1 with lines of the source text; blank lines are kept so that
//! line indices stay aligned with what the user sees.

use crate::Result;
use log::debug;
use std::path::{Path, PathBuf};

/// An immutable, index-stable sequence of display lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,

    /// File the document was loaded from, if any
    path: Option<PathBuf>,
}

impl Document {
    /// Split full text into display lines
    ///
    /// Both `\n` and `\r\n` line endings are accepted. A trailing newline
    /// yields a final empty line, which is never spoken.
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        Self { lines, path: None }
    }

    /// Build a document from already-rendered display lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            path: None,
        }
    }

    /// Read a markdown or text file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)?;

        let mut doc = Self::from_text(&text);
        doc.path = Some(path.to_path_buf());
        debug!("Loaded {} lines from {:?}", doc.len(), path);
        Ok(doc)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Path the document was loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
