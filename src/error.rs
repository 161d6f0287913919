//! Error types for the compiler pipeline.
//!
//! Every pipeline stage (§7) raises one of the [`Error`] kinds. Errors carry a
//! stack of `(message, Option<Span>)` frames: each boundary a value crosses
//! (binder recursing into a sub-expression, the executor wrapping a driver
//! failure) pushes a frame so the final error reads top-down as "while
//! binding `department`", "while executing the plan", etc.

use std::fmt;

use crate::syntax::Span;

/// One level of context attached to an [`Error`] as it propagates outward.
#[derive(Debug, Clone)]
pub struct Frame {
    pub message: String,
    pub span: Option<Span>,
}

/// The eight error kinds, exhaustive.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("{0}")]
    Bind(String),
    #[error("{0}")]
    Encode(String),
    #[error("internal compiler error: {0}")]
    Compile(String),
    #[error("{0}")]
    Dispatch(String),
    #[error("{0}")]
    Engine(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("operation cancelled")]
    Cancelled,
}

/// A compiler error: a kind, a frame stack, and optional "did you mean"
/// alternatives surfaced by an attribute/reference set probe (§4.5).
#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub kind: ErrorKind,
    pub frames: Vec<Frame>,
    pub quoted: Option<String>,
    pub did_you_mean: Vec<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            frames: Vec::new(),
            quoted: None,
            did_you_mean: Vec::new(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Syntax(message.into()))
    }

    pub fn bind(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Bind(message.into()))
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Encode(message.into()))
    }

    pub fn compile(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Compile(message.into()))
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Dispatch(message.into()))
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Engine(message.into()))
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Permission(message.into()))
    }

    pub fn cancelled() -> Self {
        Error::new(ErrorKind::Cancelled)
    }

    /// Pushes a `(message, span)` frame, innermost first.
    #[must_use]
    pub fn with_frame(mut self, message: impl Into<String>, span: Option<Span>) -> Self {
        self.frames.push(Frame {
            message: message.into(),
            span,
        });
        self
    }

    #[must_use]
    pub fn with_quoted(mut self, source: impl Into<String>) -> Self {
        self.quoted = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.did_you_mean = alternatives;
        self
    }

    pub fn span(&self) -> Option<Span> {
        self.frames.iter().find_map(|f| f.span)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for frame in &self.frames {
            write!(f, "\n  while {}", frame.message)?;
        }
        if !self.did_you_mean.is_empty() {
            write!(f, "\n  did you mean: {}", self.did_you_mean.join(", "))?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for annotating a `Result` with an outer frame, mirroring
/// the idiom used at every pipeline boundary: `stage(...).context("binding
/// X", span)`.
pub trait Context<T> {
    fn context(self, message: impl Into<String>, span: Option<Span>) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    fn context(self, message: impl Into<String>, span: Option<Span>) -> Result<T> {
        self.map_err(|e| e.with_frame(message, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_print_innermost_first() {
        let err = Error::bind("unknown attribute 'schoool'")
            .with_alternatives(vec!["school".to_string()])
            .with_frame("binding segment", None);
        let rendered = err.to_string();
        assert!(rendered.contains("unknown attribute"));
        assert!(rendered.contains("while binding segment"));
        assert!(rendered.contains("did you mean: school"));
    }
}
