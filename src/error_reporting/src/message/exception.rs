use std::error::Error;
use std::fmt;

use crate::stack_trace::format_backtrace;

/// An explicit error attached to a report. Its rendering replaces the
/// report's free-text message and auto-captured call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionInfo {
    message: String,
    causes: Vec<String>,
    stack: Option<String>,
}

impl ExceptionInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Walks the `source()` chain of `error`.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }

        Self {
            message: error.to_string(),
            causes,
            stack: None,
        }
    }

    /// Like [`ExceptionInfo::from_error`], plus the backtrace anyhow captured
    /// when the error was created (only present with `RUST_BACKTRACE` set).
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let mut chain = error.chain();
        let message = chain
            .next()
            .map(|head| head.to_string())
            .unwrap_or_default();

        Self {
            message,
            causes: chain.map(|cause| cause.to_string()).collect(),
            stack: format_backtrace(error.backtrace()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for cause in &self.causes {
            write!(f, "\nCaused by: {}", cause)?;
        }
        if let Some(stack) = self.stack.as_deref().filter(|stack| !stack.is_empty()) {
            write!(f, "\n{}", stack)?;
        }
        Ok(())
    }
}

impl From<&anyhow::Error> for ExceptionInfo {
    fn from(error: &anyhow::Error) -> Self {
        Self::from_anyhow(error)
    }
}
