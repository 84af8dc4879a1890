//! Structured errors and diagnostics
//!
//! Malformed script lines never abort a parse. They become diagnostics with
//! the line they came from, and only internal failures surface as errors.

use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const EMPTY_SCRIPT: &str = "EMPTY_SCRIPT";
    pub const MISSING_SEPARATOR: &str = "MISSING_SEPARATOR";
    pub const UNKNOWN_SECTION: &str = "UNKNOWN_SECTION";
    pub const INVALID_PLACEMENT: &str = "INVALID_PLACEMENT";
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
    pub const BUILD_ERROR: &str = "BUILD_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Line skipped, config still generated
    Warning,
    /// Config withheld
    Error,
    /// Script cannot be processed at all
    Fatal,
}

/// Wire shape of a warning or error: `{message, line}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    /// 1-based source line, `null` when the issue is not tied to a line
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, line: Option<usize>) -> Self {
        Self { message: message.into(), line }
    }

    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self::new(message, Some(line))
    }
}

/// Structured error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Line in the script, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    pub severity: Severity,
}

impl ScriptError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            line: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set line
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    // ========== Common Error Constructors ==========

    pub fn empty_script() -> Self {
        Self::new(codes::EMPTY_SCRIPT, "Empty script.")
    }

    pub fn missing_separator(line: usize) -> Self {
        Self::new(codes::MISSING_SEPARATOR, "Expected 'key: value'")
            .with_suggestion("Separate the property name and value with ':'")
            .at_line(line)
            .with_severity(Severity::Warning)
    }

    pub fn unknown_section(name: &str, line: usize) -> Self {
        Self::new(codes::UNKNOWN_SECTION, format!("Unknown section [{}]", name))
            .with_suggestion("Use [animation], [scroll], [target], [timeline], [step.N] or [disable]")
            .at_line(line)
            .with_severity(Severity::Warning)
    }

    pub fn invalid_placement(details: impl Into<String>, line: usize) -> Self {
        Self::new(codes::INVALID_PLACEMENT, details.into())
            .at_line(line)
            .with_severity(Severity::Warning)
    }

    pub fn invalid_value(key: &str, expected: &str, got: &str, line: usize) -> Self {
        Self::new(
            codes::INVALID_VALUE,
            format!("'{}' expects {}, got '{}'", key, expected, got),
        )
        .at_line(line)
        .with_severity(Severity::Warning)
    }

    pub fn build_warning(details: impl Into<String>) -> Self {
        Self::new(codes::BUILD_ERROR, details).with_severity(Severity::Warning)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScriptError {}

impl From<ScriptError> for Diagnostic {
    fn from(err: ScriptError) -> Self {
        Diagnostic::new(err.message, err.line)
    }
}

impl From<&ScriptError> for Diagnostic {
    fn from(err: &ScriptError) -> Self {
        Diagnostic::new(err.message.clone(), err.line)
    }
}
