//! Error types for relation preloading with actionable messages.
//!
//! Every failure surfaces as a [`QueryError`] carrying an [`ErrorCode`],
//! a message and an [`ErrorContext`] with suggestions.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: P{category}{number}
//! - 1xxx: Specification errors (unknown relation, invalid spec, unknown model)
//! - 5xxx: Execution errors raised by query engines
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use prax_preload::{ErrorCode, QueryError};
//!
//! let err = QueryError::unknown_relation("Post", "fake", ["author", "comments"]);
//! assert_eq!(err.code, ErrorCode::UnknownRelation);
//! assert_eq!(err.relation(), Some("fake"));
//! assert!(err.to_string().contains("fake"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query and preload operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Specification errors (1xxx)
    /// Column specification has an invalid shape (P1003).
    InvalidSpec = 1003,
    /// Relation is not declared on the owning model (P1004).
    UnknownRelation = 1004,
    /// Model is not registered in the catalog (P1006).
    UnknownModel = 1006,

    // Execution errors (5xxx)
    /// General database error (P5005).
    DatabaseError = 5005,

    // Configuration errors (7xxx)
    /// Invalid configuration (P7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (P9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P1004").
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidSpec => "Invalid column specification",
            Self::UnknownRelation => "Unknown relation",
            Self::UnknownModel => "Unknown model",
            Self::DatabaseError => "Database error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// Get the documentation URL for this error.
    pub fn docs_url(&self) -> String {
        format!("https://prax.rs/docs/errors/{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field or relation involved.
    pub field: Option<String>,
    /// The SQL query (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while building queries or preloading relations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(
        mut self,
        text: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.context.suggestions.push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL query.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an unknown relation error.
    ///
    /// `known` lists the relations the model does declare and is used to
    /// build the suggestions.
    pub fn unknown_relation<I, S>(
        model: impl Into<String>,
        relation: impl Into<String>,
        known: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let model = model.into();
        let relation = relation.into();
        let known: Vec<String> = known.into_iter().map(|s| s.as_ref().to_string()).collect();

        let mut err = Self::new(
            ErrorCode::UnknownRelation,
            format!("Relation '{}' is not declared on model {}", relation, model),
        )
        .with_model(&model)
        .with_field(&relation);

        if let Some(close) = closest_match(&relation, &known) {
            err = err.with_suggestion(format!("Did you mean '{}'?", close));
        }
        if known.is_empty() {
            err = err.with_help(format!("{} declares no relations", model));
        } else {
            err = err.with_suggestion(format!("Relations on {}: {}", model, known.join(", ")));
        }
        err
    }

    /// Create an unknown model error.
    pub fn unknown_model(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::UnknownModel,
            format!("Model {} is not registered in the catalog", model),
        )
        .with_model(&model)
        .with_suggestion(format!("Register {} with Catalog::register before querying", model))
    }

    /// Create an invalid specification error.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::InvalidSpec, format!("Invalid column specification: {}", message))
            .with_code_suggestion(
                "Use a list of columns or an object with `columns` and `include`",
                r#"{"comments": {"columns": ["body"], "include": {"author": ["name"]}}}"#,
            )
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::DatabaseError, message)
            .with_suggestion("Check the database logs for more details")
    }

    /// Create an invalid configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::InvalidConfiguration, format!("Invalid configuration: {}", message))
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help(
                "This is likely a bug in Prax - please report it at https://github.com/pegasusheavy/prax/issues",
            )
    }

    // ============== Error Checks ==============

    /// Check if this is an unknown relation error.
    pub fn is_unknown_relation(&self) -> bool {
        self.code == ErrorCode::UnknownRelation
    }

    /// Name of the offending relation for unknown relation errors.
    pub fn relation(&self) -> Option<&str> {
        if self.is_unknown_relation() {
            self.context.field.as_deref()
        } else {
            None
        }
    }

    /// Get the documentation URL for this error.
    pub fn docs_url(&self) -> String {
        self.code.docs_url()
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.len() > 200 {
                format!("{}...", &sql[..200])
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output.push_str(&format!("\nMore info: {}\n", self.docs_url()));

        output
    }
}

/// Pick the known name sharing the longest prefix with `name`, if any share
/// at least half of it.
fn closest_match<'a>(name: &str, known: &'a [String]) -> Option<&'a str> {
    known
        .iter()
        .map(|k| {
            let shared = k.chars().zip(name.chars()).take_while(|(a, b)| a == b).count();
            (shared, k)
        })
        .filter(|(shared, _)| *shared > 0 && *shared * 2 >= name.chars().count())
        .max_by_key(|(shared, _)| *shared)
        .map(|(_, k)| k.as_str())
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
