//! Typed error model for registration and dispatch.
//!
//! Two families, with different propagation rules:
//!
//! ```text
//! registration time → TemplateError  (returned from bind(), aborts setup)
//! dispatch time     → CommandError   (carried inside ExecStatus::Error)
//! configuration     → ConfigError    (dispatcher setup, config and alias files)
//! ```
//!
//! `thiserror` for enum derivation, no manual `Display` impls.

use std::path::PathBuf;

use dispatch_types::TypeSpecifier;

// ---------------------------------------------------------------------------
// TemplateError
// ---------------------------------------------------------------------------

/// A command template could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Unbalanced or nested brackets.
    #[error("Malformed template '{template}': {reason} at index {index}")]
    MalformedTemplate {
        template: String,
        index: usize,
        reason: String,
    },

    /// `[name]` where `name` is not one of `str`, `uint`, `float`.
    #[error("Unknown type specifier '[{name}]' in template '{template}'")]
    UnknownTypeSpecifier { template: String, name: String },
}

impl TemplateError {
    pub(crate) fn malformed(template: &str, index: usize, reason: impl Into<String>) -> Self {
        TemplateError::MalformedTemplate {
            template: template.to_string(),
            index,
            reason: reason.into(),
        }
    }

    /// The raw template that failed to compile.
    pub fn template(&self) -> &str {
        match self {
            TemplateError::MalformedTemplate { template, .. }
            | TemplateError::UnknownTypeSpecifier { template, .. } => template,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// A runtime dispatch failure. Never thrown; always returned as
/// `ExecStatus::Error` so the caller can display or log it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Failure reported by a command handler.
    #[error("{0}")]
    Failed(String),

    /// No registered template matches the command string.
    #[error("Can not find a handler for URI '{command}'")]
    NoHandlerFound { command: String },

    /// `vrun <name>` with an undefined alias.
    #[error("Unrecognized alias {alias}")]
    UnrecognizedAlias { alias: String },

    /// `vrun` received something other than exactly one argument.
    #[error("Alias does not support extra parameters (got {got} arguments)")]
    InvalidArity { got: usize },

    /// Alias expansion nested deeper than the configured limit.
    #[error("Alias {alias} exceeds the maximum expansion depth of {depth}")]
    AliasDepthExceeded { alias: String, depth: usize },

    /// An asynchronous command is already outstanding.
    #[error("There are pending tasks, only one asynchronous command may run at a time")]
    WatcherBusy,

    /// The resolver of a pending result was dropped without a value.
    #[error("Pending result was abandoned before it resolved")]
    PromiseDropped,

    /// The code resolving a pending result panicked.
    #[error("Pending result panicked while resolving")]
    PromisePanicked,

    /// The async watcher is no longer running.
    #[error("Async watcher has shut down")]
    WatcherStopped,

    /// A typed argument accessor asked for an index past the end.
    #[error("Missing argument at index {index}")]
    MissingArgument { index: usize },

    /// A typed argument accessor could not parse the captured text.
    #[error("Argument {index} '{value}' is not a valid {expected}")]
    InvalidArgument {
        index: usize,
        expected: TypeSpecifier,
        value: String,
    },
}

impl CommandError {
    /// Handler-reported failure with a free-form message.
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed(message.into())
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Configuration or alias definition file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to start the async watcher runtime: {0}")]
    WatcherSpawn(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_handler_message_carries_command() {
        let err = CommandError::NoHandlerFound {
            command: "totally/unmatched/string".into(),
        };
        assert!(err.to_string().contains("totally/unmatched/string"));
    }

    #[test]
    fn test_malformed_template_message_names_index() {
        let err = TemplateError::malformed("a]b", 1, "unexpected ']'");
        let msg = err.to_string();
        assert!(msg.contains("index 1"));
        assert!(msg.contains("a]b"));
        assert_eq!(err.template(), "a]b");
    }

    #[test]
    fn test_invalid_argument_names_expected_type() {
        let err = CommandError::InvalidArgument {
            index: 2,
            expected: TypeSpecifier::Float,
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "Argument 2 'abc' is not a valid float");
    }
}
