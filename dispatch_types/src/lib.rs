//! Dispatch Types - Foundation Types for the command dispatcher
//!
//! This crate contains pure data structures shared by the dispatcher and by the
//! collaborators that register commands with it.
//!
//! ## Contents
//!
//! - Placeholder type specifiers (`[str]`, `[uint]`, `[float]`)
//! - Execution status tags
//! - Help listing records for commands and aliases
//!
//! ## Rules
//!
//! 1. **NO DISPATCH LOGIC** - Only data structures
//! 2. **NO WORKSPACE DEPENDENCIES** - Cannot depend on other workspace crates
//! 3. **SERIALIZABLE** - All types support serde

use serde::{Deserialize, Serialize};

// ============================================================================
// TYPE SPECIFIERS
// ============================================================================

/// Placeholder type accepted inside `[...]` in a command template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeSpecifier {
    /// Any sequence of characters, including the empty string
    Str,
    /// Zero or more ASCII digits
    UInt,
    /// Optional sign, optional ASCII integer digits, decimal point, ASCII
    /// fractional digits
    Float,
}

impl TypeSpecifier {
    /// Every specifier, in lookup order
    pub const ALL: [TypeSpecifier; 3] = [
        TypeSpecifier::Str,
        TypeSpecifier::UInt,
        TypeSpecifier::Float,
    ];

    /// Name as written between brackets in a template
    pub fn name(&self) -> &'static str {
        match self {
            TypeSpecifier::Str => "str",
            TypeSpecifier::UInt => "uint",
            TypeSpecifier::Float => "float",
        }
    }

    /// Regex capture group matching one argument of this type
    pub fn pattern(&self) -> &'static str {
        match self {
            TypeSpecifier::Str => "(.*)",
            TypeSpecifier::UInt => "([0-9]*)",
            TypeSpecifier::Float => r"([-+]?[0-9]*\.[0-9]+)",
        }
    }

    /// Look up a specifier by its template name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|spec| spec.name() == name)
    }
}

impl std::fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for TypeSpecifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown type specifier: {}", s))
    }
}

// ============================================================================
// EXECUTION STATUS
// ============================================================================

/// Tag of an execution status, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatusKind {
    Success,
    Error,
    Pending,
}

impl ExecStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecStatusKind::Success => "ok",
            ExecStatusKind::Error => "error",
            ExecStatusKind::Pending => "pending",
        }
    }
}

impl std::fmt::Display for ExecStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// HELP LISTING RECORDS
// ============================================================================

/// A registered command as shown in help listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Raw template as written at registration, e.g. `vget /object/[str]/color`
    pub template: String,
    /// Human readable description
    pub description: String,
}

impl CommandInfo {
    pub fn new(template: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            description: description.into(),
        }
    }
}

/// A defined alias as shown in help listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasInfo {
    /// Alias name, invoked as `vrun <name>`
    pub name: String,
    /// Commands executed in order when the alias runs
    pub commands: Vec<String>,
    /// Human readable description
    pub description: String,
}

impl AliasInfo {
    pub fn new(
        name: impl Into<String>,
        commands: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            commands,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_specifier_lookup() {
        assert_eq!(TypeSpecifier::from_name("str"), Some(TypeSpecifier::Str));
        assert_eq!(TypeSpecifier::from_name("uint"), Some(TypeSpecifier::UInt));
        assert_eq!(TypeSpecifier::from_name("float"), Some(TypeSpecifier::Float));
        assert_eq!(TypeSpecifier::from_name("int"), None);
        assert_eq!(TypeSpecifier::from_name(""), None);
    }

    #[test]
    fn test_type_specifier_from_str() {
        let spec: TypeSpecifier = "uint".parse().unwrap();
        assert_eq!(spec, TypeSpecifier::UInt);
        assert!("foo".parse::<TypeSpecifier>().is_err());
    }

    #[test]
    fn test_type_specifier_serde_names() {
        let json = serde_json::to_string(&TypeSpecifier::UInt).unwrap();
        assert_eq!(json, "\"uint\"");
        let back: TypeSpecifier = serde_json::from_str("\"float\"").unwrap();
        assert_eq!(back, TypeSpecifier::Float);
    }

    #[test]
    fn test_exec_status_kind_display() {
        assert_eq!(ExecStatusKind::Success.to_string(), "ok");
        assert_eq!(ExecStatusKind::Pending.to_string(), "pending");
    }

    #[test]
    fn test_alias_info_creation() {
        let info = AliasInfo::new("reset", vec!["a".into(), "b".into()], "Reset scene");
        assert_eq!(info.name, "reset");
        assert_eq!(info.commands.len(), 2);
    }
}
