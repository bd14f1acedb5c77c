//! Command registry
//!
//! Maps compiled templates to handlers. Entries keep their registration
//! order; routing walks them front to back and the first structural match
//! wins, so overlapping templates are resolved by order, not specificity.
//!
//! Re-binding a template whose compiled pattern is already present replaces
//! the handler in place (the entry keeps its original slot) and logs a
//! warning.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dispatch_types::CommandInfo;
use tracing::{debug, error, warn};

use crate::args::CommandArgs;
use crate::error::TemplateError;
use crate::status::ExecStatus;
use crate::template::{compile_template, CommandTemplate};

// =============================================================================
// HANDLERS
// =============================================================================

/// A command implementation bound to a template.
///
/// Implemented for every `Fn(&CommandArgs) -> ExecStatus`, so closures can be
/// bound directly.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, args: &CommandArgs) -> ExecStatus;
}

impl<F> CommandHandler for F
where
    F: Fn(&CommandArgs) -> ExecStatus + Send + Sync,
{
    fn handle(&self, args: &CommandArgs) -> ExecStatus {
        self(args)
    }
}

/// What runs when an entry matches
#[derive(Clone)]
pub(crate) enum BoundHandler {
    /// Handler supplied by a collaborator
    External(Arc<dyn CommandHandler>),
    /// The dispatcher's own `vrun [str]`
    RunAlias,
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundHandler::External(_) => f.write_str("External"),
            BoundHandler::RunAlias => f.write_str("RunAlias"),
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Outcome of a successful bind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// New pattern, appended after existing entries
    Inserted,
    /// Pattern already bound; handler replaced in place
    Replaced,
}

/// One bound template
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    template: CommandTemplate,
    pub(crate) handler: BoundHandler,
    description: String,
}

impl RegistryEntry {
    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Registry of command templates, in registration order
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: Vec<RegistryEntry>,
    /// Compiled pattern -> index into `entries`
    by_pattern: HashMap<String, usize>,
    /// Raw template -> description, for help listings
    descriptions: BTreeMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `raw_template` and bind `handler` to it.
    ///
    /// A malformed template is a programming error in a command definition;
    /// it is logged and returned so setup can abort.
    pub fn bind<H>(
        &mut self,
        raw_template: &str,
        handler: H,
        description: &str,
    ) -> Result<BindOutcome, TemplateError>
    where
        H: CommandHandler + 'static,
    {
        self.bind_handler(
            raw_template,
            BoundHandler::External(Arc::new(handler)),
            description,
        )
    }

    pub(crate) fn bind_handler(
        &mut self,
        raw_template: &str,
        handler: BoundHandler,
        description: &str,
    ) -> Result<BindOutcome, TemplateError> {
        let template = compile_template(raw_template).map_err(|e| {
            error!("The template {} is malformed: {}", raw_template, e);
            e
        })?;
        Ok(self.insert(template, handler, description))
    }

    pub(crate) fn insert(
        &mut self,
        template: CommandTemplate,
        handler: BoundHandler,
        description: &str,
    ) -> BindOutcome {
        let entry = RegistryEntry {
            template,
            handler,
            description: description.to_string(),
        };
        self.descriptions
            .insert(entry.template.raw().to_string(), description.to_string());

        let existing = self.by_pattern.get(entry.template.pattern()).copied();
        match existing {
            Some(slot) => {
                warn!(
                    "The template {} already exists, overwritten.",
                    entry.template.pattern()
                );
                let previous_raw = self.entries[slot].template.raw().to_string();
                if previous_raw != entry.template.raw() {
                    self.descriptions.remove(&previous_raw);
                }
                self.entries[slot] = entry;
                BindOutcome::Replaced
            }
            None => {
                debug!("Bound template {}", entry.template.raw());
                self.by_pattern
                    .insert(entry.template.pattern().to_string(), self.entries.len());
                self.entries.push(entry);
                BindOutcome::Inserted
            }
        }
    }

    /// First entry, in registration order, whose template matches the whole
    /// of `command`, together with the extracted arguments.
    pub fn find(&self, command: &str, max_args: usize) -> Option<(&RegistryEntry, CommandArgs)> {
        self.entries.iter().find_map(|entry| {
            entry
                .template
                .captures(command, max_args)
                .map(|args| (entry, CommandArgs::new(args)))
        })
    }

    /// Raw template -> description
    pub fn descriptions(&self) -> &BTreeMap<String, String> {
        &self.descriptions
    }

    /// Help listing records, sorted by raw template
    pub fn describe(&self) -> Vec<CommandInfo> {
        self.descriptions
            .iter()
            .map(|(template, description)| CommandInfo::new(template, description))
            .collect()
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn contains_pattern(&self, pattern: &str) -> bool {
        self.by_pattern.contains_key(pattern)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
