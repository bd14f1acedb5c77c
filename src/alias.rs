//! Alias registry
//!
//! An alias is a named list of literal commands, run in order by
//! `vrun <name>`. Aliases take no arguments.
//!
//! Aliases can also be loaded from YAML:
//!
//! ```yaml
//! reset_scene:
//!   description: Put the furniture back
//!   commands:
//!     - vset /object/Chair/location 0 0 0
//!     - vset /object/Sofa/location 100 0 0
//! status: vget /unrealcv/status
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use dispatch_types::AliasInfo;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Anything that can be turned into the command list of an alias
pub trait IntoAliasCommands {
    fn into_alias_commands(self) -> Vec<String>;
}

impl IntoAliasCommands for &str {
    fn into_alias_commands(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoAliasCommands for String {
    fn into_alias_commands(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoAliasCommands for Vec<String> {
    fn into_alias_commands(self) -> Vec<String> {
        self
    }
}

impl IntoAliasCommands for Vec<&str> {
    fn into_alias_commands(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoAliasCommands for &[&str] {
    fn into_alias_commands(self) -> Vec<String> {
        self.iter().map(|c| c.to_string()).collect()
    }
}

impl<const N: usize> IntoAliasCommands for [&str; N] {
    fn into_alias_commands(self) -> Vec<String> {
        self.iter().map(|c| c.to_string()).collect()
    }
}

#[derive(Debug, Clone)]
struct Alias {
    commands: Vec<String>,
    description: String,
}

/// Registry of named aliases
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    aliases: HashMap<String, Alias>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name`, replacing (with a warning) any previous definition
    pub fn define(
        &mut self,
        name: &str,
        commands: impl IntoAliasCommands,
        description: &str,
    ) {
        let alias = Alias {
            commands: commands.into_alias_commands(),
            description: description.to_string(),
        };
        if self.aliases.contains_key(name) {
            warn!("Alias {} already exists, overwritten.", name);
        }
        debug!("Defined alias {} ({} commands)", name, alias.commands.len());
        self.aliases.insert(name.to_string(), alias);
    }

    /// Commands of `name`, in order. `None` when undefined.
    pub fn resolve(&self, name: &str) -> Option<&[String]> {
        self.aliases.get(name).map(|alias| alias.commands.as_slice())
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(|alias| alias.description.as_str())
    }

    /// Help listing records, sorted by name
    pub fn describe(&self) -> Vec<AliasInfo> {
        let mut infos: Vec<AliasInfo> = self
            .aliases
            .iter()
            .map(|(name, alias)| {
                AliasInfo::new(name.clone(), alias.commands.clone(), alias.description.clone())
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    // -------------------------------------------------------------------------
    // YAML loading
    // -------------------------------------------------------------------------

    /// Define every alias found in a YAML file. Returns the number loaded.
    pub fn load_from_file(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let count = self.load_from_str_named(&content, &format!("{:?}", path))?;
        info!("Loaded {} aliases from {:?}", count, path);
        Ok(count)
    }

    /// Define every alias in a YAML document. Returns the number loaded.
    pub fn load_from_str(&mut self, yaml: &str) -> Result<usize, ConfigError> {
        self.load_from_str_named(yaml, "alias definitions")
    }

    fn load_from_str_named(&mut self, yaml: &str, origin: &str) -> Result<usize, ConfigError> {
        let defs: BTreeMap<String, AliasDef> =
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
                origin: origin.to_string(),
                source,
            })?;

        let count = defs.len();
        for (name, def) in defs {
            let (commands, description) = def.into_parts();
            self.define(&name, commands, &description);
        }
        Ok(count)
    }
}

/// On-disk alias definition: a bare command string or a full record
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AliasDef {
    Single(String),
    Full {
        commands: CommandList,
        #[serde(default)]
        description: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandList {
    One(String),
    Many(Vec<String>),
}

impl AliasDef {
    fn into_parts(self) -> (Vec<String>, String) {
        match self {
            AliasDef::Single(command) => (vec![command], String::new()),
            AliasDef::Full {
                commands,
                description,
            } => {
                let commands = match commands {
                    CommandList::One(command) => vec![command],
                    CommandList::Many(commands) => commands,
                };
                (commands, description)
            }
        }
    }
}
