//! command-dispatcher: URI-template command routing
//!
//! Collaborators register command templates such as
//! `vset /object/[str]/color [uint] [uint] [uint]` against handlers; incoming
//! command strings are routed to the first matching template and the
//! captured arguments are handed to its handler.
//!
//! - `template` - template compiler (`[str]`, `[uint]`, `[float]` placeholders)
//! - `registry` - template -> handler bindings, in registration order
//! - `alias` - named command lists, run with `vrun <name>`
//! - `dispatcher` - routing, alias expansion, asynchronous dispatch
//! - `watcher` - background follower for pending results
//! - `status` - `ExecStatus` and promises
//! - `config` - dispatcher configuration
//!
//! ```no_run
//! use command_dispatcher::{CommandArgs, CommandDispatcher, ExecStatus};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dispatcher = CommandDispatcher::new()?;
//! dispatcher.bind(
//!     "vget /object/[str]/location",
//!     |args: &CommandArgs| {
//!         ExecStatus::ok(format!("{} is at 0 0 0", args.get(0).unwrap_or("?")))
//!     },
//!     "Get object location",
//! )?;
//! dispatcher.alias("where", "vget /object/Chair/location", "Locate the chair");
//!
//! let status = dispatcher.exec("vrun where");
//! println!("{}", status.message());
//! # Ok(())
//! # }
//! ```

pub mod alias;
pub mod args;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod status;
pub mod template;
pub mod watcher;

// Re-export commonly used types
pub use alias::{AliasRegistry, IntoAliasCommands};
pub use args::CommandArgs;
pub use config::DispatcherConfig;
pub use dispatch_types::{AliasInfo, CommandInfo, ExecStatusKind, TypeSpecifier};
pub use dispatcher::{CommandDispatcher, CompletionCallback, ALIAS_TEMPLATE};
pub use error::{CommandError, ConfigError, TemplateError};
pub use registry::{BindOutcome, CommandHandler, CommandRegistry, RegistryEntry};
pub use status::{ExecStatus, Promise, PromiseResolver};
pub use template::{compile_template, CommandTemplate, Segment};
pub use watcher::AsyncWatcher;
