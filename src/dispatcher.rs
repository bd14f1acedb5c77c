//! Command dispatcher
//!
//! Routes command strings to bound handlers. The dispatcher lives on one
//! coordinating thread: it is `Send` (it can be moved to that thread) but not
//! `Sync`, so `exec` can never run concurrently with itself and handlers are
//! never invoked in parallel.
//!
//! ## Routing
//!
//! Templates are tried in registration order and the first full-string match
//! wins. Captured arguments are passed to the handler and its status is
//! returned unchanged.
//!
//! ## Asynchronous commands
//!
//! `exec_async` dispatches synchronously. A `Pending` result is handed to the
//! [`AsyncWatcher`]; its completion is delivered when the coordinating thread
//! calls `pump_completions` or `wait_for_completion`. Only one asynchronous
//! command may be outstanding.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::marker::PhantomData;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::alias::{AliasRegistry, IntoAliasCommands};
use crate::args::CommandArgs;
use crate::config::DispatcherConfig;
use crate::error::{CommandError, ConfigError, TemplateError};
use crate::registry::{BindOutcome, BoundHandler, CommandHandler, CommandRegistry};
use crate::status::ExecStatus;
use crate::watcher::AsyncWatcher;

/// Template of the built-in alias runner
pub const ALIAS_TEMPLATE: &str = "vrun [str]";

/// Completion callback for `exec_async`
pub type CompletionCallback = Box<dyn FnOnce(ExecStatus) + Send>;

/// Registry, aliases and async watcher behind one command surface
pub struct CommandDispatcher {
    config: DispatcherConfig,
    registry: CommandRegistry,
    aliases: AliasRegistry,
    watcher: AsyncWatcher,
    /// Callback of the outstanding asynchronous command
    pending: Option<CompletionCallback>,
    _not_sync: PhantomData<Cell<()>>,
}

impl CommandDispatcher {
    /// Dispatcher with default configuration
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(DispatcherConfig::default())
    }

    /// Build a dispatcher, start its watcher on a dedicated runtime and
    /// register `vrun [str]`. Aliases from `config.alias_file` are defined
    /// when set.
    pub fn with_config(config: DispatcherConfig) -> Result<Self, ConfigError> {
        let watcher = AsyncWatcher::spawn(&config).map_err(ConfigError::WatcherSpawn)?;
        Self::assemble(config, watcher)
    }

    /// Like `with_config`, but the watcher runs as a task on `runtime`
    pub fn with_runtime(
        config: DispatcherConfig,
        runtime: &tokio::runtime::Handle,
    ) -> Result<Self, ConfigError> {
        let watcher = AsyncWatcher::spawn_on(&config, runtime);
        Self::assemble(config, watcher)
    }

    fn assemble(config: DispatcherConfig, watcher: AsyncWatcher) -> Result<Self, ConfigError> {
        let mut registry = CommandRegistry::new();
        registry.bind_handler(ALIAS_TEMPLATE, BoundHandler::RunAlias, "Run an alias")?;

        let mut aliases = AliasRegistry::new();
        if let Some(path) = &config.alias_file {
            aliases.load_from_file(path)?;
        }

        info!(
            "Command dispatcher ready ({} aliases defined)",
            aliases.len()
        );

        Ok(Self {
            config,
            registry,
            aliases,
            watcher,
            pending: None,
            _not_sync: PhantomData,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Bind `handler` to `template`. See [`CommandRegistry::bind`].
    pub fn bind<H>(
        &mut self,
        template: &str,
        handler: H,
        description: &str,
    ) -> Result<BindOutcome, TemplateError>
    where
        H: CommandHandler + 'static,
    {
        self.registry.bind(template, handler, description)
    }

    /// Define an alias run by `vrun <name>`
    pub fn alias(&mut self, name: &str, commands: impl IntoAliasCommands, description: &str) {
        self.aliases.define(name, commands, description);
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasRegistry {
        &mut self.aliases
    }

    /// Raw template -> description
    pub fn descriptions(&self) -> &BTreeMap<String, String> {
        self.registry.descriptions()
    }

    /// Human readable listing of commands and aliases
    pub fn help_text(&self) -> String {
        let commands = self.registry.describe();
        let width = commands.iter().map(|c| c.template.len()).max().unwrap_or(0);

        let mut out = String::new();
        for info in &commands {
            let _ = writeln!(
                out,
                "{:<width$}  {}",
                info.template,
                info.description,
                width = width
            );
        }

        let aliases = self.aliases.describe();
        if !aliases.is_empty() {
            let _ = writeln!(out, "\nAliases (vrun <name>):");
            for info in &aliases {
                let description = if info.description.is_empty() {
                    info.commands.join("; ")
                } else {
                    info.description.clone()
                };
                let _ = writeln!(out, "  {}  {}", info.name, description);
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Synchronous dispatch
    // -------------------------------------------------------------------------

    /// Run `command` through the first matching handler
    pub fn exec(&self, command: &str) -> ExecStatus {
        self.exec_at_depth(command, 0)
    }

    fn exec_at_depth(&self, command: &str, depth: usize) -> ExecStatus {
        let Some((entry, args)) = self.registry.find(command, self.config.max_args) else {
            debug!("No handler for '{}'", command);
            return ExecStatus::Error(CommandError::NoHandlerFound {
                command: command.to_string(),
            });
        };

        debug!(
            "Dispatching '{}' to '{}' with {} args",
            command,
            entry.template().raw(),
            args.len()
        );
        match &entry.handler {
            BoundHandler::External(handler) => handler.handle(&args),
            BoundHandler::RunAlias => self.run_alias(&args, depth),
        }
    }

    /// `vrun <name>`: run every command of the alias in order.
    ///
    /// Messages are concatenated. A failing sub-command does not stop the
    /// sequence and does not change the overall status.
    fn run_alias(&self, args: &CommandArgs, depth: usize) -> ExecStatus {
        if args.len() != 1 {
            return ExecStatus::Error(CommandError::InvalidArity { got: args.len() });
        }
        let name = args.get(0).unwrap_or_default();

        let Some(commands) = self.aliases.resolve(name) else {
            return ExecStatus::Error(CommandError::UnrecognizedAlias {
                alias: name.to_string(),
            });
        };
        if depth >= self.config.max_alias_depth {
            return ExecStatus::Error(CommandError::AliasDepthExceeded {
                alias: name.to_string(),
                depth: self.config.max_alias_depth,
            });
        }

        let mut message = String::new();
        for command in commands {
            let status = self.exec_at_depth(command, depth + 1);
            match &status {
                ExecStatus::Error(err) => {
                    warn!("Alias {} command '{}' failed: {}", name, command, err)
                }
                ExecStatus::Pending(_) => warn!(
                    "Alias {} command '{}' returned a pending result, which is not awaited",
                    name, command
                ),
                ExecStatus::Success(_) => {}
            }
            message.push_str(&status.message());
        }
        ExecStatus::Success(message)
    }

    // -------------------------------------------------------------------------
    // Asynchronous dispatch
    // -------------------------------------------------------------------------

    /// Run `command` and deliver its final status to `on_complete`.
    ///
    /// A non-pending result is delivered before this returns. A pending
    /// result is delivered by a later `pump_completions` or
    /// `wait_for_completion`. While one is outstanding, further calls are
    /// rejected with `CommandError::WatcherBusy` and `on_complete` is dropped
    /// unused. After `shutdown` every call is rejected with
    /// `CommandError::WatcherStopped`.
    pub fn exec_async<F>(&mut self, command: &str, on_complete: F) -> Result<(), CommandError>
    where
        F: FnOnce(ExecStatus) + Send + 'static,
    {
        if !self.watcher.is_running() {
            error!("Async watcher has stopped, rejected '{}'", command);
            return Err(CommandError::WatcherStopped);
        }
        if self.pending.is_some() || !self.watcher.try_acquire() {
            error!("There are pending tasks, rejected '{}'", command);
            return Err(CommandError::WatcherBusy);
        }

        match self.exec(command) {
            ExecStatus::Pending(promise) => match self.watcher.watch(promise) {
                Ok(()) => {
                    debug!("'{}' is pending, watching for completion", command);
                    self.pending = Some(Box::new(on_complete));
                }
                Err(err) => {
                    self.watcher.release();
                    on_complete(ExecStatus::Error(err));
                }
            },
            status => {
                self.watcher.release();
                on_complete(status);
            }
        }
        Ok(())
    }

    /// Whether an asynchronous command is outstanding
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Deliver a resolved asynchronous result, if any. Never blocks.
    /// Returns the number of callbacks invoked.
    pub fn pump_completions(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(status) = self.watcher.try_completion() {
            delivered += self.deliver(status);
        }
        delivered
    }

    /// Block up to `timeout` for the outstanding asynchronous command and
    /// deliver it. Returns `true` when a callback ran.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        if self.pending.is_none() {
            return false;
        }
        match self.watcher.wait_completion(timeout) {
            Some(status) => self.deliver(status) > 0,
            None => false,
        }
    }

    fn deliver(&mut self, status: ExecStatus) -> usize {
        let Some(on_complete) = self.pending.take() else {
            warn!("Dropping completion with no waiting callback: {}", status);
            return 0;
        };
        on_complete(status);
        self.watcher.release();
        1
    }

    /// Stop the watcher. An outstanding callback is dropped uncalled.
    pub fn shutdown(&mut self) {
        if self.pending.take().is_some() {
            warn!("Shutting down with an outstanding asynchronous command");
        }
        self.watcher.release();
        self.watcher.shutdown();
    }
}
