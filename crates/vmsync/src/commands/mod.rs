//! Command dispatch: bridges CLI args -> core engine -> output formatting.

pub mod config_cmd;
pub mod export;
pub mod import;
pub mod maintenance;
pub mod migrate;
pub mod provision;

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use vmsync_core::{ConnectionConfig, EngineSettings, EntityKind, Session};

use crate::cli::{Command, GlobalOpts, OnError, RecordKind};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Everything a server-bound command needs besides its own arguments.
pub struct Ctx<'a> {
    pub global: &'a GlobalOpts,
    pub config: &'a Config,
    pub color: bool,
}

impl<'a> Ctx<'a> {
    pub fn new(global: &'a GlobalOpts, config: &'a Config) -> Self {
        Self {
            global,
            config,
            color: output::should_color(global.color),
        }
    }

    pub fn connection(&self) -> Result<ConnectionConfig, CliError> {
        config::resolve_connection(self.global, self.config)
    }

    pub fn settings(&self, on_error: Option<OnError>) -> Result<EngineSettings, CliError> {
        config::engine_settings(self.global, self.config, on_error)
    }

    /// Spinner on stderr while a batch runs; hidden when not interactive.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.global.quiet || !io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
            bar.set_style(style);
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }

    /// Render a report to stdout in the selected format.
    pub fn print_report<T: serde::Serialize>(
        &self,
        report: &T,
        table_fn: impl Fn(&T) -> String,
    ) -> Result<(), CliError> {
        let rendered = output::render(self.global.output, report, table_fn)?;
        output::print_output(&rendered, self.global.quiet);
        Ok(())
    }

    pub fn status(&self, message: &str) {
        output::print_status(message, self.global.quiet, self.color);
    }
}

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Ctx<'_>) -> Result<(), CliError> {
    match cmd {
        Command::Export(args) => export::handle(args, ctx).await,
        Command::Import(args) => import::handle(args, ctx).await,
        Command::Migrate(args) => migrate::handle(args, ctx).await,
        Command::Provision(args) => provision::handle(args, ctx).await,
        Command::SetPassword(args) => maintenance::set_password(args, ctx).await,
        Command::Delete(args) => maintenance::delete(args, ctx).await,
        // Config, Completions, and ProvisionTemplate are handled before dispatch
        Command::Config(_) | Command::Completions(_) | Command::ProvisionTemplate(_) => {
            unreachable!()
        }
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

/// Server-side kind of the entities a CSV file describes.
pub fn entity_kind(kind: RecordKind) -> EntityKind {
    match kind {
        RecordKind::Recorder => EntityKind::RecordingServer,
        RecordKind::Hardware => EntityKind::Hardware,
        RecordKind::Camera => EntityKind::Camera,
        RecordKind::Microphone => EntityKind::Microphone,
        RecordKind::Speaker => EntityKind::Speaker,
        RecordKind::Metadata => EntityKind::Metadata,
        RecordKind::Input => EntityKind::Input,
        RecordKind::Output => EntityKind::Output,
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))
}

/// Stop waiting on server tasks when the user presses Ctrl-C.
pub fn cancel_on_ctrl_c(session: &Session) {
    let cancel = session.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, abandoning pending tasks");
            cancel.cancel();
        }
    });
}

/// Turn a non-empty failure count into the partial-failure error.
pub fn partial_failure(what: &str, failed: usize, total: usize) -> Result<(), CliError> {
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::PartialFailure {
            what: what.into(),
            failed,
            total,
        })
    }
}
