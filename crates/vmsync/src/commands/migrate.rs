//! `migrate`: move hardware from a legacy inventory onto a recording server.

use std::path::Path;

use vmsync_core::{
    CommandDecoder, CredentialDecoder, CredentialResolver, HexDecoder, LegacyHardware,
    MigrationOptions, MigrationOrchestrator, Session,
};

use super::{Ctx, cancel_on_ctrl_c, partial_failure};
use crate::cli::MigrateArgs;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: MigrateArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let units = read_inventory(&args.source)?;
    if units.is_empty() {
        ctx.status(&format!("{} lists no hardware", args.source.display()));
        return Ok(());
    }

    let decoder: Box<dyn CredentialDecoder> = match args.decoder_command {
        Some(program) => Box::new(CommandDecoder::new(program, args.decoder_args)),
        None => Box::new(HexDecoder),
    };
    let options = MigrationOptions {
        recorder_name: args.recorder,
        camera_group: args.group,
    };
    let connection = ctx.connection()?;
    let settings = ctx.settings(None)?;
    let total = units.len();

    let spinner = ctx.spinner(format!("Migrating {total} hardware units"));
    let report = Session::oneshot(connection, |session| async move {
        cancel_on_ctrl_c(&session);
        let orchestrator = MigrationOrchestrator::new(
            session.service().await?,
            CredentialResolver::new(decoder),
            options,
            &settings,
        )
        .with_cancellation(session.cancellation());
        Ok(orchestrator.migrate(units).await)
    })
    .await;
    spinner.finish_and_clear();
    let report = report?;

    ctx.print_report(&report, output::batch_table)?;
    if !report.failed.is_empty() {
        output::print_warning(
            &format!(
                "Hardware that was not migrated:\n{}",
                report.failure_lines().join("\n")
            ),
            ctx.color,
        );
    }
    partial_failure("hardware units", report.failed.len(), total)
}

fn read_inventory(path: &Path) -> Result<Vec<LegacyHardware>, CliError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Inventory {
        path: path.display().to_string(),
        source,
    })
}
