//! `import`: reconcile an edited CSV file onto the live configuration.

use std::sync::Arc;

use vmsync_core::{
    CameraRecord, CoreError, DesiredRecord, DeviceRecord, EngineSettings, EntityCatalog,
    EntityKind, HardwareRecord, ReconcileReport, ReconciliationEngine, RecorderRecord, Session,
};

use super::{Ctx, entity_kind, partial_failure};
use crate::cli::{ImportArgs, RecordKind};
use crate::error::CliError;
use crate::{output, tabular};

/// Which live entities the rows are matched against.
enum Live {
    Recorders,
    Hardware,
    Channels(EntityKind),
}

pub async fn handle(args: ImportArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let settings = ctx.settings(args.on_error)?;

    let result = match args.kind {
        RecordKind::Recorder => {
            let rows: Vec<RecorderRecord> = tabular::read_rows(&args.file)?;
            run(rows, Live::Recorders, settings, ctx).await?
        }
        RecordKind::Hardware => {
            let rows: Vec<HardwareRecord> = tabular::read_rows(&args.file)?;
            run(rows, Live::Hardware, settings, ctx).await?
        }
        RecordKind::Camera => {
            let rows: Vec<CameraRecord> = tabular::read_rows(&args.file)?;
            run(rows, Live::Channels(EntityKind::Camera), settings, ctx).await?
        }
        other => {
            let rows: Vec<DeviceRecord> = tabular::read_rows(&args.file)?;
            run(rows, Live::Channels(entity_kind(other)), settings, ctx).await?
        }
    };

    let Some(result) = result else {
        ctx.status(&format!("{} has no rows, nothing to import", args.file.display()));
        return Ok(());
    };

    match result {
        Ok(report) => {
            ctx.print_report(&report, output::reconcile_table)?;
            if !report.unmatched.is_empty() {
                output::print_warning(
                    &format!(
                        "{} row(s) matched no live {}",
                        report.unmatched.len(),
                        args.kind
                    ),
                    ctx.color,
                );
            }
            partial_failure(
                "records",
                report.invalid.len() + report.failed.len(),
                report.total(),
            )
        }
        Err(CoreError::BatchAborted { id, source, report }) => {
            ctx.print_report(report.as_ref(), output::reconcile_table)?;
            Err(CliError::BatchAborted {
                id: id.to_string(),
                reason: source.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Connect and reconcile. `None` when there is nothing to do.
///
/// The outer error covers setup (connection, settings); the inner result
/// is the engine's, so an aborted batch still carries its report.
async fn run<R: DesiredRecord>(
    rows: Vec<R>,
    live: Live,
    settings: EngineSettings,
    ctx: &Ctx<'_>,
) -> Result<Option<Result<ReconcileReport, CoreError>>, CliError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let connection = ctx.connection()?;
    let spinner = ctx.spinner(format!("Importing {} rows", rows.len()));

    let result = Session::oneshot(connection, |session| async move {
        let service = session.service().await?;
        let catalog = EntityCatalog::new(Arc::clone(&service), settings.concurrency);
        let entities = match live {
            Live::Recorders => catalog.recording_servers().await?,
            Live::Hardware => catalog.hardware().await?,
            Live::Channels(kind) => catalog.channels(kind).await?,
        };
        ReconciliationEngine::new(service, settings.concurrency)
            .with_policy(settings.failure_policy)
            .with_task_poller(settings.short_task_poller())
            .reconcile(rows, entities)
            .await
    })
    .await;
    spinner.finish_and_clear();

    // Connection problems stop the run before any report exists.
    match result {
        Err(e @ (CoreError::ConnectionFailed { .. } | CoreError::AuthenticationFailed { .. })) => {
            Err(e.into())
        }
        other => Ok(Some(other)),
    }
}
