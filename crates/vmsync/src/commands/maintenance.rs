//! `set-password` and `delete`: bulk hardware maintenance.

use std::sync::Arc;

use secrecy::SecretString;
use serde::Deserialize;

use vmsync_core::{EntityCatalog, EntityId, Maintenance, Session};

use super::{Ctx, cancel_on_ctrl_c, confirm, partial_failure};
use crate::cli::{DeleteArgs, SetPasswordArgs};
use crate::error::CliError;
use crate::{output, tabular};

pub async fn set_password(args: SetPasswordArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let password = match args.value {
        Some(value) => value,
        None => prompt_new_password()?,
    };
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "value".into(),
            reason: "the new password cannot be empty".into(),
        });
    }
    if !confirm(
        "Change the password of every hardware unit?",
        "set-password",
        args.yes,
    )? {
        ctx.status("Cancelled");
        return Ok(());
    }

    let connection = ctx.connection()?;
    let settings = ctx.settings(None)?;
    let password = SecretString::from(password);

    let spinner = ctx.spinner("Changing hardware passwords");
    let report = Session::oneshot(connection, |session| async move {
        cancel_on_ctrl_c(&session);
        let service = session.service().await?;
        let hardware = EntityCatalog::new(Arc::clone(&service), settings.concurrency)
            .hardware()
            .await?;
        Ok(Maintenance::new(service, &settings)
            .with_cancellation(session.cancellation())
            .change_passwords(hardware, password)
            .await)
    })
    .await;
    spinner.finish_and_clear();
    let report = report?;

    ctx.print_report(&report, output::maintenance_table)?;
    partial_failure(
        "password changes",
        report.failed.len(),
        report.succeeded.len() + report.failed.len(),
    )
}

fn prompt_new_password() -> Result<String, CliError> {
    let first = rpassword::prompt_password("New hardware password: ")?;
    let second = rpassword::prompt_password("Repeat password: ")?;
    if first != second {
        return Err(CliError::Validation {
            field: "value".into(),
            reason: "the passwords do not match".into(),
        });
    }
    Ok(first)
}

/// Any exported hardware file works; only the id column is read.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdRow {
    read_only_id: EntityId,
}

pub async fn delete(args: DeleteArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let rows: Vec<IdRow> = tabular::read_rows(&args.file)?;
    let ids: Vec<EntityId> = rows.into_iter().map(|r| r.read_only_id).collect();
    if ids.is_empty() {
        ctx.status(&format!("{} has no rows, nothing to delete", args.file.display()));
        return Ok(());
    }
    if !confirm(
        &format!("Delete {} hardware unit(s)? This cannot be undone", ids.len()),
        "delete",
        args.yes,
    )? {
        ctx.status("Cancelled");
        return Ok(());
    }

    let connection = ctx.connection()?;
    let settings = ctx.settings(None)?;
    let total = ids.len();

    let spinner = ctx.spinner(format!("Deleting {total} hardware units"));
    let report = Session::oneshot(connection, |session| async move {
        cancel_on_ctrl_c(&session);
        let service = session.service().await?;
        let live = EntityCatalog::new(Arc::clone(&service), settings.concurrency)
            .hardware()
            .await?;
        Ok(Maintenance::new(service, &settings)
            .with_cancellation(session.cancellation())
            .delete_hardware(&ids, &live)
            .await)
    })
    .await;
    spinner.finish_and_clear();
    let report = report?;

    ctx.print_report(&report, output::maintenance_table)?;
    let missing = total - report.succeeded.len() - report.failed.len();
    if missing > 0 {
        output::print_warning(
            &format!("{missing} id(s) matched no hardware and were skipped"),
            ctx.color,
        );
    }
    partial_failure("deletions", report.failed.len(), total)
}
