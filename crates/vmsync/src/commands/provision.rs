//! `provision` and `provision-template`: add new hardware in bulk.

use std::sync::Arc;

use vmsync_core::{NewHardwareRecord, Provisioner, Session};

use super::{Ctx, cancel_on_ctrl_c, partial_failure};
use crate::cli::{GlobalOpts, ProvisionArgs, TemplateArgs};
use crate::error::CliError;
use crate::{output, tabular};

pub async fn handle(args: ProvisionArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let rows: Vec<NewHardwareRecord> = tabular::read_rows(&args.file)?;
    if rows.is_empty() {
        ctx.status(&format!("{} has no rows, nothing to add", args.file.display()));
        return Ok(());
    }
    let connection = ctx.connection()?;
    let settings = ctx.settings(None)?;
    let total = rows.len();

    let spinner = ctx.spinner(format!("Adding {total} hardware units"));
    let report = Session::oneshot(connection, |session| async move {
        cancel_on_ctrl_c(&session);
        let provisioner = Provisioner::new(session.service().await?, &settings)
            .with_cancellation(session.cancellation());
        Ok(Arc::new(provisioner).provision(rows).await)
    })
    .await;
    spinner.finish_and_clear();
    let report = report?;

    ctx.print_report(&report, output::batch_table)?;
    partial_failure("hardware units", report.failed.len(), total)
}

/// Write a one-row example file. Needs no server.
pub fn template(args: &TemplateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    tabular::write_rows(&args.file, &[NewHardwareRecord::template()])?;
    output::print_status(
        &format!("Template written to {}", args.file.display()),
        global.quiet,
        output::should_color(global.color),
    );
    Ok(())
}
