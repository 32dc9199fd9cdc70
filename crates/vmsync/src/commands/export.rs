//! `export`: write live configuration to CSV.

use std::path::Path;

use vmsync_core::{CameraRecord, DeviceRecord, Exporter, HardwareRecord, RecorderRecord, Session};

use super::{Ctx, entity_kind};
use crate::cli::{ExportArgs, RecordKind};
use crate::error::CliError;
use crate::tabular;

enum Exported {
    Recorders(Vec<RecorderRecord>),
    Hardware(Vec<HardwareRecord>),
    Cameras(Vec<CameraRecord>),
    Devices(Vec<DeviceRecord>),
}

impl Exported {
    /// Write the rows and return how many there were.
    fn write(&self, path: &Path) -> Result<usize, CliError> {
        match self {
            Self::Recorders(rows) => tabular::write_rows(path, rows).map(|()| rows.len()),
            Self::Hardware(rows) => tabular::write_rows(path, rows).map(|()| rows.len()),
            Self::Cameras(rows) => tabular::write_rows(path, rows).map(|()| rows.len()),
            Self::Devices(rows) => tabular::write_rows(path, rows).map(|()| rows.len()),
        }
    }
}

pub async fn handle(args: ExportArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let connection = ctx.connection()?;
    let settings = ctx.settings(None)?;
    let kind = args.kind;

    let spinner = ctx.spinner(format!("Exporting {kind}"));
    let exported = Session::oneshot(connection, |session| async move {
        let exporter = Exporter::new(session.service().await?, &settings);
        Ok(match kind {
            RecordKind::Recorder => Exported::Recorders(exporter.recorders().await?),
            RecordKind::Hardware => Exported::Hardware(exporter.hardware().await?),
            RecordKind::Camera => Exported::Cameras(exporter.cameras().await?),
            other => Exported::Devices(exporter.devices(entity_kind(other)).await?),
        })
    })
    .await;
    spinner.finish_and_clear();

    let count = exported?.write(&args.file)?;
    ctx.status(&format!("Exported {count} {kind} to {}", args.file.display()));
    Ok(())
}
