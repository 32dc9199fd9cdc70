//! Clap derive structures for the `vmsync` CLI.
//!
//! Defines the command tree, global flags, and shared value types. This
//! file is also compiled by the build script for man page generation, so
//! it may only depend on clap and the standard library.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vmsync -- bulk configuration for video management systems
#[derive(Debug, Parser)]
#[command(
    name = "vmsync",
    version,
    about = "Bulk-edit, migrate, and provision video management systems",
    long_about = "Export the configuration of a video management system to CSV,\n\
        edit it in a spreadsheet, and import it back. Also migrates hardware\n\
        from a legacy inventory and provisions new hardware in bulk.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "VMSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Management server URL (overrides profile)
    #[arg(long, short = 's', env = "VMSYNC_SERVER", global = true)]
    pub server: Option<String>,

    /// Login username (overrides profile)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Output format for reports
    #[arg(
        long,
        short = 'o',
        env = "VMSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "VMSYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "VMSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Maximum number of items processed in parallel
    #[arg(long, short = 'j', env = "VMSYNC_CONCURRENCY", global = true)]
    pub concurrency: Option<usize>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Entity kinds ─────────────────────────────────────────────────────

/// Kind of entity a CSV file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Recorder,
    Hardware,
    Camera,
    Microphone,
    Speaker,
    Metadata,
    Input,
    Output,
}

/// Accepted prefixes, checked in order.
const KIND_PREFIXES: [(&str, RecordKind); 8] = [
    ("record", RecordKind::Recorder),
    ("hardware", RecordKind::Hardware),
    ("cam", RecordKind::Camera),
    ("mic", RecordKind::Microphone),
    ("speak", RecordKind::Speaker),
    ("meta", RecordKind::Metadata),
    ("in", RecordKind::Input),
    ("out", RecordKind::Output),
];

/// Parse a kind by case-insensitive prefix: `cam`, `Cameras`, and
/// `camera` all name cameras.
pub fn parse_kind(raw: &str) -> Result<RecordKind, String> {
    let lower = raw.trim().to_ascii_lowercase();
    KIND_PREFIXES
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|&(_, kind)| kind)
        .ok_or_else(|| {
            format!(
                "unknown kind '{raw}', expected one of: recorders, hardware, cameras, \
                 microphones, speakers, metadata, inputs, outputs"
            )
        })
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recorder => "recording servers",
            Self::Hardware => "hardware",
            Self::Camera => "cameras",
            Self::Microphone => "microphones",
            Self::Speaker => "speakers",
            Self::Metadata => "metadata",
            Self::Input => "inputs",
            Self::Output => "outputs",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Stop the batch at the first systemic failure
    Abort,
    /// Record the failure and continue with the next row
    Skip,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the live configuration of one entity kind to a CSV file
    #[command(alias = "x")]
    Export(ExportArgs),

    /// Apply an edited CSV file back onto the live configuration
    #[command(alias = "i")]
    Import(ImportArgs),

    /// Move hardware from a legacy inventory onto a recording server
    Migrate(MigrateArgs),

    /// Add new hardware listed in a CSV file
    Provision(ProvisionArgs),

    /// Write an example provisioning CSV file
    ProvisionTemplate(TemplateArgs),

    /// Change the password of every hardware unit
    SetPassword(SetPasswordArgs),

    /// Delete the hardware listed in a CSV file
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Batch commands ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Entity kind (recorders, hardware, cameras, microphones, speakers,
    /// metadata, inputs, outputs; any unique prefix works)
    #[arg(long, value_parser = parse_kind)]
    pub kind: RecordKind,

    /// Destination CSV file
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Entity kind of the rows in the file
    #[arg(long, value_parser = parse_kind)]
    pub kind: RecordKind,

    /// CSV file previously written by `export`
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// What to do after a systemic failure (defaults to the config file)
    #[arg(long)]
    pub on_error: Option<OnError>,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Legacy inventory (JSON)
    #[arg(long)]
    pub source: PathBuf,

    /// Display name of the target recording server
    #[arg(long, short = 'r')]
    pub recorder: String,

    /// Camera group to add migrated cameras to
    #[arg(long, short = 'g')]
    pub group: Option<String>,

    /// Program that decodes legacy credential blobs (default: hex)
    #[arg(long)]
    pub decoder_command: Option<PathBuf>,

    /// Extra arguments passed to the decoder before the blob
    #[arg(long = "decoder-arg", requires = "decoder_command")]
    pub decoder_args: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// CSV file of new hardware (see `provision-template`)
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    /// Where to write the template
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct SetPasswordArgs {
    /// New password (prompted for when omitted)
    #[arg(long, hide_env_values = true, env = "VMSYNC_NEW_PASSWORD")]
    pub value: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Hardware CSV file; every row's id is deleted
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a profile with guided setup
    Init,

    /// Display the current configuration with secrets masked
    Show,

    /// Store a profile's login password in the system keyring
    SetPassword,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_by_prefix() {
        assert_eq!(parse_kind("cam"), Ok(RecordKind::Camera));
        assert_eq!(parse_kind("Cameras"), Ok(RecordKind::Camera));
        assert_eq!(parse_kind("RecordingServers"), Ok(RecordKind::Recorder));
        assert_eq!(parse_kind("inputs"), Ok(RecordKind::Input));
        assert_eq!(parse_kind("OUT"), Ok(RecordKind::Output));
        assert_eq!(parse_kind("metadata"), Ok(RecordKind::Metadata));
    }

    #[test]
    fn unknown_kind_lists_the_choices() {
        let err = parse_kind("doors").unwrap_err();
        assert!(err.contains("doors"));
        assert!(err.contains("microphones"));
    }

    #[test]
    fn command_tree_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
