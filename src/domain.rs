use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use tracing_error::SpanTrace;

pub type RowId = u64;

pub const DEFAULT_ITEMS_PER_PAGE: usize = 5;

pub const HELP_TEXT: &str = "\
Tab / BackTab   switch page
j / k           move selection down / up
h / l           previous / next page
1-9             go to page
n               new record
e / Enter       edit selected record
d               delete selected record
/               search
s / S           sort by next column / reverse sort
y               copy selected row
?               this help
Esc             close popup / clear search
q               quit

In a form:
Tab / Down      next field
BackTab / Up    previous field
Space           toggle checkbox or option
Left / Right    change selection or option
Enter           select file / save
Ctrl+S          save
Esc             cancel";

#[derive(Debug, thiserror::Error)]
pub enum WardError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("polars error: {source}")]
    PolarsError {
        #[source]
        source: PolarsError,
        span_trace: SpanTrace,
    },
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("file {} rejected: {reason}", .path.display())]
    FileRejected { path: PathBuf, reason: String },
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("unknown row {0}")]
    UnknownRow(RowId),
    #[error("{0} is not permitted on this page")]
    NotPermitted(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging setup failed: {0}")]
    LoggingFailed(String),
}

impl From<PolarsError> for WardError {
    fn from(err: PolarsError) -> Self {
        WardError::PolarsError {
            source: err,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl WardError {
    pub fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            WardError::PolarsError { span_trace, .. } => Some(span_trace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Pharmacist,
    Receptionist,
    Therapist,
    Patient,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Doctor => "Doctor",
            Role::Nurse => "Nurse",
            Role::Pharmacist => "Pharmacist",
            Role::Receptionist => "Receptionist",
            Role::Therapist => "Therapist",
            Role::Patient => "Patient",
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "A tui based clinic administration console.")]
pub struct Args {
    /// Role whose dashboard is shown
    #[arg(short, long, value_enum, default_value_t = Role::Admin)]
    pub role: Role,

    /// Directory holding the mock data csv files
    #[arg(short, long, default_value = "data")]
    pub data_dir: String,

    /// Rows shown per table page
    #[arg(short, long, default_value_t = DEFAULT_ITEMS_PER_PAGE)]
    pub items_per_page: usize,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    pub event_poll_time: u64,

    /// File the log is written to
    #[arg(long, default_value = "ward.log")]
    pub log_file: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct WardConfig {
    pub role: Role,
    pub data_dir: PathBuf,
    pub items_per_page: usize,
    pub event_poll_time: u64,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl TryFrom<Args> for WardConfig {
    type Error = WardError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.items_per_page == 0 {
            return Err(WardError::InvalidConfig(
                "items per page must be greater than zero".into(),
            ));
        }
        Ok(WardConfig {
            role: args.role,
            data_dir: expand_path(&args.data_dir)?,
            items_per_page: args.items_per_page,
            event_poll_time: args.event_poll_time,
            log_file: expand_path(&args.log_file)?,
            log_level: args.log_level,
        })
    }
}

impl Default for WardConfig {
    fn default() -> Self {
        WardConfig {
            role: Role::Admin,
            data_dir: PathBuf::from("data"),
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            event_poll_time: 100,
            log_file: PathBuf::from("ward.log"),
            log_level: "info".into(),
        }
    }
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf, WardError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| WardError::InvalidConfig(format!("cannot expand {path}: {e}")))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PreviousPage,
    GotoPage(usize),
    NextTab,
    PreviousTab,
    Create,
    Edit,
    Delete,
    Search,
    SortNext,
    SortReverse,
    CopyRow,
    Help,
    Confirm,
    Exit,
    RawKey(KeyEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items_per_page: usize) -> Args {
        Args {
            role: Role::Nurse,
            data_dir: "~/ward-data".into(),
            items_per_page,
            event_poll_time: 50,
            log_file: "ward.log".into(),
            log_level: "debug".into(),
        }
    }

    #[test]
    fn config_from_args() {
        let cfg = WardConfig::try_from(args(7)).unwrap();
        assert_eq!(cfg.role, Role::Nurse);
        assert_eq!(cfg.items_per_page, 7);
        assert!(cfg.data_dir.ends_with("ward-data"));
    }

    #[test]
    fn zero_items_per_page_is_rejected() {
        assert!(matches!(
            WardConfig::try_from(args(0)),
            Err(WardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn cli_parses_role() {
        let args = Args::try_parse_from(["ward", "--role", "pharmacist", "-i", "10"]).unwrap();
        assert_eq!(args.role, Role::Pharmacist);
        assert_eq!(args.items_per_page, 10);
        assert_eq!(args.data_dir, "data");
    }
}
