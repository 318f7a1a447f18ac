/*
 * User-facing error taxonomy of the archiver bridge.
 *
 * `PackError` has one variant per failure the bridge can report, each carrying
 * exactly the payload its message needs. Failures reach the host through
 * `ErrorHandlerOperations`, a single-method callback that also answers the two
 * yes/no questions (`PackQuery`) some operations have to ask.
 *
 * Recoverable per-entry problems met while scanning or enumerating (a path that
 * is too long, an unreadable directory) go through `ConfirmOperations` instead,
 * where the user may skip the entry or cancel the whole operation.
 */
use std::sync::Mutex;

/*
 * Meaning of an external tool's exit code, as listed in the per-tool tables.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCategory {
    Warning,
    Fatal,
    Crc,
    Security,
    Disk,
    FileOpen,
    Params,
    Memory,
    NotArchive,
    Internal,
    Break,
    Break2,
    XmsMemory,
    Chapters,
    ExtractLha,
    Temp,
    Skipped,
    Damaged,
    Virus,
    Extract,
    Spawn,
    Unknown,
}

impl ReturnCategory {
    pub fn message(self) -> &'static str {
        match self {
            ReturnCategory::Warning => "Warning: non-fatal error(s) occurred.",
            ReturnCategory::Fatal => "A fatal error occurred.",
            ReturnCategory::Crc => "CRC error, the archive is damaged.",
            ReturnCategory::Security => "Attempt to modify a locked or secured archive.",
            ReturnCategory::Disk => "Error writing to disk.",
            ReturnCategory::FileOpen => "Error opening a file.",
            ReturnCategory::Params => "Invalid command line parameters.",
            ReturnCategory::Memory => "Not enough memory.",
            ReturnCategory::NotArchive => "The file is not an archive.",
            ReturnCategory::Internal => "Internal error of the archiver.",
            ReturnCategory::Break => "Operation interrupted by the user.",
            ReturnCategory::Break2 => "Operation interrupted by the user (Ctrl+Break).",
            ReturnCategory::XmsMemory => "Not enough XMS memory.",
            ReturnCategory::Chapters => "Maximum number of chapters exceeded.",
            ReturnCategory::ExtractLha => "Some files could not be extracted.",
            ReturnCategory::Temp => "Error creating a temporary file.",
            ReturnCategory::Skipped => "Some files were skipped.",
            ReturnCategory::Damaged => "The archive is damaged.",
            ReturnCategory::Virus => "A virus was detected.",
            ReturnCategory::Extract => "Error extracting files.",
            ReturnCategory::Spawn => "The spawning helper failed (invalid parameters).",
            ReturnCategory::Unknown => "Unknown error code.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    // A listing line lacks the configured name column.
    ArcCfg,
    ArcNameUnsupported,
    CmdLineError,
    CmdLineTooLong(String),
    DateTime(String),
    FileData,
    File(String),
    General(String),
    InitDirError,
    InvalidName,
    Move(String),
    NoMemory,
    NoOutput,
    PackerUnsupported,
    Parse,
    Path(String),
    Process { command: String, reason: String },
    Return { command: String, reason: String },
    UnableToRename(String),
    // Not reported to the user; marks an operation the user aborted.
    Cancelled,
}

impl std::fmt::Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackError::ArcCfg => write!(f, "Archiver configuration error: listing column not found."),
            PackError::ArcNameUnsupported => write!(f, "This archive type is not supported."),
            PackError::CmdLineError => write!(f, "Error constructing the command line."),
            PackError::CmdLineTooLong(cmd) => write!(f, "Command line is too long: {cmd}"),
            PackError::DateTime(name) => {
                write!(f, "Invalid date or time in archive listing (first seen at '{name}').")
            }
            PackError::FileData => write!(f, "Error storing file data."),
            PackError::File(reason) => write!(f, "Error creating the temporary list file: {reason}"),
            PackError::General(reason) => write!(f, "{reason}"),
            PackError::InitDirError => write!(f, "Error constructing the working directory."),
            PackError::InvalidName => write!(f, "Renaming during extraction is not supported."),
            PackError::Move(reason) => write!(f, "Error moving extracted files: {reason}"),
            PackError::NoMemory => write!(f, "Not enough memory."),
            PackError::NoOutput => write!(f, "The archiver produced no output."),
            PackError::PackerUnsupported => write!(f, "Packing is not supported for this archive type."),
            PackError::Parse => write!(f, "Error parsing the archiver output."),
            PackError::Path(path) => write!(f, "Path is too long: {path}"),
            PackError::Process { command, reason } => {
                write!(f, "Unable to start '{command}': {reason}")
            }
            PackError::Return { command, reason } => write!(f, "'{command}' failed: {reason}"),
            PackError::UnableToRename(name) => {
                write!(f, "Unable to rename the temporary archive to '{name}'.")
            }
            PackError::Cancelled => write!(f, "Operation cancelled."),
        }
    }
}

impl std::error::Error for PackError {}

pub type Result<T> = std::result::Result<T, PackError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackQuery {
    // The tool cannot move files into archives; answer true to copy instead.
    NoMove,
    // The tool cannot pack into an archive subdirectory; answer true to pack into the root.
    ArcPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackReport {
    Error(PackError),
    Query(PackQuery),
}

pub trait ErrorHandlerOperations: Send + Sync {
    /*
     * Shows an error or asks a question. The return value only matters for
     * queries; for errors it is ignored.
     */
    fn handle(&self, report: &PackReport) -> bool;
}

/*
 * Error handler that logs everything and answers every query with a fixed
 * value. Used by the command-line front end and as a default for callers that
 * have no UI.
 */
pub struct LoggingErrorHandler {
    answer: bool,
}

impl LoggingErrorHandler {
    pub fn new(answer: bool) -> Self {
        LoggingErrorHandler { answer }
    }
}

impl Default for LoggingErrorHandler {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ErrorHandlerOperations for LoggingErrorHandler {
    fn handle(&self, report: &PackReport) -> bool {
        match report {
            PackReport::Error(PackError::Cancelled) => {}
            PackReport::Error(err) => log::error!("PackErrorHandler: {err}"),
            PackReport::Query(query) => {
                log::warn!("PackErrorHandler: Query {query:?} answered with {}", self.answer)
            }
        }
        self.answer
    }
}

/*
 * Reports `err` through `handler` (cancellation stays silent) and hands it back
 * so the caller can return it.
 */
pub fn report_error(handler: &dyn ErrorHandlerOperations, err: PackError) -> PackError {
    if err != PackError::Cancelled {
        handler.handle(&PackReport::Error(err.clone()));
    }
    err
}

pub fn ask(handler: &dyn ErrorHandlerOperations, query: PackQuery) -> bool {
    handler.handle(&PackReport::Query(query))
}

/*
 * Problems the user may skip. `IgnoreAll` behaves like `Continue` and also
 * suppresses further questions of the same kind for the current session.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverableError {
    PathTooLong(String),
    ReadDirectory { path: String, reason: String },
    LinkTarget { path: String, reason: String },
}

impl std::fmt::Display for RecoverableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverableError::PathTooLong(path) => write!(f, "Path is too long: {path}"),
            RecoverableError::ReadDirectory { path, reason } => {
                write!(f, "Error reading directory {path}: {reason}")
            }
            RecoverableError::LinkTarget { path, reason } => {
                write!(f, "Unable to get size of link target {path}: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    IgnoreAll,
    Cancel,
}

pub trait ConfirmOperations: Send + Sync {
    fn confirm(&self, error: &RecoverableError) -> Decision;
}

/*
 * Confirmation callback that always answers the same way and remembers what it
 * was asked. Handy for unattended runs and for tests.
 */
pub struct FixedConfirm {
    decision: Decision,
    asked: Mutex<Vec<RecoverableError>>,
}

impl FixedConfirm {
    pub fn new(decision: Decision) -> Self {
        FixedConfirm {
            decision,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<RecoverableError> {
        match self.asked.lock() {
            Ok(asked) => asked.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ConfirmOperations for FixedConfirm {
    fn confirm(&self, error: &RecoverableError) -> Decision {
        log::warn!("FixedConfirm: {error} -> {:?}", self.decision);
        match self.asked.lock() {
            Ok(mut asked) => asked.push(error.clone()),
            Err(poisoned) => poisoned.into_inner().push(error.clone()),
        }
        self.decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingHandler {
        reports: Mutex<Vec<PackReport>>,
        answer: bool,
    }

    impl ErrorHandlerOperations for RecordingHandler {
        fn handle(&self, report: &PackReport) -> bool {
            self.reports.lock().unwrap().push(report.clone());
            self.answer
        }
    }

    #[test]
    fn test_report_error_skips_cancellation() {
        let handler = RecordingHandler {
            reports: Mutex::new(Vec::new()),
            answer: false,
        };
        let returned = report_error(&handler, PackError::NoOutput);
        assert_eq!(returned, PackError::NoOutput);
        report_error(&handler, PackError::Cancelled);
        let reports = handler.reports.lock().unwrap();
        assert_eq!(*reports, vec![PackReport::Error(PackError::NoOutput)]);
    }

    #[test]
    fn test_ask_returns_handler_answer() {
        let handler = RecordingHandler {
            reports: Mutex::new(Vec::new()),
            answer: true,
        };
        assert!(ask(&handler, PackQuery::NoMove));
        assert_eq!(
            handler.reports.lock().unwrap()[0],
            PackReport::Query(PackQuery::NoMove)
        );
    }

    #[test]
    fn test_return_message_mentions_command() {
        let err = PackError::Return {
            command: "rar".to_string(),
            reason: ReturnCategory::Crc.message().to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("rar"));
        assert!(text.contains("CRC"));
    }

    #[test]
    fn test_fixed_confirm_records_questions() {
        let confirm = FixedConfirm::new(Decision::Cancel);
        let question = RecoverableError::PathTooLong("a\\b".to_string());
        assert_eq!(confirm.confirm(&question), Decision::Cancel);
        assert_eq!(confirm.asked(), vec![question]);
    }
}
