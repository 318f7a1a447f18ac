/*
 * Platform-agnostic core of the archiver bridge: the in-memory directory tree
 * that stands for an archive's contents, the disk scanner and selection
 * enumerators that feed it, the format registry and per-archiver tables, and
 * the operations that drive an external archiver (`PackBridge`). Key traits
 * such as `ToolRunnerOperations`, `ErrorHandlerOperations` and
 * `ConfigManagerOperations` are re-exported so front ends can swap in their own
 * implementations.
 */
pub mod archiver_config;
pub mod config;
pub mod disk_scanner;
pub mod entry;
pub mod enumerator;
pub mod errors;
pub mod format_registry;
pub mod list_parser;
pub mod pack_ops;
pub mod template;
pub mod tool_locator;
pub mod tool_runner;
pub mod virtual_dir;

// Tree model
pub use entry::{DOS_EPOCH, Entry, FileAttributes, ValidData};
pub use virtual_dir::{DirTreeError, NodeId, PluginDataOperations, SizeSummary, VirtualDirTree};

// Disk scanning and selection enumeration
pub use disk_scanner::{
    CancelToken, CoreDiskScanner, DiskScanError, DiskScannerOperations, ScanOptions,
};
pub use enumerator::{
    EnumItem, EnumMode, EnumOutcome, ListEnumerator, SelectionEnumOperations, SelectionEnumerator,
};

// Errors and user interaction
pub use errors::{
    ConfirmOperations, Decision, ErrorHandlerOperations, FixedConfirm, LoggingErrorHandler,
    PackError, PackQuery, PackReport, RecoverableError,
};

// Formats and archiver tables
pub use archiver_config::{ARCHIVERS, ArchiverConfig, ArchiverSettings};
pub use format_registry::{FormatRecord, FormatRegistry, HandlerRef};

// Driving the external tools
pub use pack_ops::{MaskEnumerator, PackBridge, pack_enum_mask};
pub use template::{CoreShortNameResolver, ShortNameOperations};
pub use tool_locator::{CoreToolLocator, LocatedTool, ToolLocatorOperations, apply_located};
pub use tool_runner::{
    CoreToolRunner, LoggingRunnerHost, RunnerHostOperations, ToolOutput, ToolRunnerOperations,
};

// Persisted settings
pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, PackSettings};
