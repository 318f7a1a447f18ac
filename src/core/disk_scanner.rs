/*
 * Reads a real directory subtree into a `VirtualDirTree` so that a selection of
 * disk items can be enumerated exactly like a selection inside an archive.
 *
 * The selected top-level entries are copied into the tree's root; every
 * selected directory is then walked recursively with `walkdir`. Unreadable
 * directories are reported through `ConfirmOperations` and skipped unless the
 * user cancels. A `CancelToken` lets the host abort a long walk; cancellation is
 * reported as `DiskScanError::Cancelled`, never as an I/O failure.
 *
 * A separate probe walk only answers "does the selection contain a directory
 * reached through a link?", which hosts use to refuse moving such trees into an
 * archive.
 */
use super::entry::{Entry, FileAttributes};
use super::errors::{ConfirmOperations, Decision, RecoverableError};
use super::virtual_dir::{DirTreeError, VirtualDirTree};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use time::{OffsetDateTime, PrimitiveDateTime};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum DiskScanError {
    Io(io::Error),
    Tree(DirTreeError),
    Cancelled,
}

impl From<io::Error> for DiskScanError {
    fn from(err: io::Error) -> Self {
        DiskScanError::Io(err)
    }
}

impl From<DirTreeError> for DiskScanError {
    fn from(err: DirTreeError) -> Self {
        DiskScanError::Tree(err)
    }
}

impl std::fmt::Display for DiskScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskScanError::Io(e) => write!(f, "I/O error: {e}"),
            DiskScanError::Tree(e) => write!(f, "Directory tree error: {e}"),
            DiskScanError::Cancelled => write!(f, "Directory scan cancelled"),
        }
    }
}

impl std::error::Error for DiskScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiskScanError::Io(e) => Some(e),
            DiskScanError::Tree(e) => Some(e),
            DiskScanError::Cancelled => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiskScanError>;

/*
 * Cooperative stop signal shared between the host (e.g. a wait window's cancel
 * button) and a running scan.
 */
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    // Report the size of a link's target instead of the link itself.
    pub resolve_link_sizes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    NoLinks,
    DirectoryLink(PathBuf),
    Cancelled,
}

pub trait DiskScannerOperations: Send + Sync {
    /*
     * Builds a disk tree for `selected` (entries living directly in
     * `source_dir`). The root of the returned tree holds copies of the selected
     * entries; each selected directory is filled recursively.
     */
    fn read_directory_tree(
        &self,
        source_dir: &Path,
        selected: &[Entry],
        options: ScanOptions,
        confirm: &dyn ConfirmOperations,
        cancel: &CancelToken,
    ) -> Result<VirtualDirTree>;

    // Finds the first directory below the selection that is reached through a link.
    fn probe_directory_links(
        &self,
        source_dir: &Path,
        selected: &[Entry],
        cancel: &CancelToken,
    ) -> ProbeResult;
}

pub struct CoreDiskScanner {}

impl CoreDiskScanner {
    pub fn new() -> Self {
        CoreDiskScanner {}
    }
}

impl Default for CoreDiskScanner {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Per-walk state: the "ignore all" answer for link target errors lasts for the
 * whole scan session.
 */
struct ScanSession<'a> {
    options: ScanOptions,
    confirm: &'a dyn ConfirmOperations,
    cancel: &'a CancelToken,
    ignore_link_errors: bool,
}

impl ScanSession<'_> {
    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::debug!("DiskScanner: Cancellation requested.");
            return Err(DiskScanError::Cancelled);
        }
        Ok(())
    }

    fn ask(&mut self, error: RecoverableError) -> Result<()> {
        match self.confirm.confirm(&error) {
            Decision::Cancel => Err(DiskScanError::Cancelled),
            Decision::IgnoreAll => {
                if matches!(error, RecoverableError::LinkTarget { .. }) {
                    self.ignore_link_errors = true;
                }
                Ok(())
            }
            Decision::Continue => Ok(()),
        }
    }

    // Size of a link's target, or `fallback` if the target cannot be read.
    fn link_target_size(&mut self, path: &Path, fallback: u64) -> Result<u64> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) => {
                log::warn!("DiskScanner: Cannot resolve link target of {path:?}: {e}");
                if !self.ignore_link_errors {
                    self.ask(RecoverableError::LinkTarget {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                }
                Ok(fallback)
            }
        }
    }
}

pub fn system_time_to_primitive(time: std::time::SystemTime) -> PrimitiveDateTime {
    let stamp = OffsetDateTime::from(time);
    PrimitiveDateTime::new(stamp.date(), stamp.time())
}

/*
 * Converts filesystem metadata into an `Entry`. `is_link` comes from the
 * un-followed metadata, everything else from `meta`.
 */
pub fn entry_from_metadata(name: &str, meta: &Metadata, is_link: bool) -> Entry {
    let last_write = meta
        .modified()
        .map(system_time_to_primitive)
        .unwrap_or(super::entry::DOS_EPOCH);
    let mut attributes = FileAttributes::NONE;
    if meta.permissions().readonly() {
        attributes.insert(FileAttributes::READONLY);
    }
    if name.starts_with('.') {
        attributes.insert(FileAttributes::HIDDEN);
    }
    if is_link {
        attributes.insert(FileAttributes::REPARSE_POINT);
    }
    if meta.is_dir() {
        Entry::directory(name, last_write).with_attributes(attributes | FileAttributes::DIRECTORY)
    } else {
        Entry::file(name, meta.len(), last_write)
            .with_attributes(attributes | FileAttributes::ARCHIVE)
    }
}

fn relative_parent(root: &Path, path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("\\")
        })
        .unwrap_or_default()
}

impl DiskScannerOperations for CoreDiskScanner {
    fn read_directory_tree(
        &self,
        source_dir: &Path,
        selected: &[Entry],
        options: ScanOptions,
        confirm: &dyn ConfirmOperations,
        cancel: &CancelToken,
    ) -> Result<VirtualDirTree> {
        log::debug!(
            "DiskScanner: Reading {} selected entries below {source_dir:?} (resolve links: {}).",
            selected.len(),
            options.resolve_link_sizes
        );
        let mut session = ScanSession {
            options,
            confirm,
            cancel,
            ignore_link_errors: false,
        };
        let mut tree = VirtualDirTree::for_disk();

        for entry in selected.iter().filter(|e| e.name != ".." && e.name != ".") {
            session.check_cancel()?;
            let full_path = source_dir.join(&entry.name);
            if entry.is_dir() {
                tree.add_dir("", entry.clone())?;
                tree.node_for_update(&entry.name)?;
                self.walk_selected_dir(&mut session, &mut tree, source_dir, &full_path)?;
            } else {
                let mut copy = entry.clone();
                if session.options.resolve_link_sizes && copy.is_link() {
                    copy.size = session.link_target_size(&full_path, copy.size)?;
                }
                tree.add_file("", copy)?;
            }
        }
        log::debug!(
            "DiskScanner: Scan of {source_dir:?} complete, {} bytes in total.",
            tree.get_size(tree.root(), None)
        );
        Ok(tree)
    }

    fn probe_directory_links(
        &self,
        source_dir: &Path,
        selected: &[Entry],
        cancel: &CancelToken,
    ) -> ProbeResult {
        for entry in selected.iter().filter(|e| e.is_dir() && e.name != "..") {
            let full_path = source_dir.join(&entry.name);
            if entry.is_link() || full_path.is_symlink() {
                log::debug!("DiskScanner: Selected directory {full_path:?} is a link.");
                return ProbeResult::DirectoryLink(full_path);
            }
            for item in WalkDir::new(&full_path).min_depth(1).follow_links(false) {
                if cancel.is_cancelled() {
                    return ProbeResult::Cancelled;
                }
                // Unreadable directories cannot hide links we could follow anyway.
                let Ok(item) = item else { continue };
                if item.path_is_symlink() && item.path().is_dir() {
                    log::debug!("DiskScanner: Found directory link {:?}.", item.path());
                    return ProbeResult::DirectoryLink(item.path().to_path_buf());
                }
            }
        }
        ProbeResult::NoLinks
    }
}

impl CoreDiskScanner {
    fn walk_selected_dir(
        &self,
        session: &mut ScanSession<'_>,
        tree: &mut VirtualDirTree,
        source_dir: &Path,
        dir_path: &Path,
    ) -> Result<()> {
        let walker = WalkDir::new(dir_path)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for item in walker {
            session.check_cancel()?;
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| dir_path.display().to_string());
                    log::warn!("DiskScanner: Error reading {path}: {e}");
                    session.ask(RecoverableError::ReadDirectory {
                        path,
                        reason: e.to_string(),
                    })?;
                    continue;
                }
            };
            let name = item.file_name().to_string_lossy().into_owned();
            if name == "." || name == ".." {
                continue;
            }
            let parent = relative_parent(source_dir, item.path());
            let meta = match item.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    log::warn!("DiskScanner: Cannot stat {:?}: {e}", item.path());
                    session.ask(RecoverableError::ReadDirectory {
                        path: item.path().display().to_string(),
                        reason: e.to_string(),
                    })?;
                    continue;
                }
            };
            let is_link = item.path_is_symlink();
            let mut entry = entry_from_metadata(&name, &meta, is_link);
            if entry.is_dir() {
                log::trace!("DiskScanner: Directory {parent}\\{name}");
                tree.add_dir(&parent, entry)?;
            } else {
                if is_link && !session.options.resolve_link_sizes {
                    // Report the link itself, not what it points to.
                    if let Ok(link_meta) = fs::symlink_metadata(item.path()) {
                        entry.size = link_meta.len();
                    }
                }
                tree.add_file(&parent, entry)?;
            }
        }
        Ok(())
    }
}
