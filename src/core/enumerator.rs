/*
 * Resumable enumeration of a user's selection.
 *
 * A `SelectionEnumerator` walks the selected entries of one directory level,
 * either inside an archive's `VirtualDirTree` or on disk, and hands out one item
 * per call. In the recursive modes it descends depth-first into selected
 * directories and reports each directory when it is left (after all of its
 * descendants), so callers can for example remove directories that became
 * empty. No separate item is produced when a directory is entered.
 *
 * Disk selections are scanned lazily: the `DiskScannerOperations` walk only
 * runs on the first descent (or the first link size lookup), and its tree is
 * kept for later passes.
 *
 * Paths longer than `MAX_PATH` are offered to `ConfirmOperations`: continuing
 * skips the offending file or subtree, cancelling ends the enumeration.
 *
 * The traversal is an explicit state machine (`State`) driven by `step`, with a
 * stack of `Frame`s holding the node being walked and the next child position.
 */
use super::disk_scanner::{CancelToken, DiskScanError, DiskScannerOperations, ScanOptions};
use super::entry::Entry;
use super::errors::{ConfirmOperations, Decision, RecoverableError};
use super::virtual_dir::{NodeId, VirtualDirTree};
use std::path::{Path, PathBuf};

pub const MAX_PATH: usize = 260;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMode {
    // One item per selected entry, no recursion.
    Flat,
    // Files, plus directories on exit.
    Recursive,
    // Like `Recursive` but files inside subdirectories are skipped.
    DirsOnly,
    // Like `Recursive`, reporting link target sizes for selected files.
    RecursiveLinkSizes,
}

impl EnumMode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(EnumMode::Flat),
            1 => Some(EnumMode::Recursive),
            2 => Some(EnumMode::DirsOnly),
            3 => Some(EnumMode::RecursiveLinkSizes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumItem {
    // Path relative to the enumerated level, `\` separated.
    pub name: String,
    // Same path built from short names, when it differs from `name`.
    pub dos_name: Option<String>,
    pub is_dir: bool,
    pub size: u64,
    pub entry: Option<Entry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnumOutcome {
    Item(EnumItem),
    Done,
    Cancelled,
    Error(String),
}

/*
 * The enumeration callback consumed by archiver operations. `reset` rewinds
 * the cursor so the same selection can be walked a second time.
 */
pub trait SelectionEnumOperations {
    fn next_item(&mut self, mode: EnumMode) -> EnumOutcome;
    fn reset(&mut self);

    /*
     * Numeric request form: -1 resets and reports `Done`, 0..=3 select the mode.
     */
    fn request(&mut self, code: i32) -> EnumOutcome {
        if code == -1 {
            self.reset();
            return EnumOutcome::Done;
        }
        match EnumMode::from_code(code) {
            Some(mode) => self.next_item(mode),
            None => EnumOutcome::Error(format!("Unknown enumeration mode {code}")),
        }
    }
}

enum Source<'a> {
    Archive {
        tree: &'a VirtualDirTree,
        level: NodeId,
    },
    Disk {
        source_dir: PathBuf,
        scanner: &'a dyn DiskScannerOperations,
        tree: Option<VirtualDirTree>,
        scanned_with: Option<ScanOptions>,
    },
}

#[derive(Debug, Clone)]
struct Frame {
    node: NodeId,
    next_index: usize,
    path: String,
    dos_path: String,
    // Directory record reported again on exit; `None` for selected top levels.
    entry: Option<Entry>,
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    Descending {
        path: String,
        dos_path: String,
        node: Option<NodeId>,
        entry: Option<Entry>,
    },
    InSubtree,
    Exiting,
}

enum Step {
    Continue,
    Yield(EnumOutcome),
}

fn path_len(text: &str) -> usize {
    text.chars().count()
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}\\{name}")
    }
}

pub struct SelectionEnumerator<'a> {
    source: Source<'a>,
    selected: Vec<Entry>,
    base_path: String,
    confirm: &'a dyn ConfirmOperations,
    cancel: CancelToken,
    current: usize,
    stack: Vec<Frame>,
    state: State,
}

impl<'a> SelectionEnumerator<'a> {
    /*
     * Selection of `indices` (combined directories-then-files positions) in the
     * directory `zip_path` of an archive tree. Unknown indices are ignored.
     */
    pub fn for_archive(
        tree: &'a VirtualDirTree,
        zip_path: &str,
        indices: &[usize],
        confirm: &'a dyn ConfirmOperations,
    ) -> Self {
        let zip_path = zip_path.trim_matches(['\\', '/']).replace('/', "\\");
        let (level, selected) = match tree.find_node(&zip_path) {
            Some(level) => (
                level,
                indices
                    .iter()
                    .filter_map(|&i| tree.entry_at(level, i).cloned())
                    .collect(),
            ),
            None => {
                log::warn!("SelectionEnumerator: Archive path '{zip_path}' does not exist.");
                (tree.root(), Vec::new())
            }
        };
        SelectionEnumerator {
            source: Source::Archive { tree, level },
            selected,
            base_path: zip_path,
            confirm,
            cancel: CancelToken::new(),
            current: 0,
            stack: Vec::new(),
            state: State::Idle,
        }
    }

    // Selection of `entries`, all living directly in `source_dir` on disk.
    pub fn for_disk(
        source_dir: &Path,
        entries: Vec<Entry>,
        scanner: &'a dyn DiskScannerOperations,
        confirm: &'a dyn ConfirmOperations,
        cancel: CancelToken,
    ) -> Self {
        let selected = entries.into_iter().filter(|e| e.name != "..").collect();
        SelectionEnumerator {
            source: Source::Disk {
                source_dir: source_dir.to_path_buf(),
                scanner,
                tree: None,
                scanned_with: None,
            },
            selected,
            base_path: String::new(),
            confirm,
            cancel,
            current: 0,
            stack: Vec::new(),
            state: State::Idle,
        }
    }

    pub fn selected(&self) -> &[Entry] {
        &self.selected
    }

    fn tree(&self) -> Option<&VirtualDirTree> {
        match &self.source {
            Source::Archive { tree, .. } => Some(*tree),
            Source::Disk { tree, .. } => tree.as_ref(),
        }
    }

    fn full_len(&self, relative: &str) -> usize {
        if self.base_path.is_empty() {
            path_len(relative)
        } else {
            path_len(&self.base_path) + 1 + path_len(relative)
        }
    }

    fn full_path(&self, relative: &str) -> String {
        join(&self.base_path, relative)
    }

    /*
     * Builds the disk tree if it is missing, or rebuilds it when link target
     * sizes are needed but the existing tree was read without them.
     */
    fn ensure_disk_tree(&mut self, mode: EnumMode) -> Result<(), EnumOutcome> {
        let wanted = ScanOptions {
            resolve_link_sizes: mode == EnumMode::RecursiveLinkSizes,
        };
        let Source::Disk {
            source_dir,
            scanner,
            tree,
            scanned_with,
        } = &mut self.source
        else {
            return Ok(());
        };
        let up_to_date = match scanned_with {
            Some(previous) => !wanted.resolve_link_sizes || previous.resolve_link_sizes,
            None => false,
        };
        if tree.is_some() && up_to_date {
            return Ok(());
        }
        log::debug!("SelectionEnumerator: Scanning disk selection below {source_dir:?}.");
        match scanner.read_directory_tree(
            source_dir,
            &self.selected,
            wanted,
            self.confirm,
            &self.cancel,
        ) {
            Ok(scanned) => {
                *tree = Some(scanned);
                *scanned_with = Some(wanted);
                Ok(())
            }
            Err(DiskScanError::Cancelled) => Err(EnumOutcome::Cancelled),
            Err(e) => {
                log::error!("SelectionEnumerator: Disk scan failed: {e}");
                Err(EnumOutcome::Error(e.to_string()))
            }
        }
    }

    // Node of a selected top-level directory.
    fn resolve_top_node(&mut self, name: &str, mode: EnumMode) -> Result<NodeId, EnumOutcome> {
        if matches!(self.source, Source::Disk { .. }) {
            self.ensure_disk_tree(mode)?;
        }
        let level = match &self.source {
            Source::Archive { level, .. } => *level,
            Source::Disk { tree, .. } => match tree {
                Some(tree) => tree.root(),
                None => return Err(EnumOutcome::Error("Disk tree missing".to_string())),
            },
        };
        let tree = self
            .tree()
            .ok_or_else(|| EnumOutcome::Error("Disk tree missing".to_string()))?;
        match tree.get_index(level, name) {
            Some(index) if tree.is_directory(level, index) => Ok(tree.child(level, index)),
            _ => Err(EnumOutcome::Error(format!(
                "Directory '{name}' not found in tree"
            ))),
        }
    }

    // Size to report for a selected file, following links in link-size mode.
    fn top_file_size(&mut self, entry: &Entry, mode: EnumMode) -> Result<u64, EnumOutcome> {
        if mode != EnumMode::RecursiveLinkSizes
            || !entry.is_link()
            || !matches!(self.source, Source::Disk { .. })
        {
            return Ok(entry.size);
        }
        self.ensure_disk_tree(mode)?;
        let Some(tree) = self.tree() else {
            return Ok(entry.size);
        };
        let root = tree.root();
        Ok(tree
            .get_index(root, &entry.name)
            .and_then(|index| tree.get_file_ex(root, index))
            .map_or(entry.size, |file| file.size))
    }

    fn flat_dir_size(&self, name: &str) -> Option<u64> {
        match &self.source {
            Source::Archive { tree, .. } => Some(tree.get_dir_size(&self.base_path, name, None)),
            Source::Disk { tree, .. } => tree.as_ref().map(|tree| tree.get_dir_size("", name, None)),
        }
    }

    // Returns `Some(outcome)` when the user cancelled, `None` to skip the entry.
    fn report_overflow(&self, relative: &str) -> Option<EnumOutcome> {
        let path = self.full_path(relative);
        log::warn!("SelectionEnumerator: Path too long: {path}");
        match self.confirm.confirm(&RecoverableError::PathTooLong(path)) {
            Decision::Cancel => Some(EnumOutcome::Cancelled),
            Decision::Continue | Decision::IgnoreAll => None,
        }
    }

    fn step(&mut self, mode: EnumMode) -> Step {
        match self.state.clone() {
            State::Idle => self.step_idle(mode),
            State::Descending {
                path,
                dos_path,
                node,
                entry,
            } => self.step_descending(mode, path, dos_path, node, entry),
            State::InSubtree => self.step_in_subtree(mode),
            State::Exiting => self.step_exiting(),
        }
    }

    fn step_idle(&mut self, mode: EnumMode) -> Step {
        let Some(entry) = self.selected.get(self.current).cloned() else {
            return Step::Yield(EnumOutcome::Done);
        };

        if mode == EnumMode::Flat {
            if entry.is_dir() && matches!(self.source, Source::Disk { .. }) {
                if let Err(outcome) = self.ensure_disk_tree(mode) {
                    return Step::Yield(outcome);
                }
            }
            self.current += 1;
            let size = if entry.is_dir() {
                self.flat_dir_size(&entry.name).unwrap_or(entry.size)
            } else {
                entry.size
            };
            return Step::Yield(EnumOutcome::Item(EnumItem {
                name: entry.name.clone(),
                dos_name: entry.dos_name.clone(),
                is_dir: entry.is_dir(),
                size,
                entry: Some(entry),
            }));
        }

        if self.full_len(&entry.name) >= MAX_PATH {
            if let Some(outcome) = self.report_overflow(&entry.name) {
                return Step::Yield(outcome);
            }
            self.current += 1;
            return Step::Continue;
        }

        if entry.is_dir() {
            self.state = State::Descending {
                path: entry.name.clone(),
                dos_path: entry.short_name().to_string(),
                node: None,
                entry: None,
            };
            return Step::Continue;
        }

        let size = match self.top_file_size(&entry, mode) {
            Ok(size) => size,
            Err(outcome) => return Step::Yield(outcome),
        };
        self.current += 1;
        Step::Yield(EnumOutcome::Item(EnumItem {
            name: entry.name.clone(),
            dos_name: entry.dos_name.clone(),
            is_dir: false,
            size,
            entry: Some(entry),
        }))
    }

    fn step_descending(
        &mut self,
        mode: EnumMode,
        path: String,
        dos_path: String,
        node: Option<NodeId>,
        entry: Option<Entry>,
    ) -> Step {
        let node = match node {
            Some(node) => node,
            None => match self.resolve_top_node(&path, mode) {
                Ok(node) => node,
                Err(outcome) => return Step::Yield(outcome),
            },
        };
        log::trace!("SelectionEnumerator: Entering '{path}'.");
        self.stack.push(Frame {
            node,
            next_index: 0,
            path,
            dos_path,
            entry,
        });
        self.state = State::InSubtree;
        Step::Continue
    }

    fn step_in_subtree(&mut self, mode: EnumMode) -> Step {
        let Some(frame) = self.stack.last().cloned() else {
            self.state = State::Idle;
            return Step::Continue;
        };
        let Some(tree) = self.tree() else {
            return Step::Yield(EnumOutcome::Error("Disk tree missing".to_string()));
        };
        let index = frame.next_index;
        let dirs_count = tree.dirs_count(frame.node);
        let files_count = tree.files_count(frame.node);

        if index >= dirs_count + files_count {
            self.state = State::Exiting;
            return Step::Continue;
        }

        let is_dir = index < dirs_count;
        let (entry, child) = if is_dir {
            (
                tree.get_dir_ex(frame.node, index).cloned(),
                Some(tree.child(frame.node, index)),
            )
        } else {
            (tree.get_file_ex(frame.node, index).cloned(), None)
        };
        if let Some(top) = self.stack.last_mut() {
            top.next_index += 1;
        }
        let Some(entry) = entry else {
            return Step::Continue;
        };
        if !is_dir && mode == EnumMode::DirsOnly {
            return Step::Continue;
        }

        let path = join(&frame.path, &entry.name);
        let dos_path = join(&frame.dos_path, entry.short_name());
        // Files count from the enumerated level, directories from the archive root.
        let logical_len = if is_dir {
            self.full_len(&path)
        } else {
            path_len(&path)
        };
        let dos_too_long =
            matches!(self.source, Source::Disk { .. }) && path_len(&dos_path) >= MAX_PATH;
        if logical_len >= MAX_PATH || dos_too_long {
            return match self.report_overflow(&path) {
                Some(outcome) => Step::Yield(outcome),
                None => Step::Continue,
            };
        }

        if is_dir {
            self.state = State::Descending {
                path,
                dos_path,
                node: child,
                entry: Some(entry),
            };
            return Step::Continue;
        }

        Step::Yield(EnumOutcome::Item(EnumItem {
            dos_name: (dos_path != path).then_some(dos_path),
            name: path,
            is_dir: false,
            size: entry.size,
            entry: Some(entry),
        }))
    }

    fn step_exiting(&mut self) -> Step {
        let Some(frame) = self.stack.pop() else {
            self.state = State::Idle;
            return Step::Continue;
        };
        log::trace!("SelectionEnumerator: Leaving '{}'.", frame.path);
        let entry = if self.stack.is_empty() {
            self.state = State::Idle;
            let entry = self.selected.get(self.current).cloned();
            self.current += 1;
            entry
        } else {
            self.state = State::InSubtree;
            frame.entry
        };
        Step::Yield(EnumOutcome::Item(EnumItem {
            dos_name: (frame.dos_path != frame.path).then_some(frame.dos_path),
            name: frame.path,
            is_dir: true,
            size: 0,
            entry,
        }))
    }
}

impl SelectionEnumOperations for SelectionEnumerator<'_> {
    fn next_item(&mut self, mode: EnumMode) -> EnumOutcome {
        loop {
            if let Step::Yield(outcome) = self.step(mode) {
                return outcome;
            }
        }
    }

    fn reset(&mut self) {
        log::trace!("SelectionEnumerator: Reset.");
        self.current = 0;
        self.stack.clear();
        self.state = State::Idle;
    }
}

/*
 * Replays a fixed list of items. Used where a selection has already been
 * materialised (e.g. a mask match) and by tests.
 */
pub struct ListEnumerator {
    items: Vec<EnumItem>,
    position: usize,
}

impl ListEnumerator {
    pub fn new(items: Vec<EnumItem>) -> Self {
        ListEnumerator { items, position: 0 }
    }
}

impl SelectionEnumOperations for ListEnumerator {
    fn next_item(&mut self, _mode: EnumMode) -> EnumOutcome {
        match self.items.get(self.position) {
            Some(item) => {
                self.position += 1;
                EnumOutcome::Item(item.clone())
            }
            None => EnumOutcome::Done,
        }
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::disk_scanner::{CoreDiskScanner, entry_from_metadata};
    use crate::core::entry::DOS_EPOCH;
    use crate::core::errors::FixedConfirm;
    use std::fs::{self, File};
    use std::io::{self, Write};
    use tempfile::tempdir;

    fn collect(enumerator: &mut dyn SelectionEnumOperations, mode: EnumMode) -> Vec<(String, bool, u64)> {
        let mut items = Vec::new();
        loop {
            match enumerator.next_item(mode) {
                EnumOutcome::Item(item) => items.push((item.name, item.is_dir, item.size)),
                EnumOutcome::Done => break,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        items
    }

    fn archive_tree() -> VirtualDirTree {
        let mut tree = VirtualDirTree::for_archive();
        tree.add_dir("", Entry::directory("docs", DOS_EPOCH)).unwrap();
        tree.add_file("docs", Entry::file("guide.txt", 4, DOS_EPOCH)).unwrap();
        tree.add_dir("docs", Entry::directory("img", DOS_EPOCH)).unwrap();
        tree.add_file("docs\\img", Entry::file("logo.png", 8, DOS_EPOCH)).unwrap();
        tree.add_dir("docs", Entry::directory("empty", DOS_EPOCH)).unwrap();
        tree.add_file("", Entry::file("readme.md", 2, DOS_EPOCH)).unwrap();
        tree
    }

    #[test]
    fn test_flat_mode_reports_selection_only() {
        let tree = archive_tree();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0, 1], &confirm);
        let items = collect(&mut enumerator, EnumMode::Flat);
        assert_eq!(
            items,
            vec![
                ("docs".to_string(), true, 12),
                ("readme.md".to_string(), false, 2)
            ]
        );
    }

    #[test]
    fn test_recursive_mode_reports_exits_after_descendants() {
        let tree = archive_tree();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0, 1], &confirm);
        let items = collect(&mut enumerator, EnumMode::Recursive);
        assert_eq!(
            items,
            vec![
                ("docs\\img\\logo.png".to_string(), false, 8),
                ("docs\\img".to_string(), true, 0),
                ("docs\\empty".to_string(), true, 0),
                ("docs\\guide.txt".to_string(), false, 4),
                ("docs".to_string(), true, 0),
                ("readme.md".to_string(), false, 2),
            ]
        );
    }

    #[test]
    fn test_dirs_only_mode_skips_nested_files() {
        let tree = archive_tree();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0], &confirm);
        let items = collect(&mut enumerator, EnumMode::DirsOnly);
        let names: Vec<&str> = items.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, vec!["docs\\img", "docs\\empty", "docs"]);
    }

    #[test]
    fn test_paths_are_relative_to_archive_directory() {
        let tree = archive_tree();
        let confirm = FixedConfirm::new(Decision::Continue);
        // Inside "docs": img=0, empty=1, guide.txt=2
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "\\docs", &[0, 2], &confirm);
        let items = collect(&mut enumerator, EnumMode::Recursive);
        let names: Vec<&str> = items.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, vec!["img\\logo.png", "img", "guide.txt"]);
    }

    #[test]
    fn test_reset_replays_identical_sequence() {
        let tree = archive_tree();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0, 1], &confirm);
        let first = collect(&mut enumerator, EnumMode::Recursive);
        assert_eq!(enumerator.request(-1), EnumOutcome::Done);
        let second = collect(&mut enumerator, EnumMode::Recursive);
        assert_eq!(first, second);
    }

    #[test]
    fn test_recursive_items_rebuild_isomorphic_tree() {
        let tree = archive_tree();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0, 1], &confirm);
        let mut rebuilt = VirtualDirTree::for_archive();
        for (name, is_dir, size) in collect(&mut enumerator, EnumMode::Recursive) {
            let (parent, leaf) = match name.rfind('\\') {
                Some(pos) => (name[..pos].to_string(), name[pos + 1..].to_string()),
                None => (String::new(), name.clone()),
            };
            if is_dir {
                rebuilt.add_dir(&parent, Entry::directory(leaf, DOS_EPOCH)).unwrap();
            } else {
                rebuilt.add_file(&parent, Entry::file(leaf, size, DOS_EPOCH)).unwrap();
            }
        }
        assert_eq!(rebuilt.get_dir_size("", "docs", None), 12);
        assert_eq!(rebuilt.get_files("docs\\img").map(|f| f.len()), Some(1));
        assert_eq!(rebuilt.get_dirs("docs").map(|d| d.len()), Some(2));
        assert_eq!(rebuilt.files_count(rebuilt.root()), 1);
    }

    #[test]
    fn test_overflow_skips_entry_and_resumes_with_next_sibling() {
        let long_name = "n".repeat(MAX_PATH - 3);
        let mut tree = VirtualDirTree::for_archive();
        tree.add_file("dir", Entry::file(long_name.clone(), 1, DOS_EPOCH)).unwrap();
        tree.add_file("dir", Entry::file("ok.txt", 2, DOS_EPOCH)).unwrap();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0], &confirm);
        let items = collect(&mut enumerator, EnumMode::Recursive);
        let names: Vec<&str> = items.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, vec!["dir\\ok.txt", "dir"]);
        assert_eq!(
            confirm.asked(),
            vec![RecoverableError::PathTooLong(format!("dir\\{long_name}"))]
        );
    }

    #[test]
    fn test_overflow_cancel_stops_enumeration() {
        let long_name = "n".repeat(MAX_PATH);
        let mut tree = VirtualDirTree::for_archive();
        tree.add_dir("", Entry::directory(long_name, DOS_EPOCH)).unwrap();
        let confirm = FixedConfirm::new(Decision::Cancel);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0], &confirm);
        assert_eq!(enumerator.next_item(EnumMode::Recursive), EnumOutcome::Cancelled);
    }

    fn setup_test_dir(base: &Path) -> io::Result<()> {
        fs::create_dir_all(base.join("src").join("sub"))?;
        File::create(base.join("src").join("a.txt"))?.write_all(&[0u8; 10])?;
        File::create(base.join("src").join("sub").join("b.txt"))?.write_all(&[0u8; 5])?;
        Ok(())
    }

    #[test]
    fn test_disk_selection_walks_scanned_tree() -> io::Result<()> {
        let dir = tempdir()?;
        setup_test_dir(dir.path())?;
        let meta = fs::metadata(dir.path().join("src"))?;
        let selected = vec![entry_from_metadata("src", &meta, false)];
        let scanner = CoreDiskScanner::new();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator =
            SelectionEnumerator::for_disk(dir.path(), selected, &scanner, &confirm, CancelToken::new());

        let items = collect(&mut enumerator, EnumMode::Recursive);
        assert_eq!(
            items,
            vec![
                ("src\\sub\\b.txt".to_string(), false, 5),
                ("src\\sub".to_string(), true, 0),
                ("src\\a.txt".to_string(), false, 10),
                ("src".to_string(), true, 0),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_cancelled_disk_scan_reports_cancellation() -> io::Result<()> {
        let dir = tempdir()?;
        setup_test_dir(dir.path())?;
        let meta = fs::metadata(dir.path().join("src"))?;
        let selected = vec![entry_from_metadata("src", &meta, false)];
        let scanner = CoreDiskScanner::new();
        let confirm = FixedConfirm::new(Decision::Continue);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut enumerator =
            SelectionEnumerator::for_disk(dir.path(), selected, &scanner, &confirm, cancel);
        assert_eq!(enumerator.next_item(EnumMode::Recursive), EnumOutcome::Cancelled);
        Ok(())
    }

    #[test]
    fn test_nested_exit_items_carry_directory_entry() {
        let tree = archive_tree();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, "", &[0], &confirm);
        let mut exits = Vec::new();
        loop {
            match enumerator.next_item(EnumMode::Recursive) {
                EnumOutcome::Item(item) if item.is_dir => exits.push(item),
                EnumOutcome::Item(_) => {}
                EnumOutcome::Done => break,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        let names: Vec<(&str, Option<&str>)> = exits
            .iter()
            .map(|item| (item.name.as_str(), item.entry.as_ref().map(|e| e.name.as_str())))
            .collect();
        assert_eq!(
            names,
            vec![
                ("docs\\img", Some("img")),
                ("docs\\empty", Some("empty")),
                ("docs", Some("docs")),
            ]
        );
        assert!(exits.iter().all(|item| item.entry.as_ref().is_some_and(Entry::is_dir)));
    }

    #[test]
    fn test_file_length_excludes_archive_path_but_directory_length_includes_it() {
        let base = "b".repeat(100);
        let file_name = "f".repeat(198);
        let dir_name = "l".repeat(160);
        let mut tree = VirtualDirTree::for_archive();
        tree.add_file(&format!("{base}\\d"), Entry::file(file_name.clone(), 7, DOS_EPOCH)).unwrap();
        tree.add_dir(&format!("{base}\\d"), Entry::directory(dir_name.clone(), DOS_EPOCH)).unwrap();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator = SelectionEnumerator::for_archive(&tree, &base, &[0], &confirm);

        let items = collect(&mut enumerator, EnumMode::Recursive);
        assert_eq!(
            items,
            vec![
                (format!("d\\{file_name}"), false, 7),
                ("d".to_string(), true, 0),
            ]
        );
        assert_eq!(
            confirm.asked(),
            vec![RecoverableError::PathTooLong(format!("{base}\\d\\{dir_name}"))]
        );
    }

    #[test]
    fn test_flat_mode_reports_disk_directory_size_on_first_pass() -> io::Result<()> {
        let dir = tempdir()?;
        setup_test_dir(dir.path())?;
        let meta = fs::metadata(dir.path().join("src"))?;
        let selected = vec![entry_from_metadata("src", &meta, false)];
        let scanner = CoreDiskScanner::new();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator =
            SelectionEnumerator::for_disk(dir.path(), selected, &scanner, &confirm, CancelToken::new());

        let first = collect(&mut enumerator, EnumMode::Flat);
        assert_eq!(first, vec![("src".to_string(), true, 15)]);
        enumerator.reset();
        collect(&mut enumerator, EnumMode::Recursive);
        enumerator.reset();
        assert_eq!(collect(&mut enumerator, EnumMode::Flat), first);
        Ok(())
    }

    #[cfg(not(windows))]
    #[test]
    fn test_disk_names_differing_in_case_are_enumerated() -> io::Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("src"))?;
        File::create(dir.path().join("src").join("Makefile"))?.write_all(&[0u8; 3])?;
        File::create(dir.path().join("src").join("makefile"))?.write_all(&[0u8; 4])?;
        let meta = fs::metadata(dir.path().join("src"))?;
        let selected = vec![entry_from_metadata("src", &meta, false)];
        let scanner = CoreDiskScanner::new();
        let confirm = FixedConfirm::new(Decision::Continue);
        let mut enumerator =
            SelectionEnumerator::for_disk(dir.path(), selected, &scanner, &confirm, CancelToken::new());

        let mut files: Vec<(String, u64)> = collect(&mut enumerator, EnumMode::Recursive)
            .into_iter()
            .filter(|(_, is_dir, _)| !is_dir)
            .map(|(name, _, size)| (name, size))
            .collect();
        files.sort();
        assert_eq!(
            files,
            vec![("src\\Makefile".to_string(), 3), ("src\\makefile".to_string(), 4)]
        );
        Ok(())
    }

    #[test]
    fn test_list_enumerator_replays_items() {
        let item = EnumItem {
            name: "x".to_string(),
            dos_name: None,
            is_dir: false,
            size: 1,
            entry: None,
        };
        let mut list = ListEnumerator::new(vec![item.clone()]);
        assert_eq!(list.next_item(EnumMode::Recursive), EnumOutcome::Item(item.clone()));
        assert_eq!(list.next_item(EnumMode::Recursive), EnumOutcome::Done);
        assert_eq!(list.request(-1), EnumOutcome::Done);
        assert_eq!(list.next_item(EnumMode::Recursive), EnumOutcome::Item(item));
    }
}
