/*
 * The virtual directory tree: an in-memory hierarchy of `Entry` records that
 * models archive listings, scanned disk subtrees and plugin listings the same
 * way. Nodes live in an arena owned by `VirtualDirTree` and are addressed by
 * `NodeId`; each node keeps its subdirectories and files in two insertion-ordered
 * sequences plus one lazily allocated child slot per subdirectory, so a shallow
 * listing never forces the whole tree into existence.
 *
 * Positions inside a node use the combined "directories first, then files"
 * numbering. Callers such as the selection enumerator rely on that to decide
 * from a bare index whether it denotes a directory.
 *
 * Paths passed to the tree are relative to its root, use `\` or `/` as
 * separators, and ignore empty components (so a leading separator is harmless).
 */
use super::entry::{DOS_EPOCH, Entry, FileAttributes, ValidData};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, PartialEq, Eq)]
pub enum DirTreeError {
    InvalidName(String),
    DuplicateFile(String),
    DuplicateDir(String),
    PathNotFound(String),
}

impl std::fmt::Display for DirTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirTreeError::InvalidName(name) => write!(f, "Invalid entry name: '{name}'"),
            DirTreeError::DuplicateFile(path) => write!(f, "File already exists: {path}"),
            DirTreeError::DuplicateDir(path) => write!(f, "Directory already exists: {path}"),
            DirTreeError::PathNotFound(path) => write!(f, "Path not found in tree: {path}"),
        }
    }
}

impl std::error::Error for DirTreeError {}

pub type Result<T> = std::result::Result<T, DirTreeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/*
 * Behaviour switches of a tree. `ignore_dup_dirs` makes a second explicit
 * `add_dir` of the same directory a no-op instead of an error; disk trees use it
 * because the same directory can be reached from several selected entries.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeFlags {
    pub case_sensitive: bool,
    pub ignore_dup_dirs: bool,
}

impl TreeFlags {
    pub const ARCHIVE: Self = TreeFlags {
        case_sensitive: false,
        ignore_dup_dirs: false,
    };
    // Names on disk compare the way the host file system compares them.
    pub const DISK: Self = TreeFlags {
        case_sensitive: !cfg!(windows),
        ignore_dup_dirs: true,
    };
}

/*
 * Accumulators filled by `get_size`/`get_dir_size`. The tree only ever adds to
 * them, so a caller summing several subtrees must start from a fresh value.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeSummary {
    pub dirs_count: usize,
    pub files_count: usize,
    pub sizes: Option<Vec<u64>>,
}

impl SizeSummary {
    pub fn with_sizes() -> Self {
        SizeSummary {
            sizes: Some(Vec::new()),
            ..Default::default()
        }
    }
}

/*
 * Releases per-entry plugin payloads before a tree is cleared. A plugin may keep
 * payloads on files only, on directories only, or on both.
 */
pub trait PluginDataOperations {
    fn release_for_files(&self) -> bool;
    fn release_for_dirs(&self) -> bool;
    fn release(&mut self, entry: &mut Entry, is_dir: bool);
}

#[derive(Debug, Clone, Default)]
struct DirNode {
    dirs: Vec<Entry>,
    files: Vec<Entry>,
    children: Vec<Option<NodeId>>,
    implicit: Vec<bool>,
    dir_lookup: HashMap<String, usize>,
    file_lookup: HashMap<String, usize>,
}

const ROOT: NodeId = NodeId(0);
// Shared, never populated node handed out by read-only lookups of empty directories.
const EMPTY: NodeId = NodeId(1);

fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['\\', '/']).filter(|component| !component.is_empty())
}

fn join_tree_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}\\{name}")
    }
}

#[derive(Debug, Clone)]
pub struct VirtualDirTree {
    nodes: Vec<DirNode>,
    flags: TreeFlags,
    valid_data: ValidData,
}

impl VirtualDirTree {
    pub fn new(flags: TreeFlags) -> Self {
        VirtualDirTree {
            nodes: vec![DirNode::default(), DirNode::default()],
            flags,
            valid_data: ValidData::ALL_FS_ARC,
        }
    }

    pub fn for_archive() -> Self {
        Self::new(TreeFlags::ARCHIVE)
    }

    pub fn for_disk() -> Self {
        Self::new(TreeFlags::DISK)
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn flags(&self) -> TreeFlags {
        self.flags
    }

    /*
     * Changes the comparison flags. Lookup maps are rebuilt so a tree populated
     * before the call keeps answering lookups consistently; names that collide
     * under the new comparison resolve to the first one inserted.
     */
    pub fn set_flags(&mut self, flags: TreeFlags) {
        self.flags = flags;
        let case_sensitive = flags.case_sensitive;
        for node in &mut self.nodes {
            node.dir_lookup.clear();
            node.file_lookup.clear();
            for (i, dir) in node.dirs.iter().enumerate() {
                node.dir_lookup
                    .entry(name_key(&dir.name, case_sensitive))
                    .or_insert(i);
            }
            for (i, file) in node.files.iter().enumerate() {
                node.file_lookup
                    .entry(name_key(&file.name, case_sensitive))
                    .or_insert(i);
            }
        }
    }

    pub fn valid_data(&self) -> ValidData {
        self.valid_data
    }

    pub fn set_valid_data(&mut self, valid_data: ValidData) {
        self.valid_data = valid_data;
    }

    pub fn is_empty(&self) -> bool {
        let root = &self.nodes[ROOT.0];
        root.dirs.is_empty() && root.files.is_empty()
    }

    fn key(&self, name: &str) -> String {
        name_key(name, self.flags.case_sensitive)
    }

    fn alloc_child(&mut self, node: NodeId, index: usize) -> NodeId {
        if let Some(child) = self.nodes[node.0].children[index] {
            return child;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(DirNode::default());
        self.nodes[node.0].children[index] = Some(id);
        id
    }

    fn push_dir(&mut self, node: NodeId, entry: Entry, implicit: bool) -> usize {
        let key = self.key(&entry.name);
        let dir = &mut self.nodes[node.0];
        let index = dir.dirs.len();
        dir.dir_lookup.insert(key, index);
        dir.dirs.push(entry);
        dir.children.push(None);
        dir.implicit.push(implicit);
        index
    }

    // Walks `path`, creating placeholder directories for missing components.
    fn descend_creating(&mut self, path: &str) -> NodeId {
        let mut node = ROOT;
        for component in path_components(path) {
            let key = self.key(component);
            let index = match self.nodes[node.0].dir_lookup.get(&key) {
                Some(&index) => index,
                None => {
                    log::trace!("VirtualDirTree: Creating implicit directory '{component}'.");
                    self.push_dir(node, Entry::directory(component, DOS_EPOCH), true)
                }
            };
            node = self.alloc_child(node, index);
        }
        node
    }

    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['\\', '/']) {
            return Err(DirTreeError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    pub fn add_file(&mut self, path: &str, entry: Entry) -> Result<()> {
        Self::check_name(&entry.name)?;
        let node = self.descend_creating(path);
        let key = self.key(&entry.name);
        let dir = &mut self.nodes[node.0];
        if dir.file_lookup.contains_key(&key) {
            return Err(DirTreeError::DuplicateFile(join_tree_path(path, &entry.name)));
        }
        dir.file_lookup.insert(key, dir.files.len());
        dir.files.push(entry);
        Ok(())
    }

    /*
     * Adds a directory record. A directory that was only created implicitly (as
     * a path component of an earlier add) takes over the new record's data;
     * otherwise a repeated add is an error unless the tree ignores duplicate
     * directories, in which case the first record is kept.
     */
    pub fn add_dir(&mut self, path: &str, mut entry: Entry) -> Result<()> {
        Self::check_name(&entry.name)?;
        entry.attributes.insert(FileAttributes::DIRECTORY);
        let node = self.descend_creating(path);
        let key = self.key(&entry.name);
        let ignore_dup_dirs = self.flags.ignore_dup_dirs;
        let dir = &mut self.nodes[node.0];
        if let Some(&index) = dir.dir_lookup.get(&key) {
            if dir.implicit[index] {
                dir.dirs[index] = entry;
                dir.implicit[index] = false;
                return Ok(());
            }
            if ignore_dup_dirs {
                log::trace!("VirtualDirTree: Ignoring duplicate directory '{}'.", entry.name);
                return Ok(());
            }
            return Err(DirTreeError::DuplicateDir(join_tree_path(path, &entry.name)));
        }
        self.push_dir(node, entry, false);
        Ok(())
    }

    /*
     * Read-only resolution of a path. A directory that exists but never had
     * anything added beneath it resolves to a shared empty node, so lookups
     * never allocate. Unknown paths yield `None`.
     */
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        let mut node = ROOT;
        for component in path_components(path) {
            let index = *self.nodes[node.0].dir_lookup.get(&self.key(component))?;
            node = self.nodes[node.0].children[index].unwrap_or(EMPTY);
        }
        Some(node)
    }

    // Resolves a path for modification, allocating child nodes of existing directories.
    pub fn node_for_update(&mut self, path: &str) -> Result<NodeId> {
        let mut node = ROOT;
        for component in path_components(path) {
            let key = self.key(component);
            let Some(&index) = self.nodes[node.0].dir_lookup.get(&key) else {
                return Err(DirTreeError::PathNotFound(path.to_string()));
            };
            node = self.alloc_child(node, index);
        }
        Ok(node)
    }

    // Child node of the directory at `index`; empty for unallocated or invalid indices.
    pub fn child(&self, node: NodeId, index: usize) -> NodeId {
        self.nodes[node.0]
            .children
            .get(index)
            .copied()
            .flatten()
            .unwrap_or(EMPTY)
    }

    pub fn child_for_update(&mut self, node: NodeId, index: usize) -> Option<NodeId> {
        if index >= self.nodes[node.0].dirs.len() {
            return None;
        }
        Some(self.alloc_child(node, index))
    }

    pub fn dirs(&self, node: NodeId) -> &[Entry] {
        &self.nodes[node.0].dirs
    }

    pub fn files(&self, node: NodeId) -> &[Entry] {
        &self.nodes[node.0].files
    }

    pub fn get_dirs(&self, path: &str) -> Option<&[Entry]> {
        self.find_node(path).map(|node| self.dirs(node))
    }

    pub fn get_files(&self, path: &str) -> Option<&[Entry]> {
        self.find_node(path).map(|node| self.files(node))
    }

    pub fn dirs_count(&self, node: NodeId) -> usize {
        self.nodes[node.0].dirs.len()
    }

    pub fn files_count(&self, node: NodeId) -> usize {
        self.nodes[node.0].files.len()
    }

    pub fn is_directory(&self, node: NodeId, index: usize) -> bool {
        index < self.dirs_count(node)
    }

    pub fn is_file(&self, node: NodeId, index: usize) -> bool {
        let dirs = self.dirs_count(node);
        index >= dirs && index < dirs + self.files_count(node)
    }

    pub fn get_dir_ex(&self, node: NodeId, index: usize) -> Option<&Entry> {
        self.nodes[node.0].dirs.get(index)
    }

    pub fn get_file_ex(&self, node: NodeId, index: usize) -> Option<&Entry> {
        let dirs = self.dirs_count(node);
        index
            .checked_sub(dirs)
            .and_then(|file_index| self.nodes[node.0].files.get(file_index))
    }

    // Entry at a combined index, whichever sequence it falls into.
    pub fn entry_at(&self, node: NodeId, index: usize) -> Option<&Entry> {
        self.get_dir_ex(node, index)
            .or_else(|| self.get_file_ex(node, index))
    }

    // Entries may have their flags and sizes changed, never their names.
    pub fn dir_mut(&mut self, node: NodeId, index: usize) -> Option<&mut Entry> {
        self.nodes[node.0].dirs.get_mut(index)
    }

    pub fn file_mut(&mut self, node: NodeId, index: usize) -> Option<&mut Entry> {
        self.nodes[node.0].files.get_mut(index)
    }

    /*
     * Position of `name` in the combined ordering of `node`: directories are
     * searched first, a file match is offset by the number of directories.
     */
    pub fn get_index(&self, node: NodeId, name: &str) -> Option<usize> {
        let dir = &self.nodes[node.0];
        let key = self.key(name);
        if let Some(&index) = dir.dir_lookup.get(&key) {
            return Some(index);
        }
        dir.file_lookup
            .get(&key)
            .map(|&index| index + dir.dirs.len())
    }

    // Record of the directory named by `path` itself; `None` for the root and unknown paths.
    pub fn get_upper_dir(&self, path: &str) -> Option<&Entry> {
        let components: Vec<&str> = path_components(path).collect();
        let (name, parents) = components.split_last()?;
        let parent = self.find_node(&parents.join("\\"))?;
        let index = *self.nodes[parent.0].dir_lookup.get(&self.key(name))?;
        self.nodes[parent.0].dirs.get(index)
    }

    pub fn set_approximate_count(&mut self, node: NodeId, files: usize, dirs: usize) {
        let dir = &mut self.nodes[node.0];
        dir.files.reserve(files);
        dir.file_lookup.reserve(files);
        dir.dirs.reserve(dirs);
        dir.children.reserve(dirs);
        dir.implicit.reserve(dirs);
        dir.dir_lookup.reserve(dirs);
    }

    /*
     * Sum of the sizes of all files beneath `node`, recursively. Counts and the
     * optional per-file size list are added to `summary`.
     */
    pub fn get_size(&self, node: NodeId, mut summary: Option<&mut SizeSummary>) -> u64 {
        let mut total: u64 = 0;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let dir = &self.nodes[current.0];
            for child in &dir.children {
                if let Some(summary) = summary.as_deref_mut() {
                    summary.dirs_count += 1;
                }
                if let Some(child) = child {
                    stack.push(*child);
                }
            }
            for file in &dir.files {
                total += file.size;
                if let Some(summary) = summary.as_deref_mut() {
                    summary.files_count += 1;
                    if let Some(sizes) = summary.sizes.as_mut() {
                        sizes.push(file.size);
                    }
                }
            }
        }
        total
    }

    // Recursive size of the directory `name` inside `path`; zero if it does not exist.
    pub fn get_dir_size(&self, path: &str, name: &str, summary: Option<&mut SizeSummary>) -> u64 {
        let Some(parent) = self.find_node(path) else {
            log::debug!("VirtualDirTree: get_dir_size on unknown path '{path}'.");
            return 0;
        };
        match self.nodes[parent.0].dir_lookup.get(&self.key(name)) {
            Some(&index) => self.get_size(self.child(parent, index), summary),
            None => {
                log::debug!("VirtualDirTree: get_dir_size on unknown directory '{name}' in '{path}'.");
                0
            }
        }
    }

    /*
     * Drops every node. When plugin data handling is supplied, each entry's
     * payload is released first, for files and directories independently.
     */
    pub fn clear(&mut self, plugin_data: Option<&mut dyn PluginDataOperations>) {
        if let Some(plugin_data) = plugin_data {
            let release_files = plugin_data.release_for_files();
            let release_dirs = plugin_data.release_for_dirs();
            for node in &mut self.nodes {
                if release_files {
                    for file in &mut node.files {
                        plugin_data.release(file, false);
                    }
                }
                if release_dirs {
                    for dir in &mut node.dirs {
                        plugin_data.release(dir, true);
                    }
                }
            }
        }
        self.nodes = vec![DirNode::default(), DirNode::default()];
        log::trace!("VirtualDirTree: Cleared.");
    }

    /*
     * SHA-256 over the tree's structure (names, kinds and file sizes in listing
     * order). Two listings of the same archive produce the same value, which
     * lets a caller tell whether a re-listed archive actually changed.
     */
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut stack: Vec<(NodeId, String)> = vec![(ROOT, String::new())];
        while let Some((node, prefix)) = stack.pop() {
            let dir = &self.nodes[node.0];
            for file in &dir.files {
                hasher.update(format!("F {}\n{}\n", join_tree_path(&prefix, &file.name), file.size));
            }
            for (i, sub) in dir.dirs.iter().enumerate().rev() {
                let sub_path = join_tree_path(&prefix, &sub.name);
                hasher.update(format!("D {sub_path}\n"));
                if let Some(child) = dir.children[i] {
                    stack.push((child, sub_path));
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

impl Default for VirtualDirTree {
    fn default() -> Self {
        Self::for_archive()
    }
}

fn name_key(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn file(name: &str, size: u64) -> Entry {
        Entry::file(name, size, DOS_EPOCH)
    }

    fn dir(name: &str) -> Entry {
        Entry::directory(name, DOS_EPOCH)
    }

    fn sample_tree() -> Result<VirtualDirTree> {
        let mut tree = VirtualDirTree::for_archive();
        tree.add_file("", file("readme.txt", 7))?;
        tree.add_dir("", dir("src"))?;
        tree.add_file("src", file("main.rs", 100))?;
        tree.add_file("src\\core", file("mod.rs", 20))?;
        tree.add_file("src/core", file("lib.rs", 30))?;
        tree.add_dir("", dir("empty"))?;
        Ok(tree)
    }

    #[test]
    fn test_directories_index_before_files() -> Result<()> {
        let tree = sample_tree()?;
        let root = tree.root();
        assert_eq!(tree.dirs_count(root), 2);
        assert_eq!(tree.files_count(root), 1);
        assert_eq!(tree.get_index(root, "src"), Some(0));
        assert_eq!(tree.get_index(root, "empty"), Some(1));
        assert_eq!(tree.get_index(root, "readme.txt"), Some(2));
        assert!(tree.is_directory(root, 1));
        assert!(tree.is_file(root, 2));
        assert!(!tree.is_file(root, 3));
        assert_eq!(tree.entry_at(root, 2).map(|e| e.name.as_str()), Some("readme.txt"));
        assert_eq!(tree.get_index(root, "missing"), None);
        Ok(())
    }

    #[test]
    fn test_add_file_creates_intermediate_directories() -> Result<()> {
        let tree = sample_tree()?;
        let core_files = tree.get_files("src\\core").map(|files| files.len());
        assert_eq!(core_files, Some(2));
        let src_dirs: Vec<&str> = tree
            .get_dirs("\\src")
            .map(|dirs| dirs.iter().map(|d| d.name.as_str()).collect())
            .unwrap_or_default();
        assert_eq!(src_dirs, vec!["core"]);
        assert!(tree.get_dirs("src\\nope").is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_names_are_rejected() -> Result<()> {
        let mut tree = sample_tree()?;
        assert_eq!(
            tree.add_file("src", file("MAIN.RS", 1)),
            Err(DirTreeError::DuplicateFile("src\\MAIN.RS".to_string()))
        );
        assert_eq!(
            tree.add_dir("", dir("SRC")),
            Err(DirTreeError::DuplicateDir("SRC".to_string()))
        );
        assert!(matches!(
            tree.add_file("", file("a\\b", 1)),
            Err(DirTreeError::InvalidName(_))
        ));
        Ok(())
    }

    #[test]
    fn test_case_sensitive_tree_keeps_distinct_names() -> Result<()> {
        let mut tree = VirtualDirTree::new(TreeFlags {
            case_sensitive: true,
            ignore_dup_dirs: false,
        });
        tree.add_file("", file("Makefile", 1))?;
        tree.add_file("", file("makefile", 2))?;
        assert_eq!(tree.files_count(tree.root()), 2);
        assert_eq!(tree.get_index(tree.root(), "makefile"), Some(1));
        Ok(())
    }

    #[test]
    fn test_add_dir_replaces_implicit_placeholder() -> Result<()> {
        let mut tree = VirtualDirTree::for_archive();
        tree.add_file("docs", file("a.txt", 1))?;
        let stamp = time::macros::datetime!(2020-05-06 7:08);
        tree.add_dir("", Entry::directory("docs", stamp))?;
        let docs = tree.get_upper_dir("docs").map(|e| e.last_write);
        assert_eq!(docs, Some(stamp));
        // The second explicit add is a genuine duplicate.
        assert!(tree.add_dir("", dir("docs")).is_err());
        Ok(())
    }

    #[test]
    fn test_disk_tree_ignores_duplicate_dirs() -> Result<()> {
        let mut tree = VirtualDirTree::for_disk();
        tree.add_dir("", dir("a"))?;
        tree.add_dir("", dir("a"))?;
        assert_eq!(tree.dirs_count(tree.root()), 1);
        Ok(())
    }

    #[cfg(not(windows))]
    #[test]
    fn test_disk_tree_keeps_names_differing_in_case() -> Result<()> {
        let mut tree = VirtualDirTree::for_disk();
        tree.add_file("", file("Makefile", 1))?;
        tree.add_file("", file("makefile", 2))?;
        assert_eq!(tree.files_count(tree.root()), 2);
        assert_eq!(tree.get_index(tree.root(), "makefile"), Some(1));
        Ok(())
    }

    #[test]
    fn test_get_dir_size_sums_subtree() -> Result<()> {
        let tree = sample_tree()?;
        let mut summary = SizeSummary::with_sizes();
        let size = tree.get_dir_size("", "src", Some(&mut summary));
        assert_eq!(size, 150);
        assert_eq!(summary.files_count, 3);
        assert_eq!(summary.dirs_count, 1);
        let mut sizes = summary.sizes.unwrap_or_default();
        sizes.sort();
        assert_eq!(sizes, vec![20, 30, 100]);

        assert_eq!(tree.get_dir_size("", "empty", None), 0);
        assert_eq!(tree.get_dir_size("", "missing", None), 0);
        assert_eq!(tree.get_size(tree.root(), None), 157);
        Ok(())
    }

    #[test]
    fn test_read_only_lookup_of_empty_dir_does_not_allocate() -> Result<()> {
        let mut tree = sample_tree()?;
        let before = tree.nodes.len();
        let empty = tree.find_node("empty");
        assert_eq!(empty, Some(EMPTY));
        assert_eq!(tree.nodes.len(), before);

        let updated = tree.node_for_update("empty")?;
        assert_ne!(updated, EMPTY);
        assert_eq!(tree.nodes.len(), before + 1);
        assert!(tree.node_for_update("nowhere").is_err());
        Ok(())
    }

    #[test]
    fn test_get_upper_dir() -> Result<()> {
        let tree = sample_tree()?;
        assert_eq!(tree.get_upper_dir("src\\core").map(|e| e.name.as_str()), Some("core"));
        assert!(tree.get_upper_dir("").is_none());
        assert!(tree.get_upper_dir("src\\zzz").is_none());
        Ok(())
    }

    struct RecordingPluginData {
        released: Mutex<Vec<(String, bool)>>,
    }

    impl PluginDataOperations for RecordingPluginData {
        fn release_for_files(&self) -> bool {
            true
        }
        fn release_for_dirs(&self) -> bool {
            false
        }
        fn release(&mut self, entry: &mut Entry, is_dir: bool) {
            entry.plugin_data = None;
            if let Ok(mut released) = self.released.lock() {
                released.push((entry.name.clone(), is_dir));
            }
        }
    }

    #[test]
    fn test_clear_releases_plugin_data_for_files_only() -> Result<()> {
        let mut tree = sample_tree()?;
        let mut plugin = RecordingPluginData {
            released: Mutex::new(Vec::new()),
        };
        tree.clear(Some(&mut plugin));
        let released = plugin.released.lock().unwrap();
        assert_eq!(released.len(), 4);
        assert!(released.iter().all(|(_, is_dir)| !is_dir));
        assert!(tree.is_empty());
        Ok(())
    }

    #[test]
    fn test_fingerprint_tracks_content() -> Result<()> {
        let first = sample_tree()?;
        let second = sample_tree()?;
        assert_eq!(first.fingerprint(), second.fingerprint());

        let mut changed = sample_tree()?;
        changed.add_file("src", file("extra.rs", 1))?;
        assert_ne!(first.fingerprint(), changed.fingerprint());
        Ok(())
    }

    #[test]
    fn test_set_flags_rebuilds_lookup() -> Result<()> {
        let mut tree = VirtualDirTree::for_archive();
        tree.add_file("", file("Data.BIN", 1))?;
        tree.set_flags(TreeFlags {
            case_sensitive: true,
            ignore_dup_dirs: false,
        });
        assert_eq!(tree.get_index(tree.root(), "data.bin"), None);
        assert_eq!(tree.get_index(tree.root(), "Data.BIN"), Some(0));
        Ok(())
    }
}
