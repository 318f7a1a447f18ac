/*
 * Auto-configuration of archiver executables. The given directories are
 * searched recursively for the program names each archiver is known by; when
 * several copies exist the most recently modified one is taken.
 */
use super::archiver_config::{ARCHIVERS, ArchiverConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

const EXECUTABLE_EXTENSIONS: [&str; 4] = ["exe", "com", "bat", "cmd"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRole {
    Packer,
    Unpacker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTool {
    pub archiver_index: usize,
    pub role: ToolRole,
    pub path: PathBuf,
}

pub trait ToolLocatorOperations: Send + Sync {
    fn locate(&self, search_dirs: &[PathBuf]) -> Vec<LocatedTool>;
}

pub struct CoreToolLocator {}

impl CoreToolLocator {
    pub fn new() -> Self {
        CoreToolLocator {}
    }
}

impl Default for CoreToolLocator {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Program name a file would be invoked as: its lowercase name, with a known
 * executable extension removed.
 */
fn program_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?.to_lowercase();
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if EXECUTABLE_EXTENSIONS.contains(&ext) => Some(stem.to_string()),
        _ => Some(file_name),
    }
}

fn wanted_names() -> Vec<String> {
    let mut names: Vec<String> = ARCHIVERS
        .iter()
        .flat_map(|d| std::iter::once(d.packer_executable).chain(d.unpacker_executable))
        .map(str::to_lowercase)
        .collect();
    names.sort();
    names.dedup();
    names
}

impl ToolLocatorOperations for CoreToolLocator {
    fn locate(&self, search_dirs: &[PathBuf]) -> Vec<LocatedTool> {
        let wanted = wanted_names();
        let mut newest: HashMap<String, (SystemTime, PathBuf)> = HashMap::new();

        for dir in search_dirs {
            log::debug!("ToolLocator: Searching {dir:?}");
            for item in WalkDir::new(dir).follow_links(true) {
                let item = match item {
                    Ok(item) => item,
                    Err(e) => {
                        log::warn!("ToolLocator: Skipping unreadable entry: {e}");
                        continue;
                    }
                };
                if !item.file_type().is_file() {
                    continue;
                }
                let Some(name) = program_name(item.path()) else { continue };
                if wanted.binary_search(&name).is_err() {
                    continue;
                }
                let modified = item
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                let replace = newest
                    .get(&name)
                    .is_none_or(|(current, _)| modified > *current);
                if replace {
                    log::trace!("ToolLocator: Candidate {:?} for '{name}'", item.path());
                    newest.insert(name, (modified, item.path().to_path_buf()));
                }
            }
        }

        let mut found = Vec::new();
        for (index, descriptor) in ARCHIVERS.iter().enumerate() {
            if let Some((_, path)) = newest.get(&descriptor.packer_executable.to_lowercase()) {
                found.push(LocatedTool {
                    archiver_index: index,
                    role: ToolRole::Packer,
                    path: path.clone(),
                });
            }
            if let Some((_, path)) = descriptor
                .unpacker_executable
                .and_then(|exe| newest.get(&exe.to_lowercase()))
            {
                found.push(LocatedTool {
                    archiver_index: index,
                    role: ToolRole::Unpacker,
                    path: path.clone(),
                });
            }
        }
        log::info!("ToolLocator: Located {} executable(s).", found.len());
        found
    }
}

/*
 * Writes located paths into `config`. Returns how many settings changed.
 */
pub fn apply_located(config: &mut ArchiverConfig, located: &[LocatedTool]) -> usize {
    let mut changed = 0;
    for tool in located {
        let path = tool.path.to_string_lossy();
        let before = match tool.role {
            ToolRole::Packer => config.packer_exe(tool.archiver_index).map(str::to_string),
            ToolRole::Unpacker => config.unpacker_exe(tool.archiver_index).map(str::to_string),
        };
        match tool.role {
            ToolRole::Packer => config.set_packer_exe(tool.archiver_index, Some(&path)),
            ToolRole::Unpacker => config.set_unpacker_exe(tool.archiver_index, Some(&path)),
        }
        if before.as_deref() != Some(path.as_ref()) {
            changed += 1;
        }
    }
    changed
}
