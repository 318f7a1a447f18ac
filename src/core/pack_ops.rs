/*
 * Archive operations carried out by external archivers: listing, extracting a
 * selection or a single file, packing and deleting.
 *
 * Every operation resolves the archive's format through the registry, expands
 * the archiver's command and working directory templates, writes the
 * selection into a temporary list file when the tool needs one, runs the tool
 * and decodes its exit code. Failures are shown once through the error handler
 * and returned; a cancelled selection returns `PackError::Cancelled` without a
 * message. Temporary files and directories are removed on every path.
 */
use super::archiver_config::{ArchiverConfig, BrowseConfig, EmptyDirMode, ErrorTable, ListEncoding, ModifyConfig};
use super::enumerator::{EnumItem, EnumMode, EnumOutcome, MAX_PATH, SelectionEnumOperations};
use super::errors::{ErrorHandlerOperations, PackError, PackQuery, Result, ask, report_error};
use super::format_registry::{FormatRegistry, HandlerRef};
use super::list_parser::{ListingSession, parse_listing};
use super::template::{ExpansionContext, ShortNameOperations};
use super::tool_runner::{ToolOutput, ToolRunnerOperations, check_command_length, decode_exit_code};
use super::virtual_dir::VirtualDirTree;
use std::fs;
use std::io::{self, Write};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use tempfile::{TempDir, TempPath};

// Longest path a tool without long name support can handle.
pub const DOS_MAX_PATH: usize = 80;

const RAR32_COMMAND_PREFIX: &str = "$(Rar32bitExecutable) ";
const TEMP_PREFIX: &str = "PACK";

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// Archive paths use `\`; list files are read by a tool running on this host.
fn to_list_name(name: &str) -> String {
    name.replace('\\', &MAIN_SEPARATOR.to_string())
}

/*
 * `dir\` form of an archive directory used as prefix for list file entries;
 * empty for the archive root.
 */
fn archive_root_prefix(archive_root: &str) -> String {
    let root = archive_root.strip_prefix('\\').unwrap_or(archive_root);
    if root.is_empty() || root.ends_with('\\') {
        root.to_string()
    } else {
        format!("{root}\\")
    }
}

/*
 * `\dir` form passed as `$(TargetPath)` when packing. Tools without long name
 * support get `\` for the root, the others an empty string.
 */
fn compress_root_path(archive_root: &str, supports_long_names: bool) -> String {
    let root = archive_root.trim_start_matches('\\').trim_end_matches('\\');
    if !root.is_empty() {
        format!("\\{root}")
    } else if supports_long_names {
        String::new()
    } else {
        "\\".to_string()
    }
}

/*
 * RAR 4 and later reject `-ap""` for the archive root and create a literal
 * `\dir` directory for `-ap"\dir"`.
 */
pub fn apply_rar_fixups(template: &str, root_path: &str, command_line: String) -> String {
    if !template.starts_with(RAR32_COMMAND_PREFIX) {
        return command_line;
    }
    let mut fixed = command_line;
    if root_path.is_empty() {
        if let Some(pos) = fixed.find("\" -ap\"\" @\"") {
            fixed.replace_range(pos + 1..pos + 8, "       ");
        }
    } else if root_path.starts_with('\\') {
        if let Some(pos) = fixed.find("\" -ap\"\\") {
            fixed.remove(pos + 6);
        }
    }
    fixed
}

/*
 * Command and working directory templates for packing. Tools without a move
 * command fall back to copying when the user agrees.
 */
pub fn compress_templates(
    modify: &ModifyConfig,
    move_files: bool,
    errors: &dyn ErrorHandlerOperations,
) -> Result<(&'static str, &'static str)> {
    if !move_files {
        return Ok((modify.compress_command, modify.compress_init_dir));
    }
    match modify.move_command {
        Some(command) => Ok((command, modify.move_init_dir)),
        None if ask(errors, PackQuery::NoMove) => {
            log::debug!("PackBridge: Tool cannot move, copying instead.");
            Ok((modify.compress_command, modify.compress_init_dir))
        }
        None => Err(PackError::Cancelled),
    }
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/*
 * Follows `root_prefix` below the extraction directory. Tools may spell
 * directory names differently, so a missing component is replaced by the
 * first directory found at that level.
 */
fn locate_extracted_root(extract_dir: &Path, root_prefix: &str) -> io::Result<PathBuf> {
    let mut dir = extract_dir.to_path_buf();
    for component in root_prefix.split('\\').filter(|c| !c.is_empty()) {
        let exact = dir.join(component);
        if exact.is_dir() {
            dir = exact;
            continue;
        }
        match sorted_entries(&dir)?.into_iter().next() {
            Some(first) if first.is_dir() => dir = first,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory '{component}' was not extracted"),
                ));
            }
        }
    }
    Ok(dir)
}

/*
 * Moves the contents of `src` into `dst`, merging directories that already
 * exist and replacing files.
 */
pub fn move_files(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            if to.is_dir() {
                move_files(&from, &to)?;
            } else {
                fs::rename(&from, &to)?;
            }
        } else {
            if to.is_file() {
                log::debug!("PackBridge: Replacing {to:?}");
                fs::remove_file(&to)?;
            }
            fs::rename(&from, &to)?;
        }
    }
    Ok(())
}

// When a tool without long name support rewrote the archive under its short name.
fn restore_long_name(archive: &Path, dos_archive: Option<&Path>) {
    let Some(dos_archive) = dos_archive else {
        return;
    };
    if dos_archive != archive && !archive.exists() && dos_archive.exists() {
        log::debug!("PackBridge: Renaming {dos_archive:?} back to {archive:?}");
        if let Err(err) = fs::rename(dos_archive, archive) {
            log::warn!("PackBridge: Unable to rename {dos_archive:?} to {archive:?}: {err}");
        }
    }
}

pub struct PackBridge<'a> {
    registry: &'a FormatRegistry,
    archivers: &'a ArchiverConfig,
    runner: &'a dyn ToolRunnerOperations,
    short_names: &'a dyn ShortNameOperations,
    errors: &'a dyn ErrorHandlerOperations,
    legacy_code_pages: bool,
}

impl<'a> PackBridge<'a> {
    pub fn new(
        registry: &'a FormatRegistry,
        archivers: &'a ArchiverConfig,
        runner: &'a dyn ToolRunnerOperations,
        short_names: &'a dyn ShortNameOperations,
        errors: &'a dyn ErrorHandlerOperations,
    ) -> Self {
        PackBridge {
            registry,
            archivers,
            runner,
            short_names,
            errors,
            legacy_code_pages: false,
        }
    }

    /*
     * Writes list files in the tools' single byte code pages instead of UTF-8.
     */
    pub fn with_legacy_code_pages(mut self, legacy: bool) -> Self {
        self.legacy_code_pages = legacy;
        self
    }

    fn fail<T>(&self, err: PackError) -> Result<T> {
        Err(report_error(self.errors, err))
    }

    fn unpacker(&self, archive: &Path) -> Result<&'static BrowseConfig> {
        match self.registry.unpacker_for(&file_name_string(archive)) {
            None => self.fail(PackError::ArcNameUnsupported),
            Some(HandlerRef::Internal(index)) => {
                log::warn!("PackBridge: {archive:?} needs internal handler {index}, which is not available.");
                self.fail(PackError::ArcNameUnsupported)
            }
            Some(HandlerRef::External(index)) => match self.archivers.browse_config(index) {
                Some(browse) => Ok(browse),
                None => self.fail(PackError::ArcCfg),
            },
        }
    }

    fn packer(&self, archive: &Path) -> Result<&'static ModifyConfig> {
        let Some(record) = self
            .registry
            .find_format(&file_name_string(archive))
            .and_then(|index| self.registry.format(index))
        else {
            return self.fail(PackError::ArcNameUnsupported);
        };
        match record.packer() {
            None => self.fail(PackError::PackerUnsupported),
            Some(HandlerRef::Internal(index)) => {
                log::warn!("PackBridge: {archive:?} needs internal handler {index}, which is not available.");
                self.fail(PackError::ArcNameUnsupported)
            }
            Some(HandlerRef::External(index)) => match self.archivers.modify_config(index) {
                Some(modify) => Ok(modify),
                None => self.fail(PackError::ArcCfg),
            },
        }
    }

    fn expand_command(
        &self,
        ctx: &mut ExpansionContext<'_>,
        template: &str,
        allow_dos_tmp: bool,
    ) -> Result<String> {
        match ctx.expand_command(template, allow_dos_tmp) {
            Ok(command_line) => Ok(command_line),
            Err(err) => {
                log::error!("PackBridge: Unable to expand '{template}': {err}");
                self.fail(PackError::CmdLineError)
            }
        }
    }

    fn check_length(&self, command_line: &str, supports_long_names: bool) -> Result<()> {
        check_command_length(command_line, supports_long_names).map_err(|err| report_error(self.errors, err))
    }

    fn working_dir(&self, ctx: &ExpansionContext<'_>, template: &str) -> Result<PathBuf> {
        match ctx.expand_init_dir(template) {
            Ok(dir) if dir.is_empty() => Ok(PathBuf::from(".")),
            Ok(dir) => Ok(PathBuf::from(dir)),
            Err(err) => {
                log::error!("PackBridge: Unable to expand working directory '{template}': {err}");
                self.fail(PackError::InitDirError)
            }
        }
    }

    fn execute(
        &self,
        command_line: &str,
        current_dir: &Path,
        table: Option<ErrorTable>,
        capture_output: bool,
    ) -> Result<ToolOutput> {
        let output = self
            .runner
            .run(command_line, current_dir, capture_output)
            .map_err(|err| report_error(self.errors, err.into()))?;
        decode_exit_code(output.exit_code, table, command_line).map_err(|err| report_error(self.errors, err))?;
        Ok(output)
    }

    fn collect_selection(&self, selection: &mut dyn SelectionEnumOperations) -> Result<Vec<EnumItem>> {
        let mut items = Vec::new();
        loop {
            match selection.next_item(EnumMode::Recursive) {
                EnumOutcome::Item(item) => items.push(item),
                EnumOutcome::Done => return Ok(items),
                EnumOutcome::Cancelled => {
                    log::debug!("PackBridge: Selection cancelled after {} item(s).", items.len());
                    return Err(PackError::Cancelled);
                }
                EnumOutcome::Error(reason) => return self.fail(PackError::General(reason)),
            }
        }
    }

    fn write_list_file(&self, names: &[String], needs_ansi: bool) -> Result<TempPath> {
        let encoding = ListEncoding::for_tool(needs_ansi, self.legacy_code_pages);
        let write = || -> io::Result<TempPath> {
            let mut file = tempfile::Builder::new().prefix(TEMP_PREFIX).suffix(".tmp").tempfile()?;
            for name in names {
                file.write_all(&encoding.encode(&to_list_name(name)))?;
                file.write_all(b"\n")?;
            }
            file.flush()?;
            Ok(file.into_temp_path())
        };
        match write() {
            Ok(path) => {
                log::trace!("PackBridge: Wrote {} name(s) to {path:?}", names.len());
                Ok(path)
            }
            Err(err) => self.fail(PackError::File(err.to_string())),
        }
    }

    fn temp_dir_in(&self, dir: &Path) -> Result<TempDir> {
        match tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir_in(dir) {
            Ok(tmp) => Ok(tmp),
            Err(err) => self.fail(PackError::General(format!(
                "Unable to create a temporary directory in {}: {err}",
                dir.display()
            ))),
        }
    }

    /*
     * Lists `archive` with its external tool and returns the parsed tree.
     */
    pub fn pack_list(&self, archive: &Path) -> Result<VirtualDirTree> {
        log::debug!("PackBridge: Listing {archive:?}");
        let browse = self.unpacker(archive)?;
        let mut ctx = ExpansionContext::new(self.archivers, self.short_names, archive);
        let current_dir = self.working_dir(&ctx, browse.list_init_dir)?;
        let command_line = self.expand_command(&mut ctx, browse.list_command, false)?;
        self.check_length(&command_line, browse.supports_long_names)?;

        let output = self.execute(&command_line, &current_dir, browse.error_table, true)?;
        let mut tree = VirtualDirTree::for_archive();
        let mut session = ListingSession::new(self.errors);
        parse_listing(&output.lines, browse, archive, &mut tree, &mut session)
            .map_err(|err| report_error(self.errors, err))?;
        log::debug!("PackBridge: Listed {archive:?}, {} output line(s).", output.lines.len());
        Ok(tree)
    }

    /*
     * Extracts the files of `selection` (relative to `archive_root`) into
     * `target_dir`. The tool extracts into a temporary directory inside the
     * target first; the selected level is then moved in place.
     */
    pub fn pack_uncompress(
        &self,
        target_dir: &Path,
        archive: &Path,
        archive_root: &str,
        selection: &mut dyn SelectionEnumOperations,
    ) -> Result<()> {
        log::debug!("PackBridge: Extracting from {archive:?} ('{archive_root}') to {target_dir:?}");
        let browse = self.unpacker(archive)?;
        let root_prefix = archive_root_prefix(archive_root);
        let extract_dir = self.temp_dir_in(target_dir)?;

        let items = self.collect_selection(selection)?;
        let names: Vec<String> = items
            .iter()
            .filter(|item| !item.is_dir)
            .map(|item| format!("{root_prefix}{}", item.name))
            .collect();
        let total_size: u64 = items.iter().map(|item| item.size).sum();
        log::debug!("PackBridge: {} file(s), {total_size} byte(s) selected.", names.len());
        let list_file = self.write_list_file(&names, browse.needs_ansi_list_file)?;

        let extract_path = path_string(extract_dir.path());
        let mut ctx = ExpansionContext::new(self.archivers, self.short_names, archive)
            .with_target(&extract_path)
            .with_list_file(&list_file);
        let command_line = self.expand_command(&mut ctx, browse.uncompress_command, false)?;
        self.check_length(&command_line, browse.supports_long_names)?;
        let current_dir = self.working_dir(&ctx, browse.uncompress_init_dir)?;
        self.execute(&command_line, &current_dir, browse.error_table, false)?;
        drop(list_file);

        let source = match locate_extracted_root(extract_dir.path(), &root_prefix) {
            Ok(source) => source,
            Err(err) => return self.fail(PackError::General(format!("Extracted files not found: {err}"))),
        };
        if let Err(err) = move_files(&source, target_dir) {
            return self.fail(PackError::Move(err.to_string()));
        }
        Ok(())
    }

    /*
     * Extracts the single file `name_in_archive` into `target_dir` and returns
     * its new path. Renaming while extracting is not supported by external
     * tools.
     */
    pub fn pack_unpack_one_file(
        &self,
        archive: &Path,
        name_in_archive: &str,
        target_dir: &Path,
        new_name: Option<&str>,
    ) -> Result<PathBuf> {
        log::debug!("PackBridge: Extracting '{name_in_archive}' from {archive:?}");
        let browse = self.unpacker(archive)?;
        if new_name.is_some() {
            return self.fail(PackError::InvalidName);
        }
        let extract_dir = self.temp_dir_in(target_dir)?;
        let extract_path = path_string(extract_dir.path());
        let mut ctx = ExpansionContext::new(self.archivers, self.short_names, archive)
            .with_target(&extract_path)
            .with_extract_name(name_in_archive);
        let command_line = self.expand_command(&mut ctx, browse.extract_command, false)?;
        self.check_length(&command_line, browse.supports_long_names)?;
        let current_dir = self.working_dir(&ctx, browse.extract_init_dir)?;
        self.execute(&command_line, &current_dir, browse.error_table, false)?;

        let only_name = name_in_archive
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(name_in_archive);
        let expected = extract_dir.path().join(only_name);
        let extracted = if expected.exists() {
            expected
        } else {
            match sorted_entries(extract_dir.path()).map(|entries| entries.into_iter().next()) {
                Ok(Some(found)) => found,
                Ok(None) => {
                    return self.fail(PackError::General(format!(
                        "The archiver did not extract '{name_in_archive}'."
                    )));
                }
                Err(err) => return self.fail(PackError::General(format!("Reading extracted files: {err}"))),
            }
        };
        let destination = target_dir.join(only_name);
        if let Err(err) = fs::rename(&extracted, &destination) {
            return self.fail(PackError::General(format!(
                "Unable to move {} to {}: {err}",
                extracted.display(),
                destination.display()
            )));
        }
        Ok(destination)
    }

    /*
     * Packs the selection from `source_dir` into the directory `archive_root`
     * of `archive`, moving instead of copying when `move_files` is set.
     */
    pub fn pack_compress(
        &self,
        archive: &Path,
        archive_root: &str,
        move_files: bool,
        source_dir: &Path,
        selection: &mut dyn SelectionEnumOperations,
    ) -> Result<()> {
        log::debug!("PackBridge: Packing from {source_dir:?} into {archive:?} ('{archive_root}'), move: {move_files}");
        let modify = self.packer(archive)?;
        let (command_template, init_dir_template) = compress_templates(modify, move_files, self.errors)?;

        let mut archive_root = archive_root;
        if !archive_root.trim_matches('\\').is_empty() && !modify.can_pack_to_dir {
            if !ask(self.errors, PackQuery::ArcPath) {
                return Err(PackError::Cancelled);
            }
            archive_root = "\\";
        }
        let root_path = compress_root_path(archive_root, modify.supports_long_names);

        let source = if modify.supports_long_names {
            path_string(source_dir)
        } else {
            match self.short_names.short_path(source_dir) {
                Some(short) => path_string(&short),
                None => {
                    return self.fail(PackError::General(format!(
                        "Unable to get the short name of {}",
                        source_dir.display()
                    )));
                }
            }
        };
        let max_path = if modify.supports_long_names { MAX_PATH } else { DOS_MAX_PATH };

        let items = self.collect_selection(selection)?;
        let mut names = Vec::new();
        for item in items {
            let name = if modify.supports_long_names {
                item.name
            } else {
                item.dos_name.unwrap_or(item.name)
            };
            if source.len() + 1 + name.len() >= max_path {
                return self.fail(PackError::Path(format!("{source}{MAIN_SEPARATOR}{name}")));
            }
            if !item.is_dir {
                names.push(name);
            }
        }
        let list_file = self.write_list_file(&names, modify.needs_ansi_list_file)?;

        let mut ctx = ExpansionContext::new(self.archivers, self.short_names, archive)
            .with_target(&root_path)
            .with_source(&path_string(source_dir))
            .with_list_file(&list_file);
        let command_line = self.expand_command(&mut ctx, command_template, true)?;
        let command_line = apply_rar_fixups(command_template, &root_path, command_line);
        self.check_length(&command_line, modify.supports_long_names)?;
        let current_dir = self.working_dir(&ctx, init_dir_template)?;

        let dos_archive = self.short_names.short_path(archive);
        let result = self.execute(&command_line, &current_dir, modify.error_table, false);
        restore_long_name(archive, dos_archive.as_deref());
        result?;
        drop(list_file);

        if let Some(dos_tmp) = ctx.dos_tmp_name() {
            self.rename_dos_tmp(dos_tmp, archive)?;
        }
        Ok(())
    }

    /*
     * Renames the `PACKxxx.*` files a tool created under a substitute name to
     * the archive's real name, keeping each file's own extension for volumes.
     * Nothing is renamed when any destination already exists; that is reported
     * but does not fail the operation.
     */
    fn rename_dos_tmp(&self, dos_tmp: &Path, archive: &Path) -> Result<()> {
        let Some(dir) = dos_tmp.parent() else {
            return Ok(());
        };
        let tmp_name = file_name_string(dos_tmp).to_uppercase();
        let stem = dos_tmp
            .file_stem()
            .map(|s| s.to_string_lossy().to_uppercase())
            .unwrap_or_default();
        let stem_dot = format!("{stem}.");

        let entries = match sorted_entries(dir) {
            Ok(entries) => entries,
            Err(err) => return self.fail(PackError::General(format!("Reading {}: {err}", dir.display()))),
        };
        let mut renames = Vec::new();
        for path in entries {
            let name = file_name_string(&path).to_uppercase();
            if name == tmp_name {
                renames.push((path, archive.to_path_buf()));
            } else if name == stem || name.starts_with(&stem_dot) {
                let destination = match path.extension() {
                    Some(ext) => archive.with_extension(ext),
                    None => archive.with_extension(""),
                };
                renames.push((path, destination));
            }
        }

        if let Some((_, taken)) = renames.iter().find(|(_, destination)| destination.exists()) {
            report_error(self.errors, PackError::UnableToRename(path_string(taken)));
            return Ok(());
        }
        for (from, to) in renames {
            log::debug!("PackBridge: Renaming {from:?} to {to:?}");
            if let Err(err) = fs::rename(&from, &to) {
                log::warn!("PackBridge: Unable to rename {from:?}: {err}");
                report_error(self.errors, PackError::UnableToRename(path_string(&to)));
            }
        }
        Ok(())
    }

    /*
     * Deletes the selection (relative to `archive_root`) from `archive`. When
     * the tool removed the archive together with its last file, an empty file
     * is left in its place.
     */
    pub fn pack_del_from_arc(
        &self,
        archive: &Path,
        archive_root: &str,
        selection: &mut dyn SelectionEnumOperations,
    ) -> Result<()> {
        log::debug!("PackBridge: Deleting from {archive:?} ('{archive_root}')");
        let modify = self.packer(archive)?;
        let root_prefix = archive_root_prefix(archive_root);

        let items = self.collect_selection(selection)?;
        let mut names = Vec::new();
        for item in items {
            let name = format!("{root_prefix}{}", item.name);
            match (item.is_dir, modify.empty_dirs) {
                (false, _) | (true, EmptyDirMode::Delete) => names.push(name),
                (true, EmptyDirMode::DeleteWithAsterisk) => names.push(format!("{name}\\*")),
                (true, EmptyDirMode::DoNotDelete) => {}
            }
        }
        let list_file = self.write_list_file(&names, modify.needs_ansi_list_file)?;

        let mut ctx =
            ExpansionContext::new(self.archivers, self.short_names, archive).with_list_file(&list_file);
        let command_line = self.expand_command(&mut ctx, modify.delete_command, false)?;
        self.check_length(&command_line, modify.supports_long_names)?;
        let current_dir = self.working_dir(&ctx, modify.delete_init_dir)?;

        let dos_archive = self.short_names.short_path(archive);
        let result = self.execute(&command_line, &current_dir, modify.error_table, false);
        restore_long_name(archive, dos_archive.as_deref());
        result?;

        if !archive.exists() {
            log::debug!("PackBridge: {archive:?} was removed, creating an empty file.");
            if let Err(err) = fs::OpenOptions::new().create(true).append(true).open(archive) {
                log::warn!("PackBridge: Unable to recreate {archive:?}: {err}");
            }
        }
        Ok(())
    }
}

/*
 * Splits `;` separated masks. `;;` stands for a literal `;`; surrounding
 * blanks are dropped, as are empty masks.
 */
pub fn split_masks(text: &str) -> Vec<String> {
    let mut masks = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ';' {
            current.push(c);
        } else if chars.peek() == Some(&';') {
            chars.next();
            current.push(';');
        } else {
            masks.push(std::mem::take(&mut current));
        }
    }
    masks.push(current);
    masks
        .into_iter()
        .map(|mask| mask.trim().to_string())
        .filter(|mask| !mask.is_empty())
        .collect()
}

/*
 * Enumerates masks as plain file names, for tools that expand wildcards
 * themselves.
 */
pub struct MaskEnumerator {
    masks: Vec<String>,
    patterns: Vec<glob::Pattern>,
    position: usize,
}

impl MaskEnumerator {
    pub fn new(masks: &str) -> Self {
        let masks = split_masks(masks);
        let patterns = masks
            .iter()
            .filter_map(|mask| {
                // `*.*` also matches names without an extension.
                let mask = if mask == "*.*" { "*" } else { mask.as_str() };
                match glob::Pattern::new(mask) {
                    Ok(pattern) => Some(pattern),
                    Err(err) => {
                        log::warn!("MaskEnumerator: Ignoring invalid mask '{mask}': {err}");
                        None
                    }
                }
            })
            .collect();
        MaskEnumerator {
            masks,
            patterns,
            position: 0,
        }
    }

    pub fn masks(&self) -> &[String] {
        &self.masks
    }

    // Case insensitive match of a plain file name against any mask.
    pub fn matches(&self, name: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(name, options))
    }
}

impl SelectionEnumOperations for MaskEnumerator {
    fn next_item(&mut self, _mode: EnumMode) -> EnumOutcome {
        match self.masks.get(self.position) {
            Some(mask) => {
                self.position += 1;
                EnumOutcome::Item(EnumItem {
                    name: mask.clone(),
                    dos_name: None,
                    is_dir: false,
                    size: 0,
                    entry: None,
                })
            }
            None => EnumOutcome::Done,
        }
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

pub fn pack_enum_mask(masks: &str) -> MaskEnumerator {
    MaskEnumerator::new(masks)
}
