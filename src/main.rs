/*
 * Command-line front end of the archiver bridge.
 *
 *   pack_bridge [-v] list <archive>          list an archive through its tool
 *   pack_bridge [-v] scan <dir> <names...>   enumerate a disk selection
 *   pack_bridge [-v] locate <dirs...>        find archiver executables
 */
use pack_bridge::core::disk_scanner::entry_from_metadata;
use pack_bridge::core::{
    CancelToken, ConfigManagerOperations, CoreConfigManager, CoreDiskScanner,
    CoreShortNameResolver, CoreToolLocator, CoreToolRunner, Decision, EnumMode, EnumOutcome,
    FixedConfirm, LoggingErrorHandler, PackBridge, PackSettings, SelectionEnumOperations, SelectionEnumerator,
    ToolLocatorOperations, VirtualDirTree, apply_located,
};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

const APP_NAME: &str = "PackBridge";

fn usage() -> ExitCode {
    eprintln!("Usage:");
    eprintln!("  pack_bridge [-v] list <archive>");
    eprintln!("  pack_bridge [-v] scan <dir> <names...>");
    eprintln!("  pack_bridge [-v] locate <dirs...>");
    ExitCode::from(2)
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Debug)
        .build();
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn load_settings(manager: &dyn ConfigManagerOperations) -> PackSettings {
    match manager.load_settings(APP_NAME) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Main: Could not load settings ({e}), using defaults.");
            PackSettings::default()
        }
    }
}

fn print_tree(tree: &VirtualDirTree, path: &str, depth: usize) {
    let Some(node) = tree.find_node(path) else { return };
    let indent = "  ".repeat(depth);
    for dir in tree.dirs(node) {
        println!("{indent}{}\\", dir.name);
        let child = if path.is_empty() {
            dir.name.clone()
        } else {
            format!("{path}\\{}", dir.name)
        };
        print_tree(tree, &child, depth + 1);
    }
    for file in tree.files(node) {
        println!("{indent}{}  {}  {}", file.name, file.size, file.last_write);
    }
}

fn run_list(archive: &Path, settings: &PackSettings) -> ExitCode {
    let registry = settings.registry();
    let archivers = settings.archiver_config();
    let mut runner = CoreToolRunner::new()
        .with_wait_timeout(Duration::from_millis(settings.wait_timeout_ms));
    if let Some(helper) = &settings.spawn_helper {
        runner = runner.with_helper(helper);
    }
    let short_names = CoreShortNameResolver::new();
    let errors = LoggingErrorHandler::new(false);
    let bridge = PackBridge::new(&registry, &archivers, &runner, &short_names, &errors)
        .with_legacy_code_pages(settings.legacy_code_pages);

    match bridge.pack_list(archive) {
        Ok(tree) => {
            print_tree(&tree, "", 0);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Listing {archive:?} failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_scan(source_dir: &Path, names: &[String]) -> ExitCode {
    let mut entries = Vec::new();
    for name in names {
        let path = source_dir.join(name);
        let link_meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                eprintln!("Cannot read {path:?}: {e}");
                return ExitCode::FAILURE;
            }
        };
        let meta = fs::metadata(&path).unwrap_or_else(|_| link_meta.clone());
        entries.push(entry_from_metadata(name, &meta, link_meta.file_type().is_symlink()));
    }

    let scanner = CoreDiskScanner::new();
    let confirm = FixedConfirm::new(Decision::IgnoreAll);
    let mut enumerator =
        SelectionEnumerator::for_disk(source_dir, entries, &scanner, &confirm, CancelToken::new());
    let mut count = 0usize;
    loop {
        match enumerator.next_item(EnumMode::Recursive) {
            EnumOutcome::Item(item) => {
                count += 1;
                let kind = if item.is_dir { "dir " } else { "file" };
                println!("{kind}  {:>12}  {}", item.size, item.name);
            }
            EnumOutcome::Done => break,
            EnumOutcome::Cancelled => {
                eprintln!("Enumeration cancelled.");
                return ExitCode::FAILURE;
            }
            EnumOutcome::Error(message) => {
                eprintln!("Enumeration failed: {message}");
                return ExitCode::FAILURE;
            }
        }
    }
    for skipped in confirm.asked() {
        log::warn!("Main: Skipped: {skipped}");
    }
    println!("{count} item(s)");
    ExitCode::SUCCESS
}

fn run_locate(dirs: &[String], manager: &dyn ConfigManagerOperations) -> ExitCode {
    let mut settings = load_settings(manager);
    let search_dirs: Vec<PathBuf> = dirs.iter().map(PathBuf::from).collect();
    let located = CoreToolLocator::new().locate(&search_dirs);
    for tool in &located {
        println!("{:?} {}: {}", tool.role, tool.archiver_index, tool.path.display());
    }

    let mut archivers = settings.archiver_config();
    let changed = apply_located(&mut archivers, &located);
    settings.set_archiver_config(&archivers);
    println!("{changed} setting(s) changed");
    if changed == 0 {
        return ExitCode::SUCCESS;
    }
    match manager.save_settings(APP_NAME, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Saving settings failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.first().is_some_and(|a| a == "-v" || a == "--verbose");
    if verbose {
        args.remove(0);
    }
    init_logging(verbose);

    let manager = CoreConfigManager::new();
    match args.split_first() {
        Some((command, rest)) => match (command.as_str(), rest) {
            ("list", [archive]) => run_list(Path::new(archive), &load_settings(&manager)),
            ("scan", [dir, names @ ..]) if !names.is_empty() => run_scan(Path::new(dir), names),
            ("locate", dirs) if !dirs.is_empty() => run_locate(dirs, &manager),
            _ => usage(),
        },
        None => usage(),
    }
}
