/*
 * Built-in knowledge about the supported external archivers.
 *
 * Every archiver has one `BrowseConfig` (list, extract, extract-one) and one
 * `ModifyConfig` (add, delete, move) in the tables below, indexed the same way
 * as `ARCHIVERS`. The templates use the placeholder language of
 * `template.rs`; `$(Rar32bitExecutable)` and friends resolve to the
 * executable paths kept in `ArchiverConfig`, which is the only part the user
 * can change and the only part that is persisted.
 *
 * Exit codes of the tools are translated through per-tool `ErrorTable`s.
 */
use super::errors::ReturnCategory;
use encoding_rs::{Encoding, IBM866, WINDOWS_1252};
use serde::{Deserialize, Serialize};

pub type ErrorTable = &'static [(i32, ReturnCategory)];

use ReturnCategory::*;

pub const JAR_ERRORS: ErrorTable = &[
    (1, Warning),
    (2, Fatal),
    (3, Crc),
    (5, Disk),
    (6, FileOpen),
    (7, Params),
    (8, Memory),
    (9, NotArchive),
    (10, Internal),
    (11, Break),
];

pub const RAR_ERRORS: ErrorTable = &[
    (1, Warning),
    (2, Fatal),
    (3, Crc),
    (4, Security),
    (5, Disk),
    (6, FileOpen),
    (7, Params),
    (8, Memory),
    (255, Break),
];

pub const ARJ_ERRORS: ErrorTable = &[
    (1, Warning),
    (2, Fatal),
    (3, Crc),
    (4, Security),
    (5, Disk),
    (6, FileOpen),
    (7, Params),
    (8, Memory),
    (9, NotArchive),
    (10, XmsMemory),
    (11, Break),
    (12, Chapters),
];

pub const LHA_ERRORS: ErrorTable = &[(1, ExtractLha), (2, Fatal), (3, Temp)];

pub const UC2_ERRORS: ErrorTable = &[
    (5, Internal),
    (7, Security),
    (10, FileOpen),
    (15, Warning),
    (20, FileOpen),
    (25, Skipped),
    (30, Skipped),
    (35, Skipped),
    (50, Internal),
    (55, Disk),
    (60, Disk),
    (65, Fatal),
    (70, Disk),
    (75, Warning),
    (80, Skipped),
    (85, Disk),
    (90, Damaged),
    (95, Virus),
    (100, Break),
    (105, Internal),
    (110, Params),
    (115, Params),
    (120, NotArchive),
    (123, Params),
    (125, Security),
    (130, NotArchive),
    (135, FileOpen),
    (140, Params),
    (145, Extract),
    (150, FileOpen),
    (155, Warning),
    (157, Warning),
    (160, Memory),
    (163, Memory),
    (165, Memory),
    (170, Fatal),
    (175, Temp),
    (180, Disk),
    (185, FileOpen),
    (190, Virus),
    (195, Damaged),
    (200, Damaged),
    (205, Fatal),
    (210, Fatal),
    (250, FileOpen),
    (255, Internal),
];

pub const ZIP204_ERRORS: ErrorTable = &[
    (1, FileOpen),
    (2, Crc),
    (3, Crc),
    (4, Memory),
    (5, Memory),
    (6, Memory),
    (7, Memory),
    (8, Memory),
    (9, Memory),
    (10, Memory),
    (11, Memory),
    (12, Params),
    (13, FileOpen),
    (14, Disk),
    (15, Disk),
    (16, Params),
    (17, Params),
    (18, FileOpen),
    (255, Break),
];

pub const UNZIP204_ERRORS: ErrorTable = &[
    (1, Warning),
    (2, Crc),
    (3, Crc),
    (4, Memory),
    (5, Memory),
    (6, Memory),
    (7, Memory),
    (8, Memory),
    (9, FileOpen),
    (10, Params),
    (11, FileOpen),
    (50, Disk),
    (51, Crc),
    (255, Break),
];

pub const ACE_ERRORS: ErrorTable = &[
    (1, Memory),
    (2, FileOpen),
    (3, FileOpen),
    (4, Disk),
    (5, FileOpen),
    (6, FileOpen),
    (7, Disk),
    (8, Params),
    (9, Crc),
    (10, Fatal),
    (11, FileOpen),
    (255, Break2),
];

/*
 * User-facing reason for a non-zero exit code of an archiver (not of the
 * spawning helper, see `tool_runner::decode_exit_code`).
 */
pub fn exit_code_reason(table: Option<ErrorTable>, code: i32) -> String {
    match table {
        None => format!("The archiver returned error code {code}."),
        Some(table) => table
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, category)| category.message())
            .unwrap_or(ReturnCategory::Unknown.message())
            .to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialParser {
    Uc2,
}

/*
 * Column layout of a tool's listing output. Field indices are 1-based, 0 means
 * "not present". A negative `date_idx` enables the ARJ16 check for listings
 * where the host OS column is missing.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLayout {
    pub start_string: &'static str,
    pub lines_to_skip: usize,
    pub always_skip: usize,
    // 0 means auto-detect between 2 and 4 lines.
    pub lines_per_record: usize,
    pub stop_string: &'static str,
    pub separator: char,
    pub name_idx: i32,
    pub size_idx: i32,
    pub time_idx: i32,
    pub date_idx: i32,
    pub attr_idx: i32,
    pub date_year_idx: i32,
    pub date_month_idx: i32,
}

const NO_LAYOUT: ListLayout = ListLayout {
    start_string: "",
    lines_to_skip: 0,
    always_skip: 0,
    lines_per_record: 0,
    stop_string: "",
    separator: ' ',
    name_idx: 0,
    size_idx: 0,
    time_idx: 0,
    date_idx: 0,
    attr_idx: 0,
    date_year_idx: 0,
    date_month_idx: 0,
};

const JAR_LAYOUT: ListLayout = ListLayout {
    start_string: "Analyzing",
    lines_to_skip: 4,
    always_skip: 0,
    lines_per_record: 3,
    stop_string: "Total files listed:",
    separator: ' ',
    name_idx: 2,
    size_idx: 3,
    time_idx: 9,
    date_idx: 8,
    attr_idx: 4,
    date_year_idx: 1,
    date_month_idx: 2,
};

// Box drawing bar (0xB3 in the OEM code pages) used by ACE between columns.
pub const ACE_SEPARATOR: char = '\u{2502}';

const ACE_LAYOUT: ListLayout = ListLayout {
    start_string: "Date    ",
    lines_to_skip: 0,
    always_skip: 1,
    lines_per_record: 1,
    stop_string: "        ",
    separator: ACE_SEPARATOR,
    name_idx: 6,
    size_idx: 4,
    time_idx: 2,
    date_idx: 1,
    attr_idx: 0,
    date_year_idx: 3,
    date_month_idx: 2,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseConfig {
    pub error_table: Option<ErrorTable>,
    pub supports_long_names: bool,
    pub list_init_dir: &'static str,
    pub list_command: &'static str,
    pub special_parser: Option<SpecialParser>,
    pub layout: ListLayout,
    pub uncompress_init_dir: &'static str,
    pub uncompress_command: &'static str,
    pub extract_init_dir: &'static str,
    pub extract_command: &'static str,
    pub needs_ansi_list_file: bool,
}

/*
 * What a tool needs in its delete list for a selected directory.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyDirMode {
    // The directory name itself.
    Delete,
    // `dir\*`.
    DeleteWithAsterisk,
    // Nothing; the tool drops empty directories on its own.
    DoNotDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifyConfig {
    pub error_table: Option<ErrorTable>,
    pub supports_long_names: bool,
    pub compress_init_dir: &'static str,
    pub compress_command: &'static str,
    pub can_pack_to_dir: bool,
    pub delete_init_dir: &'static str,
    pub delete_command: &'static str,
    pub empty_dirs: EmptyDirMode,
    pub move_init_dir: &'static str,
    pub move_command: Option<&'static str>,
    pub needs_ansi_list_file: bool,
}

pub const BROWSE_TABLE: [BrowseConfig; 12] = [
    // JAR 1.02 Win32
    BrowseConfig {
        error_table: Some(JAR_ERRORS),
        supports_long_names: true,
        list_init_dir: "$(ArchivePath)",
        list_command: "$(Jar32bitExecutable) v -ju- \"$(ArchiveFileName)\"",
        special_parser: None,
        layout: JAR_LAYOUT,
        uncompress_init_dir: "$(TargetPath)",
        uncompress_command: "$(Jar32bitExecutable) x -r- -jyc \"$(ArchiveFullName)\" !\"$(ListFullName)\"",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Jar32bitExecutable) e -r- \"$(ArchiveFullName)\" \"$(ExtractFullName)\"",
        needs_ansi_list_file: false,
    },
    // RAR 4.20 and 5.x
    BrowseConfig {
        error_table: Some(RAR_ERRORS),
        supports_long_names: true,
        list_init_dir: "$(ArchivePath)",
        list_command: "$(Rar32bitExecutable) v -c- \"$(ArchiveFileName)\"",
        special_parser: None,
        layout: ListLayout {
            start_string: "--------",
            lines_to_skip: 0,
            always_skip: 0,
            lines_per_record: 2,
            stop_string: "--------",
            separator: ' ',
            name_idx: 1,
            size_idx: 2,
            time_idx: 6,
            date_idx: 5,
            attr_idx: 7,
            date_year_idx: 3,
            date_month_idx: 2,
        },
        uncompress_init_dir: "$(TargetPath)",
        uncompress_command: "$(Rar32bitExecutable) x -scol \"$(ArchiveFullName)\" @\"$(ListFullName)\"",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Rar32bitExecutable) e \"$(ArchiveFullName)\" \"$(ExtractFullName)\"",
        needs_ansi_list_file: false,
    },
    // ARJ 2.60 MS-DOS
    BrowseConfig {
        error_table: Some(ARJ_ERRORS),
        supports_long_names: false,
        list_init_dir: ".",
        list_command: "$(Arj16bitExecutable) v -ja1 $(ArchiveDOSFullName)",
        special_parser: None,
        layout: ListLayout {
            start_string: "--------",
            lines_to_skip: 0,
            always_skip: 0,
            lines_per_record: 2,
            stop_string: "--------",
            separator: ' ',
            name_idx: 2,
            size_idx: 5,
            time_idx: 9,
            date_idx: -8,
            attr_idx: 11,
            date_year_idx: 1,
            date_month_idx: 2,
        },
        uncompress_init_dir: ".",
        uncompress_command: "$(Arj16bitExecutable) x -p -va -hl -jyc $(ArchiveDOSFullName) $(TargetDOSPath)\\ !$(ListDOSFullName)",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Arj16bitExecutable) e -p -va -hl $(ArchiveDOSFullName) $(ExtractFullName)",
        needs_ansi_list_file: false,
    },
    // LHA 2.55 MS-DOS
    BrowseConfig {
        error_table: Some(LHA_ERRORS),
        supports_long_names: false,
        list_init_dir: ".",
        list_command: "$(Lha16bitExecutable) v $(ArchiveDOSFullName)",
        special_parser: None,
        layout: ListLayout {
            start_string: "--------------",
            lines_to_skip: 0,
            always_skip: 0,
            lines_per_record: 2,
            stop_string: "--------------",
            separator: ' ',
            name_idx: 1,
            size_idx: 2,
            time_idx: 6,
            date_idx: 5,
            attr_idx: 7,
            date_year_idx: 1,
            date_month_idx: 2,
        },
        uncompress_init_dir: ".",
        uncompress_command: "$(Lha16bitExecutable) x -p -a -l1 -x1 -c $(ArchiveDOSFullName) $(TargetDOSPath)\\ @$(ListDOSFullName)",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Lha16bitExecutable) e -p -a -l1 -c $(ArchiveDOSFullName) $(ExtractFullName)",
        needs_ansi_list_file: false,
    },
    // UC2 2r3 PRO MS-DOS
    BrowseConfig {
        error_table: Some(UC2_ERRORS),
        supports_long_names: false,
        list_init_dir: ".",
        list_command: "$(UC216bitExecutable) ~D $(ArchiveDOSFullName)",
        special_parser: Some(SpecialParser::Uc2),
        layout: NO_LAYOUT,
        uncompress_init_dir: ".",
        uncompress_command: "$(UC216bitExecutable) EF $(ArchiveDOSFullName) ##$(TargetDOSPath) @$(ListDOSFullName)",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(UC216bitExecutable) E $(ArchiveDOSFullName) $(ExtractFullName)",
        needs_ansi_list_file: false,
    },
    // JAR 1.02 MS-DOS
    BrowseConfig {
        error_table: Some(JAR_ERRORS),
        supports_long_names: false,
        list_init_dir: ".",
        list_command: "$(Jar16bitExecutable) v -ju- $(ArchiveDOSFullName)",
        special_parser: None,
        layout: JAR_LAYOUT,
        uncompress_init_dir: ".",
        uncompress_command: "$(Jar16bitExecutable) x -r- -jyc $(ArchiveDOSFullName) -o$(TargetDOSPath) !$(ListDOSFullName)",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Jar16bitExecutable) e -r- $(ArchiveDOSFullName) \"$(ExtractFullName)\"",
        needs_ansi_list_file: false,
    },
    // RAR 2.50 MS-DOS
    BrowseConfig {
        error_table: Some(RAR_ERRORS),
        supports_long_names: false,
        list_init_dir: ".",
        list_command: "$(Rar16bitExecutable) v -c- $(ArchiveDOSFullName)",
        special_parser: None,
        layout: ListLayout {
            start_string: "--------",
            lines_to_skip: 0,
            always_skip: 0,
            lines_per_record: 2,
            stop_string: "--------",
            separator: ' ',
            name_idx: 1,
            size_idx: 2,
            time_idx: 6,
            date_idx: 5,
            attr_idx: 7,
            date_year_idx: 3,
            date_month_idx: 1,
        },
        uncompress_init_dir: ".",
        uncompress_command: "$(Rar16bitExecutable) x $(ArchiveDOSFullName) $(TargetDOSPath)\\ @$(ListDOSFullName)",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Rar16bitExecutable) e $(ArchiveDOSFullName) $(ExtractFullName)",
        needs_ansi_list_file: false,
    },
    // PKZIP 2.50 Win32
    BrowseConfig {
        error_table: None,
        supports_long_names: true,
        list_init_dir: "$(ArchivePath)",
        list_command: "$(Zip32bitExecutable) -com=none -nozipextension \"$(ArchiveFileName)\"",
        special_parser: None,
        layout: ListLayout {
            start_string: "  ------  ------    -----",
            lines_to_skip: 0,
            always_skip: 0,
            lines_per_record: 1,
            stop_string: "  ------           ------",
            separator: ' ',
            name_idx: 9,
            size_idx: 1,
            time_idx: 6,
            date_idx: 5,
            attr_idx: 8,
            date_year_idx: 3,
            date_month_idx: 1,
        },
        uncompress_init_dir: "$(TargetPath)",
        uncompress_command: "$(Zip32bitExecutable) -ext -nozipextension -directories -path \"$(ArchiveFullName)\" @\"$(ListFullName)\"",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Zip32bitExecutable) -ext -nozipextension \"$(ArchiveFullName)\" \"$(ExtractFullName)\"",
        needs_ansi_list_file: true,
    },
    // PKUNZIP 2.04g MS-DOS
    BrowseConfig {
        error_table: Some(UNZIP204_ERRORS),
        supports_long_names: false,
        list_init_dir: ".",
        list_command: "$(Unzip16bitExecutable) -v $(ArchiveDOSFullName)",
        special_parser: None,
        layout: ListLayout {
            start_string: " ------  ------   -----",
            lines_to_skip: 0,
            always_skip: 0,
            lines_per_record: 1,
            stop_string: " ------          ------",
            separator: ' ',
            name_idx: 9,
            size_idx: 1,
            time_idx: 6,
            date_idx: 5,
            attr_idx: 8,
            date_year_idx: 3,
            date_month_idx: 1,
        },
        uncompress_init_dir: ".",
        uncompress_command: "$(Unzip16bitExecutable) -d $(ArchiveDOSFullName) $(TargetDOSPath)\\ @$(ListDOSFullName)",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Unzip16bitExecutable) $(ArchiveDOSFullName) $(ExtractFullName)",
        needs_ansi_list_file: false,
    },
    // ARJ 3.00c Win32
    BrowseConfig {
        error_table: Some(ARJ_ERRORS),
        supports_long_names: true,
        list_init_dir: "$(ArchivePath)",
        list_command: "$(Arj32bitExecutable) v -ja1 \"$(ArchiveFileName)\"",
        special_parser: None,
        layout: ListLayout {
            start_string: "--------",
            lines_to_skip: 0,
            always_skip: 0,
            lines_per_record: 0,
            stop_string: "--------",
            separator: ' ',
            name_idx: 2,
            size_idx: 5,
            time_idx: 9,
            date_idx: 8,
            attr_idx: 11,
            date_year_idx: 1,
            date_month_idx: 2,
        },
        uncompress_init_dir: "$(TargetPath)",
        uncompress_command: "$(Arj32bitExecutable) x -p -va -hl -jyc \"$(ArchiveFullName)\" !\"$(ListFullName)\"",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Arj32bitExecutable) e -p -va -hl \"$(ArchiveFullName)\" \"$(ExtractFullName)\"",
        needs_ansi_list_file: false,
    },
    // ACE 1.2b Win32
    BrowseConfig {
        error_table: Some(ACE_ERRORS),
        supports_long_names: true,
        list_init_dir: "$(ArchivePath)",
        list_command: "$(Ace32bitExecutable) v \"$(ArchiveFileName)\"",
        special_parser: None,
        layout: ACE_LAYOUT,
        uncompress_init_dir: "$(TargetPath)",
        uncompress_command: "$(Ace32bitExecutable) x -f \"$(ArchiveFullName)\" @\"$(ListFullName)\"",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Ace32bitExecutable) e -f \"$(ArchiveFullName)\" \"$(ExtractFullName)\"",
        needs_ansi_list_file: true,
    },
    // ACE 1.2b MS-DOS
    BrowseConfig {
        error_table: Some(ACE_ERRORS),
        supports_long_names: false,
        list_init_dir: ".",
        list_command: "$(Ace16bitExecutable) v $(ArchiveDOSFullName)",
        special_parser: None,
        layout: ACE_LAYOUT,
        uncompress_init_dir: ".",
        uncompress_command: "$(Ace16bitExecutable) x -f $(ArchiveDOSFullName) $(TargetDOSPath)\\ @$(ListDOSFullName)",
        extract_init_dir: "$(TargetPath)",
        extract_command: "$(Ace16bitExecutable) e -f $(ArchiveDOSFullName) $(ExtractFullName)",
        needs_ansi_list_file: false,
    },
];

pub const MODIFY_TABLE: [ModifyConfig; 12] = [
    // JAR 1.02 Win32
    ModifyConfig {
        error_table: Some(JAR_ERRORS),
        supports_long_names: true,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Jar32bitExecutable) a -hl \"$(ArchiveFullName)\" -o\"$(TargetPath)\" !\"$(ListFullName)\"",
        can_pack_to_dir: true,
        delete_init_dir: "$(ArchivePath)",
        delete_command: "$(Jar32bitExecutable) d -r- \"$(ArchiveFileName)\" !\"$(ListFullName)\"",
        empty_dirs: EmptyDirMode::Delete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Jar32bitExecutable) m -hl \"$(ArchiveFullName)\" -o\"$(TargetPath)\" !\"$(ListFullName)\""),
        needs_ansi_list_file: false,
    },
    // RAR 4.20 and 5.x; -scol is required since 5.0
    ModifyConfig {
        error_table: Some(RAR_ERRORS),
        supports_long_names: true,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Rar32bitExecutable) a -scol \"$(ArchiveFullName)\" -ap\"$(TargetPath)\" @\"$(ListFullName)\"",
        can_pack_to_dir: true,
        delete_init_dir: "$(ArchivePath)",
        delete_command: "$(Rar32bitExecutable) d -scol \"$(ArchiveFileName)\" @\"$(ListFullName)\"",
        empty_dirs: EmptyDirMode::Delete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Rar32bitExecutable) m -scol \"$(ArchiveFullName)\" -ap\"$(TargetPath)\" @\"$(ListFullName)\""),
        needs_ansi_list_file: false,
    },
    // ARJ 2.60 MS-DOS
    ModifyConfig {
        error_table: Some(ARJ_ERRORS),
        supports_long_names: false,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Arj16bitExecutable) a -p -va -hl -a $(ArchiveDOSFullName) !$(ListDOSFullName)",
        can_pack_to_dir: false,
        delete_init_dir: ".",
        delete_command: "$(Arj16bitExecutable) d -p -va -hl $(ArchiveDOSFullName) !$(ListDOSFullName)",
        empty_dirs: EmptyDirMode::DoNotDelete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Arj16bitExecutable) m -p -va -hl -a $(ArchiveDOSFullName) !$(ListDOSFullName)"),
        needs_ansi_list_file: false,
    },
    // LHA 2.55 MS-DOS
    ModifyConfig {
        error_table: Some(LHA_ERRORS),
        supports_long_names: false,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Lha16bitExecutable) a -m -p -a -l1 -x1 -c $(ArchiveDOSFullName) @$(ListDOSFullName)",
        can_pack_to_dir: false,
        delete_init_dir: ".",
        delete_command: "$(Lha16bitExecutable) d -p -a -l1 -x1 -c $(ArchiveDOSFullName) @$(ListDOSFullName)",
        empty_dirs: EmptyDirMode::DeleteWithAsterisk,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Lha16bitExecutable) m -m -p -a -l1 -x1 -c $(ArchiveDOSFullName) @$(ListDOSFullName)"),
        needs_ansi_list_file: false,
    },
    // UC2 2r3 PRO MS-DOS
    ModifyConfig {
        error_table: Some(UC2_ERRORS),
        supports_long_names: false,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(UC216bitExecutable) A !SYSHID=ON $(ArchiveDOSFullName) ##$(TargetPath) @$(ListDOSFullName)",
        can_pack_to_dir: true,
        delete_init_dir: ".",
        delete_command: "$(UC216bitExecutable) D $(ArchiveDOSFullName) @$(ListDOSFullName) & $$RED $(ArchiveDOSFullName)",
        empty_dirs: EmptyDirMode::DoNotDelete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(UC216bitExecutable) AM !SYSHID=ON $(ArchiveDOSFullName) ##$(TargetPath) @$(ListDOSFullName)"),
        needs_ansi_list_file: false,
    },
    // JAR 1.02 MS-DOS
    ModifyConfig {
        error_table: Some(JAR_ERRORS),
        supports_long_names: false,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Jar16bitExecutable) a -hl $(ArchiveDOSFullName) -o\"$(TargetPath)\" !$(ListDOSFullName)",
        can_pack_to_dir: true,
        delete_init_dir: "$(ArchivePath)",
        delete_command: "$(Jar16bitExecutable) d -r- $(ArchiveDOSFileName) !$(ListDOSFullName)",
        empty_dirs: EmptyDirMode::Delete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Jar16bitExecutable) m -hl $(ArchiveDOSFullName) -o\"$(TargetPath)\" !$(ListDOSFullName)"),
        needs_ansi_list_file: false,
    },
    // RAR 2.50 MS-DOS, no packing into subdirectories
    ModifyConfig {
        error_table: Some(RAR_ERRORS),
        supports_long_names: false,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Rar16bitExecutable) a $(ArchiveDOSFullName) @$(ListDOSFullName)",
        can_pack_to_dir: false,
        delete_init_dir: "$(ArchivePath)",
        delete_command: "$(Rar16bitExecutable) d $(ArchiveDOSFileName) @$(ListDOSFullName)",
        empty_dirs: EmptyDirMode::Delete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Rar16bitExecutable) m $(ArchiveDOSFullName) @$(ListDOSFullName)"),
        needs_ansi_list_file: false,
    },
    // PKZIP 2.50 Win32
    ModifyConfig {
        error_table: None,
        supports_long_names: true,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Zip32bitExecutable) -add -nozipextension -attr -path \"$(ArchiveFullName)\" @\"$(ListFullName)\"",
        can_pack_to_dir: false,
        delete_init_dir: "$(ArchivePath)",
        delete_command: "$(Zip32bitExecutable) -del -nozipextension \"$(ArchiveFileName)\" @\"$(ListFullName)\"",
        empty_dirs: EmptyDirMode::DoNotDelete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Zip32bitExecutable) -add -nozipextension -attr -path -move \"$(ArchiveFullName)\" @\"$(ListFullName)\""),
        needs_ansi_list_file: true,
    },
    // PKZIP 2.04g MS-DOS
    ModifyConfig {
        error_table: Some(ZIP204_ERRORS),
        supports_long_names: false,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Zip16bitExecutable) -a -P -whs $(ArchiveDOSFullName) @$(ListDOSFullName)",
        can_pack_to_dir: false,
        delete_init_dir: ".",
        delete_command: "$(Zip16bitExecutable) -d $(ArchiveDOSFullName) @$(ListDOSFullName)",
        empty_dirs: EmptyDirMode::DoNotDelete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Zip16bitExecutable) -m -P -whs $(ArchiveDOSFullName) @$(ListDOSFullName)"),
        needs_ansi_list_file: false,
    },
    // ARJ 3.00c Win32
    ModifyConfig {
        error_table: Some(ARJ_ERRORS),
        supports_long_names: true,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Arj32bitExecutable) a -p -va -hl -a \"$(ArchiveFullName)\" !\"$(ListFullName)\"",
        can_pack_to_dir: false,
        delete_init_dir: "$(ArchivePath)",
        delete_command: "$(Arj32bitExecutable) d -p -va -hl \"$(ArchiveFileName)\" !\"$(ListFullName)\"",
        empty_dirs: EmptyDirMode::DoNotDelete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Arj32bitExecutable) m -p -va -hl -a \"$(ArchiveFullName)\" !\"$(ListFullName)\""),
        needs_ansi_list_file: false,
    },
    // ACE 1.2b Win32
    ModifyConfig {
        error_table: Some(ACE_ERRORS),
        supports_long_names: true,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Ace32bitExecutable) a -o -f \"$(ArchiveFullName)\" @\"$(ListFullName)\"",
        can_pack_to_dir: false,
        delete_init_dir: "$(ArchivePath)",
        delete_command: "$(Ace32bitExecutable) d -f \"$(ArchiveFileName)\" @\"$(ListFullName)\"",
        empty_dirs: EmptyDirMode::DoNotDelete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Ace32bitExecutable) m -o -f \"$(ArchiveFullName)\" @\"$(ListFullName)\""),
        needs_ansi_list_file: true,
    },
    // ACE 1.2b MS-DOS
    ModifyConfig {
        error_table: Some(ACE_ERRORS),
        supports_long_names: false,
        compress_init_dir: "$(SourcePath)",
        compress_command: "$(Ace16bitExecutable) a -o -f $(ArchiveDOSFullName) @$(ListDOSFullName)",
        can_pack_to_dir: false,
        delete_init_dir: ".",
        delete_command: "$(Ace16bitExecutable) d -f $(ArchiveDOSFullName) @$(ListDOSFullName)",
        empty_dirs: EmptyDirMode::DoNotDelete,
        move_init_dir: "$(SourcePath)",
        move_command: Some("$(Ace16bitExecutable) m -o -f $(ArchiveDOSFullName) @$(ListDOSFullName)"),
        needs_ansi_list_file: false,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExeType {
    Bits32,
    Bits16,
}

/*
 * Fixed facts about one archiver: the placeholder names its templates use for
 * the executables and the program names searched for by auto-configuration.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiverDescriptor {
    pub uid: u32,
    pub title: &'static str,
    pub exe_type: ExeType,
    pub packer_variable: &'static str,
    pub unpacker_variable: Option<&'static str>,
    pub packer_executable: &'static str,
    pub unpacker_executable: Option<&'static str>,
}

const fn single(
    uid: u32,
    title: &'static str,
    exe_type: ExeType,
    variable: &'static str,
    executable: &'static str,
) -> ArchiverDescriptor {
    ArchiverDescriptor {
        uid,
        title,
        exe_type,
        packer_variable: variable,
        unpacker_variable: None,
        packer_executable: executable,
        unpacker_executable: None,
    }
}

pub const ARCHIVERS: [ArchiverDescriptor; 12] = [
    single(1, "JAR 1.02 (32-bit)", ExeType::Bits32, "Jar32bitExecutable", "jar32"),
    single(2, "RAR (32-bit)", ExeType::Bits32, "Rar32bitExecutable", "rar"),
    single(3, "ARJ 2.60 (16-bit)", ExeType::Bits16, "Arj16bitExecutable", "arj"),
    single(4, "LHA 2.55 (16-bit)", ExeType::Bits16, "Lha16bitExecutable", "lha"),
    single(5, "UC2 2r3 PRO (16-bit)", ExeType::Bits16, "UC216bitExecutable", "uc"),
    single(6, "JAR 1.02 (16-bit)", ExeType::Bits16, "Jar16bitExecutable", "jar16"),
    single(7, "RAR 2.50 (16-bit)", ExeType::Bits16, "Rar16bitExecutable", "rar"),
    single(8, "PKZIP 2.50 (32-bit)", ExeType::Bits32, "Zip32bitExecutable", "pkzip25"),
    ArchiverDescriptor {
        uid: 9,
        title: "PKZIP 2.04g (16-bit)",
        exe_type: ExeType::Bits16,
        packer_variable: "Zip16bitExecutable",
        unpacker_variable: Some("Unzip16bitExecutable"),
        packer_executable: "pkzip",
        unpacker_executable: Some("pkunzip"),
    },
    single(10, "ARJ 3.00c (32-bit)", ExeType::Bits32, "Arj32bitExecutable", "arj32"),
    single(11, "ACE 1.2b (32-bit)", ExeType::Bits32, "Ace32bitExecutable", "ace32"),
    single(12, "ACE 1.2b (16-bit)", ExeType::Bits16, "Ace16bitExecutable", "ace"),
];

/*
 * Persisted executable paths of one archiver.
 */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArchiverSettings {
    #[serde(rename = "Packer UID")]
    pub uid: u32,
    #[serde(rename = "Packer Title", default)]
    pub title: String,
    #[serde(rename = "Packer Executable")]
    pub packer_exe: String,
    #[serde(rename = "Use Packer Executable To Unpack")]
    pub exes_are_same: bool,
    #[serde(rename = "Unpacker Executable", default, skip_serializing_if = "Option::is_none")]
    pub unpacker_exe: Option<String>,
}

impl ArchiverSettings {
    pub fn from_descriptor(descriptor: &ArchiverDescriptor) -> Self {
        ArchiverSettings {
            uid: descriptor.uid,
            title: descriptor.title.to_string(),
            packer_exe: descriptor.packer_executable.to_string(),
            exes_are_same: descriptor.unpacker_variable.is_none(),
            unpacker_exe: descriptor.unpacker_executable.map(str::to_string),
        }
    }
}

/*
 * Executable settings for every archiver in `ARCHIVERS`, in the same order.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverConfig {
    archivers: Vec<ArchiverSettings>,
}

impl ArchiverConfig {
    pub fn new() -> Self {
        ArchiverConfig {
            archivers: ARCHIVERS.iter().map(ArchiverSettings::from_descriptor).collect(),
        }
    }

    /*
     * Takes the executable paths of saved records whose UID matches a known
     * archiver. Unknown UIDs and records whose "same executable" flag does not
     * fit the archiver are ignored, so a damaged file cannot drop archivers.
     */
    pub fn from_saved(saved: &[ArchiverSettings]) -> Self {
        let mut config = Self::new();
        for record in saved {
            let Some(index) = config.index_of_uid(record.uid) else {
                log::warn!("ArchiverConfig: Ignoring saved archiver with unknown UID {}.", record.uid);
                continue;
            };
            let descriptor = &ARCHIVERS[index];
            if record.exes_are_same != descriptor.unpacker_variable.is_none() {
                log::warn!("ArchiverConfig: Inconsistent saved settings for '{}'.", descriptor.title);
                continue;
            }
            config.set_packer_exe(index, Some(&record.packer_exe));
            if !record.exes_are_same {
                config.set_unpacker_exe(index, record.unpacker_exe.as_deref());
            }
        }
        config
    }

    pub fn archivers(&self) -> &[ArchiverSettings] {
        &self.archivers
    }

    pub fn count(&self) -> usize {
        self.archivers.len()
    }

    pub fn index_of_uid(&self, uid: u32) -> Option<usize> {
        self.archivers.iter().position(|a| a.uid == uid)
    }

    pub fn browse_config(&self, index: usize) -> Option<&'static BrowseConfig> {
        BROWSE_TABLE.get(index)
    }

    pub fn modify_config(&self, index: usize) -> Option<&'static ModifyConfig> {
        MODIFY_TABLE.get(index)
    }

    // `None` restores the default program name.
    pub fn set_packer_exe(&mut self, index: usize, path: Option<&str>) {
        if let Some(settings) = self.archivers.get_mut(index) {
            settings.packer_exe = path
                .map(str::to_string)
                .unwrap_or_else(|| ARCHIVERS[index].packer_executable.to_string());
        }
    }

    pub fn set_unpacker_exe(&mut self, index: usize, path: Option<&str>) {
        if let Some(settings) = self.archivers.get_mut(index) {
            if settings.exes_are_same {
                return;
            }
            settings.unpacker_exe = path
                .map(str::to_string)
                .or_else(|| ARCHIVERS[index].unpacker_executable.map(str::to_string));
        }
    }

    pub fn packer_exe(&self, index: usize) -> Option<&str> {
        self.archivers.get(index).map(|a| a.packer_exe.as_str())
    }

    pub fn unpacker_exe(&self, index: usize) -> Option<&str> {
        let settings = self.archivers.get(index)?;
        if settings.exes_are_same {
            Some(settings.packer_exe.as_str())
        } else {
            settings.unpacker_exe.as_deref()
        }
    }

    /*
     * Resolves an executable placeholder such as `Rar32bitExecutable` (case
     * insensitive) to the configured program path.
     */
    pub fn executable_for_variable(&self, variable: &str) -> Option<&str> {
        ARCHIVERS.iter().enumerate().find_map(|(index, descriptor)| {
            if descriptor.packer_variable.eq_ignore_ascii_case(variable) {
                self.packer_exe(index)
            } else if descriptor
                .unpacker_variable
                .is_some_and(|v| v.eq_ignore_ascii_case(variable))
            {
                self.unpacker_exe(index)
            } else {
                None
            }
        })
    }
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Text encoding of intermediate list files and of decoded tool output.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEncoding {
    Utf8,
    Ansi,
    Oem,
}

impl ListEncoding {
    pub fn for_tool(needs_ansi: bool, legacy_code_pages: bool) -> Self {
        match (legacy_code_pages, needs_ansi) {
            (false, _) => ListEncoding::Utf8,
            (true, true) => ListEncoding::Ansi,
            (true, false) => ListEncoding::Oem,
        }
    }

    pub fn encoding(self) -> &'static Encoding {
        match self {
            ListEncoding::Utf8 => encoding_rs::UTF_8,
            ListEncoding::Ansi => WINDOWS_1252,
            ListEncoding::Oem => IBM866,
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = self.encoding().encode(text);
        if had_errors {
            log::warn!("ListEncoding: '{text}' is not representable in {}.", self.encoding().name());
        }
        bytes.into_owned()
    }
}

/*
 * Decodes one line of tool output: UTF-8 when valid, otherwise the OEM code
 * page the DOS era tools print in.
 */
pub fn decode_output_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = IBM866.decode(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_parallel() {
        assert_eq!(BROWSE_TABLE.len(), ARCHIVERS.len());
        assert_eq!(MODIFY_TABLE.len(), ARCHIVERS.len());
        for (index, descriptor) in ARCHIVERS.iter().enumerate() {
            let browse = &BROWSE_TABLE[index];
            let modify = &MODIFY_TABLE[index];
            let variable = format!("$({})", descriptor.unpacker_variable.unwrap_or(descriptor.packer_variable));
            assert!(browse.list_command.starts_with(&variable), "{}", descriptor.title);
            assert!(modify.compress_command.starts_with(&format!("$({})", descriptor.packer_variable)));
            assert_eq!(browse.supports_long_names, descriptor.exe_type == ExeType::Bits32);
        }
    }

    #[test]
    fn test_exit_code_reason() {
        assert_eq!(exit_code_reason(Some(RAR_ERRORS), 3), ReturnCategory::Crc.message());
        assert_eq!(exit_code_reason(Some(RAR_ERRORS), 42), ReturnCategory::Unknown.message());
        assert!(exit_code_reason(None, 7).contains('7'));
        assert_eq!(exit_code_reason(Some(ACE_ERRORS), 255), ReturnCategory::Break2.message());
    }

    #[test]
    fn test_executable_for_variable() {
        let mut config = ArchiverConfig::new();
        assert_eq!(config.executable_for_variable("rar32bitexecutable"), Some("rar"));
        assert_eq!(config.executable_for_variable("Unzip16bitExecutable"), Some("pkunzip"));
        config.set_packer_exe(1, Some("/opt/rar/rar"));
        assert_eq!(config.executable_for_variable("Rar32bitExecutable"), Some("/opt/rar/rar"));
        assert_eq!(config.unpacker_exe(1), Some("/opt/rar/rar"));
        assert_eq!(config.executable_for_variable("NoSuchExecutable"), None);
        config.set_packer_exe(1, None);
        assert_eq!(config.packer_exe(1), Some("rar"));
    }

    #[test]
    fn test_from_saved_matches_by_uid() {
        let saved = vec![
            ArchiverSettings {
                uid: 9,
                title: String::new(),
                packer_exe: "C:\\dos\\pkzip.exe".to_string(),
                exes_are_same: false,
                unpacker_exe: Some("C:\\dos\\pkunzip.exe".to_string()),
            },
            ArchiverSettings {
                uid: 99,
                title: "bogus".to_string(),
                packer_exe: "x".to_string(),
                exes_are_same: true,
                unpacker_exe: None,
            },
            // Wrong flag for ARJ, ignored.
            ArchiverSettings {
                uid: 3,
                title: String::new(),
                packer_exe: "arjx".to_string(),
                exes_are_same: false,
                unpacker_exe: Some("arjy".to_string()),
            },
        ];
        let config = ArchiverConfig::from_saved(&saved);
        assert_eq!(config.count(), 12);
        assert_eq!(config.packer_exe(8), Some("C:\\dos\\pkzip.exe"));
        assert_eq!(config.unpacker_exe(8), Some("C:\\dos\\pkunzip.exe"));
        assert_eq!(config.packer_exe(2), Some("arj"));
    }

    #[test]
    fn test_settings_use_registry_key_names() {
        let json = serde_json::to_string(&ArchiverSettings::from_descriptor(&ARCHIVERS[1])).unwrap();
        assert!(json.contains("\"Packer UID\":2"));
        assert!(json.contains("\"Use Packer Executable To Unpack\":true"));
        assert!(!json.contains("Unpacker Executable"));
    }

    #[test]
    fn test_list_encoding() {
        assert_eq!(ListEncoding::for_tool(true, false), ListEncoding::Utf8);
        assert_eq!(ListEncoding::Ansi.encode("café"), b"caf\xe9".to_vec());
        assert_eq!(ListEncoding::Oem.encode("abc"), b"abc".to_vec());
        assert_eq!(decode_output_line(b"plain"), "plain");
        assert_eq!(decode_output_line(&[0xB3]), "\u{2502}");
    }
}
