/*
 * Turns the captured output of an archiver's list command into a
 * `VirtualDirTree`.
 *
 * The generic parser works from a `ListLayout`: everything up to the header
 * sentinel is ignored, records are then read in groups of `lines_per_record`
 * lines until the footer sentinel, and fields are picked out of each record by
 * their 1-based column index. The name column is special: it may contain
 * blanks, so only a line end terminates it.
 *
 * UC2 prints a keyword based dump instead and has its own parser.
 */
use super::archiver_config::{BrowseConfig, ListLayout, SpecialParser};
use super::entry::{DOS_EPOCH, Entry, FileAttributes};
use super::errors::{ErrorHandlerOperations, PackError, PackReport, Result};
use super::virtual_dir::VirtualDirTree;
use std::path::Path;
use time::{Date, Month, PrimitiveDateTime, Time};

// Written next to the archive by `uc ~D`.
const UC2_RESULT_FILE: &str = "U$~RESLT.OK";

/*
 * State shared by all records of one listing: invalid dates are reported only
 * once per listing.
 */
pub struct ListingSession<'h> {
    handler: &'h dyn ErrorHandlerOperations,
    date_error_reported: bool,
}

impl<'h> ListingSession<'h> {
    pub fn new(handler: &'h dyn ErrorHandlerOperations) -> Self {
        ListingSession {
            handler,
            date_error_reported: false,
        }
    }

    fn report_date_error(&mut self, name: &str) {
        if self.date_error_reported {
            return;
        }
        self.date_error_reported = true;
        log::warn!("ListParser: Invalid date or time for '{name}', using 1980-01-01.");
        self.handler
            .handle(&PackReport::Error(PackError::DateTime(name.to_string())));
    }
}

// Blank characters between fields. U+25BA/U+25C4 are the ACE arrows after
// decoding from the OEM code page.
fn is_blank(c: char, separator: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{10}' | '\u{11}' | '\u{25BA}' | '\u{25C4}') || c == separator
}

/*
 * Position of field `index` (1-based) in `record`. Field `name_idx` extends to
 * the end of its line. `None` for index 0 or below, which layouts use for
 * missing columns.
 */
pub fn get_field(record: &[char], index: i32, name_idx: i32, separator: char) -> Option<usize> {
    if index <= 0 {
        return None;
    }
    let len = record.len();
    let mut pos = 0;
    while pos < len && is_blank(record[pos], separator) {
        pos += 1;
    }
    let mut current = 1;
    while current != index {
        if current == name_idx {
            while pos < len && record[pos] != '\n' {
                pos += 1;
            }
        } else {
            while pos < len && record[pos] != '\n' && !is_blank(record[pos], separator) {
                pos += 1;
            }
        }
        while pos < len && (record[pos] == '\n' || is_blank(record[pos], separator)) {
            pos += 1;
        }
        current += 1;
    }
    Some(pos)
}

fn read_number(record: &[char], pos: &mut usize) -> u32 {
    let mut value: u32 = 0;
    while let Some(digit) = record.get(*pos).and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(digit);
        *pos += 1;
    }
    value
}

fn read_size(record: &[char], pos: &mut usize) -> u64 {
    let mut value: u64 = 0;
    while let Some(digit) = record.get(*pos).and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(u64::from(digit));
        *pos += 1;
    }
    value
}

// Two digit years: 80..99 are 19xx, the rest 20xx.
fn fix_year(year: u32) -> u32 {
    match year {
        0..=79 => year + 2000,
        80..=99 => year + 1900,
        _ => year,
    }
}

// "p" moves 1..11 into the afternoon, "a" turns 12 into midnight.
fn apply_meridiem(record: &[char], pos: &mut usize, hour: &mut u32) {
    match record.get(*pos) {
        Some('p' | 'P') => {
            if *hour < 12 {
                *hour += 12;
            }
        }
        Some('a' | 'A') => {
            if *hour == 12 {
                *hour = 0;
            }
        }
        _ => return,
    }
    *pos += 1;
    if matches!(record.get(*pos), Some('m' | 'M')) {
        *pos += 1;
    }
}

pub fn build_timestamp(
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<PrimitiveDateTime> {
    let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    let date = Date::from_calendar_date(i32::try_from(year).ok()?, month, u8::try_from(day).ok()?).ok()?;
    let time = Time::from_hms(
        u8::try_from(hour).ok()?,
        u8::try_from(minute).ok()?,
        u8::try_from(second).ok()?,
    )
    .ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

fn is_link_extension(ext: &str) -> bool {
    ["lnk", "pif", "url"].iter().any(|known| known.eq_ignore_ascii_case(ext))
}

fn add_entry(tree: &mut VirtualDirTree, path: &str, entry: Entry, is_dir: bool) -> Result<()> {
    let added = if is_dir {
        tree.add_dir(path, entry)
    } else {
        tree.add_file(path, entry)
    };
    added.map_err(|err| {
        log::error!("ListParser: {err}");
        PackError::FileData
    })
}

// Index shifted by one column when the ARJ host OS column is missing.
fn column(index: i32, arj_hack: bool) -> i32 {
    if arj_hack { index - 1 } else { index }
}

/*
 * Parses one record (all of its lines, each terminated by '\n') and adds the
 * file or directory it describes.
 */
pub fn scan_record(
    record: &[char],
    layout: &ListLayout,
    arj_hack: bool,
    tree: &mut VirtualDirTree,
    session: &mut ListingSession<'_>,
) -> Result<()> {
    let sep = layout.separator;
    let name_idx = layout.name_idx;
    let field = |index: i32| get_field(record, column(index, arj_hack), name_idx, sep);

    let mut pos = get_field(record, name_idx, name_idx, sep).ok_or(PackError::ArcCfg)?;
    if matches!(record.get(pos), Some('\\' | '/')) {
        pos += 1;
    }
    let mut full_name: String = record[pos..]
        .iter()
        .take_while(|&&c| c != '\n')
        .map(|&c| if c == '/' { '\\' } else { c })
        .collect();
    let trimmed_len = full_name.trim_end_matches([' ', '\t', sep]).len();
    full_name.truncate(trimmed_len);

    if !full_name.ends_with('\\') {
        if let Some(mut attr) = field(layout.attr_idx) {
            while let Some(&c) = record.get(attr) {
                if matches!(c, '\n' | '\t' | ' ') {
                    break;
                }
                if c == 'D' || c == 'd' {
                    full_name.push('\\');
                    break;
                }
                attr += 1;
            }
        }
    }
    let is_dir = full_name.ends_with('\\');
    if is_dir {
        full_name.pop();
    }
    let (path, name) = match full_name.rfind('\\') {
        Some(split) => (&full_name[..split], &full_name[split + 1..]),
        None => ("", full_name.as_str()),
    };
    if name.is_empty() {
        log::error!("ListParser: Record without a usable name: {:?}", record.iter().collect::<String>());
        return Err(PackError::FileData);
    }

    let (mut year, mut month, mut day) = (1980, 1, 1);
    if let Some(mut p) = field(layout.date_idx.abs()) {
        for part in 1..4 {
            let value = read_number(record, &mut p);
            if layout.date_year_idx == part {
                year = value;
            } else if layout.date_month_idx == part {
                month = value;
            } else {
                day = value;
            }
            p += 1;
        }
    }
    let year = fix_year(year);

    let (mut hour, mut minute, mut second) = (0, 0, 0);
    if let Some(mut p) = field(layout.time_idx) {
        hour = read_number(record, &mut p);
        p += 1;
        minute = read_number(record, &mut p);
        apply_meridiem(record, &mut p, &mut hour);
        if matches!(record.get(p), Some(&c) if !matches!(c, '\n' | '\t' | ' ')) {
            p += 1;
            second = read_number(record, &mut p);
        }
        apply_meridiem(record, &mut p, &mut hour);
    }
    let last_write = match build_timestamp(year, month, day, hour, minute, second) {
        Some(timestamp) => timestamp,
        None => {
            session.report_date_error(&full_name);
            DOS_EPOCH
        }
    };

    let size = match field(layout.size_idx) {
        Some(mut p) => read_size(record, &mut p),
        None => 0,
    };

    let mut attributes = FileAttributes::NONE;
    if let Some(mut p) = field(layout.attr_idx) {
        while let Some(&c) = record.get(p) {
            match c {
                '\n' | '\t' | ' ' => break,
                'R' | 'r' => attributes.insert(FileAttributes::READONLY),
                'A' | 'a' => attributes.insert(FileAttributes::ARCHIVE),
                'S' | 's' => attributes.insert(FileAttributes::SYSTEM),
                'H' | 'h' => attributes.insert(FileAttributes::HIDDEN),
                _ => {}
            }
            p += 1;
        }
    }

    log::trace!("ListParser: '{path}' / '{name}' dir={is_dir} size={size}");
    if is_dir {
        let entry = Entry::directory(name, last_write).with_attributes(attributes | FileAttributes::DIRECTORY);
        add_entry(tree, path, entry, true)
    } else {
        let mut entry = Entry::file(name, size, last_write).with_attributes(attributes);
        entry.flags.is_link = is_link_extension(entry.extension());
        add_entry(tree, path, entry, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Data,
    Footer,
}

// RAR 5 and later announce themselves on the second line and list one record
// per line with the name last.
fn is_rar5_banner(line: &str) -> bool {
    line.starts_with("RAR ") && matches!(line.as_bytes().get(4), Some(b'5'..=b'9'))
}

pub fn parse_generic(
    lines: &[String],
    layout: &ListLayout,
    tree: &mut VirtualDirTree,
    session: &mut ListingSession<'_>,
) -> Result<()> {
    let mut section = Section::Header;
    let mut to_skip = layout.lines_to_skip;
    let mut always_skip = layout.always_skip;
    let mut lines_per_record = layout.lines_per_record;
    let mut rar5 = false;
    let mut record: Vec<char> = Vec::new();
    let mut lines_in_record = 0;
    let mut arj_hack = false;

    for (i, line) in lines.iter().enumerate() {
        match section {
            Section::Header => {
                if line.starts_with(layout.start_string) {
                    section = Section::Data;
                }
                if i == 1 && is_rar5_banner(line) {
                    log::debug!("ListParser: RAR 5 listing format detected.");
                    rar5 = true;
                    lines_per_record = 1;
                }
                continue;
            }
            Section::Footer => continue,
            Section::Data => {
                if always_skip > 0 {
                    always_skip -= 1;
                    continue;
                }
                if line.starts_with(layout.stop_string) {
                    section = Section::Footer;
                    record.clear();
                    lines_in_record = 0;
                    continue;
                }
            }
        }
        if to_skip > 0 {
            to_skip -= 1;
            continue;
        }

        lines_in_record += 1;
        if lines_in_record == 1 {
            if layout.lines_per_record == 0 {
                let four_lines = i + 3 < lines.len() && lines[i + 2].chars().nth(3) == Some(' ');
                lines_per_record = if four_lines { 4 } else { 2 };
            }
            arj_hack = layout.date_idx < 0
                && lines.get(i + 1).and_then(|next| next.chars().nth(5)) == Some(' ');
            if i + lines_per_record.max(1) - 1 >= lines.len() {
                log::error!("ListParser: Listing ends inside a record.");
                return Err(PackError::Parse);
            }
            record.clear();
        }
        record.extend(line.chars());
        record.push('\n');
        if lines_in_record < lines_per_record {
            continue;
        }

        let effective = if rar5 {
            ListLayout {
                name_idx: 8,
                attr_idx: 1,
                ..*layout
            }
        } else {
            *layout
        };
        scan_record(&record, &effective, arj_hack, tree, session)?;
        record.clear();
        lines_in_record = 0;
    }

    if section != Section::Footer {
        log::error!("ListParser: Footer of the listing not found.");
        return Err(PackError::Parse);
    }
    Ok(())
}

// Text between the first '[' and the following ']'.
fn bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')? + 1;
    let len = text[start..].find(']')?;
    Some(&text[start..start + len])
}

fn value_after_equals(text: &str) -> Option<&str> {
    text.split_once('=').map(|(_, value)| value)
}

fn uc2_numbers(text: &str) -> [u32; 3] {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut out = [0; 3];
    for slot in out.iter_mut() {
        *slot = read_number(&chars, &mut pos);
        while chars.get(pos) == Some(&' ') {
            pos += 1;
        }
    }
    out
}

/*
 * Parser for the `uc ~D` dump:
 *
 *   LIST [\DIR]
 *      FILE
 *         NAME=[X.TXT]
 *         DATE(MDY)=05 17 1999
 *         ...
 *   END
 *
 * A DIR/FILE section ends at the first unknown keyword, which is then read
 * again at the top level.
 */
pub fn parse_uc2(lines: &[String], tree: &mut VirtualDirTree) -> Result<()> {
    if lines.is_empty() {
        return Err(PackError::Parse);
    }
    let mut current_dir = String::new();
    let mut line = 0;
    loop {
        let text = lines[line].trim_start_matches(' ');
        if text.starts_with("END") {
            return Ok(());
        }
        if text.starts_with("LIST") {
            let name = bracketed(text).ok_or(PackError::Parse)?;
            current_dir = name.trim_start_matches('\\').to_string();
            line += 1;
            if line >= lines.len() {
                return Err(PackError::Parse);
            }
            continue;
        }
        if !(text.starts_with("DIR") || text.starts_with("FILE")) {
            log::debug!("ListParser: Skipping unexpected UC2 line '{text}'.");
            line += 1;
            if line >= lines.len() {
                return Err(PackError::Parse);
            }
            continue;
        }

        let is_dir = text.starts_with("DIR");
        let mut name: Option<String> = None;
        let (mut year, mut month, mut day) = (1980, 1, 1);
        let (mut hour, mut minute, mut second) = (0, 0, 0);
        let mut attributes = FileAttributes::NONE;
        let mut size = 0u64;
        loop {
            line += 1;
            if line >= lines.len() {
                return Err(PackError::Parse);
            }
            let text = lines[line].trim_start_matches(' ');
            if text.starts_with("NAME=") {
                name = Some(bracketed(text).ok_or(PackError::Parse)?.to_string());
            } else if text.starts_with("DATE(MDY)=") {
                let [m, d, y] = uc2_numbers(value_after_equals(text).ok_or(PackError::Parse)?);
                year = fix_year(y);
                month = m.max(1);
                day = d.max(1);
            } else if text.starts_with("TIME(HMS)=") {
                [hour, minute, second] = uc2_numbers(value_after_equals(text).ok_or(PackError::Parse)?);
            } else if text.starts_with("ATTRIB=") {
                attributes = FileAttributes::NONE;
                for c in value_after_equals(text).ok_or(PackError::Parse)?.chars() {
                    match c {
                        'R' => attributes.insert(FileAttributes::READONLY),
                        'A' => attributes.insert(FileAttributes::ARCHIVE),
                        'S' => attributes.insert(FileAttributes::SYSTEM),
                        'H' => attributes.insert(FileAttributes::HIDDEN),
                        _ => {}
                    }
                }
            } else if text.starts_with("SIZE=") {
                let value: Vec<char> = value_after_equals(text).ok_or(PackError::Parse)?.chars().collect();
                size = read_size(&value, &mut 0);
            } else if text.starts_with("VERSION=") || text.starts_with("CHECK=") {
                continue;
            } else {
                break;
            }
        }

        let name = name.ok_or(PackError::Parse)?;
        let last_write = build_timestamp(year, month, day, hour, minute, second).ok_or_else(|| {
            PackError::General(format!("Invalid date or time of '{name}' in the archive listing."))
        })?;
        if is_dir {
            let entry = Entry::directory(name, last_write).with_attributes(attributes | FileAttributes::DIRECTORY);
            add_entry(tree, &current_dir, entry, true)?;
        } else {
            let mut entry = Entry::file(name, size, last_write).with_attributes(attributes);
            entry.flags.is_link = is_link_extension(entry.extension());
            add_entry(tree, &current_dir, entry, false)?;
        }
    }
}

/*
 * Entry point used by the list operation: picks the parser configured for the
 * tool. `lines` is the complete captured output.
 */
pub fn parse_listing(
    lines: &[String],
    browse: &BrowseConfig,
    archive: &Path,
    tree: &mut VirtualDirTree,
    session: &mut ListingSession<'_>,
) -> Result<()> {
    if lines.is_empty() {
        return Err(PackError::NoOutput);
    }
    match browse.special_parser {
        Some(SpecialParser::Uc2) => {
            if let Some(dir) = archive.parent() {
                let result_file = dir.join(UC2_RESULT_FILE);
                if result_file.exists() {
                    if let Err(err) = std::fs::remove_file(&result_file) {
                        log::warn!("ListParser: Unable to remove {}: {err}", result_file.display());
                    }
                }
            }
            parse_uc2(lines, tree)
        }
        None => parse_generic(lines, &browse.layout, tree, session),
    }
}
