/*
 * Defines the record type shared by every directory tree in the crate: one file
 * or directory with its name, optional short (8.3) alias, size, timestamp and
 * attribute bits. Archive listings, disk scans and plugin listings all produce
 * `Entry` values, so the enumeration and adapter layers never need to know where
 * an entry came from.
 *
 * Also holds the two small bit sets that travel with entries: `FileAttributes`
 * (the classic read-only/hidden/system/archive/directory/reparse bits) and
 * `ValidData` (which fields of an entry are meaningful for a given tree).
 */
use std::ops::{BitOr, BitOrAssign};
use time::PrimitiveDateTime;
use time::macros::datetime;

/*
 * Timestamp used whenever a listing cannot supply one, and as the fallback for
 * unparsable dates. Matches the DOS epoch that most archivers also use.
 */
pub const DOS_EPOCH: PrimitiveDateTime = datetime!(1980-01-01 0:00);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FileAttributes(u32);

impl FileAttributes {
    pub const NONE: Self = Self(0);
    pub const READONLY: Self = Self(0x0001);
    pub const HIDDEN: Self = Self(0x0002);
    pub const SYSTEM: Self = Self(0x0004);
    pub const DIRECTORY: Self = Self(0x0010);
    pub const ARCHIVE: Self = Self(0x0020);
    pub const REPARSE_POINT: Self = Self(0x0400);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for FileAttributes {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/*
 * Declares which `Entry` fields a tree instance can actually provide. A disk
 * tree has everything; an archive listing without times would clear `TIME`.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidData(u32);

impl ValidData {
    pub const NONE: Self = Self(0);
    pub const EXTENSION: Self = Self(0x0001);
    pub const DOSNAME: Self = Self(0x0002);
    pub const SIZE: Self = Self(0x0004);
    pub const TYPE: Self = Self(0x0008);
    pub const DATE: Self = Self(0x0010);
    pub const TIME: Self = Self(0x0020);
    pub const ATTRIBUTES: Self = Self(0x0040);
    pub const HIDDEN: Self = Self(0x0080);
    pub const ISLINK: Self = Self(0x0100);
    pub const ISOFFLINE: Self = Self(0x0200);
    pub const PL_SIZE: Self = Self(0x0400);
    pub const PL_DATE: Self = Self(0x0800);
    pub const PL_TIME: Self = Self(0x1000);
    pub const ICONOVERLAY: Self = Self(0x2000);
    pub const ALL_FS_ARC: Self = Self(0xFFFF & !0x2000);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for ValidData {
    fn default() -> Self {
        Self::ALL_FS_ARC
    }
}

impl BitOr for ValidData {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/*
 * Transient, UI-facing flags. They are never persisted and never take part in
 * name comparisons.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags {
    pub selected: bool,
    pub cut: bool,
    pub dirty: bool,
    pub hidden: bool,
    pub is_link: bool,
    pub is_offline: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub dos_name: Option<String>,
    pub size: u64,
    pub last_write: PrimitiveDateTime,
    pub attributes: FileAttributes,
    pub plugin_data: Option<u64>,
    pub flags: EntryFlags,
}

impl Entry {
    pub fn file(name: impl Into<String>, size: u64, last_write: PrimitiveDateTime) -> Self {
        Entry {
            name: name.into(),
            dos_name: None,
            size,
            last_write,
            attributes: FileAttributes::ARCHIVE,
            plugin_data: None,
            flags: EntryFlags::default(),
        }
    }

    pub fn directory(name: impl Into<String>, last_write: PrimitiveDateTime) -> Self {
        Entry {
            name: name.into(),
            dos_name: None,
            size: 0,
            last_write,
            attributes: FileAttributes::DIRECTORY,
            plugin_data: None,
            flags: EntryFlags::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: FileAttributes) -> Self {
        self.flags.hidden = attributes.contains(FileAttributes::HIDDEN);
        self.flags.is_link = attributes.contains(FileAttributes::REPARSE_POINT);
        self.attributes = attributes;
        self
    }

    pub fn with_dos_name(mut self, dos_name: impl Into<String>) -> Self {
        self.dos_name = Some(dos_name.into());
        self
    }

    pub fn is_dir(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }

    pub fn is_link(&self) -> bool {
        self.flags.is_link || self.attributes.contains(FileAttributes::REPARSE_POINT)
    }

    // Short alias if one is known, otherwise the long name.
    pub fn short_name(&self) -> &str {
        self.dos_name.as_deref().unwrap_or(&self.name)
    }

    /*
     * Extension without the dot. Directories only have an extension when the name
     * contains a dot that is not the first character, same rule as for files.
     */
    pub fn extension(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) if pos > 0 => &self.name[pos + 1..],
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_bits_compose() {
        let mut attrs = FileAttributes::READONLY | FileAttributes::HIDDEN;
        assert!(attrs.contains(FileAttributes::READONLY));
        assert!(!attrs.contains(FileAttributes::DIRECTORY));
        attrs.insert(FileAttributes::DIRECTORY);
        attrs.remove(FileAttributes::HIDDEN);
        assert_eq!(attrs.bits(), 0x11);
    }

    #[test]
    fn test_with_attributes_sets_transient_flags() {
        let entry = Entry::file("a.txt", 3, DOS_EPOCH)
            .with_attributes(FileAttributes::HIDDEN | FileAttributes::REPARSE_POINT);
        assert!(entry.flags.hidden);
        assert!(entry.is_link());
        assert!(!entry.is_dir());
    }

    #[test]
    fn test_extension_and_short_name() {
        let entry = Entry::file("Report.Final.docx", 0, DOS_EPOCH).with_dos_name("REPORT~1.DOC");
        assert_eq!(entry.extension(), "docx");
        assert_eq!(entry.short_name(), "REPORT~1.DOC");

        let hidden_style = Entry::file(".profile", 0, DOS_EPOCH);
        assert_eq!(hidden_style.extension(), "");
        assert_eq!(hidden_style.short_name(), ".profile");
    }

    #[test]
    fn test_all_fs_arc_excludes_icon_overlay() {
        assert!(ValidData::ALL_FS_ARC.contains(ValidData::SIZE | ValidData::DATE));
        assert!(!ValidData::ALL_FS_ARC.contains(ValidData::ICONOVERLAY));
    }
}
