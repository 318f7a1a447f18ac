/*
 * Maps archive file names to the handler that can list, extract or modify them.
 *
 * Each `FormatRecord` lists one or more `;`-separated extension patterns and two
 * handler references: one for packing (modifying) and one for unpacking
 * (listing/extracting). A handler reference is either an external tool
 * configuration (non-negative index) or an internal plugin handler (negative
 * index, `-n` meaning plugin `n - 1`).
 *
 * Patterns may use `#` or `?` to stand for any decimal digit, which covers
 * numbered volume series such as `r##` for `.r00`, `.r01`, ...
 *
 * Matching works right to left: patterns are bucketed by their last character
 * and stored reversed (without that character) followed by the dot, so a lookup
 * only compares the tail of the file name against a handful of candidates.
 */
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    // Extension pattern already registered; position of the first duplicate.
    DuplicateExtension { format: usize, column: usize },
    InvalidRecord(String),
    IndexOutOfRange(usize),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateExtension { format, column } => write!(
                f,
                "Duplicate extension in format {format} at column {column}"
            ),
            RegistryError::InvalidRecord(reason) => write!(f, "Invalid format record: {reason}"),
            RegistryError::IndexOutOfRange(index) => write!(f, "Format index {index} out of range"),
        }
    }
}

impl std::error::Error for RegistryError {}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerRef {
    External(usize),
    Internal(usize),
}

impl HandlerRef {
    pub fn from_index(index: i32) -> Self {
        if index >= 0 {
            HandlerRef::External(index as usize)
        } else {
            HandlerRef::Internal((-(index as i64) - 1) as usize)
        }
    }

    pub fn to_index(self) -> i32 {
        match self {
            HandlerRef::External(index) => index as i32,
            HandlerRef::Internal(index) => -(index as i32) - 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRecord {
    #[serde(rename = "Extension List")]
    pub extensions: String,
    #[serde(rename = "Packer Supported")]
    pub use_packer: bool,
    #[serde(rename = "Packer Index")]
    pub packer_index: i32,
    #[serde(rename = "Unpacker Index")]
    pub unpacker_index: i32,
}

impl FormatRecord {
    /*
     * A record without packer support always stores packer index -1, whatever
     * the caller passed.
     */
    pub fn new(extensions: &str, use_packer: bool, packer_index: i32, unpacker_index: i32) -> Self {
        FormatRecord {
            extensions: extensions.to_lowercase(),
            use_packer,
            packer_index: if use_packer { packer_index } else { -1 },
            unpacker_index,
        }
    }

    pub fn packer(&self) -> Option<HandlerRef> {
        self.use_packer
            .then(|| HandlerRef::from_index(self.packer_index))
    }

    pub fn unpacker(&self) -> HandlerRef {
        HandlerRef::from_index(self.unpacker_index)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.extensions.split(';').filter(|ext| !ext.is_empty())
    }

    fn validate(&self) -> Result<()> {
        if self.patterns().next().is_none() {
            return Err(RegistryError::InvalidRecord(
                "empty extension list".to_string(),
            ));
        }
        if let Some(bad) = self.patterns().find(|ext| ext.contains(['.', '\\', '/', ' '])) {
            return Err(RegistryError::InvalidRecord(format!(
                "extension '{bad}' contains an invalid character"
            )));
        }
        Ok(())
    }
}

pub fn default_formats() -> Vec<FormatRecord> {
    vec![
        FormatRecord::new("zip;pk3;jar", true, -1, -1),
        FormatRecord::new("j", true, 0, 0),
        FormatRecord::new("rar;r##", true, 1, 1),
        FormatRecord::new("arj;a##", true, 9, 9),
        FormatRecord::new("lzh", true, 3, 3),
        FormatRecord::new("uc2", true, 4, 4),
        FormatRecord::new("ace;c##", true, 10, 10),
        FormatRecord::new("pak", true, -3, -3),
        FormatRecord::new("tgz;tbz;taz;tar;gz;bz;bz2;z;rpm;cpio", false, 0, -2),
    ]
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn normalize_wildcard(c: char) -> char {
    if c == '?' { '#' } else { lower(c) }
}

#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<FormatRecord>,
    // last pattern character -> (reversed remainder + '.', format index), in registration order
    buckets: HashMap<char, Vec<(String, usize)>>,
}

impl FormatRegistry {
    /*
     * Builds a registry from `formats`. Duplicate patterns are reported but the
     * lookup is still built (the first registration wins).
     */
    pub fn new(formats: Vec<FormatRecord>) -> Result<Self> {
        for record in &formats {
            record.validate()?;
        }
        let mut registry = FormatRegistry {
            formats,
            buckets: HashMap::new(),
        };
        registry.build_lookup()?;
        Ok(registry)
    }

    pub fn with_defaults() -> Self {
        let formats = default_formats();
        let mut registry = FormatRegistry {
            formats,
            buckets: HashMap::new(),
        };
        if let Err(e) = registry.build_lookup() {
            log::error!("FormatRegistry: Default formats are inconsistent: {e}");
        }
        registry
    }

    pub fn formats(&self) -> &[FormatRecord] {
        &self.formats
    }

    pub fn format(&self, index: usize) -> Option<&FormatRecord> {
        self.formats.get(index)
    }

    /*
     * Rebuilds the suffix lookup from the format list. Returns the position of
     * the first duplicate pattern as an error, after building everything else.
     */
    pub fn build_lookup(&mut self) -> Result<()> {
        self.buckets.clear();
        let mut first_duplicate = None;
        for (format_index, record) in self.formats.iter().enumerate() {
            let mut column = 0;
            for pattern in record.extensions.split(';') {
                let chars: Vec<char> = pattern.chars().map(normalize_wildcard).collect();
                if let Some((&last, rest)) = chars.split_last() {
                    let mut key: String = rest.iter().rev().collect();
                    key.push('.');
                    let bucket = self.buckets.entry(last).or_default();
                    if bucket.iter().any(|(known, _)| *known == key) {
                        log::warn!(
                            "FormatRegistry: Duplicate extension '{pattern}' in format {format_index}."
                        );
                        first_duplicate.get_or_insert(RegistryError::DuplicateExtension {
                            format: format_index,
                            column,
                        });
                    } else {
                        bucket.push((key, format_index));
                    }
                }
                column += pattern.len() + 1;
            }
        }
        match first_duplicate {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn match_bucket(&self, bucket_key: char, tail: &[char]) -> Option<usize> {
        let bucket = self.buckets.get(&bucket_key)?;
        bucket.iter().find_map(|(pattern, format_index)| {
            let mut name = tail.iter().rev();
            let matched = pattern.chars().all(|p| match name.next() {
                Some(&c) if p == '#' => c.is_ascii_digit(),
                Some(&c) => p == lower(c),
                None => false,
            });
            matched.then_some(*format_index)
        })
    }

    /*
     * 1-based index of the format matching `file_name`, or 0 if the name is not
     * a known archive.
     */
    pub fn pack_is_archive(&self, file_name: &str) -> usize {
        self.find_format(file_name).map_or(0, |index| index + 1)
    }

    pub fn find_format(&self, file_name: &str) -> Option<usize> {
        let chars: Vec<char> = file_name.chars().collect();
        let (&last, tail) = chars.split_last()?;
        if let Some(found) = self.match_bucket(lower(last), tail) {
            return Some(found);
        }
        if last.is_ascii_digit() {
            return self.match_bucket('#', tail);
        }
        None
    }

    pub fn unpacker_for(&self, file_name: &str) -> Option<HandlerRef> {
        self.find_format(file_name)
            .and_then(|index| self.formats.get(index))
            .map(FormatRecord::unpacker)
    }

    pub fn packer_for(&self, file_name: &str) -> Option<HandlerRef> {
        self.find_format(file_name)
            .and_then(|index| self.formats.get(index))
            .and_then(FormatRecord::packer)
    }

    pub fn add_format(&mut self, record: FormatRecord) -> Result<usize> {
        record.validate()?;
        self.formats.push(record);
        self.build_lookup()?;
        Ok(self.formats.len() - 1)
    }

    pub fn set_format(&mut self, index: usize, record: FormatRecord) -> Result<()> {
        record.validate()?;
        let slot = self
            .formats
            .get_mut(index)
            .ok_or(RegistryError::IndexOutOfRange(index))?;
        *slot = record;
        self.build_lookup()
    }

    pub fn remove_format(&mut self, index: usize) -> Result<FormatRecord> {
        if index >= self.formats.len() {
            return Err(RegistryError::IndexOutOfRange(index));
        }
        let removed = self.formats.remove(index);
        self.build_lookup()?;
        Ok(removed)
    }

    // Moves a record, shifting the ones in between; matching order follows the list.
    pub fn move_format(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.formats.len() {
            return Err(RegistryError::IndexOutOfRange(from));
        }
        if to >= self.formats.len() {
            return Err(RegistryError::IndexOutOfRange(to));
        }
        let record = self.formats.remove(from);
        self.formats.insert(to, record);
        self.build_lookup()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_formats_resolve_handlers() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.pack_is_archive("backup.ZIP"), 1);
        assert_eq!(registry.unpacker_for("backup.zip"), Some(HandlerRef::Internal(0)));
        assert_eq!(registry.unpacker_for("set.rar"), Some(HandlerRef::External(1)));
        assert_eq!(registry.unpacker_for("old.arj"), Some(HandlerRef::External(9)));
        assert_eq!(registry.unpacker_for("game.pak"), Some(HandlerRef::Internal(2)));
        assert_eq!(registry.unpacker_for("src.tar"), Some(HandlerRef::Internal(1)));
        assert_eq!(registry.packer_for("src.tar"), None);
        assert_eq!(registry.pack_is_archive("notes.txt"), 0);
        assert_eq!(registry.pack_is_archive(""), 0);
    }

    #[test]
    fn test_digit_wildcard_matches_volume_series() {
        let registry = FormatRegistry::new(vec![FormatRecord::new("r??", true, 1, 1)]).unwrap();
        assert_eq!(registry.pack_is_archive("archive.r01"), 1);
        assert_eq!(registry.pack_is_archive("archive.r99"), 1);
        assert_eq!(registry.pack_is_archive("archive.rar"), 0);
        assert_eq!(registry.pack_is_archive("archive.r1"), 0);
    }

    #[test]
    fn test_overlapping_patterns_match_in_registration_order() {
        let registry = FormatRegistry::new(vec![
            FormatRecord::new("t1z", true, 1, 1),
            FormatRecord::new("t#z", true, 9, 9),
        ])
        .unwrap();
        assert_eq!(registry.find_format("backup.t1z"), Some(0));
        assert_eq!(registry.find_format("backup.t5z"), Some(1));

        let reversed = FormatRegistry::new(vec![
            FormatRecord::new("t#z", true, 9, 9),
            FormatRecord::new("t1z", true, 1, 1),
        ])
        .unwrap();
        assert_eq!(reversed.find_format("backup.t1z"), Some(0));
    }

    #[test]
    fn test_aliases_share_one_format() {
        let registry = FormatRegistry::new(vec![
            FormatRecord::new("txt", false, 0, 5),
            FormatRecord::new("zip;pk3", true, -1, -1),
        ])
        .unwrap();
        assert_eq!(registry.pack_is_archive("a.zip"), 2);
        assert_eq!(registry.pack_is_archive("a.pk3"), 2);
    }

    #[test]
    fn test_extension_requires_dot_boundary() {
        let registry = FormatRegistry::with_defaults();
        // "z" is registered, but "quiz" has no dot before the z.
        assert_eq!(registry.pack_is_archive("quiz"), 0);
        assert_eq!(registry.pack_is_archive("data.z"), 9);
        assert_eq!(registry.pack_is_archive("zip"), 0);
        assert_eq!(registry.pack_is_archive("multi.a07"), 4);
    }

    #[test]
    fn test_duplicate_extension_reports_position() {
        let result = FormatRegistry::new(vec![
            FormatRecord::new("zip", true, -1, -1),
            FormatRecord::new("rar;zip", true, 1, 1),
        ]);
        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateExtension {
                format: 1,
                column: 4
            })
        );
    }

    #[test]
    fn test_handler_index_round_trip_for_plugins() {
        assert_eq!(HandlerRef::from_index(-3), HandlerRef::Internal(2));
        assert_eq!(HandlerRef::Internal(2).to_index(), -3);
        assert_eq!(HandlerRef::from_index(4), HandlerRef::External(4));
    }

    #[test]
    fn test_move_and_remove_rebuild_lookup() {
        let mut registry = FormatRegistry::with_defaults();
        registry.move_format(2, 0).unwrap();
        assert_eq!(registry.pack_is_archive("x.rar"), 1);
        let removed = registry.remove_format(0).unwrap();
        assert_eq!(removed.extensions, "rar;r##");
        assert_eq!(registry.pack_is_archive("x.rar"), 0);
        assert!(registry.remove_format(100).is_err());
    }

    #[test]
    fn test_invalid_record_rejected() {
        let mut registry = FormatRegistry::with_defaults();
        assert!(matches!(
            registry.add_format(FormatRecord::new("", true, 0, 0)),
            Err(RegistryError::InvalidRecord(_))
        ));
        assert!(registry.add_format(FormatRecord::new("7z", true, 0, 0)).is_ok());
        assert_eq!(registry.pack_is_archive("a.7z"), 10);
    }
}
