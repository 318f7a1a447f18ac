/*
 * Placeholder expansion for archiver command lines and working directories.
 *
 * Templates are plain text with `$(Name)` placeholders, optionally
 * `$(Name:width)` (value padded with spaces or cut to exactly `width`
 * characters, 1 to 4 digits) or `$(Name:max)`. `$[NAME]` inserts an
 * environment variable and `$$` a literal dollar sign. Names are case
 * insensitive and come from one of two fixed tables: the command table (archive,
 * target, list and extract names plus the executable of every archiver) and
 * the smaller working-directory table.
 *
 * Anything that needs the file system (the DOS name of an archive that does not
 * exist yet) is resolved once by `ExpansionContext::prepare` before expansion;
 * `expand` itself only reads the context.
 */
use super::archiver_config::{ARCHIVERS, ArchiverConfig};
use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

#[derive(Debug)]
pub enum TemplateError {
    UnmatchedParenthesis(usize),
    UnmatchedBracket(usize),
    InvalidWidth(usize),
    UnknownVariable { name: String, position: usize },
    UnexpectedCharacter(usize),
    TrailingDollar(usize),
    // The template refers to a value the operation does not provide.
    MissingValue(&'static str),
    MixedArchiveNames,
    ShortName(PathBuf),
    Io(io::Error),
}

impl From<io::Error> for TemplateError {
    fn from(err: io::Error) -> Self {
        TemplateError::Io(err)
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::UnmatchedParenthesis(pos) => write!(f, "Missing ')' for '$(' at position {pos}"),
            TemplateError::UnmatchedBracket(pos) => write!(f, "Missing ']' for '$[' at position {pos}"),
            TemplateError::InvalidWidth(pos) => write!(f, "Invalid column width in variable at position {pos}"),
            TemplateError::UnknownVariable { name, position } => {
                write!(f, "Unknown variable '{name}' at position {position}")
            }
            TemplateError::UnexpectedCharacter(pos) => {
                write!(f, "Expected '$', '(' or '[' at position {pos}")
            }
            TemplateError::TrailingDollar(pos) => write!(f, "Unexpected end of text after '$' at position {pos}"),
            TemplateError::MissingValue(name) => write!(f, "Variable '{name}' has no value here"),
            TemplateError::MixedArchiveNames => {
                write!(f, "Long and DOS archive names cannot be used in the same command")
            }
            TemplateError::ShortName(path) => write!(f, "Unable to get short name of {}", path.display()),
            TemplateError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;

/*
 * Maps paths to their legacy 8.3 aliases. Returns `None` when the path does not
 * exist or has no alias.
 */
pub trait ShortNameOperations: Send + Sync {
    fn short_path(&self, path: &Path) -> Option<PathBuf>;
}

// File systems without 8.3 aliases: every existing path is its own short name.
pub struct CoreShortNameResolver {}

impl CoreShortNameResolver {
    pub fn new() -> Self {
        CoreShortNameResolver {}
    }
}

impl Default for CoreShortNameResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortNameOperations for CoreShortNameResolver {
    fn short_path(&self, path: &Path) -> Option<PathBuf> {
        path.exists().then(|| path.to_path_buf())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSet {
    Command,
    InitDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    ArchivePath,
    ArchiveFileName,
    ArchiveDosFileName,
    ArchiveFullName,
    ArchiveDosFullName,
    SourcePath,
    TargetPath,
    TargetDosPath,
    ListFullName,
    ListDosFullName,
    ExtractFullName,
    Executable { index: usize, unpacker: bool },
}

const COMMAND_VARIABLES: &[(&str, Variable)] = &[
    ("ArchivePath", Variable::ArchivePath),
    ("ArchiveFileName", Variable::ArchiveFileName),
    ("ArchiveDOSFileName", Variable::ArchiveDosFileName),
    ("ArchiveFullName", Variable::ArchiveFullName),
    ("ArchiveDOSFullName", Variable::ArchiveDosFullName),
    ("TargetPath", Variable::TargetPath),
    ("TargetDOSPath", Variable::TargetDosPath),
    ("ListFullName", Variable::ListFullName),
    ("ListDOSFullName", Variable::ListDosFullName),
    ("ExtractFullName", Variable::ExtractFullName),
];

const INIT_DIR_VARIABLES: &[(&str, Variable)] = &[
    ("ArchivePath", Variable::ArchivePath),
    ("SourcePath", Variable::SourcePath),
    ("TargetPath", Variable::TargetPath),
    ("TargetDOSPath", Variable::TargetDosPath),
];

fn lookup(set: VariableSet, name: &str) -> Option<Variable> {
    let table = match set {
        VariableSet::Command => COMMAND_VARIABLES,
        VariableSet::InitDir => INIT_DIR_VARIABLES,
    };
    if let Some((_, variable)) = table.iter().find(|(known, _)| known.eq_ignore_ascii_case(name)) {
        return Some(*variable);
    }
    if set != VariableSet::Command {
        return None;
    }
    ARCHIVERS.iter().enumerate().find_map(|(index, descriptor)| {
        if descriptor.packer_variable.eq_ignore_ascii_case(name) {
            Some(Variable::Executable { index, unpacker: false })
        } else if descriptor.unpacker_variable.is_some_and(|v| v.eq_ignore_ascii_case(name)) {
            Some(Variable::Executable { index, unpacker: true })
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    Natural,
    Max,
    Fixed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'t> {
    Text(&'t str),
    Variable { name: &'t str, width: Width, position: usize },
    Environment(&'t str),
}

fn parse_width(spec: &str, position: usize) -> Result<Width> {
    if spec.eq_ignore_ascii_case("max") {
        return Ok(Width::Max);
    }
    if spec.is_empty() || spec.len() > 4 || !spec.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TemplateError::InvalidWidth(position));
    }
    match spec.parse::<usize>() {
        Ok(width) if width >= 1 => Ok(Width::Fixed(width)),
        _ => Err(TemplateError::InvalidWidth(position)),
    }
}

// Positions are byte offsets of the '$' that starts the failing construct.
fn tokenize(template: &str) -> Result<Vec<Token<'_>>> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        if text_start < i {
            tokens.push(Token::Text(&template[text_start..i]));
        }
        let position = i;
        match bytes.get(i + 1) {
            None => return Err(TemplateError::TrailingDollar(position)),
            Some(b'$') => {
                tokens.push(Token::Text("$"));
                i += 2;
            }
            Some(b'(') => {
                let close = template[i + 2..]
                    .find(')')
                    .ok_or(TemplateError::UnmatchedParenthesis(position))?
                    + i
                    + 2;
                let inner = &template[i + 2..close];
                let (name, width) = match inner.split_once(':') {
                    Some((name, spec)) => (name, parse_width(spec, position)?),
                    None => (inner, Width::Natural),
                };
                tokens.push(Token::Variable { name, width, position });
                i = close + 1;
            }
            Some(b'[') => {
                let close = template[i + 2..]
                    .find(']')
                    .ok_or(TemplateError::UnmatchedBracket(position))?
                    + i
                    + 2;
                tokens.push(Token::Environment(&template[i + 2..close]));
                i = close + 1;
            }
            Some(_) => return Err(TemplateError::UnexpectedCharacter(position + 1)),
        }
        text_start = i;
    }
    if text_start < bytes.len() {
        tokens.push(Token::Text(&template[text_start..]));
    }
    Ok(tokens)
}

fn resolve_tokens<'t>(template: &'t str, set: VariableSet) -> Result<Vec<(Token<'t>, Option<Variable>)>> {
    tokenize(template)?
        .into_iter()
        .map(|token| match token {
            Token::Variable { name, position, .. } => match lookup(set, name) {
                Some(variable) => Ok((token, Some(variable))),
                None => Err(TemplateError::UnknownVariable {
                    name: name.to_string(),
                    position,
                }),
            },
            _ => Ok((token, None)),
        })
        .collect()
}

/*
 * Checks syntax and variable names without expanding anything.
 */
pub fn validate(template: &str, set: VariableSet) -> Result<()> {
    resolve_tokens(template, set).map(|_| ())
}

fn apply_width(value: String, width: Width) -> String {
    match width {
        Width::Natural | Width::Max => value,
        Width::Fixed(width) => {
            let mut fitted: String = value.chars().take(width).collect();
            let len = fitted.chars().count();
            fitted.extend(std::iter::repeat_n(' ', width - len));
            fitted
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn file_name_string(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/*
 * Values for one expansion. The archive name is always known; the rest depends
 * on the operation.
 */
pub struct ExpansionContext<'a> {
    executables: &'a ArchiverConfig,
    short_names: &'a dyn ShortNameOperations,
    archive: PathBuf,
    archive_dos: Option<PathBuf>,
    dos_tmp: Option<PathBuf>,
    source: Option<String>,
    target: Option<String>,
    list_file: Option<PathBuf>,
    extract_name: Option<String>,
}

impl<'a> ExpansionContext<'a> {
    pub fn new(
        executables: &'a ArchiverConfig,
        short_names: &'a dyn ShortNameOperations,
        archive: &Path,
    ) -> Self {
        ExpansionContext {
            executables,
            short_names,
            archive: archive.to_path_buf(),
            archive_dos: None,
            dos_tmp: None,
            source: None,
            target: None,
            list_file: None,
            extract_name: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_list_file(mut self, list_file: &Path) -> Self {
        self.list_file = Some(list_file.to_path_buf());
        self
    }

    pub fn with_extract_name(mut self, name: &str) -> Self {
        self.extract_name = Some(name.to_string());
        self
    }

    /*
     * Substitute name chosen for an archive that did not exist yet, if one was
     * needed. The archiver creates `PACKxxx.*` files under this name which have
     * to be renamed afterwards.
     */
    pub fn dos_tmp_name(&self) -> Option<&Path> {
        self.dos_tmp.as_deref()
    }

    /*
     * Resolves the DOS archive name when `template` needs it. With
     * `allow_dos_tmp`, an archive that does not exist yet gets a substitute
     * `PACKxxx.ext` name in its directory.
     */
    pub fn prepare(&mut self, template: &str, allow_dos_tmp: bool) -> Result<()> {
        let mut uses_long = false;
        let mut uses_dos = false;
        for (_, variable) in resolve_tokens(template, VariableSet::Command)? {
            match variable {
                Some(Variable::ArchiveFileName | Variable::ArchiveFullName) => uses_long = true,
                Some(Variable::ArchiveDosFileName | Variable::ArchiveDosFullName) => uses_dos = true,
                _ => {}
            }
        }
        if uses_long && uses_dos {
            return Err(TemplateError::MixedArchiveNames);
        }
        if !uses_dos || self.archive_dos.is_some() {
            return Ok(());
        }
        if let Some(short) = self.short_names.short_path(&self.archive) {
            self.archive_dos = Some(short);
            return Ok(());
        }
        if !allow_dos_tmp {
            return Err(TemplateError::ShortName(self.archive.clone()));
        }
        let tmp = synthesize_dos_tmp_name(&self.archive)?;
        log::debug!("ExpansionContext: Using {} in place of {}", tmp.display(), self.archive.display());
        self.archive_dos = Some(tmp.clone());
        self.dos_tmp = Some(tmp);
        Ok(())
    }

    fn value(&self, variable: Variable) -> Result<String> {
        match variable {
            Variable::ArchivePath => {
                let parent = self
                    .archive
                    .parent()
                    .ok_or(TemplateError::MissingValue("ArchivePath"))?;
                let mut path = path_string(parent);
                if !path.ends_with(MAIN_SEPARATOR) {
                    path.push(MAIN_SEPARATOR);
                }
                Ok(path)
            }
            Variable::ArchiveFileName => {
                file_name_string(&self.archive).ok_or(TemplateError::MissingValue("ArchiveFileName"))
            }
            Variable::ArchiveFullName => Ok(path_string(&self.archive)),
            Variable::ArchiveDosFullName => self
                .archive_dos
                .as_deref()
                .map(path_string)
                .ok_or_else(|| TemplateError::ShortName(self.archive.clone())),
            Variable::ArchiveDosFileName => self
                .archive_dos
                .as_deref()
                .and_then(file_name_string)
                .ok_or_else(|| TemplateError::ShortName(self.archive.clone())),
            Variable::SourcePath => self.source.clone().ok_or(TemplateError::MissingValue("SourcePath")),
            Variable::TargetPath => self.target.clone().ok_or(TemplateError::MissingValue("TargetPath")),
            Variable::TargetDosPath => {
                let target = self.target.as_deref().ok_or(TemplateError::MissingValue("TargetDOSPath"))?;
                self.short_names
                    .short_path(Path::new(target))
                    .map(|p| path_string(&p))
                    .ok_or_else(|| TemplateError::ShortName(PathBuf::from(target)))
            }
            Variable::ListFullName => self
                .list_file
                .as_deref()
                .map(path_string)
                .ok_or(TemplateError::MissingValue("ListFullName")),
            Variable::ListDosFullName => {
                let list = self
                    .list_file
                    .as_deref()
                    .ok_or(TemplateError::MissingValue("ListDOSFullName"))?;
                self.short_names
                    .short_path(list)
                    .map(|p| path_string(&p))
                    .ok_or_else(|| TemplateError::ShortName(list.to_path_buf()))
            }
            Variable::ExtractFullName => self
                .extract_name
                .clone()
                .ok_or(TemplateError::MissingValue("ExtractFullName")),
            Variable::Executable { index, unpacker } => {
                let exe = if unpacker {
                    self.executables.unpacker_exe(index)
                } else {
                    self.executables.packer_exe(index)
                };
                let exe = exe.ok_or(TemplateError::MissingValue("Executable"))?;
                Ok(quote_executable(exe))
            }
        }
    }

    pub fn expand(&self, template: &str, set: VariableSet) -> Result<String> {
        let mut out = String::with_capacity(template.len() * 2);
        for (token, variable) in resolve_tokens(template, set)? {
            match (token, variable) {
                (Token::Text(text), _) => out.push_str(text),
                (Token::Environment(name), _) => {
                    out.push_str(&std::env::var(name).unwrap_or_default());
                }
                (Token::Variable { width, .. }, Some(variable)) => {
                    out.push_str(&apply_width(self.value(variable)?, width));
                }
                (Token::Variable { name, position, .. }, None) => {
                    return Err(TemplateError::UnknownVariable {
                        name: name.to_string(),
                        position,
                    });
                }
            }
        }
        Ok(out)
    }

    /*
     * Shorthand for the usual sequence on command templates.
     */
    pub fn expand_command(&mut self, template: &str, allow_dos_tmp: bool) -> Result<String> {
        self.prepare(template, allow_dos_tmp)?;
        self.expand(template, VariableSet::Command)
    }

    pub fn expand_init_dir(&self, template: &str) -> Result<String> {
        self.expand(template, VariableSet::InitDir)
    }
}

fn quote_executable(exe: &str) -> String {
    if exe.starts_with('"') {
        exe.to_string()
    } else {
        format!("\"{exe}\"")
    }
}

// '.' plus at most three characters that are legal in an 8.3 extension.
fn short_extension(name: &str) -> String {
    let Some(dot) = name.rfind('.') else {
        return String::new();
    };
    let mut ext = String::from(".");
    for c in name[dot + 1..].chars().take(3) {
        if !c.is_ascii() || matches!(c, '[' | ']' | ';' | '=' | ',' | ' ') {
            break;
        }
        ext.push(c);
    }
    ext
}

/*
 * Picks `PACK<hex>` so that no file `PACK<hex>` or `PACK<hex>.*` exists in the
 * archive's directory, and appends the archive's (shortened) extension, which
 * multi-volume archivers derive their volume names from.
 */
pub fn synthesize_dos_tmp_name(archive: &Path) -> Result<PathBuf> {
    let dir = archive.parent().ok_or(TemplateError::MissingValue("ArchivePath"))?;
    let existing: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_uppercase())
        .collect();
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
        & 0xFFF;
    let ext = archive
        .file_name()
        .map(|name| short_extension(&name.to_string_lossy()))
        .unwrap_or_default();
    for counter in seed..seed + 0x10000 {
        let stem = format!("PACK{counter:X}");
        let prefix = format!("{stem}.");
        if existing.iter().any(|name| *name == stem || name.starts_with(&prefix)) {
            continue;
        }
        return Ok(dir.join(format!("{stem}{ext}")));
    }
    Err(TemplateError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free temporary archive name",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archiver_config::{BROWSE_TABLE, MODIFY_TABLE};
    use tempfile::tempdir;

    struct NoShortNames;

    impl ShortNameOperations for NoShortNames {
        fn short_path(&self, _path: &Path) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_expand_list_command() -> Result<()> {
        let config = ArchiverConfig::new();
        let resolver = CoreShortNameResolver::new();
        let archive = Path::new("/data/backup.rar");
        let mut ctx = ExpansionContext::new(&config, &resolver, archive);
        let cmd = ctx.expand_command(BROWSE_TABLE[1].list_command, false)?;
        assert_eq!(cmd, "\"rar\" v -c- \"backup.rar\"");
        let dir = ctx.expand_init_dir(BROWSE_TABLE[1].list_init_dir)?;
        assert_eq!(dir, format!("{}data{}", MAIN_SEPARATOR, MAIN_SEPARATOR));
        Ok(())
    }

    #[test]
    fn test_expand_compress_command_with_configured_exe() -> Result<()> {
        let mut config = ArchiverConfig::new();
        config.set_packer_exe(1, Some("/opt/rar/rar"));
        let resolver = CoreShortNameResolver::new();
        let mut ctx = ExpansionContext::new(&config, &resolver, Path::new("/a/b.rar"))
            .with_target("\\docs")
            .with_list_file(Path::new("/tmp/list.txt"));
        let cmd = ctx.expand_command(MODIFY_TABLE[1].compress_command, false)?;
        assert_eq!(cmd, "\"/opt/rar/rar\" a -scol \"/a/b.rar\" -ap\"\\docs\" @\"/tmp/list.txt\"");
        Ok(())
    }

    #[test]
    fn test_width_pads_and_truncates() -> Result<()> {
        let config = ArchiverConfig::new();
        let resolver = CoreShortNameResolver::new();
        let ctx = ExpansionContext::new(&config, &resolver, Path::new("/x/abc.zip"));
        assert_eq!(ctx.expand("[$(ArchiveFileName:9)]", VariableSet::Command)?, "[abc.zip  ]");
        assert_eq!(ctx.expand("[$(archivefilename:3)]", VariableSet::Command)?, "[abc]");
        assert_eq!(ctx.expand("$(ArchiveFileName:max)", VariableSet::Command)?, "abc.zip");
        Ok(())
    }

    #[test]
    fn test_dollar_escape_and_environment() -> Result<()> {
        let config = ArchiverConfig::new();
        let resolver = CoreShortNameResolver::new();
        let ctx = ExpansionContext::new(&config, &resolver, Path::new("/x/a.zip"));
        let var = format!("PACK_BRIDGE_TEST_{}", std::process::id());
        assert_eq!(ctx.expand(&format!("$$RED $[{var}]!"), VariableSet::Command)?, "$RED !");
        Ok(())
    }

    #[test]
    fn test_syntax_errors_report_positions() {
        assert!(matches!(
            validate("abc $(ArchivePath", VariableSet::Command),
            Err(TemplateError::UnmatchedParenthesis(4))
        ));
        assert!(matches!(
            validate("$[PATH", VariableSet::Command),
            Err(TemplateError::UnmatchedBracket(0))
        ));
        assert!(matches!(
            validate("x $(ArchivePath:0)", VariableSet::Command),
            Err(TemplateError::InvalidWidth(2))
        ));
        assert!(matches!(
            validate("x $(ArchivePath:12345)", VariableSet::Command),
            Err(TemplateError::InvalidWidth(2))
        ));
        assert!(matches!(
            validate("$x", VariableSet::Command),
            Err(TemplateError::UnexpectedCharacter(1))
        ));
        assert!(matches!(
            validate("abc$", VariableSet::Command),
            Err(TemplateError::TrailingDollar(3))
        ));
        match validate("ok $(Nope)", VariableSet::Command) {
            Err(TemplateError::UnknownVariable { name, position }) => {
                assert_eq!(name, "Nope");
                assert_eq!(position, 3);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_init_dir_table_is_restricted() {
        assert!(validate("$(SourcePath)", VariableSet::InitDir).is_ok());
        assert!(validate("$(ListFullName)", VariableSet::InitDir).is_err());
        assert!(validate("$(SourcePath)", VariableSet::Command).is_err());
        assert!(validate("$(Rar32bitExecutable)", VariableSet::InitDir).is_err());
    }

    #[test]
    fn test_all_builtin_templates_are_valid() {
        for browse in BROWSE_TABLE.iter() {
            for cmd in [browse.list_command, browse.uncompress_command, browse.extract_command] {
                assert!(validate(cmd, VariableSet::Command).is_ok(), "{cmd}");
            }
            for dir in [browse.list_init_dir, browse.uncompress_init_dir, browse.extract_init_dir] {
                assert!(validate(dir, VariableSet::InitDir).is_ok(), "{dir}");
            }
        }
        for modify in MODIFY_TABLE.iter() {
            assert!(validate(modify.compress_command, VariableSet::Command).is_ok());
            assert!(validate(modify.delete_command, VariableSet::Command).is_ok());
            assert!(validate(modify.compress_init_dir, VariableSet::InitDir).is_ok());
            assert!(validate(modify.delete_init_dir, VariableSet::InitDir).is_ok());
        }
    }

    #[test]
    fn test_mixed_archive_names_are_rejected() {
        let config = ArchiverConfig::new();
        let resolver = CoreShortNameResolver::new();
        let mut ctx = ExpansionContext::new(&config, &resolver, Path::new("/x/a.zip"));
        assert!(matches!(
            ctx.prepare("$(ArchiveFullName) $(ArchiveDOSFullName)", false),
            Err(TemplateError::MixedArchiveNames)
        ));
    }

    #[test]
    fn test_dos_name_of_missing_archive() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("Very Long Name.arj");
        let config = ArchiverConfig::new();
        let resolver = NoShortNames;
        let mut ctx = ExpansionContext::new(&config, &resolver, &archive);
        assert!(matches!(
            ctx.prepare("$(ArchiveDOSFullName)", false),
            Err(TemplateError::ShortName(_))
        ));
        let cmd = ctx.expand_command("$(ArchiveDOSFileName)", true)?;
        assert!(cmd.starts_with("PACK"), "{cmd}");
        assert!(cmd.ends_with(".arj"), "{cmd}");
        let tmp = ctx.dos_tmp_name().map(Path::to_path_buf);
        assert_eq!(tmp, Some(dir.path().join(&cmd)));
        Ok(())
    }

    #[test]
    fn test_dos_tmp_name_skips_taken_names() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("a.longext");
        let first = synthesize_dos_tmp_name(&archive)?;
        let name = first.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        assert!(name.ends_with(".lon"), "{name}");
        let stem = name.trim_end_matches(".lon").to_string();
        fs::write(dir.path().join(format!("{stem}.A01")), b"")?;
        let second = synthesize_dos_tmp_name(&archive)?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_short_extension_stops_at_forbidden_characters() {
        assert_eq!(short_extension("x.a b"), ".a");
        assert_eq!(short_extension("noext"), "");
        assert_eq!(short_extension("x.r01"), ".r01");
    }
}
