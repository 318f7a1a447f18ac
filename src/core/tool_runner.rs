/*
 * Runs external archivers and collects what they print.
 *
 * A command line is either handed as one argument to a spawning helper
 * (`helper -c10000 <command line>`), which reports its own failures through
 * exit codes at and above `SPAWN_ERR_BASE`, or split into arguments here and
 * started directly. Standard output and standard error are captured on two
 * reader threads and split into lines once the process has exited.
 *
 * While the tool runs, the calling thread's priority is lowered through a
 * `PriorityGuard`. When the tool takes longer than the wait timeout, the host
 * is asked once to show the tool's console, and waiting continues.
 */
use super::archiver_config::{ErrorTable, decode_output_line, exit_code_reason};
use super::errors::{PackError, ReturnCategory};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const SPAWN_ERR_BASE: i32 = 10000;
pub const SPAWN_FLAG: &str = "-c10000";
// Longest output line a listing parser accepts, in bytes.
pub const MAX_OUTPUT_LINE: usize = 990;
// Command line limit of tools without long name support.
pub const MAX_DOS_COMMAND_LINE: usize = 128;
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(15000);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub enum ToolRunError {
    EmptyCommand,
    Spawn { command: String, source: io::Error },
    Wait { command: String, source: io::Error },
    Signalled(String),
    Capture(io::Error),
    LineTooLong(usize),
}

impl std::fmt::Display for ToolRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolRunError::EmptyCommand => write!(f, "The command line is empty"),
            ToolRunError::Spawn { command, source } => write!(f, "Unable to start '{command}': {source}"),
            ToolRunError::Wait { command, source } => {
                write!(f, "Error waiting for '{command}' to finish: {source}")
            }
            ToolRunError::Signalled(command) => write!(f, "'{command}' was terminated by a signal"),
            ToolRunError::Capture(e) => write!(f, "Error reading tool output: {e}"),
            ToolRunError::LineTooLong(len) => write!(f, "Tool output line of {len} bytes is too long"),
        }
    }
}

impl std::error::Error for ToolRunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToolRunError::Spawn { source, .. } => Some(source),
            ToolRunError::Wait { source, .. } => Some(source),
            ToolRunError::Capture(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ToolRunError> for PackError {
    fn from(err: ToolRunError) -> Self {
        match err {
            ToolRunError::EmptyCommand => PackError::CmdLineError,
            ToolRunError::Spawn { command, source } => PackError::Process {
                command,
                reason: source.to_string(),
            },
            ToolRunError::LineTooLong(_) => PackError::Parse,
            other => PackError::General(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolRunError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    // Standard output lines followed by standard error lines; empty unless captured.
    pub lines: Vec<String>,
}

/*
 * What the host does around a running tool: scheduling priority and making the
 * tool's console visible after the wait timeout.
 */
pub trait RunnerHostOperations: Send + Sync {
    fn set_background_priority(&self, background: bool);
    fn show_console(&self, command_line: &str);
}

// Host without a UI; only logs.
pub struct LoggingRunnerHost {}

impl LoggingRunnerHost {
    pub fn new() -> Self {
        LoggingRunnerHost {}
    }
}

impl Default for LoggingRunnerHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerHostOperations for LoggingRunnerHost {
    fn set_background_priority(&self, background: bool) {
        log::trace!("ToolRunner: Background priority {background}");
    }

    fn show_console(&self, command_line: &str) {
        log::info!("ToolRunner: Still waiting for '{command_line}'");
    }
}

/*
 * Keeps the host in background priority while alive.
 */
pub struct PriorityGuard<'a> {
    host: &'a dyn RunnerHostOperations,
}

impl<'a> PriorityGuard<'a> {
    pub fn new(host: &'a dyn RunnerHostOperations) -> Self {
        host.set_background_priority(true);
        PriorityGuard { host }
    }
}

impl Drop for PriorityGuard<'_> {
    fn drop(&mut self) {
        self.host.set_background_priority(false);
    }
}

pub trait ToolRunnerOperations: Send + Sync {
    /*
     * Runs `command_line` in `current_dir` and waits for it. With
     * `capture_output` the output is returned as lines, otherwise it goes to
     * the inherited console.
     */
    fn run(&self, command_line: &str, current_dir: &Path, capture_output: bool) -> Result<ToolOutput>;
}

pub struct CoreToolRunner {
    helper: Option<PathBuf>,
    wait_timeout: Duration,
    host: Arc<dyn RunnerHostOperations>,
}

impl CoreToolRunner {
    pub fn new() -> Self {
        CoreToolRunner {
            helper: None,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            host: Arc::new(LoggingRunnerHost::new()),
        }
    }

    pub fn with_helper(mut self, helper: &Path) -> Self {
        self.helper = Some(helper.to_path_buf());
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn RunnerHostOperations>) -> Self {
        self.host = host;
        self
    }

    fn build_command(&self, command_line: &str) -> Result<Command> {
        if let Some(helper) = &self.helper {
            let mut command = Command::new(helper);
            command.arg(SPAWN_FLAG).arg(command_line);
            return Ok(command);
        }
        let mut args = split_command_line(command_line).into_iter();
        let program = args.next().ok_or(ToolRunError::EmptyCommand)?;
        let mut command = Command::new(program);
        command.args(args);
        Ok(command)
    }

    fn wait(&self, child: &mut Child, command_line: &str) -> Result<i32> {
        let started = Instant::now();
        let mut console_shown = false;
        loop {
            let status = child.try_wait().map_err(|source| ToolRunError::Wait {
                command: first_token(command_line),
                source,
            })?;
            if let Some(status) = status {
                return status
                    .code()
                    .ok_or_else(|| ToolRunError::Signalled(first_token(command_line)));
            }
            if !console_shown && started.elapsed() >= self.wait_timeout {
                log::debug!("ToolRunner: Wait timeout elapsed for '{command_line}'");
                self.host.show_console(command_line);
                console_shown = true;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for CoreToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    source.map(|mut reader| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| ToolRunError::Capture(io::Error::other("output reader thread panicked")))?
            .map_err(ToolRunError::Capture),
    }
}

impl ToolRunnerOperations for CoreToolRunner {
    fn run(&self, command_line: &str, current_dir: &Path, capture_output: bool) -> Result<ToolOutput> {
        log::debug!("ToolRunner: Running '{command_line}' in {current_dir:?}");
        let mut command = self.build_command(command_line)?;
        command.current_dir(current_dir).stdin(Stdio::null());
        if capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let _priority = PriorityGuard::new(self.host.as_ref());
        let mut child = command.spawn().map_err(|source| ToolRunError::Spawn {
            command: first_token(command_line),
            source,
        })?;
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let exit_code = self.wait(&mut child, command_line)?;
        let mut output = join_reader(stdout)?;
        output.extend(join_reader(stderr)?);
        let lines = split_output_lines(&output)?;
        log::debug!(
            "ToolRunner: '{command_line}' exited with {exit_code}, {} output line(s)",
            lines.len()
        );
        Ok(ToolOutput { exit_code, lines })
    }
}

/*
 * Splits raw tool output at '\n', dropping '\r'. A last line without a newline
 * is kept.
 */
pub fn split_output_lines(output: &[u8]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut pieces = output.split(|b| *b == b'\n').peekable();
    while let Some(piece) = pieces.next() {
        if pieces.peek().is_none() && piece.is_empty() {
            break;
        }
        let bytes: Vec<u8> = piece.iter().copied().filter(|b| *b != b'\r').collect();
        if bytes.len() >= MAX_OUTPUT_LINE {
            return Err(ToolRunError::LineTooLong(bytes.len()));
        }
        lines.push(decode_output_line(&bytes));
    }
    Ok(lines)
}

/*
 * Splits at whitespace outside double quotes. Quotes are removed; `""` yields
 * an empty argument.
 */
pub fn split_command_line(command_line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    for c in command_line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        args.push(current);
    }
    args
}

/*
 * The program part of a command line without quotes, used in error messages.
 */
pub fn first_token(command_line: &str) -> String {
    let text = command_line.trim_start();
    match text.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or_default().to_string(),
        None => text.split_whitespace().next().unwrap_or_default().to_string(),
    }
}

pub fn check_command_length(command_line: &str, supports_long_names: bool) -> std::result::Result<(), PackError> {
    if !supports_long_names && command_line.len() >= MAX_DOS_COMMAND_LINE {
        return Err(PackError::CmdLineTooLong(command_line.to_string()));
    }
    Ok(())
}

fn os_error_text(code: i32) -> String {
    io::Error::from_raw_os_error(code).to_string()
}

/*
 * Turns an exit code into the error to report. Codes in the helper's reserved
 * range are decoded first; anything else goes through the tool's table.
 */
pub fn decode_exit_code(
    code: i32,
    table: Option<ErrorTable>,
    command_line: &str,
) -> std::result::Result<(), PackError> {
    if code == 0 {
        return Ok(());
    }
    let command = first_token(command_line);
    let err = match code {
        c if (SPAWN_ERR_BASE..2 * SPAWN_ERR_BASE).contains(&c) => PackError::Return {
            command: "spawning helper".to_string(),
            reason: ReturnCategory::Spawn.message().to_string(),
        },
        c if (2 * SPAWN_ERR_BASE..3 * SPAWN_ERR_BASE).contains(&c) => PackError::Process {
            command,
            reason: os_error_text(c - 2 * SPAWN_ERR_BASE),
        },
        c if (3 * SPAWN_ERR_BASE..4 * SPAWN_ERR_BASE).contains(&c) => PackError::General(format!(
            "Waiting for '{command}' failed: {}",
            os_error_text(c - 3 * SPAWN_ERR_BASE)
        )),
        c if c >= 4 * SPAWN_ERR_BASE => PackError::General(format!(
            "Unable to get the exit code of '{command}': {}",
            os_error_text(c - 4 * SPAWN_ERR_BASE)
        )),
        c => PackError::Return {
            command,
            reason: exit_code_reason(table, c),
        },
    };
    log::debug!("ToolRunner: Exit code {code} decoded as {err:?}");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archiver_config::RAR_ERRORS;
    use std::sync::Mutex;

    struct RecordingHost {
        priorities: Mutex<Vec<bool>>,
        consoles: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn new() -> Self {
            RecordingHost {
                priorities: Mutex::new(Vec::new()),
                consoles: Mutex::new(Vec::new()),
            }
        }
    }

    impl RunnerHostOperations for RecordingHost {
        fn set_background_priority(&self, background: bool) {
            self.priorities.lock().unwrap().push(background);
        }

        fn show_console(&self, command_line: &str) {
            self.consoles.lock().unwrap().push(command_line.to_string());
        }
    }

    #[test]
    fn test_split_command_line_handles_quotes() {
        assert_eq!(
            split_command_line(r#""C:\Program Files\rar.exe" x -y  "my archive.rar" """#),
            vec!["C:\\Program Files\\rar.exe", "x", "-y", "my archive.rar", ""]
        );
        assert!(split_command_line("   ").is_empty());
    }

    #[test]
    fn test_first_token() {
        assert_eq!(first_token(r#""C:\tools\arj.exe" l file.arj"#), "C:\\tools\\arj.exe");
        assert_eq!(first_token("  unace v x.ace"), "unace");
        assert_eq!(first_token(""), "");
    }

    #[test]
    fn test_split_output_lines_strips_carriage_returns() {
        let lines = split_output_lines(b"one\r\ntwo\n\nlast").unwrap();
        assert_eq!(lines, vec!["one", "two", "", "last"]);
        assert!(split_output_lines(b"").unwrap().is_empty());
    }

    #[test]
    fn test_split_output_lines_rejects_long_line() {
        let mut output = vec![b'x'; MAX_OUTPUT_LINE];
        output.push(b'\n');
        assert!(matches!(
            split_output_lines(&output),
            Err(ToolRunError::LineTooLong(len)) if len == MAX_OUTPUT_LINE
        ));
        let short = vec![b'x'; MAX_OUTPUT_LINE - 1];
        assert_eq!(split_output_lines(&short).unwrap().len(), 1);
    }

    #[test]
    fn test_decode_exit_code_reserved_ranges() {
        assert_eq!(decode_exit_code(0, Some(RAR_ERRORS), "rar l a.rar"), Ok(()));
        assert_eq!(
            decode_exit_code(10003, Some(RAR_ERRORS), "rar l a.rar"),
            Err(PackError::Return {
                command: "spawning helper".to_string(),
                reason: ReturnCategory::Spawn.message().to_string(),
            })
        );
        assert!(matches!(
            decode_exit_code(20002, None, "\"c:\\arj.exe\" l a.arj"),
            Err(PackError::Process { command, .. }) if command == "c:\\arj.exe"
        ));
        assert!(matches!(decode_exit_code(30001, None, "rar"), Err(PackError::General(_))));
        assert!(matches!(decode_exit_code(40001, None, "rar"), Err(PackError::General(_))));
    }

    #[test]
    fn test_decode_exit_code_uses_tool_table() {
        assert_eq!(
            decode_exit_code(1, Some(RAR_ERRORS), "rar x a.rar"),
            Err(PackError::Return {
                command: "rar".to_string(),
                reason: exit_code_reason(Some(RAR_ERRORS), 1),
            })
        );
        assert_eq!(
            decode_exit_code(77, None, "tool"),
            Err(PackError::Return {
                command: "tool".to_string(),
                reason: "The archiver returned error code 77.".to_string(),
            })
        );
    }

    #[test]
    fn test_check_command_length() {
        let long = "x".repeat(MAX_DOS_COMMAND_LINE);
        assert!(check_command_length(&long, true).is_ok());
        assert_eq!(
            check_command_length(&long, false),
            Err(PackError::CmdLineTooLong(long.clone()))
        );
        assert!(check_command_length(&long[1..], false).is_ok());
    }

    #[test]
    fn test_run_empty_command() {
        let runner = CoreToolRunner::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(runner.run("  ", dir.path(), true), Err(ToolRunError::EmptyCommand)));
    }

    #[test]
    fn test_run_missing_program_is_process_error() {
        let runner = CoreToolRunner::new();
        let dir = tempfile::tempdir().unwrap();
        let name = format!("no_such_tool_{}", rand::random::<u128>());
        let err = runner.run(&name, dir.path(), true).unwrap_err();
        assert!(matches!(
            PackError::from(err),
            PackError::Process { command, .. } if command == name
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout_then_stderr() {
        let host = Arc::new(RecordingHost::new());
        let runner = CoreToolRunner::new().with_host(host.clone());
        let dir = tempfile::tempdir().unwrap();
        let output = runner
            .run(r#"sh -c "echo err 1>&2; echo one; echo two; exit 3""#, dir.path(), true)
            .unwrap();
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.lines, vec!["one", "two", "err"]);
        assert_eq!(*host.priorities.lock().unwrap(), vec![true, false]);
        assert!(host.consoles.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_uses_working_directory() {
        let runner = CoreToolRunner::new();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "m").unwrap();
        let output = runner.run("ls", dir.path(), true).unwrap();
        assert_eq!(output.lines, vec!["marker.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_passes_command_line_to_helper() {
        let runner = CoreToolRunner::new().with_helper(Path::new("echo"));
        let dir = tempfile::tempdir().unwrap();
        let output = runner.run(r#"rar l "a b.rar""#, dir.path(), true).unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.lines, vec![r#"-c10000 rar l "a b.rar""#]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_shows_console_after_timeout() {
        let host = Arc::new(RecordingHost::new());
        let runner = CoreToolRunner::new()
            .with_host(host.clone())
            .with_wait_timeout(Duration::from_millis(50));
        let dir = tempfile::tempdir().unwrap();
        let output = runner.run(r#"sh -c "sleep 0.4""#, dir.path(), false).unwrap();
        assert_eq!(output.exit_code, 0);
        assert!(output.lines.is_empty());
        assert_eq!(host.consoles.lock().unwrap().len(), 1);
    }
}
