/// Forking children and keeping track of them
pub mod pipe_exec;
pub mod signals;
pub mod status;

pub use self::pipe_exec::{
    job_control::{BackgroundProcess, JobRegistry},
    Disposition, ExecutionError,
};
use self::status::Status;
use crate::{
    builtins::BuiltinMap,
    parser::{self, expand_pid, Command, ParseError},
};
use log::{debug, warn};
use nix::unistd::getpid;
use thiserror::Error;

/// Errors from handling a single line
#[derive(Debug, Error)]
pub enum ShellError {
    /// Parsing failed
    #[error("syntax error: {0}")]
    InvalidSyntax(#[source] ParseError),
    /// Failed to run an external command
    #[error("{0}")]
    Execution(#[source] ExecutionError),
}

impl ShellError {
    /// Whether the shell has to stop after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            ShellError::InvalidSyntax(_) => false,
            ShellError::Execution(err) => err.is_fatal(),
        }
    }
}

impl From<ParseError> for ShellError {
    fn from(cause: ParseError) -> Self { ShellError::InvalidSyntax(cause) }
}

impl From<ExecutionError> for ShellError {
    fn from(cause: ExecutionError) -> Self { ShellError::Execution(cause) }
}

/// Options for the shell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Options {
    /// Printed before each line is read.
    pub prompt: String,
    /// The longest line accepted, in bytes, newline included.
    pub max_line_len: usize,
    /// Stands in for stdin and stdout of background jobs without redirections.
    pub null_device: String,
    /// Permission bits for files created by output redirection.
    pub output_mode: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            prompt:       ": ".into(),
            max_line_len: 2048,
            null_device:  "/dev/null".into(),
            output_mode:  0o640,
        }
    }
}

/// The shell structure owns all of the state of a session: the builtins, the
/// children it has spawned and the status of the last foreground command. It
/// lives from start-up until the interactive loop ends.
pub struct Shell {
    /// Commands handled without forking.
    builtins: &'static BuiltinMap,
    /// Background jobs and every child ever spawned.
    jobs: JobRegistry,
    /// Outcome of the most recent foreground external command.
    previous_status: Status,
    opts: Options,
    /// Substituted for `$$`.
    pid: u32,
    exiting: bool,
}

impl Default for Shell {
    fn default() -> Self { Shell::new() }
}

impl Shell {
    /// Create a new shell with default settings
    pub fn new() -> Self { Shell::with_options(Options::default()) }

    /// Create a shell with custom options. This also installs the shell's
    /// signal dispositions.
    pub fn with_options(opts: Options) -> Self {
        if let Err(why) = signals::install() {
            eprintln!("smallsh: failed to install signal handlers: {}", why);
        }
        Shell {
            builtins: BuiltinMap::builtins(),
            jobs: JobRegistry::default(),
            previous_status: Status::SUCCESS,
            opts,
            pid: getpid().as_raw() as u32,
            exiting: false,
        }
    }

    /// Handles one line of input, then reports finished background jobs.
    /// Background jobs are reaped even when the line was blank, a comment
    /// or invalid.
    pub fn on_line(&mut self, line: &str) -> Result<(), ShellError> {
        let result = self.dispatch(line);
        self.reap_background();
        result
    }

    fn dispatch(&mut self, line: &str) -> Result<(), ShellError> {
        if is_blank(line) || is_comment(line) {
            return Ok(());
        }
        if is_exit(line) {
            self.exit();
            return Ok(());
        }

        let expanded = expand_pid(line, self.pid);
        let command = parser::parse(&expanded)?;
        debug!("parsed {:?}", command);
        self.run_command(&command)
    }

    /// Runs a builtin in-process or forks off an external program.
    pub fn run_command(&mut self, command: &Command) -> Result<(), ShellError> {
        if let Some(builtin) = self.builtins.get(&command.program) {
            let args: Vec<&str> = command.argv().collect();
            let status = (builtin.main)(&args, self);
            if status.is_success() {
                debug!("builtin {} succeeded", builtin.name);
            } else {
                debug!("builtin {} failed with {}", builtin.name, status);
            }
            return Ok(());
        }
        self.execute_external(command).map_err(|err| {
            if !err.is_fatal() {
                warn!("'{}' failed: {}", command, err);
            }
            ShellError::from(err)
        })
    }

    /// The outcome of the last foreground external command.
    pub fn previous_status(&self) -> Status { self.previous_status }

    pub fn jobs(&self) -> &JobRegistry { &self.jobs }

    pub fn opts(&self) -> &Options { &self.opts }

    /// The process ID `$$` expands to.
    pub fn pid(&self) -> u32 { self.pid }

    /// Asks the interactive loop to stop after the current line.
    pub fn exit(&mut self) { self.exiting = true }

    pub fn is_exiting(&self) -> bool { self.exiting }
}

fn is_blank(line: &str) -> bool { line.bytes().all(|b| b.is_ascii_whitespace()) }

fn is_comment(line: &str) -> bool { line.starts_with('#') }

fn is_exit(line: &str) -> bool { line == "exit\n" || line == "exit" }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Direction;
    use serial_test::serial;
    use std::{env, fs, process};

    fn scratch_file(name: &str) -> String {
        env::temp_dir()
            .join(format!("smallsh-{}-{}", process::id(), name))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn line_classification() {
        assert!(is_blank("\n"));
        assert!(is_blank(" \t \n"));
        assert!(is_blank(""));
        assert!(!is_blank(" ls\n"));
        assert!(is_comment("# ls\n"));
        assert!(!is_comment(" # ls\n"));
        assert!(is_exit("exit\n"));
        assert!(!is_exit("exit 1\n"));
    }

    #[test]
    #[serial]
    fn foreground_status_is_recorded() {
        let mut shell = Shell::new();
        shell.on_line("false\n").unwrap();
        assert_eq!(shell.previous_status(), Status::Exited(1));
        shell.on_line("true\n").unwrap();
        assert_eq!(shell.previous_status(), Status::SUCCESS);
        assert_eq!(shell.jobs().children().len(), 2);
        assert!(shell.jobs().background_jobs().is_empty());
    }

    #[test]
    #[serial]
    fn signal_death_is_recorded() {
        let mut shell = Shell::new();
        let script = scratch_file("suicide.sh");
        fs::write(&script, "kill -9 $$\n").unwrap();
        shell.on_line(&format!("sh {}\n", script)).unwrap();
        assert_eq!(shell.previous_status(), Status::Signaled(9));
        fs::remove_file(&script).unwrap();
    }

    #[test]
    #[serial]
    fn builtins_leave_status_alone() {
        let mut shell = Shell::new();
        shell.on_line("false\n").unwrap();
        shell.on_line("status\n").unwrap();
        shell.on_line("cd .\n").unwrap();
        assert_eq!(shell.previous_status(), Status::Exited(1));
        assert_eq!(shell.jobs().children().len(), 1);
    }

    #[test]
    #[serial]
    fn redirections_round_trip() {
        let mut shell = Shell::new();
        let output = scratch_file("out.txt");
        let copy = scratch_file("copy.txt");

        shell.on_line(&format!("echo hello $$ > {}\n", output)).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), format!("hello {}\n", shell.pid()));

        shell.on_line(&format!("cat < {} > {}\n", output, copy)).unwrap();
        assert_eq!(fs::read_to_string(&copy).unwrap(), format!("hello {}\n", shell.pid()));

        fs::remove_file(&output).unwrap();
        fs::remove_file(&copy).unwrap();
    }

    #[test]
    #[serial]
    fn output_files_are_created_with_owner_rw_group_r() {
        use nix::sys::stat::{umask, Mode};
        use std::os::unix::fs::PermissionsExt;

        let mut shell = Shell::new();
        let output = scratch_file("mode.txt");
        let _ = fs::remove_file(&output);

        let previous = umask(Mode::from_bits_truncate(0o022));
        let result = shell.on_line(&format!("echo hi > {}\n", output));
        umask(previous);
        result.unwrap();

        let mode = fs::metadata(&output).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
        fs::remove_file(&output).unwrap();
    }

    #[test]
    #[serial]
    fn unopenable_output_fails_the_child() {
        let mut shell = Shell::new();
        shell.on_line("echo hi > /smallsh/no/such/dir/x\n").unwrap();
        assert_eq!(shell.previous_status(), Status::Exited(1));
    }

    #[test]
    #[serial]
    fn interrupt_reaches_foreground_children_only_in_foreground_only_mode() {
        signals::reset_foreground_only();
        let mut shell = Shell::new();
        let script = scratch_file("interrupt.sh");
        fs::write(&script, "kill -INT $$\nsleep 0.2\nexit 7\n").unwrap();
        let line = format!("sh {}\n", script);

        shell.on_line(&line).unwrap();
        assert_eq!(shell.previous_status(), Status::Exited(7));

        signals::toggle_foreground_only();
        let result = shell.on_line(&line);
        signals::reset_foreground_only();
        result.unwrap();
        assert_eq!(shell.previous_status(), Status::Signaled(2));

        fs::remove_file(&script).unwrap();
    }

    #[test]
    #[serial]
    fn missing_input_fails_the_child() {
        let mut shell = Shell::new();
        let missing = scratch_file("missing.txt");
        shell.on_line(&format!("cat < {}\n", missing)).unwrap();
        assert_eq!(shell.previous_status(), Status::Exited(1));
    }

    #[test]
    #[serial]
    fn unknown_program_fails_the_child() {
        let mut shell = Shell::new();
        shell.on_line("smallsh-no-such-program\n").unwrap();
        assert_eq!(shell.previous_status(), Status::Exited(1));
    }

    #[test]
    #[serial]
    fn background_jobs_are_tracked_and_killed_at_exit() {
        signals::reset_foreground_only();
        let mut shell = Shell::new();
        shell.on_line("sleep 30 &\n").unwrap();
        assert_eq!(shell.jobs().background_jobs().len(), 1);
        assert_eq!(shell.jobs().background_jobs()[0].name(), "sleep 30 &");
        assert_eq!(shell.previous_status(), Status::SUCCESS);

        shell.on_line("exit\n").unwrap();
        assert!(shell.is_exiting());
        shell.reap_all_children();
        assert!(shell.jobs().children().is_empty());
        assert!(shell.jobs().background_jobs().is_empty());
    }

    #[test]
    #[serial]
    fn foreground_only_mode_runs_background_requests_in_the_foreground() {
        signals::reset_foreground_only();
        signals::toggle_foreground_only();
        let mut shell = Shell::new();
        shell.on_line("false &\n").unwrap();
        assert_eq!(shell.previous_status(), Status::Exited(1));
        assert!(shell.jobs().background_jobs().is_empty());
        assert!(!shell.jobs().children().is_empty());
        signals::reset_foreground_only();
    }

    #[test]
    #[serial]
    fn syntax_errors_spawn_nothing() {
        let mut shell = Shell::new();
        let err = shell.on_line("cat < \n").unwrap_err();
        assert!(!err.is_fatal());
        match err {
            ShellError::InvalidSyntax(ParseError::MissingRedirectTarget(Direction::Input)) => (),
            other => panic!("unexpected error: {}", other),
        }
        assert!(shell.jobs().children().is_empty());
    }

    #[test]
    #[serial]
    fn blank_and_comment_lines_do_nothing() {
        let mut shell = Shell::new();
        shell.on_line("\n").unwrap();
        shell.on_line("   \n").unwrap();
        shell.on_line("# sleep 30 &\n").unwrap();
        assert!(shell.jobs().children().is_empty());
        assert!(!shell.is_exiting());
    }
}
