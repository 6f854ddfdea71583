//! Contains the binary logic of smallsh.
mod readln;

use self::readln::{read_line, Input};
use log::{debug, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use smallsh::Shell;
use std::{
    env,
    io::{self, Write},
};

/// Environment variable that selects the developer log level.
pub const LOG_ENV: &str = "SMALLSH_LOG";

/// Installs the stderr logger when `SMALLSH_LOG` names a level. Without it
/// nothing but the shell's own messages reach the terminal.
pub fn init_logger() {
    let level = match env::var(LOG_ENV) {
        Ok(level) => level,
        Err(_) => return,
    };
    let level = match level.parse::<LevelFilter>() {
        Ok(level) => level,
        Err(_) => {
            eprintln!("smallsh: invalid {} value: {}", LOG_ENV, level);
            return;
        }
    };
    if let Err(why) =
        TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
    {
        eprintln!("smallsh: could not set up logging: {}", why);
    }
}

pub struct InteractiveShell {
    shell: Shell,
}

impl InteractiveShell {
    pub fn new(shell: Shell) -> Self { InteractiveShell { shell } }

    fn prompt(&self) {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        let _ = stdout.write_all(self.shell.opts().prompt.as_bytes());
        let _ = stdout.flush();
    }

    /// Reads and runs lines until `exit` or the end of input, then kills any
    /// remaining children. Returns the process exit code.
    pub fn execute_interactive(mut self) -> i32 {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        let max = self.shell.opts().max_line_len;

        let code = loop {
            self.prompt();
            let line = match read_line(&mut stdin, max) {
                Ok(Input::Line(line)) => line,
                Ok(Input::TooLong) => {
                    eprintln!("smallsh: line exceeds {} bytes", max);
                    self.shell.reap_background();
                    continue;
                }
                Ok(Input::Eof) => break 0,
                Err(why) => {
                    eprintln!("smallsh: failed to read input: {}", why);
                    break 1;
                }
            };

            match self.shell.on_line(&line) {
                Ok(()) if self.shell.is_exiting() => break 0,
                Ok(()) => (),
                Err(why) if why.is_fatal() => {
                    eprintln!("smallsh: {}", why);
                    break 1;
                }
                Err(why) => eprintln!("smallsh: {}", why),
            }
        };

        debug!("leaving with status {}", code);
        self.shell.reap_all_children();
        code
    }
}
