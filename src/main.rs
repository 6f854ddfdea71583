mod binary;

use self::binary::{init_logger, InteractiveShell};
use smallsh::Shell;
use std::process;

fn main() {
    init_logger();
    let shell = Shell::new();
    process::exit(InteractiveShell::new(shell).execute_interactive());
}
