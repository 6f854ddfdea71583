//! Commands the shell runs itself instead of forking.
//!
//! Builtins receive the whole argument vector, name included. They ignore
//! redirections and the background marker, and their outcome never replaces
//! the status of the last foreground command.

use crate::shell::{status::Status, Shell};
use std::env;

pub type BuiltinFunction = fn(&[&str], &mut Shell) -> Status;

macro_rules! map {
    ($($name:expr => $func:ident),+) => {{
        BuiltinMap {
            name: &[$($name),+],
            functions: &[$($func),+],
        }
    }
}}

/// Builtins are in A-Z order.
pub const BUILTINS: &BuiltinMap = &map!(
    "cd" => builtin_cd,
    "exit" => builtin_exit,
    "status" => builtin_status
);

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub main: BuiltinFunction,
}

pub struct BuiltinMap {
    pub(crate) name:      &'static [&'static str],
    pub(crate) functions: &'static [BuiltinFunction],
}

impl BuiltinMap {
    /// The table every shell starts with.
    pub fn builtins() -> &'static Self { BUILTINS }

    pub fn get(&self, func: &str) -> Option<Builtin> {
        self.name
            .binary_search(&func)
            .ok()
            .map(|pos| Builtin { name: self.name[pos], main: self.functions[pos] })
    }
}

pub fn builtin_cd(args: &[&str], _: &mut Shell) -> Status {
    let path = match args.get(1) {
        Some(&path) => path.to_owned(),
        None => match env::var("HOME") {
            Ok(home) => home,
            Err(_) => return Status::error("smallsh: cd: HOME not set"),
        },
    };

    match env::set_current_dir(&path) {
        Ok(()) => Status::SUCCESS,
        Err(why) => Status::error(format!("smallsh: cd: {}: {}", path, why)),
    }
}

pub fn builtin_exit(_: &[&str], shell: &mut Shell) -> Status {
    shell.exit();
    Status::SUCCESS
}

pub fn builtin_status(_: &[&str], shell: &mut Shell) -> Status {
    println!("{}", shell.previous_status());
    Status::SUCCESS
}
