use super::{super::status::Status, ExecutionError, Shell};
use crate::parser::Command;
use log::{debug, warn};
use nix::{
    errno::Errno,
    sys::{
        signal::{kill, Signal},
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};
use std::{fmt, mem};

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
/// A process that was sent to the background and has not been reaped yet.
/// The shell only keeps the process ID and the command line that started it.
pub struct BackgroundProcess {
    pid:  Pid,
    name: String,
}

impl BackgroundProcess {
    pub fn new(pid: Pid, name: String) -> Self { BackgroundProcess { pid, name } }

    pub fn pid(&self) -> Pid { self.pid }

    pub fn name(&self) -> &str { &self.name }
}

impl fmt::Display for BackgroundProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.pid, self.name)
    }
}

/// Blocks until `pid` terminates, riding out interruptions.
fn wait_for(pid: Pid) -> nix::Result<Status> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(status) = Status::from_wait_status(status) {
                    return Ok(status);
                }
            }
            Err(Errno::EINTR) => (),
            Err(why) => return Err(why),
        }
    }
}

#[derive(Debug, Default)]
/// Every child the shell has spawned.
///
/// `background` holds the jobs still to be reported; `children` keeps every
/// pid ever forked so that none is left running when the shell exits.
pub struct JobRegistry {
    background: Vec<BackgroundProcess>,
    children:   Vec<Pid>,
}

impl JobRegistry {
    pub fn add_child(&mut self, pid: Pid) { self.children.push(pid) }

    pub fn add_background(&mut self, job: BackgroundProcess) { self.background.push(job) }

    pub fn background_jobs(&self) -> &[BackgroundProcess] { &self.background }

    pub fn children(&self) -> &[Pid] { &self.children }

    /// Polls each background job without blocking. Jobs that have terminated
    /// are removed and returned with their final status.
    pub fn reap_background(&mut self) -> Vec<(BackgroundProcess, Status)> {
        let mut finished = Vec::new();
        for job in mem::take(&mut self.background) {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(status) => match Status::from_wait_status(status) {
                    Some(status) => finished.push((job, status)),
                    None => self.background.push(job),
                },
                Err(Errno::ECHILD) => warn!("background job {} was already reaped", job),
                Err(why) => {
                    warn!("failed to poll background job {}: {}", job, why);
                    self.background.push(job);
                }
            }
        }
        finished
    }

    /// Kills and reaps every child that is still running. Children that have
    /// already finished are collected without being signalled, so a recycled
    /// pid is never hit. Returns how many children had to be killed.
    pub fn reap_all_children(&mut self) -> usize {
        let mut killed = 0;
        for &pid in &self.children {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {
                    if let Err(why) = kill(pid, Signal::SIGKILL) {
                        warn!("failed to kill {}: {}", pid, why);
                        continue;
                    }
                    killed += 1;
                    if let Err(why) = wait_for(pid) {
                        warn!("failed to reap {}: {}", pid, why);
                    }
                }
                Ok(_) | Err(Errno::ECHILD) => (),
                Err(why) => warn!("failed to poll {}: {}", pid, why),
            }
        }
        self.children.clear();
        self.background.clear();
        killed
    }
}

impl Shell {
    /// Reports every background job that has finished since the last call.
    pub fn reap_background(&mut self) {
        for (job, status) in self.jobs.reap_background() {
            debug!("reaped background job {} ({})", job, status);
            println!("background pid {} is done: {}", job.pid(), status);
        }
    }

    /// Terminates whatever is still running before the shell exits.
    pub fn reap_all_children(&mut self) {
        let killed = self.jobs.reap_all_children();
        debug!("killed {} remaining children", killed);
    }

    pub(super) fn send_to_background(
        &mut self,
        pid: Pid,
        command: &Command,
    ) -> Result<(), ExecutionError> {
        println!("background pid is {}", pid);
        self.jobs.add_child(pid);

        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => {
                if let Some(status) = Status::from_wait_status(status) {
                    println!("background pid {} is done: {}", pid, status);
                    return Ok(());
                }
            }
            Err(why) => return Err(ExecutionError::WaitPid(pid, why)),
        }

        self.jobs.add_background(BackgroundProcess::new(pid, command.to_string()));
        Ok(())
    }

    pub(super) fn watch_foreground(&mut self, pid: Pid) -> Result<(), ExecutionError> {
        self.jobs.add_child(pid);
        let status = wait_for(pid).map_err(|why| ExecutionError::WaitPid(pid, why))?;
        debug!("foreground process {} finished with {}", pid, status);
        if let Status::Signaled(_) = status {
            println!("{}", status);
        }
        self.previous_status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::{
        process,
        thread::sleep,
        time::{Duration, Instant},
    };

    fn spawn(program: &str, args: &[&str]) -> Pid {
        let child = process::Command::new(program).args(args).spawn().expect("failed to spawn");
        Pid::from_raw(child.id() as i32)
    }

    fn reap_until_done(registry: &mut JobRegistry) -> Vec<(BackgroundProcess, Status)> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let finished = registry.reap_background();
            if !finished.is_empty() || Instant::now() > deadline {
                return finished;
            }
            sleep(Duration::from_millis(10));
        }
    }

    #[test]
    #[serial]
    fn finished_job_is_reaped_once() {
        let mut registry = JobRegistry::default();
        let pid = spawn("sh", &["-c", "exit 3"]);
        registry.add_child(pid);
        registry.add_background(BackgroundProcess::new(pid, "sh -c exit 3".into()));

        let finished = reap_until_done(&mut registry);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].0.pid(), pid);
        assert_eq!(finished[0].1, Status::Exited(3));
        assert!(registry.background_jobs().is_empty());
        assert_eq!(registry.children(), [pid]);

        assert!(registry.reap_background().is_empty());
    }

    #[test]
    #[serial]
    fn running_job_is_kept() {
        let mut registry = JobRegistry::default();
        let pid = spawn("sleep", &["30"]);
        registry.add_child(pid);
        registry.add_background(BackgroundProcess::new(pid, "sleep 30".into()));

        assert!(registry.reap_background().is_empty());
        assert_eq!(registry.background_jobs().len(), 1);

        assert_eq!(registry.reap_all_children(), 1);
        assert!(registry.background_jobs().is_empty());
    }

    #[test]
    #[serial]
    fn killed_job_reports_the_signal() {
        let mut registry = JobRegistry::default();
        let pid = spawn("sleep", &["30"]);
        registry.add_child(pid);
        registry.add_background(BackgroundProcess::new(pid, "sleep 30".into()));

        kill(pid, Signal::SIGTERM).unwrap();
        let finished = reap_until_done(&mut registry);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].1, Status::Signaled(Signal::SIGTERM as i32));
        assert!(registry.background_jobs().is_empty());
    }

    #[test]
    #[serial]
    fn already_reaped_job_is_dropped() {
        let mut registry = JobRegistry::default();
        let pid = spawn("true", &[]);
        wait_for(pid).unwrap();
        registry.add_background(BackgroundProcess::new(pid, "true".into()));

        assert!(registry.reap_background().is_empty());
        assert!(registry.background_jobs().is_empty());
    }

    #[test]
    #[serial]
    fn shutdown_leaves_nothing_running() {
        let mut registry = JobRegistry::default();
        let sleeper = spawn("sleep", &["30"]);
        let quick = spawn("true", &[]);
        registry.add_child(sleeper);
        registry.add_child(quick);

        assert!(registry.reap_all_children() >= 1);
        assert!(registry.children().is_empty());
        // Both pids have been reaped, so neither names a process any more.
        assert!(kill(sleeper, None::<Signal>).is_err());
        assert!(kill(quick, None::<Signal>).is_err());
    }
}
