//! Completion detection for the long-running crossing-fibre analysis job.
//!
//! `bedpostx` hands its work to a cluster queue and returns as soon as the
//! submission is in; it offers no exit code, callback or socket to wait on.
//! The only observable signal is the set of per-slot log files it writes under
//! `<job_dir>/logs`. A [`JobWatcher`] scans that directory once to learn the
//! instance-numbered file names, then re-reads the outstanding slot logs on
//! every poll until each one reports done and the post-processing log contains
//! its own done marker.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// Worker slot logs are named `bedpostx.o<instance>.<slot>`.
const WORKER_LOG_BASE: &str = "bedpostx.o";

/// The post-processing log is named `bpx_postproc.o<instance>`.
const POSTPROC_LOG_BASE: &str = "bpx_postproc.o";

/// Upper bound on the slots one bedpostx run submits. Every slot log up to
/// this index must exist once the job has been accepted by the queue.
const WORKER_SLOTS: usize = 65;

/// Status token a finished slot writes at the start of its log.
const DONE_TOKEN: &str = "Done";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Complete,
    Incomplete,
}

/// One polling session against one bedpostx job directory.
///
/// Holds the discovered file-name prefixes and the set of slot logs not yet
/// confirmed done. Sessions are single-job by construction; watching a second
/// job means constructing a second watcher.
pub struct JobWatcher {
    log_dir: PathBuf,
    session: Option<Session>,
}

impl JobWatcher {
    pub fn new(job_dir: &Path) -> Self {
        Self {
            log_dir: job_dir.join("logs"),
            session: None,
        }
    }

    /// One polling round. The first call scans the log directory to discover
    /// the instance-numbered file names; every later call reuses that state.
    ///
    /// Returns [`PollStatus::Complete`] only once all slot logs report done
    /// and the post-processing log contains the done marker. An unreadable
    /// log after discovery has succeeded means the job directory is no longer
    /// in a state this watcher can reason about, and is an error.
    pub fn poll(&mut self) -> Result<PollStatus> {
        match self.session.as_mut() {
            Some(session) => session.poll(),
            None => {
                let mut session = Session::discover(&self.log_dir)?;
                let status = session.poll();
                self.session = Some(session);
                status
            }
        }
    }

    /// Number of slot logs still outstanding; `None` before the first poll.
    pub fn remaining(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.pending.len())
    }
}

struct Session {
    log_dir: PathBuf,
    pending: Vec<PathBuf>,
    postproc_log: Option<PathBuf>,
}

impl Session {
    /// Scan the log directory for the first entry matching each base name and
    /// memoize the full instance-numbered prefixes. If several job instances
    /// left logs in the same directory, whichever entry directory iteration
    /// yields first wins; the naming is stable for the lifetime of one job,
    /// so the scan is never repeated.
    fn discover(log_dir: &Path) -> Result<Session> {
        let worker_re =
            Regex::new(r"^bedpostx\.o(\d+)\.").expect("Invalid regex pattern");
        let postproc_re =
            Regex::new(r"^bpx_postproc\.o\d+$").expect("Invalid regex pattern");

        let mut worker_prefix: Option<String> = None;
        let mut postproc_log: Option<PathBuf> = None;

        let entries = fs::read_dir(log_dir).map_err(|e| Error::io(log_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(log_dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if worker_prefix.is_none() {
                if let Some(caps) = worker_re.captures(name) {
                    worker_prefix = Some(format!("{}{}.", WORKER_LOG_BASE, &caps[1]));
                }
            }
            if postproc_log.is_none() && postproc_re.is_match(name) {
                postproc_log = Some(log_dir.join(name));
            }
        }

        let worker_prefix = worker_prefix.ok_or_else(|| {
            Error::Other(format!(
                "no {}<instance> worker logs found in {}",
                WORKER_LOG_BASE,
                log_dir.display()
            ))
        })?;

        let pending = (1..=WORKER_SLOTS)
            .map(|slot| log_dir.join(format!("{worker_prefix}{slot}")))
            .collect();

        Ok(Session {
            log_dir: log_dir.to_path_buf(),
            pending,
            postproc_log,
        })
    }

    fn poll(&mut self) -> Result<PollStatus> {
        // A slot confirmed done is dropped and never re-read; the external
        // tool does not revert a completed status.
        let mut i = 0;
        while i < self.pending.len() {
            let path = &self.pending[i];
            let contents =
                fs::read_to_string(path).map_err(|e| Error::io(path.clone(), e))?;
            if contents.split_whitespace().next() == Some(DONE_TOKEN) {
                log_status!("bedpost", "{} complete", path.display());
                self.pending.remove(i);
            } else {
                i += 1;
            }
        }

        log_status!("bedpost", "{} slot log(s) still pending", self.pending.len());

        if !self.pending.is_empty() {
            return Ok(PollStatus::Incomplete);
        }

        // All slots done; completion now rests on the post-processing log.
        let postproc = self.postproc_log.as_ref().ok_or_else(|| {
            Error::Other(format!(
                "no {}<instance> post-processing log found in {}",
                POSTPROC_LOG_BASE,
                self.log_dir.display()
            ))
        })?;

        let contents =
            fs::read_to_string(postproc).map_err(|e| Error::io(postproc.clone(), e))?;
        if contents
            .split_whitespace()
            .any(|token| token.contains(DONE_TOKEN))
        {
            log_status!("bedpost", "{} complete", postproc.display());
            Ok(PollStatus::Complete)
        } else {
            Ok(PollStatus::Incomplete)
        }
    }
}
