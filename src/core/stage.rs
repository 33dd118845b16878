//! Fork/join execution of one pipeline stage.
//!
//! Each stage runs two branches of external commands at once: the child
//! branch on its own thread, the parent branch here. The branches have no
//! data dependency on each other until the join barrier, where a child
//! failure becomes fatal to the whole run.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::plan::Step;
use crate::runner;
use crate::watch::{JobWatcher, PollStatus};

/// Batch job the parent branch must wait out after finishing its own steps.
#[derive(Debug, Clone)]
pub struct PollTarget {
    pub job_dir: PathBuf,
    pub interval: Duration,
}

/// Run one fork/join stage.
///
/// Child steps run on a spawned thread while the parent steps run on the
/// calling thread; within a branch, steps run strictly in the listed order.
/// When `poll` is given the parent then blocks, re-polling the watched job at
/// the given interval until it reports complete. The stage succeeds only when
/// both branches succeed.
///
/// A parent failure is returned immediately; the orchestrator aborts and any
/// still-running external work is left to the operator. A child failure (or a
/// panicked branch) surfaces at the join as [`Error::Branch`].
pub fn run_stage(
    stage: &str,
    parent_steps: Vec<Step>,
    child_steps: Vec<Step>,
    poll: Option<PollTarget>,
) -> Result<()> {
    log_status!("stage", "{}: forking child branch...", stage);

    let child_stage = stage.to_string();
    let child = thread::spawn(move || -> Result<()> {
        for step in &child_steps {
            runner::run_step(step)?;
        }
        log_status!("stage", "{}: child done, joining parent...", child_stage);
        Ok(())
    });

    for step in &parent_steps {
        runner::run_step(step)?;
    }

    if let Some(target) = &poll {
        let mut watcher = JobWatcher::new(&target.job_dir);
        while watcher.poll()? == PollStatus::Incomplete {
            thread::sleep(target.interval);
        }
    }

    match child.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::Branch {
            stage: stage.to_string(),
            source: Box::new(e),
        }),
        Err(_) => Err(Error::Branch {
            stage: stage.to_string(),
            source: Box::new(Error::Other("child branch panicked".to_string())),
        }),
    }
}
