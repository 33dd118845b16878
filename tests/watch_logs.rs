//! Completion-watcher behavior against real log directories.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use dtipipe::watch::{JobWatcher, PollStatus};

const INSTANCE: &str = "4242";
const SLOTS: usize = 65;

fn write_slot(logs: &Path, instance: &str, slot: usize, body: &str) {
    fs::write(logs.join(format!("bedpostx.o{instance}.{slot}")), body).unwrap();
}

fn write_postproc(logs: &Path, instance: &str, body: &str) {
    fs::write(logs.join(format!("bpx_postproc.o{instance}")), body).unwrap();
}

/// A job directory with the given slots reporting done and the given
/// post-processing log body (None omits the file entirely).
fn job_dir(done_slots: &[usize], postproc: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir(&logs).unwrap();

    for slot in 1..=SLOTS {
        let body = if done_slots.contains(&slot) {
            "Done\n"
        } else {
            "processing slice 12 of 60\n"
        };
        write_slot(&logs, INSTANCE, slot, body);
    }
    if let Some(body) = postproc {
        write_postproc(&logs, INSTANCE, body);
    }
    dir
}

fn all_slots() -> Vec<usize> {
    (1..=SLOTS).collect()
}

#[test]
fn incomplete_while_any_slot_is_pending_even_if_postproc_reports_done() {
    let dir = job_dir(&[1, 2, 3], Some("Done\n"));
    let mut watcher = JobWatcher::new(dir.path());

    assert_eq!(watcher.poll().unwrap(), PollStatus::Incomplete);
    assert_eq!(watcher.remaining(), Some(SLOTS - 3));
}

#[test]
fn all_slots_done_but_postproc_still_running_is_incomplete() {
    // Scenario: every worker reports done, post-processing has not.
    let dir = job_dir(&all_slots(), Some("merging samples\n"));
    let mut watcher = JobWatcher::new(dir.path());

    assert_eq!(watcher.poll().unwrap(), PollStatus::Incomplete);
    assert_eq!(watcher.remaining(), Some(0));
}

#[test]
fn postproc_done_flips_the_next_poll_to_complete() {
    let dir = job_dir(&all_slots(), Some("merging samples\n"));
    let mut watcher = JobWatcher::new(dir.path());
    assert_eq!(watcher.poll().unwrap(), PollStatus::Incomplete);

    write_postproc(
        &dir.path().join("logs"),
        INSTANCE,
        "merging samples\nDone\n",
    );
    assert_eq!(watcher.poll().unwrap(), PollStatus::Complete);
}

#[test]
fn complete_is_idempotent() {
    let dir = job_dir(&all_slots(), Some("Done\n"));
    let mut watcher = JobWatcher::new(dir.path());

    for _ in 0..3 {
        assert_eq!(watcher.poll().unwrap(), PollStatus::Complete);
        assert_eq!(watcher.remaining(), Some(0));
    }
}

#[test]
fn pending_set_shrinks_and_never_grows() {
    let dir = job_dir(&(1..=30).collect::<Vec<_>>(), None);
    let logs = dir.path().join("logs");
    let mut watcher = JobWatcher::new(dir.path());

    watcher.poll().unwrap();
    assert_eq!(watcher.remaining(), Some(35));

    for slot in 31..=40 {
        write_slot(&logs, INSTANCE, slot, "Done\n");
    }
    watcher.poll().unwrap();
    assert_eq!(watcher.remaining(), Some(25));

    // The external tool never reverts a done status; even if a file changes
    // under us, a confirmed slot stays confirmed.
    write_slot(&logs, INSTANCE, 5, "processing slice 1 of 60\n");
    watcher.poll().unwrap();
    assert_eq!(watcher.remaining(), Some(25));
}

#[test]
fn discovery_runs_once_and_ignores_later_arrivals() {
    let dir = job_dir(&[1], None);
    let logs = dir.path().join("logs");
    let mut watcher = JobWatcher::new(dir.path());

    watcher.poll().unwrap();
    let before = watcher.remaining();

    // A second job instance dumping fully-done logs into the same directory
    // must not perturb the session discovered on the first poll.
    for slot in 1..=SLOTS {
        write_slot(&logs, "9999", slot, "Done\n");
    }
    write_postproc(&logs, "9999", "Done\n");

    assert_eq!(watcher.poll().unwrap(), PollStatus::Incomplete);
    assert_eq!(watcher.remaining(), before);
}

#[test]
fn a_vanished_slot_log_is_fatal() {
    let dir = job_dir(&[1], None);
    let logs = dir.path().join("logs");
    let mut watcher = JobWatcher::new(dir.path());
    watcher.poll().unwrap();

    fs::remove_file(logs.join(format!("bedpostx.o{INSTANCE}.5"))).unwrap();

    let err = watcher.poll().unwrap_err();
    assert_eq!(err.code(), "IO_ERROR");
    assert!(err.to_string().contains(&format!("bedpostx.o{INSTANCE}.5")));
}

#[test]
fn unopenable_log_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut watcher = JobWatcher::new(&dir.path().join("no_such_job"));

    let err = watcher.poll().unwrap_err();
    assert_eq!(err.code(), "IO_ERROR");
}

#[test]
fn directory_without_worker_logs_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("logs")).unwrap();
    let mut watcher = JobWatcher::new(dir.path());

    assert!(watcher.poll().is_err());
}

#[test]
fn missing_postproc_log_is_fatal_once_all_slots_are_done() {
    let dir = job_dir(&all_slots(), None);
    let mut watcher = JobWatcher::new(dir.path());

    let err = watcher.poll().unwrap_err();
    assert!(err.to_string().contains("bpx_postproc.o"));
}
