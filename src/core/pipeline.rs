//! Top-level pipeline sequencing.
//!
//! Two fork/join stages with straight-line command runs between them. Stage
//! one overlaps diffusion preprocessing (and the hours-long bedpostx wait)
//! with structural preprocessing; stage two overlaps the tracking runs with
//! the structural-to-standard transform chain.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::plan::Plan;
use crate::runner;
use crate::stage::{self, PollTarget};

/// Validated input and output locations for one subject.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dicom_struct: String,
    pub dicom_diff: String,
    pub destination: String,
}

/// Run the whole pipeline. The caller has already confirmed that the
/// destination directory may be wiped.
pub fn run(inputs: &RunPaths, cfg: &Config) -> Result<()> {
    cfg.apply_env();

    let plan = Plan::new(
        cfg,
        &inputs.dicom_struct,
        &inputs.dicom_diff,
        &inputs.destination,
    );

    for step in plan.reset_destination() {
        runner::run_step(&step)?;
    }
    for step in plan.convert_steps() {
        runner::run_step(&step)?;
    }

    stage::run_stage(
        "preprocess",
        plan.diffusion_prep_steps(),
        plan.structural_prep_steps(),
        Some(PollTarget {
            job_dir: PathBuf::from(plan.bedpost_dir()),
            interval: cfg.poll_interval(),
        }),
    )?;

    for step in plan.registration_steps() {
        runner::run_step(&step)?;
    }

    stage::run_stage(
        "tracking",
        plan.tracking_steps(),
        plan.standard_space_steps(),
        None,
    )?;

    runner::run_step(&plan.view_step())?;

    log_status!("pipeline", "Done");
    Ok(())
}
