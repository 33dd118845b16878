//! Command construction for every external invocation in the pipeline.
//!
//! All commands are assembled up front from the validated input paths and the
//! loaded configuration; the rest of the crate treats them as opaque shell
//! strings. Paths are quoted except where a rename step deliberately relies on
//! shell globbing to pick up whatever names dcm2nii produced.

use crate::config::Config;
use crate::utils::shell::quote_path;

/// One external invocation: a shell command plus an optional operator-facing
/// announcement.
#[derive(Debug, Clone)]
pub struct Step {
    pub command: String,
    pub message: Option<&'static str>,
}

impl Step {
    pub fn new(command: String) -> Self {
        Self {
            command,
            message: None,
        }
    }

    pub fn announced(command: String, message: &'static str) -> Self {
        Self {
            command,
            message: Some(message),
        }
    }
}

/// The full command set for one subject's run.
pub struct Plan {
    dest: String,
    bedpost_dir: String,
    dicom_struct: String,
    dicom_diff: String,
    cfg: Config,
}

impl Plan {
    pub fn new(cfg: &Config, dicom_struct: &str, dicom_diff: &str, dest: &str) -> Self {
        Self {
            bedpost_dir: format!("{dest}.bedpostX"),
            dest: dest.to_string(),
            dicom_struct: dicom_struct.to_string(),
            dicom_diff: dicom_diff.to_string(),
            cfg: cfg.clone(),
        }
    }

    /// Working directory bedpostx creates next to the destination.
    pub fn bedpost_dir(&self) -> &str {
        &self.bedpost_dir
    }

    fn tool(&self, name: &str) -> String {
        self.cfg.tool(name)
    }

    fn dest_file(&self, name: &str) -> String {
        quote_path(&format!("{}/{}", self.dest, name))
    }

    fn xfm(&self, name: &str) -> String {
        quote_path(&format!("{}/xfms/{}", self.bedpost_dir, name))
    }

    /// Wipe and recreate the destination directory.
    pub fn reset_destination(&self) -> Vec<Step> {
        vec![
            Step::new(format!("rm -r -f {}", quote_path(&self.dest))),
            Step::new(format!("mkdir {}", quote_path(&self.dest))),
        ]
    }

    /// DICOM conversion for both inputs, then renames into the fixed working
    /// names the rest of the pipeline expects. The structural volume is parked
    /// under a temporary name so the diffusion rename's glob cannot claim it.
    pub fn convert_steps(&self) -> Vec<Step> {
        let dest = quote_path(&self.dest);
        vec![
            Step::announced(
                format!("dcm2nii -o {} {}", dest, quote_path(&self.dicom_struct)),
                "converting mprage to nii format...",
            ),
            Step::new(format!(
                "mv {}/co*.nii.gz {}",
                dest,
                self.dest_file("mprage.ldtemp")
            )),
            Step::new(format!("rm -f {}/*mprage*.nii.gz", dest)),
            Step::announced(
                format!("dcm2nii -o {} {}", dest, quote_path(&self.dicom_diff)),
                "converting dti to nii format...",
            ),
            Step::new(format!(
                "mv {}/*.nii.gz {}",
                dest,
                self.dest_file("diff.nii.gz")
            )),
            Step::new(format!(
                "mv {} {}",
                self.dest_file("mprage.ldtemp"),
                self.dest_file("mprage.nii.gz")
            )),
            Step::new(format!("mv {}/*bvec {}", dest, self.dest_file("bvecs"))),
            Step::new(format!("mv {}/*bval {}", dest, self.dest_file("bvals"))),
        ]
    }

    /// Structural preprocessing: neck crop, then brain extraction.
    pub fn structural_prep_steps(&self) -> Vec<Step> {
        vec![
            Step::announced(
                format!(
                    "{} -r {} -i {}",
                    self.tool("robustfov"),
                    self.dest_file("mprage_ax"),
                    self.dest_file("mprage")
                ),
                "child cropping structural volume...",
            ),
            Step::new(format!("rm {}", self.dest_file("mprage.nii.gz"))),
            Step::announced(
                format!(
                    "{} {} {} -R -f 0.5 -g 0",
                    self.tool("bet"),
                    self.dest_file("mprage_ax"),
                    self.dest_file("mprage_brain")
                ),
                "child brain-segmenting structural volume...",
            ),
        ]
    }

    /// Diffusion preprocessing up to and including the bedpostx launch.
    pub fn diffusion_prep_steps(&self) -> Vec<Step> {
        vec![
            Step::announced(
                format!(
                    "{} {} {} 0 1",
                    self.tool("fslroi"),
                    self.dest_file("diff"),
                    self.dest_file("nodif")
                ),
                "parent extracting b0 volume...",
            ),
            Step::announced(
                format!(
                    "{} {} {} -f 0.3 -g 0 -m",
                    self.tool("bet"),
                    self.dest_file("nodif"),
                    self.dest_file("nodif_brain")
                ),
                "parent brain-segmenting b0 volume...",
            ),
            Step::announced(
                format!(
                    "{} {} {} 0",
                    self.tool("eddy_correct"),
                    self.dest_file("diff"),
                    self.dest_file("data")
                ),
                "parent performing motion and eddy correction...",
            ),
            Step::announced(
                format!(
                    "{} {} --nf=2 --fudge=1 --bi=1000",
                    self.tool("bedpostx"),
                    quote_path(&self.dest)
                ),
                "parent performing crossing fibre analysis (this may take hours)...",
            ),
        ]
    }

    /// Registration transforms between diffusion, structural and standard space.
    pub fn registration_steps(&self) -> Vec<Step> {
        vec![
            Step::announced(
                format!(
                    "{} -in {} -ref {} -omat {} -searchrx -90 90 -searchry -90 90 \
                     -searchrz -90 90 -dof 6 -cost corratio",
                    self.tool("flirt"),
                    quote_path(&format!("{}/nodif_brain", self.bedpost_dir)),
                    self.dest_file("mprage_brain.nii.gz"),
                    self.xfm("diff2str.mat")
                ),
                "generating registration transforms...",
            ),
            Step::new(format!(
                "{} -omat {} -inverse {}",
                self.tool("convert_xfm"),
                self.xfm("str2diff.mat"),
                self.xfm("diff2str.mat")
            )),
            Step::new(format!(
                "{} -in {} -ref {} -omat {} -searchrx -90 90 -searchry -90 90 \
                 -searchrz -90 90 -dof 12 -cost corratio",
                self.tool("flirt"),
                self.dest_file("mprage_brain.nii.gz"),
                quote_path(&self.cfg.std_space),
                self.xfm("str2standard.mat")
            )),
        ]
    }

    /// Structural volume into standard space (stage-two child branch).
    pub fn standard_space_steps(&self) -> Vec<Step> {
        vec![
            Step::announced(
                format!(
                    "{} -omat {} -inverse {}",
                    self.tool("convert_xfm"),
                    self.xfm("standard2str.mat"),
                    self.xfm("str2standard.mat")
                ),
                "child performing standard to structural transform...",
            ),
            Step::announced(
                format!(
                    "{} -in {} -applyxfm -init {} -out {} -paddingsize 0.0 \
                     -interp trilinear -ref {}",
                    self.tool("flirt"),
                    self.dest_file("mprage_brain.nii.gz"),
                    self.xfm("str2standard.mat"),
                    self.dest_file("mprage_std.nii.gz"),
                    quote_path(&self.cfg.std_space)
                ),
                "child transforming structural volume to standard space...",
            ),
        ]
    }

    /// Remaining transforms plus the three tracking runs (stage-two parent
    /// branch). Each tract clears and recreates the directory it writes into.
    pub fn tracking_steps(&self) -> Vec<Step> {
        let mut steps = vec![
            Step::announced(
                format!(
                    "{} -omat {} -concat {} {}",
                    self.tool("convert_xfm"),
                    self.xfm("diff2standard.mat"),
                    self.xfm("str2standard.mat"),
                    self.xfm("diff2str.mat")
                ),
                "parent performing diffusion to standard transform...",
            ),
            Step::announced(
                format!(
                    "{} -omat {} -inverse {}",
                    self.tool("convert_xfm"),
                    self.xfm("standard2diff.mat"),
                    self.xfm("diff2standard.mat")
                ),
                "parent performing standard to diffusion transform...",
            ),
        ];
        steps.extend(self.track_tract(
            "cst",
            self.cfg.template("std_midbrain.nii.gz"),
            self.cfg.template("waypoints.txt"),
            "parent performing probabilistic tracking corticospinal tract (this may take hours)...",
        ));
        steps.extend(self.track_tract(
            "right_or",
            self.cfg.template("right_lateral_geniculate_body.nii.gz"),
            self.cfg.template("r_or_waypoints.txt"),
            "parent performing probabilistic tracking right optic radiation (this may take hours)...",
        ));
        steps.extend(self.track_tract(
            "left_or",
            self.cfg.template("left_lateral_geniculate_body.nii.gz"),
            self.cfg.template("l_or_waypoints.txt"),
            "parent performing probabilistic tracking left optic radiation (this may take hours)...",
        ));
        steps
    }

    fn track_tract(
        &self,
        subdir: &str,
        seed: String,
        waypoints: String,
        message: &'static str,
    ) -> Vec<Step> {
        let out_dir = format!("{}/{}", self.dest, subdir);
        vec![
            Step::new(format!("rm -rf {}", quote_path(&out_dir))),
            Step::new(format!("mkdir -p {}", quote_path(&out_dir))),
            Step::announced(
                format!(
                    "{} -x {} -l --onewaycondition -c 0.2 -S 2000 --steplength=0.5 \
                     -P 5000 --fibthresh=0.01 --distthresh=0.0 --sampvox=0.0 \
                     --xfm={} --forcedir --opd -s {} -m {} --dir={} \
                     --waypoints={} --waycond=AND",
                    self.tool("probtrackx2"),
                    quote_path(&seed),
                    self.xfm("standard2diff.mat"),
                    quote_path(&format!("{}/merged", self.bedpost_dir)),
                    quote_path(&format!("{}/nodif_brain_mask", self.bedpost_dir)),
                    quote_path(&out_dir),
                    quote_path(&waypoints)
                ),
                message,
            ),
        ]
    }

    /// Final visualization of the tracked paths over the standard-space volume.
    pub fn view_step(&self) -> Step {
        Step::new(format!(
            "fslview {} -b 0,1000 {} -b 1000,5000",
            self.dest_file("mprage_std"),
            quote_path(&format!("{}/cst/fdt_paths", self.dest))
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::new(
            &Config::default(),
            "/dicoms/mprage",
            "/dicoms/dti",
            "/data/subj01",
        )
    }

    #[test]
    fn bedpost_dir_sits_next_to_destination() {
        assert_eq!(plan().bedpost_dir(), "/data/subj01.bedpostX");
    }

    #[test]
    fn conversion_keeps_globs_outside_quotes() {
        let steps = plan().convert_steps();
        let rename = &steps[1].command;
        assert_eq!(rename, "mv '/data/subj01'/co*.nii.gz '/data/subj01/mprage.ldtemp'");
    }

    #[test]
    fn bedpostx_runs_against_the_destination() {
        let steps = plan().diffusion_prep_steps();
        let launch = steps.last().unwrap();
        assert_eq!(
            launch.command,
            "/usr/lib/fsl/5.0/bedpostx '/data/subj01' --nf=2 --fudge=1 --bi=1000"
        );
        assert!(launch.message.unwrap().contains("hours"));
    }

    #[test]
    fn each_tract_clears_the_directory_it_writes() {
        let steps = plan().tracking_steps();
        for tract in ["cst", "right_or", "left_or"] {
            let dir = format!("'/data/subj01/{tract}'");
            let clear = steps
                .iter()
                .position(|s| s.command == format!("rm -rf {dir}"))
                .unwrap();
            assert_eq!(steps[clear + 1].command, format!("mkdir -p {dir}"));
            assert!(steps[clear + 2].command.contains(&format!("--dir={dir}")));
        }
    }

    #[test]
    fn paths_with_spaces_are_quoted() {
        let plan = Plan::new(
            &Config::default(),
            "/dicoms/subject 01/mprage",
            "/dicoms/subject 01/dti",
            "/data/subject 01",
        );
        let steps = plan.reset_destination();
        assert_eq!(steps[0].command, "rm -r -f '/data/subject 01'");
    }

    #[test]
    fn registration_uses_the_configured_standard_space() {
        let steps = plan().registration_steps();
        assert!(steps[2]
            .command
            .contains("'/usr/share/fsl/data/standard/MNI152_T1_2mm_brain'"));
    }
}
