//! Command builder for the sandbox invocation
//!
//! Builds the full `docker run` argument vector for one (language, test
//! case) pair. Construction is pure: identical inputs always produce the
//! identical vector, and submission content never reaches the command line;
//! only generated paths, validated case names, and trusted config templates
//! do.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::assets::{INPUT_DIR, OUTPUT_DIR};
use crate::types::SandboxLimits;
use crate::workspace::SCRATCH_FILE_NAME;

/// Sandbox-side mount point of the staged-source directory (read-only)
pub const CODE_MOUNT: &str = "/workspace/code";

/// Sandbox-side mount point of the problem asset tree (read-only)
pub const IO_MOUNT: &str = "/workspace/io";

/// Sandbox-side mount point of the writable scratch directory
pub const SCRATCH_MOUNT: &str = "/workspace/tmp";

// `timeout --preserve-status` reports a TERM-killed command as 128 + 15.
const TIMEOUT_KILLED_STATUS: i32 = 143;

/// Builder for one sandbox invocation
#[derive(Debug, Clone)]
pub struct SandboxCommand {
    /// Path to the docker binary
    docker_path: PathBuf,
    /// Container image providing the language toolchain
    image: String,
    limits: SandboxLimits,
    /// Host directory holding the staged source
    code_dir: PathBuf,
    /// Host directory holding the problem's in/ and out/ trees
    io_dir: PathBuf,
    /// Host directory holding the scratch output file
    scratch_dir: PathBuf,
    /// Sorted so the produced vector is deterministic
    env: BTreeMap<String, String>,
    /// Expanded compile command, if the language has one
    compile: Option<Vec<String>>,
    /// Expanded run command
    run: Vec<String>,
    /// Test case file name (same under in/ and out/)
    case_name: String,
}

impl SandboxCommand {
    /// Create a new sandbox command builder
    pub fn new(docker_path: impl Into<PathBuf>, image: impl Into<String>) -> Self {
        Self {
            docker_path: docker_path.into(),
            image: image.into(),
            limits: SandboxLimits::default(),
            code_dir: PathBuf::new(),
            io_dir: PathBuf::new(),
            scratch_dir: PathBuf::new(),
            env: BTreeMap::new(),
            compile: None,
            run: Vec::new(),
            case_name: String::new(),
        }
    }

    /// Set resource ceilings
    pub fn limits(mut self, limits: SandboxLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the host directory of the staged source
    pub fn code_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.code_dir = dir.into();
        self
    }

    /// Set the host directory of the problem assets
    pub fn io_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.io_dir = dir.into();
        self
    }

    /// Set the host scratch directory
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Set an environment variable inside the sandbox
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables
    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the expanded compile command
    pub fn compile(mut self, command: Option<Vec<String>>) -> Self {
        self.compile = command;
        self
    }

    /// Set the expanded run command
    pub fn run(mut self, command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.run = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set the test case file name
    pub fn case(mut self, name: impl Into<String>) -> Self {
        self.case_name = name.into();
        self
    }

    /// Get the docker binary path
    pub fn docker_path(&self) -> &Path {
        &self.docker_path
    }

    /// Build the full argument vector.
    ///
    /// Consumes self to avoid cloning the command pieces.
    pub fn build(self) -> Vec<String> {
        let mut args = vec![
            self.docker_path.to_string_lossy().into_owned(),
            "run".to_string(),
            "--rm".to_string(),
            // Isolation: no network, read-only root, no capabilities, and a
            // size-capped writable tmpfs under /workspace.
            "--net=none".to_string(),
            "--read-only".to_string(),
            "--cap-drop=ALL".to_string(),
            "--tmpfs".to_string(),
            format!("/workspace:rw,size={}m", self.limits.scratch_size_mb),
            // Mounts
            "--volume".to_string(),
            format!("{}:{}:ro", self.code_dir.display(), CODE_MOUNT),
            "--volume".to_string(),
            format!("{}:{}:ro", self.io_dir.display(), IO_MOUNT),
            "--volume".to_string(),
            format!("{}:{}", self.scratch_dir.display(), SCRATCH_MOUNT),
            // Resource ceilings
            "--memory".to_string(),
            format!("{}m", self.limits.memory_mb),
            "--cpus".to_string(),
            self.limits.cpus.to_string(),
        ];

        for (key, value) in &self.env {
            args.push("--env".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push(self.image.clone());
        args.push("/bin/sh".to_string());
        args.push("-c".to_string());
        args.push(self.script());

        args
    }

    /// Assemble the in-sandbox pipeline.
    ///
    /// Signal contract read by the parser and the orchestrator:
    /// - compile failure or runtime crash exits the pipeline non-zero;
    /// - the timing marker around the (timeout-wrapped) run step carries
    ///   elapsed nanoseconds;
    /// - `diff -q` output is the sole wrong-answer signal and never fails
    ///   the pipeline itself;
    /// - a run killed by the timeout leaves the pipeline successful so the
    ///   elapsed time alone classifies it.
    fn script(&self) -> String {
        let input = format!("{IO_MOUNT}/{INPUT_DIR}/{}", self.case_name);
        let expected = format!("{IO_MOUNT}/{OUTPUT_DIR}/{}", self.case_name);
        let scratch = format!("{SCRATCH_MOUNT}/{SCRATCH_FILE_NAME}");

        let mut script = String::new();
        if let Some(ref compile) = self.compile {
            script.push_str(&compile.join(" "));
            script.push_str(" && ");
        }

        let run = self.run.join(" ");
        script.push_str(&format!(
            "start=$(date +%s%N); \
             timeout --preserve-status {timeout}s /bin/sh -c '{run} < {input} > {scratch}'; \
             rc=$?; \
             end=$(date +%s%N); \
             echo \"Execution time: $((end-start)) nanoseconds\"; \
             if [ \"$rc\" -eq 0 ]; then diff -q {scratch} {expected} || true; \
             elif [ \"$rc\" -ne {TIMEOUT_KILLED_STATUS} ]; then exit \"$rc\"; fi",
            timeout = self.limits.case_timeout,
        ));

        script
    }
}
