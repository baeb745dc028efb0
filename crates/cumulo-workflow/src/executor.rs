//! Workflow execution with bounded concurrency.
//!
//! Steps run as `sh -c` commands. A step starts once all of its
//! dependencies have settled; a failed dependency skips the step unless the
//! dependency is marked `continue_on_fail`.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{Step, Workflow};

/// Default per-step timeout.
const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(600);

/// Default overall deadline for a run.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(600);

/// Options controlling a workflow run.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Maximum number of steps running at once.
    pub concurrency: usize,
    /// Overall deadline for the whole run.
    pub deadline: Duration,
    /// Timeout for steps that do not declare their own.
    pub step_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1);
        Self {
            concurrency,
            deadline: DEFAULT_DEADLINE,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }
}

/// Terminal state of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The command exited zero.
    Succeeded,
    /// The command exited non-zero or could not be spawned.
    Failed {
        /// Exit code, when the process ran at all.
        exit_code: Option<i32>,
    },
    /// The command exceeded its timeout and was killed.
    TimedOut,
    /// The step never ran because a dependency failed.
    Skipped,
}

/// The result of a single step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Step name.
    pub name: String,
    /// Terminal state.
    pub status: StepStatus,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// How long the step ran.
    pub duration: Duration,
}

impl StepOutcome {
    /// Whether the step finished successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }

    fn skipped(name: String) -> Self {
        Self {
            name,
            status: StepStatus::Skipped,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }
}

/// The result of a whole run: one outcome per step.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    /// Outcomes in completion order.
    pub outcomes: Vec<StepOutcome>,
}

impl WorkflowReport {
    /// Whether every step succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(StepOutcome::is_success)
    }

    /// Steps that failed, timed out or were skipped.
    #[must_use]
    pub fn failures(&self) -> Vec<&StepOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }
}

/// Runs workflows with bounded concurrency.
#[derive(Debug, Default)]
pub struct Runner {
    options: RunnerOptions,
}

impl Runner {
    /// Creates a runner with the given options.
    #[must_use]
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    /// Runs the workflow to completion.
    ///
    /// Step failures are recorded in the report rather than returned as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the workflow is structurally
    /// invalid, the run exceeds its deadline, or a step task panics.
    pub async fn run(&self, workflow: &Workflow) -> WorkflowResult<WorkflowReport> {
        workflow.validate()?;

        let total = workflow.steps.len();
        let continue_on_fail: HashMap<String, bool> = workflow
            .steps
            .iter()
            .map(|s| (s.name.clone(), s.continue_on_fail))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let deadline = Instant::now() + self.options.deadline;

        let mut pending: Vec<Step> = workflow.steps.clone();
        // settled step name -> whether dependents may run
        let mut gates: HashMap<String, bool> = HashMap::new();
        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(total);
        let mut tasks: JoinSet<StepOutcome> = JoinSet::new();

        while outcomes.len() < total {
            // Launch or skip every step whose dependencies have settled.
            // Skipping settles more steps, so scan to a fixpoint.
            loop {
                let before = pending.len();
                let mut i = 0;
                while i < pending.len() {
                    let settled = pending[i]
                        .depends_on
                        .iter()
                        .all(|d| gates.contains_key(d));
                    if !settled {
                        i += 1;
                        continue;
                    }
                    let step = pending.remove(i);
                    let runnable = step
                        .depends_on
                        .iter()
                        .all(|d| gates.get(d).copied().unwrap_or(false));
                    if runnable {
                        info!(step = %step.name, "starting step");
                        let timeout = step
                            .timeout
                            .map_or(self.options.step_timeout, Duration::from_secs);
                        tasks.spawn(run_step(step, timeout, Arc::clone(&semaphore)));
                    } else {
                        warn!(step = %step.name, "skipping step, dependency failed");
                        gates.insert(step.name.clone(), false);
                        outcomes.push(StepOutcome::skipped(step.name));
                    }
                }
                if pending.len() == before {
                    break;
                }
            }

            if outcomes.len() == total {
                break;
            }

            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Err(_) => {
                    tasks.abort_all();
                    return Err(WorkflowError::DeadlineExceeded(outcomes.len()));
                }
                Ok(Some(Ok(outcome))) => {
                    let gate = outcome.is_success()
                        || continue_on_fail.get(&outcome.name).copied().unwrap_or(false);
                    if outcome.is_success() {
                        info!(step = %outcome.name, elapsed = ?outcome.duration, "step finished");
                    } else {
                        warn!(step = %outcome.name, status = ?outcome.status, "step failed");
                    }
                    gates.insert(outcome.name.clone(), gate);
                    outcomes.push(outcome);
                }
                Ok(Some(Err(err))) => return Err(WorkflowError::Join(err.to_string())),
                Ok(None) => {}
            }
        }

        Ok(WorkflowReport { outcomes })
    }
}

async fn run_step(step: Step, timeout: Duration, semaphore: Arc<Semaphore>) -> StepOutcome {
    let permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return StepOutcome {
                name: step.name,
                status: StepStatus::Failed { exit_code: None },
                stdout: String::new(),
                stderr: "runner shut down".to_string(),
                duration: Duration::ZERO,
            };
        }
    };

    let started = Instant::now();
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&step.command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let result = tokio::time::timeout(timeout, command.output()).await;
    drop(permit);
    let duration = started.elapsed();

    match result {
        Err(_) => StepOutcome {
            name: step.name,
            status: StepStatus::TimedOut,
            stdout: String::new(),
            stderr: String::new(),
            duration,
        },
        Ok(Err(err)) => StepOutcome {
            name: step.name,
            status: StepStatus::Failed { exit_code: None },
            stdout: String::new(),
            stderr: err.to_string(),
            duration,
        },
        Ok(Ok(output)) => {
            let status = if output.status.success() {
                StepStatus::Succeeded
            } else {
                StepStatus::Failed {
                    exit_code: output.status.code(),
                }
            };
            StepOutcome {
                name: step.name,
                status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                duration,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, command: &str, deps: &[&str]) -> Step {
        Step {
            name: name.into(),
            command: command.into(),
            depends_on: deps.iter().map(ToString::to_string).collect(),
            timeout: None,
            continue_on_fail: false,
        }
    }

    fn workflow(steps: Vec<Step>) -> Workflow {
        Workflow {
            version: "1".into(),
            metadata: serde_json::Value::Null,
            steps,
        }
    }

    fn outcome<'a>(report: &'a WorkflowReport, name: &str) -> &'a StepOutcome {
        report
            .outcomes
            .iter()
            .find(|o| o.name == name)
            .expect("outcome present")
    }

    #[tokio::test]
    async fn runs_all_steps_in_dependency_order() {
        let dir = std::env::temp_dir().join(format!("cumulo-wf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let log = dir.join("order.log");
        let _ = std::fs::remove_file(&log);
        let log_path = log.display();

        let wf = workflow(vec![
            step("first", &format!("echo first >> {log_path}"), &[]),
            step("second", &format!("echo second >> {log_path}"), &["first"]),
        ]);
        let report = Runner::default().run(&wf).await.expect("run succeeds");
        assert!(report.succeeded());

        let content = std::fs::read_to_string(&log).expect("log written");
        assert_eq!(content, "first\nsecond\n");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn captures_step_output() {
        let wf = workflow(vec![step("hello", "echo hello-out; echo hello-err >&2", &[])]);
        let report = Runner::default().run(&wf).await.expect("run succeeds");
        let hello = outcome(&report, "hello");
        assert_eq!(hello.stdout.trim(), "hello-out");
        assert_eq!(hello.stderr.trim(), "hello-err");
    }

    #[tokio::test]
    async fn failed_step_skips_dependents() {
        let wf = workflow(vec![
            step("broken", "exit 3", &[]),
            step("after", "true", &["broken"]),
            step("independent", "true", &[]),
        ]);
        let report = Runner::default().run(&wf).await.expect("run completes");
        assert!(!report.succeeded());
        assert_eq!(
            outcome(&report, "broken").status,
            StepStatus::Failed { exit_code: Some(3) }
        );
        assert_eq!(outcome(&report, "after").status, StepStatus::Skipped);
        assert!(outcome(&report, "independent").is_success());
        assert_eq!(report.failures().len(), 2);
    }

    #[tokio::test]
    async fn continue_on_fail_lets_dependents_run() {
        let mut failing = step("broken", "false", &[]);
        failing.continue_on_fail = true;
        let wf = workflow(vec![failing, step("after", "true", &["broken"])]);
        let report = Runner::default().run(&wf).await.expect("run completes");
        assert!(!report.succeeded());
        assert!(outcome(&report, "after").is_success());
    }

    #[tokio::test]
    async fn step_timeout_kills_the_command() {
        let mut slow = step("slow", "sleep 30", &[]);
        slow.timeout = Some(1);
        let wf = workflow(vec![slow]);
        let report = Runner::default().run(&wf).await.expect("run completes");
        assert_eq!(outcome(&report, "slow").status, StepStatus::TimedOut);
    }

    #[tokio::test]
    async fn overall_deadline_aborts_the_run() {
        let options = RunnerOptions {
            deadline: Duration::from_millis(200),
            ..RunnerOptions::default()
        };
        let wf = workflow(vec![step("slow", "sleep 30", &[])]);
        let err = Runner::new(options).run(&wf).await.expect_err("must time out");
        assert!(matches!(err, WorkflowError::DeadlineExceeded(0)));
    }

    #[tokio::test]
    async fn validation_errors_surface_before_running() {
        let wf = workflow(vec![step("a", "true", &["a"])]);
        let err = Runner::default().run(&wf).await.expect_err("must fail");
        assert!(matches!(err, WorkflowError::Cycle(_)));
    }
}
