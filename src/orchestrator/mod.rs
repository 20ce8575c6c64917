// src/orchestrator/mod.rs

use crate::agent::{Clarifier, CodeBuilder, Diagnoser, Parser};
use crate::context::Context;
use crate::executor::Executor;
use crate::model::{CandidateProgram, ClarifiedSpec, ParsedProblem, SimulationRequest};
use crate::protocol::{DiagnosisReport, ExecutionResult, FixType};
use tracing::{error, info, warn};

/// Attempts allowed when the caller does not choose a ceiling.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Ceiling on execution attempts. The loop never runs more than this many.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_iterations: u32,
}

impl RetryPolicy {
    /// Ceilings below one are raised to one.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

/// How one attempt ended and where the loop went next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Classified as success; terminal.
    Succeeded,
    /// Code generation produced nothing; the next attempt rebuilds.
    NoCandidate,
    /// The diagnosis patch goes straight to the next execution.
    Patched,
    /// The specification was re-parsed and the next attempt rebuilds.
    Reparsed,
    /// Failed on the final attempt; terminal.
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct Attempt {
    pub index: u32,
    pub program: Option<CandidateProgram>,
    pub execution: Option<ExecutionResult>,
    pub diagnosis: Option<DiagnosisReport>,
    pub resolution: Resolution,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    GaveUp,
}

/// Full history of one pipeline run, kept even when it gives up.
#[derive(Clone, Debug)]
pub struct PipelineRun {
    pub clarified: ClarifiedSpec,
    pub problem: ParsedProblem,
    pub attempts: Vec<Attempt>,
    pub status: RunStatus,
}

impl PipelineRun {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// The program that ran successfully, or the last one that ran.
    pub fn final_program(&self) -> Option<&CandidateProgram> {
        self.attempts.iter().rev().find_map(|a| a.program.as_ref())
    }

    pub fn final_execution(&self) -> Option<&ExecutionResult> {
        self.attempts.iter().rev().find_map(|a| a.execution.as_ref())
    }

    pub fn last_diagnosis(&self) -> Option<&DiagnosisReport> {
        self.attempts.iter().rev().find_map(|a| a.diagnosis.as_ref())
    }
}

/// Drives clarify → parse → build → execute → diagnose → patch/re-parse
/// until a run succeeds or the retry ceiling is reached.
///
/// Each diagnosis sees exactly the code and output of the execution right
/// before it.
pub struct Orchestrator {
    clarifier: Clarifier,
    parser: Parser,
    builder: CodeBuilder,
    diagnoser: Diagnoser,
    executor: Executor,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(context: &Context, executor: Executor, policy: RetryPolicy) -> Self {
        Self {
            clarifier: Clarifier::new(context),
            parser: Parser::new(context),
            builder: CodeBuilder::new(context),
            diagnoser: Diagnoser::new(context),
            executor,
            policy,
        }
    }

    pub fn run(&self, request: &SimulationRequest) -> PipelineRun {
        let clarified = self.clarifier.clarify(request);
        let problem = self.parser.parse(&clarified);
        self.repair_loop(clarified, problem)
    }

    /// Runs the build/execute/repair cycle for an already parsed problem.
    pub fn repair_loop(&self, clarified: ClarifiedSpec, mut problem: ParsedProblem) -> PipelineRun {
        let max = self.policy.max_iterations();
        let mut attempts = Vec::new();
        let mut patched: Option<CandidateProgram> = None;

        for index in 0..max {
            let last = index + 1 == max;
            info!(attempt = index + 1, max, "Starting attempt");

            let program = match patched.take() {
                Some(program) => program,
                None => match self.builder.build(&problem) {
                    Some(program) => program,
                    None => {
                        warn!(attempt = index + 1, "No candidate program produced");
                        attempts.push(Attempt {
                            index,
                            program: None,
                            execution: None,
                            diagnosis: None,
                            resolution: if last {
                                Resolution::Exhausted
                            } else {
                                Resolution::NoCandidate
                            },
                        });
                        continue;
                    }
                },
            };

            let execution = self.executor.run(&program);
            let Some(error_signal) = execution.error_signal().map(str::to_owned) else {
                info!(attempt = index + 1, "Simulation succeeded");
                attempts.push(Attempt {
                    index,
                    program: Some(program),
                    execution: Some(execution),
                    diagnosis: None,
                    resolution: Resolution::Succeeded,
                });
                return PipelineRun {
                    clarified,
                    problem,
                    attempts,
                    status: RunStatus::Succeeded,
                };
            };

            let diagnosis = self.diagnoser.diagnose(
                &error_signal,
                program.as_str(),
                &execution.combined_output(),
            );

            let resolution = if last {
                Resolution::Exhausted
            } else {
                match diagnosis.fix_type {
                    FixType::Code => {
                        if diagnosis.is_no_op() {
                            warn!(attempt = index + 1, "Diagnosis produced no change; retrying as is");
                        }
                        patched = Some(CandidateProgram::new(diagnosis.after_code.clone()));
                        Resolution::Patched
                    }
                    FixType::Parsing => {
                        info!(attempt = index + 1, "Diagnosis requested a re-parse");
                        let augmented = ClarifiedSpec::new(&problem.full_text)
                            .unwrap_or_else(|| clarified.clone())
                            .augmented(&diagnosis.hint);
                        problem = self.parser.parse(&augmented);
                        Resolution::Reparsed
                    }
                }
            };

            attempts.push(Attempt {
                index,
                program: Some(program),
                execution: Some(execution),
                diagnosis: Some(diagnosis),
                resolution,
            });
        }

        error!(max, "Retry ceiling reached without a successful run");
        PipelineRun {
            clarified,
            problem,
            attempts,
            status: RunStatus::GaveUp,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use std::sync::Arc;

    const CLARIFIED: &str = "Transient 2D heat equation on a unit square plate for 10 s with dt = 0.1.";
    const RECORD: &str = r#"{"problem_type": "heat", "dimension": 2, "variables": ["u"],
        "time_dependent": true, "nonlinear": false, "coupled": false, "notes": "dt = 0.1"}"#;

    fn orchestrator(
        generator: ScriptedGenerator,
        max: u32,
    ) -> (Orchestrator, Arc<ScriptedGenerator>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(generator);
        let context = Context::new(generator.clone());
        let executor = Executor::new("sh", dir.path().join("generated_simulation.sh"));
        (
            Orchestrator::new(&context, executor, RetryPolicy::new(max)),
            generator,
            dir,
        )
    }

    fn code_fix(after: &str) -> String {
        serde_json::json!({"fix_type": "code", "hint": "patched", "after_code": after, "confidence": 0.9})
            .to_string()
    }

    fn request() -> SimulationRequest {
        SimulationRequest::new("simulate heat conduction in a 2D square plate for 10 seconds").unwrap()
    }

    #[test]
    fn patch_goes_straight_to_execution() {
        let broken = "echo 'NameError: name dt is not defined'";
        let fixed = "echo 'step 100 t=10.0'";
        let (orch, generator, _dir) = orchestrator(
            ScriptedGenerator::new()
                .reply(CLARIFIED)
                .reply(RECORD)
                .reply(broken)
                .reply(&code_fix(fixed)),
            5,
        );
        let run = orch.run(&request());

        assert!(run.succeeded());
        assert_eq!(run.attempts.len(), 2);
        assert_eq!(run.attempts[0].resolution, Resolution::Patched);
        assert_eq!(run.attempts[1].resolution, Resolution::Succeeded);
        assert_eq!(run.final_program().unwrap().as_str(), fixed);
        // clarify, parse, build, diagnose: no rebuild after a code patch
        assert_eq!(generator.requests().len(), 4);
        assert_eq!(generator.remaining(), 0);
    }

    #[test]
    fn diagnosis_sees_the_exact_failing_output() {
        let broken = "echo 'NameError: u_n'";
        let (orch, generator, _dir) = orchestrator(
            ScriptedGenerator::new()
                .reply(CLARIFIED)
                .reply(RECORD)
                .reply(broken)
                .fail("offline"),
            1,
        );
        let run = orch.run(&request());
        assert_eq!(run.status, RunStatus::GaveUp);
        let prompt = generator.prompts().pop().unwrap();
        assert!(prompt.contains("### Error message:\nNameError: u_n"));
        assert!(prompt.contains(broken));
    }

    #[test]
    fn unchanged_patches_give_up_at_the_ceiling() {
        let broken = "echo Traceback; exit 0";
        let mut generator = ScriptedGenerator::new().reply(CLARIFIED).reply(RECORD).reply(broken);
        for _ in 0..3 {
            generator = generator.reply(&code_fix(broken));
        }
        let (orch, _, _dir) = orchestrator(generator, 3);
        let run = orch.run(&request());

        assert_eq!(run.status, RunStatus::GaveUp);
        assert_eq!(run.attempts.len(), 3);
        let resolutions: Vec<_> = run.attempts.iter().map(|a| a.resolution).collect();
        assert_eq!(
            resolutions,
            vec![Resolution::Patched, Resolution::Patched, Resolution::Exhausted]
        );
        assert!(run.last_diagnosis().unwrap().is_no_op());
    }

    #[test]
    fn parsing_fix_reparses_and_rebuilds() {
        let reparse = serde_json::json!({
            "fix_type": "parsing",
            "hint": "the plate is 3D",
            "after_code": ""
        })
        .to_string();
        let (orch, generator, _dir) = orchestrator(
            ScriptedGenerator::new()
                .reply(CLARIFIED)
                .reply(RECORD)
                .reply("echo 'IndexError: nz'; exit 0")
                .reply(&reparse)
                .reply(RECORD)
                .reply("echo ok"),
            4,
        );
        let run = orch.run(&request());

        assert!(run.succeeded());
        assert_eq!(run.attempts[0].resolution, Resolution::Reparsed);
        assert!(run.problem.full_text.ends_with("the plate is 3D"));
        assert!(run.problem.full_text.starts_with(CLARIFIED));
        let prompts = generator.prompts();
        assert!(prompts[4].contains("the plate is 3D"));
    }

    #[test]
    fn missing_candidate_counts_as_an_attempt() {
        let (orch, _, _dir) = orchestrator(
            ScriptedGenerator::new()
                .reply(CLARIFIED)
                .reply(RECORD)
                .fail("503")
                .reply("echo done"),
            2,
        );
        let run = orch.run(&request());
        assert!(run.succeeded());
        assert_eq!(run.attempts[0].resolution, Resolution::NoCandidate);
        assert!(run.attempts[0].program.is_none());
    }

    #[test]
    fn every_generation_failing_still_terminates() {
        let (orch, _, _dir) = orchestrator(ScriptedGenerator::new(), 3);
        let run = orch.run(&request());
        assert_eq!(run.status, RunStatus::GaveUp);
        assert_eq!(run.attempts.len(), 3);
        assert_eq!(run.clarified.as_str(), request().as_str());
        assert!(run.problem.is_degraded());
        assert_eq!(run.attempts[2].resolution, Resolution::Exhausted);
    }

    #[test]
    fn policy_floor_is_one() {
        assert_eq!(RetryPolicy::new(0).max_iterations(), 1);
        assert_eq!(RetryPolicy::default().max_iterations(), DEFAULT_MAX_ITERATIONS);
    }
}
