#![cfg(unix)]

use agentic_fem::config::PipelineConfig;
use agentic_fem::context::Context;
use agentic_fem::executor::Executor;
use agentic_fem::llm::ScriptedGenerator;
use agentic_fem::memory::{AuditTrail, InMemorySink};
use agentic_fem::model::SimulationRequest;
use agentic_fem::orchestrator::{Orchestrator, Resolution, RetryPolicy, RunStatus};
use agentic_fem::protocol::{FixType, Outcome};
use serde_json::json;
use std::fs;
use std::sync::Arc;

const HEAT_REQUEST: &str = "simulate heat conduction in a 2D square plate for 10 seconds";

const CLARIFIED: &str = "Solve the transient heat equation on the unit square [0,1]x[0,1] \
    (2D) for t in [0, 10] s with time step dt = 0.1, zero Dirichlet boundaries and \
    an initial Gaussian temperature bump.";

const HEAT_RECORD: &str = r#"```json
{
  "problem_type": "heat",
  "pde_description": "Transient heat conduction",
  "dimension": 2,
  "domain": {"type": "rectangle", "x": [0, 1], "y": [0, 1]},
  "mesh": {"nx": 32, "ny": 32},
  "variables": ["u"],
  "time_dependent": true,
  "nonlinear": false,
  "coupled": false,
  "boundary_conditions": [{"type": "Dirichlet", "value": 0}],
  "initial_conditions": "exp(-50*((x-0.5)^2 + (y-0.5)^2))",
  "notes": "dt = 0.1, T = 10"
}
```"#;

/// Stands in for a generated time-stepping script; `sh` runs it.
const BROKEN_SCRIPT: &str = "for step in 1 2 3; do echo \"t=$step\"; done\n\
    echo \"NameError: name 'u_n' is not defined\"";
const FIXED_SCRIPT: &str = "for step in 1 2 3; do echo \"t=$step\"; done\necho done";

struct Sinks {
    parsed_json: Arc<InMemorySink>,
    parsed_text: Arc<InMemorySink>,
    errors: Arc<InMemorySink>,
    prompts: Arc<InMemorySink>,
}

impl Sinks {
    fn new() -> Self {
        Self {
            parsed_json: Arc::new(InMemorySink::new()),
            parsed_text: Arc::new(InMemorySink::new()),
            errors: Arc::new(InMemorySink::new()),
            prompts: Arc::new(InMemorySink::new()),
        }
    }

    fn trail(&self) -> AuditTrail {
        AuditTrail::new(
            self.parsed_json.clone(),
            self.parsed_text.clone(),
            self.errors.clone(),
            self.prompts.clone(),
        )
    }
}

fn fenced(code: &str) -> String {
    format!("```python\n{code}\n```")
}

#[test]
fn heat_request_is_patched_after_a_silent_name_error() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Sinks::new();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(CLARIFIED)
            .reply(HEAT_RECORD)
            .reply(&fenced(BROKEN_SCRIPT))
            .reply(
                &json!({
                    "fix_type": "code",
                    "hint": "initialise u_n before the time loop",
                    "after_code": fenced(FIXED_SCRIPT),
                    "confidence": 0.8
                })
                .to_string(),
            ),
    );
    let context = Context::new(generator.clone()).with_audit(sinks.trail());
    let executor = Executor::new("sh", dir.path().join("generated_simulation.py"));
    let orchestrator = Orchestrator::new(&context, executor, RetryPolicy::new(5));

    let run = orchestrator.run(&SimulationRequest::new(HEAT_REQUEST).unwrap());

    assert_eq!(run.status, RunStatus::Succeeded);
    let record = run.problem.record().expect("structured record");
    assert_eq!(record.problem_type, "heat");
    assert_eq!(record.dimension, 2);
    assert!(record.time_dependent);

    let first = &run.attempts[0];
    let execution = first.execution.as_ref().unwrap();
    assert_eq!(execution.exit_status, Some(0));
    let signal = execution.error_signal().unwrap();
    assert!(signal.contains("NameError: name 'u_n' is not defined"));
    assert_eq!(first.resolution, Resolution::Patched);

    // the diagnosis prompt carries the exact captured text and the failing code
    let diagnose_prompt = &generator.prompts()[3];
    assert!(diagnose_prompt.contains(signal));
    assert!(diagnose_prompt.contains(BROKEN_SCRIPT));

    let last = run.last_attempt().unwrap();
    assert_eq!(last.program.as_ref().unwrap().as_str(), FIXED_SCRIPT);
    assert!(matches!(
        &last.execution.as_ref().unwrap().outcome,
        Outcome::Success { output } if output.ends_with("done")
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("generated_simulation.py")).unwrap(),
        FIXED_SCRIPT
    );

    assert_eq!(sinks.parsed_json.read_all().len(), 1);
    assert!(sinks.parsed_text.contents().starts_with("[PARSED RESULT]"));
    assert!(sinks.errors.contents().contains("Error Message: t=1"));
    assert!(sinks.prompts.contents().contains(BROKEN_SCRIPT));
}

#[test]
fn failed_parse_degrades_but_still_generates() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Sinks::new();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(CLARIFIED)
            .fail("connection reset")
            .reply("echo ok"),
    );
    let context = Context::new(generator.clone()).with_audit(sinks.trail());
    let orchestrator = Orchestrator::new(
        &context,
        Executor::new("sh", dir.path().join("sim.sh")),
        RetryPolicy::default(),
    );

    let run = orchestrator.run(&SimulationRequest::new(HEAT_REQUEST).unwrap());

    assert!(run.succeeded());
    assert!(run.problem.is_degraded());
    assert_eq!(
        serde_json::to_value(&run.problem).unwrap(),
        json!({"parsed": {"fallback_text": CLARIFIED}, "full_text": CLARIFIED})
    );
    assert!(generator.prompts()[2].contains(r#"{"parsed":{"fallback_text":"Solve the transient"#));
    assert_eq!(sinks.parsed_json.read_all().len(), 1);
}

#[test]
fn repeated_no_op_fixes_give_up_at_the_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let crashing = "echo 'Segmentation fault'";
    let mut generator = ScriptedGenerator::new()
        .reply(CLARIFIED)
        .reply(HEAT_RECORD)
        .reply(crashing);
    for _ in 0..4 {
        generator = generator.reply(&json!({"fix_type": "code", "after_code": crashing}).to_string());
    }
    let generator = Arc::new(generator);
    let sinks = Sinks::new();
    let context = Context::new(generator.clone()).with_audit(sinks.trail());
    let orchestrator = Orchestrator::new(
        &context,
        Executor::new("sh", dir.path().join("sim.sh")),
        RetryPolicy::new(4),
    );

    let run = orchestrator.run(&SimulationRequest::new(HEAT_REQUEST).unwrap());

    assert_eq!(run.status, RunStatus::GaveUp);
    assert_eq!(run.attempts.len(), 4);
    assert!(run.attempts.iter().all(|a| a.diagnosis.as_ref().is_some_and(|d| d.is_no_op())));
    assert_eq!(run.last_diagnosis().unwrap().fix_type, FixType::Code);
    assert_eq!(generator.remaining(), 0);
    assert_eq!(sinks.errors.read_all().len(), 4);
}

#[test]
fn config_wires_file_sinks_and_executor() {
    let dir = tempfile::tempdir().unwrap();
    let toml = format!(
        r#"
[executor]
interpreter = "sh"
script_path = "{script}"

[audit]
dir = "{audit}"

[pipeline]
max_iterations = 2
"#,
        script = dir.path().join("generated_simulation.py").display(),
        audit = dir.path().join("logs").display(),
    );
    let config = PipelineConfig::from_toml_str(&toml).unwrap();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(CLARIFIED)
            .reply(HEAT_RECORD)
            .reply("echo Traceback >&2; exit 1")
            .fail("offline"),
    );
    let context = Context::new(generator).with_audit(config.audit_trail());
    let orchestrator = Orchestrator::new(&context, config.executor().unwrap(), config.retry_policy());

    let run = orchestrator.run(&SimulationRequest::new(HEAT_REQUEST).unwrap());

    // the offline diagnosis re-runs the same script, which fails again
    assert_eq!(run.status, RunStatus::GaveUp);
    assert_eq!(run.attempts.len(), 2);
    let logs = dir.path().join("logs");
    let errors = fs::read_to_string(logs.join("error_logs.txt")).unwrap();
    assert_eq!(errors.matches("Error Message: Traceback").count(), 2);
    assert!(fs::read_to_string(logs.join("parsed_results.jsonl")).unwrap().contains("\"heat\""));
    assert!(fs::read_to_string(logs.join("last_prompt.txt")).unwrap().contains("Traceback"));
}

#[test]
fn configured_signatures_flag_solver_divergence() {
    let dir = tempfile::tempdir().unwrap();
    let toml = format!(
        "[executor]\ninterpreter = \"sh\"\nscript_path = \"{}\"\nextra_signatures = [\"DIVERGED_ITS\"]\n",
        dir.path().join("sim.sh").display(),
    );
    let config = PipelineConfig::from_toml_str(&toml).unwrap();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(CLARIFIED)
            .reply(HEAT_RECORD)
            .reply("echo 'Linear solve did not converge: DIVERGED_ITS'")
            .reply(&json!({"fix_type": "code", "after_code": "echo 'Linear solve converged'"}).to_string()),
    );
    let context = Context::new(generator);
    let orchestrator = Orchestrator::new(&context, config.executor().unwrap(), config.retry_policy());

    let run = orchestrator.run(&SimulationRequest::new(HEAT_REQUEST).unwrap());

    assert!(run.succeeded());
    assert_eq!(run.attempts.len(), 2);
    let first = run.attempts[0].execution.as_ref().unwrap();
    assert_eq!(first.exit_status, Some(0));
    assert!(first.error_signal().unwrap().contains("DIVERGED_ITS"));
}
