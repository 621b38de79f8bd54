use crate::ast::Module;
use crate::instrument::{REPEAT_ARTIFACT, instrumented_program};
use crate::sandbox::{ExecutionOutcome, ProgramRunner};
use crate::unparse::unparse;

/// 1 when an instrumented run observes a variable receiving a value it
/// already held, else 0. Sandbox failures count as 0.
pub async fn repeat_values(module: &Module, runner: &dyn ProgramRunner) -> u8 {
    let program = instrumented_program(module);
    match runner.run(&program, &[REPEAT_ARTIFACT]).await {
        Ok(report) => {
            let flagged = report
                .artifact(REPEAT_ARTIFACT)
                .is_some_and(|content| content.trim() == "1");
            u8::from(flagged)
        }
        Err(error) => {
            tracing::warn!(%error, "repeat-values run failed, assuming no repeats");
            0
        }
    }
}

/// 1 when the program had to be killed or reported a runtime fault, else 0.
pub async fn prog_terminate(module: &Module, runner: &dyn ProgramRunner) -> u8 {
    match runner.run(&unparse(module), &[]).await {
        Ok(report) => match report.outcome {
            ExecutionOutcome::Completed => 0,
            ExecutionOutcome::TimedOut => 1,
            ExecutionOutcome::RuntimeFault(message) => {
                tracing::debug!(%message, "program raised a runtime fault");
                1
            }
        },
        Err(error) => {
            tracing::warn!(%error, "termination run failed, assuming normal exit");
            0
        }
    }
}
