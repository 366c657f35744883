use tracing::debug;

use super::npc::NpcIdentity;
use super::sandbox::{SandboxOutcome, ScriptSandbox, Value};

pub(crate) const SUCCESS_MESSAGE: &str = "Correct!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Solved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChallengeResult {
    pub(crate) verdict: Verdict,
    pub(crate) message: String,
}

impl ChallengeResult {
    fn solved() -> Self {
        Self {
            verdict: Verdict::Solved,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Failed,
            message: message.into(),
        }
    }
}

/// Runs a submitted script in the sandbox and applies the per-NPC
/// acceptance check. Script errors become a failed verdict; they never
/// escape as `Err`.
#[derive(Debug, Clone)]
pub(crate) struct Grader<S> {
    sandbox: S,
}

impl<S: ScriptSandbox> Grader<S> {
    pub(crate) fn new(sandbox: S) -> Self {
        Self { sandbox }
    }

    pub(crate) fn grade(&self, npc: NpcIdentity, script: &str) -> ChallengeResult {
        let outcome = self.sandbox.execute(script);
        if let Some(error) = &outcome.error {
            debug!(npc = %npc.name(), error = %error, "script_failed");
            return ChallengeResult::failed(format!("Error: {error}"));
        }

        let accepted = match npc {
            NpcIdentity::OldManCedric => Ok(rune_is_reversed(&outcome)),
            NpcIdentity::BugsyTheApprentice => Ok(prints_one_through_ten(&outcome.stdout)),
            NpcIdentity::TorchbearerKorr => self.add_function_sums(&outcome),
        };
        match accepted {
            Ok(true) => ChallengeResult::solved(),
            Ok(false) => ChallengeResult::failed(npc.profile().failure_message),
            Err(message) => ChallengeResult::failed(message),
        }
    }

    /// `Err` carries the player-facing message when calling `add` raised.
    fn add_function_sums(&self, outcome: &SandboxOutcome) -> Result<bool, String> {
        let Some(add) = outcome.bindings.get("add") else {
            return Ok(false);
        };
        if !add.is_callable() {
            return Ok(false);
        }
        let cases = [((2, 3), 5), ((-1, 1), 0)];
        for ((a, b), expected) in cases {
            let returned = self
                .sandbox
                .invoke(outcome, "add", &[Value::Int(a), Value::Int(b)])
                .map_err(|error| format!("Error: {error}"))?;
            if returned != Value::Int(expected) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn rune_is_reversed(outcome: &SandboxOutcome) -> bool {
    outcome.bindings.get("rune") == Some(&Value::str("single"))
}

fn prints_one_through_ten(stdout: &str) -> bool {
    let lines: Vec<&str> = stdout.trim().lines().map(str::trim).collect();
    let expected: Vec<String> = (1..=10).map(|n| n.to_string()).collect();
    lines == expected
}
