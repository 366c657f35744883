//! Exploring → Dialogue → Challenge → Exploring.
//!
//! Inputs that do not apply to the active state are no-ops and report
//! `false`/`None` so the caller can tell nothing changed.

use engine::TextBuffer;

use super::grader::{ChallengeResult, Grader, Verdict};
use super::npc::NpcIdentity;
use super::sandbox::ScriptSandbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SceneState {
    #[default]
    Exploring,
    Dialogue {
        npc: NpcIdentity,
        line: usize,
    },
    Challenge {
        npc: NpcIdentity,
        solved: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitReason {
    Cancelled,
    Completed,
}

/// One editing command for the challenge buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BufferEdit {
    Newline,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Insert(String),
}

#[derive(Debug, Default)]
pub(crate) struct InteractionState {
    state: SceneState,
    buffer: TextBuffer,
    output_message: String,
}

impl InteractionState {
    pub(crate) fn state(&self) -> SceneState {
        self.state
    }

    pub(crate) fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub(crate) fn output_message(&self) -> &str {
        &self.output_message
    }

    pub(crate) fn is_exploring(&self) -> bool {
        self.state == SceneState::Exploring
    }

    pub(crate) fn dialogue_line(&self) -> Option<&'static str> {
        match self.state {
            SceneState::Dialogue { npc, line } => npc.dialogue().get(line).copied(),
            _ => None,
        }
    }

    pub(crate) fn begin_encounter(&mut self, npc: NpcIdentity) -> bool {
        if !self.is_exploring() {
            return false;
        }
        self.state = SceneState::Dialogue { npc, line: 0 };
        true
    }

    /// Next dialogue line; past the last line the challenge opens with the
    /// NPC's starter snippet and no output message.
    pub(crate) fn advance(&mut self) -> bool {
        let SceneState::Dialogue { npc, line } = self.state else {
            return false;
        };
        let next = line + 1;
        if next < npc.dialogue().len() {
            self.state = SceneState::Dialogue { npc, line: next };
        } else {
            self.buffer.reset(npc.starter());
            self.output_message.clear();
            self.state = SceneState::Challenge { npc, solved: false };
        }
        true
    }

    pub(crate) fn cancel(&mut self) -> Option<ExitReason> {
        match self.state {
            SceneState::Challenge { .. } => {
                self.state = SceneState::Exploring;
                Some(ExitReason::Cancelled)
            }
            _ => None,
        }
    }

    pub(crate) fn dismiss_success(&mut self) -> Option<ExitReason> {
        match self.state {
            SceneState::Challenge { solved: true, .. } => {
                self.state = SceneState::Exploring;
                Some(ExitReason::Completed)
            }
            _ => None,
        }
    }

    /// Grades the buffer. Win or lose, the buffer goes back to the starter
    /// snippet afterwards.
    pub(crate) fn run<S: ScriptSandbox>(&mut self, grader: &Grader<S>) -> Option<ChallengeResult> {
        let SceneState::Challenge { npc, .. } = self.state else {
            return None;
        };
        let result = grader.grade(npc, &self.buffer.contents());
        self.state = SceneState::Challenge {
            npc,
            solved: result.verdict == Verdict::Solved,
        };
        self.output_message = result.message.clone();
        self.buffer.reset(npc.starter());
        Some(result)
    }

    pub(crate) fn edit(&mut self, edit: BufferEdit) -> bool {
        if !matches!(self.state, SceneState::Challenge { .. }) {
            return false;
        }
        match edit {
            BufferEdit::Newline => self.buffer.insert_newline(),
            BufferEdit::Backspace => self.buffer.backspace(),
            BufferEdit::Left => self.buffer.move_left(),
            BufferEdit::Right => self.buffer.move_right(),
            BufferEdit::Up => self.buffer.move_up(),
            BufferEdit::Down => self.buffer.move_down(),
            BufferEdit::Insert(text) => self.buffer.insert_text(&text),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::sandbox::RestrictedSandbox;

    fn grader() -> Grader<RestrictedSandbox> {
        Grader::new(RestrictedSandbox::default())
    }

    fn in_challenge(npc: NpcIdentity) -> InteractionState {
        let mut state = InteractionState::default();
        assert!(state.begin_encounter(npc));
        while !matches!(state.state(), SceneState::Challenge { .. }) {
            assert!(state.advance());
        }
        state
    }

    fn type_over_buffer(state: &mut InteractionState, lines: &[&str]) {
        // Clear the starter by deleting from the end.
        for _ in 0..state.buffer().lines().len() {
            state.edit(BufferEdit::Down);
        }
        for _ in 0..200 {
            state.edit(BufferEdit::Right);
        }
        for _ in 0..200 {
            state.edit(BufferEdit::Backspace);
        }
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                state.edit(BufferEdit::Newline);
            }
            state.edit(BufferEdit::Insert(line.to_string()));
        }
    }

    #[test]
    fn encounter_starts_dialogue_at_first_line() {
        let mut state = InteractionState::default();
        assert!(state.begin_encounter(NpcIdentity::BugsyTheApprentice));
        assert_eq!(
            state.state(),
            SceneState::Dialogue {
                npc: NpcIdentity::BugsyTheApprentice,
                line: 0
            }
        );
        assert_eq!(state.dialogue_line(), Some("Bugsy: Oh no, not again..."));
    }

    #[test]
    fn encounter_is_ignored_outside_exploring() {
        let mut state = InteractionState::default();
        state.begin_encounter(NpcIdentity::OldManCedric);
        assert!(!state.begin_encounter(NpcIdentity::TorchbearerKorr));
        assert_eq!(
            state.state(),
            SceneState::Dialogue {
                npc: NpcIdentity::OldManCedric,
                line: 0
            }
        );
    }

    #[test]
    fn advancing_walks_lines_then_opens_challenge() {
        let mut state = InteractionState::default();
        state.begin_encounter(NpcIdentity::TorchbearerKorr);
        state.advance();
        state.advance();
        assert_eq!(
            state.state(),
            SceneState::Dialogue {
                npc: NpcIdentity::TorchbearerKorr,
                line: 2
            }
        );
        state.advance();
        assert_eq!(
            state.state(),
            SceneState::Challenge {
                npc: NpcIdentity::TorchbearerKorr,
                solved: false
            }
        );
        assert_eq!(
            state.buffer().lines(),
            &["def add(a, b):", "    return a - b"]
        );
        assert_eq!(state.buffer().cursor(), (0, 0));
        assert_eq!(state.output_message(), "");
    }

    #[test]
    fn challenge_always_opens_with_a_fresh_starter() {
        let grader = grader();
        let mut state = in_challenge(NpcIdentity::OldManCedric);
        state.run(&grader);
        assert!(!state.output_message().is_empty());
        state.edit(BufferEdit::Insert("junk".to_string()));
        state.cancel();

        let mut state_after = state;
        state_after.begin_encounter(NpcIdentity::BugsyTheApprentice);
        for _ in 0..3 {
            state_after.advance();
        }
        assert_eq!(
            state_after.buffer().lines(),
            &["for i in range(1, 10):", "    print(i)"]
        );
        assert_eq!(state_after.output_message(), "");
    }

    #[test]
    fn irrelevant_inputs_are_noops() {
        let grader = grader();
        let mut state = InteractionState::default();
        assert!(!state.advance());
        assert_eq!(state.cancel(), None);
        assert_eq!(state.dismiss_success(), None);
        assert_eq!(state.run(&grader), None);
        assert!(!state.edit(BufferEdit::Insert("x".to_string())));
        assert_eq!(state.state(), SceneState::Exploring);

        state.begin_encounter(NpcIdentity::OldManCedric);
        assert_eq!(state.cancel(), None);
        assert!(!state.edit(BufferEdit::Newline));
        assert_eq!(state.run(&grader), None);
    }

    #[test]
    fn cancel_exits_challenge_any_time() {
        let mut state = in_challenge(NpcIdentity::OldManCedric);
        assert_eq!(state.cancel(), Some(ExitReason::Cancelled));
        assert!(state.is_exploring());
    }

    #[test]
    fn dismiss_requires_a_solved_challenge() {
        let grader = grader();
        let mut state = in_challenge(NpcIdentity::OldManCedric);
        assert_eq!(state.dismiss_success(), None);

        type_over_buffer(&mut state, &["rune = 'single'"]);
        let result = state.run(&grader).expect("graded");
        assert_eq!(result.verdict, Verdict::Solved);
        assert_eq!(
            state.state(),
            SceneState::Challenge {
                npc: NpcIdentity::OldManCedric,
                solved: true
            }
        );
        assert_eq!(state.dismiss_success(), Some(ExitReason::Completed));
        assert!(state.is_exploring());
    }

    #[test]
    fn run_resets_buffer_whatever_the_verdict() {
        let grader = grader();
        let mut state = in_challenge(NpcIdentity::OldManCedric);

        let result = state.run(&grader).expect("graded");
        assert_eq!(result.verdict, Verdict::Failed);
        assert_eq!(state.buffer().lines(), &["rune = 'elgnis'"]);

        type_over_buffer(&mut state, &["rune = 'elgnis'[::-1]"]);
        assert_eq!(state.buffer().lines(), &["rune = 'elgnis'[::-1]"]);
        let result = state.run(&grader).expect("graded");
        assert_eq!(result.verdict, Verdict::Solved);
        assert_eq!(state.output_message(), "Correct!");
        assert_eq!(state.buffer().lines(), &["rune = 'elgnis'"]);
        assert_eq!(state.buffer().cursor(), (0, 0));
    }

    #[test]
    fn later_failure_clears_solved() {
        let grader = grader();
        let mut state = in_challenge(NpcIdentity::TorchbearerKorr);
        type_over_buffer(&mut state, &["def add(a, b):", "    return a + b"]);
        state.run(&grader);
        assert!(matches!(state.state(), SceneState::Challenge { solved: true, .. }));

        state.run(&grader);
        assert!(matches!(state.state(), SceneState::Challenge { solved: false, .. }));
        assert_eq!(state.output_message(), "Check your 'add' function.");
    }

    #[test]
    fn edits_reach_the_buffer() {
        let mut state = in_challenge(NpcIdentity::BugsyTheApprentice);
        state.edit(BufferEdit::Down);
        state.edit(BufferEdit::Right);
        state.edit(BufferEdit::Insert("x".to_string()));
        assert_eq!(state.buffer().lines()[1], " x   print(i)");
        state.edit(BufferEdit::Left);
        state.edit(BufferEdit::Up);
        assert_eq!(state.buffer().cursor(), (0, 1));
    }
}
