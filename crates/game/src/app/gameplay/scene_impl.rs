use engine::{
    clamp_to_map, compute_camera_offset, resolve_movement, EntityId, InputEvent, InputSnapshot,
    KeyPress, MoveIntent, PixelPos, Scene, SceneWorld, Viewport,
};
use tracing::{debug, info};

use crate::app::settings::GameSettings;

use super::encounter::{detect_encounter, tile_of};
use super::grader::Grader;
use super::npc::{NpcIdentity, ROSTER};
use super::sandbox::RestrictedSandbox;
use super::state::{BufferEdit, ExitReason, InteractionState, SceneState};
use super::ui::{build_ui, caret_visible, ChallengeLayout};

const PLAYER_COLOR: [u8; 4] = [0, 255, 0, 255];
const NPC_COLOR: [u8; 4] = [255, 0, 0, 255];
const FALLBACK_VIEWPORT: Viewport = Viewport {
    width: 1280,
    height: 768,
};

/// What one input event asks of the interaction state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SceneCommand {
    Advance,
    Cancel,
    Run,
    Dismiss,
    Edit(BufferEdit),
}

pub(crate) struct CodemereScene {
    settings: GameSettings,
    grader: Grader<RestrictedSandbox>,
    interaction: InteractionState,
    player_id: Option<EntityId>,
    player_pos: PixelPos,
    player_size: (u32, u32),
    tick: u64,
    /// Tile of the NPC whose challenge just closed. It cannot fire again
    /// until the player has stepped off it.
    suppressed_tile: Option<(i32, i32)>,
}

impl CodemereScene {
    pub(crate) fn new(settings: &GameSettings) -> Self {
        Self {
            settings: settings.clone(),
            grader: Grader::new(RestrictedSandbox::new(settings.script_step_budget)),
            interaction: InteractionState::default(),
            player_id: None,
            player_pos: PixelPos::default(),
            player_size: (0, 0),
            tick: 0,
            suppressed_tile: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    #[cfg(test)]
    pub(crate) fn player_pos(&self) -> PixelPos {
        self.player_pos
    }

    #[cfg(test)]
    pub(crate) fn place_player(&mut self, position: PixelPos) {
        self.player_pos = position;
    }

    fn apply_events(&mut self, input: &InputSnapshot, viewport: Viewport, world: &SceneWorld) {
        let layout = ChallengeLayout::for_viewport(viewport);
        for event in input.events() {
            let Some(command) = command_for(event, self.interaction.state(), &layout) else {
                continue;
            };
            self.apply_command(command, world);
        }
    }

    fn apply_command(&mut self, command: SceneCommand, world: &SceneWorld) {
        let state = self.interaction.state();
        match command {
            SceneCommand::Advance => {
                if self.interaction.advance() {
                    debug!(state = ?self.interaction.state(), "dialogue_advanced");
                }
            }
            SceneCommand::Run => {
                if let Some(result) = self.interaction.run(&self.grader) {
                    if let SceneState::Challenge { npc, .. } = state {
                        info!(npc = %npc.name(), verdict = ?result.verdict, "challenge_graded");
                    }
                }
            }
            SceneCommand::Cancel => {
                if let Some(reason) = self.interaction.cancel() {
                    self.finish_challenge(state, reason, world);
                }
            }
            SceneCommand::Dismiss => {
                if let Some(reason) = self.interaction.dismiss_success() {
                    self.finish_challenge(state, reason, world);
                }
            }
            SceneCommand::Edit(edit) => {
                self.interaction.edit(edit);
            }
        }
    }

    /// Nudges the player off the NPC tile and parks the encounter guard on it.
    fn finish_challenge(&mut self, previous: SceneState, reason: ExitReason, world: &SceneWorld) {
        let SceneState::Challenge { npc, .. } = previous else {
            return;
        };
        let nudge = self.settings.exit_nudge_px;
        let nudged = PixelPos {
            x: self.player_pos.x + nudge,
            y: self.player_pos.y + nudge,
        };
        self.player_pos = clamp_to_map(
            nudged,
            self.player_size,
            world.tile_world().map().pixel_size(),
        );
        self.suppressed_tile = Some(npc.tile());
        info!(
            npc = %npc.name(),
            reason = ?reason,
            player_x = self.player_pos.x,
            player_y = self.player_pos.y,
            "challenge_exited"
        );
    }

    fn explore(&mut self, input: &InputSnapshot, world: &SceneWorld) {
        let intent = MoveIntent::from_snapshot(input);
        if !intent.is_idle() {
            self.player_pos = resolve_movement(
                world.tile_world(),
                self.player_pos,
                intent,
                self.settings.player_speed_px,
                self.player_size,
            );
        }

        let map = world.tile_world().map();
        let tile_size = (map.tile_width(), map.tile_height());
        let player_tile = tile_of(self.player_pos, tile_size);
        if self.suppressed_tile.is_some() && self.suppressed_tile == player_tile {
            return;
        }
        self.suppressed_tile = None;

        if let Some(npc) = detect_encounter(self.player_pos, tile_size, &ROSTER) {
            self.start_encounter(npc);
        }
    }

    fn start_encounter(&mut self, npc: NpcIdentity) {
        if self.interaction.begin_encounter(npc) {
            let (tile_x, tile_y) = npc.tile();
            info!(npc = %npc.name(), tile_x, tile_y, "encounter_started");
        }
    }

    fn sync_world(&self, viewport: Viewport, world: &mut SceneWorld) {
        if let Some(player) = self.player_id.and_then(|id| world.find_entity_mut(id)) {
            player.position = self.player_pos;
        }
        let map_pixel_size = world.tile_world().map().pixel_size();
        world.camera_mut().offset_px =
            compute_camera_offset(self.player_pos, self.player_size, viewport, map_pixel_size);
        let caret = caret_visible(self.tick, self.settings.cursor_blink_ticks);
        world.set_ui(build_ui(&self.interaction, viewport, caret));
    }
}

impl Scene for CodemereScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.clear_entities();
        self.interaction = InteractionState::default();
        self.tick = 0;
        self.suppressed_tile = None;

        let map = world.tile_world().map();
        let tile_size = (map.tile_width(), map.tile_height());
        let map_pixel_size = map.pixel_size();
        self.player_size = (tile_size.0, tile_size.0);

        for npc in ROSTER {
            let (tile_x, tile_y) = npc.tile();
            let position = PixelPos {
                x: tile_x * tile_size.0 as i32,
                y: tile_y * tile_size.1 as i32,
            };
            world.spawn(position, tile_size, NPC_COLOR, npc.name());
        }

        let [spawn_x, spawn_y] = self.settings.player_spawn_tile;
        let spawn = PixelPos {
            x: spawn_x * tile_size.0 as i32,
            y: spawn_y * tile_size.1 as i32,
        };
        self.player_pos = clamp_to_map(spawn, self.player_size, map_pixel_size);
        self.player_id = Some(world.spawn(self.player_pos, self.player_size, PLAYER_COLOR, "player"));

        self.sync_world(FALLBACK_VIEWPORT, world);
        info!(
            npcs = ROSTER.len(),
            player_x = self.player_pos.x,
            player_y = self.player_pos.y,
            "world_populated"
        );
    }

    fn update(&mut self, _fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        self.tick = self.tick.wrapping_add(1);
        let viewport = viewport_from(input);

        self.apply_events(input, viewport, world);
        if self.interaction.is_exploring() {
            self.explore(input, world);
        }

        self.sync_world(viewport, world);
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        world.clear_entities();
        world.set_ui(Vec::new());
        self.player_id = None;
        info!("scene_unloaded");
    }

    fn debug_title(&self) -> Option<String> {
        let mode = match self.interaction.state() {
            SceneState::Exploring => "Exploring".to_string(),
            SceneState::Dialogue { npc, .. } => format!("Talking to {}", npc.name()),
            SceneState::Challenge { npc, .. } => format!("Challenge: {}", npc.name()),
        };
        Some(format!(
            "Codemere | {} | Player ({}, {})",
            mode, self.player_pos.x, self.player_pos.y
        ))
    }
}

fn viewport_from(input: &InputSnapshot) -> Viewport {
    match input.window_size() {
        (0, _) | (_, 0) => FALLBACK_VIEWPORT,
        (width, height) => Viewport { width, height },
    }
}

/// Key repeat only ever reaches buffer edits.
fn command_for(
    event: &InputEvent,
    state: SceneState,
    layout: &ChallengeLayout,
) -> Option<SceneCommand> {
    match (state, event) {
        (
            SceneState::Dialogue { .. },
            InputEvent::Key {
                key: KeyPress::Space,
                repeat: false,
                ..
            },
        ) => Some(SceneCommand::Advance),
        (SceneState::Challenge { .. }, InputEvent::Key { key, text, repeat }) => {
            challenge_key(*key, text.as_deref(), *repeat)
        }
        (SceneState::Challenge { solved, .. }, InputEvent::Click { position_px }) => {
            if solved && layout.continue_button.contains(*position_px) {
                Some(SceneCommand::Dismiss)
            } else if layout.run_button.contains(*position_px) {
                Some(SceneCommand::Run)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn challenge_key(key: KeyPress, text: Option<&str>, repeat: bool) -> Option<SceneCommand> {
    let command = match key {
        KeyPress::Escape if !repeat => SceneCommand::Cancel,
        KeyPress::F5 if !repeat => SceneCommand::Run,
        KeyPress::F6 if !repeat => SceneCommand::Dismiss,
        KeyPress::Escape | KeyPress::F5 | KeyPress::F6 => return None,
        KeyPress::Enter => SceneCommand::Edit(BufferEdit::Newline),
        KeyPress::Backspace => SceneCommand::Edit(BufferEdit::Backspace),
        KeyPress::ArrowLeft => SceneCommand::Edit(BufferEdit::Left),
        KeyPress::ArrowRight => SceneCommand::Edit(BufferEdit::Right),
        KeyPress::ArrowUp => SceneCommand::Edit(BufferEdit::Up),
        KeyPress::ArrowDown => SceneCommand::Edit(BufferEdit::Down),
        KeyPress::Space => SceneCommand::Edit(BufferEdit::Insert(" ".to_string())),
        KeyPress::Other => {
            let printable: String = text?.chars().filter(|ch| !ch.is_control()).collect();
            if printable.is_empty() {
                return None;
            }
            SceneCommand::Edit(BufferEdit::Insert(printable))
        }
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ChallengeLayout {
        ChallengeLayout::for_viewport(FALLBACK_VIEWPORT)
    }

    fn challenge(solved: bool) -> SceneState {
        SceneState::Challenge {
            npc: NpcIdentity::OldManCedric,
            solved,
        }
    }

    fn repeated(key: KeyPress) -> InputEvent {
        InputEvent::Key {
            key,
            text: None,
            repeat: true,
        }
    }

    #[test]
    fn space_advances_dialogue_but_not_on_repeat() {
        let dialogue = SceneState::Dialogue {
            npc: NpcIdentity::OldManCedric,
            line: 0,
        };
        assert_eq!(
            command_for(&InputEvent::text(" "), dialogue, &layout()),
            Some(SceneCommand::Advance)
        );
        assert_eq!(command_for(&repeated(KeyPress::Space), dialogue, &layout()), None);
    }

    #[test]
    fn exploring_ignores_discrete_input() {
        for event in [
            InputEvent::key(KeyPress::Escape),
            InputEvent::key(KeyPress::F5),
            InputEvent::text(" "),
            InputEvent::click(1200, 30),
        ] {
            assert_eq!(command_for(&event, SceneState::Exploring, &layout()), None);
        }
    }

    #[test]
    fn repeat_only_reaches_edits() {
        let state = challenge(true);
        for key in [KeyPress::Escape, KeyPress::F5, KeyPress::F6] {
            assert_eq!(command_for(&repeated(key), state, &layout()), None);
        }
        assert_eq!(
            command_for(&repeated(KeyPress::Backspace), state, &layout()),
            Some(SceneCommand::Edit(BufferEdit::Backspace))
        );
    }

    #[test]
    fn enter_is_a_newline_even_with_carriage_return_text() {
        let event = InputEvent::Key {
            key: KeyPress::Enter,
            text: Some("\r".to_string()),
            repeat: false,
        };
        assert_eq!(
            command_for(&event, challenge(false), &layout()),
            Some(SceneCommand::Edit(BufferEdit::Newline))
        );
    }

    #[test]
    fn control_text_is_not_inserted() {
        let tab = InputEvent::Key {
            key: KeyPress::Other,
            text: Some("\t".to_string()),
            repeat: false,
        };
        assert_eq!(command_for(&tab, challenge(false), &layout()), None);
        assert_eq!(
            command_for(&InputEvent::text("a"), challenge(false), &layout()),
            Some(SceneCommand::Edit(BufferEdit::Insert("a".to_string())))
        );
    }

    #[test]
    fn clicks_hit_run_and_continue_buttons() {
        assert_eq!(
            command_for(&InputEvent::click(1145, 25), challenge(false), &layout()),
            Some(SceneCommand::Run)
        );
        assert_eq!(
            command_for(&InputEvent::click(600, 380), challenge(false), &layout()),
            None
        );
        assert_eq!(
            command_for(&InputEvent::click(600, 380), challenge(true), &layout()),
            Some(SceneCommand::Dismiss)
        );
        assert_eq!(
            command_for(&InputEvent::click(5, 5), challenge(true), &layout()),
            None
        );
    }

    #[test]
    fn zero_window_size_falls_back_to_default_viewport() {
        assert_eq!(viewport_from(&InputSnapshot::empty()), FALLBACK_VIEWPORT);
        let sized = InputSnapshot::empty().with_window_size((640, 480));
        assert_eq!(
            viewport_from(&sized),
            Viewport {
                width: 640,
                height: 480
            }
        );
    }
}
