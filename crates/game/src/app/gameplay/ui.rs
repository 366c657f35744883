//! Screen-space layout for the dialogue box and the challenge screen. The
//! same rects drive drawing and click hit tests.

use engine::{text_width_px, PixelPos, PixelRect, UiElement, Viewport, GLYPH_ADVANCE_PX};

use super::npc::NpcIdentity;
use super::state::{InteractionState, SceneState};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const HINT_GRAY: [u8; 4] = [180, 180, 180, 255];
const CODE_GREEN: [u8; 4] = [0, 255, 0, 255];
const DIALOGUE_FILL: [u8; 4] = [30, 30, 30, 255];
const PROMPT_FILL: [u8; 4] = [40, 40, 40, 255];
const CODE_FILL: [u8; 4] = [20, 20, 20, 255];
const RUN_FILL: [u8; 4] = [30, 120, 30, 255];
const OUTPUT_FILL: [u8; 4] = [80, 0, 0, 255];
const POPUP_FILL: [u8; 4] = [0, 100, 0, 255];
const CONTINUE_FILL: [u8; 4] = [0, 80, 0, 255];

const PANEL_PADDING: i32 = 20;
const TEXT_INSET: i32 = 10;
const CODE_LINE_HEIGHT: i32 = 20;
const TEXT_HEIGHT: i32 = 10;
const BORDER: i32 = 2;

pub(crate) const EXIT_HINT: &str = "Press ESC to exit";
pub(crate) const ADVANCE_HINT: &str = "[Space] continue";
pub(crate) const RUN_LABEL: &str = "Run Code";
pub(crate) const CONGRATS_TEXT: &str = "Congrats! You solved it!";
pub(crate) const CONTINUE_LABEL: &str = "Continue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChallengeLayout {
    pub(crate) prompt_panel: PixelRect,
    pub(crate) code_panel: PixelRect,
    pub(crate) run_button: PixelRect,
    pub(crate) output_bar: PixelRect,
    pub(crate) popup: PixelRect,
    pub(crate) continue_button: PixelRect,
}

impl ChallengeLayout {
    pub(crate) fn for_viewport(viewport: Viewport) -> Self {
        let width = viewport.width as i32;
        let height = viewport.height as i32;
        let panel_width = (width - 3 * PANEL_PADDING) / 2;
        let panel_height = height / 2;
        let panel_top = (height - panel_height) / 2;
        Self {
            prompt_panel: PixelRect::new(PANEL_PADDING, panel_top, panel_width, panel_height),
            code_panel: PixelRect::new(
                2 * PANEL_PADDING + panel_width,
                panel_top,
                panel_width,
                panel_height,
            ),
            run_button: PixelRect::new(width - 140, 20, 120, 40),
            output_bar: PixelRect::new(20, height - 60, width - 40, 40),
            popup: PixelRect::new(400, 300, 480, 150),
            continue_button: PixelRect::new(550, 370, 180, 40),
        }
    }
}

pub(crate) fn dialogue_box(viewport: Viewport) -> PixelRect {
    let width = viewport.width as i32;
    let height = viewport.height as i32;
    PixelRect::new(50, height - 170, width - 100, 120)
}

/// Caret phase for the given tick; `blink_ticks == 0` keeps it solid.
pub(crate) fn caret_visible(tick: u64, blink_ticks: u32) -> bool {
    blink_ticks == 0 || (tick / u64::from(blink_ticks)) % 2 == 0
}

pub(crate) fn build_ui(
    interaction: &InteractionState,
    viewport: Viewport,
    caret_visible: bool,
) -> Vec<UiElement> {
    let mut ui = Vec::new();
    match interaction.state() {
        SceneState::Exploring => {}
        SceneState::Dialogue { .. } => {
            push_dialogue(&mut ui, viewport, interaction.dialogue_line().unwrap_or(""));
        }
        SceneState::Challenge { npc, solved } => {
            push_challenge(&mut ui, interaction, npc, viewport, caret_visible);
            if solved {
                push_popup(&mut ui, ChallengeLayout::for_viewport(viewport));
            }
        }
    }
    ui
}

fn panel(rect: PixelRect, fill: [u8; 4]) -> UiElement {
    UiElement::Rect {
        rect,
        fill: Some(fill),
        border: Some((WHITE, BORDER)),
    }
}

fn text(x: i32, y: i32, text: impl Into<String>, color: [u8; 4]) -> UiElement {
    UiElement::Text {
        position: PixelPos { x, y },
        text: text.into(),
        color,
    }
}

/// Longest prefix of `line` that fits in `width_px`.
fn fit_to_width(line: &str, width_px: i32) -> String {
    let max_chars = (width_px / GLYPH_ADVANCE_PX).max(0) as usize;
    line.chars().take(max_chars).collect()
}

fn push_dialogue(ui: &mut Vec<UiElement>, viewport: Viewport, line: &str) {
    let rect = dialogue_box(viewport);
    ui.push(panel(rect, DIALOGUE_FILL));
    ui.push(text(rect.x + 20, rect.y + 30, fit_to_width(line, rect.width - 40), WHITE));
    ui.push(text(
        rect.x + rect.width - text_width_px(ADVANCE_HINT) - 20,
        rect.y + rect.height - 24,
        ADVANCE_HINT,
        HINT_GRAY,
    ));
}

fn push_challenge(
    ui: &mut Vec<UiElement>,
    interaction: &InteractionState,
    npc: NpcIdentity,
    viewport: Viewport,
    caret_visible: bool,
) {
    let layout = ChallengeLayout::for_viewport(viewport);
    let text_width = layout.prompt_panel.width - 2 * TEXT_INSET;

    let prompt = layout.prompt_panel;
    ui.push(panel(prompt, PROMPT_FILL));
    for (i, line) in npc.profile().prompt.iter().enumerate() {
        ui.push(text(
            prompt.x + TEXT_INSET,
            prompt.y + TEXT_INSET + i as i32 * CODE_LINE_HEIGHT,
            fit_to_width(line, text_width),
            WHITE,
        ));
    }

    let code = layout.code_panel;
    let buffer = interaction.buffer();
    ui.push(panel(code, CODE_FILL));
    for (i, line) in buffer.lines().iter().enumerate() {
        ui.push(text(
            code.x + TEXT_INSET,
            code.y + TEXT_INSET + i as i32 * CODE_LINE_HEIGHT,
            fit_to_width(line, text_width),
            CODE_GREEN,
        ));
    }
    if caret_visible {
        let (line, col) = buffer.cursor();
        let caret_x = (code.x + TEXT_INSET + col as i32 * GLYPH_ADVANCE_PX)
            .min(code.x + code.width - TEXT_INSET);
        let caret_y = code.y + TEXT_INSET + line as i32 * CODE_LINE_HEIGHT - 3;
        ui.push(UiElement::Rect {
            rect: PixelRect::new(caret_x, caret_y, 2, CODE_LINE_HEIGHT - 4),
            fill: Some(CODE_GREEN),
            border: None,
        });
    }
    ui.push(text(
        code.x + code.width - text_width_px(EXIT_HINT) - TEXT_INSET,
        code.y + code.height - 30,
        EXIT_HINT,
        HINT_GRAY,
    ));

    let run = layout.run_button;
    ui.push(panel(run, RUN_FILL));
    ui.push(text(
        run.x + (run.width - text_width_px(RUN_LABEL)) / 2,
        run.y + (run.height - TEXT_HEIGHT) / 2,
        RUN_LABEL,
        WHITE,
    ));

    let message = interaction.output_message();
    if !message.is_empty() {
        let bar = layout.output_bar;
        ui.push(panel(bar, OUTPUT_FILL));
        ui.push(text(
            bar.x + TEXT_INSET,
            bar.y + (bar.height - TEXT_HEIGHT) / 2,
            fit_to_width(message, bar.width - 2 * TEXT_INSET),
            WHITE,
        ));
    }
}

fn push_popup(ui: &mut Vec<UiElement>, layout: ChallengeLayout) {
    let popup = layout.popup;
    ui.push(UiElement::Rect {
        rect: popup,
        fill: Some(POPUP_FILL),
        border: Some((WHITE, 3)),
    });
    ui.push(text(
        popup.x + (popup.width - text_width_px(CONGRATS_TEXT)) / 2,
        popup.y + 30,
        CONGRATS_TEXT,
        WHITE,
    ));
    let button = layout.continue_button;
    ui.push(panel(button, CONTINUE_FILL));
    ui.push(text(
        button.x + (button.width - text_width_px(CONTINUE_LABEL)) / 2,
        button.y + (button.height - TEXT_HEIGHT) / 2,
        CONTINUE_LABEL,
        WHITE,
    ));
}
