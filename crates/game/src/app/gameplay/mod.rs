use engine::Scene;

use super::settings::GameSettings;

mod encounter;
mod grader;
mod npc;
mod sandbox;
mod scene_impl;
mod state;
mod ui;

use scene_impl::CodemereScene;

pub(crate) fn build_scene(settings: &GameSettings) -> Box<dyn Scene> {
    Box::new(CodemereScene::new(settings))
}
