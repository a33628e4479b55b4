use serde::{Deserialize, Serialize};

use crate::score::ScoreState;

/// Constant session key the game is stored under. One game per session.
pub const GAME_SESSION_KEY: &str = "tennisGame";

pub fn game_route() -> &'static str {
    "/game/"
}

pub fn player1_scores_route() -> &'static str {
    "/game/player1-scores"
}

pub fn player2_scores_route() -> &'static str {
    "/game/player2-scores"
}

pub fn score_route() -> &'static str {
    "/game/score"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreView {
    pub label: String,
    pub player1_points: u32,
    pub player2_points: u32,
}

impl From<&ScoreState> for ScoreView {
    fn from(state: &ScoreState) -> Self {
        Self {
            label: state.render_label(),
            player1_points: state.player1_points(),
            player2_points: state.player2_points(),
        }
    }
}
