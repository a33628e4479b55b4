//! Point counting for a single tennis game.
//!
//! The engine only counts. It never refuses a point, so a caller that keeps
//! scoring after a "Game" label simply keeps moving the counters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Player;

const ORDINALS: [&str; 4] = ["Love", "Fifteen", "Thirty", "Forty"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    player1_points: u32,
    player2_points: u32,
}

impl ScoreState {
    /// A fresh game at Love-All.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(player1_points: u32, player2_points: u32) -> Self {
        Self {
            player1_points,
            player2_points,
        }
    }

    pub fn player1_points(&self) -> u32 {
        self.player1_points
    }

    pub fn player2_points(&self) -> u32 {
        self.player2_points
    }

    pub fn points(&self, player: Player) -> u32 {
        match player {
            Player::One => self.player1_points,
            Player::Two => self.player2_points,
        }
    }

    pub fn score_point(&mut self, player: Player) {
        let counter = match player {
            Player::One => &mut self.player1_points,
            Player::Two => &mut self.player2_points,
        };
        *counter = counter.saturating_add(1);
    }

    /// Player 1 only when strictly ahead; ties report Player 2.
    pub fn leader(&self) -> Player {
        if self.player1_points > self.player2_points {
            Player::One
        } else {
            Player::Two
        }
    }

    pub fn render_label(&self) -> String {
        // Order matters: counters of 4+ have no ordinal and must be caught here.
        if self.has_winner() {
            return format!("Game {}", self.leader());
        }
        if self.is_deuce() {
            return "Deuce".to_string();
        }
        if self.has_advantage() {
            return format!("Advantage {}", self.leader());
        }

        let right = if self.player1_points == self.player2_points {
            "All"
        } else {
            ordinal(self.player2_points)
        };
        format!("{}-{}", ordinal(self.player1_points), right)
    }

    fn difference(&self) -> u32 {
        self.player1_points.abs_diff(self.player2_points)
    }

    fn has_winner(&self) -> bool {
        (self.player1_points >= 4 || self.player2_points >= 4) && self.difference() >= 2
    }

    fn is_deuce(&self) -> bool {
        self.player1_points >= 3 && self.player1_points == self.player2_points
    }

    /// Both players must have reached Forty; 40-30 is still an ordinary score.
    fn has_advantage(&self) -> bool {
        self.player1_points >= 3 && self.player2_points >= 3 && self.difference() == 1
    }
}

impl fmt::Display for ScoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_label())
    }
}

fn ordinal(points: u32) -> &'static str {
    usize::try_from(points)
        .ok()
        .and_then(|idx| ORDINALS.get(idx))
        .copied()
        .unwrap_or("")
}

#[cfg(test)]
#[path = "tests/score_tests.rs"]
mod tests;
