use std::sync::Arc;

use anyhow::Context;
use shared::{
    domain::{Player, SessionId},
    error::{ApiError, ErrorCode},
    protocol::GAME_SESSION_KEY,
    score::ScoreState,
};
use storage::SessionStore;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BindingError {
    /// The session store could not be reached or returned unusable data.
    #[error("session unavailable: {0:#}")]
    SessionUnavailable(anyhow::Error),
    #[error("no game stored for session {0}")]
    GameNotFound(SessionId),
}

impl From<&BindingError> for ApiError {
    fn from(value: &BindingError) -> Self {
        match value {
            BindingError::SessionUnavailable(_) => {
                ApiError::new(ErrorCode::SessionUnavailable, value.to_string())
            }
            BindingError::GameNotFound(_) => ApiError::new(ErrorCode::NotFound, value.to_string()),
        }
    }
}

/// Ties one [`ScoreState`] to each session in the injected store.
///
/// Reads create a game lazily; scoring never does. Scoring is a plain
/// read, mutate, write-back sequence with no lock around it, so two
/// concurrent points for the same session can collapse into one.
#[derive(Clone)]
pub struct SessionGameBinding {
    store: Arc<dyn SessionStore>,
}

impl SessionGameBinding {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn get_or_create_game(&self, session_id: SessionId) -> Result<ScoreState, BindingError> {
        if let Some(game) = self.load_game(session_id).await? {
            return Ok(game);
        }

        let game = ScoreState::new();
        self.save_game(session_id, &game).await?;
        info!(%session_id, "started new game");
        Ok(game)
    }

    pub async fn apply_point_and_persist(
        &self,
        session_id: SessionId,
        player: Player,
    ) -> Result<ScoreState, BindingError> {
        let mut game = self
            .load_game(session_id)
            .await?
            .ok_or(BindingError::GameNotFound(session_id))?;

        game.score_point(player);
        self.save_game(session_id, &game).await?;
        debug!(%session_id, %player, label = %game, "point scored");
        Ok(game)
    }

    async fn load_game(&self, session_id: SessionId) -> Result<Option<ScoreState>, BindingError> {
        let Some(value) = self
            .store
            .get(session_id, GAME_SESSION_KEY)
            .await
            .map_err(BindingError::SessionUnavailable)?
        else {
            return Ok(None);
        };

        serde_json::from_value(value)
            .context("stored game is not a score state")
            .map(Some)
            .map_err(BindingError::SessionUnavailable)
    }

    async fn save_game(&self, session_id: SessionId, game: &ScoreState) -> Result<(), BindingError> {
        let value = serde_json::to_value(game)
            .context("failed encoding score state")
            .map_err(BindingError::SessionUnavailable)?;
        self.store
            .put(session_id, GAME_SESSION_KEY, value)
            .await
            .map_err(BindingError::SessionUnavailable)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
