use server_api::SessionGameBinding;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) games: SessionGameBinding,
    pub(crate) session_cookie: String,
}
