use super::*;
use axum::{
    body::{self, Body},
    http::{header, Request, Response},
};
use shared::domain::SessionId;
use storage::MemorySessionStore;
use tower::ServiceExt;

fn test_app() -> (Router, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let state = AppState {
        games: SessionGameBinding::new(store.clone()),
        session_cookie: "SESSION".to_string(),
    };
    (build_router(Arc::new(state), 16 * 1024), store)
}

fn issued_session(response: &Response<Body>) -> SessionId {
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .expect("ascii");
    let value = cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("SESSION="))
        .expect("session cookie");
    value.parse().expect("session id")
}

fn cookie_for(session: SessionId) -> String {
    format!("SESSION={session}")
}

async fn get_with(app: &Router, uri: &str, session: SessionId) -> Response<Body> {
    let request = Request::get(uri)
        .header(header::COOKIE, cookie_for(session))
        .body(Body::empty())
        .expect("request");
    app.clone().oneshot(request).await.expect("response")
}

async fn post_with(app: &Router, uri: &str, session: SessionId) -> Response<Body> {
    let request = Request::post(uri)
        .header(header::COOKIE, cookie_for(session))
        .body(Body::empty())
        .expect("request");
    app.clone().oneshot(request).await.expect("response")
}

async fn score_view(app: &Router, session: SessionId) -> ScoreView {
    let response = get_with(app, score_route(), session).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok_without_session() {
    let (app, _store) = test_app();
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn first_visit_issues_cookie_and_shows_love_all() {
    let (app, store) = test_app();
    let request = Request::get("/game/").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let session = issued_session(&response);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let html = String::from_utf8(body.to_vec()).expect("utf8");
    assert!(html.contains("Love-All"));
    assert!(html.contains("/game/player1-scores"));

    assert!(store
        .get(session, shared::protocol::GAME_SESSION_KEY)
        .await
        .expect("get")
        .is_some());
}

#[tokio::test]
async fn known_session_cookie_is_not_reissued() {
    let (app, _store) = test_app();
    let session = SessionId::generate();
    let response = get_with(&app, "/game/", session).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn scoring_redirects_back_to_game_and_updates_label() {
    let (app, _store) = test_app();
    let session = SessionId::generate();
    get_with(&app, "/game/", session).await;

    for uri in [
        player1_scores_route(),
        player1_scores_route(),
        player2_scores_route(),
        player2_scores_route(),
        player1_scores_route(),
    ] {
        let response = post_with(&app, uri, session).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).expect("location"),
            "/game/"
        );
    }

    let view = score_view(&app, session).await;
    assert_eq!(view.label, "Forty-Thirty");
    assert_eq!(view.player1_points, 3);
    assert_eq!(view.player2_points, 2);
}

#[tokio::test]
async fn scoring_without_game_redirects_and_creates_nothing() {
    let (app, store) = test_app();
    let session = SessionId::generate();

    let response = post_with(&app, player2_scores_route(), session).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("location"),
        "/game/"
    );
    assert!(store.is_empty().await);

    let view = score_view(&app, session).await;
    assert_eq!(view.label, "Love-All");
}

#[tokio::test]
async fn scoring_without_cookie_issues_session_and_redirects() {
    let (app, store) = test_app();
    let request = Request::post(player1_scores_route())
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    issued_session(&response);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn sessions_see_only_their_own_game() {
    let (app, _store) = test_app();
    let alice = SessionId::generate();
    let bob = SessionId::generate();
    get_with(&app, "/game/", alice).await;
    get_with(&app, "/game/", bob).await;

    post_with(&app, player1_scores_route(), alice).await;

    assert_eq!(score_view(&app, alice).await.label, "Fifteen-Love");
    assert_eq!(score_view(&app, bob).await.label, "Love-All");
}

#[tokio::test]
async fn root_redirects_to_game_page() {
    let (app, _store) = test_app();
    let request = Request::get("/").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[test]
fn game_page_shows_label() {
    let mut game = ScoreState::new();
    game.score_point(Player::Two);
    let html = render_game_page(&game);
    assert!(html.contains(r#"<p id="score">Love-Fifteen</p>"#));
}
