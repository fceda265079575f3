#![allow(dead_code)]

//! In-process stand-in for the Spotify accounts service and Web API.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use likeify::{
    config::{self, Config},
    types::UserSession,
};
use serde_json::{Value, json};

#[derive(Debug, Clone, Default)]
pub struct FakePlaylist {
    pub owner: String,
    pub name: String,
    pub description: String,
    pub tracks: Vec<String>,
    pub followed: bool,
}

#[derive(Debug, Default)]
pub struct Fake {
    pub base_url: String,
    /// user id -> liked track ids, newest first
    pub liked: HashMap<String, Vec<String>>,
    pub playlists: HashMap<String, FakePlaylist>,
    pub created: u32,
    /// refresh tokens answered with `invalid_grant`
    pub revoked: HashSet<String>,
    pub token_endpoint_down: bool,
    pub omit_refresh_token: bool,
    /// authorization code -> user id
    pub codes: HashMap<String, String>,
    /// every request as "METHOD /route", 429s included
    pub log: Vec<String>,
    pub add_batches: Vec<usize>,
    pub remove_batches: Vec<usize>,
    /// "METHOD /route" -> number of 429s still to answer
    pub throttle: HashMap<String, u32>,
    pub fail_removes: bool,
    pub unauthorized_removes: bool,
    pub unauthorized_adds: bool,
    /// zero-based add calls answered with 500
    pub failing_add_calls: HashSet<usize>,
    pub follow_check_down: bool,
}

impl Fake {
    pub fn add_user(&mut self, id: &str, liked: usize) {
        let tracks = (0..liked).map(|i| format!("{id}{i:04}")).collect();
        self.liked.insert(id.to_string(), tracks);
    }

    pub fn add_playlist(&mut self, id: &str, owner: &str, tracks: Vec<String>) {
        self.playlists.insert(
            id.to_string(),
            FakePlaylist {
                owner: owner.to_string(),
                name: "My Mirror".to_string(),
                description: "kept in sync".to_string(),
                tracks,
                followed: true,
            },
        );
    }

    pub fn count(&self, key: &str) -> usize {
        self.log.iter().filter(|k| k.as_str() == key).count()
    }

    pub fn liked_uris(&self, user: &str) -> Vec<String> {
        self.liked[user]
            .iter()
            .map(|id| format!("spotify:track:{id}"))
            .collect()
    }
}

pub type Shared = Arc<Mutex<Fake>>;

pub async fn start() -> (Shared, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let shared = Arc::new(Mutex::new(Fake {
        base_url: base_url.clone(),
        ..Default::default()
    }));

    let app = router(Arc::clone(&shared));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (shared, base_url)
}

pub fn config(base_url: &str) -> Config {
    config_with(base_url, &[])
}

pub fn config_with(base_url: &str, overrides: &[(&str, &str)]) -> Config {
    let mut values: HashMap<String, String> = HashMap::from([
        (config::CLIENT_ID.to_string(), "client".to_string()),
        (config::CLIENT_SECRET.to_string(), "secret".to_string()),
        (config::API_URL.to_string(), base_url.to_string()),
        (config::TOKEN_URL.to_string(), format!("{base_url}/api/token")),
        (config::AUTH_URL.to_string(), format!("{base_url}/authorize")),
        (config::BASE_URL.to_string(), "http://likeify.test".to_string()),
        (config::USER_DELAY_SECS.to_string(), "0".to_string()),
    ]);
    for (key, value) in overrides {
        values.insert(key.to_string(), value.to_string());
    }

    Config::from_lookup(|key| values.get(key).cloned()).unwrap()
}

pub fn session(id: &str, playlist_id: Option<&str>, last_run: Option<DateTime<Utc>>) -> UserSession {
    UserSession {
        id: id.to_string(),
        username: format!("{id} name"),
        access_token: format!("stale-{id}"),
        refresh_token: format!("refresh-{id}"),
        playlist_id: playlist_id.map(str::to_string),
        last_run,
        enabled: true,
    }
}

fn router(shared: Shared) -> Router {
    Router::new()
        .route("/api/token", post(token))
        .route("/me", get(me))
        .route("/me/tracks", get(liked_tracks))
        .route("/me/playlists", post(create_playlist))
        .route("/playlists/{id}", get(playlist_details))
        .route(
            "/playlists/{id}/tracks",
            get(playlist_tracks).post(add_tracks).delete(remove_tracks),
        )
        .route("/playlists/{id}/followers/contains", get(follows))
        .route("/playlists/{id}/followers", axum::routing::delete(unfollow))
        .with_state(shared)
}

fn hit(fake: &mut Fake, key: &str) -> Option<Response> {
    fake.log.push(key.to_string());
    match fake.throttle.get_mut(key) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            Some((StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "1")]).into_response())
        }
        _ => None,
    }
}

fn bearer_user(fake: &Fake, headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let user = value.strip_prefix("Bearer access-")?;
    fake.liked.contains_key(user).then(|| user.to_string())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"status": 401, "message": "The access token expired"}})),
    )
        .into_response()
}

fn tokens_for(fake: &Fake, user: &str) -> Response {
    let mut body = json!({
        "access_token": format!("access-{user}"),
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "user-library-read",
    });
    if !fake.omit_refresh_token {
        body["refresh_token"] = json!(format!("refresh-{user}"));
    }
    Json(body).into_response()
}

async fn token(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "POST /api/token") {
        return r;
    }

    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !basic.starts_with("Basic ") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if fake.token_endpoint_down {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let invalid_grant = || {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Refresh token revoked"})),
        )
            .into_response()
    };

    match form.get("grant_type").map(String::as_str) {
        Some("refresh_token") => {
            let refresh = form.get("refresh_token").cloned().unwrap_or_default();
            if fake.revoked.contains(&refresh) {
                return invalid_grant();
            }
            match refresh.strip_prefix("refresh-") {
                Some(user) => tokens_for(&fake, user),
                None => invalid_grant(),
            }
        }
        Some("authorization_code") => {
            let code = form.get("code").cloned().unwrap_or_default();
            match fake.codes.get(&code).cloned() {
                Some(user) => {
                    let saved = fake.omit_refresh_token;
                    fake.omit_refresh_token = false;
                    let response = tokens_for(&fake, &user);
                    fake.omit_refresh_token = saved;
                    response
                }
                None => invalid_grant(),
            }
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn me(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "GET /me") {
        return r;
    }
    match bearer_user(&fake, &headers) {
        Some(user) => Json(json!({"id": user, "display_name": format!("{user} name")})).into_response(),
        None => unauthorized(),
    }
}

fn page_of(uris: Vec<Value>, offset: usize, limit: usize, total: usize, next_base: String) -> Response {
    let next = (offset + limit < total)
        .then(|| format!("{next_base}?offset={}&limit={limit}", offset + limit));
    Json(json!({"items": uris, "next": next, "total": total})).into_response()
}

fn offset_limit(params: &HashMap<String, String>, default_limit: usize) -> (usize, usize) {
    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_limit);
    (offset, limit)
}

async fn liked_tracks(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "GET /me/tracks") {
        return r;
    }
    let Some(user) = bearer_user(&fake, &headers) else {
        return unauthorized();
    };

    let (offset, limit) = offset_limit(&params, 20);
    let liked = &fake.liked[&user];
    let items = liked
        .iter()
        .skip(offset)
        .take(limit)
        .map(|id| json!({"track": {"id": id, "uri": format!("spotify:track:{id}")}}))
        .collect();

    page_of(items, offset, limit, liked.len(), format!("{}/me/tracks", fake.base_url))
}

async fn create_playlist(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "POST /me/playlists") {
        return r;
    }
    let Some(user) = bearer_user(&fake, &headers) else {
        return unauthorized();
    };

    fake.created += 1;
    let id = format!("pl{}", fake.created);
    fake.playlists.insert(
        id.clone(),
        FakePlaylist {
            owner: user,
            name: body["name"].as_str().unwrap_or_default().to_string(),
            description: body["description"].as_str().unwrap_or_default().to_string(),
            tracks: Vec::new(),
            followed: true,
        },
    );

    (StatusCode::CREATED, Json(json!({"id": id}))).into_response()
}

async fn playlist_details(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "GET /playlists") {
        return r;
    }
    if bearer_user(&fake, &headers).is_none() {
        return unauthorized();
    }
    match fake.playlists.get(&id) {
        Some(p) => Json(json!({"name": p.name, "description": p.description})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn playlist_tracks(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "GET /playlists/tracks") {
        return r;
    }
    if bearer_user(&fake, &headers).is_none() {
        return unauthorized();
    }
    let Some(playlist) = fake.playlists.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let (offset, limit) = offset_limit(&params, 100);
    let items = playlist
        .tracks
        .iter()
        .skip(offset)
        .take(limit)
        .map(|uri| json!({"track": {"uri": uri}}))
        .collect();

    page_of(
        items,
        offset,
        limit,
        playlist.tracks.len(),
        format!("{}/playlists/{id}/tracks", fake.base_url),
    )
}

async fn add_tracks(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "POST /playlists/tracks") {
        return r;
    }
    if fake.unauthorized_adds || bearer_user(&fake, &headers).is_none() {
        return unauthorized();
    }
    let call = fake.count("POST /playlists/tracks") - 1;
    if fake.failing_add_calls.contains(&call) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let uris: Vec<String> = body["uris"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if uris.len() > 100 {
        return StatusCode::BAD_REQUEST.into_response();
    }

    fake.add_batches.push(uris.len());
    match fake.playlists.get_mut(&id) {
        Some(playlist) => {
            playlist.tracks.extend(uris);
            (StatusCode::CREATED, Json(json!({"snapshot_id": "snap"}))).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn remove_tracks(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "DELETE /playlists/tracks") {
        return r;
    }
    if fake.unauthorized_removes || bearer_user(&fake, &headers).is_none() {
        return unauthorized();
    }
    if fake.fail_removes {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let uris: HashSet<String> = body["tracks"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|t| t["uri"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if uris.len() > 100 {
        return StatusCode::BAD_REQUEST.into_response();
    }

    fake.remove_batches.push(uris.len());
    match fake.playlists.get_mut(&id) {
        Some(playlist) => {
            playlist.tracks.retain(|uri| !uris.contains(uri));
            Json(json!({"snapshot_id": "snap"})).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn follows(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "GET /playlists/followers") {
        return r;
    }
    let Some(user) = bearer_user(&fake, &headers) else {
        return unauthorized();
    };
    if fake.follow_check_down {
        return StatusCode::BAD_GATEWAY.into_response();
    }

    let asked = params.get("ids").cloned().unwrap_or(user);
    let follows = fake
        .playlists
        .get(&id)
        .is_some_and(|p| p.followed && p.owner == asked);
    Json(json!([follows])).into_response()
}

async fn unfollow(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut fake = shared.lock().unwrap();
    if let Some(r) = hit(&mut fake, "DELETE /playlists/followers") {
        return r;
    }
    if bearer_user(&fake, &headers).is_none() {
        return unauthorized();
    }
    if let Some(playlist) = fake.playlists.get_mut(&id) {
        playlist.followed = false;
    }
    StatusCode::OK.into_response()
}
