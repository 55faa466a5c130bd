//! In-process fake of the Moviebook API for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use moviebook_client::{ApiClient, ClientConfig, SessionStore};

pub type Shared = Arc<Mutex<FakeApi>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// Server-side state plus knobs for failure injection.
#[derive(Default)]
pub struct FakeApi {
    pub favorites: Vec<String>,
    pub requests: Vec<Recorded>,
    pub last_body: Option<Value>,
    /// `GET /movies` answers 500.
    pub fail_movies: bool,
    /// `GET /movies` answers 200 with a body that is not JSON.
    pub malformed_movies: bool,
    /// Every user-scoped route answers 500.
    pub fail_users: bool,
}

impl FakeApi {
    pub fn with_favorites(ids: &[&str]) -> Self {
        Self {
            favorites: ids.iter().map(|s| (*s).to_string()).collect(),
            ..Self::default()
        }
    }
}

pub fn requests_to(api: &Shared, method: &str, path: &str) -> usize {
    api.lock()
        .unwrap()
        .requests
        .iter()
        .filter(|r| r.method == method && r.path == path)
        .count()
}

pub fn last_request(api: &Shared) -> Recorded {
    api.lock().unwrap().requests.last().cloned().unwrap()
}

pub async fn spawn(api: FakeApi) -> (Url, Shared) {
    let shared: Shared = Arc::new(Mutex::new(api));
    let app = router(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}").parse().unwrap(), shared)
}

pub fn client(base_url: Url, store: Arc<dyn SessionStore>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(
        ClientConfig::new().with_base_url(base_url),
        store,
    ))
}

/// Base URL of a port nobody listens on.
pub fn dead_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}").parse().unwrap()
}

pub fn movies_json() -> Value {
    json!([
        {
            "_id": "m1",
            "Title": "Alien",
            "Description": "In space no one can hear you scream.",
            "Genre": [{"Name": "Horror", "Description": "Scary."}],
            "Director": {"Name": "Ridley Scott", "Bio": "English director.", "Birth": "1937-11-30T00:00:00.000Z"},
            "ImagePath": "alien.jpg",
            "Year": 1979
        },
        {
            "_id": "m2",
            "Title": "The Matrix",
            "Description": "Red pill.",
            "Genre": [{"Name": "Action", "Description": "Explosions."}],
            "Director": {"Name": "Lana Wachowski", "Bio": "American director."},
            "ImagePath": "matrix.jpg",
            "Year": 1999
        },
        {
            "_id": "m3",
            "Title": "Blade Runner",
            "Description": "Tears in rain.",
            "Genre": [{"Name": "Science Fiction", "Description": "Future."}],
            "Director": {"Name": "Ridley Scott", "Bio": "English director."},
            "ImagePath": "bladerunner.jpg",
            "Year": 1982
        }
    ])
}

fn router(api: Shared) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/users", post(register))
        .route("/users/{username}", get(get_user).put(edit_user).delete(delete_user))
        .route("/users/{username}/favs", get(get_favorites).post(add_favorite))
        .route("/users/{username}/favs/{movie_id}", delete(delete_favorite))
        .route("/movies", get(get_movies))
        .route("/movies/{title}", get(get_movies_by_title))
        .route("/genres/{name}", get(get_genre))
        .layer(middleware::from_fn_with_state(api.clone(), record))
        .with_state(api)
}

async fn record(State(api): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = Recorded {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };
    api.lock().unwrap().requests.push(recorded);
    next.run(request).await
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response()
}

async fn login(State(api): State<Shared>, Json(body): Json<Value>) -> Response {
    api.lock().unwrap().last_body = Some(body.clone());
    if body["Password"] == "bad" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Incorrect username or password.", "user": false})),
        )
            .into_response();
    }
    let username = body["Username"].as_str().unwrap_or_default().to_string();
    Json(json!({
        "user": {"Username": username, "Email": format!("{username}@example.com")},
        "token": format!("token-{username}")
    }))
    .into_response()
}

async fn register(State(api): State<Shared>, Json(body): Json<Value>) -> Response {
    api.lock().unwrap().last_body = Some(body.clone());
    if body["Username"] == "taken" {
        return (StatusCode::BAD_REQUEST, "taken already exists").into_response();
    }
    (StatusCode::CREATED, "User registered").into_response()
}

async fn get_user(State(api): State<Shared>, Path(username): Path<String>) -> Response {
    let api = api.lock().unwrap();
    if api.fail_users {
        return server_error();
    }
    Json(json!({
        "Username": username,
        "Email": format!("{username}@example.com"),
        "Birth": "1990-05-17T00:00:00.000Z",
        "FavoriteMovies": api.favorites
    }))
    .into_response()
}

async fn edit_user(
    State(api): State<Shared>,
    Path(_username): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut api = api.lock().unwrap();
    if api.fail_users {
        return server_error();
    }
    api.last_body = Some(body);
    "Profile updated".into_response()
}

async fn delete_user(State(api): State<Shared>, Path(username): Path<String>) -> Response {
    if api.lock().unwrap().fail_users {
        return server_error();
    }
    format!("{username} was deleted").into_response()
}

async fn get_favorites(State(api): State<Shared>, Path(_username): Path<String>) -> Response {
    let api = api.lock().unwrap();
    if api.fail_users {
        return server_error();
    }
    Json(json!({"Favorites": api.favorites})).into_response()
}

async fn add_favorite(
    State(api): State<Shared>,
    Path(_username): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let movie_id = body["movieID"].as_str().unwrap_or_default().to_string();
    if movie_id.starts_with("slow") {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    let mut api = api.lock().unwrap();
    if api.fail_users || movie_id.starts_with("fail") {
        return server_error();
    }
    if !api.favorites.contains(&movie_id) {
        api.favorites.push(movie_id);
    }
    "Favorite added".into_response()
}

async fn delete_favorite(
    State(api): State<Shared>,
    Path((_username, movie_id)): Path<(String, String)>,
) -> Response {
    let mut api = api.lock().unwrap();
    if api.fail_users || movie_id.starts_with("fail") {
        return server_error();
    }
    api.favorites.retain(|id| id != &movie_id);
    "Favorite removed".into_response()
}

async fn get_movies(State(api): State<Shared>) -> Response {
    let api = api.lock().unwrap();
    if api.fail_movies {
        return server_error();
    }
    if api.malformed_movies {
        return "<html>maintenance</html>".into_response();
    }
    Json(movies_json()).into_response()
}

async fn get_movies_by_title(Path(title): Path<String>) -> Response {
    let matching: Vec<Value> = movies_json()
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["Title"] == title.as_str())
        .cloned()
        .collect();
    Json(matching).into_response()
}

async fn get_genre(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "Horror" => Json(json!({"Name": "Horror", "Description": "Scary."})).into_response(),
        "Ridley Scott" => Json(json!({
            "Name": "Ridley Scott",
            "Bio": "English director.",
            "Birth": "1937-11-30",
            "Death": null
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
