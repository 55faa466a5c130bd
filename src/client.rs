use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{self, Error, Failure};
use crate::models::{
    Credentials, Director, FavoriteRequest, Favorites, Genre, LoginResponse, Movie, MovieId,
    Registration, User, UserUpdate,
};
use crate::session::SessionStore;

/// Public Moviebook API.
pub const DEFAULT_BASE_URL: &str = "https://the-moviebook.herokuapp.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Moviebook API client configuration.
///
/// ```rust
/// use moviebook_client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_base_url("http://localhost:8080".parse().unwrap());
/// assert_eq!(config.base_url().as_str(), "http://localhost:8080/");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration pointing at the public API with a 30 second request timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.parse().expect("valid default URL"),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `MOVIEBOOK_API_URL`: Override the API base URL
    /// - `MOVIEBOOK_TIMEOUT_SECS`: Per-request timeout in seconds, `0` disables it
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::new();

        if let Some(url_str) = var("MOVIEBOOK_API_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("MOVIEBOOK_API_URL: {e}")))?;
            config = config.with_base_url(url);
        }
        if let Some(secs) = var("MOVIEBOOK_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("MOVIEBOOK_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }

        Ok(config)
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }

    /// Override the per-request timeout (`None` waits forever).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Moviebook REST API client.
///
/// Authenticated calls read the bearer token from the [`SessionStore`] at
/// the moment they are issued. The client itself never writes to the store;
/// see [`Account`](crate::Account) for the workflows that do.
///
/// Every failure comes back as a [`Failure`] carrying only a user-facing
/// message; the details are logged through `tracing`.
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ClientConfig, session: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            session,
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session store this client reads tokens from.
    #[must_use]
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    // ── Users ──────────────────────────────────────────────────────

    /// Exchange credentials for a token. Does not touch the session store.
    ///
    /// # Errors
    ///
    /// Fails with the bad-credentials message when the server rejects the
    /// username/password pair, and with the generic message otherwise.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Failure> {
        let request = self
            .request(Method::POST, &["login"], None)?
            .json(credentials);
        Ok(self.fetch_json("login", request).await?)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Fails with the generic message on any transport or HTTP error.
    pub async fn register(&self, registration: &Registration) -> Result<String, Failure> {
        let request = self
            .request(Method::POST, &["users"], None)?
            .json(registration);
        Ok(self.fetch_text("register", request).await?)
    }

    /// Profile of the logged-in user.
    ///
    /// # Errors
    ///
    /// Fails with the generic message on any transport or HTTP error, or
    /// when there is no session to name the user.
    pub async fn get_user(&self) -> Result<User, Failure> {
        let request = self.user_request(Method::GET, &[])?;
        Ok(self.fetch_json("get user", request).await?)
    }

    /// Update the fields set in `update`.
    ///
    /// # Errors
    ///
    /// Same as [`get_user`](Self::get_user).
    pub async fn edit_user(&self, update: &UserUpdate) -> Result<String, Failure> {
        let request = self.user_request(Method::PUT, &[])?.json(update);
        Ok(self.fetch_text("edit user", request).await?)
    }

    /// Delete the logged-in user's account.
    ///
    /// # Errors
    ///
    /// Same as [`get_user`](Self::get_user).
    pub async fn delete_user(&self) -> Result<String, Failure> {
        let request = self.user_request(Method::DELETE, &[])?;
        Ok(self.fetch_text("delete user", request).await?)
    }

    // ── Favorites ──────────────────────────────────────────────────

    /// Favorite movie IDs of the logged-in user.
    ///
    /// # Errors
    ///
    /// Same as [`get_user`](Self::get_user).
    pub async fn get_favorites(&self) -> Result<Favorites, Failure> {
        let request = self.user_request(Method::GET, &["favs"])?;
        Ok(self.fetch_json("get favorites", request).await?)
    }

    /// Add a movie to the logged-in user's favorites.
    ///
    /// # Errors
    ///
    /// Same as [`get_user`](Self::get_user).
    pub async fn add_favorite(&self, movie_id: &MovieId) -> Result<String, Failure> {
        let request = self
            .user_request(Method::POST, &["favs"])?
            .json(&FavoriteRequest { movie_id });
        Ok(self.fetch_text("add favorite", request).await?)
    }

    /// Remove a movie from the logged-in user's favorites.
    ///
    /// # Errors
    ///
    /// Same as [`get_user`](Self::get_user).
    pub async fn delete_favorite(&self, movie_id: &MovieId) -> Result<String, Failure> {
        let request = self.user_request(Method::DELETE, &["favs", movie_id.as_str()])?;
        Ok(self.fetch_text("delete favorite", request).await?)
    }

    // ── Catalog ────────────────────────────────────────────────────

    /// The whole catalog.
    ///
    /// # Errors
    ///
    /// Fails with the generic message on any transport or HTTP error.
    pub async fn get_movies(&self) -> Result<Vec<Movie>, Failure> {
        let request = self.authorized(Method::GET, &["movies"])?;
        Ok(self.fetch_json("get movies", request).await?)
    }

    /// Movies whose title matches `title`.
    ///
    /// # Errors
    ///
    /// Fails with the generic message on any transport or HTTP error.
    pub async fn get_movies_by_title(&self, title: &str) -> Result<Vec<Movie>, Failure> {
        let request = self.authorized(Method::GET, &["movies", title])?;
        Ok(self.fetch_json("get movies by title", request).await?)
    }

    /// Genre details by name.
    ///
    /// # Errors
    ///
    /// Fails with the generic message on any transport or HTTP error.
    pub async fn get_genre(&self, name: &str) -> Result<Genre, Failure> {
        let request = self.authorized(Method::GET, &["genres", name])?;
        Ok(self.fetch_json("get genre", request).await?)
    }

    /// Director details.
    ///
    /// The deployed API serves directors from the genres route, so this
    /// requests `GET /genres/{name}`.
    ///
    /// # Errors
    ///
    /// Fails with the generic message on any transport or HTTP error.
    pub async fn get_director(&self, name: &str) -> Result<Director, Failure> {
        let request = self.authorized(Method::GET, &["genres", name])?;
        Ok(self.fetch_json("get director", request).await?)
    }

    // ── Plumbing ───────────────────────────────────────────────────

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Config(format!("base URL cannot have a path: {}", self.config.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<String>,
    ) -> Result<RequestBuilder, Error> {
        let mut request = self.http.request(method, self.endpoint(segments)?);
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    /// Request carrying the current token, if there is one.
    fn authorized(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, Error> {
        self.request(method, segments, self.session.token())
    }

    /// Request under `/users/{username}` for the current session.
    fn user_request(&self, method: Method, tail: &[&str]) -> Result<RequestBuilder, Error> {
        let session = self.session.get().ok_or(Error::NoSession)?;
        let mut segments = vec!["users", session.username.as_str()];
        segments.extend_from_slice(tail);
        self.request(method, &segments, Some(session.token))
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, Error> {
        let response = Self::send(request, operation).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    async fn fetch_text(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<String, Error> {
        let response = Self::send(request, operation).await?;
        response.text().await.map_err(Into::into)
    }

    /// Sends the request; returns the response on success or the classified error.
    async fn send(
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        tracing::debug!(operation, "Moviebook API request");
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if error::is_auth_failure(&body) {
            tracing::info!(operation, status = status.as_u16(), "Credentials rejected");
            return Err(Error::InvalidCredentials);
        }
        Err(Error::Status {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}
