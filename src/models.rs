use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(birth_date, Date, "[year]-[month]-[day]");

/// Moviebook account name.
///
/// Doubles as the path segment addressing every user-scoped route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Server-assigned movie identifier (the catalog's `_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct MovieId(pub String);

impl MovieId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MovieId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Login form body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    #[serde(rename = "Username")]
    pub username: Username,
    #[serde(rename = "Password")]
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<Username>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form body.
#[derive(Clone, Serialize)]
pub struct Registration {
    #[serde(rename = "Username")]
    pub username: Username,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Birth", with = "birth_date")]
    pub birth: Date,
}

impl Registration {
    #[must_use]
    pub fn new(
        username: impl Into<Username>,
        password: impl Into<String>,
        email: impl Into<String>,
        birth: Date,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
            birth,
        }
    }

    /// Credentials for logging in as the freshly registered user.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("birth", &self.birth)
            .finish()
    }
}

/// Partial profile update. Only the fields that were filled in are sent.
///
/// Empty strings count as "not filled in", matching how a profile form with
/// blank inputs should behave.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserUpdate {
    #[serde(rename = "Username", skip_serializing_if = "Option::is_none")]
    pub username: Option<Username>,
    #[serde(rename = "Password", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "Birth",
        with = "birth_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth: Option<Date>,
}

impl UserUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = non_empty(username.into()).map(Username);
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = non_empty(password.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_empty(email.into());
        self
    }

    #[must_use]
    pub fn with_birth(mut self, birth: Date) -> Self {
        self.birth = Some(birth);
        self
    }

    /// Nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.email.is_none()
            && self.birth.is_none()
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Account as returned by `GET /users/{username}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct User {
    #[serde(rename = "Username")]
    pub username: Username,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    #[serde(rename = "Birth", default, with = "server_date")]
    pub birth: Option<OffsetDateTime>,
    #[serde(rename = "FavoriteMovies", default)]
    pub favorite_movies: Vec<MovieId>,
}

impl User {
    #[must_use]
    pub fn new(username: impl Into<Username>) -> Self {
        Self {
            username: username.into(),
            email: None,
            birth: None,
            favorite_movies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Body of a successful `POST /login`.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Genre {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Director {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Bio", default)]
    pub bio: String,
    #[serde(rename = "Birth", default, with = "server_date")]
    pub birth: Option<OffsetDateTime>,
    #[serde(rename = "Death", default, with = "server_date")]
    pub death: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: MovieId,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Genre", default)]
    pub genres: Vec<Genre>,
    #[serde(rename = "Director", default)]
    pub director: Director,
    #[serde(rename = "ImagePath", default)]
    pub image_path: String,
    #[serde(rename = "Year", default)]
    pub year: Option<i32>,
}

impl Movie {
    /// The synopsis shown on the movie's detail card.
    #[must_use]
    pub fn synopsis(&self) -> &str {
        &self.description
    }
}

/// Body of `GET /users/{username}/favs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorites {
    #[serde(rename = "Favorites", default)]
    pub favorites: Vec<MovieId>,
}

/// Body of `POST /users/{username}/favs`.
#[derive(Serialize)]
pub(crate) struct FavoriteRequest<'a> {
    #[serde(rename = "movieID")]
    pub(crate) movie_id: &'a MovieId,
}

/// Dates as the server stores them: full RFC 3339 timestamps, or bare
/// `YYYY-MM-DD` dates which are read as midnight UTC.
mod server_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::{Date, OffsetDateTime};

    const DATE_ONLY: &[time::format_description::BorrowedFormatItem<'static>] =
        time::macros::format_description!("[year]-[month]-[day]");

    pub(super) fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
        OffsetDateTime::parse(raw, &Rfc3339)
            .or_else(|_| Date::parse(raw, DATE_ONLY).map(|d| d.midnight().assume_utc()))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.is_empty() => parse(&raw).map(Some).map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }

    pub(super) fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        time::serde::rfc3339::option::serialize(value, serializer)
    }
}
