#![doc = include_str!("../README.md")]

pub mod account;
pub mod client;
pub mod error;
pub mod favorites;
pub mod models;
pub mod session;

// Re-exports for convenient access
pub use account::Account;
pub use client::{ApiClient, ClientConfig, DEFAULT_BASE_URL};
pub use error::{BAD_CREDENTIALS_MESSAGE, Error, Failure, GENERIC_MESSAGE};
pub use favorites::{FavoritesReconciler, LoadOutcome, Toggled};
pub use models::{
    Credentials, Director, Favorites, Genre, LoginResponse, Movie, MovieId, Registration, User,
    UserUpdate, Username,
};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
