use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::ApiClient;
use crate::error::Failure;
use crate::models::{Movie, MovieId};

/// Result of [`FavoritesReconciler::toggle_favorite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    /// The server confirmed the add; the movie is now a favorite.
    Added,
    /// The server confirmed the delete; the movie is no longer a favorite.
    Removed,
    /// A toggle for this movie was already outstanding. No request was sent.
    InFlight,
}

/// Outcome of the two independent fetches made by [`FavoritesReconciler::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Number of movies loaded, or why the catalog fetch failed.
    pub movies: Result<usize, Failure>,
    /// Number of favorites loaded, or why the favorites fetch failed.
    pub favorites: Result<usize, Failure>,
}

#[derive(Default)]
struct State {
    movies: Vec<Movie>,
    fav_movies: Vec<MovieId>,
    in_flight: HashSet<MovieId>,
}

/// Local mirror of the catalog and of the user's favorites.
///
/// The favorites list only changes after the server confirms an add or a
/// delete, so a failed request leaves it as it was. While a toggle for a
/// movie is outstanding, further toggles for that movie are ignored rather
/// than racing it.
pub struct FavoritesReconciler {
    client: Arc<ApiClient>,
    state: Mutex<State>,
}

impl FavoritesReconciler {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the catalog and the favorites concurrently.
    ///
    /// Each half is applied as soon as it arrives; one failing does not
    /// affect the other.
    pub async fn load(&self) -> LoadOutcome {
        let (movies, favorites) = tokio::join!(self.load_movies(), self.load_favorites());
        LoadOutcome { movies, favorites }
    }

    /// Replace the mirrored catalog with the full catalog.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`]; the mirror is unchanged.
    pub async fn load_movies(&self) -> Result<usize, Failure> {
        let movies = self.client.get_movies().await?;
        let count = movies.len();
        self.state().movies = movies;
        Ok(count)
    }

    /// Replace the mirrored favorites with the server's list.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`]; the mirror is unchanged.
    pub async fn load_favorites(&self) -> Result<usize, Failure> {
        let favorites = self.client.get_favorites().await?.favorites;

        let mut unique: Vec<MovieId> = Vec::with_capacity(favorites.len());
        for id in favorites {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let count = unique.len();
        self.state().fav_movies = unique;
        Ok(count)
    }

    /// Replace the mirrored catalog with the movies matching `title`.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`]; the mirror is unchanged.
    pub async fn search(&self, title: &str) -> Result<usize, Failure> {
        let movies = self.client.get_movies_by_title(title).await?;
        let count = movies.len();
        self.state().movies = movies;
        Ok(count)
    }

    /// Add `id` to the favorites if absent, remove it if present.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`]; the favorites are unchanged.
    pub async fn toggle_favorite(&self, id: &MovieId) -> Result<Toggled, Failure> {
        let was_favorite = {
            let mut state = self.state();
            if !state.in_flight.insert(id.clone()) {
                tracing::debug!(movie_id = %id, "Toggle already in flight");
                return Ok(Toggled::InFlight);
            }
            state.fav_movies.contains(id)
        };
        let _in_flight = InFlightGuard { state: &self.state, id };

        if was_favorite {
            self.client.delete_favorite(id).await?;
            self.state().fav_movies.retain(|fav| fav != id);
            Ok(Toggled::Removed)
        } else {
            self.client.add_favorite(id).await?;
            let mut state = self.state();
            if !state.fav_movies.contains(id) {
                state.fav_movies.push(id.clone());
            }
            Ok(Toggled::Added)
        }
    }

    #[must_use]
    pub fn movies(&self) -> Vec<Movie> {
        self.state().movies.clone()
    }

    /// Favorite movie IDs in the order they were added.
    #[must_use]
    pub fn favorites(&self) -> Vec<MovieId> {
        self.state().fav_movies.clone()
    }

    /// Mirrored movies that are favorites, in favorites order.
    #[must_use]
    pub fn favorite_movies(&self) -> Vec<Movie> {
        let state = self.state();
        state
            .fav_movies
            .iter()
            .filter_map(|id| state.movies.iter().find(|m| &m.id == id))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn movie(&self, id: &MovieId) -> Option<Movie> {
        self.state().movies.iter().find(|m| &m.id == id).cloned()
    }

    #[must_use]
    pub fn is_favorite(&self, id: &MovieId) -> bool {
        self.state().fav_movies.contains(id)
    }

    /// Whether a toggle for `id` is waiting on the server.
    #[must_use]
    pub fn is_in_flight(&self, id: &MovieId) -> bool {
        self.state().in_flight.contains(id)
    }
}

/// Releases the in-flight marker when the toggle finishes or is dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<State>,
    id: &'a MovieId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .remove(self.id);
    }
}
