use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::{Error, Failure};
use crate::models::{Credentials, Registration, User, UserUpdate};
use crate::session::{Session, SessionStore};

/// Login, registration and profile workflows.
///
/// These are the only operations that write to the [`SessionStore`]: a
/// session is stored after the server accepts a login and removed on logout
/// or account deletion. A failed call never changes the stored session.
pub struct Account {
    client: Arc<ApiClient>,
}

impl Account {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    fn store(&self) -> &dyn SessionStore {
        &**self.client.session()
    }

    /// Current session, if logged in.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.store().get()
    }

    /// Whether a token is stored. The server may still reject it.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store().token().is_some()
    }

    /// Log in and store the returned session.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`] unchanged, or the generic message if
    /// the session cannot be persisted.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, Failure> {
        let response = self.client.login(credentials).await?;
        self.store()
            .set(response.user.username.clone(), response.token)?;
        tracing::info!(username = %response.user.username, "Logged in");
        Ok(response.user)
    }

    /// Create an account without logging in.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`].
    pub async fn register(&self, registration: &Registration) -> Result<String, Failure> {
        self.client.register(registration).await
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns the first [`Failure`]; the session is only stored when both
    /// steps succeed.
    pub async fn register_and_login(&self, registration: &Registration) -> Result<User, Failure> {
        self.client.register(registration).await?;
        self.login(&registration.credentials()).await
    }

    /// Forget the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the session cannot be removed.
    pub fn logout(&self) -> Result<(), Error> {
        self.store().clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the client's [`Failure`].
    pub async fn profile(&self) -> Result<User, Failure> {
        self.client.get_user().await
    }

    /// Apply a partial profile update.
    ///
    /// When the update renames the user, the stored session follows so that
    /// later user-scoped requests address the new name.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`], or the generic message if the
    /// renamed session cannot be persisted.
    pub async fn edit_profile(&self, update: &UserUpdate) -> Result<String, Failure> {
        let confirmation = self.client.edit_user(update).await?;
        if let Some(username) = &update.username {
            self.store().rename(username.clone())?;
        }
        Ok(confirmation)
    }

    /// Delete the account and drop the session.
    ///
    /// # Errors
    ///
    /// Returns the client's [`Failure`]; the session is kept in that case.
    pub async fn delete_account(&self) -> Result<String, Failure> {
        let confirmation = self.client.delete_user().await?;
        self.store().clear()?;
        Ok(confirmation)
    }
}
