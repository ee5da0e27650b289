//! Session
//!
//! The auth store and the process-wide session-expired signal. A 401
//! anywhere in the remote boundary is broadcast here (see
//! [`crate::api::notify`]); the auth store clears the session in response,
//! while the cart and checkout cores stay unaware of auth entirely.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::{ApiError, CommerceApi};

/// Events broadcast across the application session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The remote reported a 401; the session is gone.
    Expired,
}

/// Broadcast handle for session events. Cheap to clone; one channel exists
/// per application session.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create the broadcast channel.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Announce that the session expired. Silently dropped when nothing is
    /// subscribed.
    pub fn notify_expired(&self) {
        let _ = self.tx.send(SessionEvent::Expired);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// A signed-in shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Account email.
    pub email: String,
}

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Account registration payload.
#[derive(Debug, Clone)]
pub struct Registration {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Owns the shopper's session state for the application session.
#[derive(Debug)]
pub struct AuthStore<A> {
    api: A,
    events: broadcast::Receiver<SessionEvent>,
    user: Option<User>,
}

impl<A: CommerceApi> AuthStore<A> {
    /// Bootstrap the session from the remote; anonymous on failure.
    pub async fn initialize(api: A, events: &SessionEvents) -> Self {
        let receiver = events.subscribe();

        let user = match api.get_session().await {
            Ok(user) => user,
            Err(error) => {
                debug!(%error, "session check failed, starting anonymous");
                None
            }
        };

        Self {
            api,
            events: receiver,
            user,
        }
    }

    /// The signed-in shopper, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether a shopper is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Sign in.
    ///
    /// # Errors
    ///
    /// Remote rejections are returned for inline presentation; the session
    /// state is unchanged on failure.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        let credentials = Credentials {
            email: email.to_owned(),
            password: password.to_owned(),
        };

        let user = self.api.login(&credentials).await?;
        self.user = Some(user);
        Ok(())
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Remote rejections are returned for inline presentation; the session
    /// state is unchanged on failure.
    pub async fn register(&mut self, registration: Registration) -> Result<(), ApiError> {
        let user = self.api.register(&registration).await?;
        self.user = Some(user);
        Ok(())
    }

    /// Sign out. The remote call is best-effort; the local session is
    /// cleared regardless of its outcome.
    pub async fn logout(&mut self) {
        if let Err(error) = self.api.logout().await {
            warn!(%error, "remote logout failed");
        }

        self.user = None;
    }

    /// Drain pending session events, clearing the session on expiry.
    pub fn process_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Expired) => self.user = None,
                // A lagged receiver may have missed an expiry; err on the
                // side of signing out.
                Err(broadcast::error::TryRecvError::Lagged(_)) => self.user = None,
                Err(
                    broadcast::error::TryRecvError::Empty
                    | broadcast::error::TryRecvError::Closed,
                ) => break,
            }
        }
    }
}
