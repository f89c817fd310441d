//! Session Manager
//!
//! One instance per console, shared by reference. Consumers read snapshots or
//! subscribe to changes; only the operations here mutate the session.

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::IgnoredAny;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use emporium_api::{
    ApiOutcome, ApiRequest, ApiResponse, Headers, HttpClient, Liveness, Navigator,
    RequestExecutor, TransportError,
};

use crate::endpoints::SessionEndpoints;
use crate::error::SessionError;
use crate::state::{SessionEvent, SessionSnapshot};
use crate::user::{LoginCredentials, User, UserPayload};
use crate::Result;

/// One refresh attempt; `generation` tells attempts apart across dispose and init
#[derive(Clone)]
struct RefreshFlight {
    generation: u64,
    outcome: Shared<BoxFuture<'static, bool>>,
}

enum Validation {
    Valid(User),
    Expired,
    Invalid,
}

pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: Arc<dyn HttpClient>,
    navigator: Arc<dyn Navigator>,
    endpoints: SessionEndpoints,
    state: watch::Sender<SessionSnapshot>,
    /// Refresh attempt every concurrent caller awaits
    refresh_in_flight: Mutex<Option<RefreshFlight>>,
    refresh_generation: AtomicU64,
    /// Latest failed refresh generation that already sent the user to log in
    redirected_for: AtomicU64,
    liveness: Liveness,
}

impl SessionManager {
    pub fn new(
        client: Arc<dyn HttpClient>,
        navigator: Arc<dyn Navigator>,
        endpoints: SessionEndpoints,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());

        Self {
            inner: Arc::new(SessionInner {
                client,
                navigator,
                endpoints,
                state,
                refresh_in_flight: Mutex::new(None),
                refresh_generation: AtomicU64::new(0),
                redirected_for: AtomicU64::new(0),
                liveness: Liveness::new(),
            }),
        }
    }

    /// Start (or restart) the lifecycle and run the mount-time session check.
    pub async fn init(&self) -> SessionSnapshot {
        self.inner.liveness.revive();
        self.inner.update(SessionEvent::Restarted);

        tracing::info!("Checking session");
        self.check_session().await;

        let snapshot = self.snapshot();
        tracing::info!(
            phase = %snapshot.phase,
            user_id = ?snapshot.user.as_ref().map(|u| u.id.as_str()),
            "Session initialized"
        );
        snapshot
    }

    /// End the lifecycle. Responses that arrive afterwards are dropped.
    pub fn dispose(&self) {
        self.inner.liveness.end();
        self.inner.refresh_in_flight.lock().take();
        tracing::info!("Session manager disposed");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    pub fn login_page(&self) -> &str {
        &self.inner.endpoints.login_page
    }

    /// Validate the current session, refreshing once on 401.
    ///
    /// Fails closed: anything other than a confirmed identity leaves the
    /// session unauthenticated. Never redirects.
    pub async fn check_session(&self) {
        let user = match self.inner.validate().await {
            Validation::Valid(user) => Some(user),
            Validation::Expired => {
                if self.refresh_session().await {
                    match self.inner.validate().await {
                        Validation::Valid(user) => Some(user),
                        Validation::Expired | Validation::Invalid => None,
                    }
                } else {
                    None
                }
            }
            Validation::Invalid => None,
        };

        if !self.inner.liveness.is_alive() {
            tracing::debug!("Dropping session check result after dispose");
            return;
        }

        let event = match user {
            Some(user) => SessionEvent::Validated(user),
            None => SessionEvent::ValidationFailed,
        };
        self.inner.state.send_modify(|snapshot| {
            snapshot.apply(event);
            snapshot.finish_loading();
        });
    }

    /// Exchange the expiring session for a renewed one.
    ///
    /// Concurrent callers share one request. Success marks the session
    /// authenticated but does not fetch the user.
    pub async fn refresh_session(&self) -> bool {
        self.join_refresh().await.1
    }

    /// Await the in-flight refresh, starting one if none is running.
    /// Returns the attempt's generation with its outcome.
    async fn join_refresh(&self) -> (u64, bool) {
        let flight = {
            let mut slot = self.inner.refresh_in_flight.lock();
            match slot.as_ref() {
                Some(flight) => {
                    tracing::debug!(generation = flight.generation, "Joining in-flight session refresh");
                    flight.clone()
                }
                None => {
                    let generation = self.inner.refresh_generation.fetch_add(1, Ordering::AcqRel) + 1;
                    let inner = Arc::clone(&self.inner);
                    let outcome = async move {
                        let refreshed = inner.perform_refresh().await;
                        let mut slot = inner.refresh_in_flight.lock();
                        if slot.as_ref().is_some_and(|f| f.generation == generation) {
                            slot.take();
                        }
                        refreshed
                    }
                    .boxed()
                    .shared();
                    let flight = RefreshFlight { generation, outcome };
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let refreshed = flight.outcome.await;
        (flight.generation, refreshed)
    }

    /// Send `request` with credentials and JSON defaults under the caller's headers.
    ///
    /// On 401 the session is refreshed and the request retried exactly once;
    /// the retry's response is returned whatever its status. If the refresh
    /// fails the session is expired, the user is sent to the login page and
    /// `Ok(None)` is returned. Network errors propagate.
    pub async fn run_authenticated(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<Option<ApiResponse>, TransportError> {
        let request = request.with_default_headers(&Headers::json_defaults());
        let response = self.inner.client.send(request.clone()).await?;

        if !response.is_unauthorized() {
            return Ok(Some(response));
        }

        tracing::debug!(request = %request.describe(), "Unauthorized, refreshing session");

        let (generation, refreshed) = self.join_refresh().await;
        if refreshed {
            let retried = self.inner.client.send(request).await?;
            return Ok(Some(retried));
        }

        if self.inner.liveness.is_alive() {
            self.inner.update(SessionEvent::Expired);
            // Callers that shared the failed attempt redirect once between them
            if self.inner.redirected_for.fetch_max(generation, Ordering::AcqRel) < generation {
                tracing::info!(request = %request.describe(), "Session expired, redirecting to login");
                self.inner.navigator.redirect(&self.inner.endpoints.login_page);
            }
        }

        Ok(None)
    }

    /// Best-effort server logout, then always clear locally and redirect.
    pub async fn logout(&self) {
        let request =
            ApiRequest::post(self.inner.endpoints.logout.clone()).with_default_headers(&Headers::json_defaults());

        match self.inner.client.send(request).await {
            Ok(response) if response.is_success() => tracing::debug!("Logout acknowledged"),
            Ok(response) => tracing::warn!(
                status = response.status(),
                "Logout endpoint rejected request"
            ),
            Err(e) => tracing::warn!(error = %e, "Logout request failed"),
        }

        self.inner.update(SessionEvent::LoggedOut);
        tracing::info!("Logged out");
        self.inner.navigator.redirect(&self.inner.endpoints.login_page);
    }

    /// Authenticate with email and password.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(SessionError::EmptyCredentials);
        }

        let request = ApiRequest::post(self.inner.endpoints.login.clone())
            .with_json(credentials)?
            .with_default_headers(&Headers::json_defaults());
        let response = self.inner.client.send(request).await?;
        let status = response.status();

        if !response.is_success() {
            return Err(SessionError::Rejected {
                status,
                message: response.error_message(),
            });
        }

        match response.outcome::<UserPayload>()? {
            ApiOutcome::Success(payload) => {
                if !self.inner.liveness.is_alive() {
                    return Err(SessionError::Disposed);
                }
                let user = payload.user;
                self.inner.update(SessionEvent::LoggedIn(user.clone()));
                tracing::info!(user_id = %user.id, "Logged in");
                Ok(user)
            }
            ApiOutcome::Failure { message } => Err(SessionError::Rejected {
                status,
                message: message.unwrap_or_else(|| "Login rejected".to_string()),
            }),
        }
    }
}

impl SessionInner {
    fn update(&self, event: SessionEvent) {
        self.state.send_modify(|snapshot| snapshot.apply(event));
    }

    async fn validate(&self) -> Validation {
        let request =
            ApiRequest::get(self.endpoints.validate.clone()).with_default_headers(&Headers::json_defaults());

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Session validation request failed");
                return Validation::Invalid;
            }
        };

        if response.is_unauthorized() {
            return Validation::Expired;
        }

        if !response.is_success() {
            tracing::debug!(status = response.status(), "Session validation rejected");
            return Validation::Invalid;
        }

        match response.outcome::<UserPayload>() {
            Ok(ApiOutcome::Success(payload)) => Validation::Valid(payload.user),
            Ok(ApiOutcome::Failure { message }) => {
                tracing::debug!(message = ?message, "Session not valid");
                Validation::Invalid
            }
            Err(e) => {
                tracing::warn!(error = %e, "Malformed session validation payload");
                Validation::Invalid
            }
        }
    }

    async fn perform_refresh(&self) -> bool {
        let request =
            ApiRequest::post(self.endpoints.refresh.clone()).with_default_headers(&Headers::json_defaults());

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh request failed");
                return false;
            }
        };

        if !response.is_success() {
            tracing::debug!(status = response.status(), "Session refresh rejected");
            return false;
        }

        match response.outcome::<IgnoredAny>() {
            Ok(ApiOutcome::Success(_)) => {
                if self.liveness.is_alive() {
                    self.update(SessionEvent::Refreshed);
                }
                tracing::debug!("Session refreshed");
                true
            }
            Ok(ApiOutcome::Failure { message }) => {
                tracing::debug!(message = ?message, "Session refresh declined");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Malformed session refresh payload");
                false
            }
        }
    }
}

#[async_trait]
impl RequestExecutor for SessionManager {
    async fn execute(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<Option<ApiResponse>, TransportError> {
        self.run_authenticated(request).await
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
