//! Session lifecycle: login, idle timeout, keepalive, and deferred logout.
//!
//! State starts `Unknown` at application load (or the browser-refresh
//! analog). A successful status check moves it to `LoggedIn`; explicit
//! logout, idle-timer expiry, or a server-side rejection move it to
//! `LoggedOut`. `Registering` covers the one-time registration flow for a
//! new external-identity user.
//!
//! Logout is synchronous locally but the server-side invalidation is
//! deferred by a grace delay so in-flight requests can finish. The doomed
//! session id is persisted in the interim, which lets a browser refresh
//! racing the logout be detected (and re-doomed), and lets a fast re-login
//! of the same session cancel the pending server logout.
//!
//! Timers carry absolute deadlines; the host drives them through
//! [`SessionManager::tick`]. There is no runtime dependency here: clients
//! wrap with their own scheduling.

mod store;
mod timers;

pub use store::{
    default_store_path, DoomedSession, FileSessionStore, MemorySessionStore, SessionStore,
    STORE_FILE,
};
pub use timers::{TimerKind, TimerSet};

use console_session_protocol::{CheckStatusOptions, StatusBody};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::error::{ConsoleError, Result};

/// Minimum idle timeout the client accepts, whatever the server reports.
/// One hour.
pub const SESSION_TIMEOUT_FLOOR_MS: u64 = 60 * 60 * 1000;

/// Grace delay between local logout and the server-side invalidation call,
/// long enough for in-flight requests to complete.
pub const LOGOUT_DELAY_MS: u64 = 5 * 1000;

/// Keepalive-ping interval for the server's independent session record,
/// chosen to stay under an assumed 30-minute server-side expiry.
pub const KEEPALIVE_INTERVAL_MS: u64 = 20 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unknown,
    LoggingIn,
    LoggedIn,
    Registering,
    LoggedOut,
}

/// The authenticated principal, reduced to what the core consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub session_id: String,
    pub name: Option<String>,
}

/// Result of resolving an external-identity (subject id 0) login.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub subject: Subject,
    pub is_new_user: bool,
}

/// Why the login prompt is being presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPrompt {
    /// The server reports no session.
    NoSession,
    /// A refresh raced an in-flight logout of this same session.
    DoomedReplay,
    /// External-identity login lost its username, likely across a refresh.
    MissingIdentity,
    /// The external identity provider rejected the credentials.
    IdentityRejected,
}

/// Outcome of a status check or login attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    LoggedIn {
        subject: Subject,
        /// The subject changed from the previous session while the history
        /// token still points at the old user's view; the caller should
        /// reset the token so the new user starts fresh.
        reset_history: bool,
    },
    Registering {
        subject: Subject,
    },
    ShowLogin {
        reason: LoginPrompt,
    },
    /// Server startup has not finished; show a "server initializing"
    /// message, not a login failure.
    ServerInitializing,
}

/// Timer-driven events surfaced to the host from [`SessionManager::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// Idle timer expired: client-local lock-out, show the login prompt.
    PresentLogin,
    /// A keepalive ping was sent (success or not, it reschedules).
    KeepaliveSent,
    /// The deferred server-side logout ran for this session id.
    ServerLogoutCompleted { session_id: String },
    /// The deferred logout was skipped: the same session logged back in.
    ServerLogoutSkipped { session_id: String },
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ServiceFailure(pub String);

/// Server collaborator behind the session lifecycle. All calls are
/// synchronous from the core's point of view; hosts with async transports
/// block or queue around them.
pub trait SessionService {
    /// Queries the session-status endpoint.
    fn check_status(
        &mut self,
        options: &CheckStatusOptions,
    ) -> std::result::Result<StatusBody, ServiceFailure>;

    /// Server-configured idle timeout.
    fn session_timeout_ms(&mut self) -> std::result::Result<u64, ServiceFailure>;

    /// Invalidates the given server session.
    fn logout(&mut self, session_id: &str) -> std::result::Result<(), ServiceFailure>;

    /// Resolves an external-identity (id 0) principal, registering or
    /// matching it case-insensitively.
    fn resolve_external_identity(
        &mut self,
        subject: &Subject,
        password: &str,
    ) -> std::result::Result<ResolvedIdentity, ServiceFailure>;

    /// Updates the linked external-identity record after login. Best effort.
    fn update_web_identity(&mut self, session_id: &str) -> std::result::Result<(), ServiceFailure> {
        let _ = session_id;
        Ok(())
    }
}

/// Process-wide session authority: owns the state, the subject, and the
/// timer set. Explicitly constructed and passed by reference; there is no
/// global instance.
pub struct SessionManager<S: SessionService> {
    service: S,
    store: Box<dyn SessionStore>,
    state: SessionState,
    subject: Option<Subject>,
    session_timeout_ms: u64,
    timeout_floor_ms: u64,
    timers: TimerSet,
}

impl<S: SessionService> SessionManager<S> {
    pub fn new(service: S, store: Box<dyn SessionStore>) -> Self {
        Self::with_timeout_floor(service, store, SESSION_TIMEOUT_FLOOR_MS)
    }

    pub fn with_timeout_floor(
        service: S,
        store: Box<dyn SessionStore>,
        timeout_floor_ms: u64,
    ) -> Self {
        Self {
            service,
            store,
            state: SessionState::Unknown,
            subject: None,
            session_timeout_ms: timeout_floor_ms,
            timeout_floor_ms,
            timers: TimerSet::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    pub fn is_logged_out(&self) -> bool {
        self.state == SessionState::LoggedOut
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn session_id(&self) -> Option<String> {
        self.subject
            .as_ref()
            .map(|subject| subject.session_id.clone())
            .or_else(|| self.store.session_id())
    }

    pub fn session_timeout_ms(&self) -> u64 {
        self.session_timeout_ms
    }

    pub fn timer_deadline(&self, kind: TimerKind) -> Option<u64> {
        self.timers.deadline(kind)
    }

    /// Service accessor for hosts that multiplex other calls over the same
    /// transport.
    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    /// Queries the server-side session status and reconciles local state
    /// with it. `at_logout_view` says whether the live history token is the
    /// logout sentinel; it feeds the user-change check.
    pub fn check_status(
        &mut self,
        user: Option<&str>,
        password: Option<&str>,
        at_logout_view: bool,
        now_ms: u64,
    ) -> Result<LoginOutcome> {
        let fresh_load = self.state == SessionState::Unknown;
        self.reconcile_status(user, password, at_logout_view, fresh_load, now_ms)
    }

    fn reconcile_status(
        &mut self,
        user: Option<&str>,
        password: Option<&str>,
        at_logout_view: bool,
        fresh_load: bool,
        now_ms: u64,
    ) -> Result<LoginOutcome> {
        let body = self
            .service
            .check_status(&CheckStatusOptions::default())
            .map_err(|err| ConsoleError::CannotDetermineStatus {
                details: err.to_string(),
            })?;

        let access = match body {
            StatusBody::Booting => {
                info!("Server still initializing");
                return Ok(LoginOutcome::ServerInitializing);
            }
            StatusBody::Empty => {
                // no server-side session: back to login
                self.state = SessionState::LoggedOut;
                return Ok(LoginOutcome::ShowLogin {
                    reason: LoginPrompt::NoSession,
                });
            }
            StatusBody::Active(access) => access,
        };

        debug!(
            subject_id = access.subject_id,
            session_id = %access.session_id,
            last_access = access.last_access_ms,
            "Session status received"
        );

        // A refresh while a logout is in flight must not hijack the
        // still-valid server session: a fresh load (state was Unknown) plus
        // a doomed marker for this very session id means the refresh killed
        // the logout timer. Re-doom the session and go back to login. A
        // re-login from LoggedOut is not a replay; the user wants back in.
        if fresh_load {
            if let Some(doomed) = self.store.doomed_session() {
                if doomed.session_id == access.session_id {
                    info!(session_id = %access.session_id, "Refresh raced in-flight logout; rescheduling");
                    self.state = SessionState::LoggedOut;
                    self.schedule_server_logout(&access.session_id, now_ms);
                    return Ok(LoginOutcome::ShowLogin {
                        reason: LoginPrompt::DoomedReplay,
                    });
                }
            }
        }

        self.arm_idle_timer(&access.session_id, access.last_access_ms, now_ms);

        // If the subject changed but the token still points at the previous
        // user's view, the caller should reset it so the new user starts
        // fresh. A timeout-driven re-login of the same user keeps the view.
        let previous_subject_id = self.subject.as_ref().map(|subject| subject.id);
        let reset_history = !at_logout_view
            && previous_subject_id.is_some()
            && previous_subject_id != Some(access.subject_id);

        let subject = Subject {
            id: access.subject_id,
            session_id: access.session_id.clone(),
            name: user.map(str::to_string),
        };

        if subject.id == 0 {
            return self.resolve_identity(subject, password.unwrap_or(""), reset_history);
        }

        self.subject = Some(subject.clone());
        Ok(LoginOutcome::LoggedIn {
            subject,
            reset_history,
        })
    }

    fn resolve_identity(
        &mut self,
        subject: Subject,
        password: &str,
        reset_history: bool,
    ) -> Result<LoginOutcome> {
        let name_missing = subject
            .name
            .as_deref()
            .map(|name| name.trim().is_empty())
            .unwrap_or(true);
        if name_missing {
            // Lost across a refresh; without the username the identity
            // lookup cannot proceed.
            trace!("External-identity login lost its username; back to login");
            self.state = SessionState::LoggedOut;
            return Ok(LoginOutcome::ShowLogin {
                reason: LoginPrompt::MissingIdentity,
            });
        }

        match self.service.resolve_external_identity(&subject, password) {
            Ok(resolved) => {
                if resolved.is_new_user {
                    trace!(user = ?resolved.subject.name, "New external identity; entering registration");
                    self.state = SessionState::Registering;
                    self.subject = Some(resolved.subject.clone());
                    Ok(LoginOutcome::Registering {
                        subject: resolved.subject,
                    })
                } else {
                    self.subject = Some(resolved.subject.clone());
                    Ok(LoginOutcome::LoggedIn {
                        subject: resolved.subject,
                        reset_history,
                    })
                }
            }
            Err(err) => {
                debug!(error = %err, "External-identity resolution failed");
                self.state = SessionState::LoggedOut;
                Ok(LoginOutcome::ShowLogin {
                    reason: LoginPrompt::IdentityRejected,
                })
            }
        }
    }

    /// Performs a login attempt. On success the state is `LoggedIn`, the
    /// idle and keepalive timers are armed, and the caller should rebuild
    /// the application shell.
    pub fn login(
        &mut self,
        user: Option<&str>,
        password: Option<&str>,
        at_logout_view: bool,
        now_ms: u64,
    ) -> Result<LoginOutcome> {
        let entry_state = self.state;
        let fresh_load = entry_state == SessionState::Unknown;
        self.state = SessionState::LoggingIn;

        let outcome = match self.reconcile_status(user, password, at_logout_view, fresh_load, now_ms)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                self.state = entry_state;
                error!(error = %err, "Unable to determine login status - check server status");
                return Err(err);
            }
        };

        match &outcome {
            LoginOutcome::LoggedIn { subject, .. } => {
                self.state = SessionState::LoggedIn;
                self.subject = Some(subject.clone());
                self.store.save_session_id(&subject.session_id);

                match self.service.session_timeout_ms() {
                    Ok(reported) => {
                        self.session_timeout_ms = reported.max(self.timeout_floor_ms);
                    }
                    Err(err) => {
                        // Keep the floor; an unprotected session is worse
                        // than a conservative timeout.
                        error!(error = %err, "Failed to fetch session timeout; keeping floor");
                        self.session_timeout_ms = self.timeout_floor_ms;
                    }
                }

                self.refresh(now_ms);
                self.timers
                    .schedule_at(TimerKind::Keepalive, now_ms + KEEPALIVE_INTERVAL_MS);

                if let Err(err) = self.service.update_web_identity(&subject.session_id) {
                    trace!(error = %err, "Failed to update web identity record");
                }

                info!(subject_id = subject.id, "Login complete");
            }
            LoginOutcome::ServerInitializing => {
                // no state transition while the server boots
                self.state = entry_state;
            }
            LoginOutcome::Registering { .. } | LoginOutcome::ShowLogin { .. } => {
                // check_status already moved the state
            }
        }

        Ok(outcome)
    }

    /// Navigation counts as activity: rearms the idle timer with the full
    /// timeout.
    pub fn refresh(&mut self, now_ms: u64) {
        self.state = SessionState::LoggedIn;
        trace!("Refreshing session timer");
        self.timers
            .schedule_at(TimerKind::Idle, now_ms + self.session_timeout_ms);
    }

    /// Logs out locally right away and schedules the server-side
    /// invalidation after the grace delay. No-op when already logged out.
    pub fn logout(&mut self, now_ms: u64) {
        if self.is_logged_out() {
            return;
        }

        self.state = SessionState::LoggedOut;

        info!("Destroying session timers");
        self.timers.cancel(TimerKind::Idle);
        self.timers.cancel(TimerKind::Keepalive);

        if let Some(session_id) = self.session_id() {
            self.schedule_server_logout(&session_id, now_ms);
        }
    }

    fn schedule_server_logout(&mut self, session_id: &str, now_ms: u64) {
        // Re-dooming the same session replaces the pending timer rather
        // than stacking a second logout.
        if let Some(doomed) = self.store.doomed_session() {
            if doomed.session_id == session_id {
                self.timers.cancel(TimerKind::DeferredLogout);
            }
        }

        self.store.save_doomed_session(session_id);
        self.timers
            .schedule_at(TimerKind::DeferredLogout, now_ms + LOGOUT_DELAY_MS);
    }

    /// Fires any due timers. Hosts call this from their event loop;
    /// [`TimerSet::next_deadline`] (via [`next_deadline`](Self::next_deadline))
    /// says how long they may sleep.
    pub fn tick(&mut self, now_ms: u64) -> Vec<SessionSignal> {
        let mut signals = Vec::new();
        for kind in self.timers.take_due(now_ms) {
            match kind {
                TimerKind::Idle => {
                    info!("Session timer expired");
                    // Client-local lock-out only; explicit logout() owns the
                    // server-side invalidation.
                    self.state = SessionState::LoggedOut;
                    signals.push(SessionSignal::PresentLogin);
                }
                TimerKind::Keepalive => {
                    // an idle lock-out in the same batch wins
                    if self.is_logged_out() {
                        continue;
                    }
                    match self
                        .service
                        .check_status(&CheckStatusOptions::keepalive())
                    {
                        Ok(_) => trace!("Refreshed server session access time"),
                        Err(err) => trace!(error = %err, "Keepalive ping failed"),
                    }
                    self.timers
                        .schedule_at(TimerKind::Keepalive, now_ms + KEEPALIVE_INTERVAL_MS);
                    signals.push(SessionSignal::KeepaliveSent);
                }
                TimerKind::DeferredLogout => {
                    if let Some(signal) = self.run_server_logout() {
                        signals.push(signal);
                    }
                }
            }
        }
        signals
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    fn run_server_logout(&mut self) -> Option<SessionSignal> {
        let doomed = self.store.doomed_session()?;
        self.store.clear_doomed_session();

        // A quick re-login of the same session must not be killed.
        if self.state == SessionState::LoggedIn
            && self
                .subject
                .as_ref()
                .map(|subject| subject.session_id == doomed.session_id)
                .unwrap_or(false)
        {
            debug!(session_id = %doomed.session_id, "Doomed session logged back in; skipping server logout");
            return Some(SessionSignal::ServerLogoutSkipped {
                session_id: doomed.session_id,
            });
        }

        match self.service.logout(&doomed.session_id) {
            Ok(()) => trace!(session_id = %doomed.session_id, "Logged out server side"),
            Err(err) => {
                // Not retried: the server session expires on its own.
                warn!(error = %err, session_id = %doomed.session_id, "Server-side logout failed")
            }
        }
        Some(SessionSignal::ServerLogoutCompleted {
            session_id: doomed.session_id,
        })
    }

    fn arm_idle_timer(&mut self, session_id: &str, last_access_ms: i64, now_ms: u64) {
        let previous = self.store.session_id();
        if previous.as_deref() != Some(session_id) {
            // new session: full timeout from now
            debug!(session_id = %session_id, timeout_ms = self.session_timeout_ms, "Scheduling session timeout");
            self.store.save_session_id(session_id);
            self.timers
                .schedule_at(TimerKind::Idle, now_ms + self.session_timeout_ms);
        } else {
            // existing session: expire relative to the server-reported
            // last-access time, clamped to [1, sessionTimeout]
            let budget = idle_budget_ms(last_access_ms, self.session_timeout_ms, now_ms);
            debug!(session_id = %session_id, budget_ms = budget, "Rescheduling session timeout");
            self.timers.schedule_at(TimerKind::Idle, now_ms + budget);
        }
    }
}

/// Remaining idle budget for an existing session:
/// `max(1, min(sessionTimeout, lastAccess + sessionTimeout - now))`.
/// Tying the schedule to the server-reported last access avoids trusting
/// client clock drift alone.
pub fn idle_budget_ms(last_access_ms: i64, session_timeout_ms: u64, now_ms: u64) -> u64 {
    // floor of 1 also keeps the clamp bounds ordered for a zero timeout
    let ceiling = session_timeout_ms.max(1) as i128;
    let remaining = last_access_ms as i128 + session_timeout_ms as i128 - now_ms as i128;
    remaining.clamp(1, ceiling) as u64
}
