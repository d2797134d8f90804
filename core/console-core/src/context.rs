//! The console context: one explicitly constructed object owning the
//! session manager and the navigation core.
//!
//! Hosts build a context at startup and thread it through their event loop.
//! Nothing here is a process-wide singleton; two contexts in one process
//! (tests do this constantly) stay fully independent.
//!
//! The context also encodes the couplings between the two halves that
//! neither owns alone: navigation counts as session activity, a logged-out
//! session parks navigation on the logout sentinel, and a user change
//! resets navigation state so the next user starts clean.

use tracing::info;

use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::nav::{NavigationCore, Shell};
use crate::registry::{LoadTicket, ViewRegistry};
use crate::session::{
    LoginOutcome, SessionManager, SessionService, SessionSignal, SessionStore,
};
use crate::message::Message;
use crate::views::{ContentContainer, ContentView};

pub struct ConsoleContext<S: SessionService> {
    config: ConsoleConfig,
    session: SessionManager<S>,
    nav: NavigationCore,
}

impl<S: SessionService> ConsoleContext<S> {
    pub fn new(
        config: ConsoleConfig,
        service: S,
        store: Box<dyn SessionStore>,
        registry: Box<dyn ViewRegistry>,
        container: Box<dyn ContentContainer>,
        shell: Box<dyn Shell>,
    ) -> Self {
        let session = SessionManager::with_timeout_floor(
            service,
            store,
            config.session_timeout_floor_ms,
        );
        let nav = NavigationCore::new(config.clone(), registry, container, shell);
        Self {
            config,
            session,
            nav,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<S> {
        &mut self.session
    }

    pub fn nav(&self) -> &NavigationCore {
        &self.nav
    }

    pub fn nav_mut(&mut self) -> &mut NavigationCore {
        &mut self.nav
    }

    /// Attempts a login. On success with a changed user, navigation state is
    /// reset so the previous user's view tree cannot leak across.
    pub fn login(
        &mut self,
        user: Option<&str>,
        password: Option<&str>,
        now_ms: u64,
    ) -> Result<LoginOutcome> {
        let at_logout_view =
            self.nav.current_token().as_deref() == Some(self.config.logout_view.as_str());
        let outcome = self.session.login(user, password, at_logout_view, now_ms)?;

        if let LoginOutcome::LoggedIn { reset_history, .. } = &outcome {
            if *reset_history {
                info!("Subject changed; resetting navigation state");
                self.nav.reset();
            }
        }
        Ok(outcome)
    }

    /// Builds the post-login view: dispatches `token`, substituting the
    /// default view when the token is empty or stuck on the logout
    /// sentinel.
    pub fn build_core_ui(&mut self, token: &str, now_ms: u64) -> Result<()> {
        let token = if token.is_empty() || token == self.config.logout_view {
            self.config.default_view.clone()
        } else {
            token.to_string()
        };
        let logged_in = self.session.is_logged_in();
        // Same-user re-login onto an unchanged token still rebuilds the view.
        if self.nav.current_token().as_deref() == Some(token.as_str()) {
            return self.nav.refresh_current(logged_in, now_ms);
        }
        self.nav.handle_history_change(&token, logged_in, now_ms)
    }

    /// Re-renders the current view in place with the refresh flag forced.
    pub fn refresh(&mut self, now_ms: u64) -> Result<()> {
        let logged_in = self.session.is_logged_in();
        self.nav.refresh_current(logged_in, now_ms)
    }

    /// Dispatches a history-token change. The logout sentinel logs out; any
    /// other navigation counts as user activity, so a logged-in session
    /// gets its idle timer rearmed first.
    pub fn handle_history_change(&mut self, token: &str, now_ms: u64) -> Result<()> {
        if token == self.config.logout_view && self.session.is_logged_in() {
            return self.logout(now_ms);
        }
        let logged_in = self.session.is_logged_in();
        if logged_in {
            self.session.refresh(now_ms);
        }
        self.nav.handle_history_change(token, logged_in, now_ms)
    }

    /// Programmatic navigation; see [`NavigationCore::go_to_view`].
    pub fn go_to_view(
        &mut self,
        target: &str,
        message: Option<Message>,
        refresh: bool,
        now_ms: u64,
    ) -> Result<()> {
        let logged_in = self.session.is_logged_in();
        if logged_in {
            self.session.refresh(now_ms);
        }
        self.nav.go_to_view(target, message, refresh, logged_in, now_ms)
    }

    /// Logs out: the session locks immediately (server invalidation is
    /// deferred), navigation state is dropped, and the address parks on the
    /// logout sentinel.
    pub fn logout(&mut self, now_ms: u64) -> Result<()> {
        self.session.logout(now_ms);
        self.nav.reset();
        let logout_view = self.config.logout_view.clone();
        self.nav.handle_history_change(&logout_view, false, now_ms)
    }

    /// Drives both timer sets. Returned signals tell the host what the
    /// session did (present login, keepalive, server logout); navigation
    /// failures (initialization timeout) surface as the error.
    pub fn tick(&mut self, now_ms: u64) -> Result<Vec<SessionSignal>> {
        let signals = self.session.tick(now_ms);
        if signals.contains(&SessionSignal::PresentLogin) {
            // idle expiry: park the address alongside the login prompt
            self.nav.reset();
            let logout_view = self.config.logout_view.clone();
            self.nav.handle_history_change(&logout_view, false, now_ms)?;
        }
        self.nav.tick(now_ms)?;
        Ok(signals)
    }

    /// Earliest pending session deadline, for hosts that sleep between
    /// ticks.
    pub fn next_deadline(&self) -> Option<u64> {
        self.session.next_deadline()
    }

    pub fn complete_content_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Box<dyn ContentView>>,
        now_ms: u64,
    ) -> Result<()> {
        self.nav.complete_content_load(ticket, result, now_ms)
    }

    pub fn content_initialized(&mut self, now_ms: u64) -> Result<()> {
        self.nav.content_initialized(now_ms)
    }
}
