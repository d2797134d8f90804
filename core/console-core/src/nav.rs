//! The navigation core: dispatches history-token changes into the content
//! container.
//!
//! Dispatch is re-entrant-safe and ordered: the logged-out gate runs first,
//! then the token is parsed eagerly (malformed links fail here, with typed
//! errors, not at some later point of use), then the top-level segment is
//! compared against the current view identity. An unchanged identity
//! forwards the path remainder into the existing component; a changed one
//! tears the container down and builds the new top-level content.
//!
//! Content construction may be deferred (hosts lazy-load screens). Every
//! top-level replacement bumps a generation counter and a stale completion
//! is discarded instead of clobbering newer navigation. Components whose
//! initialization finishes asynchronously are attached immediately but the
//! path is withheld until they report ready, bounded by a timeout that is
//! surfaced rather than silently dropped.

use tracing::{debug, error, info, warn};

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::message::{Message, MessageCenter};
use crate::path::{ViewId, ViewPath};
use crate::registry::{ContentOutcome, LoadTicket, ViewRegistry};
use crate::sticky::{carry_suffix, SiblingClasses};
use crate::views::{ContentContainer, ContentView};

/// How long an attached component may take to report initialized before the
/// wait is abandoned and surfaced as an error.
pub const INITIALIZE_TIMEOUT_MS: u64 = 10 * 1000;

/// Host shell surface the navigation core drives. Implementations update the
/// address bar, the window chrome, and user-facing alerts.
pub trait Shell {
    fn set_window_title(&mut self, title: &str);

    /// Records `token` as the current history entry. `navigate` mirrors the
    /// browser distinction between replacing the address and actually
    /// dispatching; the core always dispatches itself, so this is
    /// notification only.
    fn push_history(&mut self, token: &str, navigate: bool);

    /// Modal user-facing alert for failures that must not be missed.
    fn alert(&mut self, text: &str);
}

struct PendingLoad {
    ticket: LoadTicket,
    generation: u64,
    path: ViewPath,
}

struct PendingRender {
    path: ViewPath,
    deadline_ms: u64,
}

/// Routes history tokens to content. One instance per application shell,
/// owned by the context; there is no global.
pub struct NavigationCore {
    config: ConsoleConfig,
    siblings: SiblingClasses,
    registry: Box<dyn ViewRegistry>,
    container: Box<dyn ContentContainer>,
    shell: Box<dyn Shell>,
    messages: MessageCenter,
    current_view_id: Option<ViewId>,
    current_path: Option<ViewPath>,
    pending_message: Option<Message>,
    pending_refresh: bool,
    generation: u64,
    pending_load: Option<PendingLoad>,
    pending_render: Option<PendingRender>,
}

impl NavigationCore {
    pub fn new(
        config: ConsoleConfig,
        registry: Box<dyn ViewRegistry>,
        container: Box<dyn ContentContainer>,
        shell: Box<dyn Shell>,
    ) -> Self {
        let siblings = SiblingClasses::new(config.sibling_classes.clone());
        Self {
            config,
            siblings,
            registry,
            container,
            shell,
            messages: MessageCenter::new(),
            current_view_id: None,
            current_path: None,
            pending_message: None,
            pending_refresh: false,
            generation: 0,
            pending_load: None,
            pending_render: None,
        }
    }

    pub fn messages(&self) -> &MessageCenter {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut MessageCenter {
        &mut self.messages
    }

    pub fn current_view_id(&self) -> Option<&ViewId> {
        self.current_view_id.as_ref()
    }

    pub fn current_token(&self) -> Option<String> {
        self.current_path.as_ref().map(ViewPath::token)
    }

    /// Drops all navigation state, e.g. across a user change, so the next
    /// dispatch rebuilds from scratch.
    pub fn reset(&mut self) {
        self.current_view_id = None;
        self.current_path = None;
        self.pending_message = None;
        self.pending_refresh = false;
        self.pending_load = None;
        self.pending_render = None;
        self.generation += 1;
        self.messages.reset();
        while self.container.child_count() > 0 {
            self.container.destroy_first_child();
        }
    }

    /// Dispatches a history-token change. `logged_in` gates the whole
    /// pipeline: without a session the token is parked on the logout
    /// sentinel and nothing renders.
    pub fn handle_history_change(
        &mut self,
        token: &str,
        logged_in: bool,
        now_ms: u64,
    ) -> Result<()> {
        if !logged_in {
            // Park the address on the logout sentinel without dispatching;
            // the post-login dispatch starts from a clean token.
            let logout_view = self.config.logout_view.clone();
            self.shell.push_history(&logout_view, false);
            return Ok(());
        }

        let mut path = ViewPath::parse(token)?;

        if path.is_empty() {
            let default_view = self.config.default_view.clone();
            debug!(view = %default_view, "Empty token; routing to default view");
            self.shell.push_history(&default_view, true);
            return self.handle_history_change(&default_view, logged_in, now_ms);
        }

        if self.pending_refresh {
            path.set_refresh(true);
            self.pending_refresh = false;
        }

        info!(token = %path.token(), refresh = path.is_refresh(), "Dispatching view");

        let title = view_path_title(&self.config.product_name, &path);
        self.shell.set_window_title(&title);

        if !path.is_refresh() {
            // The user moved on; a lingering message bar would mislead.
            self.messages.clear_transient();
        }
        if let Some(message) = self.pending_message.take() {
            self.messages.notify(message);
        }

        let top = path
            .current()
            .cloned()
            .ok_or_else(|| ConsoleError::UnknownView(String::new()))?;

        let same_view = self.current_view_id.as_ref() == Some(&top);
        self.current_path = Some(path.clone());

        if same_view && self.pending_load.is_none() {
            self.current_view_id = Some(top);
            // Initialization still pending: withhold the newest path too.
            if let Some(pending) = &mut self.pending_render {
                pending.path = path;
                return Ok(());
            }
            return self.forward(path, now_ms);
        }

        // Same top-level view with a load still in flight: the newest path
        // wins when the load lands.
        if let Some(pending) = &mut self.pending_load {
            if pending
                .path
                .current()
                .map(|segment| segment == &top)
                .unwrap_or(false)
            {
                pending.path = path;
                self.current_view_id = Some(top);
                return Ok(());
            }
        }

        self.replace_content(top, path, now_ms)
    }

    fn replace_content(&mut self, top: ViewId, path: ViewPath, now_ms: u64) -> Result<()> {
        // Any in-flight load or initialization wait belongs to the view
        // being replaced.
        self.generation += 1;
        self.pending_load = None;
        self.pending_render = None;

        // Destroying one child can cascade to siblings, so re-query the
        // live count every iteration instead of iterating a snapshot.
        while self.container.child_count() > 0 {
            self.container.destroy_first_child();
        }

        let view_name = top.name().to_string();
        self.current_view_id = Some(top);

        match self.registry.create_content(&view_name) {
            ContentOutcome::Ready(view) => self.attach_and_render(view, path, now_ms),
            ContentOutcome::Deferred(ticket) => {
                debug!(view = %view_name, ticket = ticket.0, "Content load deferred");
                self.pending_load = Some(PendingLoad {
                    ticket,
                    generation: self.generation,
                    path,
                });
                Ok(())
            }
            ContentOutcome::Unknown => {
                self.current_view_id = None;
                self.messages
                    .notify(Message::error(format!("Unknown view: {}", view_name)));
                error!(view = %view_name, "No content registered for view");
                Err(ConsoleError::UnknownView(view_name))
            }
        }
    }

    /// Delivers the result of a deferred content load. Completions whose
    /// ticket no longer matches the in-flight load are stale leftovers of
    /// superseded navigation and are dropped.
    pub fn complete_content_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Box<dyn ContentView>>,
        now_ms: u64,
    ) -> Result<()> {
        let pending = match &self.pending_load {
            Some(pending) if pending.ticket == ticket && pending.generation == self.generation => {
                // take() after the guard so a stale completion leaves the
                // live one untouched
                self.pending_load.take().ok_or_else(|| {
                    ConsoleError::service("content load", "pending load vanished")
                })?
            }
            _ => {
                debug!(ticket = ticket.0, "Discarding stale content load");
                return Ok(());
            }
        };

        let view_name = pending
            .path
            .current()
            .map(|segment| segment.name().to_string())
            .unwrap_or_default();

        match result {
            Ok(view) => self.attach_and_render(view, pending.path, now_ms),
            Err(err) => {
                self.current_view_id = None;
                let text = format!("Failed to load content for view {}: {}", view_name, err);
                self.shell.alert(&text);
                self.messages.notify(Message::error(text));
                error!(view = %view_name, error = %err, "Content load failed");
                Err(ConsoleError::ContentLoadFailed {
                    view: view_name,
                    details: err.to_string(),
                })
            }
        }
    }

    fn attach_and_render(
        &mut self,
        view: Box<dyn ContentView>,
        path: ViewPath,
        now_ms: u64,
    ) -> Result<()> {
        let ready = view
            .as_initializable()
            .map(|init| init.is_initialized())
            .unwrap_or(true);
        self.container.attach_child(view);

        if ready {
            self.forward(path, now_ms)
        } else {
            debug!(token = %path.token(), "Content attached; waiting for initialization");
            self.pending_render = Some(PendingRender {
                path,
                deadline_ms: now_ms + INITIALIZE_TIMEOUT_MS,
            });
            Ok(())
        }
    }

    /// Push-style readiness notification from an attached component.
    pub fn content_initialized(&mut self, now_ms: u64) -> Result<()> {
        match self.pending_render.take() {
            Some(pending) => self.forward(pending.path, now_ms),
            None => Ok(()),
        }
    }

    /// Poll-style readiness check plus the initialization-timeout watchdog.
    /// Hosts without a push notification call this from their event loop.
    pub fn tick(&mut self, now_ms: u64) -> Result<()> {
        let Some(pending) = &self.pending_render else {
            return Ok(());
        };

        let initialized = self
            .container
            .active_child()
            .and_then(|child| child.as_initializable())
            .map(|init| init.is_initialized())
            .unwrap_or(true);

        if initialized {
            return self.content_initialized(now_ms);
        }

        if now_ms >= pending.deadline_ms {
            let pending = self.pending_render.take().ok_or_else(|| {
                ConsoleError::service("initialize wait", "pending render vanished")
            })?;
            let view = pending
                .path
                .current()
                .map(|segment| segment.name().to_string())
                .unwrap_or_default();
            self.messages.notify(Message::error(format!(
                "View {} did not finish initializing",
                view
            )));
            error!(view = %view, timeout_ms = INITIALIZE_TIMEOUT_MS, "Initialization wait abandoned");
            return Err(ConsoleError::InitializeTimeout {
                view,
                timeout_ms: INITIALIZE_TIMEOUT_MS,
            });
        }

        Ok(())
    }

    fn forward(&mut self, path: ViewPath, _now_ms: u64) -> Result<()> {
        let child = match self.container.active_child() {
            Some(child) => child,
            None => {
                warn!(token = %path.token(), "No content attached; dropping dispatch");
                return Ok(());
            }
        };

        match child.as_bookmarkable() {
            Some(bookmarkable) => match bookmarkable.render_view(path.next()) {
                Err(ConsoleError::ViewSuperseded { obsolete_view }) => {
                    // newer navigation replaced it mid-render
                    debug!(view = %obsolete_view, "Stale render aborted");
                    Ok(())
                }
                other => other,
            },
            None => {
                child.redraw();
                Ok(())
            }
        }
    }

    /// Programmatic navigation. Applies sibling stickiness when the target
    /// is a bare entity segment and queues `message` for delivery on the
    /// dispatch this triggers. A target matching the current token
    /// re-renders in place instead of pushing a history entry.
    pub fn go_to_view(
        &mut self,
        target: &str,
        message: Option<Message>,
        refresh: bool,
        logged_in: bool,
        now_ms: u64,
    ) -> Result<()> {
        let target = target.strip_prefix('#').unwrap_or(target);
        let mut target_path = ViewPath::parse(target)?;

        if let Some(current) = &self.current_path {
            let carried = carry_suffix(&self.siblings, current, &target_path);
            if !carried.is_empty() {
                debug!(
                    carried = %ViewPath::from_segments(carried.clone()).token(),
                    "Carrying sibling view suffix"
                );
                let mut segments = target_path.segments().to_vec();
                segments.extend(carried);
                target_path = ViewPath::from_segments(segments);
            }
        }

        self.pending_message = message;
        let token = target_path.token();

        if self.current_token().as_deref() == Some(token.as_str()) {
            // Already at the target: re-render in place so the queued
            // message still gets delivered.
            self.pending_refresh = true;
        } else {
            self.pending_refresh = refresh;
            self.shell.push_history(&token, true);
        }

        self.handle_history_change(&token, logged_in, now_ms)
    }

    /// Re-renders the current view in place, e.g. after a locale or
    /// permission change.
    pub fn refresh_current(&mut self, logged_in: bool, now_ms: u64) -> Result<()> {
        let token = match self.current_token() {
            Some(token) => token,
            None => return Ok(()),
        };
        self.pending_refresh = true;
        self.handle_history_change(&token, logged_in, now_ms)
    }
}

/// Window title for a view path: the product name plus the named segments.
/// Identifier keys are never user-facing; they stay out of the title.
pub fn view_path_title(product_name: &str, path: &ViewPath) -> String {
    let names: Vec<&str> = path.segments().iter().map(ViewId::name).collect();
    if names.is_empty() {
        product_name.to_string()
    } else {
        format!("{} | {}", product_name, names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticViewRegistry;
    use crate::views::{BookmarkableView, InitializableView, SimpleContainer};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct ShellLog {
        titles: Vec<String>,
        history: Vec<(String, bool)>,
        alerts: Vec<String>,
    }

    #[derive(Default, Clone)]
    struct RecordingShell(Rc<RefCell<ShellLog>>);

    impl Shell for RecordingShell {
        fn set_window_title(&mut self, title: &str) {
            self.0.borrow_mut().titles.push(title.to_string());
        }

        fn push_history(&mut self, token: &str, navigate: bool) {
            self.0.borrow_mut().history.push((token.to_string(), navigate));
        }

        fn alert(&mut self, text: &str) {
            self.0.borrow_mut().alerts.push(text.to_string());
        }
    }

    #[derive(Default)]
    struct RenderLog {
        rendered: Vec<String>,
        redraws: usize,
    }

    struct PageView {
        name: String,
        log: Rc<RefCell<RenderLog>>,
    }

    impl ContentView for PageView {
        fn view_name(&self) -> &str {
            &self.name
        }

        fn as_bookmarkable(&mut self) -> Option<&mut dyn BookmarkableView> {
            Some(self)
        }
    }

    impl BookmarkableView for PageView {
        fn render_view(&mut self, path: ViewPath) -> crate::error::Result<()> {
            self.log.borrow_mut().rendered.push(format!(
                "{}@{}:{}",
                self.name,
                path.index(),
                path.token()
            ));
            Ok(())
        }
    }

    struct PlainView {
        name: String,
        log: Rc<RefCell<RenderLog>>,
    }

    impl ContentView for PlainView {
        fn view_name(&self) -> &str {
            &self.name
        }

        fn redraw(&mut self) {
            self.log.borrow_mut().redraws += 1;
        }
    }

    struct SlowView {
        name: String,
        initialized: Rc<RefCell<bool>>,
        log: Rc<RefCell<RenderLog>>,
    }

    impl ContentView for SlowView {
        fn view_name(&self) -> &str {
            &self.name
        }

        fn as_bookmarkable(&mut self) -> Option<&mut dyn BookmarkableView> {
            Some(self)
        }

        fn as_initializable(&self) -> Option<&dyn InitializableView> {
            Some(self)
        }
    }

    impl BookmarkableView for SlowView {
        fn render_view(&mut self, path: ViewPath) -> crate::error::Result<()> {
            self.log.borrow_mut().rendered.push(path.token());
            Ok(())
        }
    }

    impl InitializableView for SlowView {
        fn is_initialized(&self) -> bool {
            *self.initialized.borrow()
        }
    }

    struct DeferringRegistry {
        next_ticket: u64,
        issued: Vec<LoadTicket>,
    }

    impl ViewRegistry for DeferringRegistry {
        fn create_content(&mut self, _view_name: &str) -> ContentOutcome {
            let ticket = LoadTicket(self.next_ticket);
            self.next_ticket += 1;
            self.issued.push(ticket);
            ContentOutcome::Deferred(ticket)
        }
    }

    fn page_registry(log: &Rc<RefCell<RenderLog>>, names: &[&str]) -> StaticViewRegistry {
        let mut registry = StaticViewRegistry::new();
        for name in names {
            let name = name.to_string();
            let log = Rc::clone(log);
            registry.register(name.clone(), move || {
                Box::new(PageView {
                    name: name.clone(),
                    log: Rc::clone(&log),
                })
            });
        }
        registry
    }

    fn core_with(registry: Box<dyn ViewRegistry>, shell: RecordingShell) -> NavigationCore {
        NavigationCore::new(
            ConsoleConfig::default(),
            registry,
            Box::new(SimpleContainer::new()),
            Box::new(shell),
        )
    }

    #[test]
    fn empty_token_routes_to_default_view() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Dashboards"])), shell.clone());

        core.handle_history_change("", true, 0).expect("dispatch");

        let shell_log = shell.0.borrow();
        assert_eq!(
            shell_log.history.first(),
            Some(&("Dashboards".to_string(), true))
        );
        assert_eq!(log.borrow().rendered, vec!["Dashboards@1:Dashboards"]);
    }

    #[test]
    fn logged_out_parks_on_logout_sentinel() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Dashboards"])), shell.clone());

        core.handle_history_change("Dashboards", false, 0)
            .expect("dispatch");

        let shell_log = shell.0.borrow();
        assert_eq!(shell_log.history, vec![("LogOut".to_string(), false)]);
        assert!(log.borrow().rendered.is_empty());
    }

    #[test]
    fn window_title_follows_named_segments() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Resource"])), shell.clone());

        core.handle_history_change("Resource/10001/Operations", true, 0)
            .expect("dispatch");

        assert_eq!(
            shell.0.borrow().titles.last().map(String::as_str),
            Some("Console | Resource | Operations")
        );
    }

    #[test]
    fn same_top_level_view_is_reused() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Resource"])), shell);

        core.handle_history_change("Resource/10001/Operations", true, 0)
            .expect("dispatch");
        core.handle_history_change("Resource/10001/Inventory", true, 0)
            .expect("dispatch");

        let rendered = log.borrow().rendered.clone();
        assert_eq!(
            rendered,
            vec![
                "Resource@1:Resource/10001/Operations",
                "Resource@1:Resource/10001/Inventory",
            ]
        );
    }

    #[test]
    fn key_change_rebuilds_the_view() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Resource"])), shell);

        core.handle_history_change("Resource/10001", true, 0)
            .expect("dispatch");
        // different entity: same name, different key, so identity differs
        core.handle_history_change("Resource/10002", true, 0)
            .expect("dispatch");

        assert_eq!(log.borrow().rendered.len(), 2);
        assert_eq!(
            core.current_view_id().map(|id| id.token()),
            Some("Resource/10002".to_string())
        );
    }

    #[test]
    fn unknown_view_is_surfaced() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Dashboards"])), shell);

        let err = core
            .handle_history_change("Nonexistent", true, 0)
            .expect_err("must fail");
        assert!(matches!(err, ConsoleError::UnknownView(name) if name == "Nonexistent"));
        assert_eq!(core.messages_mut().drain().len(), 1);
    }

    #[test]
    fn malformed_token_is_rejected_before_rendering() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Resource"])), shell);

        let err = core
            .handle_history_change("Resource/10x01", true, 0)
            .expect_err("must fail");
        assert!(matches!(err, ConsoleError::MalformedSegment { .. }));
        assert!(log.borrow().rendered.is_empty());
    }

    #[test]
    fn plain_views_redraw_without_path() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut registry = StaticViewRegistry::new();
        {
            let log = Rc::clone(&log);
            registry.register("Help", move || {
                Box::new(PlainView {
                    name: "Help".to_string(),
                    log: Rc::clone(&log),
                })
            });
        }
        let mut core = core_with(Box::new(registry), shell);

        core.handle_history_change("Help", true, 0).expect("dispatch");
        core.handle_history_change("Help/Docs", true, 0)
            .expect("dispatch");

        assert_eq!(log.borrow().redraws, 2);
    }

    #[test]
    fn deferred_load_renders_when_it_lands() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let registry = DeferringRegistry {
            next_ticket: 1,
            issued: Vec::new(),
        };
        let mut core = core_with(Box::new(registry), shell);

        core.handle_history_change("Resource/10001/Operations", true, 0)
            .expect("dispatch");
        assert!(log.borrow().rendered.is_empty());

        core.complete_content_load(
            LoadTicket(1),
            Ok(Box::new(PageView {
                name: "Resource".to_string(),
                log: Rc::clone(&log),
            })),
            100,
        )
        .expect("complete");

        assert_eq!(
            log.borrow().rendered,
            vec!["Resource@1:Resource/10001/Operations"]
        );
    }

    #[test]
    fn stale_load_is_discarded_after_newer_navigation() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let registry = DeferringRegistry {
            next_ticket: 1,
            issued: Vec::new(),
        };
        let mut core = core_with(Box::new(registry), shell);

        core.handle_history_change("Resource/10001", true, 0)
            .expect("dispatch");
        // user navigates on before the first load lands
        core.handle_history_change("Dashboards", true, 0)
            .expect("dispatch");

        core.complete_content_load(
            LoadTicket(1),
            Ok(Box::new(PageView {
                name: "Resource".to_string(),
                log: Rc::clone(&log),
            })),
            100,
        )
        .expect("stale completion is not an error");

        // only the newer load may render
        core.complete_content_load(
            LoadTicket(2),
            Ok(Box::new(PageView {
                name: "Dashboards".to_string(),
                log: Rc::clone(&log),
            })),
            100,
        )
        .expect("complete");

        assert_eq!(log.borrow().rendered, vec!["Dashboards@1:Dashboards"]);
    }

    #[test]
    fn latest_path_wins_while_load_is_in_flight() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let registry = DeferringRegistry {
            next_ticket: 1,
            issued: Vec::new(),
        };
        let mut core = core_with(Box::new(registry), shell);

        core.handle_history_change("Resource/10001/Operations", true, 0)
            .expect("dispatch");
        core.handle_history_change("Resource/10001/Inventory", true, 0)
            .expect("dispatch");

        core.complete_content_load(
            LoadTicket(1),
            Ok(Box::new(PageView {
                name: "Resource".to_string(),
                log: Rc::clone(&log),
            })),
            100,
        )
        .expect("complete");

        assert_eq!(
            log.borrow().rendered,
            vec!["Resource@1:Resource/10001/Inventory"]
        );
    }

    #[test]
    fn failed_load_alerts_the_user() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let registry = DeferringRegistry {
            next_ticket: 1,
            issued: Vec::new(),
        };
        let mut core = core_with(Box::new(registry), shell.clone());

        core.handle_history_change("Resource/10001", true, 0)
            .expect("dispatch");
        let err = core
            .complete_content_load(
                LoadTicket(1),
                Err(ConsoleError::service("fragment download", "http 500")),
                100,
            )
            .expect_err("must fail");

        assert!(matches!(err, ConsoleError::ContentLoadFailed { .. }));
        assert_eq!(shell.0.borrow().alerts.len(), 1);
        assert!(log.borrow().rendered.is_empty());
    }

    #[test]
    fn uninitialized_content_waits_for_readiness() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let initialized = Rc::new(RefCell::new(false));
        let shell = RecordingShell::default();
        let mut registry = StaticViewRegistry::new();
        {
            let log = Rc::clone(&log);
            let initialized = Rc::clone(&initialized);
            registry.register("Inventory", move || {
                Box::new(SlowView {
                    name: "Inventory".to_string(),
                    initialized: Rc::clone(&initialized),
                    log: Rc::clone(&log),
                })
            });
        }
        let mut core = core_with(Box::new(registry), shell);

        core.handle_history_change("Inventory/Servers", true, 0)
            .expect("dispatch");
        assert!(log.borrow().rendered.is_empty());

        // still not ready
        core.tick(5_000).expect("tick");
        assert!(log.borrow().rendered.is_empty());

        *initialized.borrow_mut() = true;
        core.tick(6_000).expect("tick");
        assert_eq!(log.borrow().rendered, vec!["Inventory/Servers"]);
    }

    #[test]
    fn initialization_timeout_is_surfaced() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let initialized = Rc::new(RefCell::new(false));
        let shell = RecordingShell::default();
        let mut registry = StaticViewRegistry::new();
        {
            let log = Rc::clone(&log);
            let initialized = Rc::clone(&initialized);
            registry.register("Inventory", move || {
                Box::new(SlowView {
                    name: "Inventory".to_string(),
                    initialized: Rc::clone(&initialized),
                    log: Rc::clone(&log),
                })
            });
        }
        let mut core = core_with(Box::new(registry), shell);

        core.handle_history_change("Inventory", true, 0)
            .expect("dispatch");
        let err = core.tick(INITIALIZE_TIMEOUT_MS).expect_err("must time out");
        assert!(matches!(err, ConsoleError::InitializeTimeout { .. }));
        assert_eq!(core.messages_mut().drain().len(), 1);
        // watchdog is one-shot
        core.tick(INITIALIZE_TIMEOUT_MS + 1).expect("tick");
    }

    #[test]
    fn go_to_view_carries_sibling_suffix() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(
            Box::new(page_registry(&log, &["Resource", "AutoGroup"])),
            shell.clone(),
        );

        core.handle_history_change("Resource/10001/Operations/History", true, 0)
            .expect("dispatch");
        core.go_to_view("AutoGroup/10003", None, false, true, 0)
            .expect("navigate");

        assert_eq!(
            core.current_token().as_deref(),
            Some("AutoGroup/10003/Operations/History")
        );
        let history = shell.0.borrow().history.clone();
        assert!(history.contains(&("AutoGroup/10003/Operations/History".to_string(), true)));
    }

    #[test]
    fn go_to_view_same_token_refreshes_in_place() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Dashboards"])), shell.clone());

        core.handle_history_change("Dashboards", true, 0)
            .expect("dispatch");
        let pushes_before = shell.0.borrow().history.len();

        core.go_to_view("Dashboards", None, true, true, 0)
            .expect("navigate");

        // rendered twice, but no new history entry
        assert_eq!(log.borrow().rendered.len(), 2);
        assert_eq!(shell.0.borrow().history.len(), pushes_before);
    }

    #[test]
    fn go_to_view_same_token_delivers_the_message() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(Box::new(page_registry(&log, &["Dashboards"])), shell.clone());

        core.handle_history_change("Dashboards", true, 0)
            .expect("dispatch");
        let pushes_before = shell.0.borrow().history.len();

        // no refresh requested, but the message must not sit queued forever
        core.go_to_view("Dashboards", Some(Message::info("saved")), false, true, 0)
            .expect("navigate");

        assert_eq!(core.messages_mut().drain().len(), 1);
        assert_eq!(log.borrow().rendered.len(), 2);
        assert_eq!(shell.0.borrow().history.len(), pushes_before);
    }

    #[test]
    fn pending_message_is_delivered_once() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(
            Box::new(page_registry(&log, &["Dashboards", "Resource"])),
            shell,
        );

        core.handle_history_change("Dashboards", true, 0)
            .expect("dispatch");
        core.go_to_view(
            "#Resource/10001",
            Some(Message::info("Resource deleted")),
            false,
            true,
            0,
        )
        .expect("navigate");

        assert_eq!(core.messages_mut().drain().len(), 1);
        core.handle_history_change("Dashboards", true, 0)
            .expect("dispatch");
        assert_eq!(core.messages_mut().drain().len(), 0);
    }

    #[test]
    fn navigation_clears_the_transient_message() {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let shell = RecordingShell::default();
        let mut core = core_with(
            Box::new(page_registry(&log, &["Dashboards", "Resource"])),
            shell,
        );

        core.handle_history_change("Dashboards", true, 0)
            .expect("dispatch");
        core.messages_mut().set_transient(Message::info("saved"));

        // a refresh keeps the bar
        core.refresh_current(true, 0).expect("refresh");
        assert!(core.messages().transient().is_some());

        // moving on wipes it
        core.handle_history_change("Resource/10001", true, 0)
            .expect("dispatch");
        assert!(core.messages().transient().is_none());
    }
}
