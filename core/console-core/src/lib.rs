//! # console-core
//!
//! Core library for the console shell: history-token navigation and session
//! lifecycle, shared by every host front end (desktop shell, terminal
//! harness, tests).
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Time enters as explicit
//!   `now_ms` arguments and timers fire through `tick`; clients wrap with
//!   async if needed.
//! - **Not thread-safe**: Clients provide their own synchronization
//!   (`Mutex`, `RwLock`).
//! - **No globals**: Session and navigation state live on an explicitly
//!   constructed [`ConsoleContext`]; two contexts in one process stay
//!   independent.
//! - **Eager validation**: History tokens parse into typed segments up
//!   front; malformed links fail at the dispatch boundary with typed
//!   errors, not at some later point of use.
//! - **Graceful degradation**: Missing config or session files return
//!   defaults, not errors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use console_core::{ConsoleContext, load_config};
//!
//! let mut context = ConsoleContext::new(
//!     load_config(),
//!     service,
//!     store,
//!     registry,
//!     container,
//!     shell,
//! );
//! context.login(Some("admin"), Some(password), now_ms)?;
//! context.handle_history_change("Resource/10001/Operations", now_ms)?;
//! ```

// Public modules
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod nav;
pub mod path;
pub mod registry;
pub mod session;
pub mod sticky;
pub mod views;

// Re-export commonly used items at crate root
pub use config::{config_path, load_config, ConsoleConfig, CONFIG_FILE};
pub use context::ConsoleContext;
pub use error::{ConsoleError, Result};
pub use message::{Message, MessageCenter, Severity};
pub use nav::{view_path_title, NavigationCore, Shell, INITIALIZE_TIMEOUT_MS};
pub use path::{ViewId, ViewKey, ViewPath, STRING_ID_PREFIX};
pub use registry::{ContentOutcome, LoadTicket, StaticViewRegistry, ViewRegistry};
pub use session::{
    LoginOutcome, LoginPrompt, SessionManager, SessionService, SessionSignal, SessionState,
    SessionStore, Subject, KEEPALIVE_INTERVAL_MS, LOGOUT_DELAY_MS, SESSION_TIMEOUT_FLOOR_MS,
};
pub use sticky::{carry_suffix, SiblingClasses};
pub use views::{
    BookmarkableView, ContentContainer, ContentView, InitializableView, SimpleContainer,
};
