//! View registry: maps a top-level view name to its screen component.
//!
//! Construction may be synchronous or deferred (the original console
//! lazy-loads each top-level screen as a separate code fragment). A deferred
//! registry hands back a ticket; the host resolves it later through
//! [`NavigationCore::complete_content_load`](crate::nav::NavigationCore::complete_content_load).

use std::collections::HashMap;

use crate::views::ContentView;

/// Identifies one in-flight deferred content construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub u64);

/// Result of asking the registry for a view's content.
pub enum ContentOutcome {
    /// Component constructed synchronously.
    Ready(Box<dyn ContentView>),
    /// Construction is in flight; the host will deliver the result.
    Deferred(LoadTicket),
    /// No such view is registered.
    Unknown,
}

/// Content factory contract consumed by the navigation core.
pub trait ViewRegistry {
    fn create_content(&mut self, view_name: &str) -> ContentOutcome;
}

type Factory = Box<dyn FnMut() -> Box<dyn ContentView>>;

/// Registry over synchronous constructor closures.
#[derive(Default)]
pub struct StaticViewRegistry {
    factories: HashMap<String, Factory>,
}

impl StaticViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, view_name: impl Into<String>, factory: F)
    where
        F: FnMut() -> Box<dyn ContentView> + 'static,
    {
        self.factories.insert(view_name.into(), Box::new(factory));
    }

    pub fn is_registered(&self, view_name: &str) -> bool {
        self.factories.contains_key(view_name)
    }
}

impl ViewRegistry for StaticViewRegistry {
    fn create_content(&mut self, view_name: &str) -> ContentOutcome {
        match self.factories.get_mut(view_name) {
            Some(factory) => ContentOutcome::Ready(factory()),
            None => {
                tracing::debug!(view = %view_name, "No registered factory for view");
                ContentOutcome::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(&'static str);

    impl ContentView for Stub {
        fn view_name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn registered_views_construct() {
        let mut registry = StaticViewRegistry::new();
        registry.register("Dashboards", || Box::new(Stub("Dashboards")));

        match registry.create_content("Dashboards") {
            ContentOutcome::Ready(view) => assert_eq!(view.view_name(), "Dashboards"),
            _ => panic!("expected ready content"),
        }
    }

    #[test]
    fn unknown_views_are_sentinel() {
        let mut registry = StaticViewRegistry::new();
        assert!(matches!(
            registry.create_content("Nope"),
            ContentOutcome::Unknown
        ));
    }
}
