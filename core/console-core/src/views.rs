//! Capability traits at the seam between the navigation core and the screen
//! components it routes to.
//!
//! The core never inspects concrete component types. A component declares
//! what it can do by overriding the capability accessors:
//!
//! - [`BookmarkableView`]: consumes the remainder of a [`ViewPath`] and may
//!   itself be a nested state machine.
//! - [`InitializableView`]: construction finishes asynchronously; the core
//!   defers path forwarding until the component reports ready.
//!
//! [`ContentContainer`] owns the attached component tree. Destruction of one
//! child can cascade to siblings, so the core always re-queries the live
//! child list instead of iterating a snapshot.

use crate::error::Result;
use crate::path::ViewPath;

/// A screen component attachable to the content container.
pub trait ContentView {
    /// The top-level view name this component was built for.
    fn view_name(&self) -> &str;

    /// Plain redraw for components that do not consume path segments.
    fn redraw(&mut self) {}

    /// Capability accessor: path-consuming re-render. Default: not supported.
    fn as_bookmarkable(&mut self) -> Option<&mut dyn BookmarkableView> {
        None
    }

    /// Capability accessor: asynchronous initialization. Default: ready on
    /// construction.
    fn as_initializable(&self) -> Option<&dyn InitializableView> {
        None
    }
}

/// Screen components that handle further path segments.
pub trait BookmarkableView: ContentView {
    /// Called whenever the navigation core determines this component should
    /// handle the remaining segments, on first construction or on a
    /// same-top-level re-navigation.
    ///
    /// Returning [`ConsoleError::ViewSuperseded`](crate::ConsoleError::ViewSuperseded)
    /// signals a benign stale-render abort; any other error is a defect.
    fn render_view(&mut self, path: ViewPath) -> Result<()>;
}

/// Screen components whose construction completes asynchronously.
pub trait InitializableView: ContentView {
    fn is_initialized(&self) -> bool;
}

/// Owner of the attached component tree under the navigation core.
pub trait ContentContainer {
    fn child_count(&self) -> usize;

    /// Destroys the first live child. May cascade-destroy siblings; callers
    /// must re-check [`child_count`](Self::child_count) after every call.
    fn destroy_first_child(&mut self);

    fn attach_child(&mut self, view: Box<dyn ContentView>);

    /// The component navigation currently routes to, when one is attached.
    fn active_child(&mut self) -> Option<&mut dyn ContentView>;
}

/// Minimal vector-backed container for hosts and tests without a real
/// widget tree.
#[derive(Default)]
pub struct SimpleContainer {
    children: Vec<Box<dyn ContentView>>,
}

impl SimpleContainer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentContainer for SimpleContainer {
    fn child_count(&self) -> usize {
        self.children.len()
    }

    fn destroy_first_child(&mut self) {
        if !self.children.is_empty() {
            self.children.remove(0);
        }
    }

    fn attach_child(&mut self, view: Box<dyn ContentView>) {
        self.children.push(view);
    }

    fn active_child(&mut self) -> Option<&mut dyn ContentView> {
        self.children
            .last_mut()
            .map(|child| &mut **child as &mut dyn ContentView)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain(&'static str);

    impl ContentView for Plain {
        fn view_name(&self) -> &str {
            self.0
        }
    }

    struct Counting(usize);

    impl ContentView for Counting {
        fn view_name(&self) -> &str {
            "Counting"
        }

        fn redraw(&mut self) {
            self.0 += 1;
        }
    }

    #[test]
    fn simple_container_tracks_children() {
        let mut container = SimpleContainer::new();
        container.attach_child(Box::new(Plain("Dashboards")));
        container.attach_child(Box::new(Plain("Inventory")));
        assert_eq!(container.child_count(), 2);
        assert_eq!(
            container.active_child().map(|c| c.view_name().to_string()),
            Some("Inventory".to_string())
        );

        while container.child_count() > 0 {
            container.destroy_first_child();
        }
        assert!(container.active_child().is_none());
    }

    #[test]
    fn active_child_borrows_mutably() {
        let mut container = SimpleContainer::new();
        container.attach_child(Box::new(Counting(0)));

        // drive a mutation through the returned trait object
        for _ in 0..2 {
            let child = container.active_child().expect("child attached");
            child.redraw();
        }
        assert_eq!(
            container.active_child().map(|c| c.view_name().to_string()),
            Some("Counting".to_string())
        );
    }

    #[test]
    fn default_capabilities_are_absent() {
        let mut plain = Plain("Help");
        assert!(plain.as_initializable().is_none());
        assert!(plain.as_bookmarkable().is_none());
    }
}
