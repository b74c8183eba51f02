use tracing::debug;

/// Push-style navigation collaborator.
pub trait Navigator {
    /// Move to `target`, adding a history entry.
    fn push(&mut self, target: &str);

    /// The location currently shown.
    fn location(&self) -> &str;
}

/// Result of [`UnsavedChangeTracker::safe_navigate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The form was clean and navigation happened immediately.
    Navigated { target: String },
    /// The form is dirty; the target is pending until confirmed or cancelled.
    ConfirmationRequired { target: String },
}

/// Result of a back/forward action reported to the history guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryDecision {
    Proceed,
    /// The user declined; the location was pinned back to `location`.
    Repinned { location: String },
}

/// Guards a form against being left while it has unsaved changes.
pub struct UnsavedChangeTracker<N> {
    navigator: N,
    dirty: bool,
    pending: Option<String>,
}

impl<N: Navigator> UnsavedChangeTracker<N> {
    pub fn new(navigator: N) -> Self {
        Self {
            navigator,
            dirty: false,
            pending: None,
        }
    }

    pub fn set_has_unsaved_changes(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Navigate now if the form is clean; otherwise hold `target` and ask for
    /// confirmation. A newer target replaces an older pending one.
    pub fn safe_navigate(&mut self, target: &str) -> NavigationOutcome {
        if !self.dirty {
            self.navigator.push(target);
            return NavigationOutcome::Navigated {
                target: target.to_string(),
            };
        }

        if let Some(previous) = self.pending.replace(target.to_string()) {
            debug!(previous = %previous, target, "Pending navigation superseded");
        }
        NavigationOutcome::ConfirmationRequired {
            target: target.to_string(),
        }
    }

    /// Leave for the pending target, abandoning unsaved changes.
    ///
    /// Returns the target navigated to, or `None` when nothing was pending.
    pub fn confirm_navigation(&mut self) -> Option<String> {
        let target = self.pending.take()?;
        self.dirty = false;
        self.navigator.push(&target);
        Some(target)
    }

    /// Dismiss the prompt and stay. Dirty flag and location are unchanged.
    pub fn cancel_navigation(&mut self) {
        self.pending = None;
    }

    pub fn pending_target(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn is_prompt_visible(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a tab close or reload should trigger the platform's native
    /// "leave site?" confirmation.
    pub fn should_block_exit(&self) -> bool {
        self.dirty
    }

    /// Back/forward guard. History has already moved from `leaving` to
    /// `destination`; when the form is dirty `confirm` decides whether to
    /// accept that or to pin the location back.
    pub fn on_history_navigation(
        &mut self,
        leaving: &str,
        destination: &str,
        confirm: impl FnOnce() -> bool,
    ) -> HistoryDecision {
        if !self.dirty || confirm() {
            self.dirty = false;
            self.pending = None;
            self.follow(destination);
            return HistoryDecision::Proceed;
        }

        self.follow(leaving);
        HistoryDecision::Repinned {
            location: leaving.to_string(),
        }
    }

    /// Push `location` unless the navigator already shows it.
    fn follow(&mut self, location: &str) {
        if self.navigator.location() != location {
            self.navigator.push(location);
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }
}

/// In-process mirror of the browser location and its history.
#[derive(Debug, Clone)]
pub struct RouteNavigator {
    history: Vec<String>,
}

impl RouteNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            history: vec![location.into()],
        }
    }

    /// Every location visited, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl Navigator for RouteNavigator {
    fn push(&mut self, target: &str) {
        self.history.push(target.to_string());
    }

    fn location(&self) -> &str {
        // `new` always seeds one entry.
        self.history.last().map(String::as_str).unwrap_or("/")
    }
}
