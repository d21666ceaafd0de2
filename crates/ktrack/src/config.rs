/// Which fields `track` converts when the caller names none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// Own enumerable fields at call time.
    #[default]
    Enumerable,
    /// Every own field reflection reports, enumerable or not.
    AllOwn,
}

/// Configuration for a [`PropertyTracker`](crate::PropertyTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Default field set for `track`.
    pub field_selection: FieldSelection,
    /// Whether installed accessor fields are enumerable.
    pub accessor_enumerable: bool,
    /// Whether installed accessor fields stay configurable. When false, a
    /// field cannot be tracked a second time.
    pub accessor_configurable: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            field_selection: FieldSelection::Enumerable,
            accessor_enumerable: true,
            accessor_configurable: true,
        }
    }
}

impl TrackerConfig {
    #[must_use]
    pub fn with_field_selection(mut self, selection: FieldSelection) -> Self {
        self.field_selection = selection;
        self
    }

    #[must_use]
    pub fn with_accessor_enumerable(mut self, enumerable: bool) -> Self {
        self.accessor_enumerable = enumerable;
        self
    }

    #[must_use]
    pub fn with_accessor_configurable(mut self, configurable: bool) -> Self {
        self.accessor_configurable = configurable;
        self
    }
}
