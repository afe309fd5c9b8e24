use std::borrow::Cow;

/// Construction options for a [`ResourceManager`](crate::ResourceManager).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManagerConfig {
    /// Tag attached to every log event of the manager.
    pub label: Cow<'static, str>,
    /// Number of entries to reserve up front.
    pub capacity: usize,
}

impl ManagerConfig {
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            label: Cow::Borrowed("resources"),
            capacity: 0,
        }
    }
}
