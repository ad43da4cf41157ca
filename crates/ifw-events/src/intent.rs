use std::collections::HashSet;

use crate::Component;

/// The data URI carried by an intent, split into the parts the predicate
/// tree's string-match leaves inspect.
///
/// Scheme and host are normalized per URI rules (lowercased); MIME types are
/// lowercased; everything else keeps the caller's casing, per §4.A.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntentData {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    /// The scheme-specific part (everything between `scheme:` and `#fragment`).
    pub ssp: Option<String>,
    /// The full data string as the caller gave it, for the `data` leaf.
    pub full: Option<String>,
}

/// A structured dispatch payload: action, data, categories, MIME type,
/// flags, and optional explicit target component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Intent {
    pub action: Option<String>,
    pub categories: HashSet<String>,
    pub data: Option<IntentData>,
    pub mime_type: Option<String>,
    pub flags: u32,
    pub explicit_component: Option<Component>,
}

impl Intent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn with_data(mut self, data: IntentData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into().to_lowercase());
        self
    }

    pub fn with_explicit_component(mut self, component: Component) -> Self {
        self.explicit_component = Some(component);
        self
    }
}
