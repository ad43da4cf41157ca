use std::fmt;

/// A fully-qualified component: the package that owns it and the class name
/// within that package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    pub package: String,
    pub class: String,
}

impl Component {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }

    /// Parses the flattened `pkg/.Cls` or `pkg/pkg.Cls` form used in
    /// `component-filter` attributes and audit short-component fields.
    ///
    /// A class starting with `.` is expanded against the package name, same
    /// as the platform's own `ComponentName.unflattenFromString`.
    pub fn parse(flattened: &str) -> Option<Self> {
        let (package, class) = flattened.split_once('/')?;
        if package.is_empty() || class.is_empty() {
            return None;
        }
        let class = if let Some(rest) = class.strip_prefix('.') {
            format!("{package}.{rest}")
        } else {
            class.to_string()
        };
        Some(Self {
            package: package.to_string(),
            class,
        })
    }

    /// Renders the `pkg/Cls` flattened form (used for audit records).
    pub fn flatten(&self) -> String {
        format!("{}/{}", self.package, self.class)
    }

    /// The short component form used in audit records: `pkg/.Cls` when the
    /// class is nested under the package, `pkg/Cls` otherwise.
    pub fn short(&self) -> String {
        if let Some(rest) = self.class.strip_prefix(&format!("{}.", self.package)) {
            format!("{}/.{}", self.package, rest)
        } else {
            self.flatten()
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_class() {
        let c = Component::parse("com.x/.Z").unwrap();
        assert_eq!(c.package, "com.x");
        assert_eq!(c.class, "com.x.Z");
        assert_eq!(c.short(), "com.x/.Z");
    }

    #[test]
    fn parses_fully_qualified_class() {
        let c = Component::parse("com.x/com.y.Z").unwrap();
        assert_eq!(c.class, "com.y.Z");
        assert_eq!(c.short(), "com.x/com.y.Z");
    }

    #[test]
    fn rejects_missing_slash() {
        assert!(Component::parse("com.x.Z").is_none());
    }
}
