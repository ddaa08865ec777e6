//! Trigger and job identity.

use kunai_core::constants::DEFAULT_GROUP;
use serde::Serialize;

/// Identity of a trigger: a name unique within its group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TriggerKey {
    pub group: String,
    pub name: String,
}

/// Identity of the job a trigger fires. The job itself lives in the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobKey {
    pub group: String,
    pub name: String,
}

impl TriggerKey {
    /// Creates a key in the default group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_group(name, DEFAULT_GROUP)
    }

    #[must_use]
    pub fn with_group(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// ## Summary
    /// Creates a key with a random name in `group`.
    #[must_use]
    pub fn unique(group: impl Into<String>) -> Self {
        Self::with_group(uuid::Uuid::new_v4().simple().to_string(), group)
    }
}

impl JobKey {
    /// Creates a key in the default group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_group(name, DEFAULT_GROUP)
    }

    #[must_use]
    pub fn with_group(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_group_is_applied() {
        let key = TriggerKey::new("nightly");
        assert_eq!(key.group, "DEFAULT");
        assert_eq!(key.to_string(), "DEFAULT.nightly");

        let job = JobKey::with_group("report", "billing");
        assert_eq!(job.to_string(), "billing.report");
    }

    #[test]
    fn unique_keys_differ() {
        let a = TriggerKey::unique("adhoc");
        let b = TriggerKey::unique("adhoc");
        assert_eq!(a.group, "adhoc");
        assert_eq!(a.name.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn keys_order_by_group_then_name() {
        let mut keys = vec![
            TriggerKey::with_group("b", "g1"),
            TriggerKey::with_group("a", "g2"),
            TriggerKey::with_group("a", "g1"),
        ];
        keys.sort();
        let names: Vec<_> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["g1.a", "g1.b", "g2.a"]);
    }
}
