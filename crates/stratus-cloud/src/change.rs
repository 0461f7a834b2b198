//! Field-by-field change detection
//!
//! Resources compare desired and last-known values one field (or one
//! sub-structure) at a time and collect the names of what differs.

use serde::Serialize;

/// Whether a value differs from its last-known state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Unchanged,
    Changed,
}

impl Change {
    /// Compare two values
    pub fn of<T: PartialEq + ?Sized>(old: &T, new: &T) -> Self {
        if old == new {
            Self::Unchanged
        } else {
            Self::Changed
        }
    }

    /// `Changed` if any of the given changes is
    pub fn any(changes: impl IntoIterator<Item = Change>) -> Self {
        if changes.into_iter().any(|c| c.is_changed()) {
            Self::Changed
        } else {
            Self::Unchanged
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

impl std::ops::BitOr for Change {
    type Output = Change;

    fn bitor(self, rhs: Change) -> Change {
        Change::any([self, rhs])
    }
}

impl From<bool> for Change {
    fn from(changed: bool) -> Self {
        if changed {
            Self::Changed
        } else {
            Self::Unchanged
        }
    }
}

/// Names of the fields that differ between two records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    changed: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare one field and record it when it differs
    pub fn field<T: PartialEq + ?Sized>(&mut self, name: &str, old: &T, new: &T) -> &mut Self {
        self.record(name, Change::of(old, new))
    }

    /// Record the result of a custom comparison
    pub fn record(&mut self, name: &str, change: Change) -> &mut Self {
        if change.is_changed() {
            self.changed.push(name.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.changed.iter().any(|c| c == name)
    }

    pub fn fields(&self) -> &[String] {
        &self.changed
    }

    pub fn change(&self) -> Change {
        Change::from(!self.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_of() {
        assert_eq!(Change::of(&1, &1), Change::Unchanged);
        assert_eq!(Change::of("a", "b"), Change::Changed);
        assert_eq!(Change::Unchanged | Change::Changed, Change::Changed);
        assert_eq!(
            Change::any([Change::Unchanged, Change::Unchanged]),
            Change::Unchanged
        );
    }

    #[test]
    fn test_change_set_records_only_differences() {
        let mut set = ChangeSet::new();
        set.field("threshold", &80.0, &90.0)
            .field("evaluation_periods", &2, &2)
            .record("metric", Change::Changed);

        assert_eq!(set.fields(), ["threshold", "metric"]);
        assert!(set.contains("metric"));
        assert!(!set.contains("evaluation_periods"));
        assert!(set.change().is_changed());
        assert!(ChangeSet::new().is_empty());
    }
}
