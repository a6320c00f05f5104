use std::collections::BTreeMap;

use radiodesk_core::{DeskResult, OverrideSet, OverrideToken, PolicyViolation, ViolationKind};

/// Per-department cap on simultaneously outstanding accessories.
///
/// A department without an entry, or with a `None` entry, is unlimited.
/// Limits come from configuration on every start and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentLimits(BTreeMap<String, Option<u32>>);

impl DepartmentLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, department: impl Into<String>, limit: Option<u32>) {
        self.0.insert(department.into(), limit);
    }

    pub fn limit_for(&self, department: &str) -> Option<u32> {
        self.0.get(department).copied().flatten()
    }

    pub fn is_at_limit(&self, department: &str, outstanding: usize) -> bool {
        self.limit_for(department)
            .is_some_and(|limit| outstanding >= limit as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<u32>)> + '_ {
        self.0.iter().map(|(d, l)| (d.as_str(), *l))
    }

    /// Quota check for one more accessory attributed to `department`.
    ///
    /// Returns the waiving token when the department is at its limit but the
    /// caller supplied the overdraft override.
    pub fn check(
        &self,
        department: Option<&str>,
        outstanding: usize,
        overrides: &OverrideSet,
    ) -> DeskResult<Option<OverrideToken>> {
        match department {
            Some(dept) if self.is_at_limit(dept, outstanding) => overrides
                .waive(PolicyViolation::new(
                    ViolationKind::DepartmentOverLimit,
                    format!("Department {dept} would exceed checkout limit"),
                ))
                .map(Some),
            _ => Ok(None),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Option<u32>)> for DepartmentLimits {
    fn from_iter<I: IntoIterator<Item = (S, Option<u32>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(d, l)| (d.into(), l)).collect())
    }
}
