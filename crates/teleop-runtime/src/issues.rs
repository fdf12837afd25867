//! [`IssueLog`] – the operator-visible problem list.
//!
//! Problems are collected rather than raised. The same message is listed
//! once, however often it recurs, so a link flapping between `Connected` and
//! `Error` does not flood the list.
//!
//! ```rust
//! use teleop_runtime::issues::IssueLog;
//! use teleop_types::{Issue, IssueKind};
//!
//! let mut log = IssueLog::new();
//! assert!(log.push(Issue::new(IssueKind::Link, "Connection lost")));
//! assert!(!log.push(Issue::new(IssueKind::Link, "Connection lost")));
//! log.clear_kind(IssueKind::Link);
//! assert!(log.is_empty());
//! ```

use teleop_types::{Issue, IssueKind};
use tracing::warn;

#[derive(Debug, Default, Clone)]
pub struct IssueLog {
    entries: Vec<Issue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `issue`. Returns `false` if an identical one is already listed.
    pub fn push(&mut self, issue: Issue) -> bool {
        if self.entries.contains(&issue) {
            return false;
        }
        warn!(kind = %issue.kind, message = %issue.message, "issue recorded");
        self.entries.push(issue);
        true
    }

    /// Record every issue in `issues`, returning how many were new.
    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) -> usize {
        issues.into_iter().filter(|i| self.push(i.clone())).count()
    }

    /// Drop every issue of `kind`. Returns how many were removed.
    pub fn clear_kind(&mut self, kind: IssueKind) -> usize {
        let before = self.entries.len();
        self.entries.retain(|i| i.kind != kind);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[Issue] {
        &self.entries
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.entries.iter().filter(move |i| i.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
