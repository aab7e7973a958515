//! Breakpoint Registry (spec §4.3): the single source of truth for user
//! intent, independent of which thread has realized each request as a
//! real CDP breakpoint.

use std::collections::BTreeMap;
use std::fmt;

/// Stable, monotonically increasing, never-reused-within-a-session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BreakpointId(pub u32);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's breakpoint intent: file path as given, line, optional column.
#[derive(Debug, Clone)]
pub struct BreakpointRequest {
    pub id: BreakpointId,
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
}

/// Per-Thread mirror entry: a `BreakpointRequest` plus whatever CDP has
/// told this particular thread about it. `verified` is only ever true
/// once `raw_id` is `Some` — constructors enforce this so the invariant
/// is unrepresentable otherwise (spec §3).
#[derive(Debug, Clone)]
pub struct ResolvedBreakpoint {
    pub request: BreakpointRequest,
    state: BreakpointState,
}

#[derive(Debug, Clone, PartialEq)]
enum BreakpointState {
    Unresolved,
    Verified { raw_id: String },
}

impl ResolvedBreakpoint {
    pub fn unresolved(request: BreakpointRequest) -> Self {
        Self {
            request,
            state: BreakpointState::Unresolved,
        }
    }

    pub fn verified(&self) -> bool {
        matches!(self.state, BreakpointState::Verified { .. })
    }

    pub fn raw_id(&self) -> Option<&str> {
        match &self.state {
            BreakpointState::Verified { raw_id } => Some(raw_id),
            BreakpointState::Unresolved => None,
        }
    }

    /// Mark this entry as confirmed by CDP, normalizing its stored
    /// (file,line) to the container's canonical form as it goes (spec
    /// §4.4 step 3).
    pub fn mark_verified(&mut self, raw_id: String, canonical_file: String, canonical_line: u32) {
        self.request.file = canonical_file;
        self.request.line = canonical_line;
        self.state = BreakpointState::Verified { raw_id };
    }

    pub fn mark_unresolved(&mut self) {
        self.state = BreakpointState::Unresolved;
    }
}

/// The Debug Session-wide registry of breakpoint intent (spec §4.3).
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    next_id: u32,
    entries: BTreeMap<BreakpointId, BreakpointRequest>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: String, line: u32, column: Option<u32>) -> BreakpointId {
        let id = BreakpointId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            BreakpointRequest {
                id,
                file,
                line,
                column,
            },
        );
        id
    }

    pub fn remove(&mut self, id: BreakpointId) -> Option<BreakpointRequest> {
        self.entries.remove(&id)
    }

    pub fn remove_all_for_file(&mut self, path: &str) -> Vec<BreakpointId> {
        let ids: Vec<_> = self
            .entries
            .values()
            .filter(|r| r.file == path)
            .map(|r| r.id)
            .collect();
        for id in &ids {
            self.entries.remove(id);
        }
        ids
    }

    pub fn list(&self) -> impl Iterator<Item = &BreakpointRequest> {
        self.entries.values()
    }

    pub fn contains(&self, id: BreakpointId) -> bool {
        self.entries.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut reg = BreakpointRegistry::new();
        let a = reg.insert("main.rs".into(), 10, None);
        let b = reg.insert("main.rs".into(), 20, None);
        reg.remove(a);
        let c = reg.insert("main.rs".into(), 30, None);
        assert!(a.0 < b.0 && b.0 < c.0);
        assert!(!reg.contains(a));
    }

    #[test]
    fn remove_all_for_file_only_touches_matching_entries() {
        let mut reg = BreakpointRegistry::new();
        let a = reg.insert("a.rs".into(), 1, None);
        let b = reg.insert("b.rs".into(), 2, None);
        let removed = reg.remove_all_for_file("a.rs");
        assert_eq!(removed, vec![a]);
        assert!(reg.contains(b));
    }
}
