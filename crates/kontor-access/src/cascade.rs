//! Implied-grant cascade policy
//!
//! Assigning a stronger action on a resource can imply weaker ones: a staff
//! member allowed to create records must be able to read and edit them. The
//! policy is injected into the assignment engine so the implication table can
//! change without touching the upsert path.

/// Decides which actions are implied by an assigned action on the same
/// resource.
pub trait CascadePolicy: Send + Sync {
    /// Actions implied by `action`; each is upserted for the same subject
    /// with the same scoping. Implied permissions missing from the catalog
    /// are skipped.
    fn implied_actions(&self, action: &str) -> Vec<&'static str>;
}

/// Default implication table: create -> {edit, read}, edit -> {read}.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpliedGrantPolicy;

impl CascadePolicy for ImpliedGrantPolicy {
    fn implied_actions(&self, action: &str) -> Vec<&'static str> {
        match action {
            "create" => vec!["edit", "read"],
            "edit" => vec!["read"],
            _ => vec![],
        }
    }
}

/// Policy that never cascades; assignments stand alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCascade;

impl CascadePolicy for NoCascade {
    fn implied_actions(&self, _action: &str) -> Vec<&'static str> {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_implies_edit_and_read() {
        let policy = ImpliedGrantPolicy;
        assert_eq!(policy.implied_actions("create"), vec!["edit", "read"]);
    }

    #[test]
    fn test_edit_implies_read() {
        let policy = ImpliedGrantPolicy;
        assert_eq!(policy.implied_actions("edit"), vec!["read"]);
    }

    #[test]
    fn test_terminal_actions_imply_nothing() {
        let policy = ImpliedGrantPolicy;
        assert!(policy.implied_actions("read").is_empty());
        assert!(policy.implied_actions("delete").is_empty());
        assert!(policy.implied_actions("assign").is_empty());
    }

    #[test]
    fn test_no_cascade() {
        assert!(NoCascade.implied_actions("create").is_empty());
    }
}
