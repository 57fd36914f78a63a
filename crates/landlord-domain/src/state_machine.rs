use crate::tenant::TenantStatus;

/// Returns the set of statuses `from` may legally transition to.
pub fn allowed_transitions(from: TenantStatus) -> &'static [TenantStatus] {
    use TenantStatus::*;
    match from {
        Requested => &[Provisioning, Failed],
        Planning => &[Provisioning, Failed],
        Provisioning => &[Ready, Failed],
        Ready => &[Updating, Deleting, Archiving],
        Updating => &[Ready, Failed],
        Deleting => &[Archived, Failed],
        Archiving => &[Archived, Failed],
        Archived => &[],
        Failed => &[Deleting, Archiving],
    }
}

/// Returns true if `from -> to` is a legal transition per [`allowed_transitions`].
pub fn can_transition(from: TenantStatus, to: TenantStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// True for every non-terminal status: everything except `ready`, `archived`, `failed`.
pub fn should_reconcile(status: TenantStatus) -> bool {
    !matches!(
        status,
        TenantStatus::Ready | TenantStatus::Archived | TenantStatus::Failed
    )
}

/// True when a workflow execution should currently be in flight for this status.
pub fn is_in_flight(status: TenantStatus) -> bool {
    matches!(
        status,
        TenantStatus::Provisioning
            | TenantStatus::Updating
            | TenantStatus::Deleting
            | TenantStatus::Archiving
    )
}

/// The status a tenant moves to when its in-flight workflow reports success,
/// for statuses other than `deleting`/`archiving` (those are handled specially
/// by the reconciler's `handleSuccess`).
pub fn next_status(current: TenantStatus) -> TenantStatus {
    match current {
        TenantStatus::Requested | TenantStatus::Planning | TenantStatus::Provisioning => {
            TenantStatus::Ready
        }
        TenantStatus::Updating => TenantStatus::Ready,
        other => other,
    }
}

/// Maps a tenant status to the workflow action the reconciler should trigger.
/// Terminal statuses (`ready`, `archived`, `failed`) have no action.
pub fn determine_action(status: TenantStatus) -> Option<&'static str> {
    use TenantStatus::*;
    match status {
        Requested | Planning | Provisioning => Some("provision"),
        Updating => Some("update"),
        Deleting | Archiving => Some("delete"),
        Ready | Archived | Failed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TenantStatus::*;

    #[test]
    fn requested_can_only_go_provisioning_or_failed() {
        assert!(can_transition(Requested, Provisioning));
        assert!(can_transition(Requested, Failed));
        assert!(!can_transition(Requested, Ready));
    }

    #[test]
    fn archived_is_terminal() {
        assert!(allowed_transitions(Archived).is_empty());
    }

    #[test]
    fn should_reconcile_excludes_terminal_statuses() {
        assert!(!should_reconcile(Ready));
        assert!(!should_reconcile(Archived));
        assert!(!should_reconcile(Failed));
        assert!(should_reconcile(Requested));
        assert!(should_reconcile(Planning));
        assert!(should_reconcile(Provisioning));
        assert!(should_reconcile(Updating));
        assert!(should_reconcile(Deleting));
        assert!(should_reconcile(Archiving));
    }

    #[test]
    fn is_in_flight_matches_spec() {
        for s in [Provisioning, Updating, Deleting, Archiving] {
            assert!(is_in_flight(s));
        }
        for s in [Requested, Planning, Ready, Archived, Failed] {
            assert!(!is_in_flight(s));
        }
    }

    #[test]
    fn determine_action_maps_correctly() {
        assert_eq!(determine_action(Requested), Some("provision"));
        assert_eq!(determine_action(Planning), Some("provision"));
        assert_eq!(determine_action(Provisioning), Some("provision"));
        assert_eq!(determine_action(Updating), Some("update"));
        assert_eq!(determine_action(Deleting), Some("delete"));
        assert_eq!(determine_action(Archiving), Some("delete"));
        assert_eq!(determine_action(Ready), None);
        assert_eq!(determine_action(Archived), None);
        assert_eq!(determine_action(Failed), None);
    }

    #[test]
    fn every_non_terminal_status_has_at_least_one_outgoing_edge() {
        for s in [Requested, Planning, Provisioning, Ready, Updating, Deleting, Archiving, Failed] {
            assert!(!allowed_transitions(s).is_empty(), "{s} should have outgoing edges");
        }
    }
}
