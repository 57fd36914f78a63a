//! Cross-cutting tests that exercise more than one module of this crate together.

use std::collections::HashMap;

use crate::hash::generate_compute_execution_id;
use crate::state_machine::{can_transition, determine_action};
use crate::tenant::{Tenant, TenantStatus};

#[test]
fn fresh_tenant_is_ready_to_provision() {
    let t = Tenant::new("acme-prod", HashMap::new());
    assert_eq!(determine_action(t.status), Some("provision"));
    assert!(can_transition(t.status, TenantStatus::Provisioning));
}

#[test]
fn execution_id_for_a_tenant_is_stable_across_the_provision_attempt() {
    let t = Tenant::new("acme-prod", HashMap::new());
    let first = generate_compute_execution_id(&t.name, "provision");
    let second = generate_compute_execution_id(&t.name, "provision");
    assert_eq!(first, second, "retries of the same operation must reuse the same execution id");
}

#[test]
fn failed_tenant_can_still_be_torn_down() {
    assert!(can_transition(TenantStatus::Failed, TenantStatus::Deleting));
    assert!(can_transition(TenantStatus::Failed, TenantStatus::Archiving));
    assert!(!can_transition(TenantStatus::Failed, TenantStatus::Ready));
}
