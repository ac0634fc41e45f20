//! Tests for envelope adapters

use super::*;
use serde_json::json;

fn agent() -> AgentInfo {
    AgentInfo::local("vd_consumer", "node01")
}

#[test]
fn test_local_agent_identity() {
    let agent = agent();
    assert_eq!(agent.agent_id, "000");
    assert_eq!(agent.agent_name, "vd_consumer");
    assert_eq!(agent.node_name, "node01");
}

#[test]
fn test_delta_envelope_moves_fields_verbatim() {
    let message = json!({
        "type": "state",
        "data": {"offset": 42, "attributes": {"cve": "CVE-2024-0001"}},
        "operation": "update"
    });

    let adapted = adapt_delta_message(message, &agent()).unwrap();

    assert_eq!(adapted["agent_info"]["agent_id"], "000");
    assert_eq!(adapted["data_type"], "state");
    assert_eq!(adapted["data"]["offset"], 42);
    assert_eq!(adapted["operation"], "update");
}

#[test]
fn test_delta_envelope_tolerates_missing_fields() {
    let adapted = adapt_delta_message(json!({"type": "state"}), &agent()).unwrap();

    assert_eq!(adapted["data_type"], "state");
    assert!(adapted["data"].is_null());
    assert!(adapted["operation"].is_null());
}

#[test]
fn test_sync_envelope_reshapes_data() {
    let message = json!({
        "type": "integrity_check_global",
        "component": "vd_consumer",
        "data": {"id": 7, "begin": "a", "end": "z"}
    });

    let adapted = adapt_sync_message(message, &agent()).unwrap();

    assert_eq!(adapted["data_type"], "integrity_check_global");
    assert_eq!(adapted["data"]["attributes_type"], "vd_consumer");
    assert_eq!(adapted["data"]["id"], 7);
    assert_eq!(adapted["data"]["begin"], "a");
    assert_eq!(adapted["data"]["end"], "z");
}

#[test]
fn test_sync_envelope_without_data_omits_key() {
    let adapted =
        adapt_sync_message(json!({"type": "state", "component": "c"}), &agent()).unwrap();

    assert!(adapted.get("data").is_none());
}

#[test]
fn test_non_object_message_is_rejected() {
    assert!(adapt_delta_message(json!([1, 2]), &agent()).is_err());
    assert!(adapt_sync_message(json!("nope"), &agent()).is_err());
}
