//! Advisory handoff schema and strict validation.

use serde_json::Value;

/// A proposal embedded in a handoff.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Canonical proposal type (e.g. `"PROJECT_ADVANCE"`).
    pub proposal_type: String,
    /// Acting agent id.
    pub actor_id: String,
    /// Target town id, pre-normalization.
    pub town_id: String,
    /// Proposal-type-specific arguments.
    pub args: serde_json::Map<String, Value>,
}

/// The handoff's self-reported freshness claim and precondition hints.
#[derive(Debug, Clone)]
pub struct ExecutionRequirements {
    /// Must equal `snapshot_hash` on the enclosing handoff (schema notation
    /// `<== snapshotHash>`); carried through but not independently
    /// re-validated, since does not list a mismatch here as a
    /// rejection condition.
    pub expected_snapshot_hash: String,
    /// Must equal `decision_epoch` on the enclosing handoff.
    pub expected_decision_epoch: u64,
    /// Caller-supplied precondition hints (informational only; the adapter
    /// computes its own preconditions during translation).
    pub preconditions: Vec<Value>,
}

/// A validated advisory handoff.
#[derive(Debug, Clone)]
pub struct Handoff {
    /// Always `"execution-handoff.v1"`.
    pub schema_version: String,
    /// Must be `true`.
    pub advisory: bool,
    /// `handoff_<64-hex>`.
    pub handoff_id: String,
    /// `proposal_<64-hex>`.
    pub proposal_id: String,
    /// Must equal `proposal_id`.
    pub idempotency_key: String,
    /// `<64-hex>`, the snapshot hash the caller believes is current.
    pub snapshot_hash: String,
    /// The decision epoch the caller believes is current.
    pub decision_epoch: u64,
    /// Non-empty original advisory command string (for display/audit only;
    /// the adapter derives its own authority commands via translation).
    pub command: String,
    /// The proposal.
    pub proposal: Proposal,
    /// Freshness/precondition requirements.
    pub execution_requirements: ExecutionRequirements,
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn id_matches(s: &str, prefix: &str) -> bool {
    s.strip_prefix(prefix).map(|rest| is_hex(rest, 64)).unwrap_or(false)
}

/// Validate a raw JSON handoff line against, returning a
/// human-readable rejection reason on the first failure found.
pub fn validate(raw: &Value) -> Result<Handoff, String> {
    let schema_version = raw
    .get("schemaVersion")
    .and_then(|v| v.as_str())
    .ok_or("missing schemaVersion")?;
    if schema_version != "execution-handoff.v1" {
        return Err("unsupported schemaVersion".to_string());
    }

    let advisory = raw.get("advisory").and_then(|v| v.as_bool()).unwrap_or(false);
    if !advisory {
        return Err("advisory must be true".to_string());
    }

    let handoff_id = raw.get("handoffId").and_then(|v| v.as_str()).ok_or("missing handoffId")?;
    if !id_matches(handoff_id, "handoff_") {
        return Err("handoffId pattern mismatch".to_string());
    }

    let proposal_id = raw.get("proposalId").and_then(|v| v.as_str()).ok_or("missing proposalId")?;
    if !id_matches(proposal_id, "proposal_") {
        return Err("proposalId pattern mismatch".to_string());
    }

    let idempotency_key = raw
    .get("idempotencyKey")
    .and_then(|v| v.as_str())
    .ok_or("missing idempotencyKey")?;
    if idempotency_key != proposal_id {
        return Err("idempotencyKey must equal proposalId".to_string());
    }

    let snapshot_hash = raw.get("snapshotHash").and_then(|v| v.as_str()).ok_or("missing snapshotHash")?;
    if !is_hex(snapshot_hash, 64) {
        return Err("snapshotHash pattern mismatch".to_string());
    }

    let decision_epoch = match raw.get("decisionEpoch") {
        Some(Value::Number(n)) if n.as_u64().is_some() => n.as_u64().unwrap(),
        _ => return Err("decisionEpoch must be an integer >= 0".to_string()),
    };

    let command = raw.get("command").and_then(|v| v.as_str()).ok_or("missing command")?;
    if command.is_empty() {
        return Err("command must be non-empty".to_string());
    }

    let proposal_raw = raw.get("proposal").and_then(|v| v.as_object()).ok_or("missing proposal")?;
    let proposal_type = proposal_raw
    .get("type")
    .and_then(|v| v.as_str())
    .ok_or("proposal missing type")?;
    let actor_id = proposal_raw
    .get("actorId")
    .and_then(|v| v.as_str())
    .ok_or("proposal missing actorId")?;
    let town_id = proposal_raw
    .get("townId")
    .and_then(|v| v.as_str())
    .ok_or("proposal missing townId")?;
    let args = proposal_raw
    .get("args")
    .and_then(|v| v.as_object())
    .ok_or("proposal missing args")?;

    let requirements_raw = raw.get("executionRequirements").and_then(|v| v.as_object());
    let execution_requirements = ExecutionRequirements {
        expected_snapshot_hash: requirements_raw
        .and_then(|r| r.get("expectedSnapshotHash"))
        .and_then(|v| v.as_str())
        .unwrap_or(snapshot_hash)
        .to_string(),
        expected_decision_epoch: requirements_raw
        .and_then(|r| r.get("expectedDecisionEpoch"))
        .and_then(|v| v.as_u64())
        .unwrap_or(decision_epoch),
        preconditions: requirements_raw
        .and_then(|r| r.get("preconditions"))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default(),
    };

    Ok(Handoff {
            schema_version: schema_version.to_string(),
            advisory,
            handoff_id: handoff_id.to_string(),
            proposal_id: proposal_id.to_string(),
            idempotency_key: idempotency_key.to_string(),
            snapshot_hash: snapshot_hash.to_string(),
            decision_epoch,
            command: command.to_string(),
            proposal: Proposal {
                proposal_type: proposal_type.to_string(),
                actor_id: actor_id.to_string(),
                town_id: town_id.to_string(),
                args: args.clone(),
            },
            execution_requirements,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_handoff_json() -> Value {
        json!({
                "schemaVersion": "execution-handoff.v1",
                "advisory": true,
                "handoffId": format!("handoff_{}", "a".repeat(64)),
                "proposalId": format!("proposal_{}", "b".repeat(64)),
                "idempotencyKey": format!("proposal_{}", "b".repeat(64)),
                "snapshotHash": "c".repeat(64),
                "decisionEpoch": 3,
                "command": "advance the granary project",
                "proposal": {"type":"PROJECT_ADVANCE","actorId":"mara","townId":"riverbend","args":{"projectId":"granary"}},
                "executionRequirements": {"expectedSnapshotHash": "c".repeat(64), "expectedDecisionEpoch": 3, "preconditions": []},
            })
    }

    #[test]
    fn accepts_a_well_formed_handoff() {
        let handoff = validate(&valid_handoff_json()).unwrap();
        assert_eq!(handoff.proposal.proposal_type, "PROJECT_ADVANCE");
        assert_eq!(handoff.decision_epoch, 3);
    }

    #[test]
    fn rejects_mismatched_idempotency_key() {
        let mut raw = valid_handoff_json();
        raw["idempotencyKey"] = json!("proposal_wrong");
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn rejects_non_advisory() {
        let mut raw = valid_handoff_json();
        raw["advisory"] = json!(false);
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn rejects_bad_handoff_id_pattern() {
        let mut raw = valid_handoff_json();
        raw["handoffId"] = json!("handoff_not-hex");
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn rejects_negative_or_missing_decision_epoch() {
        let mut raw = valid_handoff_json();
        raw["decisionEpoch"] = json!(-1);
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn rejects_proposal_missing_required_fields() {
        let mut raw = valid_handoff_json();
        raw["proposal"].as_object_mut().unwrap().remove("townId");
        assert!(validate(&raw).is_err());
    }
}
