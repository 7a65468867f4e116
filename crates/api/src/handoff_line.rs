//! Advisory handoff line protocol: parses a raw stdin line into a
//! validated `Handoff`, a thin wrapper around `agentworld_execution::validate`
//! that turns a malformed line into the same `ApiError::Malformed` every
//! other rejection path in this crate uses.

use crate::error::ApiError;
use agentworld_execution::Handoff;

/// Parse and validate one advisory-handoff line.
pub fn parse_handoff_line(line: &str) -> Result<Handoff, ApiError> {
    let raw: serde_json::Value = serde_json::from_str(line).map_err(|e| ApiError::Malformed(e.to_string()))?;
    agentworld_execution::validate(&raw).map_err(ApiError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_json() {
        let err = parse_handoff_line("not json").unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn parses_a_well_formed_handoff() {
        let line = serde_json::json!({
                "schemaVersion": "execution-handoff.v1",
                "advisory": true,
                "handoffId": format!("handoff_{}", "a".repeat(64)),
                "proposalId": format!("proposal_{}", "b".repeat(64)),
                "idempotencyKey": format!("proposal_{}", "b".repeat(64)),
                "snapshotHash": "c".repeat(64),
                "decisionEpoch": 0,
                "command": "advance the granary project",
                "proposal": {"type":"PROJECT_ADVANCE","actorId":"mara","townId":"riverbend","args":{}},
                "executionRequirements": {},
            })
        .to_string();
        let handoff = parse_handoff_line(&line).unwrap();
        assert_eq!(handoff.proposal.proposal_type, "PROJECT_ADVANCE");
    }
}
