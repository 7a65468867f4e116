//! Integrity validator ("Integrity validator"): a pure function over a
//! snapshot enforcing every invariant in. Non-string event ids and
//! non-integer/non-finite economy and reputation entries are filtered out
//! during deserialization itself (see `agentworld_core::snapshot`'s lenient
//! field deserializers), so by the time a `Snapshot` value exists those
//! classes of corruption are already gone; this validator checks the
//! invariants that remain observable on the typed value.

use agentworld_core::{parse_iso, Snapshot, STORY_FACTIONS};
use serde::Serialize;

/// One invariant violation found by `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// `processedEventIds` contains the same id more than once.
    DuplicateEventId { id: String },
    /// An agent's `profile.trust` is outside `[0, 10]`.
    TrustOutOfRange { agent: String, trust: i32 },
    /// `world.player.legitimacy` is outside `[0, 100]`.
    LegitimacyOutOfRange { legitimacy: i32 },
    /// A world faction's `hostilityToPlayer` is outside `[0, 100]`.
    HostilityOutOfRange { faction: String, hostility: i32 },
    /// A world faction's `stability` is outside `[0, 100]`.
    StabilityOutOfRange { faction: String, stability: i32 },
    /// A town's threat level is outside `[0, 100]`.
    ThreatOutOfRange { town: String, threat: i32 },
    /// `world.clock.day` is less than 1.
    InvalidClockDay { day: u64 },
    /// `world.clock.updated_at` is not a valid ISO-8601 instant.
    InvalidClockUpdatedAt { value: String },
    /// A required story faction is absent from `world.factions`.
    MissingStoryFaction { faction: String },
    /// An active market offer has non-positive amount or price.
    MalformedMarketOffer { item: String, amount: i64, price: f64 },
    /// A chronicle entry has an unparseable `at` timestamp.
    MalformedChronicleEntry { id: String },
    /// A news entry has an unparseable `at` timestamp.
    MalformedNewsEntry { id: String },
}

/// Result of validating a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Whether no issues were found.
    pub ok: bool,
    /// All issues found, in deterministic (iteration) order.
    pub issues: Vec<Issue>,
}

/// Validate every invariant in against `snapshot`.
pub fn validate(snapshot: &Snapshot) -> ValidationReport {
    let mut issues = Vec::new();

    check_duplicate_event_ids(snapshot, &mut issues);

    for (name, agent) in &snapshot.agents {
        if !(0..=10).contains(&agent.profile.trust) {
            issues.push(Issue::TrustOutOfRange {
                    agent: name.clone(),
                    trust: agent.profile.trust,
                });
        }
    }

    if !(0..=100).contains(&snapshot.world.player.legitimacy) {
        issues.push(Issue::LegitimacyOutOfRange {
                legitimacy: snapshot.world.player.legitimacy,
            });
    }

    for (name, faction) in &snapshot.world.factions {
        if !(0..=100).contains(&faction.hostility_to_player) {
            issues.push(Issue::HostilityOutOfRange {
                    faction: name.clone(),
                    hostility: faction.hostility_to_player,
                });
        }
        if !(0..=100).contains(&faction.stability) {
            issues.push(Issue::StabilityOutOfRange {
                    faction: name.clone(),
                    stability: faction.stability,
                });
        }
    }

    for (town, threat) in &snapshot.world.threat.by_town {
        if !(0..=100).contains(threat) {
            issues.push(Issue::ThreatOutOfRange {
                    town: town.clone(),
                    threat: *threat,
                });
        }
    }

    if snapshot.world.clock.day < 1 {
        issues.push(Issue::InvalidClockDay {
                day: snapshot.world.clock.day,
            });
    }
    if parse_iso(&snapshot.world.clock.updated_at).is_none() {
        issues.push(Issue::InvalidClockUpdatedAt {
                value: snapshot.world.clock.updated_at.clone(),
            });
    }

    for faction in STORY_FACTIONS {
        if !snapshot.world.factions.contains_key(faction) {
            issues.push(Issue::MissingStoryFaction {
                    faction: faction.to_string(),
                });
        }
    }

    for market in &snapshot.world.markets {
        for offer in &market.offers {
            if offer.is_malformed() {
                issues.push(Issue::MalformedMarketOffer {
                        item: offer.item.clone(),
                        amount: offer.amount,
                        price: offer.price,
                    });
            }
        }
    }

    for entry in &snapshot.world.chronicle {
        if parse_iso(&entry.at).is_none() {
            issues.push(Issue::MalformedChronicleEntry {
                    id: entry.id.clone(),
                });
        }
    }
    for entry in &snapshot.world.news {
        if parse_iso(&entry.at).is_none() {
            issues.push(Issue::MalformedNewsEntry {
                    id: entry.id.clone(),
                });
        }
    }

    let ok = issues.is_empty();
    ValidationReport { ok, issues }
}

fn check_duplicate_event_ids(snapshot: &Snapshot, issues: &mut Vec<Issue>) {
    let mut seen = std::collections::HashSet::new();
    for id in snapshot.processed_event_ids.iter_ids() {
        if !seen.insert(id.clone()) {
            issues.push(Issue::DuplicateEventId { id: id.clone() });
        }
    }
}
