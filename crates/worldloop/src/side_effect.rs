//! Post-commit runtime side effects: wander direction and respond
//! message are derived deterministically from `hash(agent:tick:eventId)`,
//! never from an RNG, so a replayed tick produces the identical broadcast.

use crate::planning::hash_mod;

const DIRECTIONS: [&str; 4] = ["north", "east", "south", "west"];
const RESPONSES: [&str; 3] = ["Standing by.", "Holding this position.", "Copy that."];

/// The runtime effect a successfully committed intent triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// `onWander`: the agent starts moving in `direction`.
    Wander {
        /// One of `north | east | south | west`.
        direction: String,
    },
    /// `onFollow`: the agent starts following `leader`.
    Follow {
        /// The leader's agent name.
        leader: String,
    },
    /// `onRespond`: the agent speaks `message`.
    Respond {
        /// The spoken line.
        message: String,
    },
    /// No runtime effect (e.g. `idle`).
    None,
}

/// Derive the side effect for a committed `(intent, target)` pair.
pub fn compute_side_effect(agent: &str, tick_number: u64, event_id: &str, intent: &str, target: Option<&str>) -> SideEffect {
    let tick_str = tick_number.to_string();
    match intent {
        "wander" => {
            let idx = hash_mod(&[agent, tick_str.as_str(), event_id], DIRECTIONS.len());
            SideEffect::Wander {
                direction: DIRECTIONS[idx].to_string(),
            }
        }
        "follow" => SideEffect::Follow {
            leader: target.unwrap_or_default().to_string(),
        },
        "respond" => {
            let idx = hash_mod(&[agent, tick_str.as_str(), event_id], RESPONSES.len());
            SideEffect::Respond {
                message: RESPONSES[idx].to_string(),
            }
        }
        _ => SideEffect::None,
    }
}
