//! The persisted snapshot document.
//!
//! One `Snapshot` is the entire authoritative world state for a process. It
//! is loaded from disk on demand, mutated only inside `MemoryStore::transact`,
//! and persisted as a single JSON document via atomic rename. Every mutator
//! re-reads, clones, mutates a working copy, and replaces the in-process
//! snapshot only after a successful commit — this crate only defines the
//! shape; `agentworld-memory` owns the transaction protocol.

use crate::execution_types::ExecutionDocument;
use crate::limits::Limits;
use crate::ring::{ProcessedEventRing, Ring};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The two story factions that are always materialized, even on a
/// fresh snapshot.
pub const STORY_FACTIONS: [&str; 2] = ["iron_pact", "veil_church"];

/// The entire authoritative world document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Snapshot {
    /// Per-agent memory and profile state.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentRecord>,
    /// Per-faction memory state.
    #[serde(default)]
    pub factions: BTreeMap<String, FactionRecord>,
    /// World simulation state (player, factions, clock, economy,...).
    #[serde(default)]
    pub world: WorldState,
    /// Execution adapter/store sub-document.
    #[serde(default)]
    pub execution: ExecutionDocument,
    /// Ring of already-applied event ids, for idempotency.
    #[serde(default = "default_processed_event_ids")]
    pub processed_event_ids: ProcessedEventRing,
}

fn default_processed_event_ids() -> ProcessedEventRing {
    ProcessedEventRing::new(Limits::default().cap_processed_event_ids)
}

impl Snapshot {
    /// A brand-new, empty snapshot — the fresh shape used when the
    /// on-disk file is absent or unreadable.
    pub fn fresh() -> Self {
        let mut snap = Snapshot {
            agents: BTreeMap::new(),
            factions: BTreeMap::new(),
            world: WorldState::default(),
            execution: ExecutionDocument::default(),
            processed_event_ids: default_processed_event_ids(),
        };
        snap.world.ensure_story_factions();
        snap
    }

    /// Whether `event_id` has already been committed (step 3).
    pub fn has_processed_event(&self, event_id: &str) -> bool {
        !event_id.is_empty() && self.processed_event_ids.contains(event_id)
    }

    /// Fetch or insert a default agent record.
    pub fn agent_mut(&mut self, name: &str) -> &mut AgentRecord {
        self.agents
        .entry(name.to_string())
        .or_insert_with(AgentRecord::default())
    }

    /// Fetch or insert a default faction record.
    pub fn faction_mut(&mut self, name: &str) -> &mut FactionRecord {
        self.factions
        .entry(name.to_string())
        .or_insert_with(FactionRecord::default())
    }
}

/// One entry in a short-memory or archive ring: a timestamp plus text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// ISO-8601 instant the entry was recorded.
    pub at: String,
    /// The remembered text (trimmed/capped before being stored).
    pub text: String,
}

/// One archive line: a timestamp, an event description, and an importance
/// flag ("archive of (time, event)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// ISO-8601 instant the event was archived.
    pub at: String,
    /// Human-readable event line (e.g. `[RUMOR]...`).
    pub event: String,
    /// Whether this entry was flagged important.
    pub important: bool,
}

/// An agent's memory ring, long-term notes, profile, and archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Capped FIFO ring of recent short-term memories.
    #[serde(default = "default_short_memory")]
    pub short_memory: Ring<MemoryEntry>,
    /// Unbounded long-term memory notes.
    #[serde(default)]
    pub long_memory: Vec<String>,
    /// One-line rolling summary.
    #[serde(default)]
    pub summary: String,
    /// Capped archive of significant events involving this agent.
    #[serde(default = "default_entity_archive")]
    pub archive: Ring<ArchiveEntry>,
    /// Capped ring of recent utterances heard by this agent.
    #[serde(default = "default_recent_utterances")]
    pub recent_utterances: Ring<String>,
    /// Mutable profile (trust, mood, flags, reputation, world intent).
    #[serde(default)]
    pub profile: AgentProfile,
}

fn default_short_memory() -> Ring<MemoryEntry> {
    Ring::new(Limits::default().cap_short_memory)
}
fn default_entity_archive() -> Ring<ArchiveEntry> {
    Ring::new(Limits::default().cap_entity_archive)
}
fn default_recent_utterances() -> Ring<String> {
    Ring::new(Limits::default().cap_recent_utterances)
}

impl Default for AgentRecord {
    fn default() -> Self {
        AgentRecord {
            short_memory: default_short_memory(),
            long_memory: Vec::new(),
            summary: String::new(),
            archive: default_entity_archive(),
            recent_utterances: default_recent_utterances(),
            profile: AgentProfile::default(),
        }
    }
}

/// Agent profile: trust, mood, flags, per-faction reputation, and the
/// World Loop's `world_intent` bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentProfile {
    /// Trust in `[0, 10]`.
    #[serde(default)]
    pub trust: i32,
    /// Free-form mood label.
    #[serde(default)]
    pub mood: String,
    /// Free-form behavioral flags.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Reputation per faction; must be integer at load — non-integer
    /// entries in the raw document are dropped rather than failing the
    /// whole load.
    #[serde(default, deserialize_with = "deserialize_integer_rep")]
    pub rep: BTreeMap<String, i64>,
    /// World Loop intent-scheduling state.
    #[serde(default)]
    pub world_intent: IntentState,
    /// Online/offline — offline agents are skipped by the World Loop.
    #[serde(default = "default_true")]
    pub online: bool,
    /// Pending inbound chat messages awaiting a `respond` plan.
    #[serde(default)]
    pub pending_messages: Vec<String>,
    /// Job assignment driving job-based planning (step 5).
    #[serde(default)]
    pub job: Option<JobAssignment>,
}

fn default_true() -> bool {
    true
}

/// Deserialize a reputation map tolerating non-integer values: entries
/// whose raw JSON number is not a whole number are dropped rather than
/// failing the whole document ("non-integer entries are silently
/// dropped at load").
fn deserialize_integer_rep<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, i64>, D::Error>
where
D: serde::Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_json::Value> = serde::Deserialize::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| {
                v.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| (k, f as i64))
            })
        .collect())
}

/// A job role assignment used by job-driven planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAssignment {
    /// One of `scout | guard | builder | farmer | hauler`.
    pub role: String,
    /// Role-specific marker/target keys (e.g. hauler's two markers).
    #[serde(default)]
    pub markers: Vec<String>,
}

/// World Loop per-agent scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntentState {
    /// Current planned intent (`idle | wander | follow | respond`).
    #[serde(default)]
    pub intent: String,
    /// Optional intent target (direction, leader name, message,...).
    #[serde(default)]
    pub intent_target: Option<String>,
    /// Deterministic tick-at timestamp the intent was set.
    #[serde(default)]
    pub intent_set_at: Option<String>,
    /// Human-readable description of the last committed action.
    #[serde(default)]
    pub last_action: Option<String>,
    /// Timestamp of the last committed action.
    #[serde(default)]
    pub last_action_at: Option<String>,
    /// Whether planning is frozen for this agent (step 1).
    #[serde(default)]
    pub frozen: bool,
    /// Whether this agent's intent is manually overridden (step 2).
    #[serde(default)]
    pub manual_override: bool,
    /// Leader name this agent follows, if any.
    #[serde(default)]
    pub leader: Option<String>,
    /// Per-minute event budget bookkeeping.
    #[serde(default)]
    pub budgets: IntentBudget,
    /// `(intent, target)` of the last committed plan, for the repetition
    /// breaker.
    #[serde(default)]
    pub last_plan: Option<(String, Option<String>)>,
    /// How many consecutive ticks `last_plan` has repeated.
    #[serde(default)]
    pub repeat_count: u32,
}

/// A one-minute sliding bucket of scheduled events, for the World Loop's
/// per-agent-per-minute budget.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntentBudget {
    /// The minute bucket (unix seconds / 60) this count applies to.
    #[serde(default)]
    pub minute_bucket: i64,
    /// Number of intents scheduled within `minute_bucket`.
    #[serde(default)]
    pub events_in_min: u32,
}

/// A faction's shared memory: long-term notes, summary, archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionRecord {
    /// Unbounded long-term memory notes.
    #[serde(default)]
    pub long: Vec<String>,
    /// One-line rolling summary.
    #[serde(default)]
    pub summary: String,
    /// Capped archive of significant events involving this faction.
    #[serde(default = "default_entity_archive")]
    pub archive: Ring<ArchiveEntry>,
}

impl Default for FactionRecord {
    fn default() -> Self {
        FactionRecord {
            long: Vec::new(),
            summary: String::new(),
            archive: default_entity_archive(),
        }
    }
}

/// Day/night phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Daytime.
    Day,
    /// Nighttime.
    Night,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Day
    }
}

/// Season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    /// Dawn.
    Dawn,
    /// Long night.
    LongNight,
}

impl Default for Season {
    fn default() -> Self {
        Season::Dawn
    }
}

/// World clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldClock {
    /// Day number, `>= 1`.
    #[serde(default = "default_day")]
    pub day: u64,
    /// Day/night phase.
    #[serde(default)]
    pub phase: Phase,
    /// Season.
    #[serde(default)]
    pub season: Season,
    /// ISO-8601 instant of the last clock update.
    #[serde(default)]
    pub updated_at: String,
}

fn default_day() -> u64 {
    1
}

impl Default for WorldClock {
    fn default() -> Self {
        WorldClock {
            day: 1,
            phase: Phase::Day,
            season: Season::Dawn,
            updated_at: crate::time::to_iso(crate::time::epoch()),
        }
    }
}

/// World-level rule toggles.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldRules {
    /// Whether lethal political actions (e.g. `attack_player`) are allowed.
    #[serde(default)]
    pub allow_lethal_politics: bool,
}

/// Player state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player display name.
    #[serde(default)]
    pub name: String,
    /// Whether the player is alive.
    #[serde(default = "default_true")]
    pub alive: bool,
    /// Legitimacy in `[0, 100]`.
    #[serde(default)]
    pub legitimacy: i32,
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState {
            name: String::new(),
            alive: true,
            legitimacy: 50,
        }
    }
}

/// A faction's world-sim state (distinct from its memory record above).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldFactionState {
    /// Hostility toward the player, `[0, 100]`.
    #[serde(default)]
    pub hostility_to_player: i32,
    /// Internal stability, `[0, 100]`.
    #[serde(default)]
    pub stability: i32,
    /// Towns this faction controls or influences.
    #[serde(default)]
    pub towns: Vec<String>,
    /// Free-form doctrine label.
    #[serde(default)]
    pub doctrine: String,
    /// Rival faction names.
    #[serde(default)]
    pub rivals: Vec<String>,
}

/// Per-town threat state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreatState {
    /// Threat level per town, `[0, 100]`.
    #[serde(default)]
    pub by_town: BTreeMap<String, i32>,
}

/// One offer inside a market ("malformed market offers: active offer
/// with amount<=0; price<=0").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOffer {
    /// Item identifier.
    pub item: String,
    /// Whether the offer is currently active.
    #[serde(default)]
    pub active: bool,
    /// Quantity on offer.
    #[serde(default)]
    pub amount: i64,
    /// Unit price.
    #[serde(default)]
    pub price: f64,
}

impl MarketOffer {
    /// An active offer with non-positive amount or price is malformed.
    pub fn is_malformed(&self) -> bool {
        self.active && (self.amount <= 0 || self.price <= 0.0)
    }
}

/// A market at (optionally) a specific town.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Market {
    /// Town this market belongs to, if any.
    #[serde(default)]
    pub town: Option<String>,
    /// Offers available at this market.
    #[serde(default)]
    pub offers: Vec<MarketOffer>,
}

/// Economy sub-document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Economy {
    /// Currency name, always `"emerald"` by default.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Per-agent balances; malformed (non-finite/negative) entries are
    /// dropped at load.
    #[serde(default, deserialize_with = "deserialize_economy_ledger")]
    pub ledger: BTreeMap<String, u64>,
    /// Total emeralds minted, if tracked.
    #[serde(default)]
    pub minted_total: Option<u64>,
}

fn default_currency() -> String {
    "emerald".to_string()
}

/// Deserialize an economy ledger tolerating malformed entries: non-finite
/// or negative raw values are dropped rather than failing the whole
/// document ("malformed entries are dropped at load").
fn deserialize_economy_ledger<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, u64>, D::Error>
where
D: serde::Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_json::Value> = serde::Deserialize::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| {
                v.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| (k, f as u64))
            })
        .collect())
}

impl Default for Economy {
    fn default() -> Self {
        Economy {
            currency: default_currency(),
            ledger: BTreeMap::new(),
            minted_total: None,
        }
    }
}

/// One chronicle entry (world-memory-context source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronicleEntry {
    /// Stable source id.
    pub id: String,
    /// ISO-8601 instant.
    pub at: String,
    /// Entry type/category.
    #[serde(default)]
    pub entry_type: String,
    /// Related town, if any.
    #[serde(default)]
    pub town_id: Option<String>,
    /// Related faction, if any.
    #[serde(default)]
    pub faction_id: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// One news item (town-crier source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsEntry {
    /// Stable id, used for town-crier dedupe windows.
    pub id: String,
    /// Related town, if any (absent ⇒ global news).
    #[serde(default)]
    pub town: Option<String>,
    /// Headline/body text.
    #[serde(default)]
    pub message: String,
    /// ISO-8601 instant.
    pub at: String,
}

/// A project tracked by a town (`PROJECT_ADVANCE`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectState {
    /// Project identifier, matched against `args.projectId`.
    pub id: String,
    /// Monotonic advancement counter.
    #[serde(default)]
    pub progress: u32,
}

/// Per-town bookkeeping the Execution Adapter's translation table
/// and precondition checks read from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TownState {
    /// Canonical town id.
    pub id: String,
    /// Current mayor's display name, if known.
    #[serde(default)]
    pub mayor_name: Option<String>,
    /// Whether the mayor has given the major-mission briefing.
    #[serde(default)]
    pub mayor_briefed: bool,
    /// Day the mayor's cooldown lifts, if active.
    #[serde(default)]
    pub mayor_cooldown_until_day: Option<u64>,
    /// Whether a major mission is currently active for this town.
    #[serde(default)]
    pub major_mission_active: bool,
    /// Projects known to this town, keyed by project id.
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectState>,
    /// Salvage focus key -> target key map.
    #[serde(default)]
    pub salvage_targets: BTreeMap<String, String>,
    /// Townsfolk talk type -> npc key map.
    #[serde(default)]
    pub npc_keys: BTreeMap<String, String>,
}

/// The full world simulation state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    /// Whether a war is currently active.
    #[serde(default)]
    pub war_active: bool,
    /// Rule toggles.
    #[serde(default)]
    pub rules: WorldRules,
    /// Player state.
    #[serde(default)]
    pub player: PlayerState,
    /// Per-faction world-sim state.
    #[serde(default)]
    pub factions: BTreeMap<String, WorldFactionState>,
    /// World clock.
    #[serde(default)]
    pub clock: WorldClock,
    /// Per-town threat levels.
    #[serde(default)]
    pub threat: ThreatState,
    /// Free-form map markers.
    #[serde(default)]
    pub markers: Vec<serde_json::Value>,
    /// Markets and their offers.
    #[serde(default)]
    pub markets: Vec<Market>,
    /// Economy sub-document.
    #[serde(default)]
    pub economy: Economy,
    /// Durable chronicle of world events (source).
    #[serde(default)]
    pub chronicle: Vec<ChronicleEntry>,
    /// Broadcastable news items (source).
    #[serde(default)]
    pub news: Vec<NewsEntry>,
    /// Free-form quest records.
    #[serde(default)]
    pub quests: Vec<serde_json::Value>,
    /// Capped ring of world-level archive lines.
    #[serde(default = "default_world_archive")]
    pub archive: Ring<ArchiveEntry>,
    /// Known towns, keyed by town id (post alias-normalization).
    #[serde(default)]
    pub towns: BTreeMap<String, TownState>,
    /// Monotonic counter bumped by every committed transaction; paired with
    /// a content hash of this struct to form the Execution Adapter's
    /// freshness projection.
    #[serde(default)]
    pub decision_epoch: u64,
}

fn default_world_archive() -> Ring<ArchiveEntry> {
    Ring::new(Limits::default().cap_world_archive)
}

impl WorldState {
    /// Materialize `iron_pact` and `veil_church` with defaults if missing.
    pub fn ensure_story_factions(&mut self) {
        for name in STORY_FACTIONS {
            self.factions.entry(name.to_string()).or_default();
        }
    }
}
