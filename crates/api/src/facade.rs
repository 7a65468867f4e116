//! `AgentWorld`: the facade an external collaborator drives. This
//! crate does not own a stdin/stdout loop — that shell is itself an
//! external collaborator and explicitly out of scope — it only
//! exposes the calls such a shell would make, one per CLI surface command.

use crate::envelope::execution_result_line;
use crate::error::{from_core, ApiError};
use crate::handoff_line::parse_handoff_line;
use crate::memory_request::{format_world_memory_response_line, parse_world_memory_request_line};
use agentworld_context::build_context;
use agentworld_execution::{apply_handoff, ExecutionStore, ExecutionStoreConfig, TownAliasMap};
use agentworld_memory::MemoryStore;
use agentworld_turn::{
    apply_turn, record_incoming, ActingAgent, ApplyTurnResult, GodCommandOutcome, GodCommandRequest, GodCommandService, ProfileCarrier,
    SanitizedTurn,
};
use agentworld_worldloop::{TickReport, WorldLoop, WorldLoopConfig};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Owns the shared subsystems one running world needs and exposes them as
/// plain method calls: `talk`/`god` for the two line-prefixed CLI verbs,
/// one handler per JSON line shape, and `tick` to drive the World Loop.
pub struct AgentWorld {
    memory: Arc<MemoryStore>,
    execution_store: Arc<dyn ExecutionStore + Send + Sync>,
    god_service: Arc<dyn GodCommandService + Send + Sync>,
    alias_map: TownAliasMap,
    world_loop: Mutex<Option<WorldLoop>>,
}

impl AgentWorld {
    /// Build a facade over the given subsystems. The World Loop is absent
    /// until `with_world_loop` is called; `tick` fails until then.
    pub fn new(
        memory: Arc<MemoryStore>,
        execution_store: Arc<dyn ExecutionStore + Send + Sync>,
        god_service: Arc<dyn GodCommandService + Send + Sync>,
        alias_map: TownAliasMap,
    ) -> Self {
        AgentWorld {
            memory,
            execution_store,
            god_service,
            alias_map,
            world_loop: Mutex::new(None),
        }
    }

    /// Build a facade the same way `new` does, but select the Execution
    /// Store backend from `execution_store_config` instead of requiring
    /// the caller to have already constructed one.
    pub fn open(
        memory: Arc<MemoryStore>,
        execution_store_config: ExecutionStoreConfig,
        god_service: Arc<dyn GodCommandService + Send + Sync>,
        alias_map: TownAliasMap,
    ) -> Result<Self, ApiError> {
        let execution_store = execution_store_config.build(memory.clone()).map_err(from_core)?;
        Ok(AgentWorld::new(memory, execution_store, god_service, alias_map))
    }

    /// Attach a World Loop so `tick` becomes callable.
    pub fn with_world_loop(self, config: WorldLoopConfig) -> Self {
        *self.world_loop.lock() = Some(WorldLoop::new(config));
        self
    }

    /// Handle one advisory-handoff line, returning the
    /// `execution-result.v1` response line.
    pub fn handle_advisory_handoff_line(&self, line: &str) -> Result<Value, ApiError> {
        let handoff = parse_handoff_line(line)?;
        let receipt = apply_handoff(
            &self.memory,
            self.execution_store.as_ref(),
            self.god_service.as_ref(),
            &handoff,
            &self.alias_map,
        )
        .map_err(from_core)?;
        Ok(execution_result_line(&receipt))
    }

    /// Handle one world-memory-request line, returning the
    /// `world-memory-context.v1` response line.
    pub fn handle_world_memory_request_line(&self, line: &str) -> Result<Value, ApiError> {
        let scope = parse_world_memory_request_line(line)?;
        let snapshot = self.memory.get_snapshot();
        let context = build_context(self.execution_store.as_ref(), &snapshot, scope).map_err(from_core)?;
        format_world_memory_response_line(&context)
    }

    /// `talk <agent> <message>`: record the incoming utterance, then apply
    /// a sanitized turn derived from `raw_turn` (the agent's own reply,
    /// already produced by whatever drives this agent — generating that
    /// reply is outside this facade's concern).
    pub fn talk(
        &self,
        agent: &ActingAgent,
        player_name: Option<&str>,
        message: &str,
        raw_turn: &Value,
        fallback_turn: &SanitizedTurn,
        operation_id: &str,
        profile_mutator: impl FnOnce(&SanitizedTurn, &mut ProfileCarrier),
    ) -> Result<ApplyTurnResult, ApiError> {
        record_incoming(&self.memory, agent, player_name, message, operation_id).map_err(from_core)?;
        apply_turn(&self.memory, agent, raw_turn, fallback_turn, operation_id, profile_mutator).map_err(from_core)
    }

    /// `god <command>`: run one authority command through the configured
    /// `GodCommandService`.
    pub fn god(&self, request: GodCommandRequest) -> Result<GodCommandOutcome, ApiError> {
        self.god_service.apply_god_command(&self.memory, request).map_err(from_core)
    }

    /// Drive one World Loop tick. Fails with `ApiError::Malformed` if no
    /// World Loop was attached via `with_world_loop`.
    pub fn tick(&self, tick_number: u64) -> Result<TickReport, ApiError> {
        let mut guard = self.world_loop.lock();
        let world_loop = guard
        .as_mut()
        .ok_or_else(|| ApiError::Malformed("no world loop configured on this facade".to_string()))?;
        world_loop.run_tick(&self.memory, tick_number).map_err(from_core)
    }
}
