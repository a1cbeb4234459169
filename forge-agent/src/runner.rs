//! An object-safe boundary over [`Agent`], for callers (`forge-executor`,
//! `forge-orchestrator`) that need to hold one agent-running handle without
//! being generic over a concrete [`Provider`]. The generic, non-object-safe
//! engine lives one layer down, and callers depend only on this trait.

use crate::agent::{Agent, AgentContext, DEFAULT_MAX_ITERATIONS};
use crate::role::RoleRegistry;
use async_trait::async_trait;
use forge_provider::Provider;
use forge_tool::ToolRegistry;
use forge_types::AgentResult;
use std::sync::Arc;

/// Runs one role-named agent invocation to completion.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Resolve `role` (falling back to `generalist` if unrecognized) and
    /// run it on `ctx`.
    async fn run(&self, role: &str, ctx: AgentContext) -> AgentResult;
}

/// The default [`AgentRunner`]: a role registry plus one shared provider
/// and tool registry.
pub struct RegistryRunner<P: Provider> {
    roles: RoleRegistry,
    provider: Arc<P>,
    tools: Arc<ToolRegistry>,
    temperature: f32,
    max_iterations: u32,
}

impl<P: Provider> RegistryRunner<P> {
    /// Build a runner with the built-in role set
    /// ([`RoleRegistry::with_builtins`]) and the default iteration budget.
    pub fn new(provider: Arc<P>, tools: Arc<ToolRegistry>, temperature: f32) -> Self {
        Self { roles: RoleRegistry::with_builtins(), provider, tools, temperature, max_iterations: DEFAULT_MAX_ITERATIONS }
    }

    /// Use a custom role registry instead of the built-ins.
    pub fn with_roles(mut self, roles: RoleRegistry) -> Self {
        self.roles = roles;
        self
    }

    /// Override the default iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

#[async_trait]
impl<P: Provider + 'static> AgentRunner for RegistryRunner<P> {
    async fn run(&self, role: &str, ctx: AgentContext) -> AgentResult {
        let descriptor = self.roles.resolve(role);
        let agent = Agent::new(descriptor, self.provider.as_ref(), self.tools.as_ref(), self.temperature)
            .with_max_iterations(self.max_iterations);
        agent.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_provider::testing::ScriptedProvider;
    use layer0::id::TaskId;

    #[tokio::test]
    async fn resolves_role_and_runs() {
        let provider = Arc::new(ScriptedProvider::single_text("done"));
        let tools = Arc::new(ToolRegistry::new());
        let runner = RegistryRunner::new(provider, tools, 0.7);

        let ctx = AgentContext { task_id: TaskId::new("t1"), task_description: "go".to_string(), memory_context: String::new() };
        let result = runner.run("coder", ctx).await;
        assert!(result.success);
        assert_eq!(result.agent_name, "coder");
    }

    #[tokio::test]
    async fn unknown_role_falls_back_to_generalist() {
        let provider = Arc::new(ScriptedProvider::single_text("done"));
        let tools = Arc::new(ToolRegistry::new());
        let runner = RegistryRunner::new(provider, tools, 0.7);

        let ctx = AgentContext { task_id: TaskId::new("t1"), task_description: "go".to_string(), memory_context: String::new() };
        let result = runner.run("nonexistent-role", ctx).await;
        assert_eq!(result.agent_name, "generalist");
    }
}
