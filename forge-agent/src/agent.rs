//! The tool-calling agent loop (spec.md §4.3): a seeded message list, a
//! bounded number of provider round-trips, and in-order tool-call
//! execution via a [`ToolRegistry`].

use crate::retry::with_retry;
use crate::role::RoleDescriptor;
use forge_provider::Provider;
use forge_tool::ToolRegistry;
use forge_types::{AgentResult, Message};
use layer0::id::TaskId;

/// Default ceiling on provider round-trips within one `run` call.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Input to one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// The task this run is for.
    pub task_id: TaskId,
    /// Natural-language description of what the agent should do.
    pub task_description: String,
    /// Assembled memory context (recent history + semantic recall +
    /// knowledge, and/or dependency context for plan tasks). May be empty.
    pub memory_context: String,
}

/// One role-parameterised agent: a role descriptor, a provider, a tool
/// registry, an iteration budget, and a sampling temperature.
pub struct Agent<'a, P: Provider> {
    role: &'a RoleDescriptor,
    provider: &'a P,
    tools: &'a ToolRegistry,
    max_iterations: u32,
    temperature: f32,
}

impl<'a, P: Provider> Agent<'a, P> {
    /// Build an agent. `max_iterations` defaults to
    /// [`DEFAULT_MAX_ITERATIONS`] via [`Agent::with_max_iterations`] if
    /// left unset.
    pub fn new(role: &'a RoleDescriptor, provider: &'a P, tools: &'a ToolRegistry, temperature: f32) -> Self {
        Self { role, provider, tools, max_iterations: DEFAULT_MAX_ITERATIONS, temperature }
    }

    /// Override the default iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run this agent to completion (or failure) on one [`AgentContext`].
    ///
    /// Never returns `Err`: provider/tool failures are folded into
    /// `AgentResult{success: false, error: Some(..)}`, matching the
    /// propagation policy that errors become strings at the agent/task
    /// boundary (spec.md §7).
    pub async fn run(&self, ctx: AgentContext) -> AgentResult {
        let system_prompt = self.role.render(&ctx.task_description, &ctx.memory_context);
        let mut messages = vec![Message::system(system_prompt), Message::user(&ctx.task_description)];
        let mut tool_calls_made: u32 = 0;
        let mut tokens_used: u64 = 0;

        let span = tracing::info_span!("agent.run", task_id = %ctx.task_id, role = %self.role.name);
        let _entered = span.enter();

        for iteration in 0..self.max_iterations {
            tracing::debug!(iteration, "agent iteration");

            let schemas = self.tools.schemas();
            let response = with_retry(|| self.provider.complete(&messages, Some(&schemas), self.temperature, 4096)).await;

            let response = match response {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(%error, "agent run failed on provider error");
                    return AgentResult::err(ctx.task_id, &self.role.name, error.to_string(), tool_calls_made, tokens_used);
                }
            };

            tokens_used += response.usage.total();

            if response.tool_calls.is_empty() {
                return AgentResult::ok(
                    ctx.task_id,
                    &self.role.name,
                    response.content.unwrap_or_default(),
                    tool_calls_made,
                    tokens_used,
                );
            }

            messages.push(Message::assistant_tool_calls(response.content.unwrap_or_default(), response.tool_calls.clone()));

            for call in &response.tool_calls {
                let result = self.tools.invoke(&call.name, call.arguments.clone()).await;
                tool_calls_made += 1;
                messages.push(Message::tool_result(&call.id, result.as_observation()));
            }
        }

        tracing::warn!(max_iterations = self.max_iterations, "agent exhausted its iteration budget");
        AgentResult::err(ctx.task_id, &self.role.name, "max iterations reached", tool_calls_made, tokens_used)
    }
}
