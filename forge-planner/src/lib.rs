#![deny(missing_docs)]
//! `create_plan` (spec.md §4.4): one structured-output provider call that
//! decomposes a user request into a task DAG, falling back to a
//! single-task plan on any parse or request failure. Never invokes tools.

mod parse;

use forge_provider::Provider;
use forge_types::{Message, Plan};

/// Sampling temperature for planning calls: low, for determinism.
const PLANNER_TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = r#"You are a planning assistant. Decompose the user's request into a
directed acyclic graph of tasks.

Respond with JSON only, matching exactly this shape, and nothing else (no prose, no markdown
fences):

{
  "plan_summary": "<one-line summary of the overall plan>",
  "tasks": [
    {
      "id": "<short unique id, e.g. t1>",
      "name": "<short human-readable name>",
      "description": "<what this task must accomplish, in enough detail to run standalone>",
      "agent": "<one of: coder, researcher, reviewer, generalist>",
      "depends_on": ["<ids of tasks that must complete first, or [] >"]
    }
  ]
}

If the request is a single simple step, return a plan with exactly one task."#;

/// Decompose `user_request` into a [`Plan`], optionally primed with
/// `context_text` (memory context from the orchestrator).
///
/// Never returns an error: a failed provider call or an unparseable
/// response both fall back to [`Plan::fallback`], matching spec.md §4.4's
/// "fallback on parse failure or structural error" contract.
pub async fn create_plan<P: Provider>(provider: &P, user_request: &str, context_text: Option<&str>) -> Plan {
    let mut user_content = user_request.to_string();
    if let Some(context) = context_text
        && !context.is_empty()
    {
        user_content = format!("{user_content}\n\nContext:\n{context}");
    }

    let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(user_content)];

    let response = match provider.complete(&messages, None, PLANNER_TEMPERATURE, 2048).await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(%error, "planning request failed, falling back to single-task plan");
            return Plan::fallback(user_request);
        }
    };

    let Some(content) = response.content else {
        tracing::warn!("planning response had no text content, falling back to single-task plan");
        return Plan::fallback(user_request);
    };

    match parse::parse_plan(&content, user_request) {
        Ok(plan) => plan,
        Err(error) => {
            tracing::warn!(%error, "could not parse plan from model response, falling back");
            Plan::fallback(user_request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_provider::testing::ScriptedProvider;
    use forge_provider::{FinishReason, Response, Usage};

    fn text_response(text: &str) -> Response {
        Response { content: Some(text.to_string()), tool_calls: vec![], finish_reason: FinishReason::Stop, usage: Usage::default() }
    }

    #[tokio::test]
    async fn builds_plan_from_well_formed_response() {
        let provider = ScriptedProvider::new(vec![Ok(text_response(
            r#"```json
            {"plan_summary": "two steps", "tasks": [
                {"id": "t1", "name": "research", "description": "find stuff", "agent": "researcher", "depends_on": []},
                {"id": "t2", "name": "write", "description": "write it up", "agent": "coder", "depends_on": ["t1"]}
            ]}
            ```"#,
        ))]);

        let plan = create_plan(&provider, "research and write a report", None).await;
        assert_eq!(plan.summary, "two steps");
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.original_request, "research and write a report");
    }

    #[tokio::test]
    async fn falls_back_on_unparseable_response() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("I can't produce JSON right now."))]);
        let plan = create_plan(&provider, "do a thing", None).await;
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].agent, "generalist");
        assert_eq!(plan.tasks[0].description, "do a thing");
    }

    #[tokio::test]
    async fn falls_back_on_provider_error() {
        let provider = ScriptedProvider::new(vec![Err(forge_provider::ProviderError::Transient("down".into()))]);
        let plan = create_plan(&provider, "do a thing", None).await;
        assert_eq!(plan.tasks.len(), 1);
    }

    #[tokio::test]
    async fn context_text_is_appended_to_user_message() {
        let provider = ScriptedProvider::new(vec![Ok(text_response(r#"{"plan_summary": "s", "tasks": []}"#))]);
        create_plan(&provider, "do it", Some("prior notes here")).await;
        let requests = provider.captured_requests();
        let user_msg = requests[0].iter().find(|m| m.role == forge_types::Role::User).unwrap();
        assert!(user_msg.content.contains("prior notes here"));
    }
}
