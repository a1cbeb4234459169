//! Parses a provider's raw plan response into a [`forge_types::Plan`]
//! (spec.md §4.4): strip optional markdown fences, then deserialize
//! against the fixed JSON schema the planner's system prompt requires.

use forge_types::{Plan, TaskSpec};
use layer0::id::PlanId;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawTask {
    id: String,
    name: String,
    description: String,
    agent: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    plan_summary: String,
    tasks: Vec<RawTask>,
}

/// Strip a leading/trailing markdown code fence (``` or ```json) from
/// `raw`, if present. Leaves unfenced content untouched.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    let after_open = after_open.strip_prefix('\n').unwrap_or(after_open);
    after_open.strip_suffix("```").unwrap_or(after_open).trim()
}

/// Parse a (possibly fenced) plan response into a [`Plan`] for
/// `original_request`. Returns the raw `serde_json` error on failure so
/// the caller can log it before falling back.
pub fn parse_plan(raw: &str, original_request: &str) -> Result<Plan, serde_json::Error> {
    let stripped = strip_code_fence(raw);
    let parsed: RawPlan = serde_json::from_str(stripped)?;

    let tasks = parsed
        .tasks
        .into_iter()
        .map(|t| TaskSpec::new(t.id, t.name, t.description, t.agent, t.depends_on.into_iter().map(Into::into).collect()))
        .collect();

    Ok(Plan::new(PlanId::new(uuid_like_id()), parsed.plan_summary, tasks, original_request))
}

/// A short, non-cryptographic id for a freshly parsed plan. Plans don't
/// need global uniqueness guarantees beyond "distinct within one run", so
/// this avoids pulling in a UUID dependency for a single call site.
fn uuid_like_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("plan-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_fence() {
        let raw = "```\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn strips_json_tagged_fence() {
        let raw = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn leaves_unfenced_content_untouched() {
        let raw = "{\"a\":1}";
        assert_eq!(strip_code_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn parses_well_formed_plan() {
        let raw = r#"{
            "plan_summary": "do two things",
            "tasks": [
                {"id": "t1", "name": "first", "description": "d1", "agent": "researcher", "depends_on": []},
                {"id": "t2", "name": "second", "description": "d2", "agent": "coder", "depends_on": ["t1"]}
            ]
        }"#;
        let plan = parse_plan(raw, "original").unwrap();
        assert_eq!(plan.summary, "do two things");
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[1].depends_on[0].as_str(), "t1");
        assert_eq!(plan.original_request, "original");
    }

    #[test]
    fn rejects_malformed_json() {
        let result = parse_plan("not json", "original");
        assert!(result.is_err());
    }

    #[test]
    fn keeps_dangling_dependency_reference() {
        let raw = r#"{"plan_summary": "s", "tasks": [
            {"id": "t1", "name": "n", "description": "d", "agent": "coder", "depends_on": ["nonexistent"]}
        ]}"#;
        let plan = parse_plan(raw, "original").unwrap();
        assert_eq!(plan.tasks[0].depends_on[0].as_str(), "nonexistent");
    }
}
