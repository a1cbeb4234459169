//! Built-in agent roles (spec.md REDESIGN FLAGS §9): one `Agent` record
//! parameterised by a role descriptor, rather than one Rust type per role.

use std::collections::HashMap;

/// Everything that distinguishes one role from another: its display name,
/// a short description surfaced in plans, and the system-prompt template
/// it renders into.
#[derive(Debug, Clone)]
pub struct RoleDescriptor {
    /// The role's registered name (matches `TaskSpec::agent`).
    pub name: String,
    /// Human-readable summary, useful in planner prompts.
    pub description: String,
    /// Template rendered by [`RoleDescriptor::render`]. Contains the
    /// literal placeholders `{task}` and `{memory_context}`.
    pub prompt_template: String,
}

impl RoleDescriptor {
    /// Render this role's system prompt for one invocation.
    pub fn render(&self, task_description: &str, memory_context: &str) -> String {
        self.prompt_template.replace("{task}", task_description).replace("{memory_context}", memory_context)
    }
}

/// Maps a role name to its [`RoleDescriptor`], with a fallback for
/// unrecognized roles.
///
/// Built-in roles: `coder`, `researcher`, `reviewer`, `orchestrator` (the
/// plan synthesizer), and `generalist`. Per the redesign note, the
/// generalist descriptor is also what any unknown role name resolves to —
/// concretely it is registered once, under its own name, and looked up as
/// the fallback rather than duplicated under a second key.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: HashMap<String, RoleDescriptor>,
}

impl RoleRegistry {
    /// A registry empty of roles.
    pub fn empty() -> Self {
        Self { roles: HashMap::new() }
    }

    /// Register or overwrite a role.
    pub fn register(&mut self, descriptor: RoleDescriptor) -> &mut Self {
        self.roles.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Resolve `name` to its descriptor, falling back to `generalist` when
    /// `name` isn't registered. Panics if `generalist` itself was never
    /// registered — callers should build registries via
    /// [`RoleRegistry::with_builtins`] to avoid this.
    pub fn resolve(&self, name: &str) -> &RoleDescriptor {
        self.roles.get(name).unwrap_or_else(|| {
            self.roles.get("generalist").expect("generalist role must be registered as the fallback")
        })
    }

    /// The built-in role set: `coder`, `researcher`, `reviewer`,
    /// `orchestrator`, `generalist`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry
            .register(RoleDescriptor {
                name: "coder".to_string(),
                description: "Writes and edits source code, runs tests, commits changes.".to_string(),
                prompt_template: CODER_TEMPLATE.to_string(),
            })
            .register(RoleDescriptor {
                name: "researcher".to_string(),
                description: "Gathers and summarizes information; does not modify the workspace.".to_string(),
                prompt_template: RESEARCHER_TEMPLATE.to_string(),
            })
            .register(RoleDescriptor {
                name: "reviewer".to_string(),
                description: "Reads existing work and critiques it against the original request.".to_string(),
                prompt_template: REVIEWER_TEMPLATE.to_string(),
            })
            .register(RoleDescriptor {
                name: "orchestrator".to_string(),
                description: "Synthesizes the outputs of a completed plan into one final answer.".to_string(),
                prompt_template: ORCHESTRATOR_TEMPLATE.to_string(),
            })
            .register(RoleDescriptor {
                name: "generalist".to_string(),
                description: "Handles anything that doesn't need a specialist role.".to_string(),
                prompt_template: GENERALIST_TEMPLATE.to_string(),
            });
        registry
    }
}

const CODER_TEMPLATE: &str = "You are a software engineer working inside a sandboxed project \
workspace. Use the available tools to read, write, and test files as needed. Be precise and \
make only the changes the task calls for.\n\nTask:\n{task}\n\nContext:\n{memory_context}";

const RESEARCHER_TEMPLATE: &str = "You are a researcher. Gather the information this task needs \
using the available tools, then summarize your findings clearly. Do not modify the workspace.\n\n\
Task:\n{task}\n\nContext:\n{memory_context}";

const REVIEWER_TEMPLATE: &str = "You are a reviewer. Examine the referenced work against the \
original request and report concrete issues, or confirm it is acceptable.\n\nTask:\n{task}\n\n\
Context:\n{memory_context}";

const ORCHESTRATOR_TEMPLATE: &str = "You synthesize the results of a completed multi-step plan \
into one coherent final answer for the person who made the original request. Do not restate raw \
tool output verbatim; summarize it.\n\nTask:\n{task}\n\nContext:\n{memory_context}";

const GENERALIST_TEMPLATE: &str = "You are a capable assistant. Complete the task below using the \
available tools if they help.\n\nTask:\n{task}\n\nContext:\n{memory_context}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_falls_back_to_generalist() {
        let registry = RoleRegistry::with_builtins();
        let resolved = registry.resolve("some-made-up-role");
        assert_eq!(resolved.name, "generalist");
    }

    #[test]
    fn known_role_resolves_to_itself() {
        let registry = RoleRegistry::with_builtins();
        assert_eq!(registry.resolve("coder").name, "coder");
    }

    #[test]
    fn render_substitutes_both_placeholders() {
        let registry = RoleRegistry::with_builtins();
        let rendered = registry.resolve("researcher").render("find X", "prior notes");
        assert!(rendered.contains("find X"));
        assert!(rendered.contains("prior notes"));
    }
}
