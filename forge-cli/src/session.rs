//! The REPL loop itself, grounded in the pack's `ReplSession` pattern
//! (rustyline for line editing, colored output, `/`-prefixed commands
//! dispatched before falling through to `Orchestrator::run`).

use crate::CliError;
use colored::Colorize;
use forge_orchestrator::{Intent, Orchestrator};
use forge_provider::Provider;
use forge_scheduler::compute_next_run;
use forge_state::{ImprovementStore, ProjectStore, ScheduleStore};
use forge_tool::ToolRegistry;
use forge_types::ScheduledItemStatus;
use layer0::id::ScheduledItemId;
use layer0::scope::Scope;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;

/// Whether the REPL loop should keep going after a slash command.
enum SlashResult {
    Continue,
    Quit,
}

/// An interactive REPL session over one [`Orchestrator`].
pub struct ReplSession<P: Provider + 'static> {
    orchestrator: Arc<Orchestrator<P>>,
    tools: Arc<ToolRegistry>,
    projects: Arc<dyn ProjectStore>,
    schedule: Arc<dyn ScheduleStore>,
    improvements: Arc<dyn ImprovementStore>,
}

impl<P: Provider + 'static> ReplSession<P> {
    /// Build a session over the given orchestrator and its collaborators.
    /// `tools` must be the same registry the orchestrator was built with,
    /// since the orchestrator doesn't expose its own copy back out.
    pub fn new(orchestrator: Arc<Orchestrator<P>>, tools: Arc<ToolRegistry>, projects: Arc<dyn ProjectStore>, schedule: Arc<dyn ScheduleStore>, improvements: Arc<dyn ImprovementStore>) -> Self {
        Self { orchestrator, tools, projects, schedule, improvements }
    }

    /// Run the REPL main loop until `/exit`, `/quit`, `/q`, or EOF.
    pub async fn run(&self, initial_prompt: Option<String>) -> Result<(), CliError> {
        self.print_welcome();

        if let Some(prompt) = initial_prompt {
            println!("{} {}", ">".bright_green(), prompt);
            self.process_user_input(&prompt).await;
        }

        let mut rl = DefaultEditor::new().map_err(|e| CliError::Readline(e.to_string()))?;

        loop {
            self.drain_reminders().await;

            match rl.readline(&format!("{} ", ">".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if let Some(stripped) = input.strip_prefix('/') {
                        match self.handle_slash_command(stripped).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(CliError::Readline(err.to_string())),
            }
        }

        println!("{}", "goodbye".dimmed());
        Ok(())
    }

    async fn drain_reminders(&self) {
        for reminder in self.orchestrator.pop_reminders().await {
            println!("{} {reminder}", "reminder:".yellow().bold());
        }
    }

    async fn process_user_input(&self, input: &str) {
        match self.orchestrator.run(input, Intent::User).await {
            Ok(response) => println!("{response}"),
            Err(error) => println!("{} {error}", "error:".red().bold()),
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "forge".bright_cyan().bold());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    fn print_help(&self) {
        println!("{}", "commands:".bold());
        println!("  /exit, /quit, /q            exit");
        println!("  /help                       this text");
        println!("  /tools                      list registered tools");
        println!("  /history                    last 10 conversations");
        println!("  /objective [show|set <text>|clear]   active project's objective");
        println!("  /schedule list|upcoming|cancel <id>|pause <id>|resume <id>");
        println!("  /improvements [N]           last N improvement attempts (default 5)");
        println!("  /logout                     invalidate stored provider credentials");
    }

    async fn handle_slash_command(&self, rest: &str) -> SlashResult {
        let mut parts = rest.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        match cmd {
            "exit" | "quit" | "q" => return SlashResult::Quit,
            "help" => self.print_help(),
            "tools" => self.cmd_tools(),
            "history" => self.cmd_history().await,
            "objective" => self.cmd_objective(&args).await,
            "schedule" => self.cmd_schedule(&args).await,
            "improvements" => self.cmd_improvements(&args).await,
            "logout" => self.cmd_logout().await,
            other => println!("{} unknown command /{other}, try /help", "error:".red().bold()),
        }
        SlashResult::Continue
    }

    fn cmd_tools(&self) {
        if self.tools.is_empty() {
            println!("no tools registered");
            return;
        }
        for spec in self.tools.schemas() {
            println!("{} — {}", spec.name.bold(), spec.description);
        }
    }

    async fn cmd_history(&self) {
        let scope = self.orchestrator.active_scope().await;
        let state = self.orchestrator.state();
        let keys = match state.list(&scope, forge_context::conversation_log::list_prefix()).await {
            Ok(keys) => keys,
            Err(error) => {
                println!("{} {error}", "error:".red().bold());
                return;
            }
        };
        let recent = forge_context::conversation_log::most_recent(keys, 10);
        if recent.is_empty() {
            println!("no conversations yet");
            return;
        }
        for key in recent {
            let Ok(Some(value)) = state.read(&scope, &key).await else { continue };
            let Ok(conversation) = serde_json::from_value::<forge_types::Conversation>(value) else { continue };
            println!("{} {}", conversation.ts.format("[%Y-%m-%d %H:%M:%S]").to_string().dimmed(), conversation.user_msg);
            println!("  {}", conversation.agent_msg);
        }
    }

    async fn cmd_objective(&self, args: &[&str]) {
        let Scope::Project(project_id) = self.orchestrator.active_scope().await else {
            println!("no active project — mention one with #<slug> first");
            return;
        };
        let project = match self.projects.get(&project_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                println!("{} active project no longer exists", "error:".red().bold());
                return;
            }
            Err(error) => {
                println!("{} {error}", "error:".red().bold());
                return;
            }
        };

        match args.first().copied().unwrap_or("show") {
            "show" => {
                if project.has_objective() {
                    println!("{}", project.objective);
                } else {
                    println!("(no objective set)");
                }
            }
            "set" => {
                let text = args[1..].join(" ");
                let mut project = project;
                project.objective = text;
                if let Err(error) = self.projects.save(&project).await {
                    println!("{} {error}", "error:".red().bold());
                } else {
                    println!("objective updated");
                }
            }
            "clear" => {
                let mut project = project;
                project.objective.clear();
                if let Err(error) = self.projects.save(&project).await {
                    println!("{} {error}", "error:".red().bold());
                } else {
                    println!("objective cleared");
                }
            }
            other => println!("{} unknown /objective subcommand {other}", "error:".red().bold()),
        }
    }

    async fn cmd_schedule(&self, args: &[&str]) {
        match args.first().copied().unwrap_or("list") {
            "list" => match self.schedule.list().await {
                Ok(items) => {
                    for item in items {
                        println!("{}  {:?}  {:?}  {}", item.id, item.item_type, item.status, item.title);
                    }
                }
                Err(error) => println!("{} {error}", "error:".red().bold()),
            },
            "upcoming" => match self.schedule.list_active_ordered().await {
                Ok(items) => {
                    for item in items {
                        let when = item.next_run_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "?".to_string());
                        println!("{}  {when}  {}", item.id, item.title);
                    }
                }
                Err(error) => println!("{} {error}", "error:".red().bold()),
            },
            "cancel" => self.set_schedule_status(args.get(1).copied(), ScheduledItemStatus::Cancelled).await,
            "pause" => self.set_schedule_status(args.get(1).copied(), ScheduledItemStatus::Paused).await,
            "resume" => self.resume_schedule(args.get(1).copied()).await,
            other => println!("{} unknown /schedule subcommand {other}", "error:".red().bold()),
        }
    }

    async fn set_schedule_status(&self, id: Option<&str>, status: ScheduledItemStatus) {
        let Some(id) = id else {
            println!("{} usage: /schedule {{cancel|pause}} <id>", "error:".red().bold());
            return;
        };
        let id = ScheduledItemId::new(id);
        match self.schedule.get(&id).await {
            Ok(Some(mut item)) => {
                item.status = status;
                item.next_run_at = None;
                if let Err(error) = self.schedule.save(&item).await {
                    println!("{} {error}", "error:".red().bold());
                } else {
                    println!("updated");
                }
            }
            Ok(None) => println!("{} no such scheduled item", "error:".red().bold()),
            Err(error) => println!("{} {error}", "error:".red().bold()),
        }
    }

    async fn resume_schedule(&self, id: Option<&str>) {
        let Some(id) = id else {
            println!("{} usage: /schedule resume <id>", "error:".red().bold());
            return;
        };
        let id = ScheduledItemId::new(id);
        match self.schedule.get(&id).await {
            Ok(Some(mut item)) => {
                item.next_run_at = compute_next_run(&item.schedule, chrono::Utc::now());
                item.status = if item.next_run_at.is_some() { ScheduledItemStatus::Active } else { ScheduledItemStatus::Done };
                if let Err(error) = self.schedule.save(&item).await {
                    println!("{} {error}", "error:".red().bold());
                } else {
                    println!("resumed");
                }
            }
            Ok(None) => println!("{} no such scheduled item", "error:".red().bold()),
            Err(error) => println!("{} {error}", "error:".red().bold()),
        }
    }

    async fn cmd_improvements(&self, args: &[&str]) {
        let n = args.first().and_then(|s| s.parse::<usize>().ok()).unwrap_or(5);
        match self.improvements.recent(n).await {
            Ok(attempts) => {
                if attempts.is_empty() {
                    println!("no improvement attempts yet");
                }
                for attempt in attempts {
                    let status = if attempt.merged { "merged".green() } else { "no-op".dimmed() };
                    println!("cycle {}  {}  {}  {} tokens  {}", attempt.cycle, attempt.branch, status, attempt.tokens_used, attempt.created_at.to_rfc3339());
                    if let Some(error) = attempt.error {
                        println!("  {} {error}", "error:".red().bold());
                    }
                }
            }
            Err(error) => println!("{} {error}", "error:".red().bold()),
        }
    }

    async fn cmd_logout(&self) {
        let key = forge_context::knowledge::key_for("provider.credentials");
        match self.orchestrator.state().delete(&Scope::Global, &key).await {
            Ok(()) => println!("stored provider credentials invalidated"),
            Err(error) => println!("{} {error}", "error:".red().bold()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_bus::Bus;
    use forge_orchestrator::{ImprovementGate, RuntimeConfig};
    use forge_provider::testing::ScriptedProvider;
    use forge_sandbox::Sandbox;
    use forge_state::memory::MemoryStore;
    use forge_state::{KvImprovementStore, KvProjectStore, KvScheduleStore};
    use forge_types::{Project, RecurrenceSpec, ScheduledItem, ScheduledItemType};
    use layer0::id::ProjectId;
    use layer0::state::StateStore;
    use std::env::temp_dir;

    fn build(provider: ScriptedProvider) -> ReplSession<ScriptedProvider> {
        let state: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let projects: Arc<dyn ProjectStore> = Arc::new(KvProjectStore::new(state.clone()));
        let schedule: Arc<dyn ScheduleStore> = Arc::new(KvScheduleStore::new(state.clone()));
        let improvements: Arc<dyn ImprovementStore> = Arc::new(KvImprovementStore::new(state.clone()));
        let tools = Arc::new(ToolRegistry::new());
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(provider),
            tools.clone(),
            Arc::new(Sandbox::new(temp_dir())),
            Arc::new(Bus::new()),
            state,
            projects.clone(),
            Arc::new(ImprovementGate::new()),
            RuntimeConfig::default(),
        ));
        ReplSession::new(orchestrator, tools, projects, schedule, improvements)
    }

    #[tokio::test]
    async fn tools_command_lists_nothing_when_registry_is_empty() {
        let session = build(ScriptedProvider::single_text("hi"));
        session.cmd_tools();
    }

    #[tokio::test]
    async fn objective_without_an_active_project_is_reported() {
        let session = build(ScriptedProvider::single_text("hi"));
        session.cmd_objective(&["show"]).await;
    }

    #[tokio::test]
    async fn objective_set_and_show_round_trip_through_the_project_store() {
        let session = build(ScriptedProvider::single_text("hi"));
        let project = Project::new(ProjectId::new("proj-1"), "Demo", "demo", temp_dir(), chrono::Utc::now());
        session.projects.save(&project).await.unwrap();
        session.orchestrator.set_active_project(&project).await;

        session.cmd_objective(&["set", "ship", "the", "thing"]).await;
        let updated = session.projects.get(&project.id).await.unwrap().unwrap();
        assert_eq!(updated.objective, "ship the thing");

        session.cmd_objective(&["clear"]).await;
        let cleared = session.projects.get(&project.id).await.unwrap().unwrap();
        assert!(!cleared.has_objective());
    }

    #[tokio::test]
    async fn schedule_pause_clears_next_run_and_resume_recomputes_it() {
        let session = build(ScriptedProvider::single_text("hi"));
        let item = ScheduledItem::new(
            "sched-1",
            ScheduledItemType::Reminder,
            "daily standup",
            "stand up",
            RecurrenceSpec::Interval { minutes: 60 },
            Some(chrono::Utc::now()),
            chrono::Utc::now(),
        );
        session.schedule.save(&item).await.unwrap();

        session.set_schedule_status(Some("sched-1"), ScheduledItemStatus::Paused).await;
        let paused = session.schedule.get(&item.id).await.unwrap().unwrap();
        assert_eq!(paused.status, ScheduledItemStatus::Paused);
        assert!(paused.next_run_at.is_none());

        session.resume_schedule(Some("sched-1")).await;
        let resumed = session.schedule.get(&item.id).await.unwrap().unwrap();
        assert_eq!(resumed.status, ScheduledItemStatus::Active);
        assert!(resumed.next_run_at.is_some());
    }

    #[tokio::test]
    async fn improvements_command_reports_when_none_recorded_yet() {
        let session = build(ScriptedProvider::single_text("hi"));
        session.cmd_improvements(&[]).await;
    }

    #[tokio::test]
    async fn logout_deletes_the_credentials_knowledge_key_without_erroring() {
        let session = build(ScriptedProvider::single_text("hi"));
        session.cmd_logout().await;
    }
}
