//! Interactive chat shell on top of the gateway
//!
//! Multi-turn conversation with markdown rendering, a waiting spinner and a
//! few slash commands for inspecting providers and usage.

pub mod commands;
pub mod prompt;
pub mod renderer;
pub mod spinner;
mod theme;

use crate::api::Message;
use crate::orchestrator::Gateway;

use commands::{parse_command, render_help, SlashCommand};
use prompt::PromptHandler;
use renderer::TerminalRenderer;
use spinner::WaitingSpinner;

enum CommandResult {
    Continue,
    Quit,
}

pub struct ChatShell<'a> {
    gateway: &'a Gateway,
    renderer: TerminalRenderer,
    prompt_handler: PromptHandler,
    /// Optional system prompt sent first on every turn
    system: Option<String>,
    conversation: Vec<Message>,
    stats_days: u32,
    turn_count: usize,
}

impl<'a> ChatShell<'a> {
    pub fn new(gateway: &'a Gateway, stats_days: u32) -> Self {
        Self {
            gateway,
            renderer: TerminalRenderer::new(),
            prompt_handler: PromptHandler::new(),
            system: None,
            conversation: Vec::new(),
            stats_days,
            turn_count: 0,
        }
    }

    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    pub async fn run(&mut self) {
        let profiles = self.gateway.list().await;
        self.renderer
            .render_banner(env!("CARGO_PKG_VERSION"), &profiles);

        loop {
            let input = match self.prompt_handler.read_line(self.renderer.prompt_color()) {
                Some(input) => input,
                None => break,
            };

            if input.is_empty() {
                continue;
            }

            if let Some(cmd) = parse_command(&input) {
                match self.handle_command(cmd).await {
                    CommandResult::Continue => continue,
                    CommandResult::Quit => break,
                }
            } else {
                self.process_message(&input).await;
            }
        }

        self.renderer
            .render_info(&format!("{} turns this session.", self.turn_count));
    }

    async fn handle_command(&mut self, cmd: SlashCommand) -> CommandResult {
        match cmd {
            SlashCommand::Help => render_help(&self.renderer),
            SlashCommand::Quit => return CommandResult::Quit,
            SlashCommand::Clear => {
                self.conversation.clear();
                self.renderer.render_success("Conversation cleared.");
            }
            SlashCommand::Providers => {
                let profiles = self.gateway.list().await;
                self.renderer.render_profiles(&profiles);
            }
            SlashCommand::Stats(days) => {
                let days = days.unwrap_or(self.stats_days);
                self.gateway.recorder().flush().await;
                match self.gateway.recorder().stats(days).await {
                    Ok(stats) => self.renderer.render_stats(days, &stats),
                    Err(e) => self.renderer.render_error(&format!("Usage unavailable: {}", e)),
                }
            }
            SlashCommand::Status => match self.gateway.primary_profile().await {
                Some(profile) => self.renderer.render_info(&format!(
                    "First provider: {} ({} messages in conversation)",
                    profile.label(),
                    self.conversation.len()
                )),
                None => self.renderer.render_failure("no active provider"),
            },
            SlashCommand::Test => {
                let mut spinner = WaitingSpinner::new();
                spinner.start("Testing connection...");
                let (ok, error) = self.gateway.test_connection().await;
                spinner.stop();
                if ok {
                    self.renderer.render_success("Connection OK");
                } else {
                    self.renderer
                        .render_failure(error.as_deref().unwrap_or("unknown error"));
                }
            }
        }
        CommandResult::Continue
    }

    async fn process_message(&mut self, input: &str) {
        self.conversation.push(Message::user(input));

        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        if let Some(system) = &self.system {
            messages.push(Message::system(system.as_str()));
        }
        messages.extend(self.conversation.iter().cloned());

        let mut spinner = WaitingSpinner::new();
        spinner.start("Waiting for a provider...");
        let response = self.gateway.chat(&messages).await;
        spinner.stop();

        if response.success {
            let content = response.content.clone().unwrap_or_default();
            self.renderer.render_reply(&content);
            if let Some(usage) = &response.usage {
                self.renderer.render_usage_line(usage);
            }
            self.conversation.push(Message::assistant(content));
            self.turn_count += 1;
        } else {
            // keep the history consistent for the next attempt
            self.conversation.pop();
            self.renderer
                .render_failure(response.error.as_deref().unwrap_or("unknown error"));
        }
    }
}
