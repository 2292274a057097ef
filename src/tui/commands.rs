//! Slash commands of the chat shell

use crossterm::style::Stylize;

#[derive(Debug, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Quit,
    Clear,
    Providers,
    /// Usage stats, optionally over a custom number of days
    Stats(Option<u32>),
    Status,
    Test,
}

/// Parse a slash command; `None` if the input is a regular message
pub fn parse_command(input: &str) -> Option<SlashCommand> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input.split_whitespace();
    let cmd = parts.next()?.to_lowercase();
    let arg = parts.next();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(SlashCommand::Help),
        "/quit" | "/q" | "/exit" => Some(SlashCommand::Quit),
        "/clear" | "/cls" => Some(SlashCommand::Clear),
        "/providers" | "/p" => Some(SlashCommand::Providers),
        "/stats" => Some(SlashCommand::Stats(arg.and_then(|a| a.parse().ok()))),
        "/status" => Some(SlashCommand::Status),
        "/test" => Some(SlashCommand::Test),
        _ => None,
    }
}

pub fn render_help(renderer: &super::renderer::TerminalRenderer) {
    let cmd_color = renderer.command_color();
    let dim_color = renderer.dim_color();

    println!();
    renderer.render_system("Available commands:");
    println!();

    let commands = [
        ("/help", "Show this help message"),
        ("/quit", "Exit the chat"),
        ("/clear", "Forget the conversation so far"),
        ("/providers", "List providers in failover order"),
        ("/stats [days]", "Show usage per provider"),
        ("/status", "Show the provider tried first"),
        ("/test", "Send a test message through the gateway"),
    ];

    for (cmd, desc) in &commands {
        println!("  {:<18} {}", cmd.with(cmd_color), desc.with(dim_color));
    }
    println!();
}
