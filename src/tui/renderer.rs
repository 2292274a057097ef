//! Terminal rendering of replies, profiles and usage reports

use crossterm::style::{Color, Stylize};
use termimad::MadSkin;

use super::theme::Theme;
use crate::api::{ModelInfo, ProviderKind, TokenUsage};
use crate::config::ProviderProfile;
use crate::metrics::{UsageRecord, UsageStats};

pub struct TerminalRenderer {
    theme: Theme,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        let theme = Theme::default();
        let skin = Self::build_skin(&theme);
        Self { theme, skin }
    }

    fn build_skin(theme: &Theme) -> MadSkin {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(to_termimad_color(theme.title));
        skin.bold.set_fg(to_termimad_color(Color::White));
        skin.italic.set_fg(to_termimad_color(Color::DarkYellow));
        skin.inline_code.set_fg(to_termimad_color(Color::Green));
        skin.code_block.set_fg(to_termimad_color(Color::Green));
        skin
    }

    /// Banner for the chat shell, showing the failover order
    pub fn render_banner(&self, version: &str, profiles: &[ProviderProfile]) {
        println!();
        println!("{}", "  CareLink AI Gateway".with(self.theme.title));
        println!("  {} {}", "v".with(self.theme.dim), version.with(self.theme.dim));

        let chain = profiles
            .iter()
            .filter(|p| p.active)
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(" -> ");
        if chain.is_empty() {
            println!(
                "  {}",
                "No active provider, add one with `providers add`".with(self.theme.system)
            );
        } else {
            println!("  {} {}", "Failover:".with(self.theme.dim), chain.with(self.theme.stats));
        }

        println!(
            "  {}",
            "Type /help for commands, /quit to exit".with(self.theme.dim)
        );
        println!();
    }

    /// Assistant reply, rendered as markdown when it contains any
    pub fn render_reply(&self, content: &str) {
        println!();
        if has_markdown_elements(content) {
            self.skin.print_text(content);
        } else {
            println!("{}", content.with(self.theme.assistant));
        }
    }

    pub fn render_usage_line(&self, usage: &TokenUsage) {
        println!(
            "\n  {} {} in + {} out = {} tokens",
            "\u{2022}".with(self.theme.dim),
            usage.tokens_in.to_string().with(self.theme.stats),
            usage.tokens_out.to_string().with(self.theme.stats),
            usage.tokens_total.to_string().with(self.theme.stats),
        );
        println!();
    }

    /// Gateway failure plus the configuration hint shown for every failure
    pub fn render_failure(&self, error: &str) {
        self.render_error(error);
        self.render_info("Check the provider configuration: carelink-gateway providers list");
    }

    pub fn render_profiles(&self, profiles: &[ProviderProfile]) {
        if profiles.is_empty() {
            self.render_info("No provider configured.");
            return;
        }

        println!(
            "  {:<28} {:<10} {:<28} {:>8}  {:<6}  {}",
            "ID".with(self.theme.dim),
            "KIND".with(self.theme.dim),
            "MODEL".with(self.theme.dim),
            "PRIORITY".with(self.theme.dim),
            "STATE".with(self.theme.dim),
            "KEY".with(self.theme.dim),
        );
        for profile in profiles {
            let state = if profile.active {
                "on".with(self.theme.success)
            } else {
                "off".with(self.theme.dim)
            };
            let key = match (profile.kind.requires_credential(), profile.credential()) {
                (false, _) => "-",
                (true, Some(_)) => "set",
                (true, None) => "missing",
            };
            println!(
                "  {:<28} {:<10} {:<28} {:>8}  {:<6}  {}",
                profile.id,
                profile.kind.as_str(),
                profile.model_id,
                profile.priority.to_string().with(self.theme.stats),
                state,
                key,
            );
            if let Some(name) = &profile.display_name {
                println!("  {}", format!("  {}", name).with(self.theme.dim));
            }
        }
    }

    pub fn render_profile_detail(&self, profile: &ProviderProfile) {
        println!();
        println!("  {}", profile.label().with(self.theme.title));

        let key = match (profile.kind.requires_credential(), profile.credential()) {
            (false, _) => "not required",
            (true, Some(_)) => "set",
            (true, None) => "missing",
        };
        let created = profile
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let rows = [
            ("ID", profile.id.clone()),
            ("Kind", profile.kind.as_str().to_string()),
            ("Model", profile.model_id.clone()),
            ("Priority", profile.priority.to_string()),
            ("State", if profile.active { "on" } else { "off" }.to_string()),
            ("API key", key.to_string()),
            (
                "Endpoint",
                profile
                    .endpoint_override
                    .clone()
                    .unwrap_or_else(|| "default".to_string()),
            ),
            ("Created", created),
        ];
        for (label, value) in rows {
            println!("  {:<10} {}", label.with(self.theme.dim), value);
        }
        println!();
    }

    pub fn render_models(&self, kind: ProviderKind, models: &[ModelInfo]) {
        println!("  {}", format!("{} models", kind).with(self.theme.title));
        for model in models {
            let tag = if model.offline { " (offline)" } else { "" };
            println!(
                "  {:<36} {:<32} {}{}",
                model.id.with(self.theme.command),
                model.name,
                model.cost.with(self.theme.dim),
                tag.with(self.theme.dim),
            );
        }
        println!();
    }

    pub fn render_stats(&self, days: u32, stats: &[UsageStats]) {
        println!(
            "  {}",
            format!("Usage over the last {} days", days).with(self.theme.title)
        );
        if stats.is_empty() {
            self.render_info("No usage recorded.");
            return;
        }
        for entry in stats {
            for line in entry.to_string().lines() {
                println!("  {}", line);
            }
        }
        let total_cost: f64 = stats.iter().map(|s| s.total_cost).sum();
        println!(
            "  {} {}",
            "Total estimated cost:".with(self.theme.dim),
            format!("{:.4} EUR", total_cost).with(self.theme.stats)
        );
    }

    pub fn render_history(&self, records: &[UsageRecord]) {
        if records.is_empty() {
            self.render_info("No usage recorded.");
            return;
        }
        for record in records {
            let status = if record.success {
                "\u{2713}".with(self.theme.success)
            } else {
                "\u{2717}".with(self.theme.error)
            };
            println!(
                "  {} {} {:<10} {:<28} {:>6} tok {:>9} {:>6} ms",
                status,
                record
                    .created_at
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .with(self.theme.dim),
                record.kind.as_str(),
                record.model_id,
                record.tokens_total,
                format!("{:.4}", record.cost_estimate).with(self.theme.stats),
                record.latency_ms,
            );
        }
    }

    pub fn render_system(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{25b6}".with(self.theme.system),
            msg.with(self.theme.system)
        );
    }

    pub fn render_error(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{2717}".with(self.theme.error),
            msg.with(self.theme.error)
        );
    }

    pub fn render_success(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{2713}".with(self.theme.success),
            msg.with(self.theme.success)
        );
    }

    pub fn render_info(&self, msg: &str) {
        println!("  {}", msg.with(self.theme.dim));
    }

    pub fn prompt_color(&self) -> Color {
        self.theme.prompt
    }

    pub fn command_color(&self) -> Color {
        self.theme.command
    }

    pub fn dim_color(&self) -> Color {
        self.theme.dim
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn has_markdown_elements(content: &str) -> bool {
    content.contains("```")
        || content.contains("## ")
        || content.contains("# ")
        || content.contains("**")
        || content.contains("| ")
        || content.contains("- ")
}

/// termimad re-exports its own crossterm version
fn to_termimad_color(color: Color) -> termimad::crossterm::style::Color {
    use termimad::crossterm::style::Color as MadColor;
    match color {
        Color::Black => MadColor::Black,
        Color::DarkGrey => MadColor::DarkGrey,
        Color::Red => MadColor::Red,
        Color::DarkRed => MadColor::DarkRed,
        Color::Green => MadColor::Green,
        Color::DarkGreen => MadColor::DarkGreen,
        Color::Yellow => MadColor::Yellow,
        Color::DarkYellow => MadColor::DarkYellow,
        Color::Blue => MadColor::Blue,
        Color::DarkBlue => MadColor::DarkBlue,
        Color::Magenta => MadColor::Magenta,
        Color::DarkMagenta => MadColor::DarkMagenta,
        Color::Cyan => MadColor::Cyan,
        Color::DarkCyan => MadColor::DarkCyan,
        Color::White => MadColor::White,
        Color::Grey => MadColor::Grey,
        _ => MadColor::Reset,
    }
}
