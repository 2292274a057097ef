//! Terminal colors

use crossterm::style::Color;

pub struct Theme {
    pub prompt: Color,
    pub assistant: Color,
    /// Status and hint lines
    pub system: Color,
    pub error: Color,
    pub dim: Color,
    pub success: Color,
    pub title: Color,
    /// Token counts, costs and priorities
    pub stats: Color,
    pub command: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            prompt: Color::Cyan,
            assistant: Color::White,
            system: Color::DarkYellow,
            error: Color::Red,
            dim: Color::DarkGrey,
            success: Color::Green,
            title: Color::Magenta,
            stats: Color::Blue,
            command: Color::Yellow,
        }
    }
}
