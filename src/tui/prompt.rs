//! Line input for the chat shell

use crossterm::style::{Color, Stylize};
use std::io::{self, BufRead, Write};

pub struct PromptHandler;

impl PromptHandler {
    pub fn new() -> Self {
        Self
    }

    /// Show the prompt and read one trimmed line; `None` on EOF (Ctrl+D)
    pub fn read_line(&mut self, prompt_color: Color) -> Option<String> {
        print!("{} ", ">".with(prompt_color));
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(_) => None,
        }
    }
}

impl Default for PromptHandler {
    fn default() -> Self {
        Self::new()
    }
}
