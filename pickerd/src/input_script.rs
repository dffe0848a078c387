//! # Input Script Parser
//!
//! A line-based answer format for driving the picker without a terminal,
//! used by the daemon's `--script` flag and by the integration tests.
//!
//! ## Format
//!
//! Each line answers one menu:
//! - A number: `2` picks the entry at that position (zero based)
//! - A quoted label: `"EFI/"` picks the entry with that exact text
//! - `Enter`: picks the highlighted default
//! - `Escape` or `cancel`: leaves the menu
//! - Comments: `# This is a comment`, also after an answer
//!
//! ## Example
//!
//! ```text
//! "ESP"            # volume menu
//! "EFI/"
//! "BOOT/"
//! "BOOTX64.EFI"
//! ```

use hal::ConsoleSelect;
use std::collections::VecDeque;
use thiserror::Error;

/// Input script error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputScriptError {
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Empty script")]
    EmptyScript,
}

/// A single scripted answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedInput {
    /// Entry at a menu position
    Index(usize),
    /// Entry with this exact label
    Label(String),
    /// The highlighted default
    Default,
    /// Leave the menu
    Cancel,
}

/// Parsed answers, consumed front to back
#[derive(Debug, Clone, Default)]
pub struct InputScript {
    inputs: VecDeque<ScriptedInput>,
}

impl InputScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a script from text
    pub fn from_text(text: &str) -> Result<Self, InputScriptError> {
        let mut inputs = VecDeque::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            inputs.push_back(Self::parse_line(line, line_num + 1)?);
        }

        if inputs.is_empty() {
            return Err(InputScriptError::EmptyScript);
        }

        Ok(Self { inputs })
    }

    fn parse_line(line: &str, line_num: usize) -> Result<ScriptedInput, InputScriptError> {
        if let Some(quoted) = line.strip_prefix('"') {
            let label = quoted
                .strip_suffix('"')
                .ok_or_else(|| InputScriptError::ParseError {
                    line: line_num,
                    message: "unterminated label".to_string(),
                })?;
            return Ok(ScriptedInput::Label(label.to_string()));
        }

        match line.to_lowercase().as_str() {
            "enter" => Ok(ScriptedInput::Default),
            "escape" | "esc" | "cancel" => Ok(ScriptedInput::Cancel),
            _ => line
                .parse()
                .map(ScriptedInput::Index)
                .map_err(|_| InputScriptError::ParseError {
                    line: line_num,
                    message: format!("expected an index, a quoted label or a key: {}", line),
                }),
        }
    }

    /// Appends an answer
    pub fn push(&mut self, input: ScriptedInput) {
        self.inputs.push_back(input);
    }

    /// Takes the next answer
    pub fn next_input(&mut self) -> Option<ScriptedInput> {
        self.inputs.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }
}

/// Drops a trailing `#` comment that is not inside a quoted label
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (index, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..index],
            _ => {}
        }
    }
    line
}

/// Console that answers menus from an [`InputScript`]
///
/// A label that is not on the menu, or an exhausted script, cancels.
#[derive(Debug, Clone, Default)]
pub struct ScriptConsole {
    script: InputScript,
    shown: usize,
}

impl ScriptConsole {
    pub fn new(script: InputScript) -> Self {
        Self { script, shown: 0 }
    }

    /// Number of menus answered or cancelled so far
    pub fn menus_shown(&self) -> usize {
        self.shown
    }

    /// Answers left over once the session ended
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl ConsoleSelect for ScriptConsole {
    fn select(&mut self, _title: &[String], entries: &[String], default: usize) -> Option<usize> {
        self.shown += 1;
        match self.script.next_input()? {
            ScriptedInput::Index(index) => Some(index),
            ScriptedInput::Label(label) => entries.iter().position(|entry| *entry == label),
            ScriptedInput::Default => Some(default),
            ScriptedInput::Cancel => None,
        }
    }
}
