//! Line-oriented menus on a terminal
//!
//! Menus go to the writer (stderr for the daemon) so stdout carries only the
//! selected path.

use hal::ConsoleSelect;
use std::io::{self, BufRead, Write};

/// Numbered text menus over a reader and a writer
pub struct TerminalConsole<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl TerminalConsole<io::StdinLock<'static>, io::Stderr> {
    /// Menus on stderr, answers from stdin
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn show(&mut self, title: &[String], entries: &[String], default: usize) -> io::Result<()> {
        writeln!(self.output)?;
        for line in title {
            writeln!(self.output, "{}", line)?;
        }
        for (index, entry) in entries.iter().enumerate() {
            let marker = if index == default { '>' } else { ' ' };
            writeln!(self.output, "{} {:>3}  {}", marker, index, entry)?;
        }
        write!(self.output, "Choice [{}], q to cancel: ", default)?;
        self.output.flush()
    }

    /// One prompt and one answer; `Ok(None)` on EOF
    fn prompt(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> ConsoleSelect for TerminalConsole<R, W> {
    fn select(&mut self, title: &[String], entries: &[String], default: usize) -> Option<usize> {
        self.show(title, entries, default).ok()?;
        loop {
            let answer = self.prompt().ok()??;
            if answer.is_empty() {
                return Some(default);
            }
            if answer.eq_ignore_ascii_case("q") {
                return None;
            }
            match answer.parse::<usize>() {
                Ok(index) if index < entries.len() => return Some(index),
                _ => {
                    write!(
                        self.output,
                        "Enter a number from 0 to {}: ",
                        entries.len().saturating_sub(1)
                    )
                    .ok()?;
                    self.output.flush().ok()?;
                }
            }
        }
    }
}
