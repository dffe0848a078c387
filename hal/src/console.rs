//! Text menu abstraction

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

/// Presents a list of choices and waits for the user
pub trait ConsoleSelect {
    /// Shows `title` above `entries` with `default` highlighted
    ///
    /// Returns the chosen index, or `None` if the user cancelled.
    fn select(&mut self, title: &[String], entries: &[String], default: usize) -> Option<usize>;
}

impl<C: ConsoleSelect + ?Sized> ConsoleSelect for &mut C {
    fn select(&mut self, title: &[String], entries: &[String], default: usize) -> Option<usize> {
        (**self).select(title, entries, default)
    }
}

/// One menu as it was presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedMenu {
    pub title: Vec<String>,
    pub entries: Vec<String>,
}

/// Console that answers from a fixed list of choices
///
/// Every menu it is shown is recorded. Once the answers run out it cancels.
#[derive(Debug, Default)]
pub struct ScriptedSelect {
    answers: VecDeque<Option<usize>>,
    presented: Vec<PresentedMenu>,
}

impl ScriptedSelect {
    pub fn new(answers: impl IntoIterator<Item = Option<usize>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            presented: Vec::new(),
        }
    }

    /// Menus shown so far, oldest first
    pub fn presented(&self) -> &[PresentedMenu] {
        &self.presented
    }

    /// Entries of the most recent menu
    pub fn last_entries(&self) -> Option<&[String]> {
        self.presented.last().map(|menu| menu.entries.as_slice())
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl ConsoleSelect for ScriptedSelect {
    fn select(&mut self, title: &[String], entries: &[String], _default: usize) -> Option<usize> {
        self.presented.push(PresentedMenu {
            title: title.to_vec(),
            entries: entries.to_vec(),
        });
        self.answers.pop_front().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scripted_select_records_menus() {
        let mut console = ScriptedSelect::new([Some(1), None]);
        let title = strings(&["Pick"]);
        assert_eq!(console.select(&title, &strings(&["a", "b"]), 0), Some(1));
        assert_eq!(console.select(&title, &strings(&["c"]), 0), None);
        assert_eq!(console.presented().len(), 2);
        assert_eq!(console.last_entries(), Some(&strings(&["c"])[..]));
    }

    #[test]
    fn test_scripted_select_cancels_when_exhausted() {
        let mut console = ScriptedSelect::new([]);
        assert_eq!(console.select(&[], &strings(&["a"]), 0), None);
        assert_eq!(console.remaining(), 0);
    }

    #[test]
    fn test_select_through_mut_ref() {
        fn pick(mut console: impl ConsoleSelect) -> Option<usize> {
            console.select(&[], &[String::from("x")], 0)
        }
        let mut console = ScriptedSelect::new([Some(0)]);
        assert_eq!(pick(&mut console), Some(0));
        assert_eq!(console.presented().len(), 1);
    }
}
