//! Scripted input for driving the command flows in unit tests

use anyhow::Result;
use std::collections::VecDeque;
use zeroize::Zeroizing;

use super::Prompter;

/// Prompter answering from a fixed script and recording every prompt
#[derive(Default)]
pub(crate) struct Script {
    answers: VecDeque<String>,
    pub(crate) asked: Vec<String>,
}

impl Script {
    pub(crate) fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for Script {
    fn line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.asked.push(prompt.to_string());
        Ok(self.answers.pop_front())
    }

    fn secret(&mut self, prompt: &str) -> Result<Option<Zeroizing<String>>> {
        self.asked.push(prompt.to_string());
        Ok(self.answers.pop_front().map(Zeroizing::new))
    }
}
