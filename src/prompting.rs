//! Asking the operator for values.
//!
//! Everything interactive goes through [`InputProvider`], so tests can
//! script the answers.

use std::io::{self, BufRead as _, Write as _};

use crate::{prelude::*, ui::Ui};

/// A validation rule. Returns a message to show the operator on rejection.
pub type Rule<'a> = &'a dyn Fn(&str) -> Result<(), String>;

/// Something that can answer questions.
pub trait InputProvider {
    /// Ask `prompt` until an answer satisfies `rule`. Answers are trimmed.
    fn obtain(&mut self, prompt: &str, rule: Rule<'_>) -> Result<String>;
}

/// Reject empty answers.
pub fn non_empty(value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err("A value is required.".to_owned())
    } else {
        Ok(())
    }
}

/// Accept anything, including an empty answer.
pub fn anything(_value: &str) -> Result<(), String> {
    Ok(())
}

/// Reads answers from standard input, printing prompts to standard error.
pub struct TerminalInput {
    ui: Ui,
}

impl TerminalInput {
    pub fn new(ui: Ui) -> Self {
        Self { ui }
    }

    fn read_answer(&self, prompt: &str) -> io::Result<Option<String>> {
        self.ui.suspend(|| -> io::Result<Option<String>> {
            let mut stderr = io::stderr();
            write!(stderr, "{prompt} ")?;
            stderr.flush()?;
            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line))
        })
    }
}

impl InputProvider for TerminalInput {
    fn obtain(&mut self, prompt: &str, rule: Rule<'_>) -> Result<String> {
        loop {
            let Some(line) = self
                .read_answer(prompt)
                .context("cannot read from standard input")?
            else {
                return Err(anyhow!("standard input closed while asking: {prompt}"));
            };
            let answer = line.trim();
            match rule(answer) {
                Ok(()) => return Ok(answer.to_owned()),
                Err(msg) => self.ui.suspend(|| eprintln!("{msg}")),
            }
        }
    }
}

/// Canned answers, for tests.
#[cfg(test)]
pub struct ScriptedInput {
    answers: std::collections::VecDeque<String>,
    /// Every prompt we were asked, in order.
    pub prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedInput {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            prompts: vec![],
        }
    }
}

#[cfg(test)]
impl InputProvider for ScriptedInput {
    fn obtain(&mut self, prompt: &str, rule: Rule<'_>) -> Result<String> {
        self.prompts.push(prompt.to_owned());
        while let Some(answer) = self.answers.pop_front() {
            let answer = answer.trim().to_owned();
            if rule(&answer).is_ok() {
                return Ok(answer);
            }
        }
        Err(anyhow!("ran out of scripted answers for: {prompt}"))
    }
}
