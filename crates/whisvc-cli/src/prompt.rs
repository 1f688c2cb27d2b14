//! Operator prompt on the terminal.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::Mutex;

use whisvc_core::{ModelTier, OperatorPrompt, PromptError, ServicePort};

use crate::utils::input::{Line, confirmation_hint, parse_confirmation, read_line};

/// Asks the install questions on a line-based terminal.
///
/// Invalid answers are explained and asked again; a closed input stream
/// fails the question instead of looping.
pub struct ConsolePrompt<R, W> {
    io: Mutex<(R, W)>,
}

impl ConsolePrompt<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    /// Ask until `parse` accepts the answer.
    fn ask<T, F>(&self, question: &str, what: &str, mut parse: F) -> Result<T, PromptError>
    where
        F: FnMut(&str) -> Result<T, String>,
    {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| PromptError::Required(what.to_string()))?;
        let (input, output) = &mut *guard;

        loop {
            match read_line(input, output, question)? {
                Line::Closed => {
                    writeln!(output)?;
                    return Err(PromptError::Required(what.to_string()));
                }
                Line::Text(answer) => match parse(&answer) {
                    Ok(value) => return Ok(value),
                    Err(hint) => writeln!(output, "{hint}")?,
                },
            }
        }
    }

    fn print(&self, text: &str) -> io::Result<()> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| io::Error::other("prompt lock poisoned"))?;
        writeln!(guard.1, "{text}")
    }
}

/// Parse a menu answer: empty, a 1-based index, or a tier name.
pub fn parse_model_answer(answer: &str, default: ModelTier) -> Result<ModelTier, String> {
    if answer.is_empty() {
        return Ok(default);
    }
    if let Ok(index) = answer.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| ModelTier::ALL.get(i).copied())
            .ok_or_else(|| format!("Please enter a number between 1 and {}.", ModelTier::ALL.len()));
    }
    answer.parse::<ModelTier>().map_err(|e| e.to_string())
}

pub fn parse_port_answer(answer: &str, default: ServicePort) -> Result<ServicePort, String> {
    if answer.is_empty() {
        return Ok(default);
    }
    answer.parse::<ServicePort>().map_err(|e| e.to_string())
}

impl<R, W> OperatorPrompt for ConsolePrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn choose_model(&self, default: ModelTier) -> Result<ModelTier, PromptError> {
        let mut menu = String::from("\nAvailable models:");
        for (i, tier) in ModelTier::ALL.iter().enumerate() {
            let marker = if *tier == default { "*" } else { " " };
            menu.push_str(&format!("\n {marker}{}) {:<9} {}", i + 1, tier.as_str(), tier.summary()));
        }
        self.print(&menu)?;

        let default_index = ModelTier::ALL
            .iter()
            .position(|tier| *tier == default)
            .map_or(1, |i| i + 1);
        self.ask(
            &format!("Select model [{default_index}]:"),
            "model selection",
            |answer| parse_model_answer(answer, default),
        )
    }

    fn choose_port(&self, default: ServicePort) -> Result<ServicePort, PromptError> {
        self.ask(&format!("Service port [{default}]:"), "port selection", |answer| {
            parse_port_answer(answer, default)
        })
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        self.ask(
            &format!("{message} {}", confirmation_hint(default)),
            "confirmation",
            |answer| {
                parse_confirmation(answer, default)
                    .ok_or_else(|| "Please enter 'y' for yes or 'n' for no.".to_string())
            },
        )
    }

    fn notice(&self, message: &str) {
        if let Err(e) = self.print(message) {
            tracing::debug!(error = %e, "Operator notice not shown");
        }
    }
}
