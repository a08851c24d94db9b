//! Interactive prompts.
//!
//! Module code asks questions through the [`Prompter`] trait. The console
//! implementation is a thin wrapper over free functions that take any
//! [`BufRead`]/[`Write`] pair, so the parsing rules are tested without a TTY.
use std::io::{self, BufRead, Write};

/// Source of answers to yes/no and multiple-choice questions.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question; an empty answer selects `default`.
    fn ask_yes_no(&self, prompt: &str, default: bool) -> bool;

    /// Ask the user to pick one of `options`.
    ///
    /// Each option is selectable by its shortest unique prefix. An empty
    /// answer selects `default` when given.
    fn ask_with_options(&self, prompt: &str, options: &[String], default: Option<String>) -> String;
}

/// Prompter reading answers from stdin.
///
/// End of input selects the default answer (or the first option when there is
/// no default) instead of looping forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask_yes_no(&self, prompt: &str, default: bool) -> bool {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        ask_yes_no_with_io(prompt, default, &mut input, &mut output).unwrap_or(default)
    }

    fn ask_with_options(&self, prompt: &str, options: &[String], default: Option<String>) -> String {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        let fallback = default
            .clone()
            .or_else(|| options.first().cloned())
            .unwrap_or_default();
        ask_with_options_with_io(prompt, options, default.as_deref(), &mut input, &mut output)
            .unwrap_or(fallback)
    }
}

/// Prompter for non-interactive runs: accepts every yes/no question and picks
/// the default option of multiple-choice questions.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoPrompter;

impl Prompter for AutoPrompter {
    fn ask_yes_no(&self, _prompt: &str, _default: bool) -> bool {
        true
    }

    fn ask_with_options(&self, _prompt: &str, options: &[String], default: Option<String>) -> String {
        default
            .or_else(|| options.first().cloned())
            .unwrap_or_default()
    }
}

/// Ask a yes/no question on `output`, reading the answer from `input`.
///
/// Answers starting with `y` or `n` (any case) are accepted; anything else
/// re-asks. An empty answer or end of input returns `default`.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub fn ask_yes_no_with_io<R: BufRead, W: Write>(
    prompt: &str,
    default: bool,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    let indicator = if default { "[Yn]" } else { "[yN]" };
    loop {
        write!(output, "{prompt} {indicator} ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(default);
        }
        let answer = line.trim().to_lowercase();
        if answer.is_empty() {
            return Ok(default);
        }
        if answer.starts_with('y') {
            return Ok(true);
        }
        if answer.starts_with('n') {
            return Ok(false);
        }
        writeln!(output, "Please answer 'y' or 'n'.")?;
    }
}

/// Ask a multiple-choice question on `output`, reading the answer from
/// `input`.
///
/// # Errors
///
/// Returns an error if reading or writing fails, or
/// [`io::ErrorKind::UnexpectedEof`] when input ends without a default.
pub fn ask_with_options_with_io<R: BufRead, W: Write>(
    prompt: &str,
    options: &[String],
    default: Option<&str>,
    input: &mut R,
    output: &mut W,
) -> io::Result<String> {
    let (rendered, prefixes) = options_prompt(prompt, options, default);
    loop {
        write!(output, "{rendered}")?;
        output.flush()?;

        let mut line = String::new();
        let eof = input.read_line(&mut line)? == 0;
        let answer = line.trim().to_lowercase();
        if answer.is_empty() {
            if let Some(default) = default {
                return Ok(default.to_string());
            }
            if eof {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "no answer and no default",
                ));
            }
        }

        if let Some((_, option)) = prefixes
            .iter()
            .find(|(prefix, _)| answer.starts_with(prefix.as_str()))
        {
            return Ok(option.clone());
        }
        writeln!(output, "Please enter a valid response")?;
    }
}

/// Render `Prompt [c]opy,[S]kip,[d]iff: ` and return the prefix table.
///
/// The default option's prefix is shown upper-case.
fn options_prompt(
    prompt: &str,
    options: &[String],
    default: Option<&str>,
) -> (String, Vec<(String, String)>) {
    let mut prefixes = Vec::with_capacity(options.len());
    let mut parts = Vec::with_capacity(options.len());
    for option in options {
        let prefix = shortest_unique_prefix(option, options);
        let shown = if default == Some(option.as_str()) {
            prefix.to_uppercase()
        } else {
            prefix.to_string()
        };
        let rest = option.get(prefix.len()..).unwrap_or_default();
        parts.push(format!("[{shown}]{rest}"));
        prefixes.push((prefix.to_lowercase(), option.clone()));
    }
    (format!("{prompt} {}: ", parts.join(",")), prefixes)
}

/// Shortest prefix of `option` shared by no other entry of `options`.
///
/// Returns `option` itself when it is a prefix of another option.
#[must_use]
pub fn shortest_unique_prefix<'a>(option: &'a str, options: &[String]) -> &'a str {
    for (end, _) in option
        .char_indices()
        .skip(1)
        .chain(std::iter::once((option.len(), ' ')))
    {
        let prefix = option.get(..end).unwrap_or(option);
        if options.iter().filter(|o| o.starts_with(prefix)).count() == 1 {
            return prefix;
        }
    }
    option
}
