//! Declarative descriptions of LaTeX commands and environments.
//!
//! A command signature pairs a command name with the shape of its arguments
//! (a sequence of brace, bracket, or parenthesis groups) and an action. The
//! builder looks signatures up by command word and asks each candidate to
//! match the source from the current position; the longest match wins.

use crate::dummy::DummyGenerator;

/// What to do with a matched command or environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Treat the contents normally.
    Default,
    /// Discard the whole match.
    Ignore,
    /// Replace the whole match with a generated placeholder.
    Dummy,
}

impl Action {
    /// Parse a command action string from settings. `pluralDummy` selects the
    /// plural generator. Unknown strings yield `None` and are skipped.
    pub fn parse_command_action(action: &str) -> Option<(Action, DummyGenerator)> {
        match action {
            "default" => Some((Action::Default, DummyGenerator::new())),
            "ignore" => Some((Action::Ignore, DummyGenerator::new())),
            "dummy" => Some((Action::Dummy, DummyGenerator::new())),
            "pluralDummy" => Some((Action::Dummy, DummyGenerator::plural())),
            _ => None,
        }
    }

    /// Parse an environment action string (`default` or `ignore`).
    pub fn parse_environment_action(action: &str) -> Option<Action> {
        match action {
            "default" => Some(Action::Default),
            "ignore" => Some(Action::Ignore),
            _ => None,
        }
    }
}

/// One argument slot of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgumentType {
    /// `{...}`, required.
    Brace,
    /// `[...]`, optional.
    Bracket,
    /// `(...)`, used by a handful of picture-like commands.
    Parenthesis,
}

impl ArgumentType {
    fn delimiters(self) -> (char, char) {
        match self {
            ArgumentType::Brace => ('{', '}'),
            ArgumentType::Bracket => ('[', ']'),
            ArgumentType::Parenthesis => ('(', ')'),
        }
    }
}

/// Match a single delimited argument group starting at `pos`.
///
/// Brace groups may nest inside any group; the closing delimiter only counts
/// when it is not inside a nested brace group. Returns the byte length of the
/// group including both delimiters.
pub fn match_argument(code: &str, pos: usize, argument_type: ArgumentType) -> Option<usize> {
    let (open, close) = argument_type.delimiters();
    let rest = code.get(pos..)?;
    let mut chars = rest.char_indices();
    match chars.next() {
        Some((_, ch)) if ch == open => {}
        _ => return None,
    }
    let mut brace_depth = 0usize;
    for (offset, ch) in chars {
        if ch == '{' {
            brace_depth += 1;
        } else if ch == '}' {
            if close == '}' && brace_depth == 0 {
                return Some(offset + ch.len_utf8());
            }
            brace_depth = brace_depth.saturating_sub(1);
        } else if ch == close && brace_depth == 0 {
            return Some(offset + ch.len_utf8());
        }
    }
    None
}

/// Signature of a LaTeX command: name, argument shape, action.
#[derive(Clone, Debug)]
pub struct CommandSignature {
    pub name: String,
    pub argument_types: Vec<ArgumentType>,
    pub action: Action,
    pub dummy_generator: DummyGenerator,
}

impl CommandSignature {
    /// Parse a prototype like `\cite[]{}` or `\qed` into a signature.
    ///
    /// Returns `None` when the prototype is not a backslash command followed
    /// by zero or more `{}`/`[]`/`()` slots.
    pub fn parse(prototype: &str, action: Action, dummy_generator: DummyGenerator) -> Option<Self> {
        let rest = prototype.strip_prefix('\\')?;
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        let mut name_end = if first.is_ascii_alphabetic() || first == '@' {
            let mut end = 1;
            for (idx, ch) in chars.by_ref() {
                if ch.is_ascii_alphabetic() || ch == '@' {
                    end = idx + ch.len_utf8();
                } else {
                    break;
                }
            }
            end
        } else {
            first.len_utf8()
        };
        if rest[name_end..].starts_with('*') {
            name_end += 1;
        }

        let mut argument_types = Vec::new();
        let mut tail = &rest[name_end..];
        loop {
            let argument_type = if tail.starts_with("{}") {
                ArgumentType::Brace
            } else if tail.starts_with("[]") {
                ArgumentType::Bracket
            } else if tail.starts_with("()") {
                ArgumentType::Parenthesis
            } else {
                break;
            };
            argument_types.push(argument_type);
            tail = &tail[2..];
        }
        if !tail.is_empty() {
            return None;
        }

        Some(Self {
            name: format!("\\{}", &rest[..name_end]),
            argument_types,
            action,
            dummy_generator,
        })
    }

    /// Convenience constructor for the built-in catalogue.
    pub fn new(prototype: &str, action: Action) -> Self {
        Self::parse(prototype, action, DummyGenerator::new())
            .unwrap_or_else(|| panic!("invalid built-in command prototype '{prototype}'"))
    }

    /// Match this signature against `code` starting at `pos` (the position
    /// of the backslash). Returns the total match length, `None` on
    /// mismatch. A signature without arguments matches with just its name.
    pub fn match_from_position(&self, code: &str, pos: usize) -> Option<usize> {
        let rest = code.get(pos..)?;
        if !rest.starts_with(&self.name) {
            return None;
        }
        let mut length = self.name.len();
        for &argument_type in &self.argument_types {
            let arg_len = match_argument(code, pos + length, argument_type)?;
            length += arg_len;
        }
        Some(length)
    }
}

/// Signature of a LaTeX environment: name and action.
#[derive(Clone, Debug)]
pub struct EnvironmentSignature {
    pub name: String,
    pub action: Action,
}

impl EnvironmentSignature {
    pub fn new(name: &str, action: Action) -> Self {
        Self {
            name: name.to_string(),
            action,
        }
    }
}
