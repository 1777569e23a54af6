//! Position-driven scanner turning LaTeX (and R-Sweave) source into
//! annotated text.
//!
//! The builder walks the source character by character without backtracking,
//! keeps a stack of [`Mode`]s deciding how each character is classified, and
//! emits text and markup segments into an [`AnnotatedText`] sink. Opaque
//! regions (math, `\verb` literals, commands registered with the dummy
//! action) are summarised by placeholder nouns so the grammar checker sees a
//! well-formed sentence around them.

pub mod accent;
pub mod mode;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::annotation::AnnotatedText;
use crate::catalog;
use crate::diagnostic::Diagnostic;
use crate::dummy::DummyGenerator;
use crate::settings::CheckSettings;
use crate::signature::{
    match_argument, Action, ArgumentType, CommandSignature, EnvironmentSignature,
};
use crate::span::Span;

pub use mode::{Mode, MathVowelState};

use mode::{vowel_class_of_command, vowel_class_of_letter};

static COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\\(?:[A-Za-z@]+\*?|[^A-Za-z@])").unwrap());
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \n\r\t]+(?:%[^\r\n]*(?:\r?\n[ \t\n\r]*)?)?").unwrap());
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%[^\r\n]*(?:\r?\n[ \t\n\r]*)?").unwrap());
static LENGTH_IN_BRACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{-?[0-9]*(?:\.[0-9]+)?(?:pt|mm|cm|ex|em|bp|dd|pc|in)\}").unwrap()
});
static LENGTH_IN_BRACKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[-?[0-9]*(?:\.[0-9]+)?(?:pt|mm|cm|ex|em|bp|dd|pc|in)\]").unwrap()
});
static ENVIRONMENT_ARGUMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{[^{}]*\}").unwrap());
static RSWEAVE_BEGIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<<.*?>>=").unwrap());

const HEADING_COMMANDS: &[&str] = &[
    "\\part",
    "\\part*",
    "\\chapter",
    "\\chapter*",
    "\\section",
    "\\section*",
    "\\subsection",
    "\\subsection*",
    "\\subsubsection",
    "\\subsubsection*",
    "\\paragraph",
    "\\paragraph*",
    "\\subparagraph",
    "\\subparagraph*",
];

fn is_punctuation(ch: char) -> bool {
    matches!(ch, '.' | ',' | ':' | ';')
}

fn contains_two_line_ends(text: &str) -> bool {
    text.contains("\n\n") || text.contains("\r\n\r\n")
}

/// Which LaTeX dialect the builder scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Latex,
    /// LaTeX with R-Sweave literate-code chunks (`<<...>>=` ... `@`).
    Rsweave,
}

impl Dialect {
    pub fn from_language_id(language_id: &str) -> Option<Self> {
        match language_id {
            "latex" => Some(Dialect::Latex),
            "rsweave" => Some(Dialect::Rsweave),
            _ => None,
        }
    }
}

/// Raised in strict mode when an iteration fails to advance the scanner.
/// Carries the full scanner snapshot for bug reports.
#[derive(Clone, Debug, Error)]
#[error("latex scanner made no progress at byte {pos} on {current_char:?} in mode {mode:?}")]
pub struct StallError {
    pub pos: usize,
    pub current_char: char,
    pub mode: Mode,
    pub mode_stack: Vec<Mode>,
    /// The next (up to) 100 bytes of source after the stall position.
    pub snippet: String,
    pub dummy_counter: u32,
    pub last_space: String,
    pub last_punctuation: String,
    pub dummy_last_space: String,
    pub dummy_last_punctuation: String,
    pub is_math_empty: bool,
    pub preserve_dummy_last: bool,
    pub can_insert_space_before_dummy: bool,
    pub is_math_char_trivial: bool,
    pub math_vowel_state: MathVowelState,
}

impl StallError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::stall(
            format!(
                "scanner made no progress at byte {} on {:?}",
                self.pos, self.current_char
            ),
            Span::new(self.pos, self.pos + self.current_char.len_utf8()),
            vec![
                format!("mode stack: {:?}", self.mode_stack),
                format!("upcoming source: {:?}", self.snippet),
            ],
        )
    }
}

/// Stateful scanner over LaTeX source. One instance builds one annotated
/// text; it is strictly sequential and not meant to be shared.
pub struct LatexBuilder {
    dialect: Dialect,
    language: String,
    strict: bool,
    commands: BTreeMap<String, Vec<CommandSignature>>,
    environments: BTreeMap<String, EnvironmentSignature>,
    sink: AnnotatedText,
    diagnostics: Vec<Diagnostic>,

    // per-run scanner state
    code: String,
    pos: usize,
    mode_stack: Vec<Mode>,
    dummy_counter: u32,
    last_space: String,
    last_punctuation: String,
    dummy_last_space: String,
    dummy_last_punctuation: String,
    is_math_empty: bool,
    preserve_dummy_last: bool,
    can_insert_space_before_dummy: bool,
    is_math_char_trivial: bool,
    math_vowel_state: MathVowelState,
    ignore_environment_end: String,
}

impl LatexBuilder {
    pub fn new(dialect: Dialect) -> Self {
        let mut commands: BTreeMap<String, Vec<CommandSignature>> = BTreeMap::new();
        for signature in catalog::default_commands() {
            commands
                .entry(signature.name.clone())
                .or_default()
                .push(signature);
        }
        let environments = catalog::default_environments()
            .into_iter()
            .map(|signature| (signature.name.clone(), signature))
            .collect();

        Self {
            dialect,
            language: "en-US".to_string(),
            strict: false,
            commands,
            environments,
            sink: AnnotatedText::new(),
            diagnostics: Vec::new(),
            code: String::new(),
            pos: 0,
            mode_stack: Vec::new(),
            dummy_counter: 0,
            last_space: String::new(),
            last_punctuation: String::new(),
            dummy_last_space: String::new(),
            dummy_last_punctuation: String::new(),
            is_math_empty: true,
            preserve_dummy_last: false,
            can_insert_space_before_dummy: false,
            is_math_char_trivial: false,
            math_vowel_state: MathVowelState::Undecided,
            ignore_environment_end: String::new(),
        }
    }

    /// Register user-supplied signatures and the check language.
    pub fn apply_settings(&mut self, settings: &CheckSettings) {
        self.language = settings.language_short_code.clone();
        for (prototype, action) in &settings.latex_commands {
            let Some((action, generator)) = Action::parse_command_action(action) else {
                continue;
            };
            let Some(signature) = CommandSignature::parse(prototype, action, generator) else {
                continue;
            };
            self.commands
                .entry(signature.name.clone())
                .or_default()
                .push(signature);
        }
        for (name, action) in &settings.latex_environments {
            let Some(action) = Action::parse_environment_action(action) else {
                continue;
            };
            self.environments
                .insert(name.clone(), EnvironmentSignature::new(name, action));
        }
    }

    /// In strict mode a no-progress iteration aborts the scan instead of
    /// skipping one character.
    pub fn set_strict_mode(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn annotated_text(&self) -> &AnnotatedText {
        &self.sink
    }

    pub fn finish(self) -> AnnotatedText {
        self.sink
    }

    /// Scan one source chunk. May be called repeatedly; the sink keeps
    /// accumulating while the scanner state is re-armed per call.
    pub fn add_code(&mut self, code: &str) -> Result<(), StallError> {
        self.code = code.to_string();
        self.pos = 0;
        self.dummy_counter = 0;
        self.last_space.clear();
        self.last_punctuation.clear();
        self.dummy_last_space.clear();
        self.dummy_last_punctuation.clear();
        self.is_math_empty = true;
        self.preserve_dummy_last = false;
        self.can_insert_space_before_dummy = false;
        self.is_math_char_trivial = false;
        self.math_vowel_state = MathVowelState::Undecided;
        self.mode_stack.push(Mode::ParagraphText);

        while self.pos < self.code.len() {
            let last_pos = self.pos;
            self.is_math_char_trivial = false;

            match self.mode() {
                Mode::IgnoreEnvironment => self.scan_ignore_environment(),
                Mode::Rsweave => self.scan_rsweave(),
                _ => self.scan_normal(),
            }

            if self.pos == last_pos {
                if self.strict {
                    return Err(self.stall_error());
                }
                let skipped = self.current_char().to_string();
                tracing::warn!(
                    pos = self.pos,
                    character = %skipped,
                    "scanner made no progress; skipping one character"
                );
                self.diagnostics.push(Diagnostic::recovery(
                    format!("no rule advanced the scanner on {skipped:?}"),
                    Span::new(self.pos, self.pos + skipped.len()),
                    vec![format!("mode stack: {:?}", self.mode_stack)],
                ));
                self.add_markup(&skipped);
            }

            if !self.is_math_char_trivial {
                self.can_insert_space_before_dummy = false;
                self.is_math_empty = false;
            }
        }
        Ok(())
    }

    // ── mode stack ──

    fn mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::ParagraphText)
    }

    /// The mode underneath the current one (`ParagraphText` at the bottom).
    fn outer_mode(&self) -> Mode {
        if self.mode_stack.len() >= 2 {
            self.mode_stack[self.mode_stack.len() - 2]
        } else {
            Mode::ParagraphText
        }
    }

    fn pop_mode(&mut self) -> Mode {
        let popped = self.mode_stack.pop().unwrap_or(Mode::ParagraphText);
        if self.mode_stack.is_empty() {
            self.mode_stack.push(Mode::ParagraphText);
        }
        popped
    }

    fn enter_inline_math(&mut self) {
        self.mode_stack.push(Mode::InlineMath);
        self.arm_math_entry();
    }

    fn enter_display_math(&mut self) {
        self.mode_stack.push(Mode::DisplayMath);
        self.arm_math_entry();
    }

    fn arm_math_entry(&mut self) {
        self.is_math_empty = true;
        self.math_vowel_state = MathVowelState::Undecided;
        self.can_insert_space_before_dummy = true;
    }

    // ── sink plumbing ──

    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.sink.push_text(text);
        self.pos += text.len();
        self.text_added(text);
    }

    fn add_markup(&mut self, markup: &str) {
        self.add_markup_as(markup, "");
    }

    fn add_markup_as(&mut self, markup: &str, interpret_as: &str) {
        if markup.is_empty() && interpret_as.is_empty() {
            return;
        }
        self.sink.push_markup_as(markup, interpret_as);
        self.pos += markup.len();
        if interpret_as.is_empty() {
            if self.preserve_dummy_last {
                self.preserve_dummy_last = false;
            } else {
                self.dummy_last_space.clear();
                self.dummy_last_punctuation.clear();
            }
        } else {
            self.text_added(interpret_as);
        }
    }

    fn text_added(&mut self, text: &str) {
        let Some(last) = text.chars().last() else {
            return;
        };
        self.last_space = if matches!(last, ' ' | '\n' | '\r') {
            " ".to_string()
        } else {
            String::new()
        };
        self.last_punctuation = if is_punctuation(last) {
            last.to_string()
        } else {
            String::new()
        };
    }

    // ── helpers ──

    fn current_char(&self) -> char {
        self.code[self.pos..].chars().next().unwrap_or('\0')
    }

    fn match_from(&self, regex: &Regex) -> Option<String> {
        regex
            .find(&self.code[self.pos..])
            .map(|found| found.as_str().to_string())
    }

    fn stall_error(&self) -> StallError {
        let mut snippet = String::new();
        for ch in self.code[self.pos..].chars() {
            if snippet.len() + ch.len_utf8() > 100 {
                break;
            }
            snippet.push(ch);
        }
        StallError {
            pos: self.pos,
            current_char: self.current_char(),
            mode: self.mode(),
            mode_stack: self.mode_stack.clone(),
            snippet,
            dummy_counter: self.dummy_counter,
            last_space: self.last_space.clone(),
            last_punctuation: self.last_punctuation.clone(),
            dummy_last_space: self.dummy_last_space.clone(),
            dummy_last_punctuation: self.dummy_last_punctuation.clone(),
            is_math_empty: self.is_math_empty,
            preserve_dummy_last: self.preserve_dummy_last,
            can_insert_space_before_dummy: self.can_insert_space_before_dummy,
            is_math_char_trivial: self.is_math_char_trivial,
            math_vowel_state: self.math_vowel_state,
        }
    }

    // ── dummy synthesis ──

    fn generate_dummy(&mut self) -> String {
        self.generate_dummy_with(DummyGenerator::new())
    }

    /// Build the placeholder for the region being closed, respecting the
    /// spacing and punctuation carried out of the region. Clears the
    /// carried state and re-arms the vowel inference.
    fn generate_dummy_with(&mut self, generator: DummyGenerator) -> String {
        let starts_with_vowel = self.math_vowel_state == MathVowelState::StartsWithVowel;
        let mode = self.mode();

        let dummy = if mode.is_text() {
            self.next_dummy(generator, starts_with_vowel)
        } else if self.is_math_empty {
            // An empty display block still separates words around it.
            if mode == Mode::DisplayMath && self.last_space.is_empty() {
                " ".to_string()
            } else {
                String::new()
            }
        } else if mode == Mode::DisplayMath {
            let token = self.next_dummy(generator, starts_with_vowel);
            let leading = if self.last_space.is_empty() { " " } else { "" };
            let punctuation = if self.dummy_last_punctuation.is_empty() {
                ".".to_string()
            } else {
                self.dummy_last_punctuation.clone()
            };
            let trailing = if self.outer_mode() == Mode::InlineText {
                self.dummy_last_space.clone()
            } else {
                " ".to_string()
            };
            format!("{leading}{token}{punctuation}{trailing}")
        } else {
            let token = self.next_dummy(generator, starts_with_vowel);
            format!(
                "{token}{}{}",
                self.dummy_last_punctuation, self.dummy_last_space
            )
        };

        self.dummy_last_space.clear();
        self.dummy_last_punctuation.clear();
        self.math_vowel_state = MathVowelState::Undecided;
        dummy
    }

    fn next_dummy(&mut self, generator: DummyGenerator, starts_with_vowel: bool) -> String {
        let token = generator.generate(&self.language, self.dummy_counter, starts_with_vowel);
        self.dummy_counter += 1;
        token
    }

    // ── dispatch ──

    fn scan_ignore_environment(&mut self) {
        let end = self.ignore_environment_end.clone();
        if !end.is_empty() && self.code[self.pos..].starts_with(end.as_str()) {
            self.pop_mode();
            self.ignore_environment_end.clear();
            self.add_markup(&end);
        } else {
            let skipped = self.current_char().to_string();
            self.add_markup(&skipped);
        }
    }

    fn scan_rsweave(&mut self) {
        if self.code[self.pos..].starts_with('@') {
            self.pop_mode();
            self.add_markup("@");
        } else {
            let skipped = self.current_char().to_string();
            self.add_markup(&skipped);
        }
    }

    fn scan_normal(&mut self) {
        let ch = self.current_char();
        match ch {
            '\\' => self.scan_command(),
            '{' => self.scan_open_brace(),
            '}' => self.scan_close_brace(),
            '$' => self.scan_dollar(),
            '%' => self.scan_comment(),
            ' ' | '\t' | '\n' | '\r' => self.scan_whitespace(),
            '~' => self.scan_tie(),
            '&' => self.scan_alignment(),
            '`' | '\'' | '"' if self.mode().is_text() => self.scan_quote(ch),
            '-' if self.mode().is_text() => self.scan_dash(),
            '[' => self.scan_open_bracket(),
            '<' if self.dialect == Dialect::Rsweave => self.scan_rsweave_begin(),
            _ => self.scan_plain_char(ch),
        }
    }

    fn scan_open_brace(&mut self) {
        self.is_math_char_trivial = true;
        if let Some(length) = self.match_from(&LENGTH_IN_BRACE) {
            self.add_markup(&length);
        } else {
            let mode = self.mode();
            self.mode_stack.push(mode);
            self.add_markup("{");
        }
    }

    fn scan_close_brace(&mut self) {
        self.is_math_char_trivial = true;
        let interpret_as = if self.mode() == Mode::Heading && self.last_punctuation.is_empty() {
            "."
        } else {
            ""
        };
        let popped = self.pop_mode();
        self.add_markup_as("}", interpret_as);
        self.can_insert_space_before_dummy = true;
        // Leaving an inline-text interlude restarts the math block.
        if popped.is_text() && self.mode().is_math() {
            self.is_math_empty = true;
        }
    }

    fn scan_dollar(&mut self) {
        self.is_math_char_trivial = true;
        // inside inline math a "$$" lookahead still closes with a single "$"
        if self.code[self.pos..].starts_with("$$") && self.mode() != Mode::InlineMath {
            if self.mode() == Mode::DisplayMath {
                let dummy = self.generate_dummy();
                self.pop_mode();
                self.add_markup_as("$$", &dummy);
            } else {
                self.enter_display_math();
                self.add_markup("$$");
            }
        } else if self.mode() == Mode::InlineMath {
            let dummy = self.generate_dummy();
            self.pop_mode();
            self.add_markup_as("$", &dummy);
        } else {
            self.enter_inline_math();
            self.add_markup("$");
        }
    }

    fn scan_comment(&mut self) {
        let comment = self
            .match_from(&COMMENT)
            .expect("comment pattern matches at '%'");
        self.preserve_dummy_last = true;
        self.is_math_char_trivial = true;
        let interpret_as = if self.mode().is_text() {
            if contains_two_line_ends(&comment) {
                "\n\n"
            } else if self.last_space.is_empty() {
                " "
            } else {
                ""
            }
        } else {
            ""
        };
        self.add_markup_as(&comment, interpret_as);
    }

    fn scan_whitespace(&mut self) {
        let whitespace = self
            .match_from(&WHITESPACE)
            .expect("whitespace pattern matches at whitespace");
        self.preserve_dummy_last = true;
        self.is_math_char_trivial = true;
        if self.mode().is_text() {
            let interpret_as = if contains_two_line_ends(&whitespace) {
                "\n\n"
            } else if self.last_space.is_empty() {
                " "
            } else {
                ""
            };
            self.add_markup_as(&whitespace, interpret_as);
        } else if self.can_insert_space_before_dummy && self.last_space.is_empty() {
            self.add_markup_as(&whitespace, " ");
        } else {
            self.add_markup(&whitespace);
            self.dummy_last_space = " ".to_string();
        }
    }

    fn scan_tie(&mut self) {
        self.is_math_char_trivial = true;
        if self.mode().is_text() {
            self.preserve_dummy_last = true;
            let interpret_as = if self.last_space.is_empty() {
                "\u{00a0}"
            } else {
                ""
            };
            self.add_markup_as("~", interpret_as);
        } else {
            self.preserve_dummy_last = true;
            self.add_markup("~");
            self.dummy_last_space = " ".to_string();
        }
    }

    fn scan_alignment(&mut self) {
        // Table cell separator: markup, but a word boundary for dummies.
        self.is_math_char_trivial = true;
        self.preserve_dummy_last = true;
        self.add_markup("&");
        self.dummy_last_space = " ".to_string();
    }

    fn scan_quote(&mut self, ch: char) {
        let mut rest = self.code[self.pos..].chars();
        rest.next();
        let next = rest.next();
        match (ch, next) {
            ('`', Some('`')) => self.add_markup_as("``", "\u{201c}"),
            ('`', _) => self.add_text("`"),
            ('\'', Some('\'')) => self.add_markup_as("''", "\u{201d}"),
            ('\'', _) => self.add_text("'"),
            ('"', Some('\'')) => self.add_markup_as("\"'", "\u{201c}"),
            ('"', Some('`')) => self.add_markup_as("\"`", "\u{201e}"),
            ('"', Some('=')) => self.add_markup_as("\"=", "-"),
            ('"', Some('~')) => self.add_markup_as("\"~", "-"),
            ('"', Some('-')) => self.add_markup("\"-"),
            ('"', Some('"')) => self.add_markup("\"\""),
            ('"', Some('|')) => self.add_markup("\"|"),
            ('"', _) => self.add_text("\""),
            _ => unreachable!("scan_quote dispatched on quote characters"),
        }
    }

    fn scan_dash(&mut self) {
        let rest = &self.code[self.pos..];
        if rest.starts_with("---") {
            self.add_markup_as("---", "\u{2014}");
        } else if rest.starts_with("--") {
            self.add_markup_as("--", "\u{2013}");
        } else {
            self.add_text("-");
        }
    }

    fn scan_open_bracket(&mut self) {
        if let Some(length) = self.match_from(&LENGTH_IN_BRACKET) {
            self.is_math_char_trivial = true;
            self.add_markup(&length);
        } else {
            self.scan_plain_char('[');
        }
    }

    fn scan_rsweave_begin(&mut self) {
        if let Some(begin) = self.match_from(&RSWEAVE_BEGIN) {
            self.mode_stack.push(Mode::Rsweave);
            self.add_markup(&begin);
        } else {
            self.scan_plain_char('<');
        }
    }

    fn scan_plain_char(&mut self, ch: char) {
        let text = ch.to_string();
        if self.mode().is_text() {
            self.add_text(&text);
        } else {
            self.add_markup(&text);
            if is_punctuation(ch) {
                self.dummy_last_punctuation = text;
            }
            if self.math_vowel_state == MathVowelState::Undecided && ch.is_alphabetic() {
                self.math_vowel_state = vowel_class_of_letter(ch);
            }
        }
    }

    // ── command scanner ──

    fn scan_command(&mut self) {
        let Some(command) = self.match_from(&COMMAND) else {
            // lone backslash at the end of input; the loop guard skips it
            return;
        };
        match command.as_str() {
            "\\begin" | "\\end" => self.scan_environment_command(&command),
            "\\$" | "\\%" | "\\&" => {
                let literal = command[1..].to_string();
                self.add_markup_as(&command, &literal);
            }
            "\\[" => {
                self.is_math_char_trivial = true;
                self.enter_display_math();
                self.add_markup(&command);
            }
            "\\(" => {
                self.is_math_char_trivial = true;
                self.enter_inline_math();
                self.add_markup(&command);
            }
            "\\]" | "\\)" => {
                self.is_math_char_trivial = true;
                let dummy = if self.mode().is_math() {
                    self.generate_dummy()
                } else {
                    String::new()
                };
                self.pop_mode();
                self.add_markup_as(&command, &dummy);
            }
            "\\AA" => self.add_markup_as(&command, "\u{00c5}"),
            "\\O" => self.add_markup_as(&command, "\u{00d8}"),
            "\\aa" => self.add_markup_as(&command, "\u{00e5}"),
            "\\ss" => self.add_markup_as(&command, "\u{00df}"),
            "\\o" => self.add_markup_as(&command, "\u{00f8}"),
            "\\`" | "\\'" | "\\^" | "\\~" | "\\\"" | "\\=" | "\\." | "\\c" | "\\r" => {
                self.scan_accent(&command)
            }
            "\\ " | "\\," | "\\;" | "\\\\" | "\\hfill" | "\\hspace" | "\\hspace*" | "\\quad"
            | "\\qquad" | "\\newline" => self.scan_spacing_command(&command),
            "\\dots" | "\\eg" | "\\egc" | "\\euro" | "\\ie" | "\\iec" => {
                self.scan_abbreviation(&command)
            }
            "\\notag" | "\\qed" => {
                self.is_math_char_trivial = true;
                self.preserve_dummy_last = true;
                self.add_markup(&command);
            }
            "\\text" | "\\intertext" => self.scan_inline_text_command(&command),
            "\\verb" | "\\verb*" => self.scan_verbatim_command(&command),
            _ if HEADING_COMMANDS.contains(&command.as_str()) => {
                self.scan_heading_command(&command)
            }
            _ => self.scan_generic_command(&command),
        }
    }

    fn scan_environment_command(&mut self, command: &str) {
        self.is_math_char_trivial = true;
        let argument = {
            let after = self.pos + command.len();
            ENVIRONMENT_ARGUMENT
                .find(&self.code[after..])
                .map(|found| found.as_str().to_string())
                .unwrap_or_default()
        };
        let environment = if argument.len() >= 2 {
            argument[1..argument.len() - 1].to_string()
        } else {
            String::new()
        };
        let full = format!("{command}{argument}");
        let begin = command == "\\begin";

        if catalog::is_math_environment(&environment) {
            if begin {
                if environment == "math" {
                    self.enter_inline_math();
                } else {
                    self.enter_display_math();
                }
                self.add_markup(&full);
            } else {
                let dummy = if self.mode().is_math() {
                    self.generate_dummy()
                } else {
                    String::new()
                };
                self.pop_mode();
                self.add_markup_as(&full, &dummy);
            }
        } else if begin {
            let action = self
                .environments
                .get(&environment)
                .map(|signature| signature.action);
            if action == Some(Action::Ignore) {
                self.mode_stack.push(Mode::IgnoreEnvironment);
                self.ignore_environment_end = format!("\\end{{{environment}}}");
            } else {
                let mode = self.mode();
                self.mode_stack.push(mode);
            }
            self.add_markup(&full);
        } else {
            self.pop_mode();
            self.add_markup(&full);
        }

        if begin {
            self.consume_environment_arguments(&environment);
        }
    }

    /// `\begin{...}` may be followed by further argument groups (tabular
    /// column specs, textblock coordinates, ...); they are all markup.
    fn consume_environment_arguments(&mut self, environment: &str) {
        loop {
            let length = if let Some(length) =
                match_argument(&self.code, self.pos, ArgumentType::Brace)
            {
                length
            } else if let Some(length) =
                match_argument(&self.code, self.pos, ArgumentType::Bracket)
            {
                length
            } else if matches!(environment, "textblock" | "textblock*") {
                match match_argument(&self.code, self.pos, ArgumentType::Parenthesis) {
                    Some(length) => length,
                    None => break,
                }
            } else {
                break;
            };
            let group = self.code[self.pos..self.pos + length].to_string();
            self.add_markup(&group);
        }
    }

    fn scan_accent(&mut self, command: &str) {
        let accent = command
            .chars()
            .nth(1)
            .expect("accent command has two characters");
        let after = self.pos + command.len();
        let rest = &self.code[after..];

        // letter commands (\c, \r) may be separated from their target by a space
        let (space, rest) = if matches!(accent, 'c' | 'r') && rest.starts_with(' ') {
            (1usize, &rest[1..])
        } else {
            (0usize, rest)
        };

        let Some((consumed, letter)) = match_accent_target(rest) else {
            self.add_markup(command);
            return;
        };
        let full = self.code[self.pos..after + space + consumed].to_string();
        let interpret_as = accent::compose(accent, letter)
            .map(String::from)
            .unwrap_or_default();
        self.add_markup_as(&full, &interpret_as);
    }

    fn scan_spacing_command(&mut self, command: &str) {
        self.is_math_char_trivial = true;
        let mut full = command.to_string();
        if matches!(command, "\\hspace" | "\\hspace*") {
            if let Some(length) =
                match_argument(&self.code, self.pos + command.len(), ArgumentType::Brace)
            {
                full.push_str(&self.code[self.pos + command.len()..self.pos + command.len() + length]);
            }
        }

        if self.mode().is_text() {
            self.preserve_dummy_last = true;
            let interpret_as = if !self.last_space.is_empty() {
                ""
            } else if command == "\\," {
                "\u{202f}"
            } else {
                " "
            };
            self.add_markup_as(&full, interpret_as);
        } else if self.can_insert_space_before_dummy && self.last_space.is_empty() {
            self.add_markup_as(&full, " ");
        } else {
            self.preserve_dummy_last = true;
            self.add_markup(&full);
            self.dummy_last_space = " ".to_string();
        }
    }

    fn scan_abbreviation(&mut self, command: &str) {
        let interpret_as = match command {
            "\\dots" => "...",
            "\\eg" => "e.g.",
            "\\egc" => "e.g.,",
            "\\euro" => "\u{20ac}",
            "\\ie" => "i.e.",
            "\\iec" => "i.e.,",
            _ => unreachable!("scan_abbreviation dispatched on known commands"),
        };
        if self.mode().is_text() {
            self.add_markup_as(command, interpret_as);
        } else {
            self.add_markup(command);
        }
    }

    fn scan_heading_command(&mut self, command: &str) {
        self.add_markup(command);
        if let Some(length) = match_argument(&self.code, self.pos, ArgumentType::Bracket) {
            let group = self.code[self.pos..self.pos + length].to_string();
            self.add_markup(&group);
        }
        if self.code[self.pos..].starts_with('{') {
            self.mode_stack.push(Mode::Heading);
            self.add_markup("{");
        }
    }

    fn scan_inline_text_command(&mut self, command: &str) {
        // Inside math the text interlude first flushes the math seen so far.
        let interpret_as = if self.mode().is_math() {
            self.generate_dummy()
        } else {
            String::new()
        };
        if self.code[self.pos + command.len()..].starts_with('{') {
            self.mode_stack.push(Mode::InlineText);
            let full = format!("{command}{{");
            self.add_markup_as(&full, &interpret_as);
        } else {
            self.add_markup_as(command, &interpret_as);
        }
    }

    fn scan_verbatim_command(&mut self, command: &str) {
        let after = self.pos + command.len();
        let rest = &self.code[after..];
        if let Some(delimiter) = rest.chars().next() {
            let body_start = delimiter.len_utf8();
            if let Some(close) = rest[body_start..].find(delimiter) {
                let total = command.len() + body_start + close + delimiter.len_utf8();
                let full = self.code[self.pos..self.pos + total].to_string();
                let dummy = self.generate_dummy();
                self.add_markup_as(&full, &dummy);
                return;
            }
        }
        self.add_markup(command);
    }

    fn scan_generic_command(&mut self, command: &str) {
        let candidates = self.commands.get(command).cloned().unwrap_or_default();
        let mut best: Option<(usize, &CommandSignature)> = None;
        for signature in &candidates {
            if let Some(length) = signature.match_from_position(&self.code, self.pos) {
                // ties go to the later registration
                if best.map_or(true, |(best_length, _)| length >= best_length) {
                    best = Some((length, signature));
                }
            }
        }

        match best {
            Some((length, signature)) if signature.action == Action::Ignore => {
                let full = self.code[self.pos..self.pos + length].to_string();
                self.add_markup(&full);
            }
            Some((length, signature)) if signature.action == Action::Dummy => {
                let generator = signature.dummy_generator;
                let full = self.code[self.pos..self.pos + length].to_string();
                let dummy = self.generate_dummy_with(generator);
                self.add_markup_as(&full, &dummy);
            }
            _ => {
                // default action or no signature: the command word alone
                self.add_markup(command);
                if self.mode().is_math() && self.math_vowel_state == MathVowelState::Undecided {
                    self.math_vowel_state = vowel_class_of_command(command);
                }
            }
        }
    }
}

/// Match an accent target: a bare letter, `{X}`, `\i`, or `{\i}`. Returns
/// the consumed byte length and the base letter (`\i` counts as `i`).
fn match_accent_target(rest: &str) -> Option<(usize, char)> {
    if let Some(inner) = rest.strip_prefix('{') {
        if inner.starts_with("\\i}") {
            return Some((4, 'i'));
        }
        let mut chars = inner.chars();
        let letter = chars.next()?;
        if letter.is_ascii_alphabetic() && chars.next() == Some('}') {
            return Some((3, letter));
        }
        return None;
    }
    if rest.starts_with("\\i") {
        return Some((2, 'i'));
    }
    let letter = rest.chars().next()?;
    if letter.is_ascii_alphabetic() {
        return Some((1, letter));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(code: &str) -> LatexBuilder {
        let mut builder = LatexBuilder::new(Dialect::Latex);
        builder.add_code(code).expect("scanner stalled");
        builder
    }

    fn plain(code: &str) -> String {
        build(code).finish().plain().to_string()
    }

    #[test]
    fn test_plain_text_passthrough() {
        let text = build("This is a test.").finish();
        assert_eq!(text.plain(), "This is a test.");
        assert_eq!(text.segments().len(), 1, "plain prose is one text segment");
        assert!(text.segments()[0].is_text());
    }

    #[test]
    fn test_inline_math_dummy() {
        // 't' is named "tee": consonant-initial dummy
        assert_eq!(plain("Let $t$ be a real number."), "Let Dummy0 be a real number.");
        // 'x' is named "ex": vowel-initial dummy
        assert_eq!(plain("Let $x$ be a real number."), "Let Ina0 be a real number.");
    }

    #[test]
    fn test_math_vowel_from_command() {
        assert_eq!(plain("Let $\\ell$ be a length."), "Let Ina0 be a length.");
        assert_eq!(plain("Let $\\alpha$ be small."), "Let Dummy0 be small.");
        // font commands defer to the wrapped atom
        assert_eq!(plain("Let $\\mathbb{x}$ act."), "Let Ina0 act.");
    }

    #[test]
    fn test_heading_gets_period() {
        assert_eq!(plain("\\section{Introduction} Hello."), "Introduction. Hello.");
    }

    #[test]
    fn test_heading_keeps_existing_punctuation() {
        assert_eq!(plain("\\section{Intro.} Hi."), "Intro. Hi.");
    }

    #[test]
    fn test_heading_with_optional_argument() {
        assert_eq!(
            plain("\\section*[short]{Long title} Text."),
            "Long title. Text."
        );
    }

    #[test]
    fn test_smart_quotes() {
        assert_eq!(plain("He said ``hello''."), "He said \u{201c}hello\u{201d}.");
        assert_eq!(plain("\"`Guten Tag\"' sagte er."), "\u{201e}Guten Tag\u{201c} sagte er.");
        assert_eq!(plain("Zeilen\"=umbruch"), "Zeilen-umbruch");
        assert_eq!(plain("Druck\"-er"), "Drucker");
        assert_eq!(plain("it's fine"), "it's fine");
    }

    #[test]
    fn test_dashes() {
        assert_eq!(plain("a---b and c--d"), "a\u{2014}b and c\u{2013}d");
        assert_eq!(plain("well-known"), "well-known");
    }

    #[test]
    fn test_non_breaking_space() {
        assert_eq!(plain("A~B"), "A\u{a0}B");
        assert_eq!(plain("A ~B"), "A B", "no second space after whitespace");
    }

    #[test]
    fn test_display_math_environment() {
        assert_eq!(
            plain("\\begin{equation}a=1\\end{equation} Done."),
            " Ina0. Done."
        );
    }

    #[test]
    fn test_display_math_dollars() {
        assert_eq!(plain("$$a$$ X"), " Ina0. X");
        assert_eq!(plain("$$$$ X"), " X", "empty display math is just a space");
    }

    #[test]
    fn test_display_math_carries_punctuation() {
        assert_eq!(
            plain("We see\n\\begin{equation}\n  t = 1,\n\\end{equation}\nwhich holds."),
            "We see Dummy0, which holds."
        );
    }

    #[test]
    fn test_inline_math_carries_punctuation() {
        assert_eq!(plain("$x,$ then"), "Ina0, then");
    }

    #[test]
    fn test_inline_math_environment() {
        assert_eq!(plain("\\begin{math}x\\end{math} ok"), "Ina0 ok");
    }

    #[test]
    fn test_math_brackets() {
        assert_eq!(
            plain("Take \\(t\\) and \\[u\\] now."),
            "Take Dummy0 and Dummy1. now."
        );
    }

    #[test]
    fn test_text_interlude_in_math() {
        assert_eq!(plain("$y \\text{if} z$"), "Dummy0 if Dummy1");
    }

    #[test]
    fn test_comment_elision() {
        assert_eq!(plain("% a comment\nNext."), " Next.");
        assert_eq!(plain("foo % note\nbar"), "foo bar");
    }

    #[test]
    fn test_comment_preserves_paragraph_break() {
        // the whole "\n% c\n\n" run is one whitespace token spanning a blank line
        assert_eq!(plain("A\n% c\n\nB"), "A\n\nB");
    }

    #[test]
    fn test_accents() {
        assert_eq!(plain("\\\"{A}nton"), "\u{c4}nton");
        assert_eq!(plain("caf\\'e"), "caf\u{e9}");
        assert_eq!(plain("gar\\c{c}on"), "gar\u{e7}on");
        assert_eq!(plain("\\r Angstr\\\"om"), "\u{c5}ngstr\u{f6}m");
        assert_eq!(plain("na\\\"{\\i}ve"), "na\u{ef}ve");
        // unlisted combination: elided
        assert_eq!(plain("x\\~{q}y"), "xy");
    }

    #[test]
    fn test_national_letters() {
        assert_eq!(plain("stra\\ss e"), "stra\u{df} e");
        assert_eq!(plain("\\O re"), "\u{d8} re");
    }

    #[test]
    fn test_escaped_specials() {
        assert_eq!(plain("100\\% sure \\& more"), "100% sure & more");
    }

    #[test]
    fn test_lengths_are_consumed() {
        assert_eq!(plain("{12pt}"), "");
        assert_eq!(plain("[2.5em]"), "");
        assert_eq!(plain("{-1.5cm}"), "");
        assert_eq!(plain("{hello}"), "hello");
    }

    #[test]
    fn test_spacing_commands() {
        assert_eq!(plain("a\\quad b"), "a b");
        assert_eq!(plain("a\\,b"), "a\u{202f}b");
        assert_eq!(plain("one\\\\two"), "one two");
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(plain("\\eg apples"), "e.g. apples");
        assert_eq!(plain("More\\dots and \\euro 5"), "More... and \u{20ac} 5");
        // in math mode abbreviation commands are pure markup
        assert_eq!(plain("$\\dots$"), "Dummy0");
    }

    #[test]
    fn test_verbatim_command() {
        assert_eq!(plain("Use \\verb|x+1| now."), "Use Dummy0 now.");
        assert_eq!(plain("Use \\verb*!a b! now."), "Use Dummy0 now.");
    }

    #[test]
    fn test_ignore_environment() {
        let text = build("\\begin{verbatim}raw\\end{verbatim}").finish();
        assert_eq!(text.plain(), "");
        let total: usize = text.segments().iter().map(|seg| seg.source.len()).sum();
        assert_eq!(total, "\\begin{verbatim}raw\\end{verbatim}".len());
    }

    #[test]
    fn test_command_signatures_from_catalogue() {
        assert_eq!(plain("See \\cite{knuth} now."), "See Dummy0 now.");
        assert_eq!(plain("See \\cite[p. 3]{knuth} now."), "See Dummy0 now.");
        assert_eq!(plain("\\usepackage[utf8]{inputenc} Text."), " Text.");
        assert_eq!(plain("\\label{sec:intro}Intro"), "Intro");
    }

    #[test]
    fn test_unknown_command_keeps_arguments_as_text() {
        assert_eq!(plain("\\unknowncmd{arg} X"), "arg X");
    }

    #[test]
    fn test_mode_stack_balanced_at_eof() {
        let builder = build("Text $a$ \\begin{equation}b\\end{equation} {group} done");
        assert_eq!(builder.mode_stack, vec![Mode::ParagraphText]);
    }

    #[test]
    fn test_source_conservation() {
        let code = "\\section{A}
Some prose with $m_1$ and \\cite{x}.
\\begin{align}
  a &= b \\\\
  c &= d
\\end{align}
\\begin{verbatim}
kept raw
\\end{verbatim}
The end.~%
";
        let text = build(code).finish();
        let total: usize = text.segments().iter().map(|seg| seg.source.len()).sum();
        assert_eq!(total, code.len());
    }

    #[test]
    fn test_offset_mapping() {
        let text = build("Let $x$ be").finish();
        assert_eq!(text.plain(), "Let Ina0 be");
        let plain_b = text.plain().find("be").unwrap();
        assert_eq!(text.source_offset(plain_b), 8);
        // inside the math block, plaintext collapses onto the dummy
        assert_eq!(text.plain_offset(5), 4);
    }

    #[test]
    fn test_add_code_accumulates() {
        let mut builder = LatexBuilder::new(Dialect::Latex);
        builder.add_code("One.").expect("scanner stalled");
        builder.add_code(" Two.").expect("scanner stalled");
        let text = builder.finish();
        assert_eq!(text.plain(), "One. Two.");
        assert_eq!(text.source_len(), "One.".len() + " Two.".len());
    }

    #[test]
    fn test_stall_recovery_non_strict() {
        let mut builder = LatexBuilder::new(Dialect::Latex);
        builder.add_code("\\").expect("non-strict mode never stalls");
        assert_eq!(builder.annotated_text().plain(), "");
        assert_eq!(builder.diagnostics().len(), 1);
    }

    #[test]
    fn test_stall_error_strict() {
        let mut builder = LatexBuilder::new(Dialect::Latex);
        builder.set_strict_mode(true);
        let error = builder.add_code("\\").expect_err("strict mode reports the stall");
        assert_eq!(error.pos, 0);
        assert_eq!(error.current_char, '\\');
        assert_eq!(error.mode, Mode::ParagraphText);
    }

    #[test]
    fn test_settings_registration() {
        let mut settings = CheckSettings::default();
        settings
            .latex_environments
            .insert("minted".to_string(), "ignore".to_string());
        settings
            .latex_commands
            .insert("\\highlight{}".to_string(), "dummy".to_string());
        settings
            .latex_commands
            .insert("\\eqs{}".to_string(), "pluralDummy".to_string());
        settings
            .latex_commands
            .insert("\\broken{}".to_string(), "explode".to_string());

        let mut builder = LatexBuilder::new(Dialect::Latex);
        builder.apply_settings(&settings);
        builder
            .add_code("\\begin{minted}code\\end{minted}\\highlight{x} and \\eqs{1,2}")
            .expect("scanner stalled");
        assert_eq!(builder.annotated_text().plain(), "Dummy0 and Dummies1");
    }

    #[test]
    fn test_longest_signature_match_wins() {
        let mut settings = CheckSettings::default();
        settings
            .latex_commands
            .insert("\\meta{}".to_string(), "ignore".to_string());
        settings
            .latex_commands
            .insert("\\meta{}{}".to_string(), "ignore".to_string());
        let mut builder = LatexBuilder::new(Dialect::Latex);
        builder.apply_settings(&settings);
        builder.add_code("\\meta{a}{b} c").expect("scanner stalled");
        assert_eq!(builder.annotated_text().plain(), " c");
    }

    #[test]
    fn test_rsweave_chunks() {
        let mut builder = LatexBuilder::new(Dialect::Rsweave);
        builder
            .add_code("Before\n<<chunk,echo=FALSE>>=\nx <- 1\n@\nAfter")
            .expect("scanner stalled");
        assert_eq!(builder.annotated_text().plain(), "Before After");
    }

    #[test]
    fn test_rsweave_marker_is_plain_text_in_latex() {
        assert_eq!(plain("a < b"), "a < b");
    }

    #[test]
    fn test_tabular_alignment() {
        assert_eq!(
            plain("\\begin{tabular}{ll}a & b\\end{tabular}"),
            "a b"
        );
    }
}
