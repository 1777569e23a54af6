//! Scanner modes and the math-vowel inference.

/// What the scanner is currently inside of. The top of the mode stack
/// decides how each character is classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Top-level prose.
    ParagraphText,
    /// Prose inside `\text{...}`/`\intertext{...}` within math.
    InlineText,
    /// Prose inside a sectioning command's brace group.
    Heading,
    InlineMath,
    DisplayMath,
    /// Contents discarded until the matching `\end{...}`.
    IgnoreEnvironment,
    /// Literate-code chunk of an R-Sweave document, discarded until `@`.
    Rsweave,
}

impl Mode {
    pub fn is_math(self) -> bool {
        matches!(self, Mode::InlineMath | Mode::DisplayMath)
    }

    pub fn is_text(self) -> bool {
        matches!(self, Mode::ParagraphText | Mode::InlineText | Mode::Heading)
    }
}

/// Whether the first mathematical atom of the current math block starts with
/// a vowel sound. Decides the vowel-initial dummy variant at math close.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MathVowelState {
    #[default]
    Undecided,
    StartsWithVowel,
    StartsWithConsonant,
}

/// Letters whose English names start with a vowel sound ("f" is "eff",
/// "x" is "ex", ...), not just the vowels themselves.
const VOWEL_SOUND_LETTERS: &[char] = &[
    'a', 'e', 'f', 'h', 'i', 'l', 'm', 'n', 'o', 'r', 's', 'x',
];

/// Font-change commands that wrap the actual first atom; they leave the
/// vowel state undecided.
const FONT_COMMANDS: &[&str] = &[
    "\\mathbb",
    "\\mathbf",
    "\\mathcal",
    "\\mathfrak",
    "\\mathit",
    "\\mathnormal",
    "\\mathrm",
    "\\mathsf",
    "\\mathtt",
];

pub fn vowel_class_of_letter(letter: char) -> MathVowelState {
    if VOWEL_SOUND_LETTERS.contains(&letter.to_ascii_lowercase()) {
        MathVowelState::StartsWithVowel
    } else {
        MathVowelState::StartsWithConsonant
    }
}

pub fn vowel_class_of_command(command: &str) -> MathVowelState {
    if command == "\\ell" {
        MathVowelState::StartsWithVowel
    } else if FONT_COMMANDS.contains(&command) {
        MathVowelState::Undecided
    } else {
        MathVowelState::StartsWithConsonant
    }
}
