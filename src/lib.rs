//! Markup-to-plaintext annotation engine for grammar checking.
//!
//! Grammar checkers operate on prose, but LaTeX and Markdown sources are
//! full of commands, environments, math, and code that must be elided or
//! replaced before checking. The builders in this crate scan a source
//! document and produce an [`AnnotatedText`]: the plaintext seen by the
//! checker plus a segment list mapping every plaintext offset back to a
//! byte range of the original source, so diagnostics can be placed where
//! the author wrote the text.
//!
//! Opaque regions (math blocks, `\verb` literals, commands registered with
//! the dummy action) are summarised by placeholder nouns so sentences stay
//! well-formed around them.

pub mod annotation;
pub mod catalog;
pub mod diagnostic;
pub mod dummy;
pub mod latex;
pub mod markdown;
pub mod settings;
pub mod signature;
pub mod span;

pub use annotation::{AnnotatedText, Segment, SegmentKind};
pub use diagnostic::{render_diagnostics, Diagnostic, Severity};
pub use dummy::DummyGenerator;
pub use latex::{Dialect, LatexBuilder, MathVowelState, Mode, StallError};
pub use markdown::MarkdownBuilder;
pub use settings::CheckSettings;
pub use signature::{Action, ArgumentType, CommandSignature, EnvironmentSignature};
pub use span::Span;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("unsupported code language id '{0}'")]
    UnsupportedLanguage(String),
    #[error(transparent)]
    Stall(#[from] StallError),
}

/// One-call entry: build annotated text for a whole document.
///
/// `code_language_id` is `latex`, `rsweave`, or `markdown`. Strict mode
/// only applies to the LaTeX dialects; the Markdown walk cannot stall.
pub fn annotate(
    code_language_id: &str,
    source: &str,
    settings: &CheckSettings,
    strict: bool,
) -> Result<AnnotatedText, AnnotateError> {
    if code_language_id == "markdown" {
        let mut builder = MarkdownBuilder::new();
        builder.apply_settings(settings);
        builder.add_code(source);
        return Ok(builder.finish());
    }
    let Some(dialect) = Dialect::from_language_id(code_language_id) else {
        return Err(AnnotateError::UnsupportedLanguage(
            code_language_id.to_string(),
        ));
    };
    let mut builder = LatexBuilder::new(dialect);
    builder.apply_settings(settings);
    builder.set_strict_mode(strict);
    builder.add_code(source)?;
    Ok(builder.finish())
}
