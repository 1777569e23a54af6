//! Placeholder nouns standing in for opaque regions.
//!
//! The grammar checker needs a well-formed sentence around elided math,
//! verbatim literals, and opaque commands, so each one is summarised by a
//! short invented noun. The token is parameterised by the check language and
//! a per-document index, which keeps it deterministic and lexically distinct
//! from surrounding prose.

/// Generates placeholder nouns, optionally in plural form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DummyGenerator {
    pub plural: bool,
}

impl DummyGenerator {
    pub fn new() -> Self {
        Self { plural: false }
    }

    pub fn plural() -> Self {
        Self { plural: true }
    }

    /// Produce the placeholder for `number`.
    ///
    /// `starts_with_vowel` selects a vowel-initial token for languages whose
    /// article depends on the initial sound of the following noun.
    pub fn generate(&self, language: &str, number: u32, starts_with_vowel: bool) -> String {
        if self.plural {
            format!("Dummies{number}")
        } else if starts_with_vowel {
            format!("Ina{number}")
        } else if language == "fr" || language.starts_with("fr-") {
            format!("Jimmy-{number}")
        } else {
            format!("Dummy{number}")
        }
    }
}
