//! Built-in command and environment catalogues.
//!
//! These cover the common preamble, reference, and float machinery so that
//! ordinary documents check cleanly without per-project settings. Users add
//! or override signatures through [`crate::settings::CheckSettings`].

use crate::signature::{Action, CommandSignature, EnvironmentSignature};

/// Environments whose body is mathematics. `math` is inline; all others are
/// display math.
pub const MATH_ENVIRONMENTS: &[&str] = &[
    "align",
    "align*",
    "alignat",
    "alignat*",
    "displaymath",
    "eqnarray",
    "eqnarray*",
    "equation",
    "equation*",
    "flalign",
    "flalign*",
    "gather",
    "gather*",
    "math",
    "multline",
    "multline*",
];

pub fn is_math_environment(name: &str) -> bool {
    MATH_ENVIRONMENTS.contains(&name)
}

/// The built-in command signatures.
pub fn default_commands() -> Vec<CommandSignature> {
    use Action::{Dummy, Ignore};

    let ignore: &[&str] = &[
        "\\addbibresource{}",
        "\\addtocontents{}{}",
        "\\addtocounter{}{}",
        "\\addtolength{}{}",
        "\\bibliography{}",
        "\\bibliographystyle{}",
        "\\captionsetup{}",
        "\\captionsetup[]{}",
        "\\definecolor{}{}{}",
        "\\documentclass{}",
        "\\documentclass[]{}",
        "\\geometry{}",
        "\\graphicspath{}",
        "\\hypersetup{}",
        "\\href{}",
        "\\hyperref[]",
        "\\include{}",
        "\\includegraphics{}",
        "\\includegraphics[]{}",
        "\\input{}",
        "\\label{}",
        "\\linespread{}",
        "\\newcommand{}{}",
        "\\newcommand*{}{}",
        "\\newcounter{}",
        "\\newenvironment{}{}{}",
        "\\newtheorem{}{}",
        "\\nocite{}",
        "\\numberwithin{}{}",
        "\\pagenumbering{}",
        "\\pagestyle{}",
        "\\printbibliography",
        "\\renewcommand{}{}",
        "\\renewcommand*{}{}",
        "\\setcounter{}{}",
        "\\setlength{}{}",
        "\\setstretch{}",
        "\\theoremstyle{}",
        "\\todo{}",
        "\\todo[]{}",
        "\\usepackage{}",
        "\\usepackage[]{}",
        "\\usetikzlibrary{}",
        "\\vspace{}",
        "\\vspace*{}",
    ];

    let dummy: &[&str] = &[
        "\\cite{}",
        "\\cite[]{}",
        "\\citealp{}",
        "\\citealt{}",
        "\\citeauthor{}",
        "\\citep{}",
        "\\citep[]{}",
        "\\citet{}",
        "\\citet[]{}",
        "\\citeyear{}",
        "\\cref{}",
        "\\Cref{}",
        "\\eqref{}",
        "\\footcite{}",
        "\\footfullcite{}",
        "\\fullcite{}",
        "\\gls{}",
        "\\pageref{}",
        "\\ref{}",
        "\\textcite{}",
        "\\url{}",
    ];

    let mut commands: Vec<CommandSignature> = Vec::new();
    for prototype in ignore {
        commands.push(CommandSignature::new(prototype, Ignore));
    }
    for prototype in dummy {
        commands.push(CommandSignature::new(prototype, Dummy));
    }
    commands.push(
        CommandSignature::parse(
            "\\glspl{}",
            Dummy,
            crate::dummy::DummyGenerator::plural(),
        )
        .expect("valid prototype"),
    );
    commands
}

/// The built-in environment signatures. Everything not listed defaults to
/// treating the body as the current mode.
pub fn default_environments() -> Vec<EnvironmentSignature> {
    vec![
        EnvironmentSignature::new("lstlisting", Action::Ignore),
        EnvironmentSignature::new("tikzpicture", Action::Ignore),
        EnvironmentSignature::new("verbatim", Action::Ignore),
    ]
}
