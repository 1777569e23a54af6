//! End-to-end scenarios and invariants over the public API.

use annotext::{annotate, AnnotateError, CheckSettings, SegmentKind};

fn latex(source: &str) -> annotext::AnnotatedText {
    annotate("latex", source, &CheckSettings::default(), false)
        .expect("non-strict latex never fails")
}

fn latex_plain(source: &str) -> String {
    latex(source).plain().to_string()
}

fn markdown_plain(source: &str) -> String {
    annotate("markdown", source, &CheckSettings::default(), false)
        .expect("markdown never fails")
        .plain()
        .to_string()
}

fn source_bytes_covered(text: &annotext::AnnotatedText) -> usize {
    text.segments().iter().map(|seg| seg.source.len()).sum()
}

// ── seed corpus ──

#[test]
fn scenario_plain_text() {
    let text = latex("This is a test.");
    assert_eq!(text.plain(), "This is a test.");
    assert_eq!(text.segments().len(), 1);
    assert!(matches!(text.segments()[0].kind, SegmentKind::Text));
}

#[test]
fn scenario_inline_math() {
    // one dummy token where the math was; 'x' picks the vowel-initial form
    assert_eq!(latex_plain("Let $x$ be a real number."), "Let Ina0 be a real number.");
}

#[test]
fn scenario_section_heading() {
    assert_eq!(latex_plain("\\section{Introduction} Hello."), "Introduction. Hello.");
}

#[test]
fn scenario_smart_quotes() {
    insta::assert_snapshot!(latex_plain("He said ``hello''."), @"He said “hello”.");
}

#[test]
fn scenario_dashes() {
    insta::assert_snapshot!(latex_plain("a---b and c--d"), @"a—b and c–d");
}

#[test]
fn scenario_non_breaking_space() {
    assert_eq!(latex_plain("A~B"), "A\u{a0}B");
}

#[test]
fn scenario_equation_environment() {
    assert_eq!(
        latex_plain("\\begin{equation}a=1\\end{equation} Done."),
        " Ina0. Done."
    );
}

#[test]
fn scenario_comment() {
    assert_eq!(latex_plain("% a comment\nNext."), " Next.");
}

#[test]
fn scenario_accent() {
    assert_eq!(latex_plain("\\\"{A}nton"), "\u{c4}nton");
}

#[test]
fn scenario_verbatim_environment() {
    assert_eq!(latex_plain("\\begin{verbatim}raw\\end{verbatim}"), "");
}

// ── round-trip properties ──

#[test]
fn property_text_passthrough_is_identity() {
    let source = "Nothing special in this sentence at all.";
    let text = latex(source);
    assert_eq!(text.plain(), source);
    assert_eq!(text.segments().len(), 1);
}

#[test]
fn property_length_consumes_silently() {
    assert_eq!(latex_plain("{12pt}"), "");
    assert_eq!(latex_plain("[3.5em]"), "");
}

// ── invariants ──

#[test]
fn invariant_source_conservation() {
    let sources = [
        "This is a test.",
        "Let $x$ be a real number.",
        "\\section{Introduction} Hello.",
        "\\begin{equation}a=1\\end{equation} Done.",
        "\\begin{verbatim}raw\\end{verbatim}",
        "na\\\"{\\i}ve \\verb|x| ``quoted'' a---b",
        "\\documentclass[12pt]{article}\\usepackage{x} Text \\cite[p.~1]{k}.",
    ];
    for source in sources {
        let text = latex(source);
        assert_eq!(
            source_bytes_covered(&text),
            source.len(),
            "conservation failed for {source:?}"
        );
    }
}

#[test]
fn invariant_termination_on_pathological_input() {
    let sources = [
        "\\",
        "{",
        "}",
        "$",
        "$$",
        "\\end{x}",
        "\\begin",
        "\\begin{verbatim}unclosed",
        "\\verb|unclosed",
        "{{{{",
        "\\'",
        "\\section",
        "a $ b",
        "\"",
    ];
    for source in sources {
        let text = latex(source);
        assert_eq!(
            source_bytes_covered(&text),
            source.len(),
            "termination or conservation failed for {source:?}"
        );
    }
}

#[test]
fn invariant_strict_mode_reports_stall() {
    let error = annotate("latex", "\\", &CheckSettings::default(), true)
        .expect_err("a lone backslash cannot advance the scanner");
    match error {
        AnnotateError::Stall(stall) => {
            assert_eq!(stall.pos, 0);
            assert_eq!(stall.current_char, '\\');
        }
        other => panic!("expected a stall, got {other:?}"),
    }
}

#[test]
fn invariant_offset_mapping_is_monotone() {
    let source = "Intro $a+b$ with \\cite{k} and \\begin{equation}c\\end{equation} done.";
    let text = latex(source);
    let mut previous = 0;
    for offset in 0..=text.plain().len() {
        let mapped = text.source_offset(offset);
        assert!(mapped >= previous, "offset map went backwards at {offset}");
        assert!(mapped <= source.len());
        previous = mapped;
    }
}

#[test]
fn invariant_dummy_tokens_distinct_from_prose() {
    let source = "Alpha $x$ beta $y$ gamma \\verb|z| delta.";
    let text = latex(source);
    for token in ["Ina0", "Dummy1", "Dummy2"] {
        if text.plain().contains(token) {
            assert!(
                !source.contains(token),
                "dummy token {token} collides with source prose"
            );
        }
    }
}

// ── a small document end to end ──

#[test]
fn document_mixed_constructs() {
    let source = "\\section{Intro}\n\nProse with $x$ math and \\cite{a}.\n\n\\begin{equation}\n  y = 2,\n\\end{equation}\n\ndone.";
    let expected = "Intro.\n\nProse with Ina0 math and Dummy1.\n\nDummy2, \n\ndone.";
    let text = latex(source);
    assert_eq!(text.plain(), expected);
    assert_eq!(source_bytes_covered(&text), source.len());
}

#[test]
fn document_markdown_end_to_end() {
    insta::assert_snapshot!(markdown_plain("Run `ls -la` now."), @"Run Dummy0 now.");
    assert_eq!(
        markdown_plain("# Title\n\nSome *emphasis* and a [link](x) here."),
        "Title\nSome emphasis and a link here."
    );
}

#[test]
fn rsweave_chunks_are_elided() {
    let text = annotate(
        "rsweave",
        "Before\n<<setup>>=\nlibrary(ggplot2)\n@\nAfter",
        &CheckSettings::default(),
        false,
    )
    .expect("rsweave builds");
    assert_eq!(text.plain(), "Before After");
}
