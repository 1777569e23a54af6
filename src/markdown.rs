//! Markdown-to-annotated-text builder.
//!
//! Walks the event stream of pulldown-cmark with source offsets. Node kinds
//! map to actions: ignored nodes (code blocks, raw HTML, YAML front matter)
//! become markup for their whole source range, dummy nodes (inline code,
//! math) are summarised by a placeholder noun, text leaves pass through, and
//! HTML entities resolve to their decoded characters. Source between nodes
//! is markup whose newlines turn into a space inside a paragraph and a line
//! break between blocks, keeping paragraph boundaries intact for the
//! checker.

use std::collections::BTreeMap;
use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::annotation::AnnotatedText;
use crate::dummy::DummyGenerator;
use crate::settings::CheckSettings;
use crate::signature::Action;

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    options
}

fn node_kind_of_tag(tag: &Tag) -> &'static str {
    match tag {
        Tag::Paragraph => "Paragraph",
        Tag::Heading { .. } => "Heading",
        Tag::BlockQuote(_) => "BlockQuote",
        Tag::CodeBlock(_) => "CodeBlock",
        Tag::HtmlBlock => "HtmlBlock",
        Tag::List(_) => "List",
        Tag::Item => "Item",
        Tag::FootnoteDefinition(_) => "FootnoteDefinition",
        Tag::Table(_) => "Table",
        Tag::TableHead => "TableHead",
        Tag::TableRow => "TableRow",
        Tag::TableCell => "TableCell",
        Tag::Emphasis => "Emphasis",
        Tag::Strong => "Strong",
        Tag::Strikethrough => "Strikethrough",
        Tag::Link { .. } => "Link",
        Tag::Image { .. } => "Image",
        Tag::MetadataBlock(_) => "MetadataBlock",
        _ => "Other",
    }
}

/// Walks a Markdown document and emits annotated text.
pub struct MarkdownBuilder {
    language: String,
    actions: BTreeMap<String, (Action, DummyGenerator)>,
    sink: AnnotatedText,
    dummy_counter: u32,
    pos: usize,
    paragraph_depth: usize,
}

impl Default for MarkdownBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        let mut actions: BTreeMap<String, (Action, DummyGenerator)> = BTreeMap::new();
        for kind in ["CodeBlock", "HtmlBlock", "MetadataBlock", "Html", "InlineHtml"] {
            actions.insert(kind.to_string(), (Action::Ignore, DummyGenerator::new()));
        }
        for kind in ["Code", "InlineMath", "DisplayMath"] {
            actions.insert(kind.to_string(), (Action::Dummy, DummyGenerator::new()));
        }
        Self {
            language: "en-US".to_string(),
            actions,
            sink: AnnotatedText::new(),
            dummy_counter: 0,
            pos: 0,
            paragraph_depth: 0,
        }
    }

    /// Register node-kind actions and the check language.
    pub fn apply_settings(&mut self, settings: &CheckSettings) {
        self.language = settings.language_short_code.clone();
        for (kind, action) in &settings.markdown_nodes {
            let Some((action, generator)) = Action::parse_command_action(action) else {
                continue;
            };
            self.actions.insert(kind.clone(), (action, generator));
        }
    }

    pub fn annotated_text(&self) -> &AnnotatedText {
        &self.sink
    }

    pub fn finish(self) -> AnnotatedText {
        self.sink
    }

    /// Parse and walk one Markdown document.
    pub fn add_code(&mut self, code: &str) {
        self.pos = 0;
        self.paragraph_depth = 0;

        let mut events = Parser::new_ext(code, parser_options()).into_offset_iter();
        while let Some((event, range)) = events.next() {
            match event {
                Event::Start(tag) => {
                    let kind = node_kind_of_tag(&tag);
                    let (action, generator) = self.action_for(kind);
                    match action {
                        Action::Ignore | Action::Dummy => {
                            // consume the whole subtree; its range is markup
                            let mut depth = 1usize;
                            for (nested, _) in events.by_ref() {
                                match nested {
                                    Event::Start(_) => depth += 1,
                                    Event::End(_) => {
                                        depth -= 1;
                                        if depth == 0 {
                                            break;
                                        }
                                    }
                                    _ => {}
                                }
                            }
                            let interpret_as = if action == Action::Dummy {
                                self.next_dummy(generator)
                            } else {
                                String::new()
                            };
                            self.push_region(code, range, &interpret_as);
                        }
                        Action::Default => {
                            self.close_gap(code, range.start);
                            if kind == "Paragraph" {
                                self.paragraph_depth += 1;
                            }
                        }
                    }
                }
                Event::End(tag_end) => {
                    if tag_end == TagEnd::Paragraph {
                        self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
                    }
                }
                Event::Text(text) => self.push_text_region(code, range, &text),
                Event::Code(_) => self.leaf(code, range, "Code"),
                Event::InlineMath(_) => self.leaf(code, range, "InlineMath"),
                Event::DisplayMath(_) => self.leaf(code, range, "DisplayMath"),
                Event::Html(_) => self.leaf(code, range, "Html"),
                Event::InlineHtml(_) => self.leaf(code, range, "InlineHtml"),
                Event::FootnoteReference(_) => self.leaf(code, range, "FootnoteReference"),
                Event::TaskListMarker(_) => self.leaf(code, range, "TaskListMarker"),
                Event::Rule => self.leaf(code, range, "Rule"),
                Event::SoftBreak | Event::HardBreak => self.push_region(code, range, " "),
            }
        }
        self.close_gap(code, code.len());
    }

    fn action_for(&self, kind: &str) -> (Action, DummyGenerator) {
        self.actions
            .get(kind)
            .copied()
            .unwrap_or((Action::Default, DummyGenerator::new()))
    }

    fn next_dummy(&mut self, generator: DummyGenerator) -> String {
        let token = generator.generate(&self.language, self.dummy_counter, false);
        self.dummy_counter += 1;
        token
    }

    /// A leaf node with no walkable children: apply its action directly.
    fn leaf(&mut self, code: &str, range: Range<usize>, kind: &str) {
        let (action, generator) = self.action_for(kind);
        let interpret_as = if action == Action::Dummy {
            self.next_dummy(generator)
        } else {
            String::new()
        };
        self.push_region(code, range, &interpret_as);
    }

    fn push_region(&mut self, code: &str, range: Range<usize>, interpret_as: &str) {
        if range.end <= self.pos {
            return;
        }
        let start = range.start.max(self.pos);
        self.close_gap(code, start);
        self.sink.push_markup_as(&code[start..range.end], interpret_as);
        self.pos = range.end;
    }

    fn push_text_region(&mut self, code: &str, range: Range<usize>, text: &str) {
        if range.end <= self.pos {
            return;
        }
        let start = range.start.max(self.pos);
        self.close_gap(code, start);
        let raw = &code[start..range.end];
        if raw == text {
            self.sink.push_text(raw);
        } else {
            // entity references and escapes decode into the replacement
            self.sink.push_markup_as(raw, text);
        }
        self.pos = range.end;
    }

    /// Emit the source between nodes as markup. Newlines become a space
    /// inside a paragraph and a line break between blocks.
    fn close_gap(&mut self, code: &str, to: usize) {
        if to <= self.pos {
            return;
        }
        let gap = &code[self.pos..to];
        let interpret_as = if gap.contains('\n') {
            if self.paragraph_depth > 0 {
                " "
            } else {
                "\n"
            }
        } else {
            ""
        };
        self.sink.push_markup_as(gap, interpret_as);
        self.pos = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(code: &str) -> AnnotatedText {
        let mut builder = MarkdownBuilder::new();
        builder.add_code(code);
        builder.finish()
    }

    fn plain(code: &str) -> String {
        build(code).plain().to_string()
    }

    #[test]
    fn test_plain_paragraph() {
        let text = build("This is a test.");
        assert_eq!(text.plain(), "This is a test.");
        assert_eq!(text.segments().len(), 1);
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(plain("# Heading\n\nBody text."), "Heading\nBody text.");
    }

    #[test]
    fn test_emphasis_markers_elided() {
        assert_eq!(
            plain("some *emphasis* and **strong** text"),
            "some emphasis and strong text"
        );
    }

    #[test]
    fn test_soft_break_is_space() {
        assert_eq!(plain("line one\nline two"), "line one line two");
    }

    #[test]
    fn test_inline_code_dummy() {
        assert_eq!(plain("Run `ls -la` now."), "Run Dummy0 now.");
    }

    #[test]
    fn test_code_block_ignored() {
        assert_eq!(
            plain("Before\n\n```\ncode here\n```\n\nAfter"),
            "Before\n\nAfter"
        );
    }

    #[test]
    fn test_inline_math_dummy() {
        assert_eq!(plain("Euler: $e^x$ rules."), "Euler: Dummy0 rules.");
    }

    #[test]
    fn test_html_entity_decodes() {
        let text = build("Tom &amp; Jerry");
        assert_eq!(text.plain(), "Tom & Jerry");
        assert!(
            text.segments().iter().any(|seg| !seg.is_text()),
            "the entity is a markup segment"
        );
    }

    #[test]
    fn test_front_matter_stripped() {
        assert_eq!(
            plain("---\ntitle: Test\n---\n\n# Hi\n\nText."),
            "\nHi\nText."
        );
    }

    #[test]
    fn test_link_text_passes_through() {
        assert_eq!(plain("See [the docs](https://example.com) here."), "See the docs here.");
    }

    #[test]
    fn test_list_items_keep_line_breaks() {
        assert_eq!(plain("- one\n- two"), "one\ntwo");
    }

    #[test]
    fn test_settings_override() {
        let mut settings = CheckSettings::default();
        settings
            .markdown_nodes
            .insert("Image".to_string(), "dummy".to_string());
        settings
            .markdown_nodes
            .insert("BlockQuote".to_string(), "ignore".to_string());
        let mut builder = MarkdownBuilder::new();
        builder.apply_settings(&settings);
        builder.add_code("See ![alt](pic.png) here.\n\n> quoted\n\nEnd.");
        assert_eq!(builder.annotated_text().plain(), "See Dummy0 here.\n\nEnd.");
    }

    #[test]
    fn test_source_conservation() {
        let code = "---\nt: 1\n---\n\n# H\n\npara `c` and $m$\n\n```\nblock\n```\n";
        let text = build(code);
        let total: usize = text.segments().iter().map(|seg| seg.source.len()).sum();
        assert_eq!(total, code.len());
    }
}
