use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use annotext::{
    render_diagnostics, AnnotatedText, CheckSettings, Dialect, LatexBuilder, MarkdownBuilder,
    SegmentKind,
};

#[derive(Parser)]
#[command(
    name = "annotext",
    version,
    about = "Markup-to-plaintext annotation engine for grammar checking"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the plaintext a grammar checker would see
    Plain(DocumentArgs),
    /// Print every annotated segment with its offset mapping
    Segments(DocumentArgs),
}

#[derive(Args)]
struct DocumentArgs {
    /// Input document (.tex, .Rnw, .md)
    file: PathBuf,
    /// Code language id: latex, rsweave, or markdown (default: by extension)
    #[arg(long)]
    language: Option<String>,
    /// Check settings as a JSON file
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Abort on scanner stalls instead of skipping one character
    #[arg(long)]
    strict: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Plain(args) => {
            let text = build_document(&args);
            print!("{}", text.plain());
            if !text.plain().ends_with('\n') {
                println!();
            }
        }
        Command::Segments(args) => {
            let text = build_document(&args);
            for segment in text.segments() {
                let (kind, interpret_as) = match &segment.kind {
                    SegmentKind::Text => ("text", String::new()),
                    SegmentKind::Markup { interpret_as } => ("markup", interpret_as.clone()),
                };
                println!(
                    "{kind:6} {:5}..{:<5} -> {:5}..{:<5} {interpret_as:?}",
                    segment.source.start, segment.source.end, segment.plain.start, segment.plain.end
                );
            }
        }
    }
}

fn language_from_extension(file: &Path) -> String {
    match file
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("md") | Some("markdown") => "markdown".to_string(),
        Some("rnw") | Some("snw") => "rsweave".to_string(),
        _ => "latex".to_string(),
    }
}

fn build_document(args: &DocumentArgs) -> AnnotatedText {
    let source = std::fs::read_to_string(&args.file).unwrap_or_else(|error| {
        eprintln!("cannot read '{}': {}", args.file.display(), error);
        process::exit(1);
    });
    let filename = args.file.display().to_string();

    let settings = match &args.settings {
        Some(path) => {
            let content = std::fs::read_to_string(path).unwrap_or_else(|error| {
                eprintln!("cannot read '{}': {}", path.display(), error);
                process::exit(1);
            });
            serde_json::from_str::<CheckSettings>(&content).unwrap_or_else(|error| {
                eprintln!("invalid settings in '{}': {}", path.display(), error);
                process::exit(1);
            })
        }
        None => CheckSettings::default(),
    };

    let language = args
        .language
        .clone()
        .unwrap_or_else(|| language_from_extension(&args.file));

    if language == "markdown" {
        let mut builder = MarkdownBuilder::new();
        builder.apply_settings(&settings);
        builder.add_code(&source);
        return builder.finish();
    }

    let Some(dialect) = Dialect::from_language_id(&language) else {
        eprintln!("unsupported code language id '{language}'");
        process::exit(2);
    };

    let mut builder = LatexBuilder::new(dialect);
    builder.apply_settings(&settings);
    builder.set_strict_mode(args.strict);
    match builder.add_code(&source) {
        Ok(()) => {
            render_diagnostics(builder.diagnostics(), &filename, &source);
            builder.finish()
        }
        Err(stall) => {
            stall.to_diagnostic().render(&filename, &source);
            process::exit(1);
        }
    }
}
