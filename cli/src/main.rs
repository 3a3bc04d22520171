mod config;
mod test_runner;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use log::info;

use refdoc::{Document, Section, TableOfContents};
use render::{RenderOptions, Renderer};

use config::{Config, OutputFormat};

const SUBCOMMANDS: &[&str] = &["render", "toc", "check", "outline", "test", "help"];

#[derive(Parser)]
#[command(name = "refdoc", version, about = "Reference-document parser and renderer")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to refdoc.toml next to the input file)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a document
    Render(RenderArgs),

    /// Print the table of contents
    Toc(TocArgs),

    /// Parse, index and lint a document
    Check(CheckArgs),

    /// Print the section tree with anchors
    Outline(OutlineArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Markdown source file
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Include the table of contents
    #[arg(long)]
    toc: bool,

    /// Section depth listed in the table of contents
    #[arg(long)]
    toc_depth: Option<usize>,

    /// Wrap HTML output in a complete page
    #[arg(long)]
    standalone: bool,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TocArgs {
    /// Markdown source file
    file: PathBuf,

    /// Section depth to list
    #[arg(short, long)]
    depth: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Markdown source file
    file: PathBuf,

    /// Treat lint warnings as errors
    #[arg(long)]
    strict: bool,
}

#[derive(clap::Args)]
struct OutlineArgs {
    /// Markdown source file
    file: PathBuf,

    /// Dump the parsed document instead
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `refdoc file.md` means `refdoc render file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = first_positional(&args) {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let reporter = Reporter::new(color_choice);

    match cli.command {
        Command::Render(render_args) => do_render(render_args, cli.config.as_deref(), &reporter),
        Command::Toc(toc_args) => do_toc(toc_args, cli.config.as_deref(), &reporter),
        Command::Check(check_args) => do_check(check_args, &reporter),
        Command::Outline(outline_args) => do_outline(outline_args, &reporter),
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                return;
            }
            let exit_code = test_runner::run_tests(&test_args.path, color_choice, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Index of the first positional argument, skipping `--config`'s value.
fn first_positional(args: &[String]) -> Option<usize> {
    let mut idx = 1;
    while idx < args.len() {
        let arg = &args[idx];
        if arg == "--config" {
            idx += 2;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(idx);
        }
        idx += 1;
    }
    None
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// A source file loaded into the codespan file database.
struct Loaded {
    files: SimpleFiles<String, String>,
    file_id: usize,
    source: String,
}

/// Prints codespan diagnostics to stderr.
struct Reporter {
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    fn new(color_choice: ColorChoice) -> Self {
        Reporter {
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
        }
    }

    fn emit(&self, files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, files, diagnostic);
    }
}

fn read_source(path: &Path) -> Loaded {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source.clone());
    Loaded {
        files,
        file_id,
        source,
    }
}

/// Parse the loaded source, reporting every content error and exiting on failure.
fn parse_or_exit(loaded: &Loaded, reporter: &Reporter) -> Document {
    let parser = refdoc::Parser::new(loaded.source.clone(), loaded.file_id);
    match parser.parse() {
        Ok(document) => document,
        Err(errors) => {
            for error in &errors {
                reporter.emit(&loaded.files, &error.to_diagnostic(loaded.file_id));
            }
            process::exit(1);
        }
    }
}

fn toc_or_exit(document: &Document, depth: usize, loaded: &Loaded, reporter: &Reporter) -> TableOfContents {
    match TableOfContents::with_depth(document, depth) {
        Ok(toc) => toc,
        Err(error) => {
            reporter.emit(&loaded.files, &error.to_diagnostic(loaded.file_id));
            process::exit(1);
        }
    }
}

fn load_config_or_exit(explicit: Option<&Path>, input: &Path) -> Config {
    match Config::discover(explicit, input) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn do_render(args: RenderArgs, config_path: Option<&Path>, reporter: &Reporter) {
    let config = load_config_or_exit(config_path, &args.file).render;
    let format = args.format.or(config.format).unwrap_or(OutputFormat::Markdown);
    let with_toc = args.toc || config.toc.unwrap_or(false);
    let toc_depth = args.toc_depth.or(config.toc_depth).unwrap_or(1);
    let standalone = args.standalone || config.standalone.unwrap_or(false);

    let loaded = read_source(&args.file);
    let document = parse_or_exit(&loaded, reporter);

    // The TOC is always generated so duplicate anchors fail even when it is
    // not printed.
    let toc = toc_or_exit(&document, toc_depth, &loaded, reporter);

    let renderer = Renderer::new(RenderOptions {
        format: format.into(),
        standalone,
    });
    let output = renderer.render(&document, with_toc.then_some(&toc));
    write_output(args.output.as_deref(), &output);
}

fn do_toc(args: TocArgs, config_path: Option<&Path>, reporter: &Reporter) {
    let config = load_config_or_exit(config_path, &args.file).render;
    let depth = args.depth.or(config.toc_depth).unwrap_or(1);
    let format = args.format.or(config.format).unwrap_or(OutputFormat::Markdown);

    let loaded = read_source(&args.file);
    let document = parse_or_exit(&loaded, reporter);
    let toc = toc_or_exit(&document, depth, &loaded, reporter);

    let renderer = Renderer::new(RenderOptions {
        format: format.into(),
        standalone: false,
    });
    write_output(None, &renderer.render_toc(&toc));
}

fn do_check(args: CheckArgs, reporter: &Reporter) {
    let loaded = read_source(&args.file);
    let document = parse_or_exit(&loaded, reporter);
    toc_or_exit(&document, 1, &loaded, reporter);

    let warnings = refdoc::lint(&document);
    for warning in &warnings {
        reporter.emit(&loaded.files, &warning.to_diagnostic(loaded.file_id));
    }

    let section_count = document.outline().count();
    eprintln!(
        "ok: {}: {} top-level section(s), {} in total, {} warning(s)",
        args.file.display(),
        document.sections.len(),
        section_count,
        warnings.len()
    );

    if args.strict && !warnings.is_empty() {
        process::exit(1);
    }
}

fn do_outline(args: OutlineArgs, reporter: &Reporter) {
    let loaded = read_source(&args.file);
    let document = parse_or_exit(&loaded, reporter);

    if args.ast {
        println!("{:#?}", document);
        return;
    }

    if let Some(title) = &document.title {
        println!("{}", title);
    }

    fn print_sections(sections: &[Section], indent: usize) {
        for section in sections {
            let prefix = "#".repeat(section.level as usize);
            let pad = "  ".repeat(indent);
            let empty = if section.is_empty() { " (empty)" } else { "" };
            println!(
                "{}{} {} (#{}){}",
                pad, prefix, section.title, section.anchor, empty
            );
            print_sections(&section.children, indent + 1);
        }
    }
    print_sections(&document.sections, 0);
}

fn write_output(path: Option<&Path>, output: &str) {
    match path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, output) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
            info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(output.as_bytes()) {
                eprintln!("error: cannot write output: {}", e);
                process::exit(1);
            }
        }
    }
}
