use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use codespan_reporting::term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use log::debug;
use serde::Deserialize;

use refdoc::{ContentError, Document, TableOfContents, Warning};
use render::{RenderOptions, Renderer};

use crate::config::OutputFormat;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning must point at this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Top-level section titles, in order.
    #[serde(default)]
    pub expect_sections: Option<Vec<String>>,

    /// Top-level TOC anchors, in order.
    #[serde(default)]
    pub expect_anchors: Option<Vec<String>>,

    /// Some parse or TOC error's message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Line the expected error must be reported on.
    #[serde(default)]
    pub expect_error_line: Option<usize>,

    /// Lint warnings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,

    #[serde(default)]
    pub render_format: Option<OutputFormat>,

    /// Pass the table of contents to the renderer.
    #[serde(default)]
    pub render_toc: bool,

    /// Substrings the rendered output must contain.
    #[serde(default)]
    pub expect_render_contains: Vec<String>,
}

/// Split a `.test.md` file into its TOML frontmatter and the document source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.trim_end_matches(".test.md"))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    debug!("running {}", path.display());
    let outcome = match check(&config, source) {
        Ok(()) => TestOutcome::Pass,
        Err(reason) => TestOutcome::Fail(reason),
    };

    TestResult {
        path: path.to_path_buf(),
        description: config.description,
        outcome,
    }
}

/// Run every expectation in `config` against `source`.
fn check(config: &TestConfig, source: &str) -> Result<(), String> {
    let loaded = refdoc::load(source, 0);

    if let Some(expected) = &config.expect_error {
        return match loaded {
            Err(errors) => check_error(&errors, expected, config.expect_error_line),
            Ok(_) => Err(format!(
                "expected error containing \"{}\", but the document loaded",
                expected
            )),
        };
    }

    let (document, toc) = loaded.map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        format!("unexpected error: {}", messages.join("; "))
    })?;

    if let Some(expected) = &config.expect_sections {
        let actual = document.section_titles();
        if actual != *expected {
            return Err(format!(
                "section mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    if let Some(expected) = &config.expect_anchors {
        let actual: Vec<&str> = toc.entries.iter().map(|e| e.anchor.as_str()).collect();
        if actual != *expected {
            return Err(format!(
                "anchor mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    if let Some(expected) = &config.expect_warnings {
        check_warnings(&refdoc::lint(&document), expected)?;
    }

    if !config.expect_render_contains.is_empty() {
        check_render(config, &document, &toc)?;
    }

    Ok(())
}

fn check_error(errors: &[ContentError], expected: &str, line: Option<usize>) -> Result<(), String> {
    let matching: Vec<&ContentError> = errors
        .iter()
        .filter(|e| e.to_string().contains(expected))
        .collect();

    if matching.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(format!(
            "expected error containing \"{}\", got: {}",
            expected,
            messages.join("; ")
        ));
    }

    if let Some(line) = line {
        if !matching.iter().any(|e| e.line() == line) {
            let lines: Vec<String> = matching.iter().map(|e| e.line().to_string()).collect();
            return Err(format!(
                "expected error on line {}, reported on line(s) {}",
                line,
                lines.join(", ")
            ));
        }
    }

    Ok(())
}

fn check_warnings(actual: &[Warning], expected: &[ExpectedWarning]) -> Result<(), String> {
    if actual.len() != expected.len() {
        let listed: Vec<String> = actual.iter().map(|w| format!("    - {}", w)).collect();
        return Err(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual.len(),
            if listed.is_empty() {
                "    (none)".to_string()
            } else {
                listed.join("\n")
            }
        ));
    }

    for (i, (warning, expected)) in actual.iter().zip(expected).enumerate() {
        if !warning.message.contains(&expected.contains) {
            return Err(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, warning.message
            ));
        }
        if let Some(line) = expected.line {
            if warning.line != line {
                return Err(format!(
                    "warning[{}]: expected on line {}, reported on line {}",
                    i, line, warning.line
                ));
            }
        }
    }

    Ok(())
}

fn check_render(config: &TestConfig, document: &Document, toc: &TableOfContents) -> Result<(), String> {
    let renderer = Renderer::new(RenderOptions {
        format: config.render_format.unwrap_or(OutputFormat::Markdown).into(),
        standalone: false,
    });
    let output = renderer.render(document, config.render_toc.then_some(toc));

    for needle in &config.expect_render_contains {
        if !output.contains(needle.as_str()) {
            return Err(format!(
                "rendered output is missing {:?}\n  output:\n{}",
                needle,
                output
                    .lines()
                    .map(|line| format!("    {}", line))
                    .collect::<Vec<_>>()
                    .join("\n")
            ));
        }
    }

    Ok(())
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".test.md"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Keep categories equal to or nested under one of `requested`.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let nested = format!("{}/", req);
        let before = selected.len();
        for (category, files) in all {
            if category == req || category.starts_with(&nested) {
                selected.insert(category.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
    }
    selected
}

/// Colored status output on stderr.
struct Console {
    out: StandardStream,
}

impl Console {
    fn new(color_choice: ColorChoice) -> Self {
        Console {
            out: StandardStream::stderr(color_choice),
        }
    }

    fn colored(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let _ = self.out.set_color(ColorSpec::new().set_fg(color).set_bold(bold));
        let _ = write!(self.out, "{}", text);
        let _ = self.out.reset();
    }

    fn heading(&mut self, text: &str) {
        let _ = writeln!(self.out);
        self.colored(text, None, true);
        let _ = writeln!(self.out);
    }

    fn status(&mut self, result: &TestResult) {
        let _ = write!(self.out, "  ");
        match result.outcome {
            TestOutcome::Pass => self.colored("PASS", Some(Color::Green), false),
            TestOutcome::Fail(_) => self.colored("FAIL", Some(Color::Red), false),
        }
        let _ = writeln!(self.out, "  {}", result.label());
    }

    fn failures(&mut self, failures: &[TestResult]) {
        if failures.is_empty() {
            return;
        }
        let _ = writeln!(self.out, "\nfailures:");
        for failure in failures {
            let _ = writeln!(self.out, "\n  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    let _ = writeln!(self.out, "  {}", line);
                }
            }
        }
    }

    fn summary(&mut self, passed: usize, failed: usize) {
        let _ = write!(self.out, "\ntest result: ");
        if failed == 0 {
            self.colored("ok", Some(Color::Green), false);
            let _ = writeln!(self.out, ". {} passed, 0 failed", passed);
        } else {
            self.colored("FAILED", Some(Color::Red), false);
            let _ = writeln!(
                self.out,
                ". {} passed, {} failed (of {})",
                passed,
                failed,
                passed + failed
            );
        }
    }
}

/// Run all `.test.md` files under `path` (or a single file), optionally only
/// those in `categories`. Returns the process exit code.
pub fn run_tests(path: &Path, color_choice: ColorChoice, categories: &[String]) -> i32 {
    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };

    if all.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let selected = if path.is_file() {
        select_categories(&all, &[])
    } else {
        select_categories(&all, categories)
    };
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut console = Console::new(color_choice);
    let mut passed = 0usize;
    let mut failures = Vec::new();

    for (category, files) in &selected {
        if !path.is_file() {
            console.heading(category_label(category));
        }
        for file in *files {
            let result = run_single_test(file);
            console.status(&result);
            match result.outcome {
                TestOutcome::Pass => passed += 1,
                TestOutcome::Fail(_) => failures.push(result),
            }
        }
    }

    console.failures(&failures);
    console.summary(passed, failures.len());

    if failures.is_empty() { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(frontmatter: &str, source: &str) -> Result<(), String> {
        let content = format!("---\n{}---\n{}", frontmatter, source);
        let (config, source) = parse_test_file(&content)?;
        check(&config, source)
    }

    #[test]
    fn splits_frontmatter_from_source() {
        let (config, source) =
            parse_test_file("---\ndescription = \"x\"\n---\n# A\n\nBody.\n").unwrap();
        assert_eq!(config.description.as_deref(), Some("x"));
        assert_eq!(source, "# A\n\nBody.\n");
    }

    #[test]
    fn missing_frontmatter_is_reported() {
        assert!(parse_test_file("# A\n").is_err());
        assert!(parse_test_file("---\ndescription = \"x\"\n# A\n").is_err());
    }

    #[test]
    fn section_expectations() {
        assert!(run("expect_sections = [\"A\", \"B\"]\n", "# A\n\nx\n\n# B\n\ny\n").is_ok());
        assert!(run("expect_sections = [\"B\"]\n", "# A\n\nx\n").is_err());
    }

    #[test]
    fn error_expectations_check_the_line() {
        let source = "# A\n\nx\n\n# A\n\ny\n";
        assert!(run("expect_error = \"duplicate anchor\"\nexpect_error_line = 5\n", source).is_ok());
        assert!(run("expect_error = \"duplicate anchor\"\nexpect_error_line = 3\n", source).is_err());
        assert!(run("expect_error = \"duplicate anchor\"\n", "# A\n\nx\n").is_err());
    }

    #[test]
    fn unexpected_errors_fail() {
        let reason = run("", "# A\n\nx\n\n# A\n\ny\n").unwrap_err();
        assert!(reason.starts_with("unexpected error"), "{reason}");
    }

    #[test]
    fn warning_count_must_match() {
        let source = "# A\n\n# B\n\ntext\n";
        assert!(run("expect_warnings = [{ contains = \"no content\", line = 1 }]\n", source).is_ok());
        assert!(run("expect_warnings = []\n", source).is_err());
    }

    #[test]
    fn render_expectations() {
        let frontmatter = "render_format = \"html\"\nexpect_render_contains = [\"<h1 id=\\\"a\\\">A</h1>\"]\n";
        assert!(run(frontmatter, "# A\n\nx\n").is_ok());
    }
}
