// 🙋 Gap Resolver - last resort for missing (scope, key) pairs
//
// Two realizations behind one trait:
// - ConsoleResolver: line-oriented prompt, blocks on the operator
// - ScriptedResolver: predetermined answers, for tests and batch runs

use crate::audit::NO_CITATION;
use crate::normalize::normalize_scope;
use crate::registry::{Scope, StateRegistry};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// A missing (scope, key) pair, as presented to a resolver
#[derive(Debug, Clone, PartialEq)]
pub struct Gap<'a> {
    pub scope: &'a Scope,
    pub key: &'a str,
    /// Indicator description from the source config, may be empty
    pub description: &'a str,
}

/// Operator-supplied value, before frequency normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ManualEntry {
    pub value: f64,
    pub citation: String,
}

/// Parse `<number>[, <citation>]`.
///
/// "skip" (any case) or blank → None. A non-numeric first segment → None, no retry.
pub fn parse_manual_input(input: &str) -> Option<ManualEntry> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("skip") {
        return None;
    }

    let (number, citation) = match input.split_once(',') {
        Some((number, rest)) => (number, Some(rest.trim())),
        None => (input, None),
    };

    let value = number.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let citation = match citation {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_CITATION.to_string(),
    };

    Some(ManualEntry { value, citation })
}

// ============================================================================
// TRAIT
// ============================================================================

pub trait GapResolver {
    /// Obtain a value for `gap`, or None to leave it empty.
    ///
    /// Errors are I/O failures of the resolver itself, fatal for the run.
    fn resolve(&mut self, gap: &Gap<'_>) -> Result<Option<ManualEntry>>;
}

// ============================================================================
// CONSOLE
// ============================================================================

pub struct ConsoleResolver<R, W> {
    input: R,
    output: W,
}

impl ConsoleResolver<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on stdout, read answers from stdin
    pub fn stdio() -> Self {
        ConsoleResolver::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsoleResolver { input, output }
    }

    /// Recover the writer (tests inspect the transcript)
    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, gap: &Gap<'_>) -> Result<String> {
        let label = match gap.scope {
            Scope::National => "[United States]".to_string(),
            Scope::State(code) => format!("[{}]", code),
        };
        writeln!(self.output, "⚠️  {} is missing '{}'", label, gap.key)?;
        if !gap.description.is_empty() {
            writeln!(self.output, "   ({})", gap.description)?;
        }

        match gap.scope {
            Scope::National => write!(
                self.output,
                "   Enter value for US {} (e.g. '3000, USDA'): ",
                gap.key
            )?,
            Scope::State(code) => write!(
                self.output,
                "   Enter value for {} {} (or 'skip'): ",
                code, gap.key
            )?,
        }
        self.output.flush()?;

        // EOF reads as an empty line, which is a skip
        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .context("Failed to read operator input")?;
        Ok(line)
    }
}

impl<R: BufRead, W: Write> GapResolver for ConsoleResolver<R, W> {
    fn resolve(&mut self, gap: &Gap<'_>) -> Result<Option<ManualEntry>> {
        let line = self.prompt(gap)?;
        Ok(parse_manual_input(&line))
    }
}

// ============================================================================
// SCRIPTED
// ============================================================================

/// Answers from a fixed table of raw input strings, keyed by (scope, key)
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    answers: HashMap<(Scope, String), String>,
    asked: Vec<(Scope, String)>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: answer `raw` (same grammar as the console) for (scope, key)
    pub fn with_answer(mut self, scope: Scope, key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.answers.insert((scope, key.into()), raw.into());
        self
    }

    /// Load `{ "National": { "rent": "1500, HUD" }, "TX": { ... } }`
    ///
    /// Scope keys resolve like source cells (national aliases, codes, state names).
    /// A key that resolves to nothing is an error.
    pub fn load(path: &Path, registry: &StateRegistry) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read answers file: {}", path.display()))?;
        let table: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse answers file: {}", path.display()))?;

        let mut resolver = ScriptedResolver::new();
        for (raw_scope, answers) in table {
            let scope = normalize_scope(&raw_scope, registry).with_context(|| {
                format!("Unknown scope '{}' in answers file: {}", raw_scope, path.display())
            })?;
            for (key, raw) in answers {
                resolver = resolver.with_answer(scope.clone(), key, raw);
            }
        }

        Ok(resolver)
    }

    /// Every gap this resolver was asked about, in order
    pub fn asked(&self) -> &[(Scope, String)] {
        &self.asked
    }
}

impl GapResolver for ScriptedResolver {
    fn resolve(&mut self, gap: &Gap<'_>) -> Result<Option<ManualEntry>> {
        let slot = (gap.scope.clone(), gap.key.to_string());
        let answer = self.answers.get(&slot).and_then(|raw| parse_manual_input(raw));
        self.asked.push(slot);
        Ok(answer)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::sample_registry;
    use std::io::Cursor;

    fn tx() -> Scope {
        Scope::State("TX".to_string())
    }

    #[test]
    fn test_parse_value_and_citation() {
        assert_eq!(
            parse_manual_input("500, USDA 2024"),
            Some(ManualEntry { value: 500.0, citation: "USDA 2024".to_string() })
        );
        // Remainder after the first comma is the citation, commas included
        assert_eq!(
            parse_manual_input("65.5, BroadbandNow, table 3").unwrap().citation,
            "BroadbandNow, table 3"
        );
    }

    #[test]
    fn test_parse_without_citation() {
        let entry = parse_manual_input(" 1200 ").unwrap();
        assert_eq!(entry.value, 1200.0);
        assert_eq!(entry.citation, NO_CITATION);

        assert_eq!(parse_manual_input("1200,").unwrap().citation, NO_CITATION);
    }

    #[test]
    fn test_parse_skip_and_invalid() {
        assert_eq!(parse_manual_input("skip"), None);
        assert_eq!(parse_manual_input("SKIP\n"), None);
        assert_eq!(parse_manual_input(""), None);
        assert_eq!(parse_manual_input("abc, USDA"), None);
        assert_eq!(parse_manual_input("$1,200"), None);
        assert_eq!(parse_manual_input("nan"), None);

        println!("✅ Skip/invalid input yields no value");
    }

    #[test]
    fn test_console_state_prompt() {
        let scope = tx();
        let gap = Gap { scope: &scope, key: "internet", description: "Average Monthly Internet Bill" };
        let mut resolver = ConsoleResolver::new(Cursor::new("65, BroadbandNow\n"), Vec::new());

        let entry = resolver.resolve(&gap).unwrap().unwrap();
        assert_eq!(entry.value, 65.0);
        assert_eq!(entry.citation, "BroadbandNow");

        let transcript = String::from_utf8(resolver.into_output()).unwrap();
        assert!(transcript.contains("[TX] is missing 'internet'"));
        assert!(transcript.contains("Average Monthly Internet Bill"));
        assert!(transcript.contains("Enter value for TX internet (or 'skip'): "));
    }

    #[test]
    fn test_console_national_prompt() {
        let gap = Gap { scope: &Scope::National, key: "rent", description: "" };
        let mut resolver = ConsoleResolver::new(Cursor::new("skip\n"), Vec::new());

        assert_eq!(resolver.resolve(&gap).unwrap(), None);

        let transcript = String::from_utf8(resolver.into_output()).unwrap();
        assert!(transcript.contains("[United States] is missing 'rent'"));
        assert!(transcript.contains("Enter value for US rent (e.g. '3000, USDA'): "));
    }

    #[test]
    fn test_console_eof_is_skip() {
        let scope = tx();
        let gap = Gap { scope: &scope, key: "rent", description: "" };
        let mut resolver = ConsoleResolver::new(Cursor::new(""), Vec::new());

        assert_eq!(resolver.resolve(&gap).unwrap(), None);
    }

    #[test]
    fn test_scripted_answers_and_asked_log() {
        let mut resolver = ScriptedResolver::new()
            .with_answer(Scope::National, "rent", "1500, HUD")
            .with_answer(tx(), "internet", "skip");

        let scope = tx();
        let national = resolver
            .resolve(&Gap { scope: &Scope::National, key: "rent", description: "" })
            .unwrap();
        let skipped = resolver
            .resolve(&Gap { scope: &scope, key: "internet", description: "" })
            .unwrap();
        let unknown = resolver
            .resolve(&Gap { scope: &scope, key: "water", description: "" })
            .unwrap();

        assert_eq!(national, Some(ManualEntry { value: 1500.0, citation: "HUD".to_string() }));
        assert_eq!(skipped, None);
        assert_eq!(unknown, None);
        assert_eq!(resolver.asked().len(), 3);
    }

    #[test]
    fn test_scripted_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        fs::write(
            &path,
            r#"{"USA": {"rent": "1500"}, "tx": {"internet": "65, FCC"}, "California": {"water": "40"}}"#,
        )
        .unwrap();

        let mut resolver = ScriptedResolver::load(&path, &sample_registry()).unwrap();
        let scope = tx();
        let entry = resolver
            .resolve(&Gap { scope: &scope, key: "internet", description: "" })
            .unwrap()
            .unwrap();
        let national = resolver
            .resolve(&Gap { scope: &Scope::National, key: "rent", description: "" })
            .unwrap();
        let ca = Scope::State("CA".to_string());
        let by_name = resolver
            .resolve(&Gap { scope: &ca, key: "water", description: "" })
            .unwrap();

        assert_eq!(entry.citation, "FCC");
        assert_eq!(national.map(|e| e.value), Some(1500.0));
        assert_eq!(by_name.map(|e| e.value), Some(40.0));
    }

    #[test]
    fn test_scripted_load_rejects_unknown_scope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        fs::write(&path, r#"{"National": {"rent": "1500"}, "Atlantis": {"rent": "1"}}"#).unwrap();

        let err = ScriptedResolver::load(&path, &sample_registry()).unwrap_err();

        assert!(format!("{:#}", err).contains("Atlantis"));
    }
}
