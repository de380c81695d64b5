//! Unified-diff analysis: changed-symbol extraction, file language
//! classification, and test-manifest synthesis.
//!
//! Symbol extraction is line-pattern based, not a per-language parser. The
//! matcher table is an ordered list of `(pattern, kind)` pairs evaluated
//! first-match-wins, so new language patterns are additive rather than new
//! branching logic.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{ChecklistItem, SymbolChange, SymbolKind, TestManifest, TestManifestEntry};

// ---------------------------------------------------------------------------
// Symbol matcher table
// ---------------------------------------------------------------------------

struct SymbolMatcher {
    pattern: Regex,
    kind: SymbolKind,
}

/// Declaration patterns for the Python and JavaScript/TypeScript families,
/// top-level and indented. Evaluated in order; the first match for a line
/// determines the emitted symbol.
static SYMBOL_MATCHERS: LazyLock<Vec<SymbolMatcher>> = LazyLock::new(|| {
    let table: &[(&str, SymbolKind)] = &[
        // Python
        (r"^\s*(?:async\s+)?def\s+(\w+)\s*\(", SymbolKind::Function),
        (r"^\s*class\s+(\w+)", SymbolKind::Class),
        // JavaScript / TypeScript
        (
            r"^\s*(?:export\s+)?(?:async\s+)?function\s+(\w+)",
            SymbolKind::Function,
        ),
        (
            r"^\s*(?:export\s+)?const\s+(\w+)\s*=\s*(?:async\s+)?\(",
            SymbolKind::Function,
        ),
        (r"^\s*(?:export\s+)?class\s+(\w+)", SymbolKind::Class),
    ];
    table
        .iter()
        .map(|(p, kind)| SymbolMatcher {
            pattern: Regex::new(p).expect("symbol pattern"),
            kind: *kind,
        })
        .collect()
});

static FILE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\+\+\s+b/(.+)").expect("file header pattern"));

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@\s*-\d+(?:,\d+)?\s*\+(\d+)(?:,\d+)?\s*@@").expect("hunk header pattern")
});

/// Extract changed function/class symbols from a unified diff.
///
/// Streams the diff line by line, tracking the target file from `+++ b/`
/// headers and the hunk start from `@@` headers. Only added lines are
/// considered. Line numbers are hunk start plus line offset within the
/// hunk, which is approximate across multiple hunks by design.
pub fn extract_changed_symbols(diff_text: &str) -> Vec<SymbolChange> {
    let mut symbols = Vec::new();
    let mut current_file: Option<String> = None;
    let mut hunk_start: Option<u32> = None;
    let mut hunk_offset: u32 = 0;

    for line in diff_text.lines() {
        if let Some(caps) = FILE_HEADER.captures(line) {
            current_file = Some(caps[1].to_string());
            hunk_start = None;
            continue;
        }
        if let Some(caps) = HUNK_HEADER.captures(line) {
            hunk_start = caps[1].parse().ok();
            hunk_offset = 0;
            continue;
        }

        let Some(file) = current_file.as_deref() else {
            continue;
        };
        if !line.starts_with('+') || line.starts_with("+++") {
            if !line.starts_with('-') {
                hunk_offset = hunk_offset.saturating_add(1);
            }
            continue;
        }

        let added = &line[1..];
        for matcher in SYMBOL_MATCHERS.iter() {
            if let Some(caps) = matcher.pattern.captures(added) {
                symbols.push(SymbolChange {
                    name: caps[1].to_string(),
                    kind: matcher.kind,
                    file_path: file.to_string(),
                    line_number: hunk_start.map(|start| start + hunk_offset),
                });
                break;
            }
        }
        hunk_offset = hunk_offset.saturating_add(1);
    }

    symbols
}

// ---------------------------------------------------------------------------
// Language classification
// ---------------------------------------------------------------------------

/// Language label assigned to a changed file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    C,
    Go,
    Rust,
    Ruby,
    Php,
    Swift,
    Kotlin,
    CSharp,
    Unknown,
}

const EXTENSION_TABLE: &[(&str, Language)] = &[
    (".py", Language::Python),
    (".js", Language::JavaScript),
    (".jsx", Language::JavaScript),
    (".ts", Language::TypeScript),
    (".tsx", Language::TypeScript),
    (".java", Language::Java),
    (".cpp", Language::Cpp),
    (".c", Language::C),
    (".go", Language::Go),
    (".rs", Language::Rust),
    (".rb", Language::Ruby),
    (".php", Language::Php),
    (".swift", Language::Swift),
    (".kt", Language::Kotlin),
    (".cs", Language::CSharp),
];

impl Language {
    /// Whether manifest synthesis knows how to name tests for this language.
    pub fn supported_for_testgen(self) -> bool {
        matches!(
            self,
            Language::Python | Language::JavaScript | Language::TypeScript
        )
    }

    /// Test framework used for synthesized entries.
    pub fn test_framework(self) -> &'static str {
        match self {
            Language::Python => "pytest",
            Language::JavaScript | Language::TypeScript => "jest",
            _ => "unknown",
        }
    }
}

/// Classify changed files by extension; unmapped extensions are `Unknown`.
pub fn classify_files(changed_files: &[String]) -> HashMap<String, Language> {
    changed_files
        .iter()
        .map(|path| {
            let language = EXTENSION_TABLE
                .iter()
                .find(|(ext, _)| path.ends_with(ext))
                .map(|(_, lang)| *lang)
                .unwrap_or(Language::Unknown);
            (path.clone(), language)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Manifest synthesis
// ---------------------------------------------------------------------------

/// Tokens ignored when linking symbol names to checklist descriptions.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "for", "and", "or", "but", "to", "of", "in", "on", "at",
];

/// Synthesize a test manifest from a PR's diff and its issue checklist.
///
/// For each changed file of a supported language, each function symbol
/// yields one entry named `test_<symbol>_autoqa`, linked to checklist
/// items sharing at least one non-stopword token with the symbol name.
/// When that pass yields nothing and the checklist is non-empty, one
/// generic entry is produced per checklist item mentioning "test",
/// targeting the first changed file. Test ids run `T1, T2, ...` across
/// both passes.
pub fn generate_test_manifest(
    pr_number: u64,
    head_sha: &str,
    diff_text: &str,
    changed_files: &[String],
    checklist: &[ChecklistItem],
) -> TestManifest {
    let symbols = extract_changed_symbols(diff_text);
    let languages = classify_files(changed_files);

    let mut symbols_by_file: HashMap<&str, Vec<&SymbolChange>> = HashMap::new();
    for symbol in &symbols {
        symbols_by_file
            .entry(symbol.file_path.as_str())
            .or_default()
            .push(symbol);
    }

    let mut entries = Vec::new();
    let mut next_id = 1usize;

    for file in changed_files {
        let language = languages.get(file).copied().unwrap_or(Language::Unknown);
        if !language.supported_for_testgen() {
            continue;
        }
        for symbol in symbols_by_file.get(file.as_str()).into_iter().flatten() {
            if symbol.kind != SymbolKind::Function {
                continue;
            }
            entries.push(TestManifestEntry {
                test_id: format!("T{next_id}"),
                name: format!("test_{}_autoqa", symbol.name),
                framework: language.test_framework().to_string(),
                target_file: file.clone(),
                checklist_ids: link_symbol_to_checklist(&symbol.name, checklist),
            });
            next_id += 1;
        }
    }

    if entries.is_empty() && !checklist.is_empty() {
        let target = changed_files
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        for item in checklist {
            if item.description.to_lowercase().contains("test") {
                entries.push(TestManifestEntry {
                    test_id: format!("T{next_id}"),
                    name: format!("test_checklist_item_{}_autoqa", item.id.to_lowercase()),
                    framework: "pytest".to_string(),
                    target_file: target.clone(),
                    checklist_ids: vec![item.id.clone()],
                });
                next_id += 1;
            }
        }
    }

    TestManifest {
        pr_number,
        head_sha: head_sha.to_string(),
        entries,
    }
}

/// Checklist ids whose description shares at least one non-stopword token
/// with the symbol name.
fn link_symbol_to_checklist(symbol_name: &str, checklist: &[ChecklistItem]) -> Vec<String> {
    let symbol_words: std::collections::HashSet<String> = symbol_name
        .to_lowercase()
        .split('_')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();

    checklist
        .iter()
        .filter(|item| {
            item.description
                .to_lowercase()
                .split_whitespace()
                .map(|w| w.trim_end_matches(['.', ',', '!', '?', ';', ':']))
                .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
                .any(|w| symbol_words.contains(w))
        })
        .map(|item| item.id.clone())
        .collect()
}
