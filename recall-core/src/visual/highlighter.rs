//! Lightweight, regex-driven syntax coloring for rendered code lines

use crate::config::Rgb;
use once_cell::sync::Lazy;
use regex::Regex;

/// Classes of text run with a fixed color each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Keyword,
    String,
    Comment,
    Number,
    Default,
}

impl TokenClass {
    pub fn color(&self) -> Rgb {
        match self {
            TokenClass::Keyword => [0, 0, 139],
            TokenClass::String => [139, 0, 0],
            TokenClass::Comment => [128, 128, 128],
            TokenClass::Number | TokenClass::Default => [0, 0, 0],
        }
    }
}

/// Languages the detector knows, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Rust,
        Language::Go,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "def", "class", "import", "from", "return", "if", "else", "elif", "for", "while",
                "try", "except", "with", "as", "lambda", "yield", "async", "await", "None",
                "True", "False", "and", "or", "not", "in", "is",
            ],
            Language::JavaScript => &[
                "function", "const", "let", "var", "return", "if", "else", "for", "while", "class",
                "import", "export", "async", "await", "new", "this", "null", "undefined", "true",
                "false",
            ],
            Language::TypeScript => &[
                "interface", "type", "enum", "namespace", "declare", "readonly", "private",
                "public", "protected", "function", "const", "let", "return", "import", "export",
            ],
            Language::Rust => &[
                "fn", "let", "mut", "impl", "trait", "struct", "enum", "match", "if", "else",
                "for", "while", "loop", "return", "pub", "use", "mod", "crate", "self", "Self",
                "async", "await",
            ],
            Language::Go => &[
                "func", "package", "import", "var", "const", "type", "struct", "interface", "if",
                "else", "for", "range", "return", "go", "defer", "chan", "select",
            ],
        }
    }

    fn patterns(&self) -> &'static [Regex] {
        &DETECTION_PATTERNS[*self as usize]
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

static DETECTION_PATTERNS: Lazy<[Vec<Regex>; 5]> = Lazy::new(|| {
    [
        compile(&[
            r"def\s+\w+",
            r"import\s+\w+",
            r"from\s+\w+\s+import",
            r"(?m):\s*$",
        ]),
        compile(&[r"function\s+\w+", r"const\s+\w+\s*=", r"=>", r"console\.log"]),
        compile(&[r"interface\s+\w+", r":\s*\w+\s*=", r"export\s+type"]),
        compile(&[r"fn\s+\w+", r"let\s+mut", r"impl\s+\w+", r"::"]),
        compile(&[r"func\s+\w+", r"package\s+\w+", r":=", r"fmt\.Print"]),
    ]
});

static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"def\s+\w+",
        r"function\s+\w+",
        r"class\s+\w+",
        r"import\s+\w+",
        r"fn\s+\w+",
        r"=>",
        r"(?m)\{\s*$",
        r"(?m)\}\s*$",
    ])
});

const SEPARATORS: &str = " \t()[]{},.;:=+-*/&|!<>";

/// Splits code lines into colored runs
#[derive(Debug, Clone, Default)]
pub struct SyntaxHighlighter;

impl SyntaxHighlighter {
    pub fn new() -> Self {
        Self
    }

    /// Guess the language of `text`; `None` when nothing matches
    ///
    /// Each language scores one point per matching pattern and the highest
    /// score wins, ties going to the earlier entry of [`Language::ALL`].
    pub fn detect_language(&self, text: &str) -> Option<Language> {
        let mut best: Option<(Language, usize)> = None;
        for language in Language::ALL {
            let score = language
                .patterns()
                .iter()
                .filter(|pattern| pattern.is_match(text))
                .count();
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((language, score));
            }
        }
        best.map(|(language, _)| language)
    }

    /// Whether `text` looks enough like code to be worth coloring
    pub fn should_highlight(&self, text: &str) -> bool {
        CODE_PATTERNS.iter().any(|pattern| pattern.is_match(text))
    }

    /// Tokenize one line into `(text, class)` runs that concatenate back to `line`
    pub fn highlight_line(
        &self,
        line: &str,
        language: Option<Language>,
    ) -> Vec<(String, TokenClass)> {
        let stripped = line.trim();
        if stripped.is_empty() {
            return vec![(line.to_string(), TokenClass::Default)];
        }
        if stripped.starts_with('#') || stripped.starts_with("//") || stripped.starts_with("/*") {
            return vec![(line.to_string(), TokenClass::Comment)];
        }

        let keywords = |word: &str| match language {
            Some(language) => language.keywords().contains(&word),
            None => Language::ALL
                .iter()
                .any(|language| language.keywords().contains(&word)),
        };

        let chars: Vec<char> = line.chars().collect();
        let mut runs = Vec::new();
        let mut word = String::new();
        let flush = |word: &mut String, runs: &mut Vec<(String, TokenClass)>| {
            if !word.is_empty() {
                let class = classify_word(word, &keywords);
                runs.push((std::mem::take(word), class));
            }
        };

        let mut index = 0;
        while index < chars.len() {
            let ch = chars[index];
            let literal_end = match ch {
                '"' | '\'' => string_end(&chars, index),
                _ => None,
            };
            if let Some(end) = literal_end {
                flush(&mut word, &mut runs);
                runs.push((chars[index..=end].iter().collect(), TokenClass::String));
                index = end + 1;
                continue;
            }

            if SEPARATORS.contains(ch) {
                flush(&mut word, &mut runs);
                runs.push((ch.to_string(), TokenClass::Default));
            } else {
                word.push(ch);
            }
            index += 1;
        }
        flush(&mut word, &mut runs);
        runs
    }
}

fn classify_word(word: &str, is_keyword: impl Fn(&str) -> bool) -> TokenClass {
    if is_keyword(word) {
        TokenClass::Keyword
    } else if word.starts_with(|c: char| c.is_ascii_digit()) {
        TokenClass::Number
    } else {
        TokenClass::Default
    }
}

/// Index of the closing quote for the literal opening at `start`, honoring
/// backslash escapes
fn string_end(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let mut index = start + 1;
    while index < chars.len() {
        match chars[index] {
            '\\' => index += 2,
            c if c == quote => return Some(index),
            _ => index += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(runs: &[(String, TokenClass)]) -> String {
        runs.iter().map(|(text, _)| text.as_str()).collect()
    }

    #[test]
    fn detects_languages() {
        let highlighter = SyntaxHighlighter::new();
        assert_eq!(
            highlighter.detect_language("def f(x):\n    return x"),
            Some(Language::Python)
        );
        assert_eq!(
            highlighter.detect_language("fn main() {\n    let mut v = Vec::new();\n}"),
            Some(Language::Rust)
        );
        assert_eq!(
            highlighter.detect_language("package main\nfunc main() { x := 1; fmt.Println(x) }"),
            Some(Language::Go)
        );
        assert_eq!(highlighter.detect_language("just some words"), None);
    }

    #[test]
    fn ties_go_to_the_earlier_language() {
        // One javascript hit (=>) and one rust hit (::)
        let highlighter = SyntaxHighlighter::new();
        assert_eq!(
            highlighter.detect_language("a => b::c"),
            Some(Language::JavaScript)
        );
    }

    #[test]
    fn classifies_runs() {
        let highlighter = SyntaxHighlighter::new();
        let line = r#"    return foo("a\"b", 42)"#;
        let runs = highlighter.highlight_line(line, Some(Language::Python));

        assert_eq!(joined(&runs), line);
        assert!(runs.contains(&("return".to_string(), TokenClass::Keyword)));
        assert!(runs.contains(&(r#""a\"b""#.to_string(), TokenClass::String)));
        assert!(runs.contains(&("42".to_string(), TokenClass::Number)));
        assert!(runs.contains(&("foo".to_string(), TokenClass::Default)));
    }

    #[test]
    fn comment_lines_are_one_run() {
        let highlighter = SyntaxHighlighter::new();
        let runs = highlighter.highlight_line("  // let x = 1;", None);
        assert_eq!(runs, vec![("  // let x = 1;".to_string(), TokenClass::Comment)]);
        assert_eq!(TokenClass::Comment.color(), [128, 128, 128]);
    }

    #[test]
    fn unterminated_quote_stays_in_word() {
        let highlighter = SyntaxHighlighter::new();
        let runs = highlighter.highlight_line("it's fine", None);
        assert_eq!(joined(&runs), "it's fine");
        assert!(runs.iter().all(|(_, class)| *class != TokenClass::String));
    }

    #[test]
    fn highlight_gate() {
        let highlighter = SyntaxHighlighter::new();
        assert!(highlighter.should_highlight("class Foo:\n    pass"));
        assert!(highlighter.should_highlight("if x {\n"));
        assert!(!highlighter.should_highlight("a plain sentence."));
    }
}
