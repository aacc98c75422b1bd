//! Line wrapping and pagination onto fixed-size square pages

use crate::config::RenderConfig;
use crate::config::constants::render;

/// A laid-out line with its vertical offset on the page
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub y_position: u32,
    pub is_code: bool,
    pub language: Option<String>,
}

/// One page worth of lines
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub lines: Vec<Line>,
    /// 1-based
    pub page_number: usize,
    pub total_pages: usize,
}

const CODE_INDICATORS: &[&str] = &[
    "{", "}", "[", "]", "(", ")", "=>", "->", "===", "!==", "//", "/*", "#", "function", "const",
    "let", "var", "def ", "class ", "import ", "from ",
];

/// Breaks text into width-limited lines and groups them into pages
#[derive(Debug, Clone)]
pub struct SquareLayoutEngine {
    config: RenderConfig,
    max_chars_per_line: usize,
}

impl SquareLayoutEngine {
    pub fn new(config: RenderConfig) -> Self {
        let max_chars_per_line = Self::chars_per_line(&config);
        Self {
            config,
            max_chars_per_line,
        }
    }

    /// Character budget per line: effective width / 7, minus a margin of 10
    fn chars_per_line(config: &RenderConfig) -> usize {
        let estimated = (config.effective_width() / render::CHAR_WIDTH_ESTIMATE) as usize;
        estimated.saturating_sub(render::LINE_SAFETY_MARGIN).max(1)
    }

    pub fn max_chars_per_line(&self) -> usize {
        self.max_chars_per_line
    }

    /// Horizontal pixels available to each character of a full line
    pub fn char_advance(&self) -> u32 {
        let chars = u32::try_from(self.max_chars_per_line).unwrap_or(u32::MAX);
        (self.config.effective_width() / chars).max(1)
    }

    pub fn max_lines_per_page(&self) -> usize {
        self.config.max_lines_per_image.max(1)
    }

    /// Lay out `text` into pages. Empty text yields a single empty page.
    pub fn layout(&self, text: &str) -> Vec<Page> {
        if text.is_empty() {
            return vec![Page {
                lines: Vec::new(),
                page_number: 1,
                total_pages: 1,
            }];
        }

        let wrapped: Vec<String> = text
            .split('\n')
            .flat_map(|line| self.wrap_line(line))
            .collect();
        self.paginate(wrapped)
    }

    /// Split one logical line into fragments no longer than the line budget
    ///
    /// Breaks prefer spaces; a word longer than the budget is cut into
    /// fixed-size chunks. Concatenating the fragments gives back `line`.
    pub fn wrap_line(&self, line: &str) -> Vec<String> {
        let limit = self.max_chars_per_line;
        if line.chars().count() <= limit {
            return vec![line.to_string()];
        }

        let mut fragments = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in line.split_inclusive(' ') {
            let word_len = word.chars().count();

            if word_len > limit {
                if !current.is_empty() {
                    fragments.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let chars: Vec<char> = word.chars().collect();
                for chunk in chars.chunks(limit) {
                    if chunk.len() == limit {
                        fragments.push(chunk.iter().collect());
                    } else {
                        current = chunk.iter().collect();
                        current_len = chunk.len();
                    }
                }
                continue;
            }

            if current_len + word_len > limit {
                fragments.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(word);
            current_len += word_len;
        }

        if !current.is_empty() {
            fragments.push(current);
        }
        fragments
    }

    fn paginate(&self, lines: Vec<String>) -> Vec<Page> {
        let per_page = self.max_lines_per_page();
        let total_pages = lines.len().div_ceil(per_page).max(1);
        let line_height = self.config.line_height();

        let mut pages = Vec::with_capacity(total_pages);
        let mut lines = lines.into_iter();
        for page_index in 0..total_pages {
            let page_lines = lines
                .by_ref()
                .take(per_page)
                .enumerate()
                .map(|(row, text)| Line {
                    is_code: is_code_line(&text),
                    y_position: self.config.padding + row as u32 * line_height,
                    language: None,
                    text,
                })
                .collect();
            pages.push(Page {
                lines: page_lines,
                page_number: page_index + 1,
                total_pages,
            });
        }
        pages
    }

    /// Number of pages `text` would occupy
    pub fn estimate_pages_needed(&self, text: &str) -> usize {
        let limit = self.max_chars_per_line;
        let total_lines: usize = text
            .split('\n')
            .map(|line| line.chars().count().div_ceil(limit).max(1))
            .sum();
        total_lines.div_ceil(self.max_lines_per_page()).max(1)
    }
}

/// Heuristic used to tag lines that look like source code
pub fn is_code_line(line: &str) -> bool {
    if line.starts_with(' ') || line.starts_with('\t') {
        return true;
    }
    CODE_INDICATORS
        .iter()
        .any(|indicator| line.contains(indicator))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SquareLayoutEngine {
        SquareLayoutEngine::new(RenderConfig::default())
    }

    #[test]
    fn default_line_budget() {
        assert_eq!(engine().max_chars_per_line(), 130);
    }

    #[test]
    fn empty_text_is_one_empty_page() {
        let pages = engine().layout("");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].lines.is_empty());
        assert_eq!(pages[0].total_pages, 1);
    }

    #[test]
    fn line_at_limit_is_not_wrapped() {
        let line = "a".repeat(130);
        assert_eq!(engine().wrap_line(&line), vec![line]);
    }

    #[test]
    fn long_word_is_hard_split() {
        let engine = engine();
        let line = format!("intro {}", "x".repeat(300));
        let fragments = engine.wrap_line(&line);

        assert_eq!(fragments[0], "intro ");
        assert!(fragments.iter().all(|f| f.chars().count() <= 130));
        assert_eq!(fragments.concat(), line);
        assert_eq!(fragments.len(), 4);
    }

    #[test]
    fn wrapping_preserves_every_character() {
        let engine = engine();
        let line = "lorem ipsum  dolor sit amet ".repeat(20);
        let fragments = engine.wrap_line(&line);
        assert!(fragments.len() > 1);
        assert!(fragments.iter().all(|f| f.chars().count() <= 130));
        assert_eq!(fragments.concat(), line);
    }

    #[test]
    fn pages_split_by_line_count_with_positions() {
        let text = (0..200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let pages = engine().layout(&text);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].lines.len(), 90);
        assert_eq!(pages[2].lines.len(), 20);
        assert!(pages.iter().all(|p| p.total_pages == 3));
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[0].lines[0].y_position, 20);
        assert_eq!(pages[0].lines[3].y_position, 20 + 3 * 13);
        assert_eq!(pages[1].lines[0].text, "line 90");
    }

    #[test]
    fn code_heuristics() {
        assert!(is_code_line("    return x"));
        assert!(is_code_line("def f(x):"));
        assert!(is_code_line("# heading"));
        assert!(!is_code_line("plain prose without markers"));
    }

    #[test]
    fn page_estimate_matches_layout() {
        let engine = engine();
        let text = format!("{}\nshort", "y".repeat(1000));
        assert_eq!(engine.estimate_pages_needed(&text), engine.layout(&text).len());
        assert_eq!(engine.estimate_pages_needed(""), 1);
    }
}
