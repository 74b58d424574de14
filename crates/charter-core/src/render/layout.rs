//! Line-oriented page layout: headings, wrapped paragraphs, label/value
//! pairs and explicit page breaks, paginated at a fixed line count.

/// Characters per line.
pub const PAGE_WIDTH: usize = 72;
/// Body lines per page (excluding the page header).
pub const LINES_PER_PAGE: usize = 48;

const LABEL_WIDTH: usize = 26;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Text(String),
    Break,
}

/// One page of body lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Layout {
    lines: Vec<Line>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&mut self, text: &str) {
        for line in wrap(&text.to_uppercase(), PAGE_WIDTH) {
            let pad = PAGE_WIDTH.saturating_sub(line.chars().count()) / 2;
            self.push(format!("{}{line}", " ".repeat(pad)));
        }
        self.blank();
    }

    pub fn heading(&mut self, text: &str) {
        self.ensure_gap();
        self.push(text.to_string());
        self.push("-".repeat(text.chars().count().min(PAGE_WIDTH)));
    }

    pub fn paragraph(&mut self, text: &str) {
        for line in wrap(text, PAGE_WIDTH) {
            self.push(line);
        }
        self.blank();
    }

    /// `Label ........ value`, continuation lines aligned under the value.
    pub fn field(&mut self, label: &str, value: &str) {
        let indent = " ".repeat(LABEL_WIDTH);
        let wrapped = wrap(value, PAGE_WIDTH - LABEL_WIDTH);
        let mut rest = wrapped.into_iter();
        let first = rest.next().unwrap_or_default();
        self.push(format!("{:<width$}{first}", format!("{label}:"), width = LABEL_WIDTH));
        for line in rest {
            self.push(format!("{indent}{line}"));
        }
    }

    /// Hanging-indent list item such as `  1. text` or `  - text`.
    pub fn item(&mut self, marker: &str, text: &str) {
        let lead = format!("  {marker} ");
        let hang = " ".repeat(lead.chars().count());
        let width = PAGE_WIDTH.saturating_sub(lead.chars().count()).max(1);
        for (i, line) in wrap(text, width).into_iter().enumerate() {
            let prefix = if i == 0 { &lead } else { &hang };
            self.push(format!("{prefix}{line}"));
        }
    }

    pub fn signature(&mut self, role: &str, name: &str) {
        self.ensure_gap();
        self.push(role.to_uppercase());
        for line in wrap(name, PAGE_WIDTH) {
            self.push(line);
        }
        self.blank();
        self.push(format!("By:    {}", "_".repeat(36)));
        self.push(format!("Name:  {}", "_".repeat(36)));
        self.push(format!("Title: {}", "_".repeat(36)));
        self.push(format!("Date:  {}", "_".repeat(36)));
        self.blank();
    }

    pub fn blank(&mut self) {
        if !matches!(self.lines.last(), Some(Line::Text(l)) if l.is_empty()) {
            self.lines.push(Line::Text(String::new()));
        }
    }

    pub fn page_break(&mut self) {
        self.lines.push(Line::Break);
    }

    fn ensure_gap(&mut self) {
        if !self.lines.is_empty() {
            self.blank();
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push(Line::Text(line));
    }

    /// Split into pages of at most `per_page` lines.
    ///
    /// Leading blank lines are dropped from each page and empty pages are
    /// never emitted, so the result always has at least one page.
    pub fn paginate(self, per_page: usize) -> Vec<Page> {
        let per_page = per_page.max(1);
        let mut pages: Vec<Vec<String>> = vec![Vec::new()];
        for line in self.lines {
            match line {
                Line::Break => {
                    if pages.last().is_some_and(|p| !p.is_empty()) {
                        pages.push(Vec::new());
                    }
                }
                Line::Text(text) => {
                    if pages.last().is_some_and(|p| p.len() >= per_page) {
                        pages.push(Vec::new());
                    }
                    if let Some(page) = pages.last_mut()
                        && !(page.is_empty() && text.is_empty())
                    {
                        page.push(text);
                    }
                }
            }
        }
        for page in &mut pages {
            while page.last().is_some_and(|l| l.is_empty()) {
                page.pop();
            }
        }
        if pages.len() > 1 {
            pages.retain(|p| !p.is_empty());
        }
        pages
            .into_iter()
            .enumerate()
            .map(|(i, lines)| Page {
                number: i + 1,
                lines,
            })
            .collect()
    }
}

/// Greedy word wrap. Words longer than `width` are split across lines.
/// Embedded newlines start new lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        for word in raw.split_whitespace() {
            if word.chars().count() > width {
                if !line.is_empty() {
                    out.push(std::mem::take(&mut line));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(width).peekable();
                while let Some(chunk) = chunks.next() {
                    let piece: String = chunk.iter().collect();
                    if chunks.peek().is_some() {
                        out.push(piece);
                    } else {
                        line = piece;
                    }
                }
                continue;
            }
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}
