//! Input highlighting for the prompt line and echoed commands.

use regex::Regex;
use serde::Deserialize;
use tui::{
    style::Style,
    text::Span,
};

use crate::theme::Theme;

/// Grammar used to colour input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxMode {
    Plain,
    #[default]
    Haskell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Keyword,
    Literal,
    Comment,
    Operator,
}

const HASKELL_KEYWORDS: &[&str] = &[
    "case", "class", "data", "default", "deriving", "do", "else", "if", "import", "in", "infix",
    "infixl", "infixr", "instance", "let", "module", "newtype", "of", "then", "type", "where",
    "True", "False",
];

/// Regex based tokenizer for one [`SyntaxMode`].
#[derive(Debug, Clone)]
pub struct Highlighter {
    mode: SyntaxMode,
    pattern: Option<Regex>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::plain()
    }
}

impl Highlighter {
    pub fn plain() -> Self {
        Self {
            mode: SyntaxMode::Plain,
            pattern: None,
        }
    }

    pub fn new(mode: SyntaxMode) -> Result<Self, regex::Error> {
        let pattern = match mode {
            SyntaxMode::Plain => None,
            SyntaxMode::Haskell => Some(Regex::new(&format!(
                r#"(?P<comment>--.*$)|(?P<literal>"(?:[^"\\]|\\.)*"?|'(?:[^'\\]|\\.)'|\b\d+(?:\.\d+)?\b)|(?P<keyword>\b(?:{})\b)|(?P<operator>[-+*/<>=!|&^%.:$@~\\]+)"#,
                HASKELL_KEYWORDS.join("|")
            ))?),
        };
        Ok(Self { mode, pattern })
    }

    pub fn mode(&self) -> SyntaxMode {
        self.mode
    }

    /// Split `line` into classified pieces that concatenate back to `line`.
    pub fn tokenize<'a>(&self, line: &'a str) -> Vec<(TokenKind, &'a str)> {
        let Some(pattern) = &self.pattern else {
            return vec![(TokenKind::Text, line)];
        };

        let mut tokens = Vec::new();
        let mut last_end = 0;
        for caps in pattern.captures_iter(line) {
            let (kind, m) = if let Some(m) = caps.name("comment") {
                (TokenKind::Comment, m)
            } else if let Some(m) = caps.name("literal") {
                (TokenKind::Literal, m)
            } else if let Some(m) = caps.name("keyword") {
                (TokenKind::Keyword, m)
            } else if let Some(m) = caps.name("operator") {
                (TokenKind::Operator, m)
            } else {
                continue;
            };
            if m.start() > last_end {
                tokens.push((TokenKind::Text, &line[last_end..m.start()]));
            }
            tokens.push((kind, m.as_str()));
            last_end = m.end();
        }
        if last_end < line.len() || tokens.is_empty() {
            tokens.push((TokenKind::Text, &line[last_end..]));
        }
        tokens
    }

    pub fn highlight(&self, line: &str, theme: &Theme) -> Vec<Span<'static>> {
        self.tokenize(line)
            .into_iter()
            .map(|(kind, text)| {
                let style = match kind {
                    TokenKind::Text => Style::default(),
                    TokenKind::Keyword => theme.keyword,
                    TokenKind::Literal => theme.literal,
                    TokenKind::Comment => theme.comment,
                    TokenKind::Operator => theme.operator,
                };
                Span::styled(text.to_string(), style)
            })
            .collect()
    }
}
