//! The ordered history of rendered lines.

use std::collections::VecDeque;

use tui::{
    style::Style,
    text::{Span, Spans},
};

use crate::{classify::Classification, syntax::Highlighter, theme::Theme};

/// Upper bound on kept lines; the oldest are dropped first.
pub const MAX_LINES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// An echoed command; `text` holds the command without the prompt.
    Input { prompt: String },
    Blank,
    Response(Classification),
    /// A message from the front end itself rather than the backend.
    Notice(NoticeLevel),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub kind: LineKind,
    pub text: String,
}

impl TranscriptLine {
    /// Number of terminal rows this line takes up.
    pub fn height(&self) -> usize {
        match self.kind {
            LineKind::Response(Classification::Empty) => 0,
            LineKind::Blank | LineKind::Input { .. } => 1,
            _ => self.text.split('\n').count(),
        }
    }

    fn rows(&self, theme: &Theme, highlighter: &Highlighter) -> Vec<Spans<'static>> {
        let style = match &self.kind {
            LineKind::Input { prompt } => {
                let mut spans = vec![Span::styled(prompt.clone(), theme.prompt)];
                spans.extend(highlighter.highlight(&self.text, theme));
                return vec![Spans::from(spans)];
            }
            LineKind::Blank => return vec![Spans::default()],
            LineKind::Response(Classification::Empty) => return Vec::new(),
            LineKind::Response(Classification::Error) => theme.error,
            LineKind::Response(Classification::Success) => theme.success,
            LineKind::Notice(NoticeLevel::Info) => theme.notice,
            LineKind::Notice(NoticeLevel::Error) => theme.error,
        };
        styled_rows(&self.text, style)
    }
}

fn styled_rows(text: &str, style: Style) -> Vec<Spans<'static>> {
    text.split('\n')
        .map(|row| Spans::from(Span::styled(row.to_string(), style)))
        .collect()
}

/// Lines written by the REPL loop, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: VecDeque<TranscriptLine>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &VecDeque<TranscriptLine> {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptLine> {
        self.lines.back()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Remove and return every line, oldest first.
    pub fn take(&mut self) -> impl Iterator<Item = TranscriptLine> + '_ {
        self.lines.drain(..)
    }

    pub fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        if self.lines.len() == MAX_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(TranscriptLine {
            kind,
            text: text.into(),
        });
    }

    pub fn push_input(&mut self, prompt: &str, command: impl Into<String>) {
        self.push(
            LineKind::Input {
                prompt: prompt.to_string(),
            },
            command,
        );
    }

    pub fn push_blank(&mut self) {
        self.push(LineKind::Blank, String::new());
    }

    pub fn push_response(&mut self, classification: Classification, text: impl Into<String>) {
        self.push(LineKind::Response(classification), text);
    }

    pub fn push_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.push(LineKind::Notice(level), text);
    }

    /// Total rows needed to show every line.
    pub fn height(&self) -> usize {
        self.lines.iter().map(TranscriptLine::height).sum()
    }

    /// Styled rows for every line, oldest first.
    pub fn rows(&self, theme: &Theme, highlighter: &Highlighter) -> Vec<Spans<'static>> {
        self.lines
            .iter()
            .flat_map(|line| line.rows(theme, highlighter))
            .collect()
    }
}
