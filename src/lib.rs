pub mod classify;
pub mod config;
pub mod error;
pub mod history;
pub mod keys;
pub mod loader;
pub mod plain;
pub mod process;
pub mod session;
pub mod syntax;
pub mod theme;
pub mod transcript;
pub mod util;

use std::{
    fmt::{self, Debug, Formatter},
    io,
    time::Duration,
};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    },
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    buffer::Buffer,
    layout::Rect,
    text::{Span, Spans},
    widgets::{Paragraph, Widget},
    Terminal,
};

pub use classify::{classify, Classification};
pub use config::Config;
pub use error::{LoadError, ReplError};
pub use loader::{BackendHandle, BackendLoader, BackendSource, Evaluate, PendingBackend};
pub use session::ReplLoop;
pub use transcript::Transcript;

use config::DEFAULT_PROMPT;
use history::History;
use keys::{Interception, KeydownHook, KeydownPolicy};
use syntax::Highlighter;
use theme::Theme;

/// How long the event loop waits for input before polling the executor again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Rows moved by PageUp/PageDown when no height is configured.
const DEFAULT_PAGE: usize = 10;

/// Outcome of handing a submitted line to a [`CommandExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The line was handled; the input is cleared.
    Done,
    /// The line could not be handled yet and stays in the input.
    Held,
    /// The session should end.
    Exit,
}

/// Result of feeding one key event to the [`Repl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFlow {
    Continue,
    /// The keydown hook declined the key; the host may act on it.
    PassThrough(KeyEvent),
    Exit,
}

pub struct Repl<const HISTORY_SIZE: usize> {
    current_input: Vec<char>,
    /// Cursor position as a char index into `current_input`
    cursor_pos: usize,
    history: History<HISTORY_SIZE>,
    transcript: Transcript,
    prompt: String,
    height: Option<u16>,
    /// Rows scrolled back from the bottom
    scroll: usize,
    theme: Theme,
    highlighter: Highlighter,
    keydown: Box<dyn KeydownHook>,
}

impl Repl<32> {
    pub fn new() -> Self {
        Self::new_with_history(History::new())
    }

    pub fn from_config(config: &Config) -> error::Result<Self> {
        let mut me = Self::new();
        me.apply_config(config)?;
        Ok(me)
    }
}

impl Default for Repl<32> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const HISTORY_SIZE: usize> Repl<HISTORY_SIZE> {
    pub fn new_with_history(history: History<HISTORY_SIZE>) -> Self {
        Self {
            current_input: Default::default(),
            cursor_pos: 0,
            history,
            transcript: Transcript::new(),
            prompt: DEFAULT_PROMPT.to_string(),
            height: None,
            scroll: 0,
            theme: Theme::default(),
            highlighter: Highlighter::plain(),
            keydown: Box::new(KeydownPolicy::default()),
        }
    }

    /// Apply prompt, height, keydown policy, syntax mode, theme and greeting from `config`.
    pub fn apply_config(&mut self, config: &Config) -> error::Result<()> {
        self.prompt = config.prompt.clone();
        self.height = config.height;
        self.keydown = Box::new(config.keydown.clone());
        self.highlighter = Highlighter::new(config.syntax)?;
        self.theme = Theme::from_config(&config.theme)?;
        if config.greetings {
            self.transcript
                .push_notice(transcript::NoticeLevel::Info, greeting(config.builtins));
        }
        Ok(())
    }

    pub fn run_fullscreen(&mut self, executor: impl CommandExecutor) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_on_terminal(&mut terminal, executor);

        // restore terminal
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    pub fn run_on_terminal<B: Backend>(
        &mut self,
        term: &mut Terminal<B>,
        mut executor: impl CommandExecutor,
    ) -> io::Result<()> {
        loop {
            executor.poll(&mut self.transcript);

            term.draw(|f| {
                let size = f.size();
                if self.scroll == 0 {
                    let (cursor_x, cursor_y) = self.cursor_pos_in(size);
                    f.set_cursor(cursor_x, cursor_y);
                }
                f.render_widget(&*self, size);
            })?;

            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                match self.feed_key_event(&mut executor, key) {
                    KeyFlow::Exit => return Ok(()),
                    KeyFlow::PassThrough(key) => {
                        log::debug!("key {key:?} passed through to host");
                        executor.pass_through(key, &mut self.transcript);
                    }
                    KeyFlow::Continue => (),
                }
            }
        }
    }

    pub fn feed_key_event(&mut self, executor: &mut impl CommandExecutor, key: KeyEvent) -> KeyFlow {
        if self.keydown.intercept(&key) == Interception::PassThrough {
            return KeyFlow::PassThrough(key);
        }

        match key {
            KeyEvent {
                code: KeyCode::Char('d' | 'q' | 'x'),
                modifiers: KeyModifiers::CONTROL,
            } => return KeyFlow::Exit,
            KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
            } => {
                let mut abandoned: String = self.current_input.drain(..).collect();
                abandoned.push_str("^C");
                self.transcript.push_input(&self.prompt, abandoned);
                self.cursor_pos = 0;
                self.scroll = 0;
                self.history.reset();
            }
            KeyEvent {
                code: code @ (KeyCode::Up | KeyCode::Down),
                modifiers: KeyModifiers::NONE,
            } => {
                let entry = if code == KeyCode::Up {
                    self.history.prev()
                } else {
                    self.history.next()
                };
                self.current_input = entry.unwrap_or_default().chars().collect();
                self.cursor_pos = self.current_input.len();
            }
            KeyEvent {
                code: KeyCode::Left,
                modifiers: KeyModifiers::NONE,
            } => self.set_cursor_pos(self.cursor_pos.saturating_sub(1)),
            KeyEvent {
                code: KeyCode::Right,
                modifiers: KeyModifiers::NONE,
            } => self.set_cursor_pos(self.cursor_pos + 1),
            KeyEvent {
                code: KeyCode::Home,
                modifiers: _,
            } => self.set_cursor_pos(0),
            KeyEvent {
                code: KeyCode::End,
                modifiers: _,
            } => self.set_cursor_pos(self.current_input.len()),
            KeyEvent {
                code: KeyCode::PageUp,
                modifiers: _,
            } => {
                let limit = util::max_scroll(self.transcript.height() + 1, self.page_rows());
                self.scroll = (self.scroll + self.page_rows()).min(limit);
            }
            KeyEvent {
                code: KeyCode::PageDown,
                modifiers: _,
            } => self.scroll = self.scroll.saturating_sub(self.page_rows()),
            KeyEvent {
                code: KeyCode::Char(c),
                modifiers: KeyModifiers::NONE,
            } => self.insert(c),
            KeyEvent {
                code: KeyCode::Char(c),
                modifiers: KeyModifiers::SHIFT,
            } => {
                for c in c.to_uppercase() {
                    self.insert(c)
                }
            }
            KeyEvent {
                code: KeyCode::Backspace,
                modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT,
            } => {
                if self.cursor_pos > 0 {
                    self.cursor_pos -= 1;
                    self.current_input.remove(self.cursor_pos);
                }
            }
            KeyEvent {
                code: KeyCode::Delete,
                modifiers: KeyModifiers::NONE,
            } => {
                if self.cursor_pos < self.current_input.len() {
                    self.current_input.remove(self.cursor_pos);
                }
            }
            KeyEvent {
                code: KeyCode::Enter,
                modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT,
            } => {
                if self.submit(executor) == Submission::Exit {
                    return KeyFlow::Exit;
                }
            }
            _ => (),
        }

        KeyFlow::Continue
    }

    fn insert(&mut self, c: char) {
        self.current_input.insert(self.cursor_pos, c);
        self.cursor_pos += 1;
    }

    fn page_rows(&self) -> usize {
        self.height.map_or(DEFAULT_PAGE, usize::from)
    }

    pub fn history(&self) -> &History<HISTORY_SIZE> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History<HISTORY_SIZE> {
        &mut self.history
    }

    pub fn current_input(&self) -> &[char] {
        &self.current_input
    }

    pub fn current_input_mut(&mut self) -> &mut Vec<char> {
        &mut self.current_input
    }

    /// Replace the input line and put the cursor at its end.
    pub fn set_input(&mut self, input: &str) {
        self.current_input = input.chars().collect();
        self.cursor_pos = self.current_input.len();
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn height(&self) -> Option<u16> {
        self.height
    }

    /// Limit the visible rows; `None` uses the whole drawing area.
    pub fn set_height(&mut self, height: Option<u16>) {
        self.height = height;
    }

    pub fn set_keydown(&mut self, hook: impl KeydownHook + 'static) {
        self.keydown = Box::new(hook);
    }

    pub fn set_highlighter(&mut self, highlighter: Highlighter) {
        self.highlighter = highlighter;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    pub fn set_cursor_pos(&mut self, pos: usize) {
        self.cursor_pos = pos.min(self.current_input.len())
    }

    fn visible_height(&self, rect: Rect) -> usize {
        let height = self.height.map_or(rect.height, |h| h.min(rect.height));
        usize::from(height)
    }

    pub fn cursor_pos_in(&self, rect: Rect) -> (u16, u16) {
        let total = self.transcript.height() + 1;
        let shown = total
            .saturating_sub(self.scroll)
            .min(self.visible_height(rect));
        let x = self.prompt.chars().count() + self.cursor_pos;
        let x = (x as u16).min(rect.width.saturating_sub(1));
        (rect.x + x, rect.y + shown.saturating_sub(1) as u16)
    }

    /// Every row the widget could show: the transcript followed by the input line.
    pub fn rows(&self) -> Vec<Spans<'static>> {
        let mut rows = self.transcript.rows(&self.theme, &self.highlighter);
        let input: String = self.current_input.iter().collect();
        let mut line = vec![Span::styled(self.prompt.clone(), self.theme.prompt)];
        line.extend(self.highlighter.highlight(&input, &self.theme));
        rows.push(Spans::from(line));
        rows
    }

    /// Echo the input line, hand it to `executor` and clear it unless it was held.
    pub fn submit(&mut self, executor: &mut impl CommandExecutor) -> Submission {
        let command: String = self.current_input.iter().collect();
        self.scroll = 0;
        self.transcript.push_input(&self.prompt, command.clone());

        let outcome = executor.execute(&command, &mut self.transcript);
        if outcome == Submission::Held {
            self.history.reset();
        } else {
            self.history.push(command);
            self.current_input.clear();
            self.cursor_pos = 0;
        }
        outcome
    }
}

/// Startup banner shown when greetings are enabled.
pub fn greeting(builtins: bool) -> String {
    let mut banner = format!("| PIPE REPL v{}", env!("CARGO_PKG_VERSION"));
    if builtins {
        banner.push_str("\n| Type 'clear' to clear the console\n| Type 'exit' to quit");
    }
    banner
}

impl<const HISTORY_SIZE: usize> Debug for Repl<HISTORY_SIZE> {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("Repl")
            .field("current_input", &self.current_input)
            .field("cursor_pos", &self.cursor_pos)
            .field("history", &self.history)
            .field("transcript", &self.transcript)
            .field("prompt", &self.prompt)
            .field("height", &self.height)
            .field("scroll", &self.scroll)
            .field("syntax", &self.highlighter.mode())
            .finish_non_exhaustive()
    }
}

/// Handles each line submitted by the [`Repl`].
pub trait CommandExecutor {
    fn execute(&mut self, command: &str, transcript: &mut Transcript) -> Submission;

    /// Called once per event loop tick, before drawing.
    fn poll(&mut self, _transcript: &mut Transcript) {}

    /// Called with keys the keydown hook passed through.
    fn pass_through(&mut self, _key: KeyEvent, _transcript: &mut Transcript) {}
}

impl CommandExecutor for () {
    fn execute(&mut self, _command: &str, _transcript: &mut Transcript) -> Submission {
        Submission::Done
    }
}

impl<F: FnMut(&str, &mut Transcript) -> Submission> CommandExecutor for F {
    fn execute(&mut self, command: &str, transcript: &mut Transcript) -> Submission {
        self(command, transcript)
    }
}

impl<const HISTORY_SIZE: usize> Widget for &Repl<HISTORY_SIZE> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = util::visible_rows(self.rows(), self.visible_height(area), self.scroll);
        Paragraph::new(rows).render(area, buf);
    }
}
