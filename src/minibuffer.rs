//! Minibuffer: a modal prompt with its own key handling
//!
//! A `MinibufferSession` lives for exactly one prompt. Keys are fed to
//! `handle_key` and the returned `MinibufferEvent` tells the owner whether
//! the prompt resolved, was cancelled, or needs completion candidates.
//!
//! Completion is two-phase: the session asks for candidates with
//! `FetchCompletions(base)` and the owner answers with `receive_completions`.
//! Answers for a base that is no longer pending are dropped.

use tui_input::{Input, InputRequest};

use crate::keys::{Key, KeyChord};

/// Source of completion candidates for a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completer {
    /// File system paths, answered by the document engine
    Paths,
    /// A fixed list of names, filtered by case-insensitive prefix
    Names(Vec<String>),
}

impl Completer {
    /// Candidates that can be computed without the engine
    pub fn complete_locally(&self, base: &str) -> Option<Vec<String>> {
        match self {
            Completer::Paths => None,
            Completer::Names(names) => {
                let base = base.to_lowercase();
                Some(
                    names
                        .iter()
                        .filter(|name| name.to_lowercase().starts_with(&base))
                        .cloned()
                        .collect(),
                )
            }
        }
    }
}

/// Per-prompt options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    /// Trim surrounding whitespace on commit
    pub trim: bool,
    pub completer: Option<Completer>,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            trim: true,
            completer: None,
        }
    }
}

impl PromptOptions {
    /// Options for search and replace prompts, which keep whitespace
    pub fn untrimmed() -> Self {
        Self {
            trim: false,
            completer: None,
        }
    }

    pub fn with_completer(completer: Completer) -> Self {
        Self {
            trim: true,
            completer: Some(completer),
        }
    }
}

/// Result of feeding one key to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinibufferEvent {
    /// Keep the prompt open
    Continue,
    /// Prompt resolved; `None` when the committed value is empty
    Commit(Option<String>),
    /// Escape or C-g
    Cancel,
    /// Candidates are needed for this input
    FetchCompletions(String),
}

/// State of one open prompt
pub struct MinibufferSession {
    prompt: String,
    input: Input,
    trim: bool,
    completer: Option<Completer>,
    candidates: Vec<String>,
    selected: Option<usize>,
    panel_visible: bool,
    tab_primed: bool,
    last_completion_base: Option<String>,
    pending_fetch: Option<String>,
    quote_next: bool,
}

impl std::fmt::Debug for MinibufferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinibufferSession")
            .field("prompt", &self.prompt)
            .field("value", &self.input.value())
            .field("cursor", &self.input.cursor())
            .field("candidates", &self.candidates.len())
            .field("selected", &self.selected)
            .field("panel_visible", &self.panel_visible)
            .finish()
    }
}

impl MinibufferSession {
    /// Open a prompt with the caret at the end of `initial`
    pub fn new(prompt: impl Into<String>, initial: impl Into<String>, options: PromptOptions) -> Self {
        Self {
            prompt: prompt.into(),
            input: Input::new(initial.into()),
            trim: options.trim,
            completer: options.completer,
            candidates: Vec::new(),
            selected: None,
            panel_visible: false,
            tab_primed: false,
            last_completion_base: None,
            pending_fetch: None,
            quote_next: false,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    /// Caret position in characters
    pub fn cursor(&self) -> usize {
        self.input.cursor()
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn completer(&self) -> Option<&Completer> {
        self.completer.as_ref()
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_panel_visible(&self) -> bool {
        self.panel_visible
    }

    /// Whether the candidate panel should be drawn; a single candidate is
    /// never worth a panel
    pub fn shows_candidates(&self) -> bool {
        self.panel_visible && self.candidates.len() > 1
    }

    /// Set by a completed fetch, consumed by the next Tab
    pub fn is_tab_primed(&self) -> bool {
        self.tab_primed
    }

    pub fn pending_fetch(&self) -> Option<&str> {
        self.pending_fetch.as_deref()
    }

    /// Feed one key to the prompt
    pub fn handle_key(&mut self, chord: KeyChord) -> MinibufferEvent {
        if self.quote_next {
            self.quote_next = false;
            if let Some(c) = quoted_char(&chord) {
                self.input.handle(InputRequest::InsertChar(c));
                return MinibufferEvent::Continue;
            }
        }

        if chord.key == Key::Tab && chord.is_unmodified() && self.completer.is_some() {
            return self.tab();
        }

        if self.panel_visible && chord.is_unmodified() {
            match chord.key {
                Key::Down => {
                    self.cycle(true);
                    return MinibufferEvent::Continue;
                }
                Key::Up => {
                    self.cycle(false);
                    return MinibufferEvent::Continue;
                }
                _ => {}
            }
        }

        if chord.is_ctrl('q') {
            self.quote_next = true;
            return MinibufferEvent::Continue;
        }

        if chord.key == Key::Enter && !chord.alt {
            return MinibufferEvent::Commit(self.committed_value());
        }

        if chord.key == Key::Esc || (chord.ctrl && chord.char_lower() == Some('g')) {
            return MinibufferEvent::Cancel;
        }

        if self.line_edit(&chord) {
            return MinibufferEvent::Continue;
        }

        self.reset_completion();
        self.default_edit(&chord);
        MinibufferEvent::Continue
    }

    /// Insert pasted or composed text at the caret
    pub fn insert_str(&mut self, text: &str) {
        self.quote_next = false;
        self.reset_completion();
        for c in text.chars() {
            self.input.handle(InputRequest::InsertChar(c));
        }
    }

    /// Deliver candidates for `base`. Returns false when the answer is stale.
    pub fn receive_completions(&mut self, base: &str, candidates: Vec<String>) -> bool {
        if self.pending_fetch.as_deref() != Some(base) {
            return false;
        }

        self.pending_fetch = None;
        self.candidates = candidates;
        self.selected = None;
        self.last_completion_base = Some(base.to_string());
        self.panel_visible = false;
        self.tab_primed = true;
        true
    }

    /// The value a commit would resolve to
    pub fn committed_value(&self) -> Option<String> {
        let raw = self.input.value();
        let value = if self.trim { raw.trim() } else { raw };
        (!value.is_empty()).then(|| value.to_string())
    }

    fn tab(&mut self) -> MinibufferEvent {
        let current = self.input.value().to_string();

        if self.last_completion_base.as_deref() != Some(current.as_str()) {
            if self.pending_fetch.as_deref() == Some(current.as_str()) {
                return MinibufferEvent::Continue;
            }
            self.pending_fetch = Some(current.clone());
            return MinibufferEvent::FetchCompletions(current);
        }

        if self.candidates.is_empty() {
            self.panel_visible = false;
            self.tab_primed = false;
            return MinibufferEvent::Continue;
        }

        self.panel_visible = !self.panel_visible;
        self.tab_primed = false;
        MinibufferEvent::Continue
    }

    fn cycle(&mut self, down: bool) {
        let len = self.candidates.len();
        if len == 0 {
            return;
        }

        let next = match (self.selected, down) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        self.selected = Some(next);
        self.set_value(self.candidates[next].clone());
    }

    /// Emacs line editing keys; these keep completion state
    fn line_edit(&mut self, chord: &KeyChord) -> bool {
        if chord.ctrl && !chord.alt {
            let request = match chord.char_lower() {
                Some('a') => InputRequest::GoToStart,
                Some('e') => InputRequest::GoToEnd,
                Some('b') => InputRequest::GoToPrevChar,
                Some('f') => InputRequest::GoToNextChar,
                Some('d') => InputRequest::DeleteNextChar,
                Some('k') => {
                    self.kill_to_line_end();
                    return true;
                }
                _ => return false,
            };
            self.input.handle(request);
            return true;
        }

        if chord.alt && !chord.ctrl {
            let target = match chord.char_lower() {
                Some('b') => backward_word(&self.chars(), self.input.cursor()),
                Some('f') => forward_word(&self.chars(), self.input.cursor()),
                _ => return false,
            };
            self.input.handle(InputRequest::SetCursor(target));
            return true;
        }

        false
    }

    fn default_edit(&mut self, chord: &KeyChord) {
        if !chord.is_unmodified() {
            return;
        }
        let request = match chord.key {
            Key::Char(c) => InputRequest::InsertChar(c),
            Key::Backspace => InputRequest::DeletePrevChar,
            Key::Delete => InputRequest::DeleteNextChar,
            Key::Left => InputRequest::GoToPrevChar,
            Key::Right => InputRequest::GoToNextChar,
            Key::Home => InputRequest::GoToStart,
            Key::End => InputRequest::GoToEnd,
            _ => return,
        };
        self.input.handle(request);
    }

    fn reset_completion(&mut self) {
        self.candidates.clear();
        self.selected = None;
        self.last_completion_base = None;
        self.pending_fetch = None;
        self.panel_visible = false;
        self.tab_primed = false;
    }

    fn kill_to_line_end(&mut self) {
        let chars = self.chars();
        let start = self.input.cursor().min(chars.len());
        let end = chars[start..]
            .iter()
            .position(|&c| c == '\n')
            .map_or(chars.len(), |i| start + i);

        let value: String = chars[..start].iter().chain(&chars[end..]).collect();
        self.input = Input::new(value);
        self.input.handle(InputRequest::SetCursor(start));
    }

    fn set_value(&mut self, value: String) {
        self.input = Input::new(value);
    }

    fn chars(&self) -> Vec<char> {
        self.input.value().chars().collect()
    }
}

/// Character inserted by the key that follows C-q
fn quoted_char(chord: &KeyChord) -> Option<char> {
    if chord.is_ctrl('j') {
        return Some('\n');
    }
    if !chord.is_unmodified() {
        return None;
    }
    match chord.key {
        Key::Char(c) => Some(c),
        Key::Tab => Some('\t'),
        _ => None,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Skip the rest of the current word, then the separators after it
fn forward_word(chars: &[char], pos: usize) -> usize {
    let mut pos = pos.min(chars.len());
    while pos < chars.len() && is_word_char(chars[pos]) {
        pos += 1;
    }
    while pos < chars.len() && !is_word_char(chars[pos]) {
        pos += 1;
    }
    pos
}

/// Back over separators, then to the start of the word before them
fn backward_word(chars: &[char], pos: usize) -> usize {
    if chars.is_empty() {
        return 0;
    }
    let mut pos = pos.min(chars.len()).saturating_sub(1);
    while pos > 0 && !is_word_char(chars[pos]) {
        pos -= 1;
    }
    while pos > 0 && is_word_char(chars[pos - 1]) {
        pos -= 1;
    }
    pos
}
