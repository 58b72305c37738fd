//! Key chords and the editor binding table
//!
//! Raw crossterm key events are normalized into `KeyChord`s, then matched
//! against a fixed Emacs-style table. Lookup is pure: the dispatcher decides
//! what each `Binding` does with the engine and session state.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::command::EditorCommand;
use crate::query_replace;
use crate::visual_line::Direction;

/// Font size step for C-= / C--
const FONT_STEP: i16 = 1;

/// Physical key, independent of modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Esc,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Other,
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        match code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::BackTab => Key::BackTab,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Esc => Key::Esc,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            _ => Key::Other,
        }
    }
}

/// A key plus its modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyChord {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub fn plain(c: char) -> Self {
        Self::new(Key::Char(c))
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(c)
        }
    }

    pub fn alt(c: char) -> Self {
        Self {
            alt: true,
            ..Self::plain(c)
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Lowercased character, if this is a character key
    pub fn char_lower(&self) -> Option<char> {
        match self.key {
            Key::Char(c) => Some(c.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Character key with Ctrl held and Alt released
    pub fn is_ctrl(&self, c: char) -> bool {
        self.ctrl && !self.alt && self.char_lower() == Some(c)
    }

    /// Character key with Alt held and Ctrl released
    pub fn is_alt(&self, c: char) -> bool {
        self.alt && !self.ctrl && self.char_lower() == Some(c)
    }

    /// No Ctrl or Alt (Shift is part of the character)
    pub fn is_unmodified(&self) -> bool {
        !self.ctrl && !self.alt
    }

    /// Text this chord would type into a buffer, if any
    pub fn typed_text(&self) -> Option<String> {
        if !self.is_unmodified() {
            return None;
        }
        match self.key {
            Key::Char(c) => Some(c.to_string()),
            Key::Enter => Some("\n".to_string()),
            Key::Tab => Some("\t".to_string()),
            _ => None,
        }
    }
}

impl From<KeyEvent> for KeyChord {
    fn from(event: KeyEvent) -> Self {
        Self {
            key: event.code.into(),
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
            alt: event.modifiers.contains(KeyModifiers::ALT),
            shift: event.modifiers.contains(KeyModifiers::SHIFT),
        }
    }
}

/// Direction of an incremental search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn prompt(self) -> &'static str {
        match self {
            SearchDirection::Forward => "I-Search forward:",
            SearchDirection::Backward => "I-Search backward:",
        }
    }

    pub fn command(self, query: String) -> EditorCommand {
        match self {
            SearchDirection::Forward => EditorCommand::IsearchForward { query },
            SearchDirection::Backward => EditorCommand::IsearchBackward { query },
        }
    }
}

/// What a key chord means outside of any prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Undo,
    Redo,
    KillLine,
    KillRegion,
    CopyRegion,
    Yank,
    Isearch(SearchDirection),
    KeyboardQuit,
    /// Insert a newline and move past it (C-m, C-Enter)
    Newline,
    /// Insert a newline, keep the caret before it (C-o)
    OpenLine,
    Recenter,
    DeleteBackward,
    SetMark,
    /// Start a C-x sequence
    Prefix,
    FontSize(i16),
    QueryReplace,
    /// Move to the adjacent rendered row
    VisualLine(Direction),
    /// Plain motion or deletion forwarded to the engine as-is
    Command(EditorCommand),
    /// Typed text
    Insert(String),
}

/// Second key of a C-x sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixBinding {
    FindFile,
    Save,
    WriteFile,
    Quit,
    SwitchBuffer,
}

/// Match a chord against the global table.
///
/// Order matters: undo is tested before redo so that C-/ without Shift is
/// undo and C-S-/ is redo.
pub fn lookup(chord: &KeyChord) -> Option<Binding> {
    if let Some(binding) = lookup_ctrl(chord) {
        return Some(binding);
    }

    if chord.is_alt('w') {
        return Some(Binding::CopyRegion);
    }

    if query_replace::is_shortcut(chord) {
        return Some(Binding::QueryReplace);
    }

    if let Some(cmd) = lookup_motion(chord) {
        return Some(cmd);
    }

    chord.typed_text().map(Binding::Insert)
}

fn lookup_ctrl(chord: &KeyChord) -> Option<Binding> {
    if !chord.ctrl || chord.alt {
        return None;
    }

    if chord.key == Key::Enter {
        return Some(Binding::Newline);
    }

    let c = chord.char_lower()?;
    let binding = match c {
        // C-/ and C-_; legacy terminals report C-/ as C-7
        '/' | '7' if !chord.shift => Binding::Undo,
        '_' => Binding::Undo,
        '/' | '?' => Binding::Redo,
        'k' => Binding::KillLine,
        'w' => Binding::KillRegion,
        'y' => Binding::Yank,
        's' => Binding::Isearch(SearchDirection::Forward),
        'r' => Binding::Isearch(SearchDirection::Backward),
        'g' => Binding::KeyboardQuit,
        'm' => Binding::Newline,
        'o' => Binding::OpenLine,
        'l' => Binding::Recenter,
        'h' => Binding::DeleteBackward,
        ' ' | '@' => Binding::SetMark,
        'x' => Binding::Prefix,
        '=' | '+' => Binding::FontSize(FONT_STEP),
        '-' => Binding::FontSize(-FONT_STEP),
        'n' => Binding::VisualLine(Direction::Down),
        'p' => Binding::VisualLine(Direction::Up),
        'a' => Binding::Command(EditorCommand::MoveToLineStart),
        'e' => Binding::Command(EditorCommand::MoveToLineEnd),
        'f' => Binding::Command(EditorCommand::MoveForward),
        'b' => Binding::Command(EditorCommand::MoveBackward),
        'd' => Binding::Command(EditorCommand::DeleteChar),
        _ => return None,
    };
    Some(binding)
}

fn lookup_motion(chord: &KeyChord) -> Option<Binding> {
    if chord.alt && !chord.ctrl {
        let cmd = match chord.char_lower()? {
            'f' => EditorCommand::MoveForwardWord,
            'b' => EditorCommand::MoveBackwardWord,
            '<' => EditorCommand::MoveToBufferStart,
            '>' => EditorCommand::MoveToBufferEnd,
            _ => return None,
        };
        return Some(Binding::Command(cmd));
    }

    if !chord.is_unmodified() {
        return None;
    }

    let binding = match chord.key {
        Key::Backspace => Binding::Command(EditorCommand::DeleteBackwardChar),
        Key::Delete => Binding::Command(EditorCommand::DeleteChar),
        Key::Left => Binding::Command(EditorCommand::MoveBackward),
        Key::Right => Binding::Command(EditorCommand::MoveForward),
        Key::Home => Binding::Command(EditorCommand::MoveToLineStart),
        Key::End => Binding::Command(EditorCommand::MoveToLineEnd),
        Key::Up => Binding::VisualLine(Direction::Up),
        Key::Down => Binding::VisualLine(Direction::Down),
        _ => return None,
    };
    Some(binding)
}

/// Match the key that follows C-x. Modifiers are ignored, so C-x C-f and
/// C-x f are the same command.
pub fn lookup_prefix(chord: &KeyChord) -> Option<PrefixBinding> {
    match chord.char_lower()? {
        'f' => Some(PrefixBinding::FindFile),
        's' => Some(PrefixBinding::Save),
        'w' => Some(PrefixBinding::WriteFile),
        'c' => Some(PrefixBinding::Quit),
        'b' => Some(PrefixBinding::SwitchBuffer),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_from_crossterm_event() {
        let event = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        let chord = KeyChord::from(event);
        assert_eq!(chord, KeyChord::ctrl('x'));
    }

    #[test]
    fn test_ctrl_letters_are_case_insensitive() {
        let chord = KeyChord::ctrl('K').with_shift();
        assert_eq!(lookup(&chord), Some(Binding::KillLine));
    }

    #[test]
    fn test_undo_and_redo_shortcuts() {
        assert_eq!(lookup(&KeyChord::ctrl('/')), Some(Binding::Undo));
        assert_eq!(lookup(&KeyChord::ctrl('_')), Some(Binding::Undo));
        assert_eq!(lookup(&KeyChord::ctrl('7')), Some(Binding::Undo));
        assert_eq!(lookup(&KeyChord::ctrl('/').with_shift()), Some(Binding::Redo));
        assert_eq!(lookup(&KeyChord::ctrl('?').with_shift()), Some(Binding::Redo));
    }

    #[test]
    fn test_ctrl_alt_chords_skip_ctrl_table() {
        // C-M-k is not kill-line
        assert_eq!(lookup(&KeyChord::ctrl('k').with_alt()), None);
    }

    #[test]
    fn test_region_commands() {
        assert_eq!(lookup(&KeyChord::ctrl('w')), Some(Binding::KillRegion));
        assert_eq!(lookup(&KeyChord::alt('w')), Some(Binding::CopyRegion));
    }

    #[test]
    fn test_set_mark_variants() {
        assert_eq!(lookup(&KeyChord::ctrl(' ')), Some(Binding::SetMark));
        assert_eq!(lookup(&KeyChord::ctrl('@')), Some(Binding::SetMark));
    }

    #[test]
    fn test_query_replace_shortcuts() {
        assert_eq!(
            lookup(&KeyChord::alt('%').with_shift()),
            Some(Binding::QueryReplace)
        );
        assert_eq!(
            lookup(&KeyChord::ctrl('5').with_alt()),
            Some(Binding::QueryReplace)
        );
    }

    #[test]
    fn test_font_size_steps() {
        assert_eq!(lookup(&KeyChord::ctrl('=')), Some(Binding::FontSize(1)));
        assert_eq!(lookup(&KeyChord::ctrl('+')), Some(Binding::FontSize(1)));
        assert_eq!(lookup(&KeyChord::ctrl('-')), Some(Binding::FontSize(-1)));
    }

    #[test]
    fn test_vertical_motion_is_visual() {
        assert_eq!(
            lookup(&KeyChord::ctrl('n')),
            Some(Binding::VisualLine(Direction::Down))
        );
        assert_eq!(
            lookup(&KeyChord::new(Key::Up)),
            Some(Binding::VisualLine(Direction::Up))
        );
    }

    #[test]
    fn test_alt_motions() {
        assert_eq!(
            lookup(&KeyChord::alt('<').with_shift()),
            Some(Binding::Command(EditorCommand::MoveToBufferStart))
        );
        assert_eq!(
            lookup(&KeyChord::alt('b')),
            Some(Binding::Command(EditorCommand::MoveBackwardWord))
        );
    }

    #[test]
    fn test_plain_keys_insert_text() {
        assert_eq!(
            lookup(&KeyChord::plain('Q').with_shift()),
            Some(Binding::Insert("Q".to_string()))
        );
        assert_eq!(
            lookup(&KeyChord::new(Key::Enter)),
            Some(Binding::Insert("\n".to_string()))
        );
        assert_eq!(
            lookup(&KeyChord::new(Key::Backspace)),
            Some(Binding::Command(EditorCommand::DeleteBackwardChar))
        );
    }

    #[test]
    fn test_ctrl_enter_is_newline() {
        let chord = KeyChord::new(Key::Enter).with_ctrl();
        assert_eq!(lookup(&chord), Some(Binding::Newline));
    }

    #[test]
    fn test_unbound_chords() {
        assert_eq!(lookup(&KeyChord::ctrl('z')), None);
        assert_eq!(lookup(&KeyChord::alt('z')), None);
        assert_eq!(lookup(&KeyChord::new(Key::Esc)), None);
    }

    #[test]
    fn test_prefix_table() {
        assert_eq!(lookup_prefix(&KeyChord::plain('f')), Some(PrefixBinding::FindFile));
        assert_eq!(lookup_prefix(&KeyChord::ctrl('s')), Some(PrefixBinding::Save));
        assert_eq!(lookup_prefix(&KeyChord::plain('w')), Some(PrefixBinding::WriteFile));
        assert_eq!(lookup_prefix(&KeyChord::ctrl('c')), Some(PrefixBinding::Quit));
        assert_eq!(lookup_prefix(&KeyChord::plain('b')), Some(PrefixBinding::SwitchBuffer));
        assert_eq!(lookup_prefix(&KeyChord::plain('z')), None);
        assert_eq!(lookup_prefix(&KeyChord::new(Key::Left)), None);
    }
}
