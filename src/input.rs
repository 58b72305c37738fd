//! Input events and the queue feeding the dispatcher
//!
//! Terminal events are translated into `InputEvent`s and pushed onto an
//! `EventQueue`. The dispatcher is the single consumer and handles events
//! strictly in delivery order. Other producers (command line paths, an input
//! method bridge) push through cloned `EventSender`s.

use std::path::PathBuf;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use crossterm::event::{Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};

use crate::keys::KeyChord;

/// One event for the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyChord),
    /// An input method started composing
    CompositionStart,
    /// Composition finished, with the committed text if any
    CompositionEnd(Option<String>),
    /// Text inserted as a whole (paste)
    InsertText(String),
    /// Left click at a terminal cell
    Click { column: u16, row: u16 },
    /// Scroll the view by whole rows; negative is up
    Scroll(i32),
    /// Open a file from outside the key loop
    Open(PathBuf),
    Resize { width: u16, height: u16 },
}

impl InputEvent {
    /// Translate a crossterm event. Key releases and events the editor does
    /// not use yield `None`.
    pub fn from_terminal(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) => match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => Some(Self::Key(key.into())),
                KeyEventKind::Release => None,
            },
            Event::Paste(text) => Some(Self::InsertText(text)),
            Event::Mouse(mouse) => Self::from_mouse(mouse),
            Event::Resize(width, height) => Some(Self::Resize { width, height }),
            _ => None,
        }
    }

    fn from_mouse(mouse: MouseEvent) -> Option<Self> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Self::Click {
                column: mouse.column,
                row: mouse.row,
            }),
            MouseEventKind::ScrollUp => Some(Self::Scroll(-3)),
            MouseEventKind::ScrollDown => Some(Self::Scroll(3)),
            _ => None,
        }
    }
}

/// Producer side of the queue
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<InputEvent>,
}

impl EventSender {
    /// Queue an event; dropped silently once the consumer is gone
    pub fn send(&self, event: InputEvent) {
        let _ = self.tx.send(event);
    }
}

/// Single-consumer event queue
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<InputEvent>,
    rx: Receiver<InputEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, event: InputEvent) {
        let _ = self.tx.send(event);
    }

    /// Next queued event without blocking
    pub fn try_pop(&self) -> Option<InputEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Everything queued right now, oldest first
    pub fn drain(&self) -> Vec<InputEvent> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Key;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};

    fn key_event(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_key_press_translates() {
        let event = key_event(KeyCode::Char('x'), KeyModifiers::CONTROL, KeyEventKind::Press);
        assert_eq!(
            InputEvent::from_terminal(event),
            Some(InputEvent::Key(KeyChord::ctrl('x')))
        );
    }

    #[test]
    fn test_key_release_ignored() {
        let event = key_event(KeyCode::Enter, KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(InputEvent::from_terminal(event), None);
    }

    #[test]
    fn test_repeat_is_a_press() {
        let event = key_event(KeyCode::Down, KeyModifiers::NONE, KeyEventKind::Repeat);
        assert_eq!(
            InputEvent::from_terminal(event),
            Some(InputEvent::Key(KeyChord::new(Key::Down)))
        );
    }

    #[test]
    fn test_paste_and_resize() {
        assert_eq!(
            InputEvent::from_terminal(Event::Paste("hi".to_string())),
            Some(InputEvent::InsertText("hi".to_string()))
        );
        assert_eq!(
            InputEvent::from_terminal(Event::Resize(80, 24)),
            Some(InputEvent::Resize {
                width: 80,
                height: 24
            })
        );
        assert_eq!(InputEvent::from_terminal(Event::FocusGained), None);
    }

    #[test]
    fn test_left_click() {
        let mouse = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 2,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(
            InputEvent::from_terminal(Event::Mouse(mouse)),
            Some(InputEvent::Click { column: 4, row: 2 })
        );
    }

    #[test]
    fn test_queue_preserves_order() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        queue.push(InputEvent::CompositionStart);
        sender.send(InputEvent::CompositionEnd(Some("日本".to_string())));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_pop(), Some(InputEvent::CompositionStart));
        assert_eq!(
            queue.drain(),
            vec![InputEvent::CompositionEnd(Some("日本".to_string()))]
        );
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
    }
}
