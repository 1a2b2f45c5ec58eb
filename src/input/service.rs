//! Key bindings and the input service.
//!
//! Consumes coalesced raw events, runs the browse/filter state machine, and yields the
//! [`InputAction`]s the application loop acts on.

use crate::error::Result;
use crate::input::raw::{RawInputCollector, RawInputEvent, ScrollDirection};
use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Browse,
    /// Editing the filter prompt
    FilterInput,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Scroll by terminal lines without moving the selection
    Scroll {
        direction: ScrollDirection,
        lines: u64,
    },
    SelectNext,
    SelectPrevious,
    PageUp,
    PageDown,
    GoToStart,
    /// Jump to the newest record and follow the tail
    GoToEnd,
    ToggleExpand,
    Quit,
    StartFilter {
        buffer: String,
    },
    /// The prompt text changed; applied after the debounce window
    UpdateFilter {
        buffer: String,
    },
    /// Apply immediately and close the prompt
    ApplyFilter {
        query: String,
    },
    ClearFilter,
    Abort,
    Retry,
    Resize {
        width: u16,
        height: u16,
    },
    NoAction,
    InvalidInput,
}

fn plain(modifiers: KeyModifiers) -> bool {
    !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

pub struct InputStateMachine {
    state: InputState,
    filter_buffer: String,
}

impl InputStateMachine {
    pub fn new() -> Self {
        Self {
            state: InputState::Browse,
            filter_buffer: String::new(),
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> InputAction {
        if key.kind != KeyEventKind::Press {
            return InputAction::NoAction;
        }
        match self.state {
            InputState::Browse => self.browse_key(key),
            InputState::FilterInput => self.filter_key(key),
        }
    }

    fn browse_key(&mut self, key: KeyEvent) -> InputAction {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => InputAction::Quit,
            (KeyCode::Char('q'), m) if plain(m) => InputAction::Quit,
            (KeyCode::Char('j'), m) if plain(m) => InputAction::SelectNext,
            (KeyCode::Down, _) => InputAction::SelectNext,
            (KeyCode::Char('k'), m) if plain(m) => InputAction::SelectPrevious,
            (KeyCode::Up, _) => InputAction::SelectPrevious,
            (KeyCode::Char(' ' | 'f'), m) if plain(m) => InputAction::PageDown,
            (KeyCode::PageDown, _) => InputAction::PageDown,
            (KeyCode::Char('b'), m) if plain(m) => InputAction::PageUp,
            (KeyCode::PageUp, _) => InputAction::PageUp,
            (KeyCode::Char('g'), m) if plain(m) => InputAction::GoToStart,
            (KeyCode::Home, _) => InputAction::GoToStart,
            (KeyCode::Char('G'), m) if plain(m) => InputAction::GoToEnd,
            (KeyCode::End, _) => InputAction::GoToEnd,
            (KeyCode::Enter, _) => InputAction::ToggleExpand,
            (KeyCode::Char('o'), m) if plain(m) => InputAction::ToggleExpand,
            (KeyCode::Char('a'), m) if plain(m) => InputAction::Abort,
            (KeyCode::Char('r'), m) if plain(m) => InputAction::Retry,
            (KeyCode::Esc, _) => {
                self.filter_buffer.clear();
                InputAction::ClearFilter
            }
            (KeyCode::Char('/'), m) if plain(m) => {
                self.state = InputState::FilterInput;
                InputAction::StartFilter {
                    buffer: self.filter_buffer.clone(),
                }
            }
            _ => InputAction::InvalidInput,
        }
    }

    fn filter_key(&mut self, key: KeyEvent) -> InputAction {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => {
                self.state = InputState::Browse;
                self.filter_buffer.clear();
                InputAction::ClearFilter
            }
            (KeyCode::Enter, _) => {
                self.state = InputState::Browse;
                InputAction::ApplyFilter {
                    query: self.filter_buffer.clone(),
                }
            }
            (KeyCode::Backspace, _) => {
                self.filter_buffer.pop();
                InputAction::UpdateFilter {
                    buffer: self.filter_buffer.clone(),
                }
            }
            (KeyCode::Char(ch), m) if plain(m) && !ch.is_control() => {
                self.filter_buffer.push(ch);
                InputAction::UpdateFilter {
                    buffer: self.filter_buffer.clone(),
                }
            }
            _ => InputAction::NoAction,
        }
    }

    pub fn filter_buffer(&self) -> &str {
        &self.filter_buffer
    }

    pub fn state(&self) -> InputState {
        self.state
    }
}

impl Default for InputStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces [`InputAction`]s from terminal events.
pub struct InputService {
    state_machine: InputStateMachine,
    raw_input: RawInputCollector,
}

impl InputService {
    pub fn new() -> Self {
        Self {
            state_machine: InputStateMachine::new(),
            raw_input: RawInputCollector::new(),
        }
    }

    /// Wait up to `timeout` for input and return every action that became ready.
    pub fn poll_actions(&mut self, timeout: Option<Duration>) -> Result<Vec<InputAction>> {
        let mut actions = Vec::new();
        if let Some(event) = self.raw_input.poll_event(timeout)? {
            actions.extend(self.translate(event));
            while let Some(event) = self.raw_input.try_next() {
                actions.extend(self.translate(event));
            }
        }
        Ok(actions)
    }

    pub fn process_event(&mut self, event: Event) -> Vec<InputAction> {
        self.raw_input.process_event(event);
        let mut actions = Vec::new();
        while let Some(event) = self.raw_input.try_next() {
            actions.extend(self.translate(event));
        }
        actions
    }

    fn translate(&mut self, event: RawInputEvent) -> Option<InputAction> {
        let action = match event {
            RawInputEvent::Key(key) => self.state_machine.handle_key_event(key),
            RawInputEvent::Resize { width, height } => InputAction::Resize { width, height },
            RawInputEvent::Scroll { direction, lines } => InputAction::Scroll { direction, lines },
        };
        match action {
            InputAction::NoAction | InputAction::InvalidInput => None,
            _ => Some(action),
        }
    }
}

impl Default for InputService {
    fn default() -> Self {
        Self::new()
    }
}
