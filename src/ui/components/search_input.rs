use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

/// Debounced search box state. Keystrokes land in `value` immediately; the
/// query only becomes ready once the input has been idle for the debounce
/// window, so every poll tick should call `take_ready`.
pub struct SearchInputState {
    value: String,
    committed: String,
    last_edit: Option<Instant>,
}

impl SearchInputState {
    pub fn new() -> Self {
        Self {
            value: String::new(),
            committed: String::new(),
            last_edit: None,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char(c) => {
                self.value.push(c);
                self.last_edit = Some(Instant::now());
            }
            KeyCode::Backspace => {
                self.value.pop();
                self.last_edit = Some(Instant::now());
            }
            _ => {}
        }
    }

    /// Clearing the box counts as an edit, so the unfiltered list comes back
    /// through the same debounce path.
    pub fn clear(&mut self) {
        if !self.value.is_empty() {
            self.value.clear();
            self.last_edit = Some(Instant::now());
        }
    }

    /// Returns the query to fire, if the debounce window has elapsed since the
    /// last keystroke and the text differs from what was last committed.
    pub fn take_ready(&mut self, now: Instant, window: Duration) -> Option<String> {
        let last_edit = self.last_edit?;
        if now.duration_since(last_edit) < window {
            return None;
        }

        self.last_edit = None;
        if self.value == self.committed {
            return None;
        }

        self.committed = self.value.clone();
        Some(self.committed.clone())
    }

    pub fn display_string(&self) -> String {
        format!("{}|", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn does_not_fire_while_typing() {
        let mut search = SearchInputState::new();
        let start = Instant::now();

        search.handle_input(KeyCode::Char('a'));
        assert_eq!(search.take_ready(start, WINDOW), None);

        // Another keystroke inside the window keeps it pending.
        search.handle_input(KeyCode::Char('b'));
        assert_eq!(search.take_ready(start + Duration::from_millis(100), WINDOW), None);
    }

    #[test]
    fn fires_once_after_idle_window() {
        let mut search = SearchInputState::new();
        search.handle_input(KeyCode::Char('a'));
        search.handle_input(KeyCode::Char('b'));

        let later = Instant::now() + Duration::from_secs(1);
        assert_eq!(search.take_ready(later, WINDOW), Some("ab".to_string()));

        // Nothing left to fire.
        assert_eq!(search.take_ready(later + WINDOW, WINDOW), None);
    }

    #[test]
    fn unchanged_query_does_not_refire() {
        let mut search = SearchInputState::new();
        search.handle_input(KeyCode::Char('a'));

        let later = Instant::now() + Duration::from_secs(1);
        assert_eq!(search.take_ready(later, WINDOW), Some("a".to_string()));

        // Type and delete the same character: value matches committed again.
        search.handle_input(KeyCode::Char('b'));
        search.handle_input(KeyCode::Backspace);
        assert_eq!(search.take_ready(later + Duration::from_secs(1), WINDOW), None);
    }

    #[test]
    fn clearing_restores_the_empty_query() {
        let mut search = SearchInputState::new();
        search.handle_input(KeyCode::Char('a'));

        let later = Instant::now() + Duration::from_secs(1);
        search.take_ready(later, WINDOW);

        search.clear();
        assert_eq!(
            search.take_ready(later + Duration::from_secs(1), WINDOW),
            Some(String::new())
        );
    }
}
