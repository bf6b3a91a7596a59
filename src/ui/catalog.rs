use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs},
    Frame,
};

use crate::models::{CatalogEntry, CatalogKind};
use crate::ui::components::toast::{render_toast, ToastState};
use crate::ui::{centered_rect, poll_key};

const KINDS: [CatalogKind; 3] = [
    CatalogKind::ProductType,
    CatalogKind::Category,
    CatalogKind::Brand,
];

// Represents the state of the master-data maintenance screen
pub struct CatalogState {
    kind: CatalogKind,
    entries: Vec<CatalogEntry>,
    list_state: ListState,
    // (entry id, name buffer); no id means a new entry is being created.
    edit: Option<(Option<i32>, String)>,
    confirm_delete: Option<i32>,
    is_loading: bool,
    pub toasts: ToastState,
}

pub enum CatalogAction {
    Back,
    /// The active tab changed; fetch that list.
    SwitchKind(CatalogKind),
    Create(String),
    Rename(CatalogEntry),
    Delete(i32),
}

impl CatalogState {
    pub fn new() -> Self {
        Self {
            kind: CatalogKind::ProductType,
            entries: Vec::new(),
            list_state: ListState::default(),
            edit: None,
            confirm_delete: None,
            is_loading: false,
            toasts: ToastState::new(),
        }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn begin_loading(&mut self) {
        self.is_loading = true;
    }

    pub fn finish_loading(&mut self) {
        self.is_loading = false;
    }

    pub fn set_entries(&mut self, entries: Vec<CatalogEntry>) {
        self.entries = entries;
        self.list_state = ListState::default();
        if !self.entries.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    fn switch_kind(&mut self, forward: bool) -> CatalogKind {
        let idx = KINDS.iter().position(|k| *k == self.kind).unwrap_or(0);
        let len = KINDS.len();
        let next = if forward {
            (idx + 1) % len
        } else {
            (idx + len - 1) % len
        };
        self.kind = KINDS[next];
        self.edit = None;
        self.confirm_delete = None;
        self.kind
    }

    fn next(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.entries.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.list_state.selected().and_then(|i| self.entries.get(i))
    }
}

pub fn render_catalog<B: Backend>(frame: &mut Frame<B>, state: &mut CatalogState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Tabs
                Constraint::Min(3),    // List
                Constraint::Length(3), // Toast
                Constraint::Length(3), // Key help
            ]
            .as_ref(),
        )
        .split(frame.size());

    let titles = KINDS
        .iter()
        .map(|k| Spans::from(k.label()))
        .collect::<Vec<_>>();
    let selected = KINDS.iter().position(|k| *k == state.kind).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().title("Master Data").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, chunks[0]);

    let items = state
        .entries
        .iter()
        .map(|entry| ListItem::new(entry.name.as_str()))
        .collect::<Vec<_>>();

    let title = if state.is_loading {
        format!("{} (loading...)", state.kind.label())
    } else {
        format!("{} ({})", state.kind.label(), state.entries.len())
    };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_stateful_widget(list, chunks[1], &mut state.list_state);

    render_toast(frame, chunks[2], &state.toasts);

    let help = if state.edit.is_some() {
        "Type the name | Enter - Save | Esc - Cancel"
    } else {
        "<Tab> Next list | <A> Add | <E> Rename | <D> Delete | <Esc> Back"
    };
    let buttons = Paragraph::new(help)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[3]);

    if let Some((id, buffer)) = &state.edit {
        render_edit_popup(frame, frame.size(), id.is_none(), buffer);
    }
    if state.confirm_delete.is_some() {
        let name = state
            .selected_entry()
            .map(|e| e.name.as_str())
            .unwrap_or("");
        render_delete_confirm(frame, frame.size(), name);
    }
}

fn render_edit_popup<B: Backend>(frame: &mut Frame<B>, size: Rect, is_new: bool, buffer: &str) {
    let popup_area = centered_rect(50, 20, size);
    frame.render_widget(Clear, popup_area);

    let title = if is_new { "New Entry" } else { "Rename Entry" };
    let popup = Paragraph::new(Spans::from(vec![
        Span::raw("Name: "),
        Span::styled(
            format!("{buffer}|"),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(Block::default().title(title).borders(Borders::ALL));

    frame.render_widget(popup, popup_area);
}

fn render_delete_confirm<B: Backend>(frame: &mut Frame<B>, size: Rect, name: &str) {
    let popup_area = centered_rect(60, 20, size);
    frame.render_widget(Clear, popup_area);

    let prompt = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(format!("Delete \"{name}\"?")),
        Spans::from(""),
        Spans::from("Y - Delete | N - Cancel"),
    ])
    .block(Block::default().title("Confirm").borders(Borders::ALL))
    .style(Style::default().fg(Color::Red));

    frame.render_widget(prompt, popup_area);
}

/// Key handling, split out so tests can drive it without a terminal.
pub fn apply_key(state: &mut CatalogState, key: KeyEvent) -> Option<CatalogAction> {
    if let Some(id) = state.confirm_delete {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                state.confirm_delete = None;
                return Some(CatalogAction::Delete(id));
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                state.confirm_delete = None;
            }
            _ => {}
        }
        return None;
    }

    if let Some((id, buffer)) = &mut state.edit {
        match key.code {
            KeyCode::Esc => {
                state.edit = None;
            }
            KeyCode::Enter => {
                if buffer.is_empty() {
                    return None;
                }
                let action = match id {
                    None => CatalogAction::Create(buffer.clone()),
                    Some(id) => CatalogAction::Rename(CatalogEntry {
                        id: *id,
                        name: buffer.clone(),
                    }),
                };
                state.edit = None;
                return Some(action);
            }
            KeyCode::Char(c) => {
                buffer.push(c);
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(CatalogAction::Back),
        KeyCode::Tab | KeyCode::Right => Some(CatalogAction::SwitchKind(state.switch_kind(true))),
        KeyCode::BackTab | KeyCode::Left => {
            Some(CatalogAction::SwitchKind(state.switch_kind(false)))
        }
        KeyCode::Char('a') => {
            state.edit = Some((None, String::new()));
            None
        }
        KeyCode::Char('e') => {
            if let Some(entry) = state.selected_entry() {
                state.edit = Some((Some(entry.id), entry.name.clone()));
            }
            None
        }
        KeyCode::Char('d') => {
            state.confirm_delete = state.selected_entry().map(|e| e.id);
            None
        }
        KeyCode::Down => {
            state.next();
            None
        }
        KeyCode::Up => {
            state.previous();
            None
        }
        _ => None,
    }
}

pub fn handle_input(state: &mut CatalogState) -> Result<Option<CatalogAction>> {
    match poll_key()? {
        Some(key) => Ok(apply_key(state, key)),
        None => {
            state.toasts.tick(Instant::now());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry { id: 1, name: "Electronics".to_string() },
            CatalogEntry { id: 2, name: "Groceries".to_string() },
        ]
    }

    #[test]
    fn tab_cycles_through_the_three_lists() {
        let mut state = CatalogState::new();

        match apply_key(&mut state, key(KeyCode::Tab)) {
            Some(CatalogAction::SwitchKind(kind)) => assert_eq!(kind, CatalogKind::Category),
            _ => panic!("expected a switch"),
        }
        match apply_key(&mut state, key(KeyCode::Tab)) {
            Some(CatalogAction::SwitchKind(kind)) => assert_eq!(kind, CatalogKind::Brand),
            _ => panic!("expected a switch"),
        }
        match apply_key(&mut state, key(KeyCode::Tab)) {
            Some(CatalogAction::SwitchKind(kind)) => assert_eq!(kind, CatalogKind::ProductType),
            _ => panic!("expected a switch"),
        }
    }

    #[test]
    fn creating_an_entry_emits_the_typed_name() {
        let mut state = CatalogState::new();

        apply_key(&mut state, key(KeyCode::Char('a')));
        for c in "Tools".chars() {
            apply_key(&mut state, key(KeyCode::Char(c)));
        }

        match apply_key(&mut state, key(KeyCode::Enter)) {
            Some(CatalogAction::Create(name)) => assert_eq!(name, "Tools"),
            _ => panic!("expected a create action"),
        }
        assert!(state.edit.is_none());
    }

    #[test]
    fn empty_names_are_not_committed() {
        let mut state = CatalogState::new();

        apply_key(&mut state, key(KeyCode::Char('a')));
        assert!(apply_key(&mut state, key(KeyCode::Enter)).is_none());
        assert!(state.edit.is_some());
    }

    #[test]
    fn rename_prefills_the_existing_name() {
        let mut state = CatalogState::new();
        state.set_entries(entries());

        apply_key(&mut state, key(KeyCode::Char('e')));
        assert_eq!(state.edit, Some((Some(1), "Electronics".to_string())));

        apply_key(&mut state, key(KeyCode::Backspace));
        match apply_key(&mut state, key(KeyCode::Enter)) {
            Some(CatalogAction::Rename(entry)) => {
                assert_eq!(entry.id, 1);
                assert_eq!(entry.name, "Electronic");
            }
            _ => panic!("expected a rename action"),
        }
    }

    #[test]
    fn delete_asks_for_confirmation_first() {
        let mut state = CatalogState::new();
        state.set_entries(entries());
        apply_key(&mut state, key(KeyCode::Down));

        assert!(apply_key(&mut state, key(KeyCode::Char('d'))).is_none());
        match apply_key(&mut state, key(KeyCode::Char('y'))) {
            Some(CatalogAction::Delete(id)) => assert_eq!(id, 2),
            _ => panic!("expected a delete action"),
        }
    }
}
