use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Spans,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{Client, Page};
use crate::ui::components::search_input::SearchInputState;
use crate::ui::components::toast::{render_toast, ToastState};
use crate::ui::{centered_rect, poll_key};

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

// Represents the state of the client list screen
pub struct ClientsState {
    search: SearchInputState,
    searching: bool,
    clients: Vec<Client>,
    table_state: TableState,
    page: usize,
    total_pages: usize,
    total: usize,
    is_loading: bool,
    confirm_delete: Option<i32>,
    pub toasts: ToastState,
}

pub enum ClientAction {
    Back,
    NewClient,
    EditClient(i32),
    DeleteClient(i32),
    /// Debounced search query became ready; fetch page 1 with it.
    Search(String),
    LoadNextPage,
}

impl ClientsState {
    pub fn new() -> Self {
        Self {
            search: SearchInputState::new(),
            searching: false,
            clients: Vec::new(),
            table_state: TableState::default(),
            page: 0,
            total_pages: 0,
            total: 0,
            is_loading: false,
            confirm_delete: None,
            toasts: ToastState::new(),
        }
    }

    pub fn committed_search(&self) -> Option<&str> {
        let committed = self.search.committed();
        if committed.is_empty() {
            None
        } else {
            Some(committed)
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn begin_loading(&mut self) {
        self.is_loading = true;
    }

    pub fn finish_loading(&mut self) {
        self.is_loading = false;
    }

    pub fn reset_with(&mut self, page: Page<Client>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
        self.total = page.total;
        self.clients = page.items;
        self.table_state = TableState::default();
        if !self.clients.is_empty() {
            self.table_state.select(Some(0));
        }
    }

    pub fn append(&mut self, page: Page<Client>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
        self.total = page.total;
        self.clients.extend(page.items);
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    fn at_end(&self) -> bool {
        match self.table_state.selected() {
            Some(i) => i + 1 >= self.clients.len(),
            None => true,
        }
    }

    fn next(&mut self) {
        if self.clients.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => (i + 1).min(self.clients.len() - 1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.clients.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_client_id(&self) -> Option<i32> {
        self.table_state
            .selected()
            .and_then(|i| self.clients.get(i))
            .map(|client| client.id)
    }

    fn selected_client_name(&self) -> Option<&str> {
        self.table_state
            .selected()
            .and_then(|i| self.clients.get(i))
            .map(|client| client.name.as_str())
    }
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Search
                Constraint::Min(3),    // Table
                Constraint::Length(3), // Toast
                Constraint::Length(3), // Key help
            ]
            .as_ref(),
        )
        .split(frame.size());

    let search_value = if state.searching {
        state.search.display_string()
    } else if state.search.value().is_empty() {
        "press / to search".to_string()
    } else {
        state.search.value().to_string()
    };
    let search_style = if state.searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    let search = Paragraph::new(search_value)
        .style(search_style)
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(search, chunks[0]);

    let header_cells = ["Name", "Tax Id", "Email", "Phone"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = state.clients.iter().map(|client| {
        Row::new(vec![
            Cell::from(client.name.as_str()),
            Cell::from(client.tax_id.as_str()),
            Cell::from(client.email.as_str()),
            Cell::from(client.phone.as_str()),
        ])
        .height(1)
    });

    let title = if state.is_loading {
        "Clients (loading...)".to_string()
    } else {
        format!("Clients ({} of {} loaded)", state.clients.len(), state.total)
    };
    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Percentage(35),
            Constraint::Percentage(20),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
        ]);
    frame.render_stateful_widget(table, chunks[1], &mut state.table_state);

    render_toast(frame, chunks[2], &state.toasts);

    let help = if state.searching {
        "Type to search | Enter - Done | Esc - Close search"
    } else {
        "</> Search | <N> New | <E> Edit | <D> Delete | <Esc> Back"
    };
    let buttons = Paragraph::new(help)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[3]);

    if state.confirm_delete.is_some() {
        render_delete_confirm(frame, frame.size(), state.selected_client_name().unwrap_or(""));
    }
}

fn render_delete_confirm<B: Backend>(frame: &mut Frame<B>, size: Rect, name: &str) {
    let popup_area = centered_rect(60, 20, size);
    frame.render_widget(Clear, popup_area);

    let prompt = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(format!("Delete client \"{name}\"?")),
        Spans::from(""),
        Spans::from("Y - Delete | N - Cancel"),
    ])
    .block(Block::default().title("Confirm").borders(Borders::ALL))
    .style(Style::default().fg(Color::Red));

    frame.render_widget(prompt, popup_area);
}

/// Key handling, split out so tests can drive it without a terminal.
pub fn apply_key(state: &mut ClientsState, key: KeyEvent) -> Option<ClientAction> {
    if let Some(id) = state.confirm_delete {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                state.confirm_delete = None;
                return Some(ClientAction::DeleteClient(id));
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                state.confirm_delete = None;
            }
            _ => {}
        }
        return None;
    }

    if state.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                state.searching = false;
            }
            code => state.search.handle_input(code),
        }
        return None;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(ClientAction::Back),
        KeyCode::Char('/') => {
            state.searching = true;
            None
        }
        KeyCode::Char('n') => Some(ClientAction::NewClient),
        KeyCode::Char('e') | KeyCode::Enter => {
            state.selected_client_id().map(ClientAction::EditClient)
        }
        KeyCode::Char('d') => {
            state.confirm_delete = state.selected_client_id();
            None
        }
        KeyCode::Char('x') => {
            // Clear the search without entering search mode.
            state.search.clear();
            None
        }
        KeyCode::Down => {
            if state.at_end() && state.has_more() && !state.is_loading {
                Some(ClientAction::LoadNextPage)
            } else {
                state.next();
                None
            }
        }
        KeyCode::Up => {
            state.previous();
            None
        }
        _ => None,
    }
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    match poll_key()? {
        Some(key) => Ok(apply_key(state, key)),
        None => {
            let now = Instant::now();
            state.toasts.tick(now);
            Ok(state
                .search
                .take_ready(now, SEARCH_DEBOUNCE)
                .map(ClientAction::Search))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn client(id: i32, name: &str) -> Client {
        Client {
            id,
            name: name.to_string(),
            tax_id: format!("TAX-{id}"),
            document_type_id: None,
            email: String::new(),
            phone: String::new(),
            address: None,
        }
    }

    fn page(items: Vec<Client>, page: usize, total_pages: usize) -> Page<Client> {
        let total = items.len();
        Page {
            items,
            page,
            total_pages,
            total,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typed_characters_go_to_the_search_box_in_search_mode() {
        let mut state = ClientsState::new();
        state.reset_with(page(vec![client(1, "a")], 1, 1));

        apply_key(&mut state, key(KeyCode::Char('/')));
        // 'n' must not be read as "new client" while searching.
        assert!(apply_key(&mut state, key(KeyCode::Char('n'))).is_none());
        assert_eq!(state.search.value(), "n");

        apply_key(&mut state, key(KeyCode::Esc));
        assert!(!state.searching);
    }

    #[test]
    fn delete_asks_for_confirmation_first() {
        let mut state = ClientsState::new();
        state.reset_with(page(vec![client(5, "acme")], 1, 1));

        assert!(apply_key(&mut state, key(KeyCode::Char('d'))).is_none());
        assert_eq!(state.confirm_delete, Some(5));

        match apply_key(&mut state, key(KeyCode::Char('y'))) {
            Some(ClientAction::DeleteClient(id)) => assert_eq!(id, 5),
            _ => panic!("expected a delete action"),
        }
    }

    #[test]
    fn declining_the_confirmation_deletes_nothing() {
        let mut state = ClientsState::new();
        state.reset_with(page(vec![client(5, "acme")], 1, 1));

        apply_key(&mut state, key(KeyCode::Char('d')));
        assert!(apply_key(&mut state, key(KeyCode::Char('n'))).is_none());
        assert_eq!(state.confirm_delete, None);
    }

    #[test]
    fn scrolling_past_the_end_requests_the_next_page() {
        let mut state = ClientsState::new();
        state.reset_with(page(vec![client(1, "a")], 1, 2));

        assert!(matches!(
            apply_key(&mut state, key(KeyCode::Down)),
            Some(ClientAction::LoadNextPage)
        ));

        state.begin_loading();
        assert!(apply_key(&mut state, key(KeyCode::Down)).is_none());
    }
}
