use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{Client, Page};
use crate::ui::centered_rect;
use crate::ui::components::search_input::SearchInputState;

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Searchable, paged client selection modal owned by the invoice wizard.
pub struct ClientPickerState {
    search: SearchInputState,
    clients: Vec<Client>,
    table_state: TableState,
    page: usize,
    total_pages: usize,
    is_loading: bool,
}

pub enum ClientPickerAction {
    Cancel,
    Select(Client),
    Search(String),
    LoadNextPage,
}

impl ClientPickerState {
    pub fn new() -> Self {
        Self {
            search: SearchInputState::new(),
            clients: Vec::new(),
            table_state: TableState::default(),
            page: 0,
            total_pages: 0,
            is_loading: false,
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

    pub fn begin_loading(&mut self) {
        self.is_loading = true;
    }

    pub fn finish_loading(&mut self) {
        self.is_loading = false;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Replace the rows with a fresh first page (new search or initial load).
    pub fn reset_with(&mut self, page: Page<Client>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
        self.clients = page.items;
        self.table_state = TableState::default();
        if !self.clients.is_empty() {
            self.table_state.select(Some(0));
        }
    }

    /// Append a follow-up page below the rows already loaded.
    pub fn append(&mut self, page: Page<Client>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
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

    pub fn selected_client(&self) -> Option<&Client> {
        self.table_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn handle_input(&mut self, key: Option<KeyEvent>) -> Option<ClientPickerAction> {
        let Some(key) = key else {
            // Tick: a debounced query may have become ready.
            return self
                .search
                .take_ready(Instant::now(), SEARCH_DEBOUNCE)
                .map(ClientPickerAction::Search);
        };

        match key.code {
            KeyCode::Esc => Some(ClientPickerAction::Cancel),
            KeyCode::Enter => self
                .selected_client()
                .cloned()
                .map(ClientPickerAction::Select),
            KeyCode::Up => {
                self.previous();
                None
            }
            KeyCode::Down => {
                if self.at_end() && self.has_more() && !self.is_loading {
                    Some(ClientPickerAction::LoadNextPage)
                } else {
                    self.next();
                    None
                }
            }
            KeyCode::Char(_) | KeyCode::Backspace => {
                self.search.handle_input(key.code);
                None
            }
            _ => None,
        }
    }
}

pub fn render_client_picker<B: Backend>(frame: &mut Frame<B>, state: &mut ClientPickerState) {
    let area = centered_rect(80, 70, frame.size());
    frame.render_widget(Clear, area);

    let title = if state.is_loading {
        "Select Client (loading...)"
    } else {
        "Select Client"
    };
    let outer = Block::default().title(title).borders(Borders::ALL);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search
            Constraint::Min(3),    // Results
            Constraint::Length(1), // Help
        ])
        .split(inner);

    let search = Paragraph::new(state.search.display_string())
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(search, chunks[0]);

    let header_cells = ["Name", "Tax Id", "Email"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1);

    let rows = state.clients.iter().map(|client| {
        Row::new(vec![
            Cell::from(client.name.as_str()),
            Cell::from(client.tax_id.as_str()),
            Cell::from(client.email.as_str()),
        ])
        .height(1)
    });

    let table = Table::new(rows)
        .header(header)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Percentage(45),
            Constraint::Percentage(25),
            Constraint::Percentage(30),
        ]);
    frame.render_stateful_widget(table, chunks[1], &mut state.table_state);

    let help = Paragraph::new("Type to search | Enter - Select | Esc - Cancel")
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(help, chunks[2]);
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

    fn key(code: KeyCode) -> Option<KeyEvent> {
        Some(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn next_page_rows_append_after_current_ones() {
        let mut picker = ClientPickerState::new();
        picker.reset_with(page(vec![client(1, "a"), client(2, "b")], 1, 2));
        picker.append(page(vec![client(3, "c")], 2, 2));

        assert_eq!(picker.clients.len(), 3);
        assert_eq!(picker.clients[2].id, 3);
        assert!(!picker.has_more());
    }

    #[test]
    fn down_at_the_end_requests_the_next_page_once() {
        let mut picker = ClientPickerState::new();
        picker.reset_with(page(vec![client(1, "a")], 1, 3));

        assert!(matches!(
            picker.handle_input(key(KeyCode::Down)),
            Some(ClientPickerAction::LoadNextPage)
        ));

        // While the fetch is in flight the flag suppresses a second request.
        picker.begin_loading();
        assert!(picker.handle_input(key(KeyCode::Down)).is_none());
    }

    #[test]
    fn down_on_the_last_page_stays_put() {
        let mut picker = ClientPickerState::new();
        picker.reset_with(page(vec![client(1, "a"), client(2, "b")], 1, 1));

        picker.handle_input(key(KeyCode::Down));
        picker.handle_input(key(KeyCode::Down));
        assert_eq!(picker.table_state.selected(), Some(1));
    }

    #[test]
    fn enter_selects_the_highlighted_client() {
        let mut picker = ClientPickerState::new();
        picker.reset_with(page(vec![client(1, "a"), client(2, "b")], 1, 1));
        picker.handle_input(key(KeyCode::Down));

        match picker.handle_input(key(KeyCode::Enter)) {
            Some(ClientPickerAction::Select(selected)) => assert_eq!(selected.id, 2),
            _ => panic!("expected a selection"),
        }
    }

    #[test]
    fn new_search_resets_the_page_list() {
        let mut picker = ClientPickerState::new();
        picker.reset_with(page(vec![client(1, "a"), client(2, "b")], 1, 2));
        picker.append(page(vec![client(3, "c")], 2, 2));

        picker.reset_with(page(vec![client(9, "z")], 1, 1));
        assert_eq!(picker.clients.len(), 1);
        assert_eq!(picker.table_state.selected(), Some(0));
    }
}
