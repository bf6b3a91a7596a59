use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{Page, Product};
use crate::ui::centered_rect;
use crate::ui::components::search_input::SearchInputState;

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Searchable, paged product selection modal owned by the invoice wizard.
/// Services display "service" in the stock column; physical products show
/// their stock on hand.
pub struct ProductPickerState {
    search: SearchInputState,
    products: Vec<Product>,
    table_state: TableState,
    page: usize,
    total_pages: usize,
    is_loading: bool,
}

pub enum ProductPickerAction {
    Cancel,
    Select(Product),
    Search(String),
    LoadNextPage,
}

impl ProductPickerState {
    pub fn new() -> Self {
        Self {
            search: SearchInputState::new(),
            products: Vec::new(),
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

    pub fn reset_with(&mut self, page: Page<Product>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
        self.products = page.items;
        self.table_state = TableState::default();
        if !self.products.is_empty() {
            self.table_state.select(Some(0));
        }
    }

    pub fn append(&mut self, page: Page<Product>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
        self.products.extend(page.items);
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    fn at_end(&self) -> bool {
        match self.table_state.selected() {
            Some(i) => i + 1 >= self.products.len(),
            None => true,
        }
    }

    fn next(&mut self) {
        if self.products.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => (i + 1).min(self.products.len() - 1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.products.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_product(&self) -> Option<&Product> {
        self.table_state
            .selected()
            .and_then(|i| self.products.get(i))
    }

    pub fn handle_input(&mut self, key: Option<KeyEvent>) -> Option<ProductPickerAction> {
        let Some(key) = key else {
            return self
                .search
                .take_ready(Instant::now(), SEARCH_DEBOUNCE)
                .map(ProductPickerAction::Search);
        };

        match key.code {
            KeyCode::Esc => Some(ProductPickerAction::Cancel),
            KeyCode::Enter => self
                .selected_product()
                .cloned()
                .map(ProductPickerAction::Select),
            KeyCode::Up => {
                self.previous();
                None
            }
            KeyCode::Down => {
                if self.at_end() && self.has_more() && !self.is_loading {
                    Some(ProductPickerAction::LoadNextPage)
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

fn stock_cell(product: &Product) -> String {
    if product.is_service {
        "service".to_string()
    } else {
        format!("{:.0}", product.stock)
    }
}

pub fn render_product_picker<B: Backend>(frame: &mut Frame<B>, state: &mut ProductPickerState) {
    let area = centered_rect(80, 70, frame.size());
    frame.render_widget(Clear, area);

    let title = if state.is_loading {
        "Add Product (loading...)"
    } else {
        "Add Product"
    };
    let outer = Block::default().title(title).borders(Borders::ALL);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let search = Paragraph::new(state.search.display_string())
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(search, chunks[0]);

    let header_cells = ["Code", "Name", "Price", "Stock"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1);

    let rows = state.products.iter().map(|product| {
        Row::new(vec![
            Cell::from(product.code.as_str()),
            Cell::from(product.name.as_str()),
            Cell::from(format!("{:.2}", product.price)),
            Cell::from(stock_cell(product)),
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
            Constraint::Percentage(15),
            Constraint::Percentage(45),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ]);
    frame.render_stateful_widget(table, chunks[1], &mut state.table_state);

    let help = Paragraph::new("Type to search | Enter - Add to invoice | Esc - Cancel")
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(help, chunks[2]);
}
