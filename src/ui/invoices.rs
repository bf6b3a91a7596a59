use std::time::Instant;

use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{Invoice, InvoiceStatus, Page};
use crate::ui::components::date_input::DateInputState;
use crate::ui::components::toast::{render_toast, ToastState};
use crate::ui::poll_key;

#[derive(Clone, Copy, PartialEq)]
enum DateFilter {
    From,
    To,
}

// Represents the state of the invoice table screen
pub struct InvoicesState {
    invoices: Vec<Invoice>,
    table_state: TableState,
    status_filter: Option<InvoiceStatus>,
    from_state: DateInputState,
    to_state: DateInputState,
    editing_filter: Option<DateFilter>,
    page: usize,
    total_pages: usize,
    total: usize,
    is_loading: bool,
    pub toasts: ToastState,
}

pub enum InvoiceAction {
    Quit,
    NewInvoice,
    EditInvoice(i32),
    /// Filters changed; fetch page 1 and replace the rows.
    Reload,
    /// Scrolled past the loaded rows; fetch the page after the current one.
    LoadNextPage,
    OpenClients,
    OpenCatalog,
}

impl InvoicesState {
    pub fn new() -> Self {
        Self {
            invoices: Vec::new(),
            table_state: TableState::default(),
            status_filter: None,
            from_state: DateInputState::new(None),
            to_state: DateInputState::new(None),
            editing_filter: None,
            page: 0,
            total_pages: 0,
            total: 0,
            is_loading: false,
            toasts: ToastState::new(),
        }
    }

    pub fn filters(&self) -> (Option<InvoiceStatus>, Option<NaiveDate>, Option<NaiveDate>) {
        (
            self.status_filter,
            self.from_state.value(),
            self.to_state.value(),
        )
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

    /// Replace the rows with a fresh first page.
    pub fn reset_with(&mut self, page: Page<Invoice>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
        self.total = page.total;
        self.invoices = page.items;
        self.table_state = TableState::default();
        if !self.invoices.is_empty() {
            self.table_state.select(Some(0));
        }
    }

    /// Append a follow-up page below the rows already loaded.
    pub fn append(&mut self, page: Page<Invoice>) {
        self.page = page.page;
        self.total_pages = page.total_pages;
        self.total = page.total;
        self.invoices.extend(page.items);
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    fn at_end(&self) -> bool {
        match self.table_state.selected() {
            Some(i) => i + 1 >= self.invoices.len(),
            None => true,
        }
    }

    fn next(&mut self) {
        if self.invoices.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => (i + 1).min(self.invoices.len() - 1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.invoices.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_invoice_id(&self) -> Option<i32> {
        self.table_state
            .selected()
            .and_then(|i| self.invoices.get(i))
            .map(|invoice| invoice.id)
    }

    /// All -> Draft -> Issued -> Paid -> Cancelled -> All.
    pub fn cycle_status_filter(&mut self) {
        self.status_filter = match self.status_filter {
            None => Some(InvoiceStatus::Draft),
            Some(InvoiceStatus::Draft) => Some(InvoiceStatus::Issued),
            Some(InvoiceStatus::Issued) => Some(InvoiceStatus::Paid),
            Some(InvoiceStatus::Paid) => Some(InvoiceStatus::Cancelled),
            Some(InvoiceStatus::Cancelled) => None,
        };
    }

    fn status_filter_label(&self) -> &'static str {
        match self.status_filter {
            None => "All",
            Some(status) => status.label(),
        }
    }
}

pub fn render_invoices<B: Backend>(frame: &mut Frame<B>, state: &mut InvoicesState) {
    let size = frame.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Filter bar
                Constraint::Min(3),    // Table
                Constraint::Length(3), // Toast
                Constraint::Length(3), // Key help
            ]
            .as_ref(),
        )
        .split(size);

    render_filter_bar(frame, state, chunks[0]);

    let header_cells = ["Number", "Date", "Client", "Status", "Total"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = state.invoices.iter().map(|invoice| {
        let cells = vec![
            Cell::from(invoice.number.as_str()),
            Cell::from(invoice.date.format("%Y-%m-%d").to_string()),
            Cell::from(invoice.client_name.as_str()),
            Cell::from(invoice.status.label()),
            Cell::from(format!("{:.2}", invoice.total)),
        ];
        Row::new(cells).height(1)
    });

    let title = if state.is_loading {
        "Invoices (loading...)".to_string()
    } else {
        format!(
            "Invoices ({} of {} loaded)",
            state.invoices.len(),
            state.total
        )
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
            Constraint::Percentage(15),
            Constraint::Percentage(15),
            Constraint::Percentage(35),
            Constraint::Percentage(15),
            Constraint::Percentage(20),
        ]);

    frame.render_stateful_widget(table, chunks[1], &mut state.table_state);

    render_toast(frame, chunks[2], &state.toasts);

    let buttons = Paragraph::new(
        "<N> New | <E> Edit | <F> Status filter | <[> From | <]> To | <C> Clients | <T> Catalog | <Q> Quit",
    )
    .block(Block::default().borders(Borders::TOP))
    .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[3]);
}

fn render_filter_bar<B: Backend>(
    frame: &mut Frame<B>,
    state: &InvoicesState,
    area: tui::layout::Rect,
) {
    let highlight = |active: bool| {
        if active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let text = format!(
        "Status: {} | From: {} | To: {}",
        state.status_filter_label(),
        state.from_state.display_string(),
        state.to_state.display_string(),
    );

    let bar = Paragraph::new(text)
        .style(highlight(state.editing_filter.is_some()))
        .block(Block::default().title("Filters").borders(Borders::ALL));
    frame.render_widget(bar, area);
}

/// Key handling, split out so tests can drive it without a terminal.
pub fn apply_key(state: &mut InvoicesState, key: KeyEvent) -> Option<InvoiceAction> {
    if let Some(which) = state.editing_filter {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                state.from_state.editing = false;
                state.to_state.editing = false;
                state.editing_filter = None;
                return Some(InvoiceAction::Reload);
            }
            code => {
                let input = match which {
                    DateFilter::From => &mut state.from_state,
                    DateFilter::To => &mut state.to_state,
                };
                input.handle_input(code);
                // Delete ends the edit by clearing the bound.
                if !input.editing {
                    state.editing_filter = None;
                    return Some(InvoiceAction::Reload);
                }
            }
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') => Some(InvoiceAction::Quit),
        KeyCode::Char('n') => Some(InvoiceAction::NewInvoice),
        KeyCode::Char('e') | KeyCode::Enter => {
            state.selected_invoice_id().map(InvoiceAction::EditInvoice)
        }
        KeyCode::Char('c') => Some(InvoiceAction::OpenClients),
        KeyCode::Char('t') => Some(InvoiceAction::OpenCatalog),
        KeyCode::Char('r') => Some(InvoiceAction::Reload),
        KeyCode::Char('f') => {
            state.cycle_status_filter();
            Some(InvoiceAction::Reload)
        }
        KeyCode::Char('[') => {
            state.editing_filter = Some(DateFilter::From);
            state.from_state.toggle_editing();
            None
        }
        KeyCode::Char(']') => {
            state.editing_filter = Some(DateFilter::To);
            state.to_state.toggle_editing();
            None
        }
        KeyCode::Down => {
            if state.at_end() && state.has_more() && !state.is_loading {
                Some(InvoiceAction::LoadNextPage)
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

pub fn handle_input(state: &mut InvoicesState) -> Result<Option<InvoiceAction>> {
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

    fn invoice(id: i32, number: &str) -> Invoice {
        Invoice {
            id,
            number: number.to_string(),
            client_id: 1,
            client_name: "ACME".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            status: InvoiceStatus::Draft,
            payment_method_id: 1,
            salesperson_id: None,
            general_discount: 0.0,
            lines: Vec::new(),
            total: 100.0,
        }
    }

    fn page(items: Vec<Invoice>, page: usize, total_pages: usize) -> Page<Invoice> {
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
    fn status_filter_cycles_through_all_states_and_back() {
        let mut state = InvoicesState::new();
        assert_eq!(state.filters().0, None);

        let mut seen = Vec::new();
        for _ in 0..5 {
            state.cycle_status_filter();
            seen.push(state.filters().0);
        }

        assert_eq!(
            seen,
            vec![
                Some(InvoiceStatus::Draft),
                Some(InvoiceStatus::Issued),
                Some(InvoiceStatus::Paid),
                Some(InvoiceStatus::Cancelled),
                None,
            ]
        );
    }

    #[test]
    fn changing_the_filter_requests_a_reload() {
        let mut state = InvoicesState::new();
        state.reset_with(page(vec![invoice(1, "F-1")], 1, 1));

        assert!(matches!(
            apply_key(&mut state, key(KeyCode::Char('f'))),
            Some(InvoiceAction::Reload)
        ));
        assert_eq!(state.filters().0, Some(InvoiceStatus::Draft));
    }

    #[test]
    fn scrolling_past_the_end_requests_the_next_page() {
        let mut state = InvoicesState::new();
        state.reset_with(page(vec![invoice(1, "F-1")], 1, 2));

        assert!(matches!(
            apply_key(&mut state, key(KeyCode::Down)),
            Some(InvoiceAction::LoadNextPage)
        ));

        state.begin_loading();
        assert!(apply_key(&mut state, key(KeyCode::Down)).is_none());

        state.finish_loading();
        state.append(page(vec![invoice(2, "F-2")], 2, 2));
        assert_eq!(state.invoices.len(), 2);

        // Last page: down moves the selection but never refetches.
        apply_key(&mut state, key(KeyCode::Down));
        assert!(apply_key(&mut state, key(KeyCode::Down)).is_none());
        assert_eq!(state.table_state.selected(), Some(1));
    }

    #[test]
    fn fresh_page_replaces_rows_and_selection() {
        let mut state = InvoicesState::new();
        state.reset_with(page(vec![invoice(1, "F-1"), invoice(2, "F-2")], 1, 2));
        state.append(page(vec![invoice(3, "F-3")], 2, 2));
        assert_eq!(state.invoices.len(), 3);

        state.reset_with(page(vec![invoice(9, "F-9")], 1, 1));
        assert_eq!(state.invoices.len(), 1);
        assert_eq!(state.table_state.selected(), Some(0));
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn committing_a_date_filter_reloads() {
        let mut state = InvoicesState::new();

        apply_key(&mut state, key(KeyCode::Char('[')));
        for c in "20240101".chars() {
            apply_key(&mut state, key(KeyCode::Char(c)));
        }
        let action = apply_key(&mut state, key(KeyCode::Enter));

        assert!(matches!(action, Some(InvoiceAction::Reload)));
        assert_eq!(
            state.filters().1,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
    }

    #[test]
    fn clearing_a_date_filter_reloads_unbounded() {
        let mut state = InvoicesState::new();

        apply_key(&mut state, key(KeyCode::Char('[')));
        let action = apply_key(&mut state, key(KeyCode::Delete));

        assert!(matches!(action, Some(InvoiceAction::Reload)));
        assert_eq!(state.filters().1, None);
    }
}
