use anyhow::Result;
use chrono::Local;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::ApiClient;
use crate::models::{Invoice, InvoiceLine, InvoiceStatus, PaymentMethod, Product, Salesperson};
use crate::totals::{invoice_subtotal, invoice_total, line_subtotal};
use crate::ui::client_picker::{
    ClientPickerAction, ClientPickerState, render_client_picker,
};
use crate::ui::components::date_input::DateInputState;
use crate::ui::product_picker::{
    ProductPickerAction, ProductPickerState, render_product_picker,
};
use crate::ui::{centered_rect, poll_key};

// Represents a field in the invoice form
#[derive(Clone, Copy, PartialEq)]
pub enum InvoiceField {
    Client,
    Date,
    PaymentMethod,
    Salesperson,
    GeneralDiscount,
    Lines,
}

// Represents a field being edited on a line
#[derive(Clone, Copy, PartialEq)]
pub enum LineField {
    Quantity,
    Discount,
}

// Represents the wizard state
pub struct InvoiceWizardState {
    invoice_id: Option<i32>,
    number: String,
    status: InvoiceStatus,
    client: Option<(i32, String)>,
    date_state: DateInputState,
    payment_methods: Vec<PaymentMethod>,
    payment_idx: usize,
    salespeople: Vec<Salesperson>,
    salesperson_idx: Option<usize>,
    general_discount: f64,
    lines: Vec<InvoiceLine>,
    lines_list_state: ListState,
    current_field: InvoiceField,
    editing: bool,
    active_input: String,
    editing_line: Option<(usize, LineField, String)>,
    // Armed when a picked product is already on the invoice; holds the line
    // index and the quantity to merge into it.
    pending_merge: Option<(usize, f64)>,
    client_picker: Option<ClientPickerState>,
    product_picker: Option<ProductPickerState>,
    show_error: Option<String>,
}

impl InvoiceWizardState {
    pub fn new(
        existing: Option<Invoice>,
        payment_methods: Vec<PaymentMethod>,
        salespeople: Vec<Salesperson>,
    ) -> Self {
        let today = Local::now().date_naive();

        let mut state = Self {
            invoice_id: None,
            number: String::new(),
            status: InvoiceStatus::Draft,
            client: None,
            date_state: DateInputState::new(Some(today)),
            payment_methods,
            payment_idx: 0,
            salespeople,
            salesperson_idx: None,
            general_discount: 0.0,
            lines: Vec::new(),
            lines_list_state: ListState::default(),
            current_field: InvoiceField::Client,
            editing: false,
            active_input: String::new(),
            editing_line: None,
            pending_merge: None,
            client_picker: None,
            product_picker: None,
            show_error: None,
        };

        if let Some(invoice) = existing {
            state.invoice_id = Some(invoice.id);
            state.number = invoice.number;
            state.status = invoice.status;
            state.client = Some((invoice.client_id, invoice.client_name));
            state.date_state = DateInputState::new(Some(invoice.date));
            state.payment_idx = state
                .payment_methods
                .iter()
                .position(|m| m.id == invoice.payment_method_id)
                .unwrap_or(0);
            state.salesperson_idx = invoice
                .salesperson_id
                .and_then(|id| state.salespeople.iter().position(|s| s.id == id));
            state.general_discount = invoice.general_discount;
            state.lines = invoice.lines;
            if !state.lines.is_empty() {
                state.lines_list_state.select(Some(0));
            }
        }

        state
    }

    pub fn is_editing_existing(&self) -> bool {
        self.invoice_id.is_some()
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;

        if self.editing {
            match self.current_field {
                InvoiceField::Date => self.date_state.toggle_editing(),
                InvoiceField::GeneralDiscount => {
                    self.active_input = self.general_discount.to_string();
                }
                _ => {}
            }
        } else {
            self.date_state.editing = false;
            self.editing_line = None;
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            InvoiceField::Client => InvoiceField::Date,
            InvoiceField::Date => InvoiceField::PaymentMethod,
            InvoiceField::PaymentMethod => InvoiceField::Salesperson,
            InvoiceField::Salesperson => InvoiceField::GeneralDiscount,
            InvoiceField::GeneralDiscount => InvoiceField::Lines,
            InvoiceField::Lines => InvoiceField::Client,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            InvoiceField::Client => InvoiceField::Lines,
            InvoiceField::Date => InvoiceField::Client,
            InvoiceField::PaymentMethod => InvoiceField::Date,
            InvoiceField::Salesperson => InvoiceField::PaymentMethod,
            InvoiceField::GeneralDiscount => InvoiceField::Salesperson,
            InvoiceField::Lines => InvoiceField::GeneralDiscount,
        };
    }

    pub fn set_client(&mut self, id: i32, name: String) {
        self.client = Some((id, name));
    }

    pub fn cycle_payment_method(&mut self, forward: bool) {
        if self.payment_methods.is_empty() {
            return;
        }
        let len = self.payment_methods.len();
        self.payment_idx = if forward {
            (self.payment_idx + 1) % len
        } else {
            (self.payment_idx + len - 1) % len
        };
    }

    pub fn cycle_salesperson(&mut self, forward: bool) {
        if self.salespeople.is_empty() {
            return;
        }
        let len = self.salespeople.len();
        // None sits between the last and first entries in the cycle.
        self.salesperson_idx = match (self.salesperson_idx, forward) {
            (None, true) => Some(0),
            (None, false) => Some(len - 1),
            (Some(i), true) if i + 1 < len => Some(i + 1),
            (Some(_), true) => None,
            (Some(0), false) => None,
            (Some(i), false) => Some(i - 1),
        };
    }

    /// Add a picked product as a new line, or arm the merge prompt when the
    /// product is already on the invoice.
    pub fn add_product(&mut self, product: &Product) {
        if let Some(idx) = self.lines.iter().position(|l| l.product_id == product.id) {
            self.pending_merge = Some((idx, 1.0));
            return;
        }

        self.lines.push(InvoiceLine {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity: 1.0,
            discount: 0.0,
        });
        self.lines_list_state.select(Some(self.lines.len() - 1));
    }

    pub fn pending_merge(&self) -> Option<(usize, f64)> {
        self.pending_merge
    }

    pub fn confirm_merge(&mut self) {
        if let Some((idx, quantity)) = self.pending_merge.take() {
            if let Some(line) = self.lines.get_mut(idx) {
                line.quantity += quantity;
                self.lines_list_state.select(Some(idx));
            }
        }
    }

    pub fn decline_merge(&mut self) {
        self.pending_merge = None;
    }

    pub fn edit_selected_line(&mut self) {
        if let Some(selected) = self.lines_list_state.selected() {
            if selected < self.lines.len() {
                self.editing_line = Some((
                    selected,
                    LineField::Quantity,
                    self.lines[selected].quantity.to_string(),
                ));
            }
        }
    }

    pub fn delete_selected_line(&mut self) {
        if let Some(selected) = self.lines_list_state.selected() {
            if selected < self.lines.len() {
                self.lines.remove(selected);

                if !self.lines.is_empty() {
                    let new_selection = if selected >= self.lines.len() {
                        self.lines.len() - 1
                    } else {
                        selected
                    };
                    self.lines_list_state.select(Some(new_selection));
                } else {
                    self.lines_list_state.select(None);
                }

                self.editing_line = None;
            }
        }
    }

    /// Advance quantity -> discount -> done, validating each value as it is
    /// committed.
    pub fn next_field_in_line(&mut self) {
        if let Some((idx, field, value)) = &self.editing_line {
            let idx = *idx;
            match field {
                LineField::Quantity => match value.parse::<f64>() {
                    Ok(quantity) if quantity > 0.0 => {
                        if idx < self.lines.len() {
                            self.lines[idx].quantity = quantity;
                            self.editing_line = Some((
                                idx,
                                LineField::Discount,
                                self.lines[idx].discount.to_string(),
                            ));
                        }
                    }
                    _ => {
                        self.show_error =
                            Some("Invalid quantity. Enter a number greater than 0.".to_string());
                    }
                },
                LineField::Discount => match value.parse::<f64>() {
                    Ok(discount) if (0.0..=100.0).contains(&discount) => {
                        if idx < self.lines.len() {
                            self.lines[idx].discount = discount;
                            self.editing_line = None;
                        }
                    }
                    _ => {
                        self.show_error =
                            Some("Invalid discount. Enter a percent from 0 to 100.".to_string());
                    }
                },
            }
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            InvoiceField::Date => self.date_state.handle_input(key),
            InvoiceField::GeneralDiscount => match key {
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                    self.active_input.push(c);
                }
                KeyCode::Backspace => {
                    self.active_input.pop();
                }
                _ => {}
            },
            InvoiceField::Lines => {
                if let Some((_, _, ref mut value)) = self.editing_line {
                    match key {
                        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                            value.push(c);
                        }
                        KeyCode::Backspace => {
                            value.pop();
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    pub fn to_invoice(&self) -> Invoice {
        let (client_id, client_name) = self
            .client
            .clone()
            .unwrap_or((0, String::new()));

        Invoice {
            id: self.invoice_id.unwrap_or(0), // Backend assigns ids for new invoices
            number: self.number.clone(),
            client_id,
            client_name,
            date: self
                .date_state
                .value()
                .unwrap_or_else(|| Local::now().date_naive()),
            status: self.status,
            payment_method_id: self
                .payment_methods
                .get(self.payment_idx)
                .map(|m| m.id)
                .unwrap_or(0),
            salesperson_id: self
                .salesperson_idx
                .and_then(|i| self.salespeople.get(i))
                .map(|s| s.id),
            general_discount: self.general_discount,
            lines: self.lines.clone(),
            total: invoice_total(&self.lines, self.general_discount),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.client.is_some()
            && !self.lines.is_empty()
            && (0.0..=100.0).contains(&self.general_discount)
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.show_error = Some(message.into());
    }
}

pub enum InvoiceWizardAction {
    Cancel,
    Save(Invoice),
}

pub fn render_invoice_wizard<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // Title
                Constraint::Min(10),   // Form
                Constraint::Length(3), // Help
            ]
            .as_ref(),
        )
        .split(frame.size());

    let title_text = if state.is_editing_existing() {
        format!("Edit Invoice {}", state.number)
    } else {
        "New Invoice".to_string()
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    render_form(frame, state, chunks[1]);

    let help_text = match (state.editing, state.current_field) {
        (false, InvoiceField::Client) => {
            "Enter - Pick client | Up/Down - Navigate | S - Save | Esc - Cancel"
        }
        (false, InvoiceField::PaymentMethod | InvoiceField::Salesperson) => {
            "Left/Right - Change | Up/Down - Navigate | S - Save | Esc - Cancel"
        }
        (false, _) => "Enter - Edit field | Up/Down - Navigate | S - Save | Esc - Cancel",
        (true, InvoiceField::Date) => {
            "Enter - Done | Left/Right - Date part | Del - Clear | Esc - Cancel editing"
        }
        (true, InvoiceField::GeneralDiscount) => "Enter - Save field | Esc - Cancel editing",
        (true, InvoiceField::Lines) => {
            if state.editing_line.is_some() {
                "Enter/Tab - Next field | Esc - Cancel editing"
            } else {
                "A - Add product | E - Edit line | D - Delete line | Enter - Done | Esc - Cancel"
            }
        }
        (true, _) => "Esc - Cancel editing",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[2]);

    // Modals stack over the form: pickers first, then the merge prompt, then
    // any error popup.
    if let Some(picker) = &mut state.client_picker {
        render_client_picker(frame, picker);
    }
    if let Some(picker) = &mut state.product_picker {
        render_product_picker(frame, picker);
    }
    if let Some((idx, quantity)) = state.pending_merge {
        if let Some(line) = state.lines.get(idx) {
            render_merge_prompt(frame, frame.size(), &line.product_name, quantity);
        }
    }
    if let Some(error) = &state.show_error {
        render_error(frame, frame.size(), error);
    }
}

fn field_style(state: &InvoiceWizardState, field: InvoiceField) -> Style {
    if state.current_field == field {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn render_form<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceWizardState, area: Rect) {
    let form_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Client
                Constraint::Length(3), // Date
                Constraint::Length(3), // Payment method
                Constraint::Length(3), // Salesperson
                Constraint::Length(3), // General discount
                Constraint::Min(5),    // Lines
                Constraint::Length(5), // Totals
            ]
            .as_ref(),
        )
        .split(area);

    let client_value = match &state.client {
        Some((_, name)) => name.clone(),
        None => "<none selected>".to_string(),
    };
    let client = Paragraph::new(Spans::from(vec![
        Span::styled("Client: ", field_style(state, InvoiceField::Client)),
        Span::raw(client_value),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(client, form_chunks[0]);

    let date = Paragraph::new(Spans::from(vec![
        Span::styled("Date: ", field_style(state, InvoiceField::Date)),
        Span::raw(state.date_state.display_string()),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(date, form_chunks[1]);

    let payment_value = state
        .payment_methods
        .get(state.payment_idx)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| "<none>".to_string());
    let payment = Paragraph::new(Spans::from(vec![
        Span::styled(
            "Payment Method: ",
            field_style(state, InvoiceField::PaymentMethod),
        ),
        Span::raw(format!("< {payment_value} >")),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(payment, form_chunks[2]);

    let salesperson_value = state
        .salesperson_idx
        .and_then(|i| state.salespeople.get(i))
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "<none>".to_string());
    let salesperson = Paragraph::new(Spans::from(vec![
        Span::styled(
            "Salesperson: ",
            field_style(state, InvoiceField::Salesperson),
        ),
        Span::raw(format!("< {salesperson_value} >")),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(salesperson, form_chunks[3]);

    let discount_value = if state.current_field == InvoiceField::GeneralDiscount && state.editing {
        format!("{}|", state.active_input)
    } else {
        format!("{:.1}", state.general_discount)
    };
    let discount = Paragraph::new(Spans::from(vec![
        Span::styled(
            "General Discount %: ",
            field_style(state, InvoiceField::GeneralDiscount),
        ),
        Span::raw(discount_value),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(discount, form_chunks[4]);

    render_lines(frame, state, form_chunks[5]);
    render_totals(frame, state, form_chunks[6]);
}

fn render_lines<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceWizardState, area: Rect) {
    let lines_block = Block::default()
        .title("Line Items")
        .borders(Borders::ALL)
        .style(field_style(state, InvoiceField::Lines));

    if state.current_field == InvoiceField::Lines && state.editing {
        if let Some((idx, field, value)) = &state.editing_line {
            let inner = lines_block.inner(area);
            frame.render_widget(lines_block, area);

            let edit_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Product
                    Constraint::Length(3), // Quantity
                    Constraint::Length(3), // Discount
                ])
                .split(inner);

            let product_name = state
                .lines
                .get(*idx)
                .map(|l| l.product_name.as_str())
                .unwrap_or("");
            frame.render_widget(Paragraph::new(format!("Product: {product_name}")), edit_chunks[0]);

            let quantity_value = if *field == LineField::Quantity {
                format!("{value}|")
            } else if *idx < state.lines.len() {
                state.lines[*idx].quantity.to_string()
            } else {
                String::new()
            };
            let quantity_style = if *field == LineField::Quantity {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let quantity = Paragraph::new(Spans::from(vec![
                Span::raw("Quantity: "),
                Span::styled(quantity_value, quantity_style),
            ]))
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(quantity, edit_chunks[1]);

            let discount_value = if *field == LineField::Discount {
                format!("{value}|")
            } else if *idx < state.lines.len() {
                state.lines[*idx].discount.to_string()
            } else {
                String::new()
            };
            let discount_style = if *field == LineField::Discount {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let discount = Paragraph::new(Spans::from(vec![
                Span::raw("Discount %: "),
                Span::styled(discount_value, discount_style),
            ]))
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(discount, edit_chunks[2]);

            return;
        }

        let items = state
            .lines
            .iter()
            .map(|line| ListItem::new(format_line(line)))
            .collect::<Vec<_>>();

        let list = List::new(items)
            .block(lines_block)
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));

        frame.render_stateful_widget(list, area, &mut state.lines_list_state);
        return;
    }

    let mut content = Vec::new();
    if state.lines.is_empty() {
        content.push(Spans::from("No products added yet"));
    } else {
        for line in &state.lines {
            content.push(Spans::from(format!("- {}", format_line(line))));
        }
    }

    let paragraph = Paragraph::new(content).block(lines_block);
    frame.render_widget(paragraph, area);
}

fn format_line(line: &InvoiceLine) -> String {
    if line.discount > 0.0 {
        format!(
            "{} x {} @ {:.2} (-{:.1}%) = {:.2}",
            line.quantity,
            line.product_name,
            line.unit_price,
            line.discount,
            line_subtotal(line)
        )
    } else {
        format!(
            "{} x {} @ {:.2} = {:.2}",
            line.quantity,
            line.product_name,
            line.unit_price,
            line_subtotal(line)
        )
    }
}

fn render_totals<B: Backend>(frame: &mut Frame<B>, state: &InvoiceWizardState, area: Rect) {
    let subtotal = invoice_subtotal(&state.lines);
    let total = invoice_total(&state.lines, state.general_discount);

    let totals = Paragraph::new(vec![
        Spans::from(format!("Subtotal:        {subtotal:.2}")),
        Spans::from(format!(
            "General Discount: -{:.2}",
            subtotal - total
        )),
        Spans::from(Span::styled(
            format!("Total:           {total:.2}"),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ])
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(totals, area);
}

fn render_merge_prompt<B: Backend>(frame: &mut Frame<B>, size: Rect, product: &str, quantity: f64) {
    let popup_area = centered_rect(60, 20, size);
    frame.render_widget(Clear, popup_area);

    let prompt = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(format!("\"{product}\" is already on this invoice.")),
        Spans::from(format!("Add {quantity} to the existing line?")),
        Spans::from(""),
        Spans::from("Y - Merge quantities | N - Keep as is"),
    ])
    .block(Block::default().title("Duplicate Product").borders(Borders::ALL))
    .style(Style::default().fg(Color::Yellow));

    frame.render_widget(prompt, popup_area);
}

fn render_error<B: Backend>(frame: &mut Frame<B>, size: Rect, error: &str) {
    let popup_area = centered_rect(60, 20, size);
    frame.render_widget(Clear, popup_area);

    let error_msg = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(error),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .block(Block::default().title("Error").borders(Borders::ALL))
    .style(Style::default().fg(Color::Red));

    frame.render_widget(error_msg, popup_area);
}

pub async fn handle_input(
    api: &ApiClient,
    state: &mut InvoiceWizardState,
) -> Result<Option<InvoiceWizardAction>> {
    let key = poll_key()?;

    // An error popup swallows the next key press.
    if state.show_error.is_some() {
        if key.is_some() {
            state.show_error = None;
        }
        return Ok(None);
    }

    if state.client_picker.is_some() {
        handle_client_picker(api, state, key).await;
        return Ok(None);
    }

    if state.product_picker.is_some() {
        handle_product_picker(api, state, key).await;
        return Ok(None);
    }

    if state.pending_merge.is_some() {
        if let Some(key) = key {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => state.confirm_merge(),
                KeyCode::Char('n') | KeyCode::Esc => state.decline_merge(),
                _ => {}
            }
        }
        return Ok(None);
    }

    let Some(key) = key else {
        return Ok(None);
    };

    match key.code {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Ok(Some(InvoiceWizardAction::Cancel));
            }
        }
        KeyCode::Enter => {
            if state.editing {
                if state.current_field == InvoiceField::GeneralDiscount {
                    match state.active_input.parse::<f64>() {
                        Ok(discount) if (0.0..=100.0).contains(&discount) => {
                            state.general_discount = discount;
                            state.toggle_editing();
                        }
                        _ => {
                            state.show_error = Some(
                                "Invalid discount. Enter a percent from 0 to 100.".to_string(),
                            );
                        }
                    }
                } else if state.current_field == InvoiceField::Lines {
                    if state.editing_line.is_some() {
                        state.next_field_in_line();
                    } else {
                        state.toggle_editing();
                    }
                } else {
                    state.toggle_editing();
                }
            } else if state.current_field == InvoiceField::Client {
                open_client_picker(api, state).await;
            } else if state.current_field == InvoiceField::PaymentMethod
                || state.current_field == InvoiceField::Salesperson
            {
                // Cycled in place, nothing to edit.
            } else {
                state.toggle_editing();
            }
        }
        KeyCode::Char('s') if !state.editing => {
            if state.is_valid() {
                return Ok(Some(InvoiceWizardAction::Save(state.to_invoice())));
            } else {
                state.show_error = Some(
                    "A client and at least one line item are required.".to_string(),
                );
            }
        }
        KeyCode::Char('a') => {
            if state.current_field == InvoiceField::Lines
                && state.editing
                && state.editing_line.is_none()
            {
                open_product_picker(api, state).await;
            } else if state.editing {
                state.edit_current_field(key.code);
            }
        }
        KeyCode::Char('e') => {
            if state.current_field == InvoiceField::Lines
                && state.editing
                && state.editing_line.is_none()
                && state.lines_list_state.selected().is_some()
            {
                state.edit_selected_line();
            } else if state.editing {
                state.edit_current_field(key.code);
            }
        }
        KeyCode::Char('d') => {
            if state.current_field == InvoiceField::Lines
                && state.editing
                && state.editing_line.is_none()
                && state.lines_list_state.selected().is_some()
            {
                state.delete_selected_line();
            } else if state.editing {
                state.edit_current_field(key.code);
            }
        }
        KeyCode::Tab => {
            if state.current_field == InvoiceField::Lines
                && state.editing
                && state.editing_line.is_some()
            {
                state.next_field_in_line();
            }
        }
        KeyCode::Left if !state.editing => match state.current_field {
            InvoiceField::PaymentMethod => state.cycle_payment_method(false),
            InvoiceField::Salesperson => state.cycle_salesperson(false),
            _ => {}
        },
        KeyCode::Right if !state.editing => match state.current_field {
            InvoiceField::PaymentMethod => state.cycle_payment_method(true),
            InvoiceField::Salesperson => state.cycle_salesperson(true),
            _ => {}
        },
        KeyCode::Up if !state.editing => {
            state.previous_field();
        }
        KeyCode::Down if !state.editing => {
            state.next_field();
        }
        KeyCode::Up
            if state.current_field == InvoiceField::Lines
                && state.editing
                && state.editing_line.is_none() =>
        {
            let len = state.lines.len();
            if len > 0 {
                let i = match state.lines_list_state.selected() {
                    Some(i) => i.saturating_sub(1),
                    None => 0,
                };
                state.lines_list_state.select(Some(i));
            }
        }
        KeyCode::Down
            if state.current_field == InvoiceField::Lines
                && state.editing
                && state.editing_line.is_none() =>
        {
            let len = state.lines.len();
            if len > 0 {
                let i = match state.lines_list_state.selected() {
                    Some(i) => (i + 1).min(len - 1),
                    None => 0,
                };
                state.lines_list_state.select(Some(i));
            }
        }
        _ if state.editing => {
            state.edit_current_field(key.code);
        }
        _ => {}
    }

    Ok(None)
}

async fn open_client_picker(api: &ApiClient, state: &mut InvoiceWizardState) {
    match api.list_clients(1, None).await {
        Ok(page) => {
            let mut picker = ClientPickerState::new();
            picker.reset_with(page);
            state.client_picker = Some(picker);
        }
        Err(err) => {
            log::warn!("loading clients failed: {err}");
            state.show_error = Some(err.to_string());
        }
    }
}

async fn handle_client_picker(
    api: &ApiClient,
    state: &mut InvoiceWizardState,
    key: Option<crossterm::event::KeyEvent>,
) {
    let Some(picker) = &mut state.client_picker else {
        return;
    };

    match picker.handle_input(key) {
        Some(ClientPickerAction::Cancel) => {
            state.client_picker = None;
        }
        Some(ClientPickerAction::Select(client)) => {
            state.client = Some((client.id, client.name));
            state.client_picker = None;
        }
        Some(ClientPickerAction::Search(query)) => {
            let search = if query.is_empty() { None } else { Some(query.as_str()) };
            picker.begin_loading();
            let result = api.list_clients(1, search).await;
            picker.finish_loading();
            match result {
                Ok(page) => picker.reset_with(page),
                Err(err) => {
                    log::warn!("client search failed: {err}");
                    state.show_error = Some(err.to_string());
                }
            }
        }
        Some(ClientPickerAction::LoadNextPage) => {
            let next = picker.page() + 1;
            picker.begin_loading();
            let result = api.list_clients(next, picker.committed_search()).await;
            picker.finish_loading();
            match result {
                Ok(page) => picker.append(page),
                Err(err) => {
                    log::warn!("loading clients failed: {err}");
                    state.show_error = Some(err.to_string());
                }
            }
        }
        None => {}
    }
}

async fn open_product_picker(api: &ApiClient, state: &mut InvoiceWizardState) {
    match api.list_products(1, None).await {
        Ok(page) => {
            let mut picker = ProductPickerState::new();
            picker.reset_with(page);
            state.product_picker = Some(picker);
        }
        Err(err) => {
            log::warn!("loading products failed: {err}");
            state.show_error = Some(err.to_string());
        }
    }
}

async fn handle_product_picker(
    api: &ApiClient,
    state: &mut InvoiceWizardState,
    key: Option<crossterm::event::KeyEvent>,
) {
    let Some(picker) = &mut state.product_picker else {
        return;
    };

    match picker.handle_input(key) {
        Some(ProductPickerAction::Cancel) => {
            state.product_picker = None;
        }
        Some(ProductPickerAction::Select(product)) => {
            state.product_picker = None;
            state.add_product(&product);
        }
        Some(ProductPickerAction::Search(query)) => {
            let search = if query.is_empty() { None } else { Some(query.as_str()) };
            picker.begin_loading();
            let result = api.list_products(1, search).await;
            picker.finish_loading();
            match result {
                Ok(page) => picker.reset_with(page),
                Err(err) => {
                    log::warn!("product search failed: {err}");
                    state.show_error = Some(err.to_string());
                }
            }
        }
        Some(ProductPickerAction::LoadNextPage) => {
            let next = picker.page() + 1;
            picker.begin_loading();
            let result = api.list_products(next, picker.committed_search()).await;
            picker.finish_loading();
            match result {
                Ok(page) => picker.append(page),
                Err(err) => {
                    log::warn!("loading products failed: {err}");
                    state.show_error = Some(err.to_string());
                }
            }
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn payment_methods() -> Vec<PaymentMethod> {
        vec![
            PaymentMethod { id: 1, name: "Cash".to_string() },
            PaymentMethod { id: 2, name: "Card".to_string() },
        ]
    }

    fn salespeople() -> Vec<Salesperson> {
        vec![Salesperson { id: 7, name: "Ana".to_string() }]
    }

    fn product(id: i32, name: &str, price: f64) -> Product {
        Product {
            id,
            code: format!("P{id:03}"),
            name: name.to_string(),
            price,
            stock: 10.0,
            is_service: false,
            product_type_id: None,
            category_id: None,
            brand_id: None,
        }
    }

    fn wizard() -> InvoiceWizardState {
        InvoiceWizardState::new(None, payment_methods(), salespeople())
    }

    #[test]
    fn picking_a_new_product_adds_a_line() {
        let mut state = wizard();
        state.add_product(&product(1, "Widget", 25.0));

        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.lines[0].quantity, 1.0);
        assert_eq!(state.lines[0].unit_price, 25.0);
        assert!(state.pending_merge().is_none());
    }

    #[test]
    fn duplicate_product_arms_the_merge_prompt_instead_of_a_second_line() {
        let mut state = wizard();
        state.add_product(&product(1, "Widget", 25.0));
        state.add_product(&product(1, "Widget", 25.0));

        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.pending_merge(), Some((0, 1.0)));
    }

    #[test]
    fn confirming_the_merge_adds_quantities_on_the_existing_line() {
        let mut state = wizard();
        state.add_product(&product(1, "Widget", 25.0));
        state.add_product(&product(1, "Widget", 25.0));
        state.confirm_merge();

        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.lines[0].quantity, 2.0);
        assert!(state.pending_merge().is_none());
    }

    #[test]
    fn declining_the_merge_leaves_the_line_untouched() {
        let mut state = wizard();
        state.add_product(&product(1, "Widget", 25.0));
        state.add_product(&product(1, "Widget", 25.0));
        state.decline_merge();

        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.lines[0].quantity, 1.0);
    }

    #[test]
    fn invoice_total_layers_both_discount_levels() {
        let mut state = wizard();
        state.set_client(3, "ACME".to_string());
        state.add_product(&product(1, "Widget", 100.0));
        state.lines[0].quantity = 2.0;
        state.lines[0].discount = 10.0;
        state.general_discount = 5.0;

        let invoice = state.to_invoice();
        // 100 * 0.9 * 2 = 180, then 5% off -> 171
        assert!((invoice.total - 171.0).abs() < 1e-9);
        assert_eq!(invoice.client_id, 3);
        assert_eq!(invoice.id, 0);
        assert_eq!(invoice.status, InvoiceStatus::Draft);
    }

    #[test]
    fn validation_requires_client_and_lines() {
        let mut state = wizard();
        assert!(!state.is_valid());

        state.set_client(3, "ACME".to_string());
        assert!(!state.is_valid());

        state.add_product(&product(1, "Widget", 100.0));
        assert!(state.is_valid());
    }

    #[test]
    fn line_editing_rejects_out_of_range_discount() {
        let mut state = wizard();
        state.add_product(&product(1, "Widget", 100.0));
        state.edit_selected_line();

        // Commit quantity, then try a discount above 100.
        state.next_field_in_line();
        if let Some((_, _, value)) = &mut state.editing_line {
            *value = "150".to_string();
        }
        state.next_field_in_line();

        assert!(state.show_error.is_some());
        assert_eq!(state.lines[0].discount, 0.0);
    }

    #[test]
    fn editing_an_existing_invoice_preloads_the_form() {
        let invoice = Invoice {
            id: 12,
            number: "F-0012".to_string(),
            client_id: 3,
            client_name: "ACME".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: InvoiceStatus::Issued,
            payment_method_id: 2,
            salesperson_id: Some(7),
            general_discount: 2.5,
            lines: vec![InvoiceLine {
                product_id: 1,
                product_name: "Widget".to_string(),
                unit_price: 100.0,
                quantity: 1.0,
                discount: 0.0,
            }],
            total: 97.5,
        };

        let state = InvoiceWizardState::new(Some(invoice), payment_methods(), salespeople());

        assert!(state.is_editing_existing());
        assert_eq!(state.payment_idx, 1);
        assert_eq!(state.salesperson_idx, Some(0));
        assert_eq!(state.general_discount, 2.5);

        let round_trip = state.to_invoice();
        assert_eq!(round_trip.id, 12);
        assert_eq!(round_trip.status, InvoiceStatus::Issued);
    }

    #[test]
    fn salesperson_cycle_passes_through_none() {
        let mut state = wizard();
        assert_eq!(state.salesperson_idx, None);

        state.cycle_salesperson(true);
        assert_eq!(state.salesperson_idx, Some(0));

        state.cycle_salesperson(true);
        assert_eq!(state.salesperson_idx, None);

        state.cycle_salesperson(false);
        assert_eq!(state.salesperson_idx, Some(0));
    }
}
