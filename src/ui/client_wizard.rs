use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Client, DocumentType};
use crate::ui::{centered_rect, poll_key};

pub enum ClientWizardAction {
    Cancel,
    Save(Client),
}

#[derive(Clone, PartialEq, Copy)]
pub enum ClientField {
    Name,
    TaxId,
    DocumentType,
    Email,
    Phone,
    Address,
}

pub struct ClientWizardState {
    pub client: Client,
    document_types: Vec<DocumentType>,
    document_type_idx: Option<usize>,
    pub current_field: ClientField,
    pub editing: bool,
    show_error: Option<String>,
}

impl ClientWizardState {
    pub fn new(document_types: Vec<DocumentType>) -> Self {
        Self {
            client: Client {
                id: 0,
                name: String::new(),
                tax_id: String::new(),
                document_type_id: None,
                email: String::new(),
                phone: String::new(),
                address: Some(String::new()),
            },
            document_types,
            document_type_idx: None,
            current_field: ClientField::Name,
            editing: false,
            show_error: None,
        }
    }

    pub fn from_existing(client: Client, document_types: Vec<DocumentType>) -> Self {
        let document_type_idx = client
            .document_type_id
            .and_then(|id| document_types.iter().position(|d| d.id == id));

        Self {
            client,
            document_types,
            document_type_idx,
            current_field: ClientField::Name,
            editing: false,
            show_error: None,
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            ClientField::Name => ClientField::TaxId,
            ClientField::TaxId => ClientField::DocumentType,
            ClientField::DocumentType => ClientField::Email,
            ClientField::Email => ClientField::Phone,
            ClientField::Phone => ClientField::Address,
            ClientField::Address => ClientField::Name,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            ClientField::Name => ClientField::Address,
            ClientField::TaxId => ClientField::Name,
            ClientField::DocumentType => ClientField::TaxId,
            ClientField::Email => ClientField::DocumentType,
            ClientField::Phone => ClientField::Email,
            ClientField::Address => ClientField::Phone,
        };
    }

    pub fn cycle_document_type(&mut self, forward: bool) {
        if self.document_types.is_empty() {
            return;
        }
        let len = self.document_types.len();
        self.document_type_idx = match (self.document_type_idx, forward) {
            (None, true) => Some(0),
            (None, false) => Some(len - 1),
            (Some(i), true) if i + 1 < len => Some(i + 1),
            (Some(_), true) => None,
            (Some(0), false) => None,
            (Some(i), false) => Some(i - 1),
        };
        self.client.document_type_id = self
            .document_type_idx
            .and_then(|i| self.document_types.get(i))
            .map(|d| d.id);
    }

    fn document_type_name(&self) -> String {
        self.document_type_idx
            .and_then(|i| self.document_types.get(i))
            .map(|d| d.name.clone())
            .unwrap_or_else(|| "<none>".to_string())
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ClientField::Name => &mut self.client.name,
            ClientField::TaxId => &mut self.client.tax_id,
            ClientField::Email => &mut self.client.email,
            ClientField::Phone => &mut self.client.phone,
            ClientField::Address => {
                if self.client.address.is_none() {
                    self.client.address = Some(String::new());
                }
                self.client.address.as_mut().unwrap()
            }
            // Cycled with Left/Right, not typed.
            ClientField::DocumentType => return,
        };

        match key {
            KeyCode::Char(c) => {
                field_value.push(c);
            }
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.client.name.is_empty() && !self.client.tax_id.is_empty()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.show_error = Some(message.into());
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = if state.client.id == 0 {
        "New Client"
    } else {
        "Edit Client"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = if state.editing {
        "Enter - Save field | Esc - Cancel editing"
    } else if state.current_field == ClientField::DocumentType {
        "Left/Right - Change | Up/Down - Navigate | S - Save client | Esc - Cancel"
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save client | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);

    if let Some(error) = &state.show_error {
        render_error(f, f.size(), error);
    }
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState, area: Rect) {
    let field_names = ["Name", "Tax Id", "Document Type", "Email", "Phone", "Address"];

    let empty_string = String::new();
    let document_type_name = state.document_type_name();

    let field_values = [
        state.client.name.clone(),
        state.client.tax_id.clone(),
        format!("< {document_type_name} >"),
        state.client.email.clone(),
        state.client.phone.clone(),
        state
            .client
            .address
            .as_ref()
            .unwrap_or(&empty_string)
            .clone(),
    ];

    let items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let content = if i == state.current_field as usize && state.editing {
                Spans::from(vec![
                    Span::styled(format!("{name}: "), Style::default().fg(Color::Yellow)),
                    Span::styled(
                        format!("{value}|"),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                let style = if i == state.current_field as usize {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };

                Spans::from(vec![
                    Span::styled(format!("{name}: "), style),
                    Span::raw(value.as_str()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Client Details"))
        .highlight_style(Style::default().fg(Color::Yellow));

    f.render_widget(form_list, area);
}

fn render_error<B: Backend>(f: &mut Frame<B>, size: Rect, error: &str) {
    let popup_area = centered_rect(60, 20, size);
    f.render_widget(Clear, popup_area);

    let error_msg = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(error),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .block(Block::default().title("Error").borders(Borders::ALL))
    .style(Style::default().fg(Color::Red));

    f.render_widget(error_msg, popup_area);
}

/// Key handling, split out so tests can drive it without a terminal.
pub fn apply_key(state: &mut ClientWizardState, key: KeyCode) -> Option<ClientWizardAction> {
    if state.show_error.is_some() {
        state.show_error = None;
        return None;
    }

    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ClientWizardAction::Cancel);
            }
        }
        KeyCode::Enter => {
            if state.current_field != ClientField::DocumentType {
                state.toggle_editing();
            }
        }
        KeyCode::Up if !state.editing => {
            state.previous_field();
        }
        KeyCode::Down if !state.editing => {
            state.next_field();
        }
        KeyCode::Left if !state.editing && state.current_field == ClientField::DocumentType => {
            state.cycle_document_type(false);
        }
        KeyCode::Right if !state.editing && state.current_field == ClientField::DocumentType => {
            state.cycle_document_type(true);
        }
        KeyCode::Char('s') if !state.editing => {
            if state.is_valid() {
                return Some(ClientWizardAction::Save(state.client.clone()));
            } else {
                state.show_error = Some("Name and tax id are required.".to_string());
            }
        }
        _ if state.editing => {
            state.edit_current_field(key);
        }
        _ => {}
    }

    None
}

pub fn handle_input(state: &mut ClientWizardState) -> Result<Option<ClientWizardAction>> {
    match poll_key()? {
        Some(key) => Ok(apply_key(state, key.code)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_types() -> Vec<DocumentType> {
        vec![
            DocumentType { id: 1, name: "DNI".to_string() },
            DocumentType { id: 2, name: "RUC".to_string() },
        ]
    }

    #[test]
    fn save_requires_name_and_tax_id() {
        let mut state = ClientWizardState::new(document_types());

        assert!(apply_key(&mut state, KeyCode::Char('s')).is_none());
        assert!(state.show_error.is_some());

        // Dismiss the error, then fill the required fields.
        apply_key(&mut state, KeyCode::Enter);
        state.client.name = "ACME".to_string();
        state.client.tax_id = "20100012345".to_string();

        match apply_key(&mut state, KeyCode::Char('s')) {
            Some(ClientWizardAction::Save(client)) => {
                assert_eq!(client.name, "ACME");
                assert_eq!(client.id, 0);
            }
            _ => panic!("expected a save action"),
        }
    }

    #[test]
    fn typing_edits_the_active_field() {
        let mut state = ClientWizardState::new(document_types());

        apply_key(&mut state, KeyCode::Enter);
        for c in "ACME".chars() {
            apply_key(&mut state, KeyCode::Char(c));
        }
        apply_key(&mut state, KeyCode::Backspace);

        assert_eq!(state.client.name, "ACM");
    }

    #[test]
    fn document_type_cycles_and_updates_the_client() {
        let mut state = ClientWizardState::new(document_types());
        state.current_field = ClientField::DocumentType;

        apply_key(&mut state, KeyCode::Right);
        assert_eq!(state.client.document_type_id, Some(1));

        apply_key(&mut state, KeyCode::Right);
        assert_eq!(state.client.document_type_id, Some(2));

        apply_key(&mut state, KeyCode::Right);
        assert_eq!(state.client.document_type_id, None);
    }

    #[test]
    fn editing_an_existing_client_keeps_its_document_type() {
        let client = Client {
            id: 9,
            name: "ACME".to_string(),
            tax_id: "123".to_string(),
            document_type_id: Some(2),
            email: String::new(),
            phone: String::new(),
            address: None,
        };

        let state = ClientWizardState::from_existing(client, document_types());
        assert_eq!(state.document_type_idx, Some(1));
    }
}
