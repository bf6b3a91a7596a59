mod api;
mod config;
mod models;
mod totals;
mod ui;

use std::io;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::api::ApiClient;
use crate::models::{DocumentType, PaymentMethod, Salesperson};
use crate::ui::{
    catalog::{render_catalog, handle_input as handle_catalog_input, CatalogAction, CatalogState},
    client_wizard::{
        render_client_wizard, handle_input as handle_client_wizard_input, ClientWizardAction,
        ClientWizardState,
    },
    clients::{render_clients, handle_input as handle_clients_input, ClientAction, ClientsState},
    invoice_wizard::{
        render_invoice_wizard, handle_input as handle_invoice_wizard_input, InvoiceWizardAction,
        InvoiceWizardState,
    },
    invoices::{render_invoices, handle_input as handle_invoices_input, InvoiceAction, InvoicesState},
};

// Represents the current screen in the app
enum AppScreen {
    Invoices,
    InvoiceWizard,
    Clients,
    ClientWizard,
    Catalog,
}

// Main application state
struct AppState {
    api: ApiClient,
    screen: AppScreen,
    // Reference data is loaded once at startup and cloned into the wizards.
    document_types: Vec<DocumentType>,
    payment_methods: Vec<PaymentMethod>,
    salespeople: Vec<Salesperson>,
    invoices_state: Option<InvoicesState>,
    invoice_wizard_state: Option<InvoiceWizardState>,
    clients_state: Option<ClientsState>,
    client_wizard_state: Option<ClientWizardState>,
    catalog_state: Option<CatalogState>,
}

impl AppState {
    fn new(
        api: ApiClient,
        document_types: Vec<DocumentType>,
        payment_methods: Vec<PaymentMethod>,
        salespeople: Vec<Salesperson>,
    ) -> Self {
        Self {
            api,
            screen: AppScreen::Invoices,
            document_types,
            payment_methods,
            salespeople,
            invoices_state: None,
            invoice_wizard_state: None,
            clients_state: None,
            client_wizard_state: None,
            catalog_state: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // Load configuration
    let cli = config::Cli::parse();
    let config = config::init(&cli)?;
    println!("Connecting to {}...", config.api_base_url());

    // Build the API client and pull the reference data every screen needs.
    // Without a reachable backend there is nothing to show, so fail here.
    let api = api::init(&config)?;
    let document_types = api.document_types().await?;
    let payment_methods = api.payment_methods().await?;
    let salespeople = api.salespeople().await?;

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app_state = AppState::new(api, document_types, payment_methods, salespeople);

    // Initialize the invoices screen
    load_invoices_screen(&mut app_state).await;

    // Run the main app loop
    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Show any error message
    if let Err(err) = result {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        // Render current screen
        terminal.draw(|f| match app_state.screen {
            AppScreen::Invoices => {
                if let Some(state) = &mut app_state.invoices_state {
                    render_invoices(f, state);
                }
            }
            AppScreen::InvoiceWizard => {
                if let Some(state) = &mut app_state.invoice_wizard_state {
                    render_invoice_wizard(f, state);
                }
            }
            AppScreen::Clients => {
                if let Some(state) = &mut app_state.clients_state {
                    render_clients(f, state);
                }
            }
            AppScreen::ClientWizard => {
                if let Some(state) = &mut app_state.client_wizard_state {
                    render_client_wizard(f, state);
                }
            }
            AppScreen::Catalog => {
                if let Some(state) = &mut app_state.catalog_state {
                    render_catalog(f, state);
                }
            }
        })?;

        // Handle input for current screen
        let should_quit = match app_state.screen {
            AppScreen::Invoices => handle_invoices_screen(app_state).await?,
            AppScreen::InvoiceWizard => handle_invoice_wizard_screen(app_state).await?,
            AppScreen::Clients => handle_clients_screen(app_state).await?,
            AppScreen::ClientWizard => handle_client_wizard_screen(app_state).await?,
            AppScreen::Catalog => handle_catalog_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

/// Fetch the first invoice page with whatever filters the screen already has
/// and make it the active screen. Fetch failures land in the toast.
async fn load_invoices_screen(app_state: &mut AppState) {
    let mut state = app_state
        .invoices_state
        .take()
        .unwrap_or_else(InvoicesState::new);

    let (status, from, to) = state.filters();
    state.begin_loading();
    let result = app_state.api.list_invoices(1, status, from, to).await;
    state.finish_loading();

    match result {
        Ok(page) => state.reset_with(page),
        Err(err) => {
            log::warn!("loading invoices failed: {err}");
            state.toasts.error(err.to_string());
        }
    }

    app_state.invoices_state = Some(state);
    app_state.screen = AppScreen::Invoices;
}

async fn load_clients_screen(app_state: &mut AppState) {
    let mut state = ClientsState::new();

    state.begin_loading();
    let result = app_state.api.list_clients(1, None).await;
    state.finish_loading();

    match result {
        Ok(page) => state.reset_with(page),
        Err(err) => {
            log::warn!("loading clients failed: {err}");
            state.toasts.error(err.to_string());
        }
    }

    app_state.clients_state = Some(state);
    app_state.screen = AppScreen::Clients;
}

async fn refresh_catalog(api: &ApiClient, state: &mut CatalogState) {
    state.begin_loading();
    let result = api.list_catalog(state.kind()).await;
    state.finish_loading();

    match result {
        Ok(entries) => state.set_entries(entries),
        Err(err) => {
            log::warn!("loading {} failed: {err}", state.kind().label());
            state.toasts.error(err.to_string());
        }
    }
}

async fn handle_invoices_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.invoices_state {
        match handle_invoices_input(state)? {
            Some(InvoiceAction::Quit) => {
                return Ok(true);
            }
            Some(InvoiceAction::NewInvoice) => {
                app_state.invoice_wizard_state = Some(InvoiceWizardState::new(
                    None,
                    app_state.payment_methods.clone(),
                    app_state.salespeople.clone(),
                ));
                app_state.screen = AppScreen::InvoiceWizard;
            }
            Some(InvoiceAction::EditInvoice(invoice_id)) => {
                // The list rows carry no lines; fetch the full invoice.
                match app_state.api.get_invoice(invoice_id).await {
                    Ok(invoice) => {
                        app_state.invoice_wizard_state = Some(InvoiceWizardState::new(
                            Some(invoice),
                            app_state.payment_methods.clone(),
                            app_state.salespeople.clone(),
                        ));
                        app_state.screen = AppScreen::InvoiceWizard;
                    }
                    Err(err) => {
                        log::warn!("loading invoice {invoice_id} failed: {err}");
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(InvoiceAction::Reload) => {
                let (status, from, to) = state.filters();
                state.begin_loading();
                let result = app_state.api.list_invoices(1, status, from, to).await;
                state.finish_loading();
                match result {
                    Ok(page) => state.reset_with(page),
                    Err(err) => {
                        log::warn!("loading invoices failed: {err}");
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(InvoiceAction::LoadNextPage) => {
                let (status, from, to) = state.filters();
                let next = state.page() + 1;
                state.begin_loading();
                let result = app_state.api.list_invoices(next, status, from, to).await;
                state.finish_loading();
                match result {
                    Ok(page) => state.append(page),
                    Err(err) => {
                        log::warn!("loading invoices failed: {err}");
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(InvoiceAction::OpenClients) => {
                load_clients_screen(app_state).await;
            }
            Some(InvoiceAction::OpenCatalog) => {
                let mut catalog = CatalogState::new();
                refresh_catalog(&app_state.api, &mut catalog).await;
                app_state.catalog_state = Some(catalog);
                app_state.screen = AppScreen::Catalog;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_invoice_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.invoice_wizard_state {
        match handle_invoice_wizard_input(&app_state.api, state).await? {
            Some(InvoiceWizardAction::Cancel) => {
                app_state.invoice_wizard_state = None;
                load_invoices_screen(app_state).await;
            }
            Some(InvoiceWizardAction::Save(invoice)) => {
                let result = if invoice.id == 0 {
                    app_state.api.create_invoice(&invoice).await.map(|_| ())
                } else {
                    app_state.api.update_invoice(&invoice).await
                };

                match result {
                    Ok(()) => {
                        app_state.invoice_wizard_state = None;
                        load_invoices_screen(app_state).await;
                        if let Some(invoices) = &mut app_state.invoices_state {
                            invoices.toasts.info("Invoice saved.");
                        }
                    }
                    Err(err) => {
                        // Stay on the form; nothing was persisted.
                        log::warn!("saving invoice failed: {err}");
                        state.set_error(err.to_string());
                    }
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_clients_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.clients_state {
        match handle_clients_input(state)? {
            Some(ClientAction::Back) => {
                load_invoices_screen(app_state).await;
            }
            Some(ClientAction::NewClient) => {
                app_state.client_wizard_state =
                    Some(ClientWizardState::new(app_state.document_types.clone()));
                app_state.screen = AppScreen::ClientWizard;
            }
            Some(ClientAction::EditClient(client_id)) => {
                match app_state.api.get_client(client_id).await {
                    Ok(client) => {
                        app_state.client_wizard_state = Some(ClientWizardState::from_existing(
                            client,
                            app_state.document_types.clone(),
                        ));
                        app_state.screen = AppScreen::ClientWizard;
                    }
                    Err(err) => {
                        log::warn!("loading client {client_id} failed: {err}");
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(ClientAction::DeleteClient(client_id)) => {
                match app_state.api.delete_client(client_id).await {
                    Ok(()) => {
                        state.toasts.info("Client deleted.");
                        let search = state.committed_search().map(str::to_string);
                        state.begin_loading();
                        let result = app_state.api.list_clients(1, search.as_deref()).await;
                        state.finish_loading();
                        match result {
                            Ok(page) => state.reset_with(page),
                            Err(err) => {
                                log::warn!("loading clients failed: {err}");
                                state.toasts.error(err.to_string());
                            }
                        }
                    }
                    Err(err) => {
                        log::warn!("deleting client {client_id} failed: {err}");
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(ClientAction::Search(query)) => {
                let search = if query.is_empty() { None } else { Some(query.as_str()) };
                state.begin_loading();
                let result = app_state.api.list_clients(1, search).await;
                state.finish_loading();
                match result {
                    Ok(page) => state.reset_with(page),
                    Err(err) => {
                        log::warn!("client search failed: {err}");
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(ClientAction::LoadNextPage) => {
                let search = state.committed_search().map(str::to_string);
                let next = state.page() + 1;
                state.begin_loading();
                let result = app_state.api.list_clients(next, search.as_deref()).await;
                state.finish_loading();
                match result {
                    Ok(page) => state.append(page),
                    Err(err) => {
                        log::warn!("loading clients failed: {err}");
                        state.toasts.error(err.to_string());
                    }
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_client_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.client_wizard_state {
        match handle_client_wizard_input(state)? {
            Some(ClientWizardAction::Cancel) => {
                app_state.client_wizard_state = None;
                load_clients_screen(app_state).await;
            }
            Some(ClientWizardAction::Save(client)) => {
                let result = if client.id == 0 {
                    app_state.api.create_client(&client).await.map(|_| ())
                } else {
                    app_state.api.update_client(&client).await
                };

                match result {
                    Ok(()) => {
                        app_state.client_wizard_state = None;
                        load_clients_screen(app_state).await;
                        if let Some(clients) = &mut app_state.clients_state {
                            clients.toasts.info("Client saved.");
                        }
                    }
                    Err(err) => {
                        log::warn!("saving client failed: {err}");
                        state.set_error(err.to_string());
                    }
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_catalog_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.catalog_state {
        match handle_catalog_input(state)? {
            Some(CatalogAction::Back) => {
                app_state.catalog_state = None;
                load_invoices_screen(app_state).await;
            }
            Some(CatalogAction::SwitchKind(_)) => {
                refresh_catalog(&app_state.api, state).await;
            }
            Some(CatalogAction::Create(name)) => {
                match app_state.api.create_catalog(state.kind(), &name).await {
                    Ok(_) => {
                        state.toasts.info(format!("\"{name}\" created."));
                        refresh_catalog(&app_state.api, state).await;
                    }
                    Err(err) => {
                        log::warn!("creating {} entry failed: {err}", state.kind().label());
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(CatalogAction::Rename(entry)) => {
                match app_state.api.update_catalog(state.kind(), &entry).await {
                    Ok(()) => {
                        state.toasts.info("Renamed.");
                        refresh_catalog(&app_state.api, state).await;
                    }
                    Err(err) => {
                        log::warn!("renaming {} entry failed: {err}", state.kind().label());
                        state.toasts.error(err.to_string());
                    }
                }
            }
            Some(CatalogAction::Delete(id)) => {
                match app_state.api.delete_catalog(state.kind(), id).await {
                    Ok(()) => {
                        state.toasts.info("Deleted.");
                        refresh_catalog(&app_state.api, state).await;
                    }
                    Err(err) => {
                        log::warn!("deleting {} entry failed: {err}", state.kind().label());
                        state.toasts.error(err.to_string());
                    }
                }
            }
            None => {}
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_starts_on_the_invoice_list() {
        let config = config::Config {
            api_base_url: "http://localhost:8080/api".to_string(),
            page_size: 20,
        };
        let api = api::init(&config).expect("client should build");

        let state = AppState::new(api, Vec::new(), Vec::new(), Vec::new());
        assert!(matches!(state.screen, AppScreen::Invoices));
        assert!(state.invoices_state.is_none());
    }
}
