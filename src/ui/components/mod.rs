pub mod date_input;
pub mod search_input;
pub mod toast;
