use std::time::{Duration, Instant};

use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const TOAST_TTL: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, PartialEq)]
pub enum ToastKind {
    Info,
    Error,
}

/// Transient one-line banner. Backend failures land here and nowhere else;
/// the message disappears on the first tick after its deadline.
pub struct ToastState {
    message: Option<(String, ToastKind, Instant)>,
}

impl ToastState {
    pub fn new() -> Self {
        Self { message: None }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), ToastKind::Info, Instant::now() + TOAST_TTL));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), ToastKind::Error, Instant::now() + TOAST_TTL));
    }

    /// Drop the message once its deadline has passed.
    pub fn tick(&mut self, now: Instant) {
        if let Some((_, _, expires_at)) = &self.message {
            if now >= *expires_at {
                self.message = None;
            }
        }
    }

    pub fn current(&self) -> Option<(&str, ToastKind)> {
        self.message
            .as_ref()
            .map(|(message, kind, _)| (message.as_str(), *kind))
    }
}

pub fn render_toast<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &ToastState) {
    let Some((message, kind)) = state.current() else {
        return;
    };

    let style = match kind {
        ToastKind::Info => Style::default().fg(Color::Green),
        ToastKind::Error => Style::default().fg(Color::Red),
    };

    let banner = Paragraph::new(message)
        .style(style)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(banner, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_expires_after_deadline() {
        let mut toasts = ToastState::new();
        toasts.error("boom");
        assert!(toasts.current().is_some());

        toasts.tick(Instant::now());
        assert!(toasts.current().is_some());

        toasts.tick(Instant::now() + TOAST_TTL + Duration::from_millis(1));
        assert!(toasts.current().is_none());
    }

    #[test]
    fn newer_message_replaces_older() {
        let mut toasts = ToastState::new();
        toasts.error("first");
        toasts.info("second");

        let (message, kind) = toasts.current().unwrap();
        assert_eq!(message, "second");
        assert!(kind == ToastKind::Info);
    }
}
