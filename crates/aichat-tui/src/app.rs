use aichat_core::{Controller, Provider, Reply, SubmitStatus};

pub struct App {
    pub should_quit: bool,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Conversation
    pub controller: Controller,
    pub provider: Provider,
    /// One-line hint shown in the footer, cleared on the next keystroke
    pub notice: Option<&'static str>,

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area, set during render
    pub chat_lines: u16,  // Wrapped line count of the transcript, set during render
    /// Pin the view to the newest line; cleared when the user scrolls up
    pub follow_bottom: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(controller: Controller, provider: Provider) -> Self {
        Self {
            should_quit: false,
            input: String::new(),
            cursor: 0,
            controller,
            provider,
            notice: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_lines: 0,
            follow_bottom: true,
            animation_frame: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Send the current input. Safe to call from any key binding; the
    /// controller decides whether anything happens.
    pub fn send(&mut self) {
        match self.controller.submit(&self.input) {
            SubmitStatus::Empty => {
                self.notice = Some("Type a message first");
            }
            SubmitStatus::Busy => {
                self.notice = Some("Still waiting for the previous reply");
            }
            SubmitStatus::Dispatched(_) => {
                self.input.clear();
                self.cursor = 0;
                self.notice = None;
                self.animation_frame = 0;
                self.scroll_to_bottom();
            }
        }
    }

    /// Hand a worker reply to the controller
    pub fn receive(&mut self, reply: Reply) {
        if self.controller.apply(reply) {
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        if self.chat_scroll == self.max_scroll() {
            self.follow_bottom = true;
        }
    }

    pub fn page(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    /// Keep the newest message (or the thinking line) in view. The exact
    /// offset is settled on the next render, once wrapping is known.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.chat_scroll = self.max_scroll();
    }

    /// Record the rendered size of the transcript and fix up the scroll offset
    pub fn set_chat_metrics(&mut self, lines: u16, height: u16) {
        self.chat_lines = lines;
        self.chat_height = height;
        if self.follow_bottom {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    pub fn max_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.visible_height())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use aichat_core::{ChatMessage, CompletionProvider, Dispatcher, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers with a fixed reply, or echoes the message when there is none
    pub(crate) struct CannedProvider {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl CannedProvider {
        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        async fn complete(
            &self,
            _model: &str,
            messages: &[ChatMessage],
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match self.reply {
                Some(text) => text.to_string(),
                None => format!("echo: {}", messages[0].content()),
            })
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    pub(crate) fn test_app(reply: Option<&'static str>) -> (App, Arc<CannedProvider>) {
        let provider = Arc::new(CannedProvider {
            reply,
            calls: AtomicUsize::new(0),
        });
        let controller = Controller::new(Dispatcher::new(provider.clone(), "canned-1"));
        (App::new(controller, Provider::Ollama), provider)
    }

    #[test]
    fn test_metrics_pin_to_bottom_while_following() {
        let (mut app, _) = test_app(None);

        app.set_chat_metrics(30, 10);
        assert_eq!(app.chat_scroll, 20);

        app.set_chat_metrics(35, 10);
        assert_eq!(app.chat_scroll, 25);
    }

    #[test]
    fn test_scrolling_up_stops_following() {
        let (mut app, _) = test_app(None);
        app.set_chat_metrics(30, 10);

        app.scroll_up(5);
        assert!(!app.follow_bottom);
        assert_eq!(app.chat_scroll, 15);

        // New lines arrive; the reader's position is kept
        app.set_chat_metrics(40, 10);
        assert_eq!(app.chat_scroll, 15);

        app.scroll_down(100);
        assert!(app.follow_bottom);
        assert_eq!(app.chat_scroll, 30);
    }

    #[test]
    fn test_short_transcript_never_scrolls() {
        let (mut app, _) = test_app(None);
        app.set_chat_metrics(4, 10);
        assert_eq!(app.chat_scroll, 0);

        app.scroll_down(3);
        assert_eq!(app.chat_scroll, 0);
    }
}
