use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{ChatRequest, SupportClient};
use crate::directory::{Directory, WebsiteCard};
use crate::reply::{classify, BackendReply};
use crate::state::{Sender, SessionContext, WebsiteRecord};
use crate::transcript::Transcript;

/// Shown when the chat request fails in transit.
pub const CHAT_ERROR_TEXT: &str = "Error connecting to agent.";

/// How long the send control stays highlighted after a submit.
const SEND_PULSE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Transcript,
    ChatInput,
    Directory,
    WebsiteInput,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Transcript => FocusPane::ChatInput,
            FocusPane::ChatInput => FocusPane::Directory,
            FocusPane::Directory => FocusPane::WebsiteInput,
            FocusPane::WebsiteInput => FocusPane::Transcript,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusPane::Transcript => FocusPane::WebsiteInput,
            FocusPane::ChatInput => FocusPane::Transcript,
            FocusPane::Directory => FocusPane::ChatInput,
            FocusPane::WebsiteInput => FocusPane::Directory,
        }
    }

    pub fn is_input(self) -> bool {
        matches!(self, FocusPane::ChatInput | FocusPane::WebsiteInput)
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text input with a character cursor
#[derive(Debug, Clone, Default)]
pub struct InputField {
    value: String,
    cursor: usize,
}

impl InputField {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Returns true when a character was removed.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.remove(byte_pos);
        true
    }

    /// Returns true when a character was removed.
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.value.chars().count() {
            return false;
        }
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.remove(byte_pos);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }
}

/// Result of a registration task: the new record plus the refreshed list.
#[derive(Debug)]
pub struct Registration {
    pub record: WebsiteRecord,
    pub websites: Result<Vec<WebsiteRecord>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Chat state
    pub transcript: Transcript,
    pub chat_input: InputField,
    pub chat_task: Option<JoinHandle<Result<BackendReply>>>,
    pub transcript_scroll: u16,
    pub transcript_height: u16, // Inner height of the transcript pane
    pub transcript_width: u16,  // Inner width, for wrap calculations
    pub follow_tail: bool,

    // Session context that scopes chat requests
    pub session: SessionContext,

    // Website directory state
    pub directory: Directory,
    pub directory_state: ListState,
    pub website_input: InputField,
    pub website_card: Option<WebsiteCard>,
    pub directory_task: Option<JoinHandle<Result<Vec<WebsiteRecord>>>>,
    pub register_task: Option<JoinHandle<Result<Registration>>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub send_pulse_until: Option<Instant>,

    // Panel areas for mouse hit-testing (updated during render)
    pub transcript_area: Option<Rect>,
    pub directory_area: Option<Rect>,

    client: SupportClient,
}

impl App {
    pub fn new(client: SupportClient) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::ChatInput,

            transcript: Transcript::new(),
            chat_input: InputField::default(),
            chat_task: None,
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            follow_tail: true,

            session: SessionContext::default(),

            directory: Directory::new(),
            directory_state: ListState::default(),
            website_input: InputField::default(),
            website_card: None,
            directory_task: None,
            register_task: None,

            animation_frame: 0,
            send_pulse_until: None,

            transcript_area: None,
            directory_area: None,

            client,
        }
    }

    pub fn client(&self) -> &SupportClient {
        &self.client
    }

    pub fn chat_in_flight(&self) -> bool {
        self.chat_task.is_some()
    }

    pub fn registration_in_flight(&self) -> bool {
        self.register_task.is_some()
    }

    pub fn send_pulse_active(&self) -> bool {
        self.send_pulse_until
            .is_some_and(|until| Instant::now() < until)
    }

    // Chat actions

    /// Send the chat input to the agent. Ignored while a reply is pending or
    /// when the input is blank.
    pub fn submit_chat(&mut self) {
        if self.chat_in_flight() {
            return;
        }
        let message = self.chat_input.value().trim().to_string();
        if message.is_empty() {
            return;
        }

        self.transcript.render_message(message.clone(), Sender::User);
        self.chat_input.clear();
        self.follow_tail = true;
        self.send_pulse_until = Some(Instant::now() + SEND_PULSE);

        let request = ChatRequest::new(message, self.session.selected_website_id);
        info!(website_id = ?request.website_id, "submitting chat message");

        let client = self.client.clone();
        self.chat_task = Some(tokio::spawn(async move { client.chat(&request).await }));
    }

    pub fn finish_chat(&mut self, result: Result<BackendReply>) {
        match result {
            Ok(reply) => self.transcript.apply(classify(&reply)),
            Err(e) => {
                warn!(error = %e, "chat request failed");
                self.transcript.render_message(CHAT_ERROR_TEXT, Sender::Agent);
            }
        }
        self.follow_tail = true;
    }

    // Directory actions

    pub fn refresh_websites(&mut self) {
        if self.directory_task.is_some() {
            return;
        }
        self.directory.begin_loading();
        let client = self.client.clone();
        self.directory_task = Some(tokio::spawn(async move { client.list_websites().await }));
    }

    pub fn finish_directory(&mut self, result: Result<Vec<WebsiteRecord>>) {
        match result {
            Ok(websites) => {
                info!(count = websites.len(), "directory refreshed");
                self.directory
                    .populate(websites, self.session.selected_website_id);
            }
            Err(e) => {
                warn!(error = %e, "could not load websites");
                self.directory.fail();
            }
        }
    }

    /// Pick entry `index` of the directory list (0 is the placeholder).
    pub fn select_website(&mut self, index: usize) {
        match self.directory.select(index).cloned() {
            Some(site) => {
                self.website_input.set(site.url().unwrap_or_default());
                self.website_card = Some(WebsiteCard::from_record(&site));
                self.session.select(site.id);
                info!(id = ?site.id, "website selected");
            }
            None => self.session.clear(),
        }
    }

    /// Any edit to the url input drops the active website.
    pub fn website_input_changed(&mut self) {
        self.session.clear();
    }

    /// Register the url in the website input, then reload the directory.
    pub fn submit_website(&mut self) {
        if self.registration_in_flight() {
            return;
        }
        let url = self.website_input.value().trim().to_string();
        if url.is_empty() {
            return;
        }

        info!(url = %url, "registering website");
        let client = self.client.clone();
        self.register_task = Some(tokio::spawn(async move {
            let record = client.register_website(&url).await?;
            let websites = client.list_websites().await;
            Ok::<_, anyhow::Error>(Registration { record, websites })
        }));
    }

    pub fn finish_registration(&mut self, result: Result<Registration>) {
        match result {
            Ok(registration) => {
                self.website_card = Some(WebsiteCard::from_record(&registration.record));
                self.website_input.clear();
                // A list fetch started earlier would land with a stale list
                if let Some(task) = self.directory_task.take() {
                    task.abort();
                }
                self.finish_directory(registration.websites);
            }
            Err(e) => {
                warn!(error = %e, "website registration failed");
                self.website_card = Some(WebsiteCard::unavailable());
            }
        }
    }

    // Background tasks

    /// Apply the results of any tasks that have completed. Never blocks.
    pub async fn poll_tasks(&mut self) {
        if let Some(task) = take_finished(&mut self.chat_task) {
            let result = join(task).await;
            self.finish_chat(result);
        }
        if let Some(task) = take_finished(&mut self.directory_task) {
            let result = join(task).await;
            self.finish_directory(result);
        }
        if let Some(task) = take_finished(&mut self.register_task) {
            let result = join(task).await;
            self.finish_registration(result);
        }
    }

    /// Wait for every in-flight task and apply its result.
    pub async fn settle(&mut self) {
        if let Some(task) = self.chat_task.take() {
            let result = join(task).await;
            self.finish_chat(result);
        }
        if let Some(task) = self.directory_task.take() {
            let result = join(task).await;
            self.finish_directory(result);
        }
        if let Some(task) = self.register_task.take() {
            let result = join(task).await;
            self.finish_registration(result);
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat_in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if !self.send_pulse_active() {
            self.send_pulse_until = None;
        }
    }

    // Transcript scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_tail = false;
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.transcript_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.transcript_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_tail = false;
        self.transcript_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
    }
}

fn take_finished<T>(slot: &mut Option<JoinHandle<T>>) -> Option<JoinHandle<T>> {
    if slot.as_ref().is_some_and(|task| task.is_finished()) {
        slot.take()
    } else {
        None
    }
}

async fn join<T>(task: JoinHandle<Result<T>>) -> Result<T> {
    task.await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptEntry;
    use anyhow::anyhow;

    fn app() -> App {
        App::new(SupportClient::new("http://127.0.0.1:9"))
    }

    fn site(id: i64, url: &str) -> WebsiteRecord {
        WebsiteRecord {
            id: Some(id),
            url: Some(url.to_string()),
            name: Some(format!("Site {}", id)),
            ..Default::default()
        }
    }

    #[test]
    fn test_input_field_utf8_editing() {
        let mut input = InputField::default();
        for c in "héllo".chars() {
            input.insert(c);
        }
        input.move_left();
        input.move_left();
        input.move_left();
        assert!(input.backspace());
        assert_eq!(input.value(), "hllo");
        input.move_home();
        assert!(!input.backspace());
        assert!(input.delete());
        assert_eq!(input.value(), "llo");
        input.move_end();
        assert!(!input.delete());
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn test_focus_cycle() {
        let mut focus = FocusPane::Transcript;
        for _ in 0..4 {
            focus = focus.next();
        }
        assert_eq!(focus, FocusPane::Transcript);
        assert_eq!(FocusPane::Transcript.prev(), FocusPane::WebsiteInput);
    }

    #[test]
    fn test_failed_chat_renders_error_bubble() {
        let mut app = app();
        app.finish_chat(Err(anyhow!("connection refused")));
        match app.transcript.last() {
            Some(TranscriptEntry::Message(msg)) => {
                assert_eq!(msg.text, CHAT_ERROR_TEXT);
                assert_eq!(msg.sender, Sender::Agent);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_blank_message_is_ignored() {
        let mut app = app();
        app.chat_input.set("   ");
        app.submit_chat();
        assert!(app.transcript.is_empty());
        assert!(!app.chat_in_flight());
    }

    #[test]
    fn test_select_and_clear_website() {
        let mut app = app();
        app.finish_directory(Ok(vec![site(7, "https://seven.example")]));

        app.select_website(1);
        assert_eq!(app.session.selected_website_id, Some(7));
        assert_eq!(app.website_input.value(), "https://seven.example");
        assert_eq!(app.website_card.as_ref().map(|c| c.name.as_str()), Some("Site 7"));

        app.select_website(0);
        assert_eq!(app.session.selected_website_id, None);
    }

    #[test]
    fn test_typing_url_clears_selection() {
        let mut app = app();
        app.finish_directory(Ok(vec![site(2, "https://two.example")]));
        app.select_website(1);
        app.website_input.insert('x');
        app.website_input_changed();
        assert_eq!(app.session.selected_website_id, None);
    }

    #[test]
    fn test_failed_registration_shows_unavailable_card() {
        let mut app = app();
        app.website_input.set("nope");
        app.finish_registration(Err(anyhow!("400")));
        assert_eq!(app.website_card, Some(WebsiteCard::unavailable()));
        assert_eq!(app.website_input.value(), "nope");
    }

    #[test]
    fn test_directory_failure_degrades() {
        let mut app = app();
        app.finish_directory(Err(anyhow!("500")));
        assert_eq!(app.directory.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_registration_list_replaces_pending_refresh() {
        let mut app = app();
        app.directory_task = Some(tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Vec::new())
        }));

        let record = site(4, "https://four.example");
        app.finish_registration(Ok(Registration {
            record: record.clone(),
            websites: Ok(vec![record]),
        }));
        assert!(app.directory_task.is_none());

        app.settle().await;
        assert_eq!(app.directory.labels(), vec!["Select Website", "Site 4"]);
    }

    #[tokio::test]
    async fn test_unreachable_backend_reenables_input() {
        let mut app = app();
        app.chat_input.set("hello");
        app.submit_chat();
        assert!(app.chat_in_flight());
        assert_eq!(app.chat_input.value(), "");

        app.settle().await;
        assert!(!app.chat_in_flight());
        assert_eq!(app.transcript.len(), 2);
        match app.transcript.last() {
            Some(TranscriptEntry::Message(msg)) => assert_eq!(msg.text, CHAT_ERROR_TEXT),
            other => panic!("unexpected entry {:?}", other),
        }
    }
}
