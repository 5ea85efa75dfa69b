//! Website directory: the registered sites, the selection list, and the
//! display card for the active site.

use crate::state::WebsiteRecord;

pub const DEFAULT_ICON: &str = "/images/logo.png";
pub const PLACEHOLDER_LABEL: &str = "Select Website";
pub const REGISTER_FAILED_TEXT: &str = "Could not fetch website";
pub const LIST_FAILED_TEXT: &str = "Could not fetch websites";

/// Name, description and icon shown for a website
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebsiteCard {
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl WebsiteCard {
    pub fn from_record(record: &WebsiteRecord) -> Self {
        Self {
            name: record
                .name()
                .or_else(|| record.url())
                .unwrap_or_default()
                .to_string(),
            description: record.description().unwrap_or_default().to_string(),
            icon: record.icon().unwrap_or(DEFAULT_ICON).to_string(),
        }
    }

    /// Card shown after a failed registration.
    pub fn unavailable() -> Self {
        Self {
            name: REGISTER_FAILED_TEXT.to_string(),
            description: String::new(),
            icon: DEFAULT_ICON.to_string(),
        }
    }

    /// Short form of the icon. Inline `data:` icons collapse to their mime type.
    pub fn icon_label(&self) -> String {
        match self.icon.strip_prefix("data:") {
            Some(rest) => {
                let mime = rest.split([';', ',']).next().unwrap_or_default();
                format!("data:{} (inline)", mime)
            }
            None => self.icon.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryStatus {
    Loading,
    Ready,
    Failed,
}

/// Selectable list of websites. Index 0 is always the placeholder entry.
#[derive(Debug, Clone)]
pub struct Directory {
    websites: Vec<WebsiteRecord>,
    selected: usize,
    status: DirectoryStatus,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory {
    pub fn new() -> Self {
        Self {
            websites: Vec::new(),
            selected: 0,
            status: DirectoryStatus::Loading,
        }
    }

    pub fn websites(&self) -> &[WebsiteRecord] {
        &self.websites
    }

    pub fn status(&self) -> &DirectoryStatus {
        &self.status
    }

    /// Labels for every entry, placeholder first.
    pub fn labels(&self) -> Vec<String> {
        std::iter::once(PLACEHOLDER_LABEL.to_string())
            .chain(self.websites.iter().map(|site| {
                site.name()
                    .or_else(|| site.url())
                    .unwrap_or_default()
                    .to_string()
            }))
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.websites.len() + 1
    }

    /// Highlighted entry index (0 = placeholder).
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn begin_loading(&mut self) {
        self.status = DirectoryStatus::Loading;
    }

    /// Replace the list. The highlight follows the site with `keep_id`, or
    /// falls back to the placeholder.
    pub fn populate(&mut self, websites: Vec<WebsiteRecord>, keep_id: Option<i64>) {
        self.selected = keep_id
            .and_then(|id| websites.iter().position(|site| site.id == Some(id)))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        self.websites = websites;
        self.status = DirectoryStatus::Ready;
    }

    /// A failed fetch leaves only the placeholder.
    pub fn fail(&mut self) {
        self.websites.clear();
        self.selected = 0;
        self.status = DirectoryStatus::Failed;
    }

    pub fn highlight_next(&mut self) {
        if self.selected + 1 < self.entry_count() {
            self.selected += 1;
        }
    }

    pub fn highlight_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Select entry `index`. Returns the chosen record when it has a url;
    /// `None` means the selection was cleared.
    pub fn select(&mut self, index: usize) -> Option<&WebsiteRecord> {
        self.selected = index.min(self.websites.len());
        let site = self.selected.checked_sub(1).and_then(|i| self.websites.get(i))?;
        site.url().is_some().then_some(site)
    }

    pub fn title(&self) -> String {
        match self.status {
            DirectoryStatus::Loading => " Websites (loading...) ".to_string(),
            DirectoryStatus::Ready => format!(" Websites ({}) ", self.websites.len()),
            DirectoryStatus::Failed => format!(" Websites: {} ", LIST_FAILED_TEXT),
        }
    }
}
