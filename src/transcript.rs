//! Append-only chat transcript

use chrono::Local;

use crate::reply::{ComparisonTable, Product, RenderInstruction};
use crate::state::{ChatMessage, Sender};

/// Image shown on a product card that has none of its own.
pub const FALLBACK_IMAGE: &str = "/images/logo.png";

/// One visual unit in the transcript
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Message(ChatMessage),
    Product {
        product: Product,
        timestamp: String,
    },
    Comparison {
        table: ComparisonTable,
        timestamp: String,
    },
}

impl TranscriptEntry {
    pub fn timestamp(&self) -> &str {
        match self {
            TranscriptEntry::Message(msg) => &msg.timestamp,
            TranscriptEntry::Product { timestamp, .. } => timestamp,
            TranscriptEntry::Comparison { timestamp, .. } => timestamp,
        }
    }
}

/// Product card fields with the card's fallbacks applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub title: String,
    pub image: String,
    pub description: String,
    pub price: Option<String>,
    pub link: Option<String>,
}

impl ProductCard {
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.name().unwrap_or_else(|| "Product".to_string()),
            image: product.image().unwrap_or_else(|| FALLBACK_IMAGE.to_string()),
            description: product.content().unwrap_or_default(),
            price: product.price(),
            link: product.link(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn render_message(&mut self, text: impl Into<String>, sender: Sender) {
        self.push(TranscriptEntry::Message(ChatMessage {
            text: text.into(),
            sender,
            timestamp: now_hh_mm(),
        }));
    }

    pub fn render_product(&mut self, product: Product) {
        self.push(TranscriptEntry::Product {
            product,
            timestamp: now_hh_mm(),
        });
    }

    /// Appends a comparison table. Fewer than two products is a no-op.
    pub fn render_comparison(&mut self, products: &[Product]) {
        if let Some(table) = ComparisonTable::from_products(products) {
            self.push(TranscriptEntry::Comparison {
                table,
                timestamp: now_hh_mm(),
            });
        }
    }

    /// Render exactly one unit for a classified reply.
    pub fn apply(&mut self, instruction: RenderInstruction) {
        match instruction {
            RenderInstruction::Message { text, sender } => self.render_message(text, sender),
            RenderInstruction::Product(product) => self.render_product(product),
            RenderInstruction::Comparison(products) => self.render_comparison(&products),
        }
    }

    fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }
}

fn now_hh_mm() -> String {
    Local::now().format("%H:%M").to_string()
}
