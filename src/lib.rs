pub mod api;
pub mod app;
pub mod config;
pub mod directory;
pub mod handler;
pub mod reply;
pub mod state;
pub mod transcript;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use api::{ChatRequest, SupportClient};
pub use app::App;
pub use config::Config;
pub use directory::{Directory, WebsiteCard};
pub use reply::{classify, BackendReply, ComparisonTable, Product, RenderInstruction};
pub use state::{ChatMessage, Sender, SessionContext, WebsiteRecord};
pub use transcript::{Transcript, TranscriptEntry};
