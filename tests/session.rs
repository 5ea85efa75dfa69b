//! Drives the app against an in-process fake of the support backend.

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use support_chat::app::CHAT_ERROR_TEXT;
use support_chat::directory::DEFAULT_ICON;
use support_chat::{App, Sender, SupportClient, TranscriptEntry};

#[derive(Default)]
struct Backend {
    chat_bodies: Vec<Value>,
    reply: Value,
    /// When set, `/api/chat` answers with this non-JSON body and a 500.
    broken_reply: Option<String>,
    websites: Vec<Value>,
    fail_register: bool,
}

type Shared = Arc<Mutex<Backend>>;

async fn chat(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut backend = state.lock().unwrap();
    backend.chat_bodies.push(body);
    match &backend.broken_reply {
        Some(raw) => (StatusCode::INTERNAL_SERVER_ERROR, raw.clone()).into_response(),
        None => Json(backend.reply.clone()).into_response(),
    }
}

async fn list_websites(State(state): State<Shared>) -> Json<Value> {
    Json(Value::Array(state.lock().unwrap().websites.clone()))
}

async fn add_website(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut backend = state.lock().unwrap();
    if backend.fail_register {
        return Err(StatusCode::BAD_REQUEST);
    }
    let url = body["url"].as_str().unwrap_or_default().to_string();
    let id = backend.websites.len() as i64 + 1;
    let site = json!({
        "id": id,
        "name": format!("Example {}", id),
        "url": url,
        "icon": "data:image/png;base64,AAAA",
        "description": "An example shop",
        "created_at": "2024-05-01T10:00:00Z",
    });
    backend.websites.push(site.clone());
    Ok(Json(site))
}

async fn spawn_backend(backend: Backend) -> (App, Shared) {
    let state: Shared = Arc::new(Mutex::new(backend));
    let router = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/websites/", get(list_websites).post(add_website))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let app = App::new(SupportClient::new(&format!("http://{}", addr)));
    (app, state)
}

async fn send(app: &mut App, message: &str) {
    app.chat_input.set(message);
    app.submit_chat();
    assert!(app.chat_in_flight());
    app.settle().await;
    assert!(!app.chat_in_flight());
}

#[tokio::test]
async fn test_chat_without_website_omits_website_id() {
    let (mut app, state) = spawn_backend(Backend {
        reply: json!({"response": "Hello! How can I help?"}),
        ..Default::default()
    })
    .await;

    send(&mut app, "  hi  ").await;

    assert_eq!(state.lock().unwrap().chat_bodies, vec![json!({"message": "hi"})]);
    let entries = app.transcript.entries();
    assert_eq!(entries.len(), 2);
    match (&entries[0], &entries[1]) {
        (TranscriptEntry::Message(user), TranscriptEntry::Message(agent)) => {
            assert_eq!(user.text, "hi");
            assert_eq!(user.sender, Sender::User);
            assert_eq!(agent.text, "Hello! How can I help?");
            assert_eq!(agent.sender, Sender::Agent);
        }
        other => panic!("unexpected entries {:?}", other),
    }
}

#[tokio::test]
async fn test_selected_website_scopes_chat() {
    let (mut app, state) = spawn_backend(Backend {
        reply: json!({"response": "Yes, we ship."}),
        websites: vec![json!({
            "id": 3,
            "url": "https://shop.example",
            "name": "Shop",
            "description": "Kitchenware",
            "icon": ""
        })],
        ..Default::default()
    })
    .await;

    app.refresh_websites();
    app.settle().await;
    assert_eq!(app.directory.labels(), vec!["Select Website", "Shop"]);

    app.select_website(1);
    assert_eq!(app.website_input.value(), "https://shop.example");
    let card = app.website_card.clone().unwrap();
    assert_eq!(card.name, "Shop");
    assert_eq!(card.icon, DEFAULT_ICON);

    send(&mut app, "do you ship?").await;

    // Clearing the selection drops the scope again
    app.select_website(0);
    send(&mut app, "thanks").await;

    let bodies = state.lock().unwrap().chat_bodies.clone();
    assert_eq!(
        bodies,
        vec![
            json!({"message": "do you ship?", "website_id": 3}),
            json!({"message": "thanks"}),
        ]
    );
}

#[tokio::test]
async fn test_register_website_populates_card_and_refreshes() {
    let (mut app, _state) = spawn_backend(Backend::default()).await;

    app.website_input.set(" example.com ");
    app.submit_website();
    assert!(app.registration_in_flight());
    app.settle().await;
    assert!(!app.registration_in_flight());

    let card = app.website_card.clone().unwrap();
    assert_eq!(card.name, "Example 1");
    assert_eq!(card.description, "An example shop");
    assert_eq!(card.icon_label(), "data:image/png (inline)");
    assert_eq!(app.website_input.value(), "");

    let urls: Vec<_> = app
        .directory
        .websites()
        .iter()
        .filter_map(|site| site.url())
        .collect();
    assert_eq!(urls, vec!["example.com"]);
}

#[tokio::test]
async fn test_failed_registration_keeps_input() {
    let (mut app, _state) = spawn_backend(Backend {
        fail_register: true,
        ..Default::default()
    })
    .await;

    app.website_input.set("not a site");
    app.submit_website();
    app.settle().await;

    let card = app.website_card.clone().unwrap();
    assert_eq!(card.name, "Could not fetch website");
    assert_eq!(card.description, "");
    assert_eq!(card.icon, DEFAULT_ICON);
    assert_eq!(app.website_input.value(), "not a site");
    assert!(!app.registration_in_flight());
}

#[tokio::test]
async fn test_product_reply_renders_card() {
    let (mut app, _state) = spawn_backend(Backend {
        reply: json!({
            "response": "The Kettle is $20",
            "product": {"name": "Kettle", "content": "Boils fast", "price": "$20"}
        }),
        ..Default::default()
    })
    .await;

    send(&mut app, "tell me about the kettle").await;

    match app.transcript.last() {
        Some(TranscriptEntry::Product { product, .. }) => {
            assert_eq!(product.name().as_deref(), Some("Kettle"));
            assert_eq!(product.price().as_deref(), Some("$20"));
        }
        other => panic!("unexpected entry {:?}", other),
    }
}

#[tokio::test]
async fn test_comparison_reply_renders_table() {
    let products = json!([
        {"name": "Kettle", "price": "$20", "role": "assistant"},
        {"name": "Pot", "image": "pot.png"}
    ]);
    let (mut app, _state) = spawn_backend(Backend {
        reply: json!({"response": products.to_string()}),
        ..Default::default()
    })
    .await;

    send(&mut app, "compare kettle and pot").await;

    match app.transcript.last() {
        Some(TranscriptEntry::Comparison { table, .. }) => {
            assert_eq!(table.labels(), vec!["Name", "Price", "Image"]);
        }
        other => panic!("unexpected entry {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_reply_is_connection_error() {
    let (mut app, state) = spawn_backend(Backend {
        broken_reply: Some("Internal Server Error".to_string()),
        ..Default::default()
    })
    .await;

    send(&mut app, "hello?").await;

    assert_eq!(state.lock().unwrap().chat_bodies.len(), 1);
    match app.transcript.last() {
        Some(TranscriptEntry::Message(msg)) => assert_eq!(msg.text, CHAT_ERROR_TEXT),
        other => panic!("unexpected entry {:?}", other),
    }

    // Input is usable again
    send(&mut app, "retry").await;
    assert_eq!(app.transcript.len(), 4);
}

#[tokio::test]
async fn test_empty_reply_apologizes() {
    let (mut app, _state) = spawn_backend(Backend {
        reply: json!({"detail": "nothing"}),
        ..Default::default()
    })
    .await;

    send(&mut app, "anyone there?").await;

    match app.transcript.last() {
        Some(TranscriptEntry::Message(msg)) => {
            assert_eq!(msg.text, "Sorry, no response from agent.");
        }
        other => panic!("unexpected entry {:?}", other),
    }
}

#[tokio::test]
async fn test_json_body_without_fields_apologizes() {
    for body in [json!(null), json!("hello"), json!(42)] {
        let (mut app, _state) = spawn_backend(Backend {
            reply: body.clone(),
            ..Default::default()
        })
        .await;

        send(&mut app, "anyone there?").await;

        match app.transcript.last() {
            Some(TranscriptEntry::Message(msg)) => {
                assert_eq!(msg.text, "Sorry, no response from agent.", "body {}", body);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }
}
