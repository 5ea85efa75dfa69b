//! Classification of chat replies into render instructions
//!
//! The backend answers every chat message with a loosely shaped JSON body.
//! Sometimes it carries an explicit `product`, sometimes a `response` string
//! that itself holds JSON (a product or a list of products to compare), and
//! sometimes just text. [`classify`] decides which of the three visual units
//! a reply turns into. It never fails: anything it cannot make sense of is
//! shown as plain text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::Sender;

/// Shown when a reply has neither a usable product nor a response.
pub const NO_RESPONSE_TEXT: &str = "Sorry, no response from agent.";

/// Keys that make a decoded object look like a product card.
const PRODUCT_KEYS: [&str; 4] = ["name", "image", "price", "link"];

/// Key that never becomes a comparison row.
const HIDDEN_COMPARISON_KEY: &str = "role";

/// Raw body of a `POST /api/chat` reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl BackendReply {
    /// Build a reply from any decoded body. Bodies that are not objects
    /// (`null`, a bare string, a number) carry neither field.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => Self {
                product: fields.remove("product"),
                response: fields.remove("response"),
            },
            _ => Self::default(),
        }
    }

    /// Text of the `response` field, if it is present and non-empty.
    ///
    /// Uses the same rule as product fields: `null` and `false` are empty.
    /// Non-string values (the backend occasionally returns an object) are
    /// taken as their compact JSON text so they run through the same decode.
    pub fn response_text(&self) -> Option<String> {
        self.response
            .as_ref()
            .map(display_text)
            .filter(|text| !text.is_empty())
    }
}

/// A product as returned by the agent: an ordered bag of string-ish fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product {
    fields: Map<String, Value>,
}

impl Product {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Decode a product from an arbitrary JSON value. Only objects qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|fields| Self {
            fields: fields.clone(),
        })
    }

    /// Keys in payload order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Display text for `key`, or `None` when absent or empty.
    pub fn field(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(display_text)
            .filter(|text| !text.is_empty())
    }

    pub fn name(&self) -> Option<String> {
        self.field("name")
    }

    pub fn content(&self) -> Option<String> {
        self.field("content")
    }

    pub fn image(&self) -> Option<String> {
        self.field("image")
    }

    pub fn price(&self) -> Option<String> {
        self.field("price")
    }

    pub fn link(&self) -> Option<String> {
        self.field("link")
    }

    /// True when the product has a name or content to show.
    pub fn is_presentable(&self) -> bool {
        self.name().is_some() || self.content().is_some()
    }

    fn has_card_fields(&self) -> bool {
        PRODUCT_KEYS.iter().any(|key| self.field(key).is_some())
    }
}

/// Text a JSON value shows as in a card or table cell.
fn display_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// What the transcript should append for one reply
#[derive(Debug, Clone, PartialEq)]
pub enum RenderInstruction {
    Message { text: String, sender: Sender },
    Product(Product),
    Comparison(Vec<Product>),
}

impl RenderInstruction {
    pub fn agent_message(text: impl Into<String>) -> Self {
        RenderInstruction::Message {
            text: text.into(),
            sender: Sender::Agent,
        }
    }
}

/// Shapes a `response` string can decode into, tried in order.
enum ResponsePayload {
    Comparison(Vec<Product>),
    Object(Product),
    Unrecognized,
}

impl ResponsePayload {
    fn decode(text: &str) -> Self {
        if let Ok(products) = serde_json::from_str::<Vec<Product>>(text) {
            if products.len() >= 2 {
                return ResponsePayload::Comparison(products);
            }
        }
        if let Ok(product) = serde_json::from_str::<Product>(text) {
            if product.is_presentable() {
                return ResponsePayload::Object(product);
            }
        }
        ResponsePayload::Unrecognized
    }
}

/// Decide how a reply is rendered. Pure; the same reply always yields the
/// same instruction.
pub fn classify(reply: &BackendReply) -> RenderInstruction {
    if let Some(product) = reply.product.as_ref().and_then(Product::from_value) {
        if product.is_presentable() {
            return RenderInstruction::Product(product);
        }
    }

    let Some(text) = reply.response_text() else {
        return RenderInstruction::agent_message(NO_RESPONSE_TEXT);
    };

    match ResponsePayload::decode(&text) {
        ResponsePayload::Comparison(products) => RenderInstruction::Comparison(products),
        ResponsePayload::Object(product) if product.has_card_fields() => {
            RenderInstruction::Product(product)
        }
        ResponsePayload::Object(product) => match product.content() {
            Some(content) => RenderInstruction::agent_message(content),
            None => RenderInstruction::agent_message(text),
        },
        ResponsePayload::Unrecognized => RenderInstruction::agent_message(text),
    }
}

/// One cell of a comparison table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Text(String),
    /// Thumbnail reference for an `image` value.
    Image(String),
    /// External link reference for a `link` value.
    Link(String),
}

impl Cell {
    fn for_key(key: &str, value: Option<String>) -> Self {
        match (key, value) {
            (_, None) => Cell::Empty,
            ("image", Some(src)) => Cell::Image(src),
            ("link", Some(href)) => Cell::Link(href),
            (_, Some(text)) => Cell::Text(text),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Image(src) => format!("[img] {}", src),
            Cell::Link(href) => format!("[view] {}", href),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub key: String,
    pub label: String,
    pub cells: Vec<Cell>,
}

/// Products laid out feature-by-feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonTable {
    pub headers: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Build the table, or `None` when there are fewer than two products.
    pub fn from_products(products: &[Product]) -> Option<Self> {
        if products.len() < 2 {
            return None;
        }

        let mut keys: Vec<&str> = Vec::new();
        for key in products.iter().flat_map(Product::keys) {
            if key != HIDDEN_COMPARISON_KEY && !keys.contains(&key) {
                keys.push(key);
            }
        }

        let headers = std::iter::once("Feature".to_string())
            .chain((1..=products.len()).map(|i| format!("Product {}", i)))
            .collect();

        let rows = keys
            .into_iter()
            .map(|key| ComparisonRow {
                key: key.to_string(),
                label: capitalize(key),
                cells: products
                    .iter()
                    .map(|p| Cell::for_key(key, p.field(key)))
                    .collect(),
            })
            .collect();

        Some(Self { headers, rows })
    }

    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.label.as_str()).collect()
    }

    /// Header and rows as padded text lines, columns separated by ` | `.
    pub fn text_rows(&self) -> Vec<String> {
        let grid: Vec<Vec<String>> = std::iter::once(self.headers.clone())
            .chain(self.rows.iter().map(|row| {
                std::iter::once(row.label.clone())
                    .chain(row.cells.iter().map(Cell::display))
                    .collect()
            }))
            .collect();

        let mut widths = vec![0; self.headers.len()];
        for line in &grid {
            for (width, text) in widths.iter_mut().zip(line) {
                *width = (*width).max(text.chars().count());
            }
        }

        grid.iter()
            .map(|line| {
                line.iter()
                    .zip(&widths)
                    .map(|(text, width)| format!("{:<width$}", text, width = *width))
                    .collect::<Vec<_>>()
                    .join(" | ")
                    .trim_end()
                    .to_string()
            })
            .collect()
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(value: Value) -> BackendReply {
        serde_json::from_value(value).unwrap()
    }

    fn response(text: &str) -> BackendReply {
        BackendReply {
            product: None,
            response: Some(Value::String(text.to_string())),
        }
    }

    #[test]
    fn test_explicit_product_wins() {
        let r = reply(json!({"product": {"name": "X"}, "response": "ignored"}));
        assert_eq!(
            classify(&r),
            RenderInstruction::Product(Product::from_pairs([("name", "X")]))
        );
    }

    #[test]
    fn test_product_with_only_content() {
        let r = reply(json!({"product": {"content": "A kettle"}}));
        assert!(matches!(classify(&r), RenderInstruction::Product(_)));
    }

    #[test]
    fn test_empty_product_falls_through_to_response() {
        let r = reply(json!({"product": {"name": "", "price": "$3"}, "response": "hello"}));
        assert_eq!(classify(&r), RenderInstruction::agent_message("hello"));
    }

    #[test]
    fn test_array_of_objects_is_comparison() {
        let r = response(r#"[{"name":"A","price":"$1"},{"name":"B","image":"x.png"}]"#);
        match classify(&r) {
            RenderInstruction::Comparison(products) => {
                assert_eq!(products.len(), 2);
                assert_eq!(products[1].image().as_deref(), Some("x.png"));
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_single_element_array_is_text() {
        let text = r#"[{"name":"A"}]"#;
        assert_eq!(classify(&response(text)), RenderInstruction::agent_message(text));
    }

    #[test]
    fn test_array_with_null_is_text() {
        let text = r#"[{"name":"A"}, null]"#;
        assert_eq!(classify(&response(text)), RenderInstruction::agent_message(text));
    }

    #[test]
    fn test_array_of_scalars_is_text() {
        let text = "[1, 2, 3]";
        assert_eq!(classify(&response(text)), RenderInstruction::agent_message(text));
    }

    #[test]
    fn test_object_with_content_only_is_message() {
        let r = response(r#"{"content":"We ship worldwide."}"#);
        assert_eq!(
            classify(&r),
            RenderInstruction::agent_message("We ship worldwide.")
        );
    }

    #[test]
    fn test_object_with_content_and_price_is_product() {
        let r = response(r#"{"content":"Blue mug","price":"$9"}"#);
        match classify(&r) {
            RenderInstruction::Product(p) => {
                assert_eq!(p.price().as_deref(), Some("$9"));
                assert_eq!(p.name(), None);
            }
            other => panic!("expected product, got {:?}", other),
        }
    }

    #[test]
    fn test_object_without_name_or_content_is_raw_text() {
        let text = r#"{"price":"$9"}"#;
        assert_eq!(classify(&response(text)), RenderInstruction::agent_message(text));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            classify(&response("plain non-JSON text")),
            RenderInstruction::agent_message("plain non-JSON text")
        );
    }

    #[test]
    fn test_json_scalar_is_raw_text() {
        assert_eq!(classify(&response("42")), RenderInstruction::agent_message("42"));
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(
            classify(&reply(json!({}))),
            RenderInstruction::agent_message(NO_RESPONSE_TEXT)
        );
        assert_eq!(
            classify(&response("")),
            RenderInstruction::agent_message(NO_RESPONSE_TEXT)
        );
        assert_eq!(
            classify(&reply(json!({"response": null}))),
            RenderInstruction::agent_message(NO_RESPONSE_TEXT)
        );
    }

    #[test]
    fn test_response_uses_field_truthiness() {
        assert_eq!(
            classify(&reply(json!({"response": false}))),
            RenderInstruction::agent_message(NO_RESPONSE_TEXT)
        );
        assert_eq!(
            classify(&reply(json!({"response": 0}))),
            RenderInstruction::agent_message("0")
        );
    }

    #[test]
    fn test_non_object_body_has_no_fields() {
        for body in [json!(null), json!("hello"), json!(42), json!([])] {
            assert_eq!(BackendReply::from_value(body), BackendReply::default());
        }
        assert_eq!(
            BackendReply::from_value(json!({"response": "hi", "extra": 1})),
            response("hi")
        );
    }

    #[test]
    fn test_non_string_response_is_decoded() {
        let r = reply(json!({"response": {"name": "Lamp", "link": "https://shop/lamp"}}));
        assert!(matches!(classify(&r), RenderInstruction::Product(_)));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let r = response(r#"[{"name":"A"},{"name":"B","role":"assistant"}]"#);
        assert_eq!(classify(&r), classify(&r));
    }

    #[test]
    fn test_numeric_fields_display() {
        let p = Product::from_value(&json!({"name": "A", "price": 12.5, "stock": 0, "sale": false}))
            .unwrap();
        assert_eq!(p.price().as_deref(), Some("12.5"));
        assert_eq!(p.field("stock").as_deref(), Some("0"));
        assert_eq!(p.field("sale"), None);
    }

    #[test]
    fn test_comparison_columns_in_first_seen_order() {
        let products = vec![
            Product::from_pairs([("name", "A"), ("price", "$1")]),
            Product::from_pairs([("name", "B"), ("image", "x.png")]),
        ];
        let table = ComparisonTable::from_products(&products).unwrap();
        assert_eq!(table.labels(), vec!["Name", "Price", "Image"]);
        assert_eq!(table.headers, vec!["Feature", "Product 1", "Product 2"]);
    }

    #[test]
    fn test_comparison_skips_role_and_fills_gaps() {
        let products = vec![
            Product::from_pairs([("role", "assistant"), ("name", "A"), ("link", "https://a")]),
            Product::from_pairs([("name", "B"), ("image", "b.png")]),
            Product::from_pairs([("warranty", "2y")]),
        ];
        let table = ComparisonTable::from_products(&products).unwrap();
        assert_eq!(table.labels(), vec!["Name", "Link", "Image", "Warranty"]);

        let link = &table.rows[1];
        assert_eq!(
            link.cells,
            vec![Cell::Link("https://a".to_string()), Cell::Empty, Cell::Empty]
        );
        let image = &table.rows[2];
        assert_eq!(image.cells[1], Cell::Image("b.png".to_string()));
        assert_eq!(table.rows[3].cells[2], Cell::Text("2y".to_string()));
    }

    #[test]
    fn test_comparison_needs_two_products() {
        assert!(ComparisonTable::from_products(&[]).is_none());
        assert!(ComparisonTable::from_products(&[Product::from_pairs([("name", "A")])]).is_none());
    }

    #[test]
    fn test_text_rows_align_columns() {
        let products = vec![
            Product::from_pairs([("name", "Kettle"), ("link", "https://k")]),
            Product::from_pairs([("name", "Pot")]),
        ];
        let table = ComparisonTable::from_products(&products).unwrap();
        assert_eq!(
            table.text_rows(),
            vec![
                "Feature | Product 1        | Product 2",
                "Name    | Kettle           | Pot",
                "Link    | [view] https://k |",
            ]
        );
    }

    #[test]
    fn test_capitalize_non_ascii() {
        assert_eq!(capitalize("über"), "Über");
        assert_eq!(capitalize(""), "");
    }
}
