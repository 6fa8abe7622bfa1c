//! In-process fake of the Telegram Bot API for tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicI32, Ordering},
    },
};

use {
    axum::{
        Json, Router,
        body::{Body, Bytes},
        extract::{Path, State},
        http::{HeaderMap, StatusCode, Uri, header::CONTENT_TYPE},
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    serde::Deserialize,
    serde_json::{Value, json},
    teloxide::{Bot, types::Message},
};

pub(crate) const CHAT_ID: i64 = 42;
pub(crate) const FILE_MESSAGE_ID: i32 = 7;

fn message_json(media: Value) -> Value {
    let mut base = json!({
        "message_id": FILE_MESSAGE_ID,
        "date": 1,
        "chat": { "id": CHAT_ID, "type": "private", "first_name": "Alice" },
        "from": {
            "id": 1001,
            "is_bot": false,
            "first_name": "Alice",
            "username": "alice"
        }
    });
    if let (Some(base), Some(extra)) = (base.as_object_mut(), media.as_object()) {
        base.extend(extra.clone());
    }
    base
}

/// Build a private-chat message from Alice carrying `media` fields.
pub(crate) fn message(media: Value) -> Message {
    serde_json::from_str(&message_json(media).to_string()).expect("deserialize test message")
}

/// Wrap a message carrying `media` into a webhook push payload, parsed from
/// text the same way the gateway parses request bodies.
pub(crate) fn update(update_id: i64, media: Value) -> teloxide::types::Update {
    let payload = json!({ "update_id": update_id, "message": message_json(media) });
    serde_json::from_str(&payload.to_string()).expect("deserialize test update")
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(default)]
    pub parse_mode: Option<String>,
    #[serde(default)]
    pub reply_parameters: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EditMessageTextRequest {
    pub chat_id: i64,
    pub message_id: i32,
    pub text: String,
    #[serde(default)]
    pub parse_mode: Option<String>,
    #[serde(default)]
    pub link_preview_options: Option<Value>,
}

#[derive(Debug, Clone)]
pub(crate) struct SetWebhookRequest {
    pub url: String,
    pub secret_token: Option<String>,
    pub allowed_updates: Option<Vec<String>>,
}

impl SetWebhookRequest {
    /// `setWebhook` may carry a certificate upload, so the client sends it as
    /// multipart form data; plain JSON bodies are accepted as well.
    fn decode(headers: &HeaderMap, body: &[u8]) -> Option<Self> {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let fields = if content_type.starts_with("multipart/form-data") {
            multipart_fields(content_type, body)
        } else {
            let value: Value = serde_json::from_slice(body).ok()?;
            value
                .as_object()?
                .iter()
                .map(|(k, v)| {
                    let text = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                    (k.clone(), text)
                })
                .collect()
        };

        let text = |raw: &String| {
            serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.clone())
        };
        Some(Self {
            url: fields.get("url").map(text)?,
            secret_token: fields.get("secret_token").map(text),
            allowed_updates: fields
                .get("allowed_updates")
                .and_then(|raw| serde_json::from_str(raw).ok()),
        })
    }
}

/// Text parts of a `multipart/form-data` body keyed by field name.
fn multipart_fields(content_type: &str, body: &[u8]) -> HashMap<String, String> {
    let Some(boundary) = content_type
        .split(';')
        .find_map(|p| p.trim().strip_prefix("boundary="))
    else {
        return HashMap::new();
    };
    let delimiter = format!("--{}", boundary.trim_matches('"'));
    let body = String::from_utf8_lossy(body);
    body.split(delimiter.as_str())
        .filter_map(|part| {
            let (head, value) = part.split_once("\r\n\r\n")?;
            let name = head.split("name=\"").nth(1)?.split('"').next()?;
            Some((name.to_string(), value.trim_end_matches("\r\n").to_string()))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) enum Captured {
    SendMessage(SendMessageRequest),
    EditMessageText(EditMessageTextRequest),
    GetFile { file_id: String },
    GetMe,
    SetWebhook(SetWebhookRequest),
    Download { path: String },
    Other { method: String },
}

/// Knobs for the fake API.
#[derive(Clone, Default)]
pub(crate) struct MockOptions {
    /// Bytes served for every file download.
    pub file_bytes: Vec<u8>,
    /// When set, `getFile` fails with this description.
    pub get_file_error: Option<String>,
    /// When set, `sendMessage` fails with this description.
    pub send_error: Option<String>,
    /// When set, every `editMessageText` fails with this description.
    pub edit_error: Option<String>,
    /// Refuse HTML-formatted edits the way the API refuses bad entities.
    pub reject_html_edits: bool,
    /// Drop the connection partway through every file download.
    pub fail_download: bool,
}

struct MockState {
    options: MockOptions,
    requests: Mutex<Vec<Captured>>,
    next_message_id: AtomicI32,
}

pub(crate) struct MockTelegramApi {
    pub bot: Bot,
    state: Arc<MockState>,
}

impl MockTelegramApi {
    pub(crate) async fn start(options: MockOptions) -> Self {
        let state = Arc::new(MockState {
            options,
            requests: Mutex::new(Vec::new()),
            next_message_id: AtomicI32::new(100),
        });
        let app = Router::new()
            .route("/file/{*path}", get(download_handler))
            .route("/{*path}", post(api_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock telegram api");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("serve mock telegram api");
        });

        let api_url = url::Url::parse(&format!("http://{addr}/")).expect("parse api url");
        let bot = Bot::new("test-token").set_api_url(api_url);
        Self { bot, state }
    }

    pub(crate) fn requests(&self) -> Vec<Captured> {
        self.state.requests.lock().expect("lock requests").clone()
    }

    pub(crate) fn sent(&self) -> Vec<SendMessageRequest> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Captured::SendMessage(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn edits(&self) -> Vec<EditMessageTextRequest> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Captured::EditMessageText(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn get_file_ids(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Captured::GetFile { file_id } => Some(file_id),
                _ => None,
            })
            .collect()
    }
}

fn ok(result: Value) -> Response {
    Json(json!({ "ok": true, "result": result })).into_response()
}

fn api_error(description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error_code": 400, "description": description })),
    )
        .into_response()
}

fn message_result(message_id: i32, text: &str) -> Response {
    ok(json!({
        "message_id": message_id,
        "date": 0,
        "chat": { "id": CHAT_ID, "type": "private", "first_name": "Alice" },
        "text": text
    }))
}

async fn api_handler(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    let name = method.clone();
    let record = |captured: Captured| {
        state
            .requests
            .lock()
            .expect("lock requests")
            .push(captured);
    };

    match name.as_str() {
        "SendMessage" => match serde_json::from_slice::<SendMessageRequest>(&body) {
            Ok(req) => {
                let text = req.text.clone();
                record(Captured::SendMessage(req));
                if let Some(description) = &state.options.send_error {
                    return api_error(description);
                }
                let id = state.next_message_id.fetch_add(1, Ordering::SeqCst);
                message_result(id, &text)
            },
            Err(_) => {
                record(Captured::Other { method });
                ok(json!(true))
            },
        },
        "EditMessageText" => match serde_json::from_slice::<EditMessageTextRequest>(&body) {
            Ok(req) => {
                let (id, text) = (req.message_id, req.text.clone());
                let html = req.parse_mode.as_deref() == Some("HTML");
                record(Captured::EditMessageText(req));
                if let Some(description) = &state.options.edit_error {
                    return api_error(description);
                }
                if html && state.options.reject_html_edits {
                    return api_error("Bad Request: can't parse entities: unsupported start tag");
                }
                message_result(id, &text)
            },
            Err(_) => {
                record(Captured::Other { method });
                ok(json!(true))
            },
        },
        "GetFile" => {
            let file_id = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v["file_id"].as_str().map(str::to_string))
                .unwrap_or_default();
            record(Captured::GetFile {
                file_id: file_id.clone(),
            });
            if let Some(description) = &state.options.get_file_error {
                return api_error(description);
            }
            ok(json!({
                "file_id": file_id,
                "file_unique_id": format!("unique-{file_id}"),
                "file_size": state.options.file_bytes.len(),
                "file_path": format!("documents/{file_id}.bin")
            }))
        },
        "GetMe" => {
            record(Captured::GetMe);
            ok(json!({
                "id": 5000,
                "is_bot": true,
                "first_name": "DriveBot",
                "username": "drive_relay_bot",
                "can_join_groups": true,
                "can_read_all_group_messages": false,
                "supports_inline_queries": false,
                "can_connect_to_business": false,
                "has_main_web_app": false
            }))
        },
        "SetWebhook" => {
            match SetWebhookRequest::decode(&headers, &body) {
                Some(req) => record(Captured::SetWebhook(req)),
                None => record(Captured::Other { method }),
            }
            ok(json!(true))
        },
        _ => {
            record(Captured::Other { method });
            ok(json!(true))
        },
    }
}

async fn download_handler(
    State(state): State<Arc<MockState>>,
    Path(path): Path<String>,
) -> Response {
    state
        .requests
        .lock()
        .expect("lock requests")
        .push(Captured::Download { path });
    if state.options.fail_download {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("connection reset")),
        ];
        return Body::from_stream(futures::stream::iter(chunks)).into_response();
    }
    state.options.file_bytes.clone().into_response()
}
