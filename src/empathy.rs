//! Client for the empathy responder behind `/api/gemini`.
//!
//! The page posts a student's free-form vent and shows either the model's
//! reply or one of three fallback messages. Nothing here shares state with
//! the iron house; the request runs on the browser's event loop.

use std::fmt;

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response, window};

pub const ENDPOINT: &str = "/api/gemini";

pub const GREETING: &str = "你好。我知道你很累。在这里，你可以放下所有的防备。告诉我，今天发生了什么？或者仅仅是发泄一下，我都在听。";

const UNCONFIGURED_MESSAGE: &str = "AI 功能未启用：未配置 GEMINI_API_KEY（或未部署 /api/gemini）。";
const UPSTREAM_MESSAGE: &str = "抱歉，我现在无法倾听。请稍后再试。";
const NETWORK_MESSAGE: &str = "连接断开... 就像我们与睡眠的连接一样。请检查网络稍后再试。";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmpathyError {
    /// The proxy has no API key (HTTP 503) or is not deployed.
    Unconfigured,
    /// Non-success status, or a success without usable text.
    Upstream { status: u16 },
    /// The request never completed.
    Network(String),
}

impl EmpathyError {
    /// Message shown to the student in place of a reply.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            EmpathyError::Unconfigured => UNCONFIGURED_MESSAGE,
            EmpathyError::Upstream { .. } => UPSTREAM_MESSAGE,
            EmpathyError::Network(_) => NETWORK_MESSAGE,
        }
    }
}

impl fmt::Display for EmpathyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmpathyError::Unconfigured => write!(f, "empathy responder is not configured"),
            EmpathyError::Upstream { status } => {
                write!(f, "empathy responder failed with status {status}")
            }
            EmpathyError::Network(detail) => write!(f, "empathy request failed: {detail}"),
        }
    }
}

impl std::error::Error for EmpathyError {}

#[derive(Serialize)]
struct VentBody<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ReplyBody {
    text: Option<String>,
}

#[derive(Deserialize)]
struct AvailabilityBody {
    #[serde(default)]
    ok: bool,
}

/// JSON body posted to the proxy.
pub fn request_body(text: &str) -> String {
    serde_json::to_string(&VentBody { text }).unwrap_or_else(|_| String::from("{}"))
}

/// Map the proxy's answer to a reply or an error.
pub fn interpret_reply(status: u16, body: Option<&str>) -> Result<String, EmpathyError> {
    if status == 503 {
        return Err(EmpathyError::Unconfigured);
    }
    if !(200..300).contains(&status) {
        return Err(EmpathyError::Upstream { status });
    }
    body.and_then(|b| serde_json::from_str::<ReplyBody>(b).ok())
        .and_then(|r| r.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or(EmpathyError::Upstream { status })
}

/// Whether the proxy's `GET` answer says a key is configured.
pub fn interpret_availability(status: u16, body: Option<&str>) -> bool {
    status == 200
        && body
            .and_then(|b| serde_json::from_str::<AvailabilityBody>(b).ok())
            .is_some_and(|p| p.ok)
}

// --- Transcript --------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: f64,
}

/// Chat transcript with at most one request in flight.
#[derive(Clone, Debug)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending: bool,
    seq: u64,
}

impl Conversation {
    pub fn new(now: f64) -> Self {
        Self {
            messages: vec![ChatMessage {
                id: "init".into(),
                role: Role::Model,
                content: GREETING.into(),
                timestamp: now,
            }],
            pending: false,
            seq: 0,
        }
    }

    fn push(&mut self, role: Role, content: String, now: f64) {
        self.seq += 1;
        self.messages.push(ChatMessage {
            id: format!("{}-{}", now as u64, self.seq),
            role,
            content,
            timestamp: now,
        });
    }

    /// Record the user's message and return the text to send, or `None` when
    /// the input is blank or a reply is still pending.
    pub fn begin(&mut self, input: &str, now: f64) -> Option<String> {
        if self.pending || input.trim().is_empty() {
            return None;
        }
        self.push(Role::User, input.to_owned(), now);
        self.pending = true;
        Some(input.to_owned())
    }

    /// Append the model's reply. Returns false if nothing was pending.
    pub fn finish(&mut self, reply: String, now: f64) -> bool {
        if !self.pending {
            return false;
        }
        self.push(Role::Model, reply, now);
        self.pending = false;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.messages)
    }
}

// --- Browser bindings ----------------------------------------------------------

fn now_ms() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn network(e: JsValue) -> EmpathyError {
    EmpathyError::Network(format!("{e:?}"))
}

async fn read_text(resp: &Response) -> Option<String> {
    let promise = resp.text().ok()?;
    JsFuture::from(promise).await.ok()?.as_string()
}

async fn send(endpoint: &str, method: &str, body: Option<&str>) -> Result<Response, EmpathyError> {
    let win = window().ok_or_else(|| EmpathyError::Network("no window".into()))?;
    let init = RequestInit::new();
    init.set_method(method);
    if let Some(body) = body {
        let headers = Headers::new().map_err(network)?;
        headers
            .set("content-type", "application/json")
            .map_err(network)?;
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(body));
    }
    let request = Request::new_with_str_and_init(endpoint, &init).map_err(network)?;
    JsFuture::from(win.fetch_with_request(&request))
        .await
        .map_err(network)?
        .dyn_into::<Response>()
        .map_err(network)
}

pub async fn fetch_reply(endpoint: &str, text: &str) -> Result<String, EmpathyError> {
    let resp = send(endpoint, "POST", Some(&request_body(text))).await?;
    let status = resp.status();
    let body = read_text(&resp).await;
    interpret_reply(status, body.as_deref())
}

/// Reply to a student's vent. Always resolves: failures become a fallback message.
#[wasm_bindgen]
pub async fn generate_empathy_response(text: String) -> String {
    match fetch_reply(ENDPOINT, &text).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "empathy responder fell back");
            e.fallback_message().to_owned()
        }
    }
}

/// Ask the proxy whether it has a key configured.
#[wasm_bindgen]
pub async fn empathy_available() -> bool {
    match send(ENDPOINT, "GET", None).await {
        Ok(resp) => {
            let status = resp.status();
            interpret_availability(status, read_text(&resp).await.as_deref())
        }
        Err(e) => {
            tracing::warn!(error = %e, "empathy availability check failed");
            false
        }
    }
}

/// Chat transcript for the listener widget.
#[wasm_bindgen]
pub struct ListenerChat {
    inner: Conversation,
}

#[wasm_bindgen]
impl ListenerChat {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ListenerChat {
        ListenerChat { inner: Conversation::new(now_ms()) }
    }

    /// Returns the text to pass to `generate_empathy_response`, or undefined.
    pub fn begin(&mut self, input: &str) -> Option<String> {
        self.inner.begin(input, now_ms())
    }

    pub fn finish(&mut self, reply: String) -> bool {
        self.inner.finish(reply, now_ms())
    }

    #[wasm_bindgen(getter)]
    pub fn pending(&self) -> bool {
        self.inner.is_pending()
    }

    pub fn messages_json(&self) -> Result<String, JsValue> {
        self.inner
            .to_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_503_means_unconfigured() {
        let err = interpret_reply(503, Some(r#"{"error":"AI not configured"}"#)).unwrap_err();
        assert_eq!(err, EmpathyError::Unconfigured);
        assert!(err.fallback_message().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn other_failures_are_upstream() {
        assert_eq!(interpret_reply(502, None), Err(EmpathyError::Upstream { status: 502 }));
        assert_eq!(interpret_reply(413, Some("{}")), Err(EmpathyError::Upstream { status: 413 }));
        assert_eq!(interpret_reply(200, Some("not json")), Err(EmpathyError::Upstream { status: 200 }));
        assert_eq!(interpret_reply(200, Some(r#"{"text":"   "}"#)), Err(EmpathyError::Upstream { status: 200 }));
        assert_eq!(interpret_reply(200, None), Err(EmpathyError::Upstream { status: 200 }));
    }

    #[test]
    fn success_returns_text() {
        assert_eq!(interpret_reply(200, Some(r#"{"text":"我在听。"}"#)).unwrap(), "我在听。");
    }

    #[test]
    fn fallback_messages_are_distinct() {
        let msgs = [
            EmpathyError::Unconfigured.fallback_message(),
            EmpathyError::Upstream { status: 500 }.fallback_message(),
            EmpathyError::Network("offline".into()).fallback_message(),
        ];
        assert_ne!(msgs[0], msgs[1]);
        assert_ne!(msgs[1], msgs[2]);
        assert_ne!(msgs[0], msgs[2]);
    }

    #[test]
    fn body_escapes_text() {
        assert_eq!(request_body("say \"hi\""), r#"{"text":"say \"hi\""}"#);
    }

    #[test]
    fn availability_reads_ok_flag() {
        assert!(interpret_availability(200, Some(r#"{"ok":true}"#)));
        assert!(!interpret_availability(200, Some(r#"{"ok":false}"#)));
        assert!(!interpret_availability(200, Some("{}")));
        assert!(!interpret_availability(404, Some(r#"{"ok":true}"#)));
    }

    #[test]
    fn conversation_allows_one_request_in_flight() {
        let mut chat = Conversation::new(0.0);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].role, Role::Model);

        assert_eq!(chat.begin("   ", 1.0), None);
        assert_eq!(chat.begin("好累", 2.0).as_deref(), Some("好累"));
        assert!(chat.is_pending());
        assert_eq!(chat.begin("还在吗", 3.0), None);

        assert!(chat.finish("抱抱你".into(), 4.0));
        assert!(!chat.finish("extra".into(), 5.0));
        assert!(!chat.is_pending());

        let roles: Vec<Role> = chat.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Model, Role::User, Role::Model]);
        assert_ne!(chat.messages()[1].id, chat.messages()[2].id);
    }

    #[test]
    fn transcript_serialises_roles_lowercase() {
        let chat = Conversation::new(0.0);
        let json = chat.to_json().unwrap();
        assert!(json.contains(r#""role":"model""#), "{json}");
        assert!(json.contains(r#""id":"init""#));
    }
}
