//! Cookie-backed sessions.
//!
//! The cookie only carries a signed session id; the data it points at lives
//! in the in-memory [`SessionStore`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use moka::sync::Cache;
use parking_lot::Mutex;
use sha2::Sha256;
use uuid::Uuid;

use super::error::ApiError;
use super::server::AppState;

pub const SESSION_COOKIE: &str = "session";

type HmacSha256 = Hmac<Sha256>;

/// Where a session's latest download lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub download_id: Uuid,
    /// `<temp root>/<download_id>`
    pub dir: PathBuf,
    /// Set once the download finished
    pub path: Option<PathBuf>,
}

impl DownloadRecord {
    pub fn new(download_id: Uuid, dir: PathBuf) -> Self {
        Self {
            download_id,
            dir,
            path: None,
        }
    }
}

/// Category of a flash message, rendered as the `alert-<category>` class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
        }
    }
}

/// One-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Default)]
struct SessionData {
    download: Option<DownloadRecord>,
    flashes: Vec<FlashMessage>,
}

/// Sessions idle longer than this are dropped.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

const MAX_SESSIONS: u64 = 100_000;

/// Server-side session data, keyed by session id.
///
/// Entries are only created by writes that need to survive the request
/// (a started download, a flash), and expire after an idle period.
pub struct SessionStore {
    sessions: Cache<Uuid, Arc<Mutex<SessionData>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE)
    }
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(MAX_SESSIONS)
                .time_to_idle(idle_timeout)
                .build(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<R>(&self, id: &Uuid, f: impl FnOnce(Option<&SessionData>) -> R) -> R {
        let entry = self.sessions.get(id);
        let guard = entry.as_ref().map(|data| data.lock());
        f(guard.as_deref())
    }

    /// Mutate an existing entry; absent sessions stay absent.
    fn update_existing<R>(&self, id: &Uuid, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let data = self.sessions.get(id)?;
        let mut data = data.lock();
        Some(f(&mut data))
    }

    fn upsert<R>(&self, id: Uuid, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let data = self
            .sessions
            .get_with(id, || Arc::new(Mutex::new(SessionData::default())));
        let mut data = data.lock();
        f(&mut data)
    }
}

/// Handle to the current request's session.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    store: Arc<SessionStore>,
}

impl Session {
    pub fn new(id: Uuid, store: Arc<SessionStore>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn download(&self) -> Option<DownloadRecord> {
        self.store
            .read(&self.id, |data| data.and_then(|d| d.download.clone()))
    }

    /// Replace any previous download with a fresh, still pending one.
    pub fn start_download(&self, record: DownloadRecord) {
        self.store.upsert(self.id, |data| data.download = Some(record));
    }

    /// Record the finished file, unless a newer download replaced `download_id` meanwhile.
    pub fn finish_download(&self, download_id: Uuid, path: PathBuf) -> bool {
        self.store
            .update_existing(&self.id, |data| match data.download.as_mut() {
                Some(record) if record.download_id == download_id => {
                    record.path = Some(path);
                    true
                }
                _ => false,
            })
            .unwrap_or(false)
    }

    pub fn clear_download(&self) -> Option<DownloadRecord> {
        self.store
            .update_existing(&self.id, |data| data.download.take())
            .flatten()
    }

    pub fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        let message = FlashMessage {
            level,
            message: message.into(),
        };
        self.store.upsert(self.id, |data| data.flashes.push(message));
    }

    pub fn take_flashes(&self) -> Vec<FlashMessage> {
        self.store
            .update_existing(&self.id, |data| std::mem::take(&mut data.flashes))
            .unwrap_or_default()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::internal("Session layer is not installed"))
    }
}

/// Signs session ids with HMAC-SHA256 of the configured secret.
pub struct SessionSigner {
    key: Vec<u8>,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length")
    }

    /// `<uuid>.<hex signature>`
    pub fn sign(&self, id: &Uuid) -> String {
        let id = id.to_string();
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        format!("{}.{}", id, hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, value: &str) -> Option<Uuid> {
        let (id, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Uuid::parse_str(id).ok()
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Resolve the session from its cookie, or issue a new one.
pub async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let existing = cookie_value(req.headers(), SESSION_COOKIE).and_then(|v| state.signer.verify(v));
    let (id, issued) = match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4(), true),
    };

    req.extensions_mut()
        .insert(Session::new(id, state.sessions.clone()));

    let mut response = next.run(req).await;

    if issued {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            state.signer.sign(&id)
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Failed to build session cookie"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = SessionSigner::new("secret");
        let id = Uuid::new_v4();
        let signed = signer.sign(&id);
        assert_eq!(signer.verify(&signed), Some(id));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let signer = SessionSigner::new("secret");
        let signed = signer.sign(&Uuid::new_v4());
        let (_, signature) = signed.rsplit_once('.').unwrap();
        let forged = format!("{}.{}", Uuid::new_v4(), signature);

        assert_eq!(signer.verify(&forged), None);
        assert_eq!(SessionSigner::new("other").verify(&signed), None);
        assert_eq!(signer.verify("garbage"), None);
        assert_eq!(signer.verify("abc.zz"), None);
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def; other=1"),
        );
        assert_eq!(cookie_value(&headers, "session"), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_download_record_lifecycle() {
        let store = Arc::new(SessionStore::default());
        let session = Session::new(Uuid::new_v4(), store.clone());
        assert_eq!(session.download(), None);

        let first = Uuid::new_v4();
        session.start_download(DownloadRecord::new(first, PathBuf::from("temp/a")));
        assert_eq!(session.download().unwrap().path, None);

        let second = Uuid::new_v4();
        session.start_download(DownloadRecord::new(second, PathBuf::from("temp/b")));
        // Finishing the superseded download does not clobber the newer one
        assert!(!session.finish_download(first, PathBuf::from("temp/a/x.mp4")));
        assert!(session.finish_download(second, PathBuf::from("temp/b/y.mp4")));
        assert_eq!(
            session.download().unwrap().path,
            Some(PathBuf::from("temp/b/y.mp4"))
        );

        let cleared = session.clear_download().unwrap();
        assert_eq!(cleared.download_id, second);
        assert_eq!(session.download(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = Arc::new(SessionStore::default());
        let a = Session::new(Uuid::new_v4(), store.clone());
        let b = Session::new(Uuid::new_v4(), store.clone());
        a.start_download(DownloadRecord::new(Uuid::new_v4(), PathBuf::from("temp/a")));
        assert!(a.download().is_some());
        assert!(b.download().is_none());
    }

    #[test]
    fn test_reads_do_not_create_sessions() {
        let store = Arc::new(SessionStore::default());
        let session = Session::new(Uuid::new_v4(), store.clone());

        assert!(session.take_flashes().is_empty());
        assert_eq!(session.download(), None);
        assert_eq!(session.clear_download(), None);
        assert!(!session.finish_download(Uuid::new_v4(), PathBuf::from("temp/x.mp4")));
        assert!(store.is_empty());

        session.flash(FlashLevel::Error, "kept");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = Arc::new(SessionStore::new(Duration::from_millis(50)));
        let session = Session::new(Uuid::new_v4(), store.clone());
        session.start_download(DownloadRecord::new(Uuid::new_v4(), PathBuf::from("temp/a")));
        assert_eq!(store.len(), 1);

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(session.download(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_flashes_are_consumed() {
        let session = Session::new(Uuid::new_v4(), Arc::new(SessionStore::default()));
        session.flash(FlashLevel::Error, "gone");
        let flashes = session.take_flashes();
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].message, "gone");
        assert!(session.take_flashes().is_empty());
    }
}
