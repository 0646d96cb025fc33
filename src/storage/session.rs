use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::{ChatId, UserId};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::download::link::SupportedLink;

/// Sessions are independent per user inside each chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat: ChatId,
    pub user: UserId,
}

impl SessionKey {
    pub fn new(chat: ChatId, user: UserId) -> Self {
        Self { chat, user }
    }
}

#[derive(Debug, Clone)]
struct PendingLink {
    link: SupportedLink,
    stored_at: Instant,
}

#[derive(Debug)]
struct ActiveDownload {
    id: Uuid,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct Session {
    links: HashMap<String, PendingLink>,
    active: Option<ActiveDownload>,
}

impl Session {
    fn is_idle(&self) -> bool {
        self.links.is_empty() && self.active.is_none()
    }
}

/// In-memory token → link table with TTL, plus the in-flight download of
/// every session.
///
/// Cloning is cheap and shares the same table.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionKey, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores `token → link`, refreshing the entry if the token already exists.
    pub async fn remember(&self, key: SessionKey, token: &str, link: SupportedLink) {
        let mut sessions = self.sessions.lock().await;
        sessions.entry(key).or_default().links.insert(
            token.to_string(),
            PendingLink {
                link,
                stored_at: Instant::now(),
            },
        );
    }

    /// Looks up a token; expired entries are dropped and reported as absent.
    pub async fn resolve(&self, key: SessionKey, token: &str) -> Option<SupportedLink> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&key)?;

        match session.links.get(token) {
            Some(pending) if pending.stored_at.elapsed() < self.ttl => Some(pending.link.clone()),
            Some(_) => {
                log::debug!("Token {} expired for chat {}", token, key.chat);
                session.links.remove(token);
                None
            }
            None => None,
        }
    }

    /// Registers download `id` as in flight, cancelling the previous one.
    pub async fn begin_download(&self, key: SessionKey, id: Uuid) -> CancellationToken {
        let cancel = CancellationToken::new();

        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(key).or_default();
        if let Some(previous) = session.active.replace(ActiveDownload {
            id,
            cancel: cancel.clone(),
        }) {
            log::info!("Cancelling download {} superseded by {}", previous.id, id);
            previous.cancel.cancel();
        }

        cancel
    }

    /// Clears the in-flight marker if it still belongs to `id`.
    pub async fn finish_download(&self, key: SessionKey, id: Uuid) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&key) {
            if session.active.as_ref().is_some_and(|active| active.id == id) {
                session.active = None;
            }
            if session.is_idle() {
                sessions.remove(&key);
            }
        }
    }

    /// Cancels the session's in-flight download. Returns false when there is none.
    pub async fn cancel(&self, key: SessionKey) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&key).and_then(|session| session.active.take()) {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes expired links and idle sessions. Returns the number of links removed.
    pub async fn sweep(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let mut removed = 0;

        for session in sessions.values_mut() {
            let before = session.links.len();
            session.links.retain(|_, pending| pending.stored_at.elapsed() < self.ttl);
            removed += before - session.links.len();
        }
        sessions.retain(|_, session| !session.is_idle());

        removed
    }

    /// Forgets everything, cancelling in-flight downloads.
    pub async fn clear(&self) {
        let mut sessions = self.sessions.lock().await;
        for session in sessions.values() {
            if let Some(active) = &session.active {
                active.cancel.cancel();
            }
        }
        sessions.clear();
    }

    /// Number of stored links across all sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.values().map(|s| s.links.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Spawns the periodic sweep of expired links.
pub fn spawn_sweeper(store: SessionStore, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = store.sweep().await;
            if removed > 0 {
                log::info!("Session sweep removed {} expired links", removed);
            }
        }
    })
}
