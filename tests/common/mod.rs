#![allow(dead_code)]

use dirauth::application_impl::*;
use dirauth::domain_port::*;
use dirauth::infra_memory::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Barrier, Mutex};

pub const ACCESS_KEY: &[u8] = include_bytes!("../fixtures/access.key");
pub const ACCESS_PUB: &[u8] = include_bytes!("../fixtures/access.key.pub");
pub const REFRESH_KEY: &[u8] = include_bytes!("../fixtures/refresh.key");
pub const REFRESH_PUB: &[u8] = include_bytes!("../fixtures/refresh.key.pub");

pub const ALICE_DN: &str = "uid=alice,ou=people,dc=example,dc=com";
pub const ALICE_PASSWORD: &str = "wonderland";

pub fn access_codec() -> Arc<JwtRsaCodec> {
    Arc::new(JwtRsaCodec::new(KeyPair::from_pem(ACCESS_KEY, ACCESS_PUB).unwrap()))
}

pub fn refresh_codec() -> Arc<JwtRsaCodec> {
    Arc::new(JwtRsaCodec::new(KeyPair::from_pem(REFRESH_KEY, REFRESH_PUB).unwrap()))
}

pub fn directory_with_alice() -> Arc<MemoryDirectory> {
    let directory = Arc::new(MemoryDirectory::new());
    directory.add_user(
        "alice",
        ALICE_DN,
        ALICE_PASSWORD,
        &["cn=staff,ou=groups,dc=example,dc=com"],
    );
    directory
}

pub struct Harness {
    pub directory: Arc<MemoryDirectory>,
    pub store: Arc<MemorySessionStore>,
    pub service: Arc<SessionOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemorySessionStore::new());
        Self::with_store(store.clone(), store)
    }

    /// `store` is what the orchestrator talks to; `inner` is the memory store
    /// underneath it, kept for inspection.
    pub fn with_store(inner: Arc<MemorySessionStore>, store: Arc<dyn SessionStore>) -> Self {
        let directory = directory_with_alice();
        let service = Arc::new(SessionOrchestrator::new(
            directory.clone(),
            store,
            access_codec(),
            refresh_codec(),
            SessionConfig::default(),
        ));
        Harness {
            directory,
            store: inner,
            service,
        }
    }
}

/// Holds the first `gated` deletes until that many callers have arrived, so
/// concurrent refreshes all finish their lookup before any of them deletes.
pub struct GatedStore {
    pub inner: Arc<MemorySessionStore>,
    barrier: Barrier,
    gated: usize,
    deletes: AtomicUsize,
    /// Report every delete as having removed a key, like a store without counts.
    always_count: bool,
}

impl GatedStore {
    pub fn new(inner: Arc<MemorySessionStore>, gated: usize, always_count: bool) -> Self {
        GatedStore {
            inner,
            barrier: Barrier::new(gated),
            gated,
            deletes: AtomicUsize::new(0),
            always_count,
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for GatedStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.inner.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        if self.deletes.fetch_add(1, Ordering::SeqCst) < self.gated {
            self.barrier.wait().await;
        }
        let removed = self.inner.delete(key).await?;
        Ok(if self.always_count { 1 } else { removed })
    }
}

/// Fails every put after the first `allowed` and every delete when `fail_deletes` is set.
pub struct FlakyStore {
    pub inner: Arc<MemorySessionStore>,
    allowed_puts: usize,
    fail_deletes: bool,
    pub written: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemorySessionStore>, allowed_puts: usize, fail_deletes: bool) -> Self {
        FlakyStore {
            inner,
            allowed_puts,
            fail_deletes,
            written: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for FlakyStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut written = self.written.lock().await;
        if written.len() >= self.allowed_puts {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        written.push(key.to_string());
        self.inner.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        if self.fail_deletes {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.delete(key).await
    }
}

/// Fails deletes of the keys in `failing`; everything else passes through.
pub struct StickyKeyStore {
    pub inner: Arc<MemorySessionStore>,
    failing: Mutex<Vec<String>>,
}

impl StickyKeyStore {
    pub fn new(inner: Arc<MemorySessionStore>) -> Self {
        StickyKeyStore {
            inner,
            failing: Mutex::new(Vec::new()),
        }
    }

    pub async fn fail_deletes_of(&self, key: impl Into<String>) {
        self.failing.lock().await.push(key.into());
    }
}

#[async_trait::async_trait]
impl SessionStore for StickyKeyStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.inner.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        if self.failing.lock().await.iter().any(|k| k == key) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.delete(key).await
    }
}
