use crate::domain_model::Identity;
use crate::domain_port::*;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct MemoryUser {
    dn: String,
    password: String,
    groups: Vec<String>,
}

/// Directory held in process memory, used by tests. It can
/// simulate duplicate entries, outages and failing group lookups.
pub struct MemoryDirectory {
    users: DashMap<String, Vec<MemoryUser>>,
    available: AtomicBool,
    groups_available: AtomicBool,
    resolve_calls: AtomicUsize,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        MemoryDirectory {
            users: DashMap::new(),
            available: AtomicBool::new(true),
            groups_available: AtomicBool::new(true),
            resolve_calls: AtomicUsize::new(0),
        }
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Adding a second entry under the same id makes the id ambiguous.
    pub fn add_user(&self, id: &str, dn: &str, password: &str, groups: &[&str]) {
        self.users.entry(id.to_string()).or_default().push(MemoryUser {
            dn: dn.to_string(),
            password: password.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        });
    }

    pub fn set_dn(&self, id: &str, dn: &str) {
        if let Some(mut entries) = self.users.get_mut(id) {
            for user in entries.iter_mut() {
                user.dn = dn.to_string();
            }
        }
    }

    pub fn remove_user(&self, id: &str) {
        self.users.remove(id);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_groups_available(&self, available: bool) {
        self.groups_available.store(available, Ordering::SeqCst);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DirectoryError::Unavailable("directory is offline".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn resolve_user(&self, user_id: &str) -> Result<Identity, DirectoryError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let entries = self
            .users
            .get(user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        let user = match entries.as_slice() {
            [] => return Err(DirectoryError::NotFound(user_id.to_string())),
            [user] => user.clone(),
            many => {
                return Err(DirectoryError::Ambiguous {
                    user_id: user_id.to_string(),
                    count: many.len(),
                });
            }
        };

        let groups = if self.groups_available.load(Ordering::SeqCst) {
            user.groups
        } else {
            Vec::new()
        };
        Ok(Identity {
            dn: user.dn,
            id: user_id.to_string(),
            groups,
        })
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.check_available()?;

        let matched = self
            .users
            .iter()
            .any(|e| e.value().iter().any(|u| u.dn == dn && u.password == password));
        if matched {
            Ok(())
        } else {
            Err(DirectoryError::Bind {
                dn: dn.to_string(),
                reason: "invalid credentials".to_string(),
            })
        }
    }
}
