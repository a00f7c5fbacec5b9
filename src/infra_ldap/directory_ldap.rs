use crate::domain_model::Identity;
use crate::domain_port::*;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry, ldap_escape};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdapProtocol {
    Plain,
    Ldaps,
    StartTls,
}

#[derive(Clone)]
pub struct LdapConfig {
    pub protocol: LdapProtocol,
    pub host: String,
    pub port: u16,
    pub skip_verify: bool,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
    /// Search filter with one `%s` placeholder for the user id.
    pub user_filter: String,
    /// Search filter with one `%s` placeholder for the user's DN.
    pub group_filter: String,
    pub timeout: Duration,
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("skip_verify", &self.skip_verify)
            .field("bind_dn", &self.bind_dn)
            .field("base_dn", &self.base_dn)
            .field("user_filter", &self.user_filter)
            .field("group_filter", &self.group_filter)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Substitutes the escaped `value` for every `%s` in `template`.
pub fn render_filter(template: &str, value: &str) -> String {
    template.replace("%s", &ldap_escape(value))
}

/// Directory client over LDAP v3. Each call opens its own connection.
pub struct LdapDirectory {
    cfg: LdapConfig,
}

fn unavailable(e: LdapError) -> DirectoryError {
    DirectoryError::Unavailable(e.to_string())
}

impl LdapDirectory {
    pub fn new(cfg: LdapConfig) -> Self {
        LdapDirectory { cfg }
    }

    fn url(&self) -> String {
        let scheme = match self.cfg.protocol {
            LdapProtocol::Ldaps => "ldaps",
            LdapProtocol::Plain | LdapProtocol::StartTls => "ldap",
        };
        format!("{}://{}:{}", scheme, self.cfg.host, self.cfg.port)
    }

    async fn connect(&self) -> Result<Ldap, LdapError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.cfg.timeout)
            .set_starttls(self.cfg.protocol == LdapProtocol::StartTls)
            .set_no_tls_verify(self.cfg.skip_verify);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url()).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "ldap connection error");
            }
        });
        Ok(ldap)
    }

    async fn search(&self, ldap: &mut Ldap, filter: &str) -> Result<Vec<String>, LdapError> {
        debug!(base_dn = %self.cfg.base_dn, filter = %filter, "ldap search");
        let (entries, _) = ldap
            .search(&self.cfg.base_dn, Scope::Subtree, filter, vec!["dn"])
            .await?
            .success()?;
        Ok(entries
            .into_iter()
            .map(|e| SearchEntry::construct(e).dn)
            .collect())
    }

    async fn resolve_on(&self, ldap: &mut Ldap, user_id: &str) -> Result<Identity, DirectoryError> {
        ldap.simple_bind(&self.cfg.bind_dn, &self.cfg.bind_password)
            .await
            .and_then(|r| r.success())
            .map_err(unavailable)?;

        let filter = render_filter(&self.cfg.user_filter, user_id);
        let mut dns = self.search(ldap, &filter).await.map_err(unavailable)?;
        let dn = match dns.len() {
            0 => return Err(DirectoryError::NotFound(user_id.to_string())),
            1 => dns.remove(0),
            count => {
                return Err(DirectoryError::Ambiguous {
                    user_id: user_id.to_string(),
                    count,
                });
            }
        };

        // Group membership is enrichment only.
        let filter = render_filter(&self.cfg.group_filter, &dn);
        let groups = match self.search(ldap, &filter).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "group search failed, continuing without groups"
                );
                Vec::new()
            }
        };

        Ok(Identity {
            dn,
            id: user_id.to_string(),
            groups,
        })
    }
}

#[async_trait::async_trait]
impl DirectoryClient for LdapDirectory {
    async fn resolve_user(&self, user_id: &str) -> Result<Identity, DirectoryError> {
        let mut ldap = self.connect().await.map_err(unavailable)?;
        let result = self.resolve_on(&mut ldap, user_id).await;
        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "ldap unbind failed");
        }
        result
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let mut ldap = self.connect().await.map_err(unavailable)?;
        let result = ldap
            .simple_bind(dn, password)
            .await
            .and_then(|r| r.success())
            .map(|_| ())
            .map_err(|e| DirectoryError::Bind {
                dn: dn.to_string(),
                reason: e.to_string(),
            });
        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "ldap unbind failed");
        }
        result
    }
}
