use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_ldap::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{self, Settings};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

/// Process-lifetime collaborators, built once and shared read-only by all requests.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
}

impl From<&settings::Directory> for LdapConfig {
    fn from(directory: &settings::Directory) -> Self {
        LdapConfig {
            protocol: match directory.protocol {
                settings::Protocol::Ldap => LdapProtocol::Plain,
                settings::Protocol::Ldaps => LdapProtocol::Ldaps,
                settings::Protocol::StartTls => LdapProtocol::StartTls,
            },
            host: directory.host.clone(),
            port: directory.port,
            skip_verify: directory.skip_verify,
            bind_dn: directory.bind_dn.clone(),
            bind_password: directory.bind_password.clone(),
            base_dn: directory.base_dn.clone(),
            user_filter: directory.user_filter.clone(),
            group_filter: directory.group_filter.clone(),
            timeout: Duration::from_secs(directory.timeout_secs),
        }
    }
}

impl From<&settings::TokenSettings> for SessionConfig {
    fn from(token: &settings::TokenSettings) -> Self {
        SessionConfig {
            access_ttl: Duration::from_secs(token.access_ttl_minutes.saturating_mul(60)),
            refresh_ttl: Duration::from_secs(token.refresh_ttl_minutes.saturating_mul(60)),
        }
    }
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let session_store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
            "memory" => {
                warn!("using the in-memory session store; sessions are lost on restart");
                Arc::new(MemorySessionStore::new())
            }
            "redis" => {
                let redis_client = redis::Client::open(settings.session.redis_url.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.session.key_prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown session backend: {}", other)),
        };

        let ldap_config = LdapConfig::from(&settings.directory);
        debug!(?ldap_config);
        let directory: Arc<dyn DirectoryClient> = Arc::new(LdapDirectory::new(ldap_config));

        let token = &settings.token;
        let access_keys =
            KeyPair::from_pem_files(&token.access_private_key, &token.access_public_key)?;
        let refresh_keys =
            KeyPair::from_pem_files(&token.refresh_private_key, &token.refresh_public_key)?;
        let access_codec: Arc<dyn TokenCodec> = Arc::new(JwtRsaCodec::new(access_keys));
        let refresh_codec: Arc<dyn TokenCodec> = Arc::new(JwtRsaCodec::new(refresh_keys));

        let auth_service: Arc<dyn AuthService> = Arc::new(SessionOrchestrator::new(
            directory,
            session_store,
            access_codec,
            refresh_codec,
            SessionConfig::from(token),
        ));

        info!("server started");

        Ok(Self { auth_service })
    }
}
