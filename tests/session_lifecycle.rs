mod common;

use chrono::Utc;
use common::*;
use dirauth::application_impl::*;
use dirauth::application_port::*;
use dirauth::domain_model::*;
use dirauth::domain_port::*;
use dirauth::infra_memory::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn record(store: &MemorySessionStore, id: TokenId) -> Option<SessionRecord> {
    store
        .get(&id.to_string())
        .await
        .unwrap()
        .map(|raw| SessionRecord::decode(&raw).unwrap())
}

#[tokio::test]
async fn full_session_lifecycle() {
    let h = Harness::new();

    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    assert_eq!(auth.identity.dn, ALICE_DN);
    assert!((899..=900).contains(&auth.expire_in.access));
    assert!((604_799..=604_800).contains(&auth.expire_in.refresh));

    let verified = h.service.verify(&auth.tokens.access.value).await.unwrap();
    assert_eq!(verified.identity.id, "alice");
    assert_eq!(verified.identity.groups, vec!["cn=staff,ou=groups,dc=example,dc=com"]);
    assert!((899..=900).contains(&verified.expire_in));

    let refreshed = h.service.refresh(&auth.tokens.refresh.value).await.unwrap();
    assert!((604_799..=604_800).contains(&refreshed.expire_in));
    assert_ne!(refreshed.tokens.access.id, auth.tokens.access.id);

    // Both halves of the original pair are gone.
    let err = h.service.verify(&auth.tokens.access.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = h.service.refresh(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let verified = h.service.verify(&refreshed.tokens.access.value).await.unwrap();
    assert_eq!(verified.identity.dn, ALICE_DN);
}

#[tokio::test]
async fn pair_records_reference_each_other() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    let (access, refresh) = (auth.tokens.access.id, auth.tokens.refresh.id);

    let access_record = record(&h.store, access).await.unwrap();
    let refresh_record = record(&h.store, refresh).await.unwrap();
    assert_eq!(access_record.kind, SessionKind::Access);
    assert_eq!(access_record.linked_id, refresh);
    assert_eq!(access_record.subject_id, "alice");
    assert_eq!(access_record.subject_dn, ALICE_DN);
    assert_eq!(refresh_record.kind, SessionKind::Refresh);
    assert_eq!(refresh_record.linked_id, access);

    let access_ttl = h.store.ttl(&access.to_string()).unwrap();
    assert!(access_ttl <= Duration::from_secs(900));
    assert!(access_ttl > Duration::from_secs(890));
    let refresh_ttl = h.store.ttl(&refresh.to_string()).unwrap();
    assert!(refresh_ttl > Duration::from_secs(604_700));
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();

    h.service.refresh(&auth.tokens.refresh.value).await.unwrap();
    let err = h.service.refresh(&auth.tokens.refresh.value).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(_)));
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    let calls = h.directory.resolve_calls();

    let err = h.service.verify(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = h.service.deauthorize(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.directory.resolve_calls(), calls);
}

#[tokio::test]
async fn stored_kind_is_checked_when_keys_are_shared() {
    let store = Arc::new(MemorySessionStore::new());
    let directory = directory_with_alice();
    let codec = access_codec();
    let service = SessionOrchestrator::new(
        directory.clone(),
        store.clone(),
        codec.clone(),
        codec,
        SessionConfig::default(),
    );
    let auth = service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    let calls = directory.resolve_calls();

    let err = service.refresh(&auth.tokens.access.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = service.verify(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(directory.resolve_calls(), calls);

    // The mismatched refresh attempt did not consume the access record.
    assert!(service.verify(&auth.tokens.access.value).await.is_ok());
}

#[tokio::test]
async fn deauthorize_revokes_both_tokens() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();

    assert!(h.service.deauthorize(&auth.tokens.access.value).await.unwrap());
    assert!(record(&h.store, auth.tokens.refresh.id).await.is_none());

    let err = h.service.verify(&auth.tokens.access.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = h.service.refresh(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = h.service.deauthorize(&auth.tokens.access.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn other_sessions_survive_revocation() {
    let h = Harness::new();
    let first = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    let second = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();

    h.service.deauthorize(&first.tokens.access.value).await.unwrap();
    assert!(h.service.verify(&second.tokens.access.value).await.is_ok());
}

#[tokio::test]
async fn signed_expiry_wins_over_live_record() {
    let h = Harness::new();
    let id = TokenId::new_random();
    let claims = json!({ "exp": Utc::now().timestamp() - 60, "uuid": id.to_string() });
    let value = encode(
        &Header::new(Algorithm::RS512),
        &claims,
        &EncodingKey::from_rsa_pem(ACCESS_KEY).unwrap(),
    )
    .unwrap();
    let live = SessionRecord {
        kind: SessionKind::Access,
        subject_id: "alice".to_string(),
        linked_id: TokenId::new_random(),
        subject_dn: ALICE_DN.to_string(),
    };
    h.store
        .put(&id.to_string(), &live.encode().unwrap(), Duration::from_secs(600))
        .await
        .unwrap();

    let err = h.service.verify(&value).await.unwrap_err();
    assert!(matches!(err, AuthError::Expired));
}

#[tokio::test]
async fn corrupt_record_is_unprocessable() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    h.store
        .put(&auth.tokens.access.id.to_string(), "{not json", Duration::from_secs(60))
        .await
        .unwrap();

    let err = h.service.verify(&auth.tokens.access.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnprocessableEntity);
}

#[tokio::test]
async fn garbage_token_is_unprocessable() {
    let h = Harness::new();
    let err = h.service.verify("definitely.not.ajwt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnprocessableEntity);
}

#[tokio::test]
async fn refresh_fails_when_directory_entry_moved() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();

    h.directory.set_dn("alice", "uid=alice,ou=former,dc=example,dc=com");
    let err = h.service.refresh(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    // The token was consumed before the check.
    h.directory.set_dn("alice", ALICE_DN);
    let err = h.service.refresh(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn refresh_fails_when_user_is_gone_or_directory_down() {
    let h = Harness::new();
    let first = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    let second = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();

    h.directory.set_available(false);
    let err = h.service.refresh(&first.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    h.directory.set_available(true);
    h.directory.remove_user("alice");
    let err = h.service.refresh(&second.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn verify_reports_directory_outage_as_internal() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    h.directory.set_available(false);

    let err = h.service.verify(&auth.tokens.access.value).await.unwrap_err();
    assert!(matches!(err, AuthError::Directory(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn authorize_rejects_bad_credentials() {
    let h = Harness::new();

    let err = h.service.authorize("alice", "not-it").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = h.service.authorize("mallory", ALICE_PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let calls = h.directory.resolve_calls();
    let err = h.service.authorize("alice", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.directory.resolve_calls(), calls);
}

#[tokio::test]
async fn authorize_with_duplicate_entries_is_internal() {
    let h = Harness::new();
    h.directory
        .add_user("alice", "uid=alice,ou=contractors,dc=example,dc=com", ALICE_PASSWORD, &[]);

    let err = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn group_lookup_failure_does_not_block_login() {
    let h = Harness::new();
    h.directory.set_groups_available(false);

    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    assert!(auth.identity.groups.is_empty());
}

#[tokio::test]
async fn create_auth_requires_a_dn() {
    let h = Harness::new();
    let anonymous = Identity {
        dn: String::new(),
        id: "alice".to_string(),
        groups: Vec::new(),
    };
    let err = h.service.create_auth(&anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn failed_second_write_leaves_first_record_behind() {
    let inner = Arc::new(MemorySessionStore::new());
    let flaky = Arc::new(FlakyStore::new(inner.clone(), 1, false));
    let h = Harness::with_store(inner.clone(), flaky.clone());

    let err = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap_err();
    assert!(matches!(err, AuthError::Store(_)));

    let written = flaky.written.lock().await.clone();
    assert_eq!(written.len(), 1);
    let orphan = SessionRecord::decode(&inner.get(&written[0]).await.unwrap().unwrap()).unwrap();
    assert_eq!(orphan.kind, SessionKind::Access);
    assert_eq!(inner.get(&orphan.linked_id.to_string()).await.unwrap(), None);
}

#[tokio::test]
async fn store_delete_failure_is_internal() {
    let inner = Arc::new(MemorySessionStore::new());
    let h = Harness::with_store(inner.clone(), Arc::new(FlakyStore::new(inner, usize::MAX, true)));
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();

    let err = h.service.refresh(&auth.tokens.refresh.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    let err = h.service.deauthorize(&auth.tokens.access.value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn refresh_succeeds_when_old_access_record_cannot_be_removed() {
    let inner = Arc::new(MemorySessionStore::new());
    let sticky = Arc::new(StickyKeyStore::new(inner.clone()));
    let h = Harness::with_store(inner.clone(), sticky.clone());
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    sticky.fail_deletes_of(auth.tokens.access.id.to_string()).await;

    let refreshed = h.service.refresh(&auth.tokens.refresh.value).await.unwrap();
    assert!(record(&inner, refreshed.tokens.access.id).await.is_some());
    assert!(record(&inner, auth.tokens.refresh.id).await.is_none());

    // The dangling access record stays until its TTL runs out.
    assert!(record(&inner, auth.tokens.access.id).await.is_some());
}

#[tokio::test]
async fn deauthorize_succeeds_when_refresh_record_cannot_be_removed() {
    let inner = Arc::new(MemorySessionStore::new());
    let sticky = Arc::new(StickyKeyStore::new(inner.clone()));
    let h = Harness::with_store(inner.clone(), sticky.clone());
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    sticky.fail_deletes_of(auth.tokens.refresh.id.to_string()).await;

    assert!(h.service.deauthorize(&auth.tokens.access.value).await.unwrap());
    assert!(record(&inner, auth.tokens.access.id).await.is_none());
    assert!(record(&inner, auth.tokens.refresh.id).await.is_some());
}

#[tokio::test]
async fn verify_expire_in_follows_signed_expiry_not_store_ttl() {
    let h = Harness::new();
    let auth = h.service.authorize("alice", ALICE_PASSWORD).await.unwrap();
    let key = auth.tokens.access.id.to_string();
    let raw = h.store.get(&key).await.unwrap().unwrap();
    h.store.put(&key, &raw, Duration::from_secs(5)).await.unwrap();

    let verified = h.service.verify(&auth.tokens.access.value).await.unwrap();
    assert!((899..=900).contains(&verified.expire_in), "expire_in was {}", verified.expire_in);
    assert!(h.store.ttl(&key).unwrap() <= Duration::from_secs(5));
}

#[tokio::test]
async fn out_of_range_lifetime_fails_issuance() {
    let store = Arc::new(MemorySessionStore::new());
    let service = SessionOrchestrator::new(
        directory_with_alice(),
        store,
        access_codec(),
        refresh_codec(),
        SessionConfig {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(u64::MAX),
        },
    );

    let err = service.authorize("alice", ALICE_PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}
