use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::keys::PreKey;
use crate::types::{
    AppStateMutationMAC, AppStateSyncKey, ContactEntry, ContactInfo, Jid, LocalChatSettings,
    MessageSecretInsert, PrivacyToken,
};

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn put_identity(&self, address: &str, key: [u8; 32]) -> Result<()>;
    async fn delete_all_identities(&self, phone: &str) -> Result<()>;
    async fn delete_identity(&self, address: &str) -> Result<()>;
    async fn is_trusted_identity(&self, address: &str, key: &[u8; 32]) -> Result<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, address: &str) -> Result<Option<Vec<u8>>>;
    async fn has_session(&self, address: &str) -> Result<bool>;
    async fn put_session(&self, address: &str, session: &[u8]) -> Result<()>;
    async fn delete_all_sessions(&self, phone: &str) -> Result<()>;
    async fn delete_session(&self, address: &str) -> Result<()>;
}

#[async_trait]
pub trait PreKeyStore: Send + Sync {
    async fn gen_one_pre_key(&self) -> Result<PreKey>;
    async fn get_or_gen_pre_keys(&self, count: u32) -> Result<Vec<PreKey>>;
    async fn get_pre_key(&self, id: u32) -> Result<Option<PreKey>>;
    async fn remove_pre_key(&self, id: u32) -> Result<()>;
    async fn mark_pre_keys_as_uploaded(&self, up_to_id: u32) -> Result<()>;
    async fn uploaded_pre_key_count(&self) -> Result<usize>;
}

#[async_trait]
pub trait SenderKeyStore: Send + Sync {
    async fn put_sender_key(&self, group: &str, user: &str, session: &[u8]) -> Result<()>;
    async fn get_sender_key(&self, group: &str, user: &str) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
pub trait AppStateStore: Send + Sync {
    async fn put_app_state_sync_key(&self, key_id: &[u8], key: AppStateSyncKey) -> Result<()>;
    async fn get_app_state_sync_key(&self, key_id: &[u8]) -> Result<Option<AppStateSyncKey>>;
    async fn get_latest_app_state_sync_key_id(&self) -> Result<Option<Vec<u8>>>;
    async fn put_app_state_version(&self, name: &str, version: u64, hash: [u8; 128])
        -> Result<()>;
    async fn get_app_state_version(&self, name: &str) -> Result<(u64, [u8; 128])>;
    async fn delete_app_state_version(&self, name: &str) -> Result<()>;
    async fn put_app_state_mutation_macs(
        &self,
        name: &str,
        version: u64,
        mutations: &[AppStateMutationMAC],
    ) -> Result<()>;
    async fn delete_app_state_mutation_macs(
        &self,
        name: &str,
        index_macs: &[Vec<u8>],
    ) -> Result<()>;
    async fn get_app_state_mutation_mac(
        &self,
        name: &str,
        index_mac: &[u8],
    ) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn put_push_name(&self, user: &Jid, push_name: &str) -> Result<(bool, String)>;
    async fn put_business_name(&self, user: &Jid, business_name: &str) -> Result<(bool, String)>;
    async fn put_contact_name(&self, user: &Jid, first_name: &str, full_name: &str)
        -> Result<bool>;
    async fn put_all_contact_names(&self, contacts: &[ContactEntry]) -> Result<()>;
    async fn get_contact(&self, user: &Jid) -> Result<ContactInfo>;
    async fn get_all_contacts(&self) -> Result<HashMap<Jid, ContactInfo>>;
}

#[async_trait]
pub trait ChatSettingsStore: Send + Sync {
    async fn put_muted_until(&self, chat: &Jid, muted_until: Option<DateTime<Utc>>) -> Result<()>;
    async fn put_pinned(&self, chat: &Jid, pinned: bool) -> Result<()>;
    async fn put_archived(&self, chat: &Jid, archived: bool) -> Result<()>;
    async fn get_chat_settings(&self, chat: &Jid) -> Result<LocalChatSettings>;
}

#[async_trait]
pub trait MsgSecretStore: Send + Sync {
    async fn put_message_secrets(&self, inserts: &[MessageSecretInsert]) -> Result<()>;
    async fn put_message_secret(
        &self,
        chat: &Jid,
        sender: &Jid,
        id: &str,
        secret: &[u8],
    ) -> Result<()>;
    async fn get_message_secret(
        &self,
        chat: &Jid,
        sender: &Jid,
        id: &str,
    ) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
pub trait PrivacyTokenStore: Send + Sync {
    async fn put_privacy_tokens(&self, tokens: &[PrivacyToken]) -> Result<()>;
    async fn get_privacy_token(&self, user: &Jid) -> Result<Option<PrivacyToken>>;
}

/// Everything a client needs from one account's store.
pub trait AllStores:
    IdentityStore
    + SessionStore
    + PreKeyStore
    + SenderKeyStore
    + AppStateStore
    + ContactStore
    + ChatSettingsStore
    + MsgSecretStore
    + PrivacyTokenStore
{
}

impl<T> AllStores for T where
    T: IdentityStore
        + SessionStore
        + PreKeyStore
        + SenderKeyStore
        + AppStateStore
        + ContactStore
        + ChatSettingsStore
        + MsgSecretStore
        + PrivacyTokenStore
{
}
