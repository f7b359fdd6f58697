use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyPool, Row, Transaction};
use tokio::sync::Mutex;

use crate::container::Container;
use crate::dialect::Dialect;
use crate::error::{db, Result, StoreError};
use crate::keys::{KeyPair, PreKey};
use crate::types::{
    AppStateMutationMAC, AppStateSyncKey, ContactEntry, ContactInfo, Jid, JidError,
    LocalChatSettings, MessageSecretInsert, PrivacyToken,
};

const MUTATION_MAC_BATCH_SIZE: usize = 400;
const CONTACT_BATCH_SIZE: usize = 300;
const MSG_SECRET_BATCH_SIZE: usize = 50;
const LOCK_RETRY_ATTEMPTS: u32 = 3;

/// Store surface for one account. Borrows the container's shared pool;
/// owns only the contact cache and the pre-key allocation lock.
pub struct SqlStore {
    container: Arc<Container>,
    jid: String,
    pre_key_lock: Mutex<()>,
    contact_cache: Mutex<HashMap<Jid, ContactInfo>>,
}

impl SqlStore {
    pub fn new(container: Arc<Container>, jid: &Jid) -> Self {
        Self {
            container,
            jid: jid.to_string(),
            pre_key_lock: Mutex::new(()),
            contact_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn jid(&self) -> &str {
        &self.jid
    }

    fn db(&self) -> &AnyPool {
        &self.container.db
    }

    fn dialect(&self) -> Dialect {
        self.container.dialect
    }

    fn prepare<'q>(&self, query: &'q str) -> Cow<'q, str> {
        self.container.dialect.prepare(query)
    }
}

fn parse_jid(s: String) -> Result<Jid> {
    s.parse()
        .map_err(|e: JidError| StoreError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Identity keys

const PUT_IDENTITY_QUERY: &str = "INSERT INTO whatsmeow_identity_keys (our_jid, their_id, identity) VALUES ($1, $2, $3) \
     ON CONFLICT (our_jid, their_id) DO UPDATE SET identity=excluded.identity";
const DELETE_ALL_IDENTITIES_QUERY: &str =
    "DELETE FROM whatsmeow_identity_keys WHERE our_jid=$1 AND their_id LIKE $2";
const DELETE_IDENTITY_QUERY: &str =
    "DELETE FROM whatsmeow_identity_keys WHERE our_jid=$1 AND their_id=$2";
const GET_IDENTITY_QUERY: &str =
    "SELECT identity FROM whatsmeow_identity_keys WHERE our_jid=$1 AND their_id=$2";

impl SqlStore {
    pub async fn put_identity(&self, address: &str, key: [u8; 32]) -> Result<()> {
        sqlx::query(&self.prepare(PUT_IDENTITY_QUERY))
            .bind(&self.jid)
            .bind(address)
            .bind(key.to_vec())
            .execute(self.db())
            .await
            .map_err(db("put identity"))?;
        Ok(())
    }

    /// Deletes the identities of every device of the given phone number.
    pub async fn delete_all_identities(&self, phone: &str) -> Result<()> {
        sqlx::query(&self.prepare(DELETE_ALL_IDENTITIES_QUERY))
            .bind(&self.jid)
            .bind(format!("{phone}:%"))
            .execute(self.db())
            .await
            .map_err(db("delete all identities"))?;
        Ok(())
    }

    pub async fn delete_identity(&self, address: &str) -> Result<()> {
        sqlx::query(&self.prepare(DELETE_IDENTITY_QUERY))
            .bind(&self.jid)
            .bind(address)
            .execute(self.db())
            .await
            .map_err(db("delete identity"))?;
        Ok(())
    }

    pub async fn is_trusted_identity(&self, address: &str, key: &[u8; 32]) -> Result<bool> {
        let row = sqlx::query(&self.prepare(GET_IDENTITY_QUERY))
            .bind(&self.jid)
            .bind(address)
            .fetch_optional(self.db())
            .await
            .map_err(db("get identity"))?;
        match row {
            // Trust unknown peers; the identity is saved on first use.
            None => Ok(true),
            Some(row) => {
                let existing: Vec<u8> = row.try_get(0).map_err(db("get identity"))?;
                if existing.len() != 32 {
                    return Err(StoreError::InvalidLength);
                }
                Ok(existing.as_slice() == &key[..])
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions

const GET_SESSION_QUERY: &str =
    "SELECT session FROM whatsmeow_sessions WHERE our_jid=$1 AND their_id=$2";
const HAS_SESSION_QUERY: &str =
    "SELECT true FROM whatsmeow_sessions WHERE our_jid=$1 AND their_id=$2";
const PUT_SESSION_QUERY: &str = "INSERT INTO whatsmeow_sessions (our_jid, their_id, session) VALUES ($1, $2, $3) \
     ON CONFLICT (our_jid, their_id) DO UPDATE SET session=excluded.session";
const DELETE_ALL_SESSIONS_QUERY: &str =
    "DELETE FROM whatsmeow_sessions WHERE our_jid=$1 AND their_id LIKE $2";
const DELETE_SESSION_QUERY: &str =
    "DELETE FROM whatsmeow_sessions WHERE our_jid=$1 AND their_id=$2";

impl SqlStore {
    pub async fn get_session(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query(&self.prepare(GET_SESSION_QUERY))
            .bind(&self.jid)
            .bind(address)
            .fetch_optional(self.db())
            .await
            .map_err(db("get session"))?;
        Ok(row
            .map(|r| r.try_get::<Option<Vec<u8>>, _>(0))
            .transpose()
            .map_err(db("get session"))?
            .flatten())
    }

    pub async fn has_session(&self, address: &str) -> Result<bool> {
        let row = sqlx::query(&self.prepare(HAS_SESSION_QUERY))
            .bind(&self.jid)
            .bind(address)
            .fetch_optional(self.db())
            .await
            .map_err(db("has session"))?;
        Ok(row.is_some())
    }

    pub async fn put_session(&self, address: &str, session: &[u8]) -> Result<()> {
        sqlx::query(&self.prepare(PUT_SESSION_QUERY))
            .bind(&self.jid)
            .bind(address)
            .bind(session.to_vec())
            .execute(self.db())
            .await
            .map_err(db("put session"))?;
        Ok(())
    }

    pub async fn delete_all_sessions(&self, phone: &str) -> Result<()> {
        sqlx::query(&self.prepare(DELETE_ALL_SESSIONS_QUERY))
            .bind(&self.jid)
            .bind(format!("{phone}:%"))
            .execute(self.db())
            .await
            .map_err(db("delete all sessions"))?;
        Ok(())
    }

    pub async fn delete_session(&self, address: &str) -> Result<()> {
        sqlx::query(&self.prepare(DELETE_SESSION_QUERY))
            .bind(&self.jid)
            .bind(address)
            .execute(self.db())
            .await
            .map_err(db("delete session"))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pre-keys

const GET_LAST_PRE_KEY_ID_QUERY: &str =
    "SELECT MAX(key_id) FROM whatsmeow_pre_keys WHERE jid=$1";
const INSERT_PRE_KEY_QUERY: &str =
    "INSERT INTO whatsmeow_pre_keys (jid, key_id, key, uploaded) VALUES ($1, $2, $3, $4)";
const GET_UNUPLOADED_PRE_KEYS_QUERY: &str = "SELECT key_id, key FROM whatsmeow_pre_keys WHERE jid=$1 AND uploaded=false ORDER BY key_id LIMIT $2";
const GET_PRE_KEY_QUERY: &str =
    "SELECT key_id, key FROM whatsmeow_pre_keys WHERE jid=$1 AND key_id=$2";
const DELETE_PRE_KEY_QUERY: &str = "DELETE FROM whatsmeow_pre_keys WHERE jid=$1 AND key_id=$2";
const MARK_PRE_KEYS_AS_UPLOADED_QUERY: &str =
    "UPDATE whatsmeow_pre_keys SET uploaded=true WHERE jid=$1 AND key_id<=$2";
const GET_UPLOADED_PRE_KEY_COUNT_QUERY: &str =
    "SELECT COUNT(*) FROM whatsmeow_pre_keys WHERE jid=$1 AND uploaded=true";

fn scan_pre_key(row: &AnyRow) -> Result<PreKey> {
    let key_id: i64 = row.try_get(0).map_err(db("scan pre-key"))?;
    let private: Vec<u8> = row.try_get(1).map_err(db("scan pre-key"))?;
    let private: [u8; 32] = private.try_into().map_err(|_| StoreError::InvalidLength)?;
    Ok(PreKey {
        key_pair: KeyPair::from_private_key(private),
        key_id: key_id as u32,
    })
}

impl SqlStore {
    async fn next_pre_key_id(&self) -> Result<u32> {
        let last: Option<i64> = sqlx::query_scalar(&self.prepare(GET_LAST_PRE_KEY_ID_QUERY))
            .bind(&self.jid)
            .fetch_one(self.db())
            .await
            .map_err(db("query next pre-key id"))?;
        Ok(last.unwrap_or(0) as u32 + 1)
    }

    async fn insert_pre_key(&self, id: u32, mark_uploaded: bool) -> Result<PreKey> {
        let key = PreKey::new(id);
        sqlx::query(&self.prepare(INSERT_PRE_KEY_QUERY))
            .bind(&self.jid)
            .bind(id as i64)
            .bind(key.key_pair.private_key.to_vec())
            .bind(mark_uploaded)
            .execute(self.db())
            .await
            .map_err(db("insert pre-key"))?;
        Ok(key)
    }

    /// Allocates the next pre-key id as `max(key_id)+1` under the
    /// per-account mutex and inserts it as already uploaded.
    ///
    /// Allocation is race-free for any number of tasks in this process;
    /// multiple processes sharing one database must serialize pre-key
    /// generation themselves.
    pub async fn gen_one_pre_key(&self) -> Result<PreKey> {
        let _lock = self.pre_key_lock.lock().await;
        let next_id = self.next_pre_key_id().await?;
        self.insert_pre_key(next_id, true).await
    }

    /// Returns `count` not-yet-uploaded pre-keys, generating fresh ones
    /// with sequential ids when fewer exist.
    pub async fn get_or_gen_pre_keys(&self, count: u32) -> Result<Vec<PreKey>> {
        let _lock = self.pre_key_lock.lock().await;

        let rows = sqlx::query(&self.prepare(GET_UNUPLOADED_PRE_KEYS_QUERY))
            .bind(&self.jid)
            .bind(count as i64)
            .fetch_all(self.db())
            .await
            .map_err(db("query existing pre-keys"))?;
        let mut keys = Vec::with_capacity(count as usize);
        for row in &rows {
            keys.push(scan_pre_key(row)?);
        }

        if (keys.len() as u32) < count {
            let mut next_id = self.next_pre_key_id().await?;
            for _ in keys.len() as u32..count {
                keys.push(self.insert_pre_key(next_id, false).await?);
                next_id += 1;
            }
        }
        Ok(keys)
    }

    pub async fn get_pre_key(&self, id: u32) -> Result<Option<PreKey>> {
        let row = sqlx::query(&self.prepare(GET_PRE_KEY_QUERY))
            .bind(&self.jid)
            .bind(id as i64)
            .fetch_optional(self.db())
            .await
            .map_err(db("get pre-key"))?;
        row.as_ref().map(scan_pre_key).transpose()
    }

    pub async fn remove_pre_key(&self, id: u32) -> Result<()> {
        sqlx::query(&self.prepare(DELETE_PRE_KEY_QUERY))
            .bind(&self.jid)
            .bind(id as i64)
            .execute(self.db())
            .await
            .map_err(db("remove pre-key"))?;
        Ok(())
    }

    pub async fn mark_pre_keys_as_uploaded(&self, up_to_id: u32) -> Result<()> {
        sqlx::query(&self.prepare(MARK_PRE_KEYS_AS_UPLOADED_QUERY))
            .bind(&self.jid)
            .bind(up_to_id as i64)
            .execute(self.db())
            .await
            .map_err(db("mark pre-keys as uploaded"))?;
        Ok(())
    }

    pub async fn uploaded_pre_key_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(&self.prepare(GET_UPLOADED_PRE_KEY_COUNT_QUERY))
            .bind(&self.jid)
            .fetch_one(self.db())
            .await
            .map_err(db("count uploaded pre-keys"))?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Sender keys

const PUT_SENDER_KEY_QUERY: &str = "INSERT INTO whatsmeow_sender_keys (our_jid, chat_id, sender_id, sender_key) VALUES ($1, $2, $3, $4) \
     ON CONFLICT (our_jid, chat_id, sender_id) DO UPDATE SET sender_key=excluded.sender_key";
const GET_SENDER_KEY_QUERY: &str = "SELECT sender_key FROM whatsmeow_sender_keys WHERE our_jid=$1 AND chat_id=$2 AND sender_id=$3";

impl SqlStore {
    pub async fn put_sender_key(&self, group: &str, user: &str, session: &[u8]) -> Result<()> {
        sqlx::query(&self.prepare(PUT_SENDER_KEY_QUERY))
            .bind(&self.jid)
            .bind(group)
            .bind(user)
            .bind(session.to_vec())
            .execute(self.db())
            .await
            .map_err(db("put sender key"))?;
        Ok(())
    }

    pub async fn get_sender_key(&self, group: &str, user: &str) -> Result<Option<Vec<u8>>> {
        let key: Option<Vec<u8>> = sqlx::query_scalar(&self.prepare(GET_SENDER_KEY_QUERY))
            .bind(&self.jid)
            .bind(group)
            .bind(user)
            .fetch_optional(self.db())
            .await
            .map_err(db("get sender key"))?;
        Ok(key)
    }
}

// ---------------------------------------------------------------------------
// App state sync keys

const PUT_APP_STATE_SYNC_KEY_QUERY: &str = "INSERT INTO whatsmeow_app_state_sync_keys (jid, key_id, key_data, timestamp, fingerprint) VALUES ($1, $2, $3, $4, $5) \
     ON CONFLICT (jid, key_id) DO UPDATE \
        SET key_data=excluded.key_data, timestamp=excluded.timestamp, fingerprint=excluded.fingerprint \
        WHERE excluded.timestamp > whatsmeow_app_state_sync_keys.timestamp";
const GET_APP_STATE_SYNC_KEY_QUERY: &str = "SELECT key_data, timestamp, fingerprint FROM whatsmeow_app_state_sync_keys WHERE jid=$1 AND key_id=$2";
const GET_APP_STATE_SYNC_KEY_HEX_QUERY: &str = "SELECT key_data, timestamp, fingerprint FROM whatsmeow_app_state_sync_keys WHERE jid=$1 AND HEX(key_id)=$2";
const GET_LATEST_APP_STATE_SYNC_KEY_ID_QUERY: &str = "SELECT key_id FROM whatsmeow_app_state_sync_keys WHERE jid=$1 ORDER BY timestamp DESC LIMIT 1";

fn scan_sync_key(row: &AnyRow) -> Result<AppStateSyncKey> {
    Ok(AppStateSyncKey {
        key_data: row.try_get(0).map_err(db("scan app state sync key"))?,
        timestamp: row.try_get(1).map_err(db("scan app state sync key"))?,
        fingerprint: row.try_get(2).map_err(db("scan app state sync key"))?,
    })
}

impl SqlStore {
    /// Stores the key only when its timestamp is strictly newer than the
    /// stored row, so a stale writer can never clobber a fresher key.
    pub async fn put_app_state_sync_key(&self, key_id: &[u8], key: AppStateSyncKey) -> Result<()> {
        sqlx::query(&self.prepare(PUT_APP_STATE_SYNC_KEY_QUERY))
            .bind(&self.jid)
            .bind(key_id.to_vec())
            .bind(key.key_data)
            .bind(key.timestamp)
            .bind(key.fingerprint)
            .execute(self.db())
            .await
            .map_err(db("put app state sync key"))?;
        Ok(())
    }

    pub async fn get_app_state_sync_key(&self, key_id: &[u8]) -> Result<Option<AppStateSyncKey>> {
        let row = sqlx::query(&self.prepare(GET_APP_STATE_SYNC_KEY_QUERY))
            .bind(&self.jid)
            .bind(key_id.to_vec())
            .fetch_optional(self.db())
            .await
            .map_err(db("get app state sync key"))?;
        if let Some(row) = row {
            return Ok(Some(scan_sync_key(&row)?));
        }

        // Binary key lookups are unreliable on the MySQL family; retry by
        // hex representation before declaring the key absent.
        if self.dialect() == Dialect::Mysql {
            let hex_id = hex::encode_upper(key_id);
            debug!("Key {hex_id} not found directly, trying hex lookup");
            let row = sqlx::query(&self.prepare(GET_APP_STATE_SYNC_KEY_HEX_QUERY))
                .bind(&self.jid)
                .bind(&hex_id)
                .fetch_optional(self.db())
                .await
                .map_err(db("get app state sync key"))?;
            if let Some(row) = row {
                return Ok(Some(scan_sync_key(&row)?));
            }
            warn!("App state key not found: {hex_id}");
        }
        Ok(None)
    }

    pub async fn get_latest_app_state_sync_key_id(&self) -> Result<Option<Vec<u8>>> {
        let id: Option<Vec<u8>> =
            sqlx::query_scalar(&self.prepare(GET_LATEST_APP_STATE_SYNC_KEY_ID_QUERY))
                .bind(&self.jid)
                .fetch_optional(self.db())
                .await
                .map_err(db("get latest app state sync key id"))?;
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// App state versions and mutation MACs

const PUT_APP_STATE_VERSION_QUERY: &str = "INSERT INTO whatsmeow_app_state_version (jid, name, version, hash) VALUES ($1, $2, $3, $4) \
     ON CONFLICT (jid, name) DO UPDATE SET version=excluded.version, hash=excluded.hash";
const GET_APP_STATE_VERSION_QUERY: &str =
    "SELECT version, hash FROM whatsmeow_app_state_version WHERE jid=$1 AND name=$2";
const DELETE_APP_STATE_VERSION_QUERY: &str =
    "DELETE FROM whatsmeow_app_state_version WHERE jid=$1 AND name=$2";
const GET_APP_STATE_MUTATION_MAC_QUERY: &str = "SELECT value_mac FROM whatsmeow_app_state_mutation_macs WHERE jid=$1 AND name=$2 AND index_mac=$3 ORDER BY version DESC LIMIT 1";

impl SqlStore {
    pub async fn put_app_state_version(
        &self,
        name: &str,
        version: u64,
        hash: [u8; 128],
    ) -> Result<()> {
        sqlx::query(&self.prepare(PUT_APP_STATE_VERSION_QUERY))
            .bind(&self.jid)
            .bind(name)
            .bind(version as i64)
            .bind(hash.to_vec())
            .execute(self.db())
            .await
            .map_err(db("put app state version"))?;
        Ok(())
    }

    /// A missing row reads back as version 0 with a zero hash, which is
    /// the correct initial state.
    pub async fn get_app_state_version(&self, name: &str) -> Result<(u64, [u8; 128])> {
        let row = sqlx::query(&self.prepare(GET_APP_STATE_VERSION_QUERY))
            .bind(&self.jid)
            .bind(name)
            .fetch_optional(self.db())
            .await
            .map_err(db("get app state version"))?;
        let Some(row) = row else {
            return Ok((0, [0u8; 128]));
        };
        let version: i64 = row.try_get(0).map_err(db("get app state version"))?;
        let hash: Vec<u8> = row.try_get(1).map_err(db("get app state version"))?;
        let hash: [u8; 128] = hash.try_into().map_err(|_| StoreError::InvalidLength)?;
        Ok((version as u64, hash))
    }

    pub async fn delete_app_state_version(&self, name: &str) -> Result<()> {
        sqlx::query(&self.prepare(DELETE_APP_STATE_VERSION_QUERY))
            .bind(&self.jid)
            .bind(name)
            .execute(self.db())
            .await
            .map_err(db("delete app state version"))?;
        Ok(())
    }

    /// Inserts the MACs in chunks of 400 inside one transaction; a
    /// failure in any chunk rolls the whole batch back.
    pub async fn put_app_state_mutation_macs(
        &self,
        name: &str,
        version: u64,
        mutations: &[AppStateMutationMAC],
    ) -> Result<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        let mut tx = self
            .db()
            .begin()
            .await
            .map_err(db("begin mutation MAC insert"))?;
        for chunk in mutations.chunks(MUTATION_MAC_BATCH_SIZE) {
            self.put_mutation_macs_chunk(&mut tx, name, version, chunk)
                .await?;
        }
        tx.commit().await.map_err(db("commit mutation MAC insert"))?;
        Ok(())
    }

    async fn put_mutation_macs_chunk(
        &self,
        tx: &mut Transaction<'static, Any>,
        name: &str,
        version: u64,
        mutations: &[AppStateMutationMAC],
    ) -> Result<()> {
        match self.dialect() {
            Dialect::Mysql => {
                // One statement per row for compatibility across MySQL
                // and MariaDB versions.
                let query = self.prepare(
                    "INSERT INTO whatsmeow_app_state_mutation_macs (jid, name, version, index_mac, value_mac) VALUES ($1, $2, $3, $4, $5)",
                );
                for m in mutations {
                    sqlx::query(&query)
                        .bind(&self.jid)
                        .bind(name)
                        .bind(version as i64)
                        .bind(m.index_mac.clone())
                        .bind(m.value_mac.clone())
                        .execute(&mut **tx)
                        .await
                        .map_err(db("insert mutation MACs"))?;
                }
            }
            Dialect::Sqlite => {
                let placeholders = vec!["(?, ?, ?, ?, ?)"; mutations.len()].join(",");
                let query = format!(
                    "INSERT INTO whatsmeow_app_state_mutation_macs (jid, name, version, index_mac, value_mac) VALUES {placeholders}"
                );
                let mut q = sqlx::query(&query);
                for m in mutations {
                    q = q
                        .bind(&self.jid)
                        .bind(name)
                        .bind(version as i64)
                        .bind(m.index_mac.clone())
                        .bind(m.value_mac.clone());
                }
                q.execute(&mut **tx)
                    .await
                    .map_err(db("insert mutation MACs"))?;
            }
            _ => {
                // The three leading parameters are shared by every row.
                let placeholders: Vec<String> = (0..mutations.len())
                    .map(|i| format!("($1, $2, $3, ${}, ${})", i * 2 + 4, i * 2 + 5))
                    .collect();
                let query = format!(
                    "INSERT INTO whatsmeow_app_state_mutation_macs (jid, name, version, index_mac, value_mac) VALUES {}",
                    placeholders.join(",")
                );
                let mut q = sqlx::query(&query)
                    .bind(&self.jid)
                    .bind(name)
                    .bind(version as i64);
                for m in mutations {
                    q = q.bind(m.index_mac.clone()).bind(m.value_mac.clone());
                }
                q.execute(&mut **tx)
                    .await
                    .map_err(db("insert mutation MACs"))?;
            }
        }
        Ok(())
    }

    pub async fn delete_app_state_mutation_macs(
        &self,
        name: &str,
        index_macs: &[Vec<u8>],
    ) -> Result<()> {
        if index_macs.is_empty() {
            return Ok(());
        }

        if self.dialect() == Dialect::Postgres {
            if let Some(wrapper) = self.container.array_wrapper {
                sqlx::query(
                    "DELETE FROM whatsmeow_app_state_mutation_macs WHERE jid=$1 AND name=$2 AND index_mac=ANY($3::bytea[])",
                )
                .bind(&self.jid)
                .bind(name)
                .bind(wrapper(index_macs))
                .execute(self.db())
                .await
                .map_err(db("delete mutation MACs"))?;
                return Ok(());
            }
        }

        let placeholders: Vec<String> =
            (0..index_macs.len()).map(|i| format!("${}", i + 3)).collect();
        let query = format!(
            "DELETE FROM whatsmeow_app_state_mutation_macs WHERE jid=$1 AND name=$2 AND index_mac IN ({})",
            placeholders.join(",")
        );
        let prepared = self.prepare(&query);
        let mut q = sqlx::query(&prepared).bind(&self.jid).bind(name);
        for mac in index_macs {
            q = q.bind(mac.clone());
        }
        q.execute(self.db())
            .await
            .map_err(db("delete mutation MACs"))?;
        Ok(())
    }

    pub async fn get_app_state_mutation_mac(
        &self,
        name: &str,
        index_mac: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let mac: Option<Vec<u8>> = sqlx::query_scalar(&self.prepare(GET_APP_STATE_MUTATION_MAC_QUERY))
            .bind(&self.jid)
            .bind(name)
            .bind(index_mac.to_vec())
            .fetch_optional(self.db())
            .await
            .map_err(db("get mutation MAC"))?;
        Ok(mac)
    }
}

// ---------------------------------------------------------------------------
// Contacts

const PUT_CONTACT_NAME_QUERY: &str = "INSERT INTO whatsmeow_contacts (our_jid, their_jid, first_name, full_name) VALUES ($1, $2, $3, $4) \
     ON CONFLICT (our_jid, their_jid) DO UPDATE SET first_name=excluded.first_name, full_name=excluded.full_name";
const PUT_PUSH_NAME_QUERY: &str = "INSERT INTO whatsmeow_contacts (our_jid, their_jid, push_name) VALUES ($1, $2, $3) \
     ON CONFLICT (our_jid, their_jid) DO UPDATE SET push_name=excluded.push_name";
const PUT_BUSINESS_NAME_QUERY: &str = "INSERT INTO whatsmeow_contacts (our_jid, their_jid, business_name) VALUES ($1, $2, $3) \
     ON CONFLICT (our_jid, their_jid) DO UPDATE SET business_name=excluded.business_name";
const GET_CONTACT_QUERY: &str = "SELECT first_name, full_name, push_name, business_name FROM whatsmeow_contacts WHERE our_jid=$1 AND their_jid=$2";
const GET_ALL_CONTACTS_QUERY: &str = "SELECT their_jid, first_name, full_name, push_name, business_name FROM whatsmeow_contacts WHERE our_jid=$1";

fn scan_contact(row: &AnyRow, offset: usize) -> Result<ContactInfo> {
    let field = |i: usize| -> Result<String> {
        Ok(row
            .try_get::<Option<String>, _>(offset + i)
            .map_err(db("scan contact"))?
            .unwrap_or_default())
    };
    Ok(ContactInfo {
        found: true,
        first_name: field(0)?,
        full_name: field(1)?,
        push_name: field(2)?,
        business_name: field(3)?,
    })
}

impl SqlStore {
    /// Cache read-through; the caller must hold the contact-cache mutex.
    async fn cached_contact(
        &self,
        cache: &mut HashMap<Jid, ContactInfo>,
        user: &Jid,
    ) -> Result<ContactInfo> {
        if let Some(hit) = cache.get(user) {
            return Ok(hit.clone());
        }
        let row = sqlx::query(&self.prepare(GET_CONTACT_QUERY))
            .bind(&self.jid)
            .bind(user.to_string())
            .fetch_optional(self.db())
            .await
            .map_err(db("get contact"))?;
        let info = match row {
            Some(row) => scan_contact(&row, 0)?,
            None => ContactInfo::default(),
        };
        cache.insert(user.clone(), info.clone());
        Ok(info)
    }

    /// Writes the push name only when it differs from the cached record.
    /// Returns whether a write happened and the previous name.
    pub async fn put_push_name(&self, user: &Jid, push_name: &str) -> Result<(bool, String)> {
        let mut cache = self.contact_cache.lock().await;
        let cached = self.cached_contact(&mut cache, user).await?;
        if cached.push_name == push_name {
            return Ok((false, String::new()));
        }
        sqlx::query(&self.prepare(PUT_PUSH_NAME_QUERY))
            .bind(&self.jid)
            .bind(user.to_string())
            .bind(push_name)
            .execute(self.db())
            .await
            .map_err(db("put push name"))?;
        if let Some(entry) = cache.get_mut(user) {
            entry.push_name = push_name.to_string();
            entry.found = true;
        }
        Ok((true, cached.push_name))
    }

    pub async fn put_business_name(
        &self,
        user: &Jid,
        business_name: &str,
    ) -> Result<(bool, String)> {
        let mut cache = self.contact_cache.lock().await;
        let cached = self.cached_contact(&mut cache, user).await?;
        if cached.business_name == business_name {
            return Ok((false, String::new()));
        }
        sqlx::query(&self.prepare(PUT_BUSINESS_NAME_QUERY))
            .bind(&self.jid)
            .bind(user.to_string())
            .bind(business_name)
            .execute(self.db())
            .await
            .map_err(db("put business name"))?;
        if let Some(entry) = cache.get_mut(user) {
            entry.business_name = business_name.to_string();
            entry.found = true;
        }
        Ok((true, cached.business_name))
    }

    /// Returns whether the stored names changed.
    pub async fn put_contact_name(
        &self,
        user: &Jid,
        first_name: &str,
        full_name: &str,
    ) -> Result<bool> {
        let mut cache = self.contact_cache.lock().await;
        let cached = self.cached_contact(&mut cache, user).await?;
        if cached.first_name == first_name && cached.full_name == full_name {
            return Ok(false);
        }
        sqlx::query(&self.prepare(PUT_CONTACT_NAME_QUERY))
            .bind(&self.jid)
            .bind(user.to_string())
            .bind(first_name)
            .bind(full_name)
            .execute(self.db())
            .await
            .map_err(db("put contact name"))?;
        if let Some(entry) = cache.get_mut(user) {
            entry.first_name = first_name.to_string();
            entry.full_name = full_name.to_string();
            entry.found = true;
        }
        Ok(true)
    }

    /// Bulk import of contact names, chunked at 300 rows per statement
    /// inside one transaction. On success the contact cache is dropped
    /// wholesale; push and business names are not refetched.
    pub async fn put_all_contact_names(&self, contacts: &[ContactEntry]) -> Result<()> {
        if contacts.is_empty() {
            return Ok(());
        }
        let mut tx = self.db().begin().await.map_err(db("begin contact import"))?;
        for chunk in contacts.chunks(CONTACT_BATCH_SIZE) {
            self.put_contact_names_chunk(&mut tx, chunk).await?;
        }
        tx.commit().await.map_err(db("commit contact import"))?;

        self.contact_cache.lock().await.clear();
        Ok(())
    }

    async fn put_contact_names_chunk(
        &self,
        tx: &mut Transaction<'static, Any>,
        chunk: &[ContactEntry],
    ) -> Result<()> {
        // The multi-row upsert breaks on duplicate keys, so repeats are
        // dropped here.
        let mut handled = HashSet::with_capacity(chunk.len());
        let mut entries = Vec::with_capacity(chunk.len());
        for contact in chunk {
            if contact.jid.is_empty() {
                warn!("Empty contact JID in mass insert");
                continue;
            }
            if !handled.insert(contact.jid.clone()) {
                warn!("Duplicate contact info for {} in mass insert", contact.jid);
                continue;
            }
            entries.push(contact);
        }
        if entries.is_empty() {
            return Ok(());
        }

        const UPSERT_TAIL: &str = " ON CONFLICT (our_jid, their_jid) DO UPDATE SET first_name=excluded.first_name, full_name=excluded.full_name";
        match self.dialect() {
            Dialect::Mysql | Dialect::Sqlite => {
                let placeholders = vec!["(?, ?, ?, ?)"; entries.len()].join(",");
                let insert = format!(
                    "INSERT INTO whatsmeow_contacts (our_jid, their_jid, first_name, full_name) VALUES {placeholders}{UPSERT_TAIL}"
                );
                let query = self.prepare(&insert);
                let mut q = sqlx::query(&query);
                for contact in &entries {
                    q = q
                        .bind(&self.jid)
                        .bind(contact.jid.to_string())
                        .bind(&contact.first_name)
                        .bind(&contact.full_name);
                }
                q.execute(&mut **tx)
                    .await
                    .map_err(db("bulk insert contacts"))?;
            }
            _ => {
                let placeholders: Vec<String> = (0..entries.len())
                    .map(|i| {
                        let base = i * 3 + 2;
                        format!("($1, ${}, ${}, ${})", base, base + 1, base + 2)
                    })
                    .collect();
                let query = format!(
                    "INSERT INTO whatsmeow_contacts (our_jid, their_jid, first_name, full_name) VALUES {}{UPSERT_TAIL}",
                    placeholders.join(",")
                );
                let mut q = sqlx::query(&query).bind(&self.jid);
                for contact in &entries {
                    q = q
                        .bind(contact.jid.to_string())
                        .bind(&contact.first_name)
                        .bind(&contact.full_name);
                }
                q.execute(&mut **tx)
                    .await
                    .map_err(db("bulk insert contacts"))?;
            }
        }
        Ok(())
    }

    pub async fn get_contact(&self, user: &Jid) -> Result<ContactInfo> {
        let mut cache = self.contact_cache.lock().await;
        self.cached_contact(&mut cache, user).await
    }

    pub async fn get_all_contacts(&self) -> Result<HashMap<Jid, ContactInfo>> {
        let mut cache = self.contact_cache.lock().await;
        let rows = sqlx::query(&self.prepare(GET_ALL_CONTACTS_QUERY))
            .bind(&self.jid)
            .fetch_all(self.db())
            .await
            .map_err(db("get all contacts"))?;
        let mut output = HashMap::with_capacity(rows.len());
        for row in &rows {
            let jid = parse_jid(row.try_get(0).map_err(db("get all contacts"))?)?;
            let info = scan_contact(row, 1)?;
            cache.insert(jid.clone(), info.clone());
            output.insert(jid, info);
        }
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Chat settings

const GET_CHAT_SETTINGS_QUERY: &str = "SELECT muted_until, pinned, archived FROM whatsmeow_chat_settings WHERE our_jid=$1 AND chat_jid=$2";

fn put_chat_setting_query(column: &str) -> String {
    format!(
        "INSERT INTO whatsmeow_chat_settings (our_jid, chat_jid, {column}) VALUES ($1, $2, $3) \
         ON CONFLICT (our_jid, chat_jid) DO UPDATE SET {column}=excluded.{column}"
    )
}

impl SqlStore {
    /// `None` stores epoch second 0, meaning not muted. Only the
    /// `muted_until` column is touched on an existing row.
    pub async fn put_muted_until(
        &self,
        chat: &Jid,
        muted_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let val = muted_until.map(|t| t.timestamp()).unwrap_or(0);
        let query = put_chat_setting_query("muted_until");
        sqlx::query(&self.prepare(&query))
            .bind(&self.jid)
            .bind(chat.to_string())
            .bind(val)
            .execute(self.db())
            .await
            .map_err(db("put muted until"))?;
        Ok(())
    }

    pub async fn put_pinned(&self, chat: &Jid, pinned: bool) -> Result<()> {
        let query = put_chat_setting_query("pinned");
        sqlx::query(&self.prepare(&query))
            .bind(&self.jid)
            .bind(chat.to_string())
            .bind(pinned)
            .execute(self.db())
            .await
            .map_err(db("put pinned"))?;
        Ok(())
    }

    pub async fn put_archived(&self, chat: &Jid, archived: bool) -> Result<()> {
        let query = put_chat_setting_query("archived");
        sqlx::query(&self.prepare(&query))
            .bind(&self.jid)
            .bind(chat.to_string())
            .bind(archived)
            .execute(self.db())
            .await
            .map_err(db("put archived"))?;
        Ok(())
    }

    pub async fn get_chat_settings(&self, chat: &Jid) -> Result<LocalChatSettings> {
        let row = sqlx::query(&self.prepare(GET_CHAT_SETTINGS_QUERY))
            .bind(&self.jid)
            .bind(chat.to_string())
            .fetch_optional(self.db())
            .await
            .map_err(db("get chat settings"))?;
        let Some(row) = row else {
            return Ok(LocalChatSettings::default());
        };
        let muted_until: i64 = row.try_get(0).map_err(db("get chat settings"))?;
        Ok(LocalChatSettings {
            found: true,
            muted_until: (muted_until != 0)
                .then(|| DateTime::from_timestamp(muted_until, 0))
                .flatten(),
            pinned: row.try_get::<i64, _>(1).map_err(db("get chat settings"))? != 0,
            archived: row.try_get::<i64, _>(2).map_err(db("get chat settings"))? != 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Message secrets

const PUT_MSG_SECRET_QUERY: &str = "INSERT INTO whatsmeow_message_secrets (our_jid, chat_jid, sender_jid, message_id, key) VALUES ($1, $2, $3, $4, $5) \
     ON CONFLICT (our_jid, chat_jid, sender_jid, message_id) DO NOTHING";
const GET_MSG_SECRET_QUERY: &str = "SELECT key FROM whatsmeow_message_secrets WHERE our_jid=$1 AND chat_jid=$2 AND sender_jid=$3 AND message_id=$4";

/// Whether the back-end reported a lock-wait-timeout condition, the one
/// class of error worth retrying on the hot message-secret table.
fn is_lock_wait_timeout(dialect: Dialect, err: &StoreError) -> bool {
    let source = match err {
        StoreError::Database {
            source: sqlx::Error::Database(e),
            ..
        } => e,
        _ => return false,
    };
    match dialect {
        Dialect::Mysql => {
            source.code().as_deref() == Some("1205")
                || source.message().contains("Lock wait timeout exceeded")
        }
        Dialect::Sqlite => source.message().contains("database is locked"),
        Dialect::Postgres => source.code().as_deref() == Some("55P03"),
        Dialect::Other => false,
    }
}

impl SqlStore {
    /// Message secrets are first-write-wins: inserting an existing
    /// `(chat, sender, id)` triple leaves the stored secret untouched.
    /// Batches go in chunks of 50, each chunk in its own transaction
    /// under the lock-timeout retry envelope.
    pub async fn put_message_secrets(&self, inserts: &[MessageSecretInsert]) -> Result<()> {
        if inserts.is_empty() {
            return Ok(());
        }
        for chunk in inserts.chunks(MSG_SECRET_BATCH_SIZE) {
            self.put_message_secrets_with_retry(chunk).await?;
        }
        Ok(())
    }

    async fn put_message_secrets_with_retry(&self, inserts: &[MessageSecretInsert]) -> Result<()> {
        for attempt in 1..=LOCK_RETRY_ATTEMPTS {
            match self.put_message_secrets_chunk(inserts).await {
                Err(err) if is_lock_wait_timeout(self.dialect(), &err) => {
                    warn!(
                        "Lock timeout storing message secrets (attempt {attempt}/{LOCK_RETRY_ATTEMPTS}), retrying after delay"
                    );
                    tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                }
                other => return other,
            }
        }
        Err(StoreError::RetryExhausted {
            attempts: LOCK_RETRY_ATTEMPTS,
        })
    }

    async fn put_message_secrets_chunk(&self, inserts: &[MessageSecretInsert]) -> Result<()> {
        let mut tx = self
            .db()
            .begin()
            .await
            .map_err(db("begin message secret insert"))?;
        let query = self.prepare(PUT_MSG_SECRET_QUERY);
        for insert in inserts {
            sqlx::query(&query)
                .bind(&self.jid)
                .bind(insert.chat.to_non_ad().to_string())
                .bind(insert.sender.to_non_ad().to_string())
                .bind(&insert.id)
                .bind(insert.secret.clone())
                .execute(&mut *tx)
                .await
                .map_err(db("insert message secret"))?;
        }
        tx.commit().await.map_err(db("commit message secret insert"))
    }

    pub async fn put_message_secret(
        &self,
        chat: &Jid,
        sender: &Jid,
        id: &str,
        secret: &[u8],
    ) -> Result<()> {
        for attempt in 1..=LOCK_RETRY_ATTEMPTS {
            let result = sqlx::query(&self.prepare(PUT_MSG_SECRET_QUERY))
                .bind(&self.jid)
                .bind(chat.to_non_ad().to_string())
                .bind(sender.to_non_ad().to_string())
                .bind(id)
                .bind(secret.to_vec())
                .execute(self.db())
                .await
                .map_err(db("insert message secret"));
            match result {
                Err(err) if is_lock_wait_timeout(self.dialect(), &err) => {
                    warn!(
                        "Lock timeout storing message secret (attempt {attempt}/{LOCK_RETRY_ATTEMPTS}), retrying after delay"
                    );
                    tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                }
                other => return other.map(|_| ()),
            }
        }
        Err(StoreError::RetryExhausted {
            attempts: LOCK_RETRY_ATTEMPTS,
        })
    }

    pub async fn get_message_secret(
        &self,
        chat: &Jid,
        sender: &Jid,
        id: &str,
    ) -> Result<Option<Vec<u8>>> {
        let secret: Option<Vec<u8>> = sqlx::query_scalar(&self.prepare(GET_MSG_SECRET_QUERY))
            .bind(&self.jid)
            .bind(chat.to_non_ad().to_string())
            .bind(sender.to_non_ad().to_string())
            .bind(id)
            .fetch_optional(self.db())
            .await
            .map_err(db("get message secret"))?;
        Ok(secret)
    }
}

// ---------------------------------------------------------------------------
// Privacy tokens

const PUT_PRIVACY_TOKEN_QUERY: &str = "INSERT INTO whatsmeow_privacy_tokens (our_jid, their_jid, token, timestamp) VALUES ($1, $2, $3, $4) \
     ON CONFLICT (our_jid, their_jid) DO UPDATE SET token=excluded.token, timestamp=excluded.timestamp";
const GET_PRIVACY_TOKEN_QUERY: &str =
    "SELECT token, timestamp FROM whatsmeow_privacy_tokens WHERE our_jid=$1 AND their_jid=$2";

impl SqlStore {
    /// Stores the tokens as one multi-row upsert where the syntax allows
    /// it; the MySQL family gets one statement per token inside a
    /// transaction.
    pub async fn put_privacy_tokens(&self, tokens: &[PrivacyToken]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        match self.dialect() {
            Dialect::Mysql => {
                let mut tx = self
                    .db()
                    .begin()
                    .await
                    .map_err(db("begin privacy token insert"))?;
                let query = self.prepare(PUT_PRIVACY_TOKEN_QUERY);
                for token in tokens {
                    sqlx::query(&query)
                        .bind(&self.jid)
                        .bind(token.jid.to_non_ad().to_string())
                        .bind(token.token.clone())
                        .bind(token.timestamp.timestamp())
                        .execute(&mut *tx)
                        .await
                        .map_err(db("insert privacy token"))?;
                }
                tx.commit().await.map_err(db("commit privacy token insert"))
            }
            Dialect::Sqlite => {
                let placeholders = vec!["(?, ?, ?, ?)"; tokens.len()].join(",");
                let query = format!(
                    "INSERT INTO whatsmeow_privacy_tokens (our_jid, their_jid, token, timestamp) VALUES {placeholders} \
                     ON CONFLICT (our_jid, their_jid) DO UPDATE SET token=excluded.token, timestamp=excluded.timestamp"
                );
                let mut q = sqlx::query(&query);
                for token in tokens {
                    q = q
                        .bind(&self.jid)
                        .bind(token.jid.to_non_ad().to_string())
                        .bind(token.token.clone())
                        .bind(token.timestamp.timestamp());
                }
                q.execute(self.db())
                    .await
                    .map_err(db("put privacy tokens"))?;
                Ok(())
            }
            _ => {
                let placeholders: Vec<String> = (0..tokens.len())
                    .map(|i| {
                        let base = i * 3 + 2;
                        format!("($1, ${}, ${}, ${})", base, base + 1, base + 2)
                    })
                    .collect();
                let query = format!(
                    "INSERT INTO whatsmeow_privacy_tokens (our_jid, their_jid, token, timestamp) VALUES {} \
                     ON CONFLICT (our_jid, their_jid) DO UPDATE SET token=excluded.token, timestamp=excluded.timestamp",
                    placeholders.join(",")
                );
                let mut q = sqlx::query(&query).bind(&self.jid);
                for token in tokens {
                    q = q
                        .bind(token.jid.to_non_ad().to_string())
                        .bind(token.token.clone())
                        .bind(token.timestamp.timestamp());
                }
                q.execute(self.db())
                    .await
                    .map_err(db("put privacy tokens"))?;
                Ok(())
            }
        }
    }

    pub async fn get_privacy_token(&self, user: &Jid) -> Result<Option<PrivacyToken>> {
        let their = user.to_non_ad();
        let row = sqlx::query(&self.prepare(GET_PRIVACY_TOKEN_QUERY))
            .bind(&self.jid)
            .bind(their.to_string())
            .fetch_optional(self.db())
            .await
            .map_err(db("get privacy token"))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let token: Vec<u8> = row.try_get(0).map_err(db("get privacy token"))?;
        let ts: i64 = row.try_get(1).map_err(db("get privacy token"))?;
        let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
            StoreError::Serialization(format!("privacy token timestamp {ts} out of range"))
        })?;
        Ok(Some(PrivacyToken {
            jid: their,
            token,
            timestamp,
        }))
    }
}

// ---------------------------------------------------------------------------
// Trait plumbing

use crate::traits::*;
use async_trait::async_trait;

#[async_trait]
impl IdentityStore for SqlStore {
    async fn put_identity(&self, address: &str, key: [u8; 32]) -> Result<()> {
        SqlStore::put_identity(self, address, key).await
    }

    async fn delete_all_identities(&self, phone: &str) -> Result<()> {
        SqlStore::delete_all_identities(self, phone).await
    }

    async fn delete_identity(&self, address: &str) -> Result<()> {
        SqlStore::delete_identity(self, address).await
    }

    async fn is_trusted_identity(&self, address: &str, key: &[u8; 32]) -> Result<bool> {
        SqlStore::is_trusted_identity(self, address, key).await
    }
}

#[async_trait]
impl SessionStore for SqlStore {
    async fn get_session(&self, address: &str) -> Result<Option<Vec<u8>>> {
        SqlStore::get_session(self, address).await
    }

    async fn has_session(&self, address: &str) -> Result<bool> {
        SqlStore::has_session(self, address).await
    }

    async fn put_session(&self, address: &str, session: &[u8]) -> Result<()> {
        SqlStore::put_session(self, address, session).await
    }

    async fn delete_all_sessions(&self, phone: &str) -> Result<()> {
        SqlStore::delete_all_sessions(self, phone).await
    }

    async fn delete_session(&self, address: &str) -> Result<()> {
        SqlStore::delete_session(self, address).await
    }
}

#[async_trait]
impl PreKeyStore for SqlStore {
    async fn gen_one_pre_key(&self) -> Result<PreKey> {
        SqlStore::gen_one_pre_key(self).await
    }

    async fn get_or_gen_pre_keys(&self, count: u32) -> Result<Vec<PreKey>> {
        SqlStore::get_or_gen_pre_keys(self, count).await
    }

    async fn get_pre_key(&self, id: u32) -> Result<Option<PreKey>> {
        SqlStore::get_pre_key(self, id).await
    }

    async fn remove_pre_key(&self, id: u32) -> Result<()> {
        SqlStore::remove_pre_key(self, id).await
    }

    async fn mark_pre_keys_as_uploaded(&self, up_to_id: u32) -> Result<()> {
        SqlStore::mark_pre_keys_as_uploaded(self, up_to_id).await
    }

    async fn uploaded_pre_key_count(&self) -> Result<usize> {
        SqlStore::uploaded_pre_key_count(self).await
    }
}

#[async_trait]
impl SenderKeyStore for SqlStore {
    async fn put_sender_key(&self, group: &str, user: &str, session: &[u8]) -> Result<()> {
        SqlStore::put_sender_key(self, group, user, session).await
    }

    async fn get_sender_key(&self, group: &str, user: &str) -> Result<Option<Vec<u8>>> {
        SqlStore::get_sender_key(self, group, user).await
    }
}

#[async_trait]
impl AppStateStore for SqlStore {
    async fn put_app_state_sync_key(&self, key_id: &[u8], key: AppStateSyncKey) -> Result<()> {
        SqlStore::put_app_state_sync_key(self, key_id, key).await
    }

    async fn get_app_state_sync_key(&self, key_id: &[u8]) -> Result<Option<AppStateSyncKey>> {
        SqlStore::get_app_state_sync_key(self, key_id).await
    }

    async fn get_latest_app_state_sync_key_id(&self) -> Result<Option<Vec<u8>>> {
        SqlStore::get_latest_app_state_sync_key_id(self).await
    }

    async fn put_app_state_version(
        &self,
        name: &str,
        version: u64,
        hash: [u8; 128],
    ) -> Result<()> {
        SqlStore::put_app_state_version(self, name, version, hash).await
    }

    async fn get_app_state_version(&self, name: &str) -> Result<(u64, [u8; 128])> {
        SqlStore::get_app_state_version(self, name).await
    }

    async fn delete_app_state_version(&self, name: &str) -> Result<()> {
        SqlStore::delete_app_state_version(self, name).await
    }

    async fn put_app_state_mutation_macs(
        &self,
        name: &str,
        version: u64,
        mutations: &[AppStateMutationMAC],
    ) -> Result<()> {
        SqlStore::put_app_state_mutation_macs(self, name, version, mutations).await
    }

    async fn delete_app_state_mutation_macs(
        &self,
        name: &str,
        index_macs: &[Vec<u8>],
    ) -> Result<()> {
        SqlStore::delete_app_state_mutation_macs(self, name, index_macs).await
    }

    async fn get_app_state_mutation_mac(
        &self,
        name: &str,
        index_mac: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        SqlStore::get_app_state_mutation_mac(self, name, index_mac).await
    }
}

#[async_trait]
impl ContactStore for SqlStore {
    async fn put_push_name(&self, user: &Jid, push_name: &str) -> Result<(bool, String)> {
        SqlStore::put_push_name(self, user, push_name).await
    }

    async fn put_business_name(&self, user: &Jid, business_name: &str) -> Result<(bool, String)> {
        SqlStore::put_business_name(self, user, business_name).await
    }

    async fn put_contact_name(
        &self,
        user: &Jid,
        first_name: &str,
        full_name: &str,
    ) -> Result<bool> {
        SqlStore::put_contact_name(self, user, first_name, full_name).await
    }

    async fn put_all_contact_names(&self, contacts: &[ContactEntry]) -> Result<()> {
        SqlStore::put_all_contact_names(self, contacts).await
    }

    async fn get_contact(&self, user: &Jid) -> Result<ContactInfo> {
        SqlStore::get_contact(self, user).await
    }

    async fn get_all_contacts(&self) -> Result<HashMap<Jid, ContactInfo>> {
        SqlStore::get_all_contacts(self).await
    }
}

#[async_trait]
impl ChatSettingsStore for SqlStore {
    async fn put_muted_until(&self, chat: &Jid, muted_until: Option<DateTime<Utc>>) -> Result<()> {
        SqlStore::put_muted_until(self, chat, muted_until).await
    }

    async fn put_pinned(&self, chat: &Jid, pinned: bool) -> Result<()> {
        SqlStore::put_pinned(self, chat, pinned).await
    }

    async fn put_archived(&self, chat: &Jid, archived: bool) -> Result<()> {
        SqlStore::put_archived(self, chat, archived).await
    }

    async fn get_chat_settings(&self, chat: &Jid) -> Result<LocalChatSettings> {
        SqlStore::get_chat_settings(self, chat).await
    }
}

#[async_trait]
impl MsgSecretStore for SqlStore {
    async fn put_message_secrets(&self, inserts: &[MessageSecretInsert]) -> Result<()> {
        SqlStore::put_message_secrets(self, inserts).await
    }

    async fn put_message_secret(
        &self,
        chat: &Jid,
        sender: &Jid,
        id: &str,
        secret: &[u8],
    ) -> Result<()> {
        SqlStore::put_message_secret(self, chat, sender, id, secret).await
    }

    async fn get_message_secret(
        &self,
        chat: &Jid,
        sender: &Jid,
        id: &str,
    ) -> Result<Option<Vec<u8>>> {
        SqlStore::get_message_secret(self, chat, sender, id).await
    }
}

#[async_trait]
impl PrivacyTokenStore for SqlStore {
    async fn put_privacy_tokens(&self, tokens: &[PrivacyToken]) -> Result<()> {
        SqlStore::put_privacy_tokens(self, tokens).await
    }

    async fn get_privacy_token(&self, user: &Jid) -> Result<Option<PrivacyToken>> {
        SqlStore::get_privacy_token(self, user).await
    }
}
