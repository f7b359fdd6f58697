pub mod jid;

pub use jid::{Jid, JidError, MessageId};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::keys::{KeyPair, PreKey};

/// Information about a contact, as assembled from the named-field upserts.
/// `found` is false when no row exists for the queried JID.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContactInfo {
    pub found: bool,
    pub first_name: String,
    pub full_name: String,
    pub push_name: String,
    pub business_name: String,
}

/// One entry of a bulk contact-name import.
#[derive(Debug, Clone)]
pub struct ContactEntry {
    pub jid: Jid,
    pub first_name: String,
    pub full_name: String,
}

/// Local settings for one chat. A `muted_until` of `None` means the chat
/// is not muted (stored as epoch second 0).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalChatSettings {
    pub found: bool,
    pub muted_until: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub archived: bool,
}

/// Opaque token exchanged with a peer to permit certain message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyToken {
    pub jid: Jid,
    pub token: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// One pending message-secret row. Secrets are first-write-wins, so
/// re-inserting an existing `(chat, sender, id)` triple changes nothing.
#[derive(Debug, Clone)]
pub struct MessageSecretInsert {
    pub chat: Jid,
    pub sender: Jid,
    pub id: MessageId,
    pub secret: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppStateSyncKey {
    pub key_data: Vec<u8>,
    pub fingerprint: Vec<u8>,
    pub timestamp: i64,
}

/// MAC pair authenticating a single app-state mutation at a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStateMutationMAC {
    pub index_mac: Vec<u8>,
    pub value_mac: Vec<u8>,
}

/// Everything stored about the local device itself. Key pairs hold the
/// 32-byte private half persisted in the database; the public half is
/// rederived on load.
#[derive(Debug, Clone)]
pub struct DeviceData {
    pub jid: Jid,
    pub registration_id: u32,
    pub noise_key: KeyPair,
    pub identity_key: KeyPair,
    pub signed_pre_key: PreKey,
    pub signed_pre_key_sig: [u8; 64],
    pub adv_key: Vec<u8>,
    pub adv_details: Vec<u8>,
    pub adv_account_sig: [u8; 64],
    pub adv_account_sig_key: [u8; 32],
    pub adv_device_sig: [u8; 64],
    pub platform: String,
    pub business_name: String,
    pub push_name: String,
    pub facebook_uuid: Option<Uuid>,
}
