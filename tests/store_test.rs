use std::sync::Arc;

use whatsmeow_sqlstore::keys::{KeyPair, PreKey};
use whatsmeow_sqlstore::types::{
    AppStateMutationMAC, AppStateSyncKey, ContactEntry, DeviceData, Jid, MessageSecretInsert,
    PrivacyToken,
};
use whatsmeow_sqlstore::{Container, SqlStore, StoreError};

async fn new_container(name: &str) -> Arc<Container> {
    let path = std::env::temp_dir().join(format!("whatsmeow_sqlstore_{name}.db"));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}?mode=rwc", path.display());
    Container::new(&url).await.expect("Failed to create container")
}

fn test_device(jid: &str, registration_id: u32) -> DeviceData {
    DeviceData {
        jid: jid.parse().expect("valid JID"),
        registration_id,
        noise_key: KeyPair::generate(),
        identity_key: KeyPair::generate(),
        signed_pre_key: PreKey::new(1),
        signed_pre_key_sig: [7u8; 64],
        adv_key: vec![1, 2, 3],
        adv_details: vec![4, 5, 6],
        adv_account_sig: [8u8; 64],
        adv_account_sig_key: [9u8; 32],
        adv_device_sig: [10u8; 64],
        platform: String::new(),
        business_name: String::new(),
        push_name: String::new(),
        facebook_uuid: None,
    }
}

/// Registers a device and returns its store.
async fn new_store(container: &Arc<Container>, jid: &str) -> SqlStore {
    let device = test_device(jid, 42);
    container
        .put_device(&device)
        .await
        .expect("Failed to put device");
    container.clone().new_store(&device.jid)
}

#[tokio::test]
async fn device_round_trip() {
    let container = new_container("device_round_trip").await;
    let mut device = test_device("111:1@s.whatsapp.net", 42);
    device.facebook_uuid = Some(uuid::Uuid::new_v4());
    device.push_name = "tester".to_string();
    container
        .put_device(&device)
        .await
        .expect("Failed to put device");

    let loaded = container
        .get_device(&device.jid)
        .await
        .expect("Failed to get device")
        .expect("Device should exist");
    assert_eq!(loaded.registration_id, 42);
    assert_eq!(loaded.noise_key, device.noise_key);
    assert_eq!(loaded.identity_key, device.identity_key);
    assert_eq!(loaded.signed_pre_key, device.signed_pre_key);
    assert_eq!(loaded.signed_pre_key_sig, device.signed_pre_key_sig);
    assert_eq!(loaded.adv_account_sig_key, device.adv_account_sig_key);
    assert_eq!(loaded.facebook_uuid, device.facebook_uuid);
    assert_eq!(loaded.push_name, "tester");

    let all = container
        .get_all_devices()
        .await
        .expect("Failed to list devices");
    assert_eq!(all.len(), 1);

    let missing = container
        .get_device(&"999@s.whatsapp.net".parse::<Jid>().unwrap())
        .await
        .expect("Failed to query missing device");
    assert!(missing.is_none());
}

#[tokio::test]
async fn fresh_account_pre_key_allocation() {
    let container = new_container("pre_key_allocation").await;
    let store = new_store(&container, "111:1@s.whatsapp.net").await;

    for expected_id in 1..=3u32 {
        let key = store
            .gen_one_pre_key()
            .await
            .expect("Failed to generate pre-key");
        assert_eq!(key.key_id, expected_id);
    }
    assert_eq!(
        store
            .uploaded_pre_key_count()
            .await
            .expect("Failed to count pre-keys"),
        3
    );
}

#[tokio::test]
async fn pre_key_get_or_gen_tops_up() {
    let container = new_container("pre_key_top_up").await;
    let store = new_store(&container, "222:1@s.whatsapp.net").await;

    let keys = store
        .get_or_gen_pre_keys(5)
        .await
        .expect("Failed to generate pre-keys");
    let ids: Vec<u32> = keys.iter().map(|k| k.key_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    // None are uploaded yet, so the same five come back.
    let again = store
        .get_or_gen_pre_keys(5)
        .await
        .expect("Failed to fetch pre-keys");
    assert_eq!(
        again.iter().map(|k| k.key_id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(keys[0].key_pair, again[0].key_pair);

    store
        .mark_pre_keys_as_uploaded(3)
        .await
        .expect("Failed to mark uploaded");
    // Marking again is a no-op.
    store
        .mark_pre_keys_as_uploaded(3)
        .await
        .expect("Failed to mark uploaded twice");
    assert_eq!(store.uploaded_pre_key_count().await.unwrap(), 3);

    let topped_up = store
        .get_or_gen_pre_keys(4)
        .await
        .expect("Failed to top up pre-keys");
    assert_eq!(
        topped_up.iter().map(|k| k.key_id).collect::<Vec<_>>(),
        vec![4, 5, 6, 7]
    );

    let fetched = store
        .get_pre_key(6)
        .await
        .expect("Failed to get pre-key")
        .expect("Pre-key 6 should exist");
    assert_eq!(fetched.key_pair, topped_up[2].key_pair);

    store.remove_pre_key(6).await.expect("Failed to remove");
    assert!(store.get_pre_key(6).await.unwrap().is_none());
}

#[tokio::test]
async fn identity_trust_on_first_use() {
    let container = new_container("identity_trust").await;
    let store = new_store(&container, "333:1@s.whatsapp.net").await;

    let address = "444:2@s.whatsapp.net";
    let key = [3u8; 32];

    // Unknown peers are trusted.
    assert!(store.is_trusted_identity(address, &key).await.unwrap());

    store
        .put_identity(address, key)
        .await
        .expect("Failed to put identity");
    assert!(store.is_trusted_identity(address, &key).await.unwrap());
    assert!(!store.is_trusted_identity(address, &[4u8; 32]).await.unwrap());

    store
        .delete_identity(address)
        .await
        .expect("Failed to delete identity");
    assert!(store.is_trusted_identity(address, &[4u8; 32]).await.unwrap());

    store.put_identity("555:1@s.whatsapp.net", key).await.unwrap();
    store.put_identity("555:2@s.whatsapp.net", key).await.unwrap();
    store
        .delete_all_identities("555")
        .await
        .expect("Failed to delete all identities");
    assert!(store
        .is_trusted_identity("555:1@s.whatsapp.net", &[4u8; 32])
        .await
        .unwrap());
}

#[tokio::test]
async fn identity_length_violation_surfaces() {
    let container = new_container("identity_length").await;
    let store = new_store(&container, "666:1@s.whatsapp.net").await;

    // Plant a 31-byte identity behind the CHECK constraint's back.
    let mut conn = container.pool().acquire().await.expect("Failed to acquire");
    sqlx::query("PRAGMA ignore_check_constraints = ON")
        .execute(&mut *conn)
        .await
        .expect("Failed to disable checks");
    sqlx::query("INSERT INTO whatsmeow_identity_keys (our_jid, their_id, identity) VALUES (?, ?, ?)")
        .bind(store.jid())
        .bind("777:1@s.whatsapp.net")
        .bind(vec![1u8; 31])
        .execute(&mut *conn)
        .await
        .expect("Failed to insert raw identity");
    drop(conn);

    let err = store
        .is_trusted_identity("777:1@s.whatsapp.net", &[1u8; 32])
        .await
        .expect_err("Short identity must be rejected");
    assert!(matches!(err, StoreError::InvalidLength));
}

#[tokio::test]
async fn session_round_trip() {
    let container = new_container("sessions").await;
    let store = new_store(&container, "888:1@s.whatsapp.net").await;

    let address = "999:3@s.whatsapp.net";
    assert_eq!(store.get_session(address).await.unwrap(), None);
    assert!(!store.has_session(address).await.unwrap());

    let session = vec![1, 2, 3, 4, 5];
    store
        .put_session(address, &session)
        .await
        .expect("Failed to put session");
    assert_eq!(store.get_session(address).await.unwrap(), Some(session));
    assert!(store.has_session(address).await.unwrap());

    let replacement = vec![9, 9, 9];
    store.put_session(address, &replacement).await.unwrap();
    assert_eq!(
        store.get_session(address).await.unwrap(),
        Some(replacement)
    );

    store.delete_session(address).await.unwrap();
    assert_eq!(store.get_session(address).await.unwrap(), None);

    store.put_session("999:1@s.whatsapp.net", &[1]).await.unwrap();
    store.put_session("999:2@s.whatsapp.net", &[2]).await.unwrap();
    store.delete_all_sessions("999").await.unwrap();
    assert!(!store.has_session("999:1@s.whatsapp.net").await.unwrap());
    assert!(!store.has_session("999:2@s.whatsapp.net").await.unwrap());
}

#[tokio::test]
async fn sender_key_round_trip() {
    let container = new_container("sender_keys").await;
    let store = new_store(&container, "123:1@s.whatsapp.net").await;

    assert_eq!(
        store.get_sender_key("group@g.us", "111@s.whatsapp.net").await.unwrap(),
        None
    );
    store
        .put_sender_key("group@g.us", "111@s.whatsapp.net", &[6, 7, 8])
        .await
        .expect("Failed to put sender key");
    assert_eq!(
        store.get_sender_key("group@g.us", "111@s.whatsapp.net").await.unwrap(),
        Some(vec![6, 7, 8])
    );

    store
        .put_sender_key("group@g.us", "111@s.whatsapp.net", &[9])
        .await
        .unwrap();
    assert_eq!(
        store.get_sender_key("group@g.us", "111@s.whatsapp.net").await.unwrap(),
        Some(vec![9])
    );
}

#[tokio::test]
async fn app_state_sync_key_is_monotonic() {
    let container = new_container("sync_keys").await;
    let store = new_store(&container, "234:1@s.whatsapp.net").await;

    let id = [0xABu8];
    store
        .put_app_state_sync_key(
            &id,
            AppStateSyncKey {
                key_data: b"D1".to_vec(),
                fingerprint: vec![1],
                timestamp: 100,
            },
        )
        .await
        .expect("Failed to put sync key");

    // A stale writer must not clobber the fresher row.
    store
        .put_app_state_sync_key(
            &id,
            AppStateSyncKey {
                key_data: b"D2".to_vec(),
                fingerprint: vec![2],
                timestamp: 50,
            },
        )
        .await
        .expect("Stale put should succeed without effect");

    let stored = store
        .get_app_state_sync_key(&id)
        .await
        .expect("Failed to get sync key")
        .expect("Sync key should exist");
    assert_eq!(stored.key_data, b"D1".to_vec());
    assert_eq!(stored.timestamp, 100);

    store
        .put_app_state_sync_key(
            &id,
            AppStateSyncKey {
                key_data: b"D3".to_vec(),
                fingerprint: vec![3],
                timestamp: 150,
            },
        )
        .await
        .unwrap();
    let stored = store.get_app_state_sync_key(&id).await.unwrap().unwrap();
    assert_eq!(stored.key_data, b"D3".to_vec());

    assert_eq!(
        store.get_latest_app_state_sync_key_id().await.unwrap(),
        Some(id.to_vec())
    );
    assert!(store.get_app_state_sync_key(&[0xCD]).await.unwrap().is_none());
}

#[tokio::test]
async fn app_state_version_round_trip() {
    let container = new_container("app_state_version").await;
    let store = new_store(&container, "345:1@s.whatsapp.net").await;

    assert_eq!(
        store.get_app_state_version("critical_block").await.unwrap(),
        (0, [0u8; 128])
    );

    let hash = [0x11u8; 128];
    store
        .put_app_state_version("critical_block", 9, hash)
        .await
        .expect("Failed to put version");
    assert_eq!(
        store.get_app_state_version("critical_block").await.unwrap(),
        (9, hash)
    );

    store
        .delete_app_state_version("critical_block")
        .await
        .expect("Failed to delete version");
    assert_eq!(
        store.get_app_state_version("critical_block").await.unwrap(),
        (0, [0u8; 128])
    );
}

fn mac(seed: u8) -> AppStateMutationMAC {
    AppStateMutationMAC {
        index_mac: vec![seed; 32],
        value_mac: vec![seed.wrapping_add(1); 32],
    }
}

#[tokio::test]
async fn mutation_macs_round_trip() {
    let container = new_container("mutation_macs").await;
    let store = new_store(&container, "456:1@s.whatsapp.net").await;

    store
        .put_app_state_version("regular", 1, [0u8; 128])
        .await
        .expect("Failed to put version");

    // Empty input is a successful no-op.
    store
        .put_app_state_mutation_macs("regular", 1, &[])
        .await
        .expect("Empty put should succeed");
    store
        .delete_app_state_mutation_macs("regular", &[])
        .await
        .expect("Empty delete should succeed");

    store
        .put_app_state_mutation_macs("regular", 1, &[mac(1), mac(2), mac(3)])
        .await
        .expect("Failed to put mutation MACs");
    assert_eq!(
        store
            .get_app_state_mutation_mac("regular", &[1u8; 32])
            .await
            .unwrap(),
        Some(vec![2u8; 32])
    );

    // The newest version wins when the same index appears twice.
    store
        .put_app_state_mutation_macs(
            "regular",
            2,
            &[AppStateMutationMAC {
                index_mac: vec![1u8; 32],
                value_mac: vec![0xFFu8; 32],
            }],
        )
        .await
        .unwrap();
    assert_eq!(
        store
            .get_app_state_mutation_mac("regular", &[1u8; 32])
            .await
            .unwrap(),
        Some(vec![0xFFu8; 32])
    );

    store
        .delete_app_state_mutation_macs("regular", &[vec![2u8; 32], vec![3u8; 32]])
        .await
        .expect("Failed to delete mutation MACs");
    assert_eq!(
        store
            .get_app_state_mutation_mac("regular", &[2u8; 32])
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn mutation_macs_chunked_batch() {
    let container = new_container("mutation_macs_chunked").await;
    let store = new_store(&container, "567:1@s.whatsapp.net").await;

    store
        .put_app_state_version("regular_high", 1, [0u8; 128])
        .await
        .unwrap();

    // 450 rows crosses the 400-per-statement chunk boundary.
    let macs: Vec<AppStateMutationMAC> = (0..450u16)
        .map(|i| {
            let mut index_mac = vec![0u8; 32];
            index_mac[0] = (i >> 8) as u8;
            index_mac[1] = (i & 0xFF) as u8;
            AppStateMutationMAC {
                index_mac,
                value_mac: vec![0x42u8; 32],
            }
        })
        .collect();
    store
        .put_app_state_mutation_macs("regular_high", 1, &macs)
        .await
        .expect("Failed to put chunked mutation MACs");

    assert_eq!(
        store
            .get_app_state_mutation_mac("regular_high", &macs[449].index_mac)
            .await
            .unwrap(),
        Some(vec![0x42u8; 32])
    );
}

#[tokio::test]
async fn contact_upsert_diffs() {
    let container = new_container("contacts").await;
    let store = new_store(&container, "678:1@s.whatsapp.net").await;
    let user: Jid = "700@s.whatsapp.net".parse().unwrap();

    assert!(store
        .put_contact_name(&user, "Al", "Alice")
        .await
        .expect("Failed to put contact name"));
    assert!(!store
        .put_contact_name(&user, "Al", "Alice")
        .await
        .expect("Repeat put should succeed"));

    let (changed, previous) = store
        .put_push_name(&user, "alice")
        .await
        .expect("Failed to put push name");
    assert!(changed);
    assert_eq!(previous, "");

    let (changed, _) = store.put_push_name(&user, "alice").await.unwrap();
    assert!(!changed);

    let (changed, previous) = store.put_push_name(&user, "alice2").await.unwrap();
    assert!(changed);
    assert_eq!(previous, "alice");

    let (changed, previous) = store
        .put_business_name(&user, "Alice Inc")
        .await
        .expect("Failed to put business name");
    assert!(changed);
    assert_eq!(previous, "");

    let contact = store.get_contact(&user).await.expect("Failed to get contact");
    assert!(contact.found);
    assert_eq!(contact.first_name, "Al");
    assert_eq!(contact.full_name, "Alice");
    assert_eq!(contact.push_name, "alice2");
    assert_eq!(contact.business_name, "Alice Inc");

    let missing = store
        .get_contact(&"701@s.whatsapp.net".parse().unwrap())
        .await
        .unwrap();
    assert!(!missing.found);
    assert_eq!(missing.first_name, "");
}

#[tokio::test]
async fn bulk_contact_import() {
    let container = new_container("bulk_contacts").await;
    let store = new_store(&container, "789:1@s.whatsapp.net").await;

    store
        .put_all_contact_names(&[])
        .await
        .expect("Empty import should succeed");

    // 350 entries cross the 300-per-statement chunk boundary; one
    // duplicate and one empty JID get dropped along the way.
    let mut contacts: Vec<ContactEntry> = (0..350u32)
        .map(|i| ContactEntry {
            jid: format!("{}@s.whatsapp.net", 1000 + i).parse().unwrap(),
            first_name: format!("First{i}"),
            full_name: format!("First{i} Last{i}"),
        })
        .collect();
    // Same chunk as entry 349, so the duplicate gets dropped.
    contacts.push(ContactEntry {
        jid: "1349@s.whatsapp.net".parse().unwrap(),
        first_name: "Dup".to_string(),
        full_name: "Dup".to_string(),
    });
    contacts.push(ContactEntry {
        jid: Jid::default(),
        first_name: "Empty".to_string(),
        full_name: "Empty".to_string(),
    });

    store
        .put_all_contact_names(&contacts)
        .await
        .expect("Failed to import contacts");

    let all = store
        .get_all_contacts()
        .await
        .expect("Failed to list contacts");
    assert_eq!(all.len(), 350);

    let first = store
        .get_contact(&"1000@s.whatsapp.net".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(first.first_name, "First0");

    let last = store
        .get_contact(&"1349@s.whatsapp.net".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(last.full_name, "First349 Last349");
}

#[tokio::test]
async fn bulk_contact_import_invalidates_cache() {
    let container = new_container("bulk_contacts_cache").await;
    let store = new_store(&container, "890:1@s.whatsapp.net").await;
    let user: Jid = "2000@s.whatsapp.net".parse().unwrap();

    store.put_contact_name(&user, "Old", "Old Name").await.unwrap();
    assert_eq!(store.get_contact(&user).await.unwrap().first_name, "Old");

    store
        .put_all_contact_names(&[ContactEntry {
            jid: user.clone(),
            first_name: "New".to_string(),
            full_name: "New Name".to_string(),
        }])
        .await
        .unwrap();

    // The cache was dropped wholesale, so the read sees the import.
    let contact = store.get_contact(&user).await.unwrap();
    assert_eq!(contact.first_name, "New");
    assert_eq!(contact.full_name, "New Name");
}

#[tokio::test]
async fn chat_settings_partial_columns() {
    let container = new_container("chat_settings").await;
    let store = new_store(&container, "901:1@s.whatsapp.net").await;
    let chat: Jid = "group@g.us".parse().unwrap();

    let settings = store.get_chat_settings(&chat).await.unwrap();
    assert!(!settings.found);

    store
        .put_pinned(&chat, true)
        .await
        .expect("Failed to put pinned");
    let settings = store.get_chat_settings(&chat).await.unwrap();
    assert!(settings.found);
    assert!(settings.pinned);
    assert!(!settings.archived);
    assert_eq!(settings.muted_until, None);

    // Touching another column leaves pinned alone.
    let until = chrono::DateTime::from_timestamp(4102444800, 0).unwrap();
    store
        .put_muted_until(&chat, Some(until))
        .await
        .expect("Failed to put muted until");
    store
        .put_archived(&chat, true)
        .await
        .expect("Failed to put archived");

    let settings = store.get_chat_settings(&chat).await.unwrap();
    assert!(settings.pinned);
    assert!(settings.archived);
    assert_eq!(settings.muted_until, Some(until));

    // Zero means not muted.
    store.put_muted_until(&chat, None).await.unwrap();
    let settings = store.get_chat_settings(&chat).await.unwrap();
    assert_eq!(settings.muted_until, None);
    assert!(settings.pinned);
}

#[tokio::test]
async fn message_secret_first_write_wins() {
    let container = new_container("message_secrets").await;
    let store = new_store(&container, "135:1@s.whatsapp.net").await;

    let chat: Jid = "chat@g.us".parse().unwrap();
    let sender: Jid = "136:2@s.whatsapp.net".parse().unwrap();

    store
        .put_message_secret(&chat, &sender, "MSG1", b"k1")
        .await
        .expect("Failed to put message secret");
    store
        .put_message_secret(&chat, &sender, "MSG1", b"k2")
        .await
        .expect("Conflicting put should succeed without effect");

    assert_eq!(
        store.get_message_secret(&chat, &sender, "MSG1").await.unwrap(),
        Some(b"k1".to_vec())
    );

    // The sender is stored without the device part.
    assert_eq!(
        store
            .get_message_secret(&chat, &sender.to_non_ad(), "MSG1")
            .await
            .unwrap(),
        Some(b"k1".to_vec())
    );
    assert_eq!(
        store.get_message_secret(&chat, &sender, "MSG2").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn message_secret_batches() {
    let container = new_container("message_secret_batches").await;
    let store = new_store(&container, "246:1@s.whatsapp.net").await;

    store
        .put_message_secrets(&[])
        .await
        .expect("Empty batch should succeed");

    let chat: Jid = "chat@g.us".parse().unwrap();
    let sender: Jid = "247@s.whatsapp.net".parse().unwrap();

    // 60 rows cross the 50-per-transaction chunk boundary.
    let inserts: Vec<MessageSecretInsert> = (0..60)
        .map(|i| MessageSecretInsert {
            chat: chat.clone(),
            sender: sender.clone(),
            id: format!("MSG{i}"),
            secret: vec![i as u8],
        })
        .collect();
    store
        .put_message_secrets(&inserts)
        .await
        .expect("Failed to put message secrets");

    assert_eq!(
        store.get_message_secret(&chat, &sender, "MSG59").await.unwrap(),
        Some(vec![59])
    );

    // Re-inserting the same ids changes nothing.
    let overwrite: Vec<MessageSecretInsert> = (0..60)
        .map(|i| MessageSecretInsert {
            chat: chat.clone(),
            sender: sender.clone(),
            id: format!("MSG{i}"),
            secret: vec![0xEE],
        })
        .collect();
    store.put_message_secrets(&overwrite).await.unwrap();
    assert_eq!(
        store.get_message_secret(&chat, &sender, "MSG0").await.unwrap(),
        Some(vec![0])
    );
}

#[tokio::test]
async fn privacy_token_round_trip() {
    let container = new_container("privacy_tokens").await;
    let store = new_store(&container, "357:1@s.whatsapp.net").await;

    let user: Jid = "358:5@s.whatsapp.net".parse().unwrap();
    assert!(store.get_privacy_token(&user).await.unwrap().is_none());

    let ts = chrono::DateTime::from_timestamp(1700000000, 0).unwrap();
    store
        .put_privacy_tokens(&[
            PrivacyToken {
                jid: user.clone(),
                token: vec![1, 2, 3],
                timestamp: ts,
            },
            PrivacyToken {
                jid: "359@s.whatsapp.net".parse().unwrap(),
                token: vec![4, 5],
                timestamp: ts,
            },
        ])
        .await
        .expect("Failed to put privacy tokens");

    let token = store
        .get_privacy_token(&user)
        .await
        .unwrap()
        .expect("Token should exist");
    assert_eq!(token.token, vec![1, 2, 3]);
    assert_eq!(token.timestamp, ts);
    // Tokens are keyed by the non-AD JID.
    assert_eq!(token.jid, user.to_non_ad());

    let ts2 = chrono::DateTime::from_timestamp(1800000000, 0).unwrap();
    store
        .put_privacy_tokens(&[PrivacyToken {
            jid: user.clone(),
            token: vec![9],
            timestamp: ts2,
        }])
        .await
        .unwrap();
    let token = store.get_privacy_token(&user).await.unwrap().unwrap();
    assert_eq!(token.token, vec![9]);
    assert_eq!(token.timestamp, ts2);
}

#[tokio::test]
async fn device_delete_cascades() {
    let container = new_container("cascade").await;
    let jid: Jid = "111:1@s.whatsapp.net".parse().unwrap();
    let store = new_store(&container, "111:1@s.whatsapp.net").await;

    store
        .put_session("112:1@s.whatsapp.net", &[1, 2, 3])
        .await
        .unwrap();
    store.put_identity("112:1@s.whatsapp.net", [5u8; 32]).await.unwrap();
    store.gen_one_pre_key().await.unwrap();
    store
        .put_app_state_version("regular", 1, [0u8; 128])
        .await
        .unwrap();
    store
        .put_app_state_mutation_macs("regular", 1, &[mac(9)])
        .await
        .unwrap();

    container
        .delete_device(&jid)
        .await
        .expect("Failed to delete device");

    assert!(container.get_device(&jid).await.unwrap().is_none());
    assert_eq!(
        store.get_session("112:1@s.whatsapp.net").await.unwrap(),
        None
    );
    assert_eq!(store.uploaded_pre_key_count().await.unwrap(), 0);
    assert_eq!(
        store.get_app_state_version("regular").await.unwrap(),
        (0, [0u8; 128])
    );
    assert_eq!(
        store
            .get_app_state_mutation_mac("regular", &[9u8; 32])
            .await
            .unwrap(),
        None
    );
}
