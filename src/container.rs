use std::sync::{Arc, Once};

use log::info;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::dialect::Dialect;
use crate::error::{db, Result, StoreError};
use crate::keys::{KeyPair, PreKey};
use crate::store::SqlStore;
use crate::types::{DeviceData, Jid};

/// Renders a sequence of byte strings as a single array-valued parameter
/// for the PostgreSQL family. Registered on the [`Container`] at
/// construction; when absent, array-taking queries fall back to `IN (…)`
/// placeholder expansion.
pub type PgArrayWrapper = fn(&[Vec<u8>]) -> String;

/// Ready-made [`PgArrayWrapper`] producing the PostgreSQL array literal
/// form (`{"\\x0102","\\x0304"}`), bound as one parameter and cast with
/// `::bytea[]` server-side.
pub fn pg_bytea_array(items: &[Vec<u8>]) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|b| format!("\"\\\\x{}\"", hex::encode(b)))
        .collect();
    format!("{{{}}}", parts.join(","))
}

/// Owns the shared database handle and produces per-account stores.
/// One container per database; the pool inside is safe for concurrent
/// use from any number of stores.
pub struct Container {
    pub(crate) db: AnyPool,
    pub(crate) dialect: Dialect,
    pub(crate) array_wrapper: Option<PgArrayWrapper>,
}

const DEVICE_COLUMNS: &str = "jid, registration_id, noise_key, identity_key, \
     signed_pre_key, signed_pre_key_id, signed_pre_key_sig, \
     adv_key, adv_details, adv_account_sig, adv_account_sig_key, adv_device_sig, \
     platform, business_name, push_name";

impl Container {
    /// Connects to the database at `url`, detects the dialect from the
    /// URL scheme and runs all pending schema migrations.
    ///
    /// SQLite connections get `PRAGMA foreign_keys = ON` on acquire;
    /// other back-ends are expected to arrive with referential integrity
    /// enabled, which [`Container::upgrade`] verifies before touching the
    /// schema.
    pub async fn new(url: &str) -> Result<Arc<Self>> {
        static DRIVERS: Once = Once::new();
        DRIVERS.call_once(sqlx::any::install_default_drivers);

        let dialect = Dialect::from_url(url);

        let mut options = AnyPoolOptions::new().max_connections(
            std::thread::available_parallelism()
                .map(|p| p.get() as u32)
                .unwrap_or(4)
                .max(4),
        );
        if dialect == Dialect::Sqlite {
            options = options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            });
        }

        let pool = options
            .connect(url)
            .await
            .map_err(StoreError::Connection)?;

        let container = Arc::new(Self::with_pool(pool, dialect));
        container.upgrade().await?;
        Ok(container)
    }

    /// Wraps a caller-owned pool. No migrations are run; call
    /// [`Container::upgrade`] before handing out stores.
    pub fn with_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            db: pool,
            dialect,
            array_wrapper: None,
        }
    }

    /// Registers the array-parameter wrapper for the PostgreSQL family.
    pub fn with_array_wrapper(mut self, wrapper: PgArrayWrapper) -> Self {
        self.array_wrapper = Some(wrapper);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The shared connection pool, for callers that need raw access
    /// beside the store operations.
    pub fn pool(&self) -> &AnyPool {
        &self.db
    }

    /// Produces the store surface for one account. The store borrows the
    /// shared pool through its own handle on the container.
    pub fn new_store(self: Arc<Self>, jid: &Jid) -> SqlStore {
        SqlStore::new(self, jid)
    }

    fn device_select_query(&self) -> String {
        // The uuid column round-trips as text; PostgreSQL's native uuid
        // type needs the explicit cast.
        let uuid_col = match self.dialect {
            Dialect::Postgres => "CAST(facebook_uuid AS TEXT)",
            _ => "facebook_uuid",
        };
        format!("SELECT {DEVICE_COLUMNS}, {uuid_col} FROM whatsmeow_device")
    }

    pub async fn get_all_devices(&self) -> Result<Vec<DeviceData>> {
        let rows = sqlx::query(&self.device_select_query())
            .fetch_all(&self.db)
            .await
            .map_err(db("get all devices"))?;
        rows.iter().map(scan_device).collect()
    }

    pub async fn get_device(&self, jid: &Jid) -> Result<Option<DeviceData>> {
        let query = format!("{} WHERE jid=$1", self.device_select_query());
        let row = sqlx::query(&self.dialect.prepare(&query))
            .bind(jid.to_string())
            .fetch_optional(&self.db)
            .await
            .map_err(db("get device"))?;
        row.as_ref().map(scan_device).transpose()
    }

    /// Upserts the device row. On conflict only the mutable profile
    /// fields are refreshed; key material never changes for a live JID.
    pub async fn put_device(&self, device: &DeviceData) -> Result<()> {
        let uuid_param = match self.dialect {
            Dialect::Postgres => "CAST($16 AS uuid)",
            _ => "$16",
        };
        let query = format!(
            "INSERT INTO whatsmeow_device ({DEVICE_COLUMNS}, facebook_uuid) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, {uuid_param}) \
             ON CONFLICT (jid) DO UPDATE \
             SET platform=excluded.platform, business_name=excluded.business_name, push_name=excluded.push_name"
        );
        sqlx::query(&self.dialect.prepare(&query))
            .bind(device.jid.to_string())
            .bind(device.registration_id as i64)
            .bind(device.noise_key.private_key.to_vec())
            .bind(device.identity_key.private_key.to_vec())
            .bind(device.signed_pre_key.key_pair.private_key.to_vec())
            .bind(device.signed_pre_key.key_id as i64)
            .bind(device.signed_pre_key_sig.to_vec())
            .bind(device.adv_key.clone())
            .bind(device.adv_details.clone())
            .bind(device.adv_account_sig.to_vec())
            .bind(device.adv_account_sig_key.to_vec())
            .bind(device.adv_device_sig.to_vec())
            .bind(device.platform.clone())
            .bind(device.business_name.clone())
            .bind(device.push_name.clone())
            .bind(device.facebook_uuid.map(|u| u.to_string()))
            .execute(&self.db)
            .await
            .map_err(db("put device"))?;
        Ok(())
    }

    /// Deletes the device row; every account-scoped table follows via
    /// cascade.
    pub async fn delete_device(&self, jid: &Jid) -> Result<()> {
        info!("Deleting device {jid} and all associated data");
        sqlx::query(
            &self
                .dialect
                .prepare("DELETE FROM whatsmeow_device WHERE jid=$1"),
        )
        .bind(jid.to_string())
        .execute(&self.db)
        .await
        .map_err(db("delete device"))?;
        Ok(())
    }
}

fn to_key_32(data: Vec<u8>) -> Result<[u8; 32]> {
    data.try_into().map_err(|_| StoreError::InvalidLength)
}

fn to_sig_64(data: Vec<u8>) -> Result<[u8; 64]> {
    data.try_into().map_err(|_| StoreError::InvalidLength)
}

fn scan_device(row: &AnyRow) -> Result<DeviceData> {
    let jid_str: String = row.try_get(0).map_err(db("scan device"))?;
    let jid: Jid = jid_str
        .parse()
        .map_err(|e: crate::types::JidError| StoreError::Serialization(e.to_string()))?;

    let registration_id: i64 = row.try_get(1).map_err(db("scan device"))?;
    let noise_key: Vec<u8> = row.try_get(2).map_err(db("scan device"))?;
    let identity_key: Vec<u8> = row.try_get(3).map_err(db("scan device"))?;
    let signed_pre_key: Vec<u8> = row.try_get(4).map_err(db("scan device"))?;
    let signed_pre_key_id: i64 = row.try_get(5).map_err(db("scan device"))?;
    let signed_pre_key_sig: Vec<u8> = row.try_get(6).map_err(db("scan device"))?;
    let adv_key: Vec<u8> = row.try_get(7).map_err(db("scan device"))?;
    let adv_details: Vec<u8> = row.try_get(8).map_err(db("scan device"))?;
    let adv_account_sig: Vec<u8> = row.try_get(9).map_err(db("scan device"))?;
    let adv_account_sig_key: Vec<u8> = row.try_get(10).map_err(db("scan device"))?;
    let adv_device_sig: Vec<u8> = row.try_get(11).map_err(db("scan device"))?;
    let platform: String = row.try_get(12).map_err(db("scan device"))?;
    let business_name: String = row.try_get(13).map_err(db("scan device"))?;
    let push_name: String = row.try_get(14).map_err(db("scan device"))?;
    let facebook_uuid: Option<String> = row.try_get(15).map_err(db("scan device"))?;

    let facebook_uuid = facebook_uuid
        .map(|u| {
            Uuid::parse_str(&u).map_err(|e| StoreError::Serialization(format!("facebook_uuid: {e}")))
        })
        .transpose()?;

    Ok(DeviceData {
        jid,
        registration_id: registration_id as u32,
        noise_key: KeyPair::from_private_key(to_key_32(noise_key)?),
        identity_key: KeyPair::from_private_key(to_key_32(identity_key)?),
        signed_pre_key: PreKey {
            key_pair: KeyPair::from_private_key(to_key_32(signed_pre_key)?),
            key_id: signed_pre_key_id as u32,
        },
        signed_pre_key_sig: to_sig_64(signed_pre_key_sig)?,
        adv_key,
        adv_details,
        adv_account_sig: to_sig_64(adv_account_sig)?,
        adv_account_sig_key: to_key_32(adv_account_sig_key)?,
        adv_device_sig: to_sig_64(adv_device_sig)?,
        platform,
        business_name,
        push_name,
        facebook_uuid,
    })
}
