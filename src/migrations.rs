use futures::future::BoxFuture;
use log::info;
use sqlx::{Any, Transaction};

use crate::container::Container;
use crate::dialect::Dialect;
use crate::error::{db, Result, StoreError};

type Tx = Transaction<'static, Any>;
type UpgradeFn = for<'t> fn(&'t mut Tx, &'t Container) -> BoxFuture<'t, Result<()>>;

/// Ordered list of schema upgrades. Never reorder or remove entries:
/// the index is the schema version recorded in `whatsmeow_version`.
static UPGRADES: [UpgradeFn; 7] = [
    upgrade_v1, upgrade_v2, upgrade_v3, upgrade_v4, upgrade_v5, upgrade_v6, upgrade_v7,
];

async fn exec(tx: &mut Tx, sql: &str) -> sqlx::Result<()> {
    sqlx::query(sql).execute(&mut **tx).await.map(|_| ())
}

/// MySQL retains DDL artifacts from aborted upgrades (its DDL is not
/// transactional), so re-running a step must tolerate them.
fn is_duplicate_column(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(e) => {
            e.code().as_deref() == Some("1060") || e.message().contains("Duplicate column name")
        }
        _ => false,
    }
}

impl Container {
    pub(crate) async fn get_version(&self) -> Result<i32> {
        sqlx::query("CREATE TABLE IF NOT EXISTS whatsmeow_version (version INTEGER)")
            .execute(&self.db)
            .await
            .map_err(db("create version table"))?;
        let version: Option<i32> = sqlx::query_scalar("SELECT version FROM whatsmeow_version LIMIT 1")
            .fetch_optional(&self.db)
            .await
            .map_err(db("get version"))?;
        Ok(version.unwrap_or(0))
    }

    async fn set_version(&self, tx: &mut Tx, version: i32) -> Result<()> {
        exec(tx, "DELETE FROM whatsmeow_version")
            .await
            .map_err(db("set version"))?;
        sqlx::query(
            &self
                .dialect
                .prepare("INSERT INTO whatsmeow_version (version) VALUES ($1)"),
        )
        .bind(version)
        .execute(&mut **tx)
        .await
        .map_err(db("set version"))?;
        Ok(())
    }

    /// Cascade deletes silently stop working when the back-end has
    /// referential integrity turned off, so migrations refuse to run.
    async fn check_foreign_keys(&self) -> Result<()> {
        match self.dialect {
            Dialect::Sqlite => {
                let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
                    .fetch_one(&self.db)
                    .await
                    .map_err(db("check foreign keys"))?;
                if enabled == 0 {
                    return Err(StoreError::ForeignKeysDisabled);
                }
            }
            Dialect::Mysql => {
                let enabled: i64 = sqlx::query_scalar("SELECT @@foreign_key_checks")
                    .fetch_one(&self.db)
                    .await
                    .map_err(db("check foreign keys"))?;
                if enabled != 1 {
                    return Err(StoreError::ForeignKeysDisabled);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Upgrades the database from its current version to the latest,
    /// one transaction per step. A failed step rolls back and leaves the
    /// version counter untouched.
    pub async fn upgrade(&self) -> Result<()> {
        self.check_foreign_keys().await?;

        let mut version = self.get_version().await?;
        while (version as usize) < UPGRADES.len() {
            let target = version + 1;
            let mut tx = self.db.begin().await.map_err(db("begin upgrade"))?;

            info!("Upgrading database to v{target}");
            let result: Result<()> = async {
                UPGRADES[version as usize](&mut tx, self).await?;
                self.set_version(&mut tx, target).await
            }
            .await;

            if let Err(source) = result {
                let _ = tx.rollback().await;
                return Err(StoreError::Migration {
                    version: target,
                    source: Box::new(source),
                });
            }
            tx.commit().await.map_err(db("commit upgrade"))?;
            version = target;
        }
        Ok(())
    }
}

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE whatsmeow_device (
        jid TEXT PRIMARY KEY,

        registration_id BIGINT NOT NULL CHECK ( registration_id >= 0 AND registration_id < 4294967296 ),

        noise_key    bytea NOT NULL CHECK ( length(noise_key) = 32 ),
        identity_key bytea NOT NULL CHECK ( length(identity_key) = 32 ),

        signed_pre_key     bytea   NOT NULL CHECK ( length(signed_pre_key) = 32 ),
        signed_pre_key_id  INTEGER NOT NULL CHECK ( signed_pre_key_id >= 0 AND signed_pre_key_id < 16777216 ),
        signed_pre_key_sig bytea   NOT NULL CHECK ( length(signed_pre_key_sig) = 64 ),

        adv_key         bytea NOT NULL,
        adv_details     bytea NOT NULL,
        adv_account_sig bytea NOT NULL CHECK ( length(adv_account_sig) = 64 ),
        adv_device_sig  bytea NOT NULL CHECK ( length(adv_device_sig) = 64 ),

        platform      TEXT NOT NULL DEFAULT '',
        business_name TEXT NOT NULL DEFAULT '',
        push_name     TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE whatsmeow_identity_keys (
        our_jid  TEXT,
        their_id TEXT,
        identity bytea NOT NULL CHECK ( length(identity) = 32 ),

        PRIMARY KEY (our_jid, their_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_pre_keys (
        jid      TEXT,
        key_id   INTEGER          CHECK ( key_id >= 0 AND key_id < 16777216 ),
        key      bytea   NOT NULL CHECK ( length(key) = 32 ),
        uploaded BOOLEAN NOT NULL,

        PRIMARY KEY (jid, key_id),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_sessions (
        our_jid  TEXT,
        their_id TEXT,
        session  bytea,

        PRIMARY KEY (our_jid, their_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_sender_keys (
        our_jid    TEXT,
        chat_id    TEXT,
        sender_id  TEXT,
        sender_key bytea NOT NULL,

        PRIMARY KEY (our_jid, chat_id, sender_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_app_state_sync_keys (
        jid         TEXT,
        key_id      bytea,
        key_data    bytea  NOT NULL,
        timestamp   BIGINT NOT NULL,
        fingerprint bytea  NOT NULL,

        PRIMARY KEY (jid, key_id),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_app_state_version (
        jid     TEXT,
        name    TEXT,
        version BIGINT NOT NULL,
        hash    bytea  NOT NULL CHECK ( length(hash) = 128 ),

        PRIMARY KEY (jid, name),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_app_state_mutation_macs (
        jid       TEXT,
        name      TEXT,
        version   BIGINT,
        index_mac bytea          CHECK ( length(index_mac) = 32 ),
        value_mac bytea NOT NULL CHECK ( length(value_mac) = 32 ),

        PRIMARY KEY (jid, name, version, index_mac),
        FOREIGN KEY (jid, name) REFERENCES whatsmeow_app_state_version(jid, name) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_contacts (
        our_jid       TEXT,
        their_jid     TEXT,
        first_name    TEXT,
        full_name     TEXT,
        push_name     TEXT,
        business_name TEXT,

        PRIMARY KEY (our_jid, their_jid),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_chat_settings (
        our_jid       TEXT,
        chat_jid      TEXT,
        muted_until   BIGINT  NOT NULL DEFAULT 0,
        pinned        BOOLEAN NOT NULL DEFAULT false,
        archived      BOOLEAN NOT NULL DEFAULT false,

        PRIMARY KEY (our_jid, chat_jid),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
];

// Identical to CREATE_TABLES except whatsmeow_chat_settings declares
// pinned/archived as INTEGER: sqlx's Any driver cannot decode a SQLite
// column whose declared type affinity is BOOLEAN.
const CREATE_TABLES_SQLITE: &[&str] = &[
    "CREATE TABLE whatsmeow_device (
        jid TEXT PRIMARY KEY,

        registration_id BIGINT NOT NULL CHECK ( registration_id >= 0 AND registration_id < 4294967296 ),

        noise_key    bytea NOT NULL CHECK ( length(noise_key) = 32 ),
        identity_key bytea NOT NULL CHECK ( length(identity_key) = 32 ),

        signed_pre_key     bytea   NOT NULL CHECK ( length(signed_pre_key) = 32 ),
        signed_pre_key_id  INTEGER NOT NULL CHECK ( signed_pre_key_id >= 0 AND signed_pre_key_id < 16777216 ),
        signed_pre_key_sig bytea   NOT NULL CHECK ( length(signed_pre_key_sig) = 64 ),

        adv_key         bytea NOT NULL,
        adv_details     bytea NOT NULL,
        adv_account_sig bytea NOT NULL CHECK ( length(adv_account_sig) = 64 ),
        adv_device_sig  bytea NOT NULL CHECK ( length(adv_device_sig) = 64 ),

        platform      TEXT NOT NULL DEFAULT '',
        business_name TEXT NOT NULL DEFAULT '',
        push_name     TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE whatsmeow_identity_keys (
        our_jid  TEXT,
        their_id TEXT,
        identity bytea NOT NULL CHECK ( length(identity) = 32 ),

        PRIMARY KEY (our_jid, their_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_pre_keys (
        jid      TEXT,
        key_id   INTEGER          CHECK ( key_id >= 0 AND key_id < 16777216 ),
        key      bytea   NOT NULL CHECK ( length(key) = 32 ),
        uploaded BOOLEAN NOT NULL,

        PRIMARY KEY (jid, key_id),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_sessions (
        our_jid  TEXT,
        their_id TEXT,
        session  bytea,

        PRIMARY KEY (our_jid, their_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_sender_keys (
        our_jid    TEXT,
        chat_id    TEXT,
        sender_id  TEXT,
        sender_key bytea NOT NULL,

        PRIMARY KEY (our_jid, chat_id, sender_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_app_state_sync_keys (
        jid         TEXT,
        key_id      bytea,
        key_data    bytea  NOT NULL,
        timestamp   BIGINT NOT NULL,
        fingerprint bytea  NOT NULL,

        PRIMARY KEY (jid, key_id),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_app_state_version (
        jid     TEXT,
        name    TEXT,
        version BIGINT NOT NULL,
        hash    bytea  NOT NULL CHECK ( length(hash) = 128 ),

        PRIMARY KEY (jid, name),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_app_state_mutation_macs (
        jid       TEXT,
        name      TEXT,
        version   BIGINT,
        index_mac bytea          CHECK ( length(index_mac) = 32 ),
        value_mac bytea NOT NULL CHECK ( length(value_mac) = 32 ),

        PRIMARY KEY (jid, name, version, index_mac),
        FOREIGN KEY (jid, name) REFERENCES whatsmeow_app_state_version(jid, name) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_contacts (
        our_jid       TEXT,
        their_jid     TEXT,
        first_name    TEXT,
        full_name     TEXT,
        push_name     TEXT,
        business_name TEXT,

        PRIMARY KEY (our_jid, their_jid),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE whatsmeow_chat_settings (
        our_jid       TEXT,
        chat_jid      TEXT,
        muted_until   BIGINT  NOT NULL DEFAULT 0,
        pinned        INTEGER NOT NULL DEFAULT 0,
        archived      INTEGER NOT NULL DEFAULT 0,

        PRIMARY KEY (our_jid, chat_jid),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
];

const CREATE_TABLES_MYSQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS whatsmeow_device (
        jid VARCHAR(255) PRIMARY KEY,
        registration_id BIGINT NOT NULL,
        noise_key    LONGBLOB NOT NULL,
        identity_key LONGBLOB NOT NULL,
        signed_pre_key     LONGBLOB NOT NULL,
        signed_pre_key_id  INTEGER NOT NULL,
        signed_pre_key_sig LONGBLOB NOT NULL,
        adv_key         LONGBLOB NOT NULL,
        adv_details     LONGBLOB NOT NULL,
        adv_account_sig LONGBLOB NOT NULL,
        adv_device_sig  LONGBLOB NOT NULL,
        platform      TEXT NOT NULL,
        business_name TEXT NOT NULL,
        push_name     TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_identity_keys (
        our_jid  VARCHAR(255),
        their_id VARCHAR(255),
        identity LONGBLOB NOT NULL,
        PRIMARY KEY (our_jid, their_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_pre_keys (
        jid VARCHAR(255),
        key_id INTEGER,
        `key` LONGBLOB NOT NULL,
        uploaded TINYINT(1) NOT NULL,
        PRIMARY KEY (jid, key_id),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_sessions (
        our_jid VARCHAR(255),
        their_id VARCHAR(255),
        session LONGBLOB,
        PRIMARY KEY (our_jid, their_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_sender_keys (
        our_jid VARCHAR(255),
        chat_id VARCHAR(255),
        sender_id VARCHAR(255),
        sender_key LONGBLOB NOT NULL,
        PRIMARY KEY (our_jid, chat_id, sender_id),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_app_state_sync_keys (
        jid VARCHAR(255),
        key_id LONGBLOB,
        key_data LONGBLOB NOT NULL,
        timestamp BIGINT NOT NULL,
        fingerprint LONGBLOB NOT NULL,
        PRIMARY KEY (jid, key_id(255)),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_app_state_version (
        jid VARCHAR(255),
        name VARCHAR(255),
        version BIGINT NOT NULL,
        hash LONGBLOB NOT NULL,
        PRIMARY KEY (jid, name),
        FOREIGN KEY (jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_app_state_mutation_macs (
        jid VARCHAR(255),
        name VARCHAR(255),
        version BIGINT,
        index_mac LONGBLOB,
        value_mac LONGBLOB NOT NULL,
        PRIMARY KEY (jid, name, version, index_mac(32)),
        FOREIGN KEY (jid, name) REFERENCES whatsmeow_app_state_version(jid, name) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_contacts (
        our_jid VARCHAR(255),
        their_jid VARCHAR(255),
        first_name TEXT,
        full_name TEXT,
        push_name TEXT,
        business_name TEXT,
        PRIMARY KEY (our_jid, their_jid),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS whatsmeow_chat_settings (
        our_jid VARCHAR(255),
        chat_jid VARCHAR(255),
        muted_until BIGINT NOT NULL DEFAULT 0,
        pinned TINYINT(1) NOT NULL DEFAULT 0,
        archived TINYINT(1) NOT NULL DEFAULT 0,
        PRIMARY KEY (our_jid, chat_jid),
        FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
    )",
];

fn upgrade_v1<'t>(tx: &'t mut Tx, c: &'t Container) -> BoxFuture<'t, Result<()>> {
    Box::pin(async move {
        let tables = match c.dialect() {
            Dialect::Mysql => CREATE_TABLES_MYSQL,
            Dialect::Sqlite => CREATE_TABLES_SQLITE,
            _ => CREATE_TABLES,
        };
        for stmt in tables {
            exec(tx, stmt).await.map_err(db("create tables"))?;
        }
        Ok(())
    })
}

const FILL_SIG_KEY_POSTGRES: &str = "UPDATE whatsmeow_device SET adv_account_sig_key=(
    SELECT identity
    FROM whatsmeow_identity_keys
    WHERE our_jid=whatsmeow_device.jid
      AND their_id=concat(split_part(whatsmeow_device.jid, '.', 1), ':0')
)";

const FILL_SIG_KEY_SQLITE: &str = "UPDATE whatsmeow_device SET adv_account_sig_key=(
    SELECT identity
    FROM whatsmeow_identity_keys
    WHERE our_jid=whatsmeow_device.jid
      AND their_id=substr(whatsmeow_device.jid, 0, instr(whatsmeow_device.jid, '.')) || ':0'
)";

const FILL_SIG_KEY_MYSQL: &str = "UPDATE whatsmeow_device SET adv_account_sig_key=(
    SELECT identity
    FROM whatsmeow_identity_keys
    WHERE our_jid=whatsmeow_device.jid
      AND their_id=CONCAT(SUBSTRING_INDEX(whatsmeow_device.jid, '.', 1), ':0')
)";

/// Backfills the account signature key from the self-identity row and
/// drops devices whose backfill found nothing, on every dialect alike.
fn upgrade_v2<'t>(tx: &'t mut Tx, c: &'t Container) -> BoxFuture<'t, Result<()>> {
    Box::pin(async move {
        let add_column = if c.dialect() == Dialect::Mysql {
            "ALTER TABLE whatsmeow_device ADD COLUMN adv_account_sig_key BLOB"
        } else {
            "ALTER TABLE whatsmeow_device ADD COLUMN adv_account_sig_key bytea"
        };
        if let Err(err) = exec(tx, add_column).await {
            if !(c.dialect() == Dialect::Mysql && is_duplicate_column(&err)) {
                return Err(db("add adv_account_sig_key column")(err));
            }
        }

        let fill = match c.dialect() {
            Dialect::Mysql => FILL_SIG_KEY_MYSQL,
            Dialect::Sqlite => FILL_SIG_KEY_SQLITE,
            _ => FILL_SIG_KEY_POSTGRES,
        };
        exec(tx, fill).await.map_err(db("fill adv_account_sig_key"))?;
        exec(
            tx,
            "DELETE FROM whatsmeow_device WHERE adv_account_sig_key IS NULL",
        )
        .await
        .map_err(db("delete unfilled devices"))?;

        // SQLite cannot tighten a column constraint in place.
        match c.dialect() {
            Dialect::Mysql => {
                exec(
                    tx,
                    "ALTER TABLE whatsmeow_device MODIFY adv_account_sig_key BLOB NOT NULL",
                )
                .await
                .map_err(db("tighten adv_account_sig_key"))?;
            }
            Dialect::Sqlite => {}
            _ => {
                exec(
                    tx,
                    "ALTER TABLE whatsmeow_device ALTER COLUMN adv_account_sig_key SET NOT NULL",
                )
                .await
                .map_err(db("tighten adv_account_sig_key"))?;
            }
        }
        Ok(())
    })
}

fn upgrade_v3<'t>(tx: &'t mut Tx, c: &'t Container) -> BoxFuture<'t, Result<()>> {
    Box::pin(async move {
        let stmt = if c.dialect() == Dialect::Mysql {
            "CREATE TABLE IF NOT EXISTS whatsmeow_message_secrets (
                our_jid VARCHAR(255),
                chat_jid VARCHAR(255),
                sender_jid VARCHAR(255),
                message_id VARCHAR(255),
                `key` LONGBLOB NOT NULL,
                PRIMARY KEY (our_jid, chat_jid, sender_jid, message_id),
                FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
            )"
        } else {
            "CREATE TABLE whatsmeow_message_secrets (
                our_jid TEXT,
                chat_jid TEXT,
                sender_jid TEXT,
                message_id TEXT,
                key bytea NOT NULL,
                PRIMARY KEY (our_jid, chat_jid, sender_jid, message_id),
                FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
            )"
        };
        exec(tx, stmt).await.map_err(db("create message secrets table"))
    })
}

fn upgrade_v4<'t>(tx: &'t mut Tx, c: &'t Container) -> BoxFuture<'t, Result<()>> {
    Box::pin(async move {
        let stmt = if c.dialect() == Dialect::Mysql {
            "CREATE TABLE IF NOT EXISTS whatsmeow_privacy_tokens (
                our_jid VARCHAR(255),
                their_jid VARCHAR(255),
                token LONGBLOB NOT NULL,
                timestamp BIGINT NOT NULL,
                PRIMARY KEY (our_jid, their_jid),
                FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
            )"
        } else {
            "CREATE TABLE whatsmeow_privacy_tokens (
                our_jid TEXT,
                their_jid TEXT,
                token bytea NOT NULL,
                timestamp BIGINT NOT NULL,
                PRIMARY KEY (our_jid, their_jid),
                FOREIGN KEY (our_jid) REFERENCES whatsmeow_device(jid) ON DELETE CASCADE ON UPDATE CASCADE
            )"
        };
        exec(tx, stmt).await.map_err(db("create privacy tokens table"))
    })
}

/// Normalizes legacy device JIDs by stripping the `.0` agent suffix.
/// Child rows follow through the ON UPDATE CASCADE foreign keys.
fn upgrade_v5<'t>(tx: &'t mut Tx, _c: &'t Container) -> BoxFuture<'t, Result<()>> {
    Box::pin(async move {
        exec(tx, "UPDATE whatsmeow_device SET jid=REPLACE(jid, '.0', '')")
            .await
            .map_err(db("normalize device JIDs"))
    })
}

fn upgrade_v6<'t>(tx: &'t mut Tx, c: &'t Container) -> BoxFuture<'t, Result<()>> {
    Box::pin(async move {
        let add_column = if c.dialect() == Dialect::Mysql {
            // MySQL has no native UUID type.
            "ALTER TABLE whatsmeow_device ADD COLUMN facebook_uuid VARCHAR(36)"
        } else {
            "ALTER TABLE whatsmeow_device ADD COLUMN facebook_uuid uuid"
        };
        if let Err(err) = exec(tx, add_column).await {
            if !(c.dialect() == Dialect::Mysql && is_duplicate_column(&err)) {
                return Err(db("add facebook_uuid column")(err));
            }
        }
        Ok(())
    })
}

const UNICODE_TABLES: &[&str] = &[
    "whatsmeow_contacts",
    "whatsmeow_device",
    "whatsmeow_chat_settings",
    "whatsmeow_message_secrets",
    "whatsmeow_app_state_sync_keys",
    "whatsmeow_app_state_version",
    "whatsmeow_identity_keys",
    "whatsmeow_pre_keys",
    "whatsmeow_sessions",
    "whatsmeow_sender_keys",
    "whatsmeow_privacy_tokens",
];

const UNICODE_TEXT_COLUMNS: &[(&str, &str)] = &[
    ("whatsmeow_contacts", "first_name"),
    ("whatsmeow_contacts", "full_name"),
    ("whatsmeow_contacts", "push_name"),
    ("whatsmeow_contacts", "business_name"),
    ("whatsmeow_device", "platform"),
    ("whatsmeow_device", "business_name"),
    ("whatsmeow_device", "push_name"),
];

async fn convert_to_utf8mb4(tx: &mut Tx) -> Result<()> {
    exec(tx, "SET NAMES utf8mb4")
        .await
        .map_err(db("set utf8mb4 names"))?;
    for table in UNICODE_TABLES {
        exec(
            tx,
            &format!("ALTER TABLE {table} CHARACTER SET = utf8mb4 COLLATE utf8mb4_unicode_ci"),
        )
        .await
        .map_err(db("convert table charset"))?;
    }
    for (table, column) in UNICODE_TEXT_COLUMNS {
        exec(
            tx,
            &format!(
                "ALTER TABLE {table} MODIFY {column} TEXT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
            ),
        )
        .await
        .map_err(db("convert column charset"))?;
    }
    Ok(())
}

/// Converts every string column to a full-Unicode collation. Only the
/// MySQL family needs this; on servers already defaulting to utf8mb4 the
/// ALTERs are no-ops. Foreign-key enforcement is suspended for the
/// conversion and restored on every exit path.
fn upgrade_v7<'t>(tx: &'t mut Tx, c: &'t Container) -> BoxFuture<'t, Result<()>> {
    Box::pin(async move {
        if c.dialect() != Dialect::Mysql {
            return Ok(());
        }

        exec(tx, "SET FOREIGN_KEY_CHECKS = 0")
            .await
            .map_err(db("suspend foreign key checks"))?;
        let converted = convert_to_utf8mb4(tx).await;
        let restored = exec(tx, "SET FOREIGN_KEY_CHECKS = 1")
            .await
            .map_err(db("restore foreign key checks"));
        converted?;
        restored
    })
}
