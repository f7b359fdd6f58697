use std::borrow::Cow;

/// Supported SQL dialects. Query templates are written once in canonical
/// PostgreSQL syntax (`$N` markers, `ON CONFLICT` upserts) and rendered
/// into the active dialect by [`Dialect::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
    Mysql,
    /// A back-end the core does not special-case. Templates pass through
    /// unchanged, so the driver must accept PostgreSQL syntax.
    Other,
}

impl Dialect {
    /// Guesses the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Self {
        match url.split(':').next().unwrap_or("") {
            "postgres" | "postgresql" => Dialect::Postgres,
            "sqlite" | "file" => Dialect::Sqlite,
            "mysql" | "mariadb" => Dialect::Mysql,
            _ => Dialect::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
            Dialect::Other => "other",
        }
    }

    /// Renders a canonical template into this dialect. Pure string
    /// transformation; never reorders the argument list.
    pub fn prepare<'a>(&self, query: &'a str) -> Cow<'a, str> {
        match self {
            Dialect::Postgres | Dialect::Other => Cow::Borrowed(query),
            Dialect::Sqlite => Cow::Owned(replace_markers(query)),
            Dialect::Mysql => {
                let rewritten = rewrite_upsert(&replace_markers(query));
                Cow::Owned(quote_reserved(&rewritten))
            }
        }
    }
}

/// Rewrites every `$N` positional marker to `?`.
fn replace_markers(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            out.push('?');
            while chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'`' || c == b'.'
}

/// Backtick-quotes the reserved identifier `key` wherever it appears as a
/// bare column name (`key_id`, `key_data` and the already-quoted form are
/// left alone).
fn quote_reserved(query: &str) -> String {
    let bytes = query.as_bytes();
    let mut out = String::with_capacity(query.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"key")
            && (i == 0 || !is_ident_char(bytes[i - 1]))
            && (i + 3 == bytes.len() || !is_ident_char(bytes[i + 3]))
        {
            out.push_str("`key`");
            i += 3;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

/// Translates a recognized `ON CONFLICT` clause into MySQL's
/// `ON DUPLICATE KEY UPDATE` form:
///
/// - `DO NOTHING` becomes an idempotent self-assignment of the first
///   conflict column.
/// - `DO UPDATE SET a=excluded.a, …` becomes `a=VALUES(a), …`.
/// - A trailing `WHERE excluded.<g> > <table>.<g>` guard is folded into
///   each assignment as `a=IF(VALUES(<g>) > <g>, VALUES(a), a)`, since
///   MySQL has no WHERE on upserts but the monotonic guard must hold on
///   every dialect.
fn rewrite_upsert(query: &str) -> String {
    let Some(start) = query.find("ON CONFLICT") else {
        return query.to_string();
    };
    let rest = &query[start + "ON CONFLICT".len()..];
    let Some(open) = rest.find('(') else {
        return query.to_string();
    };
    let Some(close) = rest[open..].find(')').map(|p| open + p) else {
        return query.to_string();
    };
    let cols: Vec<&str> = rest[open + 1..close].split(',').map(str::trim).collect();
    let tail = rest[close + 1..].trim_start();

    if let Some(after) = tail.strip_prefix("DO NOTHING") {
        let first = cols.first().copied().unwrap_or("id");
        return format!(
            "{}ON DUPLICATE KEY UPDATE {first}={first}{after}",
            &query[..start]
        );
    }

    let Some(after_update) = tail.strip_prefix("DO UPDATE") else {
        return query.to_string();
    };
    let Some(set_body) = after_update.trim_start().strip_prefix("SET") else {
        return query.to_string();
    };

    let (assignments, guard) = match set_body.find("WHERE") {
        Some(w) => (
            set_body[..w].trim(),
            parse_guard(set_body[w + "WHERE".len()..].trim()),
        ),
        None => (set_body.trim(), None),
    };

    let mut updates = Vec::new();
    for assign in assignments.split(',') {
        let Some((col, _)) = assign.split_once('=') else {
            continue;
        };
        let col = col.trim();
        match &guard {
            Some(g) => updates.push(format!("{col}=IF(VALUES({g}) > {g}, VALUES({col}), {col})")),
            None => updates.push(format!("{col}=VALUES({col})")),
        }
    }

    format!(
        "{}ON DUPLICATE KEY UPDATE {}",
        &query[..start],
        updates.join(", ")
    )
}

/// Recognizes a `excluded.<col> > <table>.<col>` timestamp guard and
/// yields the guard column.
fn parse_guard(text: &str) -> Option<String> {
    let rest = text.strip_prefix("excluded.")?;
    let (col, _) = rest.split_once('>')?;
    Some(col.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_passes_through() {
        let q = "SELECT identity FROM whatsmeow_identity_keys WHERE our_jid=$1 AND their_id=$2";
        assert_eq!(Dialect::Postgres.prepare(q), q);
        assert_eq!(Dialect::Other.prepare(q), q);
    }

    #[test]
    fn sqlite_rewrites_markers_in_order() {
        let q = "INSERT INTO t (a, b, c) VALUES ($1, $2, $3)";
        assert_eq!(
            Dialect::Sqlite.prepare(q),
            "INSERT INTO t (a, b, c) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn markers_above_nine() {
        assert_eq!(Dialect::Sqlite.prepare("($10, $11)"), "(?, ?)");
    }

    #[test]
    fn mysql_upsert_translation() {
        let q = "INSERT INTO whatsmeow_identity_keys (our_jid, their_id, identity) VALUES ($1, $2, $3) ON CONFLICT (our_jid, their_id) DO UPDATE SET identity=excluded.identity";
        assert_eq!(
            Dialect::Mysql.prepare(q),
            "INSERT INTO whatsmeow_identity_keys (our_jid, their_id, identity) VALUES (?, ?, ?) ON DUPLICATE KEY UPDATE identity=VALUES(identity)"
        );
    }

    #[test]
    fn mysql_do_nothing_is_idempotent_update() {
        let q = "INSERT INTO t (our_jid, chat_jid) VALUES ($1, $2) ON CONFLICT (our_jid, chat_jid) DO NOTHING";
        assert_eq!(
            Dialect::Mysql.prepare(q),
            "INSERT INTO t (our_jid, chat_jid) VALUES (?, ?) ON DUPLICATE KEY UPDATE our_jid=our_jid"
        );
    }

    #[test]
    fn mysql_guarded_upsert_keeps_monotonic_guard() {
        let q = "INSERT INTO whatsmeow_app_state_sync_keys (jid, key_id, key_data, timestamp, fingerprint) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (jid, key_id) DO UPDATE SET key_data=excluded.key_data, timestamp=excluded.timestamp, fingerprint=excluded.fingerprint WHERE excluded.timestamp > whatsmeow_app_state_sync_keys.timestamp";
        let prepared = Dialect::Mysql.prepare(q);
        assert!(prepared.contains(
            "key_data=IF(VALUES(timestamp) > timestamp, VALUES(key_data), key_data)"
        ));
        assert!(!prepared.contains("WHERE excluded"));
    }

    #[test]
    fn mysql_quotes_reserved_key_column() {
        let q = "INSERT INTO whatsmeow_pre_keys (jid, key_id, key, uploaded) VALUES ($1, $2, $3, $4)";
        assert_eq!(
            Dialect::Mysql.prepare(q),
            "INSERT INTO whatsmeow_pre_keys (jid, key_id, `key`, uploaded) VALUES (?, ?, ?, ?)"
        );
    }

    #[test]
    fn mysql_leaves_key_prefixed_columns_alone() {
        let q = "SELECT key_data FROM t WHERE key_id=$1";
        assert_eq!(
            Dialect::Mysql.prepare(q),
            "SELECT key_data FROM t WHERE key_id=?"
        );
    }

    #[test]
    fn mysql_quotes_key_in_select_list() {
        let q = "SELECT key_id, key FROM whatsmeow_pre_keys WHERE jid=$1 AND key_id=$2";
        assert_eq!(
            Dialect::Mysql.prepare(q),
            "SELECT key_id, `key` FROM whatsmeow_pre_keys WHERE jid=? AND key_id=?"
        );
    }

    #[test]
    fn url_scheme_detection() {
        assert_eq!(
            Dialect::from_url("postgres://localhost/wa"),
            Dialect::Postgres
        );
        assert_eq!(Dialect::from_url("sqlite::memory:"), Dialect::Sqlite);
        assert_eq!(
            Dialect::from_url("file:store.db?mode=rwc"),
            Dialect::Sqlite
        );
        assert_eq!(Dialect::from_url("mysql://db/wa"), Dialect::Mysql);
        assert_eq!(Dialect::from_url("cockroach://db"), Dialect::Other);
    }
}
