use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Result};

/// Структура, представляющая пользователя в базе данных.
pub struct User {
    /// Telegram ID пользователя
    pub telegram_id: i64,
    /// Имя пользователя (username) в Telegram, если доступно
    pub username: Option<String>,
    /// Уровень доступа: 0 = guest, 1 = trusted, 2 = moderator, 3 = admin
    pub access_level: i64,
    /// Код языка интерфейса ("ru", "en")
    pub language: String,
}

/// Именованный макрос: хранит текст, который подставляется вместо имени.
pub struct Alias {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub name: String,
    pub value: String,
}

/// Незавершённое многошаговое обращение к команде.
///
/// На пару (chat_id, user_id) существует не больше одной записи; новая
/// запись молча вытесняет старую.
pub struct WaitingState {
    pub chat_id: i64,
    pub user_id: i64,
    /// Каноничный идентификатор ожидающей команды
    pub command: String,
    /// Накопленный текст аргументов
    pub partial_text: String,
    pub created_at: String,
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and runs schema migrations.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Returns
///
/// Returns a `DbPool` on success or an `r2d2::Error` if pool creation fails.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    // Ensure schema is up to date on first connection
    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
        // Don't fail on migration errors, as they might be expected
    }

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Migrate database schema to ensure all required tables and columns exist
/// This function safely creates missing tables and adds missing columns
fn migrate_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            telegram_id INTEGER PRIMARY KEY,
            username TEXT,
            access_level INTEGER NOT NULL DEFAULT 0,
            language TEXT NOT NULL DEFAULT 'ru',
            created_at TEXT
        );
        CREATE TABLE IF NOT EXISTS chats (
            chat_id INTEGER PRIMARY KEY,
            title TEXT,
            access_level INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS waiting_states (
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            command TEXT NOT NULL,
            partial_text TEXT NOT NULL DEFAULT '',
            created_at TEXT,
            PRIMARY KEY (chat_id, user_id)
        );
        CREATE TABLE IF NOT EXISTS aliases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            UNIQUE (chat_id, user_id, name)
        );
        CREATE TABLE IF NOT EXISTS last_commands (
            chat_id INTEGER PRIMARY KEY,
            command TEXT NOT NULL,
            invoked_at TEXT
        );
        CREATE TABLE IF NOT EXISTS karma (
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            score INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (chat_id, user_id)
        );
        CREATE TABLE IF NOT EXISTS talker_pairs (
            chat_id INTEGER NOT NULL,
            word TEXT NOT NULL,
            next_word TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_talker_pairs_lookup
            ON talker_pairs (chat_id, word);
        CREATE TABLE IF NOT EXISTS talker_chats (
            chat_id INTEGER PRIMARY KEY,
            probability REAL NOT NULL
        );",
    )?;

    // Older databases predate the language column on users
    let mut stmt = conn.prepare("PRAGMA table_info(users)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }

    if !columns.contains(&"language".to_string()) {
        log::info!("Adding missing column: language to users table");
        if let Err(e) = conn.execute("ALTER TABLE users ADD COLUMN language TEXT NOT NULL DEFAULT 'ru'", []) {
            log::warn!("Failed to add language column: {}", e);
        }
    }

    Ok(())
}

// ======================
// USERS & CHATS
// ======================

/// Возвращает пользователя по Telegram ID, если он зарегистрирован.
pub fn get_user(conn: &DbConnection, telegram_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT telegram_id, username, access_level, language FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        |row| {
            Ok(User {
                telegram_id: row.get(0)?,
                username: row.get(1)?,
                access_level: row.get(2)?,
                language: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Создаёт пользователя с уровнем guest. Существующая запись не изменяется.
pub fn create_user(conn: &DbConnection, telegram_id: i64, username: Option<String>) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (telegram_id, username, created_at) VALUES (?1, ?2, ?3)",
        params![telegram_id, username, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Создаёт пользователя с языком из Telegram-профиля.
pub fn create_user_with_language(
    conn: &DbConnection,
    telegram_id: i64,
    username: Option<String>,
    language: &str,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (telegram_id, username, language, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![telegram_id, username, language, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Возвращает код языка пользователя ("ru" по умолчанию).
pub fn get_user_language(conn: &DbConnection, telegram_id: i64) -> Result<String> {
    let lang: Option<String> = conn
        .query_row(
            "SELECT language FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(lang.unwrap_or_else(|| "ru".to_string()))
}

pub fn set_user_language(conn: &DbConnection, telegram_id: i64, language: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET language = ?2 WHERE telegram_id = ?1",
        params![telegram_id, language],
    )?;
    Ok(())
}

/// Уровень доступа пользователя; незарегистрированный пользователь — guest (0).
pub fn get_user_level(conn: &DbConnection, telegram_id: i64) -> Result<i64> {
    let level: Option<i64> = conn
        .query_row(
            "SELECT access_level FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(level.unwrap_or(0))
}

/// Выставляет уровень доступа. Единственный путь изменения уровня —
/// команда выдачи прав; никакого автоматического повышения.
pub fn set_user_level(conn: &DbConnection, telegram_id: i64, level: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO users (telegram_id, access_level, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(telegram_id) DO UPDATE SET access_level = excluded.access_level",
        params![telegram_id, level, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Количество администраторов (для одноразовой инициализации первого админа).
pub fn count_admins(conn: &DbConnection, admin_level: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE access_level >= ?1",
        params![admin_level],
        |row| row.get(0),
    )
}

/// Регистрирует чат, если его ещё нет.
pub fn upsert_chat(conn: &DbConnection, chat_id: i64, title: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO chats (chat_id, title) VALUES (?1, ?2)
         ON CONFLICT(chat_id) DO UPDATE SET title = COALESCE(excluded.title, chats.title)",
        params![chat_id, title],
    )?;
    Ok(())
}

/// Уровень доступа чата; незарегистрированный чат — guest (0).
pub fn get_chat_level(conn: &DbConnection, chat_id: i64) -> Result<i64> {
    let level: Option<i64> = conn
        .query_row(
            "SELECT access_level FROM chats WHERE chat_id = ?1",
            params![chat_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(level.unwrap_or(0))
}

pub fn set_chat_level(conn: &DbConnection, chat_id: i64, level: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO chats (chat_id, access_level) VALUES (?1, ?2)
         ON CONFLICT(chat_id) DO UPDATE SET access_level = excluded.access_level",
        params![chat_id, level],
    )?;
    Ok(())
}

// ======================
// WAITING STATES
// ======================

/// Возвращает ожидающую запись для пары (чат, пользователь).
pub fn get_waiting_state(conn: &DbConnection, chat_id: i64, user_id: i64) -> Result<Option<WaitingState>> {
    conn.query_row(
        "SELECT chat_id, user_id, command, partial_text, created_at
         FROM waiting_states WHERE chat_id = ?1 AND user_id = ?2",
        params![chat_id, user_id],
        |row| {
            Ok(WaitingState {
                chat_id: row.get(0)?,
                user_id: row.get(1)?,
                command: row.get(2)?,
                partial_text: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Upsert: новая ожидающая запись вытесняет старую для той же пары.
/// Замещение старого ожидания — намеренное поведение, не ошибка.
pub fn put_waiting_state(
    conn: &DbConnection,
    chat_id: i64,
    user_id: i64,
    command: &str,
    partial_text: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO waiting_states (chat_id, user_id, command, partial_text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(chat_id, user_id) DO UPDATE SET
             command = excluded.command,
             partial_text = excluded.partial_text,
             created_at = excluded.created_at",
        params![chat_id, user_id, command, partial_text, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn remove_waiting_state(conn: &DbConnection, chat_id: i64, user_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM waiting_states WHERE chat_id = ?1 AND user_id = ?2",
        params![chat_id, user_id],
    )?;
    Ok(())
}

// ======================
// ALIASES
// ======================

/// Ищет макрос по имени: сначала точное совпадение владельца, затем любой
/// одноимённый макрос в этом чате (для выбора в групповых сценариях).
pub fn get_alias(conn: &DbConnection, chat_id: i64, user_id: i64, name: &str) -> Result<Option<Alias>> {
    let own = conn
        .query_row(
            "SELECT id, chat_id, user_id, name, value FROM aliases
             WHERE chat_id = ?1 AND user_id = ?2 AND name = ?3",
            params![chat_id, user_id, name],
            alias_from_row,
        )
        .optional()?;

    if own.is_some() {
        return Ok(own);
    }

    conn.query_row(
        "SELECT id, chat_id, user_id, name, value FROM aliases
         WHERE chat_id = ?1 AND name = ?2 ORDER BY id LIMIT 1",
        params![chat_id, name],
        alias_from_row,
    )
    .optional()
}

fn alias_from_row(row: &rusqlite::Row<'_>) -> Result<Alias> {
    Ok(Alias {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        value: row.get(4)?,
    })
}

pub fn list_aliases(conn: &DbConnection, chat_id: i64, user_id: i64) -> Result<Vec<Alias>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_id, user_id, name, value FROM aliases
         WHERE chat_id = ?1 AND user_id = ?2 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![chat_id, user_id], alias_from_row)?;

    let mut aliases = Vec::new();
    for row in rows {
        aliases.push(row?);
    }
    Ok(aliases)
}

/// Upsert по (chat_id, user_id, name): повторное сохранение обновляет текст.
pub fn save_alias(conn: &DbConnection, chat_id: i64, user_id: i64, name: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO aliases (chat_id, user_id, name, value) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(chat_id, user_id, name) DO UPDATE SET value = excluded.value",
        params![chat_id, user_id, name, value],
    )?;
    Ok(())
}

pub fn remove_alias(conn: &DbConnection, alias_id: i64) -> Result<()> {
    conn.execute("DELETE FROM aliases WHERE id = ?1", params![alias_id])?;
    Ok(())
}

// ======================
// LAST COMMAND
// ======================

/// Последняя успешно выполненная команда в чате (для «повтора»).
pub fn get_last_command(conn: &DbConnection, chat_id: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT command FROM last_commands WHERE chat_id = ?1",
        params![chat_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_last_command(conn: &DbConnection, chat_id: i64, command: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO last_commands (chat_id, command, invoked_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(chat_id) DO UPDATE SET
             command = excluded.command,
             invoked_at = excluded.invoked_at",
        params![chat_id, command, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

// ======================
// KARMA
// ======================

pub fn get_karma(conn: &DbConnection, chat_id: i64, user_id: i64) -> Result<i64> {
    let score: Option<i64> = conn
        .query_row(
            "SELECT score FROM karma WHERE chat_id = ?1 AND user_id = ?2",
            params![chat_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(score.unwrap_or(0))
}

/// Сдвигает карму и возвращает новое значение.
pub fn adjust_karma(conn: &DbConnection, chat_id: i64, user_id: i64, delta: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO karma (chat_id, user_id, score) VALUES (?1, ?2, ?3)
         ON CONFLICT(chat_id, user_id) DO UPDATE SET score = karma.score + ?3",
        params![chat_id, user_id, delta],
    )?;
    get_karma(conn, chat_id, user_id)
}

// ======================
// TALKER
// ======================

/// Запоминает пару «слово → следующее слово» для марковской болтовни.
pub fn add_talker_pair(conn: &DbConnection, chat_id: i64, word: &str, next_word: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO talker_pairs (chat_id, word, next_word) VALUES (?1, ?2, ?3)",
        params![chat_id, word, next_word],
    )?;
    Ok(())
}

/// Все продолжения, которые чат когда-либо видел после данного слова.
pub fn get_next_words(conn: &DbConnection, chat_id: i64, word: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT next_word FROM talker_pairs WHERE chat_id = ?1 AND word = ?2")?;
    let rows = stmt.query_map(params![chat_id, word], |row| row.get::<_, String>(0))?;

    let mut words = Vec::new();
    for row in rows {
        words.push(row?);
    }
    Ok(words)
}

/// Вероятность, с которой болтун отвечает в этом чате (если настроена).
pub fn get_talker_probability(conn: &DbConnection, chat_id: i64) -> Result<Option<f64>> {
    conn.query_row(
        "SELECT probability FROM talker_chats WHERE chat_id = ?1",
        params![chat_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_talker_probability(conn: &DbConnection, chat_id: i64, probability: f64) -> Result<()> {
    conn.execute(
        "INSERT INTO talker_chats (chat_id, probability) VALUES (?1, ?2)
         ON CONFLICT(chat_id) DO UPDATE SET probability = excluded.probability",
        params![chat_id, probability],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    #[test]
    fn test_user_roundtrip() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        create_user(&conn, 100, Some("stan".to_string())).unwrap();
        let user = get_user(&conn, 100).unwrap().unwrap();
        assert_eq!(user.telegram_id, 100);
        assert_eq!(user.username.as_deref(), Some("stan"));
        assert_eq!(user.access_level, 0);
        assert_eq!(user.language, "ru");

        // A second create must not clobber the row
        set_user_level(&conn, 100, 2).unwrap();
        create_user(&conn, 100, Some("other".to_string())).unwrap();
        assert_eq!(get_user_level(&conn, 100).unwrap(), 2);
    }

    #[test]
    fn test_unknown_user_is_guest() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        assert_eq!(get_user_level(&conn, 404).unwrap(), 0);
        assert_eq!(get_chat_level(&conn, 404).unwrap(), 0);
    }

    #[test]
    fn test_waiting_state_upsert_replaces() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        put_waiting_state(&conn, 1, 2, "weather", "").unwrap();
        put_waiting_state(&conn, 1, 2, "echo", "partial").unwrap();

        let state = get_waiting_state(&conn, 1, 2).unwrap().unwrap();
        assert_eq!(state.command, "echo");
        assert_eq!(state.partial_text, "partial");

        remove_waiting_state(&conn, 1, 2).unwrap();
        assert!(get_waiting_state(&conn, 1, 2).unwrap().is_none());
    }

    #[test]
    fn test_alias_owner_then_chat_fallback() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        save_alias(&conn, 1, 10, "w", "weather Berlin").unwrap();

        // Exact owner match
        let alias = get_alias(&conn, 1, 10, "w").unwrap().unwrap();
        assert_eq!(alias.value, "weather Berlin");

        // Another user in the same chat resolves the same name
        let alias = get_alias(&conn, 1, 20, "w").unwrap().unwrap();
        assert_eq!(alias.user_id, 10);

        // A different chat does not
        assert!(get_alias(&conn, 2, 10, "w").unwrap().is_none());
    }

    #[test]
    fn test_alias_upsert_and_list() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        save_alias(&conn, 1, 10, "w", "weather Berlin").unwrap();
        save_alias(&conn, 1, 10, "w", "weather Paris").unwrap();
        save_alias(&conn, 1, 10, "k", "karma").unwrap();

        let aliases = list_aliases(&conn, 1, 10).unwrap();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases[1].value, "weather Paris");
    }

    #[test]
    fn test_last_command_overwrite() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        assert!(get_last_command(&conn, 1).unwrap().is_none());
        set_last_command(&conn, 1, "weather").unwrap();
        set_last_command(&conn, 1, "karma").unwrap();
        assert_eq!(get_last_command(&conn, 1).unwrap().as_deref(), Some("karma"));
    }

    #[test]
    fn test_karma_adjust() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        assert_eq!(adjust_karma(&conn, 1, 10, 1).unwrap(), 1);
        assert_eq!(adjust_karma(&conn, 1, 10, 1).unwrap(), 2);
        assert_eq!(adjust_karma(&conn, 1, 10, -1).unwrap(), 1);
        assert_eq!(get_karma(&conn, 1, 20).unwrap(), 0);
    }

    #[test]
    fn test_talker_pairs_scoped_per_chat() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        add_talker_pair(&conn, 1, "кот", "баюн").unwrap();
        add_talker_pair(&conn, 1, "кот", "спит").unwrap();
        add_talker_pair(&conn, 2, "кот", "учёный").unwrap();

        let next = get_next_words(&conn, 1, "кот").unwrap();
        assert_eq!(next.len(), 2);
        assert!(next.contains(&"баюн".to_string()));
        assert!(!next.contains(&"учёный".to_string()));
    }

    #[test]
    fn test_count_admins() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        assert_eq!(count_admins(&conn, 3).unwrap(), 0);
        set_user_level(&conn, 100, 3).unwrap();
        assert_eq!(count_admins(&conn, 3).unwrap(), 1);
    }
}
