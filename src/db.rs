//! DVWA database statements.
//!
//! Every statement that touches the `users` table is built here, with
//! operator-influenced values escaped into SQL string literals and ids kept
//! as integers end to end. Checks that need a machine-readable answer use
//! `COUNT(*)` through `mysql -sN`, which prints the bare value, so nothing
//! downstream ever pattern-matches tabular output.

use crate::config::DbConfig;
use crate::identity::NewUser;
use crate::remote::RemoteCommand;

/// The display projection the operator sees for user rows.
const USER_COLUMNS: &str = "user_id AS 'ID', first_name AS 'First Name', \
     last_name AS 'Last Name', user AS 'Username', avatar AS 'Avatar', \
     last_login AS 'Last Login', failed_login AS 'Failed Logins'";

/// `mysql … -e <sql>` with tabular output, for statements whose output (if
/// any) is shown to the operator.
pub fn exec(db: &DbConfig, sql: impl Into<String>) -> RemoteCommand {
    mysql_base(db).arg("-e").arg(sql)
}

/// `mysql … -sN -e <sql>`: silent, no column names, one bare value per
/// row, for machine-readable checks.
pub fn query_bare(db: &DbConfig, sql: impl Into<String>) -> RemoteCommand {
    mysql_base(db).arg("-sN").arg("-e").arg(sql)
}

/// `mysqldump` of the whole database into a remote file.
pub fn dump(db: &DbConfig, remote_path: impl Into<String>) -> RemoteCommand {
    RemoteCommand::new("mysqldump")
        .arg("-u")
        .arg(&db.user)
        .arg(format!("-p{}", db.password))
        .arg(&db.name)
        .stdout_to(remote_path)
}

/// Replay a dump file into the database.
pub fn replay(db: &DbConfig, remote_path: impl Into<String>) -> RemoteCommand {
    mysql_base(db).stdin_from(remote_path)
}

fn mysql_base(db: &DbConfig) -> RemoteCommand {
    RemoteCommand::new("mysql")
        .arg("-u")
        .arg(&db.user)
        .arg(format!("-p{}", db.password))
        .arg(&db.name)
}

/// All users, in database order.
pub fn list_users_sql() -> String {
    format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id;")
}

/// One user's row, for the pre-deletion display.
pub fn user_row_sql(username: &str) -> String {
    format!(
        "SELECT {USER_COLUMNS} FROM users WHERE user = {};",
        sql_str(username)
    )
}

/// How many rows carry this username. `0` / `1` is the existence signal.
pub fn count_by_username_sql(username: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM users WHERE user = {};",
        sql_str(username)
    )
}

/// How many rows carry this id, for post-insert verification.
pub fn count_by_id_sql(user_id: u64) -> String {
    format!("SELECT COUNT(*) FROM users WHERE user_id = {user_id};")
}

/// The next free user id.
pub fn next_user_id_sql() -> String {
    "SELECT COALESCE(MAX(user_id), 0) + 1 FROM users;".to_string()
}

/// Insert a generated identity under an allocated id.
pub fn insert_user_sql(user_id: u64, user: &NewUser) -> String {
    format!(
        "INSERT INTO users (user_id, first_name, last_name, user, password, avatar, failed_login) \
         VALUES ({}, {}, {}, {}, {}, {}, 0);",
        user_id,
        sql_str(&user.first_name),
        sql_str(&user.last_name),
        sql_str(&user.username),
        sql_str(&user.password_hash),
        sql_str(&user.avatar),
    )
}

/// Delete every row carrying this username.
pub fn delete_user_sql(username: &str) -> String {
    format!("DELETE FROM users WHERE user = {};", sql_str(username))
}

/// Render a value as a MySQL string literal (backslash and quote escaped).
pub fn sql_str(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
