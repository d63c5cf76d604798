use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

/// A full user record. Never serialized directly; handlers project the
/// public fields they need (the hash and refresh token stay server-side).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_blocked: bool,
    /// The single outstanding refresh token. None means no active session.
    pub refresh_token: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_blocked: i32,
    refresh_token: Option<String>,
    profile_image: Option<String>,
    created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: UserRole::from_str(&row.role),
            is_blocked: row.is_blocked != 0,
            refresh_token: row.refresh_token,
            profile_image: row.profile_image,
            created_at: row.created_at,
        }
    }
}

/// Public user projection for listings. Does not expose the password hash,
/// the refresh token, or internal database IDs.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "id")]
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_blocked: bool,
    pub profile_image: Option<String>,
    pub created_at: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            uuid: user.uuid,
            name: user.name,
            email: user.email,
            role: user.role,
            is_blocked: user.is_blocked,
            profile_image: user.profile_image,
            created_at: user.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    uuid: String,
    name: String,
    email: String,
    role: String,
    is_blocked: i32,
    profile_image: Option<String>,
    created_at: String,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        Self {
            uuid: row.uuid,
            name: row.name,
            email: row.email,
            role: UserRole::from_str(&row.role),
            is_blocked: row.is_blocked != 0,
            profile_image: row.profile_image,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, uuid, name, email, password_hash, role, is_blocked, refresh_token, profile_image, created_at";

const SUMMARY_COLUMNS: &str = "uuid, name, email, role, is_blocked, profile_image, created_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the internal user ID.
    pub async fn create(
        &self,
        uuid: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        is_blocked: bool,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, name, email, password_hash, role, is_blocked) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(is_blocked as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by email. The lookup is case-sensitive: `A@x.com` and
    /// `a@x.com` are distinct accounts (search, by contrast, matches
    /// case-insensitively).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by public UUID.
    pub async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE uuid = ?",
            USER_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Check whether an email is already used by a different account.
    pub async fn email_taken_by_other(
        &self,
        email: &str,
        exclude_uuid: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND uuid != ?")
                .bind(email)
                .bind(exclude_uuid)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Persist a new refresh token, overwriting any previous value.
    ///
    /// This is the single-session invariant: the stored value is the only
    /// refresh token that will validate, so writing here revokes whatever
    /// token was stored before (last write wins under concurrent logins).
    pub async fn set_refresh_token(&self, uuid: &str, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE uuid = ?")
            .bind(token)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the stored refresh token (logout / blocked-refresh revocation).
    /// Idempotent: clearing an already-empty slot is not an error.
    pub async fn clear_refresh_token(&self, uuid: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token = NULL WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set or clear the blocked flag.
    pub async fn set_blocked(&self, uuid: &str, blocked: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_blocked = ? WHERE uuid = ?")
            .bind(blocked as i32)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update display name and email.
    pub async fn update_name_email(
        &self,
        uuid: &str,
        name: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET name = ?, email = ? WHERE uuid = ?")
            .bind(name)
            .bind(email)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored password hash.
    pub async fn set_password_hash(&self, uuid: &str, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE uuid = ?")
            .bind(hash)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the profile image path.
    pub async fn set_profile_image(&self, uuid: &str, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET profile_image = ? WHERE uuid = ?")
            .bind(path)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List non-admin accounts matching a keyword, newest first.
    ///
    /// The keyword matches name or email case-insensitively (an empty keyword
    /// matches everything). `blocked` optionally filters on the blocked flag.
    /// `page` is 1-based.
    pub async fn list_non_admins(
        &self,
        keyword: &str,
        blocked: Option<bool>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let page = page.max(1);
        let offset = (page - 1) as i64 * limit as i64;
        let blocked = blocked.map(|b| b as i32);

        let rows: Vec<UserSummaryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users
             WHERE role != 'admin'
               AND (name LIKE '%' || ? || '%' OR email LIKE '%' || ? || '%')
               AND (? IS NULL OR is_blocked = ?)
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?",
            SUMMARY_COLUMNS
        ))
        .bind(keyword)
        .bind(keyword)
        .bind(blocked)
        .bind(blocked)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    /// Count the non-admin accounts matching a keyword / blocked filter.
    pub async fn count_non_admins(
        &self,
        keyword: &str,
        blocked: Option<bool>,
    ) -> Result<i64, sqlx::Error> {
        let blocked = blocked.map(|b| b as i32);
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users
             WHERE role != 'admin'
               AND (name LIKE '%' || ? || '%' OR email LIKE '%' || ? || '%')
               AND (? IS NULL OR is_blocked = ?)",
        )
        .bind(keyword)
        .bind(keyword)
        .bind(blocked)
        .bind(blocked)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    /// Unpaginated keyword search over non-admin accounts.
    pub async fn search_non_admins(&self, keyword: &str) -> Result<Vec<UserSummary>, sqlx::Error> {
        let rows: Vec<UserSummaryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users
             WHERE role != 'admin'
               AND (name LIKE '%' || ? || '%' OR email LIKE '%' || ? || '%')
             ORDER BY created_at DESC, id DESC",
            SUMMARY_COLUMNS
        ))
        .bind(keyword)
        .bind(keyword)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserSummary::from).collect())
    }
}
