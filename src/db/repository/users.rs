use std::sync::Arc;
use std::time::Duration;

use bcrypt::{hash, verify};
use chrono::Utc;
use moka::sync::Cache;
use tracing::{debug, info, warn};

use crate::db::models::user::{Role, User, UserRecord};
use crate::db::store::SharedStore;
use crate::error::ServiceError;

/// Credentials for a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    fn validated(self) -> Result<Self, ServiceError> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();
        if name.is_empty() || email.is_empty() || self.password.is_empty() {
            return Err(ServiceError::Validation(
                "Name, email and password are all required.".to_string(),
            ));
        }
        Ok(Self {
            name,
            email,
            password: self.password,
        })
    }
}

/// Accounts and credential checks.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<SharedStore>,
    bcrypt_cost: u32,
    /// ✅ Accounts resolved for authenticated requests; entries are dropped on delete.
    accounts: Cache<i32, User>,
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("Invalid email or password.".to_string())
}

impl UserDirectory {
    pub fn new(store: Arc<SharedStore>, bcrypt_cost: u32) -> Self {
        Self {
            store,
            bcrypt_cost,
            accounts: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(60))
                .build(),
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, ServiceError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| ServiceError::Dependency(format!("Password hashing task failed: {e}")))?
            .map_err(|e| ServiceError::Dependency(format!("Password hashing failed: {e}")))
    }

    /// Creates a worker account. Emails are unique, compared case-insensitively.
    pub async fn register(&self, account: NewAccount) -> Result<User, ServiceError> {
        self.insert(account.validated()?, Role::Worker).await
    }

    async fn insert(&self, account: NewAccount, role: Role) -> Result<User, ServiceError> {
        let password_hash = self.hash_password(account.password).await?;

        let user = self
            .store
            .update(move |db| {
                if db.users.iter().any(|u| u.email_matches(&account.email)) {
                    return Err(ServiceError::Conflict(
                        "This email is already in use.".to_string(),
                    ));
                }
                let record = UserRecord {
                    id: db.allocate_user_id(),
                    name: account.name,
                    email: account.email,
                    role,
                    password_hash,
                    created_at: Utc::now(),
                };
                let user = record.to_user();
                db.users.push(record);
                Ok(user)
            })
            .await?;

        info!(user_id = user.id, role = %user.role, "account created");
        Ok(user)
    }

    /// Seeds a fixed account if no account uses `email` yet.
    pub async fn ensure_account(&self, account: NewAccount, role: Role) -> Result<User, ServiceError> {
        let account = account.validated()?;
        let existing = self
            .store
            .read()
            .await?
            .users
            .into_iter()
            .find(|u| u.email_matches(&account.email));

        match existing {
            Some(record) if record.role == role => {
                debug!(user_id = record.id, %role, "fixed account already present");
                Ok(record.to_user())
            }
            Some(record) => Err(ServiceError::Conflict(format!(
                "{} is registered as {}, expected {role}",
                record.email, record.role
            ))),
            None => self.insert(account, role).await,
        }
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let record = self
            .store
            .read()
            .await?
            .users
            .into_iter()
            .find(|u| u.email_matches(email));

        let Some(record) = record else {
            warn!("❌ Login attempt for unknown email: {email}");
            return Err(invalid_credentials());
        };

        let candidate = password.to_string();
        let stored_hash = record.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify(candidate, &stored_hash))
            .await
            .map_err(|e| ServiceError::Dependency(format!("Password check task failed: {e}")))?;

        match matches {
            Ok(true) => {
                info!(user_id = record.id, "✅ Login successful");
                Ok(record.to_user())
            }
            Ok(false) => {
                warn!(user_id = record.id, "❌ Invalid password attempt");
                Err(invalid_credentials())
            }
            Err(e) => {
                warn!(user_id = record.id, "❌ Password verification error: {e}");
                Err(invalid_credentials())
            }
        }
    }

    pub async fn get(&self, id: i32) -> Result<User, ServiceError> {
        self.store
            .read()
            .await?
            .users
            .iter()
            .find(|u| u.id == id)
            .map(UserRecord::to_user)
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))
    }

    /// Looks up the account behind a token, through the account cache.
    pub async fn resolve(&self, id: i32) -> Result<User, ServiceError> {
        if let Some(user) = self.accounts.get(&id) {
            return Ok(user);
        }
        let user = self.get(id).await?;
        self.accounts.insert(id, user.clone());
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        let mut users: Vec<User> = self
            .store
            .read()
            .await?
            .users
            .iter()
            .map(UserRecord::to_user)
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    /// Removes the account only. Requests the user submitted stay as they are.
    pub async fn remove(&self, id: i32) -> Result<User, ServiceError> {
        let removed = self
            .store
            .update(|db| {
                let index = db
                    .users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))?;
                Ok(db.users.remove(index).to_user())
            })
            .await?;
        self.accounts.invalidate(&id);

        info!(user_id = id, "account deleted");
        Ok(removed)
    }
}
