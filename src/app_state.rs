use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, FixedAccount};
use crate::db::models::user::Role;
use crate::db::repository::{NewAccount, RequestRepository, UserDirectory};
use crate::db::store::{DocumentStore, SharedStore};
use crate::error::ServiceError;
use crate::utils::geocode::ReverseGeocoder;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SharedStore>,
    pub requests: RequestRepository,
    pub users: UserDirectory,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        let store = Arc::new(SharedStore::new(store, config.store_timeout));
        Self {
            requests: RequestRepository::new(store.clone()),
            users: UserDirectory::new(store.clone(), config.bcrypt_cost),
            store,
            geocoder,
            config: Arc::new(config),
        }
    }

    /// Creates the shared Inspector and Contractor logins if missing.
    pub async fn seed_fixed_accounts(&self) -> Result<(), ServiceError> {
        let fixed = [
            (&self.config.inspector, Role::Inspector),
            (&self.config.contractor, Role::Contractor),
        ];
        for (account, role) in fixed {
            if account.password == account.email {
                warn!(%role, "fixed account uses its default password; set {}_PASSWORD", role.as_str().to_uppercase());
            }
            let user = self.users.ensure_account(new_account(account), role).await?;
            info!(user_id = user.id, %role, "fixed account ready");
        }
        Ok(())
    }
}

fn new_account(account: &FixedAccount) -> NewAccount {
    NewAccount {
        name: account.name.clone(),
        email: account.email.clone(),
        password: account.password.clone(),
    }
}
