use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{jwt::JwtKeys, password::PasswordHasher};
use crate::config::{AppConfig, JwtConfig, PasswordConfig};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub passwords: PasswordHasher,
    /// Requests served from the static app directory since start or last reset.
    pub hits: Arc<AtomicU64>,
}

impl AppState {
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(Store::new(&config.database_path));
        let keys = JwtKeys::new(&config.jwt)?;
        let passwords = PasswordHasher::new(&config.password)?;
        Ok(Self {
            store,
            config: Arc::new(config),
            keys,
            passwords,
            hits: Arc::new(AtomicU64::new(0)),
        })
    }

    /// State for tests: a store at `database_path`, a fixed secret and a cheap
    /// argon2 work factor.
    pub fn fake(database_path: impl Into<PathBuf>) -> Self {
        let database_path = database_path.into();
        let static_dir = database_path
            .parent()
            .map(|p| p.join("public"))
            .unwrap_or_else(|| PathBuf::from("public"));
        let config = AppConfig {
            database_path,
            static_dir,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_minutes: 60,
                refresh_ttl_minutes: 60 * 24 * 60,
            },
            password: PasswordConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            polka_key: Some("test-polka-key".into()),
        };
        Self::init(config).expect("test config is valid")
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
