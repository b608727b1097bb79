use std::path::PathBuf;

use serde::Deserialize;

/// Upper bound for either token lifetime: ten years.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 366 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.secret.is_empty(), "JWT_SECRET is empty");
        for (name, ttl) in [
            ("JWT_TTL_MINUTES", self.ttl_minutes),
            ("JWT_REFRESH_TTL_MINUTES", self.refresh_ttl_minutes),
        ] {
            anyhow::ensure!(
                (1..=MAX_TTL_MINUTES).contains(&ttl),
                "{name} must be between 1 and {MAX_TTL_MINUTES}, got {ttl}"
            );
        }
        Ok(())
    }
}

/// Argon2 work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub static_dir: PathBuf,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub polka_key: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?,
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 60),
        };
        jwt.validate()?;

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism),
        };

        Ok(Self {
            database_path: env_or("DATABASE_PATH", PathBuf::from("./database.json")),
            static_dir: env_or("STATIC_DIR", PathBuf::from("./public")),
            jwt,
            password,
            polka_key: std::env::var("POLKA_KEY").ok().filter(|k| !k.is_empty()),
        })
    }
}
