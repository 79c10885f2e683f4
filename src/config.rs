use std::env;
use std::path::PathBuf;

use crate::db::DEFAULT_MIGRATIONS_DIR;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub migrations_dir: PathBuf,
    pub admin_token: String,
    pub business_name: String,
    pub appointment_minutes: i64,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT").unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "slotbook.db".to_string()),
            migrations_dir: env::var("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MIGRATIONS_DIR)),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Booking".to_string()),
            appointment_minutes: parsed("APPOINTMENT_MINUTES").unwrap_or(60),
            argon2_memory_kib: parsed("ARGON2_MEMORY_KIB").unwrap_or(argon2::Params::DEFAULT_M_COST),
            argon2_iterations: parsed("ARGON2_ITERATIONS").unwrap_or(argon2::Params::DEFAULT_T_COST),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
