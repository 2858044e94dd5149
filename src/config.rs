use std::sync::LazyLock;

use derive_from_env::FromEnv;

/// Flush thresholds for the writer thread, overridable through `BUFLOG_*`
/// environment variables.
#[derive(FromEnv)]
#[from_env(prefix = "BUFLOG")]
#[allow(non_snake_case)]
pub struct BufLogConfig {
    #[from_env(default = "100")]
    pub FLUSH_INTERVAL_MS: u64,
    #[from_env(default = "4096")]
    pub FLUSH_MAX_BYTES: u64,
    #[from_env(default = "20")]
    pub FLUSH_MESSAGE_BUDGET: u64,
    #[from_env(default = "10")]
    pub IDLE_WAIT_MS: u64,
}

pub static BUFLOG_CONFIG: LazyLock<BufLogConfig> =
    LazyLock::new(|| BufLogConfig::from_env().unwrap());
