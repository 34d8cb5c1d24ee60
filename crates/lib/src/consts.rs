//! Crate-wide constants.

/// Name used for data directories and the `managed-by` tag.
pub const APP_NAME: &str = "stackc";

/// Length of the truncated SHA-256 used for document hashes.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Version of the output document layout.
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

/// Log retention periods accepted by the provider, in days.
pub const LOG_RETENTION_DAYS: &[u32] = &[
  1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922, 3288, 3653,
];

/// Inclusive function memory bounds in MB.
pub const FUNCTION_MEMORY_MB: (u32, u32) = (128, 10_240);

/// Inclusive function timeout bounds in seconds.
pub const FUNCTION_TIMEOUT_SECS: (u32, u32) = (1, 900);

/// Upper bound for gateway and distribution cache TTLs in seconds.
pub const MAX_CACHE_TTL_SECS: u32 = 3600;
