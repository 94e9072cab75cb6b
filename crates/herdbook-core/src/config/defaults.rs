//! Default values for Herdbook configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// API Defaults
// ============================================================================

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default HTTP request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default page size when listing the whole herd.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

// ============================================================================
// Genealogy Defaults
// ============================================================================

/// Generations requested when the caller does not say.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Depth assumed when a server graph declares `depth <= 0`.
pub const DEFAULT_FALLBACK_DEPTH: usize = 10;

/// Generations added by one "load more".
pub const DEFAULT_LOAD_MORE_INCREMENT: usize = 2;

/// Node fields requested from the tree endpoints.
pub const DEFAULT_TREE_FIELDS: &str = "id,record,sex,birth_date,idFather,idMother,breed";

// ============================================================================
// Cache Defaults
// ============================================================================

/// Tree cache time-to-live (8 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 8 * 60;

/// Cache directory used when no platform cache dir is available.
pub const DEFAULT_CACHE_DIR: &str = ".herdbook/cache";

/// Subdirectory of the platform cache dir.
pub const DEFAULT_CACHE_SUBDIR: &str = "herdbook/trees";

// ============================================================================
// Config Files
// ============================================================================

/// Project-local config file name.
pub const DEFAULT_CONFIG_FILE: &str = "herdbook.toml";

/// App directory under the user config dir.
pub const DEFAULT_CONFIG_APP_DIR: &str = "herdbook";

// ============================================================================
// User-facing Messages
// ============================================================================

pub const MSG_UNAUTHORIZED: &str = "Sesión expirada o no autorizada";

pub const MSG_NOT_FOUND: &str = "Animal no encontrado o sin datos genealógicos disponibles";

pub const MSG_SERVER_ERROR: &str = "Error del servidor al obtener el árbol genealógico";

pub const MSG_GENERIC_ERROR: &str = "No se pudo cargar el árbol genealógico";
