pub const APP_NAME: &str = "mlookup";

pub const CLI_HEADER_MSG: &str = "MultiLookup - Concurrent hostname resolver";

// Logging
pub const CURRENT_DIR: &str = ".";
pub const LOGFILE_NAME: &str = "mlookup.log";
pub const LOG_ENV_VAR: &str = "MLOOKUP_LOG";
pub const LOGGING_JSON: bool = false;
pub const LOGGING_QUIET: bool = false;

// Configuration
pub const CONFIG_FILE: &str = "mlookup.toml";

// Pipeline
pub const MAX_NAME_LENGTH: usize = 1024;
pub const QUEUE_CAPACITY: usize = 10;
pub const MIN_CONSUMERS: usize = 1;
pub const CONSUMERS_AUTO: &str = "auto";
pub const SINK_BUFFER_SIZE: usize = 8 * 1024;
