pub const PARSE_FAILED: &str = "PARSE_FAILED";
pub const MISSING_PRIMARY_ENTRY: &str = "MISSING_PRIMARY_ENTRY";
pub const MISSING_SECONDARY_PROP: &str = "MISSING_SECONDARY_PROP";
pub const MISSING_GLOBAL_NAME: &str = "MISSING_GLOBAL_NAME";
pub const PANIC: &str = "PANIC";
pub const IO_ERROR: &str = "IO_ERROR";
