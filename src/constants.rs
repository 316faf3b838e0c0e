pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const AMOUNT_MIN_VALUE: i32 = 1;
pub const AMOUNT_MAX_VALUE: i32 = 32_000;

pub const COOKING_TIME_MIN_VALUE: i32 = 1;
pub const COOKING_TIME_MAX_VALUE: i32 = 1_440;

pub const NAME_MAX_LEN: usize = 200;
pub const UNIT_MAX_LEN: usize = 200;

pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Rows per `INSERT` when bulk loading the ingredient catalogue.
/// Postgres caps a statement at 65535 bind parameters.
pub const IMPORT_CHUNK_SIZE: usize = 1_000;

pub const SESSION_HEADER: &str = "authorization";
