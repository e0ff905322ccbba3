//! Application constants for the RAIS processor
//!
//! Default storage locations, input format parameters and the names of
//! the columns the pipeline treats specially.

// =============================================================================
// Storage Zones
// =============================================================================

/// Default bronze (raw) zone holding the RAIS 2020 text files
pub const DEFAULT_BRONZE_PATH: &str = "data/bronze";

/// Default silver (cleaned) zone destination for the partitioned output
pub const DEFAULT_SILVER_PATH: &str = "data/silver/rais_2020";

/// File extensions picked up when the bronze path is a directory
pub const BRONZE_FILE_EXTENSIONS: &[&str] = &["csv", "txt"];

/// Marker written at the root of a successfully published silver dataset
pub const SUCCESS_MARKER: &str = "_SUCCESS";

// =============================================================================
// Input Format
// =============================================================================

/// Field delimiter used by the RAIS microdata files
pub const DEFAULT_DELIMITER: u8 = b';';

/// Text encoding label of the RAIS microdata files
pub const DEFAULT_ENCODING: &str = "latin1";

/// Prefix given to blank header cells, followed by the column index
pub const BLANK_HEADER_PREFIX: &str = "_c";

// =============================================================================
// Canonical Columns
// =============================================================================

/// Municipality code column the state code is derived from
pub const MUNICIPIO_COLUMN: &str = "municipio";

/// Derived state code column, also the partition key
pub const UF_COLUMN: &str = "uf";

/// Number of leading municipality-code characters forming the state code
pub const UF_PREFIX_LEN: i64 = 2;

/// Directory value used for rows whose partition key is null
pub const NULL_PARTITION_VALUE: &str = "__HIVE_DEFAULT_PARTITION__";

/// Number of columns in the RAIS 2020 vínculos layout
pub const RAIS_2020_COLUMN_COUNT: usize = 60;
