/// Constants shared by the extract reader, the builders and the CLI.
/// Field positions and delimiters describe the denormalized sales extract.

// Delimiters
pub const FIELD_DELIMITER: char = '\t';
pub const LIST_DELIMITER: char = ';';

// Minimum field counts a row needs before a consumer will look at it.
// Shorter rows are skipped by that consumer, never reported as errors.
pub const CUSTOMER_MIN_FIELDS: usize = 5;
pub const SALES_MIN_FIELDS: usize = 11;

// Field positions within a data line
pub const CUSTOMER_NAME_FIELD: usize = 0;
pub const ADDRESS_FIELD: usize = 1;
pub const CITY_FIELD: usize = 2;
pub const COUNTRY_FIELD: usize = 3;
pub const REGION_FIELD: usize = 4;
pub const PRODUCT_NAMES_FIELD: usize = 5;
pub const PRODUCT_CATEGORIES_FIELD: usize = 6;
pub const CATEGORY_DESCRIPTIONS_FIELD: usize = 7;
pub const UNIT_PRICES_FIELD: usize = 8;
pub const QUANTITIES_FIELD: usize = 9;
pub const ORDER_DATES_FIELD: usize = 10;

// Table names in the normalized store
pub const REGION_TABLE: &str = "Region";
pub const COUNTRY_TABLE: &str = "Country";
pub const CUSTOMER_TABLE: &str = "Customer";
pub const PRODUCT_CATEGORY_TABLE: &str = "ProductCategory";
pub const PRODUCT_TABLE: &str = "Product";
pub const ORDER_DETAIL_TABLE: &str = "OrderDetail";

/// Dimension tables first, fact table last; the order the pipeline builds them in.
pub const BUILD_ORDER: [&str; 6] = [
    REGION_TABLE,
    COUNTRY_TABLE,
    CUSTOMER_TABLE,
    PRODUCT_CATEGORY_TABLE,
    PRODUCT_TABLE,
    ORDER_DETAIL_TABLE,
];

// Defaults used when no config file or environment override is present
pub const DEFAULT_INPUT_PATH: &str = "data.csv";
pub const DEFAULT_DATABASE_PATH: &str = "normalized.db";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "sales_normalizer.log";
pub const CONFIG_FILE: &str = "config.toml";
