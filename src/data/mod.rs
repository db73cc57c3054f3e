//! Data module - table loading, code table and forecasts

pub mod code_table;
pub mod forecast;
pub mod loader;

pub use code_table::{CodeTable, Level, NameCodes};
pub use forecast::{parse_date, parse_date_arg, ForecastColumns, ForecastPoint, ForecastTable};
pub use loader::{load_table, TableFormat};
