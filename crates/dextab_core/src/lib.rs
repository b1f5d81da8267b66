pub mod core_api;
pub mod schema;
pub mod table;
pub mod xml;
