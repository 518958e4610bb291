pub mod credits;
pub mod schema;
pub mod store;

pub use credits::CreditTable;
pub use schema::{CatalogError, ProgramConfig, ProgramKey, UnitDefinition};
pub use store::ProgramCatalog;
