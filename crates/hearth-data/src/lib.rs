pub mod loader;
pub mod schema;

pub use loader::{load_catalog, load_catalog_str, DataLoadError, Format};
