pub mod app_settings;
pub mod persistence;
pub mod store;
pub mod weekly_actual;

pub use app_settings::AppSettings;
pub use persistence::Persistable;
pub use store::{FileStore, HttpStore, RowStore};
pub use weekly_actual::{EditField, WeeklyActual, WeeklyActualData};
