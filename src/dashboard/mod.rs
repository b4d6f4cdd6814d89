//! Dashboard module - Page assembly and user settings

mod page;
mod settings;

pub use page::{Dashboard, DashboardReport, Panel, PAGE_TITLE};
pub use settings::DashboardSettings;
