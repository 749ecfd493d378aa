mod range_cache;
mod sheet_roster_store;
mod sheets_client;

pub use range_cache::RangeCache;
pub use sheet_roster_store::SheetRosterStore;
pub use sheets_client::{extract_spreadsheet_id, ServiceAccountAuth, SheetError, SheetsClient};
