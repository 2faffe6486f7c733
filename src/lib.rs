//! # Campaign Sheet
//!
//! Reads and edits a macro-enabled campaign workbook (`.xlsm`) without losing its macros.
//!
//! ## Features
//!
//! - **Lossless round trip**: styles, drawings and the VBA project are carried through
//!   byte for byte; only edited worksheets are re-encoded
//! - **Header-anchored tables**: locate a table by a sentinel in column A, or take the
//!   first row as header, with normalized and unique column names
//! - **Write-back**: edited tables go back by position or by matching a key column
//! - **Event log**: append territory events to a log sheet created on first use
//! - **Campaign view**: dashboard metrics, territories, recon, bestiary and upgrade tiers
//!
//! ## Example
//!
//! ```no_run
//! use campaign_sheet::campaign::{TerritoryEvent, WriteMode};
//! use campaign_sheet::session::Session;
//!
//! # fn main() -> anyhow::Result<()> {
//! let bytes = std::fs::read("campaign.xlsm")?;
//! let mut session = Session::open("campaign.xlsm", &bytes)?;
//! let mut territories = session.view().territories?;
//! territories.set(0, "TerritoryState", "Contested")?;
//! session.apply_territory_edits(&territories, &WriteMode::ByKey("RegionName".to_owned()))?;
//! session.append_event(&TerritoryEvent {
//!     region: "Ashvale".to_owned(),
//!     event_type: "RAID_SUCCESS".to_owned(),
//!     value: 1.0,
//!     notes: String::new(),
//! })?;
//! std::fs::write("campaign.xlsm", session.download()?.bytes)?;
//! # Ok(())
//! # }
//! ```

mod error;
mod helpers;

pub mod campaign;
pub mod session;
pub mod spreadsheet;
pub mod table;

pub use error::CampaignSheetError;
pub use spreadsheet::serializer::serialize;
pub use spreadsheet::xlsx::load;
pub use spreadsheet::CellValue;
pub use spreadsheet::Document;
pub use spreadsheet::Grid;
pub use spreadsheet::GridMut;
pub use spreadsheet::Sheet;
pub use table::Criteria;
pub use table::Table;
