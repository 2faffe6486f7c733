//! # Campaign Module
//!
//! The campaign tracker built on top of the workbook model: the war dashboard,
//! territory and recon tables, the bestiary, upgrade tiers and the territory event log.
//!
//! Every section loads independently. A missing sheet or header degrades only its own
//! section; the rest of the view stays usable.

pub mod dashboard;
pub mod events;
pub mod monsters;
pub mod territories;
pub mod upgrades;

pub use dashboard::DashboardSummary;
pub use dashboard::WarDashboard;
pub use events::append_event;
pub use events::TerritoryEvent;
pub use territories::apply_territory_edits;
pub use territories::WriteMode;
pub use upgrades::UpgradeScan;

use crate::error::CampaignSheetError;
use crate::spreadsheet::Document;
use crate::table::Table;

pub const WAR_DASHBOARD_SHEET: &str = "WarDashboard";
pub const TERRITORIES_SHEET: &str = "Territories";
pub const RECON_SHEET: &str = "Recon";
pub const MONSTERS_SHEET: &str = "Monsters";
pub const UPGRADES_SHEET: &str = "Upgrade Systems";
pub const EVENTS_SHEET: &str = "TerritoryEvents";

/// Everything the campaign screens show for one workbook.
#[derive(Debug)]
pub struct CampaignView {
    pub dashboard: Result<WarDashboard, CampaignSheetError>,
    pub territories: Result<Table, CampaignSheetError>,
    pub recon: Result<Table, CampaignSheetError>,
    pub monsters: Result<Table, CampaignSheetError>,
    pub upgrades: Result<UpgradeScan, CampaignSheetError>,
    /// Region pick list for new events
    pub regions: Vec<String>,
    /// Event type pick list for new events
    pub event_types: Vec<String>,
}

impl CampaignView {
    pub fn load(document: &Document) -> Self {
        let view = CampaignView {
            dashboard: document
                .require_sheet(WAR_DASHBOARD_SHEET)
                .map(WarDashboard::from_grid),
            territories: territories::load_territories(document),
            recon: territories::load_recon(document),
            monsters: monsters::load_monsters(document),
            upgrades: document
                .require_sheet(UPGRADES_SHEET)
                .map(UpgradeScan::from_grid),
            regions: events::region_options(document),
            event_types: events::event_type_options(document),
        };
        view.log_failures();
        view
    }

    fn log_failures(&self) {
        let sections = [
            (WAR_DASHBOARD_SHEET, self.dashboard.as_ref().err()),
            (TERRITORIES_SHEET, self.territories.as_ref().err()),
            (RECON_SHEET, self.recon.as_ref().err()),
            (MONSTERS_SHEET, self.monsters.as_ref().err()),
            (UPGRADES_SHEET, self.upgrades.as_ref().err()),
        ];
        for (section, error) in sections {
            if let Some(error) = error {
                log::warn!("Section '{}' unavailable: {}", section, error);
            }
        }
    }
}
