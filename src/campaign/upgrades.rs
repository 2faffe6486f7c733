use crate::spreadsheet::Grid;
use std::collections::BTreeSet;

/// Rows of column A that make up one tier description, heading included.
pub const UPGRADE_BLOCK_HEIGHT: usize = 8;

const WEAPON_TIER_PREFIX: &str = "weapon tier";
const MILITIA_TIER_PREFIX: &str = "militia tier";

/// Tier descriptions and event codes found in column A of the upgrades sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpgradeScan {
    pub weapon_tiers: Vec<String>,
    pub militia_tiers: Vec<String>,
    pub event_codes: BTreeSet<String>,
}

impl UpgradeScan {
    /// Scans column A. A tier heading yields a block joined with `"; "`; any other
    /// upper-case line containing `_` is an event code.
    pub fn from_grid<G: Grid + ?Sized>(grid: &G) -> Self {
        let mut scan = UpgradeScan::default();
        for row in 1..=grid.max_row() {
            let Some(text) = grid.value(row, 1).as_text() else {
                continue;
            };
            let text = text.trim();
            let lower = text.to_lowercase();
            if lower.starts_with(WEAPON_TIER_PREFIX) {
                scan.weapon_tiers.push(tier_block(grid, row));
            } else if lower.starts_with(MILITIA_TIER_PREFIX) {
                scan.militia_tiers.push(tier_block(grid, row));
            } else if is_event_code(text) {
                scan.event_codes.insert(text.to_owned());
            }
        }
        log::debug!(
            "Upgrade scan: {} weapon tiers, {} militia tiers, {} event codes",
            scan.weapon_tiers.len(),
            scan.militia_tiers.len(),
            scan.event_codes.len()
        );
        scan
    }
}

/// Every event code in column A, sorted and de-duplicated, tier headings included.
pub fn event_type_codes<G: Grid + ?Sized>(grid: &G) -> Vec<String> {
    (1..=grid.max_row())
        .filter_map(|row| grid.value(row, 1).as_text())
        .map(str::trim)
        .filter(|text| is_event_code(text))
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn tier_block<G: Grid + ?Sized>(grid: &G, row: usize) -> String {
    (row..row + UPGRADE_BLOCK_HEIGHT)
        .map(|row| grid.value(row, 1))
        .filter(|value| value.is_truthy())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Has at least one cased character, none of them lower-case, and an underscore.
fn is_event_code(text: &str) -> bool {
    text.contains('_')
        && text.chars().any(char::is_uppercase)
        && !text.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixtures::grid;
    use crate::spreadsheet::CellValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn scans_tiers_and_codes() {
        let mut rows = grid(&[
            &["  Weapon Tier 1"],
            &["Bronze blades"],
            &[""],
            &["+1 attack"],
            &["RAID_SUCCESS"],
            &[""],
            &[""],
            &[""],
            &["Militia tier 1"],
            &["Levy"],
            &["FORT_BUILT"],
            &["RAID_SUCCESS"],
            &["not_code"],
            &["NOCODE"],
            &["  "],
        ]);
        rows[2][0] = CellValue::Number(0.0);
        rows[5][0] = CellValue::Number(12.0);

        let scan = UpgradeScan::from_grid(&rows);
        assert_eq!(
            scan.weapon_tiers,
            vec!["  Weapon Tier 1; Bronze blades; +1 attack; RAID_SUCCESS; 12"]
        );
        assert_eq!(
            scan.militia_tiers,
            vec!["Militia tier 1; Levy; FORT_BUILT; RAID_SUCCESS; not_code; NOCODE;   "]
        );
        assert_eq!(
            scan.event_codes.into_iter().collect::<Vec<_>>(),
            vec!["FORT_BUILT", "RAID_SUCCESS"]
        );
    }

    #[test]
    fn event_codes_for_pick_list() {
        let rows = grid(&[&["WEAPON_TIER_X"], &["B_2"], &["B_2"], &["1_2"], &["Ab_C"]]);
        assert_eq!(event_type_codes(&rows), vec!["B_2", "WEAPON_TIER_X"]);
        assert!(UpgradeScan::from_grid(&rows).event_codes.contains("WEAPON_TIER_X"));
    }
}
