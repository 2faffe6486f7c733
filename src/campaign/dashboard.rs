use crate::spreadsheet::CellValue;
use crate::spreadsheet::Grid;

pub const TOTAL_CONTROL: &str = "Total Control %";
pub const TOTAL_INCOME: &str = "Total Income/day";
pub const COUNTERATTACK_RISK: &str = "Counterattack Risk";
pub const NEXT_ATTACK: &str = "Next Attack";
pub const ATTACK_TYPE: &str = "Attack Type";

/// Error value that displays as blank on the dashboard.
const NOT_AVAILABLE: &str = "#N/A";

/// Label/value pairs read from columns A and B of the dashboard sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WarDashboard {
    entries: Vec<(String, CellValue)>,
}

/// The headline figures of the dashboard, already made display-safe.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardSummary {
    pub total_control: CellValue,
    pub total_income: CellValue,
    pub counterattack_risk: CellValue,
    pub next_attack: CellValue,
    pub attack_type: CellValue,
}

impl WarDashboard {
    /// Collects every row with a truthy label; a later row overrides an earlier one.
    pub fn from_grid<G: Grid + ?Sized>(grid: &G) -> Self {
        let mut dashboard = WarDashboard::default();
        for row in 1..=grid.max_row() {
            let label = grid.value(row, 1);
            if !label.is_truthy() {
                continue;
            }
            let label = label.to_string();
            let value = grid.value(row, 2).clone();
            match dashboard.entries.iter_mut().find(|(existing, _)| *existing == label) {
                Some((_, slot)) => *slot = value,
                None => dashboard.entries.push((label, value)),
            }
        }
        dashboard
    }

    pub fn get(&self, label: &str) -> Option<&CellValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, CellValue)] {
        &self.entries
    }

    pub fn summary(&self) -> DashboardSummary {
        let zero = || CellValue::Number(0.0);
        let blank = || CellValue::Text(String::new());
        DashboardSummary {
            total_control: self.metric(TOTAL_CONTROL, zero()),
            total_income: self.metric(TOTAL_INCOME, zero()),
            counterattack_risk: self.metric(COUNTERATTACK_RISK, zero()),
            next_attack: self.metric(NEXT_ATTACK, blank()),
            attack_type: self.metric(ATTACK_TYPE, blank()),
        }
    }

    /// A labelled value, the default when the label is absent, blank when empty or `#N/A`.
    pub fn metric(&self, label: &str, default: CellValue) -> CellValue {
        safe(self.get(label).cloned().unwrap_or(default))
    }
}

fn safe(value: CellValue) -> CellValue {
    let blank = match &value {
        CellValue::Empty => true,
        CellValue::Text(text) | CellValue::Error(text) => text == NOT_AVAILABLE,
        _ => false,
    };
    if blank {
        CellValue::Text(String::new())
    } else {
        value
    }
}
