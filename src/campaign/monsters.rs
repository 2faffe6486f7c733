use crate::campaign::MONSTERS_SHEET;
use crate::error::CampaignSheetError;
use crate::spreadsheet::Document;
use crate::table::extract;
use crate::table::Criteria;
use crate::table::Table;

/// Column searched by the name filter.
pub const NAME_COLUMN: &str = "Name";

/// Monster stat blocks: a table with its header in row 1.
pub fn load_monsters(document: &Document) -> Result<Table, CampaignSheetError> {
    extract(document.require_sheet(MONSTERS_SHEET)?, &Criteria::first_row())
}

/// Keeps monsters whose name contains the query, ignoring case.
///
/// The query is matched literally, so regex metacharacters such as `.` or `*` only
/// match themselves. An empty query keeps everything. A table without a `Name` column cannot be
/// filtered and yields [`CampaignSheetError::ColumnNotFound`].
pub fn filter_by_name(table: &Table, query: &str) -> Result<Table, CampaignSheetError> {
    if query.is_empty() {
        return Ok(table.clone());
    }
    if table.column_index(NAME_COLUMN).is_none() {
        return Err(CampaignSheetError::ColumnNotFound(NAME_COLUMN.to_owned()));
    }
    let query = query.to_lowercase();
    Ok(table.filter(|record| {
        record
            .get(NAME_COLUMN)
            .is_some_and(|name| name.to_string().to_lowercase().contains(&query))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::CellValue;
    use crate::spreadsheet::GridMut;
    use pretty_assertions::assert_eq;

    fn bestiary() -> Document {
        let mut document = Document::new();
        let sheet = document.create_sheet("Monsters").expect("new sheet");
        let rows: [[&str; 2]; 5] = [
            ["Name", "CR"],
            ["Goblin Archer", "1"],
            ["", ""],
            ["Hobgoblin", "3"],
            ["Ogre", "5"],
        ];
        for (row, values) in rows.iter().enumerate() {
            for (column, value) in values.iter().enumerate() {
                if !value.is_empty() {
                    sheet.set_value(row + 1, column + 1, CellValue::from(*value));
                }
            }
        }
        document
    }

    #[test]
    fn filters_names_case_insensitively() -> Result<(), CampaignSheetError> {
        let monsters = load_monsters(&bestiary())?;
        assert_eq!(monsters.len(), 3);
        let goblins = filter_by_name(&monsters, "GOBLIN")?;
        let names = goblins
            .records()
            .filter_map(|record| record.get("Name").map(ToString::to_string))
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Goblin Archer", "Hobgoblin"]);
        assert_eq!(filter_by_name(&monsters, "")?.len(), 3);
        assert_eq!(filter_by_name(&monsters, "dragon")?.len(), 0);
        assert_eq!(filter_by_name(&monsters, "gob.*")?.len(), 0);
        Ok(())
    }

    #[test]
    fn reports_missing_name_column() {
        let table = Table::new(vec!["Creature".to_owned()]);
        assert!(matches!(
            filter_by_name(&table, "ogre"),
            Err(CampaignSheetError::ColumnNotFound(column)) if column == "Name"
        ));
        assert!(matches!(
            load_monsters(&Document::new()),
            Err(CampaignSheetError::SheetNotFound(_))
        ));
    }
}
