//! Table identifiers and dependency sets for invalidation tracking.

use serde::{Deserialize, Serialize};

/// The five persisted tables. Variant names match the SQL table names,
/// which are part of the compatibility surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    RecentFiles,
    Favorites,
    Notes,
    ReadingPositions,
    SearchIndex,
}

impl Table {
    /// All tables, in schema order.
    pub const ALL: [Table; 5] = [
        Table::RecentFiles,
        Table::Favorites,
        Table::Notes,
        Table::ReadingPositions,
        Table::SearchIndex,
    ];

    /// SQL table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::RecentFiles => "recent_files",
            Table::Favorites => "favorites",
            Table::Notes => "notes",
            Table::ReadingPositions => "reading_positions",
            Table::SearchIndex => "search_index",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Table::RecentFiles => 1 << 0,
            Table::Favorites => 1 << 1,
            Table::Notes => 1 << 2,
            Table::ReadingPositions => 1 << 3,
            Table::SearchIndex => 1 << 4,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A set of tables, used both as a query's dependency set and as the
/// touched set a committed write reports to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableSet(u8);

impl TableSet {
    /// The empty set.
    pub const EMPTY: TableSet = TableSet(0);

    /// A set containing a single table.
    pub fn of(table: Table) -> Self {
        TableSet(table.bit())
    }

    /// Add a table to the set.
    pub fn with(self, table: Table) -> Self {
        TableSet(self.0 | table.bit())
    }

    /// Whether the set contains the given table.
    pub fn contains(&self, table: Table) -> bool {
        self.0 & table.bit() != 0
    }

    /// Whether the two sets share any table.
    pub fn intersects(&self, other: TableSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the tables in the set, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = Table> + '_ {
        Table::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl From<Table> for TableSet {
    fn from(table: Table) -> Self {
        TableSet::of(table)
    }
}

impl FromIterator<Table> for TableSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        iter.into_iter().fold(TableSet::EMPTY, TableSet::with)
    }
}

impl std::fmt::Display for TableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.iter().map(|t| t.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_membership() {
        let set = TableSet::of(Table::Favorites).with(Table::Notes);
        assert!(set.contains(Table::Favorites));
        assert!(set.contains(Table::Notes));
        assert!(!set.contains(Table::RecentFiles));
    }

    #[test]
    fn test_intersects() {
        let favorites = TableSet::of(Table::Favorites);
        let notes = TableSet::of(Table::Notes);
        assert!(!favorites.intersects(notes));
        assert!(favorites.intersects(favorites.with(Table::SearchIndex)));
        assert!(!favorites.intersects(TableSet::EMPTY));
    }

    #[test]
    fn test_iter_order() {
        let set: TableSet = [Table::SearchIndex, Table::RecentFiles].into_iter().collect();
        let tables: Vec<_> = set.iter().collect();
        assert_eq!(tables, vec![Table::RecentFiles, Table::SearchIndex]);
    }

    #[test]
    fn test_display() {
        let set = TableSet::of(Table::ReadingPositions);
        assert_eq!(set.to_string(), "{reading_positions}");
    }
}
