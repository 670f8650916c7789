//! Column-major attribute table for the tessellated cells
//!
//! Holds the split-source attribute columns, the numeric statistic columns
//! and the two chop assignment columns, all aligned with the cell vector by
//! row index.

/// Attribute table with one row per cell
///
/// Chop columns are 1-based tranche numbers; `0` marks a cell left in the
/// overflow tranche.
#[derive(Debug, Clone, Default)]
pub struct CellTable {
    len: usize,
    string_columns: Vec<(String, Vec<String>)>,
    numeric_columns: Vec<(String, Vec<f64>)>,
    pub initial_chops: Vec<u32>,
    pub final_chops: Vec<u32>,
}

impl CellTable {
    /// Create an empty table for `len` cells
    pub fn new(len: usize) -> Self {
        Self {
            len,
            string_columns: Vec::new(),
            numeric_columns: Vec::new(),
            initial_chops: Vec::new(),
            final_chops: Vec::new(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a string attribute column
    pub fn push_string_column(&mut self, name: impl Into<String>, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.len);
        self.string_columns.push((name.into(), values));
    }

    /// Append a numeric column
    pub fn push_numeric_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len);
        self.numeric_columns.push((name.into(), values));
    }

    /// Look up a numeric column by name
    pub fn numeric_column(&self, name: &str) -> Option<&[f64]> {
        self.numeric_columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Look up a string attribute column by name
    pub fn string_column(&self, name: &str) -> Option<&[String]> {
        self.string_columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values.as_slice())
    }

    /// All column names in insertion order, string columns first
    pub fn column_names(&self) -> Vec<&str> {
        self.string_columns
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.numeric_columns.iter().map(|(name, _)| name.as_str()))
            .collect()
    }

    /// Iterate the numeric columns in insertion order
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.numeric_columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Set both chop assignment columns
    pub fn set_chops(&mut self, initial: Vec<u32>, final_chops: Vec<u32>) {
        debug_assert_eq!(initial.len(), self.len);
        debug_assert_eq!(final_chops.len(), self.len);
        self.initial_chops = initial;
        self.final_chops = final_chops;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup() {
        let mut table = CellTable::new(3);
        table.push_string_column("estate", vec!["a".into(), "a".into(), "b".into()]);
        table.push_numeric_column("chm_mean", vec![1.0, 2.0, 3.0]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.numeric_column("chm_mean"), Some(&[1.0, 2.0, 3.0][..]));
        assert!(table.numeric_column("missing").is_none());
        assert_eq!(table.string_column("estate").unwrap()[2], "b");
        assert_eq!(table.column_names(), vec!["estate", "chm_mean"]);
    }

    #[test]
    fn test_chop_columns() {
        let mut table = CellTable::new(2);
        table.set_chops(vec![1, 0], vec![2, 1]);
        assert_eq!(table.initial_chops, vec![1, 0]);
        assert_eq!(table.final_chops, vec![2, 1]);
    }
}
