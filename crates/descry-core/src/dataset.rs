use crate::items::{Item, ItemSet};
use crate::rowset::RowSet;
use descry_error::{DescryResult, descry_bail};

/// Column-oriented view of a binary dataset: one [RowSet] per singleton.
///
/// The physical input layout (dense matrix, sparse matrix, transaction
/// lists) is a loader concern; everything downstream only asks which rows
/// contain a given column and how many rows contain all columns of an
/// itemset.
#[derive(Clone, Debug)]
pub struct Dataset {
    num_rows: usize,
    columns: Vec<RowSet>,
}

impl Dataset {
    /// Builds the view from row-wise index sets. `rows[i]` lists the columns
    /// set in row `i`; every index must be below `num_columns`.
    pub fn from_rows(num_columns: usize, rows: &[Vec<Item>]) -> DescryResult<Self> {
        let num_rows = rows.len();
        let mut columns = vec![RowSet::empty(num_rows); num_columns];
        for (row, items) in rows.iter().enumerate() {
            for &item in items {
                let Some(column) = columns.get_mut(item as usize) else {
                    descry_bail!(
                        Dataset: "row {} references column {} but the dataset has {} columns",
                        row,
                        item,
                        num_columns,
                    );
                };
                column.insert(row);
            }
        }
        Ok(Dataset { num_rows, columns })
    }

    /// Builds the view from a dense boolean matrix; all rows must share a
    /// width.
    pub fn from_dense(rows: &[Vec<bool>]) -> DescryResult<Self> {
        let num_columns = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut columns = vec![RowSet::empty(rows.len()); num_columns];
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != num_columns {
                descry_bail!(
                    Dataset: "row {} has width {}, expected {}",
                    row,
                    cells.len(),
                    num_columns,
                );
            }
            for (column, &set) in cells.iter().enumerate() {
                if set {
                    columns[column].insert(row);
                }
            }
        }
        Ok(Dataset {
            num_rows: rows.len(),
            columns,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, item: Item) -> &RowSet {
        &self.columns[item as usize]
    }

    pub fn support(&self, item: Item) -> usize {
        self.columns[item as usize].len()
    }

    pub fn frequency(&self, item: Item) -> f64 {
        if self.num_rows == 0 {
            0.0
        } else {
            self.support(item) as f64 / self.num_rows as f64
        }
    }

    /// Columns set in one row.
    pub fn row_items(&self, row: usize) -> impl Iterator<Item = Item> + '_ {
        (0..self.columns.len() as Item).filter(move |&j| self.columns[j as usize].contains(row))
    }

    /// Rows containing every column of `items`.
    pub fn itemset_rows(&self, items: &ItemSet) -> RowSet {
        let mut iter = items.iter();
        let Some(first) = iter.next() else {
            return RowSet::full(self.num_rows);
        };
        let mut rows = self.column(first).clone();
        for item in iter {
            rows.intersect_with(self.column(item));
        }
        rows
    }

    pub fn itemset_support(&self, items: &ItemSet) -> usize {
        self.itemset_rows(items).len()
    }
}

/// Rows belonging to one group label.
#[derive(Clone, Debug)]
pub struct GroupMask {
    label: i64,
    rows: RowSet,
}

impl GroupMask {
    /// Splits `labels` (one per row) into masks, one per distinct label,
    /// ordered by ascending label.
    pub fn split(num_rows: usize, labels: &[i64]) -> DescryResult<Vec<GroupMask>> {
        if labels.len() != num_rows {
            descry_bail!(
                Dataset: "labels length {} does not match row count {}",
                labels.len(),
                num_rows,
            );
        }
        let mut distinct: Vec<i64> = labels.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        let mut masks: Vec<GroupMask> = distinct
            .into_iter()
            .map(|label| GroupMask {
                label,
                rows: RowSet::empty(num_rows),
            })
            .collect();
        for (row, &label) in labels.iter().enumerate() {
            let mask = masks
                .iter_mut()
                .find(|m| m.label == label)
                .unwrap_or_else(|| unreachable!("label seen during dedup"));
            mask.rows.insert(row);
        }
        Ok(masks)
    }

    pub fn label(&self) -> i64 {
        self.label
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_builds_columns() {
        let data = Dataset::from_rows(3, &[vec![0, 2], vec![1], vec![0, 1, 2]]).unwrap();
        assert_eq!(data.num_rows(), 3);
        assert_eq!(data.num_columns(), 3);
        assert_eq!(data.support(0), 2);
        assert_eq!(data.support(1), 2);
        assert_eq!(data.column(2).iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn from_rows_rejects_out_of_range() {
        let err = Dataset::from_rows(2, &[vec![0, 5]]).unwrap_err();
        assert!(err.to_string().contains("column 5"));
    }

    #[test]
    fn dense_matches_sparse() {
        let dense = Dataset::from_dense(&[
            vec![true, false, true],
            vec![false, true, false],
            vec![true, true, true],
        ])
        .unwrap();
        let sparse = Dataset::from_rows(3, &[vec![0, 2], vec![1], vec![0, 1, 2]]).unwrap();
        for j in 0..3 {
            assert_eq!(
                dense.column(j).iter().collect::<Vec<_>>(),
                sparse.column(j).iter().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn row_items_round_trips() {
        let rows = vec![vec![0, 2], vec![], vec![1, 2]];
        let data = Dataset::from_rows(3, &rows).unwrap();
        for (row, expected) in rows.iter().enumerate() {
            assert_eq!(&data.row_items(row).collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn itemset_support_intersects() {
        let data = Dataset::from_rows(3, &[vec![0, 1], vec![0, 1, 2], vec![0]]).unwrap();
        assert_eq!(data.itemset_support(&ItemSet::from_sorted(&[0, 1])), 2);
        assert_eq!(data.itemset_support(&ItemSet::from_sorted(&[1, 2])), 1);
        assert_eq!(data.itemset_support(&ItemSet::new()), 3);
    }

    #[test]
    fn group_masks_split_by_label() {
        let masks = GroupMask::split(5, &[1, 0, 1, 2, 0]).unwrap();
        assert_eq!(masks.len(), 3);
        assert_eq!(masks[0].label(), 0);
        assert_eq!(masks[0].rows().iter().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(masks[1].rows().iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(masks[2].rows().iter().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn group_masks_reject_length_mismatch() {
        assert!(GroupMask::split(3, &[0, 1]).is_err());
    }

    #[test]
    fn degenerate_dataset_is_empty_not_an_error() {
        let empty = Dataset::from_rows(0, &[]).unwrap();
        assert_eq!(empty.num_rows(), 0);
        assert_eq!(empty.num_columns(), 0);
    }
}
