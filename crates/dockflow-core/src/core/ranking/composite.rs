//! Composite multi-criteria ranking.
//!
//! Merges several scoring columns, each with its own sort direction, into one
//! deterministic rank: every ranked column receives an average-method rank
//! (`<col>__RANK`), the per-row sum of those ranks becomes `Composite_Score`,
//! and the dense rank of that score becomes `Composite_Rank`. A second pass
//! selects the best row per group and re-ranks the winners. The two-level
//! tie handling (average per column, dense for the composite) is deliberate
//! and must not be unified.

use super::{Cell, RankOutcome, RankSpec, ScoreTable, SortOrder};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::warn;

pub const RANK_SUFFIX: &str = "__RANK";
pub const COMPOSITE_SCORE: &str = "Composite_Score";
pub const COMPOSITE_RANK: &str = "Composite_Rank";

/// Ranks `table` according to `spec`, grouping the second-level selection by
/// the `group_key` column.
///
/// Returns `None` (not an error) when the table is empty or the schema does
/// not contain every ranked column and the group key: downstream aggregation
/// callers tolerate "no results yet".
///
/// Missing cells are filled with 0 before coercion; values that fail numeric
/// coercion afterwards take the mean of the column's coercible values. Ranked
/// columns are rounded to four decimals in the output.
pub fn rank_composite(
    table: &ScoreTable,
    spec: &RankSpec,
    group_key: &str,
) -> Option<RankOutcome> {
    if table.is_empty() || spec.is_empty() {
        warn!("Ranking requested on an empty table or empty rank spec; nothing to do.");
        return None;
    }
    for (column, _) in spec.columns() {
        if table.column_index(column).is_none() {
            warn!(column, "Ranked column missing from table schema; skipping ranking.");
            return None;
        }
    }
    if table.column_index(group_key).is_none() {
        warn!(group_key, "Group key missing from table schema; skipping ranking.");
        return None;
    }

    let mut work = fill_missing_with_zero(table);

    let mut rank_columns = Vec::with_capacity(spec.columns().len());
    for (column, order) in spec.columns() {
        let values = coerce_with_mean_fill(&work, column);
        for (row, value) in values.iter().enumerate() {
            work.set_cell(row, column, Cell::Num(round4(*value)));
        }
        let ranks = average_ranks(&values, *order);
        let rank_column = format!("{column}{RANK_SUFFIX}");
        work.add_column(&rank_column, ranks.iter().map(|r| Cell::Num(*r)).collect());
        rank_columns.push(rank_column);
    }

    let scores: Vec<f64> = (0..work.num_rows())
        .map(|row| {
            rank_columns
                .iter()
                .filter_map(|c| work.cell(row, c).and_then(Cell::as_num))
                .sum()
        })
        .collect();
    work.add_column(COMPOSITE_SCORE, scores.iter().map(|s| Cell::Num(*s)).collect());

    let dense = dense_ranks(&scores);
    work.add_column(
        COMPOSITE_RANK,
        dense.iter().map(|r| Cell::Num(*r as f64)).collect(),
    );

    work.sort_by_num_column(COMPOSITE_SCORE);

    let top_per_group = select_top_per_group(&work, group_key);

    Some(RankOutcome {
        all_ranked: work,
        top_per_group,
    })
}

fn fill_missing_with_zero(table: &ScoreTable) -> ScoreTable {
    let mut filled = ScoreTable::new(table.columns().iter().map(String::as_str));
    for row in table.rows() {
        let cells = row
            .iter()
            .map(|cell| match cell {
                Cell::Missing => Cell::Num(0.0),
                other => other.clone(),
            })
            .collect();
        filled.push_row(cells);
    }
    filled
}

/// Coerces a column to numeric; non-coercible values take the mean of the
/// coercible ones (or 0 when nothing in the column is coercible).
fn coerce_with_mean_fill(table: &ScoreTable, column: &str) -> Vec<f64> {
    let coerced: Vec<Option<f64>> = (0..table.num_rows())
        .map(|row| table.cell(row, column).and_then(Cell::as_num))
        .collect();
    let numeric: Vec<f64> = coerced.iter().filter_map(|v| *v).collect();
    let mean = if numeric.is_empty() {
        0.0
    } else {
        numeric.iter().sum::<f64>() / numeric.len() as f64
    };
    coerced.into_iter().map(|v| v.unwrap_or(mean)).collect()
}

/// Average-method ranking (the per-column tie behavior): tied values share
/// the mean of the ordinal positions they occupy. Rank 1 is the most favored
/// value under the column's sort order.
fn average_ranks(values: &[f64], order: SortOrder) -> Vec<f64> {
    let n = values.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        let ord = values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[indices[end + 1]] == values[indices[start]] {
            end += 1;
        }
        // Ordinal positions are 1-based; ties share their mean.
        let shared = (start + 1 + end + 1) as f64 / 2.0;
        for &idx in &indices[start..=end] {
            ranks[idx] = shared;
        }
        start = end + 1;
    }
    ranks
}

/// Dense ranking ascending: ties share a rank and the sequence has no gaps.
fn dense_ranks(values: &[f64]) -> Vec<u64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted.dedup();
    values
        .iter()
        .map(|v| sorted.partition_point(|x| x < v) as u64 + 1)
        .collect()
}

/// Picks the minimum-`Composite_Rank` row per group and re-ranks the winners
/// densely. `work` is already sorted by score with a stable sort, so the
/// first row seen per group is its winner.
fn select_top_per_group(work: &ScoreTable, group_key: &str) -> ScoreTable {
    let mut winners: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
    for row_idx in 0..work.num_rows() {
        let key = work
            .cell(row_idx, group_key)
            .map(Cell::render)
            .unwrap_or_default();
        winners
            .entry(key)
            .or_insert_with(|| work.rows()[row_idx].clone());
    }

    let mut top = ScoreTable::new(work.columns().iter().map(String::as_str));
    for row in winners.into_values() {
        top.push_row(row);
    }
    top.sort_by_num_column(COMPOSITE_RANK);

    let old_ranks: Vec<f64> = (0..top.num_rows())
        .map(|row| {
            top.cell(row, COMPOSITE_RANK)
                .and_then(Cell::as_num)
                .unwrap_or(f64::MAX)
        })
        .collect();
    for (row, rank) in dense_ranks(&old_ranks).into_iter().enumerate() {
        top.set_cell(row, COMPOSITE_RANK, Cell::Num(rank as f64));
    }
    top
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(f64, f64, &str)]) -> ScoreTable {
        let mut t = ScoreTable::new(["A", "B", "lig_uid"]);
        for (a, b, lig) in rows {
            t.push_row(vec![
                Cell::Num(*a),
                Cell::Num(*b),
                Cell::Text(lig.to_string()),
            ]);
        }
        t
    }

    fn spec_aa() -> RankSpec {
        RankSpec::new()
            .with("A", SortOrder::Ascending)
            .with("B", SortOrder::Ascending)
    }

    #[test]
    fn best_row_receives_composite_rank_one() {
        let t = table(&[(1.0, 1.0, "l1"), (2.0, 2.0, "l2"), (1.0, 2.0, "l3")]);
        let outcome = rank_composite(&t, &spec_aa(), "lig_uid").unwrap();
        let all = &outcome.all_ranked;

        // Sorted by Composite_Score ascending, so the (1,1) row leads.
        assert_eq!(all.cell(0, "A"), Some(&Cell::Num(1.0)));
        assert_eq!(all.cell(0, "B"), Some(&Cell::Num(1.0)));
        assert_eq!(all.cell(0, COMPOSITE_RANK), Some(&Cell::Num(1.0)));
        // A ties (1.0, 1.0) share the average rank 1.5.
        assert_eq!(all.cell(0, "A__RANK"), Some(&Cell::Num(1.5)));
    }

    #[test]
    fn equal_scores_share_a_dense_rank_without_gaps() {
        // Two symmetric rows tie on Composite_Score; the third is worse.
        let t = table(&[(1.0, 2.0, "l1"), (2.0, 1.0, "l2"), (3.0, 3.0, "l3")]);
        let outcome = rank_composite(&t, &spec_aa(), "lig_uid").unwrap();
        let all = &outcome.all_ranked;

        assert_eq!(all.cell(0, COMPOSITE_RANK), Some(&Cell::Num(1.0)));
        assert_eq!(all.cell(1, COMPOSITE_RANK), Some(&Cell::Num(1.0)));
        assert_eq!(all.cell(2, COMPOSITE_RANK), Some(&Cell::Num(2.0)));
    }

    #[test]
    fn descending_order_favors_larger_values() {
        let mut t = ScoreTable::new(["contacts", "lig_uid"]);
        t.push_row(vec![Cell::Num(3.0), Cell::Text("l1".into())]);
        t.push_row(vec![Cell::Num(9.0), Cell::Text("l2".into())]);
        let spec = RankSpec::new().with("contacts", SortOrder::Descending);
        let outcome = rank_composite(&t, &spec, "lig_uid").unwrap();
        assert_eq!(
            outcome.all_ranked.cell(0, "contacts"),
            Some(&Cell::Num(9.0))
        );
        assert_eq!(
            outcome.all_ranked.cell(0, COMPOSITE_RANK),
            Some(&Cell::Num(1.0))
        );
    }

    #[test]
    fn top_per_group_takes_first_minimum_and_reranks() {
        // g1 holds ranks 1 and 2, g2 holds rank 3; winners re-rank to 1, 2.
        let t = table(&[(1.0, 1.0, "g1"), (2.0, 2.0, "g1"), (3.0, 3.0, "g2")]);
        let outcome = rank_composite(&t, &spec_aa(), "lig_uid").unwrap();
        let top = &outcome.top_per_group;

        assert_eq!(top.num_rows(), 2);
        assert_eq!(top.cell(0, "lig_uid"), Some(&Cell::Text("g1".into())));
        assert_eq!(top.cell(0, COMPOSITE_RANK), Some(&Cell::Num(1.0)));
        assert_eq!(top.cell(1, "lig_uid"), Some(&Cell::Text("g2".into())));
        assert_eq!(top.cell(1, COMPOSITE_RANK), Some(&Cell::Num(2.0)));
    }

    #[test]
    fn missing_cells_fill_with_zero_and_garbage_with_column_mean() {
        let mut t = ScoreTable::new(["A", "lig_uid"]);
        t.push_row(vec![Cell::Num(2.0), Cell::Text("l1".into())]);
        t.push_row(vec![Cell::Missing, Cell::Text("l2".into())]);
        t.push_row(vec![Cell::Text("n/a".into()), Cell::Text("l3".into())]);
        let spec = RankSpec::new().with("A", SortOrder::Ascending);
        let outcome = rank_composite(&t, &spec, "lig_uid").unwrap();
        let all = &outcome.all_ranked;

        // Missing -> 0 happens before coercion, so the mean over {2, 0} = 1
        // fills the non-coercible "n/a" cell.
        let values: Vec<f64> = (0..3)
            .map(|r| all.cell(r, "A").and_then(Cell::as_num).unwrap())
            .collect();
        assert!(values.contains(&0.0));
        assert!(values.contains(&1.0));
        assert!(values.contains(&2.0));
    }

    #[test]
    fn empty_or_mismatched_input_yields_none() {
        let empty = ScoreTable::new(["A", "lig_uid"]);
        assert!(rank_composite(&empty, &spec_aa(), "lig_uid").is_none());

        let t = table(&[(1.0, 1.0, "l1")]);
        let bad_spec = RankSpec::new().with("nope", SortOrder::Ascending);
        assert!(rank_composite(&t, &bad_spec, "lig_uid").is_none());
        assert!(rank_composite(&t, &spec_aa(), "nope").is_none());
    }
}
