use serde::{Deserialize, Serialize};

use super::Dropper;
use crate::table::Table;
use crate::types::Result;

/// Drop rows with any missing odds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoOddsDropper {}

impl Dropper for NoOddsDropper {
    fn drop_rows(&self, table: &Table) -> Result<Table> {
        table.odds()?.drop_missing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::record;
    use crate::table::MatchRecord;
    use crate::table::fixtures::day;

    #[test]
    fn test_drops_unscanned_rows() {
        let t = Table::from_records(&[record("m1", 0, 1, 0), MatchRecord::new("m2", day(1))]);
        let kept = NoOddsDropper::default().drop_rows(&t).unwrap();
        assert_eq!(kept.index()[0].match_id, "m1");
        assert_eq!(kept.len(), 1);
    }
}
