use crate::logs::Timestamped;

/// Rebase every row's timestamp onto the experiment's init point.
///
/// Rows before the init point get negative elapsed values; they are kept.
pub fn normalize<T: Timestamped>(mut rows: Vec<T>, init_ts: f64) -> Vec<T> {
    for row in rows.iter_mut() {
        let elapsed = row.timestamp() - init_ts;
        row.set_timestamp(elapsed);
    }
    rows
}

/// Number of rows whose timestamp is earlier than the row before it.
pub fn count_regressions<T: Timestamped>(rows: &[T]) -> usize {
    rows.windows(2)
        .filter(|pair| pair[1].timestamp() < pair[0].timestamp())
        .count()
}

/// Open interval of elapsed time, given in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub from_secs: f64,
    pub to_secs: f64,
}

impl TimeWindow {
    pub fn new(from_secs: f64, to_secs: f64) -> Self {
        Self { from_secs, to_secs }
    }

    /// Strict on both ends.
    pub fn contains(&self, elapsed_ms: f64) -> bool {
        elapsed_ms > self.from_secs * 1000.0 && elapsed_ms < self.to_secs * 1000.0
    }

    pub fn retain<T: Timestamped>(&self, rows: &mut Vec<T>) {
        rows.retain(|r| self.contains(r.timestamp()));
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(0.0, 9999.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{FailureRow, ThroughputRow};
    use pretty_assertions::assert_eq;

    fn tp(timestamp: f64, throughput: i64) -> ThroughputRow {
        ThroughputRow {
            timestamp,
            throughput,
        }
    }

    #[test]
    fn subtracts_init_point() {
        let rows = vec![tp(36_000_000.0, 100), tp(36_001_000.0, 150)];
        assert_eq!(
            normalize(rows, 36_000_000.0),
            vec![tp(0.0, 100), tp(1000.0, 150)]
        );
    }

    #[test]
    fn reapplying_with_zero_is_identity() {
        let rows = vec![tp(5.0, 1), tp(2.5, 2), tp(-4.0, 3)];
        let once = normalize(rows, 1.5);
        assert_eq!(normalize(once.clone(), 0.0), once);
    }

    #[test]
    fn regressions_are_counted_not_fixed() {
        let rows = vec![
            FailureRow { timestamp: 1.0 },
            FailureRow { timestamp: 3.0 },
            FailureRow { timestamp: 2.0 },
            FailureRow { timestamp: 2.0 },
        ];
        assert_eq!(count_regressions(&rows), 1);
        assert_eq!(normalize(rows.clone(), 0.0), rows);
    }

    #[test]
    fn window_is_open_interval() {
        let w = TimeWindow::new(1.0, 3.0);
        assert!(!w.contains(1000.0));
        assert!(w.contains(1000.5));
        assert!(w.contains(2999.0));
        assert!(!w.contains(3000.0));

        let mut rows = vec![tp(0.0, 1), tp(1500.0, 2), tp(4000.0, 3)];
        w.retain(&mut rows);
        assert_eq!(rows, vec![tp(1500.0, 2)]);
    }
}
