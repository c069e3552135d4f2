use super::model::NormalizedTable;

// ---------------------------------------------------------------------------
// Filter predicate: inclusive duration range
// ---------------------------------------------------------------------------

/// Inclusive `[lo, hi]` range over `duration_minutes`.
/// An inverted range (`lo > hi`) is valid and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    pub lo: i64,
    pub hi: i64,
}

impl DurationRange {
    pub fn new(lo: i64, hi: i64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, minutes: i64) -> bool {
        self.lo <= minutes && minutes <= self.hi
    }

    pub fn is_inverted(&self) -> bool {
        self.lo > self.hi
    }
}

/// Slider bounds: true min/max of `duration_minutes` over the whole table.
/// `None` for an empty table.
pub fn duration_bounds(table: &NormalizedTable) -> Option<DurationRange> {
    let mut minutes = table.records.iter().map(|r| r.duration_minutes);
    let first = minutes.next()?;
    let (lo, hi) = minutes.fold((first, first), |(lo, hi), m| (lo.min(m), hi.max(m)));
    Some(DurationRange { lo, hi })
}

/// Return indices of records whose duration falls inside `range`.
pub fn filtered_indices(table: &NormalizedTable, range: DurationRange) -> Vec<usize> {
    if range.is_inverted() {
        return Vec::new();
    }
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| range.contains(r.duration_minutes))
        .map(|(i, _)| i)
        .collect()
}
