pub mod header;

pub use header::HunkHeader;

use std::ops::Range;

/// A single-file unified diff, split into lines and indexed for staging.
///
/// The text is immutable once parsed. Staging anything means fetching and
/// parsing a fresh diff rather than patching this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDiff {
    lines: Vec<String>,
    hunk_starts: Vec<usize>,
    stageable_lines: Vec<usize>,
}

impl ParsedDiff {
    pub(crate) fn new(lines: Vec<String>, hunk_starts: Vec<usize>, stageable_lines: Vec<usize>) -> Self {
        debug_assert!(hunk_starts.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(stageable_lines.windows(2).all(|w| w[0] < w[1]));
        Self {
            lines,
            hunk_starts,
            stageable_lines,
        }
    }

    /// Every line of the diff, without line terminators
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line indices of every `@@` hunk header, strictly increasing
    pub fn hunk_starts(&self) -> &[usize] {
        &self.hunk_starts
    }

    /// Line indices of every `+`/`-` line inside a hunk, strictly increasing
    pub fn stageable_lines(&self) -> &[usize] {
        &self.stageable_lines
    }

    /// Lines preceding the first hunk (`diff --git`, `index`, `---`, `+++`)
    pub fn file_header(&self) -> &[String] {
        let end = self.hunk_starts.first().copied().unwrap_or(self.lines.len());
        &self.lines[..end]
    }

    /// Index into [`hunk_starts`](Self::hunk_starts) of the hunk containing `line`.
    ///
    /// A line belongs to the hunk with the greatest start `<= line`. Returns
    /// `None` for lines in the file header or past the end of the diff.
    pub fn hunk_index_of(&self, line: usize) -> Option<usize> {
        if line >= self.lines.len() {
            return None;
        }
        hunk_index_of(&self.hunk_starts, line)
    }

    /// Line range of a hunk: its header through the line before the next hunk.
    pub fn hunk_range(&self, hunk: usize) -> Option<Range<usize>> {
        let start = *self.hunk_starts.get(hunk)?;
        let end = self
            .hunk_starts
            .get(hunk + 1)
            .copied()
            .unwrap_or(self.lines.len());
        Some(start..end)
    }
}

/// Position of the greatest element `<= current` in a sorted list.
pub fn hunk_index_of(hunk_starts: &[usize], current: usize) -> Option<usize> {
    hunk_starts
        .partition_point(|&start| start <= current)
        .checked_sub(1)
}

/// Position of the first element greater than `current`, wrapping to 0.
pub fn next_index(numbers: &[usize], current: usize) -> usize {
    numbers
        .iter()
        .position(|&number| number > current)
        .unwrap_or(0)
}

/// Position of the last element less than `current`, wrapping to the end.
pub fn prev_index(numbers: &[usize], current: usize) -> usize {
    numbers
        .iter()
        .rposition(|&number| number < current)
        .unwrap_or(numbers.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn sample() -> ParsedDiff {
        let lines = [
            "diff --git a/f b/f",
            "--- a/f",
            "+++ b/f",
            "@@ -1,2 +1,3 @@",
            " a",
            "+b",
            " c",
            "@@ -9 +10,0 @@",
            "-z",
        ];
        ParsedDiff::new(
            lines.iter().map(|l| l.to_string()).collect(),
            vec![3, 7],
            vec![5, 8],
        )
    }

    #[test]
    fn next_index_wraps_to_start() {
        assert_eq!(next_index(&[4, 10], 4), 1);
        assert_eq!(next_index(&[4, 10], 10), 0);
        assert_eq!(next_index(&[4, 10], 0), 0);
    }

    #[test]
    fn prev_index_wraps_to_end() {
        assert_eq!(prev_index(&[4, 10], 10), 0);
        assert_eq!(prev_index(&[4, 10], 4), 1);
        assert_eq!(prev_index(&[4, 10], 99), 1);
    }

    #[test]
    fn prev_index_of_empty_list() {
        assert_eq!(prev_index(&[], 3), 0);
    }

    #[test]
    fn hunk_membership_uses_greatest_start() {
        let diff = sample();
        assert_eq!(diff.hunk_index_of(0), None);
        assert_eq!(diff.hunk_index_of(2), None);
        assert_eq!(diff.hunk_index_of(3), Some(0));
        assert_eq!(diff.hunk_index_of(6), Some(0));
        assert_eq!(diff.hunk_index_of(7), Some(1));
        assert_eq!(diff.hunk_index_of(8), Some(1));
        assert_eq!(diff.hunk_index_of(9), None);
    }

    #[test]
    fn hunk_ranges_cover_the_body() {
        let diff = sample();
        assert_eq!(diff.hunk_range(0), Some(3..7));
        assert_eq!(diff.hunk_range(1), Some(7..9));
        assert_eq!(diff.hunk_range(2), None);
    }

    #[test]
    fn file_header_stops_at_first_hunk() {
        let diff = sample();
        assert_eq!(diff.file_header().len(), 3);
        assert_eq!(diff.file_header()[2], "+++ b/f");
    }
}
