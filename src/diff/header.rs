use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32 as decimal},
    combinator::opt,
    sequence::preceded,
};
use std::fmt;

/// The `@@ -old_start,old_count +new_start,new_count @@ section` line
/// that introduces a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Everything after the closing `@@`, usually ` fn name()` or empty
    pub section: String,
}

impl HunkHeader {
    /// Parse a hunk header line.
    ///
    /// Omitted counts default to 1, matching `git diff` which writes
    /// `@@ -15 +14,0 @@` for a single deleted line.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (section, ((old_start, old_count), (new_start, new_count))) = header(line).ok()?;

        Some(HunkHeader {
            old_start,
            old_count: old_count.unwrap_or(1),
            new_start,
            new_count: new_count.unwrap_or(1),
            section: section.to_string(),
        })
    }
}

type Range = (u32, Option<u32>);

fn header(input: &str) -> IResult<&str, (Range, Range)> {
    let (rest, (_, old, _, new, _)) =
        (tag("@@ -"), range, tag(" +"), range, tag(" @@")).parse(input)?;
    Ok((rest, (old, new)))
}

/// `136,0` or `137`
fn range(input: &str) -> IResult<&str, Range> {
    (decimal, opt(preceded(char(','), decimal))).parse(input)
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old_part = match self.old_count {
            0 => format!("-{},0", self.old_start),
            1 => format!("-{}", self.old_start),
            n => format!("-{},{}", self.old_start, n),
        };

        let new_part = match self.new_count {
            0 => format!("+{},0", self.new_start),
            1 => format!("+{}", self.new_start),
            n => format!("+{},{}", self.new_start, n),
        };

        write!(f, "@@ {} {} @@{}", old_part, new_part, self.section)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn parse_full_header() {
        let header = HunkHeader::parse("@@ -14,8 +14,11 @@ import (").unwrap();
        assert_eq!(
            header,
            HunkHeader {
                old_start: 14,
                old_count: 8,
                new_start: 14,
                new_count: 11,
                section: " import (".to_string(),
            }
        );
    }

    #[test]
    fn parse_omitted_counts() {
        let header = HunkHeader::parse("@@ -15 +14,0 @@").unwrap();
        assert_eq!(header.old_start, 15);
        assert_eq!(header.old_count, 1);
        assert_eq!(header.new_start, 14);
        assert_eq!(header.new_count, 0);
        assert_eq!(header.section, "");
    }

    #[test]
    fn parse_insertion_at_file_start() {
        let header = HunkHeader::parse("@@ -0,0 +1,2 @@").unwrap();
        assert_eq!(header.old_start, 0);
        assert_eq!(header.old_count, 0);
        assert_eq!(header.new_start, 1);
        assert_eq!(header.new_count, 2);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(HunkHeader::parse("@@ nonsense @@").is_none());
        assert!(HunkHeader::parse("@@ -1,2 @@").is_none());
        assert!(HunkHeader::parse("+++ b/file").is_none());
        assert!(HunkHeader::parse("@@ -a,1 +1 @@").is_none());
    }

    #[test]
    fn render_collapses_single_counts() {
        let header = HunkHeader {
            old_start: 10,
            old_count: 1,
            new_start: 10,
            new_count: 0,
            section: String::new(),
        };
        assert_eq!(header.to_string(), "@@ -10 +10,0 @@");
    }

    #[test]
    fn render_keeps_section_text() {
        let line = "@@ -3,7 +3,9 @@ fn main() {";
        assert_eq!(HunkHeader::parse(line).unwrap().to_string(), line);
    }
}
