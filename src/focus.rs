//! Scroll and cursor placement for the diff view.
//!
//! The view scrolls so the bottom of the selected hunk sits on the last
//! visible row. The first hunk is treated as starting at line 0 so the file
//! header stays in view with it. A hunk taller than the view is not forced
//! to fit; instead three lines below the selection are kept visible.

use crate::diff::{hunk_index_of, next_index};

/// Lines of trailing context kept below the selection in an oversized hunk
const TRAILING_CONTEXT: usize = 3;

/// The scrolling surface a staging session draws into.
pub trait Viewport {
    /// `(width, height)` in columns and rows
    fn size(&self) -> (usize, usize);
    fn line_count(&self) -> usize;
    fn set_origin(&mut self, col: usize, row: usize);
    fn set_cursor(&mut self, col: usize, row: usize);
}

/// Where to scroll the view and where to put the cursor inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    /// First visible document line
    pub origin: usize,
    /// Cursor row relative to `origin`
    pub cursor: usize,
}

impl Focus {
    /// Push this focus into a viewport.
    pub fn apply(self, viewport: &mut impl Viewport) {
        viewport.set_origin(0, self.origin);
        viewport.set_cursor(0, self.cursor);
    }
}

/// Compute the focus for `line_number` given the diff's hunk starts.
pub fn compute_focus(
    line_number: usize,
    hunk_starts: &[usize],
    view_height: usize,
    total_lines: usize,
) -> Focus {
    let next = next_index(hunk_starts, line_number);
    let mut bottom_line = match hunk_starts.get(next) {
        Some(&start) if next != 0 => start - 1,
        // Selection is in the final hunk
        _ => total_lines.saturating_sub(1),
    };

    let hunk_start = match hunk_index_of(hunk_starts, line_number) {
        Some(hunk) if hunk > 0 => hunk_starts[hunk],
        _ => 0,
    };

    if bottom_line.saturating_sub(hunk_start) > view_height {
        bottom_line = line_number + TRAILING_CONTEXT;
    }

    // The min only bites when view_height is under TRAILING_CONTEXT + 1
    let origin = (bottom_line + 1)
        .saturating_sub(view_height)
        .min(line_number);

    Focus {
        origin,
        cursor: line_number - origin,
    }
}

/// A fixed-height window over rendered diff lines.
#[derive(Debug, Clone)]
pub struct TextViewport {
    lines: Vec<String>,
    width: usize,
    height: usize,
    origin: usize,
    cursor: usize,
}

impl TextViewport {
    pub fn new(text: &str, width: usize, height: usize) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            width,
            height,
            origin: 0,
            cursor: 0,
        }
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The visible rows, with `>` marking the cursor row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (row, line) in self
            .lines
            .iter()
            .skip(self.origin)
            .take(self.height)
            .enumerate()
        {
            out.push_str(if row == self.cursor { "> " } else { "  " });
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl Viewport for TextViewport {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn set_origin(&mut self, _col: usize, row: usize) {
        self.origin = row;
    }

    fn set_cursor(&mut self, _col: usize, row: usize) {
        self.cursor = row;
    }
}
