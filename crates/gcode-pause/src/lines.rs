//! Line store: the G-code file as an ordered sequence of lines.

use std::io::{BufRead, Write};
use std::ops::{Deref, RangeInclusive};

use crate::error::Result;

/// Line terminator used by a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The terminator text.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Detect from the first terminated line, defaulting to LF.
    pub fn detect<S: AsRef<str>>(lines: &[S]) -> Self {
        lines
            .iter()
            .map(AsRef::as_ref)
            .find(|line| line.ends_with('\n'))
            .map(|line| {
                if line.ends_with("\r\n") {
                    LineEnding::CrLf
                } else {
                    LineEnding::Lf
                }
            })
            .unwrap_or_default()
    }
}

/// Strip a trailing `\n` / `\r\n` (and any stray `\r`).
pub fn content(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Generation counter of a [`LineStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(u64);

impl Revision {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Lines of a G-code file, each including its terminator.
///
/// Every change bumps the [`Revision`], so offsets computed against an
/// older revision can be recognised as stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStore {
    lines: Vec<String>,
    revision: Revision,
}

impl LineStore {
    /// Create a store from lines that already carry their terminators.
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            revision: Revision::default(),
        }
    }

    /// Read every line from `reader`, keeping terminators.
    pub fn read_from<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            lines.push(line);
        }
        Ok(Self::new(lines))
    }

    /// Write every line verbatim.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for line in &self.lines {
            writer.write_all(line.as_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Current revision.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Insert `new_lines` so the first of them lands at `offset`.
    ///
    /// Panics if `offset > len()`.
    pub fn insert(&mut self, offset: usize, new_lines: Vec<String>) {
        self.lines.splice(offset..offset, new_lines);
        self.revision = self.revision.next();
    }

    /// Remove the inclusive `range`, returning the removed lines.
    ///
    /// Panics if the range is out of bounds.
    pub fn remove(&mut self, range: RangeInclusive<usize>) -> Vec<String> {
        let removed = self.lines.drain(range).collect();
        self.revision = self.revision.next();
        removed
    }

    /// Replace the line at `offset`, returning the old one.
    ///
    /// Panics if `offset >= len()`.
    pub fn replace(&mut self, offset: usize, line: String) -> String {
        let old = std::mem::replace(&mut self.lines[offset], line);
        self.revision = self.revision.next();
        old
    }
}

impl Deref for LineStore {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_keeps_terminators() {
        let input = "G28\r\n;0.2\nG1 X1";
        let store = LineStore::read_from(input.as_bytes()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store[0], "G28\r\n");
        assert_eq!(store[1], ";0.2\n");
        assert_eq!(store[2], "G1 X1");

        let mut out = Vec::new();
        store.write_to(&mut out).unwrap();
        assert_eq!(out, input.as_bytes());
    }

    #[test]
    fn test_splice_bumps_revision() {
        let mut store = LineStore::new(vec!["a\n".into(), "d\n".into()]);
        let r0 = store.revision();

        store.insert(1, vec!["b\n".into(), "c\n".into()]);
        assert_eq!(&store[..], &["a\n", "b\n", "c\n", "d\n"]);
        let r1 = store.revision();
        assert!(r1 > r0);

        let removed = store.remove(1..=2);
        assert_eq!(removed, vec!["b\n", "c\n"]);
        assert_eq!(&store[..], &["a\n", "d\n"]);
        assert!(store.revision() > r1);

        let r2 = store.revision();
        assert_eq!(store.replace(1, "e".into()), "d\n");
        assert_eq!(&store[..], &["a\n", "e"]);
        assert!(store.revision() > r2);
    }

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(LineEnding::detect(&["G28\r\n", "G1\n"]), LineEnding::CrLf);
        assert_eq!(LineEnding::detect(&["G28\n"]), LineEnding::Lf);
        assert_eq!(LineEnding::detect::<&str>(&[]), LineEnding::Lf);
        assert_eq!(LineEnding::detect(&["G28"]), LineEnding::Lf);
    }

    #[test]
    fn test_content_strips_terminator() {
        assert_eq!(content(";4.2\r\n"), ";4.2");
        assert_eq!(content(";4.2\n"), ";4.2");
        assert_eq!(content(";4.2"), ";4.2");
    }
}
