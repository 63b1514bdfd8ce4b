//! Line-oriented record sources.
//!
//! One non-blank line is one record: a single Gremlin mutation such as
//! `g.addV('person').property('name','Stew')`. Lines are produced lazily,
//! in file order, and the source cannot be restarted mid-stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;

/// Built-in sample data: four `person` vertices.
pub const SAMPLE_VERTICES: &str = "\
g.addV('person').property('name','Stew').property('age',23L)
g.addV('person').property('name','Stevie').property('age',28L)
g.addV('person').property('name','Patrick').property('age',18L)
g.addV('person').property('name','Patricia').property('age',41L)
";

pub struct LineSource<R> {
    lines: io::Lines<R>,
}

impl LineSource<BufReader<File>> {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl LineSource<Cursor<&'static str>> {
    pub fn sample() -> Self {
        Self::new(Cursor::new(SAMPLE_VERTICES))
    }
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    let line = line.trim_end_matches('\r');
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some(Ok(line.to_string()));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn blank_lines_are_not_records() {
        let src = LineSource::new(Cursor::new("a\n\n  \nb\r\nc"));
        let lines: Vec<String> = src.map(Result::unwrap).collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn sample_has_four_people() {
        let lines: Vec<String> = LineSource::sample().map(Result::unwrap).collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.starts_with("g.addV('person')")));
    }

    #[test]
    fn open_reads_files_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();
        let lines: Vec<String> = LineSource::open(file.path())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LineSource::open(&dir.path().join("absent.txt")).is_err());
    }
}
