//! Plain-text electrode positions.
//!
//! ```text
//! 3 5.0
//! -71.2 -23.1 -12.8 T7
//! 71.5 -22.0 -11.9 T8
//! 0.0 88.3 -3.1 Fpz
//! ```
//!
//! The header holds the point count and the electrode radius in mm.

use anyhow::{Context, Result};
use coreg_core::io::{PointsReader, PointsWriter};
use coreg_core::{CoreError, Point3, PointSet};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, warn};

/// Contents of an `.xyz` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyzFile {
    pub points: PointSet,
    pub names: Vec<String>,
    pub radius: f64,
}

fn parse(text: &str) -> Result<XyzFile> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next().context("Empty xyz file")?;
    let mut fields = header.split_whitespace();
    let count: usize = fields
        .next()
        .context("Missing point count")?
        .parse()
        .with_context(|| format!("Invalid point count in header '{header}'"))?;
    let radius: f64 = match fields.next() {
        Some(field) => field
            .parse()
            .with_context(|| format!("Invalid radius in header '{header}'"))?,
        None => 0.0,
    };

    let mut points = PointSet::new();
    let mut names = Vec::with_capacity(count);
    for (i, line) in lines.enumerate() {
        let mut fields = line.split_whitespace();
        let mut coords = [0.0; 3];
        for c in coords.iter_mut() {
            *c = fields
                .next()
                .with_context(|| format!("Line {}: expected 3 coordinates", i + 2))?
                .parse()
                .with_context(|| format!("Line {}: invalid coordinate", i + 2))?;
        }
        let name = fields.collect::<Vec<_>>().join(" ");
        names.push(if name.is_empty() { (i + 1).to_string() } else { name });
        points.push(Point3::new(coords));
    }
    if points.len() != count {
        warn!(declared = count, found = points.len(), "xyz point count differs from header");
    }
    Ok(XyzFile { points, names, radius })
}

/// Read an `.xyz` file. Unnamed points are named by their 1-based position.
pub fn read_xyz<P: AsRef<Path>>(path: P) -> Result<XyzFile> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file = parse(&text).with_context(|| format!("Malformed xyz file {}", path.display()))?;
    debug!(points = file.points.len(), path = %path.display(), "read xyz points");
    Ok(file)
}

/// Write an `.xyz` file. There must be one name per point.
pub fn write_xyz<P: AsRef<Path>>(path: P, file: &XyzFile) -> Result<()> {
    let path = path.as_ref();
    if file.names.len() != file.points.len() {
        anyhow::bail!("{} names for {} points", file.names.len(), file.points.len());
    }
    let mut text = String::new();
    writeln!(text, "{} {}", file.points.len(), file.radius)?;
    for (p, name) in file.points.iter().zip(&file.names) {
        writeln!(text, "{} {} {} {}", p[0], p[1], p[2], name)?;
    }
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// `.xyz` reader and writer for the core I/O traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct XyzFormat {
    /// Electrode radius written to the header.
    pub radius: f64,
}

impl XyzFormat {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl PointsReader for XyzFormat {
    fn read_points(&self, path: &Path) -> coreg_core::Result<(PointSet, Vec<String>)> {
        let file = read_xyz(path).map_err(|e| CoreError::io(format!("{e:#}")))?;
        Ok((file.points, file.names))
    }
}

impl PointsWriter for XyzFormat {
    fn write_points(&self, points: &PointSet, names: &[String], path: &Path) -> coreg_core::Result<()> {
        let file = XyzFile {
            points: points.clone(),
            names: names.to_vec(),
            radius: self.radius,
        };
        write_xyz(path, &file).map_err(|e| CoreError::io(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_with_spaces() {
        let file = parse("2 4.5\n1 2 3 left ear\n\n-1.5 0 2e1\n").unwrap();
        assert_eq!(file.radius, 4.5);
        assert_eq!(file.names, vec!["left ear".to_string(), "2".to_string()]);
        assert_eq!(file.points.get(1).unwrap().to_array(), [-1.5, 0.0, 20.0]);
    }

    #[test]
    fn test_header_without_radius() {
        let file = parse("1\n0 0 1 Cz").unwrap();
        assert_eq!(file.radius, 0.0);
        assert_eq!(file.points.len(), 1);
    }

    #[test]
    fn test_malformed_lines() {
        assert!(parse("").is_err());
        assert!(parse("two 1.0\n").is_err());
        assert!(parse("1 1.0\n1 2\n").is_err());
        assert!(parse("1 1.0\n1 x 3 Fz\n").is_err());
    }

    #[test]
    fn test_count_mismatch_is_tolerated() {
        let file = parse("3 1.0\n1 2 3 A\n").unwrap();
        assert_eq!(file.points.len(), 1);
    }
}
