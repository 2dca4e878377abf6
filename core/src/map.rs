//! Map of known landmarks.
//!
//! The map is supplied from outside the filter and is read-only for its lifetime. Two on-disk layouts are
//! supported:
//! - CSV with an `id,x,y` header ([`Map::from_csv`], [`Map::to_csv`])
//! - whitespace separated `x y id` lines, one landmark per line ([`Map::from_text`]), the layout of the
//!   classic `map_data.txt` files
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::LandmarkId;

/// A single landmark with a fixed position in the map frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapLandmark {
    pub id: LandmarkId,
    pub x: f64,
    pub y: f64,
}
impl MapLandmark {
    pub fn new(id: LandmarkId, x: f64, y: f64) -> MapLandmark {
        MapLandmark { id, x, y }
    }
}

/// Ordered collection of map landmarks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Map {
    landmarks: Vec<MapLandmark>,
}
impl Map {
    pub fn new(landmarks: Vec<MapLandmark>) -> Map {
        Map { landmarks }
    }
    /// Regular grid of `columns` x `rows` landmarks spaced `spacing` meters apart, starting at the origin.
    ///
    /// Identifiers start at 1 and increase row by row.
    pub fn grid(columns: usize, rows: usize, spacing: f64) -> Map {
        let mut landmarks = Vec::with_capacity(columns * rows);
        for row in 0..rows {
            for column in 0..columns {
                let id = (row * columns + column + 1) as LandmarkId;
                landmarks.push(MapLandmark::new(
                    id,
                    column as f64 * spacing,
                    row as f64 * spacing,
                ));
            }
        }
        Map::new(landmarks)
    }
    pub fn landmarks(&self) -> &[MapLandmark] {
        &self.landmarks
    }
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
    /// Look up a landmark by identifier
    pub fn get(&self, id: LandmarkId) -> Option<&MapLandmark> {
        self.landmarks.iter().find(|landmark| landmark.id == id)
    }
    /// Reads a map from a CSV file with an `id,x,y` header.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mcl::map::Map;
    ///
    /// let map = Map::from_csv("./data/map.csv").expect("Failed to read map");
    /// println!("Loaded {} landmarks", map.len());
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Map> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("opening map file {}", path.display()))?;
        let mut landmarks = Vec::new();
        for (row, result) in reader.deserialize().enumerate() {
            let landmark: MapLandmark = result
                .with_context(|| format!("parsing row {} of {}", row + 1, path.display()))?;
            landmarks.push(landmark);
        }
        Map::checked(landmarks).with_context(|| format!("validating {}", path.display()))
    }
    /// Reads a map from a text file of whitespace separated `x y id` lines.
    ///
    /// Blank lines are skipped.
    pub fn from_text<P: AsRef<Path>>(path: P) -> Result<Map> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading map file {}", path.display()))?;
        let mut landmarks = Vec::new();
        for (line_number, line) in contents.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 3 {
                bail!(
                    "{}:{}: expected 3 fields `x y id`, found {}",
                    path.display(),
                    line_number + 1,
                    fields.len()
                );
            }
            let x: f64 = fields[0]
                .parse()
                .with_context(|| format!("{}:{}: bad x", path.display(), line_number + 1))?;
            let y: f64 = fields[1]
                .parse()
                .with_context(|| format!("{}:{}: bad y", path.display(), line_number + 1))?;
            let id: LandmarkId = fields[2]
                .parse()
                .with_context(|| format!("{}:{}: bad id", path.display(), line_number + 1))?;
            landmarks.push(MapLandmark::new(id, x, y));
        }
        Map::checked(landmarks).with_context(|| format!("validating {}", path.display()))
    }
    /// Generic read: `.csv` uses [`Map::from_csv`], anything else [`Map::from_text`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Map> {
        let p = path.as_ref();
        let ext = p
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());
        match ext.as_deref() {
            Some("csv") => Map::from_csv(p),
            _ => Map::from_text(p),
        }
    }
    /// Writes the map as CSV with an `id,x,y` header.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating map file {}", path.display()))?;
        for landmark in &self.landmarks {
            writer.serialize(landmark)?;
        }
        writer.flush()?;
        Ok(())
    }
    fn checked(landmarks: Vec<MapLandmark>) -> Result<Map> {
        for (i, landmark) in landmarks.iter().enumerate() {
            if !landmark.x.is_finite() || !landmark.y.is_finite() {
                bail!("landmark {} has a non-finite position", landmark.id);
            }
            if landmarks[..i].iter().any(|other| other.id == landmark.id) {
                bail!("duplicate landmark id {}", landmark.id);
            }
        }
        Ok(Map::new(landmarks))
    }
}
impl From<Vec<MapLandmark>> for Map {
    fn from(landmarks: Vec<MapLandmark>) -> Self {
        Map::new(landmarks)
    }
}
