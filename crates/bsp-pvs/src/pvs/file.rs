//! PVS cache file and sample point dumps.
//!
//! The PVS file is plain text: the leaf count on the first line, then one
//! line per leaf
//!
//! ```text
//! <leaf id> * <neighbour count> <neighbour id> <neighbour id> ...
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;

use super::PairMatrix;
use crate::bsp::RegionId;
use crate::error::{BspError, Result};
use crate::PartitionTree;

fn malformed(message: impl Into<String>) -> BspError {
    BspError::MalformedPvs(message.into())
}

fn parse_number(token: Option<&str>, what: &str, line: usize) -> Result<usize> {
    let token = token.ok_or_else(|| malformed(format!("line {line}: missing {what}")))?;
    token
        .parse()
        .map_err(|_| malformed(format!("line {line}: invalid {what} {token:?}")))
}

impl PartitionTree {
    /// Writes every leaf's PVS in the cache file format.
    pub fn write_pvs<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", self.leaf_count())?;
        for leaf in self.leaf_regions() {
            write!(writer, "{} * {}", leaf.id(), leaf.pvs().len())?;
            for id in leaf.pvs() {
                write!(writer, " {id}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn write_pvs_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_pvs(&mut writer)?;
        writer.flush()?;
        info!("Wrote PVS for {} leaves to {path:?}", self.leaf_count());
        Ok(())
    }

    /// Replaces every leaf's PVS with the one stored in `reader`.
    ///
    /// The file must list each leaf of this tree exactly once and reference
    /// only leaves, each at most once per line and symmetrically. Earlier
    /// visibility results are discarded. On error the tree is left untouched.
    pub fn read_pvs<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut lines = reader.lines();

        let header = lines.next().ok_or_else(|| malformed("empty file"))??;
        let count = parse_number(header.split_whitespace().next(), "leaf count", 1)?;
        if count != self.leaf_count() {
            return Err(malformed(format!(
                "file describes {count} leaves, tree has {}",
                self.leaf_count()
            )));
        }

        let is_leaf = |id: RegionId| id < self.regions.len() && self.regions[id].is_leaf();
        let mut lists: Vec<Option<Vec<RegionId>>> = vec![None; self.regions.len()];

        for n in 0..count {
            let line_no = n + 2;
            let line = lines
                .next()
                .ok_or_else(|| malformed(format!("expected {count} leaf lines, found {n}")))??;
            let mut tokens = line.split_whitespace();

            let id = parse_number(tokens.next(), "leaf id", line_no)?;
            if !is_leaf(id) {
                return Err(malformed(format!("line {line_no}: {id} is not a leaf")));
            }
            if tokens.next() != Some("*") {
                return Err(malformed(format!("line {line_no}: missing '*' separator")));
            }
            let size = parse_number(tokens.next(), "neighbour count", line_no)?;

            let neighbours = tokens
                .map(|t| parse_number(Some(t), "neighbour id", line_no))
                .collect::<Result<Vec<RegionId>>>()?;
            if neighbours.len() != size {
                return Err(malformed(format!(
                    "line {line_no}: announced {size} neighbours, found {}",
                    neighbours.len()
                )));
            }
            if let Some(bad) = neighbours.iter().find(|&&other| !is_leaf(other) || other == id) {
                return Err(malformed(format!("line {line_no}: invalid neighbour {bad}")));
            }
            let mut seen = HashSet::with_capacity(neighbours.len());
            if let Some(dup) = neighbours.iter().find(|&&other| !seen.insert(other)) {
                return Err(malformed(format!("line {line_no}: neighbour {dup} listed twice")));
            }
            if lists[id].replace(neighbours).is_some() {
                return Err(malformed(format!("line {line_no}: leaf {id} listed twice")));
            }
        }

        let pairs: HashSet<(RegionId, RegionId)> = lists
            .iter()
            .enumerate()
            .flat_map(|(id, list)| list.iter().flatten().map(move |&other| (id, other)))
            .collect();
        if let Some(&(a, b)) = pairs.iter().find(|&&(a, b)| !pairs.contains(&(b, a))) {
            return Err(malformed(format!("leaf {a} sees {b} but not the other way round")));
        }

        for (region, list) in self.regions.iter_mut().zip(lists) {
            region.pvs = list.unwrap_or_default();
        }
        self.visible = PairMatrix::new(self.regions.len());
        self.checked = PairMatrix::new(self.regions.len());
        for &(a, b) in &pairs {
            self.visible.set(a, b);
            self.checked.set(a, b);
        }
        Ok(())
    }

    pub fn read_pvs_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path)?;
        self.read_pvs(BufReader::new(file))
    }

    /// Writes each leaf's connected leaves and sample points, for debugging.
    pub fn dump_sample_points<W: Write>(&self, writer: &mut W) -> Result<()> {
        for leaf in self.leaf_regions() {
            write!(writer, "Node: {} (connected to: ", leaf.id())?;
            for id in leaf.connected_leaves() {
                write!(writer, "{id} ")?;
            }
            writeln!(writer, ")")?;
            for p in leaf.sample_points() {
                writeln!(writer, "   ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z)?;
            }
        }
        Ok(())
    }
}
