//! Raw level geometry: brushes of triangles and quads read from a binary file.
//!
//! Layout, all little-endian:
//!
//! ```text
//! i32 total polygon count
//! i32 brush count
//! per brush:   i32 polygon count
//!   per polygon: i32 vertex count
//!     per vertex: f32 x, f32 y, f32 z
//! ```
//!
//! Normals are not stored; they are derived from the first three vertices
//! of every polygon.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use log::{debug, info};
use nalgebra::Point3;

use crate::error::{BspError, Result};
use crate::{Plane3D, PlaneSide, Polygon};

/// Cap on capacity reserved from header counts, which are untrusted until the
/// data behind them has been read.
const PREALLOC_LIMIT: usize = 1024;

/// A group of polygons authored together (a wall piece, a floor tile...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Brush {
    polygons: Vec<Polygon>,
}

impl Brush {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }
}

/// Owns the unpartitioned polygon soup of a level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryStore {
    brushes: Vec<Brush>,
}

impl GeometryStore {
    pub fn new(brushes: Vec<Brush>) -> Self {
        let mut store = Self { brushes };
        store.normalize_normals();
        store
    }

    /// Wraps a loose polygon list as a single brush.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self::new(vec![Brush::new(polygons)])
    }

    /// Reads a geometry file, dividing every coordinate by `scale`.
    pub fn load<P: AsRef<Path>>(path: P, scale: f32) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading geometry file {path:?}");
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file), scale)
    }

    /// Parses the binary geometry layout from any reader.
    pub fn read_from<R: Read>(reader: &mut R, scale: f32) -> Result<Self> {
        if !(scale.is_finite() && scale != 0.0) {
            return Err(BspError::MalformedGeometry(format!("invalid scale {scale}")));
        }

        let total = read_count(reader, "polygon count")?;
        let brush_count = read_count(reader, "brush count")?;
        info!("Total number of polygons: {total}, brushes: {brush_count}");

        let mut brushes = Vec::with_capacity(brush_count.min(PREALLOC_LIMIT));
        let mut read_polygons = 0;

        for b in 0..brush_count {
            let poly_count = read_count(reader, "brush polygon count")?;
            debug!("   brush {b}: {poly_count} polys");
            let mut polygons = Vec::with_capacity(poly_count.min(PREALLOC_LIMIT));

            for p in 0..poly_count {
                let vertex_count = read_count(reader, "vertex count")?;
                if !(3..=4).contains(&vertex_count) {
                    return Err(BspError::MalformedGeometry(format!(
                        "brush {b} polygon {p} has {vertex_count} vertices, expected 3 or 4"
                    )));
                }

                let mut vertices = Vec::with_capacity(vertex_count);
                for _ in 0..vertex_count {
                    let x = read_f32(reader)? / scale;
                    let y = read_f32(reader)? / scale;
                    let z = read_f32(reader)? / scale;
                    vertices.push(Point3::new(x, y, z));
                }

                let normal = (vertices[1] - vertices[0]).cross(&(vertices[2] - vertices[0]));
                if !(normal.norm() > f32::EPSILON) {
                    return Err(BspError::MalformedGeometry(format!(
                        "brush {b} polygon {p} is degenerate"
                    )));
                }
                let plane = Plane3D::from_three_points(vertices[0], vertices[1], vertices[2]);
                if vertices.iter().any(|v| plane.classify_point(v) != PlaneSide::OnPlane) {
                    return Err(BspError::MalformedGeometry(format!(
                        "brush {b} polygon {p} is not planar"
                    )));
                }
                polygons.push(Polygon::new(vertices));
            }

            read_polygons += poly_count;
            brushes.push(Brush::new(polygons));
        }

        if read_polygons != total {
            return Err(BspError::MalformedGeometry(format!(
                "header announces {total} polygons but brushes hold {read_polygons}"
            )));
        }

        Ok(Self::new(brushes))
    }

    /// Writes the store in the same layout [`GeometryStore::read_from`] parses.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_count(writer, self.polygon_count())?;
        write_count(writer, self.brushes.len())?;
        for brush in &self.brushes {
            write_count(writer, brush.polygons.len())?;
            for polygon in &brush.polygons {
                write_count(writer, polygon.len())?;
                for v in polygon.vertices() {
                    writer.write_all(&v.x.to_le_bytes())?;
                    writer.write_all(&v.y.to_le_bytes())?;
                    writer.write_all(&v.z.to_le_bytes())?;
                }
            }
        }
        Ok(())
    }

    /// Writes the store to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    #[inline]
    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }

    /// Total number of polygons across brushes.
    pub fn polygon_count(&self) -> usize {
        self.brushes.iter().map(|b| b.polygons.len()).sum()
    }

    /// Iterates over every raw polygon, brush by brush.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.brushes.iter().flat_map(|b| b.polygons.iter())
    }

    /// Consumes the store, yielding the polygon soup for tree construction.
    pub fn into_polygons(self) -> Vec<Polygon> {
        self.brushes.into_iter().flat_map(|b| b.polygons).collect()
    }

    /// Resets every vertex normal to its polygon's unit face normal.
    pub fn normalize_normals(&mut self) {
        self.brushes
            .iter_mut()
            .flat_map(|b| b.polygons.iter_mut())
            .for_each(Polygon::normalize_normals);
    }
}

fn read_exact_or_malformed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            BspError::MalformedGeometry("unexpected end of file".to_string())
        }
        _ => BspError::Io(e),
    })
}

fn read_count<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let mut buf = [0u8; 4];
    read_exact_or_malformed(reader, &mut buf)?;
    let value = i32::from_le_bytes(buf);
    usize::try_from(value)
        .map_err(|_| BspError::MalformedGeometry(format!("negative {what}: {value}")))
}

fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    read_exact_or_malformed(reader, &mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn write_count<W: Write>(writer: &mut W, count: usize) -> Result<()> {
    let value = i32::try_from(count).map_err(|_| {
        BspError::MalformedGeometry(format!("count {count} does not fit the file format"))
    })?;
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_triangle(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Polygon {
        Polygon::new(vec![
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        ])
    }

    fn sample_store() -> GeometryStore {
        GeometryStore::new(vec![
            Brush::new(vec![make_triangle(
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
            )]),
            Brush::new(vec![
                Polygon::quad(
                    Point3::new(0.0, 0.0, 2.0),
                    Point3::new(2.0, 0.0, 2.0),
                    Point3::new(2.0, 2.0, 2.0),
                    Point3::new(0.0, 2.0, 2.0),
                ),
                make_triangle([0.0, 0.0, 4.0], [1.0, 0.0, 4.0], [0.0, 1.0, 4.0]),
            ]),
        ])
    }

    fn encode(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn write_then_read_preserves_brushes() {
        let store = sample_store();
        let mut bytes = Vec::new();
        store.write_to(&mut bytes).unwrap();

        let loaded = GeometryStore::read_from(&mut Cursor::new(bytes), 1.0).unwrap();
        assert_eq!(loaded.brushes().len(), 2);
        assert_eq!(loaded.polygon_count(), 3);
        assert_eq!(loaded, store);
    }

    #[test]
    fn scale_divides_coordinates() {
        let store = sample_store();
        let mut bytes = Vec::new();
        store.write_to(&mut bytes).unwrap();

        let loaded = GeometryStore::read_from(&mut Cursor::new(bytes), 2.0).unwrap();
        let quad = &loaded.brushes()[1].polygons()[0];
        assert_eq!(quad.vertices()[2], Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn normals_are_unit_length() {
        let store = sample_store();
        for polygon in store.polygons() {
            for n in polygon.normals() {
                assert!((n.norm() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn count_mismatch_is_malformed() {
        let mut bytes = encode(&[2, 1, 1, 3]);
        for f in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&f.to_le_bytes());
        }
        let err = GeometryStore::read_from(&mut Cursor::new(bytes), 1.0).unwrap_err();
        assert!(matches!(err, BspError::MalformedGeometry(_)));
    }

    #[test]
    fn truncated_file_is_malformed() {
        let bytes = encode(&[1, 1, 1, 3]);
        let err = GeometryStore::read_from(&mut Cursor::new(bytes), 1.0).unwrap_err();
        assert!(matches!(err, BspError::MalformedGeometry(_)));
    }

    #[test]
    fn unsupported_vertex_count_is_malformed() {
        let bytes = encode(&[1, 1, 1, 5]);
        let err = GeometryStore::read_from(&mut Cursor::new(bytes), 1.0).unwrap_err();
        assert!(matches!(err, BspError::MalformedGeometry(_)));
    }

    #[test]
    fn degenerate_polygon_is_malformed() {
        let mut bytes = encode(&[1, 1, 1, 3]);
        for f in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0] {
            bytes.extend_from_slice(&f.to_le_bytes());
        }
        let err = GeometryStore::read_from(&mut Cursor::new(bytes), 1.0).unwrap_err();
        assert!(matches!(err, BspError::MalformedGeometry(_)));
    }

    #[test]
    fn huge_announced_counts_fail_on_missing_data() {
        for header in [[0, 1, i32::MAX], [0, i32::MAX, 1]] {
            let err = GeometryStore::read_from(&mut Cursor::new(encode(&header)), 1.0).unwrap_err();
            assert!(matches!(err, BspError::MalformedGeometry(_)));
        }
    }

    #[test]
    fn bent_quad_is_malformed() {
        let mut bytes = encode(&[1, 1, 1, 4]);
        let corners = [
            [0.0f32, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.5],
        ];
        for f in corners.iter().flatten() {
            bytes.extend_from_slice(&f.to_le_bytes());
        }
        let err = GeometryStore::read_from(&mut Cursor::new(bytes), 1.0).unwrap_err();
        assert!(matches!(err, BspError::MalformedGeometry(msg) if msg.contains("not planar")));
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.geo");
        let store = sample_store();
        store.save(&path).unwrap();
        assert_eq!(GeometryStore::load(&path, 1.0).unwrap(), store);
    }
}
