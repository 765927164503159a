//! Persisted mesh form: raw index and vertex arrays, their binary and OBJ encodings, and the
//! preparation passes run before building a [`TriangleMesh`].

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::path::Path;

use thiserror::Error;
use tripath_core::{PlaneProjection, Vec2, Vec3};

use crate::mesh::{MeshError, RouteCost, TriangleMesh};

/// Default merge distance for [`TriangleMeshData::merge_vertices`].
pub const MERGE_GAP: f32 = 0.05;
/// Default edge length below which a triangle is considered degenerate.
pub const DEGENERATE_EPSILON: f32 = 0.001;

#[derive(Debug, Error)]
pub enum MeshDataError {
    #[error("truncated mesh data: {what} needs {needed} bytes, {available} left")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("invalid {what} count {count}")]
    InvalidCount { what: &'static str, count: i32 },

    #[error("obj line {line}: {message}")]
    Obj { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Summary of a [`TriangleMeshData::merge_vertices`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub vertices_before: usize,
    pub vertices_after: usize,
    pub triangles_before: usize,
    pub triangles_after: usize,
    pub welded: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMeshData {
    pub indices: Option<Vec<i32>>,
    pub vertices: Option<Vec<Vec3>>,
}

impl TriangleMeshData {
    pub fn new(indices: Vec<i32>, vertices: Vec<Vec3>) -> Self {
        Self {
            indices: Some(indices),
            vertices: Some(vertices),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.as_ref().map_or(0, |i| i.len() / 3)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.as_ref().map_or(0, Vec::len)
    }

    /// Little-endian: `i32` index count (`-1` when absent), the indices, `i32` vertex count
    /// (`-1` when absent), then `f32` x/y/z per vertex.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.triangle_count() * 12 + self.vertex_count() * 12);
        match &self.indices {
            Some(indices) => {
                out.extend_from_slice(&(indices.len() as i32).to_le_bytes());
                for i in indices {
                    out.extend_from_slice(&i.to_le_bytes());
                }
            }
            None => out.extend_from_slice(&(-1i32).to_le_bytes()),
        }
        match &self.vertices {
            Some(vertices) => {
                out.extend_from_slice(&(vertices.len() as i32).to_le_bytes());
                for v in vertices {
                    for c in [v.x, v.y, v.z] {
                        out.extend_from_slice(&c.to_le_bytes());
                    }
                }
            }
            None => out.extend_from_slice(&(-1i32).to_le_bytes()),
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MeshDataError> {
        let mut cursor = ByteCursor { bytes, pos: 0 };

        let indices = match cursor.count("index")? {
            None => None,
            Some(n) => {
                cursor.ensure("indices", n, 4)?;
                Some((0..n).map(|_| cursor.i32("index")).collect::<Result<Vec<_>, _>>()?)
            }
        };

        let vertices = match cursor.count("vertex")? {
            None => None,
            Some(n) => {
                cursor.ensure("vertices", n, 12)?;
                let mut vertices = Vec::with_capacity(n);
                for _ in 0..n {
                    let x = cursor.f32("vertex")?;
                    let y = cursor.f32("vertex")?;
                    let z = cursor.f32("vertex")?;
                    vertices.push(Vec3::new(x, y, z));
                }
                Some(vertices)
            }
        };

        Ok(Self { indices, vertices })
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, MeshDataError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), MeshDataError> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Load from `path`; `.obj` files are parsed as text, anything else as binary.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MeshDataError> {
        let path = path.as_ref();
        if is_obj(path) {
            Self::from_obj(&std::fs::read_to_string(path)?)
        } else {
            Self::read_from(io::BufReader::new(std::fs::File::open(path)?))
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MeshDataError> {
        let path = path.as_ref();
        if is_obj(path) {
            std::fs::write(path, self.to_obj())?;
            Ok(())
        } else {
            self.write_to(io::BufWriter::new(std::fs::File::create(path)?))
        }
    }

    /// Wavefront OBJ text with `v` and 1-based `f` records.
    pub fn to_obj(&self) -> String {
        let mut out = String::new();
        for v in self.vertices.iter().flatten() {
            let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
        }
        for face in self.indices.iter().flat_map(|i| i.chunks_exact(3)) {
            let _ = writeln!(out, "f {} {} {}", face[0] + 1, face[1] + 1, face[2] + 1);
        }
        out
    }

    /// Parse `v` and `f` records; other records are ignored. Polygons are fanned into triangles.
    pub fn from_obj(text: &str) -> Result<Self, MeshDataError> {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for (n, line) in text.lines().enumerate() {
            let line_no = n + 1;
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("v") => {
                    let coords = fields
                        .take(3)
                        .map(str::parse::<f32>)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| obj_error(line_no, e))?;
                    let &[x, y, z] = coords.as_slice() else {
                        return Err(obj_error(line_no, "vertex needs 3 coordinates"));
                    };
                    vertices.push(Vec3::new(x, y, z));
                }
                Some("f") => {
                    let corners = fields
                        .map(|f| obj_index(f, vertices.len()).ok_or(f))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|f| obj_error(line_no, format!("bad face index `{f}`")))?;
                    if corners.len() < 3 {
                        return Err(obj_error(line_no, "face needs at least 3 vertices"));
                    }
                    for k in 1..corners.len() - 1 {
                        indices.extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
                    }
                }
                _ => {}
            }
        }

        Ok(Self::new(indices, vertices))
    }

    /// Collapse vertices closer than `gap` onto the first one kept, drop triangles with an edge
    /// shorter than `degenerate_epsilon` or that collapsed, then weld identical positions.
    pub fn merge_vertices(&mut self, gap: f32, degenerate_epsilon: f32) -> MergeReport {
        let (Some(indices), Some(vertices)) = (self.indices.as_mut(), self.vertices.as_mut()) else {
            return MergeReport::default();
        };
        let mut report = MergeReport {
            vertices_before: vertices.len(),
            triangles_before: indices.len() / 3,
            ..MergeReport::default()
        };

        let cell = gap.max(f32::MIN_POSITIVE);
        let gap_sq = gap * gap;
        let eps_sq = degenerate_epsilon * degenerate_epsilon;
        let mut grid: BTreeMap<(i64, i64, i64), Vec<u32>> = BTreeMap::new();
        let mut kept: Vec<Vec3> = Vec::with_capacity(vertices.len());
        let mut remap = Vec::with_capacity(vertices.len());

        for &v in vertices.iter() {
            let key = grid_key(v, cell);
            let mut found: Option<u32> = None;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(bucket) = grid.get(&(key.0 + dx, key.1 + dy, key.2 + dz)) else {
                            continue;
                        };
                        for &k in bucket {
                            if kept[k as usize].distance_squared(v) <= gap_sq
                                && found.is_none_or(|f| k < f)
                            {
                                found = Some(k);
                            }
                        }
                    }
                }
            }
            let index = found.unwrap_or_else(|| {
                kept.push(v);
                let k = (kept.len() - 1) as u32;
                grid.entry(key).or_default().push(k);
                k
            });
            remap.push(index as i32);
        }

        let mut merged = Vec::with_capacity(indices.len());
        for face in indices.chunks_exact(3) {
            let face = [face[0], face[1], face[2]];
            let raw = face.map(|i| usize::try_from(i).ok().and_then(|i| vertices.get(i).copied()));
            let [Some(v0), Some(v1), Some(v2)] = raw else {
                tracing::warn!(face = ?face, "dropping triangle with out-of-range index");
                continue;
            };
            if v0.distance_squared(v1) <= eps_sq
                || v1.distance_squared(v2) <= eps_sq
                || v2.distance_squared(v0) <= eps_sq
            {
                continue;
            }
            let mapped = face.map(|i| remap[i as usize]);
            if mapped[0] == mapped[1] || mapped[1] == mapped[2] || mapped[2] == mapped[0] {
                continue;
            }
            merged.extend_from_slice(&mapped);
        }

        *indices = merged;
        *vertices = kept;
        report.welded = self.weld_same_vertices();
        report.vertices_after = self.vertex_count();
        report.triangles_after = self.triangle_count();

        tracing::info!(
            vertices_before = report.vertices_before,
            vertices_after = report.vertices_after,
            triangles_before = report.triangles_before,
            triangles_after = report.triangles_after,
            "merged mesh vertices"
        );
        report
    }

    /// Point every index at the first index referencing the same position. Returns how many
    /// indices were rewritten.
    pub fn weld_same_vertices(&mut self) -> usize {
        let (Some(indices), Some(vertices)) = (self.indices.as_mut(), self.vertices.as_ref()) else {
            return 0;
        };
        let mut first: BTreeMap<(u32, u32, u32), i32> = BTreeMap::new();
        let mut welded = 0;
        for index in indices.iter_mut() {
            let Some(v) = usize::try_from(*index).ok().and_then(|i| vertices.get(i)) else {
                continue;
            };
            let key = (v.x.to_bits(), v.y.to_bits(), v.z.to_bits());
            let canonical = *first.entry(key).or_insert(*index);
            if canonical != *index {
                *index = canonical;
                welded += 1;
            }
        }
        if welded > 0 {
            tracing::debug!(welded, "welded identical vertices");
        }
        welded
    }

    /// Shift every vertex by `-origin` on the x/z plane, then scale it.
    pub fn scale_vertices(&mut self, origin: Vec2, scale: f32) {
        for v in self.vertices.iter_mut().flatten() {
            *v = Vec3::new(v.x - origin.x, v.y, v.z - origin.y) * scale;
        }
    }

    /// Build the searchable mesh from this data.
    pub fn to_mesh(
        &self,
        projection: PlaneProjection,
        cost_mode: RouteCost,
    ) -> Result<TriangleMesh, MeshError> {
        let indices = self.indices.as_ref().ok_or(MeshError::Missing("indices"))?;
        let vertices = self.vertices.as_ref().ok_or(MeshError::Missing("vertices"))?;
        let indices = indices
            .iter()
            .enumerate()
            .map(|(position, &i)| {
                u32::try_from(i).map_err(|_| MeshError::IndexOutOfRange {
                    position,
                    index: i64::from(i),
                    vertices: vertices.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        TriangleMesh::new(&indices, vertices, projection, cost_mode)
    }
}

fn is_obj(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
}

fn grid_key(v: Vec3, cell: f32) -> (i64, i64, i64) {
    (
        (v.x / cell).floor() as i64,
        (v.y / cell).floor() as i64,
        (v.z / cell).floor() as i64,
    )
}

/// Resolve an OBJ face corner (`7`, `7/1`, `7//3`, or relative `-1`) to a 0-based index into
/// the vertices read so far.
fn obj_index(field: &str, vertex_count: usize) -> Option<i32> {
    let raw: i64 = field.split('/').next()?.parse().ok()?;
    let index = match raw {
        0 => return None,
        r if r > 0 => r - 1,
        r => vertex_count as i64 + r,
    };
    if index < 0 || index >= vertex_count as i64 {
        return None;
    }
    i32::try_from(index).ok()
}

fn obj_error(line: usize, message: impl ToString) -> MeshDataError {
    MeshDataError::Obj {
        line,
        message: message.to_string(),
    }
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl ByteCursor<'_> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take4(&mut self, what: &'static str) -> Result<[u8; 4], MeshDataError> {
        let chunk = self
            .bytes
            .get(self.pos..self.pos + 4)
            .and_then(|s| <[u8; 4]>::try_from(s).ok())
            .ok_or(MeshDataError::Truncated {
                what,
                needed: 4,
                available: self.remaining(),
            })?;
        self.pos += 4;
        Ok(chunk)
    }

    fn i32(&mut self, what: &'static str) -> Result<i32, MeshDataError> {
        self.take4(what).map(i32::from_le_bytes)
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, MeshDataError> {
        self.take4(what).map(f32::from_le_bytes)
    }

    /// Section length; `None` for the `-1` absent marker.
    fn count(&mut self, what: &'static str) -> Result<Option<usize>, MeshDataError> {
        match self.i32(what)? {
            -1 => Ok(None),
            n if n < -1 => Err(MeshDataError::InvalidCount { what, count: n }),
            n => Ok(Some(n as usize)),
        }
    }

    fn ensure(&self, what: &'static str, items: usize, size: usize) -> Result<(), MeshDataError> {
        let needed = items.saturating_mul(size);
        if needed > self.remaining() {
            return Err(MeshDataError::Truncated {
                what,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obj_index_accepts_slash_suffixes_and_relative_indices() {
        assert_eq!(obj_index("3", 5), Some(2));
        assert_eq!(obj_index("3/1", 5), Some(2));
        assert_eq!(obj_index("3//7", 5), Some(2));
        assert_eq!(obj_index("-1", 5), Some(4));
        assert_eq!(obj_index("0", 5), None);
        assert_eq!(obj_index("-9", 5), None);
        assert_eq!(obj_index("x", 5), None);
    }

    #[test]
    fn negative_count_below_marker_is_rejected() {
        let bytes = (-2i32).to_le_bytes();
        assert!(matches!(
            TriangleMeshData::from_bytes(&bytes),
            Err(MeshDataError::InvalidCount { count: -2, .. })
        ));
    }

    #[test]
    fn scale_moves_origin_then_scales() {
        let mut data = TriangleMeshData::new(Vec::new(), vec![Vec3::new(3.0, 1.0, 5.0)]);
        data.scale_vertices(Vec2::new(1.0, 2.0), 2.0);
        assert_eq!(data.vertices, Some(vec![Vec3::new(4.0, 2.0, 6.0)]));
    }
}
