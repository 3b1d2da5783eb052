//! OpenDX scalar grids, readable by PyMOL, VMD and Chimera.

use std::fmt;
use std::path::Path;

use ligvis_cnn::GridGeometry;

use crate::error::{Result, VisError};

/// One scalar per voxel (z fastest) as an OpenDX field.
struct DxField<'a> {
    geometry: &'a GridGeometry,
    values: &'a [f32],
    comment: &'a str,
}

impl fmt::Display for DxField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.geometry.points;
        let h = self.geometry.resolution;
        let o = self.geometry.origin;

        writeln!(f, "# {}", self.comment)?;
        writeln!(f, "object 1 class gridpositions counts {} {} {}", n, n, n)?;
        writeln!(f, "origin {:.5} {:.5} {:.5}", o.x, o.y, o.z)?;
        writeln!(f, "delta {:.5} 0 0", h)?;
        writeln!(f, "delta 0 {:.5} 0", h)?;
        writeln!(f, "delta 0 0 {:.5}", h)?;
        writeln!(f, "object 2 class gridconnections counts {} {} {}", n, n, n)?;
        writeln!(f, "object 3 class array type double rank 0 items {} data follows", self.values.len())?;
        for row in self.values.chunks(3) {
            for (i, v) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{:.6e}", v)?;
            }
            f.write_str("\n")?;
        }
        f.write_str("attribute \"dependency\" string \"positions\"\n")?;
        f.write_str("object \"ligvis relevance\" class field\n")?;
        f.write_str("component \"positions\" value 1\n")?;
        f.write_str("component \"connections\" value 2\n")?;
        f.write_str("component \"data\" value 3\n")
    }
}

pub fn format_dx(geometry: &GridGeometry, values: &[f32], comment: &str) -> String {
    DxField { geometry, values, comment }.to_string()
}

pub fn write_dx(path: &Path, geometry: &GridGeometry, values: &[f32], comment: &str) -> Result<()> {
    std::fs::write(path, format_dx(geometry, values, comment)).map_err(|e| VisError::io(path, e))
}
