//! TSPLIB `.tsp` reader.
//!
//! Supports the symmetric edge weight types (`EXPLICIT` in every matrix
//! layout, `EUC_2D`, `EUC_3D`, `CEIL_2D`, `MAN_2D`, `MAN_3D`, `MAX_2D`,
//! `MAX_3D`, `GEO` and `ATT`) with the distance functions from the TSPLIB
//! documentation. The resulting problem has precision 0: every distance is
//! already integral.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::problem::{DistanceMatrix, Problem};

/// Earth radius used by the TSPLIB `GEO` distance.
const RRR: f64 = 6378.388;
/// Value of pi fixed by the TSPLIB `GEO` definition.
const TSPLIB_PI: f64 = 3.141592;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWeightType {
    Explicit,
    Euc2d,
    Euc3d,
    Ceil2d,
    Man2d,
    Man3d,
    Max2d,
    Max3d,
    Geo,
    Att,
}

impl EdgeWeightType {
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        match keyword {
            "EXPLICIT" => Ok(EdgeWeightType::Explicit),
            "EUC_2D" => Ok(EdgeWeightType::Euc2d),
            "EUC_3D" => Ok(EdgeWeightType::Euc3d),
            "CEIL_2D" => Ok(EdgeWeightType::Ceil2d),
            "MAN_2D" => Ok(EdgeWeightType::Man2d),
            "MAN_3D" => Ok(EdgeWeightType::Man3d),
            "MAX_2D" => Ok(EdgeWeightType::Max2d),
            "MAX_3D" => Ok(EdgeWeightType::Max3d),
            "GEO" => Ok(EdgeWeightType::Geo),
            "ATT" => Ok(EdgeWeightType::Att),
            other => Err(Error::UnsupportedEdgeWeightType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeWeightType::Explicit => "EXPLICIT",
            EdgeWeightType::Euc2d => "EUC_2D",
            EdgeWeightType::Euc3d => "EUC_3D",
            EdgeWeightType::Ceil2d => "CEIL_2D",
            EdgeWeightType::Man2d => "MAN_2D",
            EdgeWeightType::Man3d => "MAN_3D",
            EdgeWeightType::Max2d => "MAX_2D",
            EdgeWeightType::Max3d => "MAX_3D",
            EdgeWeightType::Geo => "GEO",
            EdgeWeightType::Att => "ATT",
        }
    }

    /// Coordinates per node, or `None` for explicit weights.
    fn coordinate_count(&self) -> Option<usize> {
        match self {
            EdgeWeightType::Explicit => None,
            EdgeWeightType::Euc3d | EdgeWeightType::Man3d | EdgeWeightType::Max3d => Some(3),
            _ => Some(2),
        }
    }

    fn distance(&self, p: &[f64; 3], q: &[f64; 3]) -> f64 {
        let dx = p[0] - q[0];
        let dy = p[1] - q[1];
        let dz = p[2] - q[2];

        match self {
            EdgeWeightType::Euc2d => nint((dx * dx + dy * dy).sqrt()),
            EdgeWeightType::Euc3d => nint((dx * dx + dy * dy + dz * dz).sqrt()),
            EdgeWeightType::Ceil2d => (dx * dx + dy * dy).sqrt().ceil(),
            EdgeWeightType::Man2d => nint(dx.abs() + dy.abs()),
            EdgeWeightType::Man3d => nint(dx.abs() + dy.abs() + dz.abs()),
            EdgeWeightType::Max2d => nint(dx.abs()).max(nint(dy.abs())),
            EdgeWeightType::Max3d => nint(dx.abs()).max(nint(dy.abs())).max(nint(dz.abs())),
            EdgeWeightType::Geo => geo_distance(p, q),
            EdgeWeightType::Att => {
                let r = ((dx * dx + dy * dy) / 10.0).sqrt();
                let t = nint(r);
                if t < r {
                    t + 1.0
                } else {
                    t
                }
            }
            EdgeWeightType::Explicit => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWeightFormat {
    FullMatrix,
    UpperRow,
    LowerRow,
    UpperDiagRow,
    LowerDiagRow,
    UpperCol,
    LowerCol,
    UpperDiagCol,
    LowerDiagCol,
}

impl EdgeWeightFormat {
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        match keyword {
            "FULL_MATRIX" => Ok(EdgeWeightFormat::FullMatrix),
            "UPPER_ROW" => Ok(EdgeWeightFormat::UpperRow),
            "LOWER_ROW" => Ok(EdgeWeightFormat::LowerRow),
            "UPPER_DIAG_ROW" => Ok(EdgeWeightFormat::UpperDiagRow),
            "LOWER_DIAG_ROW" => Ok(EdgeWeightFormat::LowerDiagRow),
            "UPPER_COL" => Ok(EdgeWeightFormat::UpperCol),
            "LOWER_COL" => Ok(EdgeWeightFormat::LowerCol),
            "UPPER_DIAG_COL" => Ok(EdgeWeightFormat::UpperDiagCol),
            "LOWER_DIAG_COL" => Ok(EdgeWeightFormat::LowerDiagCol),
            other => Err(Error::UnsupportedEdgeWeightFormat(other.to_string())),
        }
    }

    /// The `(row, column)` cells in the order the file lists them.
    ///
    /// Column-major triangles of a symmetric matrix list the same values as
    /// the opposite row-major triangle, so they share its traversal.
    fn cells(&self, n: usize) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        match self {
            EdgeWeightFormat::FullMatrix => {
                for i in 0..n {
                    for j in 0..n {
                        cells.push((i, j));
                    }
                }
            }
            EdgeWeightFormat::UpperRow | EdgeWeightFormat::LowerCol => {
                for i in 0..n {
                    for j in i + 1..n {
                        cells.push((i, j));
                    }
                }
            }
            EdgeWeightFormat::LowerRow | EdgeWeightFormat::UpperCol => {
                for i in 0..n {
                    for j in 0..i {
                        cells.push((i, j));
                    }
                }
            }
            EdgeWeightFormat::UpperDiagRow | EdgeWeightFormat::LowerDiagCol => {
                for i in 0..n {
                    for j in i..n {
                        cells.push((i, j));
                    }
                }
            }
            EdgeWeightFormat::LowerDiagRow | EdgeWeightFormat::UpperDiagCol => {
                for i in 0..n {
                    for j in 0..=i {
                        cells.push((i, j));
                    }
                }
            }
        }
        cells
    }
}

/// TSPLIB `nint`.
fn nint(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn geo_radians(x: f64) -> f64 {
    let deg = x.trunc();
    let min = x - deg;
    TSPLIB_PI * (deg + 5.0 * min / 3.0) / 180.0
}

fn geo_distance(p: &[f64; 3], q: &[f64; 3]) -> f64 {
    let (lat_p, lon_p) = (geo_radians(p[0]), geo_radians(p[1]));
    let (lat_q, lon_q) = (geo_radians(q[0]), geo_radians(q[1]));

    let q1 = (lon_p - lon_q).cos();
    let q2 = (lat_p - lat_q).cos();
    let q3 = (lat_p + lat_q).cos();
    let cosine = (0.5 * ((1.0 + q1) * q2 - (1.0 - q1) * q3)).clamp(-1.0, 1.0);

    (RRR * cosine.acos() + 1.0).trunc()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Coordinates,
    Weights,
    Skipped,
}

/// Split a specification line into its keyword and value. Accepts
/// `KEY: value`, `KEY : value` and `KEY value`. Returns `None` for data lines.
fn split_keyword(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    let key = &line[..end];
    let rest = line[end..].trim_start();
    let value = rest.strip_prefix(':').unwrap_or(rest).trim();

    Some((key, value))
}

fn parse_number(token: &str, line: usize) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| Error::parse(line, format!("invalid number '{}'", token)))
}

/// Parse a TSPLIB file. Falls back to the file stem when `NAME` is absent.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Problem> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let mut problem = parse_str(&text)?;

    if problem.name.is_empty() {
        problem.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    log::debug!(
        "Loaded {} ({} nodes, {}) from {}",
        problem.name,
        problem.dimension(),
        problem.edge_weight_type,
        path.display()
    );

    Ok(problem)
}

/// Parse the text of a TSPLIB file.
pub fn parse_str(text: &str) -> Result<Problem> {
    let mut name = String::new();
    let mut comment = String::new();
    let mut dimension: Option<usize> = None;
    let mut weight_type: Option<EdgeWeightType> = None;
    let mut weight_format: Option<EdgeWeightFormat> = None;

    let mut coordinates: Vec<[f64; 3]> = Vec::new();
    let mut weights: Vec<f64> = Vec::new();
    let mut section = Section::Header;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if line.is_empty() {
            continue;
        }
        if line == "EOF" {
            break;
        }

        if let Some((key, value)) = split_keyword(line) {
            match key {
                "NAME" => name = value.to_string(),
                "COMMENT" => {
                    if !comment.is_empty() {
                        comment.push(' ');
                    }
                    comment.push_str(value);
                }
                "TYPE" => {
                    if value != "TSP" {
                        log::warn!("Problem type {} read as a symmetric TSP", value);
                    }
                }
                "DIMENSION" => {
                    let n = value.parse::<usize>().map_err(|_| {
                        Error::parse(line_no, format!("invalid DIMENSION '{}'", value))
                    })?;
                    dimension = Some(n);
                }
                "EDGE_WEIGHT_TYPE" => weight_type = Some(EdgeWeightType::from_keyword(value)?),
                "EDGE_WEIGHT_FORMAT" => {
                    if value != "FUNCTION" {
                        weight_format = Some(EdgeWeightFormat::from_keyword(value)?);
                    }
                }
                "NODE_COORD_SECTION" => section = Section::Coordinates,
                "EDGE_WEIGHT_SECTION" => section = Section::Weights,
                k if k.ends_with("_SECTION") => section = Section::Skipped,
                _ => log::debug!("Ignoring keyword {} on line {}", key, line_no),
            }
            continue;
        }

        match section {
            Section::Coordinates => {
                let kind = weight_type.ok_or_else(|| {
                    Error::parse(line_no, "NODE_COORD_SECTION before EDGE_WEIGHT_TYPE")
                })?;
                let count = match kind.coordinate_count() {
                    Some(count) => count,
                    None => continue,
                };

                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() != count + 1 {
                    return Err(Error::parse(
                        line_no,
                        format!(
                            "expected a node id and {} coordinates, found {} fields",
                            count,
                            tokens.len()
                        ),
                    ));
                }

                let mut point = [0.0; 3];
                for (k, token) in tokens[1..].iter().enumerate() {
                    point[k] = parse_number(token, line_no)?;
                }
                coordinates.push(point);
            }
            Section::Weights => {
                for token in line.split_whitespace() {
                    weights.push(parse_number(token, line_no)?);
                }
            }
            Section::Skipped => {}
            Section::Header => {
                return Err(Error::parse(line_no, format!("unexpected data '{}'", line)));
            }
        }
    }

    let dimension = dimension.ok_or(Error::MissingDimension)?;
    let weight_type =
        weight_type.ok_or_else(|| Error::UnsupportedEdgeWeightType("(missing)".to_string()))?;

    let matrix = match weight_type {
        EdgeWeightType::Explicit => {
            let format = weight_format
                .ok_or_else(|| Error::UnsupportedEdgeWeightFormat("(missing)".to_string()))?;
            explicit_matrix(format, dimension, &weights)?
        }
        kind => coordinate_matrix(kind, dimension, &coordinates)?,
    };

    Ok(Problem::new(name, matrix)
        .with_comment(comment)
        .with_edge_weight_type(weight_type.as_str())
        .with_precision(0))
}

fn explicit_matrix(
    format: EdgeWeightFormat,
    dimension: usize,
    weights: &[f64],
) -> Result<DistanceMatrix> {
    let cells = format.cells(dimension);
    if cells.len() != weights.len() {
        return Err(Error::invalid_matrix(format!(
            "expected {} edge weights, found {}",
            cells.len(),
            weights.len()
        )));
    }

    let mut full = vec![0.0; dimension * dimension];
    for (&(i, j), &w) in cells.iter().zip(weights) {
        full[i * dimension + j] = w;
        if format != EdgeWeightFormat::FullMatrix {
            full[j * dimension + i] = w;
        }
    }

    DistanceMatrix::from_fn(dimension, |i, j| full[i * dimension + j])
}

fn coordinate_matrix(
    kind: EdgeWeightType,
    dimension: usize,
    coordinates: &[[f64; 3]],
) -> Result<DistanceMatrix> {
    if coordinates.len() != dimension {
        return Err(Error::invalid_matrix(format!(
            "expected {} node coordinates, found {}",
            dimension,
            coordinates.len()
        )));
    }

    DistanceMatrix::from_fn(dimension, |i, j| {
        kind.distance(&coordinates[i], &coordinates[j])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords_file(weight_type: &str, body: &str, n: usize) -> String {
        format!(
            "NAME : sample\nCOMMENT : test instance\nTYPE : TSP\nDIMENSION : {}\nEDGE_WEIGHT_TYPE : {}\nNODE_COORD_SECTION\n{}EOF\n",
            n, weight_type, body
        )
    }

    fn explicit_file(format: &str, weights: &str) -> String {
        format!(
            "NAME: explicit\nTYPE: TSP\nDIMENSION: 4\nEDGE_WEIGHT_TYPE: EXPLICIT\nEDGE_WEIGHT_FORMAT: {}\nEDGE_WEIGHT_SECTION\n{}\nEOF\n",
            format, weights
        )
    }

    #[test]
    fn test_euc_2d() {
        let text = coords_file("EUC_2D", "1 0 0\n2 3 4\n3 0 1.5\n", 3);
        let problem = parse_str(&text).unwrap();
        assert_eq!(problem.name, "sample");
        assert_eq!(problem.comment, "test instance");
        assert_eq!(problem.dimension(), 3);
        assert_eq!(problem.edge_weight_type, "EUC_2D");
        assert_eq!(problem.precision, 0);
        assert_eq!(problem.distance(0, 1), 5.0);
        // 1.5 rounds up under nint
        assert_eq!(problem.distance(0, 2), 2.0);
        assert_eq!(problem.distance(2, 0), 2.0);
    }

    #[test]
    fn test_ceil_man_max_att() {
        let body = "1 0 0\n2 1 1\n";
        let ceil = parse_str(&coords_file("CEIL_2D", body, 2)).unwrap();
        assert_eq!(ceil.distance(0, 1), 2.0);

        let man = parse_str(&coords_file("MAN_2D", "1 0 0\n2 -3 4\n", 2)).unwrap();
        assert_eq!(man.distance(0, 1), 7.0);

        let max = parse_str(&coords_file("MAX_2D", "1 0 0\n2 -3 4\n", 2)).unwrap();
        assert_eq!(max.distance(0, 1), 4.0);

        // sqrt(1000 / 10) = 10 exactly
        let att = parse_str(&coords_file("ATT", "1 0 0\n2 10 30\n", 2)).unwrap();
        assert_eq!(att.distance(0, 1), 10.0);
    }

    #[test]
    fn test_three_dimensional_types() {
        let body = "1 0 0 0\n2 1 -2 2\n";
        assert_eq!(parse_str(&coords_file("EUC_3D", body, 2)).unwrap().distance(0, 1), 3.0);
        assert_eq!(parse_str(&coords_file("MAN_3D", body, 2)).unwrap().distance(0, 1), 5.0);
        assert_eq!(parse_str(&coords_file("MAX_3D", body, 2)).unwrap().distance(0, 1), 2.0);
    }

    #[test]
    fn test_geo() {
        // one degree of longitude on the equator
        let problem = parse_str(&coords_file("GEO", "1 0.0 0.0\n2 0.0 1.0\n", 2)).unwrap();
        assert_eq!(problem.distance(0, 1), 112.0);
        assert_eq!(problem.distance(1, 0), 112.0);
        assert_eq!(problem.distance(0, 0), 0.0);
    }

    #[test]
    fn test_all_explicit_formats_agree() {
        let expected = Problem::from_matrix(
            "expected",
            vec![
                vec![0.0, 1.0, 2.0, 3.0],
                vec![1.0, 0.0, 4.0, 5.0],
                vec![2.0, 4.0, 0.0, 6.0],
                vec![3.0, 5.0, 6.0, 0.0],
            ],
        )
        .unwrap();

        let cases = [
            ("FULL_MATRIX", "0 1 2 3\n1 0 4 5\n2 4 0 6\n3 5 6 0"),
            ("UPPER_ROW", "1 2 3\n4 5\n6"),
            ("LOWER_ROW", "1\n2 4\n3 5 6"),
            ("UPPER_DIAG_ROW", "0 1 2 3\n0 4 5\n0 6\n0"),
            ("LOWER_DIAG_ROW", "0\n1 0\n2 4 0\n3 5 6 0"),
            ("UPPER_COL", "1\n2 4\n3 5 6"),
            ("LOWER_COL", "1 2 3\n4 5\n6"),
            ("UPPER_DIAG_COL", "0\n1 0\n2 4 0\n3 5 6 0"),
            ("LOWER_DIAG_COL", "0 1 2 3\n0 4 5\n0 6\n0"),
        ];

        for (format, weights) in cases {
            let problem = parse_str(&explicit_file(format, weights))
                .unwrap_or_else(|e| panic!("{}: {}", format, e));
            assert_eq!(problem.distances(), expected.distances(), "{}", format);
            assert_eq!(problem.edge_weight_type, "EXPLICIT");
        }
    }

    #[test]
    fn test_header_variants_and_skipped_sections() {
        let text = "NAME burma\nDIMENSION:2\nEDGE_WEIGHT_TYPE :EUC_2D\nNODE_COORD_SECTION\n1 0 0\n2 0 10\nDISPLAY_DATA_SECTION\n1 5 5\n2 6 6\nEOF\n";
        let problem = parse_str(text).unwrap();
        assert_eq!(problem.name, "burma");
        assert_eq!(problem.distance(0, 1), 10.0);
    }

    #[test]
    fn test_errors() {
        let missing = "NAME: x\nEDGE_WEIGHT_TYPE: EUC_2D\nNODE_COORD_SECTION\n1 0 0\nEOF\n";
        assert!(matches!(parse_str(missing), Err(Error::MissingDimension)));

        let unsupported = coords_file("XRAY1", "1 0 0\n", 1);
        assert!(matches!(
            parse_str(&unsupported),
            Err(Error::UnsupportedEdgeWeightType(t)) if t == "XRAY1"
        ));

        let bad_format = explicit_file("TRIANGLE", "1 2 3");
        assert!(matches!(
            parse_str(&bad_format),
            Err(Error::UnsupportedEdgeWeightFormat(_))
        ));

        let bad_number = coords_file("EUC_2D", "1 0 0\n2 zero 1\n", 2);
        match parse_str(&bad_number) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 8),
            other => panic!("expected parse error, got {:?}", other),
        }

        let short = explicit_file("UPPER_ROW", "1 2 3 4 5");
        assert!(matches!(parse_str(&short), Err(Error::InvalidMatrix(_))));

        let too_few = coords_file("EUC_2D", "1 0 0\n", 2);
        assert!(matches!(parse_str(&too_few), Err(Error::InvalidMatrix(_))));
    }
}
