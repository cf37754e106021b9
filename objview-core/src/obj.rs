/// Wavefront OBJ parser for triangulated meshes
///
/// Only `v`, `vn` and `f` records are read. Faces must be triangles whose
/// corners carry a normal index (`v/t/n` or `v//n`); texture indices are
/// accepted and discarded.
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

use log::{debug, info};
use nalgebra::Vector3;
use nom::{
    character::complete::{char, space0, space1, u32 as index},
    branch::alt,
    combinator::{all_consuming, opt},
    multi::count,
    number::complete::float,
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::{MeshError, Result};

/// One corner of a face, both indices already 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceCorner {
    pub vertex: usize,
    pub normal: usize,
}

/// A triangle referencing the raw vertex and normal lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceIndex {
    pub corners: [FaceCorner; 3],
}

/// Raw per-attribute arrays in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjData {
    pub vertices: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub faces: Vec<FaceIndex>,
}

/// Record counts gathered by the sizing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RecordCounts {
    vertices: usize,
    normals: usize,
    faces: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    Vertex,
    Normal,
    Face,
    Other,
}

impl Record {
    fn classify(keyword: &str) -> Self {
        match keyword {
            "v" => Record::Vertex,
            "vn" => Record::Normal,
            "f" => Record::Face,
            _ => Record::Other,
        }
    }
}

pub struct ObjParser;

impl ObjParser {
    /// Load an OBJ file from disk.
    ///
    /// The extension is checked before the file is opened; anything other
    /// than `.obj` fails with [`MeshError::UnsupportedFormat`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ObjData> {
        let path = path.as_ref();
        if !has_obj_extension(path) {
            return Err(MeshError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|source| MeshError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let data = Self::parse(BufReader::new(file))?;
        info!(
            "Loaded {}: {} vertices, {} normals, {} faces",
            path.display(),
            data.vertices.len(),
            data.normals.len(),
            data.faces.len()
        );
        Ok(data)
    }

    /// Parse OBJ text from a rewindable reader.
    ///
    /// The first pass only counts records so storage can be sized up front,
    /// the reader is then rewound and the second pass fills it. The same
    /// handle is used for both passes.
    pub fn parse<R: BufRead + Seek>(mut reader: R) -> Result<ObjData> {
        let counts = count_records(&mut reader)?;
        debug!(
            "Sizing pass: {} vertices, {} normals, {} faces",
            counts.vertices, counts.normals, counts.faces
        );

        reader.rewind()?;

        let mut data = ObjData {
            vertices: Vec::with_capacity(counts.vertices),
            normals: Vec::with_capacity(counts.normals),
            faces: Vec::with_capacity(counts.faces),
        };

        let mut line = String::new();
        let mut line_number = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;

            let Some((keyword, rest)) = split_keyword(&line) else {
                continue;
            };
            match Record::classify(keyword) {
                Record::Vertex => {
                    data.vertices
                        .push(parse_triple(keyword, rest, line_number, parse_position)?)
                }
                Record::Normal => {
                    data.normals
                        .push(parse_triple(keyword, rest, line_number, parse_vector3)?)
                }
                Record::Face => data.faces.push(parse_face(rest, line_number)?),
                Record::Other => {}
            }
        }

        debug_assert_eq!(data.vertices.len(), counts.vertices);
        debug_assert_eq!(data.normals.len(), counts.normals);
        debug_assert_eq!(data.faces.len(), counts.faces);

        Ok(data)
    }
}

fn has_obj_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("obj"))
}

fn count_records<R: BufRead>(reader: &mut R) -> Result<RecordCounts> {
    let mut counts = RecordCounts::default();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if let Some((keyword, _)) = split_keyword(&line) {
            match Record::classify(keyword) {
                Record::Vertex => counts.vertices += 1,
                Record::Normal => counts.normals += 1,
                Record::Face => counts.faces += 1,
                Record::Other => {}
            }
        }
    }
    Ok(counts)
}

/// Split a line into its leading token and the remainder
fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(line.split_once(|c: char| c.is_whitespace()).unwrap_or((line, "")))
}

fn parse_triple<F>(keyword: &str, rest: &str, line: usize, parser: F) -> Result<Vector3<f32>>
where
    F: FnMut(&str) -> IResult<&str, Vector3<f32>>,
{
    let v = match all_consuming(terminated(parser, space0))(rest) {
        Ok((_, v)) => v,
        Err(_) => {
            return Err(MeshError::Parse {
                line,
                message: format!("expected `{keyword} x y z`, found `{keyword} {rest}`"),
            })
        }
    };
    if !v.iter().all(|c| c.is_finite()) {
        return Err(MeshError::Parse {
            line,
            message: format!("non-finite component in `{keyword} {rest}`"),
        });
    }
    Ok(v)
}

/// `x y z`, optionally followed by `w` or by an `r g b` color; extras are dropped
fn parse_position(input: &str) -> IResult<&str, Vector3<f32>> {
    let (input, position) = parse_vector3(input)?;
    let (input, _extra) = opt(alt((
        count(preceded(space1, float), 3),
        count(preceded(space1, float), 1),
    )))(input)?;
    Ok((input, position))
}

fn parse_vector3(input: &str) -> IResult<&str, Vector3<f32>> {
    let (input, x) = preceded(space0, float)(input)?;
    let (input, y) = preceded(space1, float)(input)?;
    let (input, z) = preceded(space1, float)(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

fn parse_face(rest: &str, line: usize) -> Result<FaceIndex> {
    let groups: Vec<&str> = rest.split_whitespace().collect();
    if groups.len() != 3 {
        return Err(MeshError::NonTriangularFace {
            line,
            corners: groups.len(),
        });
    }

    let mut corners = [FaceCorner { vertex: 0, normal: 0 }; 3];
    for (corner, group) in corners.iter_mut().zip(groups.iter().copied()) {
        let (vertex, normal) = match all_consuming(parse_corner)(group) {
            Ok((_, pair)) => pair,
            Err(_) => {
                return Err(MeshError::Parse {
                    line,
                    message: format!("expected `v/t/n` face corner, found `{group}`"),
                })
            }
        };
        *corner = FaceCorner {
            vertex: to_zero_based(vertex, line)?,
            normal: to_zero_based(normal, line)?,
        };
    }

    Ok(FaceIndex { corners })
}

/// `v/t/n` or `v//n`; the texture slot is read and dropped
fn parse_corner(input: &str) -> IResult<&str, (u32, u32)> {
    let (input, vertex) = index(input)?;
    let (input, _) = char('/')(input)?;
    let (input, _texture) = opt(index)(input)?;
    let (input, _) = char('/')(input)?;
    let (input, normal) = index(input)?;
    Ok((input, (vertex, normal)))
}

fn to_zero_based(raw: u32, line: usize) -> Result<usize> {
    (raw as usize)
        .checked_sub(1)
        .ok_or_else(|| MeshError::Parse {
            line,
            message: "face indices start at 1".to_string(),
        })
}
