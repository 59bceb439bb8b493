use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

use crate::asset_keys::{validate_asset_key, AssetKeyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("invalid level key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed level XML at {location}: {message}")]
    Malformed {
        message: String,
        location: SourceLocation,
    },
    #[error("{message} at {location}")]
    Invalid {
        message: String,
        location: SourceLocation,
    },
}

/// A level as authored: tile ids per row and walls/spawn in cell indices.
/// Conversion to world pixels happens where the render scale is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDef {
    pub width: u32,
    pub height: u32,
    pub tileset: String,
    pub tiles_per_row: u32,
    pub sky: Option<String>,
    pub spawn: (i32, i32),
    pub tiles: Vec<Vec<i32>>,
    pub walls: Vec<(i32, i32)>,
}

pub fn load_level(assets_dir: &Path, key: &str) -> Result<LevelDef, LevelError> {
    validate_asset_key(key).map_err(|source| LevelError::InvalidKey {
        key: key.to_string(),
        source,
    })?;
    let path = assets_dir.join("levels").join(format!("{key}.xml"));
    let raw = fs::read_to_string(&path).map_err(|source| LevelError::Read {
        path: path.clone(),
        source,
    })?;
    parse_level(&raw)
}

/// Parses a `<Level>` document:
///
/// ```xml
/// <Level width="20" height="12" tileset="tiles" tilesPerRow="8">
///   <Sky image="sky"/>
///   <Spawn x="6" y="4"/>
///   <Tiles><Row>0 0 1 -1</Row></Tiles>
///   <Walls><Wall x="4" y="3"/></Walls>
/// </Level>
/// ```
pub fn parse_level(raw: &str) -> Result<LevelDef, LevelError> {
    let doc = Document::parse(raw).map_err(|error| LevelError::Malformed {
        message: error.to_string(),
        location: SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        },
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Level" {
        return Err(error_at_node(&doc, root, "root element must be <Level>"));
    }

    let width = required_u32(&doc, root, "width")?;
    let height = required_u32(&doc, root, "height")?;
    let tiles_per_row = required_u32(&doc, root, "tilesPerRow")?;
    if width == 0 || height == 0 || tiles_per_row == 0 {
        return Err(error_at_node(
            &doc,
            root,
            "width, height and tilesPerRow must be greater than zero",
        ));
    }
    let tileset = required_key(&doc, root, "tileset")?;

    let mut seen = HashSet::<&str>::new();
    let mut sky = None;
    let mut spawn = None;
    let mut tiles = Vec::new();
    let mut walls = Vec::new();

    for child in root.children().filter(|node| node.is_element()) {
        let name = child.tag_name().name();
        if !seen.insert(name) {
            return Err(error_at_node(
                &doc,
                child,
                &format!("duplicate element <{name}> in <Level>"),
            ));
        }
        match name {
            "Sky" => sky = Some(required_key(&doc, child, "image")?),
            "Spawn" => spawn = Some(cell_attributes(&doc, child)?),
            "Tiles" => tiles = parse_tile_rows(&doc, child)?,
            "Walls" => {
                for wall in child.children().filter(|node| node.is_element()) {
                    if wall.tag_name().name() != "Wall" {
                        return Err(error_at_node(
                            &doc,
                            wall,
                            &format!("unknown element <{}> in <Walls>", wall.tag_name().name()),
                        ));
                    }
                    walls.push(cell_attributes(&doc, wall)?);
                }
            }
            _ => {
                return Err(error_at_node(
                    &doc,
                    child,
                    &format!("unknown element <{name}> in <Level>"),
                ))
            }
        }
    }

    let Some(spawn) = spawn else {
        return Err(error_at_node(&doc, root, "missing required element <Spawn>"));
    };

    Ok(LevelDef {
        width,
        height,
        tileset,
        tiles_per_row,
        sky,
        spawn,
        tiles,
        walls,
    })
}

fn parse_tile_rows(doc: &Document<'_>, node: Node<'_, '_>) -> Result<Vec<Vec<i32>>, LevelError> {
    let mut rows = Vec::new();
    for row in node.children().filter(|child| child.is_element()) {
        if row.tag_name().name() != "Row" {
            return Err(error_at_node(
                doc,
                row,
                &format!("unknown element <{}> in <Tiles>", row.tag_name().name()),
            ));
        }
        let ids = row
            .text()
            .unwrap_or_default()
            .split_whitespace()
            .map(|token| {
                token.parse::<i32>().map_err(|_| {
                    error_at_node(doc, row, &format!("tile id '{token}' is not an integer"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(ids);
    }
    Ok(rows)
}

fn cell_attributes(doc: &Document<'_>, node: Node<'_, '_>) -> Result<(i32, i32), LevelError> {
    Ok((
        required_i32(doc, node, "x")?,
        required_i32(doc, node, "y")?,
    ))
}

fn required_attribute<'a>(
    doc: &Document<'_>,
    node: Node<'a, '_>,
    name: &str,
) -> Result<&'a str, LevelError> {
    node.attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            error_at_node(
                doc,
                node,
                &format!(
                    "missing required attribute '{name}' on <{}>",
                    node.tag_name().name()
                ),
            )
        })
}

fn required_u32(doc: &Document<'_>, node: Node<'_, '_>, name: &str) -> Result<u32, LevelError> {
    let value = required_attribute(doc, node, name)?;
    value.parse::<u32>().map_err(|_| {
        error_at_node(
            doc,
            node,
            &format!("attribute '{name}' value '{value}' is not a non-negative integer"),
        )
    })
}

fn required_i32(doc: &Document<'_>, node: Node<'_, '_>, name: &str) -> Result<i32, LevelError> {
    let value = required_attribute(doc, node, name)?;
    value.parse::<i32>().map_err(|_| {
        error_at_node(
            doc,
            node,
            &format!("attribute '{name}' value '{value}' is not an integer"),
        )
    })
}

fn required_key(doc: &Document<'_>, node: Node<'_, '_>, name: &str) -> Result<String, LevelError> {
    let value = required_attribute(doc, node, name)?;
    validate_asset_key(value).map_err(|error| {
        error_at_node(
            doc,
            node,
            &format!("attribute '{name}' is not a valid asset key: {error}"),
        )
    })?;
    Ok(value.to_string())
}

fn error_at_node(doc: &Document<'_>, node: Node<'_, '_>, message: &str) -> LevelError {
    let pos = doc.text_pos_at(node.range().start);
    LevelError::Invalid {
        message: message.to_string(),
        location: SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        },
    }
}
