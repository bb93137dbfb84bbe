use serde_json::{json, Value};
use thiserror::Error;

use crate::shape::ShapeKind;

/// Signature marker and default storage key for saved games.
pub const SAVE_SIGNATURE: &str = "tsugihagi.save.v1";

/// Wire format (kept stable): a positional JSON array
/// `[signature, image_src, origin_tag, base, groups]` with
/// `base = [nx, ny, board_width, seed, rotation_flag, shape_index,
/// natural_width, natural_height]` and each group
/// `[x, y, (rot when rotation is allowed), kx0, ky0, kx1, ky1, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRecord {
    pub image_src: String,
    pub origin_tag: Option<String>,
    pub nx: u32,
    pub ny: u32,
    pub board_width: u32,
    pub seed: u32,
    pub rotation_allowed: bool,
    pub shape_kind: ShapeKind,
    pub natural_width: u32,
    pub natural_height: u32,
    pub groups: Vec<SavedGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedGroup {
    pub x: i32,
    pub y: i32,
    pub rot: u8,
    pub cells: Vec<(u32, u32)>,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing or foreign signature")]
    Signature,
    #[error("malformed record: {0}")]
    Malformed(&'static str),
    #[error("cell ({0}, {1}) outside the saved grid")]
    CellOutOfRange(u32, u32),
}

pub fn encode(record: &SaveRecord) -> String {
    let base = json!([
        record.nx,
        record.ny,
        record.board_width,
        record.seed,
        if record.rotation_allowed { 1 } else { 0 },
        record.shape_kind.index(),
        record.natural_width,
        record.natural_height,
    ]);
    let groups: Vec<Value> = record
        .groups
        .iter()
        .map(|group| {
            let mut fields = vec![json!(group.x), json!(group.y)];
            if record.rotation_allowed {
                fields.push(json!(group.rot));
            }
            for &(kx, ky) in &group.cells {
                fields.push(json!(kx));
                fields.push(json!(ky));
            }
            Value::Array(fields)
        })
        .collect();
    json!([
        SAVE_SIGNATURE,
        record.image_src,
        record.origin_tag,
        base,
        groups,
    ])
    .to_string()
}

pub fn decode(payload: &str) -> Result<SaveRecord, CodecError> {
    let value: Value = serde_json::from_str(payload)?;
    let root = value
        .as_array()
        .ok_or(CodecError::Malformed("root is not an array"))?;
    if root.first().and_then(Value::as_str) != Some(SAVE_SIGNATURE) {
        return Err(CodecError::Signature);
    }
    if root.len() != 5 {
        return Err(CodecError::Malformed("wrong field count"));
    }
    let image_src = root[1]
        .as_str()
        .ok_or(CodecError::Malformed("image source"))?
        .to_string();
    let origin_tag = match &root[2] {
        Value::Null => None,
        Value::String(tag) => Some(tag.clone()),
        _ => return Err(CodecError::Malformed("origin tag")),
    };
    let base = root[3]
        .as_array()
        .ok_or(CodecError::Malformed("base record"))?;
    if base.len() != 8 {
        return Err(CodecError::Malformed("base record length"));
    }
    let nx = field_u32(&base[0], "grid width")?;
    let ny = field_u32(&base[1], "grid height")?;
    if nx == 0 || ny == 0 {
        return Err(CodecError::Malformed("empty grid"));
    }
    let board_width = field_u32(&base[2], "board width")?;
    let seed = field_u32(&base[3], "seed")?;
    let rotation_allowed = match field_u32(&base[4], "rotation flag")? {
        0 => false,
        1 => true,
        _ => return Err(CodecError::Malformed("rotation flag")),
    };
    let shape_kind = ShapeKind::from_index(field_u32(&base[5], "shape kind")?)
        .ok_or(CodecError::Malformed("shape kind"))?;
    let natural_width = field_u32(&base[6], "natural width")?;
    let natural_height = field_u32(&base[7], "natural height")?;

    let raw_groups = root[4]
        .as_array()
        .ok_or(CodecError::Malformed("group list"))?;
    let mut groups = Vec::with_capacity(raw_groups.len());
    for raw in raw_groups {
        let fields = raw.as_array().ok_or(CodecError::Malformed("group"))?;
        let cells_from = if rotation_allowed { 3 } else { 2 };
        if fields.len() < cells_from + 2 || (fields.len() - cells_from) % 2 != 0 {
            return Err(CodecError::Malformed("group length"));
        }
        let x = field_i32(&fields[0], "group x")?;
        let y = field_i32(&fields[1], "group y")?;
        let rot = if rotation_allowed {
            let rot = field_u32(&fields[2], "group rotation")?;
            if rot > 3 {
                return Err(CodecError::Malformed("group rotation"));
            }
            rot as u8
        } else {
            0
        };
        let mut cells = Vec::with_capacity((fields.len() - cells_from) / 2);
        for pair in fields[cells_from..].chunks_exact(2) {
            let kx = field_u32(&pair[0], "cell x")?;
            let ky = field_u32(&pair[1], "cell y")?;
            if kx >= nx || ky >= ny {
                return Err(CodecError::CellOutOfRange(kx, ky));
            }
            cells.push((kx, ky));
        }
        groups.push(SavedGroup { x, y, rot, cells });
    }

    Ok(SaveRecord {
        image_src,
        origin_tag,
        nx,
        ny,
        board_width,
        seed,
        rotation_allowed,
        shape_kind,
        natural_width,
        natural_height,
        groups,
    })
}

fn field_u32(value: &Value, what: &'static str) -> Result<u32, CodecError> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(CodecError::Malformed(what))
}

fn field_i32(value: &Value, what: &'static str) -> Result<i32, CodecError> {
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or(CodecError::Malformed(what))
}
