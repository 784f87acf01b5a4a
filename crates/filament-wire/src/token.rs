//! Task-token encoding.

use filament_core::{
    AmrLocation, AttributeValues, BlockId, Direction, Point3, Rank, TailLayout, TaskId, TaskKind,
    TaskToken, TracePoint,
};

use crate::codec::{WireReader, WireWriter};
use crate::error::WireError;

const KIND_PLAIN: u8 = 0;
const KIND_AMR: u8 = 1;

/// Largest encoded size of a token under `layout`, in bytes.
///
/// Assumes both the AMR payload and a full tail are present.
pub fn max_token_len(layout: &TailLayout) -> usize {
    8 // id
        + 24 // seed
        + 1 // direction
        + 8 // step_count
        + 8 // propagation
        + 4 // num_hops
        + 4 // owner_hint
        + 1 + 4 + 4 // kind + AMR payload
        + 1 + 24 + 4 // tail flag + position + count
        + 8 * layout.width()
}

/// Encode a token. The tail must match `layout`.
pub fn encode_token(
    w: &mut WireWriter<'_>,
    token: &TaskToken,
    layout: &TailLayout,
) -> Result<(), WireError> {
    token.check_tail(layout).map_err(|e| WireError::InvalidField {
        field: "tail",
        reason: e.to_string(),
    })?;

    w.write_u64(token.id().0)?;
    w.write_point(&token.seed)?;
    w.write_u8(token.direction().code())?;
    w.write_u64(token.step_count())?;
    w.write_f64(token.propagation())?;
    w.write_u32(token.num_hops())?;
    w.write_i32(token.owner_hint.map_or(-1, |r| r.0 as i32))?;

    match token.kind {
        TaskKind::Plain => w.write_u8(KIND_PLAIN)?,
        TaskKind::Amr(loc) => {
            w.write_u8(KIND_AMR)?;
            w.write_u32(loc.level)?;
            w.write_u32(loc.block.0)?;
        }
    }

    match &token.tail {
        None => w.write_u8(0)?,
        Some(tail) => {
            w.write_u8(1)?;
            w.write_point(&tail.position)?;
            w.write_u32(tail.values.len() as u32)?;
            for v in &tail.values {
                w.write_f64(*v)?;
            }
        }
    }
    Ok(())
}

/// Decode a token written by [`encode_token`] under the same layout.
pub fn decode_token(r: &mut WireReader<'_>, layout: &TailLayout) -> Result<TaskToken, WireError> {
    let id = TaskId(r.read_u64()?);
    let seed = r.read_point()?;
    let direction = {
        let code = r.read_u8()?;
        Direction::from_code(code).ok_or_else(|| WireError::InvalidField {
            field: "direction",
            reason: format!("unknown code {code}"),
        })?
    };
    let step_count = r.read_u64()?;
    let propagation = r.read_f64()?;
    let num_hops = r.read_u32()?;
    let owner_hint = match r.read_i32()? {
        -1 => None,
        v if v >= 0 => Some(Rank(v as u32)),
        v => {
            return Err(WireError::InvalidField {
                field: "owner_hint",
                reason: format!("negative rank {v}"),
            })
        }
    };
    let kind = match r.read_u8()? {
        KIND_PLAIN => TaskKind::Plain,
        KIND_AMR => TaskKind::Amr(AmrLocation {
            level: r.read_u32()?,
            block: BlockId(r.read_u32()?),
        }),
        other => {
            return Err(WireError::InvalidField {
                field: "kind",
                reason: format!("unknown tag {other}"),
            })
        }
    };
    let tail = match r.read_u8()? {
        0 => None,
        1 => {
            let position: Point3 = r.read_point()?;
            let count = r.read_u32()? as usize;
            if count != layout.width() {
                return Err(WireError::InvalidField {
                    field: "tail",
                    reason: format!("{count} values, layout requires {}", layout.width()),
                });
            }
            let mut values = AttributeValues::with_capacity(count);
            for _ in 0..count {
                values.push(r.read_f64()?);
            }
            Some(TracePoint::new(position, values))
        }
        flag => {
            return Err(WireError::InvalidField {
                field: "tail",
                reason: format!("invalid presence flag {flag}"),
            })
        }
    };

    let mut token =
        TaskToken::new(id, seed, direction).with_progress(step_count, propagation, num_hops);
    token.owner_hint = owner_hint;
    token.kind = kind;
    token.tail = tail;
    Ok(token)
}
