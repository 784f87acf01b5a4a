//! Control messages exchanged by task managers.

use filament_core::{Rank, TailLayout, TaskId, TaskToken};

use crate::codec::{WireReader, WireWriter};
use crate::error::WireError;
use crate::token::{decode_token, encode_token, max_token_len};

/// Bytes of the `[msg_type][sender]` header.
pub const HEADER_LEN: usize = 8;

/// Wire discriminant of a [`ControlMessage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    /// A migrating task.
    NewTask = 0,
    /// A task finished on the sender; addressed to the leader.
    TaskFinished = 1,
    /// No work remains anywhere; sent by the leader.
    NoMoreTasks = 2,
}

impl MessageType {
    /// Decode a wire discriminant.
    pub fn from_code(code: i32) -> Result<Self, WireError> {
        match code {
            0 => Ok(Self::NewTask),
            1 => Ok(Self::TaskFinished),
            2 => Ok(Self::NoMoreTasks),
            tag => Err(WireError::UnknownMessageType { tag }),
        }
    }
}

/// One message of the tracing protocol, always addressed to one rank.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlMessage {
    /// Take over this task.
    NewTask(TaskToken),
    /// The task with this id reached a terminal state.
    TaskFinished(TaskId),
    /// Global termination.
    NoMoreTasks,
}

impl ControlMessage {
    /// The wire discriminant.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::NewTask(_) => MessageType::NewTask,
            Self::TaskFinished(_) => MessageType::TaskFinished,
            Self::NoMoreTasks => MessageType::NoMoreTasks,
        }
    }
}

/// Buffer size that fits any control message under `layout`.
pub fn message_capacity(layout: &TailLayout) -> usize {
    HEADER_LEN + max_token_len(layout).max(8)
}

/// Encode `msg` from `sender` into `buf`. Returns the encoded length.
pub fn encode_message(
    buf: &mut [u8],
    sender: Rank,
    msg: &ControlMessage,
    layout: &TailLayout,
) -> Result<usize, WireError> {
    let mut w = WireWriter::new(buf);
    w.write_i32(msg.message_type() as i32)?;
    w.write_i32(sender.0 as i32)?;
    match msg {
        ControlMessage::NewTask(token) => encode_token(&mut w, token, layout)?,
        ControlMessage::TaskFinished(id) => w.write_u64(id.0)?,
        ControlMessage::NoMoreTasks => {}
    }
    Ok(w.position())
}

/// Decode one message. Returns the sender recorded in the header.
pub fn decode_message(
    bytes: &[u8],
    layout: &TailLayout,
) -> Result<(Rank, ControlMessage), WireError> {
    let mut r = WireReader::new(bytes);
    let kind = MessageType::from_code(r.read_i32()?)?;
    let sender = r.read_i32()?;
    if sender < 0 {
        return Err(WireError::InvalidField {
            field: "sender",
            reason: format!("negative rank {sender}"),
        });
    }
    let msg = match kind {
        MessageType::NewTask => ControlMessage::NewTask(decode_token(&mut r, layout)?),
        MessageType::TaskFinished => ControlMessage::TaskFinished(TaskId(r.read_u64()?)),
        MessageType::NoMoreTasks => ControlMessage::NoMoreTasks,
    };
    if r.remaining() != 0 {
        return Err(WireError::InvalidField {
            field: "message",
            reason: format!("{} trailing bytes", r.remaining()),
        });
    }
    Ok((Rank(sender as u32), msg))
}
