//! The i3-ipc wire framing: 6-byte magic, then payload length and message
//! type as little-endian u32, then the JSON payload.

use std::io::Error as IOError;
use std::io::{ErrorKind, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Replies carry the request's type; events have the high bit set.
pub const EVENT_BIT: u32 = 1 << 31;

pub const COMMAND: u32 = 0;
pub const GET_WORKSPACES: u32 = 1;
pub const SUBSCRIBE: u32 = 2;
pub const GET_OUTPUTS: u32 = 3;
pub const GET_TREE: u32 = 4;
pub const GET_MARKS: u32 = 5;
pub const GET_BAR_CONFIG: u32 = 6;
pub const GET_VERSION: u32 = 7;

/// Errors which arise from sending a message
#[derive(Debug)]
pub enum SendError {
    IO(IOError),
}

/// Reasons a client message might be erroneous
#[derive(Debug)]
pub enum ReceiveError {
    /// There were IO issues
    IO(IOError),
    /// The frame did not start with the i3-ipc magic
    BadMagic,
}

pub type SendResult = Result<(), SendError>;

/// One complete message: type and payload.
pub type Message = (u32, Vec<u8>);

/// Extracts every complete frame from the front of the buffer, leaving
/// partial data for the next read.
pub fn drain_frames(buf: &mut Vec<u8>) -> Result<Vec<Message>, ReceiveError> {
    const HEADER: usize = 6 + 4 + 4;
    let mut messages = Vec::new();
    loop {
        if buf.len() < HEADER {
            return Ok(messages);
        }
        if &buf[..6] != MAGIC {
            return Err(ReceiveError::BadMagic);
        }
        let mut header = &buf[6..HEADER];
        let len = header.read_u32::<LittleEndian>().map_err(ReceiveError::IO)? as usize;
        let message_type = header.read_u32::<LittleEndian>().map_err(ReceiveError::IO)?;
        if buf.len() < HEADER + len {
            return Ok(messages);
        }
        let payload = buf[HEADER..HEADER + len].to_vec();
        buf.drain(..HEADER + len);
        trace!("ipc frame: type {} with {} bytes", message_type, len);
        messages.push((message_type, payload));
    }
}

/// Reads one message, blocking. Used by the command-line client.
pub fn read_message(stream: &mut impl Read) -> Result<Message, ReceiveError> {
    let mut magic = [0u8; 6];
    stream.read_exact(&mut magic).map_err(ReceiveError::IO)?;
    if &magic != MAGIC {
        return Err(ReceiveError::BadMagic);
    }
    let len = stream.read_u32::<LittleEndian>().map_err(ReceiveError::IO)?;
    let message_type = stream.read_u32::<LittleEndian>().map_err(ReceiveError::IO)?;
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).map_err(ReceiveError::IO)?;
    Ok((message_type, payload))
}

/// Writes one message. Retries short writes; the frames are small enough
/// that a briefly full socket just spins once or twice.
pub fn write_message(stream: &mut impl Write, message_type: u32, payload: &[u8]) -> SendResult {
    let mut frame = Vec::with_capacity(6 + 8 + payload.len());
    frame.extend_from_slice(MAGIC);
    frame
        .write_u32::<LittleEndian>(payload.len() as u32)
        .map_err(SendError::IO)?;
    frame
        .write_u32::<LittleEndian>(message_type)
        .map_err(SendError::IO)?;
    frame.extend_from_slice(payload);
    let mut written = 0;
    while written < frame.len() {
        match stream.write(&frame[written..]) {
            Ok(0) => {
                return Err(SendError::IO(IOError::new(
                    ErrorKind::WriteZero,
                    "ipc peer stopped reading",
                )))
            }
            Ok(n) => written += n,
            Err(ref err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(ref err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(SendError::IO(err)),
        }
    }
    Ok(())
}
