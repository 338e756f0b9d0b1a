//! Minimal IEEE 802.15.4 MAC header parsing for the Zigbee sniffer.
//!
//! The Zigbee RX chain forwards every decoded frame as one UDP datagram; the
//! sniffer binary prints a one-line summary per frame. Only the MAC header is
//! interpreted (frame type, sequence number, addressing); the payload is
//! reported by length.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: {0} bytes")]
    Truncated(usize),
    #[error("reserved addressing mode {0}")]
    ReservedAddressMode(u8),
}

/// MAC frame type (frame-control bits 0..=2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Beacon,
    Data,
    Ack,
    MacCommand,
    Reserved(u8),
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::Beacon => write!(f, "BEACON"),
            FrameType::Data => write!(f, "DATA"),
            FrameType::Ack => write!(f, "ACK"),
            FrameType::MacCommand => write!(f, "CMD"),
            FrameType::Reserved(t) => write!(f, "RESERVED({t})"),
        }
    }
}

/// A parsed MAC address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    None,
    Short(u16),
    Extended(u64),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::None => write!(f, "-"),
            Address::Short(a) => write!(f, "0x{a:04x}"),
            Address::Extended(a) => write!(f, "0x{a:016x}"),
        }
    }
}

/// Summary of one received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub frame_type: FrameType,
    pub security: bool,
    pub ack_request: bool,
    pub sequence: u8,
    pub dest_pan: Option<u16>,
    pub dest: Address,
    pub src_pan: Option<u16>,
    pub src: Address,
    /// Bytes following the MAC header (MAC payload plus trailing FCS if the
    /// producer includes it).
    pub payload_len: usize,
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} seq={}", self.frame_type, self.sequence)?;
        if let Some(pan) = self.dest_pan {
            write!(f, " pan=0x{pan:04x}")?;
        }
        write!(f, " dst={} src={}", self.dest, self.src)?;
        if self.ack_request {
            write!(f, " ack-req")?;
        }
        if self.security {
            write!(f, " secured")?;
        }
        write!(f, " ({} byte payload)", self.payload_len)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FrameError> {
        if self.pos + n > self.data.len() {
            return Err(FrameError::Truncated(self.data.len()));
        }
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u16(&mut self) -> Result<u16, FrameError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    fn u64(&mut self) -> Result<u64, FrameError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    fn address(&mut self, mode: u8) -> Result<Address, FrameError> {
        match mode {
            0 => Ok(Address::None),
            2 => Ok(Address::Short(self.u16()?)),
            3 => Ok(Address::Extended(self.u64()?)),
            m => Err(FrameError::ReservedAddressMode(m)),
        }
    }
}

/// Parse the MAC header of one frame.
pub fn parse_frame(data: &[u8]) -> Result<FrameSummary, FrameError> {
    let mut r = Reader { data, pos: 0 };
    let fcf = r.u16()?;
    let frame_type = match (fcf & 0b111) as u8 {
        0 => FrameType::Beacon,
        1 => FrameType::Data,
        2 => FrameType::Ack,
        3 => FrameType::MacCommand,
        t => FrameType::Reserved(t),
    };
    let security = fcf & (1 << 3) != 0;
    let ack_request = fcf & (1 << 5) != 0;
    let pan_compression = fcf & (1 << 6) != 0;
    let dest_mode = ((fcf >> 10) & 0b11) as u8;
    let src_mode = ((fcf >> 14) & 0b11) as u8;

    let sequence = r.take(1)?[0];

    let dest_pan = if dest_mode != 0 { Some(r.u16()?) } else { None };
    let dest = r.address(dest_mode)?;
    let src_pan = if src_mode != 0 && !pan_compression {
        Some(r.u16()?)
    } else {
        None
    };
    let src = r.address(src_mode)?;

    Ok(FrameSummary {
        frame_type,
        security,
        ack_request,
        sequence,
        dest_pan,
        dest,
        src_pan,
        src,
        payload_len: data.len() - r.pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_with_short_addresses() {
        // FCF 0x8861: data, ack request, PAN compression, short dst + src.
        let frame = [
            0x61, 0x88, 0x12, // fcf, seq
            0x62, 0x1a, // dest pan 0x1a62
            0xff, 0xff, // dest 0xffff
            0x12, 0x00, // src 0x0012 (pan compressed away)
            b'h', b'i',
        ];
        let s = parse_frame(&frame).unwrap();
        assert_eq!(s.frame_type, FrameType::Data);
        assert_eq!(s.sequence, 0x12);
        assert!(s.ack_request);
        assert_eq!(s.dest_pan, Some(0x1a62));
        assert_eq!(s.dest, Address::Short(0xffff));
        assert_eq!(s.src_pan, None);
        assert_eq!(s.src, Address::Short(0x0012));
        assert_eq!(s.payload_len, 2);
    }

    #[test]
    fn ack_frame_has_no_addressing() {
        // FCF 0x0002: ack, no addresses.
        let frame = [0x02, 0x00, 0x2a];
        let s = parse_frame(&frame).unwrap();
        assert_eq!(s.frame_type, FrameType::Ack);
        assert_eq!(s.sequence, 0x2a);
        assert_eq!(s.dest, Address::None);
        assert_eq!(s.src, Address::None);
        assert_eq!(s.payload_len, 0);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        assert_eq!(parse_frame(&[0x61]), Err(FrameError::Truncated(1)));
        // Header promises a dest address that is not there.
        assert_eq!(parse_frame(&[0x61, 0x88, 0x01]), Err(FrameError::Truncated(3)));
    }

    #[test]
    fn summary_line_format() {
        let frame = [0x02, 0x00, 0x07];
        let s = parse_frame(&frame).unwrap();
        assert_eq!(s.to_string(), "ACK seq=7 dst=- src=- (0 byte payload)");
    }
}
