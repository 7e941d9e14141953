use crate::core::types::{Price, Quantity, Timestamp};

/// Instruments are mapped into a dense array by `security_id % MAX_SYMBOLS`.
/// Ids that differ by a multiple of this collide onto the same slot; the
/// mapping is part of the wire contract.
pub const MAX_SYMBOLS: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgKind {
    NewOrder = 0,
    Cancel = 1,
    Execution = 2,
    Quote = 3,
    FullSnapshot = 4,
    IncrementalRefresh = 5,
    #[default]
    Unknown = 6,
}

impl MsgKind {
    /// FIX-style MsgType byte from the wire.
    #[inline(always)]
    pub const fn from_msg_type(byte: u8) -> Self {
        match byte {
            b'D' => MsgKind::NewOrder,
            b'F' => MsgKind::Cancel,
            b'8' => MsgKind::Execution,
            b'S' => MsgKind::Quote,
            b'W' => MsgKind::FullSnapshot,
            b'X' => MsgKind::IncrementalRefresh,
            _ => MsgKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
    #[default]
    Unknown = 2,
}

impl Side {
    #[inline(always)]
    pub const fn from_wire(byte: u8) -> Self {
        match byte {
            b'1' => Side::Buy,
            b'2' => Side::Sell,
            _ => Side::Unknown,
        }
    }
}

/// Fully-typed decoded message. A plain value record; one is produced per
/// accepted packet and consumed exactly once by the book stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireMessage {
    pub kind: MsgKind,
    pub side: Side,
    pub seq_num: u64,
    pub sending_time: u64,
    pub security_id: u64,
    pub symbol_index: u32,
    pub order_id: u64,
    pub price: Price,
    pub quantity: Quantity,
    pub trade_id: u64,
    pub trade_price: Price,
    pub trade_quantity: Quantity,
    pub receive_ts: Timestamp,
    pub decode_ts: Timestamp,
    pub channel_id: u32,
}

/// Ingress descriptor for one raw packet. The payload lives in the buffer
/// pool; `buffer_id` is a non-owning index into it, never a pointer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPacket {
    pub receive_ts: Timestamp,
    pub seq_num: u64,
    pub channel_id: u32,
    pub buffer_id: u32,
    pub offset: u32,
    pub length: u32,
    pub flags: u16,
}

impl RawPacket {
    /// Ingress input exceeded the pool slot and was cut short.
    pub const FLAG_TRUNCATED: u16 = 1 << 0;

    #[inline(always)]
    pub const fn is_truncated(&self) -> bool {
        self.flags & Self::FLAG_TRUNCATED != 0
    }
}

/// Immutable top-of-book view emitted after every accepted book update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookSnapshot {
    pub symbol_index: u32,
    pub bid_price: Price,
    pub bid_qty: Quantity,
    pub ask_price: Price,
    pub ask_qty: Quantity,
    pub timestamp: Timestamp,
    pub update_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_kind_mapping() {
        assert_eq!(MsgKind::from_msg_type(b'D'), MsgKind::NewOrder);
        assert_eq!(MsgKind::from_msg_type(b'F'), MsgKind::Cancel);
        assert_eq!(MsgKind::from_msg_type(b'8'), MsgKind::Execution);
        assert_eq!(MsgKind::from_msg_type(b'S'), MsgKind::Quote);
        assert_eq!(MsgKind::from_msg_type(b'W'), MsgKind::FullSnapshot);
        assert_eq!(MsgKind::from_msg_type(b'X'), MsgKind::IncrementalRefresh);
        assert_eq!(MsgKind::from_msg_type(b'Z'), MsgKind::Unknown);
    }

    #[test]
    fn test_side_mapping() {
        assert_eq!(Side::from_wire(b'1'), Side::Buy);
        assert_eq!(Side::from_wire(b'2'), Side::Sell);
        assert_eq!(Side::from_wire(b'3'), Side::Unknown);
        assert_eq!(Side::from_wire(0), Side::Unknown);
    }

    #[test]
    fn test_raw_packet_flags() {
        let packet = RawPacket::default();
        assert!(!packet.is_truncated());

        let truncated = RawPacket {
            flags: RawPacket::FLAG_TRUNCATED,
            ..RawPacket::default()
        };
        assert!(truncated.is_truncated());
    }
}
