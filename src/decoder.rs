use crate::core::clock::{Clock, MonotonicClock};
use crate::core::types::{Price, Quantity, Timestamp};
use crate::messages::{MAX_SYMBOLS, MsgKind, Side, WireMessage};

/// Anything shorter cannot hold the fixed prefix and is rejected outright.
pub const MIN_PACKET_LEN: usize = 16;

const PRESENCE_SECURITY_ID: u8 = 0x01;
const PRESENCE_PRICE: u8 = 0x02;
const PRESENCE_QUANTITY: u8 = 0x04;
const PRESENCE_SIDE: u8 = 0x08;
const PRESENCE_ORDER_ID: u8 = 0x10;
const PRESENCE_TRADE: u8 = 0x20;

// A 64-bit value needs at most ten 7-bit groups; anything longer is a
// missing stop bit.
const MAX_STOP_BIT_BYTES: usize = 10;
const MAX_STOP_BIT_BYTES_32: usize = 5;

const POW10: [i64; 11] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
];

/// Bounds-checked cursor over one packet. Every read returns `None` past the
/// end instead of panicking, so a malformed packet can never unwind the
/// decode loop.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline(always)]
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    #[inline(always)]
    fn read_u8(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// Stop-bit integer: seven data bits per byte, high bit set terminates.
    #[inline(always)]
    fn read_stop_bit(&mut self) -> Option<u64> {
        let mut value = 0u64;

        for _ in 0..MAX_STOP_BIT_BYTES {
            let b = self.read_u8()?;
            value = (value << 7) | (b & 0x7F) as u64;
            if b & 0x80 != 0 {
                return Some(value);
            }
        }

        None
    }

    /// 32-bit stop-bit integer, interpreted as two's complement. Decimal
    /// exponents arrive this way.
    #[inline(always)]
    fn read_stop_bit_i32(&mut self) -> Option<i32> {
        let mut value = 0u32;

        for _ in 0..MAX_STOP_BIT_BYTES_32 {
            let b = self.read_u8()?;
            value = (value << 7) | (b & 0x7F) as u32;
            if b & 0x80 != 0 {
                return Some(value as i32);
            }
        }

        None
    }
}

/// Scale a wire decimal `(mantissa, exponent)` to fixed-point 1e8. Exponents
/// that land outside the table pass the mantissa through unchanged.
#[inline(always)]
fn scale_decimal(mantissa: i64, exponent: i32) -> i64 {
    let k = 8 + exponent;

    if (0..=10).contains(&k) {
        mantissa * POW10[k as usize]
    } else if (-10..0).contains(&k) {
        mantissa / POW10[(-k) as usize]
    } else {
        mantissa
    }
}

/// Stateless transform from packet bytes plus side-channel metadata to a
/// [`WireMessage`]. No allocation, no copies of the input; the only side
/// effect is reading the clock for the decode stamp.
pub struct WireDecoder<C = MonotonicClock> {
    clock: C,
}

impl WireDecoder<MonotonicClock> {
    pub fn new() -> Self {
        WireDecoder {
            clock: MonotonicClock::new(),
        }
    }
}

impl Default for WireDecoder<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> WireDecoder<C> {
    pub fn with_clock(clock: C) -> Self {
        WireDecoder { clock }
    }

    /// Decode one packet. Returns `None` for undersized input, for any field
    /// that runs off the end of `bytes`, and for missing stop bits. Never
    /// panics.
    pub fn try_decode(
        &self,
        bytes: &[u8],
        receive_ts: Timestamp,
        channel_id: u32,
    ) -> Option<WireMessage> {
        if bytes.len() < MIN_PACKET_LEN {
            return None;
        }

        let mut r = Reader::new(bytes);

        let presence = r.read_u8()?;
        let _template_id = r.read_stop_bit()?;
        let seq_num = r.read_stop_bit()?;
        let kind = MsgKind::from_msg_type(r.read_u8()?);
        let sending_time = r.read_stop_bit()?;

        let mut msg = WireMessage {
            kind,
            seq_num,
            sending_time,
            receive_ts,
            channel_id,
            ..WireMessage::default()
        };

        if presence & PRESENCE_SECURITY_ID != 0 {
            let security_id = r.read_stop_bit()?;
            msg.security_id = security_id;
            msg.symbol_index = (security_id % MAX_SYMBOLS as u64) as u32;
        }

        if presence & PRESENCE_PRICE != 0 {
            let exponent = r.read_stop_bit_i32()?;
            let mantissa = r.read_stop_bit()? as i64;
            msg.price = Price::from_raw(scale_decimal(mantissa, exponent));
        }

        if presence & PRESENCE_QUANTITY != 0 {
            msg.quantity = Quantity::from_raw(r.read_stop_bit()? as i64);
        }

        if presence & PRESENCE_SIDE != 0 {
            msg.side = Side::from_wire(r.read_u8()?);
        }

        if presence & PRESENCE_ORDER_ID != 0 {
            msg.order_id = r.read_stop_bit()?;
        }

        if kind == MsgKind::Execution && presence & PRESENCE_TRADE != 0 {
            msg.trade_id = r.read_stop_bit()?;
            let exponent = r.read_stop_bit_i32()?;
            let mantissa = r.read_stop_bit()? as i64;
            msg.trade_price = Price::from_raw(scale_decimal(mantissa, exponent));
            msg.trade_quantity = Quantity::from_raw(r.read_stop_bit()? as i64);
        }

        msg.decode_ts = self.clock.now();

        Some(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    /// Stop-bit encode, little helper for building packets by hand.
    fn sb(value: u64) -> Vec<u8> {
        if value == 0 {
            return vec![0x80];
        }

        let mut groups = Vec::new();
        let mut v = value;
        while v > 0 {
            groups.push((v & 0x7F) as u8);
            v >>= 7;
        }
        groups.reverse();
        *groups.last_mut().unwrap() |= 0x80;
        groups
    }

    fn pad_to_min(mut bytes: Vec<u8>) -> Vec<u8> {
        while bytes.len() < MIN_PACKET_LEN {
            bytes.push(0);
        }
        bytes
    }

    fn decoder() -> WireDecoder<ManualClock> {
        WireDecoder::with_clock(ManualClock::new(999))
    }

    #[test]
    fn test_undersized_packet_rejected() {
        let d = decoder();

        assert!(d.try_decode(&[], Timestamp::from_nanos(1), 0).is_none());
        assert!(
            d.try_decode(&[0u8; MIN_PACKET_LEN - 1], Timestamp::from_nanos(1), 0)
                .is_none()
        );
    }

    #[test]
    fn test_minimal_packet_metadata() {
        // presence=0, template=0, seq=1, type='D', sending_time=100, padding
        let bytes = [
            0x00, 0x80, 0x81, b'D', 0x80 | 100,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];

        let d = decoder();
        let msg = d
            .try_decode(&bytes, Timestamp::from_nanos(12345), 7)
            .unwrap();

        assert_eq!(msg.kind, MsgKind::NewOrder);
        assert_eq!(msg.seq_num, 1);
        assert_eq!(msg.sending_time, 100);
        assert_eq!(msg.receive_ts, Timestamp::from_nanos(12345));
        assert_eq!(msg.channel_id, 7);
        assert!(msg.decode_ts.nanos() > 0);
    }

    #[test]
    fn test_stop_bit_single_and_two_byte() {
        for n in [0u64, 1, 63, 127] {
            let byte = [0x80 | n as u8];
            let mut r = Reader::new(&byte);
            assert_eq!(r.read_stop_bit(), Some(n));
        }

        for n in [0u64, 5, 127] {
            let bytes = [0x01, 0x80 | n as u8];
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_stop_bit(), Some((1 << 7) | n));
        }
    }

    #[test]
    fn test_stop_bit_round_trip() {
        for v in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX >> 1] {
            let bytes = sb(v);
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_stop_bit(), Some(v), "value {v}");
        }
    }

    #[test]
    fn test_stop_bit_missing_terminator() {
        // All continuation bytes, no stop bit.
        let bytes = [0x01u8; 16];
        let mut r = Reader::new(&bytes[..4]);
        assert_eq!(r.read_stop_bit(), None);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_stop_bit(), None);
    }

    #[test]
    fn test_malformed_presence_map_rejected() {
        // Presence map asks for every optional field but the packet ends
        // right after the fixed prefix.
        let mut bytes = vec![0x3F];
        bytes.extend(sb(1)); // template
        bytes.extend(sb(2)); // seq
        bytes.push(b'8');
        bytes.extend(sb(3)); // sending time
        bytes.extend(sb(42)); // security id
        let bytes = pad_to_min(bytes);

        // Padding zeros are continuation bytes, so the price mantissa never
        // terminates and the decode must fail cleanly.
        let d = decoder();
        assert!(d.try_decode(&bytes, Timestamp::from_nanos(1), 0).is_none());
    }

    #[test]
    fn test_full_new_order() {
        let mut bytes = vec![
            PRESENCE_SECURITY_ID
                | PRESENCE_PRICE
                | PRESENCE_QUANTITY
                | PRESENCE_SIDE
                | PRESENCE_ORDER_ID,
        ];
        bytes.extend(sb(1)); // template
        bytes.extend(sb(77)); // seq
        bytes.push(b'D');
        bytes.extend(sb(1_000_000)); // sending time
        bytes.extend(sb(2345)); // security id
        bytes.extend(sb(0)); // price exponent
        bytes.extend(sb(125)); // price mantissa: 125.0
        bytes.extend(sb(50)); // quantity
        bytes.push(b'1'); // buy
        bytes.extend(sb(900)); // order id
        let bytes = pad_to_min(bytes);

        let d = decoder();
        let msg = d.try_decode(&bytes, Timestamp::from_nanos(5), 3).unwrap();

        assert_eq!(msg.kind, MsgKind::NewOrder);
        assert_eq!(msg.seq_num, 77);
        assert_eq!(msg.security_id, 2345);
        assert_eq!(msg.symbol_index, 345);
        assert_eq!(msg.price, Price::new(125, 0));
        assert_eq!(msg.quantity.raw(), 50);
        assert_eq!(msg.side, Side::Buy);
        assert_eq!(msg.order_id, 900);
    }

    #[test]
    fn test_execution_trade_fields() {
        let mut bytes = vec![PRESENCE_SECURITY_ID | PRESENCE_ORDER_ID | PRESENCE_TRADE];
        bytes.extend(sb(1)); // template
        bytes.extend(sb(8)); // seq
        bytes.push(b'8');
        bytes.extend(sb(0)); // sending time
        bytes.extend(sb(7)); // security id
        bytes.extend(sb(55)); // order id
        bytes.extend(sb(1234)); // trade id
        bytes.extend(sb(0)); // trade exponent
        bytes.extend(sb(99)); // trade mantissa: 99.0
        bytes.extend(sb(30)); // trade quantity
        let bytes = pad_to_min(bytes);

        let d = decoder();
        let msg = d.try_decode(&bytes, Timestamp::from_nanos(5), 0).unwrap();

        assert_eq!(msg.kind, MsgKind::Execution);
        assert_eq!(msg.order_id, 55);
        assert_eq!(msg.trade_id, 1234);
        assert_eq!(msg.trade_price, Price::new(99, 0));
        assert_eq!(msg.trade_quantity.raw(), 30);
    }

    #[test]
    fn test_trade_fields_ignored_for_non_execution() {
        // Same presence bit on a NewOrder: the trade block must not be read,
        // so the packet decodes with trade fields left at zero.
        let mut bytes = vec![PRESENCE_TRADE];
        bytes.extend(sb(1));
        bytes.extend(sb(9));
        bytes.push(b'D');
        bytes.extend(sb(0));
        let bytes = pad_to_min(bytes);

        let d = decoder();
        let msg = d.try_decode(&bytes, Timestamp::from_nanos(5), 0).unwrap();

        assert_eq!(msg.kind, MsgKind::NewOrder);
        assert_eq!(msg.trade_id, 0);
        assert_eq!(msg.trade_quantity.raw(), 0);
    }

    #[test]
    fn test_unknown_msg_type() {
        let bytes = [
            0x00, 0x80, 0x81, b'Q', 0x80,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];

        let d = decoder();
        let msg = d.try_decode(&bytes, Timestamp::from_nanos(1), 0).unwrap();
        assert_eq!(msg.kind, MsgKind::Unknown);
    }

    #[test]
    fn test_decimal_scaling() {
        // 123.45 as (12345, -2) -> raw 1e8 units
        assert_eq!(scale_decimal(12345, -2), 12_345_000_000);
        // whole units
        assert_eq!(scale_decimal(100, 0), 10_000_000_000);
        // already in 1e8 units
        assert_eq!(scale_decimal(10_000_000_000, -8), 10_000_000_000);
        // sub-scale precision truncates toward zero
        assert_eq!(scale_decimal(123_456_789_012, -12), 12_345_678);
        // out-of-range exponents pass through
        assert_eq!(scale_decimal(42, 5), 42);
        assert_eq!(scale_decimal(42, -20), 42);
    }

    #[test]
    fn test_symbol_index_collision() {
        let d = decoder();

        for security_id in [123u64, 1123, 9123] {
            let mut bytes = vec![PRESENCE_SECURITY_ID];
            bytes.extend(sb(1));
            bytes.extend(sb(1));
            bytes.push(b'D');
            bytes.extend(sb(0));
            bytes.extend(sb(security_id));
            let bytes = pad_to_min(bytes);

            let msg = d.try_decode(&bytes, Timestamp::from_nanos(1), 0).unwrap();
            assert_eq!(msg.symbol_index, 123);
            assert_eq!(msg.security_id, security_id);
        }
    }
}
