//! Fixed-layout big-endian wire codec for ticks and orders.
//!
//! ```text
//! tick  (18 bytes): symbol u16 | bid f32 | ask f32 | timestamp u64
//! order (25 bytes): order_id u32 | op_code u8 | symbol u16 | quantity u32
//!                   | price f32 | direction u8 | timestamp u64
//! ```

use super::types::{Direction, OpCode, Order, Tick};
use thiserror::Error;

pub const TICK_WIRE_LEN: usize = 18;
pub const ORDER_WIRE_LEN: usize = 25;

const OP_ADD: u8 = 0x01;
const DIR_BID: u8 = 0x00;
const DIR_ASK: u8 = 0x01;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer too short: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unknown op code 0x{0:02x}")]
    UnknownOpCode(u8),
    #[error("unknown direction 0x{0:02x}")]
    UnknownDirection(u8),
    #[error("buffer length {0} is not a multiple of the record size")]
    Misaligned(usize),
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], expected: usize) -> Result<Self, CodecError> {
        if buf.len() < expected {
            return Err(CodecError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        Ok(Self { buf, pos: 0 })
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take())
    }

    fn f32(&mut self) -> f32 {
        f32::from_bits(self.u32())
    }
}

pub fn encode_tick(tick: &Tick) -> [u8; TICK_WIRE_LEN] {
    let mut out = [0u8; TICK_WIRE_LEN];
    out[0..2].copy_from_slice(&tick.symbol.to_be_bytes());
    out[2..6].copy_from_slice(&tick.bid.to_bits().to_be_bytes());
    out[6..10].copy_from_slice(&tick.ask.to_bits().to_be_bytes());
    out[10..18].copy_from_slice(&tick.timestamp.to_be_bytes());
    out
}

pub fn decode_tick(buf: &[u8]) -> Result<Tick, CodecError> {
    let mut r = Reader::new(buf, TICK_WIRE_LEN)?;
    Ok(Tick {
        symbol: r.u16(),
        bid: r.f32(),
        ask: r.f32(),
        timestamp: r.u64(),
    })
}

pub fn encode_order(order: &Order) -> [u8; ORDER_WIRE_LEN] {
    let op = match order.op_code {
        OpCode::Add => OP_ADD,
    };
    let dir = match order.direction {
        Direction::Bid => DIR_BID,
        Direction::Ask => DIR_ASK,
    };

    let mut out = [0u8; ORDER_WIRE_LEN];
    out[0..4].copy_from_slice(&order.order_id.to_be_bytes());
    out[4] = op;
    out[5..7].copy_from_slice(&order.symbol.to_be_bytes());
    out[7..11].copy_from_slice(&order.quantity.to_be_bytes());
    out[11..15].copy_from_slice(&order.price.to_bits().to_be_bytes());
    out[15] = dir;
    out[16..24].copy_from_slice(&order.timestamp.to_be_bytes());
    // byte 24 is the record terminator
    out[24] = b'\n';
    out
}

pub fn decode_order(buf: &[u8]) -> Result<Order, CodecError> {
    let mut r = Reader::new(buf, ORDER_WIRE_LEN)?;
    let order_id = r.u32();
    let op_code = match r.u8() {
        OP_ADD => OpCode::Add,
        other => return Err(CodecError::UnknownOpCode(other)),
    };
    let symbol = r.u16();
    let quantity = r.u32();
    let price = r.f32();
    let direction = match r.u8() {
        DIR_BID => Direction::Bid,
        DIR_ASK => Direction::Ask,
        other => return Err(CodecError::UnknownDirection(other)),
    };
    let timestamp = r.u64();

    Ok(Order {
        order_id,
        op_code,
        symbol,
        quantity,
        price,
        direction,
        timestamp,
    })
}

/// Concatenate orders into one outbound buffer.
pub fn encode_orders(orders: &[Order]) -> Vec<u8> {
    let mut out = Vec::with_capacity(orders.len() * ORDER_WIRE_LEN);
    for order in orders {
        out.extend_from_slice(&encode_order(order));
    }
    out
}

pub fn decode_orders(buf: &[u8]) -> Result<Vec<Order>, CodecError> {
    if buf.len() % ORDER_WIRE_LEN != 0 {
        return Err(CodecError::Misaligned(buf.len()));
    }
    buf.chunks_exact(ORDER_WIRE_LEN).map(decode_order).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order {
            order_id: 42,
            op_code: OpCode::Add,
            symbol: 4,
            quantity: 1,
            price: 151.25,
            direction: Direction::Ask,
            timestamp: 1_700_000_000_123,
        }
    }

    #[test]
    fn test_tick_round_trip() {
        let tick = Tick::new(7, 0.857_31, 0.857_42, 1_700_000_000_000);
        let bytes = encode_tick(&tick);
        assert_eq!(decode_tick(&bytes).unwrap(), tick);
    }

    #[test]
    fn test_order_round_trip() {
        let order = sample_order();
        let bytes = encode_order(&order);
        assert_eq!(decode_order(&bytes).unwrap(), order);
    }

    #[test]
    fn test_batch_round_trip() {
        let mut second = sample_order();
        second.order_id = 43;
        second.direction = Direction::Bid;
        let orders = vec![sample_order(), second];

        let bytes = encode_orders(&orders);
        assert_eq!(bytes.len(), 2 * ORDER_WIRE_LEN);
        assert_eq!(decode_orders(&bytes).unwrap(), orders);
    }

    #[test]
    fn test_tick_layout_is_big_endian() {
        let bytes = encode_tick(&Tick::new(0x0102, 1.0, 2.0, 3));
        assert_eq!(&bytes[0..2], &[0x01, 0x02]);
        assert_eq!(&bytes[2..6], &1.0f32.to_bits().to_be_bytes());
        assert_eq!(bytes[17], 3);
    }

    #[test]
    fn test_truncated_buffer() {
        let bytes = encode_tick(&Tick::new(1, 1.0, 1.0, 1));
        assert_eq!(
            decode_tick(&bytes[..10]).unwrap_err(),
            CodecError::Truncated {
                expected: TICK_WIRE_LEN,
                actual: 10
            }
        );
    }

    #[test]
    fn test_unknown_codes_rejected() {
        let mut bytes = encode_order(&sample_order());
        bytes[15] = 9;
        assert_eq!(decode_order(&bytes).unwrap_err(), CodecError::UnknownDirection(9));

        bytes[4] = 0x7f;
        assert_eq!(decode_order(&bytes).unwrap_err(), CodecError::UnknownOpCode(0x7f));
    }

    #[test]
    fn test_misaligned_batch() {
        assert_eq!(decode_orders(&[0u8; 30]).unwrap_err(), CodecError::Misaligned(30));
    }
}
