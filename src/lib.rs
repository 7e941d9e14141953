pub mod core;
pub mod decoder;
pub mod messages;
pub mod order_book;
pub mod pipeline;

pub use decoder::WireDecoder;
pub use messages::{BookSnapshot, MsgKind, RawPacket, Side, WireMessage};
pub use order_book::OrderBook;
pub use pipeline::{Pipeline, PipelineConfig, PipelineStats, SnapshotSink};
