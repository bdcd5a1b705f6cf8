pub mod codec;
pub mod depacketizer;
pub mod errors;
pub mod header;
pub mod packet;
pub mod packetizer;
pub mod payload_types;
pub mod rtcp;
pub mod sorter;
pub mod timestamp;
mod util;
