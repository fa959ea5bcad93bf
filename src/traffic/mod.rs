//! 流量模型
//!
//! 数据包、时间、入口报文，以及合成流量生成器。

mod generator;
mod packet;
mod time;
mod wire;

pub use generator::{APP_TYPES, TrafficGenerator};
pub use packet::{Packet, PriorityClass};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use wire::{IngressRequest, IngressStatus, RawPacket};
