//! 出队调度与转发

mod dispatcher;
mod sink;

pub use dispatcher::{Dispatcher, TickOutcome};
pub use sink::{ForwardOutcome, PacketSink};
