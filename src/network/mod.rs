pub mod address;
pub mod capture;
pub mod checksum;
pub mod classify;
pub mod craft;
pub mod filter;
pub mod injection;
pub mod packet;

pub use capture::{deliver, CaptureState, CapturedFrame, PacketCapture};
pub use classify::{classify, PacketKind, PacketSummary};
pub use craft::{build_frame, send_kind, SendKind};
pub use filter::FilterOptions;
pub use injection::{FrameSink, PacketInjector};
pub use packet::{Frame, Layer, LinkType};
