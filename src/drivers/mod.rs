//! The two console transports a boot command can be typed on.

pub mod keysym;
pub mod rfb;
pub mod scancode;

pub use keysym::{KeyEventSink, KeysymDriver};
pub use rfb::RfbKeyEvents;
pub use scancode::{ScancodeDriver, ScancodeSink, chunk_scan_codes};
