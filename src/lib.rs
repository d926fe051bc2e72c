//! # bootcommand
//!
//! Boot command macros for typing at a virtual machine console.
//!
//! Unattended OS installers are usually started by typing a few keystrokes at
//! the boot menu. A boot command describes those keystrokes as a short macro,
//! and a [`Driver`] types it on a console: either raw PC/AT scancodes
//! ([`ScancodeDriver`]) or RFB key events ([`KeysymDriver`]).
//!
//! ## Quick start
//!
//! ```no_run
//! use bootcommand::drivers::{ScancodeDriver, ScancodeSink};
//! use bootcommand::parse_str;
//! use tokio_util::sync::CancellationToken;
//!
//! struct VBoxManage;
//!
//! #[async_trait::async_trait(?Send)]
//! impl ScancodeSink for VBoxManage {
//!     async fn send_codes(&mut self, _codes: &[String]) -> anyhow::Result<()> {
//!         // controlvm <vm> keyboardputscancode <codes...>
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let seq = parse_str("<esc><wait>install auto=true<enter>")?;
//!     let mut driver = ScancodeDriver::new(VBoxManage);
//!     seq.execute(&CancellationToken::new(), &mut driver).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Macro syntax
//!
//! | Expression | Description |
//! |------------|-------------|
//! | `abc` | Type each character (press and release) |
//! | `<enter>`, `<f10>`, `<up>` | Press and release a special key |
//! | `<leftCtrlOn>` / `<leftCtrlOff>` | Hold / release a special key |
//! | `<aOn>` / `<aOff>` | Hold / release a character |
//! | `<wait>` | Pause one second |
//! | `<wait10>` | Pause ten seconds |
//! | `<wait1m30s>` | Pause for a duration (`h`, `m`, `s`, `ms`, `us`, `ns`) |
//!
//! Special keys: `bs`, `del`, `enter`, `esc`, `f1`-`f12`, `return`, `tab`,
//! `up`, `down`, `left`, `right`, `spacebar`, `insert`, `home`, `end`,
//! `pageUp`, `pageDown`, `leftAlt`, `leftCtrl`, `leftShift`, `rightAlt`,
//! `rightCtrl`, `rightShift`, `leftSuper`, `rightSuper`. Names, `wait`,
//! `On` and `Off` are case-insensitive.
//!
//! Every `<` opens a bracket expression; anything that is not one of the
//! forms above is a parse error. To type a literal `<`, hold and release it:
//! `<<On><<Off>`.
//!
//! ## Writing a driver
//!
//! Implement [`Driver`] to type on another kind of console:
//!
//! ```no_run
//! use bootcommand::{Driver, KeyAction, Result};
//! use async_trait::async_trait;
//!
//! pub struct Printer;
//!
//! #[async_trait(?Send)]
//! impl Driver for Printer {
//!     async fn send_key(&mut self, key: char, action: KeyAction) -> Result<()> {
//!         println!("{key} {action}");
//!         Ok(())
//!     }
//!
//!     async fn send_special(&mut self, name: &str, action: KeyAction) -> Result<()> {
//!         println!("<{name}> {action}");
//!         Ok(())
//!     }
//! }
//! ```

pub mod config;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod expressions;
pub mod parser;
pub mod sequence;

pub use config::{BootConfig, RawBootConfig};
pub use driver::{Driver, KeyAction};
pub use drivers::{KeysymDriver, ScancodeDriver};
pub use error::{Error, Result};
pub use expressions::Expression;
pub use parser::{parse_duration, parse_file, parse_lines, parse_str};
pub use sequence::ExpressionSequence;
