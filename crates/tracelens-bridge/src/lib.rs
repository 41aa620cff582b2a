//! Bridges between the app and external tools.
//!
//! - [`CrossToolProtocol`]: exchanges timestamps and bugreports with a
//!   companion tool over a line-oriented JSON channel.
//! - [`AbtExtensionProtocol`]: fetches issue attachments on startup.

mod cross_tool;
mod errors;
mod extension;

pub use cross_tool::{CrossToolMessage, CrossToolProtocol};
pub use errors::BridgeError;
pub use extension::{AbtExtensionProtocol, AttachmentSource, DirectoryAttachmentSource};
