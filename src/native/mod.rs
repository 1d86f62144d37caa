//! Browser Native Messaging host.
//!
//! The browser starts this process and talks to it over stdin and stdout
//! using length-prefixed JSON frames. Each request frame gets exactly one
//! response frame, in order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Native Host                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐  │
//! │   │    Codec    │───▶│    Host     │───▶│   Dispatcher    │  │
//! │   │  (framing)  │◀───│   (loop)    │◀───│   (actions)     │  │
//! │   └─────────────┘    └─────────────┘    └─────────────────┘  │
//! │          │                                   │        │      │
//! │          ▼                                   ▼        ▼      │
//! │   ┌─────────────┐                   ┌────────────┐ ┌──────┐  │
//! │   │ stdin/stdout│                   │PathResolver│ │ demo │  │
//! │   └─────────────┘                   └────────────┘ └──────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Framing faults end the host. Everything else becomes a failure response
//! and the loop continues.

pub mod codec;
pub mod dispatcher;
pub mod host;
pub mod protocol;

pub use codec::{read_frame, write_frame, FramingError};
pub use dispatcher::Dispatcher;
pub use host::{HostState, NativeHost};
pub use protocol::{Action, Request, Response, Status};
