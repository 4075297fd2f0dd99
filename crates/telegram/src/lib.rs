//! Telegram boundary for leadline:
//! - **Updates** (`update`) - inbound Bot API payload decoding and
//!   classification into dialogue events
//! - **Keyboards** (`keyboards`) - inline keyboard builders for the segment
//!   menu and the brief confirmation
//! - **Transport** (`transport`) - outbound Bot API calls (send message,
//!   send buttons, acknowledge callback)
//! - **Notifier** (`notifier`) - operator alert delivery over the transport
//! - **Router** (`router`) - glue from one raw update to engine replies
//!
//! # Architecture
//!
//! ```text
//! Webhook update → classify → DialogueEngine → replies → ChatTransport
//!                                   ↓
//!                        operator alert on completion
//! ```

pub mod keyboards;
pub mod notifier;
pub mod router;
pub mod transport;
pub mod update;
