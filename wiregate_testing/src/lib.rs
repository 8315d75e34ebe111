//! Test doubles for driving a [`SessionHandler`](wiregate::SessionHandler)
//! without a real transport.
//!
//! [`MockSession`] stands in for a connection whose write backlog the test
//! controls, [`TestPacket`] is a minimal packet, and [`RecordingDispatcher`]
//! records what reaches the broker side and can stall or fail on request.
//!
//! ```rust
//! use wiregate::SessionHandler;
//! use wiregate_testing::{MockSession, RecordingDispatcher, TestPacket};
//!
//! # async fn example() {
//! let handler = SessionHandler::builder(RecordingDispatcher::default())
//!     .build()
//!     .unwrap();
//! let session = MockSession::new(1);
//! handler
//!     .message_received(&session, TestPacket::new(7, "hello"))
//!     .await
//!     .unwrap();
//! handler.dispatcher().wait_for(1).await;
//! # }
//! ```

pub mod dispatcher;
pub mod logging;
pub mod packet;
pub mod session;

pub use dispatcher::RecordingDispatcher;
pub use logging::{LoggerHandle, logger};
pub use packet::TestPacket;
pub use session::MockSession;
