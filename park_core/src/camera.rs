//! Camera resource manager and frame pipeline.
//!
//! - [`frame`] - Camera lock, driver session generation and the [`frame::FrameBuffer`] guard
//! - [`queue`] - Single-slot overwrite queue between producer and consumers
//! - [`manager`] - On-demand init/deinit state machine
//! - [`pipeline`] - Producer, streaming consumer and snapshot path
//!
//! ```text
//!   STREAM_REQUESTED ──► CameraManager ──► CAMERA_READY
//!                             │ init/deinit
//!                             ▼
//!                    ┌─────────────────┐
//!                    │ CameraResource  │◄──── FrameBuffer::drop (release)
//!                    │ (camera lock)   │
//!                    └────────┬────────┘
//!                             │ capture
//!                             ▼
//!   FrameProducer ──► FrameSlot (cap 1, overwrite) ──► FrameConsumer ──► FrameTransport
//!                                                 └──► snapshot() (priority)
//! ```

pub mod frame;
pub mod manager;
pub mod pipeline;
pub mod queue;
