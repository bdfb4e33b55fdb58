//! The protocol client seam.
//!
//! A client owns the wire-side state of its channels and reports
//! everything back as deep-copied [`ProtocolEvent`]s drained by
//! `poll()` on the UI thread. Nothing in `poll()` may block; the one
//! blocking operation, `wait_connected`, exists solely for the
//! temporary-channel put path and is bounded by its timeout.

use std::time::Duration;

use core_events::{ClientChannelId, ProtocolEvent};
use core_pv::{MonitorMask, RequestType};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("client context is not available")]
    ContextUnavailable,
    #[error("channel create failed for {0:?}")]
    CreateFailed(String),
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
    #[error("get failed: {0}")]
    GetFailed(String),
    #[error("put rejected: {0}")]
    PutRejected(String),
    #[error("channel {0:?} is unknown to this client")]
    UnknownChannel(u64),
}

/// Subscription parameters for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub requested_type: RequestType,
    /// 0 means native count.
    pub element_count: usize,
    pub mask: MonitorMask,
}

/// The write flavors the put path supports.
#[derive(Debug, Clone, PartialEq)]
pub enum PutValue {
    Double(f64),
    Text(String),
    EnumOrdinal(u16),
    CharArray(Vec<u8>),
    DoubleArray(Vec<f64>),
}

/// Wire-side operations the channel manager needs. One instance per
/// protocol context.
pub trait ProtocolClient: Send {
    /// Begin connecting `name`. `id` tags every event the client will
    /// ever emit for this channel. For PVA, `name` is the channel part
    /// only and `request_path` the unindexed field selector.
    fn create_channel(
        &mut self,
        id: ClientChannelId,
        name: &str,
        request_path: &str,
    ) -> Result<(), ClientError>;

    /// Tear a channel down. Events already queued for it may still be
    /// drained afterwards; the dispatcher discards them by id.
    fn clear_channel(&mut self, id: ClientChannelId);

    /// Establish the value/alarm monitor.
    fn subscribe(&mut self, id: ClientChannelId, request: SubscribeRequest)
        -> Result<(), ClientError>;

    /// One-shot control-info request (limits/precision or enum
    /// labels, by native type).
    fn request_control_info(&mut self, id: ClientChannelId) -> Result<(), ClientError>;

    /// Issue a write on a connected channel.
    fn put(&mut self, id: ClientChannelId, value: PutValue) -> Result<(), ClientError>;

    /// Drain pending events. Never blocks.
    fn poll(&mut self) -> Vec<ProtocolEvent>;

    /// Bounded wait for a channel to reach the connected state. Only
    /// the temporary-channel put path may call this.
    fn wait_connected(&mut self, id: ClientChannelId, timeout: Duration) -> bool;
}
