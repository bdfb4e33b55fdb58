//! Shared PV channels.
//!
//! This crate sits between the widget runtimes and the protocol
//! clients. [`ChannelHub`] deduplicates subscriptions by
//! (name, requested type, element count), caches the last known
//! [`core_pv::ChannelData`] per channel, gates notification rate, and
//! fans events out to widget callbacks on the UI thread. The
//! [`ProtocolClient`] trait is the seam to the wire; the in-tree
//! implementation is an in-process PV host ([`SimHost`]) whose
//! externally observable behavior (asynchronous connection, monitors,
//! access rights, absent PVs that never connect) matches a network
//! client against a real server population.

mod client;
mod context;
mod manager;
mod sim;

pub use client::{ClientError, ProtocolClient, PutValue, SubscribeRequest};
pub use context::{ClientFactory, ProtocolContext, CA_POLL_INTERVAL, PVA_POLL_INTERVAL};
pub use manager::{
    ChannelHub, ChannelSummary, HubConfig, PutOutcome, SubscriberCallbacks, SubscriptionHandle,
    MIN_NOTIFY_INTERVAL,
};
pub use sim::{SimHost, SimPv, SimValue};
