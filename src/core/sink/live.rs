//! Live view of the most recent packet
//!
//! A renderer polls [`LatestPacket`] from its own thread; the sink side only
//! swaps an `Arc`, so a slow frame never holds up decoding.

use super::{PacketSink, SinkError};
use crate::core::packet::{Packet, SectionKind};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared handle to the latest packet
#[derive(Clone, Default)]
pub struct LatestPacket {
    latest: Arc<RwLock<Option<Arc<Packet>>>>,
    updates: Arc<AtomicU64>,
}

impl LatestPacket {
    /// Empty handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent packet, if any
    pub fn latest(&self) -> Option<Arc<Packet>> {
        self.latest.read().clone()
    }

    /// Number of packets seen; lets a renderer skip redraws
    pub fn generation(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    /// Plot-ready points of one section
    ///
    /// Spectrum x values stay in log10 units, ready for a logarithmic axis.
    pub fn series(&self, kind: SectionKind) -> Vec<[f64; 2]> {
        self.latest
            .read()
            .as_ref()
            .map(|p| p.section(kind).iter().map(|s| [s.x, s.y]).collect())
            .unwrap_or_default()
    }

    /// Forget the current packet
    pub fn clear(&self) {
        *self.latest.write() = None;
    }
}

impl PacketSink for LatestPacket {
    fn name(&self) -> &str {
        "live"
    }

    fn on_packet(&mut self, packet: &Packet) -> Result<(), SinkError> {
        *self.latest.write() = Some(Arc::new(packet.clone()));
        self.updates.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
