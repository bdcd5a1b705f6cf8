use std::collections::{HashMap, VecDeque};

use tracing::warn;
use utils::traits::buffer::GenericSequencer;

use crate::{errors::RtpError, packet::RtpTrivialPacket};

/// How many sequence numbers the newest packet may run ahead of the
/// expected one before the gap is declared lost.
pub const DEFAULT_GIVE_UP_AFTER: u16 = 30;
/// Packets further ahead than this are treated as garbage, not reordering.
pub const DEFAULT_REORDER_WINDOW: u16 = 500;

#[derive(Debug, Default, Clone, Copy)]
pub struct RtpSorterStats {
    pub packets_total: u64,
    pub packets_current: u64,
    pub lost_total: u64,
    pub lost_current: u64,
}

/// Reorders incoming RTP packets by their 16 bit sequence number.
///
/// Packets are emitted strictly in sequence order. A gap stalls emission
/// until either the missing packets arrive or a packet more than
/// `give_up_after` numbers past the gap shows up, at which point the
/// missing ones are counted lost and the stream moves on. All distance
/// checks are done modulo 2^16 with signed comparison, so sequence
/// number wraparound needs no special handling anywhere.
#[derive(Debug)]
pub struct RtpSorter {
    give_up_after: u16,
    reorder_window: u16,
    next_sequence_number: Option<u16>,
    buffer: HashMap<u16, RtpTrivialPacket>,
    ready: VecDeque<RtpTrivialPacket>,
    stats: RtpSorterStats,
}

impl Default for RtpSorter {
    fn default() -> Self {
        Self::new(DEFAULT_GIVE_UP_AFTER, DEFAULT_REORDER_WINDOW)
    }
}

impl RtpSorter {
    pub fn new(give_up_after: u16, reorder_window: u16) -> Self {
        Self {
            give_up_after,
            reorder_window,
            next_sequence_number: None,
            buffer: HashMap::new(),
            ready: VecDeque::new(),
            stats: RtpSorterStats::default(),
        }
    }

    pub fn stats(&self) -> RtpSorterStats {
        self.stats
    }

    pub fn next_sequence_number(&self) -> Option<u16> {
        self.next_sequence_number
    }

    /// Clears the per-interval counters, called after each receiver report.
    pub fn reset_interval(&mut self) {
        self.stats.packets_current = 0;
        self.stats.lost_current = 0;
    }

    /// Whether a packet with this sequence number would still be of use.
    pub fn wants(&self, sequence_number: u16) -> bool {
        let Some(expected) = self.next_sequence_number else {
            return true;
        };
        let distance = sequence_number.wrapping_sub(expected) as i16;
        if distance < 0 {
            return false;
        }
        if distance as u16 > self.reorder_window {
            return false;
        }
        !self.buffer.contains_key(&sequence_number)
    }

    fn process(&mut self, packet: RtpTrivialPacket) {
        let sequence_number = packet.header.sequence_number;
        let expected = *self.next_sequence_number.get_or_insert(sequence_number);

        // Anything past the reorder window is garbage, thrown out before
        // it can move the stream position or the loss counters.
        let distance = sequence_number.wrapping_sub(expected) as i16;
        if distance > 0 && distance as u16 > self.reorder_window {
            warn!(
                "rtp packet {} is {} ahead of {}, outside the reorder window",
                sequence_number, distance, expected
            );
            return;
        }

        // A packet far past the current gap means the gap will not fill
        // in time. Walk forward, counting every skipped number as lost,
        // and flush whatever was already buffered along the way.
        while let Some(expected) = self.next_sequence_number
            && (expected.wrapping_sub(sequence_number) as i16) < -(self.give_up_after as i16)
        {
            warn!(
                "giving up on rtp packet {}, proceeding to {}",
                expected,
                expected.wrapping_add(1)
            );
            // a skipped number still counts towards the packet totals,
            // the receiver report derives its loss fraction from both
            self.stats.lost_total += 1;
            self.stats.lost_current += 1;
            self.stats.packets_total += 1;
            self.stats.packets_current += 1;
            self.next_sequence_number = Some(expected.wrapping_add(1));
            self.drain_buffered();
        }

        let expected = match self.next_sequence_number {
            Some(expected) => expected,
            None => return,
        };
        let distance = sequence_number.wrapping_sub(expected) as i16;
        if distance < 0 {
            // Arrived after we already gave up on it. Move it from the
            // lost column to the received one, but it is too late to use.
            warn!("rtp packet {} arrived too late, dropping", sequence_number);
            self.stats.lost_total = self.stats.lost_total.saturating_sub(1);
            self.stats.lost_current = self.stats.lost_current.saturating_sub(1);
            self.stats.packets_total += 1;
            self.stats.packets_current += 1;
            return;
        }
        if distance > 0 {
            self.buffer.entry(sequence_number).or_insert(packet);
            return;
        }

        self.deliver(packet);
        self.drain_buffered();
    }

    fn deliver(&mut self, packet: RtpTrivialPacket) {
        self.next_sequence_number = Some(packet.header.sequence_number.wrapping_add(1));
        self.stats.packets_total += 1;
        self.stats.packets_current += 1;
        self.ready.push_back(packet);
    }

    fn drain_buffered(&mut self) {
        while let Some(expected) = self.next_sequence_number
            && let Some(packet) = self.buffer.remove(&expected)
        {
            self.deliver(packet);
        }
    }
}

impl GenericSequencer for RtpSorter {
    type In = RtpTrivialPacket;
    type Out = RtpTrivialPacket;
    type Error = RtpError;

    fn enqueue(&mut self, packet: Self::In) -> Result<(), Self::Error> {
        self.process(packet);
        Ok(())
    }

    fn try_dump(&mut self) -> Vec<Self::Out> {
        let _span =
            tracing::debug_span!("rtp sorter dump", queue_size = self.ready.len()).entered();
        self.ready.drain(..).collect()
    }
}
