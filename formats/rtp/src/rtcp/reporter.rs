use std::time::SystemTime;

use crate::{errors::RtpResult, sorter::RtpSorter};

use super::{
    receiver_report::RtcpReceiverReport, report_block::ReportBlock,
    sender_report::RtcpSenderReport,
};

/// Builds the periodic sender and receiver reports for one SSRC.
///
/// Receiver reports only fill in the loss fields. Interarrival jitter,
/// last-SR and delay-since-last-SR are always written as zero, which
/// RFC 3550 defines as "not available".
#[derive(Debug, Clone, Copy)]
pub struct RtcpReporter {
    ssrc: u32,
}

impl RtcpReporter {
    pub fn new(ssrc: u32) -> Self {
        Self { ssrc }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// A 28 byte sender report with no report blocks, stamped with the
    /// wallclock time of the call.
    pub fn sender_report(
        &self,
        rtp_timestamp: u32,
        sent_packets: u32,
        sent_bytes: u32,
    ) -> RtpResult<RtcpSenderReport> {
        RtcpSenderReport::builder()
            .ssrc(self.ssrc)
            .ntp(SystemTime::now().into())
            .rtp_timestamp(rtp_timestamp)
            .sender_packet_count(sent_packets)
            .sender_octet_count(sent_bytes)
            .build()
    }

    /// A 32 byte receiver report with a single block describing `media_ssrc`,
    /// filled from the sorter's loss statistics. The per-interval counters
    /// are reset afterwards, so each report covers the span since the last.
    pub fn receiver_report(
        &self,
        media_ssrc: u32,
        sorter: &mut RtpSorter,
    ) -> RtpResult<RtcpReceiverReport> {
        let stats = sorter.stats();
        let lost = stats.lost_current;
        let mut received = stats.packets_current;
        if lost + received == 0 {
            received = 1;
        }
        let fraction_lost_byte = (lost * 255 / (lost + received)) as u8;
        let cumulative_lost = stats.lost_total.min(0x7F_FFFF) as i32;
        let cycles = ((stats.packets_total >> 16) & 0xFFFF) as u16;
        let highest = sorter.next_sequence_number().unwrap_or(0);

        let report = RtcpReceiverReport::builder()
            .ssrc(self.ssrc)
            .report_block(
                ReportBlock::builder()
                    .ssrc(media_ssrc)
                    .fraction_lost(fraction_lost_byte as f64 / 256.0)
                    .cumulative_packet_lost(cumulative_lost)
                    .highest_sequence_number_cycles(cycles)
                    .highest_sequence_number_received(highest)
                    .build(),
            )
            .build()?;

        sorter.reset_interval();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RtpTrivialPacket;
    use utils::bytes::writable_to_bytes;
    use utils::traits::buffer::GenericSequencer;

    fn sorter_after(sequence_numbers: &[u16]) -> RtpSorter {
        let mut sorter = RtpSorter::default();
        for sequence_number in sequence_numbers {
            let packet = RtpTrivialPacket::builder()
                .sequence_number(*sequence_number)
                .payload(&[0])
                .build();
            sorter.enqueue(packet).unwrap();
        }
        sorter.try_dump();
        sorter
    }

    #[test]
    fn test_sender_report_carries_counters() {
        let reporter = RtcpReporter::new(0x1234);
        let report = reporter.sender_report(90_000, 25, 2500).unwrap();
        assert_eq!(report.sender_ssrc, 0x1234);
        assert_eq!(report.sender_info.rtp_timestamp, 90_000);
        assert_eq!(report.sender_info.sender_packet_count, 25);
        assert_eq!(report.sender_info.sender_octet_count, 2500);
        assert_eq!(writable_to_bytes(&report).unwrap().len(), 28);
    }

    #[test]
    fn test_receiver_report_from_lossy_interval() {
        let reporter = RtcpReporter::new(1);
        let mut sorter = sorter_after(&[0, 1, 40]);

        let report = reporter.receiver_report(2, &mut sorter).unwrap();
        assert_eq!(writable_to_bytes(&report).unwrap().len(), 32);
        let block = &report.report_blocks[0];
        assert_eq!(block.ssrc, 2);
        // 2 delivered + 8 skipped counted, 8 of 18 lost: 8 * 255 / 18
        assert_eq!((block.fraction_lost * 256.0) as u8, 113);
        assert_eq!(block.cumulative_packet_lost, 8);
        assert_eq!(block.highest_sequence_number_received, 10);
        assert_eq!(block.interarrival_jitter, 0);
        assert_eq!(block.delay_since_last_sender_report, 0);

        // interval counters start over, totals stay
        assert_eq!(sorter.stats().lost_current, 0);
        assert_eq!(sorter.stats().lost_total, 8);
    }

    #[test]
    fn test_receiver_report_with_no_traffic() {
        let reporter = RtcpReporter::new(1);
        let mut sorter = RtpSorter::default();
        let report = reporter.receiver_report(2, &mut sorter).unwrap();
        let block = &report.report_blocks[0];
        assert_eq!(block.fraction_lost, 0.0);
        assert_eq!(block.cumulative_packet_lost, 0);
    }
}
