//! End-to-end decoder behaviour over the public API

use spectrolink_core::{DecoderConfig, DecoderEvent, PacketDecoder, ParseFault, Sample, SectionKind};

fn feed_lines(decoder: &mut PacketDecoder, lines: &[&str]) -> Vec<DecoderEvent> {
    let mut stream = String::new();
    for line in lines {
        stream.push_str(line);
        stream.push('\n');
    }
    decoder.feed(stream.as_bytes())
}

fn packets(events: &[DecoderEvent]) -> Vec<&spectrolink_core::Packet> {
    events
        .iter()
        .filter_map(|e| match e {
            DecoderEvent::Packet(p) => Some(p.as_ref()),
            _ => None,
        })
        .collect()
}

#[test]
fn single_signal_section_packet() {
    let mut decoder = PacketDecoder::default();
    let events = feed_lines(
        &mut decoder,
        &[
            "---SIGNAL_ORIGINAL_START---",
            "0.0,1.0",
            "0.1,0.9",
            "---SIGNAL_ORIGINAL_END---",
            "---DATA_COMPLETE---",
        ],
    );

    let emitted = packets(&events);
    assert_eq!(emitted.len(), 1);
    let packet = emitted[0];
    assert_eq!(packet.id, 1);
    assert_eq!(
        packet.section(SectionKind::SignalOriginal),
        &vec![Sample::new(0.0, 1.0), Sample::new(0.1, 0.9)]
    );
    for kind in [
        SectionKind::SignalFiltered,
        SectionKind::FftOriginal,
        SectionKind::FftFiltered,
    ] {
        assert!(packet.section(kind).is_empty(), "{kind} should be empty");
    }
}

#[test]
fn spectrum_frequency_is_stored_as_log10() {
    let mut decoder = PacketDecoder::default();
    let events = feed_lines(
        &mut decoder,
        &[
            "---FFT_ORIGINAL_START---",
            "100,5.0",
            "0,3.0",
            "-5,3.0",
            "---FFT_ORIGINAL_END---",
            "---DATA_COMPLETE---",
        ],
    );

    let packet = packets(&events)[0];
    let fft = packet.section(SectionKind::FftOriginal);
    assert_eq!(fft.len(), 1);
    assert!((fft[0].x - 2.0).abs() < 1e-12);
    assert!((fft[0].frequency_hz() - 100.0).abs() < 1e-9);
    assert_eq!(fft[0].y, 5.0);
    assert_eq!(decoder.stats().non_positive_frequency, 2);
}

#[test]
fn malformed_lines_leave_state_untouched() {
    let mut decoder = PacketDecoder::default();
    feed_lines(&mut decoder, &["---SIGNAL_FILTERED_START---", "0.0,2.0"]);

    let events = feed_lines(&mut decoder, &["abc,def", "1.0", "1.0,2.0,3.0"]);
    let faults: Vec<&ParseFault> = events
        .iter()
        .filter_map(|e| match e {
            DecoderEvent::Malformed { fault, .. } => Some(fault),
            _ => None,
        })
        .collect();

    assert_eq!(faults.len(), 3);
    assert!(matches!(faults[0], ParseFault::InvalidNumber { index: 0, .. }));
    assert_eq!(faults[1], &ParseFault::FieldCount(1));
    assert_eq!(faults[2], &ParseFault::FieldCount(3));
    assert_eq!(decoder.open_section(), Some(SectionKind::SignalFiltered));
    assert_eq!(decoder.in_flight().signal_filtered.len(), 1);

    // stream keeps going
    let events = feed_lines(&mut decoder, &["0.1,2.1", "---SIGNAL_FILTERED_END---", "---DATA_COMPLETE---"]);
    assert_eq!(packets(&events)[0].sections.signal_filtered.len(), 2);
}

#[test]
fn ids_increase_without_gaps_even_for_empty_packets() {
    let mut decoder = PacketDecoder::default();
    let events = feed_lines(
        &mut decoder,
        &[
            "---DATA_COMPLETE---",
            "---FFT_FILTERED_START---",
            "10,1.0",
            "---FFT_FILTERED_END---",
            "---DATA_COMPLETE---",
            "---DATA_COMPLETE---",
        ],
    );

    let ids: Vec<u64> = packets(&events).iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(packets(&events)[0].sections.is_empty());
}

#[test]
fn sections_carry_over_until_restarted() {
    let mut decoder = PacketDecoder::default();
    let events = feed_lines(
        &mut decoder,
        &[
            "---SIGNAL_ORIGINAL_START---",
            "0.0,1.0",
            "---SIGNAL_ORIGINAL_END---",
            "---FFT_ORIGINAL_START---",
            "50,1.0",
            "---FFT_ORIGINAL_END---",
            "---DATA_COMPLETE---",
            "---SIGNAL_ORIGINAL_START---",
            "0.0,7.0",
            "---SIGNAL_ORIGINAL_END---",
            "---DATA_COMPLETE---",
        ],
    );

    let emitted = packets(&events);
    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[1].sections.signal_original, vec![Sample::new(0.0, 7.0)]);
    // FFT_ORIGINAL never restarted, so packet 2 still holds packet 1's samples
    assert_eq!(emitted[1].sections.fft_original, emitted[0].sections.fft_original);
}

#[test]
fn reset_flag_clears_unstarted_sections() {
    let mut decoder = PacketDecoder::new(DecoderConfig {
        reset_unstarted_sections_on_complete: true,
        ..Default::default()
    });
    let events = feed_lines(
        &mut decoder,
        &[
            "---FFT_ORIGINAL_START---",
            "50,1.0",
            "---FFT_ORIGINAL_END---",
            "---DATA_COMPLETE---",
            "---DATA_COMPLETE---",
        ],
    );

    let emitted = packets(&events);
    assert_eq!(emitted[0].sections.fft_original.len(), 1);
    assert!(emitted[1].sections.is_empty());
}

#[test]
fn section_length_counts_lines_up_to_next_start() {
    let mut decoder = PacketDecoder::default();
    let events = feed_lines(
        &mut decoder,
        &[
            "---SIGNAL_ORIGINAL_START---",
            "0.0,1.0",
            "0.1,1.1",
            "---SIGNAL_FILTERED_START---",
            "0.0,0.5",
            "---SIGNAL_FILTERED_END---",
            "---SIGNAL_ORIGINAL_END---",
            "0.2,1.2",
            "---DATA_COMPLETE---",
        ],
    );

    let packet = packets(&events)[0];
    assert_eq!(packet.sections.signal_original.len(), 2);
    assert_eq!(packet.sections.signal_filtered.len(), 1);
    let stats = decoder.stats();
    assert_eq!(stats.unmatched_end, 1);
    assert_eq!(stats.outside_section, 1);
}

#[test]
fn chunking_does_not_change_framing() {
    let whole = b"---SIGNAL_ORIGINAL_START---\n0.0,1.0\n---SIGNAL_ORIGINAL_END---\n---DATA_COMPLETE---\n";

    let mut split = PacketDecoder::default();
    assert!(split.feed(b"---SIGNAL_ORIGINAL_STAR").is_empty());
    assert_eq!(split.open_section(), None);
    split.feed(b"T---\n0.0,1.0\n");
    assert_eq!(split.open_section(), Some(SectionKind::SignalOriginal));
    let a = split.feed_packets(b"---SIGNAL_ORIGINAL_END---\n---DATA_COMPLETE---\n");

    let mut at_once = PacketDecoder::default();
    let b = at_once.feed_packets(whole);

    assert_eq!(a.len(), 1);
    assert_eq!(a[0].sections, b[0].sections);
    assert_eq!(split.stats(), at_once.stats());
}

#[test]
fn crlf_and_invalid_utf8_are_tolerated() {
    let mut decoder = PacketDecoder::default();
    let mut stream = b"---SIGNAL_ORIGINAL_START---\r\n0.0,\xff1.0\r\n".to_vec();
    stream.extend_from_slice(b"---SIGNAL_ORIGINAL_END---\r\n---DATA_COMPLETE---\r\n");

    let emitted = decoder.feed_packets(&stream);
    assert_eq!(emitted[0].sections.signal_original, vec![Sample::new(0.0, 1.0)]);
}

#[test]
fn runaway_line_is_capped() {
    let mut decoder = PacketDecoder::new(DecoderConfig {
        max_line_bytes: 32,
        ..Default::default()
    });

    let events = decoder.feed(&[b'9'; 100]);
    assert!(matches!(events[..], [DecoderEvent::Overflow { .. }]));
    assert!(decoder.pending_bytes() <= 32);

    // rest of the runaway line is skipped, the next line decodes normally
    let emitted = decoder.feed_packets(b"999\n---DATA_COMPLETE---\n");
    assert_eq!(emitted.len(), 1);
    assert_eq!(decoder.stats().overflows, 1);
    assert_eq!(decoder.stats().malformed, 0);
}
