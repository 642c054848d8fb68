use std::fs;
use std::io::Cursor;

use crc::{Crc, CRC_32_MPEG_2};
use nitscan::report::Format;
use nitscan::scanner::{run, scan_reader, Options};
use nitscan::ScanConfig;

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

fn entry(tsid: u16) -> Vec<u8> {
    let mut e = vec![(tsid >> 8) as u8, tsid as u8, 0x00, 0x04, 0xF0, 0x12];
    e.extend_from_slice(&[0x41, 0x03, 0x00, tsid as u8, 0x01]);
    e.extend_from_slice(&[
        0x43, 0x0B, 0x01, 0x17, 0x27, 0x48, 0x01, 0x10, 0x88, 0x02, 0x88, 0x60, 0x08,
    ]);
    e
}

fn nit_section(version: u8, tsids: &[u16]) -> Vec<u8> {
    let entries: Vec<u8> = tsids.iter().flat_map(|&t| entry(t)).collect();
    let section_length = 9 + entries.len() + 4;
    let mut s = vec![
        0x40,
        0xF0 | (section_length >> 8) as u8,
        section_length as u8,
        0x00,
        0x04,
        0xC1 | (version << 1),
        0x00,
        0x00,
        0xF0,
        0x00,
        0xF0 | (entries.len() >> 8) as u8,
        entries.len() as u8,
    ];
    s.extend(entries);
    let crc = CRC_MPEG.checksum(&s);
    s.extend_from_slice(&crc.to_be_bytes());
    s
}

fn packets(pid: u16, section: &[u8]) -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend_from_slice(section);
    let mut out = Vec::new();
    for (i, chunk) in payload.chunks(184).enumerate() {
        let pusi = if i == 0 { 0x40 } else { 0x00 };
        out.extend_from_slice(&[0x47, pusi | (pid >> 8) as u8, pid as u8, 0x10 | (i % 16) as u8]);
        out.extend_from_slice(chunk);
        out.resize(out.len() + 184 - chunk.len(), 0xFF);
    }
    out
}

fn null_packet() -> Vec<u8> {
    let mut p = vec![0xFF; 188];
    p[..4].copy_from_slice(&[0x47, 0x1F, 0xFF, 0x10]);
    p
}

/// Garbage, filler, a three-packet NIT, more filler
fn capture(tsids: &[u16]) -> Vec<u8> {
    let mut ts = vec![0x12, 0x47, 0x00];
    ts.extend(null_packet());
    ts.extend(packets(0x0010, &nit_section(3, tsids)));
    for _ in 0..4 {
        ts.extend(null_packet());
    }
    ts
}

fn bs_tsids() -> Vec<u16> {
    let mut tsids = vec![0x4010, 0x4011, 0x4631, 0x4632];
    // pad the loop so the section spans three packets
    tsids.extend((0..12).map(|i| 0x4030 + i * 0x20));
    tsids
}

#[test]
fn finds_nit_regardless_of_read_size() {
    let data = capture(&bs_tsids());
    for size in [1, 7, 188, 1000, 188 * 1024] {
        let entries = scan_reader(Cursor::new(&data), &ScanConfig::default(), size).unwrap();
        assert_eq!(entries.len(), 16, "read size {size}");
        assert_eq!(entries[2].transport_stream_id, 0x4631);
    }
}

#[test]
fn missing_nit_is_an_error() {
    let mut data = Vec::new();
    for _ in 0..10 {
        data.extend(null_packet());
    }
    let err = scan_reader(Cursor::new(data), &ScanConfig::default(), 4096).unwrap_err();
    assert_eq!(err.to_string(), "NIT packets not found. Check recorded channel or time.");
}

#[test]
fn writes_channel_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bs.ts");
    let output = dir.path().join("BonDriver_DVB-S.conf");
    fs::write(&input, capture(&bs_tsids())).unwrap();

    run(Options {
        input: input.clone(),
        output: Some(output.clone()),
        format: Format::BonDvb,
        ..Default::default()
    })
    .unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("#ISDB_S\n; BS\nBS01/TS0\t0\t0\t0x4010\nBS01/TS1\t1\t0\t0x4011\n"));
    // 0x4631: BS3 relative TS 1
    assert!(text.contains("BS03/TS1\t"));
    assert!(text.contains("\n; CS110\nND02\t"));
}

#[test]
fn writes_json_registry() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bs.ts");
    let output = dir.path().join("tsids.json");
    fs::write(&input, capture(&[0x4010, 0x40F1, 0x40F2])).unwrap();

    run(Options {
        input,
        output: Some(output.clone()),
        ..Default::default()
    })
    .unwrap();

    let value: serde_json::Value = serde_json::from_slice(&fs::read(&output).unwrap()).unwrap();
    let bs15 = &value["BS"][7];
    assert_eq!(bs15["transponder"], "BS15");
    assert_eq!(bs15["has_lock"], true);
    assert_eq!(bs15["transport_stream_id"][1], 0x40F1);
    assert_eq!(bs15["transport_stream_id"][2], 0x40F2);
    assert_eq!(value["BS"][1]["has_lock"], false);
}

#[test]
fn wrong_network_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bs.ts");
    fs::write(&input, capture(&[0x4010])).unwrap();

    let err = run(Options {
        input,
        output: Some(dir.path().join("out.json")),
        scan: ScanConfig {
            network_id: 0x0006,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap_err();
    assert!(err.to_string().starts_with("NIT packets not found"));
    assert!(!dir.path().join("out.json").exists());
}
