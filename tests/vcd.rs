use std::fs::File;

use irblip::decode;
use irblip::encode;
use irblip::vcdutils::{vcdfile_to_intervals, VcdWriter};
use irblip_driver::{encoder, Command, Protocol};

#[test]
fn encoded_frame_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nec.vcd");

    let frame = encode::command(Command::Nec(0x20DF_10EF), Some(&path)).unwrap();
    let read = vcdfile_to_intervals(&path).unwrap();
    assert_eq!(&read[..], &frame[..]);

    let codes = decode::command(&path).unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].protocol, Protocol::Nec);
    assert_eq!(codes[0].value, 0x20DF_10EF);
    assert!(codes[0].valid);
}

#[test]
fn several_frames_in_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.vcd");

    {
        let file = File::create(&path).unwrap();
        let mut writer = VcdWriter::new(file);
        writer.init().unwrap();
        writer.write_intervals(&encoder::encode(Command::Sony(0x95))).unwrap();
        writer.write_intervals(&encoder::rc5(0x0ABC)).unwrap();
        // Ends on a mark
        writer.write_intervals(&[500, 500, 500]).unwrap();
    }

    let codes = decode::command(&path).unwrap();
    let found: Vec<_> = codes.iter().map(|c| (c.protocol, c.value)).collect();
    assert_eq!(
        found,
        vec![
            (Protocol::Sony, 0x95),
            (Protocol::Rc5, 0x3FFF),
            (Protocol::Raw, 0)
        ]
    );
}

#[test]
fn missing_wire_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.vcd");
    std::fs::write(
        &path,
        "$timescale 1 us $end\n$scope module top $end\n$var wire 1 ! data $end\n$upscope $end\n$enddefinitions $end\n",
    )
    .unwrap();

    assert!(vcdfile_to_intervals(&path).is_err());
}
