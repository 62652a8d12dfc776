//! End-to-end check that `vgr demo` actually produces a PNG file.
//!
//! Runs the built binary against a scratch directory (`tempfile::tempdir`)
//! rather than writing into the repo or `/tmp` by hand.

use std::process::Command;

#[test]
fn demo_writes_a_readable_png() {
    let dir = tempfile::tempdir().expect("creating scratch dir");
    let out_path = dir.path().join("demo.png");

    let status = Command::new(env!("CARGO_BIN_EXE_vgr"))
        .arg("demo")
        .arg("--out")
        .arg(&out_path)
        .status()
        .expect("spawning vgr demo");
    assert!(status.success());

    let file = std::fs::File::open(&out_path).expect("opening rendered PNG");
    let decoder = png::Decoder::new(file);
    let mut reader = decoder.read_info().expect("reading PNG header");
    assert_eq!(reader.info().color_type, png::ColorType::Rgba);
    assert_eq!(reader.info().bit_depth, png::BitDepth::Eight);

    // The built-in demo scene is a 4x4-tile (64x64px) framebuffer.
    assert_eq!(reader.info().width, 64);
    assert_eq!(reader.info().height, 64);

    let mut buf = vec![0u8; reader.output_buffer_size()];
    reader.next_frame(&mut buf).expect("decoding PNG data");
    assert!(buf.iter().any(|&b| b != 0), "rendered image should not be all-zero");
}
