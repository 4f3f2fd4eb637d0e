#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use stream_protocol::FrameCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes through the frame decoder, including the EOF
    // path, and drain any complete frames it yields.
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
    let _ = codec.decode_eof(&mut buf);
});
