//! End-to-end viewer runs against a local socket feed

use frame_pump::{ProducerExit, SourceSpec};
use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;
use streamview::{run, Settings};

fn frames(count: usize, frame_size: usize) -> Vec<u8> {
    (0..count * frame_size)
        .flat_map(|i| (i as f32).to_ne_bytes())
        .collect()
}

fn serve(payload: Vec<u8>, chunk: usize) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || {
        let (mut conn, _) = listener.accept().unwrap();
        for piece in payload.chunks(chunk) {
            conn.write_all(piece).unwrap();
        }
    });
    (addr, server)
}

#[tokio::test]
async fn drains_whole_stream_then_stops() {
    let (addr, server) = serve(frames(100, 8), 13);
    let settings = Settings {
        frame_size: 8,
        capacity_frames: 256,
        source: SourceSpec::Tcp(addr),
        tick_rate_hz: 200.0,
        ..Default::default()
    };

    let summary = tokio::time::timeout(Duration::from_secs(10), run(settings))
        .await
        .expect("viewer did not finish")
        .unwrap();
    server.join().unwrap();

    assert!(matches!(summary.producer.exit, ProducerExit::EndOfStream));
    assert_eq!(summary.consumer.frames, 100);
    assert_eq!(summary.ring.dropped_frames, 0);
    assert!(summary.ring.eof);
    assert_eq!(summary.sink.min, Some(0.0));
    assert_eq!(summary.sink.max, Some(799.0));
}

#[tokio::test]
async fn small_ring_keeps_newest_frames() {
    // Whole payload arrives in one write, far more than the ring holds
    let (addr, server) = serve(frames(64, 4), usize::MAX);
    let settings = Settings {
        frame_size: 4,
        capacity_frames: 4,
        source: SourceSpec::Tcp(addr),
        read_chunk_bytes: 4096,
        tick_rate_hz: 5.0,
        ..Default::default()
    };

    let summary = tokio::time::timeout(Duration::from_secs(10), run(settings))
        .await
        .expect("viewer did not finish")
        .unwrap();
    server.join().unwrap();

    assert_eq!(
        summary.consumer.frames + summary.ring.dropped_frames,
        64
    );
    assert!(summary.ring.dropped_frames > 0);
    assert_eq!(summary.sink.max, Some(255.0));
}
