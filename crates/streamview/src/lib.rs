//! Streamview
//!
//! Reads a live stream of fixed-size numeric frames from a pipe or socket on a
//! producer thread and drains it at a fixed render rate.

use anyhow::Context;
use frame_pump::{Consumer, ConsumerStats, ProducerHandle, ProducerReport};
use frame_ring::{RingStats, SharedRingBuffer};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod settings;
mod sink;

pub use settings::{Settings, SettingsError, CONFIG_PATH_VAR, ENV_PREFIX, MAX_TICK_RATE_HZ};
pub use sink::{SinkSummary, StatsSink};

/// Outcome of a viewer run
#[derive(Debug)]
pub struct RunSummary {
    pub producer: ProducerReport,
    pub consumer: ConsumerStats,
    pub ring: RingStats,
    pub sink: SinkSummary,
}

/// Initialize logging
pub fn init_logging(level: Level, json: bool) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("Failed to set tracing subscriber")
}

/// Run the viewer until the stream ends, the producer fails, or Ctrl-C
pub async fn run(settings: Settings) -> anyhow::Result<RunSummary> {
    let geometry = settings.geometry();
    let ring = SharedRingBuffer::with_geometry(geometry)?;
    info!(
        frame_size = geometry.frame_size,
        capacity_frames = geometry.capacity_frames,
        element = %settings.element_type,
        "Ring buffer ready"
    );

    let opened = settings.source.open(&settings.spectrum_config())?;
    let producer = ProducerHandle::spawn(opened.reader, ring.clone(), settings.producer_config())?;
    let producer = match opened.interrupter {
        Some(interrupter) => producer.with_interrupter(interrupter),
        None => producer,
    };

    let sink = StatsSink::new(
        settings.element_type,
        settings.frame_size,
        settings.report_interval(),
    );
    let mut consumer = Consumer::new(ring.clone(), sink, settings.consumer_config())?;

    let mut ticker = tokio::time::interval(settings.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(tick_rate_hz = settings.tick_rate_hz, "Render loop started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Read before draining: EOF seen here means everything the
                // producer appended is already in the ring. A finished
                // producer has already set EOF if it reached it.
                let producer_done = producer.is_finished();
                let closed = consumer.source_closed();
                let frames = consumer.tick()?;
                if frames > 0 {
                    continue;
                }
                if closed {
                    info!("Stream ended");
                    break;
                }
                if producer_done {
                    warn!("Producer stopped before end of stream");
                    break;
                }
            }
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    let report = tokio::task::spawn_blocking(move || producer.shutdown())
        .await
        .context("Producer join task failed")??;

    let summary = RunSummary {
        producer: report,
        consumer: consumer.stats(),
        ring: ring.stats(),
        sink: consumer.into_sink().summary(),
    };
    info!(
        frames = summary.consumer.frames,
        dropped = summary.ring.dropped_frames,
        bytes = summary.producer.bytes,
        "Render loop finished"
    );
    Ok(summary)
}
