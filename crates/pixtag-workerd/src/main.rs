use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use pixtag_backend::{amqp::AmqpConnector, gridfs::GridFsStore, serving::ServingClassifier};
use pixtag_core::{
    consumer::Consumer,
    labels::load_label_index,
    pipeline::JobPipeline,
    queue::{ConnectorHandle, QueueConnector},
    store::{ContentStore, StoreHandle, TimedStore},
    supervisor::{SuperviseError, supervise},
};
use pixtag_model::config::WorkerConfig;
use pixtag_observe::{LoggerConfig, Subscriber, init_local_offset, init_logger};
use pixtag_prometheus::PrometheusMetrics;
use taskvisor::Subscribe;

mod http;

fn main() -> anyhow::Result<()> {
    // local offset must be read before any worker thread exists
    init_local_offset();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(run())
}

async fn run() -> anyhow::Result<()> {
    // 1) logger
    let log_cfg = LoggerConfig::from_lookup(|k| std::env::var(k).ok())?;
    init_logger(&log_cfg)?;

    // 2) config
    let cfg = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!(queue = %cfg.queue.queue, db = %cfg.store.database, bucket = %cfg.store.bucket, top_k = cfg.top_k, "configuration loaded");

    // 3) label index
    let index = load_label_index(&cfg.label_index_path)?;

    // 4) store
    let gridfs = GridFsStore::connect(&cfg.store)
        .await
        .context("content store unavailable")?;
    let store = TimedStore::new(gridfs, cfg.store.timeout_ms);
    store.ping().await.context("content store unavailable")?;
    let store: StoreHandle = Arc::new(store);
    info!(store = store.name(), "content store reachable");

    // 5) queue; ping declares without consuming so no delivery is touched
    let connector = AmqpConnector::new(cfg.queue.clone());
    connector.ping().await.context("queue broker unavailable")?;
    let connector: ConnectorHandle = Arc::new(connector);
    info!(broker = connector.name(), "queue broker reachable");

    // 6) classifier
    let classifier = Arc::new(ServingClassifier::new(&cfg.inference)?);
    info!(url = classifier.url(), "inference client ready");

    // 7) metrics
    let metrics = PrometheusMetrics::new().context("failed to register metrics")?;
    if let Some(addr) = cfg.metrics_addr {
        http::spawn_metrics_server(addr, metrics.clone()).await?;
    }

    // 8) pipeline + consumer
    let pipeline = JobPipeline::new(
        store,
        classifier,
        Arc::new(index),
        cfg.normalize,
        cfg.top_k,
    )
    .with_metrics(Arc::new(metrics));
    let consumer = Arc::new(Consumer::new(connector, Arc::new(pipeline)));

    // 9) supervise until shutdown or a fatal condition
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Subscriber)];
    match supervise(consumer, &cfg.consumer, subscribers).await {
        Ok(()) => {
            info!("worker stopped");
            Ok(())
        }
        Err(e @ SuperviseError::Fatal(_)) => {
            error!(error = %e, "worker stopped on fatal condition");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
