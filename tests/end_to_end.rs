use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use filewatch_exporter::{
    Event, EventBus, FileInfo, FileWatcherConfig, FileWatcherListener, LogSink, MetricSample,
    MetricsConfig, MetricsSink, PrometheusSink, Result, ServiceHandle, Topic, WatchMetricData,
};
use parking_lot::Mutex;

/// Records every batch and record handed to it
#[derive(Default)]
struct RecordingSink {
    metrics: Mutex<Vec<Vec<MetricSample>>>,
    records: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    fn metric_batches(&self) -> Vec<Vec<MetricSample>> {
        self.metrics.lock().clone()
    }

    fn log_records(&self) -> Vec<Vec<u8>> {
        self.records.lock().clone()
    }
}

impl MetricsSink for RecordingSink {
    fn publish(&self, _topic: Topic, samples: &[MetricSample]) -> Result<()> {
        self.metrics.lock().push(samples.to_vec());
        Ok(())
    }
}

impl LogSink for RecordingSink {
    fn export(&self, _topic: Topic, payload: &[u8]) -> Result<()> {
        self.records.lock().push(payload.to_vec());
        Ok(())
    }
}

fn watch(pipeline: &str, source: &str, files: Vec<FileInfo>) -> WatchMetricData {
    WatchMetricData {
        pipeline_name: pipeline.to_string(),
        source_name: source.to_string(),
        total_file_count: files.len() as u64,
        inactive_fd_count: 0,
        file_infos: files,
    }
}

fn record_keys(record: &[u8]) -> Vec<String> {
    let value: serde_json::Value = serde_json::from_slice(record).unwrap();
    value.as_object().unwrap().keys().cloned().collect()
}

#[tokio::test(start_paused = true)]
async fn test_single_tick_exports_both_sinks() {
    let prometheus = Arc::new(PrometheusSink::new());
    let log = Arc::new(RecordingSink::default());
    let listener = Arc::new(FileWatcherListener::new(
        FileWatcherConfig {
            period: Duration::from_secs(1),
            unfinished_timeout: Duration::from_secs(3600),
        },
        MetricsConfig::default(),
        prometheus.clone(),
        log.clone(),
    ));

    let bus = EventBus::new();
    listener.register(&bus);
    let handle = ServiceHandle::spawn(listener.clone());

    bus.publish(Event::FileWatcher(watch(
        "p1",
        "s1",
        vec![FileInfo {
            file_name: "a.log".to_string(),
            size: 100,
            offset: 100,
            last_modify_time: Utc::now(),
            is_ignore_older: false,
        }],
    )))
    .unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let text = prometheus.render_text().unwrap();
    assert!(text.contains(
        "loggie_filewatcher_file_size{filename=\"a.log\",pipeline=\"p1\",source=\"s1\",status=\"pending\"} 100"
    ));
    assert!(text.contains("loggie_filewatcher_total_file_count{pipeline=\"p1\",source=\"s1\"} 1"));
    assert!(text.contains("loggie_filewatcher_inactive_file_count{pipeline=\"p1\",source=\"s1\"} 0"));

    let records = log.log_records();
    assert_eq!(records.len(), 1);
    let value: serde_json::Value = serde_json::from_slice(&records[0]).unwrap();
    assert_eq!(value.as_object().unwrap().len(), 1);
    assert_eq!(value["p1-s1"]["info"].as_array().unwrap().len(), 1);
    assert_eq!(value["p1-s1"]["info"][0]["name"], "a.log");

    assert!(listener.store().is_empty());
    handle.stop().await.unwrap();
}

#[test]
fn test_concurrent_reports_exported_exactly_once() {
    let sink = Arc::new(RecordingSink::default());
    let listener = Arc::new(FileWatcherListener::new(
        FileWatcherConfig::default(),
        MetricsConfig::default(),
        sink.clone(),
        sink.clone(),
    ));
    let bus = Arc::new(EventBus::new());
    listener.register(&bus);

    let publishers: Vec<_> = (0..4)
        .map(|p| {
            let bus = bus.clone();
            std::thread::spawn(move || {
                for s in 0..250 {
                    bus.publish(Event::FileWatcher(watch(
                        &format!("p{}", p),
                        &format!("s{}", s),
                        Vec::new(),
                    )))
                    .unwrap();
                }
            })
        })
        .collect();

    while publishers.iter().any(|h| !h.is_finished()) {
        listener.export_cycle();
    }
    for handle in publishers {
        handle.join().unwrap();
    }
    listener.export_cycle();

    let mut seen = HashSet::new();
    let mut exported = 0;
    for (metrics, record) in sink.metric_batches().iter().zip(sink.log_records().iter()) {
        let keys = record_keys(record);
        // Both sinks observe the same window
        assert_eq!(metrics.len(), 2 * keys.len());
        exported += keys.len();
        seen.extend(keys);
    }

    assert_eq!(exported, 1000);
    assert_eq!(seen.len(), 1000);
    assert!(listener.store().is_empty());
}
