//! Prometheus-backed metrics sink
//!
//! Keeps one registry per topic. Each publish builds a fresh registry from
//! the samples and swaps it in, so gauges for files that disappeared from the
//! window stop being exposed. The scrape endpoint itself lives elsewhere and
//! reads through [`PrometheusSink::render_text`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::RwLock;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::{Error, Result};
use crate::eventbus::Topic;

use super::{MetricSample, MetricsSink};

/// Content type of the text exposition format
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Metrics sink exposing gauges in Prometheus format
#[derive(Default)]
pub struct PrometheusSink {
    registries: RwLock<HashMap<Topic, Registry>>,
}

impl PrometheusSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect metric families across every topic
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registries
            .read()
            .values()
            .flat_map(|registry| registry.gather())
            .collect()
    }

    /// Render every topic in Prometheus text exposition format
    pub fn render_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.gather(), &mut buffer)?;

        String::from_utf8(buffer)
            .map_err(|e| Error::Serialization(format!("Metrics contain invalid UTF-8: {}", e)))
    }

    /// Render as HTTP response body with the matching content type
    pub fn export_http(&self) -> Result<(String, &'static str)> {
        Ok((self.render_text()?, TEXT_CONTENT_TYPE))
    }

    fn build_registry(samples: &[MetricSample]) -> Result<Registry> {
        let registry = Registry::new();
        let mut gauges: HashMap<&str, GaugeVec> = HashMap::new();

        for sample in samples {
            let gauge = match gauges.entry(sample.name.as_str()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let label_names: Vec<&str> = sample.labels.keys().map(String::as_str).collect();
                    let vec = GaugeVec::new(
                        Opts::new(sample.name.clone(), sample.help.clone()),
                        &label_names,
                    )?;
                    registry.register(Box::new(vec.clone()))?;
                    entry.insert(vec)
                }
            };

            let label_values: Vec<&str> = sample.labels.values().map(String::as_str).collect();
            gauge
                .get_metric_with_label_values(&label_values)?
                .set(sample.value);
        }

        Ok(registry)
    }
}

impl MetricsSink for PrometheusSink {
    fn publish(&self, topic: Topic, samples: &[MetricSample]) -> Result<()> {
        // Build before swapping so a failed publish leaves the previous set exposed
        let registry = Self::build_registry(samples)?;
        self.registries.write().insert(topic, registry);
        tracing::trace!(topic = %topic, samples = samples.len(), "Published gauges");
        Ok(())
    }
}
