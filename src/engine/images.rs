// * Container image census
// * Pages over every pod, folds running-container images by creation month and
// * ranks them into a dense, indexed structure.

use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::cluster::context::GatherContext;
use crate::cluster::errors::GatherError;
use crate::cluster::ports::PodLister;
use crate::cluster::timestamps::{month_key, to_utc};
use crate::config::constants::{IMAGE_ENTRY_LIMIT, IMAGE_PAGE_LIMIT, PLATFORM_NAMESPACE_PREFIX};
use crate::engine::image_ref::image_identity;
use crate::engine::logs::pod_record_name;
use crate::engine::pod_health::has_container_in_crashloop;
use crate::record::{GatherOutcome, Record};

pub const RUNNING_CONTAINERS_RECORD: &str = "config/running_containers";

const PHASE_RUNNING: &str = "Running";

/// Dense index -> image identifier; indices are `0..len` in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerImageSet(BTreeMap<usize, String>);

impl ContainerImageSet {
    /// Appends an image and returns its index
    pub fn add(&mut self, image: impl Into<String>) -> usize {
        let index = self.0.len();
        self.0.insert(index, image.into());
        index
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0.iter().map(|(index, image)| (*index, image.as_str()))
    }
}

/// Month key (`YYYY-MM`) -> image index -> count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodsWithAge(BTreeMap<String, BTreeMap<usize, u64>>);

impl PodsWithAge {
    pub fn add(&mut self, month: &str, image: usize, count: u64) {
        *self
            .0
            .entry(month.to_string())
            .or_default()
            .entry(image)
            .or_default() += count;
    }

    pub fn get(&self, month: &str, image: usize) -> Option<u64> {
        self.0.get(month).and_then(|images| images.get(&image)).copied()
    }

    pub fn months(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of (month, image) entries
    pub fn entries(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, u64)> {
        self.0.iter().flat_map(|(month, images)| {
            images
                .iter()
                .map(move |(index, count)| (month.as_str(), *index, *count))
        })
    }
}

/// Census output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub images: ContainerImageSet,
    pub containers: PodsWithAge,
}

/// Image key -> month -> count, accumulated over every page
#[derive(Debug, Default)]
pub struct ImageCounts {
    counts: HashMap<String, BTreeMap<String, u64>>,
}

impl ImageCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Counts one container image under `month`; malformed references are skipped
    pub fn add_status(&mut self, month: &str, status: &ContainerStatus) {
        let key = match image_identity(&status.image) {
            Ok(key) => key,
            Err(e) => {
                warn!(container = %status.name, error = %e, "Unable to parse container image specification");
                return;
            }
        };
        *self
            .counts
            .entry(key)
            .or_default()
            .entry(month.to_string())
            .or_default() += 1;
    }

    /// Folds container, init and ephemeral statuses of a running pod
    pub fn add_pod(&mut self, month: &str, pod: &Pod) {
        let Some(status) = pod.status.as_ref() else {
            return;
        };
        let statuses = [
            &status.container_statuses,
            &status.init_container_statuses,
            &status.ephemeral_container_statuses,
        ];
        for container in statuses.into_iter().flatten().flatten() {
            self.add_status(month, container);
        }
    }

    /// Ranks images by total count (ties by key) and packs the top ones.
    ///
    /// The entry limit is checked before each image is added, so an image's
    /// months are never split.
    pub fn into_container_info(self, entry_limit: usize) -> ContainerInfo {
        let mut ranked: Vec<(String, u64, BTreeMap<String, u64>)> = self
            .counts
            .into_iter()
            .map(|(image, months)| {
                let total = months.values().sum();
                (image, total, months)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut info = ContainerInfo::default();
        let mut entries = 0;
        for (image, _, months) in ranked {
            if entries >= entry_limit {
                break;
            }
            let index = info.images.add(image);
            for (month, count) in months {
                info.containers.add(&month, index, count);
                entries += 1;
            }
        }
        info
    }
}

fn creation_month(pod: &Pod) -> Option<String> {
    pod.metadata
        .creation_timestamp
        .as_ref()
        .and_then(to_utc)
        .map(month_key)
}

fn is_running(pod: &Pod) -> bool {
    pod.status.as_ref().and_then(|status| status.phase.as_deref()) == Some(PHASE_RUNNING)
}

/// Classifies one pod: crash-looping platform pods become records, running pods are counted
pub fn classify_pod(pod: &Pod, counts: &mut ImageCounts) -> Result<Option<Record>, GatherError> {
    let namespace = pod.metadata.namespace.as_deref().unwrap_or_default();
    let name = pod.metadata.name.as_deref().unwrap_or_default();

    if namespace.starts_with(PLATFORM_NAMESPACE_PREFIX) && has_container_in_crashloop(pod) {
        return Ok(Some(Record::json(pod_record_name(namespace, name), pod)?));
    }
    if is_running(pod) {
        match creation_month(pod) {
            Some(month) => counts.add_pod(&month, pod),
            None => debug!(namespace = namespace, pod = name, "Running pod has no creation time"),
        }
    }
    Ok(None)
}

/// Runs the census over every pod in the cluster.
///
/// A failed page stops the census: crash-loop records gathered so far are
/// returned with the error and no census record is emitted.
pub async fn gather_container_images(ctx: &GatherContext, pods: &dyn PodLister) -> GatherOutcome {
    let mut outcome = GatherOutcome::new();
    let mut counts = ImageCounts::new();
    let mut continue_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = match ctx
            .guard(pods.list_pods_page(IMAGE_PAGE_LIMIT, continue_token.as_deref()))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                outcome.push_error(e);
                return outcome;
            }
        };
        pages += 1;

        for pod in &page.items {
            match classify_pod(pod, &mut counts) {
                Ok(Some(record)) => outcome.push_record(record),
                Ok(None) => {}
                Err(e) => outcome.push_error(e),
            }
        }

        match page.continue_token {
            Some(token) => continue_token = Some(token),
            None => break,
        }
    }

    let info = counts.into_container_info(IMAGE_ENTRY_LIMIT);
    debug!(
        pages = pages,
        images = info.images.len(),
        entries = info.containers.entries(),
        "Container image census complete"
    );
    match Record::json(RUNNING_CONTAINERS_RECORD, &info) {
        Ok(record) => outcome.push_record(record),
        Err(e) => outcome.push_error(e),
    }
    outcome
}
