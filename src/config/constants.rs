// * Gather Tunables
// * Central location for all line limits, page sizes and windows used by the gatherers

use std::time::Duration;

// * Lines requested on the first fetch of a container log
pub const LOG_TAIL_SHORT: i64 = 100;

// * Lines requested when the first fetch contained a stack trace
pub const LOG_TAIL_LONG: i64 = 2000;

// * Lines kept before the first stack-trace line
pub const STACK_OFFSET: usize = 20;

// * Stack regions longer than this are suppressed in the middle
pub const STACK_MAX: usize = 40;

// * Lines kept from the start of a suppressed region (offset included)
pub const STACK_BEGIN: usize = 35;

// * Lines kept before the last stack-trace line of a suppressed region
pub const STACK_END: usize = 5;

// * Pods requested per page by the image census
pub const IMAGE_PAGE_LIMIT: u32 = 200;

// * Maximum number of (month, image) entries in the census output
pub const IMAGE_ENTRY_LIMIT: usize = 1000;

// * Connectivity check failures older than this are dropped
pub const PROBE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

// * Pending pods older than this are unhealthy
pub const PENDING_GRACE: Duration = Duration::from_secs(2 * 60);

// * Namespaces owned by the platform; events are only read from these
pub const PLATFORM_NAMESPACE_PREFIX: &str = "openshift-";

// * Default archive size cap (8 MiB)
pub const DEFAULT_MAX_ARCHIVE_BYTES: i64 = 8 * 1024 * 1024;

// * Default expected log compression ratio inside the archive
pub const DEFAULT_LOG_COMPRESSION_RATIO: i64 = 2;

// * Default trailing interval for event recency
pub const DEFAULT_EVENT_INTERVAL: Duration = Duration::from_secs(60 * 60);
