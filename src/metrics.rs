use std::sync::LazyLock;
use std::time::Duration;

use prometheus::*;

static METRIC_GROUP_QUERY_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "dupe_review_group_query_count",
        "count of group queries by result",
        &["result"]
    )
    .unwrap()
});

static METRIC_SKIPPED_FILE_COUNT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "dupe_review_skipped_file_count",
        "count of group members skipped because the file no longer exists"
    )
    .unwrap()
});

static METRIC_DELETE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "dupe_review_delete_count",
        "count of delete requests by result",
        &["result"]
    )
    .unwrap()
});

static METRIC_CONVERT_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "dupe_review_convert_duration",
        "duration of the raw to jpg conversion in seconds",
        vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap()
});

pub fn inc_group_query(result: &str) {
    METRIC_GROUP_QUERY_COUNT.with_label_values(&[result]).inc();
}

pub fn inc_skipped_file() {
    METRIC_SKIPPED_FILE_COUNT.inc();
}

pub fn inc_delete(result: &str) {
    METRIC_DELETE_COUNT.with_label_values(&[result]).inc();
}

pub fn observe_convert_duration(duration: Duration) {
    METRIC_CONVERT_DURATION.observe(duration.as_secs_f64());
}

/// 以 Prometheus 文本格式导出所有指标
pub fn gather_text() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    Ok(encoder.encode_to_string(&prometheus::gather())?)
}
