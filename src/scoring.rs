//! 组内图片评分
//!
//! 纯计算，不做任何 IO

use chrono::{DateTime, NaiveDateTime, TimeDelta};

use crate::metadata::MetadataDescriptor;
use crate::store::ImageRecord;

/// 单张图片或不足两张图片时的组相似度
pub const SINGLE_IMAGE_SIMILARITY: f64 = 5.0;
const SIMILARITY_SCALE: f64 = 5.0;

/// 两张图片拍摄时间最多相差多久仍视为一致
const MAX_TIME_DELTA: TimeDelta = TimeDelta::hours(1);

/// 待评分的图片
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: ImageRecord,
    pub metadata: MetadataDescriptor,
}

/// 已评分的图片
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredImage {
    pub record: ImageRecord,
    pub metadata: MetadataDescriptor,
    /// 保留分，越高越建议保留
    pub score: i32,
}

/// 评分结果，图片顺序与输入一致
#[derive(Debug, Clone, PartialEq)]
pub struct GroupScore {
    pub images: Vec<ScoredImage>,
    pub similarity: f64,
}

/// 对一组图片评分
///
/// 调用方应当保证 `candidates` 非空；传入空组时得到空结果和默认相似度
pub fn score_group(candidates: Vec<Candidate>) -> GroupScore {
    let similarity = {
        let metadata = candidates.iter().map(|c| &c.metadata).collect::<Vec<_>>();
        group_similarity(&metadata)
    };

    let max_area = candidates.iter().map(|c| c.record.area()).max().unwrap_or(0);
    let any_metadata = candidates.iter().any(|c| c.metadata.has_metadata);
    // 时间相同时取第一个
    let oldest = candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| c.record.modified_date)
        .map(|(i, _)| i);

    let images = candidates
        .into_iter()
        .enumerate()
        .map(|(i, Candidate { record, metadata })| {
            let mut score = 0;
            if metadata.has_metadata {
                score += 1;
            }
            // 人工填写的标题是最强的保留信号
            if metadata.has_meaningful_caption() {
                score += 2;
            }
            if record.area() == max_area {
                score += 1;
            }
            if !any_metadata && Some(i) == oldest {
                score += 1;
            }
            ScoredImage { record, metadata, score }
        })
        .collect();

    GroupScore { images, similarity }
}

/// 按分数从高到低排序，同分保持原有顺序
pub fn rank<T, F>(items: &mut [T], score: F)
where
    F: Fn(&T) -> i32,
{
    items.sort_by_key(|item| std::cmp::Reverse(score(item)));
}

/// 组相似度：`size / (identical_pairs + 1) * 5.0`
pub fn group_similarity(metadata: &[&MetadataDescriptor]) -> f64 {
    let total = metadata.len();
    if total <= 1 {
        return SINGLE_IMAGE_SIMILARITY;
    }
    let identical = identical_pairs(metadata);
    total as f64 / (identical + 1) as f64 * SIMILARITY_SCALE
}

/// 元数据一致的无序图片对数量
pub fn identical_pairs(metadata: &[&MetadataDescriptor]) -> usize {
    let mut count = 0;
    for (i, a) in metadata.iter().enumerate() {
        for b in &metadata[i + 1..] {
            if metadata_identical(a, b) {
                count += 1;
            }
        }
    }
    count
}

/// 相机型号相同（都为空也算相同），并且拍摄时间相差不超过一小时
///
/// 任意一方时间无法解析时跳过时间比较
pub fn metadata_identical(a: &MetadataDescriptor, b: &MetadataDescriptor) -> bool {
    if a.camera_model != b.camera_model {
        return false;
    }
    match (parse_timestamp(&a.date_taken), parse_timestamp(&b.date_taken)) {
        (Some(ta), Some(tb)) => (ta - tb).abs() <= MAX_TIME_DELTA,
        _ => true,
    }
}

/// 解析拍摄时间，带时区的转换为 UTC，不带时区的按 UTC 处理
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y:%m:%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
