//! 图片元数据提取
//!
//! XMP 与 EXIF 两个提取器互相独立，各自返回可选结果，最后由 [`combine`] 按优先级合并。
//! 任何失败都只会得到一个空的描述，不会向调用方返回错误。

pub mod exif;
pub mod xmp;

use std::path::Path;

use serde::Serialize;
use utoipa::ToSchema;

use self::exif::ExifFields;
use crate::fs::FileSystem;

/// 部分工具写入的占位标题
pub const PLACEHOLDER: &str = "[ASCII]";
/// 出现该子串说明标题是未解码的原始字段
pub const SENTINEL: &str = "UserComment<";
/// 相机默认写入的描述，比较时忽略大小写
pub const BOILERPLATE: &str = "DIGITAL CAMERA";

/// 单个文件的元数据描述，空字符串表示缺失
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MetadataDescriptor {
    /// 拍摄时间（ISO-8601）
    pub date_taken: String,
    /// 相机厂商
    pub camera_make: String,
    /// 相机型号
    pub camera_model: String,
    /// 标题/主题
    pub subject: String,
    /// 是否存在任何元数据
    #[serde(rename = "has_exif")]
    pub has_metadata: bool,
}

impl MetadataDescriptor {
    /// 标题是否由人工填写：非空、不是占位符，也不是相机默认描述
    pub fn has_meaningful_caption(&self) -> bool {
        !self.subject.is_empty()
            && !is_placeholder(&self.subject)
            && !self.subject.to_uppercase().contains(BOILERPLATE)
    }
}

/// 标题是否是占位符或未解码字段
pub fn is_placeholder(caption: &str) -> bool {
    caption == PLACEHOLDER || caption.contains(SENTINEL)
}

/// 合并两个提取器的结果
///
/// EXIF 标题为空或是占位符时，使用 XMP 标题
pub fn combine(xmp_caption: Option<String>, exif: Option<ExifFields>) -> MetadataDescriptor {
    let exif = exif.unwrap_or_default();

    let subject = match (exif.subject, xmp_caption) {
        (Some(subject), Some(xmp)) if is_placeholder(&subject) => xmp,
        (Some(subject), _) => subject,
        (None, Some(xmp)) => xmp,
        (None, None) => String::new(),
    };

    let mut descriptor = MetadataDescriptor {
        date_taken: exif.date_taken.unwrap_or_default(),
        camera_make: exif.camera_make.unwrap_or_default(),
        camera_model: exif.camera_model.unwrap_or_default(),
        subject,
        has_metadata: false,
    };
    descriptor.has_metadata = !descriptor.date_taken.is_empty()
        || !descriptor.camera_make.is_empty()
        || !descriptor.camera_model.is_empty()
        || !descriptor.subject.is_empty();
    descriptor
}

/// 从文件内容中提取元数据
pub fn extract_from_bytes(data: &[u8]) -> MetadataDescriptor {
    combine(xmp::caption(data), exif::read(data))
}

/// 读取文件并提取元数据，读取失败时返回空描述
pub fn extract(fs: &dyn FileSystem, path: &Path) -> MetadataDescriptor {
    match fs.read(path) {
        Ok(data) => extract_from_bytes(&data),
        Err(e) => {
            log::debug!("读取 {} 失败: {}", path.display(), e);
            MetadataDescriptor::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn exif_with_subject(subject: Option<&str>) -> ExifFields {
        ExifFields {
            date_taken: Some("2021-06-01T10:00:00".into()),
            camera_make: Some("Canon".into()),
            camera_model: Some("EOS 5D".into()),
            subject: subject.map(Into::into),
        }
    }

    #[rstest]
    #[case::exif_wins(Some("Wedding"), Some("xmp caption"), "Wedding")]
    #[case::empty_exif(None, Some("xmp caption"), "xmp caption")]
    #[case::placeholder(Some("[ASCII]"), Some("xmp caption"), "xmp caption")]
    #[case::sentinel(Some("UserComment<0x41 0x53>"), Some("xmp caption"), "xmp caption")]
    #[case::placeholder_without_xmp(Some("[ASCII]"), None, "[ASCII]")]
    #[case::nothing(None, None, "")]
    fn test_caption_precedence(
        #[case] exif_subject: Option<&str>,
        #[case] xmp: Option<&str>,
        #[case] expected: &str,
    ) {
        let descriptor = combine(xmp.map(Into::into), Some(exif_with_subject(exif_subject)));
        assert_eq!(descriptor.subject, expected);
        assert!(descriptor.has_metadata);
    }

    #[test]
    fn test_xmp_only() {
        let descriptor = combine(Some("Picnic".into()), None);
        assert_eq!(descriptor.subject, "Picnic");
        assert!(descriptor.has_metadata);
        assert!(descriptor.date_taken.is_empty());
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(combine(None, None), MetadataDescriptor::default());
        assert_eq!(combine(None, Some(ExifFields::default())), MetadataDescriptor::default());
    }

    #[test]
    fn test_partial_exif() {
        let exif = ExifFields { date_taken: Some("2020-01-01T00:00:00".into()), ..Default::default() };
        let descriptor = combine(None, Some(exif));
        assert!(descriptor.has_metadata);
        assert!(descriptor.camera_model.is_empty());
    }

    #[rstest]
    #[case("Grandma's birthday", true)]
    #[case("", false)]
    #[case("[ASCII]", false)]
    #[case("UserComment<junk", false)]
    #[case("OLYMPUS DIGITAL CAMERA", false)]
    #[case("olympus digital camera", false)]
    fn test_meaningful_caption(#[case] subject: &str, #[case] expected: bool) {
        let descriptor = MetadataDescriptor { subject: subject.into(), ..Default::default() };
        assert_eq!(descriptor.has_meaningful_caption(), expected);
    }

    #[test]
    fn test_extract_unreadable_file() {
        let descriptor = extract(&crate::fs::LocalFs, Path::new("/non/existent/file.jpg"));
        assert_eq!(descriptor, MetadataDescriptor::default());
    }

    #[test]
    fn test_extract_xmp_from_bytes() {
        let data = b"junk<x:xmpmeta><rdf:li>Lake</rdf:li></x:xmpmeta>";
        let descriptor = extract_from_bytes(data);
        assert_eq!(descriptor.subject, "Lake");
        assert!(descriptor.has_metadata);
    }
}
