use std::io::Cursor;

use chrono::NaiveDateTime;
use exif::{Context, Exif, In, Reader, Tag, Value};

use super::BOILERPLATE;

/// Windows 资源管理器写入的主题，UCS-2LE 编码
const TAG_XP_SUBJECT: Tag = Tag(Context::Tiff, 0x9c9f);
/// Windows 资源管理器写入的标题，UCS-2LE 编码
const TAG_XP_TITLE: Tag = Tag(Context::Tiff, 0x9c9b);
const TAG_OFFSET_TIME_ORIGINAL: Tag = Tag(Context::Exif, 0x9011);

/// UserComment 开头 8 字节是字符集标识
const USER_COMMENT_HEADER_LEN: usize = 8;

/// EXIF 中提取到的字段，缺失的字段为 `None`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExifFields {
    pub date_taken: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub subject: Option<String>,
}

/// 标题的候选来源，按顺序尝试
#[derive(Debug, Clone, Copy)]
enum SubjectSource {
    XpSubject,
    XpTitle,
    UserComment,
    ImageDescription,
}

const SUBJECT_SOURCES: [SubjectSource; 4] = [
    SubjectSource::XpSubject,
    SubjectSource::XpTitle,
    SubjectSource::UserComment,
    SubjectSource::ImageDescription,
];

impl SubjectSource {
    fn extract(self, exif: &Exif) -> Option<String> {
        match self {
            Self::XpSubject => field(exif, TAG_XP_SUBJECT).and_then(ucs2_text),
            Self::XpTitle => field(exif, TAG_XP_TITLE).and_then(ucs2_text),
            Self::UserComment => field(exif, Tag::UserComment).and_then(user_comment),
            Self::ImageDescription => field(exif, Tag::ImageDescription)
                .and_then(ascii_text)
                .filter(|s| !s.to_uppercase().contains(BOILERPLATE)),
        }
    }
}

/// 解析文件中的 EXIF 结构，不存在或无法解析时返回 `None`
pub fn read(data: &[u8]) -> Option<ExifFields> {
    let exif = Reader::new().read_from_container(&mut Cursor::new(data)).ok()?;
    Some(fields(&exif))
}

fn fields(exif: &Exif) -> ExifFields {
    let date_taken = field(exif, Tag::DateTimeOriginal).and_then(ascii_text).map(|raw| {
        let offset = field(exif, TAG_OFFSET_TIME_ORIGINAL).and_then(ascii_text);
        normalize_datetime(&raw, offset.as_deref())
    });

    ExifFields {
        date_taken,
        camera_make: field(exif, Tag::Make).and_then(ascii_text),
        camera_model: field(exif, Tag::Model).and_then(ascii_text),
        subject: SUBJECT_SOURCES.iter().find_map(|source| source.extract(exif)),
    }
}

fn field(exif: &Exif, tag: Tag) -> Option<&Value> {
    exif.get_field(tag, In::PRIMARY).map(|f| &f.value)
}

/// 将 EXIF 的 `YYYY:MM:DD HH:MM:SS` 转为 ISO-8601，无法解析时原样返回
pub fn normalize_datetime(raw: &str, offset: Option<&str>) -> String {
    let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S") else {
        return raw.to_owned();
    };
    let iso = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    match offset {
        Some(offset) if is_utc_offset(offset) => iso + offset,
        _ => iso,
    }
}

/// `+HH:MM` 或 `-HH:MM`
fn is_utc_offset(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 6
        && (b[0] == b'+' || b[0] == b'-')
        && b[1..3].iter().all(u8::is_ascii_digit)
        && b[3] == b':'
        && b[4..6].iter().all(u8::is_ascii_digit)
}

fn ascii_text(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts.first().and_then(|bytes| clean(&String::from_utf8_lossy(bytes))),
        Value::Undefined(bytes, _) | Value::Byte(bytes) => clean(&String::from_utf8_lossy(bytes)),
        _ => None,
    }
}

fn ucs2_text(value: &Value) -> Option<String> {
    match value {
        Value::Byte(bytes) | Value::Undefined(bytes, _) => clean(&decode_utf16le(bytes)),
        _ => None,
    }
}

fn user_comment(value: &Value) -> Option<String> {
    match value {
        Value::Undefined(bytes, _) if bytes.len() > USER_COMMENT_HEADER_LEN => {
            let (header, body) = bytes.split_at(USER_COMMENT_HEADER_LEN);
            if header.starts_with(b"UNICODE") {
                clean(&decode_utf16le(body))
            } else {
                clean(&String::from_utf8_lossy(body))
            }
        }
        Value::Ascii(_) => ascii_text(value),
        _ => None,
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
    char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)).collect()
}

fn clean(s: &str) -> Option<String> {
    let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!s.is_empty()).then(|| s.to_owned())
}
