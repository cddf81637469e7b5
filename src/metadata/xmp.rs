//! XMP 文档元数据中的标题提取
//!
//! 不做完整的 XML 解析，只按标记在原始字节中查找

use memchr::memmem;

const START_MARKERS: [&[u8]; 2] = [b"<x:xmpmeta", b"<?xpacket"];
const END_MARKER: &[u8] = b"</x:xmpmeta>";
const PACKET_END_MARKER: &[u8] = b"<?xpacket end=";
/// `<?xpacket end=...?>` 本身的长度余量
const PACKET_END_ALLOWANCE: usize = 100;

const LIST_ITEM_OPEN: &[u8] = b"<rdf:li>";
const LIST_ITEM_CLOSE: &[u8] = b"</rdf:li>";

/// 依次尝试的标题标记，以 `>` 结尾的是元素，以 `"` 结尾的是属性
const CAPTION_PATTERNS: [&[u8]; 4] =
    [b"<dc:subject>", b"dc:subject=\"", b"<photoshop:Headline>", b"photoshop:Headline=\""];

/// 定位 XMP 数据块
pub fn find_block(data: &[u8]) -> Option<&[u8]> {
    let start = START_MARKERS.iter().find_map(|marker| memmem::find(data, marker))?;
    let rest = &data[start..];

    let end = match memmem::find(rest, END_MARKER) {
        Some(end) => end,
        None => {
            let end = memmem::find(rest, PACKET_END_MARKER)?;
            (end + PACKET_END_ALLOWANCE).min(rest.len())
        }
    };
    Some(&rest[..end])
}

/// 在 XMP 数据块中查找第一个非空标题
pub fn find_caption(block: &[u8]) -> Option<String> {
    if let Some(caption) = between(block, LIST_ITEM_OPEN, LIST_ITEM_CLOSE) {
        return Some(caption);
    }

    CAPTION_PATTERNS.iter().find_map(|pattern| {
        let close: &[u8] = if pattern.ends_with(b">") { b"</" } else { b"\"" };
        between(block, pattern, close)
    })
}

/// 从整个文件中提取 XMP 标题
pub fn caption(data: &[u8]) -> Option<String> {
    find_block(data).and_then(find_caption)
}

fn between(haystack: &[u8], open: &[u8], close: &[u8]) -> Option<String> {
    let start = memmem::find(haystack, open)? + open.len();
    let len = memmem::find(&haystack[start..], close)?;
    let text = String::from_utf8_lossy(&haystack[start..start + len]);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(inner: &str) -> Vec<u8> {
        let mut data = b"\xff\xd8\xff\xe1 binary junk ".to_vec();
        data.extend_from_slice(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">");
        data.extend_from_slice(inner.as_bytes());
        data.extend_from_slice(b"</x:xmpmeta> trailing");
        data
    }

    #[test]
    fn test_rdf_list_item() {
        let data = wrap("<dc:subject><rdf:Bag><rdf:li> Grandma's birthday </rdf:li></rdf:Bag></dc:subject>");
        assert_eq!(caption(&data).as_deref(), Some("Grandma's birthday"));
    }

    #[test]
    fn test_attribute_form() {
        let data = wrap(r#"<rdf:Description dc:subject="Beach trip"/>"#);
        assert_eq!(caption(&data).as_deref(), Some("Beach trip"));
    }

    #[test]
    fn test_headline_fallback() {
        let data = wrap("<rdf:li>   </rdf:li><photoshop:Headline>Harbour</photoshop:Headline>");
        assert_eq!(caption(&data).as_deref(), Some("Harbour"));
    }

    #[test]
    fn test_xpacket_without_xmpmeta_end() {
        let data = b"<?xpacket begin=''?><rdf:li>Packet</rdf:li><?xpacket end='w'?>".to_vec();
        assert_eq!(caption(&data).as_deref(), Some("Packet"));
    }

    #[test]
    fn test_no_block() {
        assert_eq!(caption(b"<rdf:li>outside</rdf:li>"), None);
        assert_eq!(caption(b"<x:xmpmeta><rdf:li>unterminated"), None);
        assert_eq!(caption(&[]), None);
    }
}
