//! XMP metadata: the packet embedded in the image file and `.xmp` sidecars.

use crate::{insert_basic_fields, Metadata, MetadataProvider, ProviderError, RatingColumn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{LocalName, Namespace, QName, ResolveResult};
use quick_xml::reader::NsReader;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PACKET_START: &[u8] = b"<x:xmpmeta";
const PACKET_END: &[u8] = b"</x:xmpmeta>";
const RATING_PROPERTY: &str = "xmp:Rating";
const DESCRIPTION: &str = "rdf:Description";

#[derive(Debug, Clone)]
pub struct XmpProvider {
    rating: RatingColumn,
}

impl XmpProvider {
    pub fn new(rating: RatingColumn) -> Self {
        Self { rating }
    }
}

impl MetadataProvider for XmpProvider {
    fn read(&self, dir: &Path, file: &OsStr) -> Result<Metadata, ProviderError> {
        let path = dir.join(file);
        let mut fields = Metadata::new();
        insert_basic_fields(&mut fields, &path, file)?;

        let bytes = fs::read(&path).map_err(|source| ProviderError::Io {
            operation: "read",
            path: path.clone(),
            source,
        })?;
        if let Some(packet) = find_packet(&bytes) {
            fields.extend(parse_packet(packet, &path)?);
        }
        for sidecar in sidecar_candidates(&path) {
            if !sidecar.is_file() {
                continue;
            }
            debug!("reading sidecar {}", sidecar.display());
            let bytes = fs::read(&sidecar).map_err(|source| ProviderError::Io {
                operation: "read",
                path: sidecar.clone(),
                source,
            })?;
            let packet = find_packet(&bytes).unwrap_or(&bytes);
            fields.extend(parse_packet(packet, &sidecar)?);
            break;
        }

        let raw = fields.get(RATING_PROPERTY).cloned();
        self.rating.insert_into(&mut fields, raw.as_deref());
        Ok(fields)
    }
}

/// `photo.xmp` (Lightroom, darktable) then `photo.jpg.xmp`.
fn sidecar_candidates(path: &Path) -> Vec<PathBuf> {
    let mut out = vec![path.with_extension("xmp")];
    let mut appended = path.as_os_str().to_os_string();
    appended.push(".xmp");
    out.push(PathBuf::from(appended));
    out.retain(|p| p != path);
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Locates the `x:xmpmeta` element inside arbitrary file bytes.
pub fn find_packet(bytes: &[u8]) -> Option<&[u8]> {
    let start = find(bytes, PACKET_START, 0)?;
    let end = find(bytes, PACKET_END, start)? + PACKET_END.len();
    Some(&bytes[start..end])
}

/// Collects the simple properties of every `rdf:Description`, whether they
/// are written as attributes or as child elements. For arrays (`rdf:Alt`,
/// `rdf:Seq`, `rdf:Bag`) the first item wins, and so does the first
/// occurrence of a property repeated across descriptions.
///
/// Keys use the usual prefix of their namespace (`xap:Rating` reads as
/// `xmp:Rating`). Unbound or unfamiliar prefixes are kept as written.
pub fn parse_packet(packet: &[u8], origin: &Path) -> Result<Metadata, ProviderError> {
    let mut reader = NsReader::from_reader(packet);
    reader.trim_text(true);

    let mut fields = Metadata::new();
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut description_depth: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = element_name(&reader, &e);
                if name == DESCRIPTION {
                    collect_attributes(&reader, &e, &mut fields, origin)?;
                    description_depth = Some(stack.len());
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                if element_name(&reader, &e) == DESCRIPTION {
                    collect_attributes(&reader, &e, &mut fields, origin)?;
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
                if description_depth.is_some_and(|d| stack.len() <= d) {
                    description_depth = None;
                }
            }
            Ok(Event::Text(e)) => {
                let property = description_depth.and_then(|d| stack.get(d + 1));
                if let Some(property) = property {
                    let text = e.unescape().map_err(|err| ProviderError::Parse {
                        path: origin.to_path_buf(),
                        message: err.to_string(),
                    })?;
                    keep_first(&mut fields, property, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ProviderError::Parse {
                    path: origin.to_path_buf(),
                    message: format!("XML parse error: {}", err),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(fields)
}

/// Customary prefix for the namespaces photo tools write.
fn known_prefix(uri: &[u8]) -> Option<&'static str> {
    match uri {
        b"http://www.w3.org/1999/02/22-rdf-syntax-ns#" => Some("rdf"),
        b"http://ns.adobe.com/xap/1.0/" => Some("xmp"),
        b"http://purl.org/dc/elements/1.1/" => Some("dc"),
        b"http://ns.adobe.com/photoshop/1.0/" => Some("photoshop"),
        b"http://ns.adobe.com/exif/1.0/" => Some("exif"),
        b"http://ns.adobe.com/tiff/1.0/" => Some("tiff"),
        b"http://ns.microsoft.com/photo/1.0/" => Some("MicrosoftPhoto"),
        _ => None,
    }
}

fn qualified(resolved: ResolveResult<'_>, local: LocalName<'_>, raw: QName<'_>) -> String {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => match known_prefix(uri) {
            Some(prefix) => format!("{}:{}", prefix, String::from_utf8_lossy(local.as_ref())),
            None => String::from_utf8_lossy(raw.as_ref()).into_owned(),
        },
        _ => String::from_utf8_lossy(raw.as_ref()).into_owned(),
    }
}

fn element_name(reader: &NsReader<&[u8]>, e: &BytesStart<'_>) -> String {
    let (resolved, local) = reader.resolve_element(e.name());
    qualified(resolved, local, e.name())
}

fn keep_first(fields: &mut Metadata, key: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !fields.contains_key(key) {
        fields.insert(key.to_string(), value.to_string());
    }
}

fn collect_attributes(
    reader: &NsReader<&[u8]>,
    e: &BytesStart<'_>,
    fields: &mut Metadata,
    origin: &Path,
) -> Result<(), ProviderError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ProviderError::Parse {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let key = qualified(resolved, local, attr.key);
        if key == "rdf:about" {
            continue;
        }
        let value = attr.unescape_value().map_err(|err| ProviderError::Parse {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })?;
        keep_first(fields, &key, &value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const ATTRIBUTE_PACKET: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmp:Rating="4" xmp:CreatorTool="darktable"/>
 </rdf:RDF>
</x:xmpmeta>"#;

    const ELEMENT_PACKET: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="">
   <xmp:Rating>2</xmp:Rating>
   <dc:title><rdf:Alt><rdf:li xml:lang="x-default">Harbour</rdf:li></rdf:Alt></dc:title>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#;

    fn provider() -> XmpProvider {
        let labels: BTreeMap<u8, String> = [
            (0, "Non classé"),
            (1, "1 étoile"),
            (2, "2 étoiles"),
            (3, "3 étoiles"),
            (4, "4 étoiles"),
            (5, "5 étoiles"),
        ]
        .into_iter()
        .map(|(n, l)| (n, l.to_string()))
        .collect();
        XmpProvider::new(RatingColumn::new("Notation", labels))
    }

    #[test]
    fn parses_attribute_form() {
        let fields = parse_packet(ATTRIBUTE_PACKET.as_bytes(), Path::new("a.jpg")).unwrap();
        assert_eq!(fields.get("xmp:Rating").map(String::as_str), Some("4"));
        assert_eq!(
            fields.get("xmp:CreatorTool").map(String::as_str),
            Some("darktable")
        );
        assert!(!fields.keys().any(|k| k.starts_with("xmlns")));
    }

    #[test]
    fn parses_element_form_and_arrays() {
        let fields = parse_packet(ELEMENT_PACKET.as_bytes(), Path::new("a.jpg")).unwrap();
        assert_eq!(fields.get("xmp:Rating").map(String::as_str), Some("2"));
        assert_eq!(fields.get("dc:title").map(String::as_str), Some("Harbour"));
    }

    #[test]
    fn legacy_xap_prefix_reads_as_xmp() {
        let packet = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:xap="http://ns.adobe.com/xap/1.0/" xap:Rating="5"/>
 </rdf:RDF>
</x:xmpmeta>"#;
        let fields = parse_packet(packet.as_bytes(), Path::new("a.jpg")).unwrap();
        assert_eq!(fields.get("xmp:Rating").map(String::as_str), Some("5"));
        assert!(!fields.contains_key("xap:Rating"));

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.jpg"), packet).unwrap();
        let fields = provider().read(dir.path(), OsStr::new("old.jpg")).unwrap();
        assert_eq!(fields.get("Notation").map(String::as_str), Some("5 étoiles"));
    }

    #[test]
    fn first_description_wins_in_both_forms() {
        let packet = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
   xmlns:xmp="http://ns.adobe.com/xap/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <rdf:Description rdf:about="" xmp:Rating="3"><dc:creator>Ana</dc:creator></rdf:Description>
  <rdf:Description rdf:about="" xmp:Rating="1"><dc:creator>Bo</dc:creator></rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#;
        let fields = parse_packet(packet.as_bytes(), Path::new("a.jpg")).unwrap();
        assert_eq!(fields.get("xmp:Rating").map(String::as_str), Some("3"));
        assert_eq!(fields.get("dc:creator").map(String::as_str), Some("Ana"));
    }

    #[test]
    fn finds_packet_inside_binary() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10];
        bytes.extend_from_slice(b"http://ns.adobe.com/xap/1.0/\0");
        bytes.extend_from_slice(ATTRIBUTE_PACKET.as_bytes());
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        let packet = find_packet(&bytes).unwrap();
        assert!(packet.starts_with(PACKET_START));
        assert!(packet.ends_with(PACKET_END));
    }

    #[test]
    fn reads_embedded_rating_as_label() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"\xFF\xD8 jpeg bytes ".to_vec();
        bytes.extend_from_slice(ATTRIBUTE_PACKET.as_bytes());
        fs::write(dir.path().join("photo.jpg"), bytes).unwrap();

        let fields = provider().read(dir.path(), OsStr::new("photo.jpg")).unwrap();
        assert_eq!(fields.get("Notation").map(String::as_str), Some("4 étoiles"));
        assert_eq!(fields.get("Name").map(String::as_str), Some("photo.jpg"));
    }

    #[test]
    fn sidecar_overrides_embedded_packet() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"raw ".to_vec();
        bytes.extend_from_slice(ATTRIBUTE_PACKET.as_bytes());
        fs::write(dir.path().join("photo.nef"), bytes).unwrap();
        fs::write(dir.path().join("photo.xmp"), ELEMENT_PACKET).unwrap();

        let fields = provider().read(dir.path(), OsStr::new("photo.nef")).unwrap();
        assert_eq!(fields.get("Notation").map(String::as_str), Some("2 étoiles"));
    }

    #[test]
    fn file_without_xmp_is_unrated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.png"), b"\x89PNG").unwrap();

        let fields = provider().read(dir.path(), OsStr::new("plain.png")).unwrap();
        assert_eq!(fields.get("Notation").map(String::as_str), Some("Non classé"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = provider().read(dir.path(), OsStr::new("gone.jpg")).unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }));
    }
}
