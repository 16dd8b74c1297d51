//! EXIF metadata via `kamadak-exif`. Enabled with the `exif` feature.

use crate::{insert_basic_fields, Metadata, MetadataProvider, ProviderError, RatingColumn};
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Windows stores the star rating in this TIFF tag (`Rating`).
const WINDOWS_RATING: ::exif::Tag = ::exif::Tag(::exif::Context::Tiff, 0x4746);

#[derive(Debug, Clone)]
pub struct ExifProvider {
    rating: RatingColumn,
}

impl ExifProvider {
    pub fn new(rating: RatingColumn) -> Self {
        Self { rating }
    }
}

impl MetadataProvider for ExifProvider {
    fn read(&self, dir: &Path, file: &OsStr) -> Result<Metadata, ProviderError> {
        let path = dir.join(file);
        let mut fields = Metadata::new();
        insert_basic_fields(&mut fields, &path, file)?;

        let handle = File::open(&path).map_err(|source| ProviderError::Io {
            operation: "open",
            path: path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(handle);
        let mut raw_rating = None;
        match ::exif::Reader::new().read_from_container(&mut reader) {
            Ok(data) => {
                for f in data.fields() {
                    let value = f.display_value().to_string();
                    if !value.is_empty() {
                        fields.insert(format!("{}", f.tag), value);
                    }
                }
                raw_rating = data
                    .get_field(WINDOWS_RATING, ::exif::In::PRIMARY)
                    .and_then(|f| f.value.get_uint(0))
                    .map(|n| n.to_string());
            }
            Err(::exif::Error::Io(source)) => {
                return Err(ProviderError::Io {
                    operation: "read",
                    path,
                    source,
                })
            }
            Err(err) => debug!("no EXIF in {}: {}", path.display(), err),
        }

        self.rating.insert_into(&mut fields, raw_rating.as_deref());
        Ok(fields)
    }
}
