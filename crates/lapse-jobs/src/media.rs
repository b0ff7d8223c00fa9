use crate::error::MediaError;

/// Segments of a media URL that precede the object path once it is split on
/// `/`: `scheme:`, the empty slot after `//`, host, `v0`, `b`, bucket, `o`.
const URL_PREFIX_SEGMENTS: usize = 7;

/// Derive the blob path a media URL refers to.
///
/// `https://host/v0/b/bucket/o/images%2Fabc.jpg?alt=media` -> `images/abc.jpg`
pub fn blob_path_from_url(url: &str) -> Result<String, MediaError> {
    let malformed = |reason| MediaError::Malformed {
        url: url.to_string(),
        reason,
    };

    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segments: Vec<&str> = without_query.split('/').collect();
    if segments.len() <= URL_PREFIX_SEGMENTS {
        return Err(malformed("missing object path"));
    }

    let encoded = segments[URL_PREFIX_SEGMENTS..].join("/");
    if encoded.is_empty() {
        return Err(malformed("empty object path"));
    }

    let decoded = urlencoding::decode(&encoded)
        .map_err(|_| malformed("object path is not valid UTF-8"))?;
    if decoded.is_empty() {
        return Err(malformed("empty object path"));
    }

    Ok(decoded.into_owned())
}

/// Build the media URL for a blob, in the form [`blob_path_from_url`] reads.
///
/// `public_base` must be an origin (`scheme://host[:port]`) without a path.
pub fn media_url(public_base: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/v0/b/{}/o/{}",
        public_base.trim_end_matches('/'),
        urlencoding::encode(bucket),
        urlencoding::encode(path)
    )
}
