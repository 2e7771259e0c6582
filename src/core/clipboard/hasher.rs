//! Content identity digest used as the deduplication key.
//!
//! MD5 is an identity key here, not a security boundary: two entries whose digests
//! collide are treated as the same content.

/// Lower-case hex MD5 of the UTF-8 bytes of `content`
pub fn content_hash(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}
