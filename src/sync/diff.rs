//! Skip-vs-upload decision.
//!
//! Regular files are compared by byte size only: two files of identical
//! size but different content are indistinguishable here and stay
//! unsynced. That is the documented policy, kept because changing it
//! changes which files get re-uploaded. Symlink payloads are small, so
//! they get a real content check against the stored ETag.

use md5::{Digest, Md5};

use crate::remote::index::RemoteIndex;
use crate::sync::walk::{EntryKind, LocalEntry};

/// Lowercase-hex MD5 of a symlink's target text. Matches the ETag the
/// store assigns to a simple whole-object PUT of the same bytes.
pub fn symlink_etag(target: &str) -> String {
    let digest = Md5::digest(target.as_bytes());
    format!("{:x}", digest)
}

/// Decide once, before scheduling, whether `entry` needs an upload.
pub fn should_upload(entry: &LocalEntry, prefix: &str, index: &RemoteIndex) -> bool {
    let key = format!("{}{}", prefix, entry.key);
    match &entry.kind {
        EntryKind::Regular => !index.matches_size(&key, entry.size),
        EntryKind::Symlink { target } => !index.matches_etag(&key, &symlink_etag(target)),
    }
}
