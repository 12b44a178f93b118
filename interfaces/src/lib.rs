pub mod defs;

pub use defs::{
    normalize_title, CanonicalRecord, DailyDigestPayload, DigestLine, FeedEntry, RemoteDocument,
};
