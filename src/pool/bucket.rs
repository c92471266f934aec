/// The two pool buckets named in spec §4.A: `content` for payloads (long-lived,
/// heavily referenced) and `files` for metadata blobs (churns on every
/// upstream refresh).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Content,
    Files,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Files => "files",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
