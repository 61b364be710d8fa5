use crate::document::WorkingCopy;
use dashmap::DashMap;
use uuid::Uuid;


/// Stable, globally unique entity identifier
pub type EntityId = Uuid;

/// Attachment key under which the live working copy is published
pub const PERSIST_KEY: &str = "PERSIST";

/// Value held in an entity context's attachment slot
#[derive(Clone, Debug)]
pub enum Attachment {
    /// Opt-in flag with no data yet
    Marker,
    /// Live document shared with collaborators
    Document(WorkingCopy),
}

/// Per-entity runtime context owned by the host
///
/// Carries a small attachment table so independent components can publish
/// data for an active entity under well-known keys.
#[derive(Debug)]
pub struct EntityContext {
    id: EntityId,
    attachments: DashMap<String, Attachment>,
}

impl EntityContext {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            attachments: DashMap::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Flag `key` without attaching data. Leaves an existing attachment alone.
    pub fn mark(&self, key: &str) {
        self.attachments
            .entry(key.to_string())
            .or_insert(Attachment::Marker);
    }

    /// True when anything (marker or document) is attached under `key`
    pub fn has_marker(&self, key: &str) -> bool {
        self.attachments.contains_key(key)
    }

    /// Attach a working copy under `key`, replacing whatever was there
    pub fn attach(&self, key: &str, copy: WorkingCopy) {
        self.attachments
            .insert(key.to_string(), Attachment::Document(copy));
    }

    /// Working copy attached under `key`, if one is attached
    pub fn read_attached(&self, key: &str) -> Option<WorkingCopy> {
        match self.attachments.get(key).as_deref() {
            Some(Attachment::Document(copy)) => Some(copy.clone()),
            _ => None,
        }
    }

    pub fn detach(&self, key: &str) -> Option<Attachment> {
        self.attachments.remove(key).map(|(_, attachment)| attachment)
    }
}

/// Entity ID parsing errors
#[derive(Debug, PartialEq)]
pub enum ParseError {
    /// Empty entity ID
    Empty,
    /// Not a canonical UUID
    InvalidFormat(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "entity id is empty"),
            ParseError::InvalidFormat(msg) => write!(f, "invalid entity id: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse an entity ID from its canonical string form
///
/// Surrounding whitespace is ignored; hyphenated and simple UUID forms are
/// both accepted.
///
/// # Examples
///
/// ```
/// use persist::entity::parse_entity_id;
///
/// let id = parse_entity_id("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap();
/// assert_eq!(id.to_string(), "069a79f4-44e9-4726-a5be-fca90e38aaf5");
/// ```
pub fn parse_entity_id(raw: &str) -> Result<EntityId, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    Uuid::parse_str(raw).map_err(|e| ParseError::InvalidFormat(format!("'{}': {}", raw, e)))
}
