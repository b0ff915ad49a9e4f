// Metadata tags of the active locator

/// String metadata keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    Title,
    Artist,
    Genre,
    Album,
    Year,
    Track,
    Comment,
}

impl MetadataKey {
    pub const ALL: [MetadataKey; 7] = [
        MetadataKey::Title,
        MetadataKey::Artist,
        MetadataKey::Genre,
        MetadataKey::Album,
        MetadataKey::Year,
        MetadataKey::Track,
        MetadataKey::Comment,
    ];
}

/// Tags read from the container.
///
/// A tag that is present but empty is `Some("")`, never collapsed to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub album: Option<String>,
    /// Release year or full date as tagged
    pub year: Option<String>,
    pub track: Option<String>,
    pub comment: Option<String>,
}

impl MediaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: MetadataKey) -> Option<&str> {
        self.slot(key).as_deref()
    }

    /// Store a tag; the first value seen for a key wins
    pub fn set_if_absent(&mut self, key: MetadataKey, value: impl Into<String>) {
        let slot = self.slot_mut(key);
        if slot.is_none() {
            *slot = Some(value.into());
        }
    }

    fn slot(&self, key: MetadataKey) -> &Option<String> {
        match key {
            MetadataKey::Title => &self.title,
            MetadataKey::Artist => &self.artist,
            MetadataKey::Genre => &self.genre,
            MetadataKey::Album => &self.album,
            MetadataKey::Year => &self.year,
            MetadataKey::Track => &self.track,
            MetadataKey::Comment => &self.comment,
        }
    }

    fn slot_mut(&mut self, key: MetadataKey) -> &mut Option<String> {
        match key {
            MetadataKey::Title => &mut self.title,
            MetadataKey::Artist => &mut self.artist,
            MetadataKey::Genre => &mut self.genre,
            MetadataKey::Album => &mut self.album,
            MetadataKey::Year => &mut self.year,
            MetadataKey::Track => &mut self.track,
            MetadataKey::Comment => &mut self.comment,
        }
    }

    /// Check if any tag is present
    pub fn has_tags(&self) -> bool {
        MetadataKey::ALL.iter().any(|key| self.slot(*key).is_some())
    }

    /// Get a summary string of the present tags
    pub fn summary(&self) -> String {
        MetadataKey::ALL
            .iter()
            .filter_map(|key| self.get(*key).map(|value| format!("{:?}: {}", key, value)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
