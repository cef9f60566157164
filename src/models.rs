// Core data structures for the series/metadata/release tree

/// Info hash reported by SeaDex for releases hosted on private trackers
pub const REDACTED_HASH: &str = "<redacted>";

/// A series monitored in Sonarr
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Series {
    pub sonarr_id: i64, // Sonarr series ID, never reassigned
    pub title: String,
    pub num_seasons: u32, // Season 0 (specials) excluded
    pub anilist_entries: Vec<MetadataEntry>,
}

impl Series {
    /// Create a series with no metadata entries yet
    pub fn new(sonarr_id: i64, title: impl Into<String>, num_seasons: u32) -> Self {
        Self {
            sonarr_id,
            title: title.into(),
            num_seasons,
            anilist_entries: Vec::new(),
        }
    }

    /// Iterate over every release currently marked as chosen
    pub fn chosen_releases(&self) -> impl Iterator<Item = (&MetadataEntry, &Release)> {
        self.anilist_entries.iter().flat_map(|entry| {
            entry
                .torrents
                .iter()
                .filter(|release| release.chosen)
                .map(move |release| (entry, release))
        })
    }
}

/// An AniList media entry matched to a series (usually one per season)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataEntry {
    pub anilist_id: i64,
    pub title: String,
    pub season_year: i32,
    pub torrents: Vec<Release>,
    /// Added by hand, survives disappearing from search results
    pub manually_added: bool,
    /// Skipped during release lookup, survives disappearing from search results
    pub ignore: bool,
}

impl MetadataEntry {
    pub fn new(anilist_id: i64, title: impl Into<String>, season_year: i32) -> Self {
        Self {
            anilist_id,
            title: title.into(),
            season_year,
            ..Default::default()
        }
    }

    /// Whether an override flag protects this entry from automatic removal
    pub fn is_protected(&self) -> bool {
        self.manually_added || self.ignore
    }

    /// The release currently chosen for download, if any
    pub fn chosen(&self) -> Option<&Release> {
        self.torrents.iter().find(|release| release.chosen)
    }
}

/// A SeaDex torrent release (a "trs" record)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Release {
    pub id: String,
    pub info_hash: String,
    pub tracker: String,
    pub url: String,
    pub is_best: bool,
    pub dual_audio: bool,
    /// Selected and submitted for download
    pub chosen: bool,
}

impl Release {
    pub fn new(
        id: impl Into<String>,
        info_hash: impl Into<String>,
        tracker: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            info_hash: info_hash.into(),
            tracker: tracker.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_best(mut self, is_best: bool) -> Self {
        self.is_best = is_best;
        self
    }

    pub fn with_dual_audio(mut self, dual_audio: bool) -> Self {
        self.dual_audio = dual_audio;
        self
    }

    pub fn with_chosen(mut self, chosen: bool) -> Self {
        self.chosen = chosen;
        self
    }

    /// Private tracker releases have their info hash redacted
    pub fn is_private(&self) -> bool {
        self.info_hash == REDACTED_HASH
    }

    /// Magnet URI for public releases
    pub fn magnet_link(&self) -> Option<String> {
        if self.is_private() {
            None
        } else {
            Some(format!("magnet:?xt=urn:btih:{}", self.info_hash))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_is_derived_from_hash() {
        let public = Release::new("a", "abcdef", "Nyaa", "https://nyaa.si/view/1");
        let private = Release::new("b", REDACTED_HASH, "AB", "https://animebytes.tv/t/1");

        assert!(!public.is_private());
        assert!(private.is_private());
    }

    #[test]
    fn test_magnet_link() {
        let public = Release::new("a", "abcdef", "Nyaa", "https://nyaa.si/view/1");
        assert_eq!(
            public.magnet_link().as_deref(),
            Some("magnet:?xt=urn:btih:abcdef")
        );

        let private = Release::new("b", REDACTED_HASH, "AB", "https://animebytes.tv/t/1");
        assert!(private.magnet_link().is_none());
    }

    #[test]
    fn test_entry_protection() {
        let mut entry = MetadataEntry::new(1, "Title", 2020);
        assert!(!entry.is_protected());

        entry.ignore = true;
        assert!(entry.is_protected());

        entry.ignore = false;
        entry.manually_added = true;
        assert!(entry.is_protected());
    }

    #[test]
    fn test_chosen_releases() {
        let mut series = Series::new(7, "Show", 2);
        let mut entry = MetadataEntry::new(1, "Show", 2020);
        entry.torrents = vec![
            Release::new("a", "h1", "Nyaa", "u1"),
            Release::new("b", "h2", "Nyaa", "u2").with_chosen(true),
        ];
        series.anilist_entries.push(entry);

        let chosen: Vec<_> = series.chosen_releases().map(|(_, r)| r.id.as_str()).collect();
        assert_eq!(chosen, vec!["b"]);
        assert_eq!(series.anilist_entries[0].chosen().map(|r| r.id.as_str()), Some("b"));
    }
}
