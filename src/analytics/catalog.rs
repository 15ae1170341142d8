use crate::db::models::{Season, SeasonCatalog};

impl SeasonCatalog {
    /// Build a catalog from any list of seasons: duplicates are removed,
    /// seasons are listed newest first and `latest` is the newest one.
    pub fn from_seasons(seasons: impl IntoIterator<Item = Season>) -> Self {
        let mut seasons: Vec<Season> = seasons.into_iter().collect();
        seasons.sort_unstable_by(|a, b| b.cmp(a));
        seasons.dedup();
        let latest = seasons.first().copied();
        SeasonCatalog { seasons, latest }
    }

    /// Seasons in evaluation order (oldest first).
    pub fn ascending(&self) -> Vec<Season> {
        let mut seasons = self.seasons.clone();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }

    pub fn contains(&self, season: Season) -> bool {
        self.seasons.contains(&season)
    }

    /// Resolve a caller-selected season. No selection means the latest
    /// season; a selection the catalog does not know resolves to `None`.
    pub fn resolve(&self, selected: Option<Season>) -> Option<Season> {
        match selected {
            Some(s) => self.contains(s).then_some(s),
            None => self.latest,
        }
    }
}
