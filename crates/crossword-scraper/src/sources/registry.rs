use super::*;

/// Ordered, immutable list of strategies.
///
/// Every matching strategy runs; the order only decides which of two near-identical grids
/// is kept, since earlier results are accepted first.
pub struct SourceRegistry {
    sources: Vec<Box<dyn Source>>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        Self { sources }
    }

    /// All built-in strategies. The generic link scanner comes last so publisher-specific
    /// results win deduplication.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(AmuseLabsSource),
            Box::new(BostonGlobeSource),
            Box::new(CnnSource),
            Box::new(CrosshareSource),
            Box::new(CrosswordCompilerSource),
            Box::new(CrosswordNexusSource),
            Box::new(CrosswordrSource),
            Box::new(DailyPrincetonianSource),
            Box::new(GoComicsSource),
            Box::new(GuardianSource),
            Box::new(NewYorkTimesSource),
            Box::new(NewYorkerSource),
            Box::new(PuzzleSocietySource),
            Box::new(PzzlSource),
            Box::new(TheWeekSource),
            Box::new(UniversalSource),
            Box::new(WallStreetJournalSource),
            Box::new(WashingtonPostSource),
            Box::new(WorldOfCrosswordsSource),
            Box::new(XWordInfoSource),
            Box::new(PuzzleLinkSource),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Source> {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|s| s.name()).collect()
    }

    /// Strategies whose match predicate accepts `url`, in registry order.
    pub fn matching<'a>(&'a self, url: &'a Url) -> impl Iterator<Item = &'a dyn Source> + 'a {
        self.iter().filter(move |s| s.matches(url))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order() {
        let registry = SourceRegistry::standard();
        let names = registry.names();
        assert_eq!(names.len(), 21);
        assert_eq!(names[0], "PuzzleMe (Amuse Labs)");
        assert_eq!(names.last(), Some(&"Puzzle Link"));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = SourceRegistry::standard().names();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 21);
    }

    #[test]
    fn test_matching_for_nyt_page() {
        let registry = SourceRegistry::standard();
        let url = Url::parse("https://www.nytimes.com/crosswords/game/daily").unwrap();
        let names: Vec<&str> = registry.matching(&url).map(|s| s.name()).collect();
        assert_eq!(names, vec!["Crossword Compiler", "New York Times", "Puzzle Link"]);
    }
}
