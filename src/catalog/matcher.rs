use regex::RegexBuilder;

/// Scores how well a needle matches a label.
pub trait Matcher {
    /// `None` when the label does not match; lower scores rank first.
    fn score(&self, needle: &str, haystack: &str) -> Option<usize>;
}

/// Word-wise, case-insensitive substring matching.
///
/// Every whitespace-separated word of the needle must occur in the label.
/// The score is the byte offset of the earliest occurrence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatcher;

impl Matcher for RegexMatcher {
    fn score(&self, needle: &str, haystack: &str) -> Option<usize> {
        let mut earliest: Option<usize> = None;
        for word in needle.split_whitespace() {
            let pattern = RegexBuilder::new(&regex::escape(word))
                .case_insensitive(true)
                .build()
                .ok()?;
            let start = pattern.find(haystack)?.start();
            earliest = Some(earliest.map_or(start, |e| e.min(start)));
        }
        earliest
    }
}
