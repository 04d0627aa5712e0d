use failure::Error;

use crate::heads::Language;

/// Settings shared by feature extraction and reranking.
///
/// Setters consume and return the configuration:
///
/// ```
/// use reranker::Config;
///
/// let config = Config::default().lowercase(true).collect_incorrect(false);
/// assert!(config.collects_correct());
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    absolute_counts: bool,
    collect_correct: bool,
    collect_incorrect: bool,
    lowercase: bool,
    debug_level: usize,
    language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            absolute_counts: false,
            collect_correct: true,
            collect_incorrect: true,
            lowercase: false,
            debug_level: 0,
            language: Language::English,
        }
    }
}

impl Config {
    /// Use raw counts as feature values instead of counts relative to the other parses.
    pub fn absolute_counts(mut self, absolute_counts: bool) -> Self {
        self.absolute_counts = absolute_counts;
        self
    }

    /// Collect features that take a distinct value on the best parse.
    pub fn collect_correct(mut self, collect_correct: bool) -> Self {
        self.collect_correct = collect_correct;
        self
    }

    /// Collect features that vary among the other parses.
    pub fn collect_incorrect(mut self, collect_incorrect: bool) -> Self {
        self.collect_incorrect = collect_incorrect;
        self
    }

    /// Lowercase terminals when trees are annotated.
    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    /// Debug level, features of the reference parses are traced from level 1.
    pub fn debug_level(mut self, debug_level: usize) -> Self {
        self.debug_level = debug_level;
        self
    }

    /// Language of the head rules.
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn uses_absolute_counts(&self) -> bool {
        self.absolute_counts
    }

    pub fn collects_correct(&self) -> bool {
        self.collect_correct
    }

    pub fn collects_incorrect(&self) -> bool {
        self.collect_incorrect
    }

    pub fn lowercases(&self) -> bool {
        self.lowercase
    }

    pub fn get_debug_level(&self) -> usize {
        self.debug_level
    }

    pub fn traces_features(&self) -> bool {
        self.debug_level > 0
    }

    pub fn get_language(&self) -> Language {
        self.language
    }

    /// Check that the configuration can be used for feature extraction.
    ///
    /// At least one of correct and incorrect features has to be collected.
    pub fn validate_for_extraction(&self) -> Result<(), Error> {
        if !self.collect_correct && !self.collect_incorrect {
            return Err(format_err!(
                "Neither correct nor incorrect features are collected, nothing to extract"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::heads::Language;
    use crate::Config;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(!config.uses_absolute_counts());
        assert!(config.collects_correct());
        assert!(config.collects_incorrect());
        assert!(!config.lowercases());
        assert_eq!(config.get_debug_level(), 0);
        assert!(!config.traces_features());
        assert_eq!(config.get_language(), Language::English);
        assert!(config.validate_for_extraction().is_ok());
    }

    #[test]
    fn setters() {
        let config = Config::default()
            .absolute_counts(true)
            .lowercase(true)
            .debug_level(2)
            .language(Language::German)
            .collect_correct(false);
        assert!(config.uses_absolute_counts());
        assert!(config.lowercases());
        assert_eq!(config.get_debug_level(), 2);
        assert!(config.traces_features());
        assert_eq!(config.get_language(), Language::German);
        assert!(config.validate_for_extraction().is_ok());
        assert!(config
            .collect_incorrect(false)
            .validate_for_extraction()
            .is_err());
    }
}
