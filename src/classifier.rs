// =============================================================================
// classifier.rs - KEYWORD MEMBERSHIP, NOTHING CLEVERER
// =============================================================================
//
// Three independent taxonomies, one technique: does the lower-cased text
// contain any of these words? Each vocabulary is a list of rules, each rule
// is a label plus an Aho-Corasick automaton over its keywords.
//
//   topic/severity  - over the title, first rule that fires wins
//   source type     - over the source label, first rule that fires wins
//   technique tags  - over title + source, EVERY rule that fires, or `other`
//
// Yes, "gov" matches "Gove". Yes, "Reuters" is `unknown`. The crudeness
// is the behaviour everyone downstream already relies on. Do not upgrade it
// to anything that needs a GPU.
//
// Vocabularies are values, not control flow. Swap one out with
// `Classifier::new` and the rest of the pipeline never notices.
// =============================================================================

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, BuildError};
use rayon::prelude::*;
use tracing::debug;

use crate::models::{Severity, SourceType, TechniqueTag, Topic};
use crate::window_scanner::Candidate;

static TOPIC_RULES: LazyLock<Vec<((Topic, Severity), Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        ((Topic::Fraud, Severity::High), vec!["fraud", "scam"]),
        ((Topic::Crime, Severity::High), vec!["trafficking", "smuggling"]),
        ((Topic::Corruption, Severity::High), vec!["corruption"]),
    ]
});

const TOPIC_FALLBACK: (Topic, Severity) = (Topic::Crime, Severity::Medium);

static SOURCE_TYPE_RULES: LazyLock<Vec<(SourceType, Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        (SourceType::Official, vec!["eppo", "europol", "fca", "gov"]),
        (SourceType::News, vec!["guardian", "bbc"]),
        (SourceType::Report, vec!["occrp", "global initiative"]),
    ]
});

static TECHNIQUE_RULES: LazyLock<Vec<(TechniqueTag, Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        (
            TechniqueTag::RealEstate,
            vec!["real estate", "property", "properties", "mansion", "apartment", "housing"],
        ),
        (
            TechniqueTag::Cryptocurrency,
            vec![
                "crypto", "bitcoin", "ethereum", "blockchain", "stablecoin", "tether",
                "usdt", "nft", "mixer",
            ],
        ),
        (
            TechniqueTag::LuxuryGoods,
            vec!["luxury", "rolex", "watches", "yacht", "supercar", "handbag", "artwork", "painting"],
        ),
        (
            TechniqueTag::PreciousMetals,
            vec![
                "gold bar", "gold bullion", "gold trad", "gold smuggl", "gold refiner",
                "gold dealer", "silver", "diamond", "bullion", "platinum", "precious metal",
            ],
        ),
        (
            TechniqueTag::ShellBanking,
            vec!["shell bank", "correspondent bank", "offshore bank", "bank account", "banking licence", "banking license"],
        ),
        (
            TechniqueTag::Lending,
            vec!["loan", "lending", "mortgage", "lender", "microfinance"],
        ),
        (
            TechniqueTag::Gaming,
            vec![
                "casino", "gambling", "sports betting", "online betting", "betting shop",
                "bookmaker", "poker", "lottery", "gaming",
            ],
        ),
        (
            TechniqueTag::TradeBased,
            vec![
                "trade-based", "trade based", "invoice", "invoicing", "customs",
                "exporter", "importer", "exports", "imports", "import-export",
            ],
        ),
        (
            TechniqueTag::CashCourier,
            vec!["cash courier", "courier", "bulk cash", "money mule", "mules", "hawala", "suitcase"],
        ),
        (
            TechniqueTag::CashIntensiveRetail,
            vec!["restaurant", "car wash", "nail salon", "barber", "kebab", "cash-intensive", "cash intensive", "laundromat"],
        ),
        (
            TechniqueTag::CorporateVehicles,
            vec![
                "shell compan", "front compan", "offshore compan", "beneficial owner",
                "nominee", "trust fund", "limited liability", "limited partnership",
            ],
        ),
        (
            TechniqueTag::CharitableFronts,
            vec!["charity", "charities", "charitable", "non-governmental", "non-profit", "nonprofit", "donation"],
        ),
        (
            TechniqueTag::InsuranceFunds,
            vec!["insurance", "pension", "investment fund", "hedge fund", "life policy", "annuity"],
        ),
    ]
});

static STANDARD: LazyLock<Classifier> = LazyLock::new(|| {
    Classifier::from_tables(&TOPIC_RULES, &SOURCE_TYPE_RULES, &TECHNIQUE_RULES)
        .expect("built-in keyword vocabularies are valid")
});

/// One label and the keywords that earn it.
#[derive(Debug, Clone)]
pub struct KeywordRule<L> {
    label: L,
    automaton: AhoCorasick,
}

impl<L: Copy> KeywordRule<L> {
    pub fn new<S: AsRef<str>>(label: L, keywords: &[S]) -> Result<Self, BuildError> {
        let lowered: Vec<String> = keywords.iter().map(|k| k.as_ref().to_lowercase()).collect();
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&lowered)?;
        Ok(Self { label, automaton })
    }

    /// `text` is expected to be lower-cased already.
    fn fires(&self, text: &str) -> bool {
        self.automaton.is_match(text)
    }
}

/// An ordered list of rules for one taxonomy.
#[derive(Debug, Clone)]
pub struct Vocabulary<L> {
    rules: Vec<KeywordRule<L>>,
}

impl<L: Copy> Default for Vocabulary<L> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<L: Copy> Vocabulary<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Earlier rules take precedence in `first_match`.
    pub fn with_rule<S: AsRef<str>>(mut self, label: L, keywords: &[S]) -> Result<Self, BuildError> {
        self.rules.push(KeywordRule::new(label, keywords)?);
        Ok(self)
    }

    fn from_table(table: &[(L, Vec<&str>)]) -> Result<Self, BuildError> {
        table
            .iter()
            .try_fold(Self::new(), |vocab, (label, words)| vocab.with_rule(*label, words.as_slice()))
    }

    /// Label of the first rule that fires on the lower-cased text.
    pub fn first_match(&self, text: &str) -> Option<L> {
        let lowered = text.to_lowercase();
        self.rules.iter().find(|r| r.fires(&lowered)).map(|r| r.label)
    }

    /// Labels of every rule that fires, in rule order.
    pub fn all_matches(&self, text: &str) -> Vec<L> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .filter(|r| r.fires(&lowered))
            .map(|r| r.label)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Everything the classifier says about one `(title, source)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub topic: Topic,
    pub severity: Severity,
    pub source_type: SourceType,
    pub technique_tags: Vec<TechniqueTag>,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    topics: Vocabulary<(Topic, Severity)>,
    source_types: Vocabulary<SourceType>,
    techniques: Vocabulary<TechniqueTag>,
}

impl Classifier {
    pub fn new(
        topics: Vocabulary<(Topic, Severity)>,
        source_types: Vocabulary<SourceType>,
        techniques: Vocabulary<TechniqueTag>,
    ) -> Self {
        debug!(
            topic_rules = topics.len(),
            source_type_rules = source_types.len(),
            technique_rules = techniques.len(),
            "Classifier vocabularies compiled"
        );
        Self { topics, source_types, techniques }
    }

    /// The built-in vocabularies, compiled once per process.
    pub fn standard() -> &'static Classifier {
        &STANDARD
    }

    fn from_tables(
        topics: &[((Topic, Severity), Vec<&str>)],
        source_types: &[(SourceType, Vec<&str>)],
        techniques: &[(TechniqueTag, Vec<&str>)],
    ) -> Result<Self, BuildError> {
        Ok(Self::new(
            Vocabulary::from_table(topics)?,
            Vocabulary::from_table(source_types)?,
            Vocabulary::from_table(techniques)?,
        ))
    }

    pub fn topic(&self, title: &str) -> (Topic, Severity) {
        self.topics.first_match(title).unwrap_or(TOPIC_FALLBACK)
    }

    pub fn source_type(&self, source: &str) -> SourceType {
        self.source_types.first_match(source).unwrap_or(SourceType::Unknown)
    }

    /// Every technique the title or source mentions, or just `Other`.
    pub fn technique_tags(&self, title: &str, source: &str) -> Vec<TechniqueTag> {
        let tags = self.techniques.all_matches(&format!("{} {}", title, source));
        if tags.is_empty() {
            vec![TechniqueTag::Other]
        } else {
            tags
        }
    }

    /// Pure function of `(title, source)`.
    pub fn classify(&self, title: &str, source: &str) -> Classification {
        let (topic, severity) = self.topic(title);
        let classification = Classification {
            topic,
            severity,
            source_type: self.source_type(source),
            technique_tags: self.technique_tags(title, source),
        };
        debug!(
            title = title,
            topic = %classification.topic,
            severity = %classification.severity,
            source_type = %classification.source_type,
            tags = classification.technique_tags.len(),
            "Classified candidate"
        );
        classification
    }

    /// Classify a page's worth of candidates in parallel. Output order
    /// matches input order.
    pub fn classify_batch(&self, candidates: &[Candidate]) -> Vec<Classification> {
        candidates
            .par_iter()
            .map(|c| self.classify(&c.title, &c.source))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> &'static Classifier {
        Classifier::standard()
    }

    #[test]
    fn test_scam_from_europol_is_official_high_fraud() {
        let c = classifier().classify("Europe-wide investment scam network dismantled", "Europol");
        assert_eq!(c.topic, Topic::Fraud);
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.source_type, SourceType::Official);
    }

    #[test]
    fn test_topic_rules_first_match_wins() {
        let c = classifier();
        assert_eq!(c.topic("Smuggling ring ran a tax FRAUD on the side"), (Topic::Fraud, Severity::High));
        assert_eq!(c.topic("Human trafficking gang jailed"), (Topic::Crime, Severity::High));
        assert_eq!(c.topic("Corruption trial of former minister opens"), (Topic::Corruption, Severity::High));
        assert_eq!(c.topic("Bank fined for weak controls"), (Topic::Crime, Severity::Medium));
    }

    #[test]
    fn test_source_type_rules() {
        let c = classifier();
        assert_eq!(c.source_type("UK FCA"), SourceType::Official);
        assert_eq!(c.source_type("The Guardian"), SourceType::News);
        assert_eq!(c.source_type("OCCRP"), SourceType::Report);
        assert_eq!(c.source_type("Global Initiative Against Transnational Organized Crime"), SourceType::Report);
        assert_eq!(c.source_type("Some Blog"), SourceType::Unknown);
    }

    #[test]
    fn test_wire_services_and_watchdogs_are_unknown() {
        let c = classifier();
        for source in ["Reuters", "Bloomberg", "ICIJ", "Metropolitan Police", "Interpol"] {
            assert_eq!(c.source_type(source), SourceType::Unknown, "{source}");
        }
    }

    #[test]
    fn test_technique_keywords_skip_common_words() {
        let tags = classifier().technique_tags(
            "Important ruling in Congo as Goldman settles, prosecutors say aiding and abetting",
            "Village Voice",
        );
        assert_eq!(tags, vec![TechniqueTag::Other]);
    }

    #[test]
    fn test_technique_keywords_still_fire_on_real_phrases() {
        let c = classifier();
        assert_eq!(
            c.technique_tags("Gold smuggling ring used fake exporter invoices", "OCCRP"),
            vec![TechniqueTag::PreciousMetals, TechniqueTag::TradeBased]
        );
        assert_eq!(
            c.technique_tags("Non-governmental group was a front for a betting shop chain", "BBC"),
            vec![TechniqueTag::Gaming, TechniqueTag::CharitableFronts]
        );
    }

    #[test]
    fn test_substring_matching_is_intentionally_crude() {
        // "gov" inside a surname still counts as government.
        assert_eq!(classifier().source_type("Gove & Partners Law Blog"), SourceType::Official);
    }

    #[test]
    fn test_classification_is_pure() {
        let title = "Crypto casino laundered proceeds through London property";
        let a = classifier().classify(title, "BBC");
        let b = classifier().classify(title, "BBC");
        assert_eq!(a, b);
    }

    #[test]
    fn test_technique_tags_are_multi_label() {
        let tags = classifier().technique_tags(
            "Crypto casino laundered proceeds through London property",
            "BBC",
        );
        assert_eq!(
            tags,
            vec![TechniqueTag::RealEstate, TechniqueTag::Cryptocurrency, TechniqueTag::Gaming]
        );
    }

    #[test]
    fn test_technique_tags_read_the_source_too() {
        let tags = classifier().technique_tags("Nine arrested after long investigation", "Charity Commission");
        assert_eq!(tags, vec![TechniqueTag::CharitableFronts]);
    }

    #[test]
    fn test_no_technique_match_is_other() {
        let tags = classifier().technique_tags("Nine arrested after long investigation", "Reuters");
        assert_eq!(tags, vec![TechniqueTag::Other]);
    }

    #[test]
    fn test_custom_vocabulary_plugs_in() {
        let custom = Classifier::new(
            Vocabulary::new().with_rule((Topic::Corruption, Severity::Medium), &["bribe"]).unwrap(),
            Vocabulary::new().with_rule(SourceType::News, &["herald"]).unwrap(),
            Vocabulary::new(),
        );
        let c = custom.classify("Mayor took a BRIBE from developer", "The Herald");
        assert_eq!((c.topic, c.severity), (Topic::Corruption, Severity::Medium));
        assert_eq!(c.source_type, SourceType::News);
        assert_eq!(c.technique_tags, vec![TechniqueTag::Other]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let candidates = vec![
            Candidate {
                source: "Europol".to_string(),
                date: "1 May 2020".to_string(),
                title: "Phone scam call centre raided in Kyiv".to_string(),
            },
            Candidate {
                source: "Unknown Blog".to_string(),
                date: "2 May 2020".to_string(),
                title: "Officials suspended in corruption probe".to_string(),
            },
        ];
        let results = classifier().classify_batch(&candidates);
        assert_eq!(results[0].topic, Topic::Fraud);
        assert_eq!(results[1].topic, Topic::Corruption);
        assert_eq!(results[1].source_type, SourceType::Unknown);
    }
}
