use crate::parser::strip_markup;
use crate::types::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const MAX_TOPICS: usize = 5;
pub const MAX_ENTITIES: usize = 10;

/// What the analysis collaborator returns for one item.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub summary: String,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
}

/// Content-analysis capability. The collaborator is treated as
/// authoritative; the pipeline does not retry its failures.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, title: &str, content: &str) -> Result<Analysis>;
}

/// Text-embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Deterministic analyzer usable offline and in tests: extractive
/// summary, lexicon-matched topics, capitalized-token entities.
pub struct HeuristicAnalyzer;

const TOPIC_LEXICON: &[(&str, &[&str])] = &[
    ("technology", &["tech", "software", "computer", "internet", "digital", "programming"]),
    ("business", &["business", "finance", "market", "economy", "startup", "company"]),
    ("politics", &["politics", "political", "election", "government", "policy"]),
    ("science", &["science", "research", "study", "physics", "biology"]),
    ("health", &["health", "medical", "medicine", "disease", "hospital"]),
    ("sports", &["sports", "game", "match", "tournament", "league"]),
    ("climate", &["climate", "environment", "energy", "carbon", "emissions"]),
];

const ENTITY_STOPWORDS: &[&str] = &[
    "The", "This", "That", "These", "Those", "And", "But", "For", "Not", "With", "From", "What",
    "When", "Where", "How", "Why", "Who",
];

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    async fn analyze(&self, title: &str, content: &str) -> Result<Analysis> {
        let text = strip_markup(content);
        let haystack = format!("{} {}", title, text).to_lowercase();

        let mut topics = Vec::new();
        for (topic, keywords) in TOPIC_LEXICON {
            if keywords.iter().any(|kw| haystack.contains(kw)) {
                topics.push(topic.to_string());
            }
        }
        topics.truncate(MAX_TOPICS);

        // Capitalized words as candidate entities, as crude NER.
        let mut entities = Vec::new();
        for word in format!("{title} {text}").split_whitespace() {
            let clean = word.trim_matches(|c: char| !c.is_alphabetic());
            if clean.len() > 2
                && clean.chars().next().is_some_and(|c| c.is_uppercase())
                && !ENTITY_STOPWORDS.contains(&clean)
            {
                entities.push(clean.to_string());
            }
        }
        entities.sort();
        entities.dedup();
        entities.truncate(MAX_ENTITIES);

        let summary = extractive_summary(title, &text);

        Ok(Analysis {
            summary,
            topics,
            entities,
        })
    }
}

fn extractive_summary(title: &str, text: &str) -> String {
    let sentences: Vec<&str> = text
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(2)
        .collect();
    if sentences.is_empty() {
        title.to_string()
    } else {
        format!("{}.", sentences.join(". "))
    }
}

/// Hashed bag-of-words embedder. Deterministic, so identical texts embed
/// identically and overlapping texts land near each other, which is all
/// the connection detector needs offline.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dims];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let index = (hasher.finish() as usize) % self.dims;
            vector[index] += 1.0;
        }
        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }
        Ok(vector)
    }
}
