//! Template-based post generation on top of the retriever.
//!
//! Retrieval ranks example posts; choosing the first one as context and
//! falling back to a fixed sentence when nothing comes back is decided here,
//! so the retriever can serve other consumers unchanged.


mod templates;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::PostsmithError;
use crate::config::Config;
use crate::retriever::{RetrievedDocument, Retriever};

pub use templates::template;

/// Context used when no example post can be retrieved
pub const DEFAULT_CONTEXT: &str = "Consistency and learning drive long-term professional success.";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Motivational,
    Emotional,
    Funny,
}

impl Tone {
    pub const ALL: [Self; 4] = [
        Self::Professional,
        Self::Motivational,
        Self::Emotional,
        Self::Funny,
    ];
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Professional => "professional",
            Self::Motivational => "motivational",
            Self::Emotional => "emotional",
            Self::Funny => "funny",
        };
        f.write_str(name)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PostLength {
    #[default]
    Short,
    Medium,
    Long,
}

impl PostLength {
    pub const ALL: [Self; 3] = [Self::Short, Self::Medium, Self::Long];
}

impl std::fmt::Display for PostLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Topic must not be empty")]
    EmptyTopic,
}

impl From<GenerationError> for PostsmithError {
    #[inline]
    fn from(err: GenerationError) -> Self {
        Self::Generation(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub topic: String,
    pub tone: Tone,
    pub length: PostLength,
}

/// Where the context sentence of a post came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSource {
    Retrieved { id: String },
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPost {
    pub text: String,
    pub context_source: ContextSource,
}

/// Python-style title casing: the first cased character after any uncased
/// character is upper-cased, every other cased character lower-cased.
#[inline]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;

    for c in text.chars() {
        let cased = c.is_lowercase() || c.is_uppercase();
        if !cased {
            out.push(c);
        } else if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_cased = cased;
    }

    out
}

/// Fill the `(tone, length)` template.
///
/// `{title}` becomes the title-cased topic and `{topic}` the lower-cased
/// topic. Placeholders inside `topic` or `context` are left as written.
#[inline]
pub fn render_post(topic: &str, context: &str, tone: Tone, length: PostLength) -> String {
    let title = title_case(topic);
    let lowered = topic.to_lowercase();
    let source = template(tone, length);

    let mut out = String::with_capacity(source.len() + context.len() + 2 * topic.len());
    let mut rest = source;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let (value, skip) = if tail.starts_with("{title}") {
            (title.as_str(), "{title}".len())
        } else if tail.starts_with("{topic}") {
            (lowered.as_str(), "{topic}".len())
        } else if tail.starts_with("{context}") {
            (context, "{context}".len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &tail[skip..];
    }
    out.push_str(rest);

    out
}

/// The first retrieved document's text, or `fallback` when there is none
#[inline]
pub fn select_context<'a>(documents: &'a [RetrievedDocument], fallback: &'a str) -> &'a str {
    documents.first().map_or(fallback, |doc| doc.text.as_str())
}

/// Prompt asking an LLM to write a post on `topic` in the style of `examples`
#[inline]
pub fn build_style_prompt<I, S>(examples: I, topic: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let examples: Vec<S> = examples.into_iter().collect();
    let joined = examples
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n\n");

    format!(
        "\nYou are a LinkedIn content creator.\n\n\
         Below are example LinkedIn posts written in a specific style.\n\
         Carefully observe their tone, structure, emojis, and formatting.\n\n\
         EXAMPLE POSTS:\n{joined}\n\n\
         TASK:\nWrite a new LinkedIn post on the topic:\n\"{topic}\"\n\n\
         RULES:\n\
         - Follow the same writing style\n\
         - Use professional but engaging tone\n\
         - Use emojis naturally\n\
         - Keep line breaks like LinkedIn posts\n\
         - End with a question or CTA\n"
    )
}

/// Generates posts using retrieved example posts as context
pub struct PostGenerator<'a> {
    retriever: &'a Retriever,
    results: usize,
    default_context: String,
}

impl<'a> PostGenerator<'a> {
    #[inline]
    pub fn new(retriever: &'a Retriever, config: &Config) -> Self {
        Self {
            retriever,
            results: config.index.default_results,
            default_context: config.generation.default_context.clone(),
        }
    }

    /// Render a post for `request`.
    ///
    /// Retrieval problems never fail generation; they only switch the
    /// context to the configured fallback.
    #[inline]
    pub async fn generate(&self, request: &PostRequest) -> Result<GeneratedPost, GenerationError> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(GenerationError::EmptyTopic);
        }

        let documents = self.retriever.retrieve(topic, self.results).await;
        let context = select_context(&documents, &self.default_context);
        let context_source = documents
            .first()
            .map_or(ContextSource::Fallback, |doc| ContextSource::Retrieved {
                id: doc.id.clone(),
            });

        match &context_source {
            ContextSource::Retrieved { id } => debug!("Using {} as context", id),
            ContextSource::Fallback => info!("No example post retrieved, using default context"),
        }

        Ok(GeneratedPost {
            text: render_post(topic, context, request.tone, request.length),
            context_source,
        })
    }

    /// LLM prompt built from the retrieved examples for `topic`
    #[inline]
    pub async fn style_prompt(&self, topic: &str) -> Result<String, GenerationError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GenerationError::EmptyTopic);
        }

        let documents = self.retriever.retrieve(topic, self.results).await;
        let examples: Vec<&str> = if documents.is_empty() {
            vec![self.default_context.as_str()]
        } else {
            documents.iter().map(|doc| doc.text.as_str()).collect()
        };

        Ok(build_style_prompt(examples, topic))
    }
}
