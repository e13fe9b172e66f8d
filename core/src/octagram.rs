//! Collocation scoring over a grammar database.
//!
//! [`Octagram::query`] rates how plausibly `word` follows `context`. It looks
//! up every suffix of the (at most 8 character) context window against the
//! prefixes of the word window and keeps the single best candidate:
//!
//! ```text
//! candidate = ln(frequency) + penalty
//! penalty   = collocation_penalty       if context_len + match_len >= min_length
//!                                       or both windows matched whole
//!             weak_collocation_penalty  otherwise
//! ```
//!
//! A word closing the phrase may also be rated against the `word + "$"`
//! boundary key with `rear_penalty`. With no evidence the score is
//! `non_collocation_penalty`.
use crate::config::{ConfigReader, GrammarConfig};
use crate::encoding::{self, MAX_ENCODED_UNICODE};
use crate::gram_db::{scale_value, GramDb};
use crate::registry::GramDbRegistry;
use crate::resource::ResourceResolver;
use std::sync::Arc;
use tracing::{debug, info};

/// Language used by the build tool when none is given.
pub const GRAMMAR_DEFAULT_LANGUAGE: &str = "zh-hant";
/// Name under which the component is registered with a host.
pub const COMPONENT_NAME: &str = "grammar";

/// Boundary marker key appended to phrase-final words.
const REAR_MARKER: &[u8] = b"$";

/// A collocation scorer.
pub trait Grammar: Send + Sync {
    fn query(&self, context: &str, word: &str, is_rear: bool) -> f64;
}

/// Factory handed to a host to create a [`Grammar`] per session.
pub trait GrammarComponent: Send + Sync {
    fn create(&self, config: Option<&dyn ConfigReader>) -> Box<dyn Grammar>;
}

pub struct Octagram {
    db: Option<Arc<GramDb>>,
    config: GrammarConfig,
}

impl Octagram {
    /// Create a scorer for the session described by `config`.
    ///
    /// Without a `grammar/language` setting no database is bound and the
    /// default tunables apply.
    pub fn new(config: Option<&dyn ConfigReader>, component: &OctagramComponent) -> Self {
        let mut grammar = GrammarConfig::default();
        let Some(config) = config else {
            return Self::with_db(None, grammar);
        };
        let Some(language) = config.get_string("grammar/language") else {
            return Self::with_db(None, grammar);
        };
        info!("use grammar: {}", language);
        grammar.update_from(config);
        let db = if language.is_empty() {
            None
        } else {
            component.get_db(&language)
        };
        Self::with_db(db, grammar)
    }

    /// Scorer over an already loaded database.
    pub fn with_db(db: Option<Arc<GramDb>>, config: GrammarConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    pub fn has_db(&self) -> bool {
        self.db.is_some()
    }

    fn window_size(&self) -> usize {
        let n = (self.config.collocation_max_length - 1).max(0) as usize;
        n.min(MAX_ENCODED_UNICODE)
    }

    /// Score `word` following `context`; higher is more plausible.
    pub fn query(&self, context: &str, word: &str, is_rear: bool) -> f64 {
        let floor = self.config.non_collocation_penalty;
        let db = match &self.db {
            Some(db) if !context.is_empty() => db,
            _ => return floor,
        };
        let mut result = floor;

        let n = self.window_size();
        let (context_tail, mut context_len) = last_n_chars(context, n);
        let context_query = encoding::encode(context_tail);
        let (word_head, word_query_len) = first_n_chars(word, n);
        let word_query = encoding::encode(word_head);

        let mut context_ptr: &[u8] = &context_query;
        while context_len > 0 {
            let matches = db.lookup(context_ptr, &word_query);
            debug!("lookup({:?} + {:?}) returns {} results", context_ptr, word_query, matches.len());
            for m in &matches {
                let match_len = encoding::unicode_length(&word_query[..m.length]);
                let collocation_len = (context_len + match_len) as i64;
                let whole_query =
                    context_ptr.len() == context_query.len() && m.length == word_query.len();
                let penalty = if collocation_len >= self.config.collocation_min_length || whole_query
                {
                    self.config.collocation_penalty
                } else {
                    self.config.weak_collocation_penalty
                };
                if update_result(&mut result, scale_value(m.value) + penalty) {
                    debug!(
                        "update: {}[{}] + {}[{}] = {}",
                        context, context_len, word, match_len, result
                    );
                }
            }
            context_len -= 1;
            context_ptr = encoding::next_unit(context_ptr);
        }

        if is_rear && word_query_len == word.chars().count() {
            let rear = db
                .lookup(&word_query, REAR_MARKER)
                .into_iter()
                .find(|m| m.length == REAR_MARKER.len());
            if let Some(m) = rear {
                if update_result(&mut result, scale_value(m.value) + self.config.rear_penalty) {
                    debug!("update: {}$ / {}", word, result);
                }
            }
        }
        debug!("context = {}, word = {} / {}", context, word, result);
        result
    }
}

impl Grammar for Octagram {
    fn query(&self, context: &str, word: &str, is_rear: bool) -> f64 {
        Octagram::query(self, context, word, is_rear)
    }
}

#[inline]
fn update_result(result: &mut f64, value: f64) -> bool {
    if value > *result {
        *result = value;
        true
    } else {
        false
    }
}

/// The last `n` characters of `s` and how many were taken.
fn last_n_chars(s: &str, n: usize) -> (&str, usize) {
    let mut start = s.len();
    let mut count = 0;
    for (i, _) in s.char_indices().rev().take(n) {
        start = i;
        count += 1;
    }
    (&s[start..], count)
}

/// The first `n` characters of `s` and how many were taken.
fn first_n_chars(s: &str, n: usize) -> (&str, usize) {
    let mut end = 0;
    let mut count = 0;
    for ch in s.chars().take(n) {
        end += ch.len_utf8();
        count += 1;
    }
    (&s[..end], count)
}

/// Creates [`Octagram`] scorers sharing one [`GramDbRegistry`].
pub struct OctagramComponent {
    registry: GramDbRegistry,
}

impl OctagramComponent {
    pub fn new(resolver: Box<dyn ResourceResolver>) -> Self {
        Self {
            registry: GramDbRegistry::new(resolver),
        }
    }

    pub fn get_db(&self, language: &str) -> Option<Arc<GramDb>> {
        self.registry.get_db(language)
    }

    pub fn registry(&self) -> &GramDbRegistry {
        &self.registry
    }
}

impl GrammarComponent for OctagramComponent {
    fn create(&self, config: Option<&dyn ConfigReader>) -> Box<dyn Grammar> {
        Box::new(Octagram::new(config, self))
    }
}
