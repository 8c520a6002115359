use std::collections::{HashMap, HashSet};

use crate::core::context::TaxonomyContext;
use crate::core::types::TaxonId;
use crate::taxonomy::graph::StoreError;
use crate::taxonomy::store::{Span, Taxonomy};

/// Characters with meaning in index queries; `escape_query` neutralises them
pub const SPECIAL_CHARACTERS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

/// Backslash-escape every syntactically significant character
pub fn escape_query(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        if SPECIAL_CHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Name lookups over preferred names and synonyms, scoped by context
pub trait NameIndex {
    /// Make raw user text safe to pass as a query
    fn escape_query(&self, raw: &str) -> String {
        escape_query(raw)
    }

    /// Taxa whose name or synonym equals `query` within `context`.
    ///
    /// May return several taxa for homonyms.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the index cannot answer.
    fn exact_lookup(
        &self,
        context: &TaxonomyContext,
        query: &str,
    ) -> Result<Vec<TaxonId>, StoreError>;

    /// Taxa whose name or synonym is at least `min_identity` similar to `query`
    /// within `context`, most similar first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the index cannot answer.
    fn fuzzy_lookup(
        &self,
        context: &TaxonomyContext,
        query: &str,
        min_identity: f64,
        limit: usize,
    ) -> Result<Vec<TaxonId>, StoreError>;
}

/// How an index key relates to its taxon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Canonical,
    Synonym,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    /// Lowercased name
    key: String,
    key_chars: usize,
    taxon: TaxonId,
    span: Span,
    kind: NameKind,
}

/// In-memory name index over a [`Taxonomy`].
///
/// Indexes canonical names and synonyms of non-deprecated taxa,
/// case-insensitively. Context scoping uses the taxonomy's subtree spans.
#[derive(Debug)]
pub struct TaxonNameIndex {
    entries: Vec<IndexEntry>,
    by_key: HashMap<String, Vec<usize>>,
    spans: HashMap<TaxonId, Span>,
}

impl TaxonNameIndex {
    pub fn build(taxonomy: &Taxonomy) -> Self {
        let mut entries = Vec::new();
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        let mut spans = HashMap::with_capacity(taxonomy.len());

        for taxon in taxonomy.iter() {
            let Some(span) = taxonomy.span(taxon.id) else {
                continue;
            };
            spans.insert(taxon.id, span);
            if taxon.deprecated {
                continue;
            }

            let mut seen: HashSet<String> = HashSet::new();
            let names = std::iter::once((taxon.name.as_str(), NameKind::Canonical)).chain(
                taxon
                    .synonyms
                    .iter()
                    .map(|s| (s.as_str(), NameKind::Synonym)),
            );
            for (name, kind) in names {
                let key = name.trim().to_lowercase();
                if key.is_empty() || !seen.insert(key.clone()) {
                    continue;
                }
                by_key.entry(key.clone()).or_default().push(entries.len());
                entries.push(IndexEntry {
                    key_chars: key.chars().count(),
                    key,
                    taxon: taxon.id,
                    span,
                    kind,
                });
            }
        }

        tracing::debug!(
            "Built name index: {} keys for {} taxa",
            entries.len(),
            spans.len()
        );

        Self {
            entries,
            by_key,
            spans,
        }
    }

    /// How `name` is attached to `taxon` in the index, if at all
    pub fn name_kind(&self, taxon: TaxonId, name: &str) -> Option<NameKind> {
        let key = name.trim().to_lowercase();
        self.by_key.get(&key).and_then(|indices| {
            indices
                .iter()
                .map(|&i| &self.entries[i])
                .find(|e| e.taxon == taxon)
                .map(|e| e.kind)
        })
    }

    /// Number of indexed names (canonical names plus synonyms)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn context_span(&self, context: &TaxonomyContext) -> Result<Span, StoreError> {
        self.spans
            .get(&context.root)
            .copied()
            .ok_or(StoreError::TaxonNotFound(context.root))
    }
}

impl NameIndex for TaxonNameIndex {
    fn exact_lookup(
        &self,
        context: &TaxonomyContext,
        query: &str,
    ) -> Result<Vec<TaxonId>, StoreError> {
        let scope = self.context_span(context)?;
        let pattern = QueryPattern::parse(query);

        let candidates: Vec<&IndexEntry> = if let Some(literal) = pattern.literal() {
            self.by_key
                .get(&literal)
                .map(|indices| indices.iter().map(|&i| &self.entries[i]).collect())
                .unwrap_or_default()
        } else {
            self.entries
                .iter()
                .filter(|e| pattern.matches(&e.key))
                .collect()
        };

        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .filter(|e| scope.contains(e.span))
            .map(|e| e.taxon)
            .filter(|id| seen.insert(*id))
            .collect())
    }

    fn fuzzy_lookup(
        &self,
        context: &TaxonomyContext,
        query: &str,
        min_identity: f64,
        limit: usize,
    ) -> Result<Vec<TaxonId>, StoreError> {
        let scope = self.context_span(context)?;
        let text = QueryPattern::parse(query).text();
        let text_chars = text.chars().count();
        if text_chars == 0 {
            return Ok(Vec::new());
        }

        let mut best: HashMap<TaxonId, f64> = HashMap::new();
        for entry in self.entries.iter().filter(|e| scope.contains(e.span)) {
            // Levenshtein distance is at least the length difference
            let longest = text_chars.max(entry.key_chars);
            let length_gap = text_chars.abs_diff(entry.key_chars);
            if 1.0 - count_to_f64(length_gap) / count_to_f64(longest) < min_identity {
                continue;
            }

            let identity = strsim::normalized_levenshtein(&text, &entry.key);
            if identity >= min_identity {
                let slot = best.entry(entry.taxon).or_insert(identity);
                if identity > *slot {
                    *slot = identity;
                }
            }
        }

        let mut ranked: Vec<(TaxonId, f64)> = best.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(limit);
        Ok(ranked.into_iter().map(|(id, _)| id).collect())
    }
}

#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// Unescaped `*`
    AnyRun,
    /// Unescaped `?`
    AnyChar,
}

/// A parsed index query: lowercased literals plus wildcards
#[derive(Debug)]
struct QueryPattern {
    tokens: Vec<Token>,
}

impl QueryPattern {
    fn parse(query: &str) -> Self {
        let mut tokens = Vec::with_capacity(query.len());
        let mut chars = query.trim().chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let literal = chars.next().unwrap_or('\\');
                    tokens.extend(literal.to_lowercase().map(Token::Literal));
                }
                '*' => tokens.push(Token::AnyRun),
                '?' => tokens.push(Token::AnyChar),
                _ => tokens.extend(c.to_lowercase().map(Token::Literal)),
            }
        }
        Self { tokens }
    }

    /// The query text if it has no wildcards
    fn literal(&self) -> Option<String> {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Literal(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// The query text with wildcards taken literally
    fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Literal(c) => *c,
                Token::AnyRun => '*',
                Token::AnyChar => '?',
            })
            .collect()
    }

    /// Glob match against a lowercased key
    fn matches(&self, key: &str) -> bool {
        let key: Vec<char> = key.chars().collect();
        let (mut t, mut k) = (0, 0);
        let mut backtrack: Option<(usize, usize)> = None;

        while k < key.len() {
            match self.tokens.get(t) {
                Some(Token::AnyRun) => {
                    backtrack = Some((t, k));
                    t += 1;
                }
                Some(Token::AnyChar) => {
                    t += 1;
                    k += 1;
                }
                Some(Token::Literal(c)) if *c == key[k] => {
                    t += 1;
                    k += 1;
                }
                _ => match backtrack {
                    Some((star, consumed)) => {
                        t = star + 1;
                        k = consumed + 1;
                        backtrack = Some((star, consumed + 1));
                    }
                    None => return false,
                },
            }
        }
        self.tokens[t..].iter().all(|tok| *tok == Token::AnyRun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ContextRegistry;
    use crate::core::taxon::Taxon;

    fn fixture() -> (Taxonomy, TaxonNameIndex, ContextRegistry) {
        let taxonomy = Taxonomy::from_taxa(vec![
            Taxon::new(1, "life"),
            Taxon::new(2, "Metazoa").with_parent(1),
            Taxon::new(3, "Aves").with_parent(2),
            Taxon::new(4, "Morus").with_parent(3),
            Taxon::new(5, "Embryophyta").with_parent(1),
            Taxon::new(6, "Morus").with_parent(5),
            Taxon::new(7, "Quercus").with_parent(5).with_synonyms(["Cerris"]),
            Taxon::new(8, "Quercus robur").with_parent(7),
            Taxon::new(9, "Oldnameia").with_parent(5).deprecated(),
            Taxon::new(10, "Homo sapiens (fossil)").with_parent(2),
        ])
        .unwrap();
        let index = TaxonNameIndex::build(&taxonomy);
        let registry = taxonomy.context_registry();
        (taxonomy, index, registry)
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("Quercus"), "Quercus");
        assert_eq!(escape_query("Homo (fossil)"), "Homo \\(fossil\\)");
        assert_eq!(escape_query("a:b*"), "a\\:b\\*");
        assert_eq!(escape_query("x\\y"), "x\\\\y");
    }

    #[test]
    fn test_exact_lookup_case_insensitive() {
        let (_, index, registry) = fixture();
        let hits = index.exact_lookup(registry.root(), "quercus").unwrap();
        assert_eq!(hits, vec![TaxonId(7)]);
    }

    #[test]
    fn test_exact_lookup_homonyms_and_scoping() {
        let (_, index, registry) = fixture();
        let all = index.exact_lookup(registry.root(), "Morus").unwrap();
        assert_eq!(all, vec![TaxonId(4), TaxonId(6)]);

        let birds = registry.get("BIRDS").unwrap();
        assert_eq!(index.exact_lookup(birds, "Morus").unwrap(), vec![TaxonId(4)]);

        let plants = registry.get("LAND_PLANTS").unwrap();
        assert_eq!(index.exact_lookup(plants, "Morus").unwrap(), vec![TaxonId(6)]);
    }

    #[test]
    fn test_exact_lookup_synonyms() {
        let (_, index, registry) = fixture();
        let hits = index.exact_lookup(registry.root(), "Cerris").unwrap();
        assert_eq!(hits, vec![TaxonId(7)]);
        assert_eq!(index.name_kind(TaxonId(7), "cerris"), Some(NameKind::Synonym));
        assert_eq!(index.name_kind(TaxonId(7), "Quercus"), Some(NameKind::Canonical));
        assert_eq!(index.name_kind(TaxonId(8), "Quercus"), None);
    }

    #[test]
    fn test_exact_lookup_skips_deprecated() {
        let (_, index, registry) = fixture();
        assert!(index.exact_lookup(registry.root(), "Oldnameia").unwrap().is_empty());
    }

    #[test]
    fn test_wildcards_only_when_unescaped() {
        let (_, index, registry) = fixture();
        let wild = index.exact_lookup(registry.root(), "Quercus*").unwrap();
        assert_eq!(wild, vec![TaxonId(7), TaxonId(8)]);

        let escaped = index
            .exact_lookup(registry.root(), &escape_query("Quercus*"))
            .unwrap();
        assert!(escaped.is_empty());

        let single = index.exact_lookup(registry.root(), "M?rus").unwrap();
        assert_eq!(single.len(), 2);
    }

    #[test]
    fn test_escaped_special_characters_match_literally() {
        let (_, index, registry) = fixture();
        let query = escape_query("Homo sapiens (fossil)");
        let hits = index.exact_lookup(registry.root(), &query).unwrap();
        assert_eq!(hits, vec![TaxonId(10)]);
    }

    #[test]
    fn test_fuzzy_lookup() {
        let (_, index, registry) = fixture();
        let hits = index.fuzzy_lookup(registry.root(), "Qercus", 0.8, 10).unwrap();
        assert_eq!(hits, vec![TaxonId(7)]);

        let plants = registry.get("LAND_PLANTS").unwrap();
        let none = index
            .fuzzy_lookup(registry.get("METAZOA").unwrap(), "Qercus", 0.8, 10)
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(
            index.fuzzy_lookup(plants, "Qercus", 0.8, 10).unwrap(),
            vec![TaxonId(7)]
        );
    }

    #[test]
    fn test_fuzzy_lookup_ranks_and_limits() {
        let (_, index, registry) = fixture();
        let hits = index.fuzzy_lookup(registry.root(), "Morrus", 0.5, 10).unwrap();
        assert_eq!(&hits[..2], &[TaxonId(4), TaxonId(6)]);

        let limited = index.fuzzy_lookup(registry.root(), "Morrus", 0.5, 1).unwrap();
        assert_eq!(limited, vec![TaxonId(4)]);
    }

    #[test]
    fn test_fuzzy_lookup_empty_query() {
        let (_, index, registry) = fixture();
        assert!(index.fuzzy_lookup(registry.root(), "  ", 0.1, 10).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_context_root_is_store_error() {
        let (_, index, registry) = fixture();
        let mut context = registry.root().clone();
        context.root = TaxonId(999);
        assert_eq!(
            index.exact_lookup(&context, "Morus"),
            Err(StoreError::TaxonNotFound(TaxonId(999)))
        );
    }
}
