//! # Tagset — Tipos de Entidade e Marcadores Sentinela
//!
//! Ferramentas de anotação como o GATE embutem as entidades no HTML usando
//! tags próprias (`<PER>João</PER>`). Esse HTML costuma ser inválido, então
//! antes do parsing as tags conhecidas são trocadas por pseudo-tokens:
//!
//! ```text
//! <p>Vá para <CITY>Montevideo</CITY></p>
//! <p>Vá para  __CITY_START Montevideo __CITY_END </p>
//! ```
//!
//! O encoder IOB2 reconhece esses pseudo-tokens no fluxo de tokens e os
//! consome sem rotulá-los.
//!
//! Os nomes são escapados antes de montar os padrões: um tipo como `A+B` casa
//! apenas com o texto literal `A+B`.

use std::collections::BTreeSet;

use regex::{Captures, Regex};

/// Tipos de entidade usados por padrão.
pub const DEFAULT_TAGS: &[&str] = &[
    "ORG", "PER", "SUBJ", "STREET", "CITY", "STATE", "COUNTRY", "EMAIL", "TEL", "FAX",
];

/// Conjunto imutável de tipos de entidade, sem distinção de maiúsculas.
#[derive(Debug, Clone)]
pub struct Tagset {
    tags: BTreeSet<String>,
    /// `None` para um tagset vazio, que não reconhece nada.
    patterns: Option<Patterns>,
}

#[derive(Debug, Clone)]
struct Patterns {
    html_open_tag: Regex,
    html_close_tag: Regex,
    start_tag: Regex,
    end_tag: Regex,
}

impl Patterns {
    fn build(tags: &BTreeSet<String>) -> Option<Self> {
        if tags.is_empty() {
            return None;
        }
        let alternatives = tags
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let compile = |pattern: String| {
            Regex::new(&pattern).expect("nomes de tags escapados formam um padrão válido")
        };
        Some(Self {
            html_open_tag: compile(format!("(?i)<({alternatives})>")),
            html_close_tag: compile(format!("(?i)</({alternatives})>")),
            start_tag: compile(format!("(?i)^__({alternatives})_START$")),
            end_tag: compile(format!("(?i)^__({alternatives})_END$")),
        })
    }
}

impl Tagset {
    /// Cria um tagset a partir de uma lista de nomes (ex: `["org", "PER"]`).
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: BTreeSet<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        let patterns = Patterns::build(&tags);
        Self { tags, patterns }
    }

    /// Troca `<TAG>` e `</TAG>` por ` __TAG_START ` e ` __TAG_END `.
    ///
    /// O nome mantém a grafia encontrada no texto; tags fora do tagset ficam intactas.
    pub fn encode_tags(&self, text: &str) -> String {
        let Some(patterns) = &self.patterns else {
            return text.to_string();
        };
        let opened = patterns
            .html_open_tag
            .replace_all(text, |caps: &Captures| format!(" __{}_START ", &caps[1]));
        patterns
            .html_close_tag
            .replace_all(&opened, |caps: &Captures| format!(" __{}_END ", &caps[1]))
            .into_owned()
    }

    /// Nome (em maiúsculas) da entidade aberta por `token`, se for um marcador de início.
    pub fn start_tag_or_none(&self, token: &str) -> Option<String> {
        let caps = self.patterns.as_ref()?.start_tag.captures(token)?;
        Some(caps[1].to_uppercase())
    }

    /// Nome (em maiúsculas) da entidade fechada por `token`, se for um marcador de fim.
    pub fn end_tag_or_none(&self, token: &str) -> Option<String> {
        let caps = self.patterns.as_ref()?.end_tag.captures(token)?;
        Some(caps[1].to_uppercase())
    }

    /// Marcador de início para `tag` (ex: "per" → "__PER_START").
    pub fn start_sentinel(tag: &str) -> String {
        format!("__{}_START", tag.to_uppercase())
    }

    /// Marcador de fim para `tag` (ex: "per" → "__PER_END").
    pub fn end_sentinel(tag: &str) -> String {
        format!("__{}_END", tag.to_uppercase())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_uppercase())
    }

    /// Tipos em ordem alfabética, em maiúsculas.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Default for Tagset {
    fn default() -> Self {
        Self::new(DEFAULT_TAGS)
    }
}
