//! # Extrator de Features — Fachada
//!
//! Liga todas as peças em uma chamada "HTML anotado entra, `(features, rótulos)` sai":
//!
//! 1. **Codificação**: `<PER>…</PER>` vira `__PER_START … __PER_END` ([`Tagset`]).
//! 2. **Parsing**: o markup vira uma árvore de elementos ([`Document`]).
//! 3. **Percurso**: tokenização, IOB2 e features em ordem de leitura
//!    ([`to_features_and_labels`]).
//! 4. **Reset**: o encoder volta ao estado `O` para o próximo documento.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use webstruct_core::{HtmlFeatureExtractor, Tagset};
//!
//! let mut extractor = HtmlFeatureExtractor::new(Tagset::new(["PER"]));
//! let html = "<p>hello <PER>John <b>Doe</b></PER> <br/> <PER>Mary</PER> said</p>";
//! let (features, labels) = extractor.fit_transform(html).unwrap();
//!
//! let labels: Vec<String> = labels.iter().map(|l| l.label()).collect();
//! assert_eq!(labels, ["O", "B-PER", "I-PER", "B-PER", "O"]);
//! assert_eq!(features.len(), 5);
//! ```

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::features::{default_features, FeatureDict, FeatureFunction, FeatureValue, TokenIdentity};
use crate::iob::{extract_entities, IobEncoder, IobLabel};
use crate::tagset::{Tagset, DEFAULT_TAGS};
use crate::tokenizer::{SpanTokenizer, TokenizerMode};
use crate::tree::Document;
use crate::walker::to_features_and_labels;

/// Features e rótulos alinhados de um documento.
pub type Extraction = (Vec<FeatureDict>, Vec<IobLabel>);

/// Configuração serializável do extrator.
///
/// ```json
/// { "tags": ["org", "per", "city"], "tokenizer": "strict" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Tipos de entidade reconhecidos (sem distinção de maiúsculas).
    pub tags: Vec<String>,
    /// Variante do tokenizador.
    pub tokenizer: TokenizerMode,
}

impl ExtractorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn tagset(&self) -> Tagset {
        Tagset::new(&self.tags)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            tokenizer: TokenizerMode::default(),
        }
    }
}

/// Extrai features e rótulos IOB2 de HTML anotado.
///
/// Guarda um único [`IobEncoder`], resetado ao fim de cada documento; por isso
/// [`HtmlFeatureExtractor::fit_transform`] recebe `&mut self`. Para vários
/// documentos em paralelo use [`HtmlFeatureExtractor::transform_many`], que cria
/// um encoder por documento.
pub struct HtmlFeatureExtractor {
    tagset: Tagset,
    tokenizer: TokenizerMode,
    feature_fn: Box<dyn FeatureFunction + Send + Sync>,
    encoder: IobEncoder,
}

impl HtmlFeatureExtractor {
    /// Cria o extrator com o tokenizador estrito e as features padrão.
    pub fn new(tagset: Tagset) -> Self {
        Self {
            encoder: IobEncoder::new(tagset.clone()),
            tagset,
            tokenizer: TokenizerMode::default(),
            feature_fn: Box::new(default_features()),
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.tagset()).with_tokenizer(config.tokenizer)
    }

    pub fn with_tokenizer(mut self, tokenizer: TokenizerMode) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_feature_function<F>(mut self, feature_fn: F) -> Self
    where
        F: FeatureFunction + Send + Sync + 'static,
    {
        self.feature_fn = Box::new(feature_fn);
        self
    }

    pub fn tagset(&self) -> &Tagset {
        &self.tagset
    }

    pub fn tokenizer(&self) -> TokenizerMode {
        self.tokenizer
    }

    /// Converte HTML anotado (tags `<TAG>` do tagset) em features e rótulos.
    pub fn fit_transform(&mut self, markup: &str) -> Result<Extraction> {
        let doc = self.parse(markup)?;
        self.transform_tree(&doc)
    }

    /// Como [`HtmlFeatureExtractor::fit_transform`], para uma árvore já parseada
    /// (o texto deve conter os marcadores `__TAG_START`/`__TAG_END`).
    pub fn transform_tree(&mut self, doc: &Document) -> Result<Extraction> {
        let result = extract(doc, &self.tokenizer, &mut self.encoder, self.feature_fn.as_ref());
        // também depois de erro: o próximo documento começa em `O`
        self.encoder.reset();
        result
    }

    /// Processa vários documentos em paralelo, preservando a ordem de entrada.
    ///
    /// Cada documento tem seu próprio encoder; um erro afeta apenas o documento
    /// que o causou.
    pub fn transform_many<S>(&self, documents: &[S]) -> Vec<Result<Extraction>>
    where
        S: AsRef<str> + Sync,
    {
        documents
            .par_iter()
            .map(|markup| {
                let doc = self.parse(markup.as_ref())?;
                let mut encoder = IobEncoder::new(self.tagset.clone());
                extract(&doc, &self.tokenizer, &mut encoder, self.feature_fn.as_ref())
            })
            .collect()
    }

    /// Entidades anotadas no documento, como pares `(texto, TIPO)`.
    ///
    /// Útil para conferir a anotação ou comparar com a saída de um modelo.
    pub fn entities(&mut self, markup: &str) -> Result<Vec<(String, String)>> {
        let doc = self.parse(markup)?;
        let result = extract(&doc, &self.tokenizer, &mut self.encoder, &TokenIdentity);
        self.encoder.reset();
        let (features, labels) = result?;

        let tokens: Vec<String> = features
            .iter()
            .map(|f| match f.get("tok") {
                Some(FeatureValue::Str(tok)) => tok.clone(),
                _ => String::new(),
            })
            .collect();
        Ok(extract_entities(&tokens, &labels))
    }

    fn parse(&self, markup: &str) -> Result<Document> {
        let html = self.tagset.encode_tags(markup);
        Document::parse(&html)
    }
}

fn extract<T, F>(doc: &Document, tokenizer: &T, encoder: &mut IobEncoder, feature_fn: &F) -> Result<Extraction>
where
    T: SpanTokenizer + ?Sized,
    F: FeatureFunction + ?Sized,
{
    let start = Instant::now();
    let tags = encoder.tagset().len();
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for pair in to_features_and_labels(doc.root(), tokenizer, encoder, feature_fn) {
        let (token_features, label) = pair?;
        features.push(token_features);
        labels.push(label);
    }

    debug!(
        root = doc.root().tag(),
        tags,
        elements = doc.len(),
        tokens = labels.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "documento processado"
    );
    Ok((features, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WebstructError;
    use crate::features::{CombinedFeatures, ParentTag};

    const HTML: &str = "<p>hello <PER>John <b>Doe</b></PER> <br/> <PER>Mary</PER> said</p>";

    fn label_strings(labels: &[IobLabel]) -> Vec<String> {
        labels.iter().map(IobLabel::label).collect()
    }

    fn feature_str<'a>(features: &'a FeatureDict, key: &str) -> &'a str {
        match features.get(key) {
            Some(FeatureValue::Str(s)) => s,
            other => panic!("feature {key} ausente ou não textual: {other:?}"),
        }
    }

    #[test]
    fn test_end_to_end() {
        let mut extractor = HtmlFeatureExtractor::new(Tagset::new(["PER"]));
        let (features, labels) = extractor.fit_transform(HTML).unwrap();

        let tokens: Vec<&str> = features.iter().map(|f| feature_str(f, "tok")).collect();
        assert_eq!(tokens, vec!["hello", "John", "Doe", "Mary", "said"]);
        assert_eq!(label_strings(&labels), vec!["O", "B-PER", "I-PER", "B-PER", "O"]);

        let parents: Vec<&str> = features.iter().map(|f| feature_str(f, "parent_tag")).collect();
        assert_eq!(parents, vec!["p", "p", "b", "p", "p"]);
    }

    #[test]
    fn test_custom_feature_function() {
        let combined = CombinedFeatures::new().with(TokenIdentity).with(ParentTag);
        let mut extractor = HtmlFeatureExtractor::new(Tagset::new(["ORG", "PER"]))
            .with_feature_function(combined);
        let (features, _) = extractor.fit_transform(HTML).unwrap();
        assert_eq!(features[2].len(), 2);
        assert_eq!(feature_str(&features[2], "parent_tag"), "b");
    }

    #[test]
    fn test_encoder_is_reset_between_documents() {
        let mut extractor = HtmlFeatureExtractor::new(Tagset::new(["PER", "ORG"]));

        // span nunca fechado
        let (_, labels) = extractor.fit_transform("<p><PER>aberto</p>").unwrap();
        assert_eq!(label_strings(&labels), vec!["B-PER"]);
        let (_, labels) = extractor.fit_transform("<p>depois</p>").unwrap();
        assert_eq!(label_strings(&labels), vec!["O"]);

        // fechamento errado
        let err = extractor.fit_transform("<p><PER>a</ORG> b</p>").unwrap_err();
        assert!(matches!(err, WebstructError::MismatchedEndTag { .. }));
        let (_, labels) = extractor.fit_transform("<p>limpo</p>").unwrap();
        assert_eq!(label_strings(&labels), vec!["O"]);
    }

    #[test]
    fn test_malformed_markup() {
        let mut extractor = HtmlFeatureExtractor::new(Tagset::default());
        assert!(matches!(
            extractor.fit_transform("<p>sem fechamento"),
            Err(WebstructError::Markup(_))
        ));
    }

    #[test]
    fn test_empty_document() {
        let mut extractor = HtmlFeatureExtractor::new(Tagset::default());
        let (features, labels) = extractor.fit_transform("<html><body/></html>").unwrap();
        assert!(features.is_empty());
        assert!(labels.is_empty());
    }

    #[test]
    fn test_tokenizer_variants() {
        let html = "<p><PER>Ana</PER>, <ORG>Acme</ORG></p>";
        let tagset = Tagset::new(["PER", "ORG"]);
        let mut strict = HtmlFeatureExtractor::new(tagset.clone());
        let mut word = HtmlFeatureExtractor::new(tagset).with_tokenizer(TokenizerMode::Word);

        let (_, strict_labels) = strict.fit_transform(html).unwrap();
        let (_, word_labels) = word.fit_transform(html).unwrap();
        assert_eq!(label_strings(&strict_labels), vec!["B-PER", "B-ORG"]);
        assert_eq!(label_strings(&word_labels), vec!["B-PER", "O", "B-ORG"]);
    }

    #[test]
    fn test_transform_many_keeps_order_and_isolation() {
        let extractor = HtmlFeatureExtractor::new(Tagset::new(["PER", "ORG"]));
        let documents = vec![
            "<p><PER>um</p>".to_string(),
            "<p>dois <ORG>Acme</ORG></p>".to_string(),
            "<p><PER>x</ORG></p>".to_string(),
            "<p>quatro</p>".to_string(),
        ];
        let results = extractor.transform_many(&documents);
        assert_eq!(results.len(), 4);

        let (_, first) = results[0].as_ref().unwrap();
        assert_eq!(label_strings(first), vec!["B-PER"]);
        let (_, second) = results[1].as_ref().unwrap();
        assert_eq!(label_strings(second), vec!["O", "B-ORG"]);
        assert!(results[2].is_err());
        let (features, fourth) = results[3].as_ref().unwrap();
        assert_eq!(label_strings(fourth), vec!["O"]);
        assert_eq!(feature_str(&features[0], "tok"), "quatro");
    }

    #[test]
    fn test_entities() {
        let mut extractor = HtmlFeatureExtractor::new(Tagset::new(["ORG", "CITY"]));
        let html = "<html><body><p><ORG>Scrapinghub</ORG> has an <b>office</b> in <CITY>Montevideo</CITY></p></body></html>";
        let entities = extractor.entities(html).unwrap();
        assert_eq!(
            entities,
            vec![
                ("Scrapinghub".to_string(), "ORG".to_string()),
                ("Montevideo".to_string(), "CITY".to_string()),
            ]
        );
    }

    #[test]
    fn test_config() {
        let config = ExtractorConfig::from_json(r#"{"tags": ["per", "org"], "tokenizer": "word"}"#).unwrap();
        assert_eq!(config.tokenizer, TokenizerMode::Word);
        let extractor = HtmlFeatureExtractor::from_config(&config);
        assert_eq!(extractor.tagset().len(), 2);
        assert_eq!(extractor.tokenizer(), TokenizerMode::Word);

        let defaults = ExtractorConfig::from_json("{}").unwrap();
        assert_eq!(defaults, ExtractorConfig::default());
        assert_eq!(defaults.tagset().len(), DEFAULT_TAGS.len());

        assert!(matches!(
            ExtractorConfig::from_json(r#"{"tokenizer": "bpe"}"#),
            Err(WebstructError::Config(_))
        ));

        let json = serde_json::to_string(&ExtractorConfig {
            tags: vec!["per".into()],
            tokenizer: TokenizerMode::Strict,
        })
        .unwrap();
        assert_eq!(json, r#"{"tags":["per"],"tokenizer":"strict"}"#);
    }
}
