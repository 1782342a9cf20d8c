//! # Funções de Features por Token
//!
//! Uma função de features recebe, para cada token de um trecho de texto:
//!
//! - `index`: posição do token dentro do trecho;
//! - `tokens`: todos os tokens reais do trecho (sem marcadores);
//! - `elem`: o elemento dono do trecho;
//! - `is_tail`: se o trecho é o *tail* do elemento (texto depois dele).
//!
//! e devolve um dicionário `nome → valor`. Ela não enxerga tokens de outros
//! trechos, então funções diferentes podem ser calculadas de forma
//! independente e combinadas com [`CombinedFeatures`].
//!
//! ## Features Implementadas
//!
//! - [`TokenIdentity`]: o próprio token (`tok`)
//! - [`ParentTag`]: tag do elemento que contém o texto (`parent_tag`)
//! - [`TokenShape`]: forma da palavra, capitalização, prefixos/sufixos,
//!   dígitos/pontuação e vizinhos dentro do trecho

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::tokenizer::TextToken;
use crate::tree::ElementRef;

/// Valor de uma feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Str(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Str(v)
    }
}

/// Observação de um token: features ordenadas por nome.
pub type FeatureDict = BTreeMap<String, FeatureValue>;

/// Calcula as features de um token a partir do seu trecho e do elemento dono.
///
/// Erros devolvidos aqui interrompem o documento e chegam ao chamador como
/// [`crate::WebstructError::Feature`].
pub trait FeatureFunction {
    fn extract(
        &self,
        index: usize,
        tokens: &[TextToken],
        elem: ElementRef<'_>,
        is_tail: bool,
    ) -> Result<FeatureDict, FeatureError>;
}

impl<F> FeatureFunction for F
where
    F: Fn(usize, &[TextToken], ElementRef<'_>, bool) -> Result<FeatureDict, FeatureError>,
{
    fn extract(
        &self,
        index: usize,
        tokens: &[TextToken],
        elem: ElementRef<'_>,
        is_tail: bool,
    ) -> Result<FeatureDict, FeatureError> {
        self(index, tokens, elem, is_tail)
    }
}

/// Fixa a assinatura de uma closure para que ela seja aceita como [`FeatureFunction`].
///
/// ```rust
/// use webstruct_core::features::{from_fn, FeatureDict};
///
/// let current_token = from_fn(|index, tokens, _elem, _is_tail| {
///     let mut features = FeatureDict::new();
///     features.insert("tok".into(), tokens[index].chars.as_str().into());
///     Ok(features)
/// });
/// # let _ = current_token;
/// ```
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(usize, &[TextToken], ElementRef<'_>, bool) -> Result<FeatureDict, FeatureError>,
{
    f
}

/// Combina várias funções de features em uma só.
///
/// Os dicionários são mesclados na ordem em que as funções foram adicionadas;
/// em caso de chave repetida vale o valor da última.
#[derive(Default)]
pub struct CombinedFeatures {
    functions: Vec<Box<dyn FeatureFunction + Send + Sync>>,
}

impl CombinedFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, function: F) -> Self
    where
        F: FeatureFunction + Send + Sync + 'static,
    {
        self.push(function);
        self
    }

    pub fn push<F>(&mut self, function: F)
    where
        F: FeatureFunction + Send + Sync + 'static,
    {
        self.functions.push(Box::new(function));
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FeatureFunction for CombinedFeatures {
    fn extract(
        &self,
        index: usize,
        tokens: &[TextToken],
        elem: ElementRef<'_>,
        is_tail: bool,
    ) -> Result<FeatureDict, FeatureError> {
        let mut merged = FeatureDict::new();
        for function in &self.functions {
            merged.extend(function.extract(index, tokens, elem, is_tail)?);
        }
        Ok(merged)
    }
}

/// `tok`: o texto do token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenIdentity;

impl FeatureFunction for TokenIdentity {
    fn extract(
        &self,
        index: usize,
        tokens: &[TextToken],
        _elem: ElementRef<'_>,
        _is_tail: bool,
    ) -> Result<FeatureDict, FeatureError> {
        let mut features = FeatureDict::new();
        features.insert("tok".into(), tokens[index].chars.as_str().into());
        Ok(features)
    }
}

/// `parent_tag`: tag do elemento que contém o texto.
///
/// Para o texto de dentro é o próprio elemento; para o tail é o pai dele.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentTag;

impl FeatureFunction for ParentTag {
    fn extract(
        &self,
        _index: usize,
        _tokens: &[TextToken],
        elem: ElementRef<'_>,
        is_tail: bool,
    ) -> Result<FeatureDict, FeatureError> {
        let owner = if is_tail { elem.parent().unwrap_or(elem) } else { elem };
        let mut features = FeatureDict::new();
        features.insert("parent_tag".into(), owner.tag().into());
        Ok(features)
    }
}

/// Features ortográficas e de contexto dentro do trecho.
///
/// 1. **Forma**: `lower`, capitalização, prefixos e sufixos de 2 a 4 caracteres.
/// 2. **Padrões**: dígitos, hífen, ponto, pontuação isolada.
/// 3. **Contexto**: token anterior/seguinte no mesmo trecho (`BOS`/`EOS` nas bordas).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenShape;

impl FeatureFunction for TokenShape {
    fn extract(
        &self,
        index: usize,
        tokens: &[TextToken],
        _elem: ElementRef<'_>,
        _is_tail: bool,
    ) -> Result<FeatureDict, FeatureError> {
        let mut features = FeatureDict::new();
        let word = tokens[index].chars.as_str();
        let lower = word.to_lowercase();
        features.insert("lower".into(), lower.as_str().into());

        // Capitalização
        let first_char_upper = word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
        let has_alpha = word.chars().any(char::is_alphabetic);
        let all_upper = word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic());
        let has_upper_in_middle = word.chars().skip(1).any(|c| c.is_uppercase());

        if first_char_upper {
            features.insert("is_capitalized".into(), true.into());
        }
        if has_alpha && all_upper && word.chars().count() > 1 {
            features.insert("is_all_caps".into(), true.into());
        }
        if has_upper_in_middle && !all_upper {
            features.insert("is_mixed_case".into(), true.into());
        }

        // Prefixos e sufixos
        let chars: Vec<char> = lower.chars().collect();
        for n in 2..=4 {
            if chars.len() >= n {
                let prefix: String = chars[..n].iter().collect();
                let suffix: String = chars[chars.len() - n..].iter().collect();
                features.insert(format!("prefix{n}"), prefix.into());
                features.insert(format!("suffix{n}"), suffix.into());
            }
        }

        // Padrões numéricos e de pontuação
        if word.chars().all(|c| c.is_ascii_digit()) {
            features.insert("is_digit".into(), true.into());
        } else if word.chars().any(|c| c.is_ascii_digit()) {
            features.insert("has_digit".into(), true.into());
        }
        if word.contains('-') {
            features.insert("has_hyphen".into(), true.into());
        }
        if word.contains('.') {
            features.insert("has_period".into(), true.into());
        }
        if word.contains('@') {
            features.insert("has_at".into(), true.into());
        }
        if !word.chars().any(char::is_alphanumeric) {
            features.insert("is_punctuation".into(), true.into());
        }

        // Contexto dentro do trecho
        match index.checked_sub(1).and_then(|i| tokens.get(i)) {
            Some(prev) => {
                features.insert("prev_lower".into(), prev.chars.to_lowercase().into());
            }
            None => {
                features.insert("BOS".into(), true.into());
            }
        }
        match tokens.get(index + 1) {
            Some(next) => {
                features.insert("next_lower".into(), next.chars.to_lowercase().into());
            }
            None => {
                features.insert("EOS".into(), true.into());
            }
        }

        Ok(features)
    }
}

/// Conjunto padrão: [`TokenIdentity`] + [`ParentTag`] + [`TokenShape`].
pub fn default_features() -> CombinedFeatures {
    CombinedFeatures::new()
        .with(TokenIdentity)
        .with(ParentTag)
        .with(TokenShape)
}
