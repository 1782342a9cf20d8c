//! # Codificação IOB2 a partir de Marcadores de Fronteira
//!
//! Converte um fluxo de tokens com pseudo-tokens `__TAG_START`/`__TAG_END` em
//! um rótulo **IOB2** por token real:
//!
//! - `B-TAG`: Begin — primeiro token de uma entidade
//! - `I-TAG`: Inside — tokens seguintes da mesma entidade
//! - `O`: Outside — fora de qualquer entidade
//!
//! ```text
//! hello __PER_START John Doe __PER_END __PER_START Mary __PER_END said
//! O                 B-PER I-PER         B-PER                     O
//! ```
//!
//! ## Máquina de Estados
//!
//! O estado é o par `(tag ativa, início pendente)`. [`IobState::transition`]
//! consome um token e devolve o novo estado e, para tokens reais, o rótulo.
//! [`IobEncoder`] apenas dobra essa função sobre o fluxo e guarda o estado
//! entre chamadas, de modo que a entidade aberta atravessa trechos de texto
//! de elementos diferentes.
//!
//! Só existe **um** span aberto por vez: um marcador de fim de outro tipo é
//! erro fatal ([`WebstructError::MismatchedEndTag`]).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{Result, WebstructError};
use crate::tagset::Tagset;

/// Tag ativa quando nenhuma entidade está aberta.
pub const OUTSIDE: &str = "O";

/// Rótulo IOB2 aplicado a um token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IobLabel {
    /// **Begin**: primeiro token da entidade. Ex: **John** (B-PER) Doe.
    Begin(String),
    /// **Inside**: continuação da entidade. Ex: John **Doe** (I-PER).
    Inside(String),
    /// **Outside**: o token não faz parte de nenhuma entidade.
    Outside,
}

impl IobLabel {
    /// Representação textual (ex: "B-PER", "I-ORG", "O")
    pub fn label(&self) -> String {
        match self {
            IobLabel::Begin(tag) => format!("B-{tag}"),
            IobLabel::Inside(tag) => format!("I-{tag}"),
            IobLabel::Outside => OUTSIDE.to_string(),
        }
    }

    /// Tipo da entidade (se for B- ou I-)
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            IobLabel::Begin(tag) | IobLabel::Inside(tag) => Some(tag),
            IobLabel::Outside => None,
        }
    }

    /// Parseia um rótulo a partir de string (ex: "B-PER" → Begin("PER"))
    pub fn from_label(s: &str) -> Option<Self> {
        if s == OUTSIDE {
            return Some(IobLabel::Outside);
        }
        let (prefix, tag) = s.split_once('-')?;
        if tag.is_empty() {
            return None;
        }
        match prefix {
            "B" => Some(IobLabel::Begin(tag.to_string())),
            "I" => Some(IobLabel::Inside(tag.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for IobLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IobLabel::Begin(tag) => write!(f, "B-{tag}"),
            IobLabel::Inside(tag) => write!(f, "I-{tag}"),
            IobLabel::Outside => f.write_str(OUTSIDE),
        }
    }
}

impl Serialize for IobLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IobLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IobLabel::from_label(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("rótulo IOB2 inválido: {s}")))
    }
}

/// Estado do encoder: tag ativa e se o próximo token abre a entidade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IobState {
    tag: String,
    pending_begin: bool,
}

impl IobState {
    /// Estado inicial: fora de entidade.
    pub fn baseline() -> Self {
        Self::begin(OUTSIDE)
    }

    /// Inicia uma nova sequência com `tag`; `begin("O")` volta ao estado inicial.
    pub fn begin(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            pending_begin: true,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_pending_begin(&self) -> bool {
        self.pending_begin
    }

    /// Rótulo que o próximo token real receberia neste estado.
    pub fn label(&self) -> IobLabel {
        if self.tag == OUTSIDE {
            IobLabel::Outside
        } else if self.pending_begin {
            IobLabel::Begin(self.tag.clone())
        } else {
            IobLabel::Inside(self.tag.clone())
        }
    }

    /// Estado depois de emitir um rótulo para um token real.
    fn emitted(self) -> Self {
        Self {
            pending_begin: false,
            ..self
        }
    }

    /// Consome um token.
    ///
    /// - marcador de início `T` → `(begin(T), None)`
    /// - marcador de fim `T` → `(baseline, None)`, ou erro se `T` não for a tag ativa
    /// - token real → `(estado sem início pendente, Some(rótulo))`
    pub fn transition(self, tagset: &Tagset, token: &str) -> Result<(IobState, Option<IobLabel>)> {
        if let Some(tag) = tagset.start_tag_or_none(token) {
            return Ok((IobState::begin(&tag), None));
        }

        if let Some(tag) = tagset.end_tag_or_none(token) {
            // entidades aninhadas não são suportadas
            if tag != self.tag {
                debug!(found = %tag, active = %self.tag, "marcador de fim sem entidade correspondente");
                return Err(WebstructError::MismatchedEndTag {
                    found: tag,
                    active: self.tag,
                });
            }
            return Ok((IobState::baseline(), None));
        }

        let label = self.label();
        Ok((self.emitted(), Some(label)))
    }
}

impl Default for IobState {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Converte sequências de tokens com marcadores em pares `(token, rótulo)`.
///
/// O estado sobrevive entre chamadas a [`IobEncoder::encode`]: o walker chama
/// `encode` uma vez por trecho de texto e a entidade aberta continua no
/// trecho seguinte. Use [`IobEncoder::reset`] entre documentos.
#[derive(Debug, Clone)]
pub struct IobEncoder {
    tagset: Tagset,
    state: IobState,
}

impl IobEncoder {
    pub fn new(tagset: Tagset) -> Self {
        Self {
            tagset,
            state: IobState::baseline(),
        }
    }

    /// Inicia uma nova sequência.
    pub fn begin(&mut self, tag: &str) {
        self.state = IobState::begin(tag);
    }

    /// Volta ao estado inicial (`O`).
    pub fn reset(&mut self) {
        self.begin(OUTSIDE);
    }

    /// Tag ativa no momento.
    pub fn tag(&self) -> &str {
        self.state.tag()
    }

    pub fn state(&self) -> &IobState {
        &self.state
    }

    pub fn tagset(&self) -> &Tagset {
        &self.tagset
    }

    /// Converte a sequência para IOB2 de forma preguiçosa.
    ///
    /// Gera um par por token real; marcadores são consumidos. Depois do primeiro
    /// erro o iterador termina.
    pub fn encode<'a, T, I>(&'a mut self, tokens: I) -> Encode<'a, I::IntoIter>
    where
        T: AsRef<str>,
        I: IntoIterator<Item = T>,
    {
        Encode {
            encoder: self,
            tokens: tokens.into_iter(),
            failed: false,
        }
    }

    /// Como [`IobEncoder::encode`], mas devolve tokens e rótulos em duas listas.
    pub fn encode_split<T, I>(&mut self, tokens: I) -> Result<(Vec<T>, Vec<IobLabel>)>
    where
        T: AsRef<str>,
        I: IntoIterator<Item = T>,
    {
        let mut kept = Vec::new();
        let mut labels = Vec::new();
        for pair in self.encode(tokens) {
            let (token, label) = pair?;
            kept.push(token);
            labels.push(label);
        }
        Ok((kept, labels))
    }

    fn step(&mut self, token: &str) -> Result<Option<IobLabel>> {
        let state = std::mem::take(&mut self.state);
        match state.transition(&self.tagset, token) {
            Ok((next, label)) => {
                self.state = next;
                Ok(label)
            }
            Err(err) => {
                // o documento é abandonado; o chamador deve chamar reset()
                self.state = IobState::baseline();
                Err(err)
            }
        }
    }
}

/// Iterador devolvido por [`IobEncoder::encode`].
pub struct Encode<'a, I> {
    encoder: &'a mut IobEncoder,
    tokens: I,
    failed: bool,
}

impl<'a, T, I> Iterator for Encode<'a, I>
where
    T: AsRef<str>,
    I: Iterator<Item = T>,
{
    type Item = Result<(T, IobLabel)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        for token in self.tokens.by_ref() {
            match self.encoder.step(token.as_ref()) {
                Ok(Some(label)) => return Some(Ok((token, label))),
                Ok(None) => continue,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

/// Agrupa uma sequência alinhada `(token, rótulo)` em trechos por tipo.
///
/// - `B-X` inicia um grupo `X`; `I-X` continua o grupo `X` corrente.
/// - Tokens `O` consecutivos formam um grupo `"O"`.
/// - `I-X` que não continua um grupo `X` é tratado como `B-X`.
///
/// # Exemplo
/// `[(hello, O), (John, B-PER), (Doe, I-PER), (Mary, B-PER), (said, O)]`
/// → `[([hello], O), ([John, Doe], PER), ([Mary], PER), ([said], O)]`
pub fn group<T, I>(pairs: I) -> Vec<(Vec<T>, String)>
where
    I: IntoIterator<Item = (T, IobLabel)>,
{
    let mut groups: Vec<(Vec<T>, String)> = Vec::new();
    let mut previous: Option<IobLabel> = None;

    for (token, label) in pairs {
        let continues = match (&previous, &label) {
            (Some(IobLabel::Outside), IobLabel::Outside) => true,
            (Some(IobLabel::Begin(prev) | IobLabel::Inside(prev)), IobLabel::Inside(tag)) => {
                prev == tag
            }
            _ => false,
        };

        if continues {
            if let Some((tokens, _)) = groups.last_mut() {
                tokens.push(token);
            }
        } else {
            let name = label.entity_type().unwrap_or(OUTSIDE).to_string();
            groups.push((vec![token], name));
        }
        previous = Some(label);
    }

    groups
}

/// Junta tokens com espaço, sem espaço antes de pontuação de fechamento
/// nem depois de pontuação de abertura.
pub fn smart_join<S: AsRef<str>>(tokens: &[S]) -> String {
    const NO_SPACE_BEFORE: &[&str] = &[",", ".", ";", ":", "!", "?", ")", "]", "}"];
    const NO_SPACE_AFTER: &[&str] = &["(", "[", "{"];

    let mut joined = String::new();
    let mut previous: Option<&str> = None;
    for token in tokens {
        let token = token.as_ref();
        if let Some(prev) = previous {
            if !NO_SPACE_BEFORE.contains(&token) && !NO_SPACE_AFTER.contains(&prev) {
                joined.push(' ');
            }
        }
        joined.push_str(token);
        previous = Some(token);
    }
    joined
}

/// Extrai as entidades `(texto, TIPO)` de uma sequência rotulada.
pub fn extract_entities<S: AsRef<str>>(tokens: &[S], labels: &[IobLabel]) -> Vec<(String, String)> {
    let words: Vec<&str> = tokens.iter().map(|t| t.as_ref()).collect();
    group(words.into_iter().zip(labels.iter().cloned()))
        .into_iter()
        .filter(|(_, tag)| tag != OUTSIDE)
        .map(|(words, tag)| (smart_join(&words), tag))
        .collect()
}
