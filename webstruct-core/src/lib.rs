//! # webstruct-core — Features e Rótulos IOB2 a partir de HTML Anotado
//!
//! Este crate prepara dados de treino para reconhecimento de entidades nomeadas em páginas web.
//! Entidades são marcadas diretamente no HTML com tags como `<PER>…</PER>` ou `<ORG>…</ORG>`;
//! o crate transforma esse HTML em uma sequência de tokens, cada um com um dicionário de
//! features e um rótulo IOB2 (`B-PER`, `I-PER`, `O`).
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: HTML anotado (String).
//! 2.  **Codificação das Tags** ([`tagset`]): `<PER>` vira o marcador textual `__PER_START`.
//! 3.  **Árvore** ([`tree`]): o markup vira uma árvore de elementos com `text`/`tail`.
//! 4.  **Tokenização** ([`tokenizer`]): cada trecho de texto vira tokens com offsets.
//! 5.  **Rotulagem** ([`iob`]): os marcadores são consumidos e os demais tokens recebem rótulos IOB2.
//! 6.  **Features** ([`features`]): funções de features recebem o token e o elemento de origem.
//! 7.  **Saída**: `(Vec<FeatureDict>, Vec<IobLabel>)`, orquestrado por [`extractor`] e [`walker`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use webstruct_core::{HtmlFeatureExtractor, IobLabel, Tagset};
//!
//! // 1. Tipos de entidade usados na anotação
//! let mut extractor = HtmlFeatureExtractor::new(Tagset::new(["ORG", "CITY"]));
//!
//! // 2. HTML anotado
//! let html = "<p><ORG>Scrapinghub</ORG> has an office in <CITY>Montevideo</CITY></p>";
//!
//! // 3. Features e rótulos alinhados
//! let (features, labels) = extractor.fit_transform(html).unwrap();
//! assert_eq!(features.len(), labels.len());
//! assert_eq!(labels[0], IobLabel::Begin("ORG".into()));
//! assert_eq!(labels.last(), Some(&IobLabel::Begin("CITY".into())));
//! ```
//!
//! ## Módulos Principais
//!
//! - [`extractor`]: Fachada que conecta todos os estágios.
//! - [`iob`]: Máquina de estados IOB2, agrupamento de entidades e `smart_join`.
//! - [`features`]: Funções de features e a combinação delas.
//! - [`error`]: Tipo de erro único do crate.

pub mod error;
pub mod extractor;
pub mod features;
pub mod iob;
pub mod tagset;
pub mod tokenizer;
pub mod tree;
pub mod walker;

pub use error::{Result, WebstructError};
pub use extractor::{Extraction, ExtractorConfig, HtmlFeatureExtractor};
pub use features::{FeatureDict, FeatureFunction, FeatureValue};
pub use iob::{IobEncoder, IobLabel};
pub use tagset::Tagset;
pub use tokenizer::{TextToken, TokenizerMode};
pub use tree::{Document, ElementRef};
pub use walker::to_features_and_labels;
