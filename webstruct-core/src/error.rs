//! Erros do crate.
//!
//! Quase tudo aqui é fatal para o documento corrente: anotação malformada não
//! tem recuperação segura, então o processamento para e o erro sobe ao chamador.

use thiserror::Error;

/// Erro devolvido por uma função de features injetada pelo chamador.
pub type FeatureError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Erros que podem ocorrer durante a extração de features e rótulos.
#[derive(Error, Debug)]
pub enum WebstructError {
    /// Um marcador de fim não corresponde à entidade aberta.
    ///
    /// Entidades aninhadas (ou cruzadas) não são suportadas: o encoder mantém
    /// no máximo um span aberto por vez.
    #[error("marcador de fim __{found}_END não corresponde à entidade aberta ({active})")]
    MismatchedEndTag { found: String, active: String },

    #[error("markup malformado: {0}")]
    Markup(#[from] roxmltree::Error),

    #[error("falha na função de features: {0}")]
    Feature(#[source] FeatureError),

    #[error("configuração inválida: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WebstructError>;
