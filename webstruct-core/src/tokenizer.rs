//! # Tokenizador de Palavras com Offsets
//!
//! Divide o texto em tokens preservando a posição original de cada um (offset
//! e comprimento em bytes). É uma variante do tokenizador Treebank que **não**
//! separa `@`, `:` nem contrações ("couldn't" continua um token só).
//!
//! ## Algoritmo
//!
//! 1. **Aspas de abertura**: uma `"` no início do texto ou depois de espaço/`([{<`
//!    vira um token sintético ` `` `. O texto é cortado nesse ponto e cada
//!    pedaço é tokenizado separadamente, com os offsets deslocados.
//! 2. **Tabela de regras**: em cada posição as regras são testadas em ordem; a
//!    primeira que casar decide se o trecho é descartado (espaços), mantido
//!    (pontuação) ou substituído (aspas tipográficas, reticências).
//! 3. **Acumulação**: caracteres que nenhuma regra reconhece estendem o token corrente.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use webstruct_core::tokenizer::{span_tokenize, TextToken};
//!
//! let tokens = span_tokenize("\" a");
//! assert_eq!(tokens, vec![TextToken::new("``", 0, 1), TextToken::new("a", 2, 1)]);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Um token extraído do texto original.
///
/// `position` e `length` são offsets em **bytes** no texto passado ao tokenizador,
/// não em caracteres: fora do ASCII eles não coincidem com anotações que contam
/// code points (ex: as geradas em Python) e precisam ser convertidos.
/// Para tokens emitidos por substituição (aspas, reticências) `chars` é o texto
/// normalizado, mas `position`/`length` cobrem o trecho original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TextToken {
    /// O texto do token (ex: "Montevideo", ",", "``").
    pub chars: String,
    /// Índice de byte inicial no texto original.
    pub position: usize,
    /// Comprimento em bytes do trecho original.
    pub length: usize,
}

impl TextToken {
    pub fn new(chars: impl Into<String>, position: usize, length: usize) -> Self {
        Self {
            chars: chars.into(),
            position,
            length,
        }
    }

    /// Índice de byte final (exclusivo) no texto original.
    pub fn end(&self) -> usize {
        self.position + self.length
    }
}

impl AsRef<str> for TextToken {
    fn as_ref(&self) -> &str {
        &self.chars
    }
}

/// Variantes do tokenizador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// **Palavras**: aplica apenas a tabela de regras.
    Word,
    /// **Estrito**: como `Word`, mas descarta vírgulas e ponto-e-vírgulas isolados.
    ///
    /// Evita que "PESSOA, CARGO" seja aprendido como uma entidade só, mas quebra
    /// o alinhamento um-para-um com anotações manuais que rotulam essa pontuação.
    Strict,
}

impl Default for TokenizerMode {
    fn default() -> Self {
        TokenizerMode::Strict
    }
}

/// Qualquer coisa capaz de dividir um texto em tokens com offsets.
///
/// Implementado para [`TokenizerMode`] e para closures `Fn(&str) -> Vec<TextToken>`,
/// o que permite injetar outro tokenizador no walker.
pub trait SpanTokenizer {
    fn span_tokenize(&self, text: &str) -> Vec<TextToken>;
}

impl SpanTokenizer for TokenizerMode {
    fn span_tokenize(&self, text: &str) -> Vec<TextToken> {
        span_tokenize_with_mode(text, *self)
    }
}

impl<F> SpanTokenizer for F
where
    F: Fn(&str) -> Vec<TextToken>,
{
    fn span_tokenize(&self, text: &str) -> Vec<TextToken> {
        self(text)
    }
}

/// O que fazer com o trecho reconhecido por uma regra.
#[derive(Debug, Clone, Copy)]
enum Emit {
    /// Não gera token (espaços).
    Delete,
    /// Gera um token com o próprio trecho.
    Keep,
    /// Gera um token com o texto normalizado.
    Replace(&'static str),
}

struct Rule {
    pattern: Regex,
    /// O crate `regex` não tem lookahead; a condição sobre o texto seguinte fica aqui.
    followed_by: Option<Regex>,
    emit: Emit,
}

impl Rule {
    fn new(pattern: &str, emit: Emit) -> Self {
        Self {
            pattern: anchored(pattern),
            followed_by: None,
            emit,
        }
    }

    fn followed_by(mut self, pattern: &str) -> Self {
        self.followed_by = Some(anchored(pattern));
        self
    }

    /// Comprimento do trecho reconhecido no início de `rest`, se houver.
    fn match_len(&self, rest: &str) -> Option<usize> {
        let m = self.pattern.find(rest)?;
        if m.end() == 0 {
            return None;
        }
        if let Some(next) = &self.followed_by {
            if !next.is_match(&rest[m.end()..]) {
                return None;
            }
        }
        Some(m.end())
    }
}

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{pattern})")).expect("padrão fixo do tokenizador")
}

/// Tabela de regras em ordem de prioridade.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"\s+", Emit::Delete),
        Rule::new("“", Emit::Replace("``")),
        Rule::new("[\"”]", Emit::Replace("''")),
        Rule::new("``", Emit::Keep),
        Rule::new(r"…|\.\.\.", Emit::Replace("...")),
        Rule::new("--", Emit::Keep),
        // "Road," separa; "100,000" não
        Rule::new(",", Emit::Keep).followed_by(r"\D|$"),
        // ponto final, mesmo seguido de uma última quebra de linha
        Rule::new(r"\.", Emit::Keep).followed_by(r"\n?$"),
        Rule::new(r"[;#$£%&|!?\[\](){}<>]", Emit::Keep),
        // fecha aspas simples sem quebrar "couldn't"
        Rule::new("'", Emit::Keep).followed_by(r"\s"),
        Rule::new("''", Emit::Keep),
    ]
});

/// Aspas de abertura: início do texto ou precedida por espaço ou `([{<`.
static OPEN_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|[\s(\[{<])""#).expect("padrão fixo do tokenizador"));

/// Tokeniza um texto usando a variante padrão ([`TokenizerMode::Strict`]).
pub fn tokenize(text: &str) -> Vec<String> {
    span_tokenize_with_mode(text, TokenizerMode::default())
        .into_iter()
        .map(|t| t.chars)
        .collect()
}

/// Tokeniza um texto com a variante especificada.
pub fn span_tokenize_with_mode(text: &str, mode: TokenizerMode) -> Vec<TextToken> {
    let tokens = span_tokenize(text);
    match mode {
        TokenizerMode::Word => tokens,
        TokenizerMode::Strict => tokens
            .into_iter()
            .filter(|t| t.chars != "," && t.chars != ";")
            .collect(),
    }
}

/// Tokeniza um texto com a tabela de regras completa (variante [`TokenizerMode::Word`]).
///
/// Nunca devolve tokens vazios; texto vazio gera uma lista vazia.
pub fn span_tokenize(text: &str) -> Vec<TextToken> {
    let mut tokens = Vec::new();
    let mut rest = text;
    let mut offset = 0;

    // As aspas de abertura dependem do caractere anterior, por isso ficam fora
    // da tabela de regras. Cada ocorrência corta o texto; o prefixo nunca contém
    // outra aspa de abertura e o sufixo é tratado na próxima volta.
    while let Some(m) = OPEN_QUOTE.find(rest) {
        let quote = m.end() - 1;
        scan(&rest[..quote], offset, &mut tokens);
        tokens.push(TextToken::new("``", offset + quote, 1));
        offset += quote + 1;
        rest = &rest[quote + 1..];
    }
    scan(rest, offset, &mut tokens);

    tokens
}

/// Varre `text` aplicando a tabela de regras; `offset` é a posição de `text` no original.
fn scan(text: &str, offset: usize, tokens: &mut Vec<TextToken>) {
    let mut i = 0;
    let mut run_start = 0;

    while i < text.len() {
        let rest = &text[i..];
        let matched = RULES
            .iter()
            .find_map(|rule| rule.match_len(rest).map(|len| (rule.emit, len)));

        match matched {
            Some((emit, len)) => {
                flush_run(text, run_start, i, offset, tokens);
                match emit {
                    Emit::Delete => {}
                    Emit::Keep => tokens.push(TextToken::new(&rest[..len], offset + i, len)),
                    Emit::Replace(chars) => tokens.push(TextToken::new(chars, offset + i, len)),
                }
                i += len;
                run_start = i;
            }
            None => {
                i += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    flush_run(text, run_start, text.len(), offset, tokens);
}

/// Fecha o trecho acumulado `text[start..end]` como token (se não vazio)
fn flush_run(text: &str, start: usize, end: usize, offset: usize, tokens: &mut Vec<TextToken>) {
    if end > start {
        tokens.push(TextToken::new(&text[start..end], offset + start, end - start));
    }
}
