//! # Percurso da Árvore em Ordem de Leitura
//!
//! Converte uma árvore de elementos em pares `(features, rótulo)` na ordem em
//! que o texto aparece no documento. Para cada elemento:
//!
//! 1. o texto de dentro (antes do primeiro filho);
//! 2. cada filho, recursivamente, em ordem;
//! 3. o tail (texto depois do fechamento do elemento).
//!
//! O mesmo [`IobEncoder`] é usado em todos os trechos, então uma entidade
//! aberta no texto de `<p>` continua rotulada dentro de `<b>`:
//!
//! ```text
//! <p>hello __PER_START John <b>Doe</b> __PER_END <br/> __PER_START Mary __PER_END said</p>
//!
//! O     hello  p
//! B-PER John   p
//! I-PER Doe    b
//! B-PER Mary   br (tail)
//! O     said   br (tail)
//! ```
//!
//! A recursão é feita com uma pilha explícita e o resultado é um iterador
//! preguiçoso: cada trecho só é tokenizado quando o anterior foi consumido.

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{Result, WebstructError};
use crate::features::{FeatureDict, FeatureFunction};
use crate::iob::{IobEncoder, IobLabel};
use crate::tokenizer::SpanTokenizer;
use crate::tree::ElementRef;

/// Próximo passo do percurso.
enum Work<'a> {
    /// Texto de dentro do elemento, seguido dos filhos e do tail.
    Head(ElementRef<'a>),
    Tail(ElementRef<'a>),
}

/// Gera os pares `(features, rótulo)` de `root` e de todos os seus descendentes.
///
/// O encoder não é resetado: quem chama decide quando um documento termina.
pub fn to_features_and_labels<'a, T, F>(
    root: ElementRef<'a>,
    tokenizer: &'a T,
    encoder: &'a mut IobEncoder,
    feature_fn: &'a F,
) -> FeaturesAndLabels<'a, T, F>
where
    T: SpanTokenizer + ?Sized,
    F: FeatureFunction + ?Sized,
{
    FeaturesAndLabels {
        tokenizer,
        encoder,
        feature_fn,
        stack: vec![Work::Head(root)],
        pending: VecDeque::new(),
        failed: false,
    }
}

/// Iterador devolvido por [`to_features_and_labels`].
///
/// Cada trecho de texto é processado inteiro antes de ser entregue: se a
/// função de features falhar no token `k`, os pares `0..k` do mesmo trecho
/// não são entregues. Depois do primeiro erro o iterador termina.
pub struct FeaturesAndLabels<'a, T: ?Sized, F: ?Sized> {
    tokenizer: &'a T,
    encoder: &'a mut IobEncoder,
    feature_fn: &'a F,
    stack: Vec<Work<'a>>,
    /// Pares do trecho corrente ainda não entregues.
    pending: VecDeque<(FeatureDict, IobLabel)>,
    failed: bool,
}

impl<'a, T, F> FeaturesAndLabels<'a, T, F>
where
    T: SpanTokenizer + ?Sized,
    F: FeatureFunction + ?Sized,
{
    fn process_run(&mut self, elem: ElementRef<'a>, is_tail: bool) -> Result<Vec<(FeatureDict, IobLabel)>> {
        let text = if is_tail { elem.tail() } else { elem.text() };
        let tokens = self.tokenizer.span_tokenize(text);
        let (tokens, labels) = self.encoder.encode_split(tokens)?;
        trace!(tag = elem.tag(), is_tail, tokens = tokens.len(), "trecho tokenizado");

        labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| {
                let features = self
                    .feature_fn
                    .extract(index, &tokens, elem, is_tail)
                    .map_err(WebstructError::Feature)?;
                Ok((features, label))
            })
            .collect()
    }
}

impl<'a, T, F> Iterator for FeaturesAndLabels<'a, T, F>
where
    T: SpanTokenizer + ?Sized,
    F: FeatureFunction + ?Sized,
{
    type Item = Result<(FeatureDict, IobLabel)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.pending.pop_front() {
                return Some(Ok(pair));
            }
            if self.failed {
                return None;
            }

            let (elem, is_tail) = match self.stack.pop()? {
                Work::Head(elem) => {
                    self.stack.push(Work::Tail(elem));
                    self.stack.extend(elem.children().rev().map(Work::Head));
                    (elem, false)
                }
                Work::Tail(elem) => (elem, true),
            };

            match self.process_run(elem, is_tail) {
                Ok(run) => self.pending.extend(run),
                Err(err) => {
                    self.failed = true;
                    self.stack.clear();
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{from_fn, FeatureValue};
    use crate::tagset::Tagset;
    use crate::tokenizer::{TextToken, TokenizerMode};
    use crate::tree::Document;

    fn whitespace(text: &str) -> Vec<TextToken> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        for word in text.split_whitespace() {
            let position = offset + text[offset..].find(word).unwrap_or(0);
            tokens.push(TextToken::new(word, position, word.len()));
            offset = position + word.len();
        }
        tokens
    }

    fn str_value(value: &FeatureValue) -> &str {
        match value {
            FeatureValue::Str(s) => s,
            other => panic!("esperava string, obteve {other:?}"),
        }
    }

    #[test]
    fn test_document_order_with_tail_flags() {
        let tagset = Tagset::new(["ORG", "PER"]);
        let html = tagset.encode_tags("<p>hello <PER>John <b>Doe</b></PER> <br/> <PER>Mary</PER> said</p>");
        let doc = Document::parse(&html).unwrap();
        let mut encoder = IobEncoder::new(tagset);
        let get_features = from_fn(|index, tokens, elem, is_tail| {
            let mut features = FeatureDict::new();
            features.insert("tok".into(), tokens[index].chars.as_str().into());
            features.insert("is_tail".into(), (is_tail as i64).into());
            features.insert("tag".into(), elem.tag().into());
            Ok(features)
        });

        let rows: Vec<(String, String, i64, String)> =
            to_features_and_labels(doc.root(), &whitespace, &mut encoder, &get_features)
                .map(|pair| {
                    let (features, label) = pair.unwrap();
                    let is_tail = match features["is_tail"] {
                        FeatureValue::Int(v) => v,
                        _ => -1,
                    };
                    (
                        label.label(),
                        str_value(&features["tok"]).to_string(),
                        is_tail,
                        str_value(&features["tag"]).to_string(),
                    )
                })
                .collect();

        let expected = vec![
            ("O", "hello", 0, "p"),
            ("B-PER", "John", 0, "p"),
            ("I-PER", "Doe", 0, "b"),
            ("B-PER", "Mary", 1, "br"),
            ("O", "said", 1, "br"),
        ];
        assert_eq!(rows.len(), expected.len());
        for (row, (label, tok, is_tail, tag)) in rows.iter().zip(expected) {
            assert_eq!(row, &(label.to_string(), tok.to_string(), is_tail, tag.to_string()));
        }
    }

    #[test]
    fn test_head_children_tail_order() {
        let doc = Document::parse("<a>1<b>2<c>3</c>4</b>5<d>6</d>7</a>").unwrap();
        let mut encoder = IobEncoder::new(Tagset::new(["X"]));
        let tok = from_fn(|index, tokens, _elem, _is_tail| {
            let mut features = FeatureDict::new();
            features.insert("tok".into(), tokens[index].chars.as_str().into());
            Ok(features)
        });
        let order: Vec<String> = to_features_and_labels(doc.root(), &TokenizerMode::Word, &mut encoder, &tok)
            .map(|pair| str_value(&pair.unwrap().0["tok"]).to_string())
            .collect();
        assert_eq!(order, vec!["1", "2", "3", "4", "5", "6", "7"]);
    }

    #[test]
    fn test_run_local_tokens_exclude_sentinels() {
        let tagset = Tagset::new(["PER"]);
        let doc = Document::parse(&tagset.encode_tags("<p>a <PER>b c</PER> d</p>")).unwrap();
        let mut encoder = IobEncoder::new(tagset);
        let run = from_fn(|index, tokens, _elem, _is_tail| {
            let mut features = FeatureDict::new();
            features.insert("index".into(), (index as i64).into());
            features.insert("run_len".into(), (tokens.len() as i64).into());
            Ok(features)
        });
        let pairs: Vec<(FeatureDict, IobLabel)> =
            to_features_and_labels(doc.root(), &TokenizerMode::Word, &mut encoder, &run)
                .collect::<Result<_>>()
                .unwrap();
        assert_eq!(pairs.len(), 4);
        for (i, (features, _)) in pairs.iter().enumerate() {
            assert_eq!(features["index"], FeatureValue::Int(i as i64));
            assert_eq!(features["run_len"], FeatureValue::Int(4));
        }
        let labels: Vec<String> = pairs.iter().map(|(_, l)| l.label()).collect();
        assert_eq!(labels, vec!["O", "B-PER", "I-PER", "O"]);
    }

    #[test]
    fn test_empty_elements_produce_nothing() {
        let doc = Document::parse("<div><br/><span></span>  </div>").unwrap();
        let mut encoder = IobEncoder::new(Tagset::default());
        let features = from_fn(|_, _, _, _| Ok(FeatureDict::new()));
        let count = to_features_and_labels(doc.root(), &TokenizerMode::Strict, &mut encoder, &features).count();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_mismatched_end_across_elements_is_fatal() {
        let tagset = Tagset::new(["PER", "ORG"]);
        let doc = Document::parse(&tagset.encode_tags("<p>a <PER>b <i>c</ORG></i> d</PER> e</p>")).unwrap();
        let mut encoder = IobEncoder::new(tagset);
        let features = from_fn(|_, _, _, _| Ok(FeatureDict::new()));
        let results: Vec<Result<(FeatureDict, IobLabel)>> =
            to_features_and_labels(doc.root(), &TokenizerMode::Word, &mut encoder, &features).collect();
        // a, b do <p> e nada depois do erro dentro de <i>
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(
            results[2],
            Err(WebstructError::MismatchedEndTag { ref found, ref active }) if found == "ORG" && active == "PER"
        ));
    }

    #[test]
    fn test_feature_errors_propagate() {
        let doc = Document::parse("<p>um dois</p>").unwrap();
        let mut encoder = IobEncoder::new(Tagset::default());
        let failing = from_fn(|index, _, _, _| {
            if index == 1 {
                Err("índice proibido".into())
            } else {
                Ok(FeatureDict::new())
            }
        });
        let results: Vec<_> = to_features_and_labels(doc.root(), &TokenizerMode::Word, &mut encoder, &failing).collect();
        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(WebstructError::Feature(err)) => assert_eq!(err.to_string(), "índice proibido"),
            other => panic!("esperava erro de feature, obteve {other:?}"),
        }
    }
}
