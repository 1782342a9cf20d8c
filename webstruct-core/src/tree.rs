//! # Árvore de Elementos
//!
//! Representação mínima de uma árvore HTML/XML no modelo *head/tail*:
//!
//! - `text`: texto logo dentro do elemento, antes do primeiro filho;
//! - `tail`: texto logo depois do fechamento do elemento, antes do próximo irmão.
//!
//! ```text
//! <p>hello <b>Doe</b> said</p>
//!    └─ p.text = "hello "   └─ b.tail = " said"
//!              b.text = "Doe"
//! ```
//!
//! Os nós ficam numa arena ([`Document`]) e são acessados por [`ElementRef`],
//! que é `Copy` e conhece o pai, os filhos e o documento.
//!
//! [`Document::parse`] lê apenas markup **bem formado** (via `roxmltree`); limpar
//! HTML arbitrário é responsabilidade de quem chama.

use std::fmt;

use crate::error::Result;

/// Identificador de um elemento dentro do [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    tail: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: String::new(),
            tail: String::new(),
            parent,
            children: Vec::new(),
        }
    }
}

/// Uma árvore de elementos com raiz única.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Cria um documento contendo apenas o elemento raiz.
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![NodeData::new(root_tag, None)],
        }
    }

    /// Faz o parsing de markup bem formado.
    ///
    /// Comentários e instruções de processamento são descartados; o texto ao
    /// redor deles é concatenado.
    pub fn parse(markup: &str) -> Result<Self> {
        let xml = roxmltree::Document::parse(markup)?;
        let root = xml.root_element();
        let mut doc = Document::new(root.tag_name().name());
        let root_id = doc.root_id();
        doc.copy_attributes(root_id, root);
        doc.fill(root_id, root);
        Ok(doc)
    }

    fn fill(&mut self, id: NodeId, node: roxmltree::Node<'_, '_>) {
        let mut last_child: Option<NodeId> = None;
        for child in node.children() {
            if child.is_element() {
                let child_id = self.append_child(id, child.tag_name().name());
                self.copy_attributes(child_id, child);
                self.fill(child_id, child);
                last_child = Some(child_id);
            } else if child.is_text() {
                let text = child.text().unwrap_or_default();
                // antes do primeiro filho é texto do elemento; depois, tail do último filho
                let target = match last_child {
                    Some(prev) => &mut self.nodes[prev.0].tail,
                    None => &mut self.nodes[id.0].text,
                };
                target.push_str(text);
            }
        }
    }

    fn copy_attributes(&mut self, id: NodeId, node: roxmltree::Node<'_, '_>) {
        self.nodes[id.0].attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.get(self.root_id())
    }

    pub fn get(&self, id: NodeId) -> ElementRef<'_> {
        ElementRef { doc: self, id }
    }

    /// Acrescenta um filho ao final dos filhos de `parent`.
    pub fn append_child(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(tag, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = text.into();
    }

    pub fn set_tail(&mut self, id: NodeId, tail: impl Into<String>) {
        self.nodes[id.0].tail = tail.into();
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.nodes[id.0].attributes;
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => attributes.push((name.to_string(), value)),
        }
    }

    /// Número de elementos no documento.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Referência para um elemento de um [`Document`].
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Nome da tag (ex: "p", "b").
    pub fn tag(&self) -> &'a str {
        &self.data().tag
    }

    /// Texto antes do primeiro filho.
    pub fn text(&self) -> &'a str {
        &self.data().text
    }

    /// Texto depois do fechamento do elemento.
    pub fn tail(&self) -> &'a str {
        &self.data().tail
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.data()
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.data()
            .attributes
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.data().parent.map(|id| self.doc.get(id))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| doc.get(id))
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_head_and_tail() {
        let doc = Document::parse("<p>hello <b>Doe</b> said <br/> bye</p>").unwrap();
        let p = doc.root();
        assert_eq!(p.tag(), "p");
        assert_eq!(p.text(), "hello ");
        let children: Vec<ElementRef> = p.children().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].tag(), "b");
        assert_eq!(children[0].text(), "Doe");
        assert_eq!(children[0].tail(), " said ");
        assert_eq!(children[1].tag(), "br");
        assert_eq!(children[1].text(), "");
        assert_eq!(children[1].tail(), " bye");
        assert_eq!(children[1].parent().map(|e| e.tag()), Some("p"));
        assert!(p.parent().is_none());
    }

    #[test]
    fn test_parse_attributes_and_comments() {
        let doc = Document::parse("<div class=\"addr\">a<!-- x -->b<span id=\"s\">c</span></div>").unwrap();
        let div = doc.root();
        assert_eq!(div.attribute("class"), Some("addr"));
        assert_eq!(div.text(), "ab");
        let span = div.children().next().unwrap();
        assert_eq!(span.attribute("id"), Some("s"));
        assert_eq!(span.attribute("class"), None);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_parse_rejects_malformed_markup() {
        assert!(Document::parse("<p>aberto").is_err());
        assert!(Document::parse("").is_err());
    }

    #[test]
    fn test_builder() {
        let mut doc = Document::new("body");
        let root = doc.root_id();
        doc.set_text(root, "head");
        let child = doc.append_child(root, "i");
        doc.set_text(child, "inner");
        doc.set_tail(child, "tail");
        doc.set_attribute(child, "lang", "pt");
        doc.set_attribute(child, "lang", "en");

        let i = doc.get(child);
        assert_eq!(i.text(), "inner");
        assert_eq!(i.tail(), "tail");
        assert_eq!(i.attributes().collect::<Vec<_>>(), vec![("lang", "en")]);
        assert_eq!(doc.root().children().count(), 1);
    }
}
