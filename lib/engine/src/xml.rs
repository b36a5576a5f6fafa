//! Owned XML tree built on top of the `quick-xml` event reader and writer.
//!
//! The console exchanges templates as plain XML documents that need to be
//! edited in place and sent back, so the tree keeps the node order, text,
//! CDATA sections and comments it has read.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to parse xml: {0}")]
    Parsing(#[from] quick_xml::Error),
    #[error("unable to parse xml attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("xml content is not valid utf-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("unable to write xml: {0}")]
    Writing(#[from] std::io::Error),
    #[error("xml document has no root element")]
    RootMissing,
    #[error("xml document has more than one root element")]
    RootDuplicated,
    #[error("unexpected closing tag {0}")]
    UnexpectedEnd(String),
    #[error("element {0} is never closed")]
    Unclosed(String),
    #[error("unexpected content outside of the root element")]
    OutsideRoot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(inner) => Some(inner),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Overwrites the attribute when it exists, appends it otherwise.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, current)) => *current = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |element| element.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|element| element.name == name)
    }

    /// Returns the first child with the given name, appending an empty one when missing.
    pub fn child_or_insert(&mut self, name: &str) -> &mut Element {
        let index = self
            .children
            .iter()
            .position(|node| node.as_element().is_some_and(|element| element.name == name))
            .unwrap_or_else(|| {
                self.children.push(Node::Element(Element::new(name)));
                self.children.len() - 1
            });
        match &mut self.children[index] {
            Node::Element(element) => element,
            _ => unreachable!("index always points to an element"),
        }
    }

    /// Follows a chain of child names, the first match winning at each level.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter()
            .try_fold(self, |current, name| current.child(name))
    }

    pub fn push(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    /// Keeps only the child elements matching the predicate, other nodes are untouched.
    pub fn retain_elements<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&Element) -> bool,
    {
        self.children.retain(|node| match node {
            Node::Element(element) => predicate(element),
            _ => true,
        });
    }

    /// Concatenated text and CDATA content, `None` when the element has neither.
    pub fn text(&self) -> Option<String> {
        let mut found = false;
        let mut result = String::new();
        for node in self.children.iter() {
            match node {
                Node::Text(value) | Node::CData(value) => {
                    found = true;
                    result.push_str(value);
                }
                _ => {}
            }
        }
        found.then_some(result)
    }

    /// Replaces every text and CDATA child with a single text node.
    pub fn set_text(&mut self, value: impl Into<String>) {
        self.children
            .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
        self.children.insert(0, Node::Text(value.into()));
    }

    fn try_from_start(start: &BytesStart<'_>) -> Result<Self, Error> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let attributes = start
            .attributes()
            .map(|attr| {
                let attr = attr?;
                let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
                let value = attr.unescape_value()?.into_owned();
                Ok::<_, Error>((key, value))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let start = BytesStart::new(self.name.as_str()).with_attributes(
            self.attributes
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for child in self.children.iter() {
            match child {
                Node::Element(inner) => inner.write(writer)?,
                Node::Text(value) => writer.write_event(Event::Text(BytesText::new(value)))?,
                Node::CData(value) => {
                    writer.write_event(Event::CData(BytesCData::new(value.as_str())))?
                }
                Node::Comment(value) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(value.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

impl Declaration {
    fn try_from_decl(decl: &BytesDecl<'_>) -> Result<Self, Error> {
        let version = std::str::from_utf8(&decl.version()?)?.to_string();
        let encoding = match decl.encoding() {
            Some(value) => Some(std::str::from_utf8(&value?)?.to_string()),
            None => None,
        };
        let standalone = match decl.standalone() {
            Some(value) => Some(std::str::from_utf8(&value?)?.to_string()),
            None => None,
        };
        Ok(Self {
            version,
            encoding,
            standalone,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    declaration: Option<Declaration>,
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            root,
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(input);
        let mut declaration = None;
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Decl(decl) => {
                    declaration = Some(Declaration::try_from_decl(&decl)?);
                }
                Event::Start(start) => {
                    stack.push(Element::try_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = Element::try_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(end) => {
                    let element = stack.pop().ok_or_else(|| {
                        Error::UnexpectedEnd(String::from_utf8_lossy(end.name().as_ref()).into())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let value = text.unescape()?.into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(value)),
                        None if value.trim().is_empty() => {}
                        None => return Err(Error::OutsideRoot),
                    }
                }
                Event::CData(data) => {
                    let parent = stack.last_mut().ok_or(Error::OutsideRoot)?;
                    parent
                        .children
                        .push(Node::CData(std::str::from_utf8(&data)?.to_string()));
                }
                // comments around the root element are not kept
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::Comment(std::str::from_utf8(&comment)?.to_string()));
                    }
                }
                Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.pop() {
            return Err(Error::Unclosed(open.name));
        }
        let root = root.ok_or(Error::RootMissing)?;
        Ok(Self { declaration, root })
    }

    pub fn to_xml(&self) -> Result<String, Error> {
        let mut writer = Writer::new(Vec::new());
        if let Some(ref decl) = self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                decl.version.as_str(),
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
        }
        self.root.write(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|err| Error::Encoding(err.utf8_error()))
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(Error::RootDuplicated),
    }
}
