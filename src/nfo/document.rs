//! In-memory XML tree serialized with quick-xml

use super::NfoError;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// An XML element with attributes, optional text and child elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Creates an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates an element holding only text
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    /// Creates a text element from an optional value, empty when `None`
    pub fn optional<T: ToString>(name: impl Into<String>, value: Option<T>) -> Self {
        Self::text(name, value.map(|v| v.to_string()).unwrap_or_default())
    }

    /// Sets the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Adds an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Appends a child element
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Appends several child elements
    pub fn extend(&mut self, children: impl IntoIterator<Item = Element>) {
        self.children.extend(children);
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), NfoError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let text = self.text.as_deref().filter(|text| !text.is_empty());
        if text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

// Read access, used by the document builder tests
#[cfg(test)]
impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Text of the first child with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Element::text_content)
    }
}

/// A complete .nfo document: fixed header plus one root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfoDocument {
    pub root: Element,
    pub generated_at: DateTime<Utc>,
}

impl NfoDocument {
    pub fn new(root: Element, generated_at: DateTime<Utc>) -> Self {
        Self { root, generated_at }
    }

    /// The two header lines preceding the root element
    pub fn header(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<!-- Created on {} by trakt2kodi -->\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// Serializes the document with four-space indentation
    pub fn to_xml(&self) -> Result<String, NfoError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        self.root.write_to(&mut writer)?;
        let body = String::from_utf8(writer.into_inner())?;
        Ok(format!("{}{}\n", self.header(), body))
    }
}
