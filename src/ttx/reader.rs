//! Typed access to the elements of a parsed table dump.

use crate::error::{Error, Result};
use roxmltree::Node;
use std::convert::TryFrom;

/// Returns the child elements of `node`, skipping text and comments.
pub fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// Returns the first child element of `node` named `name`.
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|x| x.has_tag_name(name))
}

/// Returns the value of a required attribute.
pub fn attribute<'a>(node: Node<'a, '_>, name: &'static str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| Error::MissingValue {
        element: node.tag_name().name().to_string(),
        attribute: name,
    })
}

/// Returns an error describing `value` as invalid within `node`.
pub fn invalid(node: Node, value: &str) -> Error {
    Error::InvalidValue {
        element: node.tag_name().name().to_string(),
        value: value.to_string(),
    }
}

/// Parses an integer written in decimal or, with a `0x` prefix, in hexadecimal.
///
/// A leading `-` is accepted for both forms.
/// Returns `None` if the text is not an integer or does not fit into `T`.
pub fn parse_integer<T: TryFrom<i64>>(text: &str) -> Option<T> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };

    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value).ok()
}

/// Returns a required integer attribute.
pub fn integer_attribute<T: TryFrom<i64>>(node: Node, name: &'static str) -> Result<T> {
    let text = attribute(node, name)?;
    parse_integer(text).ok_or_else(|| invalid(node, text))
}

/// Returns a required decimal attribute.
pub fn float_attribute(node: Node, name: &'static str) -> Result<f64> {
    let text = attribute(node, name)?;
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| invalid(node, text))
}

/// Returns the integer `value` attribute of the child element `name`, as written for scalar fields.
pub fn integer_value<T: TryFrom<i64>>(node: Node, name: &str) -> Result<T> {
    let field = child(node, name).ok_or_else(|| Error::MissingValue {
        element: name.to_string(),
        attribute: "value",
    })?;
    integer_attribute(field, "value")
}

/// Returns the decimal `value` attribute of the child element `name`.
pub fn float_value(node: Node, name: &str) -> Result<f64> {
    let field = child(node, name).ok_or_else(|| Error::MissingValue {
        element: name.to_string(),
        attribute: "value",
    })?;
    float_attribute(field, "value")
}

/// Returns the concatenated text content of `node`.
pub fn text(node: Node) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|x| x.text())
        .collect()
}
