//! XML bodies.
//!
//! Both sides are parsed with `sxd_document` into an owned [`XmlElement`] tree. Nodes are compared
//! by qualified name, then attributes, then child elements grouped by name, then text.
//!
//! Rule paths address elements by name (`$.order.item`), attributes with an `@` prefix
//! (`$.order.@id`) and text with `#text` (`$.order.item.#text`).

use super::{ContentMatcher, InteractionContents};
use crate::body::OptionalBody;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::diff::generate_diff;
use crate::error::{MatchError, Result};
use crate::executor::domatch_rule;
use crate::mismatch::{BodyItemMatchResult, BodyMatchResult, BodyMismatch};
use crate::path_expr::construct_path;
use crate::value::MatchValue;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::parser;
use tracing::debug;

const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Element or attribute name. With a namespace, names compare by namespace URI and local part;
/// without one, by the name as written.
#[derive(Debug, Clone, Eq)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub local_name: String,
    /// The name as written in the document, including any prefix.
    pub raw: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, local_name: &str, prefix: Option<&str>) -> Self {
        let raw = match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local_name}"),
            _ => local_name.to_string(),
        };
        QualifiedName {
            namespace: namespace.map(str::to_string),
            local_name: local_name.to_string(),
            raw,
        }
    }

    fn identity(&self) -> (Option<&str>, &str) {
        match &self.namespace {
            Some(namespace) => (Some(namespace.as_str()), self.local_name.as_str()),
            None => (None, self.raw.as_str()),
        }
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Text and CDATA content.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: QualifiedName,
    pub attributes: IndexMap<QualifiedName, String>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Direct text children, each trimmed, concatenated.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.trim()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }
}

fn convert(element: Element<'_>) -> XmlElement {
    let element_name = element.name();
    let name = QualifiedName::new(
        element_name.namespace_uri(),
        element_name.local_part(),
        element.preferred_prefix(),
    );

    let attributes = element
        .attributes()
        .into_iter()
        .filter(|attribute| {
            let attribute_name = attribute.name();
            attribute_name.namespace_uri() != Some(XMLNS_NAMESPACE)
                && attribute_name.local_part() != "xmlns"
                && !attribute_name.local_part().starts_with("xmlns:")
                && attribute.preferred_prefix() != Some("xmlns")
        })
        .map(|attribute| {
            let attribute_name = attribute.name();
            (
                QualifiedName::new(
                    attribute_name.namespace_uri(),
                    attribute_name.local_part(),
                    attribute.preferred_prefix(),
                ),
                attribute.value().to_string(),
            )
        })
        .collect();

    let children = element
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Element(child) => Some(XmlNode::Element(convert(child))),
            ChildOfElement::Text(text) => Some(XmlNode::Text(text.text().to_string())),
            _ => None,
        })
        .collect();

    XmlElement {
        name,
        attributes,
        children,
    }
}

/// Parse an XML document into its root element. Blank input has no root.
pub fn parse_xml(text: &str, side: &'static str) -> Result<Option<XmlElement>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let package = parser::parse(text).map_err(|e| MatchError::InvalidXml {
        side,
        message: format!("{e:?}"),
    })?;
    let document = package.as_document();
    let root = document
        .root()
        .children()
        .into_iter()
        .find_map(|child| match child {
            ChildOfRoot::Element(element) => Some(convert(element)),
            _ => None,
        });
    match root {
        Some(root) => Ok(Some(root)),
        None => Err(MatchError::InvalidXml {
            side,
            message: "document has no root element".to_string(),
        }),
    }
}

fn child_path(path: &[String], segment: impl Into<String>) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(segment.into());
    child
}

fn render_for_diff(element: &XmlElement) -> String {
    if element.attributes.is_empty() {
        return format!("<{}>", element.name);
    }
    let mut attributes: Vec<(&QualifiedName, &String)> = element.attributes.iter().collect();
    attributes.sort_by(|a, b| a.0.raw.cmp(&b.0.raw));
    let lines: String = attributes
        .iter()
        .map(|(name, value)| format!("  @{name}=\"{value}\"\n"))
        .collect();
    format!("<{}\n{}>", element.name, lines)
}

fn attribute_diff(expected: &XmlElement, actual: &XmlElement) -> String {
    generate_diff(&render_for_diff(expected), &render_for_diff(actual))
}

/// Content matcher for `application/xml`, `text/xml` and `+xml` types.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlContentMatcher;

impl XmlContentMatcher {
    fn compare_node(
        &self,
        path: &[String],
        expected: &XmlElement,
        actual: &XmlElement,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let node_path = child_path(path, expected.name.raw.clone());
        let key = construct_path(path);

        let head = if context.matcher_defined(&node_path) {
            debug!("compare_node: matcher defined for path {}", construct_path(&node_path));
            context
                .domatch(&node_path, &MatchValue::Element(expected), &MatchValue::Element(actual))
                .into_iter()
                .map(BodyMismatch::from)
                .collect()
        } else if expected.name != actual.name {
            vec![BodyMismatch::new(
                Some(format!("<{}>", expected.name)),
                Some(format!("<{}>", actual.name)),
                format!("Expected element {} but received {}", expected.name, actual.name),
                construct_path(&node_path),
            )]
        } else {
            Vec::new()
        };

        if !head.is_empty() {
            return vec![BodyItemMatchResult::new(key, head)];
        }

        let mut results = self.compare_attributes(&node_path, expected, actual, context);
        results.extend(self.compare_children(&node_path, expected, actual, context));
        results.extend(self.compare_text(&node_path, expected, actual, context));
        results
    }

    fn compare_attributes(
        &self,
        path: &[String],
        expected: &XmlElement,
        actual: &XmlElement,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let key = construct_path(path);
        let expected_count = expected.attributes.len();
        let actual_count = actual.attributes.len();
        let node = |element: &XmlElement| Some(format!("<{}>", element.name));

        if expected_count == 0 && actual_count > 0 && !context.allow_unexpected_keys {
            return vec![BodyItemMatchResult::single(
                &key,
                BodyMismatch::new(
                    node(expected),
                    node(actual),
                    format!(
                        "Expected a Tag with at least {expected_count} attributes but received {actual_count} attributes"
                    ),
                    &key,
                )
                .with_diff(attribute_diff(expected, actual)),
            )];
        }

        let mut mismatches = Vec::new();
        if expected_count > actual_count {
            mismatches.push(
                BodyMismatch::new(
                    node(expected),
                    node(actual),
                    format!(
                        "Expected a Tag with at least {expected_count} attributes but received {actual_count} attributes"
                    ),
                    &key,
                )
                .with_diff(attribute_diff(expected, actual)),
            );
        } else if !context.allow_unexpected_keys && expected_count != actual_count {
            mismatches.push(
                BodyMismatch::new(
                    node(expected),
                    node(actual),
                    format!(
                        "Expected a Tag with {expected_count} attributes but received {actual_count} attributes"
                    ),
                    &key,
                )
                .with_diff(attribute_diff(expected, actual)),
            );
        }

        for (name, expected_value) in &expected.attributes {
            let attribute_path = child_path(path, format!("@{}", name.raw));
            match actual.attributes.get(name) {
                Some(actual_value) if context.matcher_defined(&attribute_path) => {
                    debug!(
                        "compare_attributes: matcher defined for path {}",
                        construct_path(&attribute_path)
                    );
                    mismatches.extend(
                        context
                            .domatch(
                                &attribute_path,
                                &MatchValue::Text(expected_value),
                                &MatchValue::Text(actual_value),
                            )
                            .into_iter()
                            .map(BodyMismatch::from),
                    );
                }
                Some(actual_value) if actual_value != expected_value => mismatches.push(
                    BodyMismatch::new(
                        Some(expected_value.clone()),
                        Some(actual_value.clone()),
                        format!("Expected {name}='{expected_value}' but received {name}='{actual_value}'"),
                        construct_path(&attribute_path),
                    )
                    .with_diff(attribute_diff(expected, actual)),
                ),
                Some(_) => {}
                None => mismatches.push(
                    BodyMismatch::new(
                        Some(expected_value.clone()),
                        None,
                        format!("Expected {name}='{expected_value}' but was missing"),
                        construct_path(&attribute_path),
                    )
                    .with_diff(attribute_diff(expected, actual)),
                ),
            }
        }

        vec![BodyItemMatchResult::new(key, mismatches)]
    }

    fn compare_children(
        &self,
        path: &[String],
        expected: &XmlElement,
        actual: &XmlElement,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let key = construct_path(path);
        let node = |element: &XmlElement| Some(format!("<{}>", element.name));
        let mut results = Vec::new();

        let actual_count = actual.child_elements().count();
        if expected.child_elements().next().is_none()
            && actual_count > 0
            && !context.allow_unexpected_keys
        {
            results.push(BodyItemMatchResult::single(
                &key,
                BodyMismatch::new(
                    node(expected),
                    node(actual),
                    format!("Expected an empty List but received {actual_count} child nodes"),
                    &key,
                ),
            ));
        }

        let mut expected_by_name: IndexMap<&QualifiedName, Vec<&XmlElement>> = IndexMap::new();
        for child in expected.child_elements() {
            expected_by_name.entry(&child.name).or_default().push(child);
        }
        let mut actual_by_name: IndexMap<&QualifiedName, Vec<&XmlElement>> = IndexMap::new();
        for child in actual.child_elements() {
            actual_by_name.entry(&child.name).or_default().push(child);
        }

        for (name, actual_group) in &actual_by_name {
            let group_path = child_path(path, name.raw.clone());
            let Some(expected_group) = expected_by_name.shift_remove(*name) else {
                if !context.allow_unexpected_keys || context.type_matcher_defined(&group_path) {
                    results.push(BodyItemMatchResult::single(
                        &key,
                        BodyMismatch::new(
                            node(expected),
                            node(actual),
                            format!("Unexpected child <{name}/>"),
                            &key,
                        ),
                    ));
                } else {
                    results.push(BodyItemMatchResult::new(&key, Vec::new()));
                }
                continue;
            };

            if context.matcher_defined(&group_path) {
                debug!(
                    "compare_children: matcher defined for path {}",
                    construct_path(&group_path)
                );
                results.extend(self.compare_sibling_counts(
                    &group_path,
                    &expected_group,
                    actual_group,
                    context,
                ));
                let template = expected_group[0];
                for actual_child in actual_group {
                    results.extend(self.compare_node(path, template, actual_child, context));
                }
                continue;
            }

            for index in 0..expected_group.len().max(actual_group.len()) {
                match (expected_group.get(index), actual_group.get(index)) {
                    (Some(expected_child), Some(actual_child)) => {
                        results.extend(self.compare_node(path, expected_child, actual_child, context));
                    }
                    (Some(expected_child), None) => {
                        let location =
                            child_path(&child_path(path, expected_child.name.raw.clone()), index.to_string());
                        results.push(BodyItemMatchResult::single(
                            &key,
                            BodyMismatch::new(
                                node(expected),
                                node(actual),
                                format!("Expected child <{name}/> but was missing"),
                                construct_path(&location),
                            ),
                        ));
                    }
                    (None, Some(actual_child)) => {
                        if context.allow_unexpected_keys {
                            results.push(BodyItemMatchResult::new(&key, Vec::new()));
                        } else {
                            let location =
                                child_path(&child_path(path, actual_child.name.raw.clone()), index.to_string());
                            results.push(BodyItemMatchResult::single(
                                &key,
                                BodyMismatch::new(
                                    node(expected),
                                    node(actual),
                                    format!("Unexpected child <{name}/>"),
                                    construct_path(&location),
                                ),
                            ));
                        }
                    }
                    (None, None) => {}
                }
            }
        }

        for name in expected_by_name.keys() {
            results.push(BodyItemMatchResult::single(
                &key,
                BodyMismatch::new(
                    node(expected),
                    node(actual),
                    format!("Expected child <{name}/> but was missing"),
                    &key,
                ),
            ));
        }

        results
    }

    /// Size rules registered directly on a repeated child apply to the number of instances.
    fn compare_sibling_counts(
        &self,
        path: &[String],
        expected: &[&XmlElement],
        actual: &[&XmlElement],
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let group = context.select_best_matcher(path);
        if group.cascaded {
            return Vec::new();
        }
        let mismatches: Vec<BodyMismatch> = group
            .rules
            .iter()
            .filter(|rule| rule.is_type_matcher() || rule.is_ignore_order())
            .flat_map(|rule| {
                domatch_rule(
                    rule,
                    path,
                    &MatchValue::Siblings(expected),
                    &MatchValue::Siblings(actual),
                    false,
                    context.coerce_numbers,
                )
            })
            .map(BodyMismatch::from)
            .collect();
        if mismatches.is_empty() {
            Vec::new()
        } else {
            vec![BodyItemMatchResult::new(construct_path(path), mismatches)]
        }
    }

    fn compare_text(
        &self,
        path: &[String],
        expected: &XmlElement,
        actual: &XmlElement,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let text_path = child_path(path, "#text");
        let key = construct_path(path);
        let expected_text = expected.text_content();
        let actual_text = actual.text_content();

        let mismatches = if context.matcher_defined(&text_path) {
            debug!("compare_text: matcher defined for path {}", construct_path(&text_path));
            context
                .domatch(
                    &text_path,
                    &MatchValue::Text(&expected_text),
                    &MatchValue::Text(&actual_text),
                )
                .into_iter()
                .map(BodyMismatch::from)
                .collect()
        } else if expected_text != actual_text {
            vec![BodyMismatch::new(
                Some(expected_text.clone()),
                Some(actual_text.clone()),
                format!("Expected value '{expected_text}' but received '{actual_text}'"),
                construct_path(&text_path),
            )]
        } else {
            Vec::new()
        };
        vec![BodyItemMatchResult::new(key, mismatches)]
    }
}

impl ContentMatcher for XmlContentMatcher {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn match_body(
        &self,
        expected: &OptionalBody,
        actual: &OptionalBody,
        context: &MatchingContext<'_>,
    ) -> Result<BodyMatchResult> {
        if expected.is_missing() {
            return Ok(BodyMatchResult::ok());
        }
        if actual.is_missing() {
            return Ok(BodyMatchResult::root_mismatch(BodyMismatch::new(
                Some(expected.value_as_string()),
                None,
                format!("Expected body '{}' but was missing", expected.value_as_string()),
                "$",
            )));
        }

        let expected_root = parse_xml(&expected.value_as_string(), "expected")?;
        let actual_root = parse_xml(&actual.value_as_string(), "actual")?;
        let root = vec!["$".to_string()];
        let result = match (&expected_root, &actual_root) {
            (None, None) => BodyMatchResult::ok(),
            (None, Some(actual_root)) => BodyMatchResult::root_mismatch(BodyMismatch::new(
                None,
                Some(actual.value_as_string()),
                format!("Expected an empty body but received element <{}>", actual_root.name),
                "$",
            )),
            (Some(expected_root), None) => BodyMatchResult::root_mismatch(BodyMismatch::new(
                Some(expected.value_as_string()),
                None,
                format!("Expected element <{}> but received an empty body", expected_root.name),
                "$",
            )),
            (Some(expected_root), Some(actual_root)) => BodyMatchResult::from_items(
                self.compare_node(&root, expected_root, actual_root, context),
            ),
        };
        Ok(result)
    }

    fn setup_body_from_config(&self, config: &Value) -> Result<InteractionContents> {
        InteractionContents::from_config_text(config, ContentType::xml())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Category, MatchingRule, MatchingRuleCategory};

    fn xml(text: &str) -> OptionalBody {
        OptionalBody::present(text.to_string(), Some(ContentType::xml()))
    }

    fn compare(expected: &str, actual: &str, rules: &MatchingRuleCategory, allow: bool) -> Vec<BodyMismatch> {
        let context = MatchingContext::new(rules, allow);
        XmlContentMatcher
            .match_body(&xml(expected), &xml(actual), &context)
            .unwrap()
            .body_mismatches()
            .cloned()
            .collect()
    }

    fn no_rules() -> MatchingRuleCategory {
        MatchingRuleCategory::new(Category::Body)
    }

    #[test]
    fn test_parse_keeps_namespaces_and_text() {
        let root = parse_xml(
            r#"<a:order xmlns:a="urn:orders" id="1"><a:item>x</a:item> tail </a:order>"#,
            "expected",
        )
        .unwrap()
        .unwrap();
        assert_eq!(root.name.namespace.as_deref(), Some("urn:orders"));
        assert_eq!(root.name.local_name, "order");
        assert_eq!(root.attributes.len(), 1);
        assert_eq!(root.child_elements().count(), 1);
        assert_eq!(root.text_content(), "tail");
    }

    #[test]
    fn test_invalid_xml_is_an_input_error() {
        assert!(matches!(
            parse_xml("<a><b></a>", "actual"),
            Err(MatchError::InvalidXml { side: "actual", .. })
        ));
    }

    #[test]
    fn test_namespace_prefix_does_not_matter() {
        let mismatches = compare(
            r#"<a:order xmlns:a="urn:orders"/>"#,
            r#"<b:order xmlns:b="urn:orders"/>"#,
            &no_rules(),
            false,
        );
        assert!(mismatches.is_empty(), "{mismatches:?}");
    }

    #[test]
    fn test_identical_documents_match() {
        let doc = r#"<order id="1"><item>a</item><item>b</item></order>"#;
        assert!(compare(doc, doc, &no_rules(), false).is_empty());
    }

    #[test]
    fn test_element_name_mismatch() {
        let mismatches = compare("<order/>", "<invoice/>", &no_rules(), false);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch, "Expected element order but received invoice");
    }

    #[test]
    fn test_attribute_mismatches() {
        let mismatches = compare(r#"<order id="1"/>"#, r#"<order id="2"/>"#, &no_rules(), false);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch, "Expected id='1' but received id='2'");
        assert_eq!(mismatches[0].path, "$.order.@id");
        assert!(mismatches[0].diff.is_some());

        let mismatches = compare(r#"<order id="1"/>"#, r#"<order/>"#, &no_rules(), true);
        assert!(mismatches
            .iter()
            .any(|m| m.mismatch == "Expected id='1' but was missing"));
    }

    #[test]
    fn test_attribute_rule() {
        let rules = no_rules().with_rule("$.order.@id", MatchingRule::regex("\\d+").unwrap());
        assert!(compare(r#"<order id="1"/>"#, r#"<order id="42"/>"#, &rules, false).is_empty());
        assert_eq!(
            compare(r#"<order id="1"/>"#, r#"<order id="x"/>"#, &rules, false).len(),
            1
        );
    }

    #[test]
    fn test_missing_and_unexpected_children() {
        let mismatches = compare(
            "<order><item>a</item><item>b</item></order>",
            "<order><item>a</item></order>",
            &no_rules(),
            false,
        );
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch, "Expected child <item/> but was missing");

        let mismatches = compare(
            "<order><item>a</item></order>",
            "<order><item>a</item><note/></order>",
            &no_rules(),
            false,
        );
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch, "Unexpected child <note/>");

        let mismatches = compare(
            "<order><item>a</item></order>",
            "<order><item>a</item><note/></order>",
            &no_rules(),
            true,
        );
        assert!(mismatches.is_empty());
    }

    #[test]
    fn test_text_mismatch_and_rule() {
        let mismatches = compare("<a>one</a>", "<a>two</a>", &no_rules(), false);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch, "Expected value 'one' but received 'two'");
        assert_eq!(mismatches[0].path, "$.a.#text");

        let rules = no_rules().with_rule("$.a.#text", MatchingRule::Number(crate::rules::NumberKind::Integer));
        assert!(compare("<a>1</a>", "<a>200</a>", &rules, false).is_empty());
    }

    #[test]
    fn test_repeated_child_with_type_rule() {
        let rules = no_rules().with_rule("$.order.item", MatchingRule::MinType(2));
        let expected = "<order><item>a</item></order>";
        let ok = compare(expected, "<order><item>x</item><item>y</item></order>", &rules, false);
        assert!(ok.is_empty(), "{ok:?}");

        let too_few = compare(expected, "<order><item>x</item></order>", &rules, false);
        assert_eq!(too_few.len(), 1);
        assert!(too_few[0].mismatch.contains("minimum size of 2"));
    }

    #[test]
    fn test_missing_actual_body() {
        let context_rules = no_rules();
        let context = MatchingContext::new(&context_rules, false);
        let result = XmlContentMatcher
            .match_body(&xml("<a/>"), &OptionalBody::missing(), &context)
            .unwrap();
        assert!(!result.matched_ok());
    }
}
