//! The tests tree and properties tree: parallel write-only hierarchies
//! built top-down, in insertion order, once per validation run.
//!
//! Both trees share the same shape (named interior nodes, named leaves)
//! but carry different leaf payloads: tests leaves are booleans, property
//! leaves are scalar or byte-string values. Builders only ever append;
//! nothing is retracted or overwritten once inserted.

use crate::config::Config;

#[derive(Debug, Clone, PartialEq)]
pub enum TestNode {
    Leaf { name: String, passed: bool },
    Subtree { name: String, children: Vec<TestNode> },
}

impl TestNode {
    pub fn name(&self) -> &str {
        match self {
            TestNode::Leaf { name, .. } => name,
            TestNode::Subtree { name, .. } => name,
        }
    }

    /// A leaf passes iff it is true. A subtree passes iff every leaf
    /// reachable from it passes; an empty subtree passes vacuously.
    pub fn is_valid(&self) -> bool {
        match self {
            TestNode::Leaf { passed, .. } => *passed,
            TestNode::Subtree { children, .. } => children.iter().all(TestNode::is_valid),
        }
    }

    pub fn child(&self, name: &str) -> Option<&TestNode> {
        match self {
            TestNode::Subtree { children, .. } => children.iter().find(|c| c.name() == name),
            TestNode::Leaf { .. } => None,
        }
    }
}

/// A builder for one interior node of the tests tree.
#[derive(Debug, Clone)]
pub struct TestTree {
    name: String,
    children: Vec<TestNode>,
}

impl TestTree {
    pub fn new(name: impl Into<String>) -> Self {
        TestTree {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_leaf(&mut self, name: impl Into<String>, passed: bool) {
        self.children.push(TestNode::Leaf {
            name: name.into(),
            passed,
        });
    }

    pub fn add_child(&mut self, child: TestTree) {
        self.children.push(child.into_node());
    }

    pub fn into_node(self) -> TestNode {
        TestNode::Subtree {
            name: self.name,
            children: self.children,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.children.iter().all(TestNode::is_valid)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    UInt(u64),
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
}

impl PropertyValue {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            PropertyValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from_uint {
    ($($t:ty),*) => {
        $(impl From<$t> for PropertyValue {
            fn from(v: $t) -> Self {
                PropertyValue::UInt(v as u64)
            }
        })*
    };
}
impl_from_uint!(u8, u16, u32, u64, usize);

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for PropertyValue {
            fn from(v: $t) -> Self {
                PropertyValue::Int(v as i64)
            }
        })*
    };
}
impl_from_int!(i8, i16, i32, i64);

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::UInt(v as u64)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(v: Vec<u8>) -> Self {
        PropertyValue::Bytes(v)
    }
}

impl From<&[u8]> for PropertyValue {
    fn from(v: &[u8]) -> Self {
        PropertyValue::Bytes(v.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyNode {
    Leaf {
        name: String,
        value: PropertyValue,
    },
    Subtree {
        name: String,
        children: Vec<PropertyNode>,
    },
}

impl PropertyNode {
    pub fn name(&self) -> &str {
        match self {
            PropertyNode::Leaf { name, .. } => name,
            PropertyNode::Subtree { name, .. } => name,
        }
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        match self {
            PropertyNode::Leaf { value, .. } => Some(value),
            PropertyNode::Subtree { .. } => None,
        }
    }

    pub fn children(&self) -> &[PropertyNode] {
        match self {
            PropertyNode::Subtree { children, .. } => children,
            PropertyNode::Leaf { .. } => &[],
        }
    }

    /// Direct child (leaf or subtree) with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&PropertyNode> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// Walks a `/`-separated chain of child names.
    pub fn get_path(&self, path: &str) -> Option<&PropertyNode> {
        let mut node = self;
        for segment in path.split('/') {
            node = node.get(segment)?;
        }
        Some(node)
    }

    pub fn uint_at(&self, path: &str) -> Option<u64> {
        self.get_path(path).and_then(PropertyNode::value).and_then(PropertyValue::as_uint)
    }

    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.get_path(path).and_then(PropertyNode::value).and_then(PropertyValue::as_text)
    }
}

/// A builder for one interior node of the properties tree.
#[derive(Debug, Clone)]
pub struct PropertiesTree {
    name: String,
    children: Vec<PropertyNode>,
}

impl PropertiesTree {
    pub fn new(name: impl Into<String>) -> Self {
        PropertiesTree {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_leaf(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.children.push(PropertyNode::Leaf {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn add_child(&mut self, child: PropertiesTree) {
        self.children.push(child.into_node());
    }

    pub fn into_node(self) -> PropertyNode {
        PropertyNode::Subtree {
            name: self.name,
            children: self.children,
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyNode> {
        self.children.iter().find(|c| c.name() == name)
    }
}

/// The uniform return shape every `validate(kind, bytes)` call produces:
/// `{is_valid, tests, properties, bytes_consumed}`.
#[derive(Debug, Clone)]
pub struct ValidatorResult {
    pub is_valid: bool,
    pub tests: TestNode,
    pub properties: PropertyNode,
    pub bytes_consumed: usize,
}

/// Accumulates tests and properties for one structural element and folds
/// them into a `ValidatorResult` once parsing of that element is done.
/// Mirrors the Tree Builder operations `new_subtree`/`append`/`add_leaf`.
pub struct ElementBuilder {
    tests: TestTree,
    properties: PropertiesTree,
    bytes_consumed: usize,
    verbose: bool,
}

impl ElementBuilder {
    pub fn new(name: impl Into<String>, config: &Config) -> Self {
        let name = name.into();
        ElementBuilder {
            tests: TestTree::new(name.clone()),
            properties: PropertiesTree::new(name),
            bytes_consumed: 0,
            verbose: config.verbose_tests,
        }
    }

    pub fn test(&mut self, name: impl Into<String>, passed: bool) -> &mut Self {
        self.tests.add_leaf(name, passed);
        self
    }

    pub fn property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.add_leaf(name, value);
        self
    }

    pub fn consumed(&mut self, bytes: usize) -> &mut Self {
        self.bytes_consumed = bytes;
        self
    }

    /// Folds a nested element's result in as a named child of both trees.
    ///
    /// Properties are always folded in full, even when the element they
    /// came from failed. Tests are folded in full unless `verbose_tests`
    /// is off and this element has already recorded a failure of its own
    /// (directly, or from an earlier child): in that case the root's
    /// `is_valid` is already settled, so the nested test detail is
    /// dropped rather than enumerated.
    pub fn child(&mut self, name: &str, result: ValidatorResult) -> &mut Self {
        if self.verbose || self.tests.is_valid() {
            match result.tests {
                TestNode::Subtree { children, .. } => self.tests.add_child(TestTree {
                    name: name.to_owned(),
                    children,
                }),
                leaf @ TestNode::Leaf { .. } => self.tests.add_child(TestTree {
                    name: name.to_owned(),
                    children: vec![leaf],
                }),
            }
        }
        match result.properties {
            PropertyNode::Subtree { children, .. } => self.properties.add_child(PropertiesTree {
                name: name.to_owned(),
                children,
            }),
            leaf @ PropertyNode::Leaf { .. } => self.properties.add_child(PropertiesTree {
                name: name.to_owned(),
                children: vec![leaf],
            }),
        }
        self
    }

    pub fn properties(&self) -> &PropertiesTree {
        &self.properties
    }

    pub fn finish(self) -> ValidatorResult {
        let is_valid = self.tests.is_valid();
        ValidatorResult {
            is_valid,
            tests: self.tests.into_node(),
            properties: self.properties.into_node(),
            bytes_consumed: self.bytes_consumed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn subtree_passes_iff_all_leaves_pass() {
        let mut b = ElementBuilder::new("box", &Config::default());
        b.test("a", true).test("b", true);
        assert!(b.finish().is_valid);

        let mut b = ElementBuilder::new("box", &Config::default());
        b.test("a", true).test("b", false);
        assert!(!b.finish().is_valid);
    }

    #[test]
    fn empty_subtree_is_valid_vacuously() {
        let b = ElementBuilder::new("box", &Config::default());
        assert!(b.finish().is_valid);
    }

    #[test]
    fn child_results_propagate_failure_to_parent() {
        let config = Config::default();
        let mut child = ElementBuilder::new("inner", &config);
        child.test("x", false);
        let child_result = child.finish();

        let mut parent = ElementBuilder::new("outer", &config);
        parent.test("y", true).child("inner", child_result);
        assert!(!parent.finish().is_valid);
    }

    #[test]
    fn properties_are_reachable_by_path() {
        let config = Config::default();
        let mut inner = ElementBuilder::new("imageHeaderBox", &config);
        inner.property("width", 64u32).property("height", 128u32);
        let inner_result = inner.finish();

        let mut outer = ElementBuilder::new("jp2HeaderBox", &config);
        outer.child("imageHeaderBox", inner_result);
        let outer_result = outer.finish();

        assert_eq!(outer_result.properties.uint_at("imageHeaderBox/width"), Some(64));
    }

    #[test]
    fn non_verbose_child_drops_test_detail_once_parent_already_failed() {
        let config = Config {
            verbose_tests: false,
            ..Config::default()
        };

        let mut first_child = ElementBuilder::new("first", &config);
        first_child.test("x", false);
        let first_result = first_child.finish();

        let mut second_child = ElementBuilder::new("second", &config);
        second_child.test("y", true).property("value", 7u32);
        let second_result = second_child.finish();

        let mut parent = ElementBuilder::new("outer", &config);
        parent.child("first", first_result).child("second", second_result);
        let outer_result = parent.finish();

        assert!(!outer_result.is_valid);
        assert!(outer_result.tests.child("first").is_some());
        assert!(outer_result.tests.child("second").is_none());
        assert_eq!(outer_result.properties.uint_at("second/value"), Some(7));
    }

    #[test]
    fn verbose_child_keeps_test_detail_after_parent_already_failed() {
        let config = Config {
            verbose_tests: true,
            ..Config::default()
        };

        let mut first_child = ElementBuilder::new("first", &config);
        first_child.test("x", false);
        let first_result = first_child.finish();

        let mut second_child = ElementBuilder::new("second", &config);
        second_child.test("y", true);
        let second_result = second_child.finish();

        let mut parent = ElementBuilder::new("outer", &config);
        parent.child("first", first_result).child("second", second_result);
        let outer_result = parent.finish();

        assert!(!outer_result.is_valid);
        assert!(outer_result.tests.child("second").is_some());
    }
}
