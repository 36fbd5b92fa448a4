/// One element selector of the removal policy: every `tag` element whose
/// `attribute` matches `value` is removed together with its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemovalRule {
    pub tag: String,
    pub attribute: String,
    pub value: String,
}

impl RemovalRule {
    pub fn new(tag: impl Into<String>, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `attr_value` is the element's value for `self.attribute`, if present.
    ///
    /// `class` also matches when `value` is one of the element's class tokens.
    pub fn matches(&self, tag: &str, attr_value: Option<&str>) -> bool {
        if !self.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
        let Some(actual) = attr_value else {
            return false;
        };
        if actual == self.value {
            return true;
        }
        self.attribute.eq_ignore_ascii_case("class")
            && actual.split_ascii_whitespace().any(|token| token == self.value)
    }
}

/// The set of page-chrome selectors stripped from every fetched lesson.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemovalPolicy {
    rules: Vec<RemovalRule>,
}

impl RemovalPolicy {
    pub fn new(rules: Vec<RemovalRule>) -> Self {
        Self { rules }
    }

    /// Comment section, header/footer chrome and tracking widgets of learncpp.com.
    pub fn learncpp() -> Self {
        let mut rules = Vec::new();
        for id in [
            "comments",
            "site-header-main",
            "header-image-main",
            "colophon-inside",
        ] {
            rules.push(RemovalRule::new("div", "id", id));
        }
        for class in ["code-block code-block-10", "cf_monitor"] {
            rules.push(RemovalRule::new("div", "class", class));
        }
        rules.push(RemovalRule::new("footer", "class", "entry-meta entry-utility"));
        Self { rules }
    }

    pub fn rules(&self) -> &[RemovalRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn push(&mut self, rule: RemovalRule) {
        self.rules.push(rule);
    }

    /// `attr` looks up an attribute of the candidate element by name.
    pub fn matches<'a>(&self, tag: &str, attr: impl Fn(&str) -> Option<&'a str>) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.matches(tag, attr(rule.attribute.as_str())))
    }
}
