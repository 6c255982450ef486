use std::fmt;

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// A `tag` element whose visible text contains `text`.
    pub fn containing_text(tag: &str, text: &str) -> Self {
        Locator::XPath(format!(
            "//{tag}[contains(normalize-space(.), {})]",
            xpath_literal(text)
        ))
    }

    /// A `tag` element whose whole visible text equals `text`, narrowed by an
    /// optional extra XPath predicate.
    pub fn exact_text(tag: &str, text: &str, predicate: Option<&str>) -> Self {
        let text_test = format!("normalize-space(.)={}", xpath_literal(text));
        match predicate {
            Some(predicate) => Locator::XPath(format!("//{tag}[{text_test} and {predicate}]")),
            None => Locator::XPath(format!("//{tag}[{text_test}]")),
        }
    }

    /// Strategy name as used by the WebDriver protocol.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(value) | Locator::XPath(value) => value,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css `{selector}`"),
            Locator::XPath(path) => write!(f, "xpath `{path}`"),
        }
    }
}

/// XPath predicate matching elements that carry `class` in their class list.
pub fn has_class(class: &str) -> String {
    format!(
        "contains(concat(' ', normalize-space(@class), ' '), {})",
        xpath_literal(&format!(" {class} "))
    )
}

/// Quotes `text` as an XPath 1.0 string literal. XPath has no escape
/// sequences, so text holding both quote kinds is spliced with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    let parts: Vec<String> = text
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

/// Ordered fallback candidates for one UI target. The first candidate that
/// works wins; there is no scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    target: &'static str,
    candidates: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(target: &'static str, candidates: Vec<Locator>) -> Self {
        Self { target, candidates }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_case::test_case("Sign In", "\"Sign In\"")]
    #[test_case::test_case("Say \"hi\"", "'Say \"hi\"'")]
    #[test_case::test_case("It's", "\"It's\"")]
    #[test_case::test_case("It's \"x\"", "concat(\"It's \", '\"', \"x\", '\"', \"\")")]
    fn test_xpath_literal(text: &str, expected: &str) {
        assert_eq!(xpath_literal(text), expected);
    }

    #[test]
    fn test_text_locators() {
        assert_eq!(
            Locator::containing_text("button", "Book Time"),
            Locator::XPath("//button[contains(normalize-space(.), \"Book Time\")]".into())
        );
        assert_eq!(
            Locator::exact_text("td", "7", Some("not(@hidden)")).value(),
            "//td[normalize-space(.)=\"7\" and not(@hidden)]"
        );
        assert_eq!(Locator::exact_text("button", "7", None).strategy(), "xpath");
        assert_eq!(Locator::css(".time").strategy(), "css selector");
    }

    #[test]
    fn test_has_class() {
        assert_eq!(
            has_class("other-month"),
            "contains(concat(' ', normalize-space(@class), ' '), \" other-month \")"
        );
    }
}
