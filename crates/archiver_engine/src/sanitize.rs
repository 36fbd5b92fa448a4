use archiver_core::RemovalPolicy;
use ego_tree::NodeId;
use scraper::{ElementRef, Html};

use crate::decode::{decode_html, DecodeError};
use crate::{CanonicalDocument, RawDocument};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("fetched page could not be decoded: {0}")]
    Decode(#[from] DecodeError),
}

/// Strips page chrome described by a [`RemovalPolicy`] from fetched lessons.
///
/// Every element matching a rule is detached together with its subtree; nothing
/// else in the document is touched.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: RemovalPolicy,
}

impl Sanitizer {
    pub fn new(policy: RemovalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RemovalPolicy {
        &self.policy
    }

    pub fn clean(&self, raw: &RawDocument) -> Result<CanonicalDocument, SanitizeError> {
        let decoded = decode_html(&raw.bytes, raw.content_type.as_deref())?;
        Ok(CanonicalDocument {
            lesson: raw.lesson.clone(),
            html: self.clean_html(&decoded.html),
        })
    }

    pub fn clean_html(&self, html: &str) -> String {
        let mut document = Html::parse_document(html);
        self.prune(&mut document);
        document.html()
    }

    /// Detach every matching subtree; returns how many elements were removed.
    pub fn prune(&self, document: &mut Html) -> usize {
        if self.policy.is_empty() {
            return 0;
        }
        let doomed: Vec<NodeId> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| {
                let value = element.value();
                self.policy.matches(value.name(), |name| value.attr(name))
            })
            .map(|element| element.id())
            .collect();

        for id in &doomed {
            if let Some(mut node) = document.tree.get_mut(*id) {
                node.detach();
            }
        }
        doomed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archiver_core::RemovalRule;

    #[test]
    fn nested_matches_are_removed_once_with_their_parent() {
        let sanitizer = Sanitizer::new(RemovalPolicy::new(vec![
            RemovalRule::new("div", "class", "ad"),
        ]));
        let mut doc = Html::parse_document(
            r#"<body><div class="ad"><div class="ad">inner</div></div><p>keep</p></body>"#,
        );
        assert_eq!(sanitizer.prune(&mut doc), 2);
        let html = doc.html();
        assert!(!html.contains("inner"));
        assert!(html.contains("<p>keep</p>"));
    }

    #[test]
    fn empty_policy_leaves_markup_alone() {
        let sanitizer = Sanitizer::default();
        let mut doc = Html::parse_document("<p id=\"comments\">x</p>");
        assert_eq!(sanitizer.prune(&mut doc), 0);
    }
}
