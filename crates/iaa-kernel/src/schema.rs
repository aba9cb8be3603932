//! Runtime attribute schema: allowed labels per attribute.
//!
//! Attributes not named in the schema are unconstrained, and the absent
//! sentinel is always allowed.

use crate::error::IaaError;
use crate::mention::{AttributeValue, Mention};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    #[serde(default)]
    pub attributes: BTreeMap<String, BTreeSet<String>>,
}

impl AttributeSchema {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn allows(&self, attribute: &str, value: &AttributeValue) -> bool {
        match (self.attributes.get(attribute), value) {
            (None, _) | (_, AttributeValue::Absent) => true,
            (Some(labels), AttributeValue::Label(label)) => labels.contains(label),
        }
    }

    pub fn check_mention(&self, mention: &Mention) -> Result<(), IaaError> {
        for (attribute, value) in &mention.attributes {
            if !self.allows(attribute, value) {
                return Err(IaaError::InvalidLabel {
                    attribute: attribute.clone(),
                    label: value.as_label().unwrap_or_default().to_string(),
                    source_id: mention.source_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// First label violation across `lists`, in list then mention order.
    pub fn check_lists<'a>(
        &self,
        lists: impl IntoIterator<Item = &'a [Mention]>,
    ) -> Result<(), IaaError> {
        if self.is_empty() {
            return Ok(());
        }
        lists
            .into_iter()
            .flatten()
            .try_for_each(|m| self.check_mention(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AttributeSchema {
        AttributeSchema::default().with_attribute("type", ["attack", "kill"])
    }

    #[test]
    fn allows_known_labels_and_absent() {
        let s = schema();
        assert!(s.allows("type", &AttributeValue::label("kill")));
        assert!(s.allows("type", &AttributeValue::Absent));
        assert!(!s.allows("type", &AttributeValue::label("meet")));
        assert!(s.allows("polarity", &AttributeValue::label("anything")));
    }

    #[test]
    fn list_check_reports_first_violation() {
        let a = vec![Mention::new("ok", 0, 2).with_attribute("type", "attack")];
        let b = vec![
            Mention::new("bad", 0, 2).with_attribute("type", "meet"),
            Mention::new("worse", 3, 4).with_attribute("type", "greet"),
        ];

        let err = schema().check_lists([a.as_slice(), b.as_slice()]).unwrap_err();
        assert_eq!(
            err,
            IaaError::InvalidLabel {
                attribute: "type".into(),
                label: "meet".into(),
                source_id: "bad".into(),
            }
        );
        assert!(schema().check_lists([a.as_slice()]).is_ok());
        assert!(
            AttributeSchema::default()
                .check_lists([a.as_slice(), b.as_slice()])
                .is_ok()
        );
    }

    #[test]
    fn parses_from_toml() {
        let s: AttributeSchema = toml::from_str(
            r#"
            [attributes]
            type = ["attack", "kill"]
            polarity = ["positive", "negative"]
            "#,
        )
        .unwrap();
        assert_eq!(s.attribute_names().collect::<Vec<_>>(), ["polarity", "type"]);
    }
}
