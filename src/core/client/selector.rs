use std::collections::BTreeMap;
use std::fmt;

use crate::core::client::kube_resources::K8sLabelSelector;
use crate::errors::DaoError;

/// Set of `key=value` equality constraints.
///
/// For plain listing an empty selector matches everything. Capabilities that
/// fan out to pods must call [`LabelSelector::require_non_empty`] first: for
/// them an empty selector means "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn from_map(labels: BTreeMap<String, String>) -> Self {
        Self(labels)
    }

    /// Only `matchLabels` is honoured; `matchExpressions` are ignored.
    pub fn from_match_labels(selector: Option<&K8sLabelSelector>) -> Self {
        selector
            .and_then(|s| s.match_labels.clone())
            .map(Self)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.0
            .iter()
            .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
    }

    /// Reject an empty selector with `NoSelector` naming `owner`.
    pub fn require_non_empty(self, owner: &str) -> Result<Self, DaoError> {
        if self.is_empty() {
            return Err(DaoError::NoSelector(owner.to_string()));
        }
        Ok(self)
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSelector
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Sorted `k1=v1,k2=v2`, the label-selector query syntax.
impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&rendered)
    }
}
